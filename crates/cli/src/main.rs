// datahub CLI - read and publish DataHub tags from the shell

mod commands;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use datahub_client::DataHubError;
use datahub_config::ConfigError;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE, client_exit_code, config_exit_code};

#[derive(Parser)]
#[command(name = "datahub")]
#[command(about = "Read and publish DataHub tag values")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/datahub/config.toml)
    #[arg(long, short = 'c', global = true, env = "DATAHUB_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the last stored value of the configured point as JSON
    #[command(after_help = "\
Examples:
  datahub read
  datahub read --index 3
  datahub read --with-ts")]
    Read {
        /// Array offset; -1 for a non-array point
        #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
        index: i64,

        /// Include the record timestamp in the output
        #[arg(long)]
        with_ts: bool,
    },

    /// Create the configured tag if it does not exist yet
    EnsureTag,

    /// Publish one value, or several as an array
    #[command(after_help = "\
Examples:
  datahub send --device arm-joint --tag joint_angle_3 41.5
  datahub send --device arm-joint --tag joints 0 15.5 30 45")]
    Send {
        #[arg(long)]
        device: String,

        #[arg(long)]
        tag: String,

        /// Send a single value as a one-element array
        #[arg(long)]
        array: bool,

        /// Values: integers, floats, true/false, anything else is text
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<String>,
    },

    /// Publish a file as [timestamp, base64] on an array tag
    SendImage {
        #[arg(long)]
        device: String,

        #[arg(long)]
        tag: String,

        file: PathBuf,
    },
}

/// Error surfaced to the shell: exit code, message, optional hint.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<DataHubError> for CliError {
    fn from(err: DataHubError) -> Self {
        let hint = match &err {
            DataHubError::Auth(_) => Some("check [rest] username and the password secret".to_string()),
            DataHubError::UnknownMode { .. } => Some("add the mode under [point.devices]".to_string()),
            _ => None,
        };
        Self { code: client_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        if let ConfigError::Client(inner) = err {
            return inner.into();
        }
        let hint = match &err {
            ConfigError::NotFound(_) => Some("pass --config or set DATAHUB_CONFIG".to_string()),
            ConfigError::MissingSecret(_) => {
                Some("export the environment variable named in config.toml".to_string())
            }
            _ => None,
        };
        Self { code: config_exit_code(&err), message: err.to_string(), hint }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Read { index, with_ts } => commands::cmd_read(config, index, with_ts),
        Commands::EnsureTag => commands::cmd_ensure_tag(config),
        Commands::Send { device, tag, array, values } => {
            commands::cmd_send(config, &device, &tag, array, &values)
        }
        Commands::SendImage { device, tag, file } => {
            commands::cmd_send_image(config, &device, &tag, &file)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
