//! Command implementations. Each one loads config, opens the client it
//! needs, does one thing, and closes the client.

use std::io::{self, Write};
use std::path::Path;

use datahub_client::{DataHubReader, Publisher, Scalar, SendOutcome};
use datahub_config::DataHubConfig;
use log::{debug, info};

use crate::CliError;
use crate::exit_codes::{EXIT_ERROR, EXIT_NOT_DELIVERED};

fn load(config: Option<&Path>) -> Result<DataHubConfig, CliError> {
    match config {
        Some(path) => debug!("Using config {}", path.display()),
        None => debug!("Using default config path"),
    }
    Ok(DataHubConfig::load(config)?)
}

fn open_reader(config: &DataHubConfig) -> Result<DataHubReader, CliError> {
    let point = config.point_identity()?;
    let options = config.rest_options()?;
    let credential = config.credential()?;
    Ok(DataHubReader::connect(options, credential, point)?)
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: e.to_string(),
        hint: None,
    })
}

fn json_of<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, CliError> {
    serde_json::to_value(value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: e.to_string(),
        hint: None,
    })
}

fn check_delivered(outcome: SendOutcome) -> Result<(), CliError> {
    match outcome {
        SendOutcome::Delivered => Ok(()),
        other => Err(CliError {
            code: EXIT_NOT_DELIVERED,
            message: format!("record not delivered ({})", other),
            hint: None,
        }),
    }
}

// ── read / ensure-tag ───────────────────────────────────────────────

pub fn cmd_read(config: Option<&Path>, index: i64, with_ts: bool) -> Result<(), CliError> {
    let config = load(config)?;
    let mut reader = open_reader(&config)?;
    let record = reader.read_last_record(index);
    reader.close();
    let record = record?;
    info!("Read {} (index {})", reader.point().tag_name(), index);

    let value = json_of(&record.value)?;
    if with_ts {
        print_json(&serde_json::json!({ "value": value, "ts": record.ts }))
    } else {
        print_json(&value)
    }
}

pub fn cmd_ensure_tag(config: Option<&Path>) -> Result<(), CliError> {
    let config = load(config)?;
    let mut reader = open_reader(&config)?;
    let result = reader.ensure_tag();
    reader.close();
    result?;
    eprintln!("Tag {} ready", reader.point().tag_name());
    Ok(())
}

// ── send / send-image ───────────────────────────────────────────────

pub fn cmd_send(
    config: Option<&Path>,
    device: &str,
    tag: &str,
    array: bool,
    values: &[String],
) -> Result<(), CliError> {
    let mut scalars: Vec<Scalar> = values.iter().map(|v| Scalar::parse_loose(v)).collect();
    if scalars.is_empty() {
        return Err(CliError::usage("no values given"));
    }

    let config = load(config)?;
    let mut publisher = Publisher::connect(config.agent_options()?)?;
    info!("Sending {} value(s) to {}/{}", scalars.len(), device, tag);
    let outcome = if array || scalars.len() > 1 {
        publisher.send_array(scalars, device, tag)
    } else {
        publisher.send_single(scalars.remove(0), device, tag)
    };
    publisher.close()?;
    check_delivered(outcome?)
}

pub fn cmd_send_image(
    config: Option<&Path>,
    device: &str,
    tag: &str,
    file: &Path,
) -> Result<(), CliError> {
    if !file.exists() {
        return Err(CliError::usage(format!("File not found: {}", file.display())));
    }

    let config = load(config)?;
    let mut publisher = Publisher::connect(config.agent_options()?)?;
    info!("Sending image {} to {}/{}", file.display(), device, tag);
    let outcome = publisher.send_image(file, device, tag);
    publisher.close()?;
    check_delivered(outcome?)
        .map_err(|e| e.with_hint("check the agent log (-vv) for the rejection reason"))
}
