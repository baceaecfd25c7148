//! Login credentials.

use std::fmt;

use datahub_protocol::LoginRequest;

/// Username and password for `POST /Auth`.
///
/// Consumed by the login call; the reader never stores it.
#[derive(Clone)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn login_body(&self) -> LoginRequest<'_> {
        LoginRequest { username: &self.username, password: &self.password }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
