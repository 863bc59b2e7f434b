//! Connection configuration resolved from the process environment.
//!
//! The three variables are read once at startup. By default nothing is
//! validated: a missing variable becomes an empty string and is handed to
//! the driver as-is. [`ConnectionConfig::validate`] exists for strict mode.

use crate::credentials::Credentials;
use crate::error::IbmiQueryError;

/// Target server address
pub const HOST_VAR: &str = "IBMI_HOST";
/// Login user
pub const USER_VAR: &str = "IBMI_USER";
/// Login password
pub const PASSWORD_VAR: &str = "IBMI_PASS";

/// Fixed scheme prefix of every connection target.
pub const TARGET_PREFIX: &str = "jdbc:as400://";

/// Connection parameters for one run.
///
/// # Security
/// `Display` shows the host only and `Debug` masks the password.
///
/// # Example
/// ```rust
/// use ibmi_query_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::new("ibmi.example.com", "payroll", "secret");
/// assert_eq!(config.connection_target(), "jdbc:as400://ibmi.example.com");
/// assert!(!config.to_string().contains("secret"));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    host: String,
    credentials: Credentials,
}

impl ConnectionConfig {
    /// Creates a configuration from explicit values.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            credentials: Credentials::new(user.into(), password.into()),
        }
    }

    /// Reads `IBMI_HOST`, `IBMI_USER` and `IBMI_PASS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Unset variables become empty strings; no other normalization happens.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_VAR).unwrap_or_default();
        let user = lookup(USER_VAR).unwrap_or_default();
        let password = lookup(PASSWORD_VAR).unwrap_or_default();
        if host.is_empty() {
            tracing::debug!("{} is unset or empty", HOST_VAR);
        }
        Self::new(host, user, password)
    }

    /// Target server address as supplied.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Login credentials.
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Mutable access to the credentials, used to fill in a prompted password.
    pub const fn credentials_mut(&mut self) -> &mut Credentials {
        &mut self.credentials
    }

    /// Connection target: the fixed scheme prefix followed by the host.
    ///
    /// An empty host yields `jdbc:as400://`.
    pub fn connection_target(&self) -> String {
        format!("{TARGET_PREFIX}{}", self.host)
    }

    /// Strict-mode validation.
    ///
    /// # Errors
    /// Returns a configuration error naming the offending variable when the
    /// host, user or password is empty, or when the host contains whitespace
    /// or a path separator.
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(IbmiQueryError::configuration(format!(
                "{HOST_VAR} must be set"
            )));
        }

        if self.host.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(IbmiQueryError::configuration(format!(
                "{HOST_VAR} must be a bare host name or address"
            )));
        }

        if self.credentials.user().is_empty() {
            return Err(IbmiQueryError::configuration(format!(
                "{USER_VAR} must be set"
            )));
        }

        if !self.credentials.has_password() {
            return Err(IbmiQueryError::configuration(format!(
                "{PASSWORD_VAR} must be set"
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Host only
        write!(f, "ConnectionConfig({})", self.connection_target())
    }
}
