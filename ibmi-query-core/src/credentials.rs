//! Login credentials with automatic memory zeroing.
//!
//! # Security
//! - User and password are stored in `Zeroizing<String>` containers
//! - Memory is cleared when the credentials go out of scope
//! - The password is never exposed in debug output or logs

use zeroize::Zeroizing;

/// User/password pair handed to a driver at connect time.
///
/// Values are kept exactly as supplied; an empty password is a valid value
/// and is passed to the driver unchanged.
///
/// # Example
///
/// ```rust
/// use ibmi_query_core::credentials::Credentials;
///
/// let creds = Credentials::new("payroll".to_string(), "secret".to_string());
/// assert_eq!(creds.user(), "payroll");
/// assert!(creds.has_password());
/// assert!(!format!("{creds:?}").contains("secret"));
/// ```
#[derive(Clone)]
pub struct Credentials {
    user: Zeroizing<String>,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(user: String, password: String) -> Self {
        Self {
            user: Zeroizing::new(user),
            password: Zeroizing::new(password),
        }
    }

    /// Login user.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Login password. Only drivers should call this.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Checks if a non-empty password is present without exposing it.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Replaces the password, zeroing the previous value.
    pub fn set_password(&mut self, password: String) {
        self.password = Zeroizing::new(password);
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user.as_str())
            .field("password", &"****")
            .finish()
    }
}
