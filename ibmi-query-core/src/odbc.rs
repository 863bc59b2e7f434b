//! IBM i access through the system ODBC driver manager.
//!
//! The connection-string helpers are always available; the driver itself
//! requires the `odbc` feature because it links against the driver manager
//! (unixODBC on Linux, the system manager on Windows).

#[cfg(feature = "odbc")]
mod driver;

#[cfg(feature = "odbc")]
pub use driver::As400OdbcDriver;

use crate::config::TARGET_PREFIX;
use crate::credentials::Credentials;

/// ODBC driver name registered by IBM i Access Client Solutions.
pub const DEFAULT_ODBC_DRIVER: &str = "IBM i Access ODBC Driver";

/// Host segment of an `as400` connection target.
///
/// Anything after the first `/`, `;` or `?` is ignored, and an optional
/// `user@` prefix is stripped. `jdbc:as400://` yields an empty host.
pub fn host_of(target: &str) -> &str {
    let rest = target
        .get(..TARGET_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(TARGET_PREFIX))
        .map_or_else(
            || target.split_once("://").map_or(target, |(_, rest)| rest),
            |_| &target[TARGET_PREFIX.len()..],
        );
    let authority = rest.split(['/', ';', '?']).next().unwrap_or_default();
    authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host)
}

/// Quotes an ODBC attribute value when it contains characters that would
/// otherwise end the attribute.
///
/// Values with `;`, `{`, `}`, `=` or surrounding whitespace are wrapped in
/// braces with any `}` doubled.
pub fn escape_attribute(value: &str) -> String {
    let needs_braces = value.contains([';', '{', '}', '='])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_braces {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

/// Builds the ODBC connection string for `host`.
///
/// The result contains the password; it must never be logged. Use
/// [`redacted_connection_string`] for diagnostics.
pub fn connection_string(driver_name: &str, host: &str, credentials: &Credentials) -> String {
    format!(
        "Driver={{{}}};System={};UID={};PWD={};",
        driver_name.replace('}', "}}"),
        escape_attribute(host),
        escape_attribute(credentials.user()),
        escape_attribute(credentials.password()),
    )
}

/// Connection string with the password replaced, safe for logs.
pub fn redacted_connection_string(
    driver_name: &str,
    host: &str,
    credentials: &Credentials,
) -> String {
    format!(
        "Driver={{{}}};System={};UID={};PWD=****;",
        driver_name.replace('}', "}}"),
        escape_attribute(host),
        escape_attribute(credentials.user()),
    )
}
