//! Explicit driver table keyed by target scheme.

use super::Driver;
use crate::Result;
use crate::error::IbmiQueryError;
use std::collections::BTreeMap;

/// Deferred driver construction.
///
/// Loading happens only when a run resolves a target, so a driver that
/// cannot initialize (missing driver manager, for example) fails that run
/// with `DriverUnavailable` rather than failing registration.
pub type DriverLoader = Box<dyn Fn() -> Result<Box<dyn Driver>>>;

/// Table of drivers available to this build.
///
/// # Example
/// ```rust
/// use ibmi_query_core::driver::DriverRegistry;
/// use ibmi_query_core::error::ErrorKind;
///
/// let registry = DriverRegistry::new();
/// let err = registry.load("jdbc:as400://ibmi").err().unwrap();
/// assert_eq!(err.kind(), ErrorKind::DriverUnavailable);
/// ```
#[derive(Default)]
pub struct DriverRegistry {
    loaders: BTreeMap<String, DriverLoader>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every driver compiled into this build.
    ///
    /// With the `odbc` feature the `as400` scheme is served by the IBM i
    /// Access ODBC driver named `odbc_driver`. Without it the registry is
    /// empty and every run reports `DriverUnavailable`.
    #[cfg_attr(not(feature = "odbc"), allow(unused_variables))]
    pub fn with_default_drivers(odbc_driver: &str) -> Self {
        #[cfg_attr(not(feature = "odbc"), allow(unused_mut))]
        let mut registry = Self::new();

        #[cfg(feature = "odbc")]
        {
            let driver_name = odbc_driver.to_string();
            registry.register(
                super::AS400_SCHEME,
                Box::new(move || {
                    let driver = crate::odbc::As400OdbcDriver::new(driver_name.clone())?;
                    Ok(Box::new(driver) as Box<dyn Driver>)
                }),
            );
        }

        registry
    }

    /// Registers `loader` for `scheme`, returning any loader it replaces.
    pub fn register(&mut self, scheme: &str, loader: DriverLoader) -> Option<DriverLoader> {
        tracing::debug!("Registering driver for scheme '{}'", scheme);
        self.loaders.insert(scheme.to_ascii_lowercase(), loader)
    }

    /// Whether a driver is registered for `scheme`.
    pub fn contains(&self, scheme: &str) -> bool {
        self.loaders.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes in sorted order.
    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// Resolves the driver for `target` and loads it.
    ///
    /// # Errors
    /// Returns `DriverUnavailable` if the target has no recognizable scheme,
    /// no driver is registered for it, or the driver fails to load.
    pub fn load(&self, target: &str) -> Result<Box<dyn Driver>> {
        let scheme = scheme_of(target)?;
        let loader = self.loaders.get(&scheme).ok_or_else(|| {
            IbmiQueryError::driver_unavailable(
                scheme.as_str(),
                unregistered_reason(&scheme),
            )
        })?;

        let driver = loader()?;
        tracing::debug!("Loaded driver '{}' for scheme '{}'", driver.name(), scheme);
        Ok(driver)
    }
}

fn unregistered_reason(scheme: &str) -> String {
    if scheme == super::AS400_SCHEME && !cfg!(feature = "odbc") {
        "no driver registered (built without the `odbc` feature)".to_string()
    } else {
        "no driver registered".to_string()
    }
}

/// Extracts the lower-cased driver scheme from a connection target.
///
/// An optional leading `jdbc:` is skipped, so `jdbc:as400://host` and
/// `as400://host` both resolve to `as400`.
///
/// # Errors
/// Returns `DriverUnavailable` when the target has no `scheme://` part.
pub fn scheme_of(target: &str) -> Result<String> {
    let without_jdbc = target
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("jdbc:"))
        .map_or(target, |_| &target[5..]);

    match without_jdbc.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() && !scheme.contains(':') => {
            Ok(scheme.to_ascii_lowercase())
        }
        _ => Err(IbmiQueryError::driver_unavailable(
            "<unknown>",
            "unrecognized connection target format",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::driver::Connection;
    use crate::error::ErrorKind;

    struct NamedDriver;

    impl Driver for NamedDriver {
        fn name(&self) -> &str {
            "named"
        }

        fn connect(
            &self,
            _target: &str,
            _credentials: &Credentials,
        ) -> Result<Box<dyn Connection + '_>> {
            Err(IbmiQueryError::database_operation("not reachable"))
        }
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("jdbc:as400://ibmi").unwrap(), "as400");
        assert_eq!(scheme_of("JDBC:AS400://ibmi").unwrap(), "as400");
        assert_eq!(scheme_of("as400://ibmi").unwrap(), "as400");
        assert_eq!(scheme_of("jdbc:as400://").unwrap(), "as400");

        assert!(scheme_of("ibmi.example.com").is_err());
        assert!(scheme_of("jdbc:://ibmi").is_err());
        assert!(scheme_of("").is_err());
    }

    #[test]
    fn test_empty_registry_reports_driver_unavailable() {
        let registry = DriverRegistry::new();
        let err = registry.load("jdbc:as400://ibmi").err().unwrap();

        assert_eq!(err.kind(), ErrorKind::DriverUnavailable);
        assert!(err.to_string().contains("as400"));
    }

    #[test]
    fn test_register_and_load() {
        let mut registry = DriverRegistry::new();
        let previous = registry.register(
            "AS400",
            Box::new(|| Ok(Box::new(NamedDriver) as Box<dyn Driver>)),
        );
        assert!(previous.is_none());

        assert!(registry.contains("as400"));
        assert_eq!(registry.schemes().collect::<Vec<_>>(), vec!["as400"]);

        let driver = registry.load("jdbc:as400://ibmi").unwrap();
        assert_eq!(driver.name(), "named");

        let err = registry.load("jdbc:db2://ibmi").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DriverUnavailable);
    }

    #[test]
    fn test_loader_failure_propagates() {
        let mut registry = DriverRegistry::new();
        registry.register(
            "as400",
            Box::new(|| {
                Err(IbmiQueryError::driver_unavailable(
                    "as400",
                    "driver manager not found",
                ))
            }),
        );

        let err = registry.load("jdbc:as400://ibmi").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DriverUnavailable);
        assert!(err.to_string().contains("driver manager not found"));
    }

    #[cfg(feature = "odbc")]
    #[test]
    fn test_default_drivers_register_as400() {
        let registry = DriverRegistry::with_default_drivers("IBM i Access ODBC Driver");
        assert!(registry.contains("as400"));
        assert_eq!(registry.schemes().collect::<Vec<_>>(), vec!["as400"]);
    }

    #[cfg(not(feature = "odbc"))]
    #[test]
    fn test_default_drivers_without_odbc_feature() {
        let registry = DriverRegistry::with_default_drivers("IBM i Access ODBC Driver");
        assert!(!registry.contains("as400"));

        let err = registry.load("jdbc:as400://ibmi").err().unwrap();
        assert!(err.to_string().contains("odbc"));
    }
}
