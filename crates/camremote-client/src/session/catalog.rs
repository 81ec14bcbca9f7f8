//! Advertised method names.

use std::collections::HashSet;

use crate::error::{ClientError, ClientResult};

/// The set of methods a device advertises through `getAvailableApiList`.
///
/// An unpopulated catalog allows every method, so calls made before
/// initialization are never blocked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodCatalog {
    methods: Option<HashSet<String>>,
}

impl MethodCatalog {
    /// Creates an unpopulated, permissive catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog from advertised method names.
    pub fn from_methods<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            methods: Some(methods.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns true once the catalog has been populated.
    pub fn is_populated(&self) -> bool {
        self.methods.is_some()
    }

    /// Number of advertised methods.
    pub fn len(&self) -> usize {
        self.methods.as_ref().map_or(0, HashSet::len)
    }

    /// Returns true if no method is advertised.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `method` may be called.
    pub fn allows(&self, method: &str) -> bool {
        match &self.methods {
            Some(methods) => methods.contains(method),
            None => true,
        }
    }

    /// Fails with a capability error if `method` may not be called.
    pub fn check(&self, method: &str) -> ClientResult<()> {
        if self.allows(method) {
            Ok(())
        } else {
            Err(ClientError::unsupported_method(method))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpopulated_catalog_allows_everything() {
        let catalog = MethodCatalog::new();
        assert!(!catalog.is_populated());
        assert!(catalog.check("actTakePicture").is_ok());
        assert!(catalog.is_empty());
    }

    #[test]
    fn populated_catalog_blocks_unknown_methods() {
        let catalog = MethodCatalog::from_methods(["getVersions", "actTakePicture"]);
        assert!(catalog.is_populated());
        assert_eq!(catalog.len(), 2);
        assert!(catalog.check("actTakePicture").is_ok());

        let err = catalog.check("actZoom").unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedMethod { ref method } if method == "actZoom"));
    }

    #[test]
    fn empty_advertisement_blocks_everything() {
        let catalog = MethodCatalog::from_methods(Vec::<String>::new());
        assert!(catalog.is_populated());
        assert!(!catalog.allows("getVersions"));
    }
}
