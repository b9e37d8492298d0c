//! Transform configuration.
//!
//! Names and prefixes baked into every generated wrapper. The defaults match
//! the host's loader globals; a JSON file can override any subset:
//!
//! ```json
//! { "hostPrefix": "chipbox:", "resolveFn": "__qjs_require" }
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the module transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformConfig {
    /// Specifier prefix of modules supplied directly by the host.
    pub host_prefix: String,

    /// Prefix the dev server puts in front of ids it cannot resolve to files.
    /// Host-native specifiers always carry it in generated resolution calls.
    pub internal_id_prefix: String,

    /// Prefix reserved for dev-server tooling modules.
    pub tooling_prefix: String,

    /// Tooling modules known to work in the host.
    ///
    /// Entries ending in `/` match as prefixes, all others match exactly.
    pub known_tooling: Vec<String>,

    /// Generic resolver called for ordinary imports.
    pub resolve_fn: String,

    /// Host dynamic-resolution call used for host-native imports.
    pub host_import_fn: String,

    /// Registration call that publishes a module's exports to the host registry.
    pub register_fn: String,

    /// Output-bindings object declared by the wrapper.
    pub exports_ident: String,

    /// Module-record object returned by the wrapper.
    pub module_ident: String,

    /// Local identifier substituted for `import.meta`.
    pub import_meta_ident: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            host_prefix: "chipbox:".to_string(),
            internal_id_prefix: "/@id/".to_string(),
            tooling_prefix: "/@".to_string(),
            known_tooling: vec![
                "/@vite/client".to_string(),
                "/@solid-refresh".to_string(),
                "/@id/".to_string(),
            ],
            resolve_fn: "__qjs_require".to_string(),
            host_import_fn: "import".to_string(),
            register_fn: "__qjs_register_module".to_string(),
            exports_ident: "exports".to_string(),
            module_ident: "module".to_string(),
            import_meta_ident: "__import_meta".to_string(),
        }
    }
}

impl TransformConfig {
    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set the generic resolver call.
    #[must_use]
    pub fn with_resolve_fn(mut self, name: impl Into<String>) -> Self {
        self.resolve_fn = name.into();
        self
    }

    /// Set the registration call.
    #[must_use]
    pub fn with_register_fn(mut self, name: impl Into<String>) -> Self {
        self.register_fn = name.into();
        self
    }

    /// Add a known tooling module to the allow-list.
    #[must_use]
    pub fn with_known_tooling(mut self, entry: impl Into<String>) -> Self {
        self.known_tooling.push(entry.into());
        self
    }

    /// Whether `specifier` names a module the host supplies itself.
    ///
    /// Both the bare form (`chipbox:tracing`) and the form the dev server
    /// produces after id resolution (`/@id/chipbox:tracing`) count.
    #[must_use]
    pub fn is_host_native(&self, specifier: &str) -> bool {
        specifier.starts_with(&self.host_prefix)
            || specifier
                .strip_prefix(&self.internal_id_prefix)
                .is_some_and(|rest| rest.starts_with(&self.host_prefix))
    }

    /// The specifier a host-native import is resolved with.
    #[must_use]
    pub fn host_specifier(&self, specifier: &str) -> String {
        if specifier.starts_with(&self.internal_id_prefix) {
            specifier.to_string()
        } else {
            format!("{}{specifier}", self.internal_id_prefix)
        }
    }

    /// Whether `specifier` uses the tooling prefix without being allow-listed.
    #[must_use]
    pub fn is_unknown_tooling(&self, specifier: &str) -> bool {
        if !specifier.starts_with(&self.tooling_prefix) {
            return false;
        }
        !self.known_tooling.iter().any(|known| {
            if known.ends_with('/') {
                specifier.starts_with(known.as_str())
            } else {
                specifier == known
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_host_native_detection() {
        let config = TransformConfig::default();
        assert!(config.is_host_native("chipbox:tracing"));
        assert!(config.is_host_native("/@id/chipbox:tracing"));
        assert!(!config.is_host_native("/@id/solid-js"));
        assert!(!config.is_host_native("/src/App.tsx"));
    }

    #[test]
    fn test_host_specifier_adds_prefix_once() {
        let config = TransformConfig::default();
        assert_eq!(
            config.host_specifier("chipbox:tracing"),
            "/@id/chipbox:tracing"
        );
        assert_eq!(
            config.host_specifier("/@id/chipbox:tracing"),
            "/@id/chipbox:tracing"
        );
    }

    #[test]
    fn test_unknown_tooling() {
        let config = TransformConfig::default();
        assert!(!config.is_unknown_tooling("/@vite/client"));
        assert!(!config.is_unknown_tooling("/@solid-refresh"));
        assert!(!config.is_unknown_tooling("/@id/solid-js"));
        assert!(config.is_unknown_tooling("/@vite/env"));
        assert!(config.is_unknown_tooling("/@react-refresh"));
        assert!(!config.is_unknown_tooling("/src/main.tsx"));
    }

    #[test]
    fn test_with_known_tooling() {
        let config = TransformConfig::default().with_known_tooling("/@vite/env");
        assert!(!config.is_unknown_tooling("/@vite/env"));
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "hostPrefix": "host:", "resolveFn": "__require" }}"#).unwrap();

        let config = TransformConfig::load(file.path()).unwrap();
        assert_eq!(config.host_prefix, "host:");
        assert_eq!(config.resolve_fn, "__require");
        assert_eq!(config.register_fn, "__qjs_register_module");
    }

    #[test]
    fn test_load_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = TransformConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_load_missing_config() {
        let err = TransformConfig::load(Path::new("/nonexistent/esbridge.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
