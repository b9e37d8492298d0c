//! ES module wrapper transform.
//!
//! Handles: detach source map → parse → rewrite imports/exports → wrap →
//! reattach source map.
//!
//! The output is a classic script that evaluates to a promise of the module
//! record (`{ exports }`), for hosts that can run async functions but have
//! no static module linker.

mod edits;
mod emit;
mod parse;
mod rewrite;
mod sourcemap;

pub use emit::{import_statement, resolution_call};
pub use parse::{parse_module, ParsedModule};
pub use rewrite::{BindingForm, ImportRecord, NamedBinding, Resolution};
pub use sourcemap::{attach_source_map, split_source_map, SplitSource};

use crate::config::TransformConfig;
use crate::error::TransformError;
use esbridge_util::hash::source_hash;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Non-fatal finding attached to a transform result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformDiagnostic {
    /// Stable code.
    pub code: &'static str,
    pub message: String,
    /// The offending import specifier.
    pub specifier: String,
    /// Path of the module containing it.
    pub module_path: String,
}

impl TransformDiagnostic {
    /// Import of a dev-server tooling module outside the allow-list.
    #[must_use]
    pub fn unrecognized_internal(specifier: &str, module_path: &str) -> Self {
        Self {
            code: "UNRECOGNIZED_INTERNAL_SPECIFIER",
            message: format!(
                "Unknown dev-server internal import '{specifier}' in {module_path}; it may not load in the host"
            ),
            specifier: specifier.to_string(),
            module_path: module_path.to_string(),
        }
    }
}

/// Result of transforming one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    /// The wrapped module text.
    pub code: String,
    /// Imports that became resolution statements, in source order.
    pub imports: Vec<ImportRecord>,
    /// Whether the wrapper registers an exports object.
    pub has_exports: bool,
    pub diagnostics: Vec<TransformDiagnostic>,
}

/// Transform one module with `config`.
pub fn transform_module_with(
    code: &str,
    module_path: &str,
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    // The whole text is parsed so the lexer can confirm the candidate
    // reference line is a real comment and not the tail of a literal.
    let split = split_source_map(code);
    let parsed = parse_module(code, module_path)?;
    let source_map = split
        .source_map
        .filter(|_| parsed.is_line_comment_at(split.reference_line));
    let body_len = if source_map.is_some() {
        split.body.len()
    } else {
        code.len()
    };
    let rewritten = rewrite::rewrite_module(&parsed, module_path, config, body_len)?;

    let wrapped = emit::wrap_module(
        config,
        module_path,
        &rewritten.imports,
        &rewritten.body,
        rewritten.has_exports,
    );

    tracing::debug!(
        path = module_path,
        imports = rewritten.imports.len(),
        has_exports = rewritten.has_exports,
        "transformed module"
    );

    Ok(TransformOutput {
        code: attach_source_map(wrapped, source_map),
        imports: rewritten.imports,
        has_exports: rewritten.has_exports,
        diagnostics: rewritten.diagnostics,
    })
}

/// Transform one module with the default configuration.
pub fn transform_module(code: &str, module_path: &str) -> Result<TransformOutput, TransformError> {
    transform_module_with(code, module_path, &TransformConfig::default())
}

struct CachedModule {
    source_hash: String,
    output: TransformOutput,
}

/// Caching transformer.
///
/// Results are keyed by module path and reused while the source text hashes
/// the same. Safe to share between threads.
pub struct ModuleTransformer {
    config: TransformConfig,
    /// Module cache: module path → last result.
    cache: RwLock<HashMap<String, CachedModule>>,
}

impl Default for ModuleTransformer {
    fn default() -> Self {
        Self::new(TransformConfig::default())
    }
}

impl ModuleTransformer {
    /// Create a transformer.
    #[must_use]
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Transform a module, reusing the cached result for unchanged text.
    ///
    /// Failures are not cached.
    pub fn transform(&self, code: &str, module_path: &str) -> Result<TransformOutput, TransformError> {
        let hash = source_hash(code);
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_path)
            .filter(|cached| cached.source_hash == hash)
        {
            tracing::trace!(path = module_path, "transform cache hit");
            return Ok(cached.output.clone());
        }

        let output = transform_module_with(code, module_path, &self.config)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                module_path.to_string(),
                CachedModule {
                    source_hash: hash,
                    output: output.clone(),
                },
            );
        Ok(output)
    }

    /// Whether a result for exactly this source text is cached.
    #[must_use]
    pub fn is_cached(&self, module_path: &str, code: &str) -> bool {
        let hash = source_hash(code);
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_path)
            .is_some_and(|cached| cached.source_hash == hash)
    }

    /// Drop the cached result for `module_path`. Returns whether one existed.
    pub fn invalidate(&self, module_path: &str) -> bool {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(module_path)
            .is_some()
    }

    /// Drop every cached result.
    pub fn invalidate_all(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached modules.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_full_module() {
        let source = "import { h } from 'solid-js/h';\nexport const App = () => h('box');\n//# sourceMappingURL=App.js.map\n";
        let out = transform_module(source, "/src/App.tsx").unwrap();
        assert_eq!(
            out.code,
            "(async function() {\n  const exports = {};\n  const module = { exports: exports };\n  const __import_meta = { url: \"/src/App.tsx\", hot: null };\n\nconst { h } = await __qjs_require(\"solid-js/h\");\n\nconst App = exports.App = () => h('box');\n\n__qjs_register_module(\"/src/App.tsx\", exports);\n  return module;\n})();\n//# sourceMappingURL=App.js.map"
        );
        assert!(out.has_exports);
        assert_eq!(out.imports.len(), 1);
    }

    #[test]
    fn test_reference_line_inside_template_literal_stays_in_body() {
        let source = "const s = `\n//# sourceMappingURL=fake.map`";
        let out = transform_module(source, "/src/t.js").unwrap();
        assert!(out.code.contains("const s = `\n//# sourceMappingURL=fake.map`"));
        assert!(out.code.ends_with("})();\n"));
    }

    #[test]
    fn test_parse_failure_reported() {
        let err = transform_module("export const = ;", "/bad.js").unwrap_err();
        assert_eq!(err.code(), "TRANSFORM_PARSE_ERROR");
    }

    #[test]
    fn test_custom_config_names() {
        let config = TransformConfig::default()
            .with_resolve_fn("__require")
            .with_register_fn("__register");
        let out = transform_module_with("import a from './a'; export default a;", "/m.js", &config)
            .unwrap();
        assert!(out.code.contains("await __require(\"./a\")"));
        assert!(out.code.contains("__register(\"/m.js\", exports);"));
    }

    #[test]
    fn test_cache_reuse_and_invalidate() {
        let transformer = ModuleTransformer::default();
        let first = transformer.transform("export const a = 1;", "/a.js").unwrap();
        let second = transformer.transform("export const a = 1;", "/a.js").unwrap();
        assert_eq!(first, second);
        assert_eq!(transformer.cached_len(), 1);
        assert!(transformer.is_cached("/a.js", "export const a = 1;"));
        assert!(!transformer.is_cached("/a.js", "export const a = 2;"));

        let changed = transformer.transform("export const a = 2;", "/a.js").unwrap();
        assert!(changed.code.contains("exports.a = 2"));
        assert_eq!(transformer.cached_len(), 1);

        assert!(transformer.invalidate("/a.js"));
        assert!(!transformer.invalidate("/a.js"));
        assert_eq!(transformer.cached_len(), 0);
    }

    #[test]
    fn test_failures_not_cached() {
        let transformer = ModuleTransformer::default();
        assert!(transformer.transform("let = ;", "/x.js").is_err());
        assert_eq!(transformer.cached_len(), 0);
        transformer.transform("1;", "/y.js").unwrap();
        transformer.invalidate_all();
        assert_eq!(transformer.cached_len(), 0);
    }
}
