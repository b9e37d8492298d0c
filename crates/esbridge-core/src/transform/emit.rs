//! Wrapper emission.
//!
//! The wrapper is an immediately-invoked async function so that imports
//! become awaited resolution calls ahead of the body:
//!
//! ```text
//! (async function() {
//!   const exports = {};
//!   const module = { exports: exports };
//!   const __import_meta = { url: "/src/App.tsx", hot: null };
//!
//! const { h } = await __qjs_require("solid-js/h");
//!
//! <body>
//!
//! __qjs_register_module("/src/App.tsx", exports);
//!   return module;
//! })();
//! ```

use super::rewrite::{js_string, property_key, BindingForm, ImportRecord, Resolution};
use crate::config::TransformConfig;
use std::fmt::Write as _;

/// The call expression (without `await`) that resolves `specifier`.
#[must_use]
pub fn resolution_call(config: &TransformConfig, resolution: Resolution, specifier: &str) -> String {
    match resolution {
        Resolution::Generic => format!("{}({})", config.resolve_fn, js_string(specifier)),
        Resolution::HostNative => format!(
            "{}({})",
            config.host_import_fn,
            js_string(&config.host_specifier(specifier))
        ),
    }
}

/// The statement(s) that stand in for one removed import.
#[must_use]
pub fn import_statement(config: &TransformConfig, record: &ImportRecord) -> String {
    let call = format!(
        "await {}",
        resolution_call(config, record.resolution, &record.source)
    );

    match record.binding_form() {
        BindingForm::SideEffectOnly => format!("{call};"),
        BindingForm::Default => {
            // binding_form() guarantees the default local.
            let local = record.default.as_deref().unwrap_or_default();
            format!("const {{ default: {local} }} = {call};")
        }
        BindingForm::Namespace => {
            let ns = record.namespace.as_deref().unwrap_or_default();
            let mut out = format!("const {ns} = {call};");
            if let Some(default) = &record.default {
                let _ = write!(out, " const {default} = {ns}.default;");
            }
            if !record.named.is_empty() {
                let _ = write!(out, " const {{ {} }} = {ns};", named_pattern(record));
            }
            out
        }
        BindingForm::Named => {
            let mut parts = Vec::with_capacity(record.named.len() + 1);
            if let Some(default) = &record.default {
                parts.push(format!("default: {default}"));
            }
            parts.push(named_pattern(record));
            format!("const {{ {} }} = {call};", parts.join(", "))
        }
    }
}

fn named_pattern(record: &ImportRecord) -> String {
    record
        .named
        .iter()
        .map(|binding| {
            if binding.imported == binding.local {
                binding.local.clone()
            } else {
                format!("{}: {}", property_key(&binding.imported), binding.local)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrap a rewritten body.
#[must_use]
pub fn wrap_module(
    config: &TransformConfig,
    module_path: &str,
    imports: &[ImportRecord],
    body: &str,
    has_exports: bool,
) -> String {
    let exports = &config.exports_ident;
    let module = &config.module_ident;
    let path = js_string(module_path);

    let mut out = String::with_capacity(body.len() + 512);
    out.push_str("(async function() {\n");
    let _ = writeln!(out, "  const {exports} = {{}};");
    let _ = writeln!(out, "  const {module} = {{ exports: {exports} }};");
    let _ = writeln!(
        out,
        "  const {} = {{ url: {path}, hot: null }};",
        config.import_meta_ident
    );
    out.push('\n');

    for record in imports {
        out.push_str(&import_statement(config, record));
        out.push('\n');
    }
    if !imports.is_empty() {
        out.push('\n');
    }

    out.push_str(body.trim_end());
    out.push_str("\n\n");

    if has_exports {
        let _ = writeln!(out, "{}({path}, {exports});", config.register_fn);
    }
    let _ = writeln!(out, "  return {module};");
    out.push_str("})();\n");
    out
}
