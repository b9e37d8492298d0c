//! Import/export rewriting.
//!
//! Walks the top level of a parsed module and records span edits against
//! the source text:
//! - static imports are deleted and collected as [`ImportRecord`]s, to be
//!   re-emitted as explicit resolution statements by the wrapper
//! - every export form becomes an assignment (or bulk copy) into the
//!   output-bindings object
//! - `import.meta` becomes the wrapper's synthesized metadata identifier
//!
//! Code that is not import/export syntax is left byte-for-byte intact.

use super::edits::Edits;
use super::parse::ParsedModule;
use super::TransformDiagnostic;
use crate::config::TransformConfig;
use crate::error::TransformError;
use swc_common::{Span, Spanned};
use swc_ecma_ast::{
    ClassDecl, Decl, DefaultDecl, ExportSpecifier, FnDecl, ImportDecl, ImportSpecifier,
    MetaPropExpr, MetaPropKind, ModuleDecl, ModuleExportName, ModuleItem, ObjectPatProp, Pat, Str,
    TsModuleName, VarDecl,
};
use swc_ecma_visit::{Visit, VisitWith};

/// How an import's resolution call is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Routed through the generic resolver.
    Generic,
    /// Resolved by the host's own dynamic import.
    HostNative,
}

/// Shape of an import's bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingForm {
    SideEffectOnly,
    Default,
    Namespace,
    Named,
}

/// One `imported as local` pair of a named import.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NamedBinding {
    pub imported: String,
    pub local: String,
}

/// A static import removed from the module body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// The specifier as written in the source.
    pub source: String,
    pub resolution: Resolution,
    /// `import local from ...`
    pub default: Option<String>,
    /// `import * as local from ...`
    pub namespace: Option<String>,
    /// `import { imported as local } from ...`
    pub named: Vec<NamedBinding>,
}

impl ImportRecord {
    /// The dominant binding shape.
    ///
    /// A namespace binding wins over everything else, then named bindings
    /// (a default import next to named ones is destructured with them).
    #[must_use]
    pub fn binding_form(&self) -> BindingForm {
        if self.namespace.is_some() {
            BindingForm::Namespace
        } else if !self.named.is_empty() {
            BindingForm::Named
        } else if self.default.is_some() {
            BindingForm::Default
        } else {
            BindingForm::SideEffectOnly
        }
    }
}

/// Result of rewriting one module.
#[derive(Debug)]
pub struct Rewritten {
    /// Module body with imports removed and exports rewritten.
    pub body: String,
    /// Surviving imports, in source order.
    pub imports: Vec<ImportRecord>,
    /// Whether any assignment into the output-bindings object was emitted.
    pub has_exports: bool,
    pub diagnostics: Vec<TransformDiagnostic>,
}

/// The export statement shapes the rewriter distinguishes.
enum ExportForm<'a> {
    Function(&'a FnDecl),
    Variable(&'a VarDecl),
    Class(&'a ClassDecl),
    /// `export { a, b as c }`
    LocalList(&'a [ExportSpecifier]),
    /// `export { a, b as c } from "m"`
    ReexportList {
        specifiers: &'a [ExportSpecifier],
        src: &'a Str,
    },
    /// `export default ...`, with the declared name of a named function or class.
    Default(Option<String>),
    /// `export * from "m"`
    Wildcard(&'a Str),
    /// `export enum E {}` / `export namespace N {}`; the local declaration stays.
    LocalDeclaration(String),
    /// Type-level syntax with no runtime value.
    TypeOnly,
}

impl<'a> ExportForm<'a> {
    /// Classify a module declaration. `None` means "not an export this pass rewrites".
    fn classify(decl: &'a ModuleDecl) -> Option<Self> {
        let form = match decl {
            ModuleDecl::ExportDecl(export) => match &export.decl {
                Decl::Fn(f) if f.declare || f.function.body.is_none() => Self::TypeOnly,
                Decl::Fn(f) => Self::Function(f),
                Decl::Class(c) if c.declare => Self::TypeOnly,
                Decl::Class(c) => Self::Class(c),
                Decl::Var(v) if v.declare => Self::TypeOnly,
                Decl::Var(v) => Self::Variable(v),
                Decl::TsInterface(_) | Decl::TsTypeAlias(_) => Self::TypeOnly,
                Decl::TsEnum(e) if e.declare => Self::TypeOnly,
                Decl::TsEnum(e) => Self::LocalDeclaration(e.id.sym.to_string()),
                Decl::TsModule(m) if m.declare => Self::TypeOnly,
                Decl::TsModule(m) => match &m.id {
                    TsModuleName::Ident(id) => Self::LocalDeclaration(id.sym.to_string()),
                    TsModuleName::Str(_) => Self::TypeOnly,
                },
                Decl::Using(_) => return None,
            },
            ModuleDecl::ExportNamed(named) if named.type_only => Self::TypeOnly,
            ModuleDecl::ExportNamed(named) => match &named.src {
                Some(src) => Self::ReexportList {
                    specifiers: &named.specifiers,
                    src,
                },
                None => Self::LocalList(&named.specifiers),
            },
            ModuleDecl::ExportDefaultDecl(default) => match &default.decl {
                DefaultDecl::TsInterfaceDecl(_) => Self::TypeOnly,
                DefaultDecl::Class(c) => Self::Default(c.ident.as_ref().map(|i| i.sym.to_string())),
                DefaultDecl::Fn(f) => Self::Default(f.ident.as_ref().map(|i| i.sym.to_string())),
            },
            ModuleDecl::ExportDefaultExpr(_) => Self::Default(None),
            ModuleDecl::ExportAll(all) if all.type_only => Self::TypeOnly,
            ModuleDecl::ExportAll(all) => Self::Wildcard(&all.src),
            ModuleDecl::TsNamespaceExport(_) => Self::TypeOnly,
            ModuleDecl::Import(_)
            | ModuleDecl::TsImportEquals(_)
            | ModuleDecl::TsExportAssignment(_) => return None,
        };
        Some(form)
    }
}

/// Rewrite the imports and exports of `parsed`.
///
/// Only the first `body_len` bytes of the source become the body; anything
/// after them (a detached source-map reference) is left to the caller.
pub fn rewrite_module(
    parsed: &ParsedModule,
    module_path: &str,
    config: &TransformConfig,
    body_len: usize,
) -> Result<Rewritten, TransformError> {
    let body_len = body_len.min(parsed.source().len());
    let mut rewriter = Rewriter {
        parsed,
        body_len,
        module_path,
        config,
        edits: Edits::new(),
        imports: Vec::new(),
        diagnostics: Vec::new(),
        has_exports: false,
        temp_counter: 0,
    };

    for item in &parsed.module.body {
        if let ModuleItem::ModuleDecl(decl) = item {
            rewriter.rewrite_decl(decl)?;
        }
    }
    rewriter.rewrite_import_meta();

    let Rewriter {
        edits,
        imports,
        diagnostics,
        has_exports,
        ..
    } = rewriter;

    let body = edits
        .apply(&parsed.source()[..body_len])
        .map_err(|message| TransformError::Emit {
            path: module_path.to_string(),
            message,
        })?;

    Ok(Rewritten {
        body,
        imports,
        has_exports,
        diagnostics,
    })
}

struct Rewriter<'a> {
    parsed: &'a ParsedModule,
    body_len: usize,
    module_path: &'a str,
    config: &'a TransformConfig,
    edits: Edits,
    imports: Vec<ImportRecord>,
    diagnostics: Vec<TransformDiagnostic>,
    has_exports: bool,
    temp_counter: usize,
}

impl Rewriter<'_> {
    fn rewrite_decl(&mut self, decl: &ModuleDecl) -> Result<(), TransformError> {
        if let ModuleDecl::Import(import) = decl {
            self.collect_import(import);
            return Ok(());
        }
        let Some(form) = ExportForm::classify(decl) else {
            tracing::debug!(path = self.module_path, "leaving unsupported module syntax as-is");
            return Ok(());
        };
        self.rewrite_export(decl.span(), form)
    }

    fn collect_import(&mut self, import: &ImportDecl) {
        self.remove_statement(import.span);
        if import.type_only {
            return;
        }

        let source = import.src.value.to_string();
        let mut record = ImportRecord {
            resolution: self.check_specifier(&source),
            source,
            default: None,
            namespace: None,
            named: Vec::new(),
        };

        let mut type_only_specifiers = false;
        for specifier in &import.specifiers {
            match specifier {
                ImportSpecifier::Default(d) => record.default = Some(d.local.sym.to_string()),
                ImportSpecifier::Namespace(ns) => {
                    record.namespace = Some(ns.local.sym.to_string());
                }
                ImportSpecifier::Named(_) if is_type_only_import(specifier) => {
                    type_only_specifiers = true;
                }
                ImportSpecifier::Named(named) => {
                    let local = named.local.sym.to_string();
                    let imported = named
                        .imported
                        .as_ref()
                        .map_or_else(|| local.clone(), export_name);
                    record.named.push(NamedBinding { imported, local });
                }
            }
        }

        // `import { type A } from "m"` carries no runtime binding.
        if type_only_specifiers && record.binding_form() == BindingForm::SideEffectOnly {
            return;
        }
        self.imports.push(record);
    }

    fn rewrite_export(&mut self, span: Span, form: ExportForm<'_>) -> Result<(), TransformError> {
        match form {
            // The declaration becomes an expression, so a `const` keeps the
            // module-local name bound. Hoisting of functions is lost.
            ExportForm::Function(f) => self.bind_declaration(span, &f.ident.sym)?,
            ExportForm::Class(c) => self.bind_declaration(span, &c.ident.sym)?,
            ExportForm::Variable(var) => self.rewrite_variable(span, var)?,
            ExportForm::LocalList(specifiers) => {
                let assignments: Vec<String> = specifiers
                    .iter()
                    .filter_map(local_export_pair)
                    .map(|(local, exported)| {
                        format!("{} = {local};", self.export_target(&exported))
                    })
                    .collect();
                self.replace_statement(span, &assignments.join(" "));
                self.has_exports |= !assignments.is_empty();
            }
            ExportForm::ReexportList { specifiers, src } => {
                let replacement = self.reexport_list(specifiers, src);
                self.has_exports |= !replacement.is_empty();
                self.replace_statement(span, &replacement);
            }
            ExportForm::Default(name) => {
                let target = self.export_target("default");
                let prefix = match name {
                    Some(name) => format!("const {name} = {target} = "),
                    None => format!("{target} = "),
                };
                self.replace_default_keywords(span, &prefix)?;
                self.append_statement(span, "");
                self.has_exports = true;
            }
            ExportForm::Wildcard(src) => {
                let call = self.resolution_expr(&src.value);
                let statement = format!("Object.assign({}, {call});", self.config.exports_ident);
                self.replace_statement(span, &statement);
                self.has_exports = true;
            }
            ExportForm::LocalDeclaration(name) => {
                self.remove_export_keyword(span)?;
                let assignment = format!("{} = {name};", self.export_target(&name));
                self.append_statement(span, &assignment);
                self.has_exports = true;
            }
            ExportForm::TypeOnly => self.remove_statement(span),
        }
        Ok(())
    }

    /// `export const a = 1, { b, ...c } = f();`
    ///
    /// Identifier declarators get their initializer wrapped in the export
    /// assignment; destructuring declarators stay untouched and are followed
    /// by one assignment per top-level binding.
    fn rewrite_variable(&mut self, span: Span, var: &VarDecl) -> Result<(), TransformError> {
        self.remove_export_keyword(span)?;

        let mut destructured = Vec::new();
        for declarator in &var.decls {
            match &declarator.name {
                Pat::Ident(binding) => {
                    let target = self.export_target(&binding.id.sym);
                    match &declarator.init {
                        Some(init) => {
                            let at = self.parsed.offset(init.span().lo);
                            self.edits.insert(at, format!("{target} = "));
                        }
                        None => {
                            let at = self.parsed.offset(declarator.span.hi);
                            self.edits.insert(at, format!(" = {target} = undefined"));
                        }
                    }
                    self.has_exports = true;
                }
                pattern => top_level_bindings(pattern, &mut destructured),
            }
        }

        if !destructured.is_empty() {
            let assignments: Vec<String> = destructured
                .iter()
                .map(|name| format!("{} = {name};", self.export_target(name)))
                .collect();
            self.append_statement(span, &assignments.join(" "));
            self.has_exports = true;
        }
        Ok(())
    }

    fn reexport_list(&mut self, specifiers: &[ExportSpecifier], src: &Str) -> String {
        let mut pairs = Vec::new();
        let mut namespaces = Vec::new();
        for specifier in specifiers {
            match specifier {
                ExportSpecifier::Named(named) if named.is_type_only => {}
                ExportSpecifier::Named(named) => {
                    let imported = export_name(&named.orig);
                    let exported = named
                        .exported
                        .as_ref()
                        .map_or_else(|| imported.clone(), export_name);
                    pairs.push((imported, exported));
                }
                ExportSpecifier::Default(default) => {
                    pairs.push(("default".to_string(), default.exported.sym.to_string()));
                }
                ExportSpecifier::Namespace(ns) => namespaces.push(export_name(&ns.name)),
            }
        }
        if pairs.is_empty() && namespaces.is_empty() {
            return String::new();
        }

        let call = self.resolution_expr(&src.value);
        let mut out = Vec::new();
        for name in &namespaces {
            out.push(format!("{} = {call};", self.export_target(name)));
        }
        if !pairs.is_empty() {
            let mut pattern = Vec::new();
            let mut assignments = Vec::new();
            for (imported, exported) in &pairs {
                let temp = format!("__reexport_{}", self.temp_counter);
                self.temp_counter += 1;
                pattern.push(format!("{}: {temp}", property_key(imported)));
                assignments.push(format!("{} = {temp};", self.export_target(exported)));
            }
            out.push(format!(
                "{{ const {{ {} }} = {call}; {} }}",
                pattern.join(", "),
                assignments.join(" ")
            ));
        }
        out.join(" ")
    }

    fn rewrite_import_meta(&mut self) {
        let mut collector = ImportMetaCollector::default();
        self.parsed.module.visit_with(&mut collector);
        for span in collector.spans {
            let (lo, hi) = (self.parsed.offset(span.lo), self.parsed.offset(span.hi));
            self.edits.replace(lo, hi, self.config.import_meta_ident.clone());
        }
    }

    /// Classify a specifier and warn about unrecognized tooling modules.
    fn check_specifier(&mut self, specifier: &str) -> Resolution {
        if self.config.is_host_native(specifier) {
            return Resolution::HostNative;
        }
        if self.config.is_unknown_tooling(specifier) {
            tracing::warn!(
                specifier,
                path = self.module_path,
                "unknown dev-server internal import; it may not load in the host"
            );
            self.diagnostics.push(TransformDiagnostic::unrecognized_internal(
                specifier,
                self.module_path,
            ));
        }
        Resolution::Generic
    }

    /// `await <resolve>("specifier")` for a re-export source.
    fn resolution_expr(&mut self, specifier: &str) -> String {
        let resolution = self.check_specifier(specifier);
        format!(
            "await {}",
            super::emit::resolution_call(self.config, resolution, specifier)
        )
    }

    /// `export function f` / `export class C` to
    /// `const f = <exports>.f = function f` and the same for classes.
    fn bind_declaration(&mut self, span: Span, name: &str) -> Result<(), TransformError> {
        let target = self.export_target(name);
        self.replace_export_keyword(span, &format!("const {name} = {target} ="))?;
        self.append_statement(span, "");
        self.has_exports = true;
        Ok(())
    }

    fn export_target(&self, name: &str) -> String {
        member_access(&self.config.exports_ident, name)
    }

    fn statement_range(&self, span: Span) -> (usize, usize) {
        (self.parsed.offset(span.lo), self.parsed.offset(span.hi))
    }

    /// Delete a statement along with the line break that ends it.
    fn remove_statement(&mut self, span: Span) {
        let (lo, hi) = self.statement_range(span);
        let rest = &self.parsed.source()[hi..self.body_len.max(hi)];
        let line_break = if rest.starts_with("\r\n") {
            2
        } else if rest.starts_with('\n') {
            1
        } else {
            0
        };
        self.edits.remove(lo, hi + line_break);
    }

    fn replace_statement(&mut self, span: Span, text: &str) {
        let (lo, hi) = self.statement_range(span);
        self.edits.replace(lo, hi, text);
    }

    /// Append `text` after a rewritten statement, terminating it first when
    /// the source relied on automatic semicolon insertion.
    fn append_statement(&mut self, span: Span, text: &str) {
        let (_, hi) = self.statement_range(span);
        let terminated = self.parsed.source()[..hi].trim_end().ends_with(';');
        let mut appended = String::new();
        if !terminated {
            appended.push(';');
        }
        if !text.is_empty() {
            appended.push(' ');
            appended.push_str(text);
        }
        if !appended.is_empty() {
            self.edits.insert(hi, appended);
        }
    }

    /// Byte range of the leading `export` keyword of a statement.
    fn export_keyword(&self, span: Span) -> Result<(usize, usize), TransformError> {
        let (lo, hi) = self.statement_range(span);
        let text = &self.parsed.source()[lo..hi];
        let start = if text.starts_with("export") {
            Some(0)
        } else {
            // Decorators may precede the keyword.
            text.find("export")
        };
        start
            .map(|start| (lo + start, lo + start + "export".len()))
            .ok_or_else(|| self.emit_error("export keyword not found"))
    }

    fn replace_export_keyword(&mut self, span: Span, text: &str) -> Result<(), TransformError> {
        let (start, end) = self.export_keyword(span)?;
        self.edits.replace(start, end, text);
        Ok(())
    }

    fn remove_export_keyword(&mut self, span: Span) -> Result<(), TransformError> {
        let (start, end) = self.export_keyword(span)?;
        let source = self.parsed.source();
        let trailing_ws = source[end..].len() - source[end..].trim_start().len();
        self.edits.remove(start, end + trailing_ws);
        Ok(())
    }

    /// Replace `export default ` with `text`.
    fn replace_default_keywords(&mut self, span: Span, text: &str) -> Result<(), TransformError> {
        let (start, end) = self.export_keyword(span)?;
        let rest = self.parsed.source()[end..].trim_start();
        let Some(after_default) = rest.strip_prefix("default") else {
            return Err(self.emit_error("default keyword not found"));
        };
        let payload = after_default.trim_start();
        let payload_start = self.parsed.source().len() - payload.len();
        self.edits.replace(start, payload_start, text);
        Ok(())
    }

    fn emit_error(&self, message: &str) -> TransformError {
        TransformError::Emit {
            path: self.module_path.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Default)]
struct ImportMetaCollector {
    spans: Vec<Span>,
}

impl Visit for ImportMetaCollector {
    fn visit_meta_prop_expr(&mut self, n: &MetaPropExpr) {
        if matches!(n.kind, MetaPropKind::ImportMeta) {
            self.spans.push(n.span);
        }
    }
}

fn is_type_only_import(specifier: &ImportSpecifier) -> bool {
    matches!(specifier, ImportSpecifier::Named(named) if named.is_type_only)
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_string(),
    }
}

/// `(local, exported)` for an entry of a source-less export list.
fn local_export_pair(specifier: &ExportSpecifier) -> Option<(String, String)> {
    match specifier {
        ExportSpecifier::Named(named) if !named.is_type_only => {
            let local = export_name(&named.orig);
            let exported = named
                .exported
                .as_ref()
                .map_or_else(|| local.clone(), export_name);
            Some((local, exported))
        }
        _ => None,
    }
}

/// Names bound at the top level of a destructuring pattern.
fn top_level_bindings(pattern: &Pat, out: &mut Vec<String>) {
    match pattern {
        Pat::Object(object) => {
            for prop in &object.props {
                let name = match prop {
                    ObjectPatProp::KeyValue(kv) => simple_binding(&kv.value),
                    ObjectPatProp::Assign(assign) => Some(assign.key.id.sym.to_string()),
                    ObjectPatProp::Rest(rest) => simple_binding(&rest.arg),
                };
                out.extend(name);
            }
        }
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                let name = match elem {
                    Pat::Rest(rest) => simple_binding(&rest.arg),
                    other => simple_binding(other),
                };
                out.extend(name);
            }
        }
        _ => {}
    }
}

fn simple_binding(pattern: &Pat) -> Option<String> {
    match pattern {
        Pat::Ident(binding) => Some(binding.id.sym.to_string()),
        Pat::Assign(assign) => match &*assign.left {
            Pat::Ident(binding) => Some(binding.id.sym.to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// Whether `name` can be used after a `.` or as a bare property key.
pub(crate) fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '$' || c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '$' || c == '_' || c.is_alphanumeric())
}

/// A JavaScript string literal for `value`.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// `object.name`, or `object["name"]` when `name` is not an identifier.
pub(crate) fn member_access(object: &str, name: &str) -> String {
    if is_identifier_name(name) {
        format!("{object}.{name}")
    } else {
        format!("{object}[{}]", js_string(name))
    }
}

/// A property key for an object pattern.
pub(crate) fn property_key(name: &str) -> String {
    if is_identifier_name(name) {
        name.to_string()
    } else {
        js_string(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::parse::parse_module;

    fn rewrite(source: &str) -> Rewritten {
        let parsed = parse_module(source, "/src/m.ts").unwrap();
        rewrite_module(&parsed, "/src/m.ts", &TransformConfig::default(), source.len()).unwrap()
    }

    #[test]
    fn test_imports_removed_and_recorded_in_order() {
        let out = rewrite(
            "import a from './a';\nimport * as ns from './ns';\nimport { x, y as z } from './xy';\nimport './side';\nrun();",
        );
        assert_eq!(out.body.trim(), "run();");
        let forms: Vec<_> = out.imports.iter().map(ImportRecord::binding_form).collect();
        assert_eq!(
            forms,
            vec![
                BindingForm::Default,
                BindingForm::Namespace,
                BindingForm::Named,
                BindingForm::SideEffectOnly
            ]
        );
        assert_eq!(
            out.imports[2].named[1],
            NamedBinding {
                imported: "y".to_string(),
                local: "z".to_string()
            }
        );
        assert!(!out.has_exports);
    }

    #[test]
    fn test_host_native_import_marked() {
        let out = rewrite("import { warn } from 'chipbox:tracing';");
        assert_eq!(out.imports[0].resolution, Resolution::HostNative);
    }

    #[test]
    fn test_type_only_imports_dropped() {
        let out = rewrite("import type { A } from './a';\nimport { type B } from './b';\nimport { type C, d } from './c';");
        assert_eq!(out.imports.len(), 1);
        assert_eq!(out.imports[0].source, "./c");
        assert_eq!(out.imports[0].named.len(), 1);
    }

    #[test]
    fn test_unknown_tooling_import_warns() {
        let out = rewrite("import '/@vite/env';\nimport '/@vite/client';");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].specifier, "/@vite/env");
        assert_eq!(out.diagnostics[0].module_path, "/src/m.ts");
        assert_eq!(out.imports.len(), 2);
    }

    #[test]
    fn test_export_function() {
        let out = rewrite("export async function* gen(a, b) { yield a + b; }");
        assert_eq!(
            out.body,
            "const gen = exports.gen = async function* gen(a, b) { yield a + b; };"
        );
        assert!(out.has_exports);
    }

    #[test]
    fn test_export_class() {
        let out = rewrite("export class Foo extends Bar { x = 1 }");
        assert_eq!(
            out.body,
            "const Foo = exports.Foo = class Foo extends Bar { x = 1 };"
        );
    }

    #[test]
    fn test_export_variables() {
        let out = rewrite("export const a = 1, b = a + 1;\nexport let c;");
        assert_eq!(
            out.body,
            "const a = exports.a = 1, b = exports.b = a + 1;\nlet c = exports.c = undefined;"
        );
    }

    #[test]
    fn test_export_object_destructuring() {
        let out = rewrite("export const { a, b: renamed, c = 3, ...rest } = f();");
        assert_eq!(
            out.body,
            "const { a, b: renamed, c = 3, ...rest } = f(); exports.a = a; exports.renamed = renamed; exports.c = c; exports.rest = rest;"
        );
    }

    #[test]
    fn test_export_array_destructuring_without_semicolon() {
        let out = rewrite("export const [first, , ...others] = list\nnext()");
        assert_eq!(
            out.body,
            "const [first, , ...others] = list; exports.first = first; exports.others = others;\nnext()"
        );
    }

    #[test]
    fn test_export_local_list() {
        let out = rewrite("const a = 1, b = 2;\nexport { a, b as c, a as 'd-e' };");
        assert_eq!(
            out.body,
            "const a = 1, b = 2;\nexports.a = a; exports.c = b; exports[\"d-e\"] = a;"
        );
    }

    #[test]
    fn test_export_list_from_source() {
        let out = rewrite("export { a, default as b } from './m';");
        assert_eq!(
            out.body,
            "{ const { a: __reexport_0, default: __reexport_1 } = await __qjs_require(\"./m\"); exports.a = __reexport_0; exports.b = __reexport_1; }"
        );
        assert!(out.imports.is_empty());
        assert!(out.has_exports);
    }

    #[test]
    fn test_export_namespace_from_source() {
        let out = rewrite("export * as utils from './utils';");
        assert_eq!(out.body, "exports.utils = await __qjs_require(\"./utils\");");
    }

    #[test]
    fn test_export_default_forms() {
        assert_eq!(rewrite("export default 40 + 2;").body, "exports.default = 40 + 2;");
        assert_eq!(
            rewrite("export default function () {}").body,
            "exports.default = function () {};"
        );
        assert_eq!(
            rewrite("export default class App {}").body,
            "const App = exports.default = class App {};"
        );
    }

    #[test]
    fn test_exported_declarations_stay_callable_locally() {
        let out = rewrite("export function f() { return 1; }\nexport const v = f();");
        assert_eq!(
            out.body,
            "const f = exports.f = function f() { return 1; };\nconst v = exports.v = f();"
        );
    }

    #[test]
    fn test_removed_statement_takes_its_line_break() {
        let out = rewrite("import a from './a';\r\nimport type { T } from './t';\nrun(a);\n");
        assert_eq!(out.body, "run(a);\n");
    }

    #[test]
    fn test_body_len_excludes_trailer() {
        let source = "import a from './a';\n//# sourceMappingURL=m.js.map";
        let parsed = parse_module(source, "/src/m.ts").unwrap();
        let out = rewrite_module(&parsed, "/src/m.ts", &TransformConfig::default(), 20).unwrap();
        assert_eq!(out.body, "");
    }

    #[test]
    fn test_export_all() {
        let out = rewrite("export * from './m';");
        assert_eq!(
            out.body,
            "Object.assign(exports, await __qjs_require(\"./m\"));"
        );
    }

    #[test]
    fn test_export_all_host_native() {
        let out = rewrite("export * from 'chipbox:render';");
        assert_eq!(
            out.body,
            "Object.assign(exports, await import(\"/@id/chipbox:render\"));"
        );
    }

    #[test]
    fn test_type_exports_erased() {
        let out = rewrite(
            "export interface A {}\nexport type B = string;\nexport type { C } from './c';\nexport declare const d: number;",
        );
        assert_eq!(out.body.trim(), "");
        assert!(!out.has_exports);
    }

    #[test]
    fn test_export_enum_keeps_local() {
        let out = rewrite("export enum Color { Red }");
        assert_eq!(out.body, "enum Color { Red }; exports.Color = Color;");
    }

    #[test]
    fn test_import_meta_replaced() {
        let out = rewrite("export function url() { return import.meta.url; }");
        assert_eq!(
            out.body,
            "const url = exports.url = function url() { return __import_meta.url; };"
        );
    }

    #[test]
    fn test_import_meta_in_exported_initializer() {
        let out = rewrite("export const hot = import.meta.hot;");
        assert_eq!(out.body, "const hot = exports.hot = __import_meta.hot;");
    }

    #[test]
    fn test_plain_statements_untouched() {
        let source = "const x = 1;\nfunction f() { return import('./lazy'); }\nf();\n";
        let out = rewrite(source);
        assert_eq!(out.body, source);
        assert!(out.imports.is_empty());
    }

    #[test]
    fn test_member_access() {
        assert_eq!(member_access("exports", "a"), "exports.a");
        assert_eq!(member_access("exports", "$_b1"), "exports.$_b1");
        assert_eq!(member_access("exports", "a-b"), "exports[\"a-b\"]");
        assert_eq!(property_key("default"), "default");
        assert_eq!(property_key("1x"), "\"1x\"");
    }
}
