//! `esbridge transform` command implementation.

use esbridge_core::{ModuleTransformer, TransformConfig, TransformDiagnostic};
use esbridge_util::fs::{atomic_write, read_to_string_lossy};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::path::{Component, Path};

/// Transform result for JSON output.
#[derive(Serialize)]
struct TransformResult<'a> {
    ok: bool,
    module_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    out: Option<String>,
    diagnostics: &'a [TransformDiagnostic],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<TransformErrorInfo>,
}

#[derive(Serialize)]
struct TransformErrorInfo {
    code: &'static str,
    message: String,
}

/// Run the transform command.
pub fn run(
    file: &Path,
    module_path: Option<&str>,
    out: Option<&Path>,
    config: &TransformConfig,
    json: bool,
) -> Result<()> {
    let source = read_to_string_lossy(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", file.display()))?;

    let module_path = match module_path {
        Some(path) => path.to_string(),
        None => {
            let cwd = std::env::current_dir().into_diagnostic()?;
            default_module_path(file, &cwd)
        }
    };

    let transformer = ModuleTransformer::new(config.clone());
    let output = match transformer.transform(&source, &module_path) {
        Ok(output) => output,
        Err(err) => {
            if json {
                let result = TransformResult {
                    ok: false,
                    module_path: &module_path,
                    code: None,
                    out: None,
                    diagnostics: &[],
                    error: Some(TransformErrorInfo {
                        code: err.code(),
                        message: err.to_string(),
                    }),
                };
                print_json(&result)?;
            } else {
                eprintln!("error[{}]: {err}", err.code());
            }
            std::process::exit(1);
        }
    };

    if let Some(out) = out {
        atomic_write(out, output.code.as_bytes())
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {}", out.display()))?;
    }

    if json {
        let result = TransformResult {
            ok: true,
            module_path: &module_path,
            code: out.is_none().then_some(output.code.as_str()),
            out: out.map(|p| p.display().to_string()),
            diagnostics: &output.diagnostics,
            error: None,
        };
        print_json(&result)?;
    } else {
        if out.is_none() {
            print!("{}", output.code);
        }
        for diagnostic in &output.diagnostics {
            eprintln!("warning[{}]: {}", diagnostic.code, diagnostic.message);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{text}");
    Ok(())
}

/// `/` + `file` relative to `cwd`, with forward slashes.
///
/// Files outside `cwd` keep their own normalized path.
pub fn default_module_path(file: &Path, cwd: &Path) -> String {
    let absolute = if file.is_absolute() {
        file.to_path_buf()
    } else {
        cwd.join(file)
    };
    let relative = absolute.strip_prefix(cwd).unwrap_or(&absolute);
    url_path(relative)
}

/// Join the normal components of `path` into a `/`-rooted URL path.
pub fn url_path(path: &Path) -> String {
    let mut url = String::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                url.push('/');
                url.push_str(&part.to_string_lossy());
            }
            Component::ParentDir => {
                if let Some(idx) = url.rfind('/') {
                    url.truncate(idx);
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    if url.is_empty() {
        url.push('/');
    }
    url
}
