//! `esbridge decode-hmr` command implementation.
//!
//! Decodes one dev-server HMR message and prints what the host would do
//! with it. Handy for checking a transport's captured traffic.

use esbridge_core::hmr::{HmrEvent, HmrMessage};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Decode result for JSON output.
#[derive(Serialize)]
struct DecodeResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<HmrEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the decode-hmr command.
pub fn run(file: Option<&Path>, json: bool) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            text
        }
    };

    let event = match HmrMessage::from_json(&text) {
        Ok(message) => message.into_event(),
        Err(e) => {
            if json {
                let result = DecodeResult {
                    ok: false,
                    event: None,
                    error: Some(e.to_string()),
                };
                println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
                std::process::exit(1);
            }
            return Err(e).into_diagnostic();
        }
    };

    if json {
        let result = DecodeResult {
            ok: true,
            event,
            error: None,
        };
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
    } else {
        for line in describe(event.as_ref()) {
            println!("{line}");
        }
    }
    Ok(())
}

/// One line per host action.
fn describe(event: Option<&HmrEvent>) -> Vec<String> {
    match event {
        Some(HmrEvent::Update { paths }) => paths.iter().map(|p| format!("update {p}")).collect(),
        Some(HmrEvent::Prune { paths }) => paths.iter().map(|p| format!("prune {p}")).collect(),
        Some(HmrEvent::FullReload) => vec!["full-reload".to_string()],
        None => vec!["none".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Vec<String> {
        let event = HmrMessage::from_json(text).unwrap().into_event();
        describe(event.as_ref())
    }

    #[test]
    fn test_describe_update() {
        let lines = decode(
            r#"{"type":"update","updates":[
                {"type":"js-update","path":"/src/a.ts","acceptedPath":"/src/a.ts","timestamp":1},
                {"type":"css-update","path":"/src/b.css","acceptedPath":"/src/b.css","timestamp":1}
            ]}"#,
        );
        assert_eq!(lines, vec!["update /src/a.ts", "update /src/b.css"]);
    }

    #[test]
    fn test_describe_prune_and_reload() {
        assert_eq!(
            decode(r#"{"type":"prune","paths":["/src/old.ts"]}"#),
            vec!["prune /src/old.ts"]
        );
        assert_eq!(decode(r#"{"type":"full-reload"}"#), vec!["full-reload"]);
        assert_eq!(decode(r#"{"type":"ping"}"#), vec!["none"]);
    }
}
