//! `esbridge watch` command implementation.
//!
//! Mirrors a source tree into an output directory of wrapped modules and
//! keeps it in sync: created or modified modules are re-transformed (an
//! `update`), removed ones have their output deleted (a `prune`).

use super::transform::url_path;
use esbridge_core::{ModuleTransformer, TransformConfig};
use esbridge_util::fs::{atomic_write, read_to_string_lossy};
use miette::{miette, IntoDiagnostic, Result};
use notify::{
    event::{CreateKind, ModifyKind, RemoveKind},
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Event coalescing window.
const COALESCE_WINDOW_MS: u64 = 50;

const MODULE_EXTENSIONS: &[&str] = &["js", "mjs", "jsx", "ts", "mts", "tsx"];

/// One synced change, for JSON output.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "lowercase")]
enum SyncReport {
    Update {
        module_path: String,
        out: String,
        cached: bool,
    },
    Prune {
        module_path: String,
    },
    Error {
        module_path: String,
        code: &'static str,
        message: String,
    },
}

/// Source root ↔ output directory mapping.
struct Mirror {
    root: PathBuf,
    out_dir: PathBuf,
    transformer: ModuleTransformer,
}

impl Mirror {
    fn module_path(&self, file: &Path) -> Option<String> {
        file.strip_prefix(&self.root).ok().map(url_path)
    }

    fn output_path(&self, file: &Path) -> Option<PathBuf> {
        file.strip_prefix(&self.root)
            .ok()
            .map(|relative| self.out_dir.join(relative).with_extension("js"))
    }

    /// Bring the output for `file` in line with the source tree.
    fn sync(&self, file: &Path) -> Option<SyncReport> {
        if !is_module_file(file) || file.starts_with(&self.out_dir) {
            return None;
        }
        let module_path = self.module_path(file)?;
        let out = self.output_path(file)?;

        if !file.exists() {
            self.transformer.invalidate(&module_path);
            match std::fs::remove_file(&out) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %out.display(), error = %e, "Failed to remove output"),
            }
            return Some(SyncReport::Prune { module_path });
        }

        let source = match read_to_string_lossy(file) {
            Ok(source) => source,
            Err(e) => {
                // Removed between the event and the read.
                debug!(path = %file.display(), error = %e, "Skipping unreadable file");
                return None;
            }
        };

        let cached = self.transformer.is_cached(&module_path, &source);
        let output = match self.transformer.transform(&source, &module_path) {
            Ok(output) => output,
            Err(err) => {
                return Some(SyncReport::Error {
                    module_path,
                    code: err.code(),
                    message: err.to_string(),
                })
            }
        };

        if !cached || !out.exists() {
            if let Err(e) = atomic_write(&out, output.code.as_bytes()) {
                error!(path = %out.display(), error = %e, "Failed to write output");
            }
        }

        Some(SyncReport::Update {
            module_path,
            out: out.display().to_string(),
            cached,
        })
    }
}

/// Whether `path` has a module extension.
fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
}

/// Check if we should process this event.
fn should_process_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
            | EventKind::Remove(RemoveKind::File | RemoveKind::Any)
    )
}

fn report(report: &SyncReport, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{line}"),
            Err(e) => error!(error = %e, "Failed to serialize report"),
        }
        return;
    }
    match report {
        SyncReport::Update {
            module_path,
            cached: false,
            ..
        } => info!(path = %module_path, "update"),
        SyncReport::Update { module_path, .. } => debug!(path = %module_path, "unchanged"),
        SyncReport::Prune { module_path } => info!(path = %module_path, "prune"),
        SyncReport::Error {
            module_path,
            message,
            ..
        } => error!(path = %module_path, "{message}"),
    }
}

/// Run the watch command until interrupted.
pub fn run(root: &Path, out_dir: &Path, config: TransformConfig, json: bool) -> Result<()> {
    if !root.is_dir() {
        return Err(miette!("watch root is not a directory: {}", root.display()));
    }
    let root = root.canonicalize().into_diagnostic()?;
    std::fs::create_dir_all(out_dir).into_diagnostic()?;
    let out_dir = out_dir.canonicalize().into_diagnostic()?;

    let mirror = Mirror {
        root,
        out_dir,
        transformer: ModuleTransformer::new(config),
    };

    // Initial full pass.
    let mut count = 0usize;
    for entry in WalkDir::new(&mirror.root)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(&mirror.out_dir))
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if let Some(r) = mirror.sync(entry.path()) {
            report(&r, json);
            count += 1;
        }
    }
    info!(root = %mirror.root.display(), modules = count, "Initial transform complete");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(watch_loop(&mirror, json))
}

async fn watch_loop(mirror: &Mirror, json: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| match res {
            Ok(event) => {
                if should_process_event(&event) {
                    if let Err(e) = tx.send(event.paths) {
                        warn!(error = %e, "Failed to send watch event");
                    }
                }
            }
            Err(e) => error!(error = %e, "Watch error"),
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    )
    .into_diagnostic()?;
    watcher
        .watch(&mirror.root, RecursiveMode::Recursive)
        .into_diagnostic()?;
    info!(root = %mirror.root.display(), "Watching directory");

    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Watcher stopped");
                return Ok(());
            }
            received = tokio::time::timeout(Duration::from_millis(COALESCE_WINDOW_MS), rx.recv()) => {
                match received {
                    Ok(Some(paths)) => pending.extend(paths),
                    Ok(None) => {
                        debug!("Watch event channel closed");
                        return Ok(());
                    }
                    Err(_) if !pending.is_empty() => {
                        debug!(count = pending.len(), "Processing coalesced file events");
                        for path in std::mem::take(&mut pending) {
                            if let Some(r) = mirror.sync(&path) {
                                report(&r, json);
                            }
                        }
                    }
                    Err(_) => {}
                }
            }
        }
    }
}
