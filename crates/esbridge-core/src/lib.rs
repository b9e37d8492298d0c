#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! esbridge core.
//!
//! Two pieces live here:
//! - [`transform`]: rewrites a single ES module into an async wrapper that
//!   resolves its imports through explicit runtime calls, for script hosts
//!   without a static module linker.
//! - [`hmr`]: the per-path hot-context registry and the update/prune
//!   protocol the host runs when the dev server reports a file change.

pub mod config;
pub mod error;
pub mod hmr;
pub mod transform;
pub mod version;

pub use config::TransformConfig;
pub use error::{Error, TransformError};
pub use hmr::{
    HmrEngine, HmrEvent, HmrMessage, HmrOutcome, HotContextRegistry, HotData, HotModule,
    ModuleHost, UpdateOutcome,
};
pub use transform::{
    transform_module, BindingForm, ImportRecord, ModuleTransformer, Resolution,
    TransformDiagnostic, TransformOutput,
};
pub use version::VERSION;
