#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! submikan application composition root: subscription scheduler, feed
//! check pipeline, download controller, and progress reconciler
//! (`spec.md` §4).
//!
//! Layout: `bootstrap.rs` (process entry point), `context.rs` (shared
//! dependency bundle), `scheduler.rs`/`reconciler.rs` (background loops),
//! `pipeline.rs` (per-subscription check), `download_controller.rs`
//! (submit-then-persist), `operations.rs` (the supplemented API surface
//! from `spec.md` §6), `error.rs` (application error taxonomy).

/// Process entry point and dependency wiring.
pub mod bootstrap;
/// Shared dependency bundle.
pub mod context;
/// Submit-then-persist download submission.
pub mod download_controller;
/// Application error taxonomy.
pub mod error;
/// Supplemented API-surface operations (`spec.md` §6).
pub mod operations;
/// Per-subscription feed check pipeline.
pub mod pipeline;
/// Progress reconciler background loop.
pub mod reconciler;
/// Fair-selection scheduler background loop.
pub mod scheduler;

pub use bootstrap::run_app;
pub use context::AppContext;
pub use error::{AppError, AppResult};
