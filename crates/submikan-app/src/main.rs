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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that boots the submikan subscription and
//! auto-download engine and blocks until shutdown.

use submikan_app::run_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_app().await?;
    Ok(())
}
