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
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! qBittorrent WebUI API adapter.
//!
//! Owns a single cookie-based session against one qBittorrent instance.
//! Authentication is lazy and serialized: the first caller to observe a
//! missing or expired cookie re-authenticates under a mutex, so concurrent
//! callers never race each other into overlapping logins.

mod client;
mod torrents;

pub use client::{QbitClient, QbitConfig};
