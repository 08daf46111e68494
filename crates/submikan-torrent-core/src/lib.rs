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

//! Torrent-client-agnostic interfaces shared across the workspace.
//!
//! The download controller and progress reconciler depend only on the
//! [`TorrentClient`] trait; `submikan-torrent-qbit` provides the concrete
//! qBittorrent WebUI implementation. Keeping the trait here (rather than in
//! the adapter crate) lets the controller be unit-tested against a stub
//! without pulling in an HTTP client.

pub mod error;
pub mod hash;
pub mod model;

use async_trait::async_trait;

pub use error::{TorrentError, TorrentResult};
pub use hash::{extract_hash_from_magnet, normalize_info_hash};
pub use model::{AddTorrentRequest, TorrentSnapshot};

/// Operations a torrent-client adapter must support.
///
/// Every method maps to one upstream WebUI call; adapters are expected to
/// normalize hashes (via [`normalize_info_hash`]) before returning them.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Add a torrent to the client. Returns `Ok(())` once the client has
    /// accepted the request; does not wait for the torrent to start.
    async fn add_torrent(&self, request: AddTorrentRequest) -> TorrentResult<()>;

    /// List torrents, optionally filtered to a single category.
    async fn list_torrents(&self, category: Option<&str>) -> TorrentResult<Vec<TorrentSnapshot>>;

    /// Fetch a single torrent's current snapshot, if the client still knows
    /// about it.
    async fn get_torrent(&self, hash: &str) -> TorrentResult<Option<TorrentSnapshot>>;

    /// Pause a torrent. Returns `false` if the client did not recognize the
    /// hash.
    async fn pause(&self, hash: &str) -> TorrentResult<bool>;

    /// Resume a paused torrent. Returns `false` if the client did not
    /// recognize the hash.
    async fn resume(&self, hash: &str) -> TorrentResult<bool>;

    /// Remove a torrent, optionally deleting its downloaded files. Returns
    /// `false` if the client did not recognize the hash.
    async fn delete(&self, hash: &str, delete_files: bool) -> TorrentResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubClient {
        added: Mutex<Vec<AddTorrentRequest>>,
    }

    #[async_trait]
    impl TorrentClient for StubClient {
        async fn add_torrent(&self, request: AddTorrentRequest) -> TorrentResult<()> {
            self.added.lock().unwrap().push(request);
            Ok(())
        }

        async fn list_torrents(
            &self,
            _category: Option<&str>,
        ) -> TorrentResult<Vec<TorrentSnapshot>> {
            Ok(Vec::new())
        }

        async fn get_torrent(&self, _hash: &str) -> TorrentResult<Option<TorrentSnapshot>> {
            Ok(None)
        }

        async fn pause(&self, _hash: &str) -> TorrentResult<bool> {
            Ok(true)
        }

        async fn resume(&self, _hash: &str) -> TorrentResult<bool> {
            Ok(true)
        }

        async fn delete(&self, _hash: &str, _delete_files: bool) -> TorrentResult<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn stub_client_records_add_requests() {
        let client = StubClient::default();
        client
            .add_torrent(AddTorrentRequest {
                url_or_magnet: "magnet:?xt=urn:btih:abc".into(),
                save_path: None,
                category: Some("anime".into()),
                paused: false,
            })
            .await
            .unwrap();
        assert_eq!(client.added.lock().unwrap().len(), 1);
    }
}
