//! DTOs exchanged with a torrent-client adapter.

use serde::{Deserialize, Serialize};

/// Request to add a new torrent to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTorrentRequest {
    /// Magnet URI or direct `.torrent` URL.
    pub url_or_magnet: String,
    /// Destination directory override; falls back to the client's default.
    pub save_path: Option<String>,
    /// Category label applied to the added torrent.
    pub category: Option<String>,
    /// Whether the torrent should be added in a paused state.
    pub paused: bool,
}

/// Point-in-time view of a torrent as reported by the client.
///
/// `hash` is always the uppercase 40-character hex info-hash; adapters
/// normalize whatever case the underlying client returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentSnapshot {
    /// Uppercase hex info-hash.
    pub hash: String,
    /// Display name reported by the client.
    pub name: String,
    /// Total size in bytes.
    pub size: i64,
    /// Completion fraction in the range `0.0..=1.0`.
    pub progress: f64,
    /// Raw client-reported state string (e.g. `"downloading"`, `"pausedDL"`).
    pub state: String,
    /// Download speed in bytes per second.
    pub dlspeed: i64,
    /// Upload speed in bytes per second.
    pub upspeed: i64,
    /// Number of connected seeds.
    pub num_seeds: i32,
    /// Number of connected leechers.
    pub num_leechs: i32,
    /// Category label assigned to the torrent.
    pub category: Option<String>,
    /// Filesystem path the torrent is saving into.
    pub save_path: Option<String>,
    /// Estimated seconds remaining, when known.
    pub eta: Option<i64>,
    /// Unix timestamp the torrent was added.
    pub added_on: Option<i64>,
    /// Unix timestamp the torrent completed, when known.
    pub completion_on: Option<i64>,
}
