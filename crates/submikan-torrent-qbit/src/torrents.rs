//! [`TorrentClient`] implementation backed by the qBittorrent WebUI.

use async_trait::async_trait;
use reqwest::Method;
use submikan_torrent_core::{
    AddTorrentRequest, TorrentClient, TorrentError, TorrentResult, TorrentSnapshot,
    normalize_info_hash,
};

use crate::client::QbitClient;

#[derive(serde::Deserialize)]
struct RawTorrent {
    hash: String,
    name: String,
    size: i64,
    progress: f64,
    state: String,
    dlspeed: i64,
    upspeed: i64,
    num_seeds: i32,
    num_leechs: i32,
    category: Option<String>,
    save_path: Option<String>,
    eta: Option<i64>,
    added_on: Option<i64>,
    completion_on: Option<i64>,
}

impl RawTorrent {
    fn into_snapshot(self) -> Option<TorrentSnapshot> {
        let hash = normalize_info_hash(&self.hash)?;
        Some(TorrentSnapshot {
            hash,
            name: self.name,
            size: self.size,
            progress: self.progress,
            state: self.state,
            dlspeed: self.dlspeed,
            upspeed: self.upspeed,
            num_seeds: self.num_seeds,
            num_leechs: self.num_leechs,
            category: self.category,
            save_path: self.save_path,
            eta: self.eta,
            added_on: self.added_on,
            completion_on: self.completion_on,
        })
    }
}

#[async_trait]
impl TorrentClient for QbitClient {
    async fn add_torrent(&self, request: AddTorrentRequest) -> TorrentResult<()> {
        let category = request.category.clone();
        let save_path = request.save_path.clone();
        let url_or_magnet = request.url_or_magnet.clone();
        let paused = request.paused;

        self.send_with_reauth(Method::POST, "api/v2/torrents/add", move |builder| {
            let mut form = reqwest::multipart::Form::new()
                .text("urls", url_or_magnet.clone())
                .text("autoTMM", "false")
                .text("paused", if paused { "true" } else { "false" });
            if let Some(category) = &category {
                form = form.text("category", category.clone());
            }
            if let Some(save_path) = &save_path {
                form = form.text("savepath", save_path.clone());
            }
            builder.multipart(form)
        })
        .await?;
        Ok(())
    }

    async fn list_torrents(&self, category: Option<&str>) -> TorrentResult<Vec<TorrentSnapshot>> {
        let category = category.map(ToString::to_string);
        let response = self
            .send_with_reauth(Method::GET, "api/v2/torrents/info", move |builder| {
                match &category {
                    Some(category) => builder.query(&[("category", category.as_str())]),
                    None => builder,
                }
            })
            .await?;

        let raw: Vec<RawTorrent> = response.json().await.map_err(|err| TorrentError::Rejected {
            reason: format!("failed to decode torrents/info response: {err}"),
        })?;

        Ok(raw.into_iter().filter_map(RawTorrent::into_snapshot).collect())
    }

    async fn get_torrent(&self, hash: &str) -> TorrentResult<Option<TorrentSnapshot>> {
        let Some(hash) = normalize_info_hash(hash) else {
            return Err(TorrentError::Rejected {
                reason: format!("invalid torrent hash: {hash}"),
            });
        };

        let mut snapshots = self.list_torrents(None).await?;
        Ok(snapshots
            .iter()
            .position(|snapshot| snapshot.hash == hash)
            .map(|index| snapshots.swap_remove(index)))
    }

    async fn pause(&self, hash: &str) -> TorrentResult<bool> {
        let Some(hash) = normalize_info_hash(hash) else {
            return Ok(false);
        };
        self.send_with_reauth(Method::POST, "api/v2/torrents/pause", move |builder| {
            builder.form(&[("hashes", hash.clone())])
        })
        .await?;
        Ok(true)
    }

    async fn resume(&self, hash: &str) -> TorrentResult<bool> {
        let Some(hash) = normalize_info_hash(hash) else {
            return Ok(false);
        };
        self.send_with_reauth(Method::POST, "api/v2/torrents/resume", move |builder| {
            builder.form(&[("hashes", hash.clone())])
        })
        .await?;
        Ok(true)
    }

    async fn delete(&self, hash: &str, delete_files: bool) -> TorrentResult<bool> {
        let Some(hash) = normalize_info_hash(hash) else {
            return Ok(false);
        };
        self.send_with_reauth(Method::POST, "api/v2/torrents/delete", move |builder| {
            builder.form(&[
                ("hashes", hash.clone()),
                ("deleteFiles", delete_files.to_string()),
            ])
        })
        .await?;
        Ok(true)
    }
}
