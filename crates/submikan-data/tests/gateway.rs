use std::future::Future;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use submikan_data::models::{
    DownloadSource, DownloadStatus, FeedCacheHeader, FeedCacheItem, NewDownloadHistoryRow,
    ProgressUpdate, SubgroupMappingEntry,
};
use submikan_data::Gateway;
use submikan_test_support::start_postgres;

async fn with_gateway<F, Fut>(test: F) -> Result<()>
where
    F: FnOnce(Gateway) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let Ok(database) = start_postgres() else {
        eprintln!("skipping gateway tests: no postgres available in this environment");
        return Ok(());
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database.connection_string())
        .await
        .context("failed to connect to ephemeral postgres")?;

    let gateway = Gateway::new(pool.clone())
        .await
        .context("failed to run migrations")?;

    let result = test(gateway).await;
    pool.close().await;
    result
}

#[tokio::test]
async fn ensure_subscription_is_idempotent() -> Result<()> {
    with_gateway(|gateway| async move {
        let first = gateway
            .subscriptions
            .ensure_subscription(4242, "Test Anime", "mikan-4242")
            .await?;
        let second = gateway
            .subscriptions
            .ensure_subscription(4242, "Test Anime", "mikan-4242")
            .await?;
        assert_eq!(first.id, second.id);

        let by_bangumi_id = gateway
            .subscriptions
            .get_by_bangumi_id(4242)
            .await?
            .expect("subscription exists");
        assert_eq!(by_bangumi_id.id, first.id);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn manual_sentinel_is_seeded_and_reused() -> Result<()> {
    with_gateway(|gateway| async move {
        let sentinel = gateway.subscriptions.ensure_manual_sentinel().await?;
        assert!(sentinel.is_manual_sentinel());
        assert_eq!(sentinel.bangumi_id, -1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn insert_if_absent_is_idempotent_on_conflict() -> Result<()> {
    with_gateway(|gateway| async move {
        let sentinel = gateway.subscriptions.ensure_manual_sentinel().await?;
        let new_row = NewDownloadHistoryRow {
            subscription_id: sentinel.id,
            torrent_url: "https://example.com/a.torrent".into(),
            torrent_hash: "A".repeat(40),
            title: "Test Torrent".into(),
            file_size: Some(1024),
            status: DownloadStatus::Pending,
            source: DownloadSource::Manual,
            anime_bangumi_id: None,
            anime_mikan_bangumi_id: None,
            anime_title: None,
            save_path: None,
            category: None,
            published_at: Some(Utc::now()),
            error_message: None,
        };

        let first = gateway
            .download_history
            .insert_if_absent(new_row.clone())
            .await?;
        let second = gateway.download_history.insert_if_absent(new_row).await?;
        assert_eq!(first.id, second.id);

        let rows = gateway
            .download_history
            .list_by_subscription(sentinel.id)
            .await?;
        assert_eq!(rows.len(), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn batch_exists_by_hashes_is_a_single_query() -> Result<()> {
    with_gateway(|gateway| async move {
        let sentinel = gateway.subscriptions.ensure_manual_sentinel().await?;
        let hash = "B".repeat(40);
        gateway
            .download_history
            .insert_if_absent(NewDownloadHistoryRow {
                subscription_id: sentinel.id,
                torrent_url: "https://example.com/b.torrent".into(),
                torrent_hash: hash.clone(),
                title: "Existing".into(),
                file_size: None,
                status: DownloadStatus::Pending,
                source: DownloadSource::Manual,
                anime_bangumi_id: None,
                anime_mikan_bangumi_id: None,
                anime_title: None,
                save_path: None,
                category: None,
                published_at: None,
                error_message: None,
            })
            .await?;

        let other_hash = "C".repeat(40);
        let found = gateway
            .download_history
            .batch_exists_by_hashes(&[hash.clone(), other_hash.clone()])
            .await?;
        assert!(found.contains(&hash));
        assert!(!found.contains(&other_hash));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn update_progress_batch_clamps_completed_progress() -> Result<()> {
    with_gateway(|gateway| async move {
        let sentinel = gateway.subscriptions.ensure_manual_sentinel().await?;
        let hash = "D".repeat(40);
        gateway
            .download_history
            .insert_if_absent(NewDownloadHistoryRow {
                subscription_id: sentinel.id,
                torrent_url: "https://example.com/d.torrent".into(),
                torrent_hash: hash.clone(),
                title: "Progressing".into(),
                file_size: None,
                status: DownloadStatus::Downloading,
                source: DownloadSource::Manual,
                anime_bangumi_id: None,
                anime_mikan_bangumi_id: None,
                anime_title: None,
                save_path: None,
                category: None,
                published_at: None,
                error_message: None,
            })
            .await?;

        gateway
            .download_history
            .update_progress_batch(&[ProgressUpdate {
                torrent_hash: hash.clone(),
                status: DownloadStatus::Completed,
                progress: 99.9,
                download_speed: 0,
                eta: None,
                num_seeds: 3,
                num_leechers: 0,
                error_message: None,
            }])
            .await?;

        let row = gateway
            .download_history
            .find_by_hash(&hash)
            .await?
            .expect("row exists");
        assert_eq!(row.status, DownloadStatus::Completed);
        assert!((row.progress - 100.0).abs() < f64::EPSILON);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn subgroup_mapping_sync_clears_on_empty_successful_fetch() -> Result<()> {
    with_gateway(|gateway| async move {
        let mikan_id = "mikan-sub-1";
        let initial = vec![SubgroupMappingEntry {
            mikan_bangumi_id: mikan_id.into(),
            subgroup_id: "233".into(),
            subgroup_name: "Some Subs".into(),
        }];
        gateway
            .subgroup_mapping
            .sync(mikan_id, &initial, true)
            .await?;
        assert_eq!(gateway.subgroup_mapping.list(mikan_id).await?.len(), 1);

        gateway.subgroup_mapping.sync(mikan_id, &[], true).await?;
        assert!(gateway.subgroup_mapping.list(mikan_id).await?.is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn subgroup_mapping_sync_preserves_on_failed_fetch() -> Result<()> {
    with_gateway(|gateway| async move {
        let mikan_id = "mikan-sub-2";
        let initial = vec![SubgroupMappingEntry {
            mikan_bangumi_id: mikan_id.into(),
            subgroup_id: "233".into(),
            subgroup_name: "Some Subs".into(),
        }];
        gateway
            .subgroup_mapping
            .sync(mikan_id, &initial, true)
            .await?;

        gateway.subgroup_mapping.sync(mikan_id, &[], false).await?;
        assert_eq!(gateway.subgroup_mapping.list(mikan_id).await?.len(), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn feed_cache_replace_is_atomic_per_refresh() -> Result<()> {
    with_gateway(|gateway| async move {
        let mikan_id = "mikan-feed-1";
        let header = FeedCacheHeader {
            mikan_bangumi_id: mikan_id.into(),
            season_name: Some("Season 1".into()),
            latest_episode: Some(2),
            latest_published_at: Some(Utc::now()),
            latest_title: Some("Episode 2".into()),
            episode_offset: 0,
            updated_at: Utc::now(),
        };
        let items = vec![FeedCacheItem {
            title: "[Group] Show - 02 [1080p]".into(),
            torrent_url: "https://example.com/02.torrent".into(),
            magnet_link: None,
            torrent_hash: Some("E".repeat(40)),
            can_download: true,
            file_size: Some(500),
            formatted_size: Some("500 B".into()),
            published_at: Some(Utc::now()),
            resolution: Some("1080p".into()),
            subgroup: Some("Group".into()),
            subtitle_type: None,
            episode: Some(2),
            is_collection: false,
        }];
        gateway.feed_cache.replace(&header, &items).await?;

        let stored_items = gateway.feed_cache.get_items(mikan_id).await?;
        assert_eq!(stored_items.len(), 1);

        gateway.feed_cache.replace(&header, &[]).await?;
        assert!(gateway.feed_cache.get_items(mikan_id).await?.is_empty());
        Ok(())
    })
    .await
}
