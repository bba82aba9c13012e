//! Lifecycle behavior when the stores misbehave.

use std::time::Duration;

use oxshare::store::ShareStore;
use oxshare::{Payload, ShareConfig, ShareError, SharePolicy};
use oxshare_testkit::{TestFixture, ALWAYS};

#[tokio::test]
async fn test_failed_blob_delete_is_orphaned_then_swept() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx
        .file_share("a.bin", &[1, 2, 3], SharePolicy::new().burn_after_read())
        .await;

    fx.blobs.fail_deletes(3);
    let opened = fx.manager.open_link(&created.link, None).await?;
    assert!(opened.destroyed);
    assert_eq!(fx.blobs.delete_attempts(), 3);

    // Row is gone, blob is still there and logged.
    assert_eq!(fx.row_count().await, 0);
    assert_eq!(fx.blob_count(), 1);
    assert_eq!(fx.shares.inner().orphans().await?.len(), 1);

    let report = fx.manager.sweep().await?;
    assert_eq!(report.orphans_purged, 1);
    assert_eq!(report.deferred, 0);
    assert_eq!(fx.blob_count(), 0);
    assert!(fx.shares.inner().orphans().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_blob_delete_retry_succeeds_within_attempts() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx
        .file_share("a.bin", &[1, 2, 3], SharePolicy::new().max_views(1))
        .await;

    fx.blobs.fail_deletes(2);
    fx.manager.open_link(&created.link, None).await?;

    assert_eq!(fx.blobs.delete_attempts(), 3);
    assert_eq!(fx.blob_count(), 0);
    assert!(fx.shares.inner().orphans().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_undeletable_orphan_is_deferred() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx
        .file_share(
            "b.bin",
            &[4, 5, 6],
            SharePolicy::new().expires_in(Duration::from_secs(60)),
        )
        .await;

    fx.blobs.fail_deletes(ALWAYS);
    fx.advance(Duration::from_secs(60));

    let report = fx.manager.sweep().await?;
    assert_eq!(report.deleted, 1);
    assert_eq!(report.orphaned, 1);
    assert_eq!(report.deferred, 1);
    assert!(fx.shares.inner().get(&created.id).await?.is_none());

    let report = fx.manager.sweep().await?;
    assert_eq!(report.deleted, 0);
    assert_eq!(report.deferred, 1);

    fx.blobs.fail_deletes(0);
    let report = fx.manager.sweep().await?;
    assert_eq!(report.orphans_purged, 1);
    assert_eq!(fx.blob_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_insert_removes_blob() {
    let fx = TestFixture::new();
    fx.shares.fail_inserts(1);

    let err = fx
        .manager
        .create(Payload::file("c.bin", vec![7u8; 32]), SharePolicy::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ShareError::StorageFailure(_)));
    assert!(err.is_retryable());
    assert_eq!(fx.row_count().await, 0);
    assert_eq!(fx.blob_count(), 0);
}

#[tokio::test]
async fn test_failed_put_stores_nothing() {
    let fx = TestFixture::new();
    fx.blobs.fail_puts(1);

    let err = fx
        .manager
        .create(Payload::file("d.bin", vec![7u8; 32]), SharePolicy::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ShareError::StorageFailure(_)));
    assert_eq!(fx.row_count().await, 0);
    assert_eq!(fx.blob_count(), 0);
}

#[tokio::test]
async fn test_storage_read_failure_is_not_a_view() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx
        .file_share("e.bin", &[9u8; 16], SharePolicy::new().max_views(1))
        .await;

    fx.shares.fail_gets(1);
    let err = fx.manager.open_link(&created.link, None).await.unwrap_err();
    assert!(matches!(err, ShareError::StorageFailure(_)));

    fx.blobs.fail_gets(1);
    let err = fx.manager.open_link(&created.link, None).await.unwrap_err();
    assert!(matches!(err, ShareError::StorageFailure(_)));

    let record = fx.shares.inner().get(&created.id).await?.unwrap();
    assert_eq!(record.view_count, 0);

    let opened = fx.manager.open_link(&created.link, None).await?;
    assert!(opened.destroyed);
    Ok(())
}

#[tokio::test]
async fn test_conflicts_are_retried() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx.text_share("contested", SharePolicy::new().max_views(2)).await;

    fx.shares.force_conflicts(3);
    let opened = fx.manager.open_link(&created.link, None).await?;
    assert_eq!(opened.view_count, 1);
    assert!(!opened.destroyed);
    Ok(())
}

#[tokio::test]
async fn test_endless_conflicts_exhaust_retries() -> anyhow::Result<()> {
    let fx = TestFixture::with_config(ShareConfig {
        update_retries: 2,
        ..ShareConfig::default()
    });
    let created = fx.text_share("contested", SharePolicy::new().max_views(2)).await;

    fx.shares.force_conflicts(ALWAYS);
    let err = fx.manager.open_link(&created.link, None).await.unwrap_err();
    assert!(matches!(err, ShareError::StorageFailure(_)));
    assert!(err.is_retryable());

    let record = fx.shares.inner().get(&created.id).await?.unwrap();
    assert_eq!(record.view_count, 0);

    fx.shares.force_conflicts(0);
    let opened = fx.manager.open_link(&created.link, None).await?;
    assert_eq!(opened.view_count, 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_update_is_not_a_view() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx.text_share("once", SharePolicy::new().burn_after_read()).await;

    fx.shares.fail_updates(1);
    let err = fx.manager.open_link(&created.link, None).await.unwrap_err();
    assert!(matches!(err, ShareError::StorageFailure(_)));

    let opened = fx.manager.open_link(&created.link, None).await?;
    assert_eq!(opened.content.as_text(), Some("once"));
    assert!(opened.destroyed);
    Ok(())
}

#[tokio::test]
async fn test_consumed_row_left_behind_is_destroyed_on_open() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx
        .file_share("f.bin", &[3u8; 8], SharePolicy::new().burn_after_read())
        .await;

    fx.shares.fail_deletes(1);
    let opened = fx.manager.open_link(&created.link, None).await?;
    assert!(opened.destroyed);

    // The consume landed, so the content is unreachable even though the row stayed.
    let record = fx.shares.inner().get(&created.id).await?.unwrap();
    assert!(record.consumed);
    let err = fx.manager.open_link(&created.link, None).await.unwrap_err();
    assert!(err.is_unavailable());

    assert_eq!(fx.row_count().await, 0);
    assert_eq!(fx.blob_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_consumed_row_removed_by_sweep() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx.text_share("gone", SharePolicy::new().max_views(1)).await;

    fx.shares.fail_deletes(1);
    fx.manager.open_link(&created.link, None).await?;
    assert_eq!(fx.row_count().await, 1);

    let report = fx.manager.sweep().await?;
    assert_eq!(report.deleted, 1);
    assert_eq!(fx.row_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_unrecordable_orphan_still_destroys_share() -> anyhow::Result<()> {
    let fx = TestFixture::new();
    let created = fx
        .file_share("g.bin", &[5u8; 8], SharePolicy::new().burn_after_read())
        .await;

    fx.blobs.fail_deletes(ALWAYS);
    fx.shares.fail_orphan_writes(1);

    let opened = fx.manager.open_link(&created.link, None).await?;
    assert!(opened.destroyed);
    assert_eq!(fx.row_count().await, 0);
    assert!(fx.shares.inner().orphans().await?.is_empty());
    Ok(())
}
