//! Racing opens against each other and against the sweep.

use std::sync::Arc;
use std::time::Duration;

use oxshare::store::ShareStore;
use oxshare::SharePolicy;
use oxshare_testkit::TestFixture;

async fn race_opens(fx: &Arc<TestFixture>, link: &str, tasks: usize) -> anyhow::Result<usize> {
    let mut handles = Vec::with_capacity(tasks);
    for _ in 0..tasks {
        let fx = fx.clone();
        let link = link.to_string();
        handles.push(tokio::spawn(async move {
            fx.manager.open_link(&link, None).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(e) => assert!(e.is_unavailable(), "unexpected error: {}", e),
        }
    }
    Ok(successes)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burn_after_read_opens_once() -> anyhow::Result<()> {
    let fx = Arc::new(TestFixture::new());
    let created = fx
        .file_share("burn.bin", &[42u8; 256], SharePolicy::new().burn_after_read())
        .await;

    assert_eq!(race_opens(&fx, &created.link, 16).await?, 1);
    assert_eq!(fx.row_count().await, 0);
    assert_eq!(fx.blob_count(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_view_limit_holds_under_contention() -> anyhow::Result<()> {
    let fx = Arc::new(TestFixture::new());

    for max_views in [1u32, 2, 5] {
        let created = fx
            .text_share("contended", SharePolicy::new().max_views(max_views))
            .await;
        let successes = race_opens(&fx, &created.link, 20).await?;
        assert_eq!(successes, max_views as usize);
        assert!(fx.shares.inner().get(&created.id).await?.is_none());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweep_racing_opens() -> anyhow::Result<()> {
    let fx = Arc::new(TestFixture::new());
    let created = fx
        .file_share(
            "race.bin",
            &[1u8; 64],
            SharePolicy::new()
                .max_views(3)
                .expires_in(Duration::from_secs(60)),
        )
        .await;

    let sweeper = {
        let fx = fx.clone();
        tokio::spawn(async move {
            for _ in 0..10 {
                fx.manager.sweep().await?;
                tokio::task::yield_now().await;
            }
            Ok::<_, oxshare::ShareError>(())
        })
    };
    let successes = race_opens(&fx, &created.link, 8).await?;
    sweeper.await??;

    assert_eq!(successes, 3);

    // Whatever the sweep missed goes once the share expires.
    fx.advance(Duration::from_secs(60));
    fx.manager.sweep().await?;
    assert_eq!(fx.row_count().await, 0);
    assert_eq!(fx.blob_count(), 0);
    Ok(())
}
