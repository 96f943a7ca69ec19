use imgcache_cli::progress::{ProgressRenderer, ScopedUpdate, create_progress_infrastructure};
use imgcache_core::progress::ProgressUpdate;
use imgcache_core::{AssetRegistry, ImageCache};

fn scoped(scope: Option<&str>, update: ProgressUpdate) -> ScopedUpdate {
    ScopedUpdate {
        scope: scope.map(str::to_string),
        update,
    }
}

#[test]
fn test_renderer_creates_one_bar_per_scope() {
    let mut renderer = ProgressRenderer::new();

    renderer.handle_update(scoped(Some("local"), ProgressUpdate::item(1, 3, "logo-full")));
    renderer.handle_update(scoped(Some("local"), ProgressUpdate::item(2, 3, "logo-small")));
    renderer.handle_update(scoped(
        Some("remote"),
        ProgressUpdate::item(1, 1, "https://img.example.com/a.png"),
    ));
    assert_eq!(renderer.bar_count(), 2);

    renderer.handle_update(scoped(
        Some("local"),
        ProgressUpdate::Finished {
            successful: 2,
            failed: 1,
            total: 3,
        },
    ));
    renderer.handle_update(scoped(
        None,
        ProgressUpdate::Status {
            message: "done".to_string(),
        },
    ));
    renderer.finish();
}

#[test]
fn test_renderer_handles_updates_without_bars() {
    let mut renderer = ProgressRenderer::new();

    renderer.handle_update(scoped(
        None,
        ProgressUpdate::Failed {
            message: "Image preloading timed out after 30000ms".to_string(),
        },
    ));
    renderer.handle_update(scoped(
        None,
        ProgressUpdate::Finished {
            successful: 0,
            failed: 0,
            total: 0,
        },
    ));
    assert_eq!(renderer.bar_count(), 0);
    renderer.finish();
}

#[tokio::test]
async fn test_preload_all_reports_through_channel() {
    let registry = AssetRegistry::new()
        .with_asset("logo-full", "logos/logo-full.png")
        .with_asset("logo-small", "logos/logo-small.png");
    let cache = ImageCache::builder().registry(registry).build().unwrap();

    let (provider, mut rx) = create_progress_infrastructure();
    let local = vec!["logo-full".to_string(), "logo-small".to_string()];
    let remote = vec!["https://img.example.com/a.png".to_string()];

    let report = cache
        .preload_all_images(&local, &remote, provider.as_ref())
        .await
        .unwrap();
    assert_eq!(report.successful, 3);
    drop(provider);

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    let local_items = updates
        .iter()
        .filter(|u| u.scope.as_deref() == Some("local"))
        .filter(|u| matches!(u.update, ProgressUpdate::Item { .. }))
        .count();
    assert_eq!(local_items, 2);

    let last = updates.last().unwrap();
    assert_eq!(last.scope, None);
    assert_eq!(
        last.update,
        ProgressUpdate::Finished {
            successful: 3,
            failed: 0,
            total: 3,
        }
    );
}
