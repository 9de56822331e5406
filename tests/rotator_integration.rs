use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use wallshift::catalog::{CatalogStore, JsonCatalog};
use wallshift::clustering::{ClusterAlgorithm, KMeans};
use wallshift::config::{Configuration, PaletteConfig, RotationConfig};
use wallshift::events::{Advance, WallpaperUpdate};
use wallshift::selection::Strategy;
use wallshift::tasks::rotator;

fn write_png(path: &Path, color: [u8; 4]) {
    RgbaImage::from_pixel(8, 8, Rgba(color)).save(path).unwrap();
}

fn test_config(catalog: PathBuf) -> Configuration {
    Configuration {
        catalog,
        rotation: RotationConfig {
            strategy: Strategy::LeastUsed,
            // Long enough that only explicit advances drive the test.
            interval: Duration::from_secs(600),
        },
        palette: PaletteConfig {
            cache: true,
            max_downscale_dim: 0,
            subsample: 0,
            white_exclusion_distance: 100.0,
            algorithm: ClusterAlgorithm::Kmeans(KMeans {
                clusters: 3,
                ..KMeans::default()
            }),
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rotator_emits_updates_and_caches_palettes() {
    let dir = tempfile::tempdir().unwrap();
    let red = dir.path().join("red.png");
    let blue = dir.path().join("blue.png");
    write_png(&red, [220, 10, 10, 255]);
    write_png(&blue, [10, 10, 220, 255]);

    let catalog_path = dir.path().join("catalog.json");
    let mut catalog = JsonCatalog::open(&catalog_path).unwrap();
    catalog.add_images([red.clone(), blue.clone()], false);
    let catalog = Arc::new(Mutex::new(catalog));

    let (advance_tx, advance_rx) = mpsc::channel::<Advance>(4);
    let (update_tx, mut update_rx) = mpsc::channel::<WallpaperUpdate>(4);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(rotator::run(
        test_config(catalog_path.clone()),
        catalog.clone(),
        advance_rx,
        update_tx,
        cancel.clone(),
        true,
    ));

    // Initial rotation happens without waiting out the interval.
    let first = timeout(Duration::from_secs(5), update_rx.recv())
        .await
        .expect("timed out waiting for first update")
        .expect("update channel closed");
    assert!(first.path == red || first.path == blue);
    let expected = if first.path == red {
        [220, 10, 10]
    } else {
        [10, 10, 220]
    };
    assert_eq!(first.colors, vec![expected]);

    // The palette lands in the cache and on disk before the event goes out.
    {
        let guard = catalog.lock().unwrap();
        assert_eq!(guard.cached_colors(&first.path), Some(first.colors.clone()));
    }
    let persisted = JsonCatalog::open(&catalog_path).unwrap();
    assert_eq!(persisted.cached_colors(&first.path), Some(first.colors.clone()));
    assert_eq!(persisted.get(&first.path).unwrap().total_times_used, 1);

    // Least-used must rotate to the other image on a manual advance.
    advance_tx.send(Advance).await.unwrap();
    let second = timeout(Duration::from_secs(5), update_rx.recv())
        .await
        .expect("timed out waiting for second update")
        .expect("update channel closed");
    assert_ne!(second.path, first.path);

    cancel.cancel();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("rotator did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn preview_mode_leaves_counters_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let only = dir.path().join("only.png");
    write_png(&only, [40, 160, 90, 255]);

    let catalog_path = dir.path().join("catalog.json");
    let mut catalog = JsonCatalog::open(&catalog_path).unwrap();
    catalog.add_images([only.clone()], false);
    let catalog = Arc::new(Mutex::new(catalog));

    let (_advance_tx, advance_rx) = mpsc::channel::<Advance>(1);
    let (update_tx, mut update_rx) = mpsc::channel::<WallpaperUpdate>(1);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(rotator::run(
        test_config(catalog_path),
        catalog.clone(),
        advance_rx,
        update_tx,
        cancel.clone(),
        false,
    ));

    let update = timeout(Duration::from_secs(5), update_rx.recv())
        .await
        .expect("timed out waiting for preview update")
        .expect("update channel closed");
    assert_eq!(update.path, only);

    {
        let guard = catalog.lock().unwrap();
        let record = guard.get(&only).unwrap();
        assert_eq!(record.times_used, 0);
        assert_eq!(record.total_times_used, 0);
    }

    cancel.cancel();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("rotator did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_catalog_surfaces_as_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(Mutex::new(
        JsonCatalog::open(dir.path().join("catalog.json")).unwrap(),
    ));

    let (_advance_tx, advance_rx) = mpsc::channel::<Advance>(1);
    let (update_tx, _update_rx) = mpsc::channel::<WallpaperUpdate>(1);
    let cancel = CancellationToken::new();

    let result = rotator::run(
        test_config(dir.path().join("catalog.json")),
        catalog,
        advance_rx,
        update_tx,
        cancel,
        true,
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<wallshift::error::Error>(),
        Some(wallshift::error::Error::EmptyCatalog),
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_files_are_skipped_for_readable_ones() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.png");
    let bad = dir.path().join("bad.png");
    write_png(&good, [120, 60, 200, 255]);
    std::fs::write(&bad, b"this is not a png").unwrap();

    let catalog_path = dir.path().join("catalog.json");
    let mut catalog = JsonCatalog::open(&catalog_path).unwrap();
    catalog.add_images([good.clone(), bad.clone()], false);
    let catalog = Arc::new(Mutex::new(catalog));

    let (_advance_tx, advance_rx) = mpsc::channel::<Advance>(1);
    let (update_tx, mut update_rx) = mpsc::channel::<WallpaperUpdate>(4);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(rotator::run(
        test_config(catalog_path),
        catalog,
        advance_rx,
        update_tx,
        cancel.clone(),
        true,
    ));

    // Whichever order picks land in, only the readable file may surface.
    let update = timeout(Duration::from_secs(5), update_rx.recv())
        .await
        .expect("timed out waiting for update")
        .expect("update channel closed");
    assert_eq!(update.path, good);

    cancel.cancel();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("rotator did not stop")
        .unwrap()
        .unwrap();
}
