use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;

use wallshift::catalog::{CatalogStore, JsonCatalog};
use wallshift::selection::{self, Strategy};

fn catalog_with_usage(usage: &[(&str, u64)]) -> JsonCatalog {
    let mut catalog = JsonCatalog::new();
    for (path, used) in usage {
        catalog.add_images([PathBuf::from(path)], false);
        for _ in 0..*used {
            catalog.increment_usage(Path::new(path)).unwrap();
        }
    }
    catalog
}

#[test]
fn usage_weighted_frequencies_track_inverted_counters() {
    // Records at times_used 0..=5. With the window minimum at zero, repeated
    // non-incrementing picks leave the catalog untouched, so the sampling
    // distribution stays fixed for the whole run.
    let usage: Vec<(String, u64)> = (0..=5u64).map(|u| (format!("img{u}.png"), u)).collect();
    let usage_refs: Vec<(&str, u64)> = usage.iter().map(|(p, u)| (p.as_str(), *u)).collect();
    let mut catalog = catalog_with_usage(&usage_refs);
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);

    const TRIALS: usize = 120_000;
    let mut counts: BTreeMap<PathBuf, usize> = BTreeMap::new();
    for _ in 0..TRIALS {
        let chosen = selection::pick(&mut catalog, Strategy::UsageWeighted, false, &mut rng)
            .expect("catalog is non-empty");
        *counts.entry(chosen).or_default() += 1;
    }

    // Weight of a record used u times is (5 - u + 1); weights sum to 21.
    let total_weight: u64 = (0..=5u64).map(|u| 5 - u + 1).sum();
    for (path, used) in &usage_refs {
        let expected = (5 - used + 1) as f64 / total_weight as f64;
        let observed =
            *counts.get(Path::new(path)).unwrap_or(&0) as f64 / TRIALS as f64;
        assert!(
            (observed - expected).abs() < 0.02,
            "{path}: observed {observed:.4}, expected {expected:.4}",
        );
    }
}

#[test]
fn least_used_never_selects_a_non_minimal_record() {
    let mut catalog = catalog_with_usage(&[
        ("zero-a.png", 0),
        ("one.png", 1),
        ("zero-b.png", 0),
        ("three.png", 3),
    ]);
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..5_000 {
        let chosen = selection::pick(&mut catalog, Strategy::LeastUsed, false, &mut rng).unwrap();
        let name = chosen.to_string_lossy().into_owned();
        assert!(
            name.starts_with("zero-"),
            "least-used must stay inside the minimum bucket, got {name}",
        );
    }
}

#[test]
fn uniform_reaches_every_eligible_record() {
    let mut catalog = catalog_with_usage(&[("a.png", 9), ("b.png", 0), ("c.png", 4)]);
    let mut rng = StdRng::seed_from_u64(3);
    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..1_000 {
        seen.insert(selection::pick(&mut catalog, Strategy::Uniform, false, &mut rng).unwrap());
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn window_minimum_returns_to_zero_after_every_pick() {
    let mut catalog = catalog_with_usage(&[("a.png", 0), ("b.png", 0), ("c.png", 0)]);
    let mut rng = StdRng::seed_from_u64(7);

    for strategy in [Strategy::Uniform, Strategy::UsageWeighted, Strategy::LeastUsed] {
        for _ in 0..200 {
            selection::pick(&mut catalog, strategy, true, &mut rng).unwrap();
            let min_used = catalog
                .eligible_images()
                .iter()
                .map(|r| r.times_used)
                .min()
                .unwrap();
            assert_eq!(min_used, 0, "windowed counters must stay anchored");
        }
    }
}

#[test]
fn windowed_counters_stay_bounded_while_lifetime_grows() {
    // Two records: the windowed counters can never exceed the spread that
    // selection itself creates, while the lifetime ledger keeps counting.
    let mut catalog = catalog_with_usage(&[("a.png", 0), ("b.png", 0)]);
    let mut rng = StdRng::seed_from_u64(99);

    for _ in 0..1_000 {
        selection::pick(&mut catalog, Strategy::UsageWeighted, true, &mut rng).unwrap();
    }

    let records = catalog.eligible_images();
    let total: u64 = records.iter().map(|r| r.total_times_used).sum();
    assert_eq!(total, 1_000);
    for record in &records {
        assert!(
            record.times_used <= 1_000,
            "windowed counter left unbounded: {}",
            record.times_used,
        );
    }
    let min_used = records.iter().map(|r| r.times_used).min().unwrap();
    assert_eq!(min_used, 0);
}
