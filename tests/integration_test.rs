// Integration tests for courserec
use courserec_core::{
    Catalog, CatalogEntry, Error, FuzzyMetric, Outcome, Recommender, RecommenderConfig,
    SimilarityMatrix, Vectorizer,
};
use courserec_storage::{StorageConfig, StorageManager, DEFAULT_ARTIFACT_NAME};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn sample_catalog() -> Catalog {
    Catalog::from_labels(["Intro to Data Science", "Advanced Data Science", "Intro to Cooking"])
}

#[test]
fn test_exact_title_ranking() {
    let recommender = Recommender::new(sample_catalog(), RecommenderConfig::default()).unwrap();

    let outcome = recommender.recommend_by_label("Intro to Data Science", 2).unwrap();
    let labels: Vec<&str> = outcome.items().iter().map(|i| i.label.as_str()).collect();
    // Both neighbors share two tokens; the lower index wins the tie
    assert_eq!(labels, vec!["Advanced Data Science", "Intro to Cooking"]);
    assert_eq!(outcome.items()[0].rank, 1);
    assert!(outcome.items().iter().all(|i| i.label != "Intro to Data Science"));
}

#[test]
fn test_fuzzy_free_text() {
    let recommender = Recommender::new(sample_catalog(), RecommenderConfig::default()).unwrap();

    let outcome = recommender.recommend_by_free_text("data scence", 2, 0.6).unwrap();
    match outcome {
        Outcome::Found { resolved_label, fuzzy_ratio, items } => {
            assert!(resolved_label.contains("Data Science"));
            assert!(fuzzy_ratio.unwrap() >= 0.6);
            assert!(items.iter().all(|i| i.label != resolved_label));
        }
        other => panic!("expected a fuzzy match, got {:?}", other),
    }
}

#[test]
fn test_misses_are_outcomes() {
    let recommender = Recommender::new(sample_catalog(), RecommenderConfig::default()).unwrap();

    assert_eq!(
        recommender.recommend_by_label("Underwater Basket Weaving", 3).unwrap(),
        Outcome::NotFound { label: "Underwater Basket Weaving".to_string() }
    );
    let outcome = recommender.recommend_by_free_text("zzzz", 3, 0.6).unwrap();
    assert!(matches!(outcome, Outcome::NoMatch { .. }));
    assert!(matches!(outcome.into_result(), Err(Error::NoMatch(_))));
}

#[test]
fn test_alternate_fuzzy_metrics() {
    for metric in [FuzzyMetric::Levenshtein, FuzzyMetric::JaroWinkler] {
        let config = RecommenderConfig { fuzzy_metric: metric, ..RecommenderConfig::default() };
        let recommender = Recommender::new(sample_catalog(), config).unwrap();
        let outcome = recommender.recommend_by_free_text("intro to cookng", 1, 0.6).unwrap();
        assert_eq!(outcome.resolved_label(), Some("Intro to Cooking"));
    }
}

#[test]
fn test_matrix_symmetry_and_bounds() {
    let catalog = Catalog::from_labels([
        "Rust for Beginners",
        "Rust Async Programming",
        "Python for Data Analysis",
        "Data Analysis with Excel",
        "!!!",
        "Beginners Guitar",
    ]);
    let (_, vectors) = Vectorizer::new().build(&catalog.labels());
    let matrix = SimilarityMatrix::compute(&vectors);

    for i in 0..matrix.dim() {
        for j in 0..matrix.dim() {
            let s = matrix.get(i, j).unwrap();
            assert!((0.0..=1.0).contains(&s));
            assert_eq!(s.to_bits(), matrix.get(j, i).unwrap().to_bits());
        }
    }
    // Punctuation-only label has no tokens
    assert_eq!(matrix.get(4, 4), Some(0.0));
    assert_eq!(matrix.get(0, 0), Some(1.0));
}

#[test]
fn test_zero_vector_entry_is_safe() {
    let catalog = Catalog::from_labels(["Rust Basics", "???", "Rust Async"]);
    let recommender = Recommender::new(catalog, RecommenderConfig::default()).unwrap();

    let items = recommender.recommend_by_label("???", 2).unwrap().into_result().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.score == 0.0));
}

#[test]
fn test_precomputed_matrix_shape_mismatch() {
    let matrix = SimilarityMatrix::load(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 2).unwrap();
    let err = Recommender::with_matrix(sample_catalog(), matrix, RecommenderConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, Error::ShapeMismatch { expected: 3, .. }));
}

#[test]
fn test_csv_catalog_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("courses.csv");
    fs::write(
        &csv,
        "course_id,title,url,price\n\
         1,Intro to Data Science,https://example.com/1,20\n\
         2,Advanced Data Science,https://example.com/2,50\n\
         3,Intro to Cooking,https://example.com/3,0\n",
    )
    .unwrap();

    let manager = StorageManager::new(StorageConfig::new(dir.path().join("data"), &csv)).unwrap();
    let recommender = manager.open(RecommenderConfig::default()).unwrap();
    assert!(manager.artifacts().exists(DEFAULT_ARTIFACT_NAME));

    let items = recommender
        .recommend_by_label("intro to data science", 1)
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(items[0].label, "Advanced Data Science");
    assert_eq!(items[0].payload["url"], "https://example.com/2");
    assert_eq!(items[0].payload["price"], 50);

    // A new catalog invalidates the stored artifact
    fs::write(&csv, "title\nRust Basics\nRust Async\nGo Basics\nGo Async\n").unwrap();
    assert_eq!(manager.reload(&recommender).unwrap(), 1);
    assert_eq!(recommender.len(), 4);
    assert_eq!(
        manager.artifacts().describe(DEFAULT_ARTIFACT_NAME).unwrap().unwrap().dim,
        4
    );
}

#[test]
fn test_rebuild_is_atomic_for_readers() {
    // "Intro Course" is in both catalogs, so it resolves in every generation
    let first_labels = ["Rust Basics", "Rust Async", "Go Basics", "Intro Course"];
    let second_labels = [
        "Baking Bread",
        "Baking Cakes",
        "Knitting",
        "Intro Course",
        "Knitting Socks",
        "Bread Making",
    ];
    let first = Catalog::new(first_labels.iter().map(|l| CatalogEntry::new(*l)).collect());

    let recommender = Arc::new(Recommender::new(first, RecommenderConfig::default()).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let snapshot_readers = (0..2).map(|_| {
        let recommender = recommender.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let snapshot = recommender.snapshot();
                let labels = snapshot.catalog().labels();
                assert_eq!(snapshot.matrix().dim(), labels.len());
                assert!(labels == first_labels || labels == second_labels);

                let items = snapshot.recommend_index(0, 2).unwrap();
                assert!(items.iter().all(|i| labels.contains(&i.label.as_str())));
            }
        })
    });

    let label_readers = (0..4).map(|_| {
        let recommender = recommender.clone();
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let outcome = recommender.recommend_by_label("intro course", 10).unwrap();
                assert_eq!(outcome.resolved_label(), Some("Intro Course"));

                let items: Vec<&str> = outcome.items().iter().map(|i| i.label.as_str()).collect();
                let generation: &[&str] = if items.len() == first_labels.len() - 1 {
                    &first_labels
                } else {
                    assert_eq!(items.len(), second_labels.len() - 1);
                    &second_labels
                };
                assert!(items.iter().all(|label| generation.contains(label) && *label != "Intro Course"));
            }
        })
    });

    let readers: Vec<_> = snapshot_readers.chain(label_readers).collect();

    for round in 0..20 {
        let labels: &[&str] = if round % 2 == 0 { &second_labels } else { &first_labels };
        recommender.rebuild(Catalog::from_labels(labels.iter().copied())).unwrap();
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(recommender.generation(), 20);
}

#[test]
fn test_failed_rebuild_keeps_previous_snapshot() {
    let recommender = Recommender::new(sample_catalog(), RecommenderConfig::default()).unwrap();
    let empty: [&str; 0] = [];
    assert!(matches!(
        recommender.rebuild(Catalog::from_labels(empty)),
        Err(Error::EmptyCatalog)
    ));
    assert_eq!(recommender.generation(), 0);
    assert_eq!(recommender.len(), 3);
}
