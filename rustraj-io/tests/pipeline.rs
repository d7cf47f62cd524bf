use ndarray::Axis;
use rustraj_algorithms::{Covariance, EmConfig, TrajectoryEm};
use rustraj_io::{
    cluster_colors, generate, read_dataset, write_dataset, DataFileWriter, MappedDatasetFile,
    SyntheticConfig, SyntheticDataset,
};
use tempfile::TempDir;

fn synthetic_with_seed(seed: u64) -> SyntheticDataset {
    generate(
        &SyntheticConfig::default()
            .with_prototypes(3)
            .with_per_prototype(12)
            .with_steps(10)
            .with_noise(1.0)
            .with_seed(seed),
    )
    .unwrap()
}

fn synthetic() -> SyntheticDataset {
    synthetic_with_seed(3)
}

/// Root-mean-square point distance between two prototypes.
fn separation(synth: &SyntheticDataset, a: usize, b: usize) -> f64 {
    let pa = synth.prototypes.index_axis(Axis(0), a);
    let pb = synth.prototypes.index_axis(Axis(0), b);
    let sq: f64 = pa.iter().zip(pb.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    (sq / pa.nrows() as f64).sqrt()
}

/// First seeded dataset whose prototypes are pairwise well apart.
fn separated_synthetic() -> SyntheticDataset {
    (0..100)
        .map(synthetic_with_seed)
        .find(|synth| {
            (0..3).all(|a| ((a + 1)..3).all(|b| separation(synth, a, b) > 15.0))
        })
        .expect("no well separated synthetic dataset among the first 100 seeds")
}

#[test]
fn test_dataset_survives_every_format() {
    let dir = TempDir::new().unwrap();
    let synth = synthetic();
    for name in ["data.csv", "data.json", "data.bin"] {
        let path = dir.path().join(name);
        write_dataset(&path, &synth.dataset).unwrap();
        let loaded = read_dataset(&path).unwrap();
        assert_eq!(loaded.len(), synth.dataset.len(), "{name}");
        assert_eq!(loaded.steps(), synth.dataset.steps(), "{name}");
        for (a, b) in loaded.as_array().iter().zip(synth.dataset.as_array().iter()) {
            assert!((a - b).abs() < 1e-9, "{name}: {a} vs {b}");
        }
    }

    let mapped = MappedDatasetFile::open(dir.path().join("data.bin")).unwrap();
    assert_eq!(mapped.trajectories(), 36);
    assert_eq!(mapped.steps(), 10);
    assert_eq!(mapped.file_size(), 24 + 36 * 10 * 16);
}

#[test]
fn test_em_recovers_synthetic_prototypes() {
    let synth = separated_synthetic();
    let config = EmConfig::new()
        .with_num_clusters(3)
        .with_covariance(Covariance::isotropic(16.0).unwrap())
        .with_outer_iterations(10)
        .with_seed(17);
    let result = TrajectoryEm::new(config).fit(&synth.dataset).unwrap();

    // Every prototype's samples share one cluster, and prototypes don't share clusters.
    let assignments = result.assignments();
    let mut cluster_of = [None; 3];
    for (&label, &cluster) in synth.labels.iter().zip(&assignments) {
        match cluster_of[label] {
            None => cluster_of[label] = Some(cluster),
            Some(existing) => assert_eq!(existing, cluster, "prototype {label} split"),
        }
    }
    let mut clusters: Vec<usize> = cluster_of.iter().map(|c| c.unwrap()).collect();
    clusters.sort_unstable();
    clusters.dedup();
    assert_eq!(clusters.len(), 3);

    for (label, cluster) in cluster_of.iter().enumerate() {
        let mean = result.means.index_axis(Axis(0), cluster.unwrap());
        let prototype = synth.prototypes.index_axis(Axis(0), label);
        for (m, p) in mean.iter().zip(prototype.iter()) {
            assert!((m - p).abs() < 1.5, "mean deviates from prototype {label}");
        }
    }
}

#[test]
fn test_results_are_written_and_reloadable() {
    let dir = TempDir::new().unwrap();
    let synth = synthetic();
    let config = EmConfig::new().with_num_clusters(3).with_seed(1);
    let result = TrajectoryEm::new(config).fit(&synth.dataset).unwrap();

    let means_path = dir.path().join("means.json");
    DataFileWriter::create(&means_path)
        .unwrap()
        .write_means_json(&result.means)
        .unwrap();
    let reloaded = read_dataset(&means_path).unwrap();
    assert_eq!(reloaded.as_array(), result.means.view());

    let report_path = dir.path().join("report.json");
    DataFileWriter::create(&report_path)
        .unwrap()
        .write_report_json(&result)
        .unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["clusters"], 3);
    assert_eq!(report["trajectories"], 36);
    assert_eq!(report["assignments"].as_array().unwrap().len(), 36);
    assert_eq!(report["mean_colors"].as_array().unwrap().len(), 3);

    let colors_path = dir.path().join("colors.csv");
    let colors = cluster_colors(&result.responsibilities);
    DataFileWriter::create(&colors_path)
        .unwrap()
        .write_colors_csv(&colors)
        .unwrap();
    let content = std::fs::read_to_string(&colors_path).unwrap();
    assert_eq!(content.lines().count(), 37);
}
