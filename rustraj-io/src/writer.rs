//! File writers for datasets and clustering results.

use crate::palette::{trajectory_palette, Rgb, TrajectoryColor};
use crate::reader::DatasetFormat;
use crate::{Result, BINARY_MAGIC};
use ndarray::{ArrayView3, Axis};
use rustraj_algorithms::EmResult;
use rustraj_core::{Dataset, Means, Responsibilities};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct ReseedRecord {
    iteration: usize,
    cluster: usize,
    trajectory: usize,
    loss: f64,
    improvement: f64,
}

#[derive(Serialize)]
struct Report<'a> {
    trajectories: usize,
    steps: usize,
    clusters: usize,
    iterations: usize,
    converged: bool,
    total_score: f64,
    means: Vec<Vec<[f64; 2]>>,
    mean_colors: Option<Vec<Rgb>>,
    cluster_contributions: Vec<f64>,
    assignments: Vec<usize>,
    visited: &'a [usize],
    reseeds: Vec<ReseedRecord>,
}

/// Writer for datasets and EM results.
///
/// Each method writes one complete document; create one writer per file.
pub struct DataFileWriter {
    writer: BufWriter<File>,
}

impl DataFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes a dataset as `trajectory,step,x,y` rows.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_dataset_csv(&mut self, dataset: &Dataset) -> Result<()> {
        self.write_points_csv("trajectory", dataset.as_array())
    }

    /// Writes a dataset as nested JSON arrays.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_dataset_json(&mut self, dataset: &Dataset) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &nested(dataset.as_array()))?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a dataset in the binary layout.
    ///
    /// Format: `RSTRAJ01`, N (u64), T (u64), then for every point x (f64)
    /// and y (f64), all little-endian.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_dataset_binary(&mut self, dataset: &Dataset) -> Result<()> {
        self.writer.write_all(BINARY_MAGIC)?;
        self.writer.write_all(&(dataset.len() as u64).to_le_bytes())?;
        self.writer.write_all(&(dataset.steps() as u64).to_le_bytes())?;
        for value in dataset.as_array() {
            self.writer.write_all(&value.to_le_bytes())?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes means as `cluster,step,x,y` rows.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_means_csv(&mut self, means: &Means) -> Result<()> {
        self.write_points_csv("cluster", means.view())
    }

    /// Writes means as a nested array literal that [`crate::read_json`]
    /// reloads as a dataset.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_means_json(&mut self, means: &Means) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, &nested(means.view()))?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes the responsibility matrix, one row per trajectory.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_responsibilities_csv(&mut self, responsibilities: &Responsibilities) -> Result<()> {
        let header: Vec<String> = (0..responsibilities.ncols())
            .map(|m| format!("cluster_{m}"))
            .collect();
        writeln!(self.writer, "trajectory,{}", header.join(","))?;
        for (n, row) in responsibilities.axis_iter(Axis(0)).enumerate() {
            write!(self.writer, "{n}")?;
            for value in row {
                write!(self.writer, ",{value:e}")?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes per-trajectory display colours as `trajectory,r,g,b,alpha`.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_colors_csv(&mut self, colors: &[TrajectoryColor]) -> Result<()> {
        writeln!(self.writer, "trajectory,r,g,b,alpha")?;
        for (n, color) in colors.iter().enumerate() {
            let [r, g, b] = color.rgb;
            writeln!(self.writer, "{n},{r:.4},{g:.4},{b:.4},{:.2}", color.alpha)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a JSON summary of an EM run.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_report_json(&mut self, result: &EmResult) -> Result<()> {
        let report = Report {
            trajectories: result.responsibilities.nrows(),
            steps: result.means.len_of(Axis(1)),
            clusters: result.num_clusters(),
            iterations: result.iterations,
            converged: result.converged,
            total_score: result.total_score(),
            means: nested(result.means.view()),
            mean_colors: trajectory_palette(result.num_clusters()).map(|p| p.to_vec()),
            cluster_contributions: result.cluster_contributions.to_vec(),
            assignments: result.assignments(),
            visited: &result.visited,
            reseeds: result
                .reseeds
                .iter()
                .map(|event| ReseedRecord {
                    iteration: event.iteration,
                    cluster: event.cluster,
                    trajectory: event.trajectory,
                    loss: event.loss,
                    improvement: event.improvement,
                })
                .collect(),
        };
        serde_json::to_writer_pretty(&mut self.writer, &report)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn write_points_csv(&mut self, label: &str, points: ArrayView3<'_, f64>) -> Result<()> {
        writeln!(self.writer, "{label},step,x,y")?;
        for (index, trajectory) in points.outer_iter().enumerate() {
            for (step, point) in trajectory.outer_iter().enumerate() {
                writeln!(self.writer, "{index},{step},{},{}", point[0], point[1])?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes a dataset in the layout implied by the path extension.
///
/// # Errors
/// Returns an error for unknown extensions or if writing fails.
pub fn write_dataset<P: AsRef<Path>>(path: P, dataset: &Dataset) -> Result<()> {
    let format = DatasetFormat::from_path(&path)?;
    let mut writer = DataFileWriter::create(path)?;
    match format {
        DatasetFormat::Csv => writer.write_dataset_csv(dataset),
        DatasetFormat::Json => writer.write_dataset_json(dataset),
        DatasetFormat::Binary => writer.write_dataset_binary(dataset),
    }
}

fn nested(points: ArrayView3<'_, f64>) -> Vec<Vec<[f64; 2]>> {
    points
        .outer_iter()
        .map(|trajectory| {
            trajectory
                .outer_iter()
                .map(|point| [point[0], point[1]])
                .collect()
        })
        .collect()
}
