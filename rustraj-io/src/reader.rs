//! Dataset readers.
//!
//! Three layouts are supported:
//! - CSV with a `trajectory,step,x,y` header, one row per point;
//! - JSON nested arrays `[[[x, y], ...], ...]`;
//! - a binary layout (`RSTRAJ01`, N, T, then N·T·2 little-endian f64)
//!   read through a memory map.

use crate::{Error, Result, BINARY_HEADER_LEN, BINARY_MAGIC};
use memmap2::Mmap;
use ndarray::Array3;
use rustraj_core::Dataset;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

const CSV_HEADER: [&str; 4] = ["trajectory", "step", "x", "y"];

/// On-disk dataset layout, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    /// `trajectory,step,x,y` rows.
    Csv,
    /// Nested JSON arrays.
    Json,
    /// Memory-mapped binary.
    Binary,
}

impl DatasetFormat {
    /// Infers the format from the path extension (`csv`, `json`, `bin`/`traj`).
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] for unknown or missing extensions.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            Some("bin" | "traj") => Ok(Self::Binary),
            _ => Err(Error::InvalidFormat(format!(
                "cannot infer dataset format of {}",
                path.as_ref().display()
            ))),
        }
    }
}

/// Reads a dataset, picking the layout from the file extension.
///
/// # Errors
/// Returns an error if the file cannot be read or is malformed.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    match DatasetFormat::from_path(&path)? {
        DatasetFormat::Csv => read_csv(BufReader::new(File::open(path)?)),
        DatasetFormat::Json => read_json(BufReader::new(File::open(path)?)),
        DatasetFormat::Binary => MappedDatasetFile::open(path)?.to_dataset(),
    }
}

/// Parses `trajectory,step,x,y` rows.
///
/// Rows must be grouped by trajectory, trajectories numbered from 0 and
/// steps numbered from 0 within each trajectory.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] on a bad header, unparsable or
/// non-finite fields, out-of-order rows or trajectories of unequal length.
pub fn read_csv<R: BufRead>(reader: R) -> Result<Dataset> {
    let mut lines = reader.lines().enumerate();
    let header = match lines.next() {
        Some((_, line)) => line?,
        None => return Err(Error::InvalidFormat("empty CSV input".to_string())),
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    if columns != CSV_HEADER {
        return Err(Error::InvalidFormat(format!(
            "expected CSV header '{}', found '{header}'",
            CSV_HEADER.join(",")
        )));
    }

    let mut trajectories: Vec<Vec<[f64; 2]>> = Vec::new();
    for (index, line) in lines {
        let line = line?;
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(Error::InvalidFormat(format!(
                "line {line_no}: expected 4 fields, found {}",
                fields.len()
            )));
        }
        let trajectory: usize = parse_field(fields[0], "trajectory", line_no)?;
        let step: usize = parse_field(fields[1], "step", line_no)?;
        let x = parse_coordinate(fields[2], "x", line_no)?;
        let y = parse_coordinate(fields[3], "y", line_no)?;

        if trajectory == trajectories.len() {
            trajectories.push(Vec::new());
        } else if trajectory + 1 != trajectories.len() {
            return Err(Error::InvalidFormat(format!(
                "line {line_no}: trajectory {trajectory} out of order"
            )));
        }
        let current = trajectories
            .last_mut()
            .ok_or_else(|| Error::InvalidFormat(format!("line {line_no}: no trajectory")))?;
        if step != current.len() {
            return Err(Error::InvalidFormat(format!(
                "line {line_no}: expected step {}, found {step}",
                current.len()
            )));
        }
        current.push([x, y]);
    }

    assemble(&trajectories)
}

/// Parses a nested `[[[x, y], ...], ...]` array.
///
/// # Errors
/// Returns [`Error::Json`] for invalid JSON and [`Error::InvalidFormat`] for
/// empty or ragged input.
pub fn read_json<R: Read>(reader: R) -> Result<Dataset> {
    let trajectories: Vec<Vec<[f64; 2]>> = serde_json::from_reader(reader)?;
    assemble(&trajectories)
}

fn parse_field<T: std::str::FromStr>(field: &str, name: &str, line_no: usize) -> Result<T> {
    field
        .parse()
        .map_err(|_| Error::InvalidFormat(format!("line {line_no}: invalid {name} '{field}'")))
}

fn parse_coordinate(field: &str, name: &str, line_no: usize) -> Result<f64> {
    let value: f64 = parse_field(field, name, line_no)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidFormat(format!(
            "line {line_no}: non-finite {name} '{field}'"
        )))
    }
}

fn assemble(trajectories: &[Vec<[f64; 2]>]) -> Result<Dataset> {
    let Some(first) = trajectories.first() else {
        return Err(Error::InvalidFormat("no trajectories".to_string()));
    };
    if first.is_empty() {
        return Err(Error::InvalidFormat("trajectory 0 has no points".to_string()));
    }
    if let Some((index, ragged)) = trajectories
        .iter()
        .enumerate()
        .find(|(_, t)| t.len() != first.len())
    {
        return Err(Error::InvalidFormat(format!(
            "trajectory {index} has {} steps, expected {}",
            ragged.len(),
            first.len()
        )));
    }
    Ok(Dataset::from_trajectories(trajectories)?)
}

/// A memory-mapped binary trajectory file.
pub struct MappedDatasetFile {
    mmap: Mmap,
    path: PathBuf,
    trajectories: usize,
    steps: usize,
}

impl MappedDatasetFile {
    /// Maps a binary trajectory file and validates its header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped, the magic is wrong or
    /// the payload size does not match the header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        let bytes = &mmap[..];
        if bytes.len() < BINARY_HEADER_LEN || &bytes[..8] != BINARY_MAGIC {
            return Err(Error::InvalidFormat(format!(
                "{} is not a binary trajectory file",
                path.as_ref().display()
            )));
        }
        let trajectories = read_u64(&bytes[8..16])?;
        let steps = read_u64(&bytes[16..24])?;
        let expected = trajectories
            .checked_mul(steps)
            .and_then(|points| points.checked_mul(16))
            .and_then(|payload| payload.checked_add(BINARY_HEADER_LEN))
            .ok_or_else(|| Error::InvalidFormat("header dimensions overflow".to_string()))?;
        if bytes.len() != expected {
            return Err(Error::InvalidFormat(format!(
                "expected {expected} bytes for {trajectories}x{steps} trajectories, found {}",
                bytes.len()
            )));
        }

        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
            trajectories,
            steps,
        })
    }

    /// Number of trajectories in the header.
    #[must_use]
    pub fn trajectories(&self) -> usize {
        self.trajectories
    }

    /// Steps per trajectory in the header.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Path the file was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.mmap.len()
    }

    /// Decodes the payload into a dataset.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if a decoded coordinate is NaN or
    /// infinite, and a core error if the header describes an empty dataset.
    pub fn to_dataset(&self) -> Result<Dataset> {
        let values: Vec<f64> = self.mmap[BINARY_HEADER_LEN..]
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            let point = index / 2;
            return Err(Error::InvalidFormat(format!(
                "non-finite coordinate in trajectory {} at step {}",
                point / self.steps,
                point % self.steps
            )));
        }
        let data = Array3::from_shape_vec((self.trajectories, self.steps, 2), values)
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        Ok(Dataset::new(data)?)
    }
}

fn read_u64(bytes: &[u8]) -> Result<usize> {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    usize::try_from(u64::from_le_bytes(raw))
        .map_err(|_| Error::InvalidFormat("header value exceeds usize".to_string()))
}
