//! rustraj-io: Dataset and result I/O for rustraj.
//!
//! This crate loads trajectory datasets (CSV, JSON, and a memory-mapped
//! binary layout), writes clustering results, generates synthetic datasets,
//! and assigns display colours to clusters for external plotting.
//!

mod error;
pub mod palette;
mod reader;
pub mod synthetic;
mod writer;

pub use error::{Error, Result};
pub use palette::{cluster_colors, generate_palette, trajectory_palette, Rgb, TrajectoryColor};
pub use reader::{read_csv, read_dataset, read_json, DatasetFormat, MappedDatasetFile};
pub use synthetic::{generate, SyntheticConfig, SyntheticDataset};
pub use writer::{write_dataset, DataFileWriter};

/// Magic bytes opening a binary trajectory file.
pub const BINARY_MAGIC: &[u8; 8] = b"RSTRAJ01";

/// Size of the binary header: magic, N and T as little-endian u64.
pub const BINARY_HEADER_LEN: usize = 24;
