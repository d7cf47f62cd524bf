//! rustraj-core: Core types for 2-D trajectory clustering.
//!
//! This crate provides the data model shared by the EM clustering pipeline:
//! the trajectory dataset, the observation covariance, the visited-seed set,
//! run configuration and the error taxonomy.
//!

pub mod config;
pub mod covariance;
pub mod error;
pub mod trajectory;
pub mod visited;

pub use config::{DegeneratePolicy, EmConfig};
pub use covariance::Covariance;
pub use error::{Error, Result};
pub use trajectory::{Dataset, Means, Responsibilities, TrajectoryView};
pub use visited::VisitedSet;
