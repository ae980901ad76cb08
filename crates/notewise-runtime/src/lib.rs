//! Notewise Runtime — background note and quiz runs.
//!
//! Each run is a job in the [`JobStore`]. The job's cell is the run's event
//! sink, so polling a job id reads live progress without touching the run.

pub mod jobs;
pub mod types;
pub mod workers;

pub use jobs::{JobCell, JobStore, MAX_FINISHED_JOBS};
pub use types::*;
pub use workers::{run_folder_name, SpawnedJob, Workers};
