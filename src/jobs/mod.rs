//! Background chapter jobs
//!
//! A job probes sequentially numbered page URLs through the normal OCR path
//! so a whole chapter is cached before anyone reads it.

mod registry;
mod runner;
mod types;

pub use registry::JobRegistry;
pub use runner::{JobRunner, PageSource};
pub use types::{Job, JobIterationError, JobRequest, JobSettings, JobStatus};
