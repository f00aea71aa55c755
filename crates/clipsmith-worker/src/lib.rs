//! Job coordination and the production pipeline for Clipsmith.

pub mod coordinator;
pub mod error;
pub mod job;
pub mod pipeline;

pub use coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorError, JobProcessor, ProcessOutcome,
};
pub use error::{WorkerError, WorkerResult};
pub use job::{JobEntry, JobRecord};
pub use pipeline::Pipeline;
