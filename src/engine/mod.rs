// Job-generation and dispatch engine, independent of the CLI

pub mod batch;
pub mod core;
pub mod error;
pub mod worker;

pub use batch::{
    BatchConfig, PreparedBatch, execute_batch, prepare_batch, run_batch, run_batch_with,
};
pub use self::core::*;
pub use error::{JobError, MirrorError};
