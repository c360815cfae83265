//! Record loading: result file format, decoding and filesystem access.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{EvalRecord, RecordSource, ResultFile, MISSING_RANK};
pub use repo_fs::FsRecordRepo;
