pub mod compiler;
pub mod config;
pub mod judge;
pub mod report;
pub mod style;
pub mod testing;
pub mod workspace;

pub use crate::config::Config;
pub use crate::judge::{Judge, JudgeError, SourceKind, Submission};
pub use crate::report::JudgeReport;
