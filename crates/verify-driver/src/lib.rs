//! Verification sessions: load files, scan, compile, match, report.

mod error;
mod report;
mod session;

pub use error::VerifyError;
pub use report::{FailureEntry, JsonReport, MatchEntry, Status};
pub use session::{Session, Target, Verified};
