//! Run history
//!
//! Every pipeline run appends one `RunRecord` to `history.jsonl` in the
//! backup folder, giving a local trail of what happened even when email
//! notifications are not configured.

mod logger;
mod record;

pub use logger::RunHistory;
pub use record::{RunRecord, RunStatus};
