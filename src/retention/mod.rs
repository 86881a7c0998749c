//! Group-wise retention of execution requests.
//!
//! Requests are grouped by their `generate_name` prefix, so every request
//! born from one (subject, policy) pair lands in the same group. Each group
//! keeps its newest `keep_completed` records; older ones are deleted once
//! they are complete. Records in any other state are never touched.
//!
//! [`engine::plan`] decides, [`run_cleanup`] executes.

pub mod engine;
mod worker;

pub use engine::{GroupPlan, RetentionPlan, plan};
pub use worker::{CleanupRunResult, DeletionFailure, run_cleanup};
