use thiserror::Error;

use crate::backend::BackendError;

/// Errors that end a run with a non-zero exit.
///
/// Deletion failures are not represented here. They are reported through
/// [`DeletionFailure`](crate::retention::DeletionFailure) and never abort
/// cleanup.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to discover subjects: {0}")]
    Discovery(#[source] BackendError),

    #[error("Failed to create execution request {generate_name}: {source}")]
    Create {
        generate_name: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to list execution requests: {0}")]
    List(#[source] BackendError),
}
