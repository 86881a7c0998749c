//! Domain types shared by the catalog, the request store, and the synchronizer.
//!
//! # Migrating from `kan-brewer`
//!
//! Deployments of the earlier `kan-brewer` tool used the annotation
//! `kan-brewer.haim.dev/kanister-blueprints` and the label value
//! `app.kubernetes.io/managed-by=kan-brewer`. Neither is recognized here.
//! Re-annotate subjects with [`BLUEPRINT_ANNOTATION`]. ActionSets created by
//! the old deployment are never cleaned up by this tool; delete them once
//! with `kubectl delete actionsets -l app.kubernetes.io/managed-by=kan-brewer`.

mod execution_request;
mod subject;

pub use execution_request::*;
pub use subject::*;

/// Annotation carrying the comma-separated list of blueprints to run.
pub const BLUEPRINT_ANNOTATION: &str = "backup-scheduler.io/kanister-blueprints";

/// Label key marking execution requests owned by this tool.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`] on every request this tool creates.
pub const APP_ID: &str = "backup-scheduler";

/// Name of the single action placed inside each execution request.
pub const BACKUP_ACTION: &str = "backup";
