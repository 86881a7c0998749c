//! Annotation-driven Kanister ActionSet generation with group-wise retention.
//!
//! Namespaces and PersistentVolumeClaims opt into backups with the
//! [`models::BLUEPRINT_ANNOTATION`] annotation. Each run creates one
//! execution request per (subject, blueprint) pair, then prunes the oldest
//! completed requests of every group beyond the configured count.
//!
//! Existing `kan-brewer` installations must migrate their annotations and
//! prune their old ActionSets by hand; see [`models`].

pub mod backend;
pub mod config;
pub mod models;
#[cfg(feature = "cli")]
pub mod observability;
pub mod retention;
pub mod sync;

#[cfg(test)]
mod tests;
