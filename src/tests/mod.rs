//! End-to-end tests.
//!
//! `scenarios` drives the synchronizer against the in-memory backend;
//! `kubernetes_e2e` runs a full pass against a mocked API server.
