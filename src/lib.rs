//! file-intake - Headless file-upload ingestion and orchestration core
//!
//! This crate tracks a collection of files through validation, queued
//! state, progress, and success or failure, with:
//! - An observable store mutated only through dispatched transitions
//! - Count, type, and size screening plus caller-supplied custom checks
//! - Picker, drag-drop, paste, and controlled inputs normalized into one
//!   entry point
//! - A pluggable async uploader driven once per accepted batch, progress
//!   coalesced to frame cadence
//! - Preview URLs allocated lazily per image file and released exactly once
//!
//! Upload batches and the transient invalid window run as Tokio tasks, so
//! the pipeline expects a Tokio runtime.

pub mod config;
pub mod intake;
pub mod preview;
pub mod store;
pub mod upload;
pub mod validate;
pub mod view;
