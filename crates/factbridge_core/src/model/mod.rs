//! Data model shared by extraction, gathering and storage.
//!
//! # Responsibility
//! - Define validated provider/tab metadata.
//! - Define subjects and their storage identity.
//! - Define the normalized value model written by gathering passes.
//!
//! # Invariants
//! - Metadata types carry already-validated, truncated values.

pub mod provider;
pub mod subject;
pub mod value;
