//! Persistence contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the storage collaborator gatherers write through.
//! - Isolate SQLite query details from extraction and gathering.
//!
//! # Invariants
//! - Store APIs return semantic errors (`UnknownProvider`, `KindMismatch`) in
//!   addition to DB transport errors.

pub mod extension_repo;
