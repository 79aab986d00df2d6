//! Data-extension engine.
//!
//! Extensions declare their providers explicitly (`declaration`), the
//! extractor validates those declarations into an ordered metadata graph,
//! gatherers invoke providers per subject and the service owns the registry.

pub mod condition;
pub mod declaration;
pub mod extractor;
pub mod gatherer;
pub mod holder;
pub mod service;
