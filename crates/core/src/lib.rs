//! Pure domain for shoplist.
//!
//! Everything in this crate is free of I/O: entities and their validation,
//! the repository and cache contracts, the generic repository and service,
//! DTO mapping, and the traits the server implements for its collaborators.

pub mod cache;
pub mod entity;
pub mod integrations;
pub mod service;
pub mod storage;
