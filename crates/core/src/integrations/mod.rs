//! Contracts for the external collaborators used by the user and item flows.
//!
//! The server crate provides the concrete implementations; everything here is
//! pure.

mod blob;
mod email;
mod search;

pub use blob::{blob_name, BlobError, BlobStore};
pub use email::{EmailError, EmailMessage, EmailSender, MessageQueue, QueueError};
pub use search::{SearchError, SearchIndex};
