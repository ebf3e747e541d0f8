//! Concrete collaborators for the integration traits in
//! `shoplist_core::integrations`.

mod blob;
mod email;
mod queue;
mod search;

pub use blob::FsBlobStore;
pub use email::{LogEmailSender, SmtpEmailSender};
pub use queue::ChannelQueue;
pub use search::InMemorySearchIndex;
