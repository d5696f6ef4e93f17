//! In-memory message queues with long-polling consumers.
//!
//! - `Message`: opaque non-empty payload
//! - `Queue`: bounded buffer, waiting consumers and the push/pop rendezvous
//! - `QueueRegistry`: get-or-create lookup of queues by name

mod bounded;
mod message;
mod registry;

pub use bounded::{Queue, QueueStats};
pub use message::Message;
pub use registry::{QueueRegistry, RegistryStats};
