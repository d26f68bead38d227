//! Conversation engine for the Red Queen demo.
//!
//! Provides the conversation store, regex intent classification, canned
//! response synthesis, and the service that schedules delayed replies.

pub mod intent;
pub mod response;
pub mod service;
pub mod store;

pub use intent::{classify, Intent};
pub use response::ResponseGenerator;
pub use service::ChatService;
pub use store::{ConversationStore, PendingReply};
