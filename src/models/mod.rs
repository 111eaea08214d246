pub mod chat;
pub mod message;

pub use chat::{direct_chat_id, split_direct_chat_id, Chat, ChatKind, DIRECT_CHAT_PREFIX};
pub use message::{Message, MessageKind, MessageStatus, Reaction};
