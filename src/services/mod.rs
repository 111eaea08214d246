pub mod chat_service;
pub mod media_storage;
pub mod message_service;
pub mod presence;

pub use chat_service::ChatService;
pub use media_storage::{MediaStorage, S3MediaStorage, StoredObject};
pub use message_service::{HistoryPage, MessageDraft, MessageService};
pub use presence::PresenceService;
