//! OpenAPI document for the HTTP surface, served as JSON at /openapi.json.

use utoipa::OpenApi;

use crate::models::{Chat, ChatKind, Message, MessageKind, MessageStatus, Reaction};
use crate::routes::chats::{ChatListResponse, CreateDirectChatRequest};
use crate::routes::groups::{AddMemberRequest, CreateGroupRequest, UpdateGroupRequest};
use crate::routes::messages::{
    EditMessageRequest, HistoryResponse, MarkReadResponse, ReactRequest,
};
use crate::routes::presence::PresenceResponse;
use crate::routing::{PresenceEvent, ReadReceiptEvent, SendFailureEvent, TypingEvent};
use crate::services::message_service::MessageDraft;
use crate::services::StoredObject;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chat Delivery Service API",
        version = "0.1.0",
        description = "Real-time chat: conversations, messages, and fan-out delivery",
        license(name = "MIT")
    ),
    tags(
        (name = "Chats", description = "Direct and group conversations"),
        (name = "Messages", description = "Message lifecycle, history, and search"),
        (name = "Uploads", description = "Media upload descriptors"),
        (name = "Presence", description = "Participant presence lookup"),
        (name = "WebSocket", description = "Real-time delivery channels"),
    ),
    components(schemas(
        Chat,
        ChatKind,
        Message,
        MessageKind,
        MessageStatus,
        Reaction,
        MessageDraft,
        HistoryResponse,
        EditMessageRequest,
        ReactRequest,
        MarkReadResponse,
        CreateDirectChatRequest,
        ChatListResponse,
        CreateGroupRequest,
        UpdateGroupRequest,
        AddMemberRequest,
        PresenceResponse,
        StoredObject,
        TypingEvent,
        ReadReceiptEvent,
        SendFailureEvent,
        PresenceEvent,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "Chat Delivery Service API");
        assert!(doc
            .components
            .as_ref()
            .unwrap()
            .schemas
            .contains_key("Message"));
    }
}
