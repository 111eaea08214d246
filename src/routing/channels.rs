//! Logical channel names and the fan-out derivation rules.
//!
//! Channel names are a wire contract shared with every client; the format
//! strings here must not change shape.

use crate::models::{split_direct_chat_id, Message};
use uuid::Uuid;

pub fn chat_channel(chat_id: &str) -> String {
    format!("chat.{chat_id}")
}

pub fn typing_channel(chat_id: &str) -> String {
    format!("chat.{chat_id}.typing")
}

pub fn user_message_queue(participant_id: &str) -> String {
    format!("user.{participant_id}.messages")
}

pub fn user_error_queue(participant_id: &str) -> String {
    format!("user.{participant_id}.errors")
}

pub fn group_channel(group_id: &str) -> String {
    format!("group.{group_id}")
}

pub fn read_receipt_channel(message_id: Uuid) -> String {
    format!("read.{message_id}")
}

pub fn presence_channel(participant_id: &str) -> String {
    format!("presence.{participant_id}")
}

/// Compute the publish set for one persisted message.
///
/// The rules are evaluated independently and unioned; a channel that would
/// receive the same payload twice is suppressed by name, so the router
/// publishes to each channel exactly once:
///
/// 1. always the conversation broadcast channel;
/// 2. for direct chats, both embedded participants' private queues: a
///    participant looking at a different screen still gets a personal copy
///    (clients subscribed to both de-duplicate by message id);
/// 3. an explicit receiver's private queue, when distinct from the sender;
/// 4. the group broadcast channel, when the message carries a group reference.
pub fn message_channels(message: &Message) -> Vec<String> {
    let mut channels = vec![chat_channel(&message.chat_id)];

    let mut push_unique = |channels: &mut Vec<String>, channel: String| {
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    };

    if let Some((p1, p2)) = split_direct_chat_id(&message.chat_id) {
        push_unique(&mut channels, user_message_queue(p1));
        push_unique(&mut channels, user_message_queue(p2));
    }

    if let Some(receiver) = message.receiver_id.as_deref() {
        if receiver != message.sender_id {
            push_unique(&mut channels, user_message_queue(receiver));
        }
    }

    if let Some(group_id) = message.group_id.as_deref() {
        push_unique(&mut channels, group_channel(group_id));
    }

    channels
}
