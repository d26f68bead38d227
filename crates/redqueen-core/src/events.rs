use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, MessageId, Role};

/// Change notifications emitted by the chat service after each mutation.
///
/// Events carry identifiers only. Observers (the SSE stream, the browser
/// page) re-read the derived views after receiving one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ChatEvent {
    /// A conversation was created and selected.
    ConversationCreated {
        conversation_id: ConversationId,
        title: String,
    },

    /// The selection changed. `None` means nothing is selected.
    SelectionChanged {
        conversation_id: Option<ConversationId>,
    },

    /// A conversation was deleted.
    ConversationDeleted { conversation_id: ConversationId },

    /// A message was appended to a conversation.
    MessageAppended {
        conversation_id: ConversationId,
        message_id: MessageId,
        role: Role,
    },

    /// The last assistant message was removed for regeneration.
    MessageRemoved {
        conversation_id: ConversationId,
        message_id: MessageId,
    },

    /// A pending reply was dropped because its conversation is gone.
    ReplyAborted { conversation_id: ConversationId },

    /// The typing indicator toggled.
    TypingChanged { is_typing: bool },

    /// The service is shutting down; streams should close.
    ShuttingDown,
}

impl ChatEvent {
    /// Stable event name, used as the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::ConversationCreated { .. } => "conversation_created",
            ChatEvent::SelectionChanged { .. } => "selection_changed",
            ChatEvent::ConversationDeleted { .. } => "conversation_deleted",
            ChatEvent::MessageAppended { .. } => "message_appended",
            ChatEvent::MessageRemoved { .. } => "message_removed",
            ChatEvent::ReplyAborted { .. } => "reply_aborted",
            ChatEvent::TypingChanged { .. } => "typing_changed",
            ChatEvent::ShuttingDown => "shutting_down",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = ChatEvent::MessageAppended {
            conversation_id: ConversationId(2),
            message_id: MessageId(7),
            role: Role::Assistant,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message_appended");
        assert_eq!(json["conversation_id"], 2);
        assert_eq!(json["message_id"], 7);
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn test_event_name_matches_serde_tag() {
        let events = vec![
            ChatEvent::ConversationCreated {
                conversation_id: ConversationId(1),
                title: "x".into(),
            },
            ChatEvent::SelectionChanged {
                conversation_id: None,
            },
            ChatEvent::ConversationDeleted {
                conversation_id: ConversationId(1),
            },
            ChatEvent::MessageAppended {
                conversation_id: ConversationId(1),
                message_id: MessageId(1),
                role: Role::User,
            },
            ChatEvent::MessageRemoved {
                conversation_id: ConversationId(1),
                message_id: MessageId(1),
            },
            ChatEvent::ReplyAborted {
                conversation_id: ConversationId(1),
            },
            ChatEvent::TypingChanged { is_typing: true },
            ChatEvent::ShuttingDown,
        ];

        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.name());
        }
    }

    #[test]
    fn test_event_roundtrip() {
        let event = ChatEvent::SelectionChanged {
            conversation_id: Some(ConversationId(4)),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ChatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
