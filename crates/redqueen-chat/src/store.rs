//! In-memory conversation store.
//!
//! Owns every conversation, the current selection, and the id counters. All
//! mutation goes through the methods below; derived views are recomputed on
//! demand. Operations that reference an unknown id are silent no-ops.

use chrono::Utc;
use tracing::{debug, warn};

use redqueen_core::types::{Conversation, ConversationId, Message, MessageId, Role};

/// Title used when a conversation starts without a message.
pub const DEFAULT_TITLE: &str = "New Conversation";

const TITLE_ELLIPSIS: &str = "...";

/// A reply that should be generated once the simulated delay elapses.
///
/// Carries the triggering user message so the reply is paired with the
/// message that caused it, not whatever user message is newest when the
/// delay expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub conversation_id: ConversationId,
    pub trigger_id: Option<MessageId>,
    pub prompt: String,
}

#[derive(Debug)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current_conversation_id: Option<ConversationId>,
    in_flight_replies: usize,
    next_conversation_id: u64,
    next_message_id: u64,
    title_max_chars: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(40)
    }
}

impl ConversationStore {
    pub fn new(title_max_chars: usize) -> Self {
        Self {
            conversations: Vec::new(),
            current_conversation_id: None,
            in_flight_replies: 0,
            next_conversation_id: 1,
            next_message_id: 1,
            title_max_chars,
        }
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Create a conversation, select it, and seed it with `first_message`.
    ///
    /// A blank or absent first message yields an empty conversation titled
    /// [`DEFAULT_TITLE`] and no pending reply.
    pub fn create_conversation(
        &mut self,
        first_message: Option<&str>,
    ) -> (Conversation, Option<PendingReply>) {
        let first = first_message.map(str::trim).filter(|m| !m.is_empty());

        let id = ConversationId(self.next_conversation_id);
        self.next_conversation_id += 1;

        let mut conversation = Conversation {
            id,
            title: self.derive_title(first),
            created_at: Utc::now(),
            messages: Vec::new(),
        };

        let pending = first.map(|content| {
            let message = self.new_message(Role::User, content.to_string());
            let pending = PendingReply {
                conversation_id: id,
                trigger_id: Some(message.id),
                prompt: message.content.clone(),
            };
            conversation.messages.push(message);
            pending
        });

        debug!(conversation_id = %id, title = %conversation.title, "Conversation created");
        self.conversations.push(conversation.clone());
        self.current_conversation_id = Some(id);

        (conversation, pending)
    }

    /// Append a user message to the current conversation, creating one if
    /// nothing is selected.
    pub fn send_message(&mut self, content: &str) -> Option<PendingReply> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        let Some(current) = self.current_conversation_id else {
            return self.create_conversation(Some(content)).1;
        };

        let message = self.new_message(Role::User, content.to_string());
        let conversation = self.conversation_mut(current)?;
        let pending = PendingReply {
            conversation_id: current,
            trigger_id: Some(message.id),
            prompt: message.content.clone(),
        };
        debug!(conversation_id = %current, message_id = %message.id, "User message appended");
        conversation.messages.push(message);
        Some(pending)
    }

    /// Drop the trailing assistant message of the current conversation so a
    /// fresh reply can be generated.
    ///
    /// No-op unless the conversation has at least two messages and the last
    /// one was written by the assistant.
    pub fn regenerate_last_response(&mut self) -> Option<(MessageId, PendingReply)> {
        let current = self.current_conversation_id?;
        let conversation = self.conversation_mut(current)?;
        if conversation.messages.len() < 2 {
            return None;
        }
        if conversation.last_message()?.role != Role::Assistant {
            return None;
        }

        let removed = conversation.messages.pop()?;
        let trigger = conversation.last_user_message();
        let pending = PendingReply {
            conversation_id: current,
            trigger_id: trigger.map(|m| m.id),
            prompt: trigger.map(|m| m.content.clone()).unwrap_or_default(),
        };
        debug!(conversation_id = %current, removed = %removed.id, "Assistant message removed for regeneration");
        Some((removed.id, pending))
    }

    /// Remove a conversation. Clears the selection if it pointed at it.
    pub fn delete_conversation(&mut self, id: ConversationId) -> bool {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return false;
        };
        self.conversations.remove(index);
        if self.current_conversation_id == Some(id) {
            self.current_conversation_id = None;
        }
        debug!(conversation_id = %id, "Conversation deleted");
        true
    }

    /// Select an existing conversation. Unknown ids leave the selection alone.
    pub fn select_conversation(&mut self, id: ConversationId) -> bool {
        if self.conversation(id).is_none() {
            return false;
        }
        self.current_conversation_id = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.current_conversation_id = None;
    }

    /// Append the assistant reply for `pending`.
    ///
    /// The conversation is resolved again here: if it was deleted while the
    /// reply was in flight, nothing is written and `None` is returned.
    pub fn complete_reply(&mut self, pending: &PendingReply, content: String) -> Option<Message> {
        if self.conversation(pending.conversation_id).is_none() {
            warn!(
                conversation_id = %pending.conversation_id,
                "Conversation vanished before reply completed, dropping reply"
            );
            return None;
        }

        let message = self.new_message(Role::Assistant, content);
        let conversation = self.conversation_mut(pending.conversation_id)?;
        conversation.messages.push(message.clone());
        debug!(
            conversation_id = %pending.conversation_id,
            message_id = %message.id,
            trigger_id = ?pending.trigger_id,
            "Assistant message appended"
        );
        Some(message)
    }

    // -----------------------------------------------------------------
    // Typing indicator
    // -----------------------------------------------------------------

    /// Mark a reply as in flight.
    pub fn begin_reply(&mut self) {
        self.in_flight_replies += 1;
    }

    /// Mark an in-flight reply as settled (delivered or dropped).
    pub fn finish_reply(&mut self) {
        self.in_flight_replies = self.in_flight_replies.saturating_sub(1);
    }

    /// True while at least one reply is in flight.
    pub fn is_typing(&self) -> bool {
        self.in_flight_replies > 0
    }

    // -----------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------

    /// All conversations in creation (insertion) order.
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn current_conversation_id(&self) -> Option<ConversationId> {
        self.current_conversation_id
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current_conversation_id
            .and_then(|id| self.conversation(id))
    }

    /// Messages of the selected conversation, empty when nothing is selected.
    pub fn current_messages(&self) -> &[Message] {
        self.current_conversation()
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Conversations newest first. Equal timestamps keep insertion order.
    pub fn sorted_conversations(&self) -> Vec<&Conversation> {
        let mut sorted: Vec<&Conversation> = self.conversations.iter().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted
    }

    // -- Private helpers --

    fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn new_message(&mut self, role: Role, content: String) -> Message {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        Message {
            id,
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    fn derive_title(&self, first_message: Option<&str>) -> String {
        let Some(text) = first_message else {
            return DEFAULT_TITLE.to_string();
        };
        let mut chars = text.chars();
        let title: String = chars.by_ref().take(self.title_max_chars).collect();
        if chars.next().is_some() {
            format!("{title}{TITLE_ELLIPSIS}")
        } else {
            title
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
