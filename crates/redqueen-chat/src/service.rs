//! Chat service: the store plus the deferred reply machinery.
//!
//! Every mutation goes through [`ChatService`], which locks the store,
//! applies the operation, releases the lock, and then broadcasts
//! [`ChatEvent`]s. Replies are produced by tokio tasks that sleep for a
//! randomized delay before writing back into the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use redqueen_core::config::ChatConfig;
use redqueen_core::events::ChatEvent;
use redqueen_core::types::{Conversation, ConversationId, Role};

use crate::response::ResponseGenerator;
use crate::store::{ConversationStore, PendingReply};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Cloneable handle to the shared conversation state.
#[derive(Clone)]
pub struct ChatService {
    inner: Arc<Inner>,
}

struct Inner {
    store: Mutex<ConversationStore>,
    generator: ResponseGenerator,
    rng: Mutex<StdRng>,
    events: broadcast::Sender<ChatEvent>,
    /// Only conversations with replies in flight have an entry.
    reply_tokens: Mutex<HashMap<ConversationId, ReplySlot>>,
    shutdown: CancellationToken,
}

/// Cancellation shared by the replies pending for one conversation.
struct ReplySlot {
    token: CancellationToken,
    in_flight: usize,
}

impl ChatService {
    /// Build a service from chat settings. A configured seed makes reply
    /// selection and delays reproducible.
    pub fn new(config: &ChatConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &ChatConfig, rng: StdRng) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(ConversationStore::new(config.title_max_chars)),
                generator: ResponseGenerator::from_config(config),
                rng: Mutex::new(rng),
                events,
                reply_tokens: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    /// Run `f` against a consistent snapshot of the store.
    pub fn read<T>(&self, f: impl FnOnce(&ConversationStore) -> T) -> T {
        f(&self.inner.store())
    }

    pub fn is_typing(&self) -> bool {
        self.inner.store().is_typing()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub fn create_conversation(&self, first_message: Option<&str>) -> Conversation {
        let (conversation, pending) = self.inner.store().create_conversation(first_message);

        let mut events = vec![
            ChatEvent::ConversationCreated {
                conversation_id: conversation.id,
                title: conversation.title.clone(),
            },
            ChatEvent::SelectionChanged {
                conversation_id: Some(conversation.id),
            },
        ];
        if let Some(first) = conversation.messages.first() {
            events.push(ChatEvent::MessageAppended {
                conversation_id: conversation.id,
                message_id: first.id,
                role: Role::User,
            });
        }
        self.inner.emit(events);

        if let Some(pending) = pending {
            self.schedule_reply(pending);
        }
        info!(conversation_id = %conversation.id, "Conversation started");
        conversation
    }

    /// Send a user message to the selected conversation, starting a new one
    /// when nothing is selected. Returns the conversation the message landed
    /// in, or `None` for blank input.
    pub fn send_message(&self, content: &str) -> Option<ConversationId> {
        let (pending, created) = {
            let mut store = self.inner.store();
            let had_selection = store.current_conversation_id().is_some();
            let pending = store.send_message(content)?;
            let created = (!had_selection).then(|| {
                store
                    .conversation(pending.conversation_id)
                    .map(|c| c.title.clone())
                    .unwrap_or_default()
            });
            (pending, created)
        };

        let conversation_id = pending.conversation_id;
        let mut events = Vec::with_capacity(3);
        if let Some(title) = created {
            events.push(ChatEvent::ConversationCreated {
                conversation_id,
                title,
            });
            events.push(ChatEvent::SelectionChanged {
                conversation_id: Some(conversation_id),
            });
        }
        if let Some(message_id) = pending.trigger_id {
            events.push(ChatEvent::MessageAppended {
                conversation_id,
                message_id,
                role: Role::User,
            });
        }
        self.inner.emit(events);

        self.schedule_reply(pending);
        Some(conversation_id)
    }

    /// Replace the trailing assistant message of the selected conversation.
    /// Returns `false` when there is nothing to regenerate.
    pub fn regenerate_last_response(&self) -> bool {
        let regenerated = self.inner.store().regenerate_last_response();
        let Some((removed, pending)) = regenerated else {
            return false;
        };
        self.inner.emit(vec![ChatEvent::MessageRemoved {
            conversation_id: pending.conversation_id,
            message_id: removed,
        }]);
        self.schedule_reply(pending);
        true
    }

    /// Delete a conversation and abort any reply still pending for it.
    pub fn delete_conversation(&self, id: ConversationId) -> bool {
        let (deleted, selection_cleared, slot) = {
            let mut store = self.inner.store();
            let was_current = store.current_conversation_id() == Some(id);
            let deleted = store.delete_conversation(id);
            let slot = if deleted {
                self.inner.tokens().remove(&id)
            } else {
                None
            };
            (deleted, deleted && was_current, slot)
        };
        if !deleted {
            return false;
        }

        if let Some(slot) = slot {
            slot.token.cancel();
        }

        let mut events = vec![ChatEvent::ConversationDeleted {
            conversation_id: id,
        }];
        if selection_cleared {
            events.push(ChatEvent::SelectionChanged {
                conversation_id: None,
            });
        }
        self.inner.emit(events);
        info!(conversation_id = %id, "Conversation deleted");
        true
    }

    pub fn select_conversation(&self, id: ConversationId) -> bool {
        if !self.inner.store().select_conversation(id) {
            return false;
        }
        self.inner.emit(vec![ChatEvent::SelectionChanged {
            conversation_id: Some(id),
        }]);
        true
    }

    pub fn clear_selection(&self) {
        self.inner.store().clear_selection();
        self.inner.emit(vec![ChatEvent::SelectionChanged {
            conversation_id: None,
        }]);
    }

    /// Abort every pending reply. Used on server shutdown.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.tokens().clear();
        self.inner.emit(vec![ChatEvent::ShuttingDown]);
    }

    // =========================================================================
    // Deferred replies
    // =========================================================================

    fn schedule_reply(&self, pending: PendingReply) {
        let delay = {
            let mut rng = self.inner.rng();
            self.inner.generator.response_delay(&mut *rng)
        };

        // The token is taken under the store lock so a concurrent delete
        // cannot leave one behind for a conversation that is already gone.
        let scheduled = {
            let mut store = self.inner.store();
            store.conversation(pending.conversation_id).is_some().then(|| {
                let token = self.inner.acquire_token(pending.conversation_id);
                let was_typing = store.is_typing();
                store.begin_reply();
                (token, !was_typing)
            })
        };
        let Some((token, typing_started)) = scheduled else {
            debug!(
                conversation_id = %pending.conversation_id,
                "Conversation deleted before its reply was scheduled"
            );
            self.inner.emit(vec![ChatEvent::ReplyAborted {
                conversation_id: pending.conversation_id,
            }]);
            return;
        };

        if typing_started {
            self.inner
                .emit(vec![ChatEvent::TypingChanged { is_typing: true }]);
        }

        debug!(
            conversation_id = %pending.conversation_id,
            delay_ms = delay.as_millis() as u64,
            "Reply scheduled"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_reply(pending, delay, token).await;
        });
    }
}

impl Inner {
    fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<ConversationId, ReplySlot>> {
        self.reply_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register one more reply in flight for `id`. Lock order is store, then
    /// tokens.
    fn acquire_token(&self, id: ConversationId) -> CancellationToken {
        let mut tokens = self.tokens();
        let slot = tokens.entry(id).or_insert_with(|| ReplySlot {
            token: self.shutdown.child_token(),
            in_flight: 0,
        });
        slot.in_flight += 1;
        slot.token.clone()
    }

    /// Drop the slot once its last reply has finished. Deleted conversations
    /// have no slot left to release.
    fn release_token(&self, id: ConversationId) {
        let mut tokens = self.tokens();
        if let Some(slot) = tokens.get_mut(&id) {
            slot.in_flight = slot.in_flight.saturating_sub(1);
            if slot.in_flight == 0 {
                tokens.remove(&id);
            }
        }
    }

    fn emit(&self, events: Vec<ChatEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }

    async fn run_reply(&self, pending: PendingReply, delay: Duration, token: CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => self.abort_reply(&pending),
            _ = tokio::time::sleep(delay) => self.deliver_reply(&pending),
        }
        self.release_token(pending.conversation_id);
    }

    fn deliver_reply(&self, pending: &PendingReply) {
        let content = {
            let mut rng = self.rng();
            self.generator.generate(&pending.prompt, &mut *rng)
        };

        let (message, typing_stopped) = {
            let mut store = self.store();
            let message = store.complete_reply(pending, content);
            store.finish_reply();
            (message, !store.is_typing())
        };

        let mut events = Vec::with_capacity(2);
        match message {
            Some(message) => events.push(ChatEvent::MessageAppended {
                conversation_id: pending.conversation_id,
                message_id: message.id,
                role: Role::Assistant,
            }),
            None => events.push(ChatEvent::ReplyAborted {
                conversation_id: pending.conversation_id,
            }),
        }
        if typing_stopped {
            events.push(ChatEvent::TypingChanged { is_typing: false });
        }
        self.emit(events);
    }

    fn abort_reply(&self, pending: &PendingReply) {
        let typing_stopped = {
            let mut store = self.store();
            store.finish_reply();
            !store.is_typing()
        };
        debug!(conversation_id = %pending.conversation_id, "Pending reply cancelled");

        let mut events = vec![ChatEvent::ReplyAborted {
            conversation_id: pending.conversation_id,
        }];
        if typing_stopped {
            events.push(ChatEvent::TypingChanged { is_typing: false });
        }
        self.emit(events);
    }
}

// =============================================================================
// Tests
// =============================================================================
