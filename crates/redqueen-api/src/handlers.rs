//! Route handler functions for all API endpoints.
//!
//! Mutating handlers apply the operation through the chat service and answer
//! with a fresh [`StateResponse`] so the page can re-render in one round trip.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

use redqueen_core::events::ChatEvent;
use redqueen_core::types::{
    Conversation, ConversationId, ConversationSummary, Message, MessageId, Role,
};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request and response types
// =============================================================================

/// A message with its markdown rendered to HTML.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageView {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub html: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        let html = redqueen_render::render(&message.content);
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            html,
            timestamp: message.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageView>,
}

impl From<Conversation> for ConversationView {
    fn from(conversation: Conversation) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title,
            created_at: conversation.created_at,
            messages: conversation.messages.into_iter().map(MessageView::from).collect(),
        }
    }
}

/// Everything the chat page needs to draw itself.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateResponse {
    /// Newest first.
    pub conversations: Vec<ConversationSummary>,
    pub current_conversation_id: Option<ConversationId>,
    /// Messages of the selected conversation.
    pub messages: Vec<MessageView>,
    pub is_typing: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub conversation_count: u64,
}

/// Request body for POST /conversations. The body may be omitted entirely.
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub first_message: Option<String>,
}

/// Request body for POST /messages.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Snapshot the store, then render outside the lock.
fn snapshot(state: &AppState) -> StateResponse {
    let (conversations, current_conversation_id, messages, is_typing) = state.chat.read(|store| {
        (
            store
                .sorted_conversations()
                .into_iter()
                .map(Conversation::summary)
                .collect::<Vec<_>>(),
            store.current_conversation_id(),
            store.current_messages().to_vec(),
            store.is_typing(),
        )
    });

    StateResponse {
        conversations,
        current_conversation_id,
        messages: messages.into_iter().map(MessageView::from).collect(),
        is_typing,
    }
}

fn check_length(content: &str, max_chars: usize) -> Result<(), ApiError> {
    let len = content.trim().chars().count();
    if len > max_chars {
        return Err(ApiError::BadRequest(format!(
            "Message is {len} characters, the limit is {max_chars}"
        )));
    }
    Ok(())
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - liveness plus a few counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let conversation_count = state.chat.read(|store| store.conversations().len() as u64);
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        conversation_count,
    })
}

/// GET / and GET /ui - serve the self-contained chat page.
pub async fn ui() -> impl IntoResponse {
    Html(redqueen_ui::CHAT_PAGE_HTML)
}

/// GET /highlight.css - stylesheet for highlighted code spans.
pub async fn highlight_css(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        state.highlight_css.to_string(),
    )
}

/// GET /state - full page snapshot.
pub async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(snapshot(&state))
}

/// GET /conversations - summaries, newest first.
pub async fn list_conversations(State(state): State<AppState>) -> Json<Vec<ConversationSummary>> {
    Json(state.chat.read(|store| {
        store
            .sorted_conversations()
            .into_iter()
            .map(Conversation::summary)
            .collect()
    }))
}

/// GET /conversations/{id} - one conversation with rendered messages.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ConversationView>, ApiError> {
    let id = ConversationId(id);
    let conversation = state
        .chat
        .read(|store| store.conversation(id).cloned())
        .ok_or_else(|| ApiError::NotFound(format!("Conversation {id} not found")))?;
    Ok(Json(ConversationView::from(conversation)))
}

/// POST /conversations - start a conversation, optionally with a first message.
pub async fn create_conversation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StateResponse>, ApiError> {
    let request: CreateConversationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateConversationRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    if let Some(first) = request.first_message.as_deref() {
        check_length(first, state.config.chat.max_message_chars)?;
    }

    state
        .chat
        .create_conversation(request.first_message.as_deref());
    Ok(Json(snapshot(&state)))
}

/// DELETE /conversations/{id} - remove a conversation. Unknown ids are a no-op.
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<StateResponse> {
    if !state.chat.delete_conversation(ConversationId(id)) {
        debug!(conversation_id = id, "Delete requested for unknown conversation");
    }
    Json(snapshot(&state))
}

/// POST /conversations/{id}/select - make a conversation current.
pub async fn select_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<StateResponse>, ApiError> {
    let id = ConversationId(id);
    if !state.chat.select_conversation(id) {
        return Err(ApiError::NotFound(format!("Conversation {id} not found")));
    }
    Ok(Json(snapshot(&state)))
}

/// POST /selection/clear - deselect, so the next message starts a new chat.
pub async fn clear_selection(State(state): State<AppState>) -> Json<StateResponse> {
    state.chat.clear_selection();
    Json(snapshot(&state))
}

/// POST /messages - send a user message to the current conversation.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<StateResponse>, ApiError> {
    if request.content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Message content must not be blank".to_string(),
        ));
    }
    check_length(&request.content, state.config.chat.max_message_chars)?;

    state.chat.send_message(&request.content);
    Ok(Json(snapshot(&state)))
}

/// POST /regenerate - replace the last assistant reply. No-op when the last
/// message is not an assistant reply.
pub async fn regenerate(State(state): State<AppState>) -> Json<StateResponse> {
    if !state.chat.regenerate_last_response() {
        debug!("Nothing to regenerate");
    }
    Json(snapshot(&state))
}

/// GET /stream - SSE feed of chat events. Ends when the service shuts down.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let rx = state.chat.subscribe();
    let stream = BroadcastStream::new(rx)
        .map_while(|result| match result {
            Ok(ChatEvent::ShuttingDown) => None,
            other => Some(other),
        })
        .filter_map(|result| match result {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok(Event::default().event(event.name()).data(data)))
            }
            // Lagged receivers skip ahead; the page resyncs from /state anyway
            Err(_) => None,
        });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_length() {
        assert!(check_length("short", 10).is_ok());
        assert!(check_length("  exactly10!  ", 10).is_ok());
        assert!(matches!(
            check_length("this is far too long", 5),
            Err(ApiError::BadRequest(_))
        ));
        // Counted in chars, not bytes
        assert!(check_length("ßßßß", 4).is_ok());
    }

    #[test]
    fn test_message_view_renders_markdown() {
        let view = MessageView::from(Message {
            id: MessageId(1),
            role: Role::Assistant,
            content: "**Access denied.**".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(view.content, "**Access denied.**");
        assert!(view.html.contains("<strong>Access denied.</strong>"));
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateConversationRequest = serde_json::from_str("{}").unwrap();
        assert!(req.first_message.is_none());
    }
}
