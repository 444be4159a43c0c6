//! Chat flow: per-owner transcripts, model call and history persistence

pub mod session;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::llm::{GenerateRequest, GenerationConfig, LlmError, LlmProvider, Message};
use crate::models::{ConversationTurn, PersistenceWarning, CHAT_HISTORY_TABLE};
use crate::store::{Row, SelectQuery, StoreError, TableService};

pub use session::{ConversationSessions, Transcript};

/// Result of a delivered chat call
///
/// `warnings` lists history writes that failed; the reply was still produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub content: String,
    pub warnings: Vec<PersistenceWarning>,
}

impl ChatOutcome {
    /// Whether both history writes (when attempted) succeeded
    pub fn is_fully_persisted(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Coordinates transcripts, the model service and the chat history table
pub struct ChatService {
    store: Arc<dyn TableService>,
    model: Arc<dyn LlmProvider>,
    sessions: ConversationSessions,
    history_limit: usize,
    generation: GenerationConfig,
}

impl ChatService {
    pub fn new(store: Arc<dyn TableService>, model: Arc<dyn LlmProvider>) -> Self {
        Self {
            store,
            model,
            sessions: ConversationSessions::new(),
            history_limit: 100,
            generation: GenerationConfig::default(),
        }
    }

    /// Cap the number of turns sent to the model per call (including the new message)
    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit.max(1);
        self
    }

    /// Cap the number of owners whose transcripts stay in memory
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.sessions = ConversationSessions::with_max_sessions(max_sessions);
        self
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn sessions(&self) -> &ConversationSessions {
        &self.sessions
    }

    /// Send `message` to the model within the owner's conversation
    ///
    /// With an owner id, the owner's transcript stays locked from the user-turn
    /// write through the assistant-turn write. Without one, the message is sent
    /// on its own and nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns the model service error; a user turn already persisted is kept.
    pub async fn send(
        &self,
        owner_id: Option<&str>,
        message: &str,
    ) -> Result<ChatOutcome, LlmError> {
        let Some(owner_id) = owner_id else {
            debug!("chat call without owner id, using a single-use transcript");
            let reply = self.generate(vec![Message::user(message)]).await?;
            return Ok(ChatOutcome {
                content: reply,
                warnings: Vec::new(),
            });
        };

        let session = self.sessions.session(owner_id);
        let mut transcript = session.lock().await;
        if !transcript.is_seeded() {
            *transcript = self.load_transcript(owner_id).await;
        }

        let mut warnings = Vec::new();
        let user_turn = ConversationTurn::user(owner_id, message);
        self.persist(&user_turn, &mut warnings).await;

        let mut messages = transcript
            .window(self.history_limit.saturating_sub(1))
            .to_vec();
        messages.push(user_turn.to_message());

        let reply = match self.generate(messages).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(owner_id, error = %e, "Error generating response");
                return Err(e);
            }
        };

        if !reply.is_empty() {
            let assistant_turn = ConversationTurn::assistant(owner_id, reply.as_str());
            self.persist(&assistant_turn, &mut warnings).await;
            transcript.commit(user_turn.to_message(), assistant_turn.to_message());
            transcript.truncate_to(self.history_limit);
        }

        Ok(ChatOutcome {
            content: reply,
            warnings,
        })
    }

    /// Persisted turns for an owner, oldest first
    pub async fn history(&self, owner_id: &str) -> Result<Vec<Row>, StoreError> {
        self.store
            .select(
                CHAT_HISTORY_TABLE,
                SelectQuery::new()
                    .eq("user_id", owner_id)
                    .order_by("timestamp"),
            )
            .await
    }

    async fn generate(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let turns = messages.len();
        let request = GenerateRequest {
            messages,
            config: self.generation.clone(),
            system: None,
        };

        let response = self.model.generate(request).await?;
        let reply = response.text_or_empty().to_string();
        info!(
            turns,
            reply_chars = reply.chars().count(),
            finish_reason = ?response.finish_reason,
            "Generated response"
        );
        Ok(reply)
    }

    async fn persist(&self, turn: &ConversationTurn, warnings: &mut Vec<PersistenceWarning>) {
        if let Err(e) = self.store.insert(CHAT_HISTORY_TABLE, turn.to_row()).await {
            warn!(
                owner_id = turn.owner_id.as_deref().unwrap_or_default(),
                role = ?turn.role,
                chars = turn.text.chars().count(),
                error = %e,
                "Failed to persist chat turn"
            );
            warnings.push(PersistenceWarning {
                role: turn.role,
                error: e.to_string(),
            });
        }
    }

    /// Seed a transcript from persisted history
    ///
    /// An unreadable history gives an unseeded, empty transcript so the next
    /// call tries loading again.
    async fn load_transcript(&self, owner_id: &str) -> Transcript {
        match self.history(owner_id).await {
            Ok(rows) => {
                let transcript = Transcript::from_history(
                    rows.iter()
                        .filter_map(ConversationTurn::from_row)
                        .filter(|turn| !turn.text.is_empty())
                        .map(|turn| turn.to_message()),
                );
                debug!(owner_id, turns = transcript.len(), "Seeded transcript");
                transcript
            }
            Err(e) => {
                warn!(owner_id, error = %e, "Could not load chat history, starting empty");
                Transcript::default()
            }
        }
    }
}
