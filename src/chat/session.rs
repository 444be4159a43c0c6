//! Per-owner conversation transcripts

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::llm::{Message, MessageRole};

/// Ordered turns replayed to the model for one owner
///
/// Turns are only committed in complete user/assistant pairs, so the transcript
/// always alternates and starts with a user turn.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Message>,
    seeded: bool,
}

impl Transcript {
    /// Build a transcript from previously persisted turns
    ///
    /// Keeps only user turns directly answered by an assistant turn; unanswered
    /// user turns (failed model calls) and stray assistant turns are skipped.
    pub fn from_history(history: impl IntoIterator<Item = Message>) -> Self {
        let mut turns = Vec::new();
        let mut pending: Option<Message> = None;

        for message in history {
            match message.role {
                MessageRole::User => pending = Some(message),
                MessageRole::Assistant => {
                    if let Some(user) = pending.take() {
                        turns.push(user);
                        turns.push(message);
                    }
                }
            }
        }

        Self {
            turns,
            seeded: true,
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Append one completed exchange
    pub fn commit(&mut self, user: Message, assistant: Message) {
        self.turns.push(user);
        self.turns.push(assistant);
    }

    /// The most recent turns, at most `max_turns`, never starting on an assistant turn
    pub fn window(&self, max_turns: usize) -> &[Message] {
        &self.turns[self.window_start(max_turns)..]
    }

    /// Drop older turns so at most `max_turns` remain, starting on a user turn
    pub fn truncate_to(&mut self, max_turns: usize) {
        let start = self.window_start(max_turns);
        self.turns.drain(..start);
    }

    fn window_start(&self, max_turns: usize) -> usize {
        let mut start = self.turns.len().saturating_sub(max_turns);
        while start < self.turns.len() && self.turns[start].role != MessageRole::User {
            start += 1;
        }
        start
    }
}

/// Owners kept in memory before idle transcripts are evicted
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug)]
struct SessionEntry {
    transcript: Arc<AsyncMutex<Transcript>>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct SessionMap {
    entries: HashMap<String, SessionEntry>,
    clock: u64,
}

/// Lazily created transcripts keyed by owner id
///
/// Each transcript has its own async lock so one owner's in-flight call never
/// blocks another owner. Once `max_sessions` owners are held, the least recently
/// used idle transcript is evicted; it is re-seeded from persisted history the
/// next time that owner chats.
#[derive(Debug)]
pub struct ConversationSessions {
    sessions: Mutex<SessionMap>,
    max_sessions: usize,
}

impl Default for ConversationSessions {
    fn default() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }
}

impl ConversationSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(SessionMap::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Transcript for `owner_id`, created empty on first use
    pub fn session(&self, owner_id: &str) -> Arc<AsyncMutex<Transcript>> {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.clock += 1;
        let now = sessions.clock;

        if let Some(entry) = sessions.entries.get_mut(owner_id) {
            entry.last_used = now;
            return entry.transcript.clone();
        }

        if sessions.entries.len() >= self.max_sessions {
            evict_idle(&mut sessions.entries);
        }

        let transcript = Arc::new(AsyncMutex::new(Transcript::default()));
        sessions.entries.insert(
            owner_id.to_string(),
            SessionEntry {
                transcript: transcript.clone(),
                last_used: now,
            },
        );
        transcript
    }

    /// Number of owners with a transcript
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remove the least recently used transcript nobody else holds
///
/// Handles are only cloned under the map lock, so a strong count of one means
/// no call is using the transcript.
fn evict_idle(entries: &mut HashMap<String, SessionEntry>) {
    let idle = entries
        .iter()
        .filter(|(_, entry)| Arc::strong_count(&entry.transcript) == 1)
        .min_by_key(|(_, entry)| entry.last_used)
        .map(|(owner_id, _)| owner_id.clone());
    if let Some(owner_id) = idle {
        entries.remove(&owner_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_history_keeps_answered_pairs() {
        let transcript = Transcript::from_history(vec![
            Message::assistant("orphan reply"),
            Message::user("first"),
            Message::user("second"),
            Message::assistant("answer to second"),
            Message::user("unanswered"),
        ]);
        assert_eq!(
            transcript.turns(),
            &[Message::user("second"), Message::assistant("answer to second")]
        );
        assert!(transcript.is_seeded());
    }

    #[test]
    fn test_window() {
        let mut transcript = Transcript::default();
        transcript.commit(Message::user("a"), Message::assistant("b"));
        transcript.commit(Message::user("c"), Message::assistant("d"));

        assert_eq!(transcript.window(10).len(), 4);
        assert_eq!(
            transcript.window(2),
            &[Message::user("c"), Message::assistant("d")]
        );
        // An odd window would start on an assistant turn, so it is narrowed
        assert_eq!(
            transcript.window(3),
            &[Message::user("c"), Message::assistant("d")]
        );
        assert!(transcript.window(0).is_empty());
    }

    #[test]
    fn test_truncate_to_keeps_recent_pairs() {
        let mut transcript = Transcript::default();
        for i in 0..10 {
            transcript.commit(
                Message::user(format!("q{}", i)),
                Message::assistant(format!("a{}", i)),
            );
            transcript.truncate_to(3);
            assert!(transcript.len() <= 3);
            assert_eq!(transcript.turns()[0].role, MessageRole::User);
        }
        assert_eq!(
            transcript.turns(),
            &[Message::user("q9"), Message::assistant("a9")]
        );

        transcript.truncate_to(10);
        assert_eq!(transcript.len(), 2);
        transcript.truncate_to(1);
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_sessions_are_per_owner() {
        let sessions = ConversationSessions::new();
        let a1 = sessions.session("a");
        let a2 = sessions.session("a");
        let b = sessions.session("b");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_idle_sessions_are_evicted_at_capacity() {
        let sessions = ConversationSessions::with_max_sessions(2);
        let a = sessions.session("a");
        sessions.session("b");
        sessions.session("c");

        // "a" is still held, so the idle "b" goes
        assert_eq!(sessions.len(), 2);
        assert!(Arc::ptr_eq(&a, &sessions.session("a")));
        drop(a);

        for owner in 0..50 {
            sessions.session(&format!("owner-{}", owner));
        }
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_sessions_grow_past_capacity_when_all_busy() {
        let sessions = ConversationSessions::with_max_sessions(1);
        let _a = sessions.session("a");
        let _b = sessions.session("b");
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_owner_lock_does_not_block_others() {
        let sessions = ConversationSessions::new();
        let a = sessions.session("a");
        let _held = a.lock().await;

        let b = sessions.session("b");
        assert!(b.try_lock().is_ok());
        assert!(a.try_lock().is_err());
    }
}
