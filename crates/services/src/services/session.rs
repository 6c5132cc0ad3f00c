//! Per-survey editor session state.
//!
//! One `EditorSession` exists per open survey editor: it owns thread
//! selection, the review filter bar, the chat transcript, and the overlay of
//! optimistic thread mutations. Sessions are created when the editor opens
//! and discarded when it closes; nothing in here is persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::review_threads::{StatusFilter, TypeFilter};

/// Commit state of an optimistic mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum MutationState {
    Pending,
    Committed,
    Failed,
}

/// A locally-applied thread status flip and its reconciliation state. On a
/// failed persistence call `local` reverts to `last_committed`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ThreadMutation {
    pub thread_id: Uuid,
    pub state: MutationState,
    pub last_committed: bool,
    pub local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EditorSession {
    pub survey_id: Uuid,
    /// At most one thread is expanded at a time per view.
    pub selected_thread: Option<Uuid>,
    pub type_filter: TypeFilter,
    pub status_filter: StatusFilter,
    pub chat: Vec<ChatMessage>,
    pub mutations: Vec<ThreadMutation>,
    pub opened_at: DateTime<Utc>,
}

impl EditorSession {
    pub fn new(survey_id: Uuid) -> Self {
        Self {
            survey_id,
            selected_thread: None,
            type_filter: TypeFilter::default(),
            status_filter: StatusFilter::default(),
            chat: Vec::new(),
            mutations: Vec::new(),
            opened_at: Utc::now(),
        }
    }

    /// Selecting a thread implicitly deselects the previous one.
    pub fn select_thread(&mut self, thread_id: Uuid) {
        self.selected_thread = Some(thread_id);
    }

    pub fn clear_selection(&mut self) {
        self.selected_thread = None;
    }

    pub fn set_filters(&mut self, type_filter: TypeFilter, status_filter: StatusFilter) {
        self.type_filter = type_filter;
        self.status_filter = status_filter;
    }

    /// Record an optimistic flip of `committed` and return the local value
    /// the caller should show immediately.
    pub fn begin_toggle(&mut self, thread_id: Uuid, committed: bool) -> bool {
        let local = !committed;
        match self.mutation_mut(thread_id) {
            Some(mutation) => {
                mutation.state = MutationState::Pending;
                mutation.last_committed = committed;
                mutation.local = local;
            }
            None => self.mutations.push(ThreadMutation {
                thread_id,
                state: MutationState::Pending,
                last_committed: committed,
                local,
            }),
        }
        local
    }

    /// The persistence call succeeded; the local value is now authoritative.
    pub fn commit_toggle(&mut self, thread_id: Uuid) {
        if let Some(mutation) = self.mutation_mut(thread_id) {
            mutation.state = MutationState::Committed;
            mutation.last_committed = mutation.local;
        }
    }

    /// The persistence call failed; revert to the last committed value and
    /// return it.
    pub fn fail_toggle(&mut self, thread_id: Uuid) -> Option<bool> {
        self.mutation_mut(thread_id).map(|mutation| {
            mutation.state = MutationState::Failed;
            mutation.local = mutation.last_committed;
            mutation.local
        })
    }

    pub fn local_status(&self, thread_id: Uuid) -> Option<bool> {
        self.mutations
            .iter()
            .find(|m| m.thread_id == thread_id)
            .map(|m| m.local)
    }

    pub fn push_chat(&mut self, role: ChatRole, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        };
        self.chat.push(message.clone());
        message
    }

    fn mutation_mut(&mut self, thread_id: Uuid) -> Option<&mut ThreadMutation> {
        self.mutations.iter_mut().find(|m| m.thread_id == thread_id)
    }
}

/// Live editor sessions keyed by survey id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, EditorSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the session for a survey and return a snapshot of it.
    pub fn open(&self, survey_id: Uuid) -> EditorSession {
        self.sessions
            .entry(survey_id)
            .or_insert_with(|| EditorSession::new(survey_id))
            .clone()
    }

    pub fn get(&self, survey_id: Uuid) -> Option<EditorSession> {
        self.sessions.get(&survey_id).map(|entry| entry.clone())
    }

    /// Run `f` against the survey's session, creating it if needed.
    pub fn with<R>(&self, survey_id: Uuid, f: impl FnOnce(&mut EditorSession) -> R) -> R {
        let mut entry = self
            .sessions
            .entry(survey_id)
            .or_insert_with(|| EditorSession::new(survey_id));
        f(entry.value_mut())
    }

    /// Discard the session. Returns false when none was open.
    pub fn close(&self, survey_id: Uuid) -> bool {
        self.sessions.remove(&survey_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_a_thread_replaces_the_previous_selection() {
        let mut session = EditorSession::new(Uuid::new_v4());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        session.select_thread(first);
        assert_eq!(session.selected_thread, Some(first));

        session.select_thread(second);
        assert_eq!(session.selected_thread, Some(second));

        session.clear_selection();
        assert_eq!(session.selected_thread, None);
    }

    #[test]
    fn failed_toggle_reverts_to_last_committed() {
        let mut session = EditorSession::new(Uuid::new_v4());
        let thread_id = Uuid::new_v4();

        let local = session.begin_toggle(thread_id, false);
        assert!(local);
        assert_eq!(session.local_status(thread_id), Some(true));

        let reverted = session.fail_toggle(thread_id);
        assert_eq!(reverted, Some(false));
        assert_eq!(session.local_status(thread_id), Some(false));
        assert_eq!(
            session.mutations[0].state,
            MutationState::Failed,
        );
    }

    #[test]
    fn committed_toggle_becomes_the_new_baseline() {
        let mut session = EditorSession::new(Uuid::new_v4());
        let thread_id = Uuid::new_v4();

        session.begin_toggle(thread_id, false);
        session.commit_toggle(thread_id);

        // A second flip starts from the committed value.
        let local = session.begin_toggle(thread_id, true);
        assert!(!local);
        let reverted = session.fail_toggle(thread_id);
        assert_eq!(reverted, Some(true));
    }

    #[test]
    fn registry_open_close_lifecycle() {
        let registry = SessionRegistry::new();
        let survey_id = Uuid::new_v4();

        assert!(registry.get(survey_id).is_none());
        let session = registry.open(survey_id);
        assert_eq!(session.survey_id, survey_id);

        registry.with(survey_id, |s| s.select_thread(Uuid::new_v4()));
        assert!(registry.get(survey_id).unwrap().selected_thread.is_some());

        assert!(registry.close(survey_id));
        assert!(!registry.close(survey_id));
        assert!(registry.get(survey_id).is_none());
    }
}
