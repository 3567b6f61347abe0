//! crates/tcm_assistant_core/src/dialogue.rs
//!
//! The turn state machine. Owns the session, derives the dialogue phase,
//! drives retrieval + prompt composition + the model call, and records the
//! exchange. Extended-advice requests are side queries: they re-run the model
//! against an existing user turn without touching the history.

use std::sync::Arc;

use crate::domain::{ConversationTurn, DialoguePhase, Role, Session, UserProfile};
use crate::ports::{ChatMessage, CompletionService, KnowledgeRetriever, PortError, PortResult};
use crate::prompt;
use crate::retrieval;
use tracing::{info, warn};

/// What `submit` did with the input.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Both the free text and the staged symptoms were empty; nothing changed.
    Ignored,
    /// A (user, assistant) turn pair was appended to the history.
    Answered,
}

pub struct DialogueController {
    session: Session,
    retriever: Option<Arc<dyn KnowledgeRetriever>>,
    model: Arc<dyn CompletionService>,
    temperature: f32,
}

impl DialogueController {
    pub fn new(
        retriever: Option<Arc<dyn KnowledgeRetriever>>,
        model: Arc<dyn CompletionService>,
        temperature: f32,
    ) -> Self {
        Self {
            session: Session::default(),
            retriever,
            model,
            temperature,
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.session.history
    }

    pub fn pending_symptoms(&self) -> impl Iterator<Item = &str> {
        self.session.pending_symptoms.iter().map(String::as_str)
    }

    pub fn profile(&self) -> &UserProfile {
        &self.session.profile
    }

    pub fn set_profile(&mut self, profile: UserProfile) {
        self.session.profile = profile;
    }

    /// Stages a symptom tag for the next submission.
    pub fn select_symptom(&mut self, tag: impl Into<String>) {
        self.session.pending_symptoms.insert(tag.into());
    }

    pub fn deselect_symptom(&mut self, tag: &str) {
        self.session.pending_symptoms.remove(tag);
    }

    pub fn clear_symptoms(&mut self) {
        self.session.pending_symptoms.clear();
    }

    /// The stage of questioning the next submission will perform. Intake for
    /// an empty history; everything after the first exchange is
    /// assessment-capable.
    pub fn current_phase(&self) -> DialoguePhase {
        if self.session.history.is_empty() {
            DialoguePhase::Intake
        } else {
            DialoguePhase::Assessment
        }
    }

    /// Merges the staged symptom tags and the free text into one query:
    /// tags joined with 、, then the text, separated by ； when both exist.
    fn merge_query(&self, raw_text: &str) -> String {
        let tags = self
            .session
            .pending_symptoms
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("、");
        let text = raw_text.trim();
        match (tags.is_empty(), text.is_empty()) {
            (false, false) => format!("{tags}；{text}"),
            (false, true) => tags,
            (true, _) => text.to_string(),
        }
    }

    fn history_messages(&self) -> Vec<ChatMessage> {
        self.session
            .history
            .iter()
            .map(|turn| match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            })
            .collect()
    }

    /// Runs one full model round: retrieval, prompt, completion. A failed
    /// completion is folded into the returned text so the session survives it.
    async fn run_model(&self, phase: DialoguePhase, query: &str) -> String {
        let extended = phase == DialoguePhase::ExtendedAdvice;
        let knowledge = retrieval::fetch(self.retriever.as_deref(), query, extended).await;
        let system = prompt::compose(phase, &self.session.profile, &knowledge);

        let mut messages = Vec::with_capacity(self.session.history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(self.history_messages());
        messages.push(ChatMessage::user(query));

        match self.model.complete(&messages, self.temperature).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("completion call failed: {e}");
                format!("❌ API调用失败：{e}")
            }
        }
    }

    /// Handles one user submission. Consumes the staged symptoms, appends a
    /// timestamped user turn and the assistant reply. Empty input is a no-op.
    pub async fn submit(&mut self, raw_text: &str) -> SubmitOutcome {
        let query = self.merge_query(raw_text);
        if query.is_empty() {
            return SubmitOutcome::Ignored;
        }
        self.session.pending_symptoms.clear();

        let phase = self.current_phase();
        info!(?phase, "handling consultation turn");
        let reply = self.run_model(phase, &query).await;

        self.session.history.push(ConversationTurn::user(query));
        self.session.history.push(ConversationTurn::assistant(reply));
        SubmitOutcome::Answered
    }

    /// Re-runs the model in extended-advice mode against the user turn at
    /// `turn_index`. Returns ephemeral display text; the history is not
    /// mutated.
    pub async fn request_extended(&self, turn_index: usize) -> PortResult<String> {
        let turn = self
            .session
            .history
            .get(turn_index)
            .filter(|t| t.role == Role::User)
            .ok_or_else(|| {
                PortError::Unexpected(format!("no user turn at history index {turn_index}"))
            })?;

        let query = turn.content.clone();
        Ok(self.run_model(DialoguePhase::ExtendedAdvice, &query).await)
    }

    /// Full reset of the dialogue: history and staged symptoms are cleared,
    /// the profile is preserved.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Clears the demographic profile on explicit request.
    pub fn clear_profile(&mut self) {
        self.session.profile = UserProfile::default();
    }
}
