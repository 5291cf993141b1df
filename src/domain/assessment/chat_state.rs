//! Per-session conversation checkpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::element::ElementId;
use super::scheduler::PhaseScheduler;
use crate::domain::foundation::{QuestionId, SessionId, UserId, ValidationError};

/// Conversation phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    #[default]
    Ask,
    Diagnosis,
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationPhase::Ask => write!(f, "ask"),
            ConversationPhase::Diagnosis => write!(f, "diagnosis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// Result of a successful undo on the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoOutcome {
    pub steps: u32,
    pub messages_removed: usize,
    pub next_display_order: u32,
}

/// Checkpoint of one session's conversation.
///
/// The transcript opens with an empty user turn and alternates from there, so
/// while a question is pending it holds `2 * next_display_order` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    pub user_id: UserId,
    pub session_id: SessionId,
    #[serde(default)]
    pub phase: ConversationPhase,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Answers keyed by the 1-based number of the question they answer.
    #[serde(default)]
    pub answers: BTreeMap<u32, String>,
    #[serde(default)]
    pub next_display_order: u32,
    #[serde(default)]
    pub pending_question: Option<String>,
    /// Repository ids of asked questions keyed by 0-based display order.
    #[serde(default)]
    pub question_ids: BTreeMap<u32, QuestionId>,
    /// Latest candidate answers only.
    #[serde(default)]
    pub options: Vec<String>,
    /// Overrides the element of the first phase.
    #[serde(default)]
    pub seed_element: Option<ElementId>,
    /// Store-managed optimistic concurrency counter.
    #[serde(default)]
    pub revision: u64,
}

impl ChatState {
    pub fn new(user_id: UserId, session_id: SessionId) -> Self {
        Self {
            user_id,
            session_id,
            phase: ConversationPhase::Ask,
            messages: Vec::new(),
            answers: BTreeMap::new(),
            next_display_order: 0,
            pending_question: None,
            question_ids: BTreeMap::new(),
            options: Vec::new(),
            seed_element: None,
            revision: 0,
        }
    }

    pub fn with_seed_element(mut self, element: ElementId) -> Self {
        self.seed_element = Some(element);
        self
    }

    /// Element of the question at `order`, honouring the first-phase seed.
    pub fn element_for_order(&self, order: u32, scheduler: &PhaseScheduler) -> ElementId {
        match self.seed_element {
            Some(seed) if order < scheduler.questions_per_phase() => seed,
            _ => scheduler.element_for(i64::from(order)),
        }
    }

    /// Element currently being assessed, derived from the pending question.
    pub fn personality_element_id(&self, scheduler: &PhaseScheduler) -> ElementId {
        self.element_for_order(self.next_display_order.saturating_sub(1), scheduler)
    }

    /// Repository id of the question awaiting an answer.
    pub fn pending_question_id(&self) -> Option<QuestionId> {
        self.next_display_order
            .checked_sub(1)
            .and_then(|order| self.question_ids.get(&order).copied())
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    /// Empty user turn that precedes the first question.
    pub fn open_transcript(&mut self) {
        if self.messages.is_empty() {
            self.push_user("");
        }
    }

    /// Appends an asked question and advances the order.
    pub fn record_question(&mut self, question_id: QuestionId, text: impl Into<String>) {
        let text = text.into();
        self.question_ids.insert(self.next_display_order, question_id);
        self.messages.push(ChatMessage::assistant(text.clone()));
        self.pending_question = Some(text);
        self.next_display_order += 1;
    }

    pub fn replace_options(&mut self, options: Vec<String>) {
        self.options = options;
    }

    pub fn can_undo(&self, steps: u32) -> bool {
        steps >= 1 && self.next_display_order >= steps
    }

    /// Rewinds `steps` rounds. Leaves the state untouched on error.
    pub fn undo(&mut self, steps: u32) -> Result<UndoOutcome, ValidationError> {
        if !self.can_undo(steps) {
            return Err(ValidationError::out_of_range(
                "steps",
                1,
                i64::from(self.next_display_order),
                i64::from(steps),
            ));
        }

        let messages_removed = (steps as usize * 2).min(self.messages.len());
        self.messages.truncate(self.messages.len() - messages_removed);
        self.next_display_order -= steps;

        let order = self.next_display_order;
        self.answers.retain(|number, _| *number < order);
        self.question_ids.retain(|display_order, _| *display_order < order);
        self.pending_question = self
            .messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(|m| m.content.clone());
        self.options.clear();
        self.phase = ConversationPhase::Ask;

        Ok(UndoOutcome {
            steps,
            messages_removed,
            next_display_order: order,
        })
    }
}
