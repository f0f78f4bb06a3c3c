//! Conversation controller
//!
//! Owns the form inputs, the pending follow-up text, the conversation history
//! and the `started`/`loading` flags. A presentation layer reads
//! [`ConversationSnapshot`]s and calls the operations here; it never mutates
//! state directly.
//!
//! The controller is a cheap clonable handle so an operation can run on a
//! spawned task while the UI keeps rendering. The state lock is never held
//! across the completion call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::ai::CompletionService;
use crate::error::{CompletionError, ControllerError};
use crate::prompt;
use crate::state::{ChatMessage, ConversationSnapshot, FormField, FormInputs};

/// What happens to the user's message when a follow-up request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedTurnPolicy {
    /// Leave the user message in history without an assistant reply
    #[default]
    KeepUserMessage,
    /// Remove the user message again
    RollBack,
}

#[derive(Debug, Default)]
struct ControllerState {
    form: FormInputs,
    user_input: String,
    messages: Vec<ChatMessage>,
    started: bool,
    loading: bool,
}

fn lock(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `loading` when the request ends, including when the future is dropped
struct InFlight {
    state: Arc<Mutex<ControllerState>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.state).loading = false;
    }
}

#[derive(Clone)]
pub struct ConversationController {
    state: Arc<Mutex<ControllerState>>,
    service: Arc<dyn CompletionService>,
    model: String,
    failed_turn_policy: FailedTurnPolicy,
}

impl ConversationController {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState::default())),
            service,
            model: model.into(),
            failed_turn_policy: FailedTurnPolicy::default(),
        }
    }

    pub fn with_failed_turn_policy(mut self, policy: FailedTurnPolicy) -> Self {
        self.failed_turn_policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        lock(&self.state)
    }

    // Change handlers

    pub fn set_input(&self, field: FormField, value: String) {
        self.state().form.set(field, value);
    }

    pub fn input(&self, field: FormField) -> String {
        self.state().form.get(field).to_string()
    }

    pub fn set_user_input(&self, value: String) {
        self.state().user_input = value;
    }

    pub fn user_input(&self) -> String {
        self.state().user_input.clone()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = self.state();
        ConversationSnapshot {
            form: state.form.clone(),
            user_input: state.user_input.clone(),
            messages: state.messages.clone(),
            started: state.started,
            loading: state.loading,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn is_started(&self) -> bool {
        self.state().started
    }

    // Button handlers

    /// Submit the form currently held in state
    pub async fn submit_form(&self) -> Result<ChatMessage, ControllerError> {
        let inputs = self.state().form.clone();
        self.submit_inspiration_request(inputs).await
    }

    /// Send the pending follow-up text currently held in state
    pub async fn send_user_input(&self) -> Result<Option<ChatMessage>, ControllerError> {
        let text = self.state().user_input.clone();
        self.send_follow_up(&text).await
    }

    // Operations

    /// Ask for the initial five career inspirations.
    ///
    /// On success the conversation is exactly `[system, user, assistant]` and
    /// the controller is started. On failure nothing but `loading` changes.
    ///
    /// # Errors
    ///
    /// `Validation` if a field is empty (no request is sent), `Busy` while
    /// another request is outstanding, `Completion` if the service fails.
    pub async fn submit_inspiration_request(&self, inputs: FormInputs) -> Result<ChatMessage, ControllerError> {
        if let Some(field) = inputs.first_missing() {
            warn!(%field, "inspiration request rejected: field is empty");
            return Err(ControllerError::Validation { field });
        }

        let _in_flight = {
            let mut state = self.state();
            self.begin_request(&mut state)?
        };

        let [system, user] = prompt::seed_messages(&inputs);
        let seed = vec![system, user];
        let reply = self.request(&seed).await?;

        {
            let mut state = self.state();
            let mut messages = seed;
            messages.push(reply.clone());
            state.messages = messages;
            if !state.started {
                debug!("conversation started");
            }
            state.started = true;
        }

        Ok(reply)
    }

    /// Send one follow-up turn with the whole history.
    ///
    /// Whitespace-only text is ignored and returns `Ok(None)`. The pending
    /// input buffer is cleared as soon as the turn is accepted.
    ///
    /// # Errors
    ///
    /// `NotStarted` before the first inspiration arrived, `Busy` while another
    /// request is outstanding, `Completion` if the service fails. What happens
    /// to the user message on failure depends on [`FailedTurnPolicy`].
    pub async fn send_follow_up(&self, user_text: &str) -> Result<Option<ChatMessage>, ControllerError> {
        if user_text.trim().is_empty() {
            return Ok(None);
        }

        let (history, _in_flight) = {
            let mut state = self.state();
            if !state.started {
                return Err(ControllerError::NotStarted);
            }
            let in_flight = self.begin_request(&mut state)?;
            state.user_input.clear();
            state.messages.push(ChatMessage::user(user_text));
            (state.messages.clone(), in_flight)
        };

        let reply = match self.request(&history).await {
            Ok(reply) => reply,
            Err(e) => {
                if self.failed_turn_policy == FailedTurnPolicy::RollBack {
                    let mut state = self.state();
                    if state.messages.len() == history.len() {
                        state.messages.pop();
                        debug!("rolled back unanswered user message");
                    }
                }
                return Err(e.into());
            }
        };

        self.state().messages.push(reply.clone());
        Ok(Some(reply))
    }

    fn begin_request(&self, state: &mut ControllerState) -> Result<InFlight, ControllerError> {
        if state.loading {
            warn!("request rejected: another request is in flight");
            return Err(ControllerError::Busy);
        }
        state.loading = true;
        Ok(InFlight { state: Arc::clone(&self.state) })
    }

    async fn request(&self, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        info!(model = %self.model, messages = messages.len(), "requesting completion");

        let result = self
            .service
            .complete(&self.model, messages)
            .await
            .and_then(|reply| {
                if reply.content.trim().is_empty() {
                    Err(CompletionError::EmptyReply)
                } else {
                    Ok(ChatMessage::assistant(reply.content))
                }
            });

        match &result {
            Ok(reply) => debug!(chars = reply.content.chars().count(), "completion received"),
            Err(e) => warn!(error = %e, "completion failed"),
        }
        result
    }
}
