//! UI-agnostic conversation state types
//!
//! This module contains data structures that are shared between the controller
//! and whichever presentation layer renders it. Nothing here depends on a UI
//! framework.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A chat message in the conversation with the completion service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One of the three required form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Traumjob,
    Interessen,
    Staerken,
}

impl FormField {
    pub fn all() -> [FormField; 3] {
        [FormField::Traumjob, FormField::Interessen, FormField::Staerken]
    }

    /// Question shown next to the input
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Traumjob => "Was sind deine wichtigsten Kriterien für deinen Traumjob?",
            FormField::Interessen => "Was sind deine Top 3 Interessen?",
            FormField::Staerken => "Was sind deine Top 3 Stärken?",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::Traumjob => "traumjob",
            FormField::Interessen => "interessen",
            FormField::Staerken => "staerken",
        };
        f.write_str(name)
    }
}

/// The three free-text answers collected by the form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInputs {
    pub traumjob: String,
    pub interessen: String,
    pub staerken: String,
}

impl FormInputs {
    pub fn new(
        traumjob: impl Into<String>,
        interessen: impl Into<String>,
        staerken: impl Into<String>,
    ) -> Self {
        Self {
            traumjob: traumjob.into(),
            interessen: interessen.into(),
            staerken: staerken.into(),
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Traumjob => &self.traumjob,
            FormField::Interessen => &self.interessen,
            FormField::Staerken => &self.staerken,
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::Traumjob => self.traumjob = value,
            FormField::Interessen => self.interessen = value,
            FormField::Staerken => self.staerken = value,
        }
    }

    /// First empty field, if any. Whitespace counts as content.
    pub fn first_missing(&self) -> Option<FormField> {
        FormField::all().into_iter().find(|f| self.get(*f).is_empty())
    }

    pub fn is_complete(&self) -> bool {
        self.first_missing().is_none()
    }
}

/// Read-only copy of the controller state handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub form: FormInputs,
    pub user_input: String,
    pub messages: Vec<ChatMessage>,
    pub started: bool,
    pub loading: bool,
}

impl ConversationSnapshot {
    /// Messages that are shown to the user, in arrival order
    pub fn transcript(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != ChatRole::System)
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && self.form.is_complete()
    }

    pub fn can_send(&self) -> bool {
        self.started && !self.loading && !self.user_input.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn test_first_missing_follows_field_order() {
        let inputs = FormInputs::new("", "Technik", "");
        assert_eq!(inputs.first_missing(), Some(FormField::Traumjob));

        let inputs = FormInputs::new("a", "b", "");
        assert_eq!(inputs.first_missing(), Some(FormField::Staerken));
    }

    #[test]
    fn test_whitespace_counts_as_filled() {
        let inputs = FormInputs::new(" ", "\t", "\n");
        assert!(inputs.is_complete());
    }

    #[test]
    fn test_transcript_hides_system_message() {
        let snapshot = ConversationSnapshot {
            messages: vec![
                ChatMessage::system("persona"),
                ChatMessage::user("frage"),
                ChatMessage::assistant("antwort"),
            ],
            started: true,
            ..Default::default()
        };
        let roles: Vec<ChatRole> = snapshot.transcript().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant]);
    }

    #[test]
    fn test_can_send_requires_started_and_text() {
        let mut snapshot = ConversationSnapshot {
            user_input: "   ".to_string(),
            started: true,
            ..Default::default()
        };
        assert!(!snapshot.can_send());
        snapshot.user_input = "Mehr zu Punkt 2".to_string();
        assert!(snapshot.can_send());
        snapshot.loading = true;
        assert!(!snapshot.can_send());
    }
}
