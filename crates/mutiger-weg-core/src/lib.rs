pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod state;

// Re-export main types for convenience
pub use ai::{ClaudeClient, CompletionClient, CompletionOptions, CompletionService, OllamaClient, OpenAIClient};
pub use config::Config;
pub use controller::{ConversationController, FailedTurnPolicy};
pub use error::{CompletionError, ControllerError};
pub use provider::Provider;
pub use state::{ChatMessage, ChatRole, ConversationSnapshot, FormField, FormInputs};
