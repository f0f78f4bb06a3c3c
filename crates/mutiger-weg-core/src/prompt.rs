//! Prompt templates for the career-inspiration conversation

use crate::state::{ChatMessage, FormInputs};

/// Persona and constraints for the coach. Sent first, never rendered.
pub const SYSTEM_PROMPT: &str = "\
Du bist ein inspirierender KI-Coach für Berufsorientierung.
Deine Aufgabe ist es, basierend auf den Interessen und Stärken des Nutzers passende Berufsinspirationen zu geben.
Stelle keine Diagnosen und gib keine vorschnellen Ratschläge.
Fokussiere dich darauf, neue Perspektiven zu eröffnen und Denkanstöße zu geben.";

/// Render the seeded user prompt asking for five job suggestions
pub fn inspiration_prompt(inputs: &FormInputs) -> String {
    let mut prompt = String::new();

    prompt.push_str("Basierend auf folgenden Informationen, gib 5 konkrete Berufsinspirationen:\n\n");
    prompt.push_str(&format!("Traumjob-Kriterien: {}\n", inputs.traumjob));
    prompt.push_str(&format!("Top 3 Interessen: {}\n", inputs.interessen));
    prompt.push_str(&format!("Top 3 Stärken: {}\n\n", inputs.staerken));
    prompt.push_str("Für jeden Beruf:\n");
    prompt.push_str("1. Nenne den Berufstitel\n");
    prompt.push_str("2. Erkläre kurz, warum dieser Beruf passen könnte\n");
    prompt.push_str("3. Gib 2-3 Kernaufgaben des Berufs\n\n");
    prompt.push_str("Formatiere die Antwort übersichtlich mit Emojis und Absätzen.");

    prompt
}

/// The system + user pair that opens every conversation
pub fn seed_messages(inputs: &FormInputs) -> [ChatMessage; 2] {
    [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(inspiration_prompt(inputs)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;

    #[test]
    fn test_prompt_embeds_all_inputs() {
        let inputs = FormInputs::new(
            "Flexible Arbeitszeiten",
            "Technik, Natur, Schreiben",
            "Kreativität, Analyse, Empathie",
        );
        let prompt = inspiration_prompt(&inputs);
        assert!(prompt.contains("Traumjob-Kriterien: Flexible Arbeitszeiten"));
        assert!(prompt.contains("Top 3 Interessen: Technik, Natur, Schreiben"));
        assert!(prompt.contains("Top 3 Stärken: Kreativität, Analyse, Empathie"));
        assert!(prompt.contains("5 konkrete Berufsinspirationen"));
    }

    #[test]
    fn test_seed_starts_with_system() {
        let [system, user] = seed_messages(&FormInputs::new("a", "b", "c"));
        assert_eq!(system.role, ChatRole::System);
        assert_eq!(system.content, SYSTEM_PROMPT);
        assert_eq!(user.role, ChatRole::User);
    }

    #[test]
    fn test_system_prompt_forbids_diagnoses() {
        assert!(SYSTEM_PROMPT.contains("keine Diagnosen"));
    }
}
