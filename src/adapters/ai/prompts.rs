//! Prompt templates for question and option generation.

use crate::domain::assessment::ChatMessage;

/// Shown in the option prompt before any option exists.
pub const NO_OPTIONS_PLACEHOLDER: &str = "(no options yet)";

/// Renders messages as `role: content` lines.
pub fn format_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Existing options one per line, or the placeholder.
pub fn combine_options(options: &[String]) -> String {
    if options.is_empty() {
        NO_OPTIONS_PLACEHOLDER.to_string()
    } else {
        options.join("\n")
    }
}

pub fn question_prompt(element_name: &str, element_description: &str, history: &str) -> String {
    let history = if history.is_empty() {
        "(no questions asked yet for this element)"
    } else {
        history
    };
    format!(
        "You are interviewing someone to understand their personality.\n\
         The current dimension is \"{element_name}\": {element_description}\n\
         \n\
         Conversation so far for this dimension:\n\
         {history}\n\
         \n\
         Ask exactly one new, open question that explores this dimension from an angle \
         not yet covered. Build on the person's previous answers where useful. \
         Reply with the question only."
    )
}

pub fn option_prompt(messages: &str, existing_options: &str) -> String {
    format!(
        "Below is an interview in progress. The last line is the question the person \
         must now answer.\n\
         \n\
         {messages}\n\
         \n\
         Candidate answers already proposed:\n\
         {existing_options}\n\
         \n\
         Write one short, natural answer the person might give, in the first person, \
         clearly different from the candidates above. Reply with the answer only."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_renders_role_prefixed_lines() {
        let messages = vec![
            ChatMessage::assistant("How do you recharge?"),
            ChatMessage::user("Reading alone"),
        ];
        assert_eq!(
            format_history(&messages),
            "assistant: How do you recharge?\nuser: Reading alone"
        );
    }

    #[test]
    fn empty_options_use_placeholder() {
        assert_eq!(combine_options(&[]), NO_OPTIONS_PLACEHOLDER);
        assert_eq!(
            combine_options(&["A".to_string(), "B".to_string()]),
            "A\nB"
        );
    }

    #[test]
    fn question_prompt_names_the_element() {
        let prompt = question_prompt("energy", "inner vs outer world", "");
        assert!(prompt.contains("\"energy\""));
        assert!(prompt.contains("inner vs outer world"));
        assert!(prompt.contains("no questions asked yet"));
    }
}
