//! Phase-scoped view of the transcript handed to the generator.
//!
//! Each element is assessed independently, so when producing question `n` the
//! generator only sees the questions (and their answers) of `n`'s own phase.

use super::chat_state::ChatMessage;

/// Returns the current phase's question/answer pairs preceding question `n`.
///
/// `target_question_number` is 1-based. Assistant messages are counted as
/// questions; one is kept when its running number lies in
/// `[phase_start, n - 1]`, and the user message right after a kept question is
/// kept as its answer. Returns an empty list for `n <= 0` and for the first
/// question of a phase.
pub fn filter_by_phase(
    messages: &[ChatMessage],
    target_question_number: i64,
    questions_per_phase: u32,
) -> Vec<ChatMessage> {
    if target_question_number <= 0 || questions_per_phase == 0 {
        return Vec::new();
    }

    let q = i64::from(questions_per_phase);
    let n = target_question_number;
    let current_phase = (n - 1) / q + 1;
    let phase_start = (current_phase - 1) * q + 1;
    if n == phase_start {
        return Vec::new();
    }

    let mut filtered = Vec::new();
    let mut question_number = 0i64;
    let mut previous_kept = false;

    for message in messages {
        if message.is_assistant() {
            question_number += 1;
            previous_kept = (phase_start..n).contains(&question_number);
            if previous_kept {
                filtered.push(message.clone());
            }
        } else {
            if previous_kept {
                filtered.push(message.clone());
            }
            previous_kept = false;
        }
    }

    filtered
}
