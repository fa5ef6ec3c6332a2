use crate::session::types::Turn;

/// Rolling conversation window fed to answer generation.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    max_turns: usize,
}

impl RollingHistory {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    /// Render the last `max_turns` turns as a prompt block.
    pub fn prompt_block(&self, turns: &[Turn]) -> String {
        if turns.is_empty() || self.max_turns == 0 {
            return "(no previous turns yet)".to_string();
        }
        let start = turns.len().saturating_sub(self.max_turns);
        let mut lines = Vec::new();
        for turn in &turns[start..] {
            lines.push(format!("[Turn {}] User: {}", turn.index, turn.user_text));
            lines.push(format!(
                "[Turn {}] Assistant: {}",
                turn.index, turn.assistant_text
            ));
        }
        lines.join("\n")
    }
}
