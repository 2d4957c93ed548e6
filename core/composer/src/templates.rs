use weekly_journal_schemas::JournalEntry;

pub const SUMMARY_PREAMBLE: &str = "You are a helpful assistant. Summarize the following journal entries into a concise weekly summary:";
pub const SUMMARY_CUE: &str = "Summary:";

/// Renders journal entries into the weekly summary prompt
pub struct PromptRenderer;

impl PromptRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render the full prompt. Entries keep the order they are given in.
    pub fn render(&self, entries: &[JournalEntry]) -> String {
        let entries_text = entries
            .iter()
            .map(|e| self.render_entry(e))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!("{}\n\n{}\n\n{}", SUMMARY_PREAMBLE, entries_text, SUMMARY_CUE)
    }

    fn render_entry(&self, entry: &JournalEntry) -> String {
        format!(
            "Date: {}\nWhat I did: {}\nWhat I learned: {}",
            entry.date, entry.what_i_did, entry.what_i_learned
        )
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}
