use std::sync::Arc;

use tracing::debug;

use super::types::Command;
use crate::phrases::{normalize, PhraseTable, Phrasebook};

/// Fixed-phrase command decoder.
///
/// Tier order is fixed: navigation prefix, then the exact command table, then
/// unknown. Some command phrases could collide with substrings of the
/// navigation pattern, so the order must not change.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    phrasebook: Arc<Phrasebook>,
}

impl CommandDecoder {
    pub fn new(phrasebook: Arc<Phrasebook>) -> Self {
        Self { phrasebook }
    }

    pub fn phrasebook(&self) -> &Phrasebook {
        &self.phrasebook
    }

    /// Top-level decode: raw transcript -> command.
    pub fn decode(&self, raw: &str) -> Command {
        let text = normalize(raw);

        // 1. Navigation prefix
        if let Some(pos) = text.find(self.phrasebook.navigation_prefix.as_str()) {
            let target = text[pos + self.phrasebook.navigation_prefix.len()..].trim();
            return match self.phrasebook.targets.lookup(target) {
                Some(screen) => Command::navigate(screen),
                None => {
                    debug!("Unknown navigation target: {:?}", target);
                    Command::unknown()
                }
            };
        }

        // 2. Exact phrase table
        match self.phrasebook.commands.lookup(&text) {
            Some(intent) => Command::bare(intent),
            // 3. Nothing matched
            None => Command::unknown(),
        }
    }

    /// Answer-turn decode against a context-specific table. The navigation
    /// tier does not apply here: "go to settings" while a theme answer is
    /// pending is simply not a theme.
    pub fn decode_answer<T: Copy + PartialEq>(&self, raw: &str, table: &PhraseTable<T>) -> Option<T> {
        table.lookup(&normalize(raw))
    }
}
