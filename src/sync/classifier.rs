use crate::database::models::{
    ExpenseEvent, FinancialEvent, JarEvent, ParseOutcome, RawMessage,
};
use crate::parser::MessageParser;
use log::debug;
use std::collections::HashSet;

/// One fetch window split by event type, plus the keys that must be
/// tombstoned. Output order carries no meaning; downstream stages re-sort.
#[derive(Debug, Default)]
pub struct ClassifiedBatch {
    pub expenses: Vec<ExpenseEvent>,
    pub jars: Vec<JarEvent>,
    pub tombstones: Vec<i64>,
}

impl ClassifiedBatch {
    /// Every message id seen in this window, events and tombstones alike.
    /// Store keys absent from this set fell out of the polled window.
    pub fn window_keys(&self) -> HashSet<i64> {
        self.expenses
            .iter()
            .map(|e| e.message_id)
            .chain(self.jars.iter().map(|j| j.message_id))
            .chain(self.tombstones.iter().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty() && self.jars.is_empty() && self.tombstones.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct EventClassifier {
    parser: MessageParser,
}

impl EventClassifier {
    pub fn new() -> Self {
        Self {
            parser: MessageParser::new(),
        }
    }

    /// Runs the parser over a fetch window, keeping only messages from the
    /// configured chat. Unparseable messages are dropped without a
    /// tombstone; the deletion keyword adds the id to `tombstones`.
    pub fn classify(&self, messages: &[RawMessage], chat_filter: i64) -> ClassifiedBatch {
        let mut batch = ClassifiedBatch::default();

        for message in messages {
            if message.chat_id != chat_filter {
                debug!(
                    "Skipping message {} from foreign chat {}",
                    message.id, message.chat_id
                );
                continue;
            }

            match self.parser.parse(message) {
                Some(ParseOutcome::Event(FinancialEvent::Expense(e))) => batch.expenses.push(e),
                Some(ParseOutcome::Event(FinancialEvent::Jar(j))) => batch.jars.push(j),
                Some(ParseOutcome::Tombstone) => batch.tombstones.push(message.id),
                None => {}
            }
        }

        debug!(
            "Classified {} expenses, {} jar entries, {} tombstones",
            batch.expenses.len(),
            batch.jars.len(),
            batch.tombstones.len()
        );
        batch
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new()
    }
}
