use crate::database::models::{
    ExpenseEvent, FinancialEvent, JarDirection, JarEvent, ParseOutcome, RawMessage,
};
use crate::parser::regex::{RegexPatterns, DELETE_KEYWORD};
use crate::utils::Validator;
use log::{debug, warn};

/// Sentinel category when a message carries no "Categoria:" tag.
pub const UNKNOWN_CATEGORY: &str = "Desconhecido";

/// Stateless grammar parser. The same text always yields the same outcome;
/// a deletion keyword wins over both grammars, and the jar grammar is tried
/// before the expense grammar.
#[derive(Clone, Debug)]
pub struct MessageParser {
    patterns: &'static RegexPatterns,
}

impl MessageParser {
    pub fn new() -> Self {
        Self {
            patterns: RegexPatterns::get_instance(),
        }
    }

    /// Parses one raw message into a typed financial event.
    ///
    /// Returns `None` when neither grammar matches (the message is silently
    /// dropped, not tombstoned).
    pub fn parse(&self, message: &RawMessage) -> Option<ParseOutcome> {
        debug!("Parsing message {}: {}", message.id, message.text);

        if self.is_deletion(&message.text) {
            debug!("Deletion keyword in message {}, tombstoning", message.id);
            return Some(ParseOutcome::Tombstone);
        }

        if let Some(jar) = self.parse_jar(message) {
            return Some(ParseOutcome::Event(FinancialEvent::Jar(jar)));
        }

        if let Some(expense) = self.parse_expense(message) {
            return Some(ParseOutcome::Event(FinancialEvent::Expense(expense)));
        }

        debug!("Message {} matches no grammar, dropping", message.id);
        None
    }

    /// Case-insensitive containment check for the deletion keyword.
    pub fn is_deletion(&self, text: &str) -> bool {
        text.to_lowercase().contains(DELETE_KEYWORD)
    }

    fn parse_jar(&self, message: &RawMessage) -> Option<JarEvent> {
        let caps = self.patterns.jar_regex.captures(&message.text)?;

        let jar_name = caps.get(1)?.as_str().trim().to_string();
        let direction = if caps.get(2)?.as_str().eq_ignore_ascii_case("mais") {
            JarDirection::Credit
        } else {
            JarDirection::Debit
        };
        let amount = caps.get(3)?.as_str().parse::<f64>().ok()?;

        if !Validator::is_valid_label(&jar_name) || !Validator::is_valid_amount(amount) {
            warn!("Rejecting jar entry in message {}: bad name or amount", message.id);
            return None;
        }

        debug!("Jar event: {jar_name} {direction:?} {amount}");
        Some(JarEvent {
            message_id: message.id,
            timestamp: message.timestamp,
            jar_name,
            amount,
            direction,
        })
    }

    fn parse_expense(&self, message: &RawMessage) -> Option<ExpenseEvent> {
        let caps = self.patterns.expense_regex.captures(&message.text)?;

        let label = caps.get(1)?.as_str().trim().to_string();
        let amount = caps.get(2)?.as_str().parse::<f64>().ok()?;
        let paid = caps.get(3)?.as_str().eq_ignore_ascii_case("pago");
        let category = Self::extract_category(&message.text);

        if !Validator::is_valid_label(&label) || !Validator::is_valid_amount(amount) {
            warn!("Rejecting expense in message {}: bad label or amount", message.id);
            return None;
        }

        debug!("Expense event: {label} {amount} paid={paid} category={category}");
        Some(ExpenseEvent {
            message_id: message.id,
            timestamp: message.timestamp,
            label,
            amount,
            paid,
            category,
        })
    }

    /// Everything after the literal "Categoria:" marker, trimmed.
    fn extract_category(text: &str) -> String {
        match text.split_once("Categoria:") {
            Some((_, rest)) => rest.trim().to_string(),
            None => UNKNOWN_CATEGORY.to_string(),
        }
    }
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(text: &str) -> RawMessage {
        RawMessage {
            id: 42,
            chat_id: 1,
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn parses_expense_with_category() {
        let parser = MessageParser::new();
        let outcome = parser.parse(&msg("Mercado - 250 - Pago Categoria:Alimentação"));

        match outcome {
            Some(ParseOutcome::Event(FinancialEvent::Expense(e))) => {
                assert_eq!(e.label, "Mercado");
                assert_eq!(e.amount, 250.0);
                assert!(e.paid);
                assert_eq!(e.category, "Alimentação");
                assert_eq!(e.message_id, 42);
            }
            other => panic!("expected expense event, got {other:?}"),
        }
    }

    #[test]
    fn parses_unpaid_expense_without_category() {
        let parser = MessageParser::new();
        let outcome = parser.parse(&msg("Aluguel - 1200 - Não Pago"));

        match outcome {
            Some(ParseOutcome::Event(FinancialEvent::Expense(e))) => {
                assert_eq!(e.label, "Aluguel");
                assert!(!e.paid);
                assert_eq!(e.category, UNKNOWN_CATEGORY);
            }
            other => panic!("expected expense event, got {other:?}"),
        }
    }

    #[test]
    fn jar_grammar_wins_over_expense_grammar() {
        let parser = MessageParser::new();
        let outcome = parser.parse(&msg("Caixinha: Viagem - mais 100"));

        match outcome {
            Some(ParseOutcome::Event(FinancialEvent::Jar(j))) => {
                assert_eq!(j.jar_name, "Viagem");
                assert_eq!(j.amount, 100.0);
                assert_eq!(j.direction, JarDirection::Credit);
            }
            other => panic!("expected jar event, got {other:?}"),
        }
    }

    #[test]
    fn parses_jar_debit_with_fraction() {
        let parser = MessageParser::new();
        let outcome = parser.parse(&msg("Caixinha: Reserva de emergência - menos 55.75"));

        match outcome {
            Some(ParseOutcome::Event(FinancialEvent::Jar(j))) => {
                assert_eq!(j.jar_name, "Reserva de emergência");
                assert_eq!(j.amount, 55.75);
                assert_eq!(j.direction, JarDirection::Debit);
            }
            other => panic!("expected jar event, got {other:?}"),
        }
    }

    #[test]
    fn deletion_keyword_wins_over_grammar_match() {
        let parser = MessageParser::new();
        assert_eq!(
            parser.parse(&msg("deletar Mercado - 250 - Pago")),
            Some(ParseOutcome::Tombstone)
        );
        assert_eq!(
            parser.parse(&msg("DELETAR Caixinha: Viagem - mais 100")),
            Some(ParseOutcome::Tombstone)
        );
    }

    #[test]
    fn rejects_label_spanning_lines() {
        let parser = MessageParser::new();
        assert_eq!(parser.parse(&msg("Mercado\nPadaria - 100 - Pago")), None);
    }

    #[test]
    fn rejects_amount_beyond_limit() {
        let parser = MessageParser::new();
        assert_eq!(parser.parse(&msg("Mercado - 99999999999 - Pago")), None);
    }

    #[test]
    fn unmatched_text_is_dropped_silently() {
        let parser = MessageParser::new();
        assert_eq!(parser.parse(&msg("hello world")), None);
        assert_eq!(parser.parse(&msg("")), None);
    }

    #[test]
    fn parse_is_deterministic() {
        let parser = MessageParser::new();
        let m = msg("Transporte - 30 - Pago");
        assert_eq!(parser.parse(&m), parser.parse(&m));
    }
}
