use regex::Regex;
use std::sync::OnceLock;

/// Keyword that forces tombstoning regardless of any grammar match.
pub const DELETE_KEYWORD: &str = "deletar";

#[derive(Debug)]
pub struct RegexPatterns {
    pub jar_regex: Regex,
    pub expense_regex: Regex,
}

impl RegexPatterns {
    pub fn new() -> Self {
        Self {
            // Caixinha: <name> - mais|menos <amount>
            jar_regex: Regex::new(
                r"(?i)Caixinha:\s*([\p{L}\s]+?)\s*-\s*(mais|menos)\s*(\d+(?:\.\d+)?)",
            )
            .unwrap(),
            // <label> - <integer> - Pago|Não Pago
            expense_regex: Regex::new(r"(?i)([\p{L}\s]+?)\s*-\s*(\d+)\s*-\s*(Pago|Não\s?Pago)")
                .unwrap(),
        }
    }

    pub fn get_instance() -> &'static Self {
        static INSTANCE: OnceLock<RegexPatterns> = OnceLock::new();
        INSTANCE.get_or_init(RegexPatterns::new)
    }
}

impl Default for RegexPatterns {
    fn default() -> Self {
        Self::new()
    }
}
