pub mod message;
pub mod regex;

pub use message::MessageParser;
pub use regex::RegexPatterns;
