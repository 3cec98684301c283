//! Keyword matching shared by the mode classifier and the scorer.

/// A comment keyword, matched against whole upper-cased tokens.
#[derive(Debug, Clone, Copy)]
pub enum Keyword {
    /// Token equals the word.
    Word(&'static str),
    /// Token is the stem optionally followed by digits (`PSK31`, `UP5`).
    Stem(&'static str),
}

impl Keyword {
    pub fn matches(self, token: &str) -> bool {
        match self {
            Keyword::Word(word) => token == word,
            Keyword::Stem(stem) => token
                .strip_prefix(stem)
                .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit())),
        }
    }
}

/// Upper-cased alphanumeric tokens of a comment.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

pub fn contains_any(tokens: &[String], keywords: &[Keyword]) -> bool {
    tokens
        .iter()
        .any(|token| keywords.iter().any(|keyword| keyword.matches(token)))
}
