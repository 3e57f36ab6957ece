//! Lowercasing tokenizer with English stop word removal.
//!
//! Splits on any non-alphanumeric character and drops single-character
//! tokens. Tokens are byte spans into one lowercased buffer, so tokenizing
//! allocates once regardless of token count.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "if", "in", "into", "is", "it", "its", "no", "not", "of", "on", "or", "such", "that",
        "the", "their", "then", "there", "these", "they", "this", "to", "was", "were", "will",
        "with",
    ]
    .into_iter()
    .collect()
});

/// Tokenized text.
pub struct Tokens {
    buffer: String,
    spans: Vec<(usize, usize)>,
}

impl Tokens {
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans.iter().map(|&(s, e)| &self.buffer[s..e])
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

fn keep(term: &str) -> bool {
    term.chars().nth(1).is_some() && !STOP_WORDS.contains(term)
}

/// Lowercases, splits on non-alphanumerics, drops stop words and 1-char tokens.
pub fn tokenize(text: &str) -> Tokens {
    let buffer = text.to_lowercase();
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;

    let ends = buffer
        .char_indices()
        .map(|(i, c)| (i, c.is_alphanumeric()))
        .chain(std::iter::once((buffer.len(), false)));
    for (i, alnum) in ends {
        match (open, alnum) {
            (None, true) => open = Some(i),
            (Some(start), false) => {
                if keep(&buffer[start..i]) {
                    spans.push((start, i));
                }
                open = None;
            }
            _ => {}
        }
    }

    Tokens { buffer, spans }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<String> {
        tokenize(text).iter().map(str::to_string).collect()
    }

    #[test]
    fn test_stop_words_and_case() {
        assert_eq!(
            words("The Quick brown fox jumps over the lazy dog"),
            vec!["quick", "brown", "fox", "jumps", "over", "lazy", "dog"]
        );
    }

    #[test]
    fn test_punctuation_and_short_tokens() {
        assert_eq!(words("vector-search, v2 (HNSW)!"), vec!["vector", "search", "v2", "hnsw"]);
        assert_eq!(words("a b c"), Vec::<String>::new());
    }

    #[test]
    fn test_unicode_boundaries() {
        // Multi-byte characters count as one char each
        assert_eq!(words("café ñ naïve"), vec!["café", "naïve"]);
        assert!(tokenize("").is_empty());
    }
}
