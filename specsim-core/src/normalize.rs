//! Text normalization
//!
//! Requirements are compared on a cleaned token string rather than on the
//! raw text. The engine only depends on the `TextNormalizer` trait; the
//! `BasicNormalizer` here is what the import pipeline and the query front
//! door use by default.

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// German stopword list, one word per line
const GERMAN_STOPWORDS: &str = include_str!("german_stopwords.txt");

/// The bundled German stopwords
pub fn german_stopwords() -> impl Iterator<Item = &'static str> {
    GERMAN_STOPWORDS
        .lines()
        .map(str::trim)
        .filter(|word| !word.is_empty())
}

/// Snowball stemmer applied to every surviving token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stemming {
    #[default]
    Off,
    German,
    English,
}

impl Stemming {
    fn stemmer(self) -> Option<Stemmer> {
        match self {
            Stemming::Off => None,
            Stemming::German => Some(Stemmer::create(Algorithm::German)),
            Stemming::English => Some(Stemmer::create(Algorithm::English)),
        }
    }
}

/// Turns raw text into a normalized token string
pub trait TextNormalizer {
    /// Returns `None` when the input is blank or nothing survives cleaning
    fn normalize(&self, raw: &str) -> Option<String>;
}

/// Phrase removal, lowercasing, punctuation/digit stripping, stopwords and
/// optional stemming
#[derive(Debug, Clone, Default)]
pub struct BasicNormalizer {
    words_to_remove: Vec<String>,
    stopwords: HashSet<String>,
    stemming: Stemming,
}

impl BasicNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// German stopwords and German stemming
    pub fn german() -> Self {
        Self::new()
            .with_stopwords(german_stopwords())
            .with_stemming(Stemming::German)
    }

    /// Phrases removed verbatim (case-sensitive) before anything else
    pub fn with_words_to_remove<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words_to_remove = words.into_iter().map(Into::into).collect();
        self
    }

    /// Tokens dropped after lowercasing
    pub fn with_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = words
            .into_iter()
            .map(|w| w.into().to_lowercase())
            .collect();
        self
    }

    pub fn with_stemming(mut self, stemming: Stemming) -> Self {
        self.stemming = stemming;
        self
    }
}

impl TextNormalizer for BasicNormalizer {
    fn normalize(&self, raw: &str) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }

        let mut text = raw.to_string();
        for word in &self.words_to_remove {
            if !word.is_empty() {
                text = text.replace(word.as_str(), "");
            }
        }

        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_ascii_punctuation() && !c.is_ascii_digit())
            .collect();

        let stemmer = self.stemming.stemmer();
        let tokens: Vec<String> = cleaned
            .split_whitespace()
            .filter(|token| !self.stopwords.contains(*token))
            .map(|token| match &stemmer {
                Some(stemmer) => stemmer.stem(token).into_owned(),
                None => token.to_string(),
            })
            .collect();

        if tokens.is_empty() {
            None
        } else {
            Some(tokens.join(" "))
        }
    }
}
