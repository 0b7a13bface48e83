//! Deterministic text matching against the vocabulary: exact alias match,
//! normalized alias match, then token-overlap / edit-distance similarity.

use crate::config::vocabulary::FieldRole;
use crate::config::vocabulary::FieldSpec;
use crate::config::vocabulary::Unit;
use serde::Serialize;
use std::collections::HashSet;
use strsim::normalized_levenshtein;

/// Confidence of a normalized (punctuation and case insensitive) alias match
pub const NORMALIZED_CONFIDENCE: f64 = 0.95;

/// How a header text was resolved to a canonical field
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Normalized,
    Fuzzy,
    /// Market column recovered left of the detected region
    MarketRecovery,
    Unmatched,
}

/// Lowercase alphanumerics only: `"Reach (%)"` becomes `"reach"`.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|character| character.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase word tokens. Separators split words; other punctuation is
/// dropped inside a word, so `"R&F"` is the single token `"rf"`.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|character: char| {
        character.is_whitespace() || matches!(character, '-' | '_' | '/' | '\\' | '|' | ',' | '.' | ':' | ';' | '(' | ')' | '[' | ']')
    })
    .map(normalize_text)
    .filter(|token| !token.is_empty())
    .collect()
}

/// Jaccard index of the token sets of two texts
pub fn token_overlap(left: &str, right: &str) -> f64 {
    let left: HashSet<String> = tokens(left).into_iter().collect();
    let right: HashSet<String> = tokens(right).into_iter().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    shared as f64 / (left.len() + right.len() - shared) as f64
}

/// Similarity in [0, 1]: the better of token overlap and normalized edit distance.
pub fn similarity(left: &str, right: &str) -> f64 {
    let (normalized_left, normalized_right) = (normalize_text(left), normalize_text(right));
    if normalized_left.is_empty() || normalized_right.is_empty() {
        return 0.0;
    }
    token_overlap(left, right).max(normalized_levenshtein(&normalized_left, &normalized_right))
}

/// A header text resolved to a canonical field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMatch {
    pub name: String,
    pub role: FieldRole,
    pub unit: Unit,
    pub confidence: f64,
    pub method: MatchMethod,
}

/// Alias lookup over a list of canonical fields
#[derive(Clone, Debug)]
pub struct Matcher {
    fields: Vec<FieldSpec>,
    /// (field index, lowercased alias, normalized alias); canonical names are aliases too
    aliases: Vec<(usize, String, String)>,
    /// Minimum similarity for a fuzzy match
    floor: f64,
}

impl Matcher {
    pub fn new(fields: &[FieldSpec], floor: f64) -> Self {
        let mut aliases = Vec::new();
        for (index, field) in fields.iter().enumerate() {
            let names = std::iter::once(field.name.replace('_', " ")).chain(field.aliases.iter().cloned());
            for alias in names {
                let lowered = alias.trim().to_lowercase();
                let normalized = normalize_text(&alias);
                if !normalized.is_empty() {
                    aliases.push((index, lowered, normalized));
                }
            }
        }
        Matcher {
            fields: fields.to_vec(),
            aliases,
            floor,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Resolves a header text; the first matching step wins.
    pub fn resolve(&self, text: &str) -> Option<FieldMatch> {
        let lowered = text.trim().to_lowercase();
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return None;
        }

        if let Some((index, _, _)) = self.aliases.iter().find(|(_, alias, _)| *alias == lowered) {
            return Some(self.to_match(*index, 1.0, MatchMethod::Exact));
        }
        if let Some((index, _, _)) = self.aliases.iter().find(|(_, _, alias)| *alias == normalized) {
            return Some(self.to_match(*index, NORMALIZED_CONFIDENCE, MatchMethod::Normalized));
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, alias, _) in &self.aliases {
            let score = similarity(text, alias);
            if score >= self.floor && best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
                best = Some((*index, score));
            }
        }
        best.map(|(index, score)| self.to_match(index, score, MatchMethod::Fuzzy))
    }

    fn to_match(&self, index: usize, confidence: f64, method: MatchMethod) -> FieldMatch {
        let field = &self.fields[index];
        FieldMatch {
            name: field.name.to_owned(),
            role: field.role,
            unit: field.unit,
            confidence,
            method,
        }
    }
}

/// Keyword membership test used for detection keywords, market indicators,
/// platform aliases and report-type keywords.
#[derive(Clone, Debug, Default)]
pub struct KeywordSet {
    /// (normalized keyword, keyword tokens)
    keywords: Vec<(String, Vec<String>)>,
}

impl KeywordSet {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        KeywordSet {
            keywords: keywords
                .iter()
                .map(|keyword| (normalize_text(keyword.as_ref()), tokens(keyword.as_ref())))
                .filter(|(normalized, _)| !normalized.is_empty())
                .collect(),
        }
    }

    /// True when the text equals a keyword once normalized.
    pub fn is_exact(&self, text: &str) -> bool {
        let normalized = normalize_text(text);
        !normalized.is_empty() && self.keywords.iter().any(|(keyword, _)| *keyword == normalized)
    }

    /// True when the text equals a keyword once normalized, or contains all
    /// of a keyword's tokens as words.
    pub fn matches(&self, text: &str) -> bool {
        if self.is_exact(text) {
            return true;
        }
        let words: HashSet<String> = tokens(text).into_iter().collect();
        self.keywords
            .iter()
            .any(|(_, keyword_tokens)| !keyword_tokens.is_empty() && keyword_tokens.iter().all(|token| words.contains(token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::vocabulary::Vocabulary;

    #[test]
    fn normalize_and_tokenize() {
        assert_eq!(normalize_text(" Reach (%) "), "reach");
        assert_eq!(normalize_text("CTR %"), "ctr");
        assert_eq!(tokens("R&F - Meta_2024"), vec!["rf", "meta", "2024"]);
        assert_eq!(tokens("Metrics / Market"), vec!["metrics", "market"]);
    }

    #[test]
    fn similarity_scores() {
        assert_eq!(similarity("Impressions", "impressions"), 1.0);
        assert!(similarity("Impresions", "impressions") >= 0.75);
        assert!(similarity("Total Clicks", "clicks") < 0.75);
        assert!(similarity("Budget", "Market") < 0.75);
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(token_overlap("video views", "views video"), 1.0);
    }

    #[test]
    fn resolve_in_order() {
        let matcher = Matcher::new(&Vocabulary::default().fields, 0.75);

        let exact = matcher.resolve("  Impressions ").unwrap();
        assert_eq!((exact.name.as_str(), exact.method, exact.confidence), ("IMPRESSIONS", MatchMethod::Exact, 1.0));

        let normalized = matcher.resolve("C.T.R").unwrap();
        assert_eq!(normalized.name, "CTR");
        assert_eq!(normalized.method, MatchMethod::Normalized);
        assert_eq!(normalized.confidence, NORMALIZED_CONFIDENCE);

        // canonical names resolve as aliases
        assert_eq!(matcher.resolve("start_date").unwrap().name, "START_DATE");

        let fuzzy = matcher.resolve("Impresions").unwrap();
        assert_eq!(fuzzy.name, "IMPRESSIONS");
        assert_eq!(fuzzy.method, MatchMethod::Fuzzy);
        assert!(fuzzy.confidence >= 0.75 && fuzzy.confidence < 1.0);

        assert!(matcher.resolve("Notes").is_none());
        assert!(matcher.resolve("   ").is_none());
    }

    #[test]
    fn keyword_sets() {
        let keywords = KeywordSet::new(&["market", "start date", "r&f"]);
        assert!(keywords.matches("MARKET"));
        assert!(keywords.matches("Metrics / Market"));
        assert!(keywords.matches("Start Date (planned)"));
        assert!(keywords.matches("R&F Meta"));
        assert!(!keywords.matches("Performance"));
        assert!(!keywords.matches("Start"));
        assert!(keywords.is_exact("Market"));
        assert!(!keywords.is_exact("Metrics / Market"));
    }
}
