//! Name normalization and blocking keys.
//!
//! Every metric compares normalized names, never raw extractor output. The
//! normalizer lowercases, folds punctuation, drops stop words and maps common
//! business abbreviations onto one spelling so that "Acme Trucking Co." and
//! "Acme Trucking Company" compare equal.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

const STOP_WORDS: [&str; 10] = ["the", "and", "a", "an", "of", "to", "for", "in", "on", "by"];

/// Tokens ignored when deriving the short form of an acronym.
const LEGAL_SUFFIXES: [&str; 9] = [
    "company",
    "incorporated",
    "corporation",
    "limited",
    "llc",
    "lp",
    "llp",
    "plc",
    "gmbh",
];

/// Longest single token still treated as a possible acronym.
const MAX_ACRONYM_LEN: usize = 6;

static DROPPED: OnceLock<Option<Regex>> = OnceLock::new();
static TIGHT_AMPERSAND: OnceLock<Option<Regex>> = OnceLock::new();
static SEPARATORS: OnceLock<Option<Regex>> = OnceLock::new();

fn dropped() -> Option<&'static Regex> {
    // Apostrophes and periods vanish without splitting: "steve's" -> "steves", "u.s." -> "us".
    DROPPED.get_or_init(|| Regex::new(r"['\u{2019}.]").ok()).as_ref()
}

fn tight_ampersand() -> Option<&'static Regex> {
    TIGHT_AMPERSAND.get_or_init(|| Regex::new(r"(\w)&(\w)").ok()).as_ref()
}

fn separators() -> Option<&'static Regex> {
    SEPARATORS.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").ok()).as_ref()
}

/// Applies a rewrite; a pattern that failed to compile leaves the text as is.
fn rewrite<'t>(pattern: Option<&Regex>, text: &'t str, replacement: &str) -> Cow<'t, str> {
    match pattern {
        Some(re) => re.replace_all(text, replacement),
        None => Cow::Borrowed(text),
    }
}

fn canonical_token(token: &str) -> &str {
    match token {
        "co" | "cos" | "comp" | "cmpny" => "company",
        "inc" | "incorp" => "incorporated",
        "corp" => "corporation",
        "ltd" => "limited",
        "intl" | "intnl" => "international",
        "xpress" | "exp" => "express",
        "bros" => "brothers",
        "svc" | "svcs" => "services",
        "mfg" => "manufacturing",
        "natl" => "national",
        "assoc" | "assocs" => "associates",
        "trkg" => "trucking",
        "frt" => "freight",
        "dist" => "distribution",
        other => other,
    }
}

/// A name reduced to comparable tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    tokens: Vec<String>,
    joined: String,
}

impl NormalizedName {
    /// Normalizes a raw name.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_mapper::normalize::NormalizedName;
    ///
    /// let a = NormalizedName::new("Acme Trucking Co.");
    /// let b = NormalizedName::new("ACME TRUCKING COMPANY");
    /// assert_eq!(a, b);
    /// ```
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        let lowered = rewrite(dropped(), &lowered, "");
        let lowered = rewrite(tight_ampersand(), &lowered, "${1}${2}");
        let cleaned = rewrite(separators(), &lowered, " ");

        let all: Vec<String> = cleaned
            .split_whitespace()
            .map(|t| canonical_token(t).to_string())
            .collect();
        let kept: Vec<String> = all
            .iter()
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
            .cloned()
            .collect();
        // A name made only of stop words ("The And") keeps them rather than vanishing.
        let tokens = if kept.is_empty() { all } else { kept };
        let joined = tokens.join(" ");

        Self { tokens, joined }
    }

    /// Normalized tokens in original order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Tokens joined by single spaces.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.joined
    }

    /// True when nothing comparable survived normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Distinct tokens.
    #[must_use]
    pub fn token_set(&self) -> BTreeSet<&str> {
        self.tokens.iter().map(String::as_str).collect()
    }

    /// The name read as an acronym, if it plausibly is one.
    ///
    /// Either a single short token ("ibm") or a run of single letters
    /// ("i b m" after "I.B.M" lost its periods to spacing).
    #[must_use]
    pub fn acronym_form(&self) -> Option<String> {
        match self.tokens.as_slice() {
            [single] => {
                let len = single.chars().count();
                (2..=MAX_ACRONYM_LEN).contains(&len).then(|| single.clone())
            }
            many if many.len() >= 2 && many.iter().all(|t| t.chars().count() == 1) => {
                Some(many.concat())
            }
            _ => None,
        }
    }

    /// Acronyms this name could be abbreviated to.
    ///
    /// The first entry uses every token; the second, when different, skips
    /// legal suffixes ("Bennett Truck Transport LLC" -> "bttl", "btt").
    #[must_use]
    pub fn derived_acronyms(&self) -> Vec<String> {
        if self.tokens.len() < 2 {
            return Vec::new();
        }
        let initials = |skip_legal: bool| -> String {
            self.tokens
                .iter()
                .filter(|t| !(skip_legal && LEGAL_SUFFIXES.contains(&t.as_str())))
                .filter_map(|t| t.chars().next())
                .collect()
        };

        let full = initials(false);
        let short = initials(true);
        let mut out = vec![full];
        if short.chars().count() >= 2 && !out.contains(&short) {
            out.push(short);
        }
        out
    }

    /// Coarse blocking keys for this name under the given entity type.
    #[must_use]
    pub fn blocking_keys(&self, entity_type: EntityType) -> BTreeSet<BlockingKey> {
        match entity_type {
            EntityType::Company | EntityType::Person | EntityType::Location | EntityType::Other => self
                .tokens
                .iter()
                .filter_map(|t| t.chars().next())
                .map(BlockingKey::from_char)
                .collect(),
            // Reference numbers are compared as a whole; only the leading class blocks.
            EntityType::ShipmentReference => self
                .joined
                .chars()
                .find(|c| !c.is_whitespace())
                .map(BlockingKey::from_char)
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined)
    }
}

/// Cheap, coarse key used to prune the directory before scoring.
///
/// Letters key by themselves; all digits share one key so OCR confusion
/// between digits never splits a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockingKey(char);

impl BlockingKey {
    /// Key shared by every token starting with a digit.
    pub const DIGIT: Self = Self('#');

    /// Key for a token starting with `c`.
    #[must_use]
    pub fn from_char(c: char) -> Self {
        if c.is_numeric() {
            Self::DIGIT
        } else {
            Self(c.to_lowercase().next().unwrap_or(c))
        }
    }

    /// The underlying character.
    #[must_use]
    pub const fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for BlockingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_punctuation_and_abbreviations() {
        assert_eq!(NormalizedName::new("Acme Trucking Co.").as_str(), "acme trucking company");
        assert_eq!(NormalizedName::new("  GT XPRESS, INC ").as_str(), "gt express incorporated");
        assert_eq!(NormalizedName::new("Steve's Trucking").as_str(), "steves trucking");
    }

    #[test]
    fn rewrite_patterns_compile() {
        assert!(dropped().is_some());
        assert!(tight_ampersand().is_some());
        assert!(separators().is_some());
        assert_eq!(rewrite(None, "a.b", ""), "a.b");
        assert_eq!(NormalizedName::new("U.S. Xpress/Inc").as_str(), "us express incorporated");
    }

    #[test]
    fn drops_stop_words_but_never_everything() {
        assert_eq!(NormalizedName::new("The Bank of Springfield").as_str(), "bank springfield");
        assert_eq!(NormalizedName::new("The").as_str(), "the");
        assert!(NormalizedName::new("!!!").is_empty());
    }

    #[test]
    fn ampersands() {
        assert_eq!(NormalizedName::new("AT&T").as_str(), "att");
        assert_eq!(NormalizedName::new("Smith & Sons").as_str(), "smith sons");
    }

    #[test]
    fn acronym_forms() {
        assert_eq!(NormalizedName::new("IBM").acronym_form().as_deref(), Some("ibm"));
        assert_eq!(NormalizedName::new("I B M").acronym_form().as_deref(), Some("ibm"));
        assert_eq!(NormalizedName::new("I.B.M.").acronym_form().as_deref(), Some("ibm"));
        assert_eq!(NormalizedName::new("Internationale").acronym_form(), None);
        assert_eq!(NormalizedName::new("Acme Trucking").acronym_form(), None);
    }

    #[test]
    fn derived_acronyms_skip_legal_suffixes() {
        let name = NormalizedName::new("Bennett Truck Transport, LLC");
        assert_eq!(name.derived_acronyms(), vec!["bttl".to_string(), "btt".to_string()]);

        let ibm = NormalizedName::new("International Business Machines");
        assert_eq!(ibm.derived_acronyms(), vec!["ibm".to_string()]);

        assert!(NormalizedName::new("Linbis").derived_acronyms().is_empty());
    }

    #[test]
    fn blocking_keys_cover_every_token() {
        let keys = NormalizedName::new("Trucking Co Acme").blocking_keys(EntityType::Company);
        assert!(keys.contains(&BlockingKey::from_char('a')));
        assert!(keys.contains(&BlockingKey::from_char('t')));
        assert!(keys.contains(&BlockingKey::from_char('c')));
    }

    #[test]
    fn blocking_keys_fold_digits() {
        let keys = NormalizedName::new("7 Hills Freight").blocking_keys(EntityType::Company);
        assert!(keys.contains(&BlockingKey::DIGIT));

        let reference = NormalizedName::new("PRO 448812").blocking_keys(EntityType::ShipmentReference);
        assert_eq!(reference.len(), 1);
        assert!(reference.contains(&BlockingKey::from_char('p')));
    }
}
