// 🏷️ Entity Classifier - Person vs Company
//
// A whole-word hit in the company vocabulary wins over everything else:
// "Smith Family Trust" must never reach the human-name parser.

use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Person,
    Company,
    /// Neither shape; carries the reason for the audit list
    Unclassifiable(String),
}

pub struct EntityClassifier {
    /// Company terms pre-split into lower-case word sequences
    terms: Vec<Vec<String>>,
    vocabulary: Vocabulary,
}

impl EntityClassifier {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let terms = vocabulary
            .company_terms
            .iter()
            .map(|term| words(term))
            .filter(|w| !w.is_empty())
            .collect();

        EntityClassifier {
            terms,
            vocabulary: vocabulary.clone(),
        }
    }

    pub fn classify(&self, candidate: &str) -> Classification {
        if !candidate.chars().any(|c| c.is_alphabetic()) {
            return Classification::Unclassifiable("no alphabetic characters".to_string());
        }

        if self.matched_term(candidate).is_some() {
            return Classification::Company;
        }

        if self.vocabulary.is_placeholder(candidate) {
            return Classification::Unclassifiable(format!(
                "placeholder value {:?}",
                candidate.trim()
            ));
        }

        Classification::Person
    }

    pub fn is_company(&self, candidate: &str) -> bool {
        self.matched_term(candidate).is_some()
    }

    /// First company term found in the candidate, as written in the vocabulary
    pub fn matched_term(&self, candidate: &str) -> Option<String> {
        let candidate_words = words(candidate);

        self.terms
            .iter()
            .find(|term| {
                candidate_words
                    .windows(term.len())
                    .any(|window| window == term.as_slice())
            })
            .map(|term| term.join(" "))
    }
}

/// Lower-cased words with periods dropped first ("L.L.C." -> "llc")
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace('.', "")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
