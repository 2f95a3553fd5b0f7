// 🗺️ County Profiles - Per-source quirks behind one trait
//
// Each county roll has its own habits: surname-first exports, "(2)" duplicate
// counters, care-of lines, local abbreviations. A profile is the only place
// those live; the resolver never branches on a county name.
//
// Adding a county = implement CountyProfile + one arm in profile_for().

use crate::classifier::Classification;
use crate::error::{ResolveError, Result};
use crate::person_parser::NameOrderTie;
use crate::vocabulary::{DesignationKind, DesignationRule, Vocabulary};
use regex::Regex;

// ============================================================================
// TRAIT
// ============================================================================

pub trait CountyProfile: Send + Sync {
    /// Profile name as used in configuration
    fn name(&self) -> &str;

    /// Clean raw owner text before tokenizing
    fn preprocess(&self, raw: &str) -> String {
        raw.to_string()
    }

    /// Name-order tie rule this source is known to follow
    fn tie_break(&self) -> Option<NameOrderTie> {
        None
    }

    /// Add local company terms / designations
    fn extend_vocabulary(&self, _vocabulary: &mut Vocabulary) {}

    /// Force a classification for candidates this source marks explicitly
    fn classify_override(&self, _candidate: &str) -> Option<Classification> {
        None
    }
}

// ============================================================================
// FACTORY
// ============================================================================

pub const PROFILE_NAMES: &[&str] = &["generic", "surname_first"];

/// Profile for a configured county name
pub fn profile_for(name: &str) -> Result<Box<dyn CountyProfile>> {
    match name.trim().to_lowercase().replace('-', "_").as_str() {
        "" | "generic" => Ok(Box::new(GenericProfile)),
        "surname_first" => Ok(Box::new(SurnameFirstProfile::new()?)),
        other => Err(ResolveError::Config(format!(
            "unknown county profile {:?} (expected one of: {})",
            other,
            PROFILE_NAMES.join(", ")
        ))),
    }
}

// ============================================================================
// PROFILES
// ============================================================================

/// Default behaviour, no county-specific handling
#[derive(Debug, Default)]
pub struct GenericProfile;

impl CountyProfile for GenericProfile {
    fn name(&self) -> &str {
        "generic"
    }
}

/// Assessor rolls that always print "LAST FIRST MIDDLE"
/// - equal-length first/last tokens read surname-first
/// - "(2)" style duplicate counters are removed
/// - care-of lines ("% JANE DOE", "C/O JANE DOE") are mailing data, not owners
/// - "EST" alone abbreviates ESTATE
pub struct SurnameFirstProfile {
    counter: Regex,
    care_of: Regex,
}

impl SurnameFirstProfile {
    pub fn new() -> Result<Self> {
        Ok(SurnameFirstProfile {
            counter: Regex::new(r"\(\s*\d+\s*\)")?,
            care_of: Regex::new(r"(?i)^\s*(?:%|C/O\b|CARE OF\b)")?,
        })
    }
}

impl CountyProfile for SurnameFirstProfile {
    fn name(&self) -> &str {
        "surname_first"
    }

    fn preprocess(&self, raw: &str) -> String {
        raw.lines()
            .filter(|line| !self.care_of.is_match(line))
            .map(|line| self.counter.replace_all(line, " ").into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tie_break(&self) -> Option<NameOrderTie> {
        Some(NameOrderTie::LastFirst)
    }

    fn extend_vocabulary(&self, vocabulary: &mut Vocabulary) {
        vocabulary.add_designation(DesignationRule::new("est", "EST", DesignationKind::Estate));
        vocabulary.add_company_term("irrigation district");
        vocabulary.add_company_term("cemetery");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_factory() {
        assert_eq!(profile_for("generic").unwrap().name(), "generic");
        assert_eq!(profile_for("Surname-First").unwrap().name(), "surname_first");
        assert_eq!(profile_for("").unwrap().name(), "generic");
        assert!(matches!(profile_for("atlantis"), Err(ResolveError::Config(_))));
    }

    #[test]
    fn test_generic_profile_is_passthrough() {
        let profile = GenericProfile;
        assert_eq!(profile.preprocess("SMITH JOHN (2)"), "SMITH JOHN (2)");
        assert_eq!(profile.tie_break(), None);
        assert_eq!(profile.classify_override("ANYTHING"), None);
    }

    #[test]
    fn test_surname_first_preprocess() {
        let profile = SurnameFirstProfile::new().unwrap();
        let cleaned = profile.preprocess("SMITH JOHN (2)\n% JANE DOE\nC/O BOB ROE\nDOE MARY");

        assert_eq!(cleaned.lines().count(), 2);
        assert!(!cleaned.contains("(2)"));
        assert!(!cleaned.contains("JANE"));
        assert!(cleaned.contains("DOE MARY"));
    }

    #[test]
    fn test_surname_first_vocabulary() {
        let profile = SurnameFirstProfile::new().unwrap();
        let mut vocabulary = Vocabulary::default();
        profile.extend_vocabulary(&mut vocabulary);

        assert!(vocabulary.designations.iter().any(|r| r.id == "est"));
        assert!(vocabulary.company_terms.contains(&"cemetery".to_string()));
        assert_eq!(profile.tie_break(), Some(NameOrderTie::LastFirst));
    }
}
