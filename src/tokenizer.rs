// ✂️ Raw Owner Tokenizer - One owner cell → ordered owner candidates
//
// Owner cells arrive as free text: "SMITH, JOHN & MARY JTWROS", "JOHN DOE 1/2 INT;
// ACME LLC", "ESTATE OF JANE ROE ET AL". This module only cuts; it never decides
// person vs company (that is the classifier's job) and never drops text silently:
// removed designations and broken interest annotations are carried as notes.
//
// Order of operations:
// 1. Lines: newline / carriage return / semicolon
// 2. Commas: split, then re-join "LAST, FIRST" pairs and trailing fragments
// 3. Designations: strip fiduciary/estate/tenancy phrases (recorded)
// 4. Members: split on "&" / "AND" unless that would break a company name
// 5. Interest: lift "1/2 INT" / "25%" out of each member

use crate::classifier::EntityClassifier;
use crate::entities::InterestShare;
use crate::error::Result;
use crate::invalid::AuditNote;
use crate::outcome::Outcome;
use crate::vocabulary::{DesignationKind, DesignationRule, Vocabulary};
use regex::Regex;

// ============================================================================
// OWNER CANDIDATE
// ============================================================================

/// A substring believed to name exactly one owner
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OwnerCandidate {
    /// Member text before interest removal (used for audit and aliases)
    pub raw_text: String,

    /// Cleaned text handed to the classifier / parser
    pub text: String,

    /// Where the text came from ("owners", "grantee"...)
    pub source_context: Option<String>,

    /// Index of the comma/line segment this candidate was cut from
    pub segment: usize,

    pub interest: Option<InterestShare>,

    /// Tenancy group implied by a stripped designation ("joint_tenants")
    pub interest_group: Option<String>,

    /// Designation phrases removed from this candidate's segment
    pub designations: Vec<String>,

    /// Given name(s) cut from an "&" list; borrows a household surname
    pub needs_surname: bool,

    /// Audit notes (malformed annotations etc.)
    pub notes: Vec<String>,
}

impl OwnerCandidate {
    fn new(raw_text: &str, text: String, segment: usize) -> Self {
        OwnerCandidate {
            raw_text: raw_text.trim().to_string(),
            text,
            segment,
            ..Default::default()
        }
    }
}

/// Candidates of one blob plus notes that belong to no candidate
/// (an annotation with nothing before it to bind to)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenizedBlob {
    pub candidates: Vec<OwnerCandidate>,
    pub notes: Vec<AuditNote>,
}

/// Result of designation stripping on one segment
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrippedSegment {
    pub text: String,
    pub removed: Vec<String>,
    pub group: Option<String>,
}

struct CompiledDesignation {
    rule: DesignationRule,
    regex: Regex,
}

// ============================================================================
// TOKENIZER
// ============================================================================

pub struct RawOwnerTokenizer {
    vocabulary: Vocabulary,
    designations: Vec<CompiledDesignation>,
    fraction: Regex,
    percent: Regex,
    malformed_fraction: Regex,
    member_split: Regex,
}

impl RawOwnerTokenizer {
    pub fn new(vocabulary: &Vocabulary) -> Result<Self> {
        let designations = vocabulary
            .designations
            .iter()
            .map(|rule| {
                Ok(CompiledDesignation {
                    rule: rule.clone(),
                    regex: Regex::new(&rule.pattern())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RawOwnerTokenizer {
            vocabulary: vocabulary.clone(),
            designations,
            fraction: Regex::new(
                r"(?i)\(?\b(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)\b\)?(?:\s*(?:INT(?:EREST)?|UND(?:IVIDED)?)\b\.?)?",
            )?,
            percent: Regex::new(r"(?i)\(?\b(\d+(?:\.\d+)?)\s*%\)?(?:\s*INT(?:EREST)?\b\.?)?")?,
            malformed_fraction: Regex::new(
                r"(?i)\(?\b([A-Z0-9.]+)\s*/\s*([A-Z0-9.]+)\)?\s+INT(?:EREST)?\b\.?",
            )?,
            member_split: Regex::new(r"(?i)\s*&\s*|\bAND\b")?,
        })
    }

    /// Split one owner blob into ordered candidates
    pub fn tokenize(
        &self,
        blob: &str,
        source_context: Option<&str>,
        classifier: &EntityClassifier,
    ) -> Vec<OwnerCandidate> {
        self.tokenize_blob(blob, source_context, classifier).candidates
    }

    pub fn tokenize_blob(
        &self,
        blob: &str,
        source_context: Option<&str>,
        classifier: &EntityClassifier,
    ) -> TokenizedBlob {
        let mut candidates = Vec::new();
        let mut loose_notes = Vec::new();
        let mut segment_index = 0;

        for line in blob.split(['\n', '\r', ';']) {
            let line = collapse_whitespace(line.trim().trim_start_matches('*'));
            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();

            for segment in self.join_comma_parts(&parts, classifier) {
                self.tokenize_segment(
                    &segment,
                    segment_index,
                    classifier,
                    &mut candidates,
                    &mut loose_notes,
                );
                segment_index += 1;
            }
        }

        for candidate in &mut candidates {
            candidate.source_context = source_context.map(str::to_string);
        }

        TokenizedBlob {
            candidates,
            notes: loose_notes,
        }
    }

    fn tokenize_segment(
        &self,
        segment: &str,
        segment_index: usize,
        classifier: &EntityClassifier,
        out: &mut Vec<OwnerCandidate>,
        loose_notes: &mut Vec<AuditNote>,
    ) {
        let stripped = self.strip_designations(segment);
        let members = self.split_members(&stripped.text, classifier);
        let multi_member = members.len() > 1;
        let segment_start = out.len();

        // "SMITH, JOHN A & MARY B": later given-name members take the leading surname
        let comma_surname = members
            .first()
            .and_then(|first| first.split_once(','))
            .map(|(last, _)| last.trim().to_string())
            .filter(|last| word_count(last) == 1);

        for (position, member) in members.iter().enumerate() {
            let (remaining, interest) = self.extract_interest(member);
            let text = clean_member(&remaining);

            let mut notes = Vec::new();
            let share = match interest {
                Some(Outcome::Ok(share)) => Some(share),
                Some(Outcome::Unchanged(reason)) => {
                    notes.push(format!("{} in {:?}; annotation dropped", reason, member.trim()));
                    None
                }
                None => None,
            };

            if text.is_empty() {
                // Annotation-only member binds to the preceding candidate
                match out.last_mut() {
                    Some(previous) => {
                        if previous.interest.is_none() {
                            previous.interest = share;
                        }
                        previous.notes.extend(notes);
                    }
                    None => loose_notes.extend(notes.into_iter().map(|note| AuditNote {
                        raw: member.trim().to_string(),
                        note,
                    })),
                }
                continue;
            }

            let given_names_only = multi_member
                && position > 0
                && !text.contains(',')
                && !classifier.is_company(&text)
                && is_given_names(&text);

            let text = match (&comma_surname, given_names_only) {
                (Some(surname), true) => format!("{}, {}", surname, text),
                _ => text,
            };

            let mut candidate = OwnerCandidate::new(member, text, segment_index);
            candidate.needs_surname = given_names_only
                || (multi_member && candidate.text.split_whitespace().count() == 1);
            candidate.interest = share;
            candidate.notes = notes;
            out.push(candidate);
        }

        // Segment-level designations apply to every member cut from it
        for candidate in &mut out[segment_start..] {
            candidate.designations = stripped.removed.clone();
            if candidate.interest_group.is_none() {
                candidate.interest_group = stripped.group.clone();
            }
        }
    }

    /// Re-join comma parts:
    /// - "SMITH", "JOHN A" → "SMITH, JOHN A" (single word followed by a short part)
    /// - "JR", "1/2 INT", "LLC", "ET AL" → appended to the previous part
    fn join_comma_parts(&self, parts: &[&str], classifier: &EntityClassifier) -> Vec<String> {
        let mut joined: Vec<String> = Vec::new();
        let mut i = 0;

        while i < parts.len() {
            let part = parts[i];

            if let Some(previous) = joined.last_mut() {
                if self.is_trailing_fragment(part) {
                    previous.push(' ');
                    previous.push_str(part);
                    i += 1;
                    continue;
                }
            }

            if let Some(next) = parts.get(i + 1) {
                let surname_first = word_count(part) == 1
                    && self.leading_name_words(next) <= 3
                    && !self.is_trailing_fragment(next)
                    && !classifier.is_company(part)
                    && !classifier.is_company(next);

                if surname_first {
                    joined.push(format!("{}, {}", part, next));
                    i += 2;
                    continue;
                }
            }

            joined.push(part.to_string());
            i += 1;
        }

        joined
    }

    /// Words of the first owner in a comma part, ignoring designations,
    /// interest annotations and any "&"/AND members after it
    fn leading_name_words(&self, part: &str) -> usize {
        let without_interest = self.without_interest(&self.strip_designations(part).text);
        let first_member = self
            .member_split
            .split(&without_interest)
            .next()
            .unwrap_or_default()
            .to_string();
        word_count(&first_member)
    }

    fn without_interest(&self, text: &str) -> String {
        let without_fraction = self.fraction.replace_all(text, " ");
        let without_percent = self.percent.replace_all(&without_fraction, " ");
        self.malformed_fraction
            .replace_all(&without_percent, " ")
            .into_owned()
    }

    /// Part that cannot stand alone: suffixes, legal forms, designations, interest
    fn is_trailing_fragment(&self, part: &str) -> bool {
        let without_interest = self.without_interest(&self.strip_designations(part).text);
        if !without_interest.chars().any(|c| c.is_alphanumeric()) {
            return true;
        }

        without_interest.split_whitespace().all(|word| {
            self.vocabulary.suffix_for(word).is_some() || self.vocabulary.is_legal_form(word)
        })
    }

    /// Remove designation phrases, remembering what was removed and any tenancy group.
    /// A fiduciary marker after a holding word ("FAMILY TR") names the trust and stays.
    pub fn strip_designations(&self, segment: &str) -> StrippedSegment {
        let mut text = segment.to_string();
        let mut removed = Vec::new();
        let mut group = None;

        for designation in &self.designations {
            let mut kept = String::with_capacity(text.len());
            let mut copied_to = 0;
            let mut hit = false;

            for found in designation.regex.find_iter(&text) {
                let previous_word = text[..found.start()].split_whitespace().last();
                let names_trust = designation.rule.kind == DesignationKind::Fiduciary
                    && previous_word.is_some_and(|word| self.vocabulary.is_holding_word(word));
                if names_trust {
                    continue;
                }

                kept.push_str(&text[copied_to..found.start()]);
                kept.push(' ');
                copied_to = found.end();
                removed.push(found.as_str().trim().to_string());
                hit = true;
            }

            if hit {
                kept.push_str(&text[copied_to..]);
                text = kept;
                if group.is_none() {
                    group = designation.rule.group.clone();
                }
            }
        }

        StrippedSegment {
            text: collapse_whitespace(&text),
            removed,
            group,
        }
    }

    /// Split on "&" / "AND"; a company name with a one-word piece stays whole
    /// ("A & B PROPERTIES", "SMITH AND SONS")
    fn split_members(&self, text: &str, classifier: &EntityClassifier) -> Vec<String> {
        let pieces: Vec<String> = self
            .member_split
            .split(text)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        if pieces.len() <= 1 {
            return vec![text.to_string()];
        }

        if classifier.is_company(text) {
            let dangling = pieces.iter().any(|piece| {
                let stripped = self.fraction.replace_all(piece, " ");
                word_count(&stripped) < 2 && !classifier.is_company(piece)
            });
            if dangling {
                return vec![text.to_string()];
            }
        }

        pieces
    }

    /// Lift an interest annotation out of member text.
    /// None: no annotation. Unchanged: annotation found but unusable (still removed).
    pub fn extract_interest(&self, member: &str) -> (String, Option<Outcome<InterestShare>>) {
        if let Some(caps) = self.fraction.captures(member) {
            let share = match (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
                (Ok(numerator), Ok(denominator)) => {
                    InterestShare::from_fraction(numerator, denominator)
                }
                _ => Outcome::unchanged("non-numeric interest fraction"),
            };
            let remaining = self.fraction.replace_all(member, " ").into_owned();
            return (remaining, Some(share));
        }

        if let Some(caps) = self.percent.captures(member) {
            let share = match caps[1].parse::<f64>() {
                Ok(percentage) => InterestShare::from_percentage(percentage),
                Err(_) => Outcome::unchanged("non-numeric interest percentage"),
            };
            let remaining = self.percent.replace_all(member, " ").into_owned();
            return (remaining, Some(share));
        }

        if self.malformed_fraction.is_match(member) {
            let remaining = self.malformed_fraction.replace_all(member, " ").into_owned();
            return (
                remaining,
                Some(Outcome::unchanged("non-numeric interest fraction")),
            );
        }

        (member.to_string(), None)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().filter(|w| *w != "&").count()
}

/// "MARY", "MARY B", "MARY B. C": a given name with at most initials after it
fn is_given_names(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    let is_initial = |word: &&str| word.trim_end_matches('.').chars().count() == 1;

    match words.split_first() {
        Some((first, rest)) => !is_initial(first) && words.len() <= 3 && rest.iter().all(is_initial),
        None => false,
    }
}

/// Trim separators and empty brackets left behind by removals
fn clean_member(text: &str) -> String {
    let text = text.replace("()", " ");
    collapse_whitespace(&text)
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '&' | '/' | '-'))
        .to_string()
}

// ============================================================================
// TESTS
// ============================================================================
