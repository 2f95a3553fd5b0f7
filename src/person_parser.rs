// 🧑 Person Name Parser - Free text → structured human name(s)
//
// Owner rolls mix "JOHN A SMITH", "SMITH JOHN A", "SMITH, JOHN A JR" and
// household lines like "SMITH JOHN MARY". There is no reliable marker for which
// token is the surname, so order is decided by a length heuristic:
//
//   firstShort       = len(first) <= 2
//   lastTokenLongest = len(last) >= len(first)
//   either holds     → FIRST ... LAST
//   otherwise        → LAST FIRST ...
//
// Ties (equal lengths) are configurable; the default keeps FIRST ... LAST.

use crate::entities::ParsedPerson;
use crate::error::{RejectReason, Result};
use crate::outcome::Outcome;
use crate::vocabulary::Vocabulary;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// ORDER HEURISTIC
// ============================================================================

/// How to read a name whose first and last tokens are the same length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameOrderTie {
    #[default]
    FirstLast,
    LastFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameOrder {
    FirstLast,
    LastFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserSettings {
    pub tie: NameOrderTie,

    /// Minimum tokens before "SMITH JOHN MARY" is read as a household
    pub shared_surname_min_tokens: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            tie: NameOrderTie::FirstLast,
            shared_surname_min_tokens: 4,
        }
    }
}

/// Name parts before title-casing and validation
#[derive(Debug, Clone, Default)]
struct RawName {
    first: String,
    middle: Vec<String>,
    last: String,
    prefix: Option<String>,
    suffix: Option<String>,
}

// ============================================================================
// PARSER
// ============================================================================

pub struct PersonNameParser {
    vocabulary: Vocabulary,
    settings: ParserSettings,
    name_pattern: Regex,
}

impl PersonNameParser {
    pub fn new(vocabulary: &Vocabulary, settings: ParserSettings) -> Result<Self> {
        Ok(PersonNameParser {
            vocabulary: vocabulary.clone(),
            settings,
            name_pattern: Regex::new(r"^[A-Z][a-zA-Z\s\-',.]*$")?,
        })
    }

    /// Parse one person candidate. May return several persons when a
    /// shared-surname household is detected. `surname_hint` marks the text as
    /// given names only ("MARY" or "MARY B" cut from "JOHN SMITH & MARY B").
    pub fn parse(
        &self,
        candidate: &str,
        surname_hint: Option<&str>,
    ) -> std::result::Result<Vec<ParsedPerson>, RejectReason> {
        let text = candidate
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace());

        if text.is_empty() {
            return Err(RejectReason::IncompletePerson("empty name".to_string()));
        }

        if text.contains(',') {
            return self.parse_comma(text).map(|person| vec![person]);
        }

        let tokens: Vec<&str> = text.split_whitespace().collect();
        let (prefix, tokens, suffix) = self.strip_affixes(&tokens);
        let tokens = self.glue_particles(&tokens);

        if let (Some(hint), Some((first, middle))) = (surname_hint, tokens.split_first()) {
            return self
                .finalize(RawName {
                    first: first.clone(),
                    middle: middle.to_vec(),
                    last: hint.to_string(),
                    prefix,
                    suffix,
                })
                .map(|person| vec![person]);
        }

        match tokens.len() {
            0 => Err(RejectReason::IncompletePerson(format!(
                "no name tokens in {:?}",
                text
            ))),
            1 => Err(RejectReason::IncompletePerson(format!(
                "single token {:?}",
                text
            ))),
            n => {
                let order = self.detect_order(&tokens[0], &tokens[n - 1]);

                if order == NameOrder::LastFirst && n >= self.settings.shared_surname_min_tokens {
                    if let Some(household) =
                        self.split_shared_surname(&tokens, prefix.clone(), suffix.clone())
                    {
                        return Ok(household);
                    }
                }

                let raw = match order {
                    NameOrder::FirstLast => RawName {
                        first: tokens[0].clone(),
                        middle: tokens[1..n - 1].to_vec(),
                        last: tokens[n - 1].clone(),
                        prefix,
                        suffix,
                    },
                    NameOrder::LastFirst => RawName {
                        first: tokens[1].clone(),
                        middle: tokens[2..].to_vec(),
                        last: tokens[0].clone(),
                        prefix,
                        suffix,
                    },
                };
                self.finalize(raw).map(|person| vec![person])
            }
        }
    }

    /// Structured name parts (pre-seeded JSON person objects)
    pub fn from_parts(
        &self,
        first: &str,
        middle: Option<&str>,
        last: &str,
        prefix: Option<&str>,
        suffix: Option<&str>,
    ) -> std::result::Result<ParsedPerson, RejectReason> {
        if first.trim().is_empty() || last.trim().is_empty() {
            return Err(RejectReason::IncompletePerson(format!(
                "missing first or last name in {:?}",
                format!("{} {}", first, last).trim()
            )));
        }

        self.finalize(RawName {
            first: first.trim().to_string(),
            middle: middle
                .map(|m| m.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            last: last.trim().to_string(),
            prefix: prefix
                .map(|p| self.vocabulary.prefix_for(p).unwrap_or(p).to_string()),
            suffix: suffix
                .map(|s| self.vocabulary.suffix_for(s).unwrap_or(s).to_string()),
        })
    }

    pub fn detect_order(&self, first: &str, last: &str) -> NameOrder {
        let first_len = first.chars().count();
        let last_len = last.chars().count();

        if first_len <= 2 || last_len > first_len {
            return NameOrder::FirstLast;
        }
        if last_len == first_len {
            return match self.settings.tie {
                NameOrderTie::FirstLast => NameOrder::FirstLast,
                NameOrderTie::LastFirst => NameOrder::LastFirst,
            };
        }
        NameOrder::LastFirst
    }

    /// "LAST[ SUFFIX], FIRST [MIDDLE...] [SUFFIX]"
    fn parse_comma(&self, text: &str) -> std::result::Result<ParsedPerson, RejectReason> {
        let (left, right) = text.split_once(',').unwrap_or((text, ""));
        let right = right.replace(',', " ");

        let left_tokens: Vec<&str> = left.split_whitespace().collect();
        let (_, left_tokens, left_suffix) = self.strip_affixes(&left_tokens);

        let right_tokens: Vec<&str> = right.split_whitespace().collect();
        let (prefix, right_tokens, right_suffix) = self.strip_affixes(&right_tokens);

        if left_tokens.is_empty() {
            return Err(RejectReason::IncompletePerson(format!(
                "no surname before comma in {:?}",
                text
            )));
        }
        if right_tokens.is_empty() {
            return Err(RejectReason::IncompletePerson(format!(
                "no given name after comma in {:?}",
                text
            )));
        }

        self.finalize(RawName {
            first: right_tokens[0].clone(),
            middle: right_tokens[1..].to_vec(),
            last: left_tokens.join(" "),
            prefix,
            suffix: right_suffix.or(left_suffix),
        })
    }

    /// "SMITH JOHN A MARY" → John A Smith + Mary Smith.
    /// Each non-initial token after the surname starts a new person; initials
    /// stay with the person before them. Needs at least two valid persons.
    fn split_shared_surname(
        &self,
        tokens: &[String],
        prefix: Option<String>,
        suffix: Option<String>,
    ) -> Option<Vec<ParsedPerson>> {
        let surname = &tokens[0];
        if !plausible_surname(surname) {
            return None;
        }

        let rest = &tokens[1..];
        if rest.first().map_or(true, |t| is_initial(t)) {
            return None;
        }

        let mut groups: Vec<Vec<String>> = Vec::new();
        for token in rest {
            match groups.last_mut() {
                Some(group) if is_initial(token) => group.push(token.clone()),
                _ => groups.push(vec![token.clone()]),
            }
        }
        if groups.len() < 2 {
            return None;
        }

        let count = groups.len();
        let persons: Vec<ParsedPerson> = groups
            .into_iter()
            .enumerate()
            .filter_map(|(i, group)| {
                self.finalize(RawName {
                    first: group[0].clone(),
                    middle: group[1..].to_vec(),
                    last: surname.clone(),
                    prefix: if i == 0 { prefix.clone() } else { None },
                    suffix: if i == count - 1 { suffix.clone() } else { None },
                })
                .ok()
            })
            .collect();

        if persons.len() >= 2 {
            Some(persons)
        } else {
            None
        }
    }

    /// Split off one leading prefix and one trailing suffix (only if a name token remains)
    fn strip_affixes(&self, tokens: &[&str]) -> (Option<String>, Vec<String>, Option<String>) {
        let mut start = 0;
        let mut end = tokens.len();
        let mut prefix = None;
        let mut suffix = None;

        if end - start > 1 {
            if let Some(canonical) = self.vocabulary.prefix_for(tokens[start]) {
                prefix = Some(canonical.to_string());
                start += 1;
            }
        }
        if end - start > 1 {
            if let Some(canonical) = self.vocabulary.suffix_for(tokens[end - 1]) {
                suffix = Some(canonical.to_string());
                end -= 1;
            }
        }

        let remaining = tokens[start..end]
            .iter()
            .map(|t| t.trim_end_matches(',').to_string())
            .filter(|t| !t.is_empty())
            .collect();
        (prefix, remaining, suffix)
    }

    /// Join particles to the following token: "DE LA CRUZ" stays one surname
    fn glue_particles(&self, tokens: &[String]) -> Vec<String> {
        let mut glued: Vec<String> = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            let is_last = i + 1 == tokens.len();
            if self.vocabulary.is_particle(token) && !is_last && tokens.len() > 2 {
                pending.push(token);
                continue;
            }
            if pending.is_empty() {
                glued.push(token.clone());
            } else {
                pending.push(token);
                glued.push(pending.join(" "));
                pending.clear();
            }
        }
        glued
    }

    /// Title-case and validate. Invalid first/last rejects; invalid middle is dropped.
    fn finalize(&self, raw: RawName) -> std::result::Result<ParsedPerson, RejectReason> {
        let first = title_case(&raw.first);
        let last = title_case(&raw.last);

        if !self.name_pattern.is_match(&first) {
            return Err(RejectReason::InvalidFirstName(first));
        }
        if !self.name_pattern.is_match(&last) {
            return Err(RejectReason::InvalidLastName(last));
        }

        let middle = if raw.middle.is_empty() {
            None
        } else {
            let middle = title_case(&raw.middle.join(" "));
            if self.name_pattern.is_match(&middle) {
                Some(middle)
            } else {
                tracing::debug!(middle = %middle, "dropping middle name that fails name pattern");
                None
            }
        };

        Ok(ParsedPerson {
            first_name: first,
            last_name: last,
            middle_name: middle,
            prefix_name: raw.prefix,
            suffix_name: raw.suffix,
            ..Default::default()
        })
    }
}

fn is_initial(token: &str) -> bool {
    let letters = token.chars().filter(|c| c.is_alphabetic()).count();
    letters == 1 && token.chars().count() <= 2
}

fn plausible_surname(token: &str) -> bool {
    token.chars().filter(|c| c.is_alphabetic()).count() >= 2
        && token
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, '\'' | '-' | ' '))
}

// ============================================================================
// TITLE CASE
// ============================================================================

/// "MARY-ANNE O'BRIEN" → "Mary-Anne O'Brien"; "D.O.T." → "Dot"
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    if let Outcome::Ok(collapsed) = collapse_initialism(word) {
        return capitalize(&collapsed);
    }

    word.split('-')
        .map(title_case_apostrophe)
        .collect::<Vec<_>>()
        .join("-")
}

/// "D.O.T." → "DOT"; anything else is left alone
fn collapse_initialism(word: &str) -> Outcome<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut letters = String::new();
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_alphabetic() {
            return Outcome::unchanged("not a dotted initialism");
        }
        letters.push(chars[i]);
        match chars.get(i + 1) {
            Some('.') => i += 2,
            None => i += 1,
            Some(_) => return Outcome::unchanged("not a dotted initialism"),
        }
    }

    if letters.chars().count() >= 2 && word.contains('.') {
        Outcome::Ok(letters)
    } else {
        Outcome::unchanged("not a dotted initialism")
    }
}

/// "O'BRIEN" → "O'Brien": a one-letter head capitalizes the next part
fn title_case_apostrophe(part: &str) -> String {
    let pieces: Vec<&str> = part.split('\'').collect();
    let mut out = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.iter().enumerate() {
        if i == 0 || pieces[i - 1].chars().count() == 1 {
            out.push(capitalize(piece));
        } else {
            out.push(piece.to_lowercase());
        }
    }
    out.join("'")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
