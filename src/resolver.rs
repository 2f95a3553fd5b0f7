// 🧭 Owner Resolver - Owner text → canonical entity references
//
// Pipeline for one owner blob:
//   county preprocess → tokenize → classify → parse → registry
//
// Rejections never abort: they go to the invalid-owner sink with the raw
// text, and resolution continues with the next candidate.

use crate::classifier::{Classification, EntityClassifier};
use crate::config::ResolverConfig;
use crate::county::{self, CountyProfile, GenericProfile};
use crate::entities::{EntityId, EntityPayload, ParsedCompany, ParsedPerson};
use crate::error::{RejectReason, Result};
use crate::invalid::InvalidOwnerSink;
use crate::person_parser::{ParserSettings, PersonNameParser};
use crate::registry::IdentityRegistry;
use crate::source::{OwnerEntry, PersonParts};
use crate::tokenizer::{OwnerCandidate, RawOwnerTokenizer};
use crate::vocabulary::Vocabulary;
use tracing::{debug, warn};

/// Mutable state of one property run, passed explicitly to every stage
#[derive(Debug, Default)]
pub struct RunState {
    pub registry: IdentityRegistry,
    pub sink: InvalidOwnerSink,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What a single candidate parsed into
#[derive(Debug, Clone, PartialEq)]
enum ParsedOwner {
    Persons(Vec<ParsedPerson>),
    Company(ParsedCompany),
}

pub struct OwnerResolver {
    tokenizer: RawOwnerTokenizer,
    classifier: EntityClassifier,
    parser: PersonNameParser,
    profile: Box<dyn CountyProfile>,
}

impl OwnerResolver {
    /// Build from configuration: county profile, vocabulary, parser settings
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;
        let profile = county::profile_for(&config.county)?;
        let mut vocabulary = config.load_vocabulary()?;
        profile.extend_vocabulary(&mut vocabulary);
        let settings = config.parser_settings(profile.as_ref());

        Self::with_profile(&vocabulary, settings, profile)
    }

    pub fn with_profile(
        vocabulary: &Vocabulary,
        settings: ParserSettings,
        profile: Box<dyn CountyProfile>,
    ) -> Result<Self> {
        Ok(OwnerResolver {
            tokenizer: RawOwnerTokenizer::new(vocabulary)?,
            classifier: EntityClassifier::new(vocabulary),
            parser: PersonNameParser::new(vocabulary, settings)?,
            profile,
        })
    }

    /// Built-in vocabulary, generic county
    pub fn with_defaults() -> Result<Self> {
        Self::with_profile(
            &Vocabulary::default(),
            ParserSettings::default(),
            Box::new(GenericProfile),
        )
    }

    pub fn profile_name(&self) -> &str {
        self.profile.name()
    }

    /// County override first, then the vocabulary classifier
    pub fn classify(&self, text: &str) -> Classification {
        self.profile
            .classify_override(text)
            .unwrap_or_else(|| self.classifier.classify(text))
    }

    // ========================================================================
    // ENTRY POINTS
    // ========================================================================

    /// Resolve one free-text owner blob; returns entity refs in text order, deduplicated
    pub fn resolve_blob(
        &self,
        blob: &str,
        context: Option<&str>,
        state: &mut RunState,
    ) -> Vec<EntityId> {
        let prepared = self.profile.preprocess(blob);
        let tokenized = self.tokenizer.tokenize_blob(&prepared, context, &self.classifier);
        for loose in &tokenized.notes {
            warn!(raw = %loose.raw, note = %loose.note, "owner annotation dropped");
            state.sink.note(&loose.raw, loose.note.clone());
        }
        let candidates = tokenized.candidates;

        // Bare given names wait until their household has been parsed
        let mut parsed: Vec<Option<std::result::Result<ParsedOwner, RejectReason>>> = candidates
            .iter()
            .map(|c| (!c.needs_surname).then(|| self.parse_candidate(c, None)))
            .collect();

        for i in 0..candidates.len() {
            if parsed[i].is_none() {
                let hint = household_surname(&candidates, &parsed, i);
                parsed[i] = Some(self.parse_candidate(&candidates[i], hint.as_deref()));
            }
        }

        let mut ids = Vec::new();
        for (candidate, result) in candidates.iter().zip(parsed) {
            for note in &candidate.notes {
                warn!(raw = %candidate.raw_text, note = %note, "owner annotation dropped");
                state.sink.note(&candidate.raw_text, note.clone());
            }
            for designation in &candidate.designations {
                state
                    .sink
                    .note(&candidate.raw_text, format!("designation {:?} removed", designation));
            }

            match result {
                Some(Ok(owner)) => {
                    for id in self.register(candidate, owner, state) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
                Some(Err(reason)) => {
                    state.sink.reject(&candidate.raw_text, &reason);
                }
                None => {}
            }
        }

        ids
    }

    /// Resolve one entry of a pre-seeded document (text or structured object)
    pub fn resolve_entry(
        &self,
        entry: &OwnerEntry,
        context: Option<&str>,
        state: &mut RunState,
    ) -> Vec<EntityId> {
        match entry {
            OwnerEntry::Text(text) => self.resolve_blob(text, context, state),
            OwnerEntry::Person(parts) => self.resolve_parts(parts, state).into_iter().collect(),
            OwnerEntry::Named(name) => match self.classify(name) {
                Classification::Company => match ParsedCompany::new(name) {
                    Some(company) => {
                        vec![state
                            .registry
                            .resolve(EntityPayload::Company(company), &[name.as_str()])]
                    }
                    None => {
                        state.sink.reject(name, &RejectReason::EmptyCompanyName);
                        Vec::new()
                    }
                },
                _ => self.resolve_blob(name, context, state),
            },
        }
    }

    fn resolve_parts(&self, parts: &PersonParts, state: &mut RunState) -> Option<EntityId> {
        let raw = parts.raw();
        let parsed = self.parser.from_parts(
            &parts.first_name,
            parts.middle_name.as_deref(),
            &parts.last_name,
            parts.prefix_name.as_deref(),
            parts.suffix_name.as_deref(),
        );

        match parsed {
            Ok(person) => Some(
                state
                    .registry
                    .resolve(EntityPayload::Person(person), &[raw.as_str()]),
            ),
            Err(reason) => {
                state.sink.reject(&raw, &reason);
                None
            }
        }
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn parse_candidate(
        &self,
        candidate: &OwnerCandidate,
        surname_hint: Option<&str>,
    ) -> std::result::Result<ParsedOwner, RejectReason> {
        match self.classify(&candidate.text) {
            Classification::Company => ParsedCompany::new(&candidate.text)
                .map(ParsedOwner::Company)
                .ok_or(RejectReason::EmptyCompanyName),
            Classification::Unclassifiable(reason) => Err(RejectReason::Unclassifiable(reason)),
            Classification::Person => self
                .parser
                .parse(&candidate.text, surname_hint)
                .map(ParsedOwner::Persons),
        }
    }

    fn register(
        &self,
        candidate: &OwnerCandidate,
        owner: ParsedOwner,
        state: &mut RunState,
    ) -> Vec<EntityId> {
        match owner {
            ParsedOwner::Company(company) => {
                if candidate.interest.is_some() {
                    debug!(raw = %candidate.raw_text, "interest annotation on company ignored");
                }
                let aliases = [candidate.text.as_str(), candidate.raw_text.as_str()];
                vec![state
                    .registry
                    .resolve(EntityPayload::Company(company), &aliases)]
            }
            ParsedOwner::Persons(mut persons) => {
                // Split or surname-borrowing parses alias their rebuilt full name,
                // never the shared raw text
                let reconstructed = persons.len() > 1 || candidate.needs_surname;

                if let (Some(share), Some(last)) = (&candidate.interest, persons.last_mut()) {
                    last.apply_interest(share);
                }
                for person in &mut persons {
                    if person.ownership_interest_group.is_none() {
                        person.ownership_interest_group = candidate.interest_group.clone();
                    }
                }

                persons
                    .into_iter()
                    .map(|person| {
                        let display = person.display_name();
                        let aliases: Vec<&str> = if reconstructed {
                            vec![display.as_str()]
                        } else {
                            vec![candidate.text.as_str(), candidate.raw_text.as_str()]
                        };
                        state
                            .registry
                            .resolve(EntityPayload::Person(person), &aliases)
                    })
                    .collect()
            }
        }
    }
}

/// Surname of the nearest parsed person in the same segment: earlier first, then later
fn household_surname(
    candidates: &[OwnerCandidate],
    parsed: &[Option<std::result::Result<ParsedOwner, RejectReason>>],
    index: usize,
) -> Option<String> {
    let segment = candidates[index].segment;
    let surname_at = |j: usize, last: bool| -> Option<String> {
        if candidates[j].segment != segment {
            return None;
        }
        match &parsed[j] {
            Some(Ok(ParsedOwner::Persons(persons))) => {
                let person = if last { persons.last() } else { persons.first() };
                person.map(|p| p.last_name.clone())
            }
            _ => None,
        }
    };

    (0..index)
        .rev()
        .find_map(|j| surname_at(j, true))
        .or_else(|| (index + 1..candidates.len()).find_map(|j| surname_at(j, false)))
}

// ============================================================================
// TESTS
// ============================================================================
