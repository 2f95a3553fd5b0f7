// 🪪 Canonical Entity - Stable identity + monotonic payload
//
// "Owner name is a VALUE (many spellings), the canonical entity is IDENTITY"
//
// Problem solved:
// - "John Smith", "SMITH, JOHN", "Smith John" → one entity
// - Later spellings may add a middle name or suffix, never replace one
// - Aliases are lookup back-references only; the entity owns its payload

use super::company::ParsedCompany;
use super::person::ParsedPerson;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ENTITY KIND / ID
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Company,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Company => "company",
        }
    }
}

/// Per-run identity: kind + 1-based ordinal within that kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub ordinal: usize,
}

impl EntityId {
    /// Output record name ("person_3")
    pub fn record_ref(&self) -> String {
        format!("{}_{}", self.kind.as_str(), self.ordinal)
    }

    /// Relative file reference ("./person_3.json")
    pub fn file_ref(&self) -> String {
        format!("./{}.json", self.record_ref())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record_ref())
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityPayload {
    Person(ParsedPerson),
    Company(ParsedCompany),
}

impl EntityPayload {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::Person(_) => EntityKind::Person,
            EntityPayload::Company(_) => EntityKind::Company,
        }
    }

    pub fn dedup_key(&self) -> String {
        match self {
            EntityPayload::Person(p) => p.dedup_key(),
            EntityPayload::Company(c) => c.dedup_key(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            EntityPayload::Person(p) => p.display_name(),
            EntityPayload::Company(c) => c.name.clone(),
        }
    }

    /// Monotonic merge; kinds must match
    pub fn fill_missing_from(&mut self, other: &EntityPayload) -> bool {
        match (self, other) {
            (EntityPayload::Person(mine), EntityPayload::Person(theirs)) => {
                mine.fill_missing_from(theirs)
            }
            _ => false,
        }
    }

    /// Incoming payload cannot describe the same owner
    pub fn conflicts_with(&self, other: &EntityPayload) -> bool {
        match (self, other) {
            (EntityPayload::Person(a), EntityPayload::Person(b)) => a.conflicts_with(b),
            (EntityPayload::Company(_), EntityPayload::Company(_)) => false,
            _ => true,
        }
    }

    pub fn as_person(&self) -> Option<&ParsedPerson> {
        match self {
            EntityPayload::Person(p) => Some(p),
            EntityPayload::Company(_) => None,
        }
    }

    pub fn as_company(&self) -> Option<&ParsedCompany> {
        match self {
            EntityPayload::Company(c) => Some(c),
            EntityPayload::Person(_) => None,
        }
    }
}

// ============================================================================
// CANONICAL ENTITY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: EntityId,

    pub payload: EntityPayload,

    /// Raw spellings seen for this owner (deduplicated case/whitespace-insensitively)
    pub aliases: Vec<String>,
}

impl CanonicalEntity {
    pub fn new(id: EntityId, payload: EntityPayload, first_alias: &str) -> Self {
        let mut entity = CanonicalEntity {
            id,
            payload,
            aliases: Vec::new(),
        };
        entity.add_alias(first_alias);
        if entity.aliases.is_empty() {
            let fallback = entity.payload.display_name();
            entity.add_alias(&fallback);
        }
        entity
    }

    /// Add an alias unless an equivalent spelling is already recorded
    pub fn add_alias(&mut self, alias: &str) -> bool {
        let normalized = normalize_alias(alias);
        if normalized.is_empty() || self.has_alias(alias) {
            return false;
        }
        self.aliases.push(alias.trim().to_string());
        true
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        let normalized = normalize_alias(alias);
        self.aliases.iter().any(|a| normalize_alias(a) == normalized)
    }

    pub fn kind(&self) -> EntityKind {
        self.id.kind
    }

    pub fn display_name(&self) -> String {
        self.payload.display_name()
    }
}

/// Case- and whitespace-insensitive alias form
pub fn normalize_alias(alias: &str) -> String {
    alias
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn person_id(ordinal: usize) -> EntityId {
        EntityId {
            kind: EntityKind::Person,
            ordinal,
        }
    }

    #[test]
    fn test_record_refs() {
        let id = person_id(3);
        assert_eq!(id.record_ref(), "person_3");
        assert_eq!(id.file_ref(), "./person_3.json");

        let company = EntityId {
            kind: EntityKind::Company,
            ordinal: 1,
        };
        assert_eq!(company.to_string(), "company_1");
    }

    #[test]
    fn test_alias_dedup_is_case_and_space_insensitive() {
        let payload = EntityPayload::Person(ParsedPerson::new("John", "Smith"));
        let mut entity = CanonicalEntity::new(person_id(1), payload, "JOHN SMITH");

        assert!(!entity.add_alias("john   smith"));
        assert!(entity.add_alias("SMITH, JOHN"));
        assert_eq!(entity.aliases.len(), 2);
    }

    #[test]
    fn test_entity_always_has_an_alias() {
        let payload = EntityPayload::Company(ParsedCompany::new("Acme LLC").unwrap());
        let entity = CanonicalEntity::new(
            EntityId {
                kind: EntityKind::Company,
                ordinal: 1,
            },
            payload,
            "   ",
        );

        assert_eq!(entity.aliases, vec!["Acme LLC".to_string()]);
    }

    #[test]
    fn test_cross_kind_payloads_conflict() {
        let person = EntityPayload::Person(ParsedPerson::new("Smith", "Trust"));
        let company = EntityPayload::Company(ParsedCompany::new("Smith Trust").unwrap());
        assert!(person.conflicts_with(&company));
    }
}
