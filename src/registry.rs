// 📇 Identity Registry - One canonical entity per real-world owner
//
// "Owner text is a VALUE, the registry hands out IDENTITY"
//
// Lookup order for an incoming parse:
// 1. Dedup key (kind + first|middle|last, or normalized company name)
// 2. Alias (any raw spelling seen before), unless the payloads conflict
// 3. Otherwise a new entity with the next per-kind ordinal
//
// Matches only ever fill gaps in the stored payload. The registry is owned
// by one property run and dropped with it.

use crate::entities::{
    normalize_alias, CanonicalEntity, EntityId, EntityKind, EntityPayload,
};
use std::collections::HashMap;
use tracing::debug;

/// How an incoming parse was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Created,
    Matched,
    /// Matched and the stored payload gained fields
    Merged,
}

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    /// Creation order; EntityId ordinals are per kind
    entities: Vec<CanonicalEntity>,

    positions: HashMap<EntityId, usize>,
    by_key: HashMap<String, usize>,
    by_alias: HashMap<String, Vec<usize>>,

    person_count: usize,
    company_count: usize,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a parsed owner to its canonical entity, creating one if needed
    pub fn resolve(&mut self, payload: EntityPayload, raw_aliases: &[&str]) -> EntityId {
        self.resolve_with_status(payload, raw_aliases).0
    }

    pub fn resolve_with_status(
        &mut self,
        payload: EntityPayload,
        raw_aliases: &[&str],
    ) -> (EntityId, Resolution) {
        let key = scoped_key(&payload);

        if let Some(&index) = self.by_key.get(&key) {
            return self.absorb(index, &payload, raw_aliases);
        }

        for alias in raw_aliases {
            let normalized = normalize_alias(alias);
            if normalized.is_empty() {
                continue;
            }
            let Some(indices) = self.by_alias.get(&normalized) else {
                continue;
            };

            let compatible = indices
                .iter()
                .copied()
                .find(|&i| !self.entities[i].payload.conflicts_with(&payload));

            match compatible {
                Some(index) => return self.absorb(index, &payload, raw_aliases),
                None => debug!(alias = %alias, "alias hit ignored: payload conflicts"),
            }
        }

        (self.create(payload, raw_aliases), Resolution::Created)
    }

    fn create(&mut self, payload: EntityPayload, raw_aliases: &[&str]) -> EntityId {
        let kind = payload.kind();
        let ordinal = match kind {
            EntityKind::Person => {
                self.person_count += 1;
                self.person_count
            }
            EntityKind::Company => {
                self.company_count += 1;
                self.company_count
            }
        };
        let id = EntityId { kind, ordinal };
        let key = scoped_key(&payload);

        let first_alias = raw_aliases.first().copied().unwrap_or("");
        let mut entity = CanonicalEntity::new(id, payload, first_alias);
        for alias in raw_aliases.iter().skip(1) {
            entity.add_alias(alias);
        }

        let index = self.entities.len();
        self.index_aliases(index, &entity.aliases);
        self.by_key.insert(key, index);
        self.positions.insert(id, index);
        self.entities.push(entity);

        debug!(entity = %id, "created canonical entity");
        id
    }

    fn absorb(
        &mut self,
        index: usize,
        payload: &EntityPayload,
        raw_aliases: &[&str],
    ) -> (EntityId, Resolution) {
        let incoming_key = scoped_key(payload);

        let entity = &mut self.entities[index];
        let changed = entity.payload.fill_missing_from(payload);
        let new_aliases: Vec<String> = raw_aliases
            .iter()
            .filter(|alias| entity.add_alias(alias))
            .map(|alias| alias.trim().to_string())
            .collect();
        let id = entity.id;
        let merged_key = scoped_key(&entity.payload);

        self.index_aliases(index, &new_aliases);
        self.by_key.entry(incoming_key).or_insert(index);
        self.by_key.entry(merged_key).or_insert(index);

        if changed {
            debug!(entity = %id, "merged new fields into canonical entity");
            (id, Resolution::Merged)
        } else {
            (id, Resolution::Matched)
        }
    }

    fn index_aliases(&mut self, index: usize, aliases: &[String]) {
        for alias in aliases {
            let slot = self.by_alias.entry(normalize_alias(alias)).or_default();
            if !slot.contains(&index) {
                slot.push(index);
            }
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&CanonicalEntity> {
        self.positions.get(&id).map(|&i| &self.entities[i])
    }

    /// First entity that has seen this raw spelling
    pub fn find_by_alias(&self, alias: &str) -> Option<&CanonicalEntity> {
        self.by_alias
            .get(&normalize_alias(alias))
            .and_then(|indices| indices.first())
            .map(|&i| &self.entities[i])
    }

    pub fn find_by_key(&self, payload: &EntityPayload) -> Option<&CanonicalEntity> {
        self.by_key
            .get(&scoped_key(payload))
            .map(|&i| &self.entities[i])
    }

    /// All entities in creation order
    pub fn entities(&self) -> &[CanonicalEntity] {
        &self.entities
    }

    pub fn count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn count_by_kind(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Person => self.person_count,
            EntityKind::Company => self.company_count,
        }
    }

    pub fn persons(&self) -> impl Iterator<Item = &CanonicalEntity> {
        self.entities
            .iter()
            .filter(|e| e.kind() == EntityKind::Person)
    }

    pub fn companies(&self) -> impl Iterator<Item = &CanonicalEntity> {
        self.entities
            .iter()
            .filter(|e| e.kind() == EntityKind::Company)
    }

    pub fn into_entities(self) -> Vec<CanonicalEntity> {
        self.entities
    }
}

/// Dedup keys are scoped by kind so a person key never matches a company key
fn scoped_key(payload: &EntityPayload) -> String {
    format!("{}:{}", payload.kind().as_str(), payload.dedup_key())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ParsedCompany, ParsedPerson};

    fn person(first: &str, last: &str) -> EntityPayload {
        EntityPayload::Person(ParsedPerson::new(first, last))
    }

    fn company(name: &str) -> EntityPayload {
        EntityPayload::Company(ParsedCompany::new(name).unwrap())
    }

    #[test]
    fn test_same_key_resolves_to_same_entity() {
        let mut registry = IdentityRegistry::new();

        let a = registry.resolve(person("John", "Smith"), &["JOHN SMITH"]);
        let b = registry.resolve(person("John", "Smith"), &["SMITH, JOHN"]);

        assert_eq!(a, b);
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get(a).unwrap().aliases.len(), 2);
    }

    #[test]
    fn test_per_kind_ordinals() {
        let mut registry = IdentityRegistry::new();

        let p1 = registry.resolve(person("John", "Smith"), &["JOHN SMITH"]);
        let c1 = registry.resolve(company("Acme LLC"), &["ACME LLC"]);
        let p2 = registry.resolve(person("Mary", "Jones"), &["MARY JONES"]);

        assert_eq!(p1.record_ref(), "person_1");
        assert_eq!(c1.record_ref(), "company_1");
        assert_eq!(p2.record_ref(), "person_2");
        assert_eq!(registry.count_by_kind(EntityKind::Person), 2);
    }

    #[test]
    fn test_alias_match_merges_monotonically() {
        let mut registry = IdentityRegistry::new();

        let plain = registry.resolve(person("John", "Smith"), &["JOHN SMITH"]);
        let with_suffix = EntityPayload::Person(ParsedPerson::new("John", "Smith").with_suffix("Jr."));
        let (id, status) = registry.resolve_with_status(with_suffix, &["John Smith"]);

        // Suffix is not part of the dedup key: key match, then merge
        assert_eq!(id, plain);
        assert_eq!(status, Resolution::Merged);
        let stored = registry.get(id).unwrap().payload.as_person().unwrap().clone();
        assert_eq!(stored.suffix_name.as_deref(), Some("Jr."));
    }

    #[test]
    fn test_alias_hit_with_middle_name_fills_gap() {
        let mut registry = IdentityRegistry::new();

        let first = registry.resolve(person("John", "Smith"), &["SMITH JOHN A"]);
        let middle = EntityPayload::Person(ParsedPerson::new("John", "Smith").with_middle("A"));
        let second = registry.resolve(middle.clone(), &["SMITH JOHN A"]);

        assert_eq!(first, second);
        assert_eq!(registry.count(), 1);
        // The longer key now points at the same entity
        assert_eq!(registry.find_by_key(&middle).unwrap().id, first);
    }

    #[test]
    fn test_conflicting_alias_hit_creates_new_entity() {
        let mut registry = IdentityRegistry::new();

        let john = registry.resolve(person("John", "Smith"), &["J SMITH"]);
        let jane = registry.resolve(person("Jane", "Smith"), &["J SMITH"]);

        assert_ne!(john, jane);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_company_keys_ignore_punctuation() {
        let mut registry = IdentityRegistry::new();

        let a = registry.resolve(company("Acme, L.L.C."), &["ACME, L.L.C."]);
        let b = registry.resolve(company("ACME LLC"), &["ACME LLC"]);

        assert_eq!(a, b);
    }

    #[test]
    fn test_person_and_company_never_share_key() {
        let mut registry = IdentityRegistry::new();

        let p = registry.resolve(person("Smith", "Trust"), &["SMITH TRUST"]);
        let c = registry.resolve(company("Smith Trust"), &["SMITH TRUST"]);

        assert_ne!(p, c);
    }

    #[test]
    fn test_find_by_alias() {
        let mut registry = IdentityRegistry::new();
        let id = registry.resolve(person("Mary", "Jones"), &["JONES, MARY"]);

        assert_eq!(registry.find_by_alias("jones,  mary").unwrap().id, id);
        assert!(registry.find_by_alias("MARY SMITH").is_none());
    }

    #[test]
    fn test_kind_iterators() {
        let mut registry = IdentityRegistry::new();
        registry.resolve(person("Mary", "Jones"), &["MARY JONES"]);
        registry.resolve(company("Acme LLC"), &["ACME LLC"]);
        registry.resolve(person("Bob", "Roe"), &["BOB ROE"]);

        assert_eq!(registry.persons().count(), 2);
        assert_eq!(registry.companies().count(), 1);
        assert_eq!(registry.count_by_kind(EntityKind::Company), 1);
    }
}
