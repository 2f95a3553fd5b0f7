// 🗓️ Ownership Timeline Builder - Owner buckets → OwnershipSnapshot
//
// Collects resolved owners per temporal key for one property and guarantees
// exactly one "current" bucket at the end:
// - explicit "current" labels merge into it
// - otherwise the most recent dated bucket is copied in
// - otherwise the last unknown-date bucket

use crate::entities::EntityId;
use crate::resolver::{OwnerResolver, RunState};
use crate::source::OwnerBucket;
use crate::temporal::{OwnershipSnapshot, TemporalKey, TemporalKeyNormalizer};
use tracing::debug;

#[derive(Debug, Default)]
pub struct OwnershipTimelineBuilder {
    normalizer: TemporalKeyNormalizer,
    snapshot: OwnershipSnapshot,
}

impl OwnershipTimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Temporal key for a raw label, shared with sale dates
    pub fn key_for(&mut self, raw: Option<&str>) -> TemporalKey {
        self.normalizer.normalize(raw)
    }

    /// Resolve every entry of a bucket and file the owners under its key
    pub fn add_bucket(
        &mut self,
        bucket: &OwnerBucket,
        resolver: &OwnerResolver,
        state: &mut RunState,
    ) -> TemporalKey {
        let key = self.key_for(bucket.temporal_key.as_deref());
        self.snapshot.ensure(key);

        for entry in &bucket.entries {
            let ids = resolver.resolve_entry(entry, Some(&bucket.context), state);
            self.snapshot.extend(key, &ids);
        }

        debug!(key = %key, owners = self.snapshot.get(&key).len(), "owner bucket added");
        key
    }

    pub fn add_owners(&mut self, key: TemporalKey, ids: &[EntityId]) {
        self.snapshot.extend(key, ids);
    }

    pub fn current(&self) -> &[EntityId] {
        self.snapshot.current()
    }

    pub fn set_current(&mut self, ids: &[EntityId]) {
        self.snapshot.extend(TemporalKey::Current, ids);
    }

    pub fn snapshot(&self) -> &OwnershipSnapshot {
        &self.snapshot
    }

    /// Fill an empty current bucket from history and hand over the snapshot
    pub fn finalize(mut self) -> OwnershipSnapshot {
        if self.snapshot.current().is_empty() {
            let fallback: Option<(TemporalKey, Vec<EntityId>)> = self
                .snapshot
                .latest_dated()
                .map(|(key, ids)| (key, ids.to_vec()))
                .or_else(|| {
                    self.snapshot
                        .iter()
                        .filter(|(key, ids)| matches!(key, TemporalKey::Unknown(_)) && !ids.is_empty())
                        .last()
                        .map(|(key, ids)| (*key, ids.clone()))
                });

            if let Some((key, ids)) = fallback {
                debug!(from = %key, owners = ids.len(), "current owners copied from history");
                self.snapshot.extend(TemporalKey::Current, &ids);
            }
        }
        self.snapshot
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::OwnerEntry;

    fn bucket(key: Option<&str>, text: &str) -> OwnerBucket {
        OwnerBucket {
            temporal_key: key.map(str::to_string),
            context: "owners_by_date".to_string(),
            entries: vec![OwnerEntry::Text(text.to_string())],
        }
    }

    fn label(key: &TemporalKey) -> String {
        key.to_string()
    }

    #[test]
    fn test_explicit_current_label_used() {
        let resolver = OwnerResolver::with_defaults().unwrap();
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();

        builder.add_bucket(&bucket(Some("2010-01-01"), "BOB JONES"), &resolver, &mut state);
        builder.add_bucket(&bucket(Some("Current Owner"), "CAROL WHITE"), &resolver, &mut state);
        let snapshot = builder.finalize();

        let carol = state.registry.find_by_alias("CAROL WHITE").unwrap().id;
        assert_eq!(snapshot.current(), &[carol]);
    }

    #[test]
    fn test_current_copied_from_latest_date() {
        let resolver = OwnerResolver::with_defaults().unwrap();
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();

        builder.add_bucket(&bucket(Some("2020-05-01"), "CAROL WHITE"), &resolver, &mut state);
        builder.add_bucket(&bucket(Some("2010-01-01"), "BOB JONES"), &resolver, &mut state);
        builder.add_bucket(&bucket(None, "DAN BROWN"), &resolver, &mut state);
        let snapshot = builder.finalize();

        let carol = state.registry.find_by_alias("CAROL WHITE").unwrap().id;
        assert_eq!(snapshot.current(), &[carol]);

        let labels: Vec<String> = snapshot.keys().map(label).collect();
        assert_eq!(labels, vec!["unknown_date_1", "2010-01-01", "2020-05-01", "current"]);
    }

    #[test]
    fn test_current_from_last_unknown_when_undated() {
        let resolver = OwnerResolver::with_defaults().unwrap();
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();

        builder.add_bucket(&bucket(Some("long ago"), "BOB JONES"), &resolver, &mut state);
        builder.add_bucket(&bucket(Some("later"), "CAROL WHITE"), &resolver, &mut state);
        let snapshot = builder.finalize();

        let carol = state.registry.find_by_alias("CAROL WHITE").unwrap().id;
        assert_eq!(snapshot.current(), &[carol]);
    }

    #[test]
    fn test_empty_source_has_empty_current() {
        let snapshot = OwnershipTimelineBuilder::new().finalize();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.current().is_empty());
    }

    #[test]
    fn test_same_owner_in_two_buckets_is_one_entity() {
        let resolver = OwnerResolver::with_defaults().unwrap();
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();

        let a = builder.add_bucket(&bucket(Some("2010-01-01"), "JONES, BOB"), &resolver, &mut state);
        let b = builder.add_bucket(&bucket(Some("current"), "Jones, Bob"), &resolver, &mut state);
        let snapshot = builder.finalize();

        assert_eq!(snapshot.get(&a), snapshot.get(&b));
        assert_eq!(state.registry.count(), 1);
    }
}
