// ⏰ Temporal Keys - "Time must be explicit"
//
// Every owner set is filed under exactly one key:
// - a normalized calendar date ("2019-06-01")
// - "current" (exactly one per property, always present)
// - "unknown_date_N" when the source gave no usable date
//
// Keys order as unknown_date_N < dates (ascending) < current, which is also
// the order they are written out in.

use crate::entities::EntityId;
use crate::outcome::Outcome;
use chrono::{Datelike, NaiveDate, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ============================================================================
// TEMPORAL KEY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemporalKey {
    /// Placeholder for an unparseable or missing date, numbered in first-seen order
    Unknown(usize),
    Date(NaiveDate),
    Current,
}

impl TemporalKey {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            TemporalKey::Date(date) => Some(*date),
            _ => None,
        }
    }
}

impl fmt::Display for TemporalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalKey::Unknown(n) => write!(f, "unknown_date_{}", n),
            TemporalKey::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            TemporalKey::Current => write!(f, "current"),
        }
    }
}

impl Serialize for TemporalKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// DATE NORMALIZATION
// ============================================================================

const TWO_DIGIT_YEAR: &str = "%m/%d/%y";

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    TWO_DIGIT_YEAR,
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
];

/// Normalize a raw date string to a calendar date.
/// Accepts ISO dates, US slash dates, month names and ISO datetimes.
pub fn normalize_date(raw: &str) -> Outcome<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Outcome::unchanged("empty date");
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            if *format == TWO_DIGIT_YEAR {
                return Outcome::Ok(past_century(date));
            }
            return Outcome::Ok(date);
        }
    }

    // ISO datetime: date part followed by 'T' or a space
    if let (Some(head), Some(sep)) = (trimmed.get(..10), trimmed.chars().nth(10)) {
        if sep == 'T' || sep == ' ' {
            if let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
                return Outcome::Ok(date);
            }
        }
    }

    Outcome::unchanged(format!("unparseable date {:?}", trimmed))
}

/// Two-digit years name a past transfer: "6/1/65" is 1965, not 2065
fn past_century(date: NaiveDate) -> NaiveDate {
    if date.year() <= Utc::now().year() {
        return date;
    }
    date.with_year(date.year() - 100)
        .or_else(|| NaiveDate::from_ymd_opt(date.year() - 100, date.month(), 28))
        .unwrap_or(date)
}

/// "current", "Current Owner", "current_owner"...
pub fn is_current_label(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    lower == "current" || lower.starts_with("current ") || lower.starts_with("current_")
}

/// Hands out temporal keys for one property run.
/// The same unparseable string always maps to the same unknown_date_N.
#[derive(Debug, Default)]
pub struct TemporalKeyNormalizer {
    unknown_by_raw: HashMap<String, usize>,
    next_unknown: usize,
}

impl TemporalKeyNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: Option<&str>) -> TemporalKey {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return self.fresh_unknown();
        };

        if is_current_label(raw) {
            return TemporalKey::Current;
        }

        match normalize_date(raw) {
            Outcome::Ok(date) => TemporalKey::Date(date),
            Outcome::Unchanged(reason) => {
                tracing::debug!(raw = %raw, reason = %reason, "date kept as unknown key");
                self.unknown_for(raw)
            }
        }
    }

    fn unknown_for(&mut self, raw: &str) -> TemporalKey {
        let normalized = raw.to_lowercase();
        if let Some(&n) = self.unknown_by_raw.get(&normalized) {
            return TemporalKey::Unknown(n);
        }
        let key = self.fresh_unknown();
        if let TemporalKey::Unknown(n) = key {
            self.unknown_by_raw.insert(normalized, n);
        }
        key
    }

    fn fresh_unknown(&mut self) -> TemporalKey {
        self.next_unknown += 1;
        TemporalKey::Unknown(self.next_unknown)
    }
}

// ============================================================================
// OWNERSHIP SNAPSHOT
// ============================================================================

/// Owner references per temporal key. The current bucket always exists.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnershipSnapshot {
    buckets: BTreeMap<TemporalKey, Vec<EntityId>>,
}

impl OwnershipSnapshot {
    pub fn new() -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert(TemporalKey::Current, Vec::new());
        OwnershipSnapshot { buckets }
    }

    /// Make sure a (possibly empty) bucket exists for this key
    pub fn ensure(&mut self, key: TemporalKey) {
        self.buckets.entry(key).or_default();
    }

    /// Add one owner; returns false if already present in that bucket
    pub fn add(&mut self, key: TemporalKey, id: EntityId) -> bool {
        let bucket = self.buckets.entry(key).or_default();
        if bucket.contains(&id) {
            return false;
        }
        bucket.push(id);
        true
    }

    pub fn extend(&mut self, key: TemporalKey, ids: &[EntityId]) {
        self.ensure(key);
        for id in ids {
            self.add(key, *id);
        }
    }

    pub fn get(&self, key: &TemporalKey) -> &[EntityId] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn current(&self) -> &[EntityId] {
        self.get(&TemporalKey::Current)
    }

    pub fn contains_key(&self, key: &TemporalKey) -> bool {
        self.buckets.contains_key(key)
    }

    /// Keys in output order
    pub fn keys(&self) -> impl Iterator<Item = &TemporalKey> {
        self.buckets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TemporalKey, &Vec<EntityId>)> {
        self.buckets.iter()
    }

    /// Latest dated bucket that has owners
    pub fn latest_dated(&self) -> Option<(TemporalKey, &[EntityId])> {
        self.buckets
            .iter()
            .rev()
            .find(|(key, ids)| key.date().is_some() && !ids.is_empty())
            .map(|(key, ids)| (*key, ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }
}

impl Default for OwnershipSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// `{"2019-06-01": [{"/": "./person_1.json"}], ..., "current": [...]}`
impl Serialize for OwnershipSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (key, ids) in &self.buckets {
            map.serialize_entry(&key.to_string(), &RefList(ids))?;
        }
        map.end()
    }
}

struct RefList<'a>(&'a [EntityId]);

impl Serialize for RefList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for id in self.0 {
            let mut reference = BTreeMap::new();
            reference.insert("/", id.file_ref());
            seq.serialize_element(&reference)?;
        }
        seq.end()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityKind;

    fn person(ordinal: usize) -> EntityId {
        EntityId {
            kind: EntityKind::Person,
            ordinal,
        }
    }

    fn date(s: &str) -> TemporalKey {
        TemporalKey::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    #[test]
    fn test_key_ordering() {
        let mut keys = vec![
            TemporalKey::Current,
            date("2020-01-01"),
            TemporalKey::Unknown(2),
            date("2015-05-05"),
            TemporalKey::Unknown(1),
        ];
        keys.sort();

        let labels: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            labels,
            vec!["unknown_date_1", "unknown_date_2", "2015-05-05", "2020-01-01", "current"]
        );
    }

    #[test]
    fn test_normalize_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();

        assert_eq!(normalize_date("2019-06-01").ok(), Some(expected));
        assert_eq!(normalize_date("06/01/2019").ok(), Some(expected));
        assert_eq!(normalize_date("6/1/19").ok(), Some(expected));
        assert_eq!(normalize_date("2019-06-01T00:00:00Z").ok(), Some(expected));
        assert_eq!(normalize_date("June 1, 2019").ok(), Some(expected));
        assert!(!normalize_date("sometime in 1990").is_ok());
    }

    #[test]
    fn test_two_digit_year_never_in_future() {
        let sixties = NaiveDate::from_ymd_opt(1965, 6, 1).unwrap();
        assert_eq!(normalize_date("6/1/65").ok(), Some(sixties));

        let last_year = Utc::now().year() - 1;
        let short = format!("1/2/{:02}", last_year % 100);
        assert_eq!(
            normalize_date(&short).ok(),
            NaiveDate::from_ymd_opt(last_year, 1, 2)
        );
    }

    #[test]
    fn test_normalizer_reuses_unknown_for_same_raw() {
        let mut normalizer = TemporalKeyNormalizer::new();

        let a = normalizer.normalize(Some("n/a"));
        let b = normalizer.normalize(Some("garbage"));
        let c = normalizer.normalize(Some("N/A"));
        let d = normalizer.normalize(None);

        assert_eq!(a, TemporalKey::Unknown(1));
        assert_eq!(b, TemporalKey::Unknown(2));
        assert_eq!(c, a);
        assert_eq!(d, TemporalKey::Unknown(3));
    }

    #[test]
    fn test_normalizer_current_labels() {
        let mut normalizer = TemporalKeyNormalizer::new();

        assert_eq!(normalizer.normalize(Some("current")), TemporalKey::Current);
        assert_eq!(normalizer.normalize(Some("Current Owner")), TemporalKey::Current);
        assert_eq!(normalizer.normalize(Some("2001-02-03")), date("2001-02-03"));
    }

    #[test]
    fn test_snapshot_always_has_current() {
        let snapshot = OwnershipSnapshot::new();
        assert!(snapshot.contains_key(&TemporalKey::Current));
        assert!(snapshot.current().is_empty());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_add_dedups() {
        let mut snapshot = OwnershipSnapshot::new();
        assert!(snapshot.add(date("2020-01-01"), person(1)));
        assert!(!snapshot.add(date("2020-01-01"), person(1)));
        assert_eq!(snapshot.get(&date("2020-01-01")).len(), 1);
    }

    #[test]
    fn test_latest_dated_skips_empty_buckets() {
        let mut snapshot = OwnershipSnapshot::new();
        snapshot.add(date("2010-01-01"), person(1));
        snapshot.ensure(date("2020-01-01"));
        snapshot.add(TemporalKey::Unknown(1), person(2));

        let (key, ids) = snapshot.latest_dated().unwrap();
        assert_eq!(key, date("2010-01-01"));
        assert_eq!(ids, &[person(1)]);
    }

    #[test]
    fn test_snapshot_serializes_in_key_order() {
        let mut snapshot = OwnershipSnapshot::new();
        snapshot.add(TemporalKey::Current, person(2));
        snapshot.add(date("2019-06-01"), person(1));
        snapshot.add(TemporalKey::Unknown(1), person(1));

        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(
            json,
            r#"{"unknown_date_1":[{"/":"./person_1.json"}],"2019-06-01":[{"/":"./person_1.json"}],"current":[{"/":"./person_2.json"}]}"#
        );
    }
}
