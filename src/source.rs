// 📥 Source Documents - Scraped property JSON / sales CSV → PropertySource
//
// Scrapers do not agree on a shape. Accessors are tried in order:
// 1. owners_by_date      {"owners_by_date": {"2019-06-01": [...], "current": [...]}}
// 2. flat owners         {"owners": [...]} / {"owner": "..."} / top-level array
// 3. owner labels        {"owner_labels": [{"label": "Owner", "text": "...", "date": ...}]}
// 4. generic key scan    any string field whose key mentions "owner" (logged)
// Sales come from a "sales" array or from a CSV file (date, price, grantor, grantee).
//
// A document may wrap all of this in {"property_<id>": {...}}.

use crate::error::{ResolveError, Result};
use crate::reconciliation::SaleEvent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// OWNER ENTRIES
// ============================================================================

/// Structured person object as found in pre-seeded documents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonParts {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub prefix_name: Option<String>,
    #[serde(default)]
    pub suffix_name: Option<String>,
}

impl PersonParts {
    /// Parts joined back into one string (audit / alias form)
    pub fn raw(&self) -> String {
        [
            self.prefix_name.as_deref(),
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
            self.suffix_name.as_deref(),
        ]
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OwnerEntry {
    /// Free owner text
    Text(String),
    /// {"first_name": ..., "last_name": ...}
    Person(PersonParts),
    /// {"name": ...}: classified before use
    Named(String),
}

impl OwnerEntry {
    pub fn from_value(value: &Value) -> Option<OwnerEntry> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(OwnerEntry::Text(text.clone())),
            Value::Object(map) => {
                if map.contains_key("first_name") || map.contains_key("last_name") {
                    return serde_json::from_value(value.clone())
                        .ok()
                        .map(OwnerEntry::Person);
                }
                if let Some(name) = string_field(map, &["name", "company_name"]) {
                    return Some(OwnerEntry::Named(name));
                }
                if let Some(text) = string_field(map, &["owner", "owner_name", "text", "value"]) {
                    return Some(OwnerEntry::Text(text));
                }
                if map.contains_key("/") {
                    debug!("skipping file reference in owner list");
                }
                None
            }
            _ => None,
        }
    }

    /// Entries from a string or an array of strings/objects
    pub fn list_from_value(value: &Value) -> Vec<OwnerEntry> {
        match value {
            Value::Array(items) => items.iter().filter_map(OwnerEntry::from_value).collect(),
            other => OwnerEntry::from_value(other).into_iter().collect(),
        }
    }
}

/// Owner entries filed under one raw temporal key
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OwnerBucket {
    /// Raw key as found ("06/01/2019", "current", None for undated)
    pub temporal_key: Option<String>,
    /// Accessor that produced the bucket ("owners_by_date", "owners"...)
    pub context: String,
    pub entries: Vec<OwnerEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceShape {
    OwnersByDate,
    FlatOwners,
    OwnerLabels,
    GenericScan,
    SalesOnly,
    Empty,
}

impl SourceShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceShape::OwnersByDate => "owners_by_date",
            SourceShape::FlatOwners => "flat_owners",
            SourceShape::OwnerLabels => "owner_labels",
            SourceShape::GenericScan => "generic_scan",
            SourceShape::SalesOnly => "sales_only",
            SourceShape::Empty => "empty",
        }
    }
}

// ============================================================================
// PROPERTY SOURCE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySource {
    pub property_id: String,
    pub shape: SourceShape,
    pub buckets: Vec<OwnerBucket>,
    pub sales: Vec<SaleEvent>,
}

impl PropertySource {
    pub fn new(property_id: &str) -> Self {
        PropertySource {
            property_id: property_id.to_string(),
            shape: SourceShape::Empty,
            buckets: Vec::new(),
            sales: Vec::new(),
        }
    }

    /// Builder: add an owner text bucket
    pub fn with_owner_text(mut self, temporal_key: Option<&str>, text: &str) -> Self {
        self.buckets.push(OwnerBucket {
            temporal_key: temporal_key.map(str::to_string),
            context: "owners".to_string(),
            entries: vec![OwnerEntry::Text(text.to_string())],
        });
        if self.shape == SourceShape::Empty || self.shape == SourceShape::SalesOnly {
            self.shape = SourceShape::FlatOwners;
        }
        self
    }

    /// Builder: append sales
    pub fn with_sales(mut self, sales: Vec<SaleEvent>) -> Self {
        self.sales.extend(sales);
        if self.shape == SourceShape::Empty && !self.sales.is_empty() {
            self.shape = SourceShape::SalesOnly;
        }
        self
    }

    /// Load a JSON document; the property id falls back to the file stem
    pub fn from_file<P: AsRef<Path>>(path: P, property_id: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.trim_start_matches("property_").to_string());

        Self::from_value(&value, property_id.or(stem.as_deref()))
    }

    pub fn from_value(value: &Value, property_id: Option<&str>) -> Result<Self> {
        let (doc, wrapped_id) = unwrap_property(value);

        let property_id = property_id
            .map(str::to_string)
            .or(wrapped_id)
            .or_else(|| doc.get("property_id").and_then(scalar_string))
            .ok_or_else(|| {
                ResolveError::Source("no property id in document; pass one explicitly".to_string())
            })?;

        let mut source = PropertySource::new(&property_id);

        let map = match doc {
            Value::Array(_) => {
                source.push_bucket(Some("current"), "owners", OwnerEntry::list_from_value(doc));
                source.shape = SourceShape::FlatOwners;
                return Ok(source);
            }
            Value::Object(map) => map,
            _ => {
                return Err(ResolveError::Source(
                    "expected a JSON object or array".to_string(),
                ))
            }
        };

        if let Some(sales) = map.get("sales").or_else(|| map.get("sales_history")) {
            source.sales = sales_from_value(sales);
        }

        if let Some(Value::Object(by_date)) = map.get("owners_by_date") {
            for (key, owners) in by_date {
                source.push_bucket(Some(key), "owners_by_date", OwnerEntry::list_from_value(owners));
            }
            source.shape = SourceShape::OwnersByDate;
        } else if let Some(owners) = ["owners", "owner_names", "current_owners", "owner"]
            .iter()
            .find_map(|k| map.get(*k))
        {
            source.push_bucket(Some("current"), "owners", OwnerEntry::list_from_value(owners));
            source.shape = SourceShape::FlatOwners;
        } else if let Some(Value::Array(labels)) = map.get("owner_labels") {
            for label in labels {
                source.push_label(label);
            }
            source.shape = SourceShape::OwnerLabels;
        } else {
            let scanned = scan_owner_fields(map)?;
            if !scanned.is_empty() {
                warn!(
                    property = %property_id,
                    fields = scanned.len(),
                    "no known owner schema; falling back to owner key scan"
                );
                let entries = scanned.into_iter().map(OwnerEntry::Text).collect();
                source.push_bucket(Some("current"), "owner_scan", entries);
                source.shape = SourceShape::GenericScan;
            } else if !source.sales.is_empty() {
                source.shape = SourceShape::SalesOnly;
            }
        }

        debug!(
            property = %source.property_id,
            shape = ?source.shape,
            buckets = source.buckets.len(),
            sales = source.sales.len(),
            "source document loaded"
        );
        Ok(source)
    }

    fn push_bucket(&mut self, key: Option<&str>, context: &str, entries: Vec<OwnerEntry>) {
        self.buckets.push(OwnerBucket {
            temporal_key: key.map(str::to_string),
            context: context.to_string(),
            entries,
        });
    }

    /// {"label": "Owner", "text": "...", "date": "..."} or a bare string.
    /// Undated owner labels describe the current owner.
    fn push_label(&mut self, label: &Value) {
        let (text, date) = match label {
            Value::String(text) => (Some(text.clone()), None),
            Value::Object(map) => (
                string_field(map, &["text", "value", "owner"]),
                string_field(map, &["date", "as_of"]),
            ),
            _ => (None, None),
        };

        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            let key = date.unwrap_or_else(|| "current".to_string());
            self.push_bucket(Some(&key), "owner_labels", vec![OwnerEntry::Text(text)]);
        }
    }

    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(|b| b.entries.len()).sum()
    }
}

/// {"property_123": {...}} → ({...}, Some("123"))
fn unwrap_property(value: &Value) -> (&Value, Option<String>) {
    if let Value::Object(map) = value {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if let Some(id) = key.strip_prefix("property_") {
                    if inner.is_object() {
                        return (inner, Some(id.to_string()));
                    }
                }
            }
        }
    }
    (value, None)
}

/// Last resort: every string (or string array) field whose key mentions "owner"
fn scan_owner_fields(map: &Map<String, Value>) -> Result<Vec<String>> {
    let owner_key = Regex::new(r"(?i)owner")?;
    let mut found = Vec::new();
    collect_owner_fields(map, &owner_key, &mut found);
    Ok(found)
}

fn collect_owner_fields(map: &Map<String, Value>, owner_key: &Regex, found: &mut Vec<String>) {
    for (key, value) in map {
        match value {
            Value::String(text) if owner_key.is_match(key) && !text.trim().is_empty() => {
                found.push(text.clone());
            }
            Value::Array(items) if owner_key.is_match(key) => {
                found.extend(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|t| !t.trim().is_empty())
                        .map(str::to_string),
                );
            }
            Value::Object(inner) => collect_owner_fields(inner, owner_key, found),
            _ => {}
        }
    }
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(scalar_string)
        .filter(|s| !s.trim().is_empty())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// SALES
// ============================================================================

fn sales_from_value(value: &Value) -> Vec<SaleEvent> {
    let Value::Array(items) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|sale| SaleEvent {
            ownership_transfer_date: string_field(
                sale,
                &["ownership_transfer_date", "date", "sale_date", "transfer_date"],
            ),
            purchase_price_amount: ["purchase_price_amount", "price", "sale_price", "amount"]
                .iter()
                .filter_map(|k| sale.get(*k))
                .find_map(|v| match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => parse_price(s),
                    _ => None,
                }),
            grantor: string_field(sale, &["grantor", "seller", "grantor_name"]),
            grantee: string_field(sale, &["grantee", "buyer", "grantee_name"]),
        })
        .collect()
}

/// "$120,000.00" → 120000.0
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    #[serde(default, alias = "ownership_transfer_date", alias = "sale_date")]
    date: Option<String>,
    #[serde(default, alias = "purchase_price_amount", alias = "sale_price")]
    price: Option<String>,
    #[serde(default, alias = "seller")]
    grantor: Option<String>,
    #[serde(default, alias = "buyer")]
    grantee: Option<String>,
}

/// Load sales from a CSV with headers date, price, grantor, grantee
pub fn load_sales_csv<P: AsRef<Path>>(path: P) -> Result<Vec<SaleEvent>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut sales = Vec::new();

    for row in reader.deserialize() {
        let row: SaleRow = row?;
        sales.push(SaleEvent {
            ownership_transfer_date: row.date.filter(|d| !d.trim().is_empty()),
            purchase_price_amount: row.price.as_deref().and_then(parse_price),
            grantor: row.grantor.filter(|g| !g.trim().is_empty()),
            grantee: row.grantee.filter(|g| !g.trim().is_empty()),
        });
    }

    Ok(sales)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_owners_by_date_keeps_document_order() {
        let doc = json!({
            "property_42": {
                "owners_by_date": {
                    "current": ["JOHN SMITH"],
                    "06/01/2019": ["ACME LLC", {"first_name": "Jane", "last_name": "Roe"}],
                    "unknown": "MARY JONES"
                }
            }
        });

        let source = PropertySource::from_value(&doc, None).unwrap();
        assert_eq!(source.property_id, "42");
        assert_eq!(source.shape, SourceShape::OwnersByDate);

        let keys: Vec<_> = source.buckets.iter().map(|b| b.temporal_key.clone().unwrap()).collect();
        assert_eq!(keys, vec!["current", "06/01/2019", "unknown"]);
        assert!(matches!(source.buckets[1].entries[1], OwnerEntry::Person(_)));
    }

    #[test]
    fn test_flat_owner_array() {
        let doc = json!(["JOHN SMITH", "ACME LLC"]);
        let source = PropertySource::from_value(&doc, Some("7")).unwrap();

        assert_eq!(source.shape, SourceShape::FlatOwners);
        assert_eq!(source.buckets[0].temporal_key.as_deref(), Some("current"));
        assert_eq!(source.entry_count(), 2);
    }

    #[test]
    fn test_owner_labels_without_date_are_current() {
        let doc = json!({
            "property_id": 99,
            "owner_labels": [
                {"label": "Owner Name", "text": "DOE JOHN"},
                {"label": "Prior Owner", "text": "ROE JANE", "date": "2001-01-01"}
            ]
        });

        let source = PropertySource::from_value(&doc, None).unwrap();
        assert_eq!(source.property_id, "99");
        assert_eq!(source.shape, SourceShape::OwnerLabels);
        assert_eq!(source.buckets[0].temporal_key.as_deref(), Some("current"));
        assert_eq!(source.buckets[1].temporal_key.as_deref(), Some("2001-01-01"));
    }

    #[test]
    fn test_generic_scan_fallback() {
        let doc = json!({
            "parcel": {"mailing": {"primary_owner_text": "SMITH JOHN"}},
            "assessed_value": 100000
        });

        let source = PropertySource::from_value(&doc, Some("1")).unwrap();
        assert_eq!(source.shape, SourceShape::GenericScan);
        assert_eq!(
            source.buckets[0].entries,
            vec![OwnerEntry::Text("SMITH JOHN".to_string())]
        );
    }

    #[test]
    fn test_absent_owner_data_is_empty() {
        let source = PropertySource::from_value(&json!({"assessed_value": 1}), Some("1")).unwrap();
        assert_eq!(source.shape, SourceShape::Empty);
        assert!(source.buckets.is_empty());
    }

    #[test]
    fn test_missing_property_id_is_error() {
        let err = PropertySource::from_value(&json!({"owners": ["X"]}), None).unwrap_err();
        assert!(matches!(err, ResolveError::Source(_)));
    }

    #[test]
    fn test_sales_array() {
        let doc = json!({
            "sales": [
                {"date": "2015-03-01", "price": "$120,000", "grantor": "BOB JONES", "grantee": "CAROL WHITE"},
                {"ownership_transfer_date": "2020-07-15", "purchase_price_amount": 250000}
            ]
        });

        let source = PropertySource::from_value(&doc, Some("5")).unwrap();
        assert_eq!(source.shape, SourceShape::SalesOnly);
        assert_eq!(source.sales.len(), 2);
        assert_eq!(source.sales[0].purchase_price_amount, Some(120000.0));
        assert_eq!(source.sales[1].grantee, None);
    }

    #[test]
    fn test_load_sales_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,price,grantor,grantee").unwrap();
        writeln!(file, "2015-03-01,\"$120,000\",BOB JONES,CAROL WHITE").unwrap();
        writeln!(file, "2020-07-15,250000,,").unwrap();

        let sales = load_sales_csv(file.path()).unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].grantor.as_deref(), Some("BOB JONES"));
        assert_eq!(sales[1].purchase_price_amount, Some(250000.0));
        assert_eq!(sales[1].grantee, None);
    }

    #[test]
    fn test_person_parts_raw() {
        let parts = PersonParts {
            first_name: "Jane".to_string(),
            middle_name: Some("Q".to_string()),
            last_name: "Public".to_string(),
            ..Default::default()
        };
        assert_eq!(parts.raw(), "Jane Q Public");
    }
}
