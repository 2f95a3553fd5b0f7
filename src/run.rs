// 🏃 Property Run - One property, source document → resolved output
//
// Order matters:
//   1. owner buckets (explicit dates and "current")
//   2. sales reconciliation (may set "current" from the newest grantee)
//   3. timeline finalize (fills "current" from history if still empty)
//
// All run state (registry, invalid sink) is created here and dropped with the
// output; nothing survives between properties.

use crate::config::ResolverConfig;
use crate::entities::{CanonicalEntity, EntityId, EntityKind};
use crate::error::Result;
use crate::invalid::{AuditNote, InvalidOwnerRecord, SinkSummary};
use crate::reconciliation::{ReconciliationReport, SaleReconciler};
use crate::resolver::{OwnerResolver, RunState};
use crate::source::{PropertySource, SourceShape};
use crate::temporal::OwnershipSnapshot;
use crate::timeline::OwnershipTimelineBuilder;
use tracing::{debug, info};

// ============================================================================
// RUN OUTPUT
// ============================================================================

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub property_id: String,
    pub shape: SourceShape,
    pub profile: String,

    /// Canonical owners in creation order
    pub entities: Vec<CanonicalEntity>,
    pub owners_by_date: OwnershipSnapshot,

    pub invalid_owners: Vec<InvalidOwnerRecord>,
    pub notes: Vec<AuditNote>,
    pub invalid_summary: SinkSummary,

    /// Present when the source carried any sales
    pub sales: Option<ReconciliationReport>,
}

impl RunOutput {
    pub fn entity(&self, id: EntityId) -> Option<&CanonicalEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn count_by_kind(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Property {}: {} persons, {} companies, {} temporal keys, {} current owners, {} invalid, {} sales",
            self.property_id,
            self.count_by_kind(EntityKind::Person),
            self.count_by_kind(EntityKind::Company),
            self.owners_by_date.len(),
            self.owners_by_date.current().len(),
            self.invalid_owners.len(),
            self.sales.as_ref().map(|s| s.sales.len()).unwrap_or(0)
        )
    }
}

// ============================================================================
// PROPERTY RUN
// ============================================================================

pub struct PropertyRun {
    resolver: OwnerResolver,
    reconciler: SaleReconciler,
}

impl PropertyRun {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let resolver = OwnerResolver::new(config)?;
        let reconciler =
            SaleReconciler::new().with_grantor_inference(config.infer_missing_grantors);
        Ok(Self::from_parts(resolver, reconciler))
    }

    pub fn from_parts(resolver: OwnerResolver, reconciler: SaleReconciler) -> Self {
        PropertyRun {
            resolver,
            reconciler,
        }
    }

    pub fn with_defaults() -> Result<Self> {
        Ok(Self::from_parts(
            OwnerResolver::with_defaults()?,
            SaleReconciler::new(),
        ))
    }

    pub fn resolver(&self) -> &OwnerResolver {
        &self.resolver
    }

    /// Resolve every owner bucket and sale of one property
    pub fn execute(&self, source: &PropertySource) -> RunOutput {
        let mut state = RunState::new();
        let mut timeline = OwnershipTimelineBuilder::new();

        for bucket in &source.buckets {
            timeline.add_bucket(bucket, &self.resolver, &mut state);
        }

        let sales = (!source.sales.is_empty()).then(|| {
            self.reconciler
                .reconcile(&source.sales, &self.resolver, &mut state, &mut timeline)
        });

        let owners_by_date = timeline.finalize();
        debug!(
            property = %source.property_id,
            keys = owners_by_date.len(),
            "ownership timeline finalized"
        );

        let invalid_summary = state.sink.summary();
        let (invalid_owners, notes) = state.sink.into_parts();

        let output = RunOutput {
            property_id: source.property_id.clone(),
            shape: source.shape,
            profile: self.resolver.profile_name().to_string(),
            entities: state.registry.into_entities(),
            owners_by_date,
            invalid_owners,
            notes,
            invalid_summary,
            sales,
        };

        info!("{}", output.summary());
        output
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::SaleEvent;
    use crate::temporal::TemporalKey;
    use regex::Regex;
    use serde_json::json;

    fn execute(source: &PropertySource) -> RunOutput {
        PropertyRun::with_defaults().unwrap().execute(source)
    }

    fn find<'a>(output: &'a RunOutput, alias: &str) -> Option<&'a CanonicalEntity> {
        output.entities.iter().find(|e| e.has_alias(alias))
    }

    #[test]
    fn test_identical_text_resolves_once() {
        let source = PropertySource::new("1")
            .with_owner_text(Some("2010-01-01"), "JOHN SMITH")
            .with_owner_text(Some("current"), "JOHN SMITH");
        let output = execute(&source);

        assert_eq!(output.entities.len(), 1);
        let id = output.entities[0].id;
        assert_eq!(output.owners_by_date.current(), &[id]);
    }

    #[test]
    fn test_name_forms_dedup_to_one_person() {
        let source = PropertySource::new("1").with_owner_text(None, "John Smith\nSmith, John");
        let output = execute(&source);

        assert_eq!(output.count_by_kind(EntityKind::Person), 1);
        assert!(output.entities[0].aliases.len() >= 2);
    }

    #[test]
    fn test_name_order_heuristic() {
        let source = PropertySource::new("1")
            .with_owner_text(Some("2001-01-01"), "Johnson Mary")
            .with_owner_text(Some("2002-01-01"), "Mary Johnson");
        let output = execute(&source);

        assert_eq!(output.entities.len(), 1);
        let mary = output.entities[0].payload.as_person().unwrap();
        assert_eq!(mary.first_name, "Mary");
        assert_eq!(mary.last_name, "Johnson");
    }

    #[test]
    fn test_company_precedence() {
        let source = PropertySource::new("1").with_owner_text(None, "Smith Family Trust");
        let output = execute(&source);

        assert_eq!(output.count_by_kind(EntityKind::Company), 1);
        assert_eq!(output.count_by_kind(EntityKind::Person), 0);
    }

    #[test]
    fn test_fraction_binds_to_its_owner() {
        let source = PropertySource::new("1").with_owner_text(None, "John Doe 1/2 INT, Mary Doe");
        let output = execute(&source);

        let john = find(&output, "John Doe").unwrap().payload.as_person().unwrap();
        let mary = find(&output, "Mary Doe").unwrap().payload.as_person().unwrap();
        assert_eq!(john.ownership_interest_fraction.as_deref(), Some("1/2"));
        assert!(!mary.has_interest());
    }

    #[test]
    fn test_unparseable_owner_lands_in_invalid_list() {
        let source = PropertySource::new("1").with_owner_text(None, "XYZ");
        let output = execute(&source);

        assert!(output.entities.is_empty());
        assert_eq!(output.invalid_owners.len(), 1);
        assert_eq!(output.invalid_owners[0].raw, "XYZ");
        assert_eq!(output.invalid_summary.total, 1);
    }

    #[test]
    fn test_owners_by_date_key_shape() {
        let doc = json!({
            "property_9": {
                "owners_by_date": {
                    "06/01/2019": ["BOB JONES"],
                    "sometime in the 80s": ["CAROL WHITE"],
                    "": ["DAN BROWN"],
                    "2021-02-03T00:00:00": ["EVE GREEN"]
                }
            }
        });
        let output = execute(&PropertySource::from_value(&doc, None).unwrap());

        let key_shape = Regex::new(r"^(\d{4}-\d{2}-\d{2}|unknown_date_\d+)$").unwrap();
        let labels: Vec<String> = output.owners_by_date.keys().map(|k| k.to_string()).collect();
        assert_eq!(labels.iter().filter(|l| l.as_str() == "current").count(), 1);
        assert!(labels
            .iter()
            .filter(|l| l.as_str() != "current")
            .all(|l| key_shape.is_match(l)));
        assert_eq!(
            labels,
            vec!["unknown_date_1", "unknown_date_2", "2019-06-01", "2021-02-03", "current"]
        );

        let eve = find(&output, "Eve Green").unwrap().id;
        assert_eq!(output.owners_by_date.current(), &[eve]);
    }

    #[test]
    fn test_last_first_cells_with_qualifiers() {
        for blob in ["SMITH, JOHN A ET AL", "SMITH, JOHN A 1/2 INT", "SMITH, JOHN A & MARY B"] {
            let output = execute(&PropertySource::new("1").with_owner_text(None, blob));

            assert!(output.invalid_owners.is_empty(), "{}", blob);
            let john = output
                .entities
                .iter()
                .find(|e| e.display_name() == "John A Smith")
                .unwrap()
                .payload
                .as_person()
                .unwrap();
            assert_eq!(john.first_name, "John", "{}", blob);
            assert_eq!(john.last_name, "Smith", "{}", blob);
            assert!(output
                .entities
                .iter()
                .filter_map(|e| e.payload.as_person())
                .all(|p| p.last_name == "Smith"));
        }
    }

    #[test]
    fn test_bucket_newer_than_sales_keeps_current() {
        let source = PropertySource::new("4")
            .with_owner_text(Some("2022-01-01"), "EVE GREEN")
            .with_sales(vec![SaleEvent::new(Some("2015-01-01"))
                .with_grantor("BOB JONES")
                .with_grantee("CAROL WHITE")]);
        let output = execute(&source);

        let eve = find(&output, "EVE GREEN").unwrap().id;
        let carol = find(&output, "CAROL WHITE").unwrap().id;
        assert_eq!(output.owners_by_date.current(), &[eve]);
        assert!(!output.sales.as_ref().unwrap().current_from_sale);

        let sold = TemporalKey::Date(chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(output.owners_by_date.get(&sold), &[carol]);
    }

    #[test]
    fn test_sales_chain_through_run() {
        let source = PropertySource::new("3").with_sales(vec![
            SaleEvent::new(Some("1999-09-09")).with_price(80000.0),
            SaleEvent::new(Some("2005-05-05"))
                .with_grantor("BOB JONES")
                .with_grantee("CAROL WHITE"),
            SaleEvent::new(Some("2015-05-05"))
                .with_grantor("CAROL WHITE")
                .with_grantee("DAN BROWN"),
        ]);
        let output = execute(&source);
        let report = output.sales.as_ref().unwrap();

        let bob = find(&output, "Bob Jones").unwrap().id;
        let dan = find(&output, "Dan Brown").unwrap().id;
        assert_eq!(report.links[0].grantees, report.links[1].grantors);
        assert_eq!(report.links[0].grantees, vec![bob]);
        assert_eq!(output.owners_by_date.current(), &[dan]);
        assert_eq!(output.shape, SourceShape::SalesOnly);
    }

    #[test]
    fn test_empty_source_still_has_current() {
        let output = execute(&PropertySource::new("0"));

        assert!(output.entities.is_empty());
        assert!(output.owners_by_date.contains_key(&TemporalKey::Current));
        assert!(output.owners_by_date.current().is_empty());
        assert!(output.sales.is_none());
    }

    #[test]
    fn test_config_drives_profile() {
        let config = ResolverConfig {
            county: "surname_first".to_string(),
            ..Default::default()
        };
        let run = PropertyRun::new(&config).unwrap();
        let output = run.execute(&PropertySource::new("4").with_owner_text(None, "KING ANNA (2)"));

        assert_eq!(output.profile, "surname_first");
        let anna = output.entities[0].payload.as_person().unwrap();
        assert_eq!(anna.first_name, "Anna");
        assert_eq!(anna.last_name, "King");
    }
}
