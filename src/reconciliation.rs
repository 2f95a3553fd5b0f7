// ⚖️ Sale Reconciler - Sales history → ownership chain
//
// Sale records rarely carry both parties. Each transfer hands the property from
// its grantor to its grantee, so the chain can be read backwards:
//
//   grantee(newest)   = current owners (or sets them when nothing else does)
//   grantee(sale N-1) = grantor(sale N)   when sale N-1 has no grantee text
//   grantor(sale N)   = grantee(sale N-1) when sale N has no grantor text
//
// Every link filled this way is flagged inferred. Dated sales also file their
// grantees under the transfer date in the ownership timeline.

use crate::entities::EntityId;
use crate::resolver::{OwnerResolver, RunState};
use crate::temporal::{normalize_date, TemporalKey};
use crate::timeline::OwnershipTimelineBuilder;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// SALE EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaleEvent {
    /// Raw transfer date as found in the source
    pub ownership_transfer_date: Option<String>,
    pub purchase_price_amount: Option<f64>,
    /// Raw grantor (seller) text
    pub grantor: Option<String>,
    /// Raw grantee (buyer) text
    pub grantee: Option<String>,
}

impl SaleEvent {
    pub fn new(date: Option<&str>) -> Self {
        SaleEvent {
            ownership_transfer_date: date.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.purchase_price_amount = Some(price);
        self
    }

    pub fn with_grantor(mut self, grantor: &str) -> Self {
        self.grantor = Some(grantor.to_string());
        self
    }

    pub fn with_grantee(mut self, grantee: &str) -> Self {
        self.grantee = Some(grantee.to_string());
        self
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.ownership_transfer_date
            .as_deref()
            .and_then(|raw| normalize_date(raw).ok())
    }

    pub fn has_party_text(&self) -> bool {
        has_text(&self.grantor) || has_text(&self.grantee)
    }
}

// ============================================================================
// LINKS & REPORT
// ============================================================================

/// Resolved parties of one sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLink {
    /// 1-based position in ascending date order (sales_N)
    pub sale_index: usize,
    pub date: Option<NaiveDate>,
    pub grantors: Vec<EntityId>,
    pub grantees: Vec<EntityId>,
    pub grantor_inferred: bool,
    pub grantee_inferred: bool,
}

impl SaleLink {
    fn new(sale_index: usize, date: Option<NaiveDate>) -> Self {
        SaleLink {
            sale_index,
            date,
            grantors: Vec::new(),
            grantees: Vec::new(),
            grantor_inferred: false,
            grantee_inferred: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grantors.is_empty() && self.grantees.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscrepancyCategory {
    /// Seller of a sale is not among the buyers of the previous sale
    ChainBreak,
    /// Party text present but nothing resolved from it
    UnresolvedParty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub sale_index: usize,
    pub description: String,
    pub category: DiscrepancyCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Sales in ascending date order; undated first
    pub sales: Vec<SaleEvent>,
    pub links: Vec<SaleLink>,
    /// Current owners were taken from the newest grantee
    pub current_from_sale: bool,
    pub discrepancies: Vec<Discrepancy>,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn inferred_count(&self) -> usize {
        self.links
            .iter()
            .map(|l| l.grantor_inferred as usize + l.grantee_inferred as usize)
            .sum()
    }

    pub fn has_discrepancies(&self) -> bool {
        !self.discrepancies.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Sales reconciliation: {} sales, {} linked, {} inferred links, {} discrepancies{}",
            self.sales.len(),
            self.links.iter().filter(|l| !l.is_empty()).count(),
            self.inferred_count(),
            self.discrepancies.len(),
            if self.current_from_sale {
                ", current owners from newest sale"
            } else {
                ""
            }
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

#[derive(Debug, Clone)]
pub struct SaleReconciler {
    infer_missing_grantors: bool,
}

impl Default for SaleReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl SaleReconciler {
    pub fn new() -> Self {
        SaleReconciler {
            infer_missing_grantors: true,
        }
    }

    pub fn with_grantor_inference(mut self, enabled: bool) -> Self {
        self.infer_missing_grantors = enabled;
        self
    }

    /// Resolve sale parties, infer missing links, and file grantees in the timeline.
    /// Call after the owner buckets are added so known current owners are respected.
    pub fn reconcile(
        &self,
        sales: &[SaleEvent],
        resolver: &OwnerResolver,
        state: &mut RunState,
        timeline: &mut OwnershipTimelineBuilder,
    ) -> ReconciliationReport {
        let mut ordered = sales.to_vec();
        ordered.sort_by_key(SaleEvent::parsed_date);

        let mut links: Vec<SaleLink> = ordered
            .iter()
            .enumerate()
            .map(|(i, sale)| SaleLink::new(i + 1, sale.parsed_date()))
            .collect();

        let mut report = ReconciliationReport {
            sales: Vec::new(),
            links: Vec::new(),
            current_from_sale: false,
            discrepancies: Vec::new(),
            reconciled_at: Utc::now(),
        };

        if !ordered.iter().any(SaleEvent::has_party_text) {
            debug!(sales = ordered.len(), "no grantor/grantee text; sales kept unlinked");
            report.sales = ordered;
            report.links = links;
            return report;
        }

        self.walk_backwards(&ordered, &mut links, resolver, state, timeline, &mut report);

        for link in &links {
            if let (Some(date), false) = (link.date, link.grantees.is_empty()) {
                timeline.add_owners(TemporalKey::Date(date), &link.grantees);
            }
        }

        if self.infer_missing_grantors {
            for i in 1..links.len() {
                if links[i].grantors.is_empty() && !links[i - 1].grantees.is_empty() {
                    links[i].grantors = links[i - 1].grantees.clone();
                    links[i].grantor_inferred = true;
                }
            }
        }

        report.discrepancies.extend(detect_chain_breaks(&links));
        for discrepancy in &report.discrepancies {
            warn!(sale = discrepancy.sale_index, "{}", discrepancy.description);
        }

        report.sales = ordered;
        report.links = links;
        info!("{}", report.summary());
        report
    }

    fn walk_backwards(
        &self,
        ordered: &[SaleEvent],
        links: &mut [SaleLink],
        resolver: &OwnerResolver,
        state: &mut RunState,
        timeline: &mut OwnershipTimelineBuilder,
        report: &mut ReconciliationReport,
    ) {
        let current_known = !timeline.current().is_empty();
        let newest = ordered.len().saturating_sub(1);

        // An owner bucket dated after the newest sale outranks that sale's grantee
        let newest_sale_date = ordered.last().and_then(SaleEvent::parsed_date);
        let superseded = timeline
            .snapshot()
            .latest_dated()
            .and_then(|(key, _)| key.date())
            .is_some_and(|bucket_date| newest_sale_date.map_or(true, |sale_date| bucket_date > sale_date));
        if superseded {
            debug!("owner bucket newer than the newest sale; current left to the timeline");
        }
        let mut carried: Vec<EntityId> = Vec::new();

        for i in (0..ordered.len()).rev() {
            let sale = &ordered[i];
            let context = format!("sales_{}", i + 1);

            let mut grantees = resolve_party(sale.grantee.as_deref(), &context, resolver, state);
            if grantees.is_empty() {
                if has_text(&sale.grantee) {
                    unresolved_party(&mut report.discrepancies, i + 1, "grantee");
                }
                let assumed = if i == newest && current_known {
                    timeline.current().to_vec()
                } else {
                    carried.clone()
                };
                if !assumed.is_empty() {
                    grantees = assumed;
                    links[i].grantee_inferred = true;
                }
            }

            if i == newest && !current_known && !superseded && !grantees.is_empty() {
                timeline.set_current(&grantees);
                report.current_from_sale = true;
                debug!(owners = grantees.len(), "current owners taken from newest sale");
            }

            let grantors = resolve_party(sale.grantor.as_deref(), &context, resolver, state);
            if grantors.is_empty() && has_text(&sale.grantor) {
                unresolved_party(&mut report.discrepancies, i + 1, "grantor");
            }

            carried = grantors.clone();
            links[i].grantees = grantees;
            links[i].grantors = grantors;
        }
    }
}

fn resolve_party(
    text: Option<&str>,
    context: &str,
    resolver: &OwnerResolver,
    state: &mut RunState,
) -> Vec<EntityId> {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => resolver.resolve_blob(text, Some(context), state),
        None => Vec::new(),
    }
}

fn has_text(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|t| !t.trim().is_empty())
}

fn unresolved_party(discrepancies: &mut Vec<Discrepancy>, sale_index: usize, role: &str) {
    discrepancies.push(Discrepancy {
        sale_index,
        description: format!("sale {} {} text resolved to no owner", sale_index, role),
        category: DiscrepancyCategory::UnresolvedParty,
    });
}

/// Stated grantor of a sale shares nobody with the stated grantees of the sale before it
fn detect_chain_breaks(links: &[SaleLink]) -> Vec<Discrepancy> {
    links
        .windows(2)
        .filter(|pair| {
            let (older, newer) = (&pair[0], &pair[1]);
            !older.grantees.is_empty()
                && !newer.grantors.is_empty()
                && !older.grantee_inferred
                && !newer.grantor_inferred
                && !newer.grantors.iter().any(|id| older.grantees.contains(id))
        })
        .map(|pair| Discrepancy {
            sale_index: pair[1].sale_index,
            description: format!(
                "grantor of sale {} is not a grantee of sale {}",
                pair[1].sale_index, pair[0].sale_index
            ),
            category: DiscrepancyCategory::ChainBreak,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::OwnerBucket;
    use crate::source::OwnerEntry;

    fn id_of(state: &RunState, alias: &str) -> EntityId {
        state.registry.find_by_alias(alias).unwrap().id
    }

    fn run(
        sales: &[SaleEvent],
        reconciler: &SaleReconciler,
        builder: &mut OwnershipTimelineBuilder,
        state: &mut RunState,
    ) -> ReconciliationReport {
        let resolver = OwnerResolver::with_defaults().unwrap();
        reconciler.reconcile(sales, &resolver, state, builder)
    }

    #[test]
    fn test_chain_inference_fills_older_grantee() {
        let sales = vec![
            SaleEvent::new(Some("2020-07-15"))
                .with_grantor("CAROL WHITE")
                .with_grantee("DAN BROWN"),
            SaleEvent::new(Some("2000-01-01")).with_price(50000.0),
            SaleEvent::new(Some("2010-03-01"))
                .with_grantor("BOB JONES")
                .with_grantee("CAROL WHITE"),
        ];
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        let report = run(&sales, &SaleReconciler::new(), &mut builder, &mut state);

        let bob = id_of(&state, "BOB JONES");
        assert_eq!(report.sales[0].ownership_transfer_date.as_deref(), Some("2000-01-01"));
        assert_eq!(report.links[0].grantees, vec![bob]);
        assert!(report.links[0].grantee_inferred);
        assert_eq!(report.links[1].grantors, vec![bob]);
        assert!(!report.has_discrepancies());
    }

    #[test]
    fn test_newest_grantee_becomes_current() {
        let sales = vec![SaleEvent::new(Some("2015-03-01"))
            .with_grantor("BOB JONES")
            .with_grantee("CAROL WHITE")];
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        let report = run(&sales, &SaleReconciler::new(), &mut builder, &mut state);

        let carol = id_of(&state, "CAROL WHITE");
        assert!(report.current_from_sale);
        assert_eq!(builder.current(), &[carol]);

        let snapshot = builder.finalize();
        let date = NaiveDate::from_ymd_opt(2015, 3, 1).unwrap();
        assert_eq!(snapshot.get(&TemporalKey::Date(date)), &[carol]);
    }

    #[test]
    fn test_newer_owner_bucket_blocks_current_from_sale() {
        let resolver = OwnerResolver::with_defaults().unwrap();
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        builder.add_bucket(
            &OwnerBucket {
                temporal_key: Some("2022-01-01".to_string()),
                context: "owners_by_date".to_string(),
                entries: vec![OwnerEntry::Text("EVE GREEN".to_string())],
            },
            &resolver,
            &mut state,
        );

        let sales = vec![SaleEvent::new(Some("2015-01-01"))
            .with_grantor("BOB JONES")
            .with_grantee("CAROL WHITE")];
        let report = SaleReconciler::new().reconcile(&sales, &resolver, &mut state, &mut builder);

        assert!(!report.current_from_sale);
        assert!(builder.current().is_empty());
        let eve = id_of(&state, "EVE GREEN");
        assert_eq!(builder.finalize().current(), &[eve]);
    }

    #[test]
    fn test_known_current_owner_fills_missing_newest_grantee() {
        let resolver = OwnerResolver::with_defaults().unwrap();
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        builder.add_bucket(
            &OwnerBucket {
                temporal_key: Some("current".to_string()),
                context: "owners".to_string(),
                entries: vec![OwnerEntry::Text("EVE GREEN".to_string())],
            },
            &resolver,
            &mut state,
        );

        let sales = vec![SaleEvent::new(Some("2018-05-05")).with_grantor("DAN BROWN")];
        let report = SaleReconciler::new().reconcile(&sales, &resolver, &mut state, &mut builder);

        let eve = id_of(&state, "EVE GREEN");
        assert!(!report.current_from_sale);
        assert_eq!(report.links[0].grantees, vec![eve]);
        assert!(report.links[0].grantee_inferred);
        assert_eq!(builder.current(), &[eve]);
    }

    #[test]
    fn test_missing_grantor_backfilled_from_previous_grantee() {
        let sales = vec![
            SaleEvent::new(Some("2001-01-01"))
                .with_grantor("BOB JONES")
                .with_grantee("CAROL WHITE"),
            SaleEvent::new(Some("2011-01-01")).with_grantee("DAN BROWN"),
        ];
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        let report = run(&sales, &SaleReconciler::new(), &mut builder, &mut state);

        assert_eq!(report.links[1].grantors, vec![id_of(&state, "CAROL WHITE")]);
        assert!(report.links[1].grantor_inferred);

        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        let disabled = SaleReconciler::new().with_grantor_inference(false);
        let report = run(&sales, &disabled, &mut builder, &mut state);
        assert!(report.links[1].grantors.is_empty());
    }

    #[test]
    fn test_sales_without_party_text_stay_unlinked() {
        let sales = vec![
            SaleEvent::new(Some("2015-03-01")).with_price(120000.0),
            SaleEvent::new(None).with_price(1.0),
        ];
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        let report = run(&sales, &SaleReconciler::new(), &mut builder, &mut state);

        assert_eq!(report.sales.len(), 2);
        assert_eq!(report.sales[0].ownership_transfer_date, None);
        assert!(report.links.iter().all(SaleLink::is_empty));
        assert!(builder.current().is_empty());
        assert_eq!(state.registry.count(), 0);
    }

    #[test]
    fn test_chain_break_reported() {
        let sales = vec![
            SaleEvent::new(Some("2001-01-01"))
                .with_grantor("BOB JONES")
                .with_grantee("CAROL WHITE"),
            SaleEvent::new(Some("2011-01-01"))
                .with_grantor("FRANK STONE")
                .with_grantee("DAN BROWN"),
        ];
        let mut state = RunState::new();
        let mut builder = OwnershipTimelineBuilder::new();
        let report = run(&sales, &SaleReconciler::new(), &mut builder, &mut state);

        assert_eq!(report.discrepancies.len(), 1);
        assert_eq!(report.discrepancies[0].category, DiscrepancyCategory::ChainBreak);
        assert_eq!(report.discrepancies[0].sale_index, 2);
        assert!(report.summary().contains("1 discrepancies"));
    }

    #[test]
    fn test_parsed_date_accepts_us_format() {
        let sale = SaleEvent::new(Some("06/01/2019"));
        assert_eq!(sale.parsed_date(), NaiveDate::from_ymd_opt(2019, 6, 1));
        assert!(!sale.has_party_text());
        assert_eq!(SaleEvent::new(Some("sometime")).parsed_date(), None);
    }
}
