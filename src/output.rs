// 📤 Output Writer - RunOutput → JSON records on disk
//
// Layout of one output directory:
//   person_N.json / company_N.json          entity payloads
//   owners.json                             {"property_<id>": {owners_by_date, invalid_owners}}
//   sales_N.json                            {ownership_transfer_date, purchase_price_amount}
//   relationship_sales_N_<role>_<ref>.json  {"from": sales_N, "to": entity}
//   audit.json                              notes, rejection summary, discrepancies
//
// Files are written once, after resolution finished: temp file, then rename.

use crate::entities::{CanonicalEntity, EntityId, EntityPayload};
use crate::error::Result;
use crate::reconciliation::{ReconciliationReport, SaleEvent};
use crate::run::RunOutput;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        OutputWriter {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Write every record of a run; returns the files written
    pub fn write(&self, output: &RunOutput) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;
        let mut written = Vec::new();

        for entity in &output.entities {
            let name = format!("{}.json", entity.id.record_ref());
            written.push(self.write_json(&name, &entity_record(entity)?)?);
        }

        written.push(self.write_json("owners.json", &owners_document(output))?);

        if let Some(report) = &output.sales {
            for (i, sale) in report.sales.iter().enumerate() {
                let name = format!("sales_{}.json", i + 1);
                written.push(self.write_json(&name, &sale_record(sale))?);
            }
            for (name, record) in relationship_records(report) {
                written.push(self.write_json(&name, &record)?);
            }
        }

        written.push(self.write_json("audit.json", &audit_document(output))?);

        debug!(dir = ?self.dir, files = written.len(), "output written");
        Ok(written)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let temp = self.dir.join(format!("{}.tmp", name));

        let content = serde_json::to_string_pretty(value)?;
        fs::write(&temp, content)?;
        fs::rename(&temp, &path)?;
        Ok(path)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Payload fields only, no kind tag
fn entity_record(entity: &CanonicalEntity) -> Result<Value> {
    let record = match &entity.payload {
        EntityPayload::Person(person) => serde_json::to_value(person)?,
        EntityPayload::Company(company) => serde_json::to_value(company)?,
    };
    Ok(record)
}

fn owners_document(output: &RunOutput) -> Value {
    let mut property = serde_json::Map::new();
    property.insert(
        format!("property_{}", output.property_id),
        json!({
            "owners_by_date": output.owners_by_date,
            "invalid_owners": output.invalid_owners,
        }),
    );
    Value::Object(property)
}

/// Transfer date normalized to YYYY-MM-DD when it parses, raw otherwise
fn sale_record(sale: &SaleEvent) -> Value {
    let date = sale
        .parsed_date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .or_else(|| sale.ownership_transfer_date.clone());

    json!({
        "ownership_transfer_date": date,
        "purchase_price_amount": sale.purchase_price_amount,
    })
}

fn relationship_records(report: &ReconciliationReport) -> Vec<(String, Value)> {
    let mut records = Vec::new();
    for link in &report.links {
        let roles: [(&str, &[EntityId], bool); 2] = [
            ("grantee", link.grantees.as_slice(), link.grantee_inferred),
            ("grantor", link.grantors.as_slice(), link.grantor_inferred),
        ];
        for (role, ids, inferred) in roles {
            for id in ids {
                let name = format!(
                    "relationship_sales_{}_{}_{}.json",
                    link.sale_index,
                    role,
                    id.record_ref()
                );
                let mut record = json!({
                    "from": {"/": format!("./sales_{}.json", link.sale_index)},
                    "to": {"/": id.file_ref()},
                });
                if inferred {
                    record["inferred"] = Value::Bool(true);
                }
                records.push((name, record));
            }
        }
    }
    records
}

fn audit_document(output: &RunOutput) -> Value {
    json!({
        "property_id": output.property_id,
        "source_shape": output.shape,
        "county_profile": output.profile,
        "invalid_summary": output.invalid_summary,
        "notes": output.notes,
        "sales": output.sales.as_ref().map(|report| json!({
            "summary": report.summary(),
            "current_from_sale": report.current_from_sale,
            "discrepancies": report.discrepancies,
        })),
    })
}

// ============================================================================
// TESTS
// ============================================================================
