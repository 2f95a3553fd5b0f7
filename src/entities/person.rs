// 👤 Person Entity - Parsed human owner + ownership interest
//
// A ParsedPerson is a VALUE: produced by the name parser, then absorbed into a
// CanonicalEntity by the registry. Merging only ever fills gaps.

use crate::outcome::Outcome;
use serde::{Deserialize, Serialize};

// ============================================================================
// INTEREST SHARE
// ============================================================================

/// Partial ownership annotation lifted out of owner text ("1/2 INT", "25%")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestShare {
    pub numerator: Option<f64>,
    pub denominator: Option<f64>,

    /// numerator / denominator (or percentage / 100)
    pub fraction: f64,

    /// As written, normalized ("1/2"); None for percentage annotations
    pub fraction_string: Option<String>,
}

impl InterestShare {
    /// Build from a NUM/DENOM pair; zero or non-finite denominators are rejected
    pub fn from_fraction(numerator: f64, denominator: f64) -> Outcome<Self> {
        if !numerator.is_finite() || !denominator.is_finite() {
            return Outcome::unchanged("non-numeric interest fraction");
        }
        if denominator == 0.0 {
            return Outcome::unchanged("zero denominator in interest fraction");
        }

        Outcome::Ok(InterestShare {
            numerator: Some(numerator),
            denominator: Some(denominator),
            fraction: numerator / denominator,
            fraction_string: Some(format!(
                "{}/{}",
                format_number(numerator),
                format_number(denominator)
            )),
        })
    }

    /// Build from a percentage annotation ("50%")
    pub fn from_percentage(percentage: f64) -> Outcome<Self> {
        if !percentage.is_finite() || percentage <= 0.0 || percentage > 100.0 {
            return Outcome::unchanged("interest percentage out of range");
        }

        Outcome::Ok(InterestShare {
            numerator: None,
            denominator: None,
            fraction: percentage / 100.0,
            fraction_string: None,
        })
    }

    pub fn percentage(&self) -> f64 {
        round_to(self.fraction * 100.0, 4)
    }

    pub fn decimal(&self) -> f64 {
        round_to(self.fraction, 6)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ============================================================================
// PARSED PERSON
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedPerson {
    pub first_name: String,
    pub last_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_interest_fraction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_interest_decimal: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_interest_percentage: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership_interest_group: Option<String>,
}

impl ParsedPerson {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        ParsedPerson {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    /// Builder: add middle name
    pub fn with_middle(mut self, middle: impl Into<String>) -> Self {
        self.middle_name = Some(middle.into());
        self
    }

    /// Builder: add suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix_name = Some(suffix.into());
        self
    }

    /// "First Middle Last Suffix"
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = vec![&self.first_name];
        if let Some(middle) = &self.middle_name {
            parts.push(middle);
        }
        parts.push(&self.last_name);
        if let Some(suffix) = &self.suffix_name {
            parts.push(suffix);
        }
        parts.join(" ")
    }

    /// Dedup key: lower-cased first|middle|last
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.first_name.to_lowercase(),
            self.middle_name.as_deref().unwrap_or("").to_lowercase(),
            self.last_name.to_lowercase()
        )
    }

    /// Attach an interest share; fields already set are kept
    pub fn apply_interest(&mut self, share: &InterestShare) {
        if self.ownership_interest_fraction.is_none() {
            self.ownership_interest_fraction = share.fraction_string.clone();
        }
        if self.ownership_interest_decimal.is_none() {
            self.ownership_interest_decimal = Some(share.decimal());
        }
        if self.ownership_interest_percentage.is_none() {
            self.ownership_interest_percentage = Some(share.percentage());
        }
    }

    pub fn has_interest(&self) -> bool {
        self.ownership_interest_fraction.is_some()
            || self.ownership_interest_decimal.is_some()
            || self.ownership_interest_percentage.is_some()
    }

    /// Fill null fields from `other`. Never overwrites. Returns true if anything changed.
    pub fn fill_missing_from(&mut self, other: &ParsedPerson) -> bool {
        let mut changed = false;
        changed |= fill(&mut self.middle_name, &other.middle_name);
        changed |= fill(&mut self.prefix_name, &other.prefix_name);
        changed |= fill(&mut self.suffix_name, &other.suffix_name);
        changed |= fill(
            &mut self.ownership_interest_fraction,
            &other.ownership_interest_fraction,
        );
        changed |= fill(
            &mut self.ownership_interest_decimal,
            &other.ownership_interest_decimal,
        );
        changed |= fill(
            &mut self.ownership_interest_percentage,
            &other.ownership_interest_percentage,
        );
        changed |= fill(
            &mut self.ownership_interest_group,
            &other.ownership_interest_group,
        );
        changed
    }

    /// Two parses disagree on a field both of them populate
    pub fn conflicts_with(&self, other: &ParsedPerson) -> bool {
        fn differs(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => !a.eq_ignore_ascii_case(b),
                _ => false,
            }
        }

        !self.first_name.eq_ignore_ascii_case(&other.first_name)
            || !self.last_name.eq_ignore_ascii_case(&other.last_name)
            || differs(&self.middle_name, &other.middle_name)
            || differs(&self.suffix_name, &other.suffix_name)
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, incoming: &Option<T>) -> bool {
    if slot.is_none() && incoming.is_some() {
        *slot = incoming.clone();
        true
    } else {
        false
    }
}

// ============================================================================
// TESTS
// ============================================================================
