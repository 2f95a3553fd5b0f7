// 🏢 Company Entity - Business, fiduciary or government owner

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCompany {
    pub name: String,
}

impl ParsedCompany {
    /// Collapses internal whitespace; None when nothing is left
    pub fn new(name: &str) -> Option<Self> {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        let name = name.trim_matches(|c: char| c == ',' || c == ';').trim().to_string();

        if name.is_empty() {
            None
        } else {
            Some(ParsedCompany { name })
        }
    }

    /// Dedup key: lower-cased name without periods or commas ("Acme, L.L.C." == "ACME LLC")
    pub fn dedup_key(&self) -> String {
        self.name
            .to_lowercase()
            .replace('.', "")
            .replace(',', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_name_normalized() {
        let company = ParsedCompany::new("  ACME   HOLDINGS LLC, ").unwrap();
        assert_eq!(company.name, "ACME HOLDINGS LLC");
        assert_eq!(company.dedup_key(), "acme holdings llc");
    }

    #[test]
    fn test_dedup_key_ignores_punctuation() {
        let dotted = ParsedCompany::new("Acme, L.L.C.").unwrap();
        let plain = ParsedCompany::new("ACME LLC").unwrap();
        assert_eq!(dotted.dedup_key(), "acme llc");
        assert_eq!(
            ParsedCompany::new("Acme, LLC").unwrap().dedup_key(),
            plain.dedup_key()
        );
    }

    #[test]
    fn test_empty_company_rejected() {
        assert!(ParsedCompany::new("  , ").is_none());
    }
}
