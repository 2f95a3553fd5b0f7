// 🏷️ Vocabulary - Match tables as data
// Company terms, legal/fiduciary designations, name affixes and placeholders
//
// Every keyword list the resolver relies on lives here as plain data, so a
// county can ship its own JSON file instead of patching code.

use crate::error::{ResolveError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// DESIGNATION RULES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignationKind {
    /// TRUSTEE, EXECUTOR, CUSTODIAN...
    Fiduciary,

    /// ESTATE OF, HEIRS OF...
    Estate,

    /// ET AL, ET UX...
    Collective,

    /// JTWROS, LIFE ESTATE, TENANTS IN COMMON...
    Tenancy,

    /// DECEASED, DEC'D...
    Deceased,
}

/// A qualifier phrase stripped from owner text before parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignationRule {
    /// Rule ID for audit notes
    pub id: String,

    /// Phrase to remove (whole words, case-insensitive, optional trailing period)
    pub phrase: String,

    pub kind: DesignationKind,

    /// Ownership-interest group implied by the phrase (tenancy rules only)
    #[serde(default)]
    pub group: Option<String>,

    /// Priority (higher = applied first)
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    0
}

impl DesignationRule {
    pub fn new(id: &str, phrase: &str, kind: DesignationKind) -> Self {
        DesignationRule {
            id: id.to_string(),
            phrase: phrase.to_string(),
            kind,
            group: None,
            priority: 0,
        }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Regex source matching this phrase as whole words
    pub fn pattern(&self) -> String {
        let words: Vec<String> = self
            .phrase
            .split_whitespace()
            .map(regex::escape)
            .collect();
        format!(r"(?i)\b{}\b\.?", words.join(r"\s+"))
    }
}

// ============================================================================
// AFFIX RULES (suffixes / prefixes)
// ============================================================================

/// Raw spellings of one name affix and the form we emit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffixRule {
    pub tokens: Vec<String>,
    pub canonical: String,
}

impl AffixRule {
    pub fn new(tokens: &[&str], canonical: &str) -> Self {
        AffixRule {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            canonical: canonical.to_string(),
        }
    }

    /// Case-insensitive, ignores a trailing period or comma ("Jr.", "JR,")
    pub fn matches(&self, token: &str) -> bool {
        let cleaned = token.trim_end_matches(['.', ',']).to_uppercase();
        !cleaned.is_empty()
            && self
                .tokens
                .iter()
                .any(|t| t.trim_end_matches('.').to_uppercase() == cleaned)
    }
}

// ============================================================================
// VOCABULARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Whole-word business/legal-entity terms; multi-word terms match as sequences
    pub company_terms: Vec<String>,

    pub designations: Vec<DesignationRule>,

    pub suffixes: Vec<AffixRule>,

    pub prefixes: Vec<AffixRule>,

    /// Particles that glue to the following name token ("de la", "van")
    pub name_particles: Vec<String>,

    /// Values that mean "no owner given"
    pub placeholders: Vec<String>,

    /// Trailing company forms re-attached after a comma ("ACME, INC")
    pub legal_forms: Vec<String>,

    /// Words that make a following fiduciary abbreviation part of a trust
    /// name ("SMITH FAMILY TR", "JOHN SMITH REV TR")
    pub holding_words: Vec<String>,
}

impl Vocabulary {
    /// Load vocabulary from a JSON file; missing tables keep the built-in defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ResolveError::Config(format!(
                "Failed to read vocabulary file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let mut vocabulary: Vocabulary = serde_json::from_str(&content)?;
        vocabulary.sort_designations();
        Ok(vocabulary)
    }

    /// Add a single designation rule
    pub fn add_designation(&mut self, rule: DesignationRule) {
        self.designations.push(rule);
        self.sort_designations();
    }

    pub fn add_company_term(&mut self, term: &str) {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !self.company_terms.contains(&term) {
            self.company_terms.push(term);
        }
    }

    /// Highest priority first, then longest phrase first so "LIFE ESTATE"
    /// wins over anything it contains
    fn sort_designations(&mut self) {
        self.designations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.phrase.len().cmp(&a.phrase.len()))
        });
    }

    /// Canonical suffix for a token ("JR" -> "Jr.")
    pub fn suffix_for(&self, token: &str) -> Option<&str> {
        self.suffixes
            .iter()
            .find(|rule| rule.matches(token))
            .map(|rule| rule.canonical.as_str())
    }

    /// Canonical prefix for a token ("MRS" -> "Mrs.")
    pub fn prefix_for(&self, token: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|rule| rule.matches(token))
            .map(|rule| rule.canonical.as_str())
    }

    pub fn is_particle(&self, token: &str) -> bool {
        let lower = token.to_lowercase();
        self.name_particles.iter().any(|p| *p == lower)
    }

    pub fn is_legal_form(&self, word: &str) -> bool {
        let cleaned = word.replace('.', "").to_lowercase();
        self.legal_forms.iter().any(|f| *f == cleaned)
    }

    pub fn is_holding_word(&self, word: &str) -> bool {
        let cleaned = word.replace('.', "").to_lowercase();
        self.holding_words.iter().any(|w| *w == cleaned)
    }

    /// Whole text equals a placeholder value (punctuation and case ignored)
    pub fn is_placeholder(&self, text: &str) -> bool {
        let cleaned = text
            .trim_matches(|c: char| !c.is_alphanumeric())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        !cleaned.is_empty() && self.placeholders.iter().any(|p| *p == cleaned)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        let mut vocabulary = Vocabulary {
            company_terms: default_company_terms(),
            designations: default_designations(),
            suffixes: vec![
                AffixRule::new(&["JR"], "Jr."),
                AffixRule::new(&["SR"], "Sr."),
                AffixRule::new(&["II", "2ND"], "II"),
                AffixRule::new(&["III", "3RD"], "III"),
                AffixRule::new(&["IV", "4TH"], "IV"),
                AffixRule::new(&["PHD"], "PhD"),
                AffixRule::new(&["MD"], "MD"),
                AffixRule::new(&["ESQ"], "Esq."),
                AffixRule::new(&["DDS"], "DDS"),
            ],
            prefixes: vec![
                AffixRule::new(&["MR"], "Mr."),
                AffixRule::new(&["MRS"], "Mrs."),
                AffixRule::new(&["MS"], "Ms."),
                AffixRule::new(&["MISS"], "Miss"),
                AffixRule::new(&["DR"], "Dr."),
                AffixRule::new(&["REV"], "Rev."),
            ],
            name_particles: ["de", "del", "della", "la", "le", "van", "von", "der", "da", "di", "st"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            placeholders: [
                "unknown",
                "unknown owner",
                "n/a",
                "na",
                "none",
                "not available",
                "not listed",
                "owner of record",
                "current owner",
                "same",
                "same as above",
                "confidential",
                "withheld",
                "redacted",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            legal_forms: ["inc", "llc", "ltd", "corp", "co", "lp", "llp", "pllc", "pa", "pc", "plc"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            holding_words: ["family", "rev", "revocable", "irrev", "irrevocable", "liv", "living"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        vocabulary.sort_designations();
        vocabulary
    }
}

fn default_company_terms() -> Vec<String> {
    [
        // Legal forms
        "llc", "inc", "incorporated", "corp", "corporation", "co", "company", "companies",
        "ltd", "limited", "lp", "llp", "lllp", "pllc", "pc", "plc",
        // Fiduciary and holding vehicles
        "trust", "trustee", "trustees", "estate", "holdings",
        "partners", "partnership",
        "family tr", "rev tr", "liv tr", "living tr", "irrev tr", "revocable", "irrevocable",
        "fund", "foundation", "investments", "investors", "capital", "ventures",
        "enterprises", "management", "properties", "realty", "real estate",
        "development", "developers", "builders", "construction", "homes", "apartments",
        // Finance
        "bank", "bancorp", "credit union", "mortgage", "financial", "lending",
        "savings", "federal national mortgage association",
        // Religious and civic bodies
        "church", "ministries", "ministry", "diocese", "parish", "temple", "congregation",
        "association", "assn", "society", "club", "lodge", "league", "council",
        "homeowners", "hoa", "condominium", "cooperative",
        // Institutions
        "university", "college", "school", "academy", "hospital", "institute",
        // Government bodies
        "county", "city", "township", "village", "state", "commonwealth", "authority",
        "department", "dept", "government", "federal", "united states", "commission",
        "board", "agency", "district", "housing", "municipality",
        // Misc
        "group", "services", "farms", "ranch",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_designations() -> Vec<DesignationRule> {
    use DesignationKind::*;

    vec![
        // Fiduciary roles
        DesignationRule::new("successor_trustee", "SUCCESSOR TRUSTEE", Fiduciary),
        DesignationRule::new("co_trustee", "CO-TRUSTEE", Fiduciary),
        DesignationRule::new("as_trustee", "AS TRUSTEE", Fiduciary),
        DesignationRule::new("trustees", "TRUSTEES", Fiduciary),
        DesignationRule::new("trustee", "TRUSTEE", Fiduciary),
        DesignationRule::new("ttees", "TTEES", Fiduciary),
        DesignationRule::new("ttee", "TTEE", Fiduciary),
        DesignationRule::new("trs", "TRS", Fiduciary),
        DesignationRule::new("tr", "TR", Fiduciary),
        DesignationRule::new("personal_rep", "PERSONAL REPRESENTATIVE", Fiduciary),
        DesignationRule::new("pers_rep", "PERS REP", Fiduciary),
        DesignationRule::new("executor", "EXECUTOR", Fiduciary),
        DesignationRule::new("executrix", "EXECUTRIX", Fiduciary),
        DesignationRule::new("administrator", "ADMINISTRATOR", Fiduciary),
        DesignationRule::new("administratrix", "ADMINISTRATRIX", Fiduciary),
        DesignationRule::new("custodian", "CUSTODIAN", Fiduciary),
        DesignationRule::new("guardian", "GUARDIAN", Fiduciary),
        DesignationRule::new("conservator", "CONSERVATOR", Fiduciary),
        DesignationRule::new("attorney_in_fact", "ATTORNEY IN FACT", Fiduciary),
        DesignationRule::new("poa", "POA", Fiduciary),
        // Estates
        DesignationRule::new("the_estate_of", "THE ESTATE OF", Estate),
        DesignationRule::new("estate_of", "ESTATE OF", Estate),
        DesignationRule::new("est_of", "EST OF", Estate),
        DesignationRule::new("unknown_heirs_of", "UNKNOWN HEIRS OF", Estate),
        DesignationRule::new("heirs_of", "HEIRS OF", Estate),
        DesignationRule::new("devisees_of", "DEVISEES OF", Estate),
        DesignationRule::new("heirs", "HEIRS", Estate),
        // Collective markers
        DesignationRule::new("et_als", "ET ALS", Collective),
        DesignationRule::new("et_al", "ET AL", Collective),
        DesignationRule::new("etal", "ETAL", Collective),
        DesignationRule::new("et_ux", "ET UX", Collective),
        DesignationRule::new("etux", "ETUX", Collective),
        DesignationRule::new("et_vir", "ET VIR", Collective),
        DesignationRule::new("etvir", "ETVIR", Collective),
        // Tenancy
        DesignationRule::new("life_estate", "LIFE ESTATE", Tenancy).with_group("life_estate"),
        DesignationRule::new("life_tenant", "LIFE TENANT", Tenancy).with_group("life_estate"),
        DesignationRule::new("l_e", "L/E", Tenancy).with_group("life_estate"),
        DesignationRule::new("remainderman", "REMAINDERMAN", Tenancy).with_group("remainder"),
        DesignationRule::new("jtwros", "JTWROS", Tenancy)
            .with_group("joint_tenants_with_survivorship"),
        DesignationRule::new("jt_wros", "JT WROS", Tenancy)
            .with_group("joint_tenants_with_survivorship"),
        DesignationRule::new("jtrs", "JTRS", Tenancy)
            .with_group("joint_tenants_with_survivorship"),
        DesignationRule::new("jt_ten", "JT TEN", Tenancy).with_group("joint_tenants"),
        DesignationRule::new("joint_tenants", "JOINT TENANTS", Tenancy).with_group("joint_tenants"),
        DesignationRule::new("tenants_in_common", "TENANTS IN COMMON", Tenancy)
            .with_group("tenants_in_common"),
        DesignationRule::new("ten_com", "TEN COM", Tenancy).with_group("tenants_in_common"),
        DesignationRule::new("tic", "TIC", Tenancy).with_group("tenants_in_common"),
        DesignationRule::new("tenants_by_entirety", "TENANTS BY THE ENTIRETY", Tenancy)
            .with_group("tenancy_by_entirety"),
        DesignationRule::new("ten_ent", "TEN ENT", Tenancy).with_group("tenancy_by_entirety"),
        DesignationRule::new("tbe", "TBE", Tenancy).with_group("tenancy_by_entirety"),
        DesignationRule::new("husband_and_wife", "HUSBAND AND WIFE", Tenancy)
            .with_group("husband_and_wife"),
        DesignationRule::new("wife_and_husband", "WIFE AND HUSBAND", Tenancy)
            .with_group("husband_and_wife"),
        DesignationRule::new("h_w", "H/W", Tenancy).with_group("husband_and_wife"),
        DesignationRule::new("w_h", "W/H", Tenancy).with_group("husband_and_wife"),
        DesignationRule::new("h_and_w", "H&W", Tenancy).with_group("husband_and_wife"),
        // Deceased markers
        DesignationRule::new("deceased", "DECEASED", Deceased),
        DesignationRule::new("dec_d", "DEC'D", Deceased),
        DesignationRule::new("decd", "DECD", Deceased),
    ]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::io::Write;

    #[test]
    fn test_designations_sorted_longest_first() {
        let vocabulary = Vocabulary::default();
        let life = vocabulary
            .designations
            .iter()
            .position(|r| r.id == "life_estate")
            .unwrap();
        let tr = vocabulary.designations.iter().position(|r| r.id == "tr").unwrap();
        assert!(life < tr);
    }

    #[test]
    fn test_designation_pattern_whole_words() {
        let rule = DesignationRule::new("et_al", "ET AL", DesignationKind::Collective);
        let re = Regex::new(&rule.pattern()).unwrap();

        assert!(re.is_match("JOHN SMITH ET AL"));
        assert!(re.is_match("john smith et  al."));
        assert!(!re.is_match("JOHN SMITHET ALDER"));
    }

    #[test]
    fn test_affix_lookup() {
        let vocabulary = Vocabulary::default();

        assert_eq!(vocabulary.suffix_for("JR."), Some("Jr."));
        assert_eq!(vocabulary.suffix_for("iii"), Some("III"));
        assert_eq!(vocabulary.suffix_for("3RD"), Some("III"));
        assert_eq!(vocabulary.suffix_for("SMITH"), None);
        assert_eq!(vocabulary.prefix_for("Mrs"), Some("Mrs."));
    }

    #[test]
    fn test_placeholder_detection() {
        let vocabulary = Vocabulary::default();

        assert!(vocabulary.is_placeholder("UNKNOWN"));
        assert!(vocabulary.is_placeholder("  N/A "));
        assert!(vocabulary.is_placeholder("Owner of Record."));
        assert!(!vocabulary.is_placeholder("John Unknown"));
    }

    #[test]
    fn test_trust_abbreviations_are_company_terms() {
        let vocabulary = Vocabulary::default();
        let terms = &vocabulary.company_terms;

        assert!(terms.contains(&"rev tr".to_string()));
        assert!(terms.contains(&"family tr".to_string()));
        // A bare TR is a trustee marker, not a company
        assert!(!terms.contains(&"tr".to_string()));
        assert!(vocabulary.is_holding_word("Rev."));
        assert!(!vocabulary.is_holding_word("Smith"));
    }

    #[test]
    fn test_legal_form_ignores_periods() {
        let vocabulary = Vocabulary::default();
        assert!(vocabulary.is_legal_form("L.L.C."));
        assert!(vocabulary.is_legal_form("Inc."));
        assert!(!vocabulary.is_legal_form("Smith"));
    }

    #[test]
    fn test_from_file_keeps_missing_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"company_terms": ["irrigation"], "designations": [{{"id": "rem", "phrase": "REM", "kind": "tenancy", "group": "remainder"}}]}}"#
        )
        .unwrap();

        let vocabulary = Vocabulary::from_file(file.path()).unwrap();

        assert_eq!(vocabulary.company_terms, vec!["irrigation".to_string()]);
        assert_eq!(vocabulary.designations.len(), 1);
        assert_eq!(vocabulary.designations[0].group.as_deref(), Some("remainder"));
        // Tables absent from the file fall back to the defaults
        assert_eq!(vocabulary.suffix_for("JR"), Some("Jr."));
    }

    #[test]
    fn test_from_file_missing_path() {
        let result = Vocabulary::from_file("/nonexistent/vocabulary.json");
        assert!(matches!(result, Err(ResolveError::Config(_))));
    }
}
