// Owner Resolution - Core Library
// Exposes all modules for use in the CLI and tests

pub mod error;
pub mod outcome;
pub mod vocabulary;
pub mod entities;
pub mod tokenizer;
pub mod classifier;
pub mod person_parser;
pub mod registry;
pub mod invalid;
pub mod resolver;
pub mod temporal;
pub mod timeline;
pub mod reconciliation;
pub mod county;
pub mod source;
pub mod config;
pub mod run;
pub mod output;
pub mod db;
pub mod logging;

// Re-export commonly used types
pub use error::{RejectReason, ResolveError, Result};
pub use outcome::Outcome;
pub use vocabulary::{AffixRule, DesignationKind, DesignationRule, Vocabulary};
pub use entities::{
    CanonicalEntity, EntityId, EntityKind, EntityPayload,
    InterestShare, ParsedCompany, ParsedPerson,
};
pub use tokenizer::{OwnerCandidate, RawOwnerTokenizer};
pub use classifier::{Classification, EntityClassifier};
pub use person_parser::{NameOrder, NameOrderTie, ParserSettings, PersonNameParser};
pub use registry::{IdentityRegistry, Resolution};
pub use invalid::{AuditNote, InvalidOwnerRecord, InvalidOwnerSink, SinkSummary};
pub use resolver::{OwnerResolver, RunState};
pub use temporal::{normalize_date, OwnershipSnapshot, TemporalKey, TemporalKeyNormalizer};
pub use timeline::OwnershipTimelineBuilder;
pub use reconciliation::{
    Discrepancy, DiscrepancyCategory, ReconciliationReport,
    SaleEvent, SaleLink, SaleReconciler,
};
pub use county::{profile_for, CountyProfile, GenericProfile, SurnameFirstProfile};
pub use source::{load_sales_csv, OwnerBucket, OwnerEntry, PersonParts, PropertySource, SourceShape};
pub use config::ResolverConfig;
pub use run::{PropertyRun, RunOutput};
pub use output::OutputWriter;
pub use db::{
    archive_run, archived_runs, compute_run_hash, entity_uuid,
    load_ownership, open_archive, setup_database,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
