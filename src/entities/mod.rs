// Entity Models
// Following Rich Hickey's philosophy: "Identity persists, values change"
//
// - ParsedPerson / ParsedCompany are values produced by parsing owner text
// - CanonicalEntity is the identity one or more of those values resolve to

pub mod canonical;
pub mod company;
pub mod person;

pub use canonical::{normalize_alias, CanonicalEntity, EntityId, EntityKind, EntityPayload};
pub use company::ParsedCompany;
pub use person::{InterestShare, ParsedPerson};
