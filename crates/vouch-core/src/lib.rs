//! Vouch Core — Data model, identifiers, and configuration types shared by the
//! Vouch presentation-definition evaluation engine.

pub mod config;
pub mod definition;
pub mod error;
pub mod exchange_state;
pub mod proof;
pub mod record;
pub mod request;
pub mod types;

pub use config::{
    AttributeSource, EngineConfig, GovernanceConfig, IssuanceConfig, IssuedAttribute, RuleConfig,
};
pub use definition::{
    Alternative, ConstValue, FieldConstraint, Filter, InputDescriptor, PatternFilter,
    PresentationDefinition, RangeBound, RangeFilter, RangeOp, SubmissionRequirement, ValueType,
};
pub use error::CoreError;
pub use exchange_state::ExchangeState;
pub use proof::{Identifier, Presentation, ProofEvent, RequestedProof, ReturnedProof};
pub use record::{DescriptorResult, ProofResultRecord, VerificationStatus};
pub use request::{AttributeSpec, PredicateSpec, ProofRequestSpec, Restriction, SendPresentationRequest};
pub use types::{ConnectionId, ContactId, NoticeCode, SchemaId, SchemaParts};
