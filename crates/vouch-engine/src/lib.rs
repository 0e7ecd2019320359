//! Vouch Engine — Pure evaluation of presentation definitions: filter
//! evaluation, `oneOf` expansion, descriptor selection, request compilation
//! and proof validation. No I/O.

pub mod compile;
pub mod error;
pub mod expand;
pub mod filter;
pub mod select;
pub mod validate;

pub use compile::{compile, compile_definition, compile_descriptor, identity_request, IDENTITY_ATTRIBUTES};
pub use error::EngineError;
pub use expand::{expand, ResolvedDescriptor};
pub use filter::{compile_field, evaluate, predicate_value, CheckKind, CompiledField, FieldOutcome};
pub use select::{branches, eligible, select, Branch};
pub use validate::{validate, ValidationFailure, ValidationOutcome};
