//! Compose document model and transformation pipeline.
//!
//! `compose_kit` turns Docker Compose YAML (anchors, merge keys, `include`,
//! `extends`, `${VAR}` interpolation, profiles) into a normalized typed
//! document, checks it for structural and cross-reference problems, reviews
//! it against best-practice heuristics, and serializes it back to canonical
//! YAML. A small history-tracked [`DocumentStore`] supports edit/undo flows;
//! everything else is a pure function over a document snapshot.

pub mod codec;
pub mod error;
pub mod interpolate;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod store;
pub mod suggest;
pub mod validate;
pub mod yaml_writer;

pub use error::ComposeError;
pub use model::{
    ComposeDocument, Condition, EntityKind, IssueSeverity, Protocol, Resource, ResourceKind,
    Service, Suggestion, SuggestionCategory, SuggestionSeverity, ValidationIssue,
};
pub use parser::{parse, parse_with_options, Diagnostic, ParseOptions, ParseResult, Stage};
pub use store::{apply_edit, DocumentStore, Edit};
pub use suggest::{count_by_entity, highest_severity_by_entity, suggest};
pub use validate::validate;

/// Serializes a document to canonical Compose YAML.
///
/// Deterministic: fixed top-level key order, insertion order inside each
/// map, bookkeeping fields and empty values dropped. Never fails; an
/// invalid document serializes too, so users can always export.
pub fn serialize(document: &ComposeDocument) -> String {
    codec::encode(document)
}
