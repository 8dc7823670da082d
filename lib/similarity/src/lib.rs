//! # relevx Similarity
//!
//! A multi-field similarity engine for structured objects.
//!
//! A [`FieldSpec`] names the fields that matter and how each is compared.
//! Binding the spec to a query object normalizes the query once; the
//! resulting [`BoundSpec`] then scores any number of candidates, returning
//! one similarity in [0.0, 1.0] per field.
//!
//! ## Field kinds
//!
//! - **Text**: lower-cased, whitespace-tokenized, Porter-stemmed, compared
//!   with the Sørensen-Dice coefficient over character bigrams
//! - **Date**: instants in ms since epoch, scored by scaled time distance
//!   (or its complement)
//! - **Exact**: equality
//! - **Number**: relative difference
//!
//! ## Example
//!
//! ```rust
//! use relevx_similarity::{Field, FieldSpec};
//! use serde_json::json;
//!
//! let spec = FieldSpec::default()
//!     .with_field("name", Field::text("name"))
//!     .with_field("created", Field::date("created"));
//!
//! let bound = spec.bind(&json!({"name": "meshugga", "created": 1475798400000i64}));
//! let scores = bound.score(&json!({"name": "Meshuggah", "created": 1475798400000i64}));
//!
//! assert!(scores["name"] > 0.8);
//! assert_eq!(scores["created"], 1.0);
//! ```

pub mod stem;
pub mod distance;
pub mod field;
pub mod spec;
pub mod rank;

// Re-export main types for convenience
pub use field::{Comparator, DateScoring, Field, FieldKind};
pub use spec::{BoundSpec, FieldScores, FieldSpec, SchemaError};
pub use rank::RankedCandidate;
pub use distance::{dice_coefficient, normalize_text};
