//! Core node model for tree-to-tree transformations: runtime type
//! descriptors, dynamically typed nodes with provenance and parent links,
//! diagnostics, and traversal passes.

pub mod error;
pub mod issue;
pub mod node;
pub mod node_type;
pub mod origin;
pub mod range;
pub mod source;
pub mod traverse;
pub mod value;

pub use error::{ModelError, Result};
pub use issue::{Issue, IssueKind, IssueSeverity};
pub use node::{Annotation, Node};
pub use node_type::{
    error_node_type, generic_node_type, Feature, Multiplicity, NodeType, NodeTypeBuilder,
    ValueKind, ERROR_MESSAGE_FEATURE,
};
pub use origin::Origin;
pub use range::{Point, Range};
pub use source::{RawValue, SourceNode, SourceRef};
pub use traverse::Walk;
pub use value::{EnumType, ReferenceByName, Value};
