//! Claraflow Workflow
//!
//! The canonical, normalized representation of a flow. Every accepted export
//! shape is turned into a [`Flow`] by [`normalize`]; [`validate`] inspects a
//! `Flow` without executing anything.

mod flow;
mod graph;
mod normalize;
mod validate;

pub use flow::{Connection, Flow, Node, Port};
pub use graph::Graph;
pub use normalize::{DEFAULT_FLOW_ID, DEFAULT_FLOW_NAME, normalize};
pub use validate::{
  IssueCode, NodeTypeCatalog, ValidationIssue, ValidationReport, ValidationSummary, validate,
};
