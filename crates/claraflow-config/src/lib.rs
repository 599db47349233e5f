//! Claraflow Config
//!
//! This crate contains the serializable flow shapes for claraflow. These types
//! mirror what the visual editor and the export tooling write to disk, before
//! the flow is normalized into the canonical graph by `claraflow-workflow`.
//!
//! Three historical document shapes are accepted (see [`FlowDocument`]):
//! - a bare graph: `{ "nodes": [...], "connections": [...] }`
//! - a flow carrying its own custom node definitions: `{ "nodes": [...], "customNodes": [...] }`
//! - an export envelope: `{ "format": "clara-sdk", "version": "1.0.0", "flow": {...}, "customNodes": [...] }`

mod connection;
mod custom_node;
mod data_type;
mod document;
mod error;
mod flow;
mod node;
mod port;

pub use connection::ConnectionDef;
pub use custom_node::{CustomNodeDef, PropertyDef};
pub use data_type::DataType;
pub use document::{DocumentShape, FlowDocument, FlowEnvelope, KNOWN_FORMATS};
pub use error::FormatError;
pub use flow::FlowDef;
pub use node::{NodeDef, Position};
pub use port::PortDef;

/// Port used when a connection does not name a source port.
pub const DEFAULT_OUTPUT_PORT: &str = "output";

/// Port used when a connection does not name a target port.
pub const DEFAULT_INPUT_PORT: &str = "input";
