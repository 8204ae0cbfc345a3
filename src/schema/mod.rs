//! Schema Module
//!
//! Describes message shapes and compiles them for the codec.
//!
//! ## Pipeline
//! ```text
//! JSON document ──► SchemaDocument ──► Descriptor + DefinitionTable
//!                                              │
//!                                   resolver (kind, fields, oneOf)
//!                                              │
//!                                              ▼
//!                                    Layout (compiled node graph)
//! ```
//!
//! ## Field Order
//! The wire carries no field names. Both sides derive the order of an
//! object's fields from the schema alone: the lexicographic sort of the
//! merged (own + inherited) field names.

mod descriptor;
mod document;
mod layout;
mod registry;
pub mod resolver;

pub use descriptor::{DefinitionTable, Descriptor, DescriptorRef, Kind, TypeTag};
pub use document::{ref_name, AdditionalProperties, SchemaDocument, TypeDecl};
pub use layout::{Field, Layout, Node, NodeId};
pub use registry::{EventKey, MessageSchema, RegistryBuilder, SchemaRegistry, SCHEMA_MAP_FILENAME};
