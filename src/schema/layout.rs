//! Compiled message layout
//!
//! A descriptor and its definition table are compiled once into a flat
//! node graph: kinds resolved, inherited fields merged and sorted,
//! polymorphic fields pointed at their last alternative. The codec walks
//! this graph and never re-interprets descriptors per message.
//!
//! Named definitions are memoized, so self-referencing definitions
//! (trees, linked lists) compile to cycles in the graph instead of
//! recursing forever.

use std::collections::{HashMap, HashSet};

use crate::error::{MyceliumError, Result};

use super::descriptor::{DefinitionTable, Descriptor, DescriptorRef, Kind};
use super::resolver::{self, Indirection};

/// Index of a node in a [`Layout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A compiled value shape
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// No determinable kind: decodes as absent, encodes nothing
    Skip,
    Int16,
    Int32,
    Float32,
    Bool,
    String,
    Array(NodeId),
    /// Fields in lexicographic name order
    Object(Vec<Field>),
    Map(NodeId),
}

/// A named field of an object node
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub node: NodeId,
}

/// Immutable compiled graph for one message schema
#[derive(Debug, Clone)]
pub struct Layout {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Layout {
    /// Compile a top-level descriptor against its definition table
    pub fn compile(root: &Descriptor, table: &DefinitionTable) -> Result<Self> {
        let mut compiler = Compiler {
            table,
            nodes: Vec::new(),
            named: HashMap::new(),
            aliasing: HashSet::new(),
        };
        let root = compiler.compile(root)?;

        Ok(Self {
            nodes: compiler.nodes,
            root,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of compiled nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

struct Compiler<'a> {
    table: &'a DefinitionTable,
    nodes: Vec<Node>,
    /// Named definitions already assigned a node
    named: HashMap<&'a str, NodeId>,
    /// Definitions that are themselves references, currently being followed
    aliasing: HashSet<&'a str>,
}

impl<'a> Compiler<'a> {
    fn reserve(&mut self) -> NodeId {
        self.nodes.push(Node::Skip);
        NodeId(self.nodes.len() - 1)
    }

    fn compile(&mut self, descriptor: &'a Descriptor) -> Result<NodeId> {
        match resolver::indirection(descriptor) {
            Some(Indirection::Named(name)) => self.compile_named(name),
            Some(Indirection::Inline(inner)) => self.compile(inner),
            None => {
                let id = self.reserve();
                let node = self.build(descriptor)?;
                self.nodes[id.0] = node;
                Ok(id)
            }
        }
    }

    fn compile_ref(&mut self, reference: &'a DescriptorRef) -> Result<NodeId> {
        match reference {
            DescriptorRef::Named(name) => self.compile_named(name),
            DescriptorRef::Inline(descriptor) => self.compile(descriptor),
        }
    }

    fn compile_named(&mut self, name: &'a str) -> Result<NodeId> {
        if let Some(&id) = self.named.get(name) {
            return Ok(id);
        }

        let descriptor = resolver::lookup(name, self.table)?;

        if resolver::indirection(descriptor).is_none() {
            // Register before building so recursive references find this node
            let id = self.reserve();
            self.named.insert(name, id);
            let node = self.build(descriptor)?;
            self.nodes[id.0] = node;
            return Ok(id);
        }

        if !self.aliasing.insert(name) {
            return Err(MyceliumError::Schema(format!(
                "reference cycle through definition '{}'",
                name
            )));
        }
        let id = self.compile(descriptor)?;
        self.aliasing.remove(name);
        self.named.insert(name, id);
        Ok(id)
    }

    fn build(&mut self, descriptor: &'a Descriptor) -> Result<Node> {
        let kind = match resolver::effective_kind(descriptor) {
            Some(kind) => kind,
            None => return Ok(Node::Skip),
        };

        let node = match kind {
            Kind::Int16 => Node::Int16,
            Kind::Int32 => Node::Int32,
            Kind::Float32 => Node::Float32,
            Kind::Bool => Node::Bool,
            Kind::String => Node::String,
            Kind::Array => {
                let items = descriptor.items.as_ref().ok_or_else(|| {
                    MyceliumError::Schema("array descriptor without items".to_string())
                })?;
                Node::Array(self.compile_ref(items)?)
            }
            Kind::Map => {
                let value = descriptor.map_value.as_ref().ok_or_else(|| {
                    MyceliumError::Schema("map descriptor without value type".to_string())
                })?;
                Node::Map(self.compile_ref(value)?)
            }
            Kind::Object => {
                let fields = resolver::effective_fields(descriptor, self.table)?;
                let mut compiled = Vec::with_capacity(fields.len());
                for (name, field) in fields {
                    compiled.push(Field {
                        name: name.to_string(),
                        node: self.compile(field)?,
                    });
                }
                Node::Object(compiled)
            }
        };

        Ok(node)
    }
}
