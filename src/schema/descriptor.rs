//! Type descriptor definitions
//!
//! The declared shape of one field or message body, as loaded from a
//! schema document. Descriptors are pure data; `resolver` interprets them.

use std::collections::{BTreeMap, HashMap};

/// Definition table: per-message scope mapping names to descriptors
pub type DefinitionTable = HashMap<String, Descriptor>;

/// Effective wire kind of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Int16,
    Int32,
    Float32,
    Bool,
    String,
    Array,
    Object,
    Map,
}

/// One entry of a declared type union
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTag {
    /// Null/undefined placeholder, skipped when picking the effective kind
    Null,
    Int16,
    Int32,
    Float32,
    Bool,
    String,
    Array,
    Object,
    /// A type name this codec does not know
    Other(String),
}

impl TypeTag {
    /// The wire kind this tag stands for, if any
    pub fn kind(&self) -> Option<Kind> {
        match self {
            TypeTag::Int16 => Some(Kind::Int16),
            TypeTag::Int32 => Some(Kind::Int32),
            TypeTag::Float32 => Some(Kind::Float32),
            TypeTag::Bool => Some(Kind::Bool),
            TypeTag::String => Some(Kind::String),
            TypeTag::Array => Some(Kind::Array),
            TypeTag::Object => Some(Kind::Object),
            TypeTag::Null | TypeTag::Other(_) => None,
        }
    }
}

/// Reference to another descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorRef {
    /// Entry of the message's definition table
    Named(String),

    /// Descriptor declared in place
    Inline(Box<Descriptor>),
}

impl DescriptorRef {
    pub fn named(name: impl Into<String>) -> Self {
        DescriptorRef::Named(name.into())
    }

    pub fn inline(descriptor: Descriptor) -> Self {
        DescriptorRef::Inline(Box::new(descriptor))
    }
}

/// Declared shape of a value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    /// Declared type union, in declaration order (empty when undeclared)
    pub types: Vec<TypeTag>,

    /// Own fields, keyed by name
    pub fields: BTreeMap<String, Descriptor>,

    /// Ancestors whose fields are merged in, in order
    pub inherits_from: Vec<DescriptorRef>,

    /// Element descriptor of an array
    pub items: Option<DescriptorRef>,

    /// Map marker: value descriptor of a string-keyed map
    pub map_value: Option<DescriptorRef>,

    /// Polymorphic alternatives; the last one always wins
    pub alternatives: Vec<DescriptorRef>,

    /// Bare reference to a named definition
    pub reference: Option<String>,
}

impl Descriptor {
    fn of(tag: TypeTag) -> Self {
        Self {
            types: vec![tag],
            ..Self::default()
        }
    }

    pub fn int16() -> Self {
        Self::of(TypeTag::Int16)
    }

    pub fn int32() -> Self {
        Self::of(TypeTag::Int32)
    }

    pub fn float32() -> Self {
        Self::of(TypeTag::Float32)
    }

    pub fn bool() -> Self {
        Self::of(TypeTag::Bool)
    }

    pub fn string() -> Self {
        Self::of(TypeTag::String)
    }

    /// Array whose elements are described by `items`
    pub fn array(items: DescriptorRef) -> Self {
        Self {
            items: Some(items),
            ..Self::of(TypeTag::Array)
        }
    }

    /// Object with the given own fields
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Descriptor)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, d)| (k.into(), d)).collect(),
            ..Self::of(TypeTag::Object)
        }
    }

    /// String-keyed map whose values are described by `value`
    pub fn map(value: DescriptorRef) -> Self {
        Self {
            map_value: Some(value),
            ..Self::of(TypeTag::Object)
        }
    }

    /// Field resolved to the last of `alternatives`
    pub fn one_of(alternatives: Vec<DescriptorRef>) -> Self {
        Self {
            alternatives,
            ..Self::default()
        }
    }

    /// Field standing for the named definition
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            reference: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add ancestors to merge fields from
    pub fn inheriting(mut self, parents: Vec<DescriptorRef>) -> Self {
        self.inherits_from = parents;
        self
    }

    /// Allow null alongside the declared type
    pub fn nullable(mut self) -> Self {
        self.types.insert(0, TypeTag::Null);
        self
    }
}
