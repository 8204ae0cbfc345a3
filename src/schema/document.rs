//! Schema documents
//!
//! Serde model of the JSON schema files the server publishes, and their
//! conversion into typed descriptors. Conversion happens once at load time.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::descriptor::{DefinitionTable, Descriptor, DescriptorRef, TypeTag};

/// One JSON schema node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaDocument {
    #[serde(rename = "type")]
    pub type_decl: Option<TypeDecl>,

    pub format: Option<String>,

    pub properties: BTreeMap<String, SchemaDocument>,

    #[serde(rename = "allOf")]
    pub all_of: Vec<SchemaDocument>,

    pub items: Option<Box<SchemaDocument>>,

    #[serde(rename = "additionalProperties")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(rename = "oneOf")]
    pub one_of: Vec<SchemaDocument>,

    #[serde(rename = "$ref")]
    pub reference: Option<String>,

    pub definitions: BTreeMap<String, SchemaDocument>,
}

/// `type` is either a single name or a union
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    One(String),
    Many(Vec<String>),
}

/// `additionalProperties` is either a flag or a value schema
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Flag(bool),
    Schema(Box<SchemaDocument>),
}

/// Definition name from a `$ref` such as `#/definitions/Vec3`
pub fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn type_tag(name: &str, format: Option<&str>) -> TypeTag {
    match name {
        "integer" if format == Some("int32") => TypeTag::Int32,
        "integer" => TypeTag::Int16,
        "number" => TypeTag::Float32,
        "boolean" => TypeTag::Bool,
        "string" => TypeTag::String,
        "array" => TypeTag::Array,
        "object" => TypeTag::Object,
        "null" | "undefined" => TypeTag::Null,
        other => TypeTag::Other(other.to_string()),
    }
}

impl SchemaDocument {
    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Whether this node is nothing but a `$ref`
    fn is_bare_ref(&self) -> bool {
        self.reference.is_some()
            && self.type_decl.is_none()
            && self.properties.is_empty()
            && self.all_of.is_empty()
            && self.items.is_none()
            && self.additional_properties.is_none()
            && self.one_of.is_empty()
    }

    fn to_ref(&self) -> DescriptorRef {
        match &self.reference {
            Some(reference) if self.is_bare_ref() => DescriptorRef::named(ref_name(reference)),
            _ => DescriptorRef::inline(self.to_descriptor()),
        }
    }

    /// Convert this node into a typed descriptor
    pub fn to_descriptor(&self) -> Descriptor {
        let format = self.format.as_deref();
        let types = match &self.type_decl {
            None => Vec::new(),
            Some(TypeDecl::One(name)) => vec![type_tag(name, format)],
            Some(TypeDecl::Many(names)) => names.iter().map(|n| type_tag(n, format)).collect(),
        };

        let fields = self
            .properties
            .iter()
            .map(|(name, doc)| (name.clone(), doc.to_descriptor()))
            .collect();

        // An allOf entry may carry a $ref, inline properties, or both
        let mut inherits_from = Vec::new();
        for entry in &self.all_of {
            if let Some(reference) = &entry.reference {
                inherits_from.push(DescriptorRef::named(ref_name(reference)));
            }
            if !entry.properties.is_empty() || !entry.all_of.is_empty() {
                let mut inline = entry.to_descriptor();
                inline.reference = None;
                inherits_from.push(DescriptorRef::inline(inline));
            }
        }

        let map_value = match &self.additional_properties {
            None | Some(AdditionalProperties::Flag(false)) => None,
            Some(AdditionalProperties::Flag(true)) => {
                Some(DescriptorRef::inline(Descriptor::default()))
            }
            Some(AdditionalProperties::Schema(doc)) => Some(doc.to_ref()),
        };

        Descriptor {
            types,
            fields,
            inherits_from,
            items: self.items.as_ref().map(|doc| doc.to_ref()),
            map_value,
            alternatives: self.one_of.iter().map(SchemaDocument::to_ref).collect(),
            reference: self.reference.as_deref().map(|r| ref_name(r).to_string()),
        }
    }

    /// Convert the document's `definitions` into a definition table
    pub fn definition_table(&self) -> DefinitionTable {
        self.definitions
            .iter()
            .map(|(name, doc)| (name.clone(), doc.to_descriptor()))
            .collect()
    }
}
