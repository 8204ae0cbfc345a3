//! Schema resolver
//!
//! Interprets descriptors against a definition table: effective kind,
//! flattened field set and polymorphic field resolution.

use std::collections::BTreeMap;

use crate::error::{MyceliumError, Result};

use super::descriptor::{Descriptor, DescriptorRef, DefinitionTable, Kind, TypeTag};

/// Longest chain of reference hops followed before giving up
const MAX_REFERENCE_DEPTH: usize = 64;

/// Where a field points instead of describing itself
#[derive(Debug, Clone, Copy)]
pub enum Indirection<'a> {
    Named(&'a str),
    Inline(&'a Descriptor),
}

impl<'a> From<&'a DescriptorRef> for Indirection<'a> {
    fn from(r: &'a DescriptorRef) -> Self {
        match r {
            DescriptorRef::Named(name) => Indirection::Named(name),
            DescriptorRef::Inline(descriptor) => Indirection::Inline(descriptor),
        }
    }
}

/// Compute the wire kind of a descriptor
///
/// Returns `None` when no kind can be determined. Such fields decode as
/// absent without consuming bytes and encode nothing, which keeps schemas
/// with unknown extensions loadable.
///
/// An undeclared type counts as an object only when the descriptor has
/// fields or parents. A bare `{}` is unknown, not an empty object: the
/// payload reader treats a missing type as nothing to read, and the wire
/// has to agree with it rather than with the schema-listing default of
/// `object`, which would expect a presence byte.
pub fn effective_kind(descriptor: &Descriptor) -> Option<Kind> {
    if descriptor.map_value.is_some() {
        return Some(Kind::Map);
    }

    if descriptor.types.is_empty() {
        if !descriptor.fields.is_empty() || !descriptor.inherits_from.is_empty() {
            return Some(Kind::Object);
        }
        return None;
    }

    descriptor
        .types
        .iter()
        .find(|tag| **tag != TypeTag::Null)
        .and_then(TypeTag::kind)
}

/// Flatten own and inherited fields, ordered by name
///
/// Own fields are merged first; an inherited field never overrides a name
/// that is already present.
pub fn effective_fields<'a>(
    descriptor: &'a Descriptor,
    table: &'a DefinitionTable,
) -> Result<BTreeMap<&'a str, &'a Descriptor>> {
    let mut fields = BTreeMap::new();
    let mut ancestry = Vec::new();
    merge_fields(descriptor, table, &mut fields, &mut ancestry)?;
    Ok(fields)
}

fn merge_fields<'a>(
    descriptor: &'a Descriptor,
    table: &'a DefinitionTable,
    fields: &mut BTreeMap<&'a str, &'a Descriptor>,
    ancestry: &mut Vec<&'a str>,
) -> Result<()> {
    for (name, field) in &descriptor.fields {
        fields.entry(name.as_str()).or_insert(field);
    }

    for parent in &descriptor.inherits_from {
        match parent {
            DescriptorRef::Named(name) => {
                if ancestry.contains(&name.as_str()) {
                    return Err(MyceliumError::Schema(format!(
                        "cyclic inheritance through definition '{}'",
                        name
                    )));
                }
                let ancestor = lookup(name, table)?;
                ancestry.push(name.as_str());
                merge_fields(ancestor, table, fields, ancestry)?;
                ancestry.pop();
            }
            DescriptorRef::Inline(ancestor) => {
                merge_fields(ancestor, table, fields, ancestry)?;
            }
        }
    }

    Ok(())
}

/// The indirection a field carries, if any
///
/// The last polymorphic alternative takes precedence over a bare reference.
pub fn indirection(field: &Descriptor) -> Option<Indirection<'_>> {
    if let Some(last) = field.alternatives.last() {
        return Some(last.into());
    }
    field.reference.as_deref().map(Indirection::Named)
}

/// Resolve a polymorphic or referencing field to a concrete descriptor
///
/// Fields without alternatives or a reference are returned unchanged.
pub fn resolve_polymorphic<'a>(
    field: &'a Descriptor,
    table: &'a DefinitionTable,
) -> Result<&'a Descriptor> {
    let mut current = field;

    for _ in 0..MAX_REFERENCE_DEPTH {
        current = match indirection(current) {
            None => return Ok(current),
            Some(Indirection::Named(name)) => lookup(name, table)?,
            Some(Indirection::Inline(inner)) => inner,
        };
    }

    Err(MyceliumError::Schema(format!(
        "reference chain deeper than {} hops",
        MAX_REFERENCE_DEPTH
    )))
}

/// Find a named definition
pub fn lookup<'a>(name: &str, table: &'a DefinitionTable) -> Result<&'a Descriptor> {
    table
        .get(name)
        .ok_or_else(|| MyceliumError::Schema(format!("unknown definition '{}'", name)))
}
