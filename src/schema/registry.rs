//! Schema registry
//!
//! Maps event names to message ids (both directions) and to compiled
//! message schemas. Built once, then shared read-only.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{MyceliumError, Result};

use super::descriptor::{DefinitionTable, Descriptor};
use super::document::SchemaDocument;
use super::layout::Layout;

/// File holding the event name <-> id mapping inside a schema directory
pub const SCHEMA_MAP_FILENAME: &str = "schemaMap.json";

/// Key used to look up a message schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKey<'a> {
    Name(&'a str),
    Id(u16),
}

impl<'a> From<&'a str> for EventKey<'a> {
    fn from(name: &'a str) -> Self {
        EventKey::Name(name)
    }
}

impl From<u16> for EventKey<'_> {
    fn from(id: u16) -> Self {
        EventKey::Id(id)
    }
}

/// Everything the codec needs to know about one message type
#[derive(Debug, Clone)]
pub struct MessageSchema {
    event: String,
    id: u16,
    descriptor: Descriptor,
    definitions: DefinitionTable,
    layout: Layout,
}

impl MessageSchema {
    /// Compile a message schema
    pub fn new(
        event: impl Into<String>,
        id: u16,
        descriptor: Descriptor,
        definitions: DefinitionTable,
    ) -> Result<Self> {
        let event = event.into();
        let layout = Layout::compile(&descriptor, &definitions).map_err(|e| match e {
            MyceliumError::Schema(msg) => MyceliumError::Schema(format!("{}: {}", event, msg)),
            other => other,
        })?;

        Ok(Self {
            event,
            id,
            descriptor,
            definitions,
            layout,
        })
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn definitions(&self) -> &DefinitionTable {
        &self.definitions
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

/// Immutable registry of message schemas
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    event_to_id: HashMap<String, u16>,
    id_to_event: HashMap<u16, String>,
    schemas: HashMap<String, MessageSchema>,
}

/// `schemaMap.json` contents
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaMap {
    event_to_id: BTreeMap<String, u16>,
    #[serde(default)]
    id_to_event: BTreeMap<String, String>,
}

impl SchemaRegistry {
    /// Create a registry builder
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Load every schema in a directory
    ///
    /// Expects `schemaMap.json` plus one `<EventName>.json` per event.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let map_path = dir.join(SCHEMA_MAP_FILENAME);
        let schema_map = fs::read_to_string(&map_path).map_err(|e| {
            MyceliumError::Schema(format!("cannot read {}: {}", map_path.display(), e))
        })?;

        let mut documents = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension() != Some(OsStr::new("json")) {
                continue;
            }
            if path.file_name() == Some(OsStr::new(SCHEMA_MAP_FILENAME)) {
                continue;
            }
            let event = path
                .file_stem()
                .and_then(OsStr::to_str)
                .ok_or_else(|| {
                    MyceliumError::Schema(format!("invalid schema file name {}", path.display()))
                })?
                .to_string();
            documents.push((event, fs::read_to_string(&path)?));
        }

        let registry = Self::from_documents(&schema_map, documents)?;
        tracing::info!(
            "Loaded {} message schemas from {}",
            registry.len(),
            dir.display()
        );
        Ok(registry)
    }

    /// Build a registry from JSON texts
    ///
    /// `documents` yields `(event name, schema JSON)`. Documents without a
    /// message id are shared types and are skipped; every mapped event must
    /// have a document.
    pub fn from_documents<I>(schema_map: &str, documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let map: SchemaMap = serde_json::from_str(schema_map)?;

        for (id_text, event) in &map.id_to_event {
            let id: u16 = id_text.parse().map_err(|_| {
                MyceliumError::Schema(format!("idToEvent key '{}' is not a message id", id_text))
            })?;
            if map.event_to_id.get(event) != Some(&id) {
                return Err(MyceliumError::Schema(format!(
                    "idToEvent maps {} to {} but eventToId disagrees",
                    id, event
                )));
            }
        }

        let mut builder = Self::builder();
        for (event, text) in documents {
            let document = SchemaDocument::from_json(&text).map_err(|e| {
                MyceliumError::Schema(format!("{}: invalid schema document: {}", event, e))
            })?;
            match map.event_to_id.get(&event) {
                Some(&id) => {
                    builder = builder.register(
                        event,
                        id,
                        document.to_descriptor(),
                        document.definition_table(),
                    );
                }
                None => tracing::debug!("Schema {} has no message id, skipping", event),
            }
        }

        let registry = builder.build()?;

        for event in map.event_to_id.keys() {
            if !registry.schemas.contains_key(event) {
                return Err(MyceliumError::Schema(format!(
                    "event {} has a message id but no schema document",
                    event
                )));
            }
        }

        Ok(registry)
    }

    /// Schema for an event name or message id
    pub fn descriptor_for<'a>(&self, key: impl Into<EventKey<'a>>) -> Option<&MessageSchema> {
        match key.into() {
            EventKey::Name(name) => self.schemas.get(name),
            EventKey::Id(id) => self
                .id_to_event
                .get(&id)
                .and_then(|event| self.schemas.get(event)),
        }
    }

    pub fn id_for_event(&self, event: &str) -> Option<u16> {
        self.event_to_id.get(event).copied()
    }

    pub fn event_for_id(&self, id: u16) -> Option<&str> {
        self.id_to_event.get(&id).map(String::as_str)
    }

    /// Registered event names, sorted
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.event_to_id.keys().map(String::as_str).collect();
        events.sort_unstable();
        events
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Builder for SchemaRegistry
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<(String, u16, Descriptor, DefinitionTable)>,
}

impl RegistryBuilder {
    /// Register an event with its id, top-level descriptor and definitions
    pub fn register(
        mut self,
        event: impl Into<String>,
        id: u16,
        descriptor: Descriptor,
        definitions: DefinitionTable,
    ) -> Self {
        self.entries.push((event.into(), id, descriptor, definitions));
        self
    }

    /// Compile every schema and check that names and ids are one-to-one
    pub fn build(self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::default();

        for (event, id, descriptor, definitions) in self.entries {
            if registry.event_to_id.contains_key(&event) {
                return Err(MyceliumError::Schema(format!(
                    "event {} registered twice",
                    event
                )));
            }
            if let Some(existing) = registry.id_to_event.get(&id) {
                return Err(MyceliumError::Schema(format!(
                    "message id {} used by both {} and {}",
                    id, existing, event
                )));
            }

            let schema = MessageSchema::new(event.clone(), id, descriptor, definitions)?;
            registry.event_to_id.insert(event.clone(), id);
            registry.id_to_event.insert(id, event.clone());
            registry.schemas.insert(event, schema);
        }

        Ok(registry)
    }
}
