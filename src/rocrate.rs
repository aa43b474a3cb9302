//! The crate: graph container for all entities of one validation unit
//!
//! Owns every entity, keyed by unique `@id` and kept in insertion order,
//! with the root entity (`./`) always present at the front.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::debug;

use crate::config::{RecommendedPolicy, ValidateOptions};
use crate::entity::DataEntity;
use crate::error::{CrateError, ValidationReport};
use crate::id::{classify_id, IdKind};
use crate::rules::SchemaRegistry;
use crate::schema::base;
use crate::vocab::{metadata_descriptor, ROCRATE_CONTEXT, ROOT_ENTITY_ID};

/// Graph container with a mandatory root entity
#[derive(Debug, Clone)]
pub struct RoCrate {
    entities: Vec<DataEntity>,
    index: HashMap<String, usize>,
    options: ValidateOptions,
}

impl Default for RoCrate {
    fn default() -> Self {
        Self::new()
    }
}

impl RoCrate {
    /// An empty crate holding only a base `RootDataEntity`
    pub fn new() -> Self {
        Self::with_root(base::root_data_entity())
    }

    /// A crate around a given root entity (its id is forced to `./`)
    pub fn with_root(root: DataEntity) -> Self {
        let root = if root.id() == ROOT_ENTITY_ID {
            root
        } else {
            let mut fixed = DataEntity::new(ROOT_ENTITY_ID, root.kind().clone());
            for (name, value) in root.props() {
                fixed.set(name, value.clone());
            }
            fixed
        };
        let mut index = HashMap::new();
        index.insert(ROOT_ENTITY_ID.to_string(), 0);
        Self {
            entities: vec![root],
            index,
            options: ValidateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ValidateOptions) {
        self.options = options;
    }

    pub fn root(&self) -> &DataEntity {
        &self.entities[0]
    }

    pub fn root_mut(&mut self) -> &mut DataEntity {
        &mut self.entities[0]
    }

    /// Register one entity; a colliding id is a `DuplicateId` error
    pub fn add(&mut self, entity: DataEntity) -> Result<(), CrateError> {
        if self.index.contains_key(entity.id()) {
            return Err(CrateError::DuplicateId(entity.id().to_string()));
        }
        self.index.insert(entity.id().to_string(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Register several entities, all or none
    pub fn add_all(&mut self, entities: impl IntoIterator<Item = DataEntity>) -> Result<(), CrateError> {
        let entities: Vec<DataEntity> = entities.into_iter().collect();
        let mut seen = std::collections::HashSet::new();
        for entity in &entities {
            if self.index.contains_key(entity.id()) || !seen.insert(entity.id()) {
                return Err(CrateError::DuplicateId(entity.id().to_string()));
            }
        }
        for entity in entities {
            self.add(entity)?;
        }
        Ok(())
    }

    /// Remove and return an entity; the root cannot be removed
    pub fn remove(&mut self, id: &str) -> Result<DataEntity, CrateError> {
        if id == ROOT_ENTITY_ID {
            return Err(CrateError::RootEntityRemoval);
        }
        let pos = self
            .index
            .remove(id)
            .ok_or_else(|| CrateError::EntityNotFound(id.to_string()))?;
        let entity = self.entities.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(entity)
    }

    pub fn get(&self, id: &str) -> Option<&DataEntity> {
        self.index.get(id).map(|&i| &self.entities[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DataEntity> {
        self.index.get(id).map(|&i| &mut self.entities[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Never true: the root is always present
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in insertion order, root first
    pub fn entities(&self) -> impl Iterator<Item = &DataEntity> {
        self.entities.iter()
    }

    /// Entities with the given `@type`, from any schema
    pub fn entities_of_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a DataEntity> {
        self.entities.iter().filter(move |e| e.entity_type() == entity_type)
    }

    /// Entities with the given schema and `@type`
    pub fn entities_of<'a>(
        &'a self,
        schema_name: &'a str,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a DataEntity> {
        self.entities.iter().filter(move |e| e.is(schema_name, entity_type))
    }

    /// Entities holding a reference to `id` in `property`
    pub fn referrers<'a>(&'a self, property: &'a str, id: &'a str) -> impl Iterator<Item = &'a DataEntity> {
        self.entities
            .iter()
            .filter(move |e| e.get(property).is_some_and(|v| v.references(id)))
    }

    /// Run phase 1 then phase 2 over every entity and collect the outcome
    ///
    /// Nothing stops at the first failing entity: every failing
    /// (entity, phase) pair contributes one aggregate to the report.
    /// Returns `Err(ValidationFailed)` only if some entity failed.
    pub fn validate_all(&self) -> Result<ValidationReport, CrateError> {
        let mut report = ValidationReport::default();

        for entity in &self.entities {
            debug!(entity = %entity.id(), entity_type = %entity.entity_type(), "checking properties");
            if let Err(e) = entity.check_props_with(&self.options) {
                report.errors.push(e);
            }
            if self.options.recommended == RecommendedPolicy::Warn {
                report.advisories.extend(entity.advisories());
            }
        }

        for entity in &self.entities {
            debug!(entity = %entity.id(), entity_type = %entity.entity_type(), "validating against crate");
            if let Err(e) = entity.validate(self) {
                report.errors.push(e);
            }
        }

        debug!(
            entities = self.entities.len(),
            violations = report.violation_count(),
            "validation finished"
        );

        if report.is_valid() {
            Ok(report)
        } else {
            Err(CrateError::ValidationFailed(report))
        }
    }

    /// JSON-LD document: crate context plus `@graph` of descriptor and entities
    pub fn as_jsonld(&self) -> Value {
        let mut graph = vec![metadata_descriptor()];
        graph.extend(self.entities.iter().map(|e| Value::Object(e.as_jsonld())));
        json!({
            "@context": ROCRATE_CONTEXT,
            "@graph": graph,
        })
    }

    /// Build a crate from a JSON-LD document
    ///
    /// The metadata descriptor must be present and is dropped; `./` becomes
    /// the root whatever its `@type` (RO-Crate files declare it `Dataset`). Untyped references get the type of the entity they point
    /// at when it is in the graph.
    pub fn from_jsonld(document: &Value, registry: &SchemaRegistry) -> Result<Self, CrateError> {
        let graph = document
            .get("@graph")
            .and_then(Value::as_array)
            .ok_or_else(|| CrateError::InvalidStructure("missing @graph array".to_string()))?;

        let mut root = None;
        let mut others = Vec::new();
        let mut has_descriptor = false;

        for node in graph {
            let id = node.get("@id").and_then(Value::as_str).unwrap_or_default();
            match classify_id(id) {
                IdKind::MetadataDescriptor => has_descriptor = true,
                IdKind::Root => {
                    if root.is_some() {
                        return Err(CrateError::DuplicateId(ROOT_ENTITY_ID.to_string()));
                    }
                    root = Some(DataEntity::root_from_jsonld(node, registry)?);
                }
                _ => others.push(DataEntity::from_jsonld(node, registry)?),
            }
        }

        if !has_descriptor {
            return Err(CrateError::MissingMetadataDescriptor);
        }
        let root = root.ok_or(CrateError::MissingRootEntity)?;

        let types: HashMap<String, String> = std::iter::once(&root)
            .chain(others.iter())
            .map(|e| (e.id().to_string(), e.entity_type().to_string()))
            .collect();
        let lookup = |id: &str| types.get(id).cloned();

        let mut rocrate = RoCrate::with_root(root);
        rocrate.root_mut().resolve_ref_types(&lookup);
        for mut entity in others {
            entity.resolve_ref_types(&lookup);
            rocrate.add(entity)?;
        }
        debug!(entities = rocrate.len(), "crate loaded from JSON-LD");
        Ok(rocrate)
    }
}
