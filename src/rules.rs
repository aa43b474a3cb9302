//! Validation protocol
//!
//! Every entity type is an [`EntityKind`]: its [`EntityDef`] plus a set of
//! [`EntityRules`]. The structural checks implied by the definition always
//! run first (see [`DataEntity::check_props`]); rules then layer their own
//! shape checks (phase 1) and graph checks (phase 2) onto the same
//! aggregate. A rule set that extends another calls it explicitly, e.g. a
//! schema-specific `Person` calling the base `Person` rules before adding
//! its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::def::{EntityDef, SchemaDefinition};
use crate::entity::DataEntity;
use crate::error::{CrateError, EntityError};
use crate::rocrate::RoCrate;
use crate::schema;

/// Schema-specific checks for one entity type
///
/// Both hooks only append to `error`; the caller decides whether to raise.
/// Implementations must not mutate the entity or the crate.
pub trait EntityRules: Send + Sync {
    /// Phase 1: checks on the entity alone
    fn check_props(&self, _entity: &DataEntity, _error: &mut EntityError) {}

    /// Phase 2: checks that look at other entities in the crate
    fn validate(&self, _entity: &DataEntity, _rocrate: &RoCrate, _error: &mut EntityError) {}
}

/// Rules for entity types that only need their definition enforced
pub struct DefinitionOnly;

impl EntityRules for DefinitionOnly {}

/// An entity type: schema name, definition and rules
pub struct EntityKind {
    schema_name: String,
    def: EntityDef,
    rules: Box<dyn EntityRules>,
}

impl EntityKind {
    pub fn new(schema_name: impl Into<String>, def: EntityDef, rules: Box<dyn EntityRules>) -> Self {
        Self {
            schema_name: schema_name.into(),
            def,
            rules,
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn entity_name(&self) -> &str {
        &self.def.name
    }

    pub fn definition(&self) -> &EntityDef {
        &self.def
    }

    pub fn rules(&self) -> &dyn EntityRules {
        self.rules.as_ref()
    }
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityKind")
            .field("schema_name", &self.schema_name)
            .field("entity_name", &self.def.name)
            .finish()
    }
}

/// Lookup of entity kinds by `(schema, entity)` name
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    kinds: HashMap<(String, String), Arc<EntityKind>>,
    schemas: Vec<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in schemas
    pub fn builtin() -> Result<Self, CrateError> {
        let mut registry = Self::new();
        for (definition, rules) in schema::builtin_schemas()? {
            registry.register_schema(definition, rules)?;
        }
        Ok(registry)
    }

    /// Register every entity of a schema
    ///
    /// `rules` supplies rule sets by entity name; entities without one get
    /// [`DefinitionOnly`]. Naming an entity the definition lacks is an error.
    pub fn register_schema(
        &mut self,
        definition: SchemaDefinition,
        mut rules: HashMap<String, Box<dyn EntityRules>>,
    ) -> Result<(), CrateError> {
        if let Some(orphan) = rules.keys().find(|name| definition.get(name).is_none()) {
            return Err(CrateError::SchemaDefinition {
                schema: definition.name.clone(),
                reason: format!("rules given for undefined entity '{}'", orphan),
            });
        }

        let schema_name = definition.name;
        for def in definition.entities {
            let entity_rules = rules
                .remove(&def.name)
                .unwrap_or_else(|| Box::new(DefinitionOnly));
            let key = (schema_name.clone(), def.name.clone());
            let kind = EntityKind::new(schema_name.clone(), def, entity_rules);
            self.kinds.insert(key, Arc::new(kind));
        }
        if !self.schemas.contains(&schema_name) {
            self.schemas.push(schema_name);
        }
        Ok(())
    }

    pub fn get(&self, schema_name: &str, entity_name: &str) -> Option<Arc<EntityKind>> {
        self.kinds
            .get(&(schema_name.to_string(), entity_name.to_string()))
            .cloned()
    }

    /// Like [`get`](Self::get) but failing with `UnknownEntityType`
    pub fn kind(&self, schema_name: &str, entity_name: &str) -> Result<Arc<EntityKind>, CrateError> {
        self.get(schema_name, entity_name)
            .ok_or_else(|| CrateError::UnknownEntityType {
                schema: schema_name.to_string(),
                entity: entity_name.to_string(),
            })
    }

    /// Create an empty entity of a registered type
    pub fn create(
        &self,
        schema_name: &str,
        entity_name: &str,
        id: impl Into<String>,
    ) -> Result<DataEntity, CrateError> {
        Ok(DataEntity::new(id, self.kind(schema_name, entity_name)?))
    }

    /// Schema names in registration order
    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    /// Kinds of one schema, sorted by entity name
    pub fn kinds_of(&self, schema_name: &str) -> Vec<Arc<EntityKind>> {
        let mut kinds: Vec<Arc<EntityKind>> = self
            .kinds
            .iter()
            .filter(|((schema, _), _)| schema == schema_name)
            .map(|(_, kind)| Arc::clone(kind))
            .collect();
        kinds.sort_by(|a, b| a.entity_name().cmp(b.entity_name()));
        kinds
    }
}

static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(|| {
    SchemaRegistry::builtin().expect("built-in schema definitions are valid")
});

/// The process-wide registry of built-in schemas
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

/// Kind of a built-in entity type
///
/// # Panics
/// If the built-in schemas do not define the type; the schema modules only
/// call this with names present in their embedded definitions.
pub(crate) fn builtin_kind(schema_name: &str, entity_name: &str) -> Arc<EntityKind> {
    registry()
        .get(schema_name, entity_name)
        .unwrap_or_else(|| panic!("built-in entity type {}:{} is not defined", schema_name, entity_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::parse_schema;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = registry();
        for schema in ["base", "cao", "amed", "myschema"] {
            assert!(registry.schemas().iter().any(|s| s == schema), "{}", schema);
        }
        assert!(registry.get("base", "Person").is_some());
        assert!(registry.get("cao", "DMP").is_some());
        assert!(registry.get("nope", "Person").is_none());
    }

    #[test]
    fn test_unknown_kind() {
        let err = registry().create("base", "Spaceship", "#x").unwrap_err();
        assert!(matches!(err, CrateError::UnknownEntityType { .. }));
    }

    #[test]
    fn test_register_client_schema() {
        let definition = parse_schema(
            "lab",
            "Sample:\n  props:\n    name:\n      expected_type: str\n      required: required\n",
        )
        .unwrap();
        let mut registry = SchemaRegistry::new();
        registry.register_schema(definition, HashMap::new()).unwrap();

        let mut sample = registry.create("lab", "Sample", "#s1").unwrap();
        assert!(sample.check_props().is_err());
        sample.set("name", "first sample");
        assert!(sample.check_props().is_ok());
    }

    #[test]
    fn test_rules_for_undefined_entity_rejected() {
        let definition = parse_schema("lab", "Sample:\n  props: {}\n").unwrap();
        let mut rules: HashMap<String, Box<dyn EntityRules>> = HashMap::new();
        rules.insert("Missing".to_string(), Box::new(DefinitionOnly));
        let err = SchemaRegistry::new().register_schema(definition, rules).unwrap_err();
        assert!(matches!(err, CrateError::SchemaDefinition { .. }));
    }

    #[test]
    fn test_kinds_of() {
        let names: Vec<String> = registry()
            .kinds_of("cao")
            .iter()
            .map(|k| k.entity_name().to_string())
            .collect();
        assert_eq!(names, vec!["DMP", "DMPMetadata", "File", "Person"]);
    }
}
