//! Data entities
//!
//! A [`DataEntity`] is one node of the metadata graph: an `@id`, the
//! [`EntityKind`] that governs it, and an ordered property mapping. The
//! engine only ever reads entities; clients mutate them between checks.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::{RecommendedPolicy, ValidateOptions};
use crate::def::{EntityDef, Requirement, TypeDescriptor};
use crate::error::{CrateError, EntityError, Phase, Violation, ViolationKind};
use crate::id::{classify_id, IdKind};
use crate::rocrate::RoCrate;
use crate::rules::{EntityKind, SchemaRegistry};
use crate::value::{EntityRef, PropValue};
use crate::vocab::{
    entity_context, parse_entity_context, DEFAULT_SCHEMA, ROOT_ENTITY_ID, ROOT_ENTITY_TYPE,
};

/// One typed node of the crate graph
///
/// Equality and hashing use the `@id` only.
#[derive(Clone)]
pub struct DataEntity {
    id: String,
    kind: Arc<EntityKind>,
    props: Vec<(String, PropValue)>,
}

impl DataEntity {
    /// Create an entity with an empty, independently-owned property mapping
    pub fn new(id: impl Into<String>, kind: Arc<EntityKind>) -> Self {
        Self {
            id: id.into(),
            kind,
            props: Vec::new(),
        }
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The `@type` tag
    pub fn entity_type(&self) -> &str {
        self.kind.entity_name()
    }

    pub fn schema_name(&self) -> &str {
        self.kind.schema_name()
    }

    pub fn kind(&self) -> &Arc<EntityKind> {
        &self.kind
    }

    pub fn definition(&self) -> &EntityDef {
        self.kind.definition()
    }

    /// Whether this entity has the given schema and type
    pub fn is(&self, schema_name: &str, entity_type: &str) -> bool {
        self.schema_name() == schema_name && self.entity_type() == entity_type
    }

    /// Typed reference to this entity
    pub fn to_ref(&self) -> EntityRef {
        EntityRef::typed(self.id.clone(), self.entity_type())
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.props.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    /// Set a property, returning the previous value
    ///
    /// A new property is appended; an existing one keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Option<PropValue> {
        let name = name.into();
        let value = value.into();
        match self.props.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.props.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        let pos = self.props.iter().position(|(k, _)| k == name)?;
        Some(self.props.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.props.iter().any(|(k, _)| k == name)
    }

    /// Properties in insertion order
    pub fn props(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.props.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Phase 1 with default options
    pub fn check_props(&self) -> Result<(), EntityError> {
        self.check_props_with(&ValidateOptions::default())
    }

    /// Phase 1: shape checks on this entity alone
    ///
    /// Runs the definition's structural checks (undeclared properties,
    /// missing required properties, declared types), then the kind's own
    /// rules, and fails only after all of them ran.
    pub fn check_props_with(&self, options: &ValidateOptions) -> Result<(), EntityError> {
        let mut error = EntityError::new(self, Phase::Shape);
        self.check_structure(options.recommended, &mut error);
        self.kind.rules().check_props(self, &mut error);
        error.into_result()
    }

    /// Phase 2: graph checks against `rocrate`
    ///
    /// Every reference must resolve to an entity in the crate, of a type the
    /// definition allows; the kind's own relationship rules follow.
    pub fn validate(&self, rocrate: &RoCrate) -> Result<(), EntityError> {
        let mut error = EntityError::new(self, Phase::Graph);
        self.check_references(rocrate, &mut error);
        self.kind.rules().validate(self, rocrate, &mut error);
        error.into_result()
    }

    /// Recommended properties this entity lacks, as advisory notes
    pub fn advisories(&self) -> Vec<Violation> {
        let mut notes = EntityError::new(self, Phase::Shape);
        for name in self.definition().names_with(Requirement::Recommended) {
            if !self.contains(name) {
                notes.add_kind(
                    ViolationKind::Advisory,
                    name,
                    "Missing recommended property.",
                );
            }
        }
        notes.violations().to_vec()
    }

    fn check_structure(&self, recommended: RecommendedPolicy, error: &mut EntityError) {
        let def = self.definition();

        if classify_id(&self.id) == IdKind::Malformed {
            error.add("@id", format!("The id {:?} is not a usable identifier.", self.id));
        }

        for (name, _) in &self.props {
            if !def.contains(name) {
                error.add(
                    name,
                    format!(
                        "Unexpected property: not defined for {} in schema {}.",
                        def.name,
                        self.schema_name()
                    ),
                );
            }
        }

        for prop in def.props() {
            if self.contains(&prop.name) {
                continue;
            }
            match (prop.requirement, recommended) {
                (Requirement::Required, _) => {
                    error.add(&prop.name, "Missing required property.");
                }
                (Requirement::Recommended, RecommendedPolicy::Error) => {
                    error.add(&prop.name, "Missing recommended property.");
                }
                (Requirement::Recommended, RecommendedPolicy::Warn) => {
                    warn!(
                        entity = %self.id,
                        entity_type = %def.name,
                        property = %prop.name,
                        "missing recommended property"
                    );
                }
                _ => {}
            }
        }

        for (name, value) in &self.props {
            if let Some(prop) = def.get(name) {
                if let Err(reason) = type_check(value, &prop.expected_type) {
                    error.add(name, format!("Type error: {}", reason));
                }
            }
        }
    }

    fn check_references(&self, rocrate: &RoCrate, error: &mut EntityError) {
        for (name, value) in &self.props {
            let allowed = self
                .definition()
                .get(name)
                .and_then(|p| reference_targets(&p.expected_type));
            for r in value.refs() {
                match rocrate.get(&r.id) {
                    None => error.add_reference(
                        name,
                        format!("The entity {:?} is not included in the crate.", r.id),
                    ),
                    Some(target) => {
                        if let Some(names) = &allowed {
                            if !names.contains(&target.entity_type()) {
                                error.add(
                                    name,
                                    format!(
                                        "The entity {:?} is a {}, expected {}.",
                                        r.id,
                                        target.entity_type(),
                                        names.join(" or ")
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    /// JSON-LD form: `@context`, `@id`, `@type`, then properties in order
    pub fn as_jsonld(&self) -> Map<String, Value> {
        let mut obj = Map::new();
        obj.insert(
            "@context".to_string(),
            Value::String(entity_context(self.schema_name(), self.entity_type())),
        );
        obj.insert("@id".to_string(), Value::String(self.id.clone()));
        obj.insert("@type".to_string(), Value::String(self.entity_type().to_string()));
        for (name, value) in &self.props {
            obj.insert(name.clone(), value.to_json());
        }
        obj
    }

    /// Read an entity back from its JSON-LD form
    ///
    /// The schema comes from the entity's `@context` (falling back to the
    /// base schema); `@type` may be a string or an array whose first
    /// registered name is used. References come back untyped.
    pub fn from_jsonld(value: &Value, registry: &SchemaRegistry) -> Result<Self, CrateError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CrateError::InvalidStructure(format!("entity is not an object: {}", value)))?;
        let id = obj
            .get("@id")
            .and_then(Value::as_str)
            .ok_or_else(|| CrateError::InvalidStructure(format!("entity without @id: {}", value)))?;

        let schema_name = context_schema(obj);

        let types: Vec<&str> = match obj.get("@type") {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(arr)) => arr.iter().filter_map(Value::as_str).collect(),
            _ => vec![],
        };
        let kind = match types.iter().find_map(|t| registry.get(&schema_name, t)) {
            Some(kind) => kind,
            None => registry.kind(&schema_name, types.first().copied().unwrap_or_default())?,
        };
        Self::from_jsonld_as(id, obj, kind)
    }

    /// Read the crate root; it is always a `RootDataEntity`
    ///
    /// The schema's own root type is used when it defines one, the base
    /// schema's otherwise.
    pub fn root_from_jsonld(value: &Value, registry: &SchemaRegistry) -> Result<Self, CrateError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CrateError::InvalidStructure(format!("entity is not an object: {}", value)))?;
        let schema_name = context_schema(obj);
        let kind = match registry.get(&schema_name, ROOT_ENTITY_TYPE) {
            Some(kind) => kind,
            None => registry.kind(DEFAULT_SCHEMA, ROOT_ENTITY_TYPE)?,
        };
        Self::from_jsonld_as(ROOT_ENTITY_ID, obj, kind)
    }

    fn from_jsonld_as(
        id: &str,
        obj: &Map<String, Value>,
        kind: Arc<EntityKind>,
    ) -> Result<Self, CrateError> {
        let mut entity = DataEntity::new(id, kind);
        for (key, v) in obj {
            if matches!(key.as_str(), "@id" | "@type" | "@context") {
                continue;
            }
            entity.set(key.clone(), PropValue::from_json(v)?);
        }
        Ok(entity)
    }

    /// Fill in the type tag of untyped references from `lookup`
    pub(crate) fn resolve_ref_types(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        fn resolve(value: &mut PropValue, lookup: &dyn Fn(&str) -> Option<String>) {
            match value {
                PropValue::Ref(r) if r.entity_type.is_none() => r.entity_type = lookup(&r.id),
                PropValue::List(items) => items.iter_mut().for_each(|v| resolve(v, lookup)),
                _ => {}
            }
        }
        for (_, value) in &mut self.props {
            resolve(value, lookup);
        }
    }
}

/// Schema named by an entity's `@context`, or the default schema
fn context_schema(obj: &Map<String, Value>) -> String {
    obj.get("@context")
        .and_then(Value::as_str)
        .and_then(parse_entity_context)
        .map(|(schema, _)| schema)
        .unwrap_or_else(|| DEFAULT_SCHEMA.to_string())
}

/// Check a value against a declared type
fn type_check(value: &PropValue, expected: &TypeDescriptor) -> Result<(), String> {
    let ok = match (expected, value) {
        (TypeDescriptor::Any, _) => true,
        (TypeDescriptor::Str, PropValue::Str(_)) => true,
        (TypeDescriptor::Int, PropValue::Int(_)) => true,
        (TypeDescriptor::Float, PropValue::Float(f)) => f.is_finite(),
        (TypeDescriptor::Float, PropValue::Int(_)) => true,
        (TypeDescriptor::Bool, PropValue::Bool(_)) => true,
        // target type is checked against the crate in `validate`
        (TypeDescriptor::Entity(_), PropValue::Ref(_)) => true,
        (TypeDescriptor::List(inner), PropValue::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                type_check(item, inner).map_err(|e| format!("item {}: {}", i, e))?;
            }
            true
        }
        (TypeDescriptor::Union(alts), _) => alts.iter().any(|t| type_check(value, t).is_ok()),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("expected {}, got {}", expected, value.type_name()))
    }
}

/// Entity names a reference-valued property may point at, if it is one
fn reference_targets(expected: &TypeDescriptor) -> Option<Vec<&str>> {
    let names = expected.entity_names();
    (!names.is_empty()).then_some(names)
}

impl PartialEq for DataEntity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DataEntity {}

impl Hash for DataEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for DataEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataEntity")
            .field("id", &self.id)
            .field("schema_name", &self.schema_name())
            .field("entity_type", &self.entity_type())
            .field("props", &self.props)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::registry;
    use crate::schema::base;
    use serde_json::json;

    #[test]
    fn test_property_lifecycle() {
        let mut person = base::person("https://orcid.org/0000-0001-2345-6789");
        assert!(person.is_empty());
        assert_eq!(person.set("name", "Alice"), None);
        assert_eq!(person.set("email", "alice@example.com"), None);
        assert_eq!(person.set("name", "Alice Smith"), Some(PropValue::from("Alice")));
        assert_eq!(person.keys().collect::<Vec<_>>(), vec!["name", "email"]);
        assert!(person.contains("email"));
        assert_eq!(person.remove("email"), Some(PropValue::from("alice@example.com")));
        assert!(!person.contains("email"));
        assert_eq!(person.get_str("name"), Some("Alice Smith"));
    }

    #[test]
    fn test_fresh_props_per_instance() {
        let mut a = base::person("https://example.com/a");
        let b = base::person("https://example.com/b");
        a.set("name", "A");
        assert!(b.is_empty());
    }

    #[test]
    fn test_identity_by_id() {
        let a = base::person("https://example.com/a").with("name", "A");
        let b = base::person("https://example.com/a").with("name", "B");
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_check_props_reports_every_defect() {
        let person = base::person("https://example.com/p")
            .with("unknown_property", "x")
            .with("email", "not-an-email")
            .with("alias", 3);
        let err = person.check_props().unwrap_err();
        let props: Vec<&str> = err.violations().iter().map(|v| v.property.as_str()).collect();
        assert!(props.contains(&"unknown_property"));
        assert!(props.contains(&"name"));
        assert!(props.contains(&"email"));
        assert!(props.contains(&"alias"));
        assert!(err.violations().iter().all(|v| v.kind == ViolationKind::Shape));
    }

    #[test]
    fn test_check_props_idempotent() {
        let person = base::person("https://example.com/p").with("unknown", 1);
        let first = person.check_props().unwrap_err();
        let second = person.check_props().unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_revalidate_after_fix() {
        let mut person = base::person("https://example.com/p");
        assert!(person.check_props().is_err());
        person.set("name", "Alice");
        assert!(person.check_props().is_ok());
    }

    #[test]
    fn test_list_element_type() {
        let mut root = base::root_data_entity().with("name", "Root");
        root.set("funder", vec![PropValue::from("not an entity")]);
        let err = root.check_props().unwrap_err();
        let violation = err.for_property("funder").next().unwrap();
        assert!(violation.message.contains("item 0"));
    }

    #[test]
    fn test_reference_target_checked_against_crate() {
        let license = base::license("https://www.apache.org/licenses/LICENSE-2.0").with("name", "Apache");
        let mut rocrate = RoCrate::new();
        rocrate.root_mut().set("name", "Root");
        rocrate.root_mut().set("funder", vec![&license]);
        rocrate.add(license).unwrap();

        assert!(rocrate.root().check_props().is_ok());
        let err = rocrate.root().validate(&rocrate).unwrap_err();
        let violation = err.for_property("funder").next().unwrap();
        assert_eq!(violation.kind, ViolationKind::Relationship);
        assert!(violation.message.contains("License"));
    }

    #[test]
    fn test_reference_in_mixed_union() {
        let yaml = "Note:\n  props:\n    author:\n      expected_type: Union[str, Person]\n      required: required\n";
        let mut notes = SchemaRegistry::new();
        notes
            .register_schema(crate::def::parse_schema("notes", yaml).unwrap(), Default::default())
            .unwrap();

        let license = base::license("https://example.com/license").with("name", "L");
        let person = base::person("https://example.com/p").with("name", "Alice");
        let note = notes.create("notes", "Note", "#note").unwrap().with("author", &license);
        let mut rocrate = RoCrate::new();
        rocrate.add_all(vec![license, person.clone()]).unwrap();

        assert!(note.check_props().is_ok());
        let err = note.validate(&rocrate).unwrap_err();
        assert!(err.violations()[0].message.contains("expected Person"));

        assert!(note.clone().with("author", &person).validate(&rocrate).is_ok());
        assert!(note.with("author", "Alice").validate(&rocrate).is_ok());
    }

    #[test]
    fn test_recommended_policy() {
        let person = base::person("https://example.com/p").with("name", "Alice");
        let strict = ValidateOptions {
            recommended: RecommendedPolicy::Error,
            ..Default::default()
        };
        let lenient = ValidateOptions {
            recommended: RecommendedPolicy::Ignore,
            ..Default::default()
        };
        assert!(person.check_props().is_ok());
        assert!(person.check_props_with(&lenient).is_ok());
        let err = person.check_props_with(&strict).unwrap_err();
        assert!(err.for_property("affiliation").next().is_some());

        let notes = person.advisories();
        assert!(notes.iter().any(|n| n.property == "affiliation"));
        assert!(notes.iter().all(|n| n.kind == ViolationKind::Advisory));
    }

    #[test]
    fn test_dangling_reference() {
        let mut rocrate = RoCrate::new();
        let org = base::organization("https://ror.org/04ksd4g47").with("name", "NII");
        rocrate.root_mut().set("funder", vec![&org]);

        let err = rocrate.root().validate(&rocrate).unwrap_err();
        assert_eq!(err.violations()[0].kind, ViolationKind::Reference);

        rocrate.add(org).unwrap();
        assert!(rocrate.root().validate(&rocrate).is_ok());
    }

    #[test]
    fn test_untyped_reference_checked_after_resolution() {
        let mut rocrate = RoCrate::new();
        rocrate
            .add(base::license("https://example.com/license").with("name", "L"))
            .unwrap();
        rocrate
            .root_mut()
            .set("funder", vec![EntityRef::new("https://example.com/license")]);
        let err = rocrate.root().validate(&rocrate).unwrap_err();
        assert_eq!(err.violations()[0].kind, ViolationKind::Relationship);
        assert!(err.violations()[0].message.contains("License"));
    }

    #[test]
    fn test_as_jsonld() {
        let person = base::person("https://orcid.org/0000-0001-2345-6789").with("name", "Alice");
        let dmp_ref = EntityRef::new("#dmp:1");
        let file = base::file("./data.csv")
            .with("name", "data")
            .with("contentSize", "1GB")
            .with("author", vec![&person])
            .with("about", dmp_ref);
        let jsonld = Value::Object(file.as_jsonld());
        assert_eq!(jsonld["@id"], "./data.csv");
        assert_eq!(jsonld["@type"], "File");
        assert_eq!(jsonld["author"], json!([{"@id": "https://orcid.org/0000-0001-2345-6789"}]));
        assert_eq!(jsonld["about"], json!({"@id": "#dmp:1"}));
        let obj = file.as_jsonld();
        let keys: Vec<&str> = obj.keys().map(String::as_str).take(3).collect();
        assert_eq!(keys, vec!["@context", "@id", "@type"]);
    }

    #[test]
    fn test_jsonld_round_trip_keeps_check_outcome() {
        let person = base::person("https://example.com/p")
            .with("name", "Alice")
            .with("email", "broken")
            .with("extra", true);
        let back = DataEntity::from_jsonld(&Value::Object(person.as_jsonld()), registry()).unwrap();
        assert_eq!(back.schema_name(), "base");
        assert_eq!(back.entity_type(), "Person");
        assert_eq!(back.keys().collect::<Vec<_>>(), person.keys().collect::<Vec<_>>());
        assert_eq!(back.check_props(), person.check_props());
    }

    #[test]
    fn test_jsonld_round_trip_with_wrong_reference() {
        let license = base::license("https://www.apache.org/licenses/LICENSE-2.0");
        let root = base::root_data_entity()
            .with("name", "Root")
            .with("funder", vec![&license]);
        let back = DataEntity::from_jsonld(&Value::Object(root.as_jsonld()), registry()).unwrap();
        assert_eq!(back.check_props(), root.check_props());

        let mut rocrate = RoCrate::new();
        rocrate.add(license.with("name", "Apache")).unwrap();
        let before = root.validate(&rocrate).unwrap_err();
        let after = back.validate(&rocrate).unwrap_err();
        assert_eq!(before.violations(), after.violations());
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let value = PropValue::from(f64::NAN);
        assert!(type_check(&value, &TypeDescriptor::Float).is_err());
        let back = PropValue::from_json(&value.to_json()).unwrap();
        assert!(type_check(&back, &TypeDescriptor::Float).is_err());
        assert!(type_check(&PropValue::from(1.5), &TypeDescriptor::Float).is_ok());
    }

    #[test]
    fn test_from_jsonld_unknown_type() {
        let value = json!({"@id": "#x", "@type": "Spaceship"});
        assert!(matches!(
            DataEntity::from_jsonld(&value, registry()),
            Err(CrateError::UnknownEntityType { .. })
        ));
    }

    #[test]
    fn test_from_jsonld_type_array() {
        let value = json!({"@id": "https://example.com/p", "@type": ["Thing", "Person"], "name": "A"});
        let entity = DataEntity::from_jsonld(&value, registry()).unwrap();
        assert_eq!(entity.entity_type(), "Person");
    }
}
