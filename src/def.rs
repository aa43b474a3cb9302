//! Entity definitions
//!
//! An [`EntityDef`] lists the properties one entity type may carry, the
//! type each expects and whether it is required, recommended or optional.
//! Definitions are read from YAML schema files:
//!
//! ```yaml
//! Person:
//!   description: A person.
//!   props:
//!     name:
//!       expected_type: str
//!       required: required
//!       description: Full name.
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::CrateError;

/// Requirement level of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Recommended,
    Optional,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Required => write!(f, "required"),
            Requirement::Recommended => write!(f, "recommended"),
            Requirement::Optional => write!(f, "optional"),
        }
    }
}

/// Declared type of a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Str,
    Int,
    /// Accepts integers as well
    Float,
    Bool,
    Any,
    /// Reference to an entity whose `@type` is one of these names
    Entity(Vec<String>),
    List(Box<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Parse a type expression: `str`, `int`, `float`, `bool`, `Any`,
    /// an entity name, `List[T]` or `Union[A, B, ...]`
    pub fn parse(expr: &str) -> Result<Self, String> {
        let expr = expr.trim();
        match expr {
            "str" => return Ok(TypeDescriptor::Str),
            "int" => return Ok(TypeDescriptor::Int),
            "float" => return Ok(TypeDescriptor::Float),
            "bool" => return Ok(TypeDescriptor::Bool),
            "Any" => return Ok(TypeDescriptor::Any),
            _ => {}
        }

        if let Some(inner) = generic_args(expr, "List") {
            let args = split_args(inner)?;
            if args.len() != 1 {
                return Err(format!("List takes exactly one type argument: {}", expr));
            }
            return Ok(TypeDescriptor::List(Box::new(TypeDescriptor::parse(args[0])?)));
        }

        if let Some(inner) = generic_args(expr, "Union") {
            let alts = split_args(inner)?
                .into_iter()
                .map(TypeDescriptor::parse)
                .collect::<Result<Vec<_>, _>>()?;
            if alts.len() < 2 {
                return Err(format!("Union needs at least two alternatives: {}", expr));
            }
            // Union of entity names collapses into one reference type
            if alts.iter().all(|t| matches!(t, TypeDescriptor::Entity(_))) {
                let names = alts
                    .into_iter()
                    .flat_map(|t| match t {
                        TypeDescriptor::Entity(names) => names,
                        _ => vec![],
                    })
                    .collect();
                return Ok(TypeDescriptor::Entity(names));
            }
            return Ok(TypeDescriptor::Union(alts));
        }

        let is_entity_name = expr.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_entity_name {
            Ok(TypeDescriptor::Entity(vec![expr.to_string()]))
        } else {
            Err(format!("unknown type expression '{}'", expr))
        }
    }

    /// Entity names this descriptor may reference, at any depth
    pub fn entity_names(&self) -> Vec<&str> {
        match self {
            TypeDescriptor::Entity(names) => names.iter().map(String::as_str).collect(),
            TypeDescriptor::List(inner) => inner.entity_names(),
            TypeDescriptor::Union(alts) => alts.iter().flat_map(|t| t.entity_names()).collect(),
            _ => vec![],
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Str => write!(f, "str"),
            TypeDescriptor::Int => write!(f, "int"),
            TypeDescriptor::Float => write!(f, "float"),
            TypeDescriptor::Bool => write!(f, "bool"),
            TypeDescriptor::Any => write!(f, "Any"),
            TypeDescriptor::Entity(names) if names.len() == 1 => write!(f, "{}", names[0]),
            TypeDescriptor::Entity(names) => write!(f, "Union[{}]", names.join(", ")),
            TypeDescriptor::List(inner) => write!(f, "List[{}]", inner),
            TypeDescriptor::Union(alts) => {
                let parts: Vec<String> = alts.iter().map(ToString::to_string).collect();
                write!(f, "Union[{}]", parts.join(", "))
            }
        }
    }
}

/// `Name[...]` -> contents between the brackets
fn generic_args<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    expr.strip_prefix(name)?
        .trim_start()
        .strip_prefix('[')?
        .strip_suffix(']')
}

/// Split on top-level commas, respecting nested brackets
fn split_args(inner: &str) -> Result<Vec<&str>, String> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced brackets in '{}'", inner))?;
            }
            ',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(format!("unbalanced brackets in '{}'", inner));
    }
    args.push(inner[start..].trim());
    if args.iter().any(|a| a.is_empty()) {
        return Err(format!("empty type argument in '{}'", inner));
    }
    Ok(args)
}

/// One declared property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropDef {
    pub name: String,
    pub expected_type: TypeDescriptor,
    pub requirement: Requirement,
    pub description: Option<String>,
}

/// Allowed property set of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    pub name: String,
    pub description: Option<String>,
    props: Vec<PropDef>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, description: Option<String>, props: Vec<PropDef>) -> Self {
        Self {
            name: name.into(),
            description,
            props,
        }
    }

    /// Declared properties, in definition order
    pub fn props(&self) -> &[PropDef] {
        &self.props
    }

    pub fn get(&self, name: &str) -> Option<&PropDef> {
        self.props.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of properties at a given requirement level
    pub fn names_with(&self, requirement: Requirement) -> impl Iterator<Item = &str> {
        self.props
            .iter()
            .filter(move |p| p.requirement == requirement)
            .map(|p| p.name.as_str())
    }
}

/// All entity definitions of one schema, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub name: String,
    pub entities: Vec<EntityDef>,
}

impl SchemaDefinition {
    pub fn get(&self, entity_name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == entity_name)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntityDef {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    props: Mapping,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPropDef {
    expected_type: String,
    required: Requirement,
    #[serde(default)]
    description: Option<String>,
}

/// Parse a YAML schema document
pub fn parse_schema(schema_name: &str, yaml: &str) -> Result<SchemaDefinition, CrateError> {
    let fail = |reason: String| CrateError::SchemaDefinition {
        schema: schema_name.to_string(),
        reason,
    };

    let root: Mapping = serde_yaml::from_str(yaml).map_err(|e| fail(e.to_string()))?;
    let mut entities = Vec::with_capacity(root.len());

    for (key, value) in root {
        let entity_name = yaml_key(&key).ok_or_else(|| fail("entity names must be strings".into()))?;
        let raw: RawEntityDef = serde_yaml::from_value(value)
            .map_err(|e| fail(format!("entity '{}': {}", entity_name, e)))?;

        let mut props = Vec::with_capacity(raw.props.len());
        for (prop_key, prop_value) in raw.props {
            let prop_name = yaml_key(&prop_key)
                .ok_or_else(|| fail(format!("entity '{}': property names must be strings", entity_name)))?;
            let raw_prop: RawPropDef = serde_yaml::from_value(prop_value)
                .map_err(|e| fail(format!("{}.{}: {}", entity_name, prop_name, e)))?;
            let expected_type = TypeDescriptor::parse(&raw_prop.expected_type)
                .map_err(|e| fail(format!("{}.{}: {}", entity_name, prop_name, e)))?;
            props.push(PropDef {
                name: prop_name,
                expected_type,
                requirement: raw_prop.required,
                description: raw_prop.description,
            });
        }

        entities.push(EntityDef::new(entity_name, raw.description, props));
    }

    Ok(SchemaDefinition {
        name: schema_name.to_string(),
        entities,
    })
}

/// Read and parse a schema file; the schema is named after the file stem
pub fn load_schema_file(path: &Path) -> Result<SchemaDefinition, CrateError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CrateError::InvalidPath(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path)?;
    parse_schema(name, &content)
}

fn yaml_key(key: &YamlValue) -> Option<String> {
    key.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_descriptor() {
        assert_eq!(TypeDescriptor::parse("str").unwrap(), TypeDescriptor::Str);
        assert_eq!(
            TypeDescriptor::parse("Person").unwrap(),
            TypeDescriptor::Entity(vec!["Person".to_string()])
        );
        assert_eq!(
            TypeDescriptor::parse("List[Person]").unwrap(),
            TypeDescriptor::List(Box::new(TypeDescriptor::Entity(vec!["Person".to_string()])))
        );
        assert_eq!(
            TypeDescriptor::parse("Union[Organization, HostingInstitution]").unwrap(),
            TypeDescriptor::Entity(vec![
                "Organization".to_string(),
                "HostingInstitution".to_string()
            ])
        );
        assert_eq!(
            TypeDescriptor::parse("Union[str, List[str]]").unwrap(),
            TypeDescriptor::Union(vec![
                TypeDescriptor::Str,
                TypeDescriptor::List(Box::new(TypeDescriptor::Str))
            ])
        );
    }

    #[test]
    fn test_parse_type_descriptor_errors() {
        assert!(TypeDescriptor::parse("string").is_err());
        assert!(TypeDescriptor::parse("List[str, int]").is_err());
        assert!(TypeDescriptor::parse("List[str").is_err());
        assert!(TypeDescriptor::parse("Union[str]").is_err());
        assert!(TypeDescriptor::parse("Union[str,]").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for expr in ["str", "List[Person]", "Union[str, List[int]]", "Union[A, B]"] {
            let parsed = TypeDescriptor::parse(expr).unwrap();
            assert_eq!(parsed.to_string(), expr);
        }
    }

    #[test]
    fn test_parse_schema_keeps_order() {
        let yaml = r#"
Person:
  description: A person.
  props:
    name:
      expected_type: str
      required: required
    email:
      expected_type: str
      required: optional
    affiliation:
      expected_type: str
      required: recommended
Organization:
  props:
    name:
      expected_type: str
      required: required
"#;
        let schema = parse_schema("test", yaml).unwrap();
        assert_eq!(schema.entities.len(), 2);
        let person = schema.get("Person").unwrap();
        let names: Vec<&str> = person.props().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "email", "affiliation"]);
        assert_eq!(person.names_with(Requirement::Required).collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(
            person.names_with(Requirement::Recommended).collect::<Vec<_>>(),
            vec!["affiliation"]
        );
    }

    #[test]
    fn test_parse_schema_rejects_bad_requirement() {
        let yaml = r#"
Person:
  props:
    name:
      expected_type: str
      required: mandatory
"#;
        let err = parse_schema("test", yaml).unwrap_err();
        assert!(matches!(err, CrateError::SchemaDefinition { .. }));
    }

    #[test]
    fn test_parse_schema_rejects_bad_type() {
        let yaml = r#"
Person:
  props:
    name:
      expected_type: string
      required: required
"#;
        assert!(parse_schema("test", yaml).is_err());
    }

    #[test]
    fn test_load_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.yml");
        std::fs::write(
            &path,
            "Sample:\n  props:\n    name:\n      expected_type: str\n      required: required\n",
        )
        .unwrap();
        let schema = load_schema_file(&path).unwrap();
        assert_eq!(schema.name, "lab");
        assert!(schema.get("Sample").unwrap().contains("name"));
    }
}
