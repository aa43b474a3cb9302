//! Error types for entity validation
//!
//! Two kinds of errors are raised: an [`EntityError`] aggregating every
//! property-scoped [`Violation`] one check pass found on one entity, and a
//! structural [`CrateError`] raised by the container or the loader.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::entity::DataEntity;

/// Category of a single violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    /// Wrong type, bad format, missing required or undeclared property
    Shape,
    /// Reference to an id absent from the crate
    Reference,
    /// Cross-entity business rule failed
    Relationship,
    /// Missing recommended property (never raised)
    Advisory,
}

/// Validation phase that produced an [`EntityError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// `check_props`: per-entity, no graph access
    Shape,
    /// `validate`: graph-aware
    Graph,
}

/// A property-scoped violation attributed to one entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Violation {
    pub entity_id: String,
    pub entity_type: String,
    pub property: String,
    pub message: String,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.property, self.message)
    }
}

/// Every violation found on one entity during one check call
///
/// An empty aggregate means no error; callers use [`EntityError::into_result`]
/// to turn a finished pass into `Ok(())` or `Err(self)`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub struct EntityError {
    pub entity_id: String,
    pub entity_type: String,
    pub schema_name: String,
    pub phase: Phase,
    violations: Vec<Violation>,
}

impl EntityError {
    /// Start an empty aggregate for `entity`
    pub fn new(entity: &DataEntity, phase: Phase) -> Self {
        Self {
            entity_id: entity.id().to_string(),
            entity_type: entity.entity_type().to_string(),
            schema_name: entity.schema_name().to_string(),
            phase,
            violations: Vec::new(),
        }
    }

    /// Record a violation; its kind follows the phase (shape or relationship)
    pub fn add(&mut self, property: impl Into<String>, message: impl Into<String>) {
        let kind = match self.phase {
            Phase::Shape => ViolationKind::Shape,
            Phase::Graph => ViolationKind::Relationship,
        };
        self.push(kind, property.into(), message.into());
    }

    /// Record a dangling-reference violation
    pub fn add_reference(&mut self, property: impl Into<String>, message: impl Into<String>) {
        self.push(ViolationKind::Reference, property.into(), message.into());
    }

    pub(crate) fn add_kind(
        &mut self,
        kind: ViolationKind,
        property: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(kind, property.into(), message.into());
    }

    fn push(&mut self, kind: ViolationKind, property: String, message: String) {
        self.violations.push(Violation {
            entity_id: self.entity_id.clone(),
            entity_type: self.entity_type.clone(),
            property,
            message,
            kind,
        });
    }

    /// Append all violations of another aggregate
    pub fn extend(&mut self, other: EntityError) {
        self.violations.extend(other.violations);
    }

    pub fn has_error(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Violations recorded against one property
    pub fn for_property<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.property == property)
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok(())` if nothing was recorded, otherwise the whole aggregate
    pub fn into_result(self) -> Result<(), EntityError> {
        if self.has_error() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} violation(s) in {}:{} entity '{}':",
            self.violations.len(),
            self.schema_name,
            self.entity_type,
            self.entity_id
        )?;
        for v in &self.violations {
            write!(f, "\n  - {}", v)?;
        }
        Ok(())
    }
}

/// Combined outcome of validating a whole crate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// One aggregate per failing (entity, phase), in validation order
    pub errors: Vec<EntityError>,
    /// Non-fatal notes (missing recommended properties)
    pub advisories: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of violations across all entities
    pub fn violation_count(&self) -> usize {
        self.errors.iter().map(EntityError::len).sum()
    }

    /// Iterate every violation of every failing entity
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.errors.iter().flat_map(|e| e.violations().iter())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "No errors found")?;
        } else {
            write!(
                f,
                "Found {} violation(s) in {} entity check(s):",
                self.violation_count(),
                self.errors.len()
            )?;
            for error in &self.errors {
                write!(f, "\n{}", error)?;
            }
        }
        if !self.advisories.is_empty() {
            write!(f, "\n{} advisory note(s):", self.advisories.len())?;
            for note in &self.advisories {
                write!(f, "\n  - {} '{}': {}", note.entity_type, note.entity_id, note)?;
            }
        }
        Ok(())
    }
}

/// Structural errors raised by the crate container, schema parsing and loading
#[derive(Error, Debug)]
pub enum CrateError {
    #[error("Duplicate @id '{0}': an entity with this id is already in the crate")]
    DuplicateId(String),

    #[error("Missing root entity in crate")]
    MissingRootEntity,

    #[error("Missing metadata descriptor in crate")]
    MissingMetadataDescriptor,

    #[error("Entity '{0}' not found in crate")]
    EntityNotFound(String),

    #[error("The root entity cannot be removed from the crate")]
    RootEntityRemoval,

    #[error("Unknown entity type '{entity}' in schema '{schema}'")]
    UnknownEntityType { schema: String, entity: String },

    #[error("Invalid crate structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid schema definition '{schema}': {reason}")]
    SchemaDefinition { schema: String, reason: String },

    #[error("Failed to load crate from {path}: {reason}")]
    LoadError { path: String, reason: String },

    #[error("{0}")]
    ValidationFailed(ValidationReport),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}
