//! Research Data Governance Metadata Validation Library
//!
//! This library validates RO-Crate metadata graphs describing research
//! projects (funders, researchers, data management plans, data files)
//! against declarative entity schemas plus per-type rule sets.
//!
//! # Overview
//!
//! A [`RoCrate`] holds typed [`DataEntity`] nodes keyed by `@id`, with a
//! mandatory root entity `./`. Validation runs in two phases:
//!
//! 1. `check_props`: shape checks on each entity alone (undeclared
//!    properties, missing required properties, declared types, value
//!    formats such as URLs, dates and content sizes)
//! 2. `validate`: graph checks against the whole crate (references
//!    resolve, referenced types match, cross-entity rules such as access
//!    rights or total file size)
//!
//! Violations are aggregated per entity into an [`EntityError`] rather than
//! stopping at the first one.
//!
//! # Schemas
//!
//! Entity types are defined in YAML (see [`def`]) and registered with a
//! [`SchemaRegistry`] together with their [`EntityRules`]. Four schemas are
//! built in:
//!
//! - `base`: generic RO-Crate entities (root, files, people, organizations)
//! - `cao`: Cabinet Office data management plans
//! - `amed`: AMED data management plans
//! - `myschema`: a demonstration of custom rules
//!
//! # Usage
//!
//! ## Build and validate a crate
//!
//! ```ignore
//! use nii_dg::schema::base;
//! use nii_dg::RoCrate;
//!
//! let mut rocrate = RoCrate::new();
//! let funder = base::organization("https://ror.org/04ksd4g47").with("name", "NII");
//! rocrate.root_mut().set("name", "My project");
//! rocrate.root_mut().set("funder", vec![&funder]);
//! rocrate.add(funder)?;
//!
//! let report = rocrate.validate_all()?;
//! println!("{}", report);
//! ```
//!
//! ## Validate a crate on disk
//!
//! ```ignore
//! use nii_dg::{load_crate, registry, CrateSource};
//!
//! let rocrate = load_crate(&CrateSource::Directory("./my-crate".into()), registry())?;
//! rocrate.validate_all()?;
//! ```

pub mod check;
pub mod config;
pub mod def;
pub mod entity;
pub mod error;
pub mod id;
pub mod loader;
pub mod rocrate;
pub mod rules;
pub mod schema;
pub mod value;
pub mod vocab;

// Re-export main types for convenience
pub use crate::config::{RecommendedPolicy, ValidateOptions};
pub use crate::def::{EntityDef, PropDef, Requirement, SchemaDefinition, TypeDescriptor};
pub use crate::entity::DataEntity;
pub use crate::error::{CrateError, EntityError, Phase, ValidationReport, Violation, ViolationKind};
pub use crate::loader::{load, load_crate, CrateSource};
pub use crate::rocrate::RoCrate;
pub use crate::rules::{registry, EntityKind, EntityRules, SchemaRegistry};
pub use crate::value::{EntityRef, PropValue};
