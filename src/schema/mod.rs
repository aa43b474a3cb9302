//! Built-in schemas
//!
//! Each schema module embeds its YAML definition, supplies rule sets for the
//! entity types that need more than the definition, and exposes typed
//! constructors. Rules shared by several schemas live here.

pub mod amed;
pub mod base;
pub mod cao;
pub mod myschema;

use std::collections::HashMap;

use crate::def::SchemaDefinition;
use crate::entity::DataEntity;
use crate::error::{CrateError, EntityError};
use crate::rocrate::RoCrate;
use crate::rules::EntityRules;

/// Rule sets of one schema, keyed by entity name
pub type RuleSet = HashMap<String, Box<dyn EntityRules>>;

/// Access rights shared by the DMP schemas
pub const ACCESS_RIGHTS: &[&str] = &[
    "open access",
    "restricted access",
    "embargoed access",
    "metadata only access",
];

pub(crate) const OPEN_ACCESS: &str = "open access";
pub(crate) const EMBARGOED_ACCESS: &str = "embargoed access";

/// Definitions and rules of every built-in schema
pub(crate) fn builtin_schemas() -> Result<Vec<(SchemaDefinition, RuleSet)>, CrateError> {
    Ok(vec![
        (base::definition()?, base::rules()),
        (cao::definition()?, cao::rules()),
        (amed::definition()?, amed::rules()),
        (myschema::definition()?, myschema::rules()),
    ])
}

/// The `@id` must be a URL
pub(crate) fn require_url_id(entity: &DataEntity, error: &mut EntityError) {
    if !crate::check::is_url(entity.id()) {
        error.add("@id", format!("The id {:?} must be a URL.", entity.id()));
    }
}

/// The `@id` must equal `expected`
pub(crate) fn require_fixed_id(entity: &DataEntity, expected: &str, error: &mut EntityError) {
    if entity.id() != expected {
        error.add(
            "@id",
            format!("The id of {} must be {:?}.", entity.entity_type(), expected),
        );
    }
}

/// Each listed property must be present
pub(crate) fn require_props(entity: &DataEntity, props: &[&str], reason: &str, error: &mut EntityError) {
    for prop in props {
        if !entity.contains(prop) {
            error.add(*prop, format!("Missing required property: {}", reason));
        }
    }
}

/// A string property, when present, must be one of `allowed`
pub(crate) fn require_one_of(entity: &DataEntity, prop: &str, allowed: &[&str], error: &mut EntityError) {
    if let Some(value) = entity.get_str(prop) {
        if !allowed.contains(&value) {
            error.add(
                prop,
                format!("The value {:?} is not one of: {}.", value, allowed.join(", ")),
            );
        }
    }
}

/// Links every DMP metadata entity must keep with the rest of the crate
///
/// `about` points at the crate root, `funder` is one of the root's
/// funders, and `hasPart` lists every DMP of the same schema in the crate.
pub(crate) fn check_dmp_metadata_links(entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
    let root = rocrate.root();

    if let Some(about) = entity.get("about") {
        if !about.references(root.id()) {
            error.add("about", "The value of this property MUST be the RootDataEntity of this crate.");
        }
    }

    if let Some(funder) = entity.get("funder") {
        let root_funders = root.get("funder");
        for r in funder.refs() {
            if !root_funders.is_some_and(|f| f.references(&r.id)) {
                error.add(
                    "funder",
                    format!("The entity {:?} is not included in the funder of the RootDataEntity.", r.id),
                );
            }
        }
    }

    let parts = entity.get("hasPart");
    for dmp in rocrate.entities_of(entity.schema_name(), "DMP") {
        if !parts.is_some_and(|p| p.references(dmp.id())) {
            error.add(
                "hasPart",
                format!("The entity {:?} is not included in hasPart.", dmp.id()),
            );
        }
    }
}

/// The crate must hold a DMP metadata entity of the same schema as `entity`
pub(crate) fn require_dmp_metadata(entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
    if rocrate.entities_of(entity.schema_name(), "DMPMetadata").next().is_none() {
        error.add(
            "@id",
            format!("DMPMetadata of schema {} is required in the crate.", entity.schema_name()),
        );
    }
}

/// Embargoed data needs a publication date strictly in the future
pub(crate) fn check_embargo_date(entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
    match entity.get_str("availabilityStarts") {
        None => error.add(
            "availabilityStarts",
            "Missing required property: required when accessRights is embargoed access.",
        ),
        Some(date) => {
            if !crate::check::is_future_date(date, rocrate.options().now()) {
                error.add(
                    "availabilityStarts",
                    format!("The value {:?} MUST be a date in the future.", date),
                );
            }
        }
    }
}
