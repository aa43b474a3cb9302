//! The `cao` schema: data management plans per the Cabinet Office guideline

use crate::check::{
    check_entity_values, content_size_to_bytes, is_content_size, is_erad_researcher_number, is_iso8601,
};
use crate::def::{parse_schema, SchemaDefinition};
use crate::entity::DataEntity;
use crate::error::{CrateError, EntityError};
use crate::rocrate::RoCrate;
use crate::rules::{builtin_kind, EntityRules};

use super::base::{FileRules, PersonRules};
use super::{
    check_dmp_metadata_links, check_embargo_date, require_dmp_metadata, require_fixed_id, require_one_of,
    require_props, RuleSet, ACCESS_RIGHTS, EMBARGOED_ACCESS, OPEN_ACCESS,
};

pub const SCHEMA_NAME: &str = "cao";

pub const DMP_METADATA_ID: &str = "#CAO-DMP";

const SCHEMA_YAML: &str = include_str!("cao.yml");

pub fn definition() -> Result<SchemaDefinition, CrateError> {
    parse_schema(SCHEMA_NAME, SCHEMA_YAML)
}

pub fn rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.insert("DMPMetadata".to_string(), Box::new(DmpMetadataRules));
    rules.insert("DMP".to_string(), Box::new(DmpRules));
    rules.insert("File".to_string(), Box::new(FileRules));
    rules.insert("Person".to_string(), Box::new(CaoPersonRules));
    rules
}

/// The plan itself, with its fixed id and default name
pub fn dmp_metadata() -> DataEntity {
    DataEntity::new(DMP_METADATA_ID, builtin_kind(SCHEMA_NAME, "DMPMetadata")).with("name", "CAO-DMP")
}

pub fn dmp(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "DMP"))
}

pub fn file(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "File"))
}

pub fn person(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "Person"))
}

pub struct DmpMetadataRules;

impl EntityRules for DmpMetadataRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_fixed_id(entity, DMP_METADATA_ID, error);
    }

    fn validate(&self, entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
        check_dmp_metadata_links(entity, rocrate, error);
    }
}

/// One managed data set
///
/// Access rights decide which of the publication properties are needed;
/// the files assigned to the set must fit in its declared `contentSize`.
pub struct DmpRules;

impl EntityRules for DmpRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_one_of(entity, "accessRights", ACCESS_RIGHTS, error);
        error.extend(check_entity_values(
            entity,
            &[("availabilityStarts", is_iso8601), ("contentSize", is_content_size)],
        ));
    }

    fn validate(&self, entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
        require_dmp_metadata(entity, rocrate, error);
        check_unique_data_number(entity, rocrate, error);

        match entity.get_str("accessRights") {
            Some(EMBARGOED_ACCESS) => {
                check_embargo_date(entity, rocrate, error);
                require_props(entity, &["repository"], "required unless the data is open access.", error);
            }
            Some(OPEN_ACCESS) => {
                if entity.contains("availabilityStarts") {
                    error.add(
                        "availabilityStarts",
                        "This property is not allowed when accessRights is open access.",
                    );
                }
                require_props(
                    entity,
                    &["distribution", "license", "isAccessibleForFree"],
                    "required when accessRights is open access.",
                    error,
                );
                if entity.get("isAccessibleForFree").and_then(|v| v.as_bool()) == Some(false) {
                    error.add(
                        "isAccessibleForFree",
                        "The value MUST be true when accessRights is open access.",
                    );
                }
            }
            Some(_) => {
                require_props(entity, &["repository"], "required unless the data is open access.", error);
            }
            None => {}
        }

        check_total_file_size(entity, rocrate, error);
    }
}

/// `dataNumber` identifies a DMP entry within its plan
fn check_unique_data_number(entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
    let Some(number) = entity.get("dataNumber").and_then(|v| v.as_i64()) else {
        return;
    };
    let clash = rocrate
        .entities_of(entity.schema_name(), "DMP")
        .filter(|other| other.id() != entity.id())
        .any(|other| other.get("dataNumber").and_then(|v| v.as_i64()) == Some(number));
    if clash {
        error.add("dataNumber", format!("The dataNumber {} is used by another DMP.", number));
    }
}

/// Sum of the `contentSize` of files assigned to `entity` must not exceed its own
fn check_total_file_size(entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
    let Some(declared) = entity.get_str("contentSize") else {
        return;
    };
    let Some(limit) = content_size_to_bytes(declared) else {
        return;
    };
    // u128: the sum of u64 sizes may exceed u64::MAX
    let total: u128 = rocrate
        .referrers("dmpDataNumber", entity.id())
        .filter(|f| f.is(SCHEMA_NAME, "File"))
        .filter_map(|f| f.get_str("contentSize").and_then(content_size_to_bytes))
        .map(u128::from)
        .sum();
    if total > u128::from(limit) {
        error.add(
            "contentSize",
            format!(
                "The total file size of this DMP ({} bytes) exceeds the value of contentSize ({}).",
                total, declared
            ),
        );
    }
}

/// A researcher, optionally registered with e-Rad
pub struct CaoPersonRules;

impl EntityRules for CaoPersonRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        PersonRules.check_props(entity, error);
        error.extend(check_entity_values(
            entity,
            &[("eradResearcherNumber", is_erad_researcher_number)],
        ));
    }
}
