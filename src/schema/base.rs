//! The `base` schema: generic RO-Crate entities
//!
//! Other schemas build on these types, either by reusing them as reference
//! targets or by delegating to their rules.

use crate::check::{
    check_entity_values, is_content_size, is_email, is_encoding_format, is_iso8601, is_phone_number,
    is_relative_path, is_sha256, is_url,
};
use crate::def::{parse_schema, SchemaDefinition};
use crate::entity::DataEntity;
use crate::error::{CrateError, EntityError};
use crate::id::is_directory_id;
use crate::rocrate::RoCrate;
use crate::rules::{builtin_kind, EntityRules};
use crate::vocab::{ROOT_ENTITY_ID, ROOT_ENTITY_TYPE};

use super::{require_fixed_id, require_url_id, RuleSet};

pub const SCHEMA_NAME: &str = "base";

const SCHEMA_YAML: &str = include_str!("base.yml");

pub fn definition() -> Result<SchemaDefinition, CrateError> {
    parse_schema(SCHEMA_NAME, SCHEMA_YAML)
}

pub fn rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.insert(ROOT_ENTITY_TYPE.to_string(), Box::new(RootDataEntityRules));
    rules.insert("Person".to_string(), Box::new(PersonRules));
    rules.insert("Organization".to_string(), Box::new(UrlIdRules));
    rules.insert("HostingInstitution".to_string(), Box::new(UrlIdRules));
    rules.insert("License".to_string(), Box::new(UrlIdRules));
    rules.insert("RepositoryObject".to_string(), Box::new(UrlIdRules));
    rules.insert("DataDownload".to_string(), Box::new(DataDownloadRules));
    rules.insert("File".to_string(), Box::new(FileRules));
    rules.insert("Dataset".to_string(), Box::new(DatasetRules));
    rules
}

/// The crate root; its id is always `./`
pub fn root_data_entity() -> DataEntity {
    DataEntity::new(ROOT_ENTITY_ID, builtin_kind(SCHEMA_NAME, ROOT_ENTITY_TYPE))
}

pub fn person(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "Person"))
}

pub fn organization(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "Organization"))
}

pub fn hosting_institution(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "HostingInstitution"))
}

pub fn license(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "License"))
}

pub fn repository_object(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "RepositoryObject"))
}

pub fn data_download(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "DataDownload"))
}

pub fn file(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "File"))
}

pub fn dataset(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "Dataset"))
}

/// Root id is `./`; every local file and directory is listed in `hasPart`
pub struct RootDataEntityRules;

impl EntityRules for RootDataEntityRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_fixed_id(entity, ROOT_ENTITY_ID, error);
        error.extend(check_entity_values(entity, &[("datePublished", is_iso8601)]));
    }

    fn validate(&self, entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
        let parts = entity.get("hasPart");
        let local = rocrate
            .entities_of_type("File")
            .chain(rocrate.entities_of_type("Dataset"))
            .filter(|e| is_relative_path(e.id()));
        for part in local {
            if !parts.is_some_and(|p| p.references(part.id())) {
                error.add(
                    "hasPart",
                    format!("The entity {:?} is not included in hasPart.", part.id()),
                );
            }
        }
    }
}

/// Id is a URL (ORCID or similar); contact details are well-formed
pub struct PersonRules;

impl EntityRules for PersonRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_url_id(entity, error);
        error.extend(check_entity_values(
            entity,
            &[("email", is_email), ("telephone", is_phone_number)],
        ));
    }
}

/// Entities identified by a URL and nothing else
pub struct UrlIdRules;

impl EntityRules for UrlIdRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_url_id(entity, error);
    }
}

pub struct DataDownloadRules;

impl EntityRules for DataDownloadRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_url_id(entity, error);
        error.extend(check_entity_values(
            entity,
            &[("sha256", is_sha256), ("uploadDate", is_iso8601)],
        ));
    }
}

/// A file inside the crate (relative path) or on the web (URL)
///
/// A web file must say when it was retrieved via `sdDatePublished`.
pub struct FileRules;

impl EntityRules for FileRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        let id = entity.id();
        let local = is_relative_path(id) && !is_directory_id(id);
        if !local && !is_url(id) {
            error.add(
                "@id",
                format!("The id {:?} must be a relative file path or a URL.", id),
            );
        }
        if is_url(id) && !entity.contains("sdDatePublished") {
            error.add(
                "sdDatePublished",
                "Missing required property: required when the id is a URL.",
            );
        }
        error.extend(check_entity_values(
            entity,
            &[
                ("contentSize", is_content_size),
                ("encodingFormat", is_encoding_format),
                ("sha256", is_sha256),
                ("url", is_url),
                ("sdDatePublished", is_iso8601),
            ],
        ));
    }
}

/// A directory inside the crate: relative path ending with "/"
pub struct DatasetRules;

impl EntityRules for DatasetRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        let id = entity.id();
        if !is_relative_path(id) || !is_directory_id(id) || id == ROOT_ENTITY_ID {
            error.add(
                "@id",
                format!("The id {:?} must be a relative directory path ending with \"/\".", id),
            );
        }
        error.extend(check_entity_values(entity, &[("url", is_url)]));
    }
}
