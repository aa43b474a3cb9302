//! The `amed` schema: data management plans per the AMED guideline

use std::fmt;

use crate::check::{check_entity_values, is_content_size, is_iso8601};
use crate::def::{parse_schema, SchemaDefinition};
use crate::entity::DataEntity;
use crate::error::{CrateError, EntityError};
use crate::rocrate::RoCrate;
use crate::rules::{builtin_kind, EntityRules};

use super::{
    check_dmp_metadata_links, check_embargo_date, require_dmp_metadata, require_fixed_id, require_one_of,
    require_props, RuleSet, ACCESS_RIGHTS, EMBARGOED_ACCESS, OPEN_ACCESS,
};

pub const SCHEMA_NAME: &str = "amed";

pub const DMP_METADATA_ID: &str = "#AMED-DMP";

/// Answers accepted for `gotInformedConsent`
pub const INFORMED_CONSENT: &[&str] = &["yes", "no", "unknown"];

const SCHEMA_YAML: &str = include_str!("amed.yml");

pub fn definition() -> Result<SchemaDefinition, CrateError> {
    parse_schema(SCHEMA_NAME, SCHEMA_YAML)
}

pub fn rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.insert("DMPMetadata".to_string(), Box::new(DmpMetadataRules));
    rules.insert("DMP".to_string(), Box::new(DmpRules));
    rules
}

/// The plan itself, with its fixed id and default name
pub fn dmp_metadata() -> DataEntity {
    DataEntity::new(DMP_METADATA_ID, builtin_kind(SCHEMA_NAME, "DMPMetadata")).with("name", "AMED-DMP")
}

/// DMP entry `#dmp:<number>`
pub fn dmp(number: impl fmt::Display) -> DataEntity {
    DataEntity::new(format!("#dmp:{}", number), builtin_kind(SCHEMA_NAME, "DMP"))
}

/// Plan metadata; once DMP entries are listed, the people and institution
/// responsible for them must be named too.
pub struct DmpMetadataRules;

impl EntityRules for DmpMetadataRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_fixed_id(entity, DMP_METADATA_ID, error);
    }

    fn validate(&self, entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
        check_dmp_metadata_links(entity, rocrate, error);

        let has_parts = entity.get("hasPart").is_some_and(|p| !p.refs().is_empty());
        if has_parts {
            require_props(
                entity,
                &["creator", "hostingInstitution", "dataManager"],
                "required when hasPart lists DMP entries.",
                error,
            );
        }
    }
}

pub struct DmpRules;

impl EntityRules for DmpRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        require_one_of(entity, "accessRights", ACCESS_RIGHTS, error);
        require_one_of(entity, "gotInformedConsent", INFORMED_CONSENT, error);
        error.extend(check_entity_values(
            entity,
            &[("availabilityStarts", is_iso8601), ("contentSize", is_content_size)],
        ));
        if entity.get_str("gotInformedConsent") == Some("yes") {
            require_props(
                entity,
                &["informedConsentFormat"],
                "required when gotInformedConsent is yes.",
                error,
            );
        }
    }

    fn validate(&self, entity: &DataEntity, rocrate: &RoCrate, error: &mut EntityError) {
        require_dmp_metadata(entity, rocrate, error);

        let Some(access) = entity.get_str("accessRights") else {
            return;
        };
        if access == EMBARGOED_ACCESS {
            check_embargo_date(entity, rocrate, error);
        }
        if access != OPEN_ACCESS {
            require_props(
                entity,
                &["reasonForConcealment"],
                "required unless the data is open access.",
                error,
            );
        }
    }
}
