//! `myschema`: a small demonstration schema
//!
//! Shows how a schema adds its own value checks (`message` format) and a
//! phase 2 rule (no prohibited words) on top of the definition.

use std::sync::LazyLock;

use regex::Regex;

use crate::check::{check_entity_values, is_relative_path, is_url};
use crate::def::{parse_schema, SchemaDefinition};
use crate::entity::DataEntity;
use crate::error::{CrateError, EntityError};
use crate::id::is_directory_id;
use crate::rocrate::RoCrate;
use crate::rules::{builtin_kind, EntityRules};

use super::RuleSet;

pub const SCHEMA_NAME: &str = "myschema";

/// Words a message may not contain, matched as substrings
pub const PROHIBITED_WORDS: &[&str] = &["danger", "ban", "foo", "bar"];

const SCHEMA_YAML: &str = include_str!("myschema.yml");

static MESSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"^[A-Z][a-zA-Z0-9.{}^\- #"'!\\|%&()\[\]*:+;]*?\.$"##).expect("invalid message regex")
});

pub fn definition() -> Result<SchemaDefinition, CrateError> {
    parse_schema(SCHEMA_NAME, SCHEMA_YAML)
}

pub fn rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.insert("MySchema".to_string(), Box::new(MySchemaRules));
    rules
}

pub fn my_schema(id: impl Into<String>) -> DataEntity {
    DataEntity::new(id, builtin_kind(SCHEMA_NAME, "MySchema"))
}

/// Capitalised sentence ending with a period
pub fn is_message(value: &str) -> bool {
    MESSAGE_RE.is_match(value)
}

pub fn contains_prohibited_word(value: &str) -> bool {
    PROHIBITED_WORDS.iter().any(|w| value.contains(w))
}

pub struct MySchemaRules;

impl EntityRules for MySchemaRules {
    fn check_props(&self, entity: &DataEntity, error: &mut EntityError) {
        error.extend(check_entity_values(entity, &[("url", is_url), ("message", is_message)]));
        if !is_directory_id(entity.id()) {
            error.add("@id", "The id MUST end with `/`.");
        }
        if !is_relative_path(entity.id()) {
            error.add("@id", "The id MUST be a relative path.");
        }
    }

    fn validate(&self, entity: &DataEntity, _rocrate: &RoCrate, error: &mut EntityError) {
        if entity.get_str("message").is_some_and(contains_prohibited_word) {
            error.add("message", "The message contains prohibited words.");
        }
    }
}
