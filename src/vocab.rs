//! Vocabulary and context definitions
//!
//! RO-Crate constants plus the per-entity `@context` URLs that tie an entity
//! to the schema that governs it.

/// GitHub owner of the repository hosting the schema contexts
pub const GH_OWNER: &str = "hirakinii";

/// GitHub repository hosting the schema contexts
pub const GH_REPO_NAME: &str = "nii-dg";

/// Git reference (tag or branch) the contexts are served from
pub const GH_REF: &str = "demo-myschema-01";

/// RO-Crate 1.1 JSON-LD context
pub const ROCRATE_CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";

/// RO-Crate 1.1 specification, referenced from the metadata descriptor
pub const ROCRATE_PROFILE: &str = "https://w3id.org/ro/crate/1.1";

/// Standard metadata descriptor filename
pub const METADATA_DESCRIPTOR_ID: &str = "ro-crate-metadata.json";

/// Root entity ID
pub const ROOT_ENTITY_ID: &str = "./";

/// Entity type the root is read as, whatever its declared `@type`
pub const ROOT_ENTITY_TYPE: &str = "RootDataEntity";

/// Schema used when an entity's context names none
pub const DEFAULT_SCHEMA: &str = "base";

/// `owner/repo` path on GitHub
pub fn gh_repo() -> String {
    format!("{}/{}", GH_OWNER, GH_REPO_NAME)
}

/// Base URL under which every schema's contexts live
pub fn context_base() -> String {
    format!(
        "https://raw.githubusercontent.com/{}/{}/schema/context/",
        gh_repo(),
        GH_REF
    )
}

/// `@context` URL for one entity type of one schema
pub fn entity_context(schema_name: &str, entity_name: &str) -> String {
    format!("{}{}/{}.jsonld", context_base(), schema_name, entity_name)
}

/// Recover `(schema, entity)` from a context URL produced by [`entity_context`]
///
/// Contexts from any repository or ref are accepted as long as the path ends
/// with `schema/context/<schema>/<Entity>.jsonld`.
pub fn parse_entity_context(context: &str) -> Option<(String, String)> {
    let (_, tail) = context.rsplit_once("/schema/context/")?;
    let (schema, file) = tail.split_once('/')?;
    let entity = file.strip_suffix(".jsonld")?;
    if schema.is_empty() || entity.is_empty() || entity.contains('/') {
        return None;
    }
    Some((schema.to_string(), entity.to_string()))
}

/// The metadata descriptor entity pointing at the root
pub fn metadata_descriptor() -> serde_json::Value {
    serde_json::json!({
        "@id": METADATA_DESCRIPTOR_ID,
        "@type": "CreativeWork",
        "conformsTo": {"@id": ROCRATE_PROFILE},
        "about": {"@id": ROOT_ENTITY_ID}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_context_round_trip() {
        let ctx = entity_context("cao", "DMP");
        assert_eq!(
            ctx,
            "https://raw.githubusercontent.com/hirakinii/nii-dg/demo-myschema-01/schema/context/cao/DMP.jsonld"
        );
        assert_eq!(
            parse_entity_context(&ctx),
            Some(("cao".to_string(), "DMP".to_string()))
        );
    }

    #[test]
    fn test_parse_foreign_context() {
        assert_eq!(parse_entity_context(ROCRATE_CONTEXT), None);
        assert_eq!(
            parse_entity_context(
                "https://raw.githubusercontent.com/other/fork/main/schema/context/base/Person.jsonld"
            ),
            Some(("base".to_string(), "Person".to_string()))
        );
    }

    #[test]
    fn test_metadata_descriptor() {
        let desc = metadata_descriptor();
        assert_eq!(desc["about"]["@id"], ROOT_ENTITY_ID);
    }
}
