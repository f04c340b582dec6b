//! Property schema of mirror definition nodes

use mirror_store::{ResourcePath, ValueMap};

/// Tag identifying a mirror definition node
pub const MIRROR_MARKER: &str = "mirror:Mirror";

/// Absolute path of the subtree being mirrored
pub const PROP_SOURCE_PATH: &str = "mirror:sourcePath";

/// When true, the definition node's parent is the mirror root
pub const PROP_REGISTER_PARENT: &str = "mirror:registerParent";

/// When true, real nodes under the mirror root win over mirrored ones
pub const PROP_OVERLAYABLE: &str = "mirror:overlayable";

const DEFINITION_PROPERTIES: [&str; 3] = [PROP_SOURCE_PATH, PROP_REGISTER_PARENT, PROP_OVERLAYABLE];

/// Whether a property name belongs to the definition schema.
pub fn is_definition_property(name: &str) -> bool {
    DEFINITION_PROPERTIES.contains(&name)
}

/// Typed view of a definition node's properties.
///
/// Extraction never fails: values of the wrong type read as absent or
/// `false`, leaving validation to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DefinitionProperties {
    pub source_path: Option<ResourcePath>,
    pub register_parent: bool,
    pub overlayable: bool,
}

impl DefinitionProperties {
    pub fn extract(properties: &ValueMap) -> Self {
        Self {
            source_path: properties.get_str(PROP_SOURCE_PATH).map(ResourcePath::new),
            register_parent: properties.get_bool(PROP_REGISTER_PARENT, false),
            overlayable: properties.get_bool(PROP_OVERLAYABLE, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_store::PropertyValue;

    #[test]
    fn test_extract_reads_typed_values() {
        let properties: ValueMap = [
            (PROP_SOURCE_PATH, PropertyValue::from("/content/a//")),
            (PROP_REGISTER_PARENT, PropertyValue::from(true)),
            (PROP_OVERLAYABLE, PropertyValue::from("TRUE")),
        ]
        .into_iter()
        .collect();

        let extracted = DefinitionProperties::extract(&properties);
        assert_eq!(extracted.source_path, Some(ResourcePath::new("/content/a")));
        assert!(extracted.register_parent);
        assert!(extracted.overlayable);
    }

    #[test]
    fn test_extract_fails_closed() {
        let properties: ValueMap = [
            (PROP_SOURCE_PATH, PropertyValue::from(42_i64)),
            (PROP_OVERLAYABLE, PropertyValue::from("yes")),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            DefinitionProperties::extract(&properties),
            DefinitionProperties::default()
        );
    }

    #[test]
    fn test_is_definition_property() {
        assert!(is_definition_property("mirror:sourcePath"));
        assert!(!is_definition_property("jcr:title"));
    }
}
