//! Forward and reverse path mapping between mirror and source trees
//!
//! These functions are pure: the only outside input is the existence
//! oracle passed to [`resolve_forward`], which decides overlay.

use mirror_store::ResourcePath;

use crate::definition::MirrorDefinition;

/// Rewrite a path under the mirror root to its source path, ignoring overlay.
pub fn rewrite_forward(definition: &MirrorDefinition, path: &ResourcePath) -> Option<ResourcePath> {
    if path == definition.mirror_root() {
        return Some(definition.source_root().clone());
    }
    path.as_str()
        .strip_prefix(definition.mirror_prefix())
        .map(|suffix| ResourcePath::new(format!("{}{}", definition.source_prefix(), suffix)))
}

/// Resolve a mirror path to the path that should be served.
///
/// Returns `Ok(None)` when the path is outside the mirror, or when the
/// mirror is overlayable and a real node exists at `path`. The mirror root
/// itself always resolves to the source root. Failures of `exists` are
/// returned rather than read as either answer.
pub fn resolve_forward<F>(
    definition: &MirrorDefinition,
    path: &ResourcePath,
    exists: F,
) -> mirror_store::Result<Option<ResourcePath>>
where
    F: FnOnce(&ResourcePath) -> mirror_store::Result<bool>,
{
    if !definition.overlayable() || path == definition.mirror_root() {
        return Ok(rewrite_forward(definition, path));
    }
    if !path.as_str().starts_with(definition.mirror_prefix()) {
        return Ok(None);
    }
    if exists(path)? {
        return Ok(None);
    }
    Ok(rewrite_forward(definition, path))
}

/// Map a source path back to its path under the mirror root.
pub fn resolve_reverse(definition: &MirrorDefinition, source_path: &ResourcePath) -> Option<ResourcePath> {
    if source_path == definition.source_root() {
        return Some(definition.mirror_root().clone());
    }
    source_path
        .as_str()
        .strip_prefix(definition.source_prefix())
        .map(|suffix| ResourcePath::new(format!("{}{}", definition.mirror_prefix(), suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn definition(overlayable: bool) -> MirrorDefinition {
        MirrorDefinition::new(
            ResourcePath::new("/root/path2"),
            ResourcePath::new("/root/path1"),
            overlayable,
        )
        .unwrap()
    }

    fn path(s: &str) -> ResourcePath {
        ResourcePath::new(s)
    }

    #[test]
    fn test_plain_rewrite() {
        let def = definition(false);
        assert_eq!(rewrite_forward(&def, &path("/root/path2")), Some(path("/root/path1")));
        assert_eq!(
            rewrite_forward(&def, &path("/root/path2/child/leaf")),
            Some(path("/root/path1/child/leaf"))
        );
        assert_eq!(rewrite_forward(&def, &path("/root/path22/child")), None);
        assert_eq!(rewrite_forward(&def, &path("/root")), None);
    }

    #[test]
    fn test_non_overlayable_never_checks_existence() {
        let def = definition(false);
        let resolved = resolve_forward(&def, &path("/root/path2/child"), |_| {
            panic!("existence must not be consulted")
        })
        .unwrap();
        assert_eq!(resolved, Some(path("/root/path1/child")));
    }

    #[test]
    fn test_overlay_real_node_wins() {
        let def = definition(true);
        let resolved = resolve_forward(&def, &path("/root/path2/child"), |_| Ok(true)).unwrap();
        assert_eq!(resolved, None);

        let resolved = resolve_forward(&def, &path("/root/path2/child"), |_| Ok(false)).unwrap();
        assert_eq!(resolved, Some(path("/root/path1/child")));
    }

    #[test]
    fn test_overlay_never_applies_to_mirror_root() {
        let def = definition(true);
        let checked = Cell::new(false);
        let resolved = resolve_forward(&def, &path("/root/path2"), |_| {
            checked.set(true);
            Ok(true)
        })
        .unwrap();
        assert_eq!(resolved, Some(path("/root/path1")));
        assert!(!checked.get());
    }

    #[test]
    fn test_overlay_outside_mirror_skips_existence() {
        let def = definition(true);
        let resolved = resolve_forward(&def, &path("/elsewhere"), |_| {
            panic!("existence must not be consulted")
        })
        .unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_overlay_existence_failure_is_surfaced() {
        let def = definition(true);
        let result = resolve_forward(&def, &path("/root/path2/child"), |p| {
            Err(mirror_store::Error::unavailable(format!("cannot check {}", p)))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_reverse() {
        let def = definition(false);
        assert_eq!(resolve_reverse(&def, &path("/root/path1")), Some(path("/root/path2")));
        assert_eq!(
            resolve_reverse(&def, &path("/root/path1/child")),
            Some(path("/root/path2/child"))
        );
        assert_eq!(resolve_reverse(&def, &path("/root/path10/child")), None);
    }
}
