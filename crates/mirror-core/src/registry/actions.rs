//! Coalescing of change-event batches into registry actions

use std::collections::BTreeMap;

use mirror_meta::is_definition_property;
use mirror_store::{ChangeEvent, ChangeKind, ResourcePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Re-read the definition node at the keyed path
    Register,
    /// Drop the provider at the keyed mirror root
    Unregister,
}

/// What one event batch asks the registry to do.
///
/// Actions are keyed by path and the last event for a path wins, so each
/// path is acted on at most once per batch.
#[derive(Debug, Default)]
pub(crate) struct ActionPlan {
    actions: BTreeMap<ResourcePath, Action>,
    node_added: bool,
    root_removed: bool,
}

impl ActionPlan {
    /// Classify a batch.
    ///
    /// `roots_defined_at` returns the registered mirror roots that are
    /// either located at, or defined by the node at, a given path.
    pub(crate) fn collect<F>(events: &[ChangeEvent], roots_defined_at: F) -> Self
    where
        F: Fn(&ResourcePath) -> Vec<ResourcePath>,
    {
        let mut plan = Self::default();
        for event in events {
            match event.kind {
                ChangeKind::NodeAdded => plan.node_added = true,
                ChangeKind::NodeRemoved => {
                    for root in roots_defined_at(&event.path) {
                        plan.root_removed = true;
                        plan.actions.insert(root, Action::Unregister);
                    }
                }
                _ => {
                    if event.path.name().is_some_and(is_definition_property)
                        && let Some(node) = event.path.parent()
                    {
                        plan.actions.insert(node, Action::Register);
                    }
                }
            }
        }
        plan
    }

    pub(crate) fn actions(&self) -> impl Iterator<Item = (&ResourcePath, Action)> {
        self.actions.iter().map(|(path, action)| (path, *action))
    }

    pub(crate) fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the batch both added nodes and removed a mirror, which is
    /// how a moved definition shows up.
    ///
    /// Only removals of registered roots or definition nodes count. A move
    /// reports every node of the moved subtree as removed, so moving a
    /// registered definition always hits one, while unrelated add and
    /// remove pairs elsewhere in the tree do not trigger a rescan.
    pub(crate) fn looks_like_move(&self) -> bool {
        self.node_added && self.root_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_meta::{PROP_OVERLAYABLE, PROP_SOURCE_PATH};
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> ResourcePath {
        ResourcePath::new(s)
    }

    fn registered(roots: &'static [&'static str]) -> impl Fn(&ResourcePath) -> Vec<ResourcePath> {
        move |p| {
            roots
                .iter()
                .filter(|r| p.as_str() == **r)
                .map(|r| path(r))
                .collect()
        }
    }

    fn planned(plan: &ActionPlan) -> Vec<(String, Action)> {
        plan.actions().map(|(p, a)| (p.to_string(), a)).collect()
    }

    #[test]
    fn test_property_change_schedules_one_register() {
        let events = vec![
            ChangeEvent::property(ChangeKind::PropertyChanged, &path("/root/path2"), PROP_SOURCE_PATH),
            ChangeEvent::property(ChangeKind::PropertyChanged, &path("/root/path2"), PROP_OVERLAYABLE),
        ];
        let plan = ActionPlan::collect(&events, registered(&[]));
        assert_eq!(planned(&plan), vec![("/root/path2".to_string(), Action::Register)]);
        assert!(!plan.looks_like_move());
    }

    #[test]
    fn test_unrecognized_properties_are_ignored() {
        let events = vec![ChangeEvent::property(
            ChangeKind::PropertyAdded,
            &path("/root/path2"),
            "title",
        )];
        assert_eq!(ActionPlan::collect(&events, registered(&[])).len(), 0);
    }

    #[test]
    fn test_removal_only_counts_for_registered_roots() {
        let events = vec![
            ChangeEvent::node_removed("/unrelated"),
            ChangeEvent::node_added("/elsewhere"),
        ];
        let plan = ActionPlan::collect(&events, registered(&["/root/path2"]));
        assert_eq!(plan.len(), 0);
        assert!(!plan.looks_like_move());
    }

    #[test]
    fn test_move_of_registered_root() {
        let events = vec![
            ChangeEvent::node_removed("/root/path2"),
            ChangeEvent::node_added("/root/path3"),
        ];
        let plan = ActionPlan::collect(&events, registered(&["/root/path2"]));
        assert_eq!(planned(&plan), vec![("/root/path2".to_string(), Action::Unregister)]);
        assert!(plan.looks_like_move());
    }

    #[test]
    fn test_last_event_for_a_path_wins() {
        let events = vec![
            ChangeEvent::node_removed("/root/path2"),
            ChangeEvent::property(ChangeKind::PropertyAdded, &path("/root/path2"), PROP_SOURCE_PATH),
        ];
        let plan = ActionPlan::collect(&events, registered(&["/root/path2"]));
        assert_eq!(planned(&plan), vec![("/root/path2".to_string(), Action::Register)]);
    }

    #[test]
    fn test_several_definitions_in_one_batch() {
        let events = vec![
            ChangeEvent::property(ChangeKind::PropertyAdded, &path("/b"), PROP_SOURCE_PATH),
            ChangeEvent::property(ChangeKind::PropertyAdded, &path("/a"), PROP_SOURCE_PATH),
            ChangeEvent::property(ChangeKind::PropertyAdded, &path("/b"), PROP_OVERLAYABLE),
        ];
        let plan = ActionPlan::collect(&events, registered(&[]));
        assert_eq!(
            planned(&plan),
            vec![
                ("/a".to_string(), Action::Register),
                ("/b".to_string(), Action::Register)
            ]
        );
    }
}
