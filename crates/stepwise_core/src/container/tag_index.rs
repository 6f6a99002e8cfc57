//! Tag lookups and priority resolution over the registry.
//!
//! # Invariants
//! - Results are derived from the registry on every call, so they always
//!   reflect the latest definitions.
//! - Higher priority comes first; equal priorities keep registration order.
//! - A tag without contributors yields an empty result, never an error.

use crate::container::definition::ServiceId;
use crate::container::extension_point::ExtensionPoint;
use crate::container::registry::Registry;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// One contributor to an extension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedService {
    pub id: ServiceId,
    pub priority: i32,
}

impl Registry {
    /// Every service tagged with `point`, in registration order.
    pub fn find_tagged(&self, point: &ExtensionPoint) -> Vec<TaggedService> {
        self.definitions()
            .filter_map(|(id, definition)| {
                definition.priority_for(point).map(|priority| TaggedService {
                    id: id.clone(),
                    priority,
                })
            })
            .collect()
    }

    /// Service ids tagged with `point`, highest priority first.
    pub fn sorted_by_priority(&self, point: &ExtensionPoint) -> Vec<ServiceId> {
        sort_by_priority(self.find_tagged(point))
            .into_iter()
            .map(|tagged| tagged.id)
            .collect()
    }

    /// Snapshot of every tag in use or declared, contributors sorted.
    pub fn tag_index(&self) -> TagIndex {
        let mut points: BTreeMap<ExtensionPoint, Vec<TaggedService>> = self
            .extension_points()
            .map(|point| (point.clone(), Vec::new()))
            .collect();

        for (id, definition) in self.definitions() {
            for binding in definition.tags() {
                let contributors = points.entry(binding.point.clone()).or_default();
                // Repeated bindings for one tag count once, with the first priority.
                if contributors.iter().any(|tagged| &tagged.id == id) {
                    continue;
                }
                contributors.push(TaggedService {
                    id: id.clone(),
                    priority: binding.priority,
                });
            }
        }

        let points = points
            .into_iter()
            .map(|(point, contributors)| (point, sort_by_priority(contributors)))
            .collect();
        TagIndex { points }
    }
}

fn sort_by_priority(mut tagged: Vec<TaggedService>) -> Vec<TaggedService> {
    // Stable sort: ties stay in registration order.
    tagged.sort_by_key(|service| Reverse(service.priority));
    tagged
}

/// Read-only view of extension points and their ordered contributors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagIndex {
    points: BTreeMap<ExtensionPoint, Vec<TaggedService>>,
}

impl TagIndex {
    /// Ordered contributors for `point`; empty when nothing is tagged.
    pub fn get(&self, point: &ExtensionPoint) -> &[TaggedService] {
        self.points
            .get(point)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn points(&self) -> impl Iterator<Item = &ExtensionPoint> {
        self.points.keys()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::container::definition::{Definition, ServiceId};
    use crate::container::extension_point::ExtensionPoint;
    use crate::container::registry::Registry;

    fn ids(values: &[&str]) -> Vec<ServiceId> {
        values.iter().map(|value| ServiceId::from(*value)).collect()
    }

    #[test]
    fn excludes_untagged_and_other_tags() {
        let mut registry = Registry::new();
        registry.define("finder", Definition::new("Finder"));
        registry.define(
            "engine",
            Definition::new("Engine").with_tag(ExtensionPoint::SearchEngine, 5),
        );
        registry.define(
            "stringer",
            Definition::new("Stringer").with_tag(ExtensionPoint::ExceptionStringer, 5),
        );

        let tagged = registry.find_tagged(&ExtensionPoint::SearchEngine);
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].id.as_str(), "engine");
        assert_eq!(tagged[0].priority, 5);
    }

    #[test]
    fn sorts_descending_with_registration_order_ties() {
        let mut registry = Registry::new();
        for (id, priority) in [("c", 0), ("a", 50), ("d", 100), ("b", 50), ("e", -10)] {
            registry.define(
                id,
                Definition::new("Engine").with_tag(ExtensionPoint::SearchEngine, priority),
            );
        }

        assert_eq!(
            registry.sorted_by_priority(&ExtensionPoint::SearchEngine),
            ids(&["d", "a", "b", "c", "e"])
        );
    }

    #[test]
    fn empty_tag_yields_empty_sequence() {
        let registry = Registry::new();
        assert!(registry
            .sorted_by_priority(&ExtensionPoint::ExceptionStringer)
            .is_empty());
        assert!(registry.tag_index().get(&ExtensionPoint::ExceptionStringer).is_empty());
    }

    #[test]
    fn tag_index_includes_declared_points_and_sorted_contributors() {
        let mut registry = Registry::new();
        registry.declare_extension_point(ExtensionPoint::ExceptionStringer);
        registry.define(
            "low",
            Definition::new("Engine")
                .with_tag(ExtensionPoint::SearchEngine, 1)
                .with_tag(ExtensionPoint::SearchEngine, 1000),
        );
        registry.define(
            "high",
            Definition::new("Engine").with_tag(ExtensionPoint::SearchEngine, 10),
        );

        let index = registry.tag_index();
        assert_eq!(index.len(), 2);
        assert!(index.get(&ExtensionPoint::ExceptionStringer).is_empty());

        let engines = index.get(&ExtensionPoint::SearchEngine);
        assert_eq!(engines.len(), 2);
        assert_eq!(engines[0].id.as_str(), "high");
        assert_eq!(engines[1].id.as_str(), "low");
        assert_eq!(engines[1].priority, 1);
    }
}
