use core::{fmt::Write as _, ops::Index};

use indexmap::IndexMap;

/// Nested view of a clock tree: every clock mapped to the clocks it feeds.
///
/// The top level holds the roots. Leaves map to an empty forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockForest(IndexMap<String, ClockForest>);

impl ClockForest {
    /// Builds the forest below `root` from a child -> parent mapping.
    pub(crate) fn from_parents(parents: &IndexMap<&str, Option<&str>>, root: Option<&str>) -> Self {
        ClockForest(
            parents
                .iter()
                .filter(|(_, parent)| **parent == root)
                .map(|(name, _)| (name.to_string(), Self::from_parents(parents, Some(*name))))
                .collect(),
        )
    }

    /// Whether `name` sits directly at this level.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Whether `name` sits directly at this level and feeds no clock.
    pub fn is_leaf(&self, name: &str) -> bool {
        self.get(name).is_some_and(ClockForest::is_empty)
    }

    pub fn get(&self, name: &str) -> Option<&ClockForest> {
        self.0.get(name)
    }

    /// Searches the whole forest for `name` and returns the clocks below it.
    pub fn find(&self, name: &str) -> Option<&ClockForest> {
        self.get(name)
            .or_else(|| self.0.values().find_map(|below| below.find(name)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClockForest)> {
        self.0.iter().map(|(name, below)| (name.as_str(), below))
    }

    /// Renders the forest as an indented list, one clock per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        for (name, below) in self.0.iter() {
            writeln!(out, "{:indent$}{name}", "", indent = depth * 2).ok();
            below.render_into(out, depth + 1);
        }
    }
}

impl Index<&str> for ClockForest {
    type Output = ClockForest;

    fn index(&self, name: &str) -> &Self::Output {
        &self.0[name]
    }
}
