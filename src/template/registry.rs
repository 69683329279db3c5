//! Canonical placeholder registry

use std::collections::{BTreeMap, BTreeSet};

use crate::parser::ast::{Body, NodeId};

/// Maps each placeholder number to its canonical node.
///
/// The canonical node for a number is its shallowest occurrence without a
/// transformation; ties go to the first occurrence in source order. Other
/// occurrences mirror it. `${VISUAL}` never has an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    canonical: BTreeMap<u32, NodeId>,
    /// Canonical nodes in source order
    order: Vec<NodeId>,
}

impl Registry {
    /// Derive the registry from a fully parsed body
    pub fn build(body: &Body) -> Self {
        Self::build_filtered(body, |_| true)
    }

    /// Derive the registry, keeping only numbers accepted by `keep`
    pub fn build_filtered(body: &Body, keep: impl Fn(u32) -> bool) -> Self {
        // number -> (depth, sequence, id)
        let mut best: BTreeMap<u32, (usize, usize, NodeId)> = BTreeMap::new();
        for (seq, id) in body.walk().into_iter().enumerate() {
            let Some(p) = body.node(id).placeholder() else {
                continue;
            };
            if p.is_visual() || p.transform.is_some() || !keep(p.number) {
                continue;
            }
            let candidate = (p.depth, seq, id);
            best.entry(p.number)
                .and_modify(|current| {
                    if (candidate.0, candidate.1) < (current.0, current.1) {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }

        let mut ordered: Vec<(usize, NodeId)> =
            best.values().map(|&(_, seq, id)| (seq, id)).collect();
        ordered.sort_unstable();

        Self {
            canonical: best.iter().map(|(&n, &(_, _, id))| (n, id)).collect(),
            order: ordered.into_iter().map(|(_, id)| id).collect(),
        }
    }

    pub fn get(&self, number: u32) -> Option<NodeId> {
        self.canonical.get(&number).copied()
    }

    pub fn is_canonical(&self, number: u32, id: NodeId) -> bool {
        self.get(number) == Some(id)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.canonical.contains_key(&number)
    }

    /// Registered numbers in ascending order
    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.canonical.keys().copied()
    }

    pub fn number_set(&self) -> BTreeSet<u32> {
        self.canonical.keys().copied().collect()
    }

    /// Canonical nodes in source order
    pub fn source_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::body::parse_body;
    use crate::parser::ast::SourceLocation;

    fn registry(source: &str) -> (Body, Registry) {
        let body = parse_body(source, &SourceLocation::default()).unwrap();
        let registry = Registry::build(&body);
        (body, registry)
    }

    #[test]
    fn test_first_occurrence_wins_ties() {
        let (body, reg) = registry("${1:a}${1}");
        assert_eq!(reg.len(), 1);
        let id = reg.get(1).unwrap();
        assert_eq!(body.node(id).source, 0..6);
    }

    #[test]
    fn test_shallowest_occurrence_wins() {
        let (body, reg) = registry("${1:${2:x}} $2");
        let id = reg.get(2).unwrap();
        assert_eq!(body.node(id).placeholder().unwrap().depth, 0);
    }

    #[test]
    fn test_transformations_never_canonical() {
        let (_, reg) = registry("${1/a/b/} $1");
        let (_, only_transform) = registry("${1/a/b/}");
        assert!(reg.contains(1));
        assert!(only_transform.is_empty());
    }

    #[test]
    fn test_visual_not_registered() {
        let (_, reg) = registry("${VISUAL:x} $1");
        assert_eq!(reg.numbers().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_source_order() {
        let (body, reg) = registry("$3 ${1:${2}}");
        let numbers: Vec<u32> = reg
            .source_order()
            .iter()
            .map(|&id| body.node(id).placeholder().unwrap().number)
            .collect();
        assert_eq!(numbers, vec![3, 1, 2]);
    }
}
