//! Ordering of declarations by their dependencies.

use petgraph::{algo::tarjan_scc, graphmap::DiGraphMap};

use crate::schema::declaration::TypeHandle;

/// Order declarations should be processed in, so every declaration comes
/// after the ones it depends on.
#[derive(Debug, Default)]
pub(crate) struct DependencyOrder {
    /// Declarations outside of any cycle, dependencies first.
    pub(crate) sequence: Vec<TypeHandle>,
    /// Groups of declarations depending on each other, each sorted.
    pub(crate) cycles: Vec<Vec<TypeHandle>>,
}

/// Orders `nodes` so that for every `(dependent, dependency)` edge the
/// dependency comes first.
///
/// Strongly connected components with more than one node, or with a
/// self-dependency, are reported as cycles instead of being ordered.
pub(crate) fn dependency_order(
    nodes: impl IntoIterator<Item = TypeHandle>,
    edges: impl IntoIterator<Item = (TypeHandle, TypeHandle)>,
) -> DependencyOrder {
    let mut graph = DiGraphMap::<TypeHandle, ()>::new();
    for n in nodes {
        graph.add_node(n);
    }
    for (dependent, dependency) in edges {
        graph.add_edge(dependent, dependency, ());
    }

    // `tarjan_scc()` emits components in reverse topological order, which is
    // dependencies first for edges pointing at dependencies.
    let mut order = DependencyOrder::default();
    for mut component in tarjan_scc(&graph) {
        let cyclic = component.len() > 1
            || component
                .first()
                .is_some_and(|&n| graph.contains_edge(n, n));
        if cyclic {
            component.sort_unstable();
            order.cycles.push(component);
        } else {
            order.sequence.extend(component);
        }
    }
    order
}
