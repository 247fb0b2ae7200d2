//! Property tests for the graph arena: name uniqueness and referential
//! integrity under arbitrary edit sequences.

use proptest::prelude::*;
use pipelab::graph::GraphStore;
use std::collections::HashSet;

#[derive(Clone, Debug)]
enum Edit {
    /// Add a node of the given type under up to two existing parents
    /// (picked by index modulo the live count).
    Add { type_ix: usize, parent_seed: usize },
    /// Rename the node picked by index to the candidate name.
    Rename { node_seed: usize, to_ix: usize },
    /// Delete the branch rooted at the node picked by index.
    Delete { node_seed: usize },
}

const TYPES: &[&str] = &["load", "filter", "merge", "stats"];
const RENAMES: &[&str] = &["rows", "load", "filter_1", "x"];

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        4 => (0..TYPES.len(), any::<usize>()).prop_map(|(type_ix, parent_seed)| Edit::Add {
            type_ix,
            parent_seed,
        }),
        2 => (any::<usize>(), 0..RENAMES.len()).prop_map(|(node_seed, to_ix)| Edit::Rename {
            node_seed,
            to_ix,
        }),
        1 => any::<usize>().prop_map(|node_seed| Edit::Delete { node_seed }),
    ]
}

fn nth_name(graph: &GraphStore, seed: usize) -> Option<String> {
    let count = graph.len();
    if count == 0 {
        return None;
    }
    graph.names().nth(seed % count).map(str::to_string)
}

fn check_invariants(graph: &GraphStore) {
    // Uniqueness: the arena is name-keyed, so iterate the insertion
    // order and make sure it holds no duplicates either.
    let names: Vec<&str> = graph.names().collect();
    let set: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(names.len(), set.len(), "duplicate names: {names:?}");

    // Mutual, resolving edges.
    for node in graph.iter() {
        for parent in &node.parents {
            let p = graph.get(parent).unwrap_or_else(|| {
                panic!("dangling parent {parent} on {}", node.name)
            });
            assert!(
                p.children.contains(&node.name),
                "edge {}→{} not mirrored",
                parent,
                node.name
            );
        }
        for child in &node.children {
            let c = graph
                .get(child)
                .unwrap_or_else(|| panic!("dangling child {child} on {}", node.name));
            assert!(
                c.parents.contains(&node.name),
                "edge {}→{} not mirrored",
                node.name,
                child
            );
        }
    }

    // Topological order covers every node, parents first.
    let mut placed: HashSet<&str> = HashSet::new();
    let mut total = 0;
    for node in graph.topological_order() {
        assert!(node.parents.iter().all(|p| placed.contains(p.as_str())));
        placed.insert(node.name.as_str());
        total += 1;
    }
    assert_eq!(total, graph.len());
}

proptest! {
    #[test]
    fn arbitrary_edit_sequences_keep_invariants(
        edits in prop::collection::vec(edit_strategy(), 1..60),
    ) {
        let mut graph = GraphStore::new();
        for edit in edits {
            match edit {
                Edit::Add { type_ix, parent_seed } => {
                    let parents: Vec<String> = match graph.len() {
                        0 => Vec::new(),
                        n => {
                            // Zero, one, or two distinct parents.
                            let mut picked = vec![parent_seed % n];
                            if parent_seed % 3 == 0 && n > 1 {
                                let second = (parent_seed / 3) % n;
                                if second != picked[0] {
                                    picked.push(second);
                                }
                            }
                            if parent_seed % 5 == 0 {
                                picked.clear();
                            }
                            picked
                                .into_iter()
                                .filter_map(|ix| graph.names().nth(ix).map(str::to_string))
                                .collect()
                        }
                    };
                    let parent_refs: Vec<&str> = parents.iter().map(String::as_str).collect();
                    graph.add_node(TYPES[type_ix], &parent_refs).unwrap();
                }
                Edit::Rename { node_seed, to_ix } => {
                    if let Some(name) = nth_name(&graph, node_seed) {
                        graph.rename_node(&name, RENAMES[to_ix]).unwrap();
                    }
                }
                Edit::Delete { node_seed } => {
                    if let Some(name) = nth_name(&graph, node_seed) {
                        graph.delete_branch(&name).unwrap();
                    }
                }
            }
            check_invariants(&graph);
        }
    }
}
