use super::*;

fn diamond(graph: &mut GraphStore) -> (String, String, String, String) {
    let a = graph.add_node("a", &[]).unwrap().name.clone();
    let b = graph.add_node("b", &[a.as_str()]).unwrap().name.clone();
    let c = graph.add_node("c", &[a.as_str()]).unwrap().name.clone();
    let d = graph
        .add_node("d", &[b.as_str(), c.as_str()])
        .unwrap()
        .name
        .clone();
    (a, b, c, d)
}

#[test]
fn add_node_allocates_unique_names() {
    let mut graph = GraphStore::new();
    assert_eq!(graph.add_node("load", &[]).unwrap().name, "load");
    assert_eq!(graph.add_node("load", &[]).unwrap().name, "load_1");
    assert_eq!(graph.add_node("load", &[]).unwrap().name, "load_2");
}

#[test]
fn add_node_rejects_unknown_parent() {
    let mut graph = GraphStore::new();
    let err = graph.add_node("filter", &["ghost"]).unwrap_err();
    assert!(matches!(err, GraphError::UnknownParent { name } if name == "ghost"));
    assert!(graph.is_empty());
}

#[test]
fn add_node_registers_edges_both_ways() {
    let mut graph = GraphStore::new();
    let load = graph.add_node("load", &[]).unwrap().name.clone();
    let filter = graph
        .add_node("filter", &[load.as_str()])
        .unwrap()
        .name
        .clone();

    assert_eq!(graph.get(&load).unwrap().children, vec![filter.clone()]);
    assert_eq!(graph.get(&filter).unwrap().parents, vec![load]);
}

#[test]
fn rename_uniquifies_and_rewrites_edges() {
    let mut graph = GraphStore::new();
    let load = graph.add_node("load", &[]).unwrap().name.clone();
    let filter = graph.add_node("filter", &[load.as_str()]).unwrap().name.clone();

    let renamed = graph.rename_node(&load, "source").unwrap();
    assert_eq!(renamed, "source");
    assert!(graph.get("load").is_none());
    assert_eq!(graph.get(&filter).unwrap().parents, vec!["source"]);
    assert_eq!(graph.get("source").unwrap().children, vec![filter]);
}

#[test]
fn rename_collision_appends_suffix() {
    let mut graph = GraphStore::new();
    graph.add_node("a", &[]).unwrap();
    let b = graph.add_node("b", &[]).unwrap().name.clone();
    assert_eq!(graph.rename_node(&b, "a").unwrap(), "a_1");
}

#[test]
fn rename_to_own_name_is_stable() {
    let mut graph = GraphStore::new();
    let a = graph.add_node("a", &[]).unwrap().name.clone();
    assert_eq!(graph.rename_node(&a, "a").unwrap(), "a");
    assert!(graph.contains("a"));
}

#[test]
fn delete_branch_cascades_to_orphans_only() {
    // a → b, a → c, b → d, c → d: deleting a removes b and c, which
    // removes both of d's parents, so d goes too.
    let mut graph = GraphStore::new();
    let (a, ..) = diamond(&mut graph);
    let deleted = graph.delete_branch(&a).unwrap();
    assert_eq!(deleted.len(), 4);
    assert!(graph.is_empty());
}

#[test]
fn delete_branch_keeps_children_with_surviving_parents() {
    let mut graph = GraphStore::new();
    let (a, _, _, d) = diamond(&mut graph);
    // Give d a parent outside the doomed branch.
    let keep = graph.add_node("keep", &[]).unwrap().name.clone();
    graph.get_mut(&d).unwrap().parents.push(keep.clone());
    graph.get_mut(&keep).unwrap().children.push(d.clone());

    let deleted = graph.delete_branch(&a).unwrap();
    assert_eq!(deleted.len(), 3);
    // d survives with only the outside edge left.
    assert_eq!(graph.get(&d).unwrap().parents, vec![keep]);
}

#[test]
fn delete_branch_leaves_no_dangling_references() {
    let mut graph = GraphStore::new();
    let (_, b, ..) = diamond(&mut graph);
    graph.delete_branch(&b).unwrap();
    for node in graph.iter() {
        for parent in &node.parents {
            assert!(graph.contains(parent), "dangling parent {parent}");
        }
        for child in &node.children {
            assert!(graph.contains(child), "dangling child {child}");
        }
    }
}

#[test]
fn delete_branch_deep_chain() {
    // A long straight chain exercises the worklist, not the call stack.
    let mut graph = GraphStore::new();
    let mut prev = graph.add_node("n", &[]).unwrap().name.clone();
    for _ in 0..2_000 {
        prev = graph.add_node("n", &[prev.as_str()]).unwrap().name.clone();
    }
    let deleted = graph.delete_branch("n").unwrap();
    assert_eq!(deleted.len(), 2_001);
    assert!(graph.is_empty());
}

#[test]
fn topological_order_is_parents_first_and_stable() {
    let mut graph = GraphStore::new();
    let (a, b, c, d) = diamond(&mut graph);
    let order: Vec<_> = graph.topological_order().map(|n| n.name.clone()).collect();
    assert_eq!(order, vec![a, b, c, d]);
}

#[test]
fn topological_order_breaks_ties_by_insertion() {
    let mut graph = GraphStore::new();
    let z = graph.add_node("z", &[]).unwrap().name.clone();
    let a = graph.add_node("a", &[]).unwrap().name.clone();
    let m = graph.add_node("m", &[a.as_str(), z.as_str()]).unwrap().name.clone();
    let order: Vec<_> = graph.topological_order().map(|n| n.name.clone()).collect();
    assert_eq!(order, vec![z, a, m]);
}
