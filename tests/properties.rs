//! Property tests over generated record descriptions: contiguity, sizes and idempotence.

use copybook_layout::{build, expand, layout, resolve, Declaration, ResolveOptions};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        picture: String,
        usage: Option<&'static str>,
        length: u32,
        occurs: u32,
    },
    Group {
        occurs: u32,
        children: Vec<Node>,
    },
}

fn binary_length(digits: u32) -> u32 {
    match digits {
        1..=4 => 2,
        5..=9 => 4,
        _ => 8,
    }
}

fn leaf_strategy() -> impl Strategy<Value = Node> {
    let kind = prop_oneof![
        (1u32..40).prop_map(|n| (format!("X({})", n), None, n)),
        (1u32..18).prop_map(|n| (format!("S9({})", n), None, n)),
        (1u32..18).prop_map(|n| (format!("S9({})V99", n), Some("COMP-3"), (n + 3) / 2)),
        (1u32..=18).prop_map(|n| (format!("9({})", n), Some("COMP"), binary_length(n))),
    ];
    (kind, 1u32..4).prop_map(|((picture, usage, length), occurs)| Node::Leaf {
        picture,
        usage,
        length,
        occurs,
    })
}

fn node_strategy() -> impl Strategy<Value = Node> {
    leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        (1u32..4, prop::collection::vec(inner, 1..4))
            .prop_map(|(occurs, children)| Node::Group { occurs, children })
    })
}

fn record_strategy() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(node_strategy(), 1..5)
}

fn repeat(occurs: u32) -> Option<u32> {
    if occurs > 1 {
        Some(occurs)
    } else {
        None
    }
}

fn emit(node: &Node, depth: u8, counter: &mut usize, out: &mut Vec<Declaration>) {
    *counter += 1;
    let name = format!("F{}", counter);
    let level = depth * 5;
    match node {
        Node::Leaf {
            picture,
            usage,
            occurs,
            ..
        } => out.push(Declaration::Leaf {
            name,
            level,
            picture: picture.clone(),
            usage: usage.map(String::from),
            occurs: repeat(*occurs),
        }),
        Node::Group { occurs, children } => {
            out.push(Declaration::BeginGroup {
                name,
                level,
                occurs: repeat(*occurs),
            });
            out.push(Declaration::EndGroup);
            for c in children {
                emit(c, depth + 1, counter, out);
            }
        }
    }
}

fn declarations(nodes: &[Node]) -> Vec<Declaration> {
    let mut out = vec![Declaration::group("REC", 1), Declaration::EndGroup];
    let mut counter = 0;
    for n in nodes {
        emit(n, 1, &mut counter, &mut out);
    }
    out
}

fn model_length(node: &Node) -> u32 {
    match node {
        Node::Leaf { length, occurs, .. } => length * occurs,
        Node::Group { occurs, children } => children.iter().map(model_length).sum::<u32>() * occurs,
    }
}

fn model_leaves(node: &Node) -> usize {
    match node {
        Node::Leaf { occurs, .. } => *occurs as usize,
        Node::Group { occurs, children } => {
            children.iter().map(model_leaves).sum::<usize>() * *occurs as usize
        }
    }
}

proptest! {
    #[test]
    fn leaves_are_contiguous_from_origin(nodes in record_strategy(), origin in 0u32..3) {
        let events = declarations(&nodes);
        let l = layout(&events, &ResolveOptions { origin })
            .map_err(|d| TestCaseError::fail(d.to_string()))?;

        let mut next = origin;
        for e in l.leaves() {
            prop_assert_eq!(e.position, next, "{}", e.name);
            prop_assert!(e.length > 0);
            next = e.end();
        }
        let total: u32 = nodes.iter().map(model_length).sum();
        prop_assert_eq!(l.total_length(), total);
        prop_assert_eq!(next, origin + total);
        prop_assert_eq!(l.record().position, origin);
        prop_assert_eq!(l.leaves().count(), nodes.iter().map(model_leaves).sum::<usize>());
    }

    #[test]
    fn groups_span_their_members(nodes in record_strategy()) {
        let events = declarations(&nodes);
        let l = layout(&events, &ResolveOptions::default())
            .map_err(|d| TestCaseError::fail(d.to_string()))?;
        let record_end = l.record().end();
        for (i, g) in l.fields.iter().enumerate().filter(|(_, e)| e.field_type.is_structural()) {
            prop_assert!(g.end() <= record_end);
            // Members follow the group in declaration order at a greater depth.
            let members_len: u32 = l.fields[i + 1..]
                .iter()
                .take_while(|e| e.depth > g.depth)
                .filter(|e| !e.field_type.is_structural())
                .map(|e| e.length)
                .sum();
            prop_assert_eq!(members_len, g.length, "{}", g.name);
            if let Some(first) = l.fields.get(i + 1).filter(|e| e.depth > g.depth) {
                prop_assert_eq!(first.position, g.position, "{}", g.name);
            }
        }
    }

    #[test]
    fn expanded_names_are_unique(nodes in record_strategy()) {
        let events = declarations(&nodes);
        let l = layout(&events, &ResolveOptions::default())
            .map_err(|d| TestCaseError::fail(d.to_string()))?;
        let mut seen = HashSet::new();
        for e in &l.fields {
            prop_assert!(seen.insert(e.name.clone()), "duplicate {}", e.name);
        }
    }

    #[test]
    fn resolution_is_idempotent(nodes in record_strategy(), origin in 0u32..3) {
        let events = declarations(&nodes);
        let mut tree = build(&events)
            .into_result()
            .map_err(|d| TestCaseError::fail(d.to_string()))?;
        expand(&mut tree);
        let options = ResolveOptions { origin };
        let first = resolve(&mut tree, &options);
        let second = resolve(&mut tree, &options);
        prop_assert_eq!(first, second);
    }
}
