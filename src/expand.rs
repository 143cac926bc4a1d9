//! OCCURS expansion: replace every repeated field by concrete, uniquely named copies.
//!
//! A field with `OCCURS n` (n > 1) becomes `n` siblings spliced into its place, each a copy
//! of its whole subtree with `-01`, `-02`, ... appended to every name in the copy. The tree
//! is scanned repeatedly: one scan expands each repeated field it meets once and steps over
//! the inserted copies, so OCCURS fields nested inside them are handled by the next scan.
//! Scanning stops when a scan finds nothing to expand. Nested `OCCURS 2` inside `OCCURS 2`
//! therefore yields `X-01-01, X-01-02, X-02-01, X-02-02`.
//!
//! Input must be an error-free tree from the [builder](crate::builder).

use crate::builder::occurs_suffix;
use crate::field::{FieldId, FieldTree};
use tracing::debug;

/// What an expansion run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandStats {
    /// Full-tree scans, including the final one that found nothing.
    pub scans: usize,
    /// Repeated fields replaced.
    pub expanded: usize,
}

/// Expand all OCCURS fields to a fixed point.
pub fn expand(tree: &mut FieldTree) -> ExpandStats {
    let mut stats = ExpandStats::default();
    let root = match tree.root() {
        Some(r) => r,
        None => return stats,
    };
    loop {
        stats.scans += 1;
        let n = expand_scan(tree, root);
        debug!(scan = stats.scans, expanded = n, "occurs expansion scan");
        if n == 0 {
            break;
        }
        stats.expanded += n;
    }
    debug_assert_eq!(tree.repeated_count(), 0);
    stats
}

/// One preorder pass. Returns how many repeated fields were expanded.
fn expand_scan(tree: &mut FieldTree, root: FieldId) -> usize {
    let mut expanded = 0;
    let mut cur = tree.preorder_next(root);
    while let Some(id) = cur {
        if tree[id].kind.is_repeated() {
            let last = expand_one(tree, id);
            expanded += 1;
            cur = tree.next_after_subtree(last);
        } else {
            cur = tree.preorder_next(id);
        }
    }
    expanded
}

/// Replace `id` by its copies; returns the last field of the inserted block.
fn expand_one(tree: &mut FieldTree, id: FieldId) -> FieldId {
    let repeat = tree[id].kind.repeat();
    if repeat <= 1 {
        tree[id].kind = tree[id].kind.single();
        return id;
    }
    let copies: Vec<FieldId> = (1..=repeat)
        .map(|t| {
            let copy = tree.clone_subtree(id, &occurs_suffix(t));
            tree[copy].kind = tree[copy].kind.single();
            copy
        })
        .collect();
    tree.splice(id, &copies);
    copies[copies.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::field::{Field, FieldKind};

    fn leaf_names(tree: &FieldTree) -> Vec<String> {
        tree.leaves().map(|id| tree[id].name.clone()).collect()
    }

    /// REC { G occurs 2 { H occurs 2 { X } }, TAIL }
    fn nested() -> FieldTree {
        let mut t = FieldTree::new();
        let rec = t.add(Field::new("REC", 1, FieldKind::Record));
        t.set_root(rec);
        let g = t.add(Field::new("G", 5, FieldKind::OccursGroup { repeat: 2 }));
        t.append_child(rec, g);
        let h = t.add(Field::new("H", 10, FieldKind::OccursGroup { repeat: 2 }));
        t.append_child(g, h);
        let spec = classify("X", None).expect("alpha");
        let x = t.add(Field::new("X", 15, FieldKind::Leaf(spec)));
        t.append_child(h, x);
        let tail = t.add(Field::new("TAIL", 5, FieldKind::Leaf(spec)));
        t.append_child(rec, tail);
        t
    }

    #[test]
    fn nested_occurs_expand_outer_then_inner() {
        let mut t = nested();
        let stats = expand(&mut t);
        assert_eq!(
            leaf_names(&t),
            vec!["X-01-01", "X-01-02", "X-02-01", "X-02-02", "TAIL"]
        );
        // G, then both copies of H, then a clean scan.
        assert_eq!(stats, ExpandStats { scans: 3, expanded: 3 });
        assert_eq!(t.repeated_count(), 0);
    }

    #[test]
    fn group_names_carry_suffixes() {
        let mut t = nested();
        expand(&mut t);
        let groups: Vec<String> = t
            .preorder()
            .filter(|&id| t[id].kind == FieldKind::Group)
            .map(|id| t[id].name.clone())
            .collect();
        assert_eq!(
            groups,
            vec!["G-01", "H-01-01", "H-01-02", "G-02", "H-02-01", "H-02-02"]
        );
    }

    #[test]
    fn length_is_preserved_by_expansion() {
        let mut t = nested();
        let root = t.root().expect("root");
        let before = t.length(root);
        expand(&mut t);
        assert_eq!(t.length(root), before);
        assert_eq!(before, 5);
    }

    #[test]
    fn repeat_of_one_is_demoted_in_place() {
        let mut t = FieldTree::new();
        let rec = t.add(Field::new("REC", 1, FieldKind::Record));
        t.set_root(rec);
        let g = t.add(Field::new("G", 5, FieldKind::OccursGroup { repeat: 1 }));
        t.append_child(rec, g);
        expand(&mut t);
        assert_eq!(t[g].name, "G");
        assert_eq!(t[g].kind, FieldKind::Group);
    }

    #[test]
    fn tree_without_occurs_needs_one_scan() {
        let mut t = FieldTree::new();
        let rec = t.add(Field::new("REC", 1, FieldKind::Record));
        t.set_root(rec);
        assert_eq!(expand(&mut t), ExpandStats { scans: 1, expanded: 0 });
    }
}
