//! Field tree model: an arena of fields addressed by [`FieldId`].
//!
//! Each field stores its parent, first/last child and previous/next sibling as indices. The
//! parent owns its children; the sibling chain keeps declaration order. The preorder
//! "next in declaration" relation ([`FieldTree::preorder_next`]) is derived from these links
//! on demand and never stored.
//!
//! A field may carry a `parent` while not yet being linked into that parent's child chain.
//! The builder uses this for declarations whose attachment is deferred (OCCURS groups) or
//! refused (erroneous declarations): ancestry can still be walked upward, but traversal from
//! the root never reaches them.

use crate::classify::{LeafSpec, LeafType};
use std::ops::{Index, IndexMut};

/// Index of a field in its [`FieldTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Field variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The level 01 root.
    Record,
    Group,
    /// A group with an OCCURS clause still to be expanded. `repeat` is at least 1.
    OccursGroup { repeat: u32 },
    /// Elementary item: Alpha, Zoned, Packed or Binary.
    Leaf(LeafSpec),
    /// Elementary item with an OCCURS clause still to be expanded.
    OccursLeaf { spec: LeafSpec, repeat: u32 },
}

impl FieldKind {
    pub fn is_leaf(&self) -> bool {
        matches!(self, FieldKind::Leaf(_))
    }

    /// Leaf, repeated or not.
    pub fn is_elementary(&self) -> bool {
        matches!(self, FieldKind::Leaf(_) | FieldKind::OccursLeaf { .. })
    }

    /// OCCURS count still to be expanded; 1 for anything not repeated.
    pub fn repeat(&self) -> u32 {
        match self {
            FieldKind::OccursGroup { repeat } | FieldKind::OccursLeaf { repeat, .. } => *repeat,
            _ => 1,
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self, FieldKind::OccursGroup { .. } | FieldKind::OccursLeaf { .. })
    }

    /// The same kind with its OCCURS clause dropped.
    pub fn single(self) -> FieldKind {
        match self {
            FieldKind::OccursGroup { .. } => FieldKind::Group,
            FieldKind::OccursLeaf { spec, .. } => FieldKind::Leaf(spec),
            other => other,
        }
    }

    pub fn leaf_type(&self) -> Option<LeafType> {
        match self {
            FieldKind::Leaf(spec) | FieldKind::OccursLeaf { spec, .. } => Some(spec.leaf_type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub level: u8,
    pub kind: FieldKind,
    pub picture: Option<String>,
    pub usage: Option<String>,
    /// Absolute byte offset; `None` until resolved.
    pub position: Option<u32>,
    parent: Option<FieldId>,
    first_child: Option<FieldId>,
    last_child: Option<FieldId>,
    prev_sibling: Option<FieldId>,
    next_sibling: Option<FieldId>,
}

impl Field {
    pub fn new(name: impl Into<String>, level: u8, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            level,
            kind,
            picture: None,
            usage: None,
            position: None,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub fn with_clauses(mut self, picture: Option<String>, usage: Option<String>) -> Self {
        self.picture = picture;
        self.usage = usage;
        self
    }

    pub fn parent(&self) -> Option<FieldId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<FieldId> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<FieldId> {
        self.next_sibling
    }

    pub fn prev_sibling(&self) -> Option<FieldId> {
        self.prev_sibling
    }
}

/// Arena-backed field tree rooted at a single Record.
#[derive(Debug, Clone, Default)]
pub struct FieldTree {
    nodes: Vec<Field>,
    root: Option<FieldId>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<FieldId> {
        self.root
    }

    pub fn set_root(&mut self, id: FieldId) {
        self.root = Some(id);
    }

    /// Add a detached field to the arena.
    pub fn add(&mut self, field: Field) -> FieldId {
        let id = FieldId(self.nodes.len());
        let mut field = field;
        field.parent = None;
        field.first_child = None;
        field.last_child = None;
        field.prev_sibling = None;
        field.next_sibling = None;
        self.nodes.push(field);
        id
    }

    /// Record `parent` as the owner of `id` without linking it into the child chain.
    pub fn set_parent(&mut self, id: FieldId, parent: FieldId) {
        self[id].parent = Some(parent);
    }

    pub fn parent(&self, id: FieldId) -> Option<FieldId> {
        self[id].parent
    }

    /// Link `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: FieldId, child: FieldId) {
        debug_assert!(!self[parent].kind.is_elementary(), "elementary items own no children");
        let last = self[parent].last_child;
        {
            let c = &mut self[child];
            c.parent = Some(parent);
            c.prev_sibling = last;
            c.next_sibling = None;
        }
        match last {
            Some(l) => self[l].next_sibling = Some(child),
            None => self[parent].first_child = Some(child),
        }
        self[parent].last_child = Some(child);
    }

    /// Put `replacements` in the sibling chain where `old` sits, in order. `old` becomes
    /// detached; the flanking siblings are relinked to the first and last replacement.
    pub fn splice(&mut self, old: FieldId, replacements: &[FieldId]) {
        let parent = match self[old].parent {
            Some(p) => p,
            None => unreachable!("splice target {} is not owned by a parent", self[old].name),
        };
        let prev = self[old].prev_sibling;
        let next = self[old].next_sibling;
        let (first, last) = match (replacements.first(), replacements.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => {
                // Nothing to insert: unlink only.
                match prev {
                    Some(p) => self[p].next_sibling = next,
                    None => self[parent].first_child = next,
                }
                match next {
                    Some(n) => self[n].prev_sibling = prev,
                    None => self[parent].last_child = prev,
                }
                self.unlink_fields(old);
                return;
            }
        };

        let mut before = prev;
        for &r in replacements {
            let f = &mut self[r];
            f.parent = Some(parent);
            f.prev_sibling = before;
            if let Some(b) = before {
                self[b].next_sibling = Some(r);
            }
            before = Some(r);
        }
        if prev.is_none() {
            self[parent].first_child = Some(first);
        }
        self[last].next_sibling = next;
        match next {
            Some(n) => self[n].prev_sibling = Some(last),
            None => self[parent].last_child = Some(last),
        }
        self.unlink_fields(old);
    }

    fn unlink_fields(&mut self, id: FieldId) {
        let f = &mut self[id];
        f.prev_sibling = None;
        f.next_sibling = None;
    }

    /// Copy the subtree at `src` with `suffix` appended to every name. The copy is detached
    /// and the source subtree is left untouched.
    pub fn clone_subtree(&mut self, src: FieldId, suffix: &str) -> FieldId {
        let source = &self[src];
        let copy = Field {
            name: format!("{}{}", source.name, suffix),
            position: None,
            ..source.clone()
        };
        let new_id = self.add(copy);
        let children: Vec<FieldId> = self.children(src).collect();
        for child in children {
            let child_copy = self.clone_subtree(child, suffix);
            self.append_child(new_id, child_copy);
        }
        new_id
    }

    /// Children of `id` in declaration order.
    pub fn children(&self, id: FieldId) -> Children<'_> {
        Children {
            tree: self,
            next: self[id].first_child,
        }
    }

    /// Next field in declaration order: first child, else next sibling, else the next sibling
    /// of the nearest ancestor that has one.
    pub fn preorder_next(&self, id: FieldId) -> Option<FieldId> {
        if let Some(child) = self[id].first_child {
            return Some(child);
        }
        self.next_after_subtree(id)
    }

    /// Next field in declaration order that is not inside the subtree of `id`.
    pub fn next_after_subtree(&self, id: FieldId) -> Option<FieldId> {
        let mut cur = id;
        loop {
            if Some(cur) == self.root {
                return None;
            }
            if let Some(sib) = self[cur].next_sibling {
                return Some(sib);
            }
            cur = self[cur].parent?;
        }
    }

    /// All fields reachable from the root, in declaration order (root first).
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            next: self.root,
        }
    }

    /// Fields above `id`, nearest first.
    pub fn ancestors(&self, id: FieldId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self[id].parent,
        }
    }

    /// Byte length: leaf length from its picture, or the sum of the children's lengths.
    /// A field still carrying OCCURS counts every repetition. Saturates at `u32::MAX`.
    pub fn length(&self, id: FieldId) -> u32 {
        self.checked_length(id).unwrap_or(u32::MAX)
    }

    /// [`length`](Self::length), or `None` if it does not fit in a `u32`.
    pub fn checked_length(&self, id: FieldId) -> Option<u32> {
        match self[id].kind {
            FieldKind::Leaf(spec) => Some(spec.length()),
            FieldKind::OccursLeaf { spec, repeat } => spec.length().checked_mul(repeat),
            FieldKind::OccursGroup { repeat } => self.children_length(id)?.checked_mul(repeat),
            FieldKind::Record | FieldKind::Group => self.children_length(id),
        }
    }

    fn children_length(&self, id: FieldId) -> Option<u32> {
        self.children(id)
            .try_fold(0u32, |acc, c| acc.checked_add(self.checked_length(c)?))
    }

    /// First field reachable from the root with this name.
    pub fn find(&self, name: &str) -> Option<FieldId> {
        self.preorder().find(|&id| self[id].name == name)
    }

    /// Reachable fields still carrying an OCCURS clause.
    pub fn repeated_count(&self) -> usize {
        self.preorder().filter(|&id| self[id].kind.is_repeated()).count()
    }

    /// Reachable leaves in declaration order.
    pub fn leaves(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.preorder().filter(move |&id| self[id].kind.is_leaf())
    }

    /// Arena size, including detached fields.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }
}

impl Index<FieldId> for FieldTree {
    type Output = Field;

    fn index(&self, id: FieldId) -> &Field {
        &self.nodes[id.0]
    }
}

impl IndexMut<FieldId> for FieldTree {
    fn index_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.nodes[id.0]
    }
}

pub struct Children<'a> {
    tree: &'a FieldTree,
    next: Option<FieldId>,
}

impl Iterator for Children<'_> {
    type Item = FieldId;

    fn next(&mut self) -> Option<FieldId> {
        let cur = self.next?;
        self.next = self.tree[cur].next_sibling;
        Some(cur)
    }
}

pub struct Preorder<'a> {
    tree: &'a FieldTree,
    next: Option<FieldId>,
}

impl Iterator for Preorder<'_> {
    type Item = FieldId;

    fn next(&mut self) -> Option<FieldId> {
        let cur = self.next?;
        self.next = self.tree.preorder_next(cur);
        Some(cur)
    }
}

pub struct Ancestors<'a> {
    tree: &'a FieldTree,
    next: Option<FieldId>,
}

impl Iterator for Ancestors<'_> {
    type Item = FieldId;

    fn next(&mut self) -> Option<FieldId> {
        let cur = self.next?;
        self.next = self.tree[cur].parent;
        Some(cur)
    }
}
