//! Field tree builder: turns an ordered stream of [`Declaration`]s into a [`FieldTree`].
//!
//! Nesting comes only from level numbers, compared against the *cursor* (the most recently
//! declared field):
//!
//! - same level as the cursor: sibling, so the new field's parent is the cursor's parent;
//! - deeper than the cursor: child of the cursor;
//! - shallower: walk the cursor's ancestors to the one declared at the same level and become
//!   its sibling. No such ancestor is a [`LayoutError::NoMatchingAncestor`].
//!
//! ## OCCURS groups
//!
//! A group carrying OCCURS is not linked into its parent when its declaration ends. It stays
//! pending until a later declaration at the same or a lower level (or the end of input)
//! closes it. Closing a pending group that sits inside no other pending group replaces it
//! by `n` clones suffixed `-01`..; an OCCURS group inside a pending group is attached as is
//! and expanded later by [`expand`](crate::expand), so suffixes always read outer first.
//!
//! ## Errors
//!
//! Errors are collected, never fatal: the offending declaration is kept detached (it still
//! has a parent for ancestry lookups) and scanning continues, so one run reports every
//! problem. A tree with errors must not be expanded or resolved.

use crate::classify::{classify, LeafSpec, LeafType};
use crate::error::{Diagnostics, LayoutError};
use crate::event::Declaration;
use crate::field::{Field, FieldId, FieldKind, FieldTree};
use tracing::{debug, trace, warn};

pub const MAX_LEVEL: u8 = 49;

/// Suffix for the `index`-th (1-based) copy of a repeated field: `-01`, `-02`, ...
pub fn occurs_suffix(index: u32) -> String {
    format!("-{:02}", index)
}

/// Mutable state threaded through every event.
#[derive(Debug, Default)]
pub struct BuildState {
    /// Most recently declared field.
    cursor: Option<FieldId>,
    /// Group whose `BeginGroup` has been seen but not its `EndGroup`; `false` if refused.
    open_group: Option<(FieldId, bool)>,
    /// Detached OCCURS groups awaiting attachment, outermost first.
    pending: Vec<FieldId>,
    errors: Vec<LayoutError>,
}

/// Result of a build: the tree plus every error found on the way.
#[derive(Debug)]
pub struct BuildOutcome {
    pub tree: FieldTree,
    pub errors: Vec<LayoutError>,
}

impl BuildOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The tree, only if no error was recorded.
    pub fn into_result(self) -> Result<FieldTree, Diagnostics> {
        match Diagnostics::from_errors(self.errors) {
            Some(d) => Err(d),
            None => Ok(self.tree),
        }
    }
}

#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: FieldTree,
    state: BuildState,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: &Declaration) {
        apply(&mut self.tree, &mut self.state, event);
    }

    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a Declaration>) {
        for e in events {
            self.push(e);
        }
    }

    /// End of input: close the open declaration and every pending OCCURS group.
    pub fn finish(mut self) -> BuildOutcome {
        end_group_declaration(&mut self.tree, &mut self.state, true);
        close_pending(&mut self.tree, &mut self.state, 0);
        match self.tree.root() {
            None if self.state.errors.is_empty() => {
                self.state.errors.push(LayoutError::MissingRecord {
                    field: "<input>".to_string(),
                });
            }
            Some(root) if self.tree.checked_length(root).is_none() => {
                let field = self.tree[root].name.clone();
                record_error(&mut self.state, LayoutError::RecordTooLong { field });
            }
            _ => {}
        }
        debug!(
            fields = self.tree.preorder().count(),
            errors = self.state.errors.len(),
            "field tree built"
        );
        BuildOutcome {
            tree: self.tree,
            errors: self.state.errors,
        }
    }
}

/// Build a tree from a complete event list.
pub fn build(events: &[Declaration]) -> BuildOutcome {
    let mut b = TreeBuilder::new();
    b.extend(events);
    b.finish()
}

fn record_error(state: &mut BuildState, err: LayoutError) {
    warn!(error = %err, "copybook declaration rejected");
    state.errors.push(err);
}

fn apply(tree: &mut FieldTree, state: &mut BuildState, event: &Declaration) {
    match event {
        Declaration::EndGroup => end_group_declaration(tree, state, false),
        Declaration::BeginGroup {
            name,
            level,
            occurs,
        } => {
            end_group_declaration(tree, state, true);
            begin_group(tree, state, name, *level, *occurs);
        }
        Declaration::Leaf {
            name,
            level,
            picture,
            usage,
            occurs,
        } => {
            end_group_declaration(tree, state, true);
            add_leaf(tree, state, name, *level, picture, usage.as_deref(), *occurs);
        }
    }
}

/// Where a new field at `level` goes, relative to the cursor.
enum Placement {
    Under(FieldId),
    /// Rejected; the field is parked under the given parent, detached.
    Refused(FieldId, LayoutError),
}

fn locate_parent(tree: &FieldTree, cursor: FieldId, name: &str, level: u8) -> Placement {
    match ancestry_parent(tree, cursor, level) {
        Some(p) if tree[p].kind.is_elementary() => Placement::Refused(
            p,
            LayoutError::ChildOfElementary {
                field: name.to_string(),
                parent: tree[p].name.clone(),
            },
        ),
        Some(p) => Placement::Under(p),
        None => {
            let fallback = std::iter::once(cursor)
                .chain(tree.ancestors(cursor))
                .find(|&a| tree[a].level < level)
                .or(tree.root())
                .unwrap_or(cursor);
            Placement::Refused(
                fallback,
                LayoutError::NoMatchingAncestor {
                    field: name.to_string(),
                    level,
                },
            )
        }
    }
}

/// The level-ancestry rule. `None` when no ancestor is declared at `level`.
fn ancestry_parent(tree: &FieldTree, cursor: FieldId, level: u8) -> Option<FieldId> {
    let cur = &tree[cursor];
    if level > cur.level {
        return Some(cursor);
    }
    if level == cur.level {
        return cur.parent();
    }
    tree.ancestors(cursor)
        .find(|&a| tree[a].level == level)
        .and_then(|a| tree.parent(a))
}

/// Common checks for a non-record declaration. Returns the placement, or `None` when the
/// declaration cannot be placed at all.
fn place(tree: &mut FieldTree, state: &mut BuildState, name: &str, level: u8) -> Option<Placement> {
    if level == 0 || level > MAX_LEVEL {
        record_error(
            state,
            LayoutError::InvalidLevel {
                field: name.to_string(),
                level,
            },
        );
        return None;
    }
    let cursor = match state.cursor {
        Some(c) => c,
        None => {
            record_error(
                state,
                LayoutError::MissingRecord {
                    field: name.to_string(),
                },
            );
            return None;
        }
    };
    let placement = locate_parent(tree, cursor, name, level);
    close_pending(tree, state, level);
    Some(placement)
}

fn begin_group(
    tree: &mut FieldTree,
    state: &mut BuildState,
    name: &str,
    level: u8,
    occurs: Option<u32>,
) {
    if level == 1 {
        begin_record(tree, state, name);
        return;
    }
    let placement = match place(tree, state, name, level) {
        Some(p) => p,
        None => {
            // Unplaceable, but its own EndGroup must still be matched.
            let id = tree.add(Field::new(name, level, FieldKind::Group));
            state.open_group = Some((id, false));
            return;
        }
    };
    let kind = match occurs {
        Some(n) => FieldKind::OccursGroup { repeat: n },
        None => FieldKind::Group,
    };
    let id = tree.add(Field::new(name, level, kind));
    let accepted = match placement {
        Placement::Under(parent) => {
            tree.set_parent(id, parent);
            if occurs == Some(0) {
                record_error(state, LayoutError::ZeroOccurs { field: name.to_string() });
                false
            } else {
                true
            }
        }
        Placement::Refused(parent, err) => {
            tree.set_parent(id, parent);
            record_error(state, err);
            false
        }
    };
    state.open_group = Some((id, accepted));
    state.cursor = Some(id);
}

fn begin_record(tree: &mut FieldTree, state: &mut BuildState, name: &str) {
    close_pending(tree, state, 1);
    let id = tree.add(Field::new(name, 1, FieldKind::Record));
    if tree.root().is_some() {
        // Later declarations nest under this detached record and stay out of the tree.
        record_error(state, LayoutError::DuplicateRecord { field: name.to_string() });
    } else {
        tree.set_root(id);
        trace!(record = name, "record started");
    }
    state.cursor = Some(id);
}

/// Close the open group declaration. `implicit` when a following declaration or the end of
/// input closes it rather than an explicit `EndGroup`.
fn end_group_declaration(tree: &mut FieldTree, state: &mut BuildState, implicit: bool) {
    let (id, accepted) = match state.open_group.take() {
        Some(g) => g,
        None => {
            let cursor_is_record = state
                .cursor
                .map(|c| tree[c].kind == FieldKind::Record)
                .unwrap_or(false);
            // The record's own declaration also ends with EndGroup.
            if !implicit && !cursor_is_record {
                record_error(state, LayoutError::UnmatchedEndGroup);
            }
            return;
        }
    };
    if !accepted {
        return;
    }
    match tree[id].kind {
        FieldKind::OccursGroup { .. } => {
            trace!(group = %tree[id].name, "occurs group pending");
            state.pending.push(id);
        }
        _ => {
            if let Some(parent) = tree.parent(id) {
                trace!(group = %tree[id].name, "group attached");
                tree.append_child(parent, id);
            }
        }
    }
}

/// Close, innermost first, every pending OCCURS group declared at `level` or deeper.
fn close_pending(tree: &mut FieldTree, state: &mut BuildState, level: u8) {
    while let Some(&top) = state.pending.last() {
        if tree[top].level < level {
            break;
        }
        state.pending.pop();
        let enclosed = tree.ancestors(top).any(|a| state.pending.contains(&a));
        attach_repeated(tree, top, enclosed);
    }
}

/// Attach a repeated field under its recorded parent: as one field when `repeat` is 1 or
/// when an enclosing OCCURS group will be cloned later, else as `repeat` renamed clones.
fn attach_repeated(tree: &mut FieldTree, id: FieldId, enclosed: bool) {
    let parent = match tree.parent(id) {
        Some(p) => p,
        None => return,
    };
    let repeat = tree[id].kind.repeat();
    if repeat <= 1 {
        tree[id].kind = tree[id].kind.single();
        tree.append_child(parent, id);
        return;
    }
    if enclosed {
        trace!(field = %tree[id].name, repeat, "occurs left for expansion");
        tree.append_child(parent, id);
        return;
    }
    trace!(field = %tree[id].name, repeat, "occurs cloned on attach");
    for t in 1..=repeat {
        let copy = tree.clone_subtree(id, &occurs_suffix(t));
        tree[copy].kind = tree[copy].kind.single();
        tree.append_child(parent, copy);
    }
}

fn add_leaf(
    tree: &mut FieldTree,
    state: &mut BuildState,
    name: &str,
    level: u8,
    picture: &str,
    usage: Option<&str>,
    occurs: Option<u32>,
) {
    if level == 1 {
        record_error(
            state,
            LayoutError::InvalidLevel {
                field: name.to_string(),
                level,
            },
        );
        return;
    }
    let placement = match place(tree, state, name, level) {
        Some(p) => p,
        None => return,
    };
    let classified = classify(picture, usage);
    // Unclassifiable items stay detached; the placeholder type is never measured.
    let spec = classified.unwrap_or(LeafSpec {
        leaf_type: LeafType::Alpha,
        size: 0,
        scale: 0,
        signed: false,
    });
    let kind = match occurs {
        Some(n) if n != 1 => FieldKind::OccursLeaf { spec, repeat: n },
        _ => FieldKind::Leaf(spec),
    };
    let field = Field::new(name, level, kind)
        .with_clauses(Some(picture.to_string()), usage.map(str::to_string));
    let id = tree.add(field);
    state.cursor = Some(id);

    let parent = match placement {
        Placement::Under(p) => p,
        Placement::Refused(p, err) => {
            tree.set_parent(id, p);
            record_error(state, err);
            return;
        }
    };
    tree.set_parent(id, parent);
    if classified.is_none() {
        record_error(
            state,
            LayoutError::UnknownFieldType {
                field: name.to_string(),
                picture: picture.to_string(),
                usage: usage.map(str::to_string),
            },
        );
        return;
    }
    if occurs == Some(0) {
        record_error(state, LayoutError::ZeroOccurs { field: name.to_string() });
        return;
    }
    let enclosed = tree.ancestors(id).any(|a| state.pending.contains(&a));
    attach_repeated(tree, id, enclosed);
    trace!(field = name, level, "leaf attached");
}
