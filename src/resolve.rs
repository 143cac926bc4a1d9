//! Position resolution: assign every field of an expanded tree its byte offset and length.
//!
//! Leaves are laid out back to back in declaration order starting at
//! [`ResolveOptions::origin`]. A group starts where its first leaf starts and is as long as
//! its children together; it consumes no bytes of its own. Resolution depends only on the
//! tree, so running it again gives the same table.

use crate::classify::LeafType;
use crate::field::{FieldId, FieldKind, FieldTree};
use serde::Serialize;
use tracing::debug;

/// Offset of the first byte of a record. Records are 1-based unless configured otherwise.
pub const DEFAULT_ORIGIN: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub origin: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            origin: DEFAULT_ORIGIN,
        }
    }
}

/// Type column of a resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Record,
    Group,
    Alpha,
    Zoned,
    Packed,
    Binary,
}

impl From<LeafType> for FieldType {
    fn from(t: LeafType) -> Self {
        match t {
            LeafType::Alpha => FieldType::Alpha,
            LeafType::Zoned => FieldType::Zoned,
            LeafType::Packed => FieldType::Packed,
            LeafType::Binary => FieldType::Binary,
        }
    }
}

impl FieldType {
    pub fn is_structural(self) -> bool {
        matches!(self, FieldType::Record | FieldType::Group)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Record => "record",
            FieldType::Group => "group",
            FieldType::Alpha => "alpha",
            FieldType::Zoned => "zoned",
            FieldType::Packed => "packed",
            FieldType::Binary => "binary",
        }
    }
}

/// One row of the resolved layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub level: u8,
    /// Nesting depth below the record (record = 0).
    pub depth: usize,
    pub position: u32,
    pub length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Implied decimal places; numeric leaves only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
}

impl LayoutEntry {
    /// Offset one past the last byte.
    pub fn end(&self) -> u32 {
        self.position + self.length
    }
}

/// Resolved layout of one record: every field in declaration order, record first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordLayout {
    pub origin: u32,
    pub fields: Vec<LayoutEntry>,
}

impl RecordLayout {
    pub fn record(&self) -> &LayoutEntry {
        &self.fields[0]
    }

    pub fn total_length(&self) -> u32 {
        self.record().length
    }

    /// Elementary items in declaration order.
    pub fn leaves(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.fields.iter().filter(|e| !e.field_type.is_structural())
    }

    /// Record and group summary rows in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.fields.iter().filter(|e| e.field_type.is_structural())
    }

    pub fn leaf(&self, name: &str) -> Option<&LayoutEntry> {
        self.leaves().find(|e| e.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&LayoutEntry> {
        self.groups().find(|e| e.name == name)
    }
}

/// Assign positions in `tree` and return the layout table.
///
/// # Panics
///
/// If the tree has no record or still holds OCCURS fields; both mean the builder or
/// expander contract was broken. `origin` plus the record length must fit in a `u32`.
pub fn resolve(tree: &mut FieldTree, options: &ResolveOptions) -> RecordLayout {
    let root = match tree.root() {
        Some(r) => r,
        None => panic!("cannot resolve a field tree without a record"),
    };
    let order: Vec<FieldId> = tree.preorder().collect();

    let mut offset = options.origin;
    for &id in &order {
        let field = &mut tree[id];
        field.position = Some(offset);
        match field.kind {
            FieldKind::Leaf(spec) => offset += spec.length(),
            FieldKind::Record | FieldKind::Group => {}
            FieldKind::OccursGroup { .. } | FieldKind::OccursLeaf { .. } => {
                unreachable!("{} reached the resolver unexpanded", field.name)
            }
        }
    }

    // Reverse preorder visits children before their parent.
    let mut lengths = vec![0u32; tree.arena_len()];
    for &id in order.iter().rev() {
        lengths[id.index()] = match tree[id].kind {
            FieldKind::Leaf(spec) => spec.length(),
            _ => tree.children(id).map(|c| lengths[c.index()]).sum(),
        };
    }

    let mut depths = vec![0usize; tree.arena_len()];
    let mut fields = Vec::with_capacity(order.len());
    for &id in &order {
        let f = &tree[id];
        let depth = match f.parent() {
            Some(p) if id != root => depths[p.index()] + 1,
            _ => 0,
        };
        depths[id.index()] = depth;
        let field_type = match f.kind {
            FieldKind::Record => FieldType::Record,
            FieldKind::Leaf(spec) => spec.leaf_type.into(),
            _ => FieldType::Group,
        };
        let numeric = match f.kind {
            FieldKind::Leaf(spec) if spec.leaf_type != LeafType::Alpha => Some(spec),
            _ => None,
        };
        fields.push(LayoutEntry {
            name: f.name.clone(),
            field_type,
            level: f.level,
            depth,
            position: f.position.unwrap_or(options.origin),
            length: lengths[id.index()],
            picture: f.picture.clone(),
            usage: f.usage.clone(),
            scale: numeric.map(|s| s.scale),
            signed: numeric.map(|s| s.signed),
        });
    }

    debug!(
        record = %tree[root].name,
        length = lengths[root.index()],
        fields = fields.len(),
        "record layout resolved"
    );
    RecordLayout {
        origin: options.origin,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::field::Field;

    fn leaf(t: &mut FieldTree, parent: FieldId, name: &str, pic: &str, usage: Option<&str>) {
        let spec = classify(pic, usage).expect("classify");
        let id = t.add(Field::new(name, 10, FieldKind::Leaf(spec)));
        t.append_child(parent, id);
    }

    fn sample() -> FieldTree {
        let mut t = FieldTree::new();
        let rec = t.add(Field::new("REC", 1, FieldKind::Record));
        t.set_root(rec);
        leaf(&mut t, rec, "NAME", "X(10)", None);
        let g = t.add(Field::new("AMOUNTS", 5, FieldKind::Group));
        t.append_child(rec, g);
        leaf(&mut t, g, "AMT", "S9(5)", Some("COMP-3"));
        leaf(&mut t, g, "CNT", "9(4)", Some("COMP"));
        let empty = t.add(Field::new("EMPTY", 5, FieldKind::Group));
        t.append_child(rec, empty);
        leaf(&mut t, rec, "FLAG", "X", None);
        t
    }

    #[test]
    fn leaves_are_contiguous_from_origin() {
        let mut t = sample();
        let layout = resolve(&mut t, &ResolveOptions::default());
        let rows: Vec<(&str, u32, u32)> = layout
            .leaves()
            .map(|e| (e.name.as_str(), e.position, e.length))
            .collect();
        assert_eq!(
            rows,
            vec![("NAME", 1, 10), ("AMT", 11, 3), ("CNT", 14, 2), ("FLAG", 16, 1)]
        );
        assert_eq!(layout.total_length(), 16);

        let amt = layout.leaf("AMT").expect("AMT");
        assert_eq!((amt.scale, amt.signed), (Some(0), Some(true)));
        let name = layout.leaf("NAME").expect("NAME");
        assert_eq!((name.scale, name.signed), (None, None));
    }

    #[test]
    fn group_starts_at_first_leaf() {
        let mut t = sample();
        let layout = resolve(&mut t, &ResolveOptions::default());
        let g = layout.group("AMOUNTS").expect("group");
        assert_eq!((g.position, g.length, g.depth), (11, 5, 1));
        let empty = layout.group("EMPTY").expect("empty group");
        assert_eq!((empty.position, empty.length), (16, 0));
        assert_eq!(layout.record().field_type, FieldType::Record);
    }

    #[test]
    fn zero_origin() {
        let mut t = sample();
        let layout = resolve(&mut t, &ResolveOptions { origin: 0 });
        assert_eq!(layout.leaf("NAME").map(|e| e.position), Some(0));
        assert_eq!(layout.leaf("FLAG").map(|e| e.end()), Some(16));
    }

    #[test]
    fn second_resolution_is_identical() {
        let mut t = sample();
        let first = resolve(&mut t, &ResolveOptions::default());
        let positions: Vec<Option<u32>> = t.preorder().map(|id| t[id].position).collect();
        let second = resolve(&mut t, &ResolveOptions::default());
        assert_eq!(first, second);
        let again: Vec<Option<u32>> = t.preorder().map(|id| t[id].position).collect();
        assert_eq!(positions, again);
    }
}
