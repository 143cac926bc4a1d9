//! Format a resolved layout for display (indented table, one-line summaries).

use crate::resolve::{LayoutEntry, RecordLayout};

const NAME_WIDTH: usize = 32;

/// `PIC X(10) COMP-3` style clause text for a leaf; empty for groups.
pub fn clause_text(entry: &LayoutEntry) -> String {
    let mut parts = Vec::new();
    if let Some(p) = &entry.picture {
        parts.push(format!("PIC {}", p));
    }
    if let Some(u) = &entry.usage {
        parts.push(u.clone());
    }
    parts.join(" ")
}

/// One row: name indented by depth, then level, type, position, length and clauses.
pub fn entry_line(entry: &LayoutEntry) -> String {
    let pad = "  ".repeat(entry.depth);
    let name = format!("{}{}", pad, entry.name);
    let line = format!(
        "{:<width$} {:02} {:<6} {:>6} {:>6}  {}",
        name,
        entry.level,
        entry.field_type.as_str(),
        entry.position,
        entry.length,
        clause_text(entry),
        width = NAME_WIDTH,
    );
    line.trim_end().to_string()
}

/// Whole layout as a text table with a header, one row per field in declaration order.
pub fn render_table(layout: &RecordLayout) -> String {
    let mut lines: Vec<String> = vec![format!(
        "{:<width$} {:>2} {:<6} {:>6} {:>6}",
        "FIELD",
        "LV",
        "TYPE",
        "POS",
        "LEN",
        width = NAME_WIDTH,
    )];
    lines.extend(layout.fields.iter().map(entry_line));
    lines.join("\n")
}

/// First line of a layout (for log and status output).
pub fn summary_line(layout: &RecordLayout) -> String {
    let record = layout.record();
    format!(
        "{}: {} bytes, {} fields ({} elementary)",
        record.name,
        record.length,
        layout.fields.len(),
        layout.leaves().count()
    )
}
