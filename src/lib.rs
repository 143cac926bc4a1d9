//! # copybook_layout: COBOL Copybook Record Layouts
//!
//! Turns a COBOL record description (a copybook) into a fixed-format byte layout: every
//! field with its type, 1-based position and length, every `OCCURS` table expanded into
//! uniquely named copies.
//!
//! ## Pipeline
//!
//! - **Events**: ordered [`Declaration`]s (`BeginGroup` / `EndGroup` / `Leaf`), produced by
//!   any front end; [`copybook`] parses copybook text with a PEST grammar
//! - **Builder**: nests declarations by level number into a [`FieldTree`], classifying
//!   elementary items and collecting every error
//! - **Expander**: replaces each remaining `OCCURS n` field by `n` suffixed copies
//! - **Resolver**: assigns contiguous positions and group lengths, giving a [`RecordLayout`]
//!
//! ## Field types
//!
//! | Picture / usage | Type | Bytes |
//! |-----------------|------|-------|
//! | `X(n)` | alpha | n |
//! | `S9(n)` | zoned | n |
//! | `S9(n) COMP-3` | packed | (n + 1) / 2 |
//! | `S9(n) COMP` | binary | 2 / 4 / 8 |
//!
//! ## Example
//!
//! ```text
//! 01  CUSTOMER.
//!     05  NAME      PIC X(10).
//!     05  AMOUNT    PIC S9(5) COMP-3.
//! ```
//!
//! resolves to `NAME` at 1 (10 bytes), `AMOUNT` at 11 (3 bytes), record length 13.

pub mod builder;
pub mod classify;
pub mod copybook;
pub mod dump;
pub mod error;
pub mod event;
pub mod expand;
pub mod field;
pub mod resolve;

pub use builder::{build, BuildOutcome, TreeBuilder};
pub use classify::{classify, LeafSpec, LeafType};
pub use copybook::{parse_copybook, CopybookError, ParseOptions, SourceFormat};
pub use error::{Diagnostics, Error, ErrorKind, LayoutError};
pub use event::Declaration;
pub use expand::{expand, ExpandStats};
pub use field::{Field, FieldId, FieldKind, FieldTree};
pub use resolve::{resolve, FieldType, LayoutEntry, RecordLayout, ResolveOptions};

/// Options for the text-in, layout-out path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutOptions {
    pub parse: ParseOptions,
    pub resolve: ResolveOptions,
}

/// Build, expand and resolve a declaration stream.
///
/// Returns every builder error at once if the declarations are inconsistent; nothing is
/// expanded or resolved in that case. A record that does not fit after `options.origin`
/// is rejected the same way.
pub fn layout(events: &[Declaration], options: &ResolveOptions) -> Result<RecordLayout, Diagnostics> {
    let mut tree = build(events).into_result()?;
    if let Some(root) = tree.root() {
        let fits = tree
            .checked_length(root)
            .and_then(|len| options.origin.checked_add(len))
            .is_some();
        if !fits {
            let field = tree[root].name.clone();
            return Err(LayoutError::RecordTooLong { field }.into());
        }
    }
    expand(&mut tree);
    Ok(resolve(&mut tree, options))
}

/// Parse copybook text and resolve its layout.
pub fn layout_from_source(source: &str, options: &LayoutOptions) -> Result<RecordLayout, Error> {
    let events = parse_copybook(source, &options.parse)?;
    Ok(layout(&events, &options.resolve)?)
}
