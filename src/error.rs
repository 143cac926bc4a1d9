//! Errors raised while building a field tree, and the diagnostics list handed back to callers.
//!
//! The builder and classifier never stop at the first problem: every [`LayoutError`] is
//! collected so a copybook with several independent mistakes reports them all at once.

use std::fmt;

/// The two error families a copybook can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A level number does not fit the nesting built so far.
    StructuralLevel,
    /// A picture/usage pair matches no known field type.
    UnknownFieldType,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("{field} references level {level} with no matching ancestor")]
    NoMatchingAncestor { field: String, level: u8 },
    #[error("{field} is declared under elementary item {parent}")]
    ChildOfElementary { field: String, parent: String },
    #[error("{field} is declared before any level 01 record")]
    MissingRecord { field: String },
    #[error("{field} starts a second level 01 record")]
    DuplicateRecord { field: String },
    #[error("{field} has invalid level {level}")]
    InvalidLevel { field: String, level: u8 },
    #[error("end of group declaration without a matching group")]
    UnmatchedEndGroup,
    #[error("{field} has OCCURS 0")]
    ZeroOccurs { field: String },
    #[error("{field} is longer than {} bytes once expanded", u32::MAX)]
    RecordTooLong { field: String },
    #[error("{field} has unrecognized picture/usage combination")]
    UnknownFieldType {
        field: String,
        picture: String,
        usage: Option<String>,
    },
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayoutError::UnknownFieldType { .. } => ErrorKind::UnknownFieldType,
            _ => ErrorKind::StructuralLevel,
        }
    }
}

/// All errors collected for one copybook. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<LayoutError>,
}

impl Diagnostics {
    /// Wrap collected errors; `None` when there is nothing to report.
    pub fn from_errors(errors: Vec<LayoutError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Diagnostics { errors })
        }
    }

    pub fn errors(&self) -> &[LayoutError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable message per error, in the order they were found.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind() == kind).count()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl From<LayoutError> for Diagnostics {
    fn from(error: LayoutError) -> Self {
        Diagnostics {
            errors: vec![error],
        }
    }
}

/// Failure of the text-in, layout-out convenience path.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Copybook: {0}")]
    Copybook(#[from] crate::copybook::CopybookError),
    #[error("Layout:\n{0}")]
    Layout(#[from] Diagnostics),
}
