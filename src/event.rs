//! Declaration events: the ordered input the tree builder consumes.
//!
//! A group declaration arrives as [`Declaration::BeginGroup`] followed by
//! [`Declaration::EndGroup`] once its own clauses are read; the group's members are the
//! declarations that follow, nested by level number.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    BeginGroup {
        name: String,
        level: u8,
        occurs: Option<u32>,
    },
    EndGroup,
    Leaf {
        name: String,
        level: u8,
        picture: String,
        usage: Option<String>,
        occurs: Option<u32>,
    },
}

impl Declaration {
    pub fn group(name: impl Into<String>, level: u8) -> Self {
        Declaration::BeginGroup {
            name: name.into(),
            level,
            occurs: None,
        }
    }

    pub fn occurs_group(name: impl Into<String>, level: u8, times: u32) -> Self {
        Declaration::BeginGroup {
            name: name.into(),
            level,
            occurs: Some(times),
        }
    }

    pub fn leaf(name: impl Into<String>, level: u8, picture: impl Into<String>) -> Self {
        Declaration::Leaf {
            name: name.into(),
            level,
            picture: picture.into(),
            usage: None,
            occurs: None,
        }
    }

    pub fn leaf_with_usage(
        name: impl Into<String>,
        level: u8,
        picture: impl Into<String>,
        usage: impl Into<String>,
    ) -> Self {
        Declaration::Leaf {
            name: name.into(),
            level,
            picture: picture.into(),
            usage: Some(usage.into()),
            occurs: None,
        }
    }

    /// Set the OCCURS count on a group or leaf declaration.
    pub fn times(mut self, n: u32) -> Self {
        match &mut self {
            Declaration::BeginGroup { occurs, .. } | Declaration::Leaf { occurs, .. } => {
                *occurs = Some(n)
            }
            Declaration::EndGroup => {}
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Declaration::BeginGroup { name, .. } | Declaration::Leaf { name, .. } => Some(name),
            Declaration::EndGroup => None,
        }
    }
}
