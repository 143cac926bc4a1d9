//! Field type classifier: maps a (picture, usage) pair to a leaf type and its byte length.
//!
//! | Usage | Picture | Type | Bytes |
//! |-------|---------|------|-------|
//! | none / `DISPLAY` | `X`, `A` | [`LeafType::Alpha`] | characters |
//! | none / `DISPLAY` | `S9..V9..` | [`LeafType::Zoned`] | digits |
//! | `COMP-3`, `PACKED-DECIMAL` | `S9..V9..` | [`LeafType::Packed`] | `(digits + 1) / 2` |
//! | `COMP`, `COMP-4`, `COMP-5`, `BINARY` | `S9..V9..` (≤ 18 digits) | [`LeafType::Binary`] | 2 / 4 / 8 |
//!
//! Anything else is unclassifiable.

use std::fmt;

/// Storage type of an elementary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafType {
    Alpha,
    Zoned,
    Packed,
    Binary,
}

impl LeafType {
    /// Byte length for `size` picture positions (characters for Alpha, digits otherwise).
    pub fn byte_length(self, size: u32) -> u32 {
        match self {
            LeafType::Alpha | LeafType::Zoned => size,
            // Two digits per byte plus the sign nibble: (digits + 1) / 2.
            LeafType::Packed => size.div_ceil(2),
            LeafType::Binary => binary_length(size),
        }
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeafType::Alpha => "alpha",
            LeafType::Zoned => "zoned",
            LeafType::Packed => "packed",
            LeafType::Binary => "binary",
        };
        f.write_str(s)
    }
}

fn binary_length(digits: u32) -> u32 {
    match digits {
        0..=4 => 2,
        5..=9 => 4,
        _ => 8,
    }
}

const MAX_BINARY_DIGITS: u32 = 18;

/// Storage encoding from a USAGE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    Display,
    Packed,
    Binary,
}

impl Usage {
    /// `None` for usages no rule covers (COMP-1, POINTER, ...).
    pub fn parse(text: &str) -> Option<Usage> {
        let upper = text.trim().to_ascii_uppercase();
        match upper.as_str() {
            "" | "DISPLAY" => Some(Usage::Display),
            "COMP-3" | "COMPUTATIONAL-3" | "PACKED-DECIMAL" => Some(Usage::Packed),
            "COMP" | "COMP-4" | "COMP-5" | "COMPUTATIONAL" | "COMPUTATIONAL-4"
            | "COMPUTATIONAL-5" | "BINARY" => Some(Usage::Binary),
            _ => None,
        }
    }
}

/// Broad shape of a picture string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureCategory {
    Alphanumeric,
    Numeric,
}

/// What a picture string says about storage: its category and number of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Picture {
    pub category: PictureCategory,
    /// Characters (alphanumeric) or digits (numeric); sign and implied point excluded.
    pub size: u32,
    pub scale: u32,
    pub signed: bool,
}

impl Picture {
    /// Analyse a picture string such as `X(10)`, `S9(5)V99` or `AAA`.
    /// Returns `None` for edited or otherwise unsupported pictures.
    pub fn parse(text: &str) -> Option<Picture> {
        let upper = text.trim().to_ascii_uppercase();
        let chars: Vec<char> = upper.chars().collect();
        let mut i = 0;
        let mut size = 0u32;
        let mut scale = 0u32;
        let mut signed = false;
        let mut seen_v = false;
        let mut has_digit = false;
        let mut has_alpha = false;

        while i < chars.len() {
            let ch = chars[i];
            i += 1;
            let mut count = 1u32;
            if chars.get(i) == Some(&'(') {
                let close = chars[i..].iter().position(|&c| c == ')')? + i;
                let digits: String = chars[i + 1..close].iter().collect();
                count = digits.trim().parse().ok()?;
                i = close + 1;
            }
            match ch {
                'X' | 'A' => {
                    has_alpha = true;
                    size = size.checked_add(count)?;
                }
                '9' => {
                    has_digit = true;
                    size = size.checked_add(count)?;
                    if seen_v {
                        scale += count;
                    }
                }
                // Sign only leads, once.
                'S' if size == 0 && !signed && !seen_v && count == 1 => signed = true,
                'V' if !seen_v && count == 1 => seen_v = true,
                _ => return None,
            }
        }

        if size == 0 {
            return None;
        }
        let category = match (has_alpha, has_digit) {
            (true, false) if !signed && !seen_v => PictureCategory::Alphanumeric,
            (false, true) => PictureCategory::Numeric,
            _ => return None,
        };
        Some(Picture {
            category,
            size,
            scale,
            signed,
        })
    }
}

/// A classified elementary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafSpec {
    pub leaf_type: LeafType,
    /// Picture positions the length is derived from.
    pub size: u32,
    /// Digits after the implied decimal point.
    pub scale: u32,
    pub signed: bool,
}

impl LeafSpec {
    pub fn length(&self) -> u32 {
        self.leaf_type.byte_length(self.size)
    }
}

/// Classify a picture and optional usage clause. `None` when no rule applies.
pub fn classify(picture: &str, usage: Option<&str>) -> Option<LeafSpec> {
    let pic = Picture::parse(picture)?;
    let usage = match usage {
        Some(u) => Usage::parse(u)?,
        None => Usage::Display,
    };
    let leaf_type = match (usage, pic.category) {
        (Usage::Display, PictureCategory::Alphanumeric) => LeafType::Alpha,
        (Usage::Display, PictureCategory::Numeric) => LeafType::Zoned,
        (Usage::Packed, PictureCategory::Numeric) => LeafType::Packed,
        (Usage::Binary, PictureCategory::Numeric) if pic.size <= MAX_BINARY_DIGITS => {
            LeafType::Binary
        }
        _ => return None,
    };
    Some(LeafSpec {
        leaf_type,
        size: pic.size,
        scale: pic.scale,
        signed: pic.signed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picture_repeat_counts() {
        let p = Picture::parse("x(10)").expect("alpha");
        assert_eq!(p.category, PictureCategory::Alphanumeric);
        assert_eq!(p.size, 10);

        let p = Picture::parse("S9(5)V99").expect("numeric");
        assert_eq!(p.category, PictureCategory::Numeric);
        assert_eq!(p.size, 7);
        assert_eq!(p.scale, 2);
        assert!(p.signed);

        assert_eq!(Picture::parse("AAXX").map(|p| p.size), Some(4));
    }

    #[test]
    fn picture_rejects_unsupported_shapes() {
        assert!(Picture::parse("").is_none());
        assert!(Picture::parse("ZZ9.99").is_none());
        assert!(Picture::parse("X9").is_none());
        assert!(Picture::parse("SX(3)").is_none());
        assert!(Picture::parse("9V9V9").is_none());
        assert!(Picture::parse("9S").is_none());
        assert!(Picture::parse("9(").is_none());
    }

    #[test]
    fn display_usage_rules() {
        let a = classify("X(10)", None).expect("alpha");
        assert_eq!(a.leaf_type, LeafType::Alpha);
        assert_eq!(a.length(), 10);

        let z = classify("S9(4)V9", Some("DISPLAY")).expect("zoned");
        assert_eq!(z.leaf_type, LeafType::Zoned);
        assert_eq!(z.length(), 5);
        assert_eq!((z.scale, z.signed), (1, true));
    }

    #[test]
    fn packed_length_formula() {
        assert_eq!(classify("S9(4)", Some("COMP-3")).map(|s| s.length()), Some(2));
        assert_eq!(classify("S9(5)", Some("comp-3")).map(|s| s.length()), Some(3));
        assert_eq!(classify("S9(7)V99", Some("PACKED-DECIMAL")).map(|s| s.length()), Some(5));
        assert_eq!(LeafType::Packed.byte_length(1), 1);
    }

    #[test]
    fn binary_length_table() {
        for (pic, len) in [("9(4)", 2), ("S9(5)", 4), ("9(9)", 4), ("S9(10)", 8), ("9(18)", 8)] {
            for usage in ["COMP", "COMP-4", "COMP-5", "BINARY"] {
                let spec = classify(pic, Some(usage)).expect("binary");
                assert_eq!(spec.leaf_type, LeafType::Binary);
                assert_eq!(spec.length(), len, "{} {}", pic, usage);
            }
        }
        assert!(classify("9(19)", Some("COMP")).is_none());
    }

    #[test]
    fn unknown_combinations() {
        assert!(classify("X(4)", Some("COMP-3")).is_none());
        assert!(classify("X(4)", Some("COMP")).is_none());
        assert!(classify("9(4)", Some("COMP-1")).is_none());
        assert!(classify("9(4)", Some("POINTER")).is_none());
    }
}
