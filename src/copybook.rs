//! Copybook text front end: parse data description entries into [`Declaration`] events
//! using PEST.
//!
//! Only what the layout needs is understood: level, name, `PIC`, `USAGE`, `OCCURS n` and
//! `VALUE` (skipped). An entry with a picture becomes a [`Declaration::Leaf`]; an entry
//! without one becomes `BeginGroup` + `EndGroup`. Level-88 condition names hold no storage
//! and are dropped. Unnamed entries are `FILLER`.
//!
//! ```text
//!        01  CUSTOMER-REC.
//!            05  CUST-NAME       PIC X(30).
//!            05  BALANCE         PIC S9(7)V99 COMP-3.
//!            05  PHONES OCCURS 2 TIMES.
//!                10  PHONE       PIC X(12).
//! ```

use crate::event::Declaration;
use pest::Parser;
use pest_derive::Parser as PestParser;
use tracing::debug;

#[derive(PestParser)]
#[grammar = "copybook.pest"]
struct CopybookParser;

/// Column conventions of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// Columns 1-6 sequence area, column 7 indicator (`*`, `/` or `D` skips the line),
    /// columns 8-72 program text, 73+ ignored.
    #[default]
    Fixed,
    /// Whole line is program text; `*>` starts a comment.
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOptions {
    pub format: SourceFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CopybookError {
    #[error("Parse error: {0}")]
    Syntax(String),
    #[error("line {line}: level number {text} out of range")]
    Level { line: usize, text: String },
    #[error("line {line}: OCCURS count {text} out of range")]
    Occurs { line: usize, text: String },
}

const INDICATOR_COLUMN: usize = 6;
const TEXT_END_COLUMN: usize = 72;

/// Strip fixed-format sequence, indicator and identification areas. Comment lines become
/// empty so line numbers in parse errors still match the source.
pub fn normalize(source: &str, format: SourceFormat) -> String {
    match format {
        SourceFormat::Free => source.to_string(),
        SourceFormat::Fixed => {
            let mut out = String::with_capacity(source.len());
            for line in source.lines() {
                let chars: Vec<char> = line.chars().collect();
                let indicator = chars.get(INDICATOR_COLUMN).copied().unwrap_or(' ');
                if !matches!(indicator, '*' | '/' | 'D' | 'd') && chars.len() > INDICATOR_COLUMN {
                    let end = chars.len().min(TEXT_END_COLUMN);
                    out.extend(&chars[INDICATOR_COLUMN + 1..end]);
                }
                out.push('\n');
            }
            out
        }
    }
}

/// Parse copybook source into declaration events.
pub fn parse_copybook(source: &str, options: &ParseOptions) -> Result<Vec<Declaration>, CopybookError> {
    let text = normalize(source, options.format);
    let pairs = CopybookParser::parse(Rule::copybook, &text)
        .map_err(|e| CopybookError::Syntax(e.to_string()))?;
    let mut events = Vec::new();
    for pair in pairs.flatten().filter(|p| p.as_rule() == Rule::entry) {
        build_entry(pair, &mut events)?;
    }
    debug!(events = events.len(), "copybook parsed");
    Ok(events)
}

const CONDITION_LEVEL: u8 = 88;

fn build_entry(
    pair: pest::iterators::Pair<Rule>,
    out: &mut Vec<Declaration>,
) -> Result<(), CopybookError> {
    let (line, _) = pair.as_span().start_pos().line_col();
    let mut level = None;
    let mut name = None;
    let mut picture = None;
    let mut usage = None;
    let mut occurs = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::level => {
                let text = inner.as_str();
                let n = text.parse::<u8>().map_err(|_| CopybookError::Level {
                    line,
                    text: text.to_string(),
                })?;
                level = Some(n);
            }
            Rule::data_name => name = Some(inner.as_str().to_ascii_uppercase()),
            Rule::picture => {
                picture = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::pic_string)
                    .map(|p| p.as_str().to_string());
            }
            Rule::usage => {
                usage = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::usage_kind)
                    .map(|p| p.as_str().to_ascii_uppercase());
            }
            Rule::occurs => {
                if let Some(count) = inner.into_inner().find(|p| p.as_rule() == Rule::occurs_count) {
                    let text = count.as_str();
                    let n = text.parse::<u32>().map_err(|_| CopybookError::Occurs {
                        line,
                        text: text.to_string(),
                    })?;
                    occurs = Some(n);
                }
            }
            _ => {}
        }
    }

    let level = match level {
        Some(l) => l,
        None => return Err(CopybookError::Syntax(format!("line {}: entry without level", line))),
    };
    if level == CONDITION_LEVEL {
        return Ok(());
    }
    let name = name.unwrap_or_else(|| "FILLER".to_string());
    match picture {
        Some(picture) => out.push(Declaration::Leaf {
            name,
            level,
            picture,
            usage,
            occurs,
        }),
        None => {
            // A group-level USAGE applies to its members; the layout does not need it.
            out.push(Declaration::BeginGroup {
                name,
                level,
                occurs,
            });
            out.push(Declaration::EndGroup);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free(src: &str) -> Vec<Declaration> {
        parse_copybook(src, &ParseOptions { format: SourceFormat::Free }).expect("parse")
    }

    #[test]
    fn group_and_leaves() {
        let events = free("01 REC.\n  05 NAME PIC X(10).\n  05 AMT PIC S9(5) COMP-3.\n");
        assert_eq!(
            events,
            vec![
                Declaration::group("REC", 1),
                Declaration::EndGroup,
                Declaration::leaf("NAME", 5, "X(10)"),
                Declaration::leaf_with_usage("AMT", 5, "S9(5)", "COMP-3"),
            ]
        );
    }

    #[test]
    fn occurs_and_value_clauses() {
        let events = free(
            "01 R.\n 05 T OCCURS 3 TIMES.\n  10 V PIC 9(4) VALUE ZERO.\n 05 F PIC X VALUE 'Y'.\n  88 IS-ON VALUE 'Y' 'y'.\n",
        );
        assert_eq!(events.len(), 6);
        assert_eq!(events[2], Declaration::occurs_group("T", 5, 3));
        assert_eq!(events[5], Declaration::leaf("F", 5, "X"));
    }

    #[test]
    fn fixed_format_areas_are_ignored() {
        let src = "000100 01  REC.                                                          SEQ00001\n\
                   000200*    THIS IS A COMMENT\n\
                   000300     05  FLD PIC X(4).\n";
        let events = parse_copybook(src, &ParseOptions::default()).expect("parse");
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], Declaration::leaf("FLD", 5, "X(4)"));
    }

    #[test]
    fn unnamed_entry_is_filler() {
        let events = free("01 R.\n 05 PIC X(2).\n");
        assert_eq!(events[2].name(), Some("FILLER"));
    }

    #[test]
    fn syntax_error_is_reported() {
        let err = parse_copybook("01 R\n", &ParseOptions { format: SourceFormat::Free })
            .expect_err("missing period");
        assert!(matches!(err, CopybookError::Syntax(_)));
    }
}
