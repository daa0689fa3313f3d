//! A1-notation ranges.
//!
//! A range identifier has the shape `Sheet!A1:C3`. The sheet part is
//! optional on input to [`A1Range::from_str`] only when the whole identifier
//! is a sheet name: `Data` means every cell of sub-grid `Data`. Sheet names
//! containing anything other than ASCII alphanumerics or `_` are quoted with
//! single quotes, and an embedded quote is doubled (`'Bob''s data'!A1`).
//!
//! Either side of a cell reference may be open: `A:C` spans whole columns,
//! `2:4` whole rows.

use std::fmt;
use std::str::FromStr;

use crate::column::{column_index, column_letter};

/// Error returned when a range identifier cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeParseError {
    /// Range text was empty
    #[error("range is empty")]
    Empty,

    /// Quoted sheet name was never closed
    #[error("unterminated sheet name quote in '{0}'")]
    UnterminatedQuote(String),

    /// Cell reference is not letters followed by digits
    #[error("invalid cell reference '{cell}' in range '{range}'")]
    InvalidCell { range: String, cell: String },

    /// Range has no cell part to recover a position from
    #[error("range '{0}' has no cell reference")]
    MissingCells(String),

    /// Terminal cell carries no row number
    #[error("range '{0}' does not end in a row number")]
    MissingRow(String),

    /// Terminal cell carries no column letter
    #[error("range '{0}' does not end in a column letter")]
    MissingColumn(String),
}

/// One side of an A1 range. Both parts are optional so that whole-row and
/// whole-column ranges can be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// Zero-based column index
    pub column: Option<usize>,
    /// One-based row number
    pub row: Option<u32>,
}

impl CellRef {
    /// A fully specified cell.
    pub fn new(column: usize, row: u32) -> Self {
        Self {
            column: Some(column),
            row: Some(row),
        }
    }

    /// A whole column.
    pub fn column(column: usize) -> Self {
        Self {
            column: Some(column),
            row: None,
        }
    }

    fn parse(text: &str, range: &str) -> Result<Self, RangeParseError> {
        let invalid = || RangeParseError::InvalidCell {
            range: range.to_string(),
            cell: text.to_string(),
        };

        let cleaned: String = text.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(cleaned.len());
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() && digits.is_empty() {
            return Err(invalid());
        }

        let column = if letters.is_empty() {
            None
        } else {
            Some(column_index(letters).ok_or_else(invalid)?)
        };
        let row = if digits.is_empty() {
            None
        } else {
            let row: u32 = digits.parse().map_err(|_| invalid())?;
            if row == 0 {
                return Err(invalid());
            }
            Some(row)
        };

        Ok(Self { column, row })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(column) = self.column {
            write!(f, "{}", column_letter(column))?;
        }
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

/// A parsed or constructed A1 range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    /// Sub-grid name, unquoted
    pub sheet: Option<String>,
    /// First cell; `None` means the whole sheet
    pub start: Option<CellRef>,
    /// Last cell; `None` for single-cell ranges
    pub end: Option<CellRef>,
}

impl A1Range {
    /// Every cell of a sub-grid.
    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            sheet: Some(name.into()),
            start: None,
            end: None,
        }
    }

    /// A rectangular range between two cells (inclusive).
    pub fn between(name: impl Into<String>, start: CellRef, end: CellRef) -> Self {
        Self {
            sheet: Some(name.into()),
            start: Some(start),
            end: Some(end),
        }
    }

    /// The terminal cell: the end cell if present, otherwise the start cell.
    pub fn terminal(&self) -> Option<&CellRef> {
        self.end.as_ref().or(self.start.as_ref())
    }
}

fn needs_quotes(name: &str) -> bool {
    name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if needs_quotes(sheet) {
                write!(f, "'{}'", sheet.replace('\'', "''"))?;
            } else {
                write!(f, "{sheet}")?;
            }
            if self.start.is_some() {
                write!(f, "!")?;
            }
        }
        if let Some(start) = &self.start {
            write!(f, "{start}")?;
        }
        if let Some(end) = &self.end {
            write!(f, ":{end}")?;
        }
        Ok(())
    }
}

impl FromStr for A1Range {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(RangeParseError::Empty);
        }

        let (sheet, cells) = if let Some(rest) = text.strip_prefix('\'') {
            let mut name = String::new();
            let mut chars = rest.char_indices().peekable();
            let mut close = None;
            while let Some((i, c)) = chars.next() {
                if c == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        name.push('\'');
                        chars.next();
                        continue;
                    }
                    close = Some(i);
                    break;
                }
                name.push(c);
            }
            let close = close.ok_or_else(|| RangeParseError::UnterminatedQuote(s.to_string()))?;
            let remainder = &rest[close + 1..];
            let cells = match remainder.strip_prefix('!') {
                Some(cells) => Some(cells),
                None if remainder.is_empty() => None,
                None => {
                    return Err(RangeParseError::InvalidCell {
                        range: s.to_string(),
                        cell: remainder.to_string(),
                    })
                }
            };
            (Some(name), cells)
        } else {
            match text.rsplit_once('!') {
                Some((sheet, cells)) => (Some(sheet.to_string()), Some(cells)),
                None => (Some(text.to_string()), None),
            }
        };

        let (start, end) = match cells {
            None | Some("") => (None, None),
            Some(cells) => match cells.split_once(':') {
                Some((a, b)) => (Some(CellRef::parse(a, s)?), Some(CellRef::parse(b, s)?)),
                None => (Some(CellRef::parse(cells, s)?), None),
            },
        };

        Ok(Self { sheet, start, end })
    }
}

/// Recover the row number of the last cell in a written range.
///
/// `Data!A5:C5` yields `5`. Fails when the range has no cell part or its
/// terminal cell has no row.
pub fn terminal_row(range: &str) -> Result<u32, RangeParseError> {
    let parsed: A1Range = range.parse()?;
    let cell = parsed
        .terminal()
        .ok_or_else(|| RangeParseError::MissingCells(range.to_string()))?;
    cell.row
        .ok_or_else(|| RangeParseError::MissingRow(range.to_string()))
}

/// Recover the column letter of the last cell in a written range.
///
/// `Data!B1:B3` yields `"B"`.
pub fn terminal_column(range: &str) -> Result<String, RangeParseError> {
    let parsed: A1Range = range.parse()?;
    let cell = parsed
        .terminal()
        .ok_or_else(|| RangeParseError::MissingCells(range.to_string()))?;
    cell.column
        .map(column_letter)
        .ok_or_else(|| RangeParseError::MissingColumn(range.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain_and_quoted() {
        let range = A1Range::between("Users", CellRef::new(0, 2), CellRef::new(2, 2));
        assert_eq!(range.to_string(), "Users!A2:C2");

        let range = A1Range::between("My Users", CellRef::new(1, 1), CellRef::new(1, 1000));
        assert_eq!(range.to_string(), "'My Users'!B1:B1000");

        let range = A1Range::sheet("Bob's");
        assert_eq!(range.to_string(), "'Bob''s'");
    }

    #[test]
    fn test_parse_full_range() {
        let range: A1Range = "Users!A2:C5".parse().unwrap();
        assert_eq!(range.sheet.as_deref(), Some("Users"));
        assert_eq!(range.start, Some(CellRef::new(0, 2)));
        assert_eq!(range.end, Some(CellRef::new(2, 5)));
    }

    #[test]
    fn test_parse_quoted_sheet() {
        let range: A1Range = "'Bob''s data'!$B$1:B3".parse().unwrap();
        assert_eq!(range.sheet.as_deref(), Some("Bob's data"));
        assert_eq!(range.start, Some(CellRef::new(1, 1)));
        assert_eq!(range.end, Some(CellRef::new(1, 3)));
    }

    #[test]
    fn test_parse_open_ranges() {
        let range: A1Range = "Data!A:XXX".parse().unwrap();
        assert_eq!(range.start, Some(CellRef::column(0)));
        assert_eq!(range.end.and_then(|c| c.row), None);

        let range: A1Range = "Data".parse().unwrap();
        assert_eq!(range, A1Range::sheet("Data"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<A1Range>(), Err(RangeParseError::Empty));
        assert!(matches!(
            "'Unclosed!A1".parse::<A1Range>(),
            Err(RangeParseError::UnterminatedQuote(_))
        ));
        assert!(matches!(
            "Data!A0".parse::<A1Range>(),
            Err(RangeParseError::InvalidCell { .. })
        ));
        assert!(matches!(
            "Data!1A".parse::<A1Range>(),
            Err(RangeParseError::InvalidCell { .. })
        ));
    }

    #[test]
    fn test_terminal_row() {
        assert_eq!(terminal_row("Users!A5:C5"), Ok(5));
        assert_eq!(terminal_row("'My Users'!A2:C17"), Ok(17));
        assert_eq!(terminal_row("Users!D9"), Ok(9));
        assert!(matches!(
            terminal_row("Users!A:C"),
            Err(RangeParseError::MissingRow(_))
        ));
        assert!(matches!(
            terminal_row("Users"),
            Err(RangeParseError::MissingCells(_))
        ));
    }

    #[test]
    fn test_terminal_column() {
        assert_eq!(terminal_column("Users!B1:B3").as_deref(), Ok("B"));
        assert_eq!(terminal_column("Users!A1:AB3").as_deref(), Ok("AB"));
        assert!(matches!(
            terminal_column("Users!2:4"),
            Err(RangeParseError::MissingColumn(_))
        ));
    }
}
