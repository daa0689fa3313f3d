//! Grid addressing and cell types for sheets-orm.
//!
//! # Modules
//!
//! - [`column`] - zero-based column index ⇄ letter identifier
//! - [`range`] - A1 range construction and parsing
//! - [`coerce`] - raw cell → typed value conversion
//!
//! # Example
//!
//! ```
//! use sheet_types::{column_letter, terminal_row, A1Range, CellRef};
//!
//! assert_eq!(column_letter(27), "AB");
//!
//! let range = A1Range::between("Users", CellRef::new(0, 2), CellRef::new(2, 2));
//! assert_eq!(range.to_string(), "Users!A2:C2");
//! assert_eq!(terminal_row("Users!A2:C2").unwrap(), 2);
//! ```

pub mod coerce;
pub mod column;
pub mod range;

pub use coerce::{
    cell_text, coerce_cell, is_blank, join_multi_value, split_multi_value, CellValue, CoerceError,
    ScalarType, MULTI_VALUE_SEPARATOR,
};
pub use column::{column_index, column_letter};
pub use range::{terminal_column, terminal_row, A1Range, CellRef, RangeParseError};
