//! A1-style range addressing (`'tab name'!C2:I`, `Sheet1!A1:ZZ`, `Sheet1`).

use crate::utils::error::{ListingError, Result};
use std::fmt;

/// `A` -> 0, `Z` -> 25, `AA` -> 26
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut index: usize = 0;
    for c in letters.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet: String,
    pub start_column: usize,
    /// 1-based
    pub start_row: usize,
    /// `None` only for a whole-sheet range
    pub end_column: Option<usize>,
    /// `None` means open ended
    pub end_row: Option<usize>,
}

impl SheetRange {
    pub fn whole(sheet: &str) -> Self {
        Self {
            sheet: sheet.to_string(),
            start_column: 0,
            start_row: 1,
            end_column: None,
            end_row: None,
        }
    }

    pub fn cell(sheet: &str, column: usize, row: usize) -> Self {
        Self {
            sheet: sheet.to_string(),
            start_column: column,
            start_row: row.max(1),
            end_column: Some(column),
            end_row: Some(row.max(1)),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let fail = |reason: &str| ListingError::InvalidRangeError {
            range: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (sheet, cells) = split_sheet(trimmed).ok_or_else(|| fail("unbalanced quotes"))?;
        if sheet.trim().is_empty() {
            return Err(fail("sheet name is empty"));
        }

        let Some(cells) = cells else {
            return Ok(Self::whole(&sheet));
        };

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };
        let (start_column, start_row) =
            parse_cell(start).ok_or_else(|| fail("invalid start cell"))?;
        let start_row = start_row.unwrap_or(1);

        let (end_column, end_row) = match end {
            Some(end) => {
                let (column, row) = parse_cell(end).ok_or_else(|| fail("invalid end cell"))?;
                (column, row)
            }
            None => (start_column, Some(start_row)),
        };

        if end_column < start_column {
            return Err(fail("end column is before start column"));
        }
        if end_row.is_some_and(|row| row < start_row) {
            return Err(fail("end row is before start row"));
        }

        Ok(Self {
            sheet,
            start_column,
            start_row,
            end_column: Some(end_column),
            end_row,
        })
    }

    /// 0-based row indices covered by the range inside a grid of `total` rows
    pub fn row_span(&self, total: usize) -> std::ops::Range<usize> {
        let start = (self.start_row - 1).min(total);
        let end = self.end_row.map(|row| row.min(total)).unwrap_or(total);
        start..end.max(start)
    }

    /// 0-based column indices covered by the range inside a row of `total` cells
    pub fn column_span(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.start_column.min(total);
        let end = self
            .end_column
            .map(|column| (column + 1).min(total))
            .unwrap_or(total);
        start..end.max(start)
    }
}

fn split_sheet(input: &str) -> Option<(String, Option<&str>)> {
    if let Some(rest) = input.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if let Some((_, '\'')) = chars.peek() {
                    chars.next();
                    name.push('\'');
                    continue;
                }
                let after = &rest[i + 1..];
                return match after.strip_prefix('!') {
                    Some(cells) => Some((name, Some(cells))),
                    None if after.is_empty() => Some((name, None)),
                    None => None,
                };
            }
            name.push(c);
        }
        return None;
    }

    match input.split_once('!') {
        Some((sheet, cells)) => Some((sheet.to_string(), Some(cells))),
        None => Some((input.to_string(), None)),
    }
}

fn parse_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let cell = cell.trim();
    let split = cell
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    let column = column_index(letters)?;
    if digits.is_empty() {
        return Some((column, None));
    }
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((column, Some(row)))
}

fn quote_sheet(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sheet = quote_sheet(&self.sheet);
        let Some(end_column) = self.end_column else {
            return f.write_str(&sheet);
        };
        let start = format!("{}{}", column_letters(self.start_column), self.start_row);
        if end_column == self.start_column && self.end_row == Some(self.start_row) {
            return write!(f, "{}!{}", sheet, start);
        }
        let end_row = self.end_row.map(|row| row.to_string()).unwrap_or_default();
        write!(f, "{}!{}:{}{}", sheet, start, column_letters(end_column), end_row)
    }
}
