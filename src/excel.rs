use rust_decimal::{Decimal, prelude::ToPrimitive};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::AppResult;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::Text).unwrap_or(Cell::Empty)
    }
}

impl From<Decimal> for Cell {
    fn from(value: Decimal) -> Self {
        Cell::Number(value.to_f64().unwrap_or_default())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number(value as f64)
    }
}

/// A worksheet: optional bold header row followed by data rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<&'static str>,
    pub widths: Vec<f64>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: &[(&'static str, f64)]) -> Self {
        Self {
            name: name.into(),
            headers: columns.iter().map(|(h, _)| *h).collect(),
            widths: columns.iter().map(|(_, w)| *w).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn build_workbook(sheets: &[Sheet]) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, width) in sheet.widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }

        let mut first_row = 0;
        if !sheet.headers.is_empty() {
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
            }
            first_row = 1;
        }

        for (offset, row) in sheet.rows.iter().enumerate() {
            let row_idx = first_row + offset as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string(row_idx, col as u16, text)?;
                    }
                    Cell::Number(number) => {
                        worksheet.write_number(row_idx, col as u16, *number)?;
                    }
                    Cell::Empty => {}
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_is_a_zip_archive() {
        let mut sheet = Sheet::new("Orders", &[("Code", 12.0), ("Total", 12.0)]);
        sheet.push(vec!["ORD-1".into(), Decimal::new(12345, 2).into()]);
        sheet.push(vec![Cell::Empty, 3_i64.into()]);
        let bytes = build_workbook(&[sheet]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn decimals_become_numbers() {
        assert_eq!(Cell::from(Decimal::new(150, 1)), Cell::Number(15.0));
        assert_eq!(Cell::from(None::<String>), Cell::Empty);
    }

    #[test]
    fn invalid_sheet_names_are_rejected() {
        let sheet = Sheet::new("bad[name]", &[]);
        assert!(build_workbook(&[sheet]).is_err());
    }
}
