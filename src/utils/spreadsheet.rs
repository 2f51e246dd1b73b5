use std::path::Path;
use calamine::{open_workbook_auto, Data, Range, Reader};
use log::{info, warn};
use crate::errors::GenerationError;
use crate::models::StudentRecord;

pub const NAME_COLUMN: &str = "Nombre";
pub const ID_COLUMN: &str = "Cedula";

// Reads the students from the first sheet of the workbook.
pub fn read_roster(path: &Path) -> Result<Vec<StudentRecord>, GenerationError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| GenerationError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| GenerationError::Spreadsheet(format!("{}: el archivo no tiene hojas", path.display())))?
        .map_err(|e| GenerationError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    let students = rows_from_range(&range);
    info!("{} students read from {}", students.len(), path.display());
    Ok(students)
}

/// The first row is the header. Only the `Nombre` and `Cedula` columns are
/// read; a missing column leaves that field empty on every row.
pub fn rows_from_range(range: &Range<Data>) -> Vec<StudentRecord> {
    let mut rows = range.rows();
    let header = match rows.next() {
        Some(header) => header,
        None => return Vec::new(),
    };

    let column = |wanted: &str| header.iter().position(|cell| cell_text(cell) == wanted);
    let name_col = column(NAME_COLUMN);
    let id_col = column(ID_COLUMN);
    if name_col.is_none() {
        warn!("Column {} not found in spreadsheet header", NAME_COLUMN);
    }
    if id_col.is_none() {
        warn!("Column {} not found in spreadsheet header", ID_COLUMN);
    }

    let field = |row: &[Data], col: Option<usize>| {
        col.and_then(|c| row.get(c)).map(cell_text).unwrap_or_default()
    };

    rows.filter(|row| row.iter().any(|cell| !cell_text(cell).is_empty()))
        .map(|row| StudentRecord::new(field(row, name_col), field(row, id_col)))
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // Identity numbers are often typed as plain numbers.
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}
