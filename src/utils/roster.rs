use log::{debug, info};
use crate::errors::GenerationError;
use crate::models::StudentRecord;

/// Students typed in by hand. Identifiers are unique within this list only.
#[derive(Debug, Default, Clone)]
pub struct ManualRoster {
    students: Vec<StudentRecord>,
}

impl ManualRoster {
    pub fn new() -> Self {
        Self::default()
    }

    // Rejected entries leave the roster untouched.
    pub fn add(&mut self, record: StudentRecord) -> Result<(), GenerationError> {
        let name = record.name.trim();
        let identifier = record.identifier.trim();
        if name.is_empty() || identifier.is_empty() {
            return Err(GenerationError::IncompleteStudent);
        }
        if self.students.iter().any(|s| s.identifier == identifier) {
            return Err(GenerationError::DuplicateIdentifier(identifier.to_string()));
        }

        info!("Student {} added to the list", name);
        self.students.push(StudentRecord::new(name, identifier));
        Ok(())
    }

    pub fn students(&self) -> &[StudentRecord] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

// Spreadsheet rows come first, in file order, then the manual entries.
pub fn merge(spreadsheet: Vec<StudentRecord>, manual: &ManualRoster) -> Result<Vec<StudentRecord>, GenerationError> {
    let from_sheet = spreadsheet.len();
    let mut all_students = spreadsheet;
    all_students.extend(manual.students().iter().cloned());

    if all_students.is_empty() {
        return Err(GenerationError::EmptyRoster);
    }

    debug!("Roster merged: {} from spreadsheet, {} manual", from_sheet, manual.len());
    Ok(all_students)
}

/// Parses a `NAME:ID` pair as given on the command line. The identifier is
/// everything after the last colon.
pub fn parse_student_arg(arg: &str) -> Result<StudentRecord, GenerationError> {
    let (name, identifier) = arg.rsplit_once(':').ok_or(GenerationError::IncompleteStudent)?;
    Ok(StudentRecord::new(name.trim(), identifier.trim()))
}
