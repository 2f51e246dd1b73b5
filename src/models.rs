use std::fmt;
use clap::ValueEnum;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub name: String,
    pub identifier: String,
}

impl StudentRecord {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        StudentRecord {
            name: name.into(),
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CourseType {
    /// Course with internship (280h)
    Pasantia,
    /// Short course (36h)
    Corto,
    /// Custom course
    Nuevo,
}

impl CourseType {
    // Identifier understood by the certificate service.
    pub fn wire_id(self) -> u8 {
        match self {
            CourseType::Nuevo => 0,
            CourseType::Pasantia => 1,
            CourseType::Corto => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CourseType::Pasantia => "Curso con Pasantía (280h)",
            CourseType::Corto => "Curso Corto (36h)",
            CourseType::Nuevo => "Curso Personalizado",
        }
    }
}

impl fmt::Display for CourseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CourseType::Pasantia => "pasantia",
            CourseType::Corto => "corto",
            CourseType::Nuevo => "nuevo",
        };
        f.write_str(name)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct PredefinedCourse {
    pub id: u32,
    pub course_type: CourseType,
    pub label: &'static str,
    pub duration: u32,
    /// Short name used in output file names.
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseSelection {
    Predefined(&'static PredefinedCourse),
    Custom { name: String, duration: u32 },
}

impl CourseSelection {
    pub fn course_type(&self) -> CourseType {
        match self {
            CourseSelection::Predefined(course) => course.course_type,
            CourseSelection::Custom { .. } => CourseType::Nuevo,
        }
    }

    pub fn duration(&self) -> u32 {
        match self {
            CourseSelection::Predefined(course) => course.duration,
            CourseSelection::Custom { duration, .. } => *duration,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CourseSelection::Predefined(course) => course.label,
            CourseSelection::Custom { name, .. } => name,
        }
    }

    // Name that goes into the downloaded file names.
    pub fn file_name(&self) -> &str {
        match self {
            CourseSelection::Predefined(course) => course.name,
            CourseSelection::Custom { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructorSection {
    /// Internship certificates never carry an instructor section.
    NotApplicable,
    Excluded,
    Included(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportMode {
    /// ZIP with individual certificates plus the combined PDF
    #[default]
    Zip,
    /// Combined PDF only
    Pdf,
}

/// Course parameters as typed by the user, before validation.
#[derive(Debug, Clone)]
pub struct CourseForm {
    pub course_type: CourseType,
    pub course: Option<String>,
    pub custom_name: Option<String>,
    pub duration: Option<u32>,
    pub has_instructor: bool,
    pub instructor: Option<String>,
    pub export: ExportMode,
}

impl Default for CourseForm {
    fn default() -> Self {
        CourseForm {
            course_type: CourseType::Pasantia,
            course: None,
            custom_name: None,
            duration: None,
            has_instructor: true,
            instructor: None,
            export: ExportMode::Zip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequestConfig {
    pub selection: CourseSelection,
    pub instructor: InstructorSection,
    pub export: ExportMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Named binary entries, in insertion order. Inserting a name that already
/// exists replaces the earlier contents.
#[derive(Debug, Default)]
pub struct OutputArchive {
    entries: Vec<ArchiveEntry>,
}

impl OutputArchive {
    /// Returns true when an earlier entry with the same name was overwritten.
    pub fn insert(&mut self, name: String, bytes: Vec<u8>) -> bool {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == name) {
            existing.bytes = bytes;
            return true;
        }
        self.entries.push(ArchiveEntry { name, bytes });
        false
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
