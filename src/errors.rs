use thiserror::Error;
use crate::models::CourseType;

/// Everything that can stop a generation attempt. Messages are shown to the
/// user as-is.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Por favor, sube un archivo Excel o agrega estudiantes manualmente.")]
    NoStudentSource,

    #[error("No se encontraron estudiantes para generar certificados.")]
    EmptyRoster,

    #[error("Por favor, completa el nombre y la cédula del estudiante.")]
    IncompleteStudent,

    #[error("Ya existe un estudiante con esta cédula: {0}")]
    DuplicateIdentifier(String),

    #[error("Por favor, selecciona un curso.")]
    MissingCourse,

    #[error("El curso '{key}' no existe para el tipo de curso {course_type}.")]
    UnknownCourse { key: String, course_type: CourseType },

    #[error("Por favor, completa el nombre y duración del curso personalizado.")]
    MissingCustomCourse,

    #[error("Por favor, ingresa el nombre del instructor.")]
    MissingInstructor,

    #[error("No se pudo leer la hoja de cálculo: {0}")]
    Spreadsheet(String),

    #[error("No se pudo contactar el servicio de certificados: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Service(String),

    #[error("El servidor devolvió un archivo vacío.")]
    EmptyResponse,

    #[error("No se pudo procesar el PDF combinado: {0}")]
    Document(#[from] lopdf::Error),

    #[error("No se pudo crear el archivo ZIP: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("No se pudo guardar el archivo: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Input problems caught before any request is sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GenerationError::NoStudentSource
                | GenerationError::EmptyRoster
                | GenerationError::IncompleteStudent
                | GenerationError::DuplicateIdentifier(_)
                | GenerationError::MissingCourse
                | GenerationError::UnknownCourse { .. }
                | GenerationError::MissingCustomCourse
                | GenerationError::MissingInstructor
        )
    }
}
