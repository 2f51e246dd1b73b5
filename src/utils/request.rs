use anyhow::Context;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;
use crate::errors::GenerationError;
use crate::models::{
    CertificateRequestConfig, CourseForm, CourseSelection, CourseType, InstructorSection, StudentRecord,
};
use crate::utils::catalog::find_course;

// Bodies longer than this are not worth showing to the user.
const MAX_ERROR_TEXT: usize = 500;

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Checks the course parameters and turns them into a request configuration.
pub fn compose(form: &CourseForm) -> Result<CertificateRequestConfig, GenerationError> {
    let selection = match form.course_type {
        CourseType::Nuevo => {
            let name = non_blank(&form.custom_name);
            let duration = form.duration.filter(|d| *d > 0);
            match (name, duration) {
                (Some(name), Some(duration)) => CourseSelection::Custom {
                    name: name.to_string(),
                    duration,
                },
                _ => return Err(GenerationError::MissingCustomCourse),
            }
        }
        course_type => {
            let key = non_blank(&form.course).ok_or(GenerationError::MissingCourse)?;
            CourseSelection::Predefined(find_course(course_type, key)?)
        }
    };

    let instructor = if form.course_type == CourseType::Pasantia {
        InstructorSection::NotApplicable
    } else if form.has_instructor {
        let name = non_blank(&form.instructor).ok_or(GenerationError::MissingInstructor)?;
        InstructorSection::Included(name.to_string())
    } else {
        InstructorSection::Excluded
    };

    Ok(CertificateRequestConfig {
        selection,
        instructor,
        export: form.export,
    })
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StudentEntry {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub nombre: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cedula: String,
}

/// Body of the single call to the certificate service. The service is always
/// asked for one merged PDF.
#[derive(Debug, Serialize)]
pub struct CertificateRequest {
    pub unir_pdfs: bool,
    pub eliminar_individuales: bool,
    pub estudiantes: Vec<StudentEntry>,
    pub tipo_curso_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curso_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curso_nombre: Option<String>,
    pub duracion_horas: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incluir_instructor_seccion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre_instructor: Option<String>,
}

impl CertificateRequest {
    pub fn new(config: &CertificateRequestConfig, students: &[StudentRecord]) -> Self {
        let estudiantes = students
            .iter()
            .map(|s| StudentEntry {
                nombre: s.name.clone(),
                cedula: s.identifier.clone(),
            })
            .collect();

        let (curso_id, curso_nombre) = match &config.selection {
            CourseSelection::Predefined(course) => (Some(course.id), None),
            CourseSelection::Custom { name, .. } => (None, Some(name.clone())),
        };

        let (incluir_instructor_seccion, nombre_instructor) = match &config.instructor {
            InstructorSection::NotApplicable => (None, None),
            InstructorSection::Excluded => (Some(false), None),
            InstructorSection::Included(name) => (Some(true), Some(name.clone())),
        };

        CertificateRequest {
            unir_pdfs: true,
            eliminar_individuales: true,
            estudiantes,
            tipo_curso_id: config.selection.course_type().wire_id(),
            curso_id,
            curso_nombre,
            duracion_horas: config.selection.duration(),
            incluir_instructor_seccion,
            nombre_instructor,
        }
    }
}

/// Anything able to turn a request into the combined certificates PDF.
pub trait CertificateService {
    async fn generate(&self, request: &CertificateRequest) -> Result<Vec<u8>, GenerationError>;
}

pub struct RemoteService {
    client: Client,
    endpoint: Url,
}

impl RemoteService {
    pub fn new(endpoint: Url) -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build the client")?;
        Ok(RemoteService { client, endpoint })
    }
}

impl CertificateService for RemoteService {
    // One exchange, no retries.
    async fn generate(&self, request: &CertificateRequest) -> Result<Vec<u8>, GenerationError> {
        info!("Requesting {} certificates from {}", request.estudiantes.len(), self.endpoint);

        let response = self.client.post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Service(service_error_message(status, &body)));
        }

        let bytes = response.bytes().await?;
        debug!("Certificate service answered with {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Picks the message shown when the service rejects a request: `detail`, then
/// `message`, then the raw JSON; a short plain-text body is used verbatim.
pub fn service_error_message(status: StatusCode, body: &str) -> String {
    let generic = format!("Error del servidor: {}", status.as_u16());

    match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("detail")
            .filter(|v| !is_falsy(v))
            .or_else(|| json.get("message").filter(|v| !is_falsy(v)))
            .map(json_text)
            .unwrap_or_else(|| json.to_string()),
        Err(_) if !body.trim().is_empty() && body.chars().count() < MAX_ERROR_TEXT => body.to_string(),
        Err(_) => generic,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
