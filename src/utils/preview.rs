use chrono::{Datelike, NaiveDate};
use crate::models::{CourseForm, CourseType};
use crate::utils::catalog::find_course;
use crate::utils::request::non_blank;

const MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

const COURSE_PLACEHOLDER: &str = "Curso Seleccionado";
const INSTRUCTOR_PLACEHOLDER: &str = "[Nombre del Instructor]";

/// Builds a text mock-up of the certificate the service will render.
///
/// Works on the form as typed, so an incomplete form still previews with
/// placeholders in place of the missing values.
pub fn render_preview(form: &CourseForm, today: NaiveDate) -> String {
    let date = format!("{} {}", MONTHS[today.month0() as usize], today.year());
    let predefined = match form.course_type {
        CourseType::Nuevo => None,
        course_type => form.course.as_deref().and_then(|key| find_course(course_type, key).ok()),
    };

    let title = match predefined {
        Some(course) => course.label,
        None if form.course_type == CourseType::Nuevo => {
            non_blank(&form.custom_name).unwrap_or(COURSE_PLACEHOLDER)
        }
        None => COURSE_PLACEHOLDER,
    };
    let duration = predefined.map(|c| c.duration).or(form.duration).unwrap_or(0);
    // Internship certificates never print an instructor.
    let shows_instructor = form.has_instructor && form.course_type != CourseType::Pasantia;
    let instructor = non_blank(&form.instructor);

    let mut preview = String::from("🎓 CERTIFICADO DE FINALIZACIÓN 🎓\n\n");
    preview.push_str("Se certifica que\n");
    preview.push_str("    [Nombre del Estudiante]\n");
    preview.push_str("ha completado satisfactoriamente el curso de\n");
    preview.push_str(&format!("    {}\n\n", title));
    if duration > 0 {
        preview.push_str(&format!("⏱  {} horas\n", duration));
    }
    preview.push_str(&format!("📅 {}\n", date));

    if shows_instructor {
        preview.push_str(&format!("\nInstructor\n    {}\n", instructor.unwrap_or(INSTRUCTOR_PLACEHOLDER)));
    }
    preview.push_str(&format!("\nEdo. Carabobo, {}\n", date));

    preview.push_str("\nInformación del Certificado:\n");
    preview.push_str(&format!("  Curso: {}\n", title));
    if duration > 0 {
        preview.push_str(&format!("  Duración: {}h\n", duration));
    }
    let instructor_summary = match (shows_instructor, instructor) {
        (false, _) => "Sin instructor",
        (true, Some(name)) => name,
        (true, None) => "Por definir",
    };
    preview.push_str(&format!("  Instructor: {}\n", instructor_summary));
    preview.push_str(&format!("  Fecha: {}\n", date));
    preview
}
