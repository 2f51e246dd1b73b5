use crate::errors::GenerationError;
use crate::models::{CourseType, PredefinedCourse};

pub static PREDEFINED_COURSES: [PredefinedCourse; 10] = [
    PredefinedCourse { id: 1, course_type: CourseType::Pasantia, label: "Auxiliar de Farmacia", duration: 280, name: "Farmacia" },
    PredefinedCourse { id: 2, course_type: CourseType::Pasantia, label: "Auxiliar de Enfermería", duration: 280, name: "Enfermeria" },
    PredefinedCourse { id: 3, course_type: CourseType::Pasantia, label: "Asistente de Laboratorio Clínico", duration: 280, name: "Bionalisis" },
    PredefinedCourse { id: 4, course_type: CourseType::Pasantia, label: "Asistente Administrativo Contable", duration: 280, name: "Administracion" },
    PredefinedCourse { id: 5, course_type: CourseType::Corto, label: "Computacion", duration: 36, name: "Computacion" },
    PredefinedCourse { id: 6, course_type: CourseType::Corto, label: "Office", duration: 36, name: "Office" },
    PredefinedCourse { id: 7, course_type: CourseType::Corto, label: "Electronica", duration: 36, name: "Electronica" },
    PredefinedCourse { id: 8, course_type: CourseType::Corto, label: "Barbería", duration: 36, name: "Barberia" },
    PredefinedCourse { id: 9, course_type: CourseType::Corto, label: "Sistema de Uñas", duration: 36, name: "Sistema de Uñas" },
    PredefinedCourse { id: 10, course_type: CourseType::Corto, label: "Depilación Facial", duration: 36, name: "Depilacion" },
];

pub fn courses_of(course_type: CourseType) -> impl Iterator<Item = &'static PredefinedCourse> {
    PREDEFINED_COURSES.iter().filter(move |c| c.course_type == course_type)
}

// Looks a course up by numeric id, short name or label (case-insensitive),
// restricted to the given course type.
pub fn find_course(course_type: CourseType, key: &str) -> Result<&'static PredefinedCourse, GenerationError> {
    let key = key.trim();
    let by_id = key.parse::<u32>().ok();
    courses_of(course_type)
        .find(|c| {
            Some(c.id) == by_id
                || c.name.to_lowercase() == key.to_lowercase()
                || c.label.to_lowercase() == key.to_lowercase()
        })
        .ok_or_else(|| GenerationError::UnknownCourse {
            key: key.to_string(),
            course_type,
        })
}

// Human-readable listing of the catalog, one block per course type.
pub fn catalog_listing() -> String {
    let mut listing = String::new();
    for course_type in [CourseType::Pasantia, CourseType::Corto] {
        listing.push_str(&format!("{} [{}]\n", course_type.label(), course_type));
        for course in courses_of(course_type) {
            listing.push_str(&format!("  {:>2}  {} ({}h)\n", course.id, course.label, course.duration));
        }
    }
    listing
}
