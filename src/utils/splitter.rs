use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};
use std::sync::LazyLock;
use log::{debug, info, warn};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};
use crate::errors::GenerationError;
use crate::models::{OutputArchive, StudentRecord};

static NOT_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[^a-z0-9]").unwrap());

/// Accents are folded to plain ASCII, anything else outside `[a-z0-9]`
/// becomes `_`, and the result is lowercased.
pub fn sanitize_name(name: &str) -> String {
    let folded: String = name.nfd().filter(|c| !is_combining_mark(*c)).collect();
    NOT_ALPHANUMERIC.replace_all(&folded, "_").to_lowercase()
}

// Course names end up in file names; keep them out of other directories.
fn course_for_file(course: &str) -> String {
    course.replace(['/', '\\'], "_")
}

pub fn combined_file_name(course: &str, year: i32) -> String {
    format!("Certificados_{}_{}.pdf", course_for_file(course), year)
}

pub fn archive_file_name(course: &str, year: i32) -> String {
    format!("Certificados_{}_{}.zip", course_for_file(course), year)
}

pub fn complete_entry_name(course: &str, year: i32) -> String {
    format!("Certificados_{}_{}_(completo).pdf", course_for_file(course), year)
}

pub fn student_entry_name(student: &StudentRecord) -> String {
    format!("Certificado_{}.pdf", sanitize_name(&student.name))
}

// Attributes a page may inherit from its ancestors in the page tree.
const INHERITED: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Splits the combined PDF into one single-page PDF per page, in page order.
pub fn split_pages(combined: &[u8]) -> Result<Vec<Vec<u8>>, GenerationError> {
    if combined.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let document = Document::load_mem(combined)?;
    let pages = document
        .get_pages()
        .into_values()
        .map(|page_id| single_page(&document, page_id))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Combined document split into {} pages", pages.len());
    Ok(pages)
}

// A new document holding the page, the objects it references and a fresh
// one-page tree. Inherited attributes are copied onto the page itself.
fn single_page(source: &Document, page_id: ObjectId) -> Result<Vec<u8>, GenerationError> {
    let mut page = source.get_dictionary(page_id)?.clone();
    let mut visited = BTreeSet::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    while let Some(node_id) = parent.filter(|id| visited.insert(*id)) {
        let node = source.get_dictionary(node_id)?;
        for key in INHERITED {
            if let (false, Ok(value)) = (page.has(key), node.get(key)) {
                page.set(key, value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    let mut objects = BTreeMap::new();
    for (key, value) in page.iter() {
        if key.as_slice() != b"Parent" {
            collect_referenced(source, value, &mut objects);
        }
    }

    let last_id = source.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    let pages_id = (last_id + 1, 0);
    let catalog_id = (last_id + 2, 0);

    page.set("Parent", pages_id);
    objects.insert(page_id, Object::Dictionary(page));
    objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );

    let mut single = Document::with_version(source.version.clone());
    single.objects = objects;
    single.max_id = last_id + 2;
    single.trailer.set("Root", catalog_id);
    single.renumber_objects();

    let mut bytes = Vec::new();
    single.save_to(&mut bytes)?;
    Ok(bytes)
}

// Follows references out of `object`. Page tree nodes are never copied, so
// other pages of the source stay out.
fn collect_referenced(source: &Document, object: &Object, found: &mut BTreeMap<ObjectId, Object>) {
    match object {
        Object::Reference(id) => {
            if found.contains_key(id) {
                return;
            }
            let Ok(target) = source.get_object(*id) else {
                return;
            };
            if is_page_tree_node(target) {
                return;
            }
            found.insert(*id, target.clone());
            collect_referenced(source, target, found);
        }
        Object::Array(items) => items.iter().for_each(|item| collect_referenced(source, item, found)),
        Object::Dictionary(dict) => collect_from_dictionary(source, dict, found),
        Object::Stream(stream) => collect_from_dictionary(source, &stream.dict, found),
        _ => {}
    }
}

fn collect_from_dictionary(source: &Document, dict: &Dictionary, found: &mut BTreeMap<ObjectId, Object>) {
    for (key, value) in dict.iter() {
        if key.as_slice() != b"Parent" {
            collect_referenced(source, value, found);
        }
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(b"Page") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Builds the archive contents: the combined PDF first, then page i named
/// after student i. Pages without a matching student are skipped.
pub fn package(
    combined: &[u8],
    students: &[StudentRecord],
    course: &str,
    year: i32,
) -> Result<OutputArchive, GenerationError> {
    let pages = split_pages(combined)?;
    if pages.len() != students.len() {
        warn!(
            "Combined document has {} pages for {} students",
            pages.len(),
            students.len()
        );
    }

    let mut archive = OutputArchive::default();
    archive.insert(complete_entry_name(course, year), combined.to_vec());

    for (page, student) in pages.into_iter().zip(students) {
        let name = student_entry_name(student);
        if archive.insert(name.clone(), page) {
            warn!("{} appears twice, the earlier certificate was overwritten", name);
        }
    }

    info!("Archive prepared with {} entries", archive.entry_count());
    Ok(archive)
}

pub fn archive_bytes(archive: &OutputArchive) -> Result<Vec<u8>, GenerationError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in archive.entries() {
        zip.start_file(entry.name.as_str(), opts)?;
        zip.write_all(&entry.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Read;
    use lopdf::Stream;

    /// A PDF whose page `i` (0-based) draws the text `page i`.
    pub(crate) fn pdf_with_pages(count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::new();
        for i in 0..count {
            let content = format!("BT /F1 24 Tf 100 700 Td (page {}) Tj ET", i);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    // Two levels of Pages nodes; MediaBox and Resources live on the root only.
    fn nested_pdf(per_node: &[usize]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut page_no = 0;
        let mut nodes: Vec<Object> = Vec::new();
        for &count in per_node {
            let node_id = doc.new_object_id();
            let mut kids: Vec<Object> = Vec::new();
            for _ in 0..count {
                let content = format!("BT /F1 24 Tf 100 700 Td (page {}) Tj ET", page_no);
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => node_id,
                    "Contents" => content_id,
                });
                kids.push(page_id.into());
                page_no += 1;
            }
            doc.objects.insert(
                node_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Pages",
                    "Parent" => root_id,
                    "Kids" => kids,
                    "Count" => count as i64,
                }),
            );
            nodes.push(node_id.into());
        }

        doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => nodes,
                "Count" => page_no as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => root_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn page_text(pdf: &[u8]) -> String {
        let doc = Document::load_mem(pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1, "expected a single-page document");
        let page_id = *pages.values().next().unwrap();
        String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).to_string()
    }

    fn students(names: &[&str]) -> Vec<StudentRecord> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| StudentRecord::new(*n, format!("V-{}", i + 1)))
            .collect()
    }

    #[test]
    fn sanitizes_student_names() {
        assert_eq!(sanitize_name("Ana Pérez"), "ana_perez");
        assert_eq!(sanitize_name("José Muñoz-Díaz"), "jose_munoz_diaz");
        assert_eq!(sanitize_name("O'Neil, J."), "o_neil__j_");
    }

    #[test]
    fn split_keeps_page_order() {
        let pages = split_pages(&pdf_with_pages(3)).unwrap();

        assert_eq!(pages.len(), 3);
        for (i, page) in pages.iter().enumerate() {
            assert!(page_text(page).contains(&format!("page {}", i)));
        }
    }

    #[test]
    fn nested_tree_pages_carry_inherited_attributes() {
        let pages = split_pages(&nested_pdf(&[2, 1])).unwrap();
        assert_eq!(pages.len(), 3);

        for (i, pdf) in pages.iter().enumerate() {
            assert!(page_text(pdf).contains(&format!("page {}", i)));

            let doc = Document::load_mem(pdf).unwrap();
            let page_id = *doc.get_pages().values().next().unwrap();
            let page = doc.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").and_then(Object::as_array).unwrap();
            assert_eq!(media_box[2].as_i64().unwrap(), 612);
            let fonts = page
                .get(b"Resources")
                .and_then(Object::as_dict)
                .and_then(|r| r.get(b"Font"))
                .and_then(Object::as_dict)
                .unwrap();
            assert!(fonts.has(b"F1"));

            // Content streams of the other pages are not carried along.
            let streams = doc.objects.values().filter(|o| matches!(o, Object::Stream(_))).count();
            assert_eq!(streams, 1);
        }
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(matches!(split_pages(&[]), Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn garbage_is_a_document_error() {
        assert!(matches!(split_pages(b"<html>oops</html>"), Err(GenerationError::Document(_))));
    }

    #[test]
    fn archive_holds_combined_plus_one_per_student() {
        let combined = pdf_with_pages(3);
        let roster = students(&["Ana Pérez", "Luis Gómez", "María Núñez"]);

        let archive = package(&combined, &roster, "Office", 2025).unwrap();

        let names: Vec<_> = archive.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Certificados_Office_2025_(completo).pdf",
                "Certificado_ana_perez.pdf",
                "Certificado_luis_gomez.pdf",
                "Certificado_maria_nunez.pdf",
            ]
        );
        assert_eq!(archive.entries()[0].bytes, combined);
        assert!(page_text(&archive.entries()[2].bytes).contains("page 1"));
    }

    #[test]
    fn extra_pages_are_skipped() {
        let archive = package(&pdf_with_pages(3), &students(&["Ana"]), "Office", 2025).unwrap();
        assert_eq!(archive.entry_count(), 2);
    }

    #[test]
    fn colliding_names_keep_the_later_page() {
        let roster = students(&["Ana Pérez", "Ana Perez"]);

        let archive = package(&pdf_with_pages(2), &roster, "Office", 2025).unwrap();

        assert_eq!(archive.entry_count(), 2);
        assert!(page_text(&archive.entries()[1].bytes).contains("page 1"));
    }

    #[test]
    fn zip_contains_every_entry() {
        let archive = package(&pdf_with_pages(2), &students(&["Ana", "Luis"]), "Sistema de Uñas", 2025).unwrap();

        let bytes = archive_bytes(&archive).unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(zip.len(), 3);
        let mut combined = Vec::new();
        zip.by_name("Certificados_Sistema de Uñas_2025_(completo).pdf")
            .unwrap()
            .read_to_end(&mut combined)
            .unwrap();
        assert_eq!(combined, archive.entries()[0].bytes);
        zip.by_name("Certificado_luis.pdf").unwrap();
    }

    #[test]
    fn output_names_use_course_and_year() {
        assert_eq!(combined_file_name("Office", 2025), "Certificados_Office_2025.pdf");
        assert_eq!(archive_file_name("Diseño/Web", 2026), "Certificados_Diseño_Web_2026.zip");
    }
}
