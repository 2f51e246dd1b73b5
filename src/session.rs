use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use crate::errors::GenerationError;
use crate::models::{CourseForm, ExportMode};
use crate::utils::request::{compose, CertificateRequest, CertificateService};
use crate::utils::roster::{merge, ManualRoster};
use crate::utils::splitter::{archive_bytes, archive_file_name, combined_file_name, package};
use crate::utils::spreadsheet::read_roster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Validating,
    Requesting,
    Splitting,
    Downloading,
    Failed,
}

/// Everything the user supplied for one attempt.
#[derive(Debug, Clone, Default)]
pub struct GenerationInput {
    pub spreadsheet: Option<PathBuf>,
    pub manual: ManualRoster,
    pub form: CourseForm,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Download {
    Combined(PathBuf),
    Archive { path: PathBuf, entries: usize },
}

impl Download {
    pub fn path(&self) -> &Path {
        match self {
            Download::Combined(path) => path,
            Download::Archive { path, .. } => path,
        }
    }
}

/// Runs generation attempts one at a time against a certificate service.
pub struct Session<S> {
    service: S,
    output_dir: PathBuf,
    state: AttemptState,
    // States visited by the latest attempt.
    history: Vec<AttemptState>,
}

impl<S: CertificateService> Session<S> {
    pub fn new(service: S, output_dir: PathBuf) -> Self {
        Session {
            service,
            output_dir,
            state: AttemptState::Idle,
            history: Vec::new(),
        }
    }

    /// Stage the latest attempt was in when it failed.
    pub fn failed_stage(&self) -> Option<AttemptState> {
        let failed_at = self.history.iter().position(|s| *s == AttemptState::Failed)?;
        failed_at.checked_sub(1).map(|i| self.history[i])
    }

    fn transition(&mut self, next: AttemptState) {
        debug!("Attempt state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    // Any failure is logged, then the session is ready for the next attempt.
    pub async fn generate(&mut self, input: &GenerationInput, year: i32) -> Result<Download, GenerationError> {
        self.history.clear();
        let outcome = self.attempt(input, year).await;
        if let Err(e) = &outcome {
            self.transition(AttemptState::Failed);
            warn!("Certificate generation failed: {}", e);
        }
        self.transition(AttemptState::Idle);
        outcome
    }

    async fn attempt(&mut self, input: &GenerationInput, year: i32) -> Result<Download, GenerationError> {
        self.transition(AttemptState::Validating);
        if input.spreadsheet.is_none() && input.manual.is_empty() {
            return Err(GenerationError::NoStudentSource);
        }
        let config = compose(&input.form)?;
        let from_sheet = match &input.spreadsheet {
            Some(path) => read_roster(path)?,
            None => Vec::new(),
        };
        let students = merge(from_sheet, &input.manual)?;
        let request = CertificateRequest::new(&config, &students);

        self.transition(AttemptState::Requesting);
        info!("Requesting {} certificates for {}", students.len(), config.selection.title());
        let combined = self.service.generate(&request).await?;
        if combined.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        let course = config.selection.file_name();
        let (file_name, bytes, entries) = match config.export {
            ExportMode::Pdf => (combined_file_name(course, year), combined, None),
            ExportMode::Zip => {
                self.transition(AttemptState::Splitting);
                let archive = package(&combined, &students, course, year)?;
                (archive_file_name(course, year), archive_bytes(&archive)?, Some(archive.entry_count()))
            }
        };

        self.transition(AttemptState::Downloading);
        let path = write_output(&self.output_dir, &file_name, &bytes)?;
        info!("Certificates saved to {}", path.display());

        Ok(match entries {
            Some(entries) => Download::Archive { path, entries },
            None => Download::Combined(path),
        })
    }
}

// Written under a temporary name first so a failed write leaves nothing behind.
fn write_output(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, GenerationError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    let partial = dir.join(format!("{}.part", file_name));

    if let Err(e) = fs::write(&partial, bytes).and_then(|_| fs::rename(&partial, &path)) {
        let _ = fs::remove_file(&partial);
        return Err(e.into());
    }
    Ok(path)
}
