mod config;
mod errors;
mod models;
mod session;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use log::{error, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use crate::config::{Settings, DEFAULT_API_URL};
use crate::errors::GenerationError;
use crate::models::{CourseForm, CourseType, ExportMode};
use crate::session::{AttemptState, Download, GenerationInput, Session};
use crate::utils::catalog::catalog_listing;
use crate::utils::preview::render_preview;
use crate::utils::request::RemoteService;
use crate::utils::roster::{parse_student_arg, ManualRoster};

#[derive(Parser)]
#[command(name = "certificados")]
#[command(about = "Generador de certificados: envía la lista de estudiantes al servicio y descarga los PDF")]
struct Cli {
    /// Certificate service endpoint
    #[arg(long, global = true, env = "CERT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Directory where the downloaded files are written
    #[arg(long, global = true, env = "CERT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,
    /// off, error, warn, info, debug or trace
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the certificates and save the PDF or ZIP
    Generate {
        #[command(flatten)]
        course: CourseArgs,
        /// Excel file whose first sheet has the columns "Nombre" and "Cedula"
        #[arg(long)]
        roster: Option<PathBuf>,
        /// Student typed by hand, as "Nombre:Cedula" (repeatable)
        #[arg(long = "student")]
        students: Vec<String>,
        #[arg(long, value_enum, default_value_t = ExportMode::Zip)]
        export: ExportMode,
    },
    /// Show what the certificate will look like
    Preview {
        #[command(flatten)]
        course: CourseArgs,
    },
    /// List the predefined courses
    Courses,
}

#[derive(Args)]
struct CourseArgs {
    #[arg(long, value_enum, default_value_t = CourseType::Pasantia)]
    course_type: CourseType,
    /// Predefined course id or name
    #[arg(long)]
    course: Option<String>,
    /// Name of a custom course (course type "nuevo")
    #[arg(long)]
    custom_name: Option<String>,
    /// Duration in hours of a custom course
    #[arg(long)]
    duration: Option<u32>,
    #[arg(long)]
    instructor: Option<String>,
    /// Leave the instructor section out of the certificates
    #[arg(long, default_value_t = false)]
    without_instructor: bool,
}

impl CourseArgs {
    fn into_form(self, export: ExportMode) -> CourseForm {
        CourseForm {
            course_type: self.course_type,
            course: self.course,
            custom_name: self.custom_name,
            duration: self.duration,
            has_instructor: !self.without_instructor,
            instructor: self.instructor,
            export,
        }
    }
}

// Entry point for the async main function, powered by tokio runtime.
#[tokio::main]
async fn main() -> ExitCode {
    // Loads environment variables from a `.env` file, if present.
    dotenv().ok();
    let cli = Cli::parse();

    let settings = match Settings::resolve(&cli.api_url, cli.output_dir.clone(), &cli.log_level) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if TermLogger::init(
        settings.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto
    ).is_err() {
        eprintln!("Logger already initialised");
    }

    match run(cli.command, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

// 2 when the input was rejected before anything was sent, 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    let validation = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<GenerationError>())
        .is_some_and(GenerationError::is_validation);
    if validation { 2 } else { 1 }
}

fn failure_context(stage: Option<AttemptState>) -> &'static str {
    match stage {
        Some(AttemptState::Validating) => "Revisa los datos ingresados",
        Some(AttemptState::Splitting) => "Error al preparar el archivo ZIP",
        Some(AttemptState::Downloading) => "Error al guardar los certificados",
        _ => "Error al generar certificados",
    }
}

async fn run(command: Commands, settings: Settings) -> Result<()> {
    match command {
        Commands::Courses => {
            print!("{}", catalog_listing());
        }
        Commands::Preview { course } => {
            let form = course.into_form(ExportMode::default());
            print!("{}", render_preview(&form, Local::now().date_naive()));
        }
        Commands::Generate { course, roster, students, export } => {
            let mut manual = ManualRoster::new();
            for arg in &students {
                manual.add(parse_student_arg(arg)?)?;
            }
            let input = GenerationInput {
                spreadsheet: roster,
                manual,
                form: course.into_form(export),
            };

            let service = RemoteService::new(settings.api_url)?;
            let mut session = Session::new(service, settings.output_dir);
            let outcome = session.generate(&input, Local::now().year()).await;
            let download = outcome.with_context(|| failure_context(session.failed_stage()))?;

            match &download {
                Download::Archive { entries, .. } => info!("ZIP with {} files ready", entries),
                Download::Combined(_) => info!("Combined PDF ready"),
            }
            println!("¡Certificados generados! {}", download.path().display());
        }
    }
    Ok(())
}
