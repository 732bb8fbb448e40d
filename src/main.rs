//! CLI entry point for the apimark extractor.

use apimark_core::{
    extractor, output, Error, Language, OutputFormat,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "apimark")]
#[command(author, version, about = "Extract API documentation from source comments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract annotations and print the assembled document
    Extract {
        /// Path to a file or directory
        path: PathBuf,

        /// Override language detection (file paths only)
        #[arg(long)]
        lang: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "json-pretty")]
        format: Format,
    },

    /// Report extraction diagnostics without printing the document
    Check {
        /// Path to a file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn extract_path(
    path: &PathBuf,
    lang: Option<&str>,
) -> Result<extractor::ProjectExtraction, Error> {
    if path.is_file() {
        let file = match lang {
            Some(name) => {
                let language = Language::from_name(name)
                    .ok_or_else(|| Error::UnknownLanguage(name.to_string()))?;
                extractor::extract_file_as(path, language)?
            }
            None => extractor::extract_file(path)?,
        };
        extractor::assemble_files(vec![file])
    } else {
        extractor::extract_dir(path)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { path, lang, format } => {
            match extract_path(&path, lang.as_deref()) {
                Ok(project) => {
                    println!("{}", output::format_document(&project.document, format.into()));
                    if project.diagnostics().next().is_some() {
                        eprintln!(
                            "{}",
                            output::format_diagnostics(&project.files, OutputFormat::Text)
                        );
                    }
                    if project.has_errors() {
                        ExitCode::from(1)
                    } else {
                        ExitCode::SUCCESS
                    }
                }
                Err(err @ Error::DuplicateIdentifier { .. }) => {
                    eprintln!("Error: {}", err);
                    ExitCode::from(1)
                }
                Err(err) => {
                    eprintln!("Error: {}", err);
                    ExitCode::from(2)
                }
            }
        }

        Commands::Check { path, format } => match extract_path(&path, None) {
            Ok(project) => {
                println!(
                    "{}",
                    output::format_diagnostics(&project.files, format.into())
                );
                if project.has_errors() {
                    ExitCode::from(1)
                } else {
                    ExitCode::SUCCESS
                }
            }
            Err(err @ Error::DuplicateIdentifier { .. }) => {
                eprintln!("Error: {}", err);
                ExitCode::from(1)
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                ExitCode::from(2)
            }
        },
    }
}
