//! File and directory extraction: ties the scanner, the annotation
//! parser and the assembler together.
//!
//! Files are independent of each other, so a directory walk fans out
//! over a worker pool, one task per file. A single file's scan is an
//! inherently sequential state machine and is never split. The
//! assembler is the join point after all files are done.

use crate::annotation::{ApiDocument, Fragment, Location};
use crate::assembler::assemble;
use crate::error::{Diagnostic, Error, Result, Severity};
use crate::language::{detect_language, is_supported_file, Language};
use crate::parser::{parse_block, Parsed};
use crate::scanner::scan;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Everything extracted from one source file.
#[derive(Debug, Clone)]
pub struct FileExtraction {
    pub path: PathBuf,
    pub language: String,
    pub fragments: Vec<Fragment>,
    pub diagnostics: Vec<Diagnostic>,
}

/// All files of a tree plus the assembled document.
#[derive(Debug, Clone)]
pub struct ProjectExtraction {
    pub files: Vec<FileExtraction>,
    pub document: ApiDocument,
}

impl ProjectExtraction {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Extract fragments from in-memory source text. Pure: no I/O.
pub fn extract_source(source: &str, language: Language, path: &Path) -> FileExtraction {
    let profile = language.profile();
    let mut scanner = scan(source, &profile);
    let mut blocks = Vec::new();
    for block in scanner.by_ref() {
        blocks.push(block);
    }

    let mut fragments = Vec::new();
    let mut diagnostics = Vec::new();

    if let Some(pos) = scanner.unterminated_literal() {
        diagnostics.push(Diagnostic::warning(
            "string or raw literal still open at end of file",
            Location::new(path.to_path_buf(), pos.line, pos.column),
        ));
    }

    for block in &blocks {
        if block.unterminated {
            diagnostics.push(Diagnostic::warning(
                "comment still open at end of file",
                Location::new(path.to_path_buf(), block.start.line, block.start.column),
            ));
        }
        match parse_block(block, path) {
            Parsed::Fragment(fragment) => fragments.push(fragment),
            Parsed::NotAnAnnotation => {}
            Parsed::Malformed(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    FileExtraction {
        path: path.to_path_buf(),
        language: language.name().to_string(),
        fragments,
        diagnostics,
    }
}

/// Extract one file, detecting its language from the extension.
pub fn extract_file(path: &Path) -> Result<FileExtraction> {
    let language = detect_language(path)
        .ok_or_else(|| Error::UnknownLanguage(path.display().to_string()))?;
    extract_file_as(path, language)
}

/// Extract one file with an explicitly chosen language.
pub fn extract_file_as(path: &Path, language: Language) -> Result<FileExtraction> {
    let source = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(extract_source(&source, language, path))
}

/// Walk a tree, extract every supported file in parallel and assemble
/// the document. Unsupported and unreadable files never abort the
/// run; only a duplicate API identifier does.
pub fn extract_dir(root: &Path) -> Result<ProjectExtraction> {
    let paths: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| is_supported_file(path))
        .collect();

    let files: Vec<FileExtraction> = paths
        .par_iter()
        .map(|path| match extract_file(path) {
            Ok(extraction) => extraction,
            Err(err) => FileExtraction {
                path: path.clone(),
                language: String::new(),
                fragments: Vec::new(),
                diagnostics: vec![Diagnostic::error(
                    err.to_string(),
                    Location::new(path.clone(), 0, 0),
                )],
            },
        })
        .collect();

    assemble_files(files)
}

/// Join step shared by directory and multi-file extraction.
pub fn assemble_files(files: Vec<FileExtraction>) -> Result<ProjectExtraction> {
    let fragments: Vec<Fragment> = files
        .iter()
        .flat_map(|f| f.fragments.iter().cloned())
        .collect();
    let document = assemble(fragments)?;
    Ok(ProjectExtraction { files, document })
}
