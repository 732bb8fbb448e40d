//! Language profiles: how each supported language delimits comments,
//! strings and raw literals.
//!
//! One declarative table drives a single generic scanner; there is no
//! per-language scanning code. Delimiters are tried in declaration
//! order and the first match wins, so profiles list string delimiters
//! before comment delimiters, and the JavaScript regex literal last.

use crate::error::{Error, Result};
use std::path::Path;

/// A supported source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
    Erlang,
    Go,
    Java,
    JavaScript,
    Pascal,
    Perl,
    Php,
    Python,
    Ruby,
    Rust,
    Swift,
    TypeScript,
}

/// How a string or raw literal escapes its own end delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// No escaping; the first end token terminates the literal.
    None,
    /// The escape char plus any following char is skipped.
    Char(char),
    /// A doubled end token stands for a literal delimiter (Pascal).
    Doubled,
}

/// One lexical rule of a language profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// A line comment running to end of line. Consecutive runs merge.
    Line { start: &'static str },
    /// A block comment. Nestable blocks keep a depth counter;
    /// non-nestable ones close at the first end token.
    Block {
        start: &'static str,
        end: &'static str,
        nested: bool,
    },
    /// A string literal. Skipped entirely, never emitted.
    Str {
        start: &'static str,
        end: &'static str,
        escape: Escape,
    },
    /// A raw literal (template string, regex). Skipped entirely; may
    /// span lines. With `regex` set, the start token only opens the
    /// literal in lexical positions where a regex is plausible.
    Raw {
        start: &'static str,
        end: &'static str,
        escape: Escape,
        regex: bool,
    },
    /// A PHP-style heredoc/nowdoc: `<<<TOKEN` up to a line holding
    /// just `TOKEN` or `TOKEN;`.
    Heredoc { start: &'static str },
}

/// The ordered lexical rule set for one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    pub name: &'static str,
    pub delimiters: Vec<Delimiter>,
}

const ALL: &[Language] = &[
    Language::C,
    Language::Cpp,
    Language::Erlang,
    Language::Go,
    Language::Java,
    Language::JavaScript,
    Language::Pascal,
    Language::Perl,
    Language::Php,
    Language::Python,
    Language::Ruby,
    Language::Rust,
    Language::Swift,
    Language::TypeScript,
];

fn c_style() -> Vec<Delimiter> {
    vec![
        Delimiter::Str {
            start: "\"",
            end: "\"",
            escape: Escape::Char('\\'),
        },
        Delimiter::Line { start: "//" },
        Delimiter::Block {
            start: "/*",
            end: "*/",
            nested: false,
        },
    ]
}

fn ecma_style() -> Vec<Delimiter> {
    vec![
        Delimiter::Str {
            start: "\"",
            end: "\"",
            escape: Escape::Char('\\'),
        },
        Delimiter::Str {
            start: "'",
            end: "'",
            escape: Escape::Char('\\'),
        },
        Delimiter::Raw {
            start: "`",
            end: "`",
            escape: Escape::Char('\\'),
            regex: false,
        },
        Delimiter::Line { start: "//" },
        Delimiter::Block {
            start: "/*",
            end: "*/",
            nested: false,
        },
        // Must stay last so `//` and `/*` win over a bare `/`.
        Delimiter::Raw {
            start: "/",
            end: "/",
            escape: Escape::Char('\\'),
            regex: true,
        },
    ]
}

impl Language {
    pub fn profile(&self) -> LanguageProfile {
        let delimiters = match self {
            Language::C | Language::Cpp | Language::Java => c_style(),
            Language::Erlang => vec![
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Line { start: "%" },
            ],
            Language::Go => vec![
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Raw {
                    start: "`",
                    end: "`",
                    escape: Escape::None,
                    regex: false,
                },
                Delimiter::Line { start: "//" },
                Delimiter::Block {
                    start: "/*",
                    end: "*/",
                    nested: false,
                },
            ],
            Language::JavaScript | Language::TypeScript => ecma_style(),
            Language::Pascal => vec![
                Delimiter::Str {
                    start: "'",
                    end: "'",
                    escape: Escape::Doubled,
                },
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Doubled,
                },
                Delimiter::Block {
                    start: "{",
                    end: "}",
                    nested: false,
                },
                Delimiter::Block {
                    start: "(*",
                    end: "*)",
                    nested: false,
                },
            ],
            Language::Perl => vec![
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Str {
                    start: "'",
                    end: "'",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Line { start: "#" },
                Delimiter::Block {
                    start: "\n=pod\n",
                    end: "\n=cut\n",
                    nested: false,
                },
            ],
            Language::Php => vec![
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Str {
                    start: "'",
                    end: "'",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Heredoc { start: "<<<" },
                Delimiter::Line { start: "//" },
                Delimiter::Line { start: "#" },
                Delimiter::Block {
                    start: "/*",
                    end: "*/",
                    nested: false,
                },
            ],
            Language::Python => vec![
                Delimiter::Block {
                    start: "\"\"\"",
                    end: "\"\"\"",
                    nested: false,
                },
                Delimiter::Block {
                    start: "'''",
                    end: "'''",
                    nested: false,
                },
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Str {
                    start: "'",
                    end: "'",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Line { start: "#" },
            ],
            Language::Ruby => vec![
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Str {
                    start: "'",
                    end: "'",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Line { start: "#" },
                Delimiter::Block {
                    start: "\n=begin\n",
                    end: "\n=end\n",
                    nested: false,
                },
            ],
            Language::Rust => vec![
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                // `///` before `//` so doc-comment runs merge as one token.
                Delimiter::Line { start: "///" },
                Delimiter::Line { start: "//" },
                Delimiter::Block {
                    start: "/*",
                    end: "*/",
                    nested: true,
                },
            ],
            Language::Swift => vec![
                Delimiter::Str {
                    start: "\"",
                    end: "\"",
                    escape: Escape::Char('\\'),
                },
                Delimiter::Line { start: "//" },
                Delimiter::Block {
                    start: "/*",
                    end: "*/",
                    nested: true,
                },
            ],
        };

        LanguageProfile {
            name: self.name(),
            delimiters,
        }
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp"],
            Language::Erlang => &["erl", "hrl"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::JavaScript => &["js", "mjs"],
            Language::Pascal => &["pas", "pp"],
            Language::Perl => &["perl", "prl", "pl"],
            Language::Php => &["php"],
            Language::Python => &["py"],
            Language::Ruby => &["rb"],
            Language::Rust => &["rs"],
            Language::Swift => &["swift"],
            Language::TypeScript => &["ts"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Erlang => "erlang",
            Language::Go => "go",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Pascal => "pascal",
            Language::Perl => "perl",
            Language::Php => "php",
            Language::Python => "python",
            Language::Ruby => "ruby",
            Language::Rust => "rust",
            Language::Swift => "swift",
            Language::TypeScript => "typescript",
        }
    }

    pub fn from_name(name: &str) -> Option<Language> {
        ALL.iter().copied().find(|lang| lang.name() == name)
    }
}

/// Look up the profile for a language identifier.
pub fn profile_for(name: &str) -> Result<LanguageProfile> {
    Language::from_name(name)
        .map(|lang| lang.profile())
        .ok_or_else(|| Error::UnknownLanguage(name.to_string()))
}

/// Detect the language of a file from its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;
    ALL.iter()
        .copied()
        .find(|lang| lang.extensions().contains(&ext))
}

/// Check if a file can be scanned based on its extension.
pub fn is_supported_file(path: &Path) -> bool {
    detect_language(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_go() {
        assert_eq!(detect_language(Path::new("main.go")), Some(Language::Go));
    }

    #[test]
    fn test_detect_typescript() {
        assert_eq!(
            detect_language(Path::new("app.ts")),
            Some(Language::TypeScript)
        );
    }

    #[test]
    fn test_unsupported_extension() {
        assert_eq!(detect_language(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_profile_for_unknown_language() {
        assert!(matches!(
            profile_for("cobol"),
            Err(Error::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_javascript_regex_declared_last() {
        let profile = Language::JavaScript.profile();
        assert!(matches!(
            profile.delimiters.last(),
            Some(Delimiter::Raw { regex: true, .. })
        ));
    }

    #[test]
    fn test_strings_declared_before_comments() {
        // First-match-wins means a `//` inside a string must never be
        // reachable: the string delimiter has to come first.
        for lang in [Language::Go, Language::JavaScript, Language::Php] {
            let profile = lang.profile();
            let first_string = profile
                .delimiters
                .iter()
                .position(|d| matches!(d, Delimiter::Str { .. }));
            let first_comment = profile
                .delimiters
                .iter()
                .position(|d| matches!(d, Delimiter::Line { .. } | Delimiter::Block { .. }));
            assert!(first_string.unwrap() < first_comment.unwrap());
        }
    }
}
