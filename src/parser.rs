//! Annotation block parser: turns one comment block into an API
//! definition fragment.
//!
//! The parser works on normalized text (comment gutters and shared
//! indentation stripped), so it is identical for every source
//! language. A block is only an annotation when its first meaningful
//! line carries the `@api` or `@apidoc` sentinel; everything else is
//! silently dropped. Two body grammars are supported and feed the same
//! parameter-tree builder: flat `@apiXxx` tag lines, and an indented
//! key/value block sniffed from the first body line.

use crate::annotation::{
    ApiFragment, DocMeta, Example, Fragment, Header, License, Location, MediaBody, MetaFragment,
    Param, Request, Response,
};
use crate::error::Diagnostic;
use crate::scanner::CommentBlock;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Result of parsing one comment block.
#[derive(Debug, Clone)]
pub enum Parsed {
    Fragment(Fragment),
    /// The block is an ordinary comment. Most comments are.
    NotAnAnnotation,
    /// The block carried the sentinel but is structurally invalid.
    Malformed(Diagnostic),
}

/// Characters that may form a decorative gutter at the start of a
/// comment line (`* ` in starred blocks, residual marker characters
/// from line comments).
const GUTTER: &str = "*/#%!";

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@([A-Za-z][A-Za-z0-9_]*)\s*(.*)$").expect("Invalid regex"))
}

/// Parse one comment block into a fragment, if it is an annotation.
pub fn parse_block(block: &CommentBlock, file: &Path) -> Parsed {
    let lines = normalize(block);
    let Some(first) = lines.iter().position(|l| !l.text.trim().is_empty()) else {
        return Parsed::NotAnAnnotation;
    };

    let (tag, rest) = match split_tag(&lines[first].text) {
        Some(parts) => parts,
        None => return Parsed::NotAnAnnotation,
    };

    match tag.as_str() {
        "api" => parse_api(block, file, &lines, first, &rest),
        "apidoc" => parse_meta(block, file, &lines, first, &rest),
        _ => Parsed::NotAnAnnotation,
    }
}

/// A normalized content line with its source position.
struct NLine {
    text: String,
    line: usize,
    col: usize,
}

/// Strip gutters and shared indentation, keeping line numbers.
fn normalize(block: &CommentBlock) -> Vec<NLine> {
    let stripped: Vec<(String, usize)> = block
        .lines
        .iter()
        .map(|raw| strip_gutter(raw))
        .collect();

    // The first non-empty line fixes the indentation to remove from
    // every line.
    let indent = stripped
        .iter()
        .find(|(text, _)| !text.trim().is_empty())
        .map(|(text, _)| leading_ws(text))
        .unwrap_or(0);

    stripped
        .into_iter()
        .enumerate()
        .map(|(i, (text, removed))| {
            let cut = leading_ws(&text).min(indent);
            let byte = text
                .char_indices()
                .nth(cut)
                .map(|(b, _)| b)
                .unwrap_or(text.len());
            NLine {
                text: text[byte..].to_string(),
                line: block.start.line + i,
                col: removed + cut + 1,
            }
        })
        .collect()
}

fn leading_ws(text: &str) -> usize {
    text.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count()
}

/// Drop a `<ws><gutter char><space>` prefix, the house style of
/// starred block comments. Lines without that shape pass unchanged.
fn strip_gutter(raw: &str) -> (String, usize) {
    let chars: Vec<char> = raw.chars().collect();
    let ws = chars
        .iter()
        .take_while(|c| **c == ' ' || **c == '\t')
        .count();

    match chars.get(ws) {
        Some(c) if GUTTER.contains(*c) => match chars.get(ws + 1) {
            Some(next) if next.is_whitespace() => {
                (chars[ws + 2..].iter().collect(), ws + 2)
            }
            None => (String::new(), ws + 1),
            Some(_) => (raw.to_string(), 0),
        },
        _ => (raw.to_string(), 0),
    }
}

/// Split `@tag rest` off a line; the tag comes back lowercased.
fn split_tag(text: &str) -> Option<(String, String)> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('@') {
        return None;
    }
    let caps = tag_re().captures(trimmed)?;
    Some((
        caps[1].to_lowercase(),
        caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string(),
    ))
}

fn loc(file: &Path, line: &NLine) -> Location {
    Location::new(file.to_path_buf(), line.line, line.col)
}

/// Where tag values currently attach: the operation itself, its open
/// request body, or its open response.
#[derive(Clone, Copy, PartialEq)]
enum Scope {
    Top,
    Request,
    Success,
    Error,
}

fn parse_api(
    block: &CommentBlock,
    file: &Path,
    lines: &[NLine],
    first: usize,
    header: &str,
) -> Parsed {
    let mut api = ApiFragment {
        location: Location::new(file.to_path_buf(), block.start.line, block.start.column),
        ..Default::default()
    };

    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() < 3 {
        return Parsed::Malformed(Diagnostic::error(
            "@api requires a method, a path and a summary",
            loc(file, &lines[first]),
        ));
    }
    api.method = tokens[0].to_string();
    api.path = tokens[1].to_string();
    api.summary = tokens[2..].join(" ");

    let body = &lines[first + 1..];
    let diagnostic = if body_is_structured(body) {
        parse_structured(&mut api, body, file)
    } else {
        parse_flat(&mut api, body, file)
    };

    match diagnostic {
        Some(diag) => Parsed::Malformed(diag),
        None => Parsed::Fragment(Fragment::Api(api)),
    }
}

/// The structured grammar is chosen when the first body line is a bare
/// `key:` line or a list item. Any `@` tag line anywhere in the body
/// forces the flat grammar, so prose with a stray colon cannot shadow
/// tagged content.
fn body_is_structured(body: &[NLine]) -> bool {
    if body
        .iter()
        .any(|l| l.text.trim_start().starts_with('@'))
    {
        return false;
    }
    body.iter()
        .find(|l| !l.text.trim().is_empty())
        .map(|l| {
            let text = l.text.trim();
            split_key(text).is_some() || text.starts_with("- ")
        })
        .unwrap_or(false)
}

fn parse_flat(api: &mut ApiFragment, body: &[NLine], file: &Path) -> Option<Diagnostic> {
    let mut scope = Scope::Top;
    let mut description = Vec::new();
    let mut seen_tag = false;
    let mut i = 0;

    while i < body.len() {
        let line = &body[i];
        let Some((tag, rest)) = split_tag(&line.text) else {
            if !seen_tag && !line.text.trim().is_empty() {
                description.push(line.text.trim().to_string());
            }
            i += 1;
            continue;
        };
        seen_tag = true;
        let rest = rest.trim().to_string();

        match tag.as_str() {
            "api" => {
                return Some(Diagnostic::error(
                    "duplicate @api tag in one comment block",
                    loc(file, line),
                ));
            }
            "apigroup" => {
                let mut words = rest.split_whitespace();
                match (words.next(), words.next()) {
                    (Some(name), None) => api.group = Some(name.to_string()),
                    _ => {
                        return Some(Diagnostic::error(
                            "@apiGroup takes exactly one name",
                            loc(file, line),
                        ))
                    }
                }
            }
            "apitags" => {
                api.tags.extend(
                    rest.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from),
                );
            }
            "apideprecated" => api.deprecated = Some(rest),
            "apiquery" => match parse_param(&rest) {
                Some((segments, param)) => {
                    insert_param(&mut api.queries, &segments, param);
                }
                None => {
                    return Some(Diagnostic::error(
                        "@apiQuery requires a name and a type",
                        loc(file, line),
                    ))
                }
            },
            "apiparam" => match parse_param(&rest) {
                Some((segments, param)) => {
                    insert_param(param_sink(api, scope), &segments, param);
                }
                None => {
                    return Some(Diagnostic::error(
                        "@apiParam requires a name and a type",
                        loc(file, line),
                    ))
                }
            },
            "apiheader" => {
                let (name, summary) = match rest.split_once(char::is_whitespace) {
                    Some((n, s)) if !s.trim().is_empty() => (n.to_string(), s.trim().to_string()),
                    _ => {
                        return Some(Diagnostic::error(
                            "@apiHeader requires a name and a summary",
                            loc(file, line),
                        ))
                    }
                };
                header_sink(api, scope).push(Header { name, summary });
            }
            "apirequest" => {
                let mut words = rest.split_whitespace();
                match (words.next(), words.next()) {
                    (Some(mime), None) => {
                        api.request
                            .get_or_insert_with(Request::default)
                            .content
                            .push(MediaBody {
                                mime: mime.to_string(),
                                ..Default::default()
                            });
                        scope = Scope::Request;
                    }
                    _ => {
                        return Some(Diagnostic::error(
                            "@apiRequest takes exactly one media type",
                            loc(file, line),
                        ))
                    }
                }
            }
            "apisuccess" | "apierror" => {
                let (code, summary) = match rest.split_once(char::is_whitespace) {
                    Some((c, s)) if !s.trim().is_empty() => (c.to_string(), s.trim().to_string()),
                    _ => {
                        let name = if tag == "apisuccess" {
                            "@apiSuccess"
                        } else {
                            "@apiError"
                        };
                        return Some(Diagnostic::error(
                            format!("{} requires a status code and a summary", name),
                            loc(file, line),
                        ));
                    }
                };
                let response = Response {
                    code,
                    summary,
                    ..Default::default()
                };
                if tag == "apisuccess" {
                    api.success.push(response);
                    scope = Scope::Success;
                } else {
                    api.errors.push(response);
                    scope = Scope::Error;
                }
            }
            "apiexample" => {
                let mut words = rest.split_whitespace();
                let Some(lang) = words.next() else {
                    return Some(Diagnostic::error(
                        "@apiExample requires a language tag",
                        loc(file, line),
                    ));
                };
                let (text, consumed) = capture_verbatim(&body[i + 1..]);
                if text.is_empty() {
                    return Some(Diagnostic::error(
                        "@apiExample has no example content",
                        loc(file, line),
                    ));
                }
                example_sink(api, scope).push(Example {
                    lang: lang.to_string(),
                    text,
                });
                i += consumed;
            }
            other => {
                api.extensions
                    .entry(other.to_string())
                    .or_default()
                    .push(rest);
            }
        }
        i += 1;
    }

    if !description.is_empty() {
        api.description = Some(description.join("\n"));
    }
    None
}

/// Verbatim capture runs until the next `@api…` tag line or the end of
/// the block; interior `@`-lines that are not API tags stay part of
/// the example text.
fn capture_verbatim(body: &[NLine]) -> (String, usize) {
    let mut taken = 0;
    for line in body {
        if line.text.trim_start().to_lowercase().starts_with("@api") {
            break;
        }
        taken += 1;
    }
    let mut captured: Vec<&str> = body[..taken].iter().map(|l| l.text.as_str()).collect();
    while captured.first().is_some_and(|l| l.trim().is_empty()) {
        captured.remove(0);
    }
    while captured.last().is_some_and(|l| l.trim().is_empty()) {
        captured.pop();
    }
    (captured.join("\n"), taken)
}

fn param_sink(api: &mut ApiFragment, scope: Scope) -> &mut Vec<Param> {
    match scope {
        Scope::Top => &mut api.params,
        Scope::Request => match api.request.as_mut().and_then(|r| r.content.last_mut()) {
            Some(media) => &mut media.params,
            None => &mut api.params,
        },
        Scope::Success => match api.success.last_mut() {
            Some(response) => &mut response.params,
            None => &mut api.params,
        },
        Scope::Error => match api.errors.last_mut() {
            Some(response) => &mut response.params,
            None => &mut api.params,
        },
    }
}

fn header_sink(api: &mut ApiFragment, scope: Scope) -> &mut Vec<Header> {
    match scope {
        Scope::Top => &mut api.headers,
        Scope::Request => match api.request.as_mut().and_then(|r| r.content.last_mut()) {
            Some(media) => &mut media.headers,
            None => &mut api.headers,
        },
        Scope::Success => match api.success.last_mut() {
            Some(response) => &mut response.headers,
            None => &mut api.headers,
        },
        Scope::Error => match api.errors.last_mut() {
            Some(response) => &mut response.headers,
            None => &mut api.headers,
        },
    }
}

fn example_sink(api: &mut ApiFragment, scope: Scope) -> &mut Vec<Example> {
    match scope {
        Scope::Top => &mut api.examples,
        Scope::Request => match api.request.as_mut().and_then(|r| r.content.last_mut()) {
            Some(media) => &mut media.examples,
            None => &mut api.examples,
        },
        Scope::Success => match api.success.last_mut() {
            Some(response) => &mut response.examples,
            None => &mut api.examples,
        },
        Scope::Error => match api.errors.last_mut() {
            Some(response) => &mut response.examples,
            None => &mut api.examples,
        },
    }
}

/// `name type summary…` — summary optional, name and type required.
/// Returns the dotted name segments and the leaf parameter.
fn parse_param(rest: &str) -> Option<(Vec<String>, Param)> {
    let mut words = rest.split_whitespace();
    let name = words.next()?;
    let type_name = words.next()?;
    let summary: Vec<&str> = words.collect();

    let segments: Vec<String> = name.split('.').map(String::from).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    let param = Param {
        name: segments.last().cloned().unwrap_or_default(),
        type_name: type_name.to_string(),
        description: if summary.is_empty() {
            None
        } else {
            Some(summary.join(" "))
        },
        children: Vec::new(),
    };
    Some((segments, param))
}

/// Place a parameter in the tree by its dotted name. Missing parents
/// are created as object placeholders and filled in when their own
/// declaration arrives, so `a.b` may come before or after `a`.
fn insert_param(list: &mut Vec<Param>, segments: &[String], param: Param) {
    let head = &segments[0];
    if segments.len() == 1 {
        if let Some(existing) = list.iter_mut().find(|p| &p.name == head) {
            existing.type_name = param.type_name;
            existing.description = param.description;
        } else {
            list.push(param);
        }
        return;
    }

    let idx = match list.iter().position(|p| &p.name == head) {
        Some(idx) => idx,
        None => {
            list.push(Param {
                name: head.clone(),
                type_name: "object".to_string(),
                description: None,
                children: Vec::new(),
            });
            list.len() - 1
        }
    };
    insert_param(&mut list[idx].children, &segments[1..], param);
}

fn parse_meta(
    block: &CommentBlock,
    file: &Path,
    lines: &[NLine],
    first: usize,
    header: &str,
) -> Parsed {
    let title = header.trim();
    if title.is_empty() {
        return Parsed::Malformed(Diagnostic::error(
            "@apidoc requires a title",
            loc(file, &lines[first]),
        ));
    }

    let mut meta = DocMeta {
        title: Some(title.to_string()),
        ..Default::default()
    };
    let mut content = Vec::new();
    let mut in_content = false;

    for line in &lines[first + 1..] {
        let Some((tag, rest)) = split_tag(&line.text) else {
            if in_content || !line.text.trim().is_empty() {
                content.push(line.text.clone());
            }
            continue;
        };
        let rest = rest.trim().to_string();

        match tag.as_str() {
            "apiversion" => meta.version = Some(rest),
            "apibaseurl" => meta.base_url = Some(rest),
            "apilicense" => {
                let Some((name, url)) = rest.split_once(char::is_whitespace) else {
                    return Parsed::Malformed(Diagnostic::error(
                        "@apiLicense requires a name and a URL",
                        loc(file, line),
                    ));
                };
                meta.license = Some(License {
                    name: name.to_string(),
                    url: url.trim().to_string(),
                });
            }
            "apigroup" => meta.group = Some(rest),
            "apitags" => {
                meta.tags.extend(
                    rest.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from),
                );
            }
            "apicontent" => in_content = true,
            other => {
                meta.extensions
                    .entry(other.to_string())
                    .or_default()
                    .push(rest);
            }
        }
    }

    while content.last().is_some_and(|l| l.trim().is_empty()) {
        content.pop();
    }
    if !content.is_empty() {
        meta.content = Some(content.join("\n"));
    }

    Parsed::Fragment(Fragment::Meta(MetaFragment {
        meta,
        location: Location::new(file.to_path_buf(), block.start.line, block.start.column),
    }))
}

// ---------------------------------------------------------------------
// Structured grammar
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Scalar(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    fn as_scalar(&self) -> String {
        match self {
            Value::Scalar(s) => s.clone(),
            other => render_value(other),
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Scalar(s) => s.clone(),
        Value::List(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

/// Split a `key: value` line. The key must be a single token; lines
/// that do not fit that shape (prose, tags) return None.
fn split_key(text: &str) -> Option<(&str, &str)> {
    let colon = text.find(':')?;
    let key = &text[..colon];
    if key.is_empty() || key.starts_with('@') || key.chars().any(char::is_whitespace) {
        return None;
    }
    let rest = &text[colon + 1..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((key, rest.trim()))
}

struct StructuredParser<'a> {
    content: Vec<&'a NLine>,
    pos: usize,
    file: &'a Path,
}

impl<'a> StructuredParser<'a> {
    fn peek(&self) -> Option<&'a NLine> {
        self.content.get(self.pos).copied()
    }

    fn indent_of(line: &NLine) -> usize {
        leading_ws(&line.text)
    }

    fn parse_map(&mut self, indent: usize) -> Result<Vec<(String, Value)>, Diagnostic> {
        let mut entries = Vec::new();
        while let Some(line) = self.peek() {
            let li = Self::indent_of(line);
            if li < indent {
                break;
            }
            if li > indent {
                return Err(Diagnostic::error(
                    "unexpected indentation",
                    loc(self.file, line),
                ));
            }
            let text = &line.text[li..];
            if text.starts_with("- ") || text == "-" {
                break;
            }
            let Some((key, rest)) = split_key(text) else {
                return Err(Diagnostic::error(
                    format!("expected a `key: value` line, found `{}`", text),
                    loc(self.file, line),
                ));
            };
            let key = key.to_string();
            self.pos += 1;
            let value = if rest.is_empty() {
                self.parse_nested(indent)?
            } else {
                parse_scalar(rest)
            };
            entries.push((key, value));
        }
        Ok(entries)
    }

    /// The value of a `key:` line with nothing after the colon: a
    /// deeper-indented map or list, or an empty scalar.
    fn parse_nested(&mut self, indent: usize) -> Result<Value, Diagnostic> {
        match self.peek() {
            Some(next) if Self::indent_of(next) > indent => {
                let ni = Self::indent_of(next);
                if next.text[ni..].starts_with("- ") || next.text[ni..].trim_end() == "-" {
                    Ok(Value::List(self.parse_list(ni)?))
                } else {
                    Ok(Value::Map(self.parse_map(ni)?))
                }
            }
            _ => Ok(Value::Scalar(String::new())),
        }
    }

    fn parse_list(&mut self, indent: usize) -> Result<Vec<Value>, Diagnostic> {
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            let li = Self::indent_of(line);
            if li != indent {
                break;
            }
            let text = &line.text[li..];
            if !text.starts_with("- ") && text != "-" {
                break;
            }
            let rest = text[1..].trim_start();
            let rest_indent = li + (text.len() - text[1..].trim_start().len());
            self.pos += 1;

            if rest.is_empty() {
                items.push(self.parse_nested(li)?);
            } else if let Some((key, val)) = split_key(rest) {
                let mut entries = vec![(
                    key.to_string(),
                    if val.is_empty() {
                        self.parse_nested(rest_indent)?
                    } else {
                        parse_scalar(val)
                    },
                )];
                entries.extend(self.parse_map(rest_indent)?);
                items.push(Value::Map(entries));
            } else {
                items.push(Value::Scalar(rest.to_string()));
            }
        }
        Ok(items)
    }
}

/// Inline flow lists (`[a, b]`) collapse to a list of scalars.
fn parse_scalar(rest: &str) -> Value {
    if let Some(inner) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        return Value::List(
            inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::Scalar(s.to_string()))
                .collect(),
        );
    }
    Value::Scalar(rest.to_string())
}

fn parse_structured(api: &mut ApiFragment, body: &[NLine], file: &Path) -> Option<Diagnostic> {
    let mut parser = StructuredParser {
        content: body
            .iter()
            .filter(|l| !l.text.trim().is_empty())
            .collect(),
        pos: 0,
        file,
    };
    let entries = match parser.parse_map(0) {
        Ok(entries) => entries,
        Err(diag) => return Some(diag),
    };
    if let Some(stray) = parser.peek() {
        return Some(Diagnostic::error(
            format!("unparsed trailing line `{}`", stray.text.trim()),
            loc(file, stray),
        ));
    }

    for (key, value) in entries {
        match key.as_str() {
            "group" => api.group = Some(value.as_scalar()),
            "tags" => match value {
                Value::List(items) => {
                    api.tags.extend(items.iter().map(|v| v.as_scalar()));
                }
                other => api.tags.extend(
                    other
                        .as_scalar()
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from),
                ),
            },
            "deprecated" => api.deprecated = Some(value.as_scalar()),
            "description" => api.description = Some(value.as_scalar()),
            "queries" => apply_param_list(&mut api.queries, &value),
            "params" => apply_param_list(&mut api.params, &value),
            "headers" => apply_header_list(&mut api.headers, &value),
            "request" => {
                if let Value::Map(entries) = value {
                    for (k, v) in entries {
                        if k == "content" {
                            if let Value::Map(mimes) = v {
                                let request = api.request.get_or_insert_with(Request::default);
                                for (mime, media) in &mimes {
                                    request.content.push(media_body(mime, media));
                                }
                            }
                        }
                    }
                }
            }
            "responses" => {
                if let Value::List(items) = value {
                    for item in &items {
                        let Value::Map(entries) = item else { continue };
                        let mut response = Response::default();
                        for (k, v) in entries {
                            match k.as_str() {
                                "code" => response.code = v.as_scalar(),
                                "summary" => response.summary = v.as_scalar(),
                                "properties" => {
                                    if let Value::Map(props) = v {
                                        response.params = properties_to_params(props);
                                    }
                                }
                                _ => {}
                            }
                        }
                        if response.code.is_empty() {
                            return Some(Diagnostic::error(
                                "response entry is missing a status code",
                                Location::new(
                                    file.to_path_buf(),
                                    api.location.line,
                                    api.location.column,
                                ),
                            ));
                        }
                        if response.code.starts_with('2') || response.code.starts_with('3') {
                            api.success.push(response);
                        } else {
                            api.errors.push(response);
                        }
                    }
                }
            }
            other => {
                api.extensions
                    .entry(other.to_string())
                    .or_default()
                    .push(render_value(&value));
            }
        }
    }
    None
}

fn media_body(mime: &str, value: &Value) -> MediaBody {
    let mut media = MediaBody {
        mime: mime.to_string(),
        ..Default::default()
    };
    if let Value::Map(entries) = value {
        for (k, v) in entries {
            if k == "schema" {
                if let Value::Map(schema) = v {
                    for (sk, sv) in schema {
                        if sk == "properties" {
                            if let Value::Map(props) = sv {
                                media.params = properties_to_params(props);
                            }
                        }
                    }
                }
            }
        }
    }
    media
}

fn apply_param_list(target: &mut Vec<Param>, value: &Value) {
    let Value::List(items) = value else { return };
    for item in items {
        let Value::Map(entries) = item else { continue };
        let mut name = String::new();
        let mut param = Param::default();
        for (k, v) in entries {
            match k.as_str() {
                "name" => name = v.as_scalar(),
                "type" => param.type_name = v.as_scalar(),
                "description" => param.description = Some(v.as_scalar()),
                _ => {}
            }
        }
        if name.is_empty() {
            continue;
        }
        if param.type_name.is_empty() {
            param.type_name = "string".to_string();
        }
        let segments: Vec<String> = name.split('.').map(String::from).collect();
        param.name = segments.last().cloned().unwrap_or_default();
        insert_param(target, &segments, param);
    }
}

fn apply_header_list(target: &mut Vec<Header>, value: &Value) {
    let Value::List(items) = value else { return };
    for item in items {
        let Value::Map(entries) = item else { continue };
        let mut name = String::new();
        let mut summary = String::new();
        for (k, v) in entries {
            match k.as_str() {
                "name" => name = v.as_scalar(),
                "summary" | "description" => summary = v.as_scalar(),
                _ => {}
            }
        }
        if !name.is_empty() {
            target.push(Header { name, summary });
        }
    }
}

/// Shared with the flat grammar: schema properties become the same
/// parameter tree, dotted keys included.
fn properties_to_params(entries: &[(String, Value)]) -> Vec<Param> {
    let mut params = Vec::new();
    for (name, value) in entries {
        let mut param = Param::default();
        if let Value::Map(fields) = value {
            for (k, v) in fields {
                match k.as_str() {
                    "type" => param.type_name = v.as_scalar(),
                    "description" => param.description = Some(v.as_scalar()),
                    "properties" => {
                        if let Value::Map(children) = v {
                            param.children = properties_to_params(children);
                        }
                    }
                    _ => {}
                }
            }
        }
        if param.type_name.is_empty() {
            param.type_name = "string".to_string();
        }
        let segments: Vec<String> = name.split('.').map(String::from).collect();
        param.name = segments.last().cloned().unwrap_or_default();
        insert_param(&mut params, &segments, param);
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::scanner::scan;

    fn block(source: &str, lang: Language) -> CommentBlock {
        let mut blocks: Vec<CommentBlock> = scan(source, &lang.profile()).collect();
        assert_eq!(blocks.len(), 1, "expected exactly one comment block");
        blocks.remove(0)
    }

    fn parse(source: &str, lang: Language) -> Parsed {
        parse_block(&block(source, lang), Path::new("test.go"))
    }

    fn api_of(parsed: Parsed) -> ApiFragment {
        match parsed {
            Parsed::Fragment(Fragment::Api(api)) => api,
            other => panic!("expected an API fragment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_login_annotation() {
        let source = "\
// @api POST /users/login 登录
// @apiParam username string
// @apiParam password string
";
        let api = api_of(parse(source, Language::Go));

        assert_eq!(api.method, "POST");
        assert_eq!(api.path, "/users/login");
        assert_eq!(api.summary, "登录");
        let names: Vec<&str> = api.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["username", "password"]);
    }

    #[test]
    fn test_parse_from_block_comment_with_gutter() {
        let source = "\
/*
 * @api GET /users 列出所有用户
 * @apiQuery page int 页码
 */
";
        let api = api_of(parse(source, Language::Go));

        assert_eq!(api.method, "GET");
        assert_eq!(api.queries.len(), 1);
        assert_eq!(api.queries[0].name, "page");
        assert_eq!(api.queries[0].description.as_deref(), Some("页码"));
    }

    #[test]
    fn test_dotted_param_nests_under_parent() {
        let source = "\
// @api POST /users 创建用户
// @apiParam user object the user
// @apiParam user.id int numeric id
";
        let api = api_of(parse(source, Language::Go));

        assert_eq!(api.params.len(), 1);
        assert_eq!(api.params[0].name, "user");
        assert_eq!(api.params[0].children.len(), 1);
        assert_eq!(api.params[0].children[0].name, "id");
    }

    #[test]
    fn test_dotted_param_declared_before_parent() {
        let source = "\
// @api POST /users 创建用户
// @apiParam user.id int numeric id
// @apiParam user object the user
";
        let api = api_of(parse(source, Language::Go));

        assert_eq!(api.params.len(), 1);
        let user = &api.params[0];
        assert_eq!(user.type_name, "object");
        assert_eq!(user.description.as_deref(), Some("the user"));
        assert_eq!(user.children.len(), 1);
        assert_eq!(user.children[0].name, "id");
    }

    #[test]
    fn test_plain_comment_is_not_an_annotation() {
        let source = "// just explaining the next function\n// nothing else\n";
        assert!(matches!(
            parse(source, Language::Go),
            Parsed::NotAnAnnotation
        ));
    }

    #[test]
    fn test_api_without_path_is_malformed() {
        let source = "// @api POST\n";
        match parse(source, Language::Go) {
            Parsed::Malformed(diag) => {
                assert_eq!(diag.location.line, 1);
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_request_scope_collects_params_and_headers() {
        let source = "\
// @api POST /users 创建用户
// @apiRequest application/json
// @apiHeader Authorization bearer token
// @apiParam name string display name
";
        let api = api_of(parse(source, Language::Go));

        assert!(api.params.is_empty());
        let request = api.request.expect("request scope");
        assert_eq!(request.content.len(), 1);
        assert_eq!(request.content[0].mime, "application/json");
        assert_eq!(request.content[0].headers[0].name, "Authorization");
        assert_eq!(request.content[0].params[0].name, "name");
    }

    #[test]
    fn test_example_captured_verbatim() {
        let source = "\
// @api POST /users 创建用户
// @apiSuccess 201 created
// @apiExample json
// {
//   \"id\": 1
// }
// @apiError 400 bad request
";
        let api = api_of(parse(source, Language::Go));

        assert_eq!(api.success.len(), 1);
        assert_eq!(api.success[0].examples.len(), 1);
        assert_eq!(api.success[0].examples[0].lang, "json");
        assert_eq!(api.success[0].examples[0].text, "{\n  \"id\": 1\n}");
        assert_eq!(api.errors.len(), 1);
    }

    #[test]
    fn test_description_lines_after_header() {
        let source = "\
// @api GET /health 健康检查
// returns liveness only,
// not readiness
// @apiTags ops
";
        let api = api_of(parse(source, Language::Go));

        assert_eq!(
            api.description.as_deref(),
            Some("returns liveness only,\nnot readiness")
        );
        assert_eq!(api.tags, vec!["ops"]);
    }

    #[test]
    fn test_unknown_tags_kept_as_extensions() {
        let source = "\
// @api GET /ping ping
// @apiRateLimit 100/min
";
        let api = api_of(parse(source, Language::Go));
        assert_eq!(api.extensions["apiratelimit"], vec!["100/min"]);
    }

    #[test]
    fn test_structured_block_grammar() {
        let source = "\
// @api PUT /users/{id} 更新用户
// group: users
// tags:
//   - admin
//   - audit
// request:
//   content:
//     application/json:
//       schema:
//         type: object
//         properties:
//           name:
//             type: string
//             description: display name
//           address.city:
//             type: string
// responses:
//   - code: 200
//     summary: updated
//   - code: 404
//     summary: missing
";
        let api = api_of(parse(source, Language::Go));

        assert_eq!(api.group.as_deref(), Some("users"));
        assert_eq!(api.tags, vec!["admin", "audit"]);
        let request = api.request.expect("request");
        assert_eq!(request.content[0].mime, "application/json");
        let params = &request.content[0].params;
        assert_eq!(params[0].name, "name");
        assert_eq!(params[0].description.as_deref(), Some("display name"));
        assert_eq!(params[1].name, "address");
        assert_eq!(params[1].children[0].name, "city");
        assert_eq!(api.success.len(), 1);
        assert_eq!(api.errors.len(), 1);
        assert_eq!(api.errors[0].code, "404");
    }

    #[test]
    fn test_structured_inline_tags_list() {
        let source = "\
// @api GET /items 列表
// tags: [a, b]
";
        let api = api_of(parse(source, Language::Go));
        assert_eq!(api.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_apidoc_metadata_block() {
        let source = "\
// @apidoc 订单服务
// @apiVersion 1.2.0
// @apiBaseURL https://api.example.com
// @apiLicense MIT https://opensource.org/licenses/MIT
// @apiGroup orders
// @apiContent
// 服务说明第一行
// second line
";
        let parsed = parse(source, Language::Go);
        let meta = match parsed {
            Parsed::Fragment(Fragment::Meta(meta)) => meta,
            other => panic!("expected a meta fragment, got {:?}", other),
        };

        assert_eq!(meta.meta.title.as_deref(), Some("订单服务"));
        assert_eq!(meta.meta.version.as_deref(), Some("1.2.0"));
        assert_eq!(meta.meta.group.as_deref(), Some("orders"));
        let license = meta.meta.license.expect("license");
        assert_eq!(license.name, "MIT");
        assert_eq!(
            meta.meta.content.as_deref(),
            Some("服务说明第一行\nsecond line")
        );
    }

    #[test]
    fn test_swift_block_annotation_parses_identically() {
        let go = "\
// @api DELETE /sessions 注销
// @apiParam token string
";
        let swift = "\
/* @api DELETE /sessions 注销
   @apiParam token string */
";
        let from_go = api_of(parse(go, Language::Go));
        let from_swift = api_of(parse(swift, Language::Swift));

        assert_eq!(from_go.method, from_swift.method);
        assert_eq!(from_go.path, from_swift.path);
        assert_eq!(from_go.params, from_swift.params);
    }
}
