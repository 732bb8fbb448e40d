//! Data model for parsed API annotations.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A source code location, 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: PathBuf, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// One parsed annotation block, prior to cross-file assembly.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Api(ApiFragment),
    Meta(MetaFragment),
}

impl Fragment {
    pub fn location(&self) -> &Location {
        match self {
            Fragment::Api(api) => &api.location,
            Fragment::Meta(meta) => &meta.location,
        }
    }
}

/// A single documented API operation.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ApiFragment {
    pub method: String,
    pub path: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Param>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    #[serde(rename = "apiSuccess", skip_serializing_if = "Vec::is_empty")]
    pub success: Vec<Response>,
    #[serde(rename = "apiError", skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Response>,
    #[serde(rename = "apiExample", skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Vec<String>>,
    pub location: Location,
}

impl ApiFragment {
    /// Stable identifier inside a document.
    pub fn identifier(&self) -> String {
        format!("{} {}", self.method.to_uppercase(), self.path)
    }
}

/// A named parameter. Dotted declarations (`user.id`) nest as children
/// of their parent parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<Param>,
}

/// A request or response header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub summary: String,
}

/// A verbatim example payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Example {
    pub lang: String,
    pub text: String,
}

/// Request bodies keyed by media type.
///
/// Serializes as `content.<mime>.schema.properties.<name>.{type,description}`,
/// the shape the downstream renderer expects.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub content: Vec<MediaBody>,
}

/// The body description for one media type.
#[derive(Debug, Clone, Default)]
pub struct MediaBody {
    pub mime: String,
    pub params: Vec<Param>,
    pub headers: Vec<Header>,
    pub examples: Vec<Example>,
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("content", &ContentMap(&self.content))?;
        map.end()
    }
}

struct ContentMap<'a>(&'a [MediaBody]);

impl Serialize for ContentMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for body in self.0 {
            map.serialize_entry(&body.mime, &MediaBodyRepr(body))?;
        }
        map.end()
    }
}

struct MediaBodyRepr<'a>(&'a MediaBody);

impl Serialize for MediaBodyRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let body = self.0;
        let mut map = serializer.serialize_map(None)?;
        if !body.params.is_empty() {
            map.serialize_entry("schema", &SchemaRepr(&body.params))?;
        }
        if !body.headers.is_empty() {
            map.serialize_entry("headers", &body.headers)?;
        }
        if !body.examples.is_empty() {
            map.serialize_entry("apiExample", &body.examples)?;
        }
        map.end()
    }
}

struct SchemaRepr<'a>(&'a [Param]);

impl Serialize for SchemaRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &PropertiesRepr(self.0))?;
        map.end()
    }
}

// Properties keep declaration order, which is why this is a Vec walked
// manually rather than a map keyed by name.
struct PropertiesRepr<'a>(&'a [Param]);

impl Serialize for PropertiesRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for param in self.0 {
            map.serialize_entry(&param.name, &PropertyRepr(param))?;
        }
        map.end()
    }
}

struct PropertyRepr<'a>(&'a Param);

impl Serialize for PropertyRepr<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let param = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &param.type_name)?;
        if let Some(description) = &param.description {
            map.serialize_entry("description", description)?;
        }
        if !param.children.is_empty() {
            map.serialize_entry("properties", &PropertiesRepr(&param.children))?;
        }
        map.end()
    }
}

/// One documented response, keyed by status code.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Response {
    pub code: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
    #[serde(rename = "apiExample", skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Example>,
}

/// Document-level metadata and shared defaults, from `@apidoc` blocks.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DocMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct License {
    pub name: String,
    pub url: String,
}

/// A metadata fragment with its source position.
#[derive(Debug, Clone, Serialize)]
pub struct MetaFragment {
    #[serde(flatten)]
    pub meta: DocMeta,
    pub location: Location,
}

/// The assembled document: merged metadata plus all API operations in
/// deterministic (file, position) order.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ApiDocument {
    pub meta: DocMeta,
    pub apis: Vec<ApiFragment>,
}
