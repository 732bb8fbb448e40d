//! Document assembler: joins fragments from all files into one
//! document.
//!
//! This is the single serialization point of the pipeline. It merges
//! metadata fragments, applies group/tag inheritance and rejects
//! duplicate `METHOD path` identifiers — ambiguous documentation is
//! worse than missing documentation, so that one is a hard error.

use crate::annotation::{ApiDocument, ApiFragment, DocMeta, Fragment, Location};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Assemble fragments, in arrival order, into a document.
///
/// Callers feed fragments sorted by (file, source position); the
/// resulting `apis` list keeps that order.
pub fn assemble(fragments: Vec<Fragment>) -> Result<ApiDocument> {
    let mut meta = DocMeta::default();
    let mut file_defaults: HashMap<PathBuf, (Option<String>, Vec<String>)> = HashMap::new();

    // Metadata first: an API fragment may precede the @apidoc block of
    // its own file, yet still inherits from it.
    for fragment in &fragments {
        if let Fragment::Meta(m) = fragment {
            merge_meta(&mut meta, &m.meta);
            let defaults = file_defaults
                .entry(m.location.file.clone())
                .or_default();
            if defaults.0.is_none() {
                defaults.0 = m.meta.group.clone();
            }
            if defaults.1.is_empty() {
                defaults.1 = m.meta.tags.clone();
            }
        }
    }

    let mut seen: HashMap<String, Location> = HashMap::new();
    let mut apis = Vec::new();

    for fragment in fragments {
        let Fragment::Api(mut api) = fragment else {
            continue;
        };

        inherit_defaults(&mut api, &file_defaults, &meta);

        let key = api.identifier();
        if let Some(first) = seen.get(&key) {
            return Err(Error::DuplicateIdentifier {
                key,
                first: first.clone(),
                second: api.location.clone(),
            });
        }
        seen.insert(key, api.location.clone());
        apis.push(api);
    }

    Ok(ApiDocument { meta, apis })
}

/// Later metadata fills only fields still unset, so the first
/// declaration of a field wins regardless of file order.
fn merge_meta(target: &mut DocMeta, incoming: &DocMeta) {
    if target.title.is_none() {
        target.title = incoming.title.clone();
    }
    if target.version.is_none() {
        target.version = incoming.version.clone();
    }
    if target.base_url.is_none() {
        target.base_url = incoming.base_url.clone();
    }
    if target.license.is_none() {
        target.license = incoming.license.clone();
    }
    if target.group.is_none() {
        target.group = incoming.group.clone();
    }
    if target.tags.is_empty() {
        target.tags = incoming.tags.clone();
    }
    if target.content.is_none() {
        target.content = incoming.content.clone();
    }
    for (key, values) in &incoming.extensions {
        target
            .extensions
            .entry(key.clone())
            .or_default()
            .extend(values.iter().cloned());
    }
}

/// A fragment that omits group or tags inherits them from its own
/// file's metadata, then from the document-wide metadata.
fn inherit_defaults(
    api: &mut ApiFragment,
    file_defaults: &HashMap<PathBuf, (Option<String>, Vec<String>)>,
    meta: &DocMeta,
) {
    let own_file = file_defaults.get(&api.location.file);

    if api.group.is_none() {
        api.group = own_file
            .and_then(|(group, _)| group.clone())
            .or_else(|| meta.group.clone());
    }
    if api.tags.is_empty() {
        api.tags = own_file
            .map(|(_, tags)| tags.clone())
            .filter(|tags| !tags.is_empty())
            .unwrap_or_else(|| meta.tags.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MetaFragment;
    use std::path::Path;

    fn api(method: &str, path: &str, file: &str, line: usize) -> Fragment {
        Fragment::Api(ApiFragment {
            method: method.to_string(),
            path: path.to_string(),
            summary: "s".to_string(),
            location: Location::new(PathBuf::from(file), line, 1),
            ..Default::default()
        })
    }

    fn meta_with_group(group: &str, file: &str) -> Fragment {
        Fragment::Meta(MetaFragment {
            meta: DocMeta {
                title: Some("t".to_string()),
                group: Some(group.to_string()),
                ..Default::default()
            },
            location: Location::new(PathBuf::from(file), 1, 1),
        })
    }

    #[test]
    fn test_duplicate_identifier_is_a_hard_error() {
        let fragments = vec![
            api("POST", "/users", "a.go", 10),
            api("post", "/users", "b.go", 20),
        ];

        match assemble(fragments) {
            Err(Error::DuplicateIdentifier { key, first, second }) => {
                assert_eq!(key, "POST /users");
                assert_eq!(first.file, Path::new("a.go"));
                assert_eq!(second.file, Path::new("b.go"));
            }
            other => panic!("expected DuplicateIdentifier, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_same_path_different_methods_allowed() {
        let fragments = vec![
            api("GET", "/users", "a.go", 1),
            api("POST", "/users", "a.go", 9),
        ];

        let doc = assemble(fragments).unwrap();
        assert_eq!(doc.apis.len(), 2);
    }

    #[test]
    fn test_group_inherited_from_same_file_meta() {
        let fragments = vec![
            meta_with_group("accounts", "a.go"),
            api("GET", "/users", "a.go", 5),
            api("GET", "/orders", "b.go", 5),
        ];

        let doc = assemble(fragments).unwrap();
        assert_eq!(doc.apis[0].group.as_deref(), Some("accounts"));
        // the other file has no metadata of its own and falls back to
        // the document default
        assert_eq!(doc.apis[1].group.as_deref(), Some("accounts"));
    }

    #[test]
    fn test_explicit_group_not_overridden() {
        let mut explicit = ApiFragment {
            method: "GET".to_string(),
            path: "/users".to_string(),
            summary: "s".to_string(),
            location: Location::new(PathBuf::from("a.go"), 3, 1),
            ..Default::default()
        };
        explicit.group = Some("own".to_string());

        let fragments = vec![meta_with_group("accounts", "a.go"), Fragment::Api(explicit)];
        let doc = assemble(fragments).unwrap();
        assert_eq!(doc.apis[0].group.as_deref(), Some("own"));
    }

    #[test]
    fn test_meta_fields_merge_first_wins() {
        let first = Fragment::Meta(MetaFragment {
            meta: DocMeta {
                title: Some("first".to_string()),
                ..Default::default()
            },
            location: Location::new(PathBuf::from("a.go"), 1, 1),
        });
        let second = Fragment::Meta(MetaFragment {
            meta: DocMeta {
                title: Some("second".to_string()),
                version: Some("2.0".to_string()),
                ..Default::default()
            },
            location: Location::new(PathBuf::from("b.go"), 1, 1),
        });

        let doc = assemble(vec![first, second]).unwrap();
        assert_eq!(doc.meta.title.as_deref(), Some("first"));
        assert_eq!(doc.meta.version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_apis_keep_arrival_order() {
        let fragments = vec![
            api("GET", "/a", "a.go", 1),
            api("GET", "/b", "a.go", 8),
            api("GET", "/c", "b.go", 2),
        ];

        let doc = assemble(fragments).unwrap();
        let paths: Vec<&str> = doc.apis.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c"]);
    }
}
