use serde_json_bytes::ByteString;
use serde_json_bytes::Value;

use super::error::FileUploadError;
use super::Result as UploadResult;

/// Object keys named like this are not traversed: attachment lists are addressed from the
/// object holding them, see [`assign`].
const ATTACHMENTS: &str = "attachments";

/// A dotted path from the `map` field, e.g. `variables.input.0.file`.
#[derive(Debug, Clone, Copy)]
pub(super) struct MapPath<'a> {
    raw: &'a str,
}

impl<'a> MapPath<'a> {
    pub(super) fn new(raw: &'a str) -> Self {
        Self { raw }
    }

    pub(super) fn as_str(&self) -> &'a str {
        self.raw
    }

    fn segments(&self) -> Vec<&'a str> {
        self.raw.split('.').collect()
    }

    /// Finds the container this path writes into.
    pub(super) fn resolve<'v>(&self, operations: &'v mut Value) -> UploadResult<Target<'v, 'a>> {
        let segments = self.segments();
        let (key, traversal) = match segments.split_last() {
            Some((key, traversal)) if !key.is_empty() => (*key, traversal),
            _ => return Err(FileUploadError::path(self.raw, "empty path")),
        };
        Ok(Target {
            parent: resolve_parent(operations, traversal, self.raw)?,
            previous: traversal.last().copied(),
            key,
            path: self.raw,
        })
    }
}

/// The resolved location of a [`MapPath`].
pub(super) struct Target<'v, 'a> {
    parent: &'v mut Value,
    previous: Option<&'a str>,
    key: &'a str,
    path: &'a str,
}

impl Target<'_, '_> {
    pub(super) fn assign(self, value: Value) -> UploadResult<()> {
        assign(self.parent, self.previous, self.key, value, self.path)
    }
}

/// Walks `segments` from the root and returns the container they lead to.
///
/// Arrays are descended into by position, objects by key.
pub(super) fn resolve_parent<'v>(
    root: &'v mut Value,
    segments: &[&str],
    path: &str,
) -> UploadResult<&'v mut Value> {
    let mut current = root;
    for segment in segments {
        if *segment == ATTACHMENTS && current.is_object() {
            continue;
        }
        current = match current {
            Value::Object(object) => object
                .get_mut(*segment)
                .ok_or_else(|| FileUploadError::path(path, format!("missing key '{segment}'")))?,
            Value::Array(list) => {
                let index = parse_index(segment, path)?;
                let len = list.len();
                list.get_mut(index).ok_or_else(|| {
                    FileUploadError::path(
                        path,
                        format!("index {index} is out of bounds for a list of {len} elements"),
                    )
                })?
            }
            _ => {
                return Err(FileUploadError::path(
                    path,
                    format!("cannot look up '{segment}' inside a scalar value"),
                ))
            }
        };
    }

    match current {
        Value::Object(_) | Value::Array(_) => Ok(current),
        _ => Err(FileUploadError::path(
            path,
            "it does not point to an object or a list",
        )),
    }
}

/// Writes `value` under `target` inside `parent`.
///
/// When `parent` is an object whose `previous` entry is a list, `target` is an index into
/// that list: this is how `attachments` paths land.
pub(super) fn assign(
    parent: &mut Value,
    previous: Option<&str>,
    target: &str,
    value: Value,
    path: &str,
) -> UploadResult<()> {
    match parent {
        Value::Object(object) => {
            if let Some(Value::Array(list)) = previous.and_then(|key| object.get_mut(key)) {
                return replace_at(list, target, value, path);
            }
            object.insert(ByteString::from(target.to_string()), value);
            Ok(())
        }
        Value::Array(list) => replace_at(list, target, value, path),
        _ => Err(FileUploadError::path(
            path,
            "it does not point to an object or a list",
        )),
    }
}

fn replace_at(list: &mut [Value], target: &str, value: Value, path: &str) -> UploadResult<()> {
    let index = parse_index(target, path)?;
    let len = list.len();
    match list.get_mut(index) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(FileUploadError::path(
            path,
            format!("index {index} is out of bounds for a list of {len} elements"),
        )),
    }
}

fn parse_index(segment: &str, path: &str) -> UploadResult<usize> {
    segment.parse::<usize>().map_err(|err| {
        FileUploadError::path(path, format!("'{segment}' is not a valid list index: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;

    fn assign(operations: &mut Value, path: &str, value: Value) -> UploadResult<()> {
        MapPath::new(path).resolve(operations)?.assign(value)
    }

    #[test]
    fn it_assigns_a_top_level_variable() {
        let mut operations = json!({ "query": "mutation", "variables": { "file": null } });
        assign(&mut operations, "variables.file", json!("x")).unwrap();
        assert_eq!(
            operations,
            json!({ "query": "mutation", "variables": { "file": "x" } })
        );
    }

    #[test]
    fn it_assigns_inside_a_list_of_objects() {
        let mut operations = json!({
            "variables": { "input": [{ "file": null }, { "file": null }] }
        });
        assign(&mut operations, "variables.input.1.file", json!("x")).unwrap();
        assert_eq!(
            operations,
            json!({ "variables": { "input": [{ "file": null }, { "file": "x" }] } })
        );
    }

    #[test]
    fn it_replaces_list_elements_without_appending() {
        let mut operations = json!({ "variables": { "files": [null, null] } });
        assign(&mut operations, "variables.files.1", json!("x")).unwrap();
        assert_eq!(
            operations,
            json!({ "variables": { "files": [null, "x"] } })
        );

        let err = assign(&mut operations, "variables.files.2", json!("y")).unwrap_err();
        assert!(matches!(err, FileUploadError::PathResolution { .. }));
        assert_eq!(
            operations,
            json!({ "variables": { "files": [null, "x"] } })
        );
    }

    #[test]
    fn it_assigns_attachments_from_their_parent_object() {
        let mut operations = json!({
            "variables": { "attachments": [null, null], "title": "t" }
        });
        assign(&mut operations, "variables.attachments.0", json!("x")).unwrap();
        assert_eq!(
            operations,
            json!({ "variables": { "attachments": ["x", null], "title": "t" } })
        );

        let err = assign(&mut operations, "variables.attachments.first", json!("x")).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid path 'variables.attachments.first' found inside 'map' field: 'first' is not a valid list index: invalid digit found in string");
    }

    #[test]
    fn it_resolves_batched_operations_by_position() {
        let mut operations = json!([
            { "variables": { "file": null } },
            { "variables": { "file": null } }
        ]);
        assign(&mut operations, "1.variables.file", json!("x")).unwrap();
        assert_eq!(
            operations,
            json!([
                { "variables": { "file": null } },
                { "variables": { "file": "x" } }
            ])
        );
    }

    #[test]
    fn it_fails_on_missing_branches() {
        let mut operations = json!({ "variables": { "file": null } });
        let err = assign(&mut operations, "variables.missingBranch.file", json!("x")).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid path 'variables.missingBranch.file' found inside 'map' field: missing key 'missingBranch'");

        let err = assign(&mut operations, "variables.file.name", json!("x")).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid path 'variables.file.name' found inside 'map' field: it does not point to an object or a list");

        assert!(assign(&mut operations, "", json!("x")).is_err());
        assert!(assign(&mut operations, "variables.", json!("x")).is_err());
    }

    #[test]
    fn it_fails_on_invalid_positions() {
        let mut operations = json!([{ "variables": { "file": null } }]);
        let err = assign(&mut operations, "3.variables.file", json!("x")).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"invalid path '3.variables.file' found inside 'map' field: index 3 is out of bounds for a list of 1 elements");

        let err = assign(&mut operations, "first.variables.file", json!("x")).unwrap_err();
        assert!(matches!(err, FileUploadError::PathResolution { .. }));
    }
}
