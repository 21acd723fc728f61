use bytes::Bytes;
use serde::Serialize;
use serde_json_bytes::Value;

use super::error::FileUploadError;
use super::map_field::MapField;
use super::multipart_form_data::MultipartFormData;
use super::storage::TempStorage;
use super::Result as UploadResult;

const OPERATIONS_FIELD: &str = "operations";
const MAP_FIELD: &str = "map";

static NULL: Value = Value::Null;

/// The JSON body replacing the multipart body.
#[derive(Serialize)]
struct RewrittenBody<'a> {
    variables: &'a Value,
    query: &'a Value,
    operations: &'a Value,
    map: &'a MapField,
}

/// Outcome of a successful rewrite.
#[derive(Debug)]
pub(crate) struct Rewritten {
    pub(crate) body: Bytes,
    pub(crate) uploads: usize,
    pub(crate) substitutions: usize,
}

/// Substitutes every path of the `map` field inside `operations` and serializes the result.
///
/// Plain form values sharing a field index are written as strings; otherwise the file part
/// is stored through `storage` and its [`crate::Upload`] description is written. Files stored
/// before a failure are left in place.
pub(crate) fn rewrite_operations(
    form: &MultipartFormData,
    storage: &TempStorage,
) -> UploadResult<Rewritten> {
    let raw_map = required_field(form, MAP_FIELD)?;
    let raw_operations = required_field(form, OPERATIONS_FIELD)?;

    let mut operations: Value =
        serde_json::from_str(raw_operations).map_err(|err| FileUploadError::MalformedQuery {
            field: OPERATIONS_FIELD,
            reason: err.to_string(),
        })?;
    if !matches!(operations, Value::Object(_) | Value::Array(_)) {
        return Err(FileUploadError::MalformedQuery {
            field: OPERATIONS_FIELD,
            reason: "expected an operation object or a list of operations".to_string(),
        });
    }
    let map = MapField::parse(raw_map)?;

    let mut uploads = 0;
    let mut substitutions = 0;
    for (index, path) in map.entries() {
        let target = path.resolve(&mut operations)?;
        let value = match form.value(index).filter(|value| !value.is_empty()) {
            Some(value) => {
                substitutions += 1;
                Value::String(value.to_string().into())
            }
            None => {
                uploads += 1;
                storage.materialize(form, index)?.into()
            }
        };
        target.assign(value)?;
    }

    let body = serde_json::to_vec(&RewrittenBody {
        variables: top_level(&operations, "variables"),
        query: top_level(&operations, "query"),
        operations: &operations,
        map: &map,
    })
    .map_err(|err| FileUploadError::MalformedQuery {
        field: OPERATIONS_FIELD,
        reason: err.to_string(),
    })?;

    Ok(Rewritten {
        body: body.into(),
        uploads,
        substitutions,
    })
}

/// A field of a single operation, `null` for batches.
fn top_level<'v>(operations: &'v Value, name: &str) -> &'v Value {
    operations
        .as_object()
        .and_then(|object| object.get(name))
        .unwrap_or(&NULL)
}

fn required_field<'f>(form: &'f MultipartFormData, name: &'static str) -> UploadResult<&'f str> {
    form.value(name).ok_or(FileUploadError::MissingField(name))
}
