use indexmap::IndexMap;
use serde::Serialize;

use super::error::FileUploadError;
use super::path::MapPath;
use super::Result as UploadResult;

pub(super) type MapFieldRaw = IndexMap<String, Vec<String>>;

/// The `map` multipart field: which variable paths each multipart field fills.
///
/// Entries keep the order the client sent them in.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub(super) struct MapField(MapFieldRaw);

impl MapField {
    pub(super) fn parse(raw: &str) -> UploadResult<Self> {
        serde_json::from_str(raw)
            .map(Self)
            .map_err(|err| FileUploadError::MalformedQuery {
                field: "map",
                reason: err.to_string(),
            })
    }

    /// Every (field index, path) pair, in map order then list order.
    pub(super) fn entries(&self) -> impl Iterator<Item = (&str, MapPath<'_>)> {
        self.0.iter().flat_map(|(index, paths)| {
            paths
                .iter()
                .map(move |path| (index.as_str(), MapPath::new(path)))
        })
    }
}
