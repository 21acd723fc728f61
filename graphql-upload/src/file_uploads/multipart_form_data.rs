use bytes::Bytes;
use bytesize::ByteSize;
use futures::Stream;
use indexmap::IndexMap;
use multer::Constraints;
use multer::Multipart;
use multer::SizeLimit;

use super::Result as UploadResult;

/// A file part of a multipart request, fully buffered.
#[derive(Clone, Debug)]
pub(crate) struct FilePart {
    pub(crate) filename: String,
    pub(crate) data: Bytes,
}

/// Plain values and file parts of a multipart request, keyed by field name.
///
/// Parts carrying a `filename` are files, every other part is a plain value. When a name is
/// repeated the first occurrence wins.
#[derive(Clone, Debug, Default)]
pub(crate) struct MultipartFormData {
    values: IndexMap<String, String>,
    files: IndexMap<String, FilePart>,
}

impl MultipartFormData {
    pub(crate) async fn read<S, O, E>(
        stream: S,
        boundary: String,
        max_parse_size: ByteSize,
    ) -> UploadResult<Self>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(max_parse_size.as_u64()));
        let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match field.file_name().map(str::to_owned) {
                Some(filename) => {
                    let data = field.bytes().await?;
                    form.files
                        .entry(name)
                        .or_insert(FilePart { filename, data });
                }
                None => {
                    let value = field.text().await?;
                    form.values.entry(name).or_insert(value);
                }
            }
        }
        Ok(form)
    }

    pub(crate) fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub(crate) fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(values: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            files: files
                .iter()
                .map(|(name, filename, data)| {
                    (
                        name.to_string(),
                        FilePart {
                            filename: filename.to_string(),
                            data: Bytes::copy_from_slice(data),
                        },
                    )
                })
                .collect(),
        }
    }
}
