use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use super::config::FileUploadsConfig;
use super::error::FileUploadError;
use super::multipart_form_data::MultipartFormData;
use super::sniff::detect_content_type;
use super::Result as UploadResult;
use crate::upload::Upload;

/// Writes uploaded files to uniquely named files in a directory.
#[derive(Clone, Debug)]
pub(crate) struct TempStorage {
    dir: PathBuf,
    prefix: String,
}

impl TempStorage {
    pub(crate) fn new(dir: PathBuf, prefix: impl Into<String>) -> Self {
        Self {
            dir,
            prefix: prefix.into(),
        }
    }

    pub(crate) fn from_config(config: &FileUploadsConfig) -> Self {
        Self::new(config.storage_dir(), config.file_prefix.clone())
    }

    /// Stores the file part named `index` and describes it as an [`Upload`].
    pub(crate) fn materialize(
        &self,
        form: &MultipartFormData,
        index: &str,
    ) -> UploadResult<Upload> {
        let part = form
            .file(index)
            .ok_or_else(|| FileUploadError::FilePart(index.to_string()))?;
        let storage_error = |source| FileUploadError::Storage {
            filename: part.filename.clone(),
            source,
        };

        let mime_type = detect_content_type(&part.data);
        let extension = Path::new(&part.filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix(&self.prefix)
            .suffix(&extension)
            .tempfile_in(&self.dir)
            .map_err(storage_error)?;
        file.write_all(&part.data).map_err(storage_error)?;
        file.flush().map_err(storage_error)?;
        let (_file, filepath) = file.keep().map_err(|err| storage_error(err.error))?;

        tracing::trace!(
            index,
            filename = %part.filename,
            mimetype = mime_type,
            filepath = %filepath.display(),
            "stored uploaded file"
        );
        Ok(Upload {
            filename: part.filename.clone(),
            mime_type: mime_type.to_string(),
            filepath,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_stores_the_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TempStorage::new(dir.path().to_path_buf(), "graphqlupload-");
        let form = MultipartFormData::from_parts(&[], &[("0", "Notes.TXT", &b"hello"[..])]);

        let upload = storage.materialize(&form, "0").unwrap();

        assert_eq!(upload.filename, "Notes.TXT");
        assert_eq!(upload.mime_type, "text/plain; charset=utf-8");
        assert!(upload.filepath.starts_with(dir.path()));
        let name = upload.filepath.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("graphqlupload-"));
        assert!(name.ends_with(".txt"));
        assert_eq!(std::fs::read(&upload.filepath).unwrap(), b"hello");
    }

    #[test]
    fn it_generates_unique_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TempStorage::new(dir.path().to_path_buf(), "graphqlupload-");
        let form = MultipartFormData::from_parts(&[], &[("0", "a", &b"\x89PNG\x0D\x0A\x1A\x0A"[..])]);

        let first = storage.materialize(&form, "0").unwrap();
        let second = storage.materialize(&form, "0").unwrap();

        assert_ne!(first.filepath, second.filepath);
        assert_eq!(first.mime_type, "image/png");
        // no extension on the client file name
        assert!(!first
            .filepath
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains('.'));
    }

    #[test]
    fn it_fails_on_missing_file_parts() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TempStorage::new(dir.path().to_path_buf(), "graphqlupload-");
        let form = MultipartFormData::from_parts(&[("0", "not a file")], &[]);

        let err = storage.materialize(&form, "0").unwrap_err();
        assert!(matches!(err, FileUploadError::FilePart(index) if index == "0"));
    }

    #[test]
    fn it_fails_when_the_directory_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TempStorage::new(dir.path().join("missing"), "graphqlupload-");
        let form = MultipartFormData::from_parts(&[], &[("0", "a.txt", &b"hello"[..])]);

        let err = storage.materialize(&form, "0").unwrap_err();
        assert!(matches!(err, FileUploadError::Storage { .. }));
    }
}
