//! GraphQL multipart request middleware.
//!
//! [`FileUploadLayer`] rewrites `multipart/form-data` GraphQL requests into plain JSON
//! requests, storing every uploaded file on disk and substituting an [`Upload`] value at
//! each variable path the client mapped it to.

#![warn(unreachable_pub)]

pub mod configuration;
mod executable;
pub mod file_uploads;
pub mod upload;

pub use crate::configuration::Configuration;
pub use crate::configuration::ConfigurationError;
pub use crate::executable::main;
pub use crate::file_uploads::FileUploadError;
pub use crate::file_uploads::FileUploadLayer;
pub use crate::file_uploads::FileUploadService;
pub use crate::file_uploads::FileUploadsConfig;
pub use crate::upload::Upload;
pub use crate::upload::UploadValueError;
