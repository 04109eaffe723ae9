// Tarball submission. The multipart body is composed by hand: the submit
// page's parser is picky about part order and header spelling, and the
// tarball bytes must reach it untouched.

use super::response::{redirect_package_id, upload_error_message};
use super::transport::{HttpRequest, Transport};
use super::ApiClient;
use crate::error::{AurError, Result};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CRLF: &str = "\r\n";

/// Filename used when a reader has no name of its own.
pub const DEFAULT_TARBALL_NAME: &str = "src.tar.gz";

/// Where the tarball bytes come from.
pub enum TarballSource {
    Path(PathBuf),
    Reader {
        reader: Box<dyn Read>,
        filename: Option<String>,
    },
}

impl fmt::Debug for TarballSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TarballSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            TarballSource::Reader { filename, .. } => f
                .debug_struct("Reader")
                .field("filename", filename)
                .finish_non_exhaustive(),
        }
    }
}

impl TarballSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        TarballSource::Path(path.into())
    }

    pub fn reader(reader: impl Read + 'static, filename: Option<String>) -> Self {
        TarballSource::Reader {
            reader: Box::new(reader),
            filename,
        }
    }

    /// Read the whole tarball, returning its display name and bytes.
    pub fn load(self) -> Result<(String, Vec<u8>)> {
        match self {
            TarballSource::Path(path) => {
                let bytes = std::fs::read(&path).map_err(|source| AurError::MissingFile {
                    path: path.clone(),
                    source,
                })?;
                Ok((display_name(&path), bytes))
            }
            TarballSource::Reader {
                mut reader,
                filename,
            } => {
                let name = filename.unwrap_or_else(|| DEFAULT_TARBALL_NAME.to_string());
                let mut bytes = Vec::new();
                reader
                    .read_to_end(&mut bytes)
                    .map_err(|source| AurError::MissingFile {
                        path: PathBuf::from(&name),
                        source,
                    })?;
                Ok((name, bytes))
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_TARBALL_NAME.to_string())
}

/// A submission: tarball, category ordinal (as a string) and an optional
/// comment posted once the upload succeeds.
#[derive(Debug)]
pub struct UploadRequest {
    pub tarball: TarballSource,
    pub category: String,
    pub comment: Option<String>,
}

/// What became of the comment attached to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentStatus {
    NotRequested,
    Posted,
    /// The upload went through but posting the comment failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Accepted; the service assigned this package id.
    Uploaded { id: u64, comment: CommentStatus },
    /// Refused with a message from the submit page.
    Rejected { message: String },
    /// The response matched no known success or error marker.
    Unresolved,
}

/// A random multipart boundary, unique per request for all practical purposes.
pub fn generate_boundary() -> String {
    format!("--------------AurCli{:032x}", rand::random::<u128>())
}

/// Compose a `multipart/form-data` body: every scalar field first, then the
/// file part, then the closing delimiter.
pub fn compose_multipart(
    boundary: &str,
    fields: &[(&str, &str)],
    file_field: &str,
    filename: &str,
    contents: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(contents.len() + 512);
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());
        body.extend_from_slice(
            format!("content-disposition: form-data; name=\"{name}\"{CRLF}{CRLF}").as_bytes(),
        );
        body.extend_from_slice(format!("{value}{CRLF}").as_bytes());
    }
    body.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());
    body.extend_from_slice(
        format!(
            "content-disposition: form-data; name=\"{file_field}\"; filename=\"{filename}\"{CRLF}"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("content-type: application/x-gzip{CRLF}").as_bytes());
    body.extend_from_slice(format!("content-transfer-encoding: binary{CRLF}{CRLF}").as_bytes());
    body.extend_from_slice(contents);
    body.extend_from_slice(CRLF.as_bytes());
    body.extend_from_slice(format!("--{boundary}--{CRLF}").as_bytes());
    body
}

impl<T: Transport> ApiClient<T> {
    /// Submit a tarball. A comment on the request is posted to the new
    /// package after a successful upload; its fate is part of the outcome.
    pub fn upload(&self, request: UploadRequest) -> Result<UploadOutcome> {
        self.require_session()?;
        let (filename, contents) = request.tarball.load()?;

        let boundary = generate_boundary();
        let body = compose_multipart(
            &boundary,
            &[("pkgsubmit", "1"), ("category", &request.category)],
            "pfile",
            &filename,
            &contents,
        );
        let len = body.len();
        let req = HttpRequest::post(self.url("/pkgsubmit.php"), body)
            .header(
                "content-type",
                format!("multipart/form-data; boundary=\"{boundary}\""),
            )
            .header("content-length", len.to_string());
        let res = self.transport.send(self.with_cookie(req))?;

        if let Some(id) = redirect_package_id(&res) {
            info!(%filename, id, "uploaded");
            let comment = match request.comment.as_deref() {
                None => CommentStatus::NotRequested,
                Some(text) => match self.add_comment(id, text) {
                    Ok(()) => CommentStatus::Posted,
                    Err(e) => {
                        warn!(id, error = %e, "upload succeeded but the comment was not posted");
                        CommentStatus::Failed(e.to_string())
                    }
                },
            };
            return Ok(UploadOutcome::Uploaded { id, comment });
        }

        Ok(match upload_error_message(&res.text()) {
            Some(message) => UploadOutcome::Rejected { message },
            None => UploadOutcome::Unresolved,
        })
    }
}
