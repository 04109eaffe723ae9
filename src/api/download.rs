// Build-script tarball download for the `derive` command.

use super::transport::Transport;
use super::ApiClient;
use crate::error::{AurError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl<T: Transport> ApiClient<T> {
    /// Fetch `/packages/<name>/<name>.tar.gz`. `None` when the service does
    /// not have it.
    pub fn download(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let res = self.get(&format!("/packages/{name}/{name}.tar.gz"))?;
        if !res.is_success() {
            debug!(name, status = res.status, "no tarball");
            return Ok(None);
        }
        Ok(Some(res.body))
    }
}

/// Unpack a downloaded tarball into `dest`. The transport may already have
/// inflated it, so plain tar data is accepted as well.
pub fn unpack(name: &str, bytes: &[u8], dest: &Path) -> Result<()> {
    let reader: Box<dyn Read + '_> = if bytes.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(bytes))
    } else {
        Box::new(bytes)
    };
    tar::Archive::new(reader)
        .unpack(dest)
        .map_err(|source| AurError::Extract {
            name: name.to_string(),
            source,
        })
}
