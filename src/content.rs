//! Content store
//!
//! Holds the page served for valid requests. A loaded page is a complete
//! response (fixed 200 header prefix followed by the file bytes) built in a
//! fresh buffer and swapped in only once it is finished. Failed loads drop
//! the current page so the built-in default is served until a later load
//! succeeds.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{error, info};

use crate::http::response::{default_page, header_prefix};

/// Size of each read while copying the file into the page buffer.
const READ_CHUNK: usize = 4096;

/// Whether a load happens at startup or in response to a reload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Initial,
    Reload,
}

/// A content file could not be turned into a page.
#[derive(Debug)]
pub struct ContentError {
    path: PathBuf,
    source: io::Error,
}

impl ContentError {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can not read html file {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for ContentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// The page served for valid requests.
#[derive(Debug, Default)]
pub struct ContentStore {
    path: Option<PathBuf>,
    page: Option<Bytes>,
}

impl ContentStore {
    /// A store that always serves the built-in default page.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store backed by `path`. Nothing is read until [`ContentStore::load`].
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            page: None,
        }
    }

    /// Points the store at a different file. The current page stays until
    /// the next load.
    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// Whether a file-backed page is installed.
    pub fn is_loaded(&self) -> bool {
        self.page.is_some()
    }

    /// Bytes written for a valid request.
    pub fn current(&self) -> &[u8] {
        match &self.page {
            Some(page) => &page[..],
            None => default_page(),
        }
    }

    /// (Re)builds the page from the configured file.
    ///
    /// Returns the size of the installed page (header prefix included), or
    /// `Ok(0)` when no file is configured. On failure the previous page is
    /// discarded and the default page is served from then on.
    pub fn load(&mut self, kind: LoadKind) -> Result<usize, ContentError> {
        let Some(path) = self.path.clone() else {
            return Ok(0);
        };

        match build_page(&path) {
            Ok(page) => {
                let size = page.len();
                self.page = Some(page);
                match kind {
                    LoadKind::Initial => info!(path = %path.display(), bytes = size, "Loaded html file"),
                    LoadKind::Reload => info!(path = %path.display(), bytes = size, "Reloaded html file"),
                }
                Ok(size)
            }
            Err(source) => {
                self.page = None;
                let err = ContentError { path, source };
                error!(error = %err, "Falling back to default page");
                Err(err)
            }
        }
    }
}

fn build_page(path: &Path) -> io::Result<Bytes> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len() as usize;

    let prefix = header_prefix();
    let mut page = Vec::with_capacity(prefix.len() + size);
    page.extend_from_slice(prefix);

    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => page.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Bytes::from(page))
}
