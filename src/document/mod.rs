//! Local card documents.
//!
//! A [`Document`] is one markdown file plus its [`Meta`]. Documents are found
//! by a recursive scan for `*.md` files, validated when loaded, and only ever
//! mutated by writing new metadata.

mod file;
pub mod meta;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

pub use file::atomic_write;
pub use meta::{Layout, Meta};

use crate::error::{Error, Result};
use crate::markdown::{Direction, Markdown};

/// One card source file.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    meta: Meta,
    markdown: Markdown,
    has_reverse_prompt: bool,
}

impl Document {
    /// Load and validate the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the pages cannot be split or a page has
    /// more than one prompt, and I/O errors if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let meta = meta::read_text(path, &text)?;
        Self::from_parts(path, meta, meta::body_of(path, &text))
    }

    /// Build a document from already separated metadata and body.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDocument` if the body is not a valid card.
    pub fn from_parts(path: &Path, meta: Meta, body: &str) -> Result<Self> {
        let markdown = Markdown::parse(body);
        let has_reverse_prompt = markdown
            .has_reverse_prompt()
            .and_then(|reverse| markdown.maybe_prompted().map(|_| reverse))
            .map_err(|e| e.in_document(path))?;

        Ok(Self {
            path: path.to_path_buf(),
            meta,
            markdown,
            has_reverse_prompt,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn meta(&self) -> &Meta {
        &self.meta
    }

    #[must_use]
    pub const fn markdown(&self) -> &Markdown {
        &self.markdown
    }

    /// Folder that relative image paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    #[must_use]
    pub const fn has_reverse_prompt(&self) -> bool {
        self.has_reverse_prompt
    }

    /// Orientations this document produces cards for.
    #[must_use]
    pub fn directions(&self) -> Vec<Direction> {
        if self.has_reverse_prompt {
            Direction::ALL.to_vec()
        } else {
            vec![Direction::Forward]
        }
    }

    /// A backward id is stored but there is no backward card any more.
    #[must_use]
    pub const fn detect_misalignment(&self) -> bool {
        self.meta.backward_id.is_some() && !self.has_reverse_prompt
    }

    /// Clear the stale backward id and persist.
    ///
    /// Callers must have the user's confirmation: this drops the link to a
    /// remote card.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be written.
    pub fn realign(&mut self) -> Result<()> {
        let meta = self.meta.with_id(Direction::Backward, None);
        self.save_meta(meta)?;
        info!(path = %self.path.display(), "cleared backward id");
        Ok(())
    }

    fn save_meta(&mut self, meta: Meta) -> Result<()> {
        meta::write(&self.path, &meta)?;
        self.meta = meta;
        Ok(())
    }
}

/// Record the remote id of one orientation of the document at `path`.
///
/// The stored metadata is re-read first, so ids written earlier in the same
/// run are kept.
///
/// # Errors
///
/// Returns an error if the metadata cannot be read or written.
pub fn record_id(path: &Path, direction: Direction, id: &str) -> Result<Meta> {
    let meta = meta::read(path)?.with_id(direction, Some(id.to_string()));
    meta::write(path, &meta)?;
    Ok(meta)
}

/// Find every markdown document below `root`, sorted by path.
///
/// Hidden files and folders are skipped.
///
/// # Errors
///
/// Returns `Config` if `root` is not a directory, and I/O errors from the scan.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "document folder {} does not exist",
            root.display()
        )));
    }

    let mut paths = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "md") {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    debug!(root = %root.display(), count = paths.len(), "discovered documents");
    Ok(paths)
}

/// Discover and load every document below `root`.
///
/// # Errors
///
/// Fails on the first document that cannot be loaded.
pub fn load_all(root: &Path) -> Result<Vec<Document>> {
    discover(root)?.iter().map(|path| Document::load(path)).collect()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}
