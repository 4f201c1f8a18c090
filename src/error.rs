//! Typed errors for page extraction and knowledge graph loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning one page's wikitext into an abstract.
///
/// These never cross page boundaries: the extractor logs them and moves on.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Labelled links nested beyond the renderer's limit
    #[error("Links nested deeper than {0} levels")]
    NestingTooDeep(usize),

    /// The renderer panicked on this page
    #[error("Renderer panicked: {0}")]
    RendererPanic(String),
}

/// Errors raised while loading a knowledge graph folder.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Knowledge graph folder not found: {0}")]
    FolderMissing(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid Turtle in {path}: {message}")]
    Turtle { path: PathBuf, message: String },
}
