use anyhow::{Result, Context};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One page of a MediaWiki export, reduced to what the extractor needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub wikitext: String,
    pub namespace: i64,
    pub redirect: Option<String>,
}

impl Page {
    pub fn new(title: impl Into<String>, wikitext: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            wikitext: wikitext.into(),
            namespace: 0,
            redirect: None,
        }
    }

    pub fn is_redirect(&self) -> bool {
        if self.redirect.is_some() {
            return true;
        }
        let head = self.wikitext.trim_start();
        head.len() >= 9 && head.is_char_boundary(9) && head[..9].eq_ignore_ascii_case("#redirect")
    }
}

#[derive(Debug, Deserialize)]
struct MediaWikiExport {
    #[serde(rename = "page", default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    ns: i64,
    #[serde(default)]
    redirect: Option<RawRedirect>,
    #[serde(rename = "revision", default)]
    revisions: Vec<RawRevision>,
}

#[derive(Debug, Deserialize)]
struct RawRedirect {
    #[serde(rename = "@title", default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct RawRevision {
    #[serde(default)]
    text: Option<RawText>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    #[serde(rename = "$text", default)]
    value: String,
}

impl From<RawPage> for Page {
    fn from(raw: RawPage) -> Self {
        // Full-history exports list revisions oldest first.
        let wikitext = raw
            .revisions
            .into_iter()
            .last()
            .and_then(|rev| rev.text)
            .map(|text| text.value)
            .unwrap_or_default();

        Page {
            title: raw.title,
            wikitext,
            namespace: raw.ns,
            redirect: raw.redirect.map(|r| r.title),
        }
    }
}

/// Loads a whole MediaWiki XML export into memory.
pub struct DumpReader;

impl DumpReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Page>> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read dump file: {}", path.display()))?;

        let encoding = if let Some((enc, _)) = encoding_rs::Encoding::for_bom(&bytes) {
            enc
        } else {
            encoding_rs::UTF_8
        };

        let (text, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            warn!("Encoding errors detected in dump: {}", path.display());
        }

        let pages = self
            .parse_str(&text)
            .with_context(|| format!("Failed to parse dump XML: {}", path.display()))?;

        info!("Loaded {} pages from dump: {}", pages.len(), path.display());
        Ok(pages)
    }

    pub fn parse_str(&self, xml: &str) -> Result<Vec<Page>> {
        let export: MediaWikiExport = quick_xml::de::from_str(xml)?;
        Ok(export.pages.into_iter().map(Page::from).collect())
    }
}

impl Default for DumpReader {
    fn default() -> Self {
        Self::new()
    }
}

/// XML dumps directly inside `dir`, sorted by path.
pub fn list_dumps<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        anyhow::bail!("Dump directory does not exist: {}", dir.display());
    }

    let mut dumps = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_file() && path.extension().map_or(false, |ext| ext == "xml") {
            dumps.push(path.to_path_buf());
        }
    }
    dumps.sort();

    debug!("Found {} dumps in {}", dumps.len(), dir.display());
    Ok(dumps)
}
