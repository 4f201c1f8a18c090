use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PageFilters;
use crate::core::abstracts::Abstract;
use crate::core::wikitext::WikitextRenderer;
use crate::dump::Page;
use crate::error::ExtractError;
use crate::knowledge_graph::{Ineligibility, SubjectResolution, SubjectResolver};

pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RdfTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl RdfTriple {
    pub fn new(subject: String, predicate: String, object: String) -> Self {
        Self {
            subject,
            predicate,
            object,
            language: None,
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }
}

/// One accepted page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractRecord {
    pub title: String,
    /// Absent only for CSV output without knowledge graph filtering.
    pub subject: Option<String>,
    pub text: Abstract,
}

impl AbstractRecord {
    /// The `abstract` and `rdfs:comment` triples of this record.
    pub fn to_triples(&self, abstract_predicate: &str, language: Option<&str>) -> Vec<RdfTriple> {
        let Some(subject) = &self.subject else {
            return Vec::new();
        };
        let language = language.map(str::to_string);

        vec![
            RdfTriple::new(subject.clone(), abstract_predicate.to_string(), self.text.long_text.clone())
                .with_language(language.clone()),
            RdfTriple::new(subject.clone(), RDFS_COMMENT.to_string(), self.text.short_text.clone())
                .with_language(language),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Redirect,
    Namespace(i64),
    NoSubject(Ineligibility),
    EmptyLead,
}

#[derive(Debug)]
pub enum PageOutcome {
    Emitted(AbstractRecord),
    Skipped(SkipReason),
    Failed(ExtractError),
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub records: Vec<AbstractRecord>,
    pub processing_time_seconds: f64,
    pub pages_seen: usize,
    pub pages_skipped: usize,
    pub errors: Vec<String>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            processing_time_seconds: 0.0,
            pages_seen: 0,
            pages_skipped: 0,
            errors: Vec::new(),
        }
    }
}

/// Turns pages into abstract records.
pub struct AbstractExtractor {
    renderer: WikitextRenderer,
    filters: PageFilters,
}

impl AbstractExtractor {
    pub fn new(filters: PageFilters) -> Result<Self> {
        Ok(Self {
            renderer: WikitextRenderer::new()?,
            filters,
        })
    }

    /// Abstract of the lead section. Panics inside the renderer are
    /// reported as errors for this page only.
    pub fn extract_abstract(&self, wikitext: &str) -> Result<Option<Abstract>, ExtractError> {
        let rendered = panic::catch_unwind(AssertUnwindSafe(|| self.renderer.lead_plain_text(wikitext)))
            .map_err(|payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                ExtractError::RendererPanic(message)
            })??;

        Ok(rendered.as_deref().and_then(Abstract::from_plain_text))
    }

    /// Run one page through filtering, subject resolution and rendering.
    /// Without a resolver, pages are keyed by title only.
    pub fn extract_page(&self, page: &Page, resolver: Option<&SubjectResolver<'_>>) -> PageOutcome {
        if self.filters.skip_redirects && page.is_redirect() {
            return PageOutcome::Skipped(SkipReason::Redirect);
        }

        if !self.filters.namespaces.is_empty() && !self.filters.namespaces.contains(&page.namespace) {
            return PageOutcome::Skipped(SkipReason::Namespace(page.namespace));
        }

        let subject = match resolver.map(|r| r.resolve(&page.title)) {
            Some(SubjectResolution::Resolved(uri)) => Some(uri),
            Some(SubjectResolution::NotEligible(reason)) => {
                return PageOutcome::Skipped(SkipReason::NoSubject(reason));
            }
            None => None,
        };

        match self.extract_abstract(&page.wikitext) {
            Ok(Some(text)) => PageOutcome::Emitted(AbstractRecord {
                title: page.title.clone(),
                subject,
                text,
            }),
            Ok(None) => PageOutcome::Skipped(SkipReason::EmptyLead),
            Err(e) => PageOutcome::Failed(e),
        }
    }

    pub fn extract_from_pages(
        &self,
        source: &str,
        pages: &[Page],
        resolver: Option<&SubjectResolver<'_>>,
    ) -> ExtractionResult {
        let start_time = Instant::now();
        let mut result = ExtractionResult::new();

        info!("Starting abstract extraction from {} ({} pages)", source, pages.len());

        for page in pages {
            result.pages_seen += 1;

            match self.extract_page(page, resolver) {
                PageOutcome::Emitted(record) => result.records.push(record),
                PageOutcome::Skipped(reason) => {
                    debug!("Skipped page '{}': {:?}", page.title, reason);
                    result.pages_skipped += 1;
                }
                PageOutcome::Failed(e) => {
                    let error_msg = format!("Failed to extract abstract for '{}': {}", page.title, e);
                    warn!("{}", error_msg);
                    result.errors.push(error_msg);
                }
            }
        }

        result.processing_time_seconds = start_time.elapsed().as_secs_f64();

        info!(
            "Extraction completed: {} abstracts from {} pages in {:.2}s",
            result.records.len(),
            result.pages_seen,
            result.processing_time_seconds
        );

        result
    }
}
