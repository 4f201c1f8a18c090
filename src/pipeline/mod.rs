//! Runs dumps through reader, extractor and serializer, one dump per worker.
//!
//! Every dump owns its knowledge graph slice and its output file, so workers
//! share nothing but the read-only [`Pipeline`]. Results come back as
//! [`DumpReport`] values and are folded into a [`RunSummary`].

use anyhow::{Result, Context};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{Configuration, OutputFormat, OutputLocation, RunMode};
use crate::core::AbstractExtractor;
use crate::dump::DumpReader;
use crate::knowledge_graph::{KnowledgeGraph, SubjectResolver};
use crate::utils::AbstractSerializer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpReport {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub dump: PathBuf,
    pub wiki: String,
    pub output: Option<PathBuf>,
    pub pages_seen: usize,
    pub abstracts_emitted: usize,
    pub pages_skipped: usize,
    pub page_errors: usize,
    pub processing_time_seconds: f64,
    /// Set when the whole dump was abandoned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DumpReport {
    pub fn failed(dump: PathBuf, wiki: String, error: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            dump,
            wiki,
            output: None,
            pages_seen: 0,
            abstracts_emitted: 0,
            pages_skipped: 0,
            page_errors: 0,
            processing_time_seconds: 0.0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub reports: Vec<DumpReport>,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, report: DumpReport) {
        if report.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.reports.push(report);
    }

    pub fn total_abstracts(&self) -> usize {
        self.reports.iter().map(|r| r.abstracts_emitted).sum()
    }

    pub fn total_page_errors(&self) -> usize {
        self.reports.iter().map(|r| r.page_errors).sum()
    }
}

pub struct Pipeline {
    config: Configuration,
    reader: DumpReader,
    extractor: AbstractExtractor,
    serializer: AbstractSerializer,
}

impl Pipeline {
    pub fn new(config: Configuration) -> Result<Self> {
        config.validate()?;
        let extractor = AbstractExtractor::new(config.page_filters.clone())?;

        Ok(Self {
            config,
            reader: DumpReader::new(),
            extractor,
            serializer: AbstractSerializer::new(),
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Where the output for `dump_path` goes.
    pub fn output_path(&self, dump_path: &Path, wiki: &str) -> PathBuf {
        let file_name = self.config.output_file_name();

        match self.config.paths.output_location {
            OutputLocation::GraphDir => self.config.paths.graph_dir(wiki).join(file_name),
            OutputLocation::DumpDir => {
                let dir = dump_path.parent().unwrap_or_else(|| Path::new("."));
                match self.config.run_mode {
                    RunMode::SingleDump => dir.join(file_name),
                    RunMode::MultiDump => dir.join(format!("{}_{}", wiki, file_name)),
                }
            }
        }
    }

    /// Process one dump. Failures that abandon the dump are reported, not
    /// returned, so a caller looping over dumps keeps going.
    pub fn process_dump(&self, dump_path: &Path) -> DumpReport {
        let wiki = self.config.paths.wiki_name(dump_path);
        let id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        match self.try_process_dump(dump_path, &wiki, &id, started_at) {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to process dump {} [{}]: {:#}", dump_path.display(), id, e);
                DumpReport {
                    id,
                    started_at,
                    ..DumpReport::failed(dump_path.to_path_buf(), wiki, format!("{:#}", e))
                }
            }
        }
    }

    fn try_process_dump(
        &self,
        dump_path: &Path,
        wiki: &str,
        id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<DumpReport> {
        let start_time = Instant::now();
        info!("Processing dump {} (wiki: {}, id: {})", dump_path.display(), wiki, id);

        let pages = self.reader.read(dump_path)?;

        let graph = if self.config.filter_by_graph {
            let graph_dir = self.config.paths.graph_dir(wiki);
            Some(
                KnowledgeGraph::load_folder(&graph_dir)
                    .with_context(|| format!("Knowledge graph unavailable for wiki '{}'", wiki))?,
            )
        } else {
            None
        };

        let base_uri = self.config.rdf_schema.base_uri_for(wiki);
        let resolver = match (&graph, self.config.output_format) {
            (Some(graph), _) => Some(SubjectResolver::filtered(base_uri, graph)),
            (None, OutputFormat::Csv) => None,
            (None, _) => Some(SubjectResolver::unfiltered(base_uri)),
        };

        let source = dump_path.display().to_string();
        let result = self.extractor.extract_from_pages(&source, &pages, resolver.as_ref());

        let output = self.output_path(dump_path, wiki);
        self.serializer.write_to_file(
            &result.records,
            &self.config.output_format,
            &self.config.rdf_schema,
            &output,
        )?;

        Ok(DumpReport {
            id: id.to_string(),
            started_at,
            dump: dump_path.to_path_buf(),
            wiki: wiki.to_string(),
            output: Some(output),
            pages_seen: result.pages_seen,
            abstracts_emitted: result.records.len(),
            pages_skipped: result.pages_skipped,
            page_errors: result.errors.len(),
            processing_time_seconds: start_time.elapsed().as_secs_f64(),
            error: None,
        })
    }

    /// The configured single dump, processed on the calling thread.
    pub fn run_single(&self) -> RunSummary {
        let dump_path = self.config.paths.dump_dir.join(&self.config.paths.dump_file);
        let mut summary = RunSummary::default();
        summary.record(self.process_dump(&dump_path));
        summary
    }
}

/// Process `dumps` on at most `workers` blocking tasks. `on_report` sees
/// each report as its dump completes.
pub async fn run_all<F>(pipeline: Arc<Pipeline>, dumps: Vec<PathBuf>, mut on_report: F) -> RunSummary
where
    F: FnMut(&DumpReport),
{
    let workers = pipeline.config().workers.max(1);
    info!("Processing {} dumps with {} workers", dumps.len(), workers);

    let mut reports = stream::iter(dumps)
        .map(|dump| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                let wiki = pipeline.config().paths.wiki_name(&dump);
                let path = dump.clone();
                tokio::task::spawn_blocking(move || pipeline.process_dump(&dump))
                    .await
                    .unwrap_or_else(|e| DumpReport::failed(path, wiki, format!("Dump worker panicked: {}", e)))
            }
        })
        .buffer_unordered(workers);

    let mut summary = RunSummary::default();
    while let Some(report) = reports.next().await {
        on_report(&report);
        summary.record(report);
    }

    summary.reports.sort_by(|a, b| a.dump.cmp(&b.dump));
    summary
}
