use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};

/// Placeholder in `RdfSchema::base_uri` replaced by the wiki (graph) name.
pub const WIKI_PLACEHOLDER: &str = "{wiki}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub rdf_schema: RdfSchema,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub run_mode: RunMode,
    #[serde(default = "default_true")]
    pub filter_by_graph: bool,
    #[serde(default)]
    pub page_filters: PageFilters,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding the MediaWiki XML exports.
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,
    /// Dump processed in `single-dump` mode, relative to `dump_dir`.
    #[serde(default = "default_dump_file")]
    pub dump_file: String,
    /// Root of the pre-extracted knowledge graph, one subfolder per wiki.
    #[serde(default = "default_graph_root")]
    pub graph_root: PathBuf,
    /// Appended to the wiki name to form its graph folder, `harrypotter.` by default.
    #[serde(default = "default_graph_folder_suffix")]
    pub graph_folder_suffix: String,
    /// Removed from a dump's file stem to obtain the wiki name.
    #[serde(default = "default_dump_suffix")]
    pub dump_suffix: String,
    #[serde(default)]
    pub output_location: OutputLocation,
    #[serde(default = "default_csv_file_name")]
    pub csv_file_name: String,
    #[serde(default = "default_turtle_file_name")]
    pub turtle_file_name: String,
    #[serde(default = "default_ntriples_file_name")]
    pub ntriples_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RdfSchema {
    /// Ontology namespace holding the `abstract` predicate.
    pub namespace: String,
    pub prefix: String,
    /// Resource namespace subject URIs are built from; may contain `{wiki}`.
    pub base_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Csv,
    #[default]
    Turtle,
    NTriples,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    #[default]
    SingleDump,
    MultiDump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLocation {
    DumpDir,
    #[default]
    GraphDir,
}

/// Optional page filters. Both are off by default so every `<page>` is
/// considered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageFilters {
    #[serde(default)]
    pub skip_redirects: bool,
    /// Namespaces to keep; empty keeps every namespace.
    #[serde(default)]
    pub namespaces: Vec<i64>,
}

fn default_name() -> String { "wiki-abstracts".to_string() }
fn default_true() -> bool { true }
fn default_workers() -> usize { 5 }
fn default_dump_dir() -> PathBuf { PathBuf::from("dump") }
fn default_dump_file() -> String { "harrypotter_pages_current.xml".to_string() }
fn default_graph_root() -> PathBuf { PathBuf::from("graphs") }
fn default_graph_folder_suffix() -> String { ".".to_string() }
fn default_dump_suffix() -> String { "_pages_current".to_string() }
fn default_csv_file_name() -> String { "abstract.csv".to_string() }
fn default_turtle_file_name() -> String { "abstracts.ttl".to_string() }
fn default_ntriples_file_name() -> String { "abstracts.nt".to_string() }

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            dump_dir: default_dump_dir(),
            dump_file: default_dump_file(),
            graph_root: default_graph_root(),
            graph_folder_suffix: default_graph_folder_suffix(),
            dump_suffix: default_dump_suffix(),
            output_location: OutputLocation::default(),
            csv_file_name: default_csv_file_name(),
            turtle_file_name: default_turtle_file_name(),
            ntriples_file_name: default_ntriples_file_name(),
        }
    }
}

impl Default for RdfSchema {
    fn default() -> Self {
        Self {
            namespace: "http://dbkwik.webdatacommons.org/ontology/".to_string(),
            prefix: "dbkwik".to_string(),
            base_uri: format!("http://dbkwik.webdatacommons.org/{}/resource/", WIKI_PLACEHOLDER),
            literal_language: None,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: default_name(),
            paths: PathSettings::default(),
            rdf_schema: RdfSchema::default(),
            output_format: OutputFormat::default(),
            run_mode: RunMode::default(),
            filter_by_graph: true,
            page_filters: PageFilters::default(),
            workers: default_workers(),
        }
    }
}

impl RdfSchema {
    /// Resource namespace for one wiki.
    pub fn base_uri_for(&self, wiki: &str) -> String {
        self.base_uri.replace(WIKI_PLACEHOLDER, wiki)
    }

    pub fn abstract_predicate(&self) -> String {
        format!("{}abstract", self.namespace)
    }
}

impl PathSettings {
    /// Wiki name for a dump file: the file stem minus `dump_suffix`.
    pub fn wiki_name(&self, dump_path: &Path) -> String {
        let stem = dump_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        match stem.strip_suffix(self.dump_suffix.as_str()) {
            Some(name) if !self.dump_suffix.is_empty() => name.to_string(),
            _ => stem,
        }
    }

    pub fn graph_dir(&self, wiki: &str) -> PathBuf {
        self.graph_root.join(format!("{}{}", wiki, self.graph_folder_suffix))
    }
}

impl Configuration {
    /// Load configuration from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        };

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("Worker count must be at least 1");
        }

        if self.rdf_schema.prefix.is_empty() {
            anyhow::bail!("No namespace prefix defined for RDF schema");
        }

        url::Url::parse(&self.rdf_schema.namespace)
            .with_context(|| format!("Invalid ontology namespace: {}", self.rdf_schema.namespace))?;

        let sample_base = self.rdf_schema.base_uri_for("wiki");
        url::Url::parse(&sample_base)
            .with_context(|| format!("Invalid base URI: {}", self.rdf_schema.base_uri))?;

        if let Some(lang) = &self.rdf_schema.literal_language {
            if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                anyhow::bail!("Invalid literal language tag: {:?}", lang);
            }
        }

        Ok(())
    }

    /// File name written for the configured output format.
    pub fn output_file_name(&self) -> &str {
        match self.output_format {
            OutputFormat::Csv => &self.paths.csv_file_name,
            OutputFormat::Turtle => &self.paths.turtle_file_name,
            OutputFormat::NTriples => &self.paths.ntriples_file_name,
        }
    }

    /// Create an example configuration
    pub fn example() -> Self {
        Configuration {
            name: "Harry Potter wiki abstracts".to_string(),
            paths: PathSettings::default(),
            rdf_schema: RdfSchema {
                literal_language: Some("en".to_string()),
                ..RdfSchema::default()
            },
            output_format: OutputFormat::Turtle,
            run_mode: RunMode::MultiDump,
            filter_by_graph: true,
            page_filters: PageFilters {
                skip_redirects: true,
                namespaces: vec![0],
            },
            workers: 5,
        }
    }
}
