use rio_api::model::Subject;
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleError, TurtleParser};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::GraphError;

pub mod resolver;

pub use resolver::{has_forbidden_characters, normalize_title, Ineligibility, SubjectResolution, SubjectResolver};

/// Read-only view of an existing knowledge graph, kept only as far as
/// subject membership tests need it.
pub struct KnowledgeGraph {
    subjects: HashSet<String>,
    triple_count: usize,
    files_loaded: usize,
    source: Option<PathBuf>,
}

impl KnowledgeGraph {
    pub fn in_memory() -> Self {
        Self {
            subjects: HashSet::new(),
            triple_count: 0,
            files_loaded: 0,
            source: None,
        }
    }

    /// Load every `.ttl` file under `folder`.
    pub fn load_folder<P: AsRef<Path>>(folder: P) -> Result<Self, GraphError> {
        let folder = folder.as_ref();
        if !folder.is_dir() {
            return Err(GraphError::FolderMissing(folder.to_path_buf()));
        }

        let mut graph = Self::in_memory();
        graph.source = Some(folder.to_path_buf());

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in walkdir::WalkDir::new(folder) {
            let entry = entry.map_err(|e| GraphError::Io {
                path: folder.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();

            if entry.file_type().is_file() && path.extension().map_or(false, |ext| ext == "ttl") {
                files.push(path.to_path_buf());
            }
        }
        files.sort();

        for path in files {
            let file = File::open(&path).map_err(|e| GraphError::Io {
                path: path.clone(),
                source: e,
            })?;
            let added = graph.load_turtle(BufReader::new(file), &path)?;
            debug!("Loaded {} triples from {}", added, path.display());
        }

        info!(
            "Knowledge graph loaded: {} triples, {} subjects from {} files in {}",
            graph.triple_count,
            graph.subjects.len(),
            graph.files_loaded,
            folder.display()
        );

        Ok(graph)
    }

    pub fn from_turtle_str(turtle: &str) -> Result<Self, GraphError> {
        let mut graph = Self::in_memory();
        graph.load_turtle(turtle.as_bytes(), Path::new("<memory>"))?;
        Ok(graph)
    }

    fn load_turtle<R: BufRead>(&mut self, reader: R, path: &Path) -> Result<usize, GraphError> {
        let mut added = 0;
        let subjects = &mut self.subjects;

        TurtleParser::new(reader, None)
            .parse_all(&mut |triple| -> Result<(), TurtleError> {
                if let Subject::NamedNode(node) = triple.subject {
                    if !subjects.contains(node.iri) {
                        subjects.insert(node.iri.to_string());
                    }
                }
                added += 1;
                Ok(())
            })
            .map_err(|e| GraphError::Turtle {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        self.triple_count += added;
        self.files_loaded += 1;
        Ok(added)
    }

    pub fn insert_subject(&mut self, iri: impl Into<String>) {
        self.subjects.insert(iri.into());
    }

    /// True if `iri` is the subject of at least one triple.
    pub fn contains_subject(&self, iri: &str) -> bool {
        self.subjects.contains(iri)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get_statistics(&self) -> KnowledgeGraphStats {
        KnowledgeGraphStats {
            total_triples: self.triple_count,
            unique_subjects: self.subjects.len(),
            files_loaded: self.files_loaded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraphStats {
    pub total_triples: usize,
    pub unique_subjects: usize,
    pub files_loaded: usize,
}

impl std::fmt::Display for KnowledgeGraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            "Knowledge Graph Statistics:\n\
             Total Triples: {}\n\
             Unique Subjects: {}\n\
             Turtle Files: {}",
            self.total_triples,
            self.unique_subjects,
            self.files_loaded
        )
    }
}
