pub mod config;
pub mod core;
pub mod dump;
pub mod error;
pub mod knowledge_graph;
pub mod pipeline;
pub mod utils;

pub use config::Configuration;
pub use core::{AbstractExtractor, Abstract, AbstractRecord, ExtractionResult};
pub use dump::{DumpReader, Page};
pub use knowledge_graph::{KnowledgeGraph, SubjectResolver, SubjectResolution};
pub use pipeline::{Pipeline, DumpReport, RunSummary};
pub use utils::AbstractSerializer;
