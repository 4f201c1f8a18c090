pub mod abstracts;
pub mod wikitext;
pub mod extractor;

pub use abstracts::Abstract;
pub use wikitext::WikitextRenderer;
pub use extractor::{AbstractExtractor, AbstractRecord, ExtractionResult, PageOutcome, RdfTriple, SkipReason};
