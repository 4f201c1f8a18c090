use anyhow::{Result, Context};
use rio_api::formatter::TriplesFormatter;
use rio_api::model::{Literal, NamedNode, Triple};
use rio_turtle::{NTriplesFormatter, TurtleFormatter};
use std::path::Path;
use tracing::info;

use crate::config::{OutputFormat, RdfSchema};
use crate::core::{AbstractRecord, RdfTriple};

pub const RDFS_NAMESPACE: &str = "http://www.w3.org/2000/01/rdf-schema#";

pub const CSV_HEADER: [&str; 3] = ["title", "long_abstract", "short_abstract"];

pub struct AbstractSerializer;

impl AbstractSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize(
        &self,
        records: &[AbstractRecord],
        format: &OutputFormat,
        schema: &RdfSchema,
    ) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Csv => self.serialize_csv(records),
            OutputFormat::Turtle => self.serialize_turtle(&self.triples(records, schema), schema),
            OutputFormat::NTriples => self.serialize_ntriples(&self.triples(records, schema)),
        }
    }

    /// Serialize and write the whole output in one go, replacing any
    /// existing file.
    pub fn write_to_file(
        &self,
        records: &[AbstractRecord],
        format: &OutputFormat,
        schema: &RdfSchema,
        path: &Path,
    ) -> Result<()> {
        let bytes = self.serialize(records, format, schema)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;

        info!("Wrote {} abstracts to {} ({:?})", records.len(), path.display(), format);
        Ok(())
    }

    pub fn triples(&self, records: &[AbstractRecord], schema: &RdfSchema) -> Vec<RdfTriple> {
        let predicate = schema.abstract_predicate();
        records
            .iter()
            .flat_map(|record| record.to_triples(&predicate, schema.literal_language.as_deref()))
            .collect()
    }

    fn serialize_csv(&self, records: &[AbstractRecord]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for record in records {
            writer.write_record([
                record.title.as_str(),
                record.text.long_text.as_str(),
                record.text.short_text.as_str(),
            ])?;
        }

        writer.into_inner().context("Failed to flush CSV output")
    }

    fn serialize_turtle(&self, triples: &[RdfTriple], schema: &RdfSchema) -> Result<Vec<u8>> {
        let mut output = Vec::new();

        // Add prefix declarations
        output.extend_from_slice(format!("@prefix {}: <{}> .\n", schema.prefix, schema.namespace).as_bytes());
        output.extend_from_slice(format!("@prefix rdfs: <{}> .\n\n", RDFS_NAMESPACE).as_bytes());

        let mut formatter = TurtleFormatter::new(output);
        for triple in triples {
            formatter.format(&as_rio_triple(triple))?;
        }

        formatter.finish().context("Failed to serialize Turtle")
    }

    fn serialize_ntriples(&self, triples: &[RdfTriple]) -> Result<Vec<u8>> {
        let mut formatter = NTriplesFormatter::new(Vec::new());
        for triple in triples {
            formatter.format(&as_rio_triple(triple))?;
        }

        formatter.finish().context("Failed to serialize N-Triples")
    }
}

impl Default for AbstractSerializer {
    fn default() -> Self {
        Self::new()
    }
}

fn as_rio_triple(triple: &RdfTriple) -> Triple<'_> {
    let object = match &triple.language {
        Some(language) => Literal::LanguageTaggedString {
            value: triple.object.as_str(),
            language: language.as_str(),
        },
        None => Literal::Simple { value: triple.object.as_str() },
    };

    Triple {
        subject: NamedNode { iri: triple.subject.as_str() }.into(),
        predicate: NamedNode { iri: triple.predicate.as_str() },
        object: object.into(),
    }
}
