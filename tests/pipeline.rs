use rio_api::model::{Literal, Subject, Term};
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleError, TurtleParser};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use wiki_abstract_extractor::config::{Configuration, OutputFormat, OutputLocation, RunMode};
use wiki_abstract_extractor::core::RdfTriple;
use wiki_abstract_extractor::pipeline::{run_all, Pipeline};

const RESOURCE: &str = "http://dbkwik.webdatacommons.org/harrypotter/resource/";

fn page(title: &str, text: &str) -> String {
    format!(
        "  <page>\n    <title>{}</title>\n    <ns>0</ns>\n    <revision>\n      <text xml:space=\"preserve\">{}</text>\n    </revision>\n  </page>\n",
        title, text
    )
}

fn export(pages: &[String]) -> String {
    format!(
        "<mediawiki xmlns=\"http://www.mediawiki.org/xml/export-0.11/\" version=\"0.11\">\n{}</mediawiki>\n",
        pages.concat()
    )
}

/// Five pages, three of which pass every filter.
fn harry_potter_dump() -> String {
    export(&[
        page("Harry Potter", "Harry Potter is a wizard.\n\nHe lives at Hogwarts."),
        page("Hermione Granger", "'''Hermione''' is a [[Muggle-born]] witch."),
        page("Hogwarts", "{{Infobox school}}\nHogwarts is a school of witchcraft and wizardry in Scotland, and this single line keeps going well beyond two hundred characters so that the short abstract has to be cut at exactly two hundred characters of text."),
        page("Ron Weasley", "Ron is not in the knowledge graph."),
        page("Dumbledore", "== Biography ==\nThe lead section is empty."),
    ])
}

fn knowledge_graph() -> String {
    ["Harry_Potter", "Hermione_Granger", "Hogwarts", "Dumbledore"]
        .iter()
        .map(|t| format!("<{RESOURCE}{t}> <http://www.w3.org/2000/01/rdf-schema#label> \"{t}\" .\n"))
        .collect()
}

fn setup(root: &Path) -> Configuration {
    let dump_dir = root.join("dump");
    let graph_dir = root.join("graphs").join("harrypotter.");
    std::fs::create_dir_all(&dump_dir).unwrap();
    std::fs::create_dir_all(&graph_dir).unwrap();
    std::fs::write(dump_dir.join("harrypotter_pages_current.xml"), harry_potter_dump()).unwrap();
    std::fs::write(graph_dir.join("labels.ttl"), knowledge_graph()).unwrap();

    let mut config = Configuration::default();
    config.paths.dump_dir = dump_dir;
    config.paths.graph_root = root.join("graphs");
    config
}

fn parse_turtle(path: &Path) -> HashSet<RdfTriple> {
    let content = std::fs::read_to_string(path).unwrap();
    let mut triples = HashSet::new();

    TurtleParser::new(content.as_bytes(), None)
        .parse_all(&mut |t| -> Result<(), TurtleError> {
            let Subject::NamedNode(subject) = t.subject else {
                panic!("unexpected subject {}", t.subject);
            };
            let (object, language) = match t.object {
                Term::Literal(Literal::Simple { value }) => (value.to_string(), None),
                Term::Literal(Literal::LanguageTaggedString { value, language }) => {
                    (value.to_string(), Some(language.to_string()))
                }
                other => panic!("unexpected object {}", other),
            };
            triples.insert(
                RdfTriple::new(subject.iri.to_string(), t.predicate.iri.to_string(), object)
                    .with_language(language),
            );
            Ok(())
        })
        .unwrap();

    triples
}

#[test]
fn turtle_output_has_two_triples_per_accepted_page() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());

    let summary = Pipeline::new(config).unwrap().run_single();
    assert_eq!(summary.succeeded, 1);

    let report = &summary.reports[0];
    assert_eq!(report.pages_seen, 5);
    assert_eq!(report.abstracts_emitted, 3);
    assert_eq!(report.pages_skipped, 2);
    assert_eq!(report.page_errors, 0);

    let output = report.output.clone().unwrap();
    assert_eq!(output, dir.path().join("graphs/harrypotter./abstracts.ttl"));

    let triples = parse_turtle(&output);
    assert_eq!(triples.len(), 6);

    let abstract_predicate = "http://dbkwik.webdatacommons.org/ontology/abstract".to_string();
    let comment_predicate = "http://www.w3.org/2000/01/rdf-schema#comment".to_string();
    let harry = format!("{RESOURCE}Harry_Potter");

    assert!(triples.contains(&RdfTriple::new(
        harry.clone(),
        abstract_predicate.clone(),
        "Harry Potter is a wizard.\n\nHe lives at Hogwarts.".to_string(),
    )));
    assert!(triples.contains(&RdfTriple::new(
        harry,
        comment_predicate.clone(),
        "Harry Potter is a wizard.".to_string(),
    )));

    let hogwarts_short = triples
        .iter()
        .find(|t| t.subject.ends_with("/Hogwarts") && t.predicate == comment_predicate)
        .unwrap();
    assert_eq!(hogwarts_short.object.chars().count(), 200);

    assert!(!triples.iter().any(|t| t.subject.ends_with("/Ron_Weasley")));
}

#[test]
fn turtle_round_trip_reproduces_triples() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    config.rdf_schema.literal_language = Some("en".to_string());

    let pipeline = Pipeline::new(config.clone()).unwrap();
    let summary = pipeline.run_single();
    let output = summary.reports[0].output.clone().unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("@prefix dbkwik: <http://dbkwik.webdatacommons.org/ontology/> ."));

    let reparsed = parse_turtle(&output);
    assert_eq!(reparsed.len(), 6);
    assert!(reparsed.iter().all(|t| t.language.as_deref() == Some("en")));
}

#[test]
fn csv_output_has_header_plus_one_row_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    config.output_format = OutputFormat::Csv;
    config.paths.output_location = OutputLocation::DumpDir;

    let summary = Pipeline::new(config).unwrap().run_single();
    let output = summary.reports[0].output.clone().unwrap();
    assert_eq!(output, dir.path().join("dump/abstract.csv"));

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, vec!["title", "long_abstract", "short_abstract"]);
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], "Harry Potter");
    assert_eq!(&rows[0][2], "Harry Potter is a wizard.");
    assert_eq!(&rows[1][1], "Hermione is a Muggle-born witch.");
}

#[test]
fn csv_without_filter_keeps_pages_missing_from_graph() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    config.output_format = OutputFormat::Csv;
    config.filter_by_graph = false;
    config.paths.graph_root = dir.path().join("no-graph-here");
    config.paths.output_location = OutputLocation::DumpDir;

    let summary = Pipeline::new(config).unwrap().run_single();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.reports[0].abstracts_emitted, 4);
}

#[test]
fn page_errors_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let nested = format!("{}x{}", "[[a|".repeat(80), "]]".repeat(80));
    std::fs::write(
        config.paths.dump_dir.join("harrypotter_pages_current.xml"),
        export(&[
            page("Hogwarts", &nested),
            page("Hermione Granger", "Hermione uses {{ literally"),
            page("Harry Potter", "Harry Potter is a wizard."),
        ]),
    )
    .unwrap();

    let summary = Pipeline::new(config).unwrap().run_single();
    let report = &summary.reports[0];
    assert!(report.is_success());
    assert_eq!(report.page_errors, 1);
    assert_eq!(report.abstracts_emitted, 2);

    let triples = parse_turtle(report.output.as_ref().unwrap());
    assert!(triples.iter().any(|t| t.object == "Hermione uses {{ literally"));
}

#[test]
fn missing_dump_fails_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    config.paths.dump_file = "absent.xml".to_string();

    let summary = Pipeline::new(config).unwrap().run_single();
    assert_eq!(summary.failed, 1);
    assert!(summary.reports[0].error.as_deref().unwrap().contains("absent.xml"));
}

#[tokio::test]
async fn multi_dump_run_continues_past_missing_graph() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path());
    config.run_mode = RunMode::MultiDump;
    config.workers = 2;

    std::fs::write(
        config.paths.dump_dir.join("starwars_pages_current.xml"),
        export(&[page("Luke Skywalker", "Luke is a Jedi.")]),
    )
    .unwrap();

    let dumps = wiki_abstract_extractor::dump::list_dumps(&config.paths.dump_dir).unwrap();
    assert_eq!(dumps.len(), 2);

    let mut seen = 0;
    let summary = run_all(Arc::new(Pipeline::new(config).unwrap()), dumps, |_| seen += 1).await;

    assert_eq!(seen, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total_abstracts(), 3);

    let failed = summary.reports.iter().find(|r| !r.is_success()).unwrap();
    assert_eq!(failed.wiki, "starwars");
    assert!(failed.error.as_deref().unwrap().contains("Knowledge graph"));
}
