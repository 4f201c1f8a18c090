use super::KnowledgeGraph;

/// Characters that cannot appear in a subject IRI built from a title.
pub const FORBIDDEN_URI_CHARACTERS: &[char] = &['<', '>', '"', ' ', '{', '}', '|', '\\', '^', '`'];

/// Why a page gets no subject URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    EmptyTitle,
    ForbiddenCharacters,
    UnknownSubject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectResolution {
    Resolved(String),
    NotEligible(Ineligibility),
}

impl SubjectResolution {
    pub fn uri(&self) -> Option<&str> {
        match self {
            SubjectResolution::Resolved(uri) => Some(uri),
            SubjectResolution::NotEligible(_) => None,
        }
    }
}

pub fn has_forbidden_characters(title: &str) -> bool {
    title.contains(FORBIDDEN_URI_CHARACTERS)
}

/// Title as it appears in a resource IRI.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            other => other,
        })
        .collect()
}

/// Maps page titles to subject URIs under one wiki's resource namespace.
pub struct SubjectResolver<'g> {
    base_uri: String,
    graph: Option<&'g KnowledgeGraph>,
}

impl<'g> SubjectResolver<'g> {
    /// Only URIs already present as subjects in `graph` are accepted.
    pub fn filtered(base_uri: impl Into<String>, graph: &'g KnowledgeGraph) -> Self {
        Self {
            base_uri: base_uri.into(),
            graph: Some(graph),
        }
    }

    /// Any well-formed URI is accepted.
    pub fn unfiltered(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            graph: None,
        }
    }

    pub fn resolve(&self, title: &str) -> SubjectResolution {
        if title.is_empty() {
            return SubjectResolution::NotEligible(Ineligibility::EmptyTitle);
        }

        let normalized = normalize_title(title);
        if has_forbidden_characters(&normalized) {
            return SubjectResolution::NotEligible(Ineligibility::ForbiddenCharacters);
        }

        let candidate = format!("{}{}", self.base_uri, normalized);
        match self.graph {
            Some(graph) if !graph.contains_subject(&candidate) => {
                SubjectResolution::NotEligible(Ineligibility::UnknownSubject)
            }
            _ => SubjectResolution::Resolved(candidate),
        }
    }
}
