use anyhow::Result;
use regex::{Captures, Regex};
use scraper::Html;

use crate::error::ExtractError;

/// Extension tags dropped together with their content.
const DROPPED_TAGS: &[&str] = &[
    "ref",
    "references",
    "gallery",
    "math",
    "syntaxhighlight",
    "source",
    "score",
    "timeline",
    "imagemap",
    "templatedata",
];

/// Link namespaces that render to nothing.
const DROPPED_LINK_NAMESPACES: &[&str] = &["file", "image", "media", "category"];

/// Labelled links nested deeper than this fail the page.
pub const MAX_LINK_NESTING: usize = 64;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// A heading-delimited slice of a page. The lead section has no title.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub title: Option<&'a str>,
    pub level: usize,
    pub body: &'a str,
}

/// Converts MediaWiki markup to plain text.
pub struct WikitextRenderer {
    heading: Regex,
    protected: Regex,
    placeholder: Regex,
    dropped_tags: Vec<Regex>,
    external_link: Regex,
    emphasis: Regex,
    magic_word: Regex,
    list_marker: Regex,
    horizontal_rule: Regex,
    trailing_space: Regex,
    blank_lines: Regex,
}

impl WikitextRenderer {
    pub fn new() -> Result<Self> {
        let dropped_tags = DROPPED_TAGS
            .iter()
            .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*?/>|<{tag}\b[^>]*>.*?</{tag}\s*>")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            heading: Regex::new(r"(?m)^(={1,6})[ \t]*(.+?)[ \t]*(={1,6})[ \t]*$")?,
            protected: Regex::new(
                r"(?is)<!--.*?(?:-->|\z)|<nowiki\s*/>|<nowiki\s*>(.*?)</nowiki\s*>|<pre\b[^>]*>(.*?)</pre\s*>",
            )?,
            placeholder: Regex::new("\u{E000}(\\d+)\u{E001}")?,
            dropped_tags,
            external_link: Regex::new(r"\[(?:https?:|ftp:)?//[^\s\]]+(?:[ \t]+([^\]]*))?\]")?,
            emphasis: Regex::new(r"'{2,5}")?,
            magic_word: Regex::new(r"__[A-Z]+__")?,
            list_marker: Regex::new(r"(?m)^[*#:;]+[ \t]*")?,
            horizontal_rule: Regex::new(r"(?m)^-{4,}[ \t]*$")?,
            trailing_space: Regex::new(r"(?m)[ \t]+$")?,
            blank_lines: Regex::new(r"\n{3,}")?,
        })
    }

    /// Split wikitext at heading lines. The first element is always the lead,
    /// which is empty when the page opens with a heading.
    pub fn sections<'a>(&self, wikitext: &'a str) -> Vec<Section<'a>> {
        let mut sections = Vec::new();
        let mut title = None;
        let mut level = 0;
        let mut body_start = 0;

        for caps in self.heading.captures_iter(wikitext) {
            let (Some(whole), Some(open), Some(name), Some(close)) =
                (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };

            sections.push(Section {
                title,
                level,
                body: &wikitext[body_start..whole.start()],
            });

            title = Some(name.as_str());
            level = open.len().min(close.len());
            body_start = whole.end();
        }

        sections.push(Section {
            title,
            level,
            body: &wikitext[body_start..],
        });

        sections
    }

    /// Plain text of the lead section, or `None` when there is nothing left
    /// after stripping markup.
    pub fn lead_plain_text(&self, wikitext: &str) -> Result<Option<String>, ExtractError> {
        let wikitext = wikitext.replace("\r\n", "\n");
        let (wikitext, verbatim) = self.protect(&wikitext);
        let sections = self.sections(&wikitext);
        let Some(lead) = sections.first() else {
            return Ok(None);
        };

        let text = self.render(lead.body, &verbatim)?;
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    /// Strip wiki and HTML markup from a fragment and trim it.
    pub fn plain_text(&self, markup: &str) -> Result<String, ExtractError> {
        let (markup, verbatim) = self.protect(markup);
        self.render(&markup, &verbatim)
    }

    /// Drop comments and move `<nowiki>`/`<pre>` bodies out of the markup,
    /// leaving numbered placeholders behind.
    fn protect(&self, markup: &str) -> (String, Vec<String>) {
        let mut verbatim = Vec::new();
        let text = self
            .protected
            .replace_all(markup, |caps: &Captures| match caps.get(1).or_else(|| caps.get(2)) {
                Some(body) => {
                    verbatim.push(body.as_str().to_string());
                    format!("{}{}{}", PLACEHOLDER_OPEN, verbatim.len() - 1, PLACEHOLDER_CLOSE)
                }
                None => String::new(),
            })
            .into_owned();
        (text, verbatim)
    }

    fn render(&self, markup: &str, verbatim: &[String]) -> Result<String, ExtractError> {
        let mut text = markup.to_string();

        for tag in &self.dropped_tags {
            text = tag.replace_all(&text, "").into_owned();
        }

        text = strip_balanced(&text, "{{{", "}}}");
        text = strip_balanced(&text, "{{", "}}");
        text = strip_balanced(&text, "{|", "|}");
        text = render_links(&text, 0)?;

        text = self
            .external_link
            .replace_all(&text, |caps: &Captures| {
                caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
            })
            .into_owned();

        text = self.emphasis.replace_all(&text, "").into_owned();
        text = self.magic_word.replace_all(&text, "").into_owned();
        text = self.list_marker.replace_all(&text, "").into_owned();
        text = self.horizontal_rule.replace_all(&text, "").into_owned();

        text = strip_html(&text);

        text = self
            .placeholder
            .replace_all(&text, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| verbatim.get(i))
                    .map(|body| html_escape::decode_html_entities(body).into_owned())
                    .unwrap_or_default()
            })
            .into_owned();

        text = self.trailing_space.replace_all(&text, "").into_owned();
        text = self.blank_lines.replace_all(&text, "\n\n").into_owned();

        Ok(text.trim().to_string())
    }
}

/// Remove every balanced `open ... close` block, nested ones included. An
/// opener that never closes is kept as literal text.
fn strip_balanced(text: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut copy_from = 0;
    let mut block_start = 0;
    let mut i = 0;

    loop {
        while i < text.len() {
            let rest = &text[i..];
            if rest.starts_with(open) {
                if depth == 0 {
                    out.push_str(&text[copy_from..i]);
                    block_start = i;
                }
                depth += 1;
                i += open.len();
            } else if depth > 0 && rest.starts_with(close) {
                depth -= 1;
                i += close.len();
                if depth == 0 {
                    copy_from = i;
                }
            } else {
                i += rest.chars().next().map_or(1, char::len_utf8);
            }
        }

        if depth == 0 {
            break;
        }

        // Rescan after the unclosed opener.
        out.push_str(open);
        depth = 0;
        i = block_start + open.len();
        copy_from = i;
    }

    out.push_str(&text[copy_from..]);
    out
}

/// Replace `[[target|label]]` links by their visible text. An unclosed `[[`
/// is kept as literal text.
fn render_links(text: &str, nesting: usize) -> Result<String, ExtractError> {
    if nesting > MAX_LINK_NESTING {
        return Err(ExtractError::NestingTooDeep(MAX_LINK_NESTING));
    }

    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut copy_from = 0;
    let mut link_start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        if rest.starts_with("[[") {
            if depth == 0 {
                out.push_str(&text[copy_from..i]);
                link_start = i + 2;
            }
            depth += 1;
            i += 2;
        } else if depth > 0 && rest.starts_with("]]") {
            depth -= 1;
            if depth == 0 {
                out.push_str(&render_link(&text[link_start..i], nesting)?);
                copy_from = i + 2;
            }
            i += 2;
        } else {
            i += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    if depth > 0 {
        out.push_str(&text[link_start - 2..]);
    } else {
        out.push_str(&text[copy_from..]);
    }
    Ok(out)
}

fn render_link(inner: &str, nesting: usize) -> Result<String, ExtractError> {
    let (target, label) = match inner.find('|') {
        Some(pos) => (&inner[..pos], Some(&inner[pos + 1..])),
        None => (inner, None),
    };
    let target = target.trim();

    let visible = if let Some(stripped) = target.strip_prefix(':') {
        stripped
    } else {
        if let Some((namespace, _)) = target.split_once(':') {
            let namespace = namespace.trim().to_lowercase();
            if DROPPED_LINK_NAMESPACES.contains(&namespace.as_str()) {
                return Ok(String::new());
            }
        }
        target
    };

    match label {
        Some(label) if !label.trim().is_empty() => render_links(label, nesting + 1),
        _ => Ok(visible.to_string()),
    }
}

/// Drop HTML tags and decode entities.
fn strip_html(text: &str) -> String {
    if text.contains('<') {
        let fragment = Html::parse_fragment(text);
        fragment.root_element().text().collect()
    } else if text.contains('&') {
        html_escape::decode_html_entities(text).into_owned()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> WikitextRenderer {
        WikitextRenderer::new().unwrap()
    }

    #[test]
    fn test_sections_split_on_headings() {
        let text = "Intro line.\n== History ==\nOld.\n=== Early ===\nOlder.\n";
        let r = renderer();
        let sections = r.sections(text);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, None);
        assert_eq!(sections[0].body, "Intro line.\n");
        assert_eq!(sections[1].title, Some("History"));
        assert_eq!(sections[1].level, 2);
        assert_eq!(sections[2].title, Some("Early"));
        assert_eq!(sections[2].level, 3);
    }

    #[test]
    fn test_lead_empty_when_page_opens_with_heading() {
        let r = renderer();
        assert_eq!(r.lead_plain_text("== Only ==\nBody text").unwrap(), None);
        assert_eq!(r.lead_plain_text("").unwrap(), None);
        assert_eq!(r.lead_plain_text("{{Infobox|name=x}}\n").unwrap(), None);
    }

    #[test]
    fn test_links_and_emphasis() {
        let r = renderer();
        let text = "'''Harry Potter''' is a [[wizard]] from [[Little Whinging|Surrey]].";
        assert_eq!(r.plain_text(text).unwrap(), "Harry Potter is a wizard from Surrey.");
    }

    #[test]
    fn test_templates_refs_and_files_removed() {
        let r = renderer();
        let text = "{{Infobox character\n|name={{PAGENAME}}\n}}\n\
                    [[File:Harry.jpg|thumb|Harry at [[Hogwarts]]]]\
                    Harry<ref name=\"b1\">Book 1</ref> is famous.<ref name=\"b2\"/>\
                    [[Category:Gryffindors]]";
        assert_eq!(r.plain_text(text).unwrap(), "Harry is famous.");
    }

    #[test]
    fn test_external_links_comments_and_html() {
        let r = renderer();
        let text = "<!-- hidden -->See [https://example.org the site] and [https://example.org/x].\n\
                    <span class=\"x\">Tom &amp; Jerry</span>";
        assert_eq!(r.plain_text(text).unwrap(), "See the site and .\nTom & Jerry");
    }

    #[test]
    fn test_tables_and_lists() {
        let r = renderer();
        let text = "Before\n{| class=\"wikitable\"\n|-\n| cell\n|}\n* first item\n# second item";
        assert_eq!(r.plain_text(text).unwrap(), "Before\n\nfirst item\nsecond item");
    }

    #[test]
    fn test_template_parameters_removed() {
        let r = renderer();
        assert_eq!(r.plain_text("a {{{1}}} b").unwrap(), "a  b");
        assert_eq!(r.plain_text("a {{tpl|{{{name|x}}}}} b").unwrap(), "a  b");
    }

    #[test]
    fn test_unclosed_markup_kept_literally() {
        let r = renderer();
        assert_eq!(
            r.lead_plain_text("Harry Potter is a wizard {{ note").unwrap().as_deref(),
            Some("Harry Potter is a wizard {{ note")
        );
        assert_eq!(r.plain_text("{{ stray {{Infobox}} text").unwrap(), "{{ stray  text");
        assert_eq!(r.plain_text("Before {| never closed").unwrap(), "Before {| never closed");
        assert_eq!(render_links("see [[Hogwarts", 0).unwrap(), "see [[Hogwarts");
        assert_eq!(render_links("[[:Category:Wizards]]", 0).unwrap(), "Category:Wizards");
    }

    #[test]
    fn test_nowiki_and_pre_are_verbatim() {
        let r = renderer();
        assert_eq!(
            r.plain_text("Use <nowiki>{{</nowiki> for templates.").unwrap(),
            "Use {{ for templates."
        );
        assert_eq!(
            r.plain_text("<nowiki>[[not a link]] &amp; '''x'''</nowiki><nowiki/>").unwrap(),
            "[[not a link]] & '''x'''"
        );
        assert_eq!(r.plain_text("Code: <pre>{{{1}}}</pre>").unwrap(), "Code: {{{1}}}");
    }

    #[test]
    fn test_heading_inside_comment_does_not_end_lead() {
        let r = renderer();
        assert_eq!(
            r.lead_plain_text("<!--\n== x ==\n-->Lead text.").unwrap().as_deref(),
            Some("Lead text.")
        );
        assert_eq!(
            r.lead_plain_text("<nowiki>\n== y ==\n</nowiki>\nLead.\n== Real ==\nBody")
                .unwrap()
                .as_deref(),
            Some("== y ==\n\nLead.")
        );
    }

    #[test]
    fn test_deeply_nested_links_fail() {
        let r = renderer();
        let depth = MAX_LINK_NESTING + 2;
        let text = format!("{}x{}", "[[a|".repeat(depth), "]]".repeat(depth));
        assert!(matches!(r.plain_text(&text), Err(ExtractError::NestingTooDeep(_))));

        assert_eq!(r.plain_text("[[a|[[b|c]]]]").unwrap(), "c");
    }
}
