// src/sanitize.rs
//! Plain-text extraction from feed entry markup.
//!
//! Feed entries arrive as whatever HTML the upstream publisher shipped, from
//! full page dumps with tracking scripts down to bare text. `clean_html`
//! reduces all of that to line-trimmed plain text so the summarization
//! prompts never carry markup or script payloads.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Class-name pattern marking an "article body" container. Matches the
/// conventions of WeChat public accounts and most CMS themes.
static CONTENT_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(content|rich_media_content|article)").expect("valid regex"));

static BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, section").expect("valid selector"));

/// Tags whose text content must never leak into the extracted body.
const SKIPPED_TAGS: [&str; 2] = ["script", "style"];

/// Reduces raw entry markup to clean plain text.
///
/// Strategy: drop `script`/`style` subtrees, then prefer the largest
/// `div`/`section` whose class looks like an article body over the
/// whole-document extraction. Lines are trimmed and blank lines removed.
/// Input that does not parse as markup is entity-decoded and cleaned the
/// same way. Never panics; an empty or blank input yields an empty string.
pub fn clean_html(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    // Bare text (no tags at all) only needs entity decoding.
    if !raw.contains('<') {
        return tidy_lines(&html_escape::decode_html_entities(raw));
    }

    let doc = Html::parse_document(raw);

    let candidate = doc
        .select(&BLOCK_SELECTOR)
        .filter(|el| {
            el.value()
                .attr("class")
                .is_some_and(|c| CONTENT_CLASS_RE.is_match(c))
        })
        .map(element_text)
        .max_by_key(|text| text.len());

    let text = match candidate {
        Some(block) if !block.trim().is_empty() => block,
        _ => document_text(&doc),
    };

    tidy_lines(&text)
}

/// Text of one element subtree, skipping script/style, text nodes separated
/// by newlines.
fn element_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(*el, &mut parts);
    parts.join("\n")
}

fn document_text(doc: &Html) -> String {
    let mut parts = Vec::new();
    for child in doc.tree.root().children() {
        collect_text(child, &mut parts);
    }
    parts.join("\n")
}

fn collect_text(node: ego_tree::NodeRef<'_, Node>, out: &mut Vec<String>) {
    match node.value() {
        Node::Text(t) => {
            if !t.trim().is_empty() {
                out.push(t.to_string());
            }
        }
        Node::Element(el) => {
            let name = el.name();
            if SKIPPED_TAGS.iter().any(|skip| name.eq_ignore_ascii_case(skip)) {
                return;
            }
            for child in node.children() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, out);
            }
        }
    }
}

/// Trims every line and drops the blank ones.
fn tidy_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
