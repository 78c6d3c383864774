//! Title and body extraction from a rendered page.
//!
//! A page is parsed twice: once as rendered, for selector queries, and once
//! with noise elements (`script`, `style`, `nav`, `header`, `footer`,
//! `iframe`) detached, for the whole-body fallback and metadata lookups.
//! Each field is produced by an ordered list of strategies; the first one
//! returning a usable value wins.

use crate::models::NOT_FOUND;
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Content candidates shorter than this fall through to the next strategy.
pub const MIN_CONTENT_CHARS: usize = 100;

/// Elements whose text never reaches the reader.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, nav, header, footer, iframe").expect("noise selector")
});
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("h1 selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("title selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector"));

/// Content containers in priority order.
static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        "main",
        ".content",
        ".article-body",
        ".post-content",
        "#content",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("content selector"))
    .collect()
});

/// A rendered page ready for selector queries.
pub struct PageDocument {
    /// The document as the browser rendered it.
    pub rendered: Html,
    /// The same document with noise elements detached.
    pub cleaned: Html,
}

impl PageDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            rendered: Html::parse_document(markup),
            cleaned: strip_noise(markup),
        }
    }
}

/// Parse `markup` and detach every noise element from the tree.
pub fn strip_noise(markup: &str) -> Html {
    let mut html = Html::parse_document(markup);
    let noise: Vec<_> = html.select(&NOISE).map(|el| el.id()).collect();
    for id in noise {
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
        }
    }
    html
}

/// Elements that start a new line when rendered.
const BLOCK_TAGS: [&str; 26] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "section",
    "td", "tr", "ul",
];

fn push_rendered_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if HIDDEN_TAGS.contains(&name) {
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push(' ');
            }
            push_rendered_text(child, out);
            if block {
                out.push(' ');
            }
        }
    }
}

/// Visible text of an element as a reader sees it.
///
/// Inline runs are concatenated as-is (`<span>L</span>es` reads `Les`); block
/// boundaries become a space. Whitespace is collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    push_rendered_text(element, &mut text);
    collapse_whitespace(&text)
}

/// Every visible text node of an element, each separated by a space.
pub fn joined_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    collapse_whitespace(&parts.join(" "))
}

/// Text of the first element matching `selector`, if it has any.
fn first_text(
    html: &Html,
    selector: &Selector,
    text_of: fn(ElementRef<'_>) -> String,
) -> Option<String> {
    html.select(selector)
        .next()
        .map(text_of)
        .filter(|text| !text.is_empty())
}

/// Resolve the article title.
///
/// Strategies: the live `h1` text reported by the browser, the first `h1`
/// of the rendered markup, the document `<title>`, then [`NOT_FOUND`].
pub fn extract_title(heading: Option<&str>, page: &PageDocument) -> String {
    heading
        .map(collapse_whitespace)
        .filter(|title| !title.is_empty())
        .or_else(|| first_text(&page.rendered, &H1, element_text))
        .or_else(|| first_text(&page.rendered, &TITLE, element_text))
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

/// Resolve the article body.
///
/// Tries each content container in priority order and keeps the first whose
/// rendered text exceeds [`MIN_CONTENT_CHARS`]; otherwise falls back to every
/// text node of the cleaned `<body>`, space-separated. The result is whitespace-collapsed and may be empty.
pub fn extract_content(page: &PageDocument) -> String {
    CONTENT_SELECTORS
        .iter()
        .find_map(|selector| {
            first_text(&page.rendered, selector, element_text)
                .filter(|text| text.chars().count() > MIN_CONTENT_CHARS)
        })
        .or_else(|| first_text(&page.cleaned, &BODY, joined_text))
        .unwrap_or_default()
}
