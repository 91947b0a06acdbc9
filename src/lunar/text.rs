//! Page text and the small helpers shared by both document parsers.

use crate::error::ParseError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// A parsed document plus its visible text, computed once per page.
pub struct Page {
    html: Html,
    text: String,
}

impl Page {
    pub fn parse(raw: &str) -> Self {
        let html = Html::parse_document(raw);
        let text = visible_text(html.root_element());
        Self { html, text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        let title = self.html.select(&selector).next()?;
        Some(visible_text(title))
    }

    /// Visible text of every element matching `css`, in document order.
    pub fn select_texts(&self, css: &str) -> Result<Vec<String>, ParseError> {
        let selector = Selector::parse(css)
            .map_err(|err| ParseError::Selector(format!("{css}: {err}")))?;
        Ok(self.html.select(&selector).map(visible_text).collect())
    }
}

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript"];

const BLOCK_TAGS: &[&str] = &[
    "html", "head", "title", "body", "div", "p", "br", "hr", "h1", "h2", "h3", "h4", "h5",
    "h6", "ul", "ol", "li", "dl", "dt", "dd", "table", "thead", "tbody", "tfoot", "tr", "td",
    "th", "section", "article", "header", "footer", "nav", "aside", "main", "blockquote",
    "pre", "form", "figure", "figcaption", "select", "option",
];

/// Visible text under `root`, one line per block element.
///
/// Inline markup (`<b>`, `<span>`, links) stays on the line it sits in, so a labeled
/// list split by formatting tags reads as one line. Script and style bodies are skipped.
pub fn visible_text(root: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();
    collect_lines(root, &mut lines, &mut line);
    flush_line(&mut lines, &mut line);
    lines.join("\n")
}

fn collect_lines(element: ElementRef<'_>, lines: &mut Vec<String>, line: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            line.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();
        if HIDDEN_TAGS.contains(&name) {
            continue;
        }
        let block = BLOCK_TAGS.contains(&name);
        if block {
            flush_line(lines, line);
        }
        collect_lines(child, lines, line);
        if block {
            flush_line(lines, line);
        }
    }
}

fn flush_line(lines: &mut Vec<String>, line: &mut String) {
    let collapsed = collapse_whitespace(line);
    if !collapsed.is_empty() {
        lines.push(collapsed);
    }
    line.clear();
}

/// One link in a field's fallback chain.
pub type Heuristic<'a, T> = &'a dyn Fn(&Page) -> Option<T>;

/// Run heuristics in order and keep the first value found.
pub fn first_of<T>(page: &Page, chain: &[Heuristic<'_, T>]) -> Option<T> {
    chain.iter().find_map(|heuristic| heuristic(page))
}

pub fn compile(pattern: &str) -> Result<Regex, ParseError> {
    Regex::new(pattern).map_err(|source| ParseError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `input`, no ellipsis.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}

pub fn char_len(input: &str) -> usize {
    input.chars().count()
}

/// Drop `(...)` asides and tidy the whitespace they leave behind.
pub fn strip_parentheticals(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut depth = 0usize;
    for ch in input.chars() {
        match ch {
            '(' => {
                depth += 1;
                out.push(' ');
            }
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

/// Text between the end of `start` and the earliest following `end` match.
/// With no end marker the section runs to the end of `text`.
pub fn bounded_section<'t>(text: &'t str, start: &Regex, ends: &[&Regex]) -> Option<&'t str> {
    let opening = start.find(text)?;
    let rest = &text[opening.end()..];
    let stop = ends
        .iter()
        .filter_map(|end| end.find(rest).map(|m| m.start()))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..stop])
}

pub fn parse_number<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_breaks_lines_at_blocks_only() {
        let page = Page::parse(
            "<html><head><title>Lịch âm</title><script>var x = 'Sao Giác';</script></head>\
             <body><p>Ngày <b>Kỷ</b> <b>Mùi</b></p><style>.a{}</style></body></html>",
        );
        assert_eq!(page.text(), "Lịch âm\nNgày Kỷ Mùi");
        assert_eq!(page.title().as_deref(), Some("Lịch âm"));
    }

    #[test]
    fn blank_document_is_detected() {
        assert!(Page::parse("<html><body>  </body></html>").is_blank());
        assert!(!Page::parse("<p>x</p>").is_blank());
    }

    #[test]
    fn first_of_stops_at_first_hit() {
        let page = Page::parse("<p>abc</p>");
        let miss: Heuristic<'_, u8> = &|_| None;
        let hit: Heuristic<'_, u8> = &|_| Some(2);
        let later: Heuristic<'_, u8> = &|_| Some(3);
        assert_eq!(first_of(&page, &[miss, hit, later]), Some(2));
        assert_eq!(first_of(&page, &[miss]), None);
    }

    #[test]
    fn bounded_section_runs_to_end_without_end_marker() {
        let start = compile(r"Nên làm[:\s]+").expect("start");
        let end = compile(r"Kỵ\s*làm").expect("end");
        let text = "Nên làm: cưới hỏi, xuất hành";
        assert_eq!(
            bounded_section(text, &start, &[&end]),
            Some("cưới hỏi, xuất hành")
        );
        let bounded = "Nên làm: cưới hỏi Kỵ làm: an táng";
        assert_eq!(bounded_section(bounded, &start, &[&end]), Some("cưới hỏi "));
        assert_eq!(bounded_section("nothing", &start, &[&end]), None);
    }

    #[test]
    fn parentheticals_and_whitespace_are_stripped() {
        assert_eq!(strip_parentheticals("Thiên Cẩu (Cẩu Giảo)  x"), "Thiên Cẩu x");
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
        assert_eq!(truncate_chars("Tốc hỷ", 3), "Tốc");
    }
}
