//! Placeholder scanner.
//!
//! Placeholders may be fragmented across runs in any way the editing
//! application chose, so the scanner walks a paragraph character by character
//! across run boundaries instead of matching each run's text on its own.

use super::directive::Directive;
use crate::document::{Container, Paragraph, ParagraphPath, RunContent, TextPos};
use crate::error::{Error, Result};

/// A placeholder located in the tree.
///
/// `raw_text` is exactly the concatenation of run text from `start` to `end`,
/// both inclusive. Spans are snapshots: any rewrite of the tree makes them stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpan {
    pub raw_text: String,
    /// Position of the paragraph in the container's document order
    pub paragraph_index: usize,
    pub path: ParagraphPath,
    pub start: TextPos,
    pub end: TextPos,
}

impl PlaceholderSpan {
    #[inline]
    pub fn directive(&self) -> Directive<'_> {
        Directive::parse(&self.raw_text)
    }
}

/// Flatten the scannable characters of a paragraph with their positions.
fn positioned_chars(paragraph: &Paragraph) -> Vec<(TextPos, char)> {
    let mut chars = Vec::new();
    for (run_idx, run) in paragraph.runs().iter().enumerate() {
        let RunContent::Text(text) = run.content() else {
            continue;
        };
        chars.extend(
            text.chars()
                .enumerate()
                .map(|(offset, c)| (TextPos::new(run_idx, offset), c)),
        );
    }
    chars
}

/// Whether the `{` at `i` opens a placeholder: `{{`, `{%` or the tolerated `{ %`.
fn opens_at(chars: &[(TextPos, char)], i: usize) -> bool {
    match chars.get(i + 1).map(|&(_, c)| c) {
        Some('{') | Some('%') => true,
        Some(' ') => chars.get(i + 2).is_some_and(|&(_, c)| c == '%'),
        _ => false,
    }
}

/// Scan one paragraph for placeholders.
pub fn scan_paragraph(paragraph: &Paragraph, paragraph_index: usize, path: &ParagraphPath) -> Result<Vec<PlaceholderSpan>> {
    let has_opener = paragraph
        .runs()
        .iter()
        .filter_map(|r| r.text())
        .any(|t| memchr::memchr(b'{', t.as_bytes()).is_some());
    if !has_opener {
        return Ok(Vec::new());
    }

    let chars = positioned_chars(paragraph);
    let mut spans = Vec::new();
    let mut open: Option<(TextPos, String)> = None;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        match open.as_mut() {
            None => {
                if c == '{' && opens_at(&chars, i) {
                    open = Some((pos, String::from('{')));
                }
            },
            Some((start, text)) => {
                text.push(c);
                if matches!(c, '%' | '}') && chars.get(i + 1).is_some_and(|&(_, n)| n == '}') {
                    text.push('}');
                    spans.push(PlaceholderSpan {
                        raw_text: std::mem::take(text),
                        paragraph_index,
                        path: path.clone(),
                        start: *start,
                        end: chars[i + 1].0,
                    });
                    open = None;
                    i += 2;
                    continue;
                }
            },
        }
        i += 1;
    }

    match open {
        Some((_, partial)) => Err(Error::Scan(format!("Unterminated placeholder: {partial:?}"))),
        None => Ok(spans),
    }
}

/// Scan every paragraph of a container, table cells included, in document order.
pub fn scan_container(container: &Container) -> Result<Vec<PlaceholderSpan>> {
    let mut spans = Vec::new();
    for (index, (path, paragraph)) in container.paragraphs().into_iter().enumerate() {
        spans.extend(scan_paragraph(paragraph, index, &path)?);
    }
    tracing::trace!(count = spans.len(), kind = ?container.kind(), "scanned placeholders");
    Ok(spans)
}
