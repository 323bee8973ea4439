//! Template regions: the part of the tree strictly between a block's markers.
//!
//! Loop expansion and conditional reduction share these helpers; they differ
//! only in what happens to the region once it has been carved out.

use super::scanner::PlaceholderSpan;
use crate::document::{CellStep, Container, DocumentElement, Paragraph, Run};
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::ops::Range;

pub(crate) fn stale(span: &PlaceholderSpan) -> Error {
    Error::Scope(format!("Marker {} no longer resolves to a paragraph", span.raw_text))
}

fn is_empty_text(runs: &[Run]) -> bool {
    runs.iter().all(|r| r.text().is_some_and(str::is_empty))
}

/// Whether the paragraph holds nothing but the marker.
fn is_marker_only(paragraph: &Paragraph, span: &PlaceholderSpan) -> bool {
    paragraph.text().trim() == span.raw_text.trim()
}

/// Run ranges of two markers sharing one paragraph after isolation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InlineMarkers {
    pub start_last: usize,
    pub end_first: usize,
}

impl InlineMarkers {
    /// Runs strictly between the two markers.
    #[inline]
    pub fn body(&self) -> Range<usize> {
        self.start_last + 1..self.end_first
    }
}

/// Split runs so both markers occupy whole runs, then empty those runs.
///
/// The emptied runs stay in place as anchors.
pub(crate) fn isolate_inline(paragraph: &mut Paragraph, start: &PlaceholderSpan, end: &PlaceholderSpan) -> InlineMarkers {
    let (end_first, end_last) = paragraph.isolate(end.start, end.end);
    let before = paragraph.run_count();
    let (start_first, start_last) = paragraph.isolate(start.start, start.end);
    let shift = paragraph.run_count() - before;
    let (end_first, end_last) = (end_first + shift, end_last + shift);

    paragraph.clear_runs(start_first, start_last);
    paragraph.clear_runs(end_first, end_last);
    InlineMarkers { start_last, end_first }
}

/// Element list owning a marker's paragraph.
pub(crate) fn sibling_list<'c>(
    container: &'c mut Container,
    span: &PlaceholderSpan,
) -> Result<&'c mut Vec<DocumentElement>> {
    container.element_list_mut(&span.path.cells).ok_or_else(|| stale(span))
}

fn paragraph_at<'l>(list: &'l mut [DocumentElement], span: &PlaceholderSpan) -> Result<&'l mut Paragraph> {
    list.get_mut(span.path.index)
        .and_then(DocumentElement::as_paragraph_mut)
        .ok_or_else(|| stale(span))
}

/// A cell must keep at least one paragraph.
pub(crate) fn ensure_paragraph(cells: &[CellStep], list: &mut Vec<DocumentElement>) {
    if !cells.is_empty() && !list.iter().any(DocumentElement::is_paragraph) {
        list.push(DocumentElement::Paragraph(Paragraph::new()));
    }
}

/// Carve out the sibling paragraphs between two markers in different paragraphs.
///
/// A paragraph holding nothing but its marker is deleted. Otherwise the
/// paragraph is split at the marker so that content before a start marker and
/// after an end marker stays outside the region; the marker text itself is
/// removed. Returns the parent list's steps and the region's element range.
pub(crate) fn open_paragraph_region(
    container: &mut Container,
    start: &PlaceholderSpan,
    end: &PlaceholderSpan,
) -> Result<(SmallVec<[CellStep; 2]>, Range<usize>)> {
    let cells = start.path.cells.clone();
    let list = sibling_list(container, start)?;
    let (si, ei) = (start.path.index, end.path.index);

    // End side first so the start index stays valid.
    let end_para = paragraph_at(list, end)?;
    let mut region_end = if is_marker_only(end_para, end) {
        list.remove(ei);
        ei
    } else {
        let (first, last) = end_para.isolate(end.start, end.end);
        end_para.clear_runs(first, last);
        if is_empty_text(&end_para.runs()[..first]) {
            ei
        } else {
            let tail = end_para.split_off(first);
            list.insert(ei + 1, DocumentElement::Paragraph(tail));
            ei + 1
        }
    };

    let start_para = paragraph_at(list, start)?;
    let region_start = if is_marker_only(start_para, start) {
        list.remove(si);
        region_end -= 1;
        si
    } else {
        let (first, last) = start_para.isolate(start.start, start.end);
        start_para.clear_runs(first, last);
        if !is_empty_text(&start_para.runs()[last + 1..]) {
            let tail = start_para.split_off(last + 1);
            list.insert(si + 1, DocumentElement::Paragraph(tail));
            region_end += 1;
        }
        si + 1
    };

    Ok((cells, region_start..region_end.max(region_start)))
}

/// Remove a marker without touching the region: delete a paragraph holding only
/// the marker (unless it is the last paragraph of a cell), else strip its text.
pub(crate) fn strip_marker(container: &mut Container, span: &PlaceholderSpan) -> Result<()> {
    let list = sibling_list(container, span)?;
    let in_cell = !span.path.cells.is_empty();
    let paragraphs = list.iter().filter(|e| e.is_paragraph()).count();
    let paragraph = paragraph_at(list, span)?;
    if is_marker_only(paragraph, span) && (!in_cell || paragraphs > 1) {
        list.remove(span.path.index);
    } else {
        paragraph.replace_span(span.start, span.end, "");
    }
    Ok(())
}

/// Remove only the marker text, leaving every node in place.
pub(crate) fn strip_marker_text(container: &mut Container, span: &PlaceholderSpan) -> Result<()> {
    container
        .paragraph_mut(&span.path)
        .ok_or_else(|| stale(span))?
        .replace_span(span.start, span.end, "");
    Ok(())
}
