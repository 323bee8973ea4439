//! Block matching and scope classification.

use super::directive::Directive;
use super::scanner::PlaceholderSpan;
use crate::document::ParagraphPath;
use crate::error::{Error, Result};

/// Kind of block directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `{% for … in … %}` … `{% endfor %}`
    Loop,
    /// `{% if … %}` … `{% endif %}`
    Conditional,
}

impl BlockKind {
    #[inline]
    pub fn is_start(self, directive: &Directive<'_>) -> bool {
        match self {
            BlockKind::Loop => directive.is_for_start(),
            BlockKind::Conditional => directive.is_if_start(),
        }
    }

    #[inline]
    pub fn is_end(self, directive: &Directive<'_>) -> bool {
        match self {
            BlockKind::Loop => *directive == Directive::EndFor,
            BlockKind::Conditional => *directive == Directive::EndIf,
        }
    }

    fn end_marker(self) -> &'static str {
        match self {
            BlockKind::Loop => "endfor",
            BlockKind::Conditional => "endif",
        }
    }
}

/// Structural placement of a block's markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Both markers in the same paragraph
    InlineRuns,
    /// Markers in sibling paragraphs of one container or cell
    CrossParagraph,
    /// Markers in different cells of the same table row
    TableRow,
}

/// A resolved block: start and end markers plus everything between them.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: BlockKind,
    pub start: PlaceholderSpan,
    pub end: PlaceholderSpan,
    pub body: Vec<PlaceholderSpan>,
    pub scope: Scope,
}

/// Find the end marker closing the start marker at `start`.
///
/// Same-kind markers nest: every nested start must be closed before the
/// outer block's end is accepted.
pub fn find_block_end(spans: &[PlaceholderSpan], start: usize, kind: BlockKind) -> Result<usize> {
    let mut level = 0usize;
    for (index, span) in spans.iter().enumerate().skip(start + 1) {
        let directive = span.directive();
        if kind.is_end(&directive) {
            if level == 0 {
                return Ok(index);
            }
            level -= 1;
        } else if kind.is_start(&directive) {
            level += 1;
        }
    }
    let marker = spans.get(start).map_or("", |s| s.raw_text.as_str());
    Err(Error::BlockMatch(format!(
        "Missing {} for {marker}",
        kind.end_marker()
    )))
}

/// Classify a block by where its start and end paragraphs sit in the tree.
pub fn classify_scope(start: &ParagraphPath, end: &ParagraphPath) -> Result<Scope> {
    if start == end {
        return Ok(Scope::InlineRuns);
    }

    if let (Some((s_cell, s_outer)), Some((e_cell, e_outer))) = (start.cells.split_last(), end.cells.split_last()) {
        let same_row = s_outer == e_outer && s_cell.element == e_cell.element && s_cell.row == e_cell.row;
        if same_row && s_cell.cell != e_cell.cell {
            return Ok(Scope::TableRow);
        }
    }

    if start.is_sibling_of(end) {
        return Ok(Scope::CrossParagraph);
    }

    if start.cell().is_some() {
        Err(Error::Scope(
            "Start/end mismatch: the start marker is in a table cell but the end marker is not in a cell of the same row"
                .to_string(),
        ))
    } else {
        Err(Error::Scope(
            "Start and end markers are in different containers".to_string(),
        ))
    }
}

/// Resolve the block opened by the span at `start`.
pub fn resolve_block(spans: &[PlaceholderSpan], start: usize, kind: BlockKind) -> Result<Block> {
    let end = find_block_end(spans, start, kind)?;
    let (start_span, end_span) = (&spans[start], &spans[end]);
    let scope = classify_scope(&start_span.path, &end_span.path)
        .map_err(|e| e.in_block(&start_span.raw_text, &end_span.raw_text))?;
    Ok(Block {
        kind,
        start: start_span.clone(),
        end: end_span.clone(),
        body: spans[start + 1..end].to_vec(),
        scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CellStep, TextPos};
    use proptest::prelude::*;
    use smallvec::smallvec;

    fn span(raw: &str) -> PlaceholderSpan {
        PlaceholderSpan {
            raw_text: raw.to_string(),
            paragraph_index: 0,
            path: ParagraphPath::top_level(0),
            start: TextPos::default(),
            end: TextPos::default(),
        }
    }

    fn in_cell(row: usize, cell: usize, index: usize) -> ParagraphPath {
        ParagraphPath {
            cells: smallvec![CellStep { element: 1, row, cell }],
            index,
        }
    }

    #[test]
    fn test_nested_blocks_match_innermost_first() {
        let spans: Vec<_> = [
            "{% for a in x %}",
            "{% if c %}",
            "{% for b in a.y %}",
            "{{ b }}",
            "{% endfor %}",
            "{% endif %}",
            "{% endfor %}",
        ]
        .into_iter()
        .map(span)
        .collect();
        assert_eq!(find_block_end(&spans, 0, BlockKind::Loop).unwrap(), 6);
        assert_eq!(find_block_end(&spans, 2, BlockKind::Loop).unwrap(), 4);
        assert_eq!(find_block_end(&spans, 1, BlockKind::Conditional).unwrap(), 5);
    }

    #[test]
    fn test_missing_end_names_start_marker() {
        let spans = vec![span("{% for x in items %}"), span("{{ x }}")];
        let err = find_block_end(&spans, 0, BlockKind::Loop).unwrap_err();
        assert_eq!(err, Error::BlockMatch("Missing endfor for {% for x in items %}".to_string()));
    }

    #[test]
    fn test_classify_scope() {
        let top = ParagraphPath::top_level;
        assert_eq!(classify_scope(&top(2), &top(2)).unwrap(), Scope::InlineRuns);
        assert_eq!(classify_scope(&top(2), &top(5)).unwrap(), Scope::CrossParagraph);
        assert_eq!(classify_scope(&in_cell(0, 0, 0), &in_cell(0, 2, 0)).unwrap(), Scope::TableRow);
        assert_eq!(classify_scope(&in_cell(0, 1, 0), &in_cell(0, 1, 3)).unwrap(), Scope::CrossParagraph);
        assert!(matches!(classify_scope(&in_cell(0, 0, 0), &in_cell(1, 0, 0)), Err(Error::Scope(m)) if m.starts_with("Start/end mismatch")));
        assert!(matches!(classify_scope(&in_cell(0, 0, 0), &top(4)), Err(Error::Scope(m)) if m.starts_with("Start/end mismatch")));
        assert!(matches!(classify_scope(&top(0), &in_cell(0, 0, 0)), Err(Error::Scope(m)) if m.contains("different containers")));
    }

    /// Reference matcher: a plain stack over the token stream.
    fn stack_match(tokens: &[u8]) -> Vec<Option<usize>> {
        let mut result = vec![None; tokens.len()];
        let mut stack = Vec::new();
        for (i, &t) in tokens.iter().enumerate() {
            match t {
                0 => stack.push(i),
                1 => {
                    if let Some(open) = stack.pop() {
                        result[open] = Some(i);
                    }
                },
                _ => {},
            }
        }
        result
    }

    proptest! {
        #[test]
        fn prop_bracket_matching(tokens in prop::collection::vec(0u8..4, 0..40)) {
            let spans: Vec<_> = tokens
                .iter()
                .map(|t| match t {
                    0 => span("{% for i in xs %}"),
                    1 => span("{% endfor %}"),
                    2 => span("{% if z %}"),
                    _ => span("{{ v }}"),
                })
                .collect();
            let expected = stack_match(&tokens);
            for (i, &t) in tokens.iter().enumerate() {
                if t != 0 {
                    continue;
                }
                match (find_block_end(&spans, i, BlockKind::Loop), expected[i]) {
                    (Ok(end), Some(want)) => prop_assert_eq!(end, want),
                    (Err(Error::BlockMatch(_)), None) => {},
                    (got, want) => prop_assert!(false, "start {}: got {:?}, want {:?}", i, got, want),
                }
            }
        }
    }
}
