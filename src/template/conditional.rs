//! Conditional reduction: keep or drop the region of an `{% if %}` block.

use super::block::{Block, Scope};
use super::directive::Directive;
use super::expression::ExpressionBridge;
use super::region::{ensure_paragraph, isolate_inline, open_paragraph_region, sibling_list, stale, strip_marker, strip_marker_text};
use crate::document::Container;
use crate::error::{Error, Result};

/// Reduce a conditional block in place. Returns the condition's outcome.
///
/// The condition is evaluated before the tree is touched, so a failing
/// expression leaves the container as it was.
pub fn reduce_conditional(container: &mut Container, block: &Block, bridge: &ExpressionBridge<'_>) -> Result<bool> {
    let Directive::IfStart { expression } = block.start.directive() else {
        return Err(Error::BlockMatch(format!("Not a conditional start: {}", block.start.raw_text)));
    };
    let keep = bridge.condition(expression)?;

    match block.scope {
        Scope::InlineRuns => reduce_inline(container, block, keep)?,
        Scope::CrossParagraph => reduce_paragraphs(container, block, keep)?,
        Scope::TableRow => reduce_row(container, block, keep)?,
    }
    Ok(keep)
}

fn reduce_inline(container: &mut Container, block: &Block, keep: bool) -> Result<()> {
    let path = &block.start.path;
    let sole_in_cell = container.owning_cell(path).is_some_and(|cell| cell.paragraph_count() == 1);

    let paragraph = container.paragraph_mut(path).ok_or_else(|| stale(&block.start))?;
    let markers = isolate_inline(paragraph, &block.start, &block.end);
    if keep {
        return Ok(());
    }

    paragraph.runs_mut().drain(markers.body());
    if !paragraph.is_blank() {
        return Ok(());
    }
    if sole_in_cell {
        paragraph.clear();
    } else {
        sibling_list(container, &block.start)?.remove(path.index);
    }
    Ok(())
}

fn reduce_paragraphs(container: &mut Container, block: &Block, keep: bool) -> Result<()> {
    if keep {
        // End first: removing its paragraph never shifts the start marker.
        strip_marker(container, &block.end)?;
        return strip_marker(container, &block.start);
    }

    let (cells, region) = open_paragraph_region(container, &block.start, &block.end)?;
    let list = container
        .element_list_mut(&cells)
        .ok_or_else(|| stale(&block.start))?;
    list.drain(region);
    ensure_paragraph(&cells, list);
    Ok(())
}

fn reduce_row(container: &mut Container, block: &Block, keep: bool) -> Result<()> {
    if keep {
        strip_marker_text(container, &block.start)?;
        return strip_marker_text(container, &block.end);
    }

    let row_idx = block.start.path.cell().map(|step| step.row).ok_or_else(|| stale(&block.start))?;
    let table = container
        .enclosing_table_mut(&block.start.path)
        .ok_or_else(|| stale(&block.start))?;
    if row_idx < table.rows.len() {
        table.replace_row(row_idx, Vec::new());
    }
    Ok(())
}
