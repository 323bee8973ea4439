//! Loop expansion.
//!
//! The template region between `{% for %}` and `{% endfor %}` is materialized
//! once per item. In every copy, placeholders referring to the loop variable
//! are rewritten to address the item directly (`x.name` becomes
//! `items[1].name`), so later passes resolve them like any other field.

use super::block::{Block, Scope};
use super::directive::{Directive, rewrite_loop_variable};
use super::region::{ensure_paragraph, isolate_inline, open_paragraph_region, stale, strip_marker_text};
use super::scanner::scan_paragraph;
use super::value::{FieldPath, Value};
use crate::document::element::visit_paragraphs_mut;
use crate::document::{Container, DocumentElement, Paragraph, ParagraphPath, Row, Run};
use crate::error::{Error, Result};

/// Loop header: `{% for variable in source %}` plus the resolved item count.
#[derive(Debug, Clone)]
pub struct LoopContext<'a> {
    pub variable: &'a str,
    pub source: &'a str,
    pub count: usize,
}

impl<'a> LoopContext<'a> {
    /// Read the loop header from the block's start marker and count its items.
    pub fn resolve(block: &'a Block, data: &Value) -> Result<Self> {
        let Directive::ForStart { variable, source } = block.start.directive() else {
            return Err(Error::BlockMatch(format!("Not a loop start: {}", block.start.raw_text)));
        };
        let path = FieldPath::parse(source)?;
        let count = data.lookup(&path).map_or(0, Value::item_count);
        Ok(Self {
            variable,
            source,
            count,
        })
    }

    /// Path addressing item `idx`: indexed when there are several items.
    pub fn item_base(&self, idx: usize) -> String {
        if self.count > 1 {
            format!("{}[{idx}]", self.source)
        } else {
            self.source.to_string()
        }
    }

    /// Rewrite the loop variable in one paragraph of a copy.
    ///
    /// `nested` tracks the nested loops open at the paragraph start, `true` for
    /// each one that rebinds the loop variable. Inside such a loop the variable
    /// names the inner item, so nothing there is rewritten; the inner source
    /// itself is still evaluated in this loop's scope.
    fn substitute(&self, paragraph: &mut Paragraph, base: &str, nested: &mut Vec<bool>) -> Result<()> {
        let spans = scan_paragraph(paragraph, 0, &ParagraphPath::default())?;
        let mut targets = Vec::with_capacity(spans.len());
        for span in &spans {
            let shadowed = nested.contains(&true);
            match span.directive() {
                Directive::ForStart { variable, .. } => {
                    if !shadowed {
                        targets.push(span);
                    }
                    nested.push(variable == self.variable);
                },
                Directive::EndFor => {
                    nested.pop();
                },
                _ if !shadowed => targets.push(span),
                _ => {},
            }
        }
        for span in targets.into_iter().rev() {
            if let Some(text) = rewrite_loop_variable(&span.raw_text, self.variable, base) {
                paragraph.replace_span(span.start, span.end, &text);
            }
        }
        Ok(())
    }

    /// Rewrite one copy of the loop body, in document order.
    fn substitute_elements(&self, elements: &mut [DocumentElement], idx: usize) -> Result<()> {
        let base = self.item_base(idx);
        let mut nested = Vec::new();
        visit_paragraphs_mut(elements, &mut |p| self.substitute(p, &base, &mut nested))
    }
}

/// Expand a loop block in place. Returns the number of materialized copies.
pub fn expand_loop(container: &mut Container, block: &Block, data: &Value) -> Result<usize> {
    let ctx = LoopContext::resolve(block, data)?;
    match block.scope {
        Scope::InlineRuns => expand_inline(container, block, &ctx)?,
        Scope::CrossParagraph => expand_paragraphs(container, block, &ctx)?,
        Scope::TableRow => expand_row(container, block, &ctx)?,
    }
    Ok(ctx.count)
}

fn expand_inline(container: &mut Container, block: &Block, ctx: &LoopContext<'_>) -> Result<()> {
    let paragraph = container
        .paragraph_mut(&block.start.path)
        .ok_or_else(|| stale(&block.start))?;
    let markers = isolate_inline(paragraph, &block.start, &block.end);

    let template: Vec<Run> = paragraph.runs()[markers.body()].to_vec();
    let mut copies = Vec::with_capacity(template.len() * ctx.count);
    for idx in 0..ctx.count {
        let mut copy = Paragraph {
            properties: None,
            runs: template.clone(),
        };
        ctx.substitute(&mut copy, &ctx.item_base(idx), &mut Vec::new())?;
        copies.extend(copy.runs);
    }
    paragraph.runs_mut().splice(markers.body(), copies);
    Ok(())
}

fn expand_paragraphs(container: &mut Container, block: &Block, ctx: &LoopContext<'_>) -> Result<()> {
    let (cells, region) = open_paragraph_region(container, &block.start, &block.end)?;
    let list = container
        .element_list_mut(&cells)
        .ok_or_else(|| stale(&block.start))?;

    let template: Vec<DocumentElement> = list[region.clone()].to_vec();
    let mut copies = Vec::with_capacity(template.len() * ctx.count);
    for idx in 0..ctx.count {
        let mut copy = template.clone();
        ctx.substitute_elements(&mut copy, idx)?;
        copies.extend(copy);
    }
    list.splice(region, copies);
    ensure_paragraph(&cells, list);
    Ok(())
}

fn expand_row(container: &mut Container, block: &Block, ctx: &LoopContext<'_>) -> Result<()> {
    strip_marker_text(container, &block.start)?;
    strip_marker_text(container, &block.end)?;

    let row_idx = block.start.path.cell().map(|step| step.row).ok_or_else(|| stale(&block.start))?;
    let table = container
        .enclosing_table_mut(&block.start.path)
        .ok_or_else(|| stale(&block.start))?;
    let template: Row = table.rows.get(row_idx).cloned().ok_or_else(|| stale(&block.start))?;

    let mut copies = Vec::with_capacity(ctx.count);
    for idx in 0..ctx.count {
        let mut copy = template.clone();
        let base = ctx.item_base(idx);
        let mut nested = Vec::new();
        for cell in &mut copy.cells {
            visit_paragraphs_mut(&mut cell.elements, &mut |p| ctx.substitute(p, &base, &mut nested))?;
        }
        copies.push(copy);
    }
    table.replace_row(row_idx, copies);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Cell, Table};
    use crate::template::block::{BlockKind, resolve_block};
    use crate::template::scanner::scan_container;
    use proptest::prelude::*;

    fn data(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    fn expand_first(container: &mut Container, data: &Value) -> Result<usize> {
        let spans = scan_container(container)?;
        let start = spans.iter().position(|s| s.directive().is_for_start()).unwrap();
        let block = resolve_block(&spans, start, BlockKind::Loop)?;
        expand_loop(container, &block, data)
    }

    fn placeholders(container: &Container) -> Vec<String> {
        scan_container(container)
            .unwrap()
            .into_iter()
            .map(|s| s.raw_text)
            .collect()
    }

    #[test]
    fn test_inline_loop_rewrites_each_copy() {
        let mut c = Container::body();
        c.add_paragraph(Paragraph::from_texts(["{% for x in items %}", "{{x.name}} ", "{% endfor %}"]));
        let n = expand_first(&mut c, &data(r#"{"items": [{"name": "a"}, {"name": "b"}]}"#)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(placeholders(&c), ["{{items[0].name}}", "{{items[1].name}}"]);
        assert_eq!(c.text(), "{{items[0].name}} {{items[1].name}} ");
    }

    #[test]
    fn test_single_item_uses_unindexed_source() {
        let mut c = Container::body();
        c.add_paragraph(Paragraph::from_texts(["{% for x in items %}{{ x.name }}{% endfor %}"]));
        expand_first(&mut c, &data(r#"{"items": [{"name": "a"}]}"#)).unwrap();
        assert_eq!(c.text(), "{{ items.name }}");
    }

    #[test]
    fn test_empty_and_missing_items_remove_body() {
        for json in [r#"{"items": []}"#, r#"{}"#, r#"{"items": null}"#] {
            let mut c = Container::body();
            c.add_paragraph(Paragraph::from_texts(["{% for x in items %}", "{{x.name}} ", "{% endfor %}"]));
            assert_eq!(expand_first(&mut c, &data(json)).unwrap(), 0);
            assert_eq!(c.text(), "");
        }
    }

    #[test]
    fn test_paragraph_loop() {
        let mut c = Container::body();
        c.add_paragraph(Paragraph::from_texts(["Items:"]));
        c.add_paragraph(Paragraph::from_texts(["{% for it in order.lines %}"]));
        c.add_paragraph(Paragraph::from_texts(["- {{ it.sku }}"]));
        c.add_paragraph(Paragraph::from_texts(["  qty {{ it.qty }}"]));
        c.add_paragraph(Paragraph::from_texts(["{% endfor %}"]));
        c.add_paragraph(Paragraph::from_texts(["Total"]));
        let n = expand_first(&mut c, &data(r#"{"order": {"lines": [1, 2, 3]}}"#)).unwrap();
        assert_eq!(n, 3);
        let texts: Vec<_> = c.elements().iter().map(DocumentElement::text).collect();
        assert_eq!(texts.len(), 8);
        assert_eq!(texts[0], "Items:");
        assert_eq!(texts[3], "- {{ order.lines[1].sku }}");
        assert_eq!(texts[6], "  qty {{ order.lines[2].qty }}");
        assert_eq!(texts[7], "Total");
    }

    #[test]
    fn test_row_loop() {
        let mut table = Table::new();
        table.add_row(Row::from_texts(["Name", "Qty"]));
        table.add_row(Row::from_texts(["{% for r in rows %}{{ r.name }}", "{{ r.qty }}{% endfor %}"]));
        let mut c = Container::body();
        c.add_table(table);

        expand_first(&mut c, &data(r#"{"rows": [{}, {}, {}]}"#)).unwrap();
        let table = c.elements()[0].as_table().unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.rows()[3].text(), "{{ rows[2].name }}\t{{ rows[2].qty }}");
        assert!(!c.text().contains("for"));
    }

    #[test]
    fn test_nested_loop_source_is_rewritten() {
        let mut c = Container::body();
        c.add_paragraph(Paragraph::from_texts(["{% for g in groups %}"]));
        c.add_paragraph(Paragraph::from_texts(["{% for m in g.members %}{{ m }}{% endfor %}"]));
        c.add_paragraph(Paragraph::from_texts(["{% endfor %}"]));
        expand_first(&mut c, &data(r#"{"groups": [{"members": [1]}, {"members": []}]}"#)).unwrap();
        assert_eq!(
            placeholders(&c),
            [
                "{% for m in groups[0].members %}",
                "{{ m }}",
                "{% endfor %}",
                "{% for m in groups[1].members %}",
                "{{ m }}",
                "{% endfor %}",
            ]
        );
    }

    #[test]
    fn test_rebound_variable_is_left_to_inner_loop() {
        let mut c = Container::body();
        c.add_paragraph(Paragraph::from_texts([
            "{% for x in groups %}{% for x in x.items %}{{ x }};{% endfor %}|{% endfor %}",
        ]));
        expand_first(&mut c, &data(r#"{"groups": [{"items": [1]}, {"items": [2]}]}"#)).unwrap();
        assert_eq!(
            placeholders(&c),
            [
                "{% for x in groups[0].items %}",
                "{{ x }}",
                "{% endfor %}",
                "{% for x in groups[1].items %}",
                "{{ x }}",
                "{% endfor %}",
            ]
        );
    }

    #[test]
    fn test_rebinding_spans_paragraphs() {
        let mut c = Container::body();
        for t in [
            "{% for x in xs %}",
            "{{ x.title }}",
            "{% for x in x.kids %}",
            "{% if x.ok %}{{ x.name }}{% endif %}",
            "{% endfor %}",
            "{{ x.title }}",
            "{% endfor %}",
        ] {
            c.add_paragraph(Paragraph::from_texts([t]));
        }
        expand_first(&mut c, &data(r#"{"xs": [{}, {}]}"#)).unwrap();
        let texts: Vec<_> = c.elements().iter().map(DocumentElement::text).collect();
        assert_eq!(
            texts[..5],
            [
                "{{ xs[0].title }}",
                "{% for x in xs[0].kids %}",
                "{% if x.ok %}{{ x.name }}{% endif %}",
                "{% endfor %}",
                "{{ xs[0].title }}",
            ]
        );
        assert_eq!(texts[6], "{% for x in xs[1].kids %}");
        assert_eq!(texts.len(), 10);
    }

    #[test]
    fn test_zero_items_remove_paragraph_region() {
        let mut c = Container::body();
        for t in ["head", "{% for x in xs %}", "{{ x }}", "more {{ x }}", "{% endfor %}", "tail"] {
            c.add_paragraph(Paragraph::from_texts([t]));
        }
        assert_eq!(expand_first(&mut c, &data(r#"{"xs": []}"#)).unwrap(), 0);
        assert_eq!(c.text(), "head\ntail");
    }

    #[test]
    fn test_zero_items_remove_row() {
        let mut table = Table::new();
        table.add_row(Row::from_texts(["h1", "h2"]));
        table.add_row(Row::from_texts(["{% for r in rs %}{{ r.a }}", "{{ r.b }}{% endfor %}"]));
        table.add_row(Row::from_texts(["f1", "f2"]));
        let mut c = Container::body();
        c.add_table(table);

        assert_eq!(expand_first(&mut c, &data(r#"{"rs": []}"#)).unwrap(), 0);
        assert_eq!(c.text(), "h1\th2\nf1\tf2");
    }

    fn cell_loop() -> Container {
        let mut cell = Cell::new();
        for t in ["{% for x in xs %}", "- {{ x }}", "{% endfor %}"] {
            cell.add_element(Paragraph::from_texts([t]));
        }
        let mut row = Row::new();
        row.add_cell(cell);
        row.add_cell(Cell::with_paragraph(Paragraph::from_texts(["side"])));
        let mut table = Table::new();
        table.add_row(row);
        let mut c = Container::body();
        c.add_table(table);
        c
    }

    fn first_cell(c: &Container) -> &Cell {
        &c.elements()[0].as_table().unwrap().rows()[0].cells()[0]
    }

    #[test]
    fn test_paragraph_loop_inside_cell() {
        let mut c = cell_loop();
        expand_first(&mut c, &data(r#"{"xs": ["a", "b"]}"#)).unwrap();
        let texts: Vec<_> = first_cell(&c).elements().iter().map(DocumentElement::text).collect();
        assert_eq!(texts, ["- {{ xs[0] }}", "- {{ xs[1] }}"]);

        let mut c = cell_loop();
        expand_first(&mut c, &data(r#"{"xs": []}"#)).unwrap();
        assert_eq!(first_cell(&c).paragraph_count(), 1);
        assert_eq!(c.text(), "\tside");
    }

    /// One loop over `xs` in the given scope: runs, paragraphs, or a table row.
    fn scoped_loop(scope: u8) -> Container {
        let mut c = Container::body();
        match scope {
            0 => c.add_paragraph(Paragraph::from_texts(["{% for x in xs %}", "{{ x }}", "{% endfor %}"])),
            1 => {
                for t in ["head", "{% for x in xs %}", "{{ x }}", "{% endfor %}", "tail"] {
                    c.add_paragraph(Paragraph::from_texts([t]));
                }
            },
            _ => {
                let mut table = Table::new();
                table.add_row(Row::from_texts(["head"]));
                table.add_row(Row::from_texts(["{% for x in xs %}{{ x }}", "{% endfor %}"]));
                c.add_table(table);
            },
        }
        c
    }

    proptest! {
        #[test]
        fn prop_one_copy_per_item(scope in 0u8..3, n in 0usize..6) {
            let mut c = scoped_loop(scope);
            let items: Vec<i64> = (0..n as i64).collect();
            let data: Value = [("xs", Value::from(items))].into_iter().collect();

            prop_assert_eq!(expand_first(&mut c, &data).unwrap(), n);
            let left = placeholders(&c);
            prop_assert_eq!(left.len(), n);
            prop_assert!(left.iter().all(|p| p.starts_with("{{ xs")));
            match scope {
                0 => prop_assert_eq!(c.elements().len(), 1),
                1 => prop_assert_eq!(c.elements().len(), 2 + n),
                _ => prop_assert_eq!(c.elements()[0].as_table().unwrap().row_count(), 1 + n),
            }
        }
    }
}
