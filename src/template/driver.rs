//! Render driver.
//!
//! Each container goes through three passes: loops to a fixed point, then
//! conditionals to a fixed point, then one value pass. Every dispatch rewrites
//! the tree, so spans are rescanned from scratch after each one.

use super::block::{Block, BlockKind, resolve_block};
use super::conditional::reduce_conditional;
use super::config::RenderOptions;
use super::directive::Directive;
use super::expression::{BasicEvaluator, Evaluator, ExpressionBridge};
use super::loops::expand_loop;
use super::scanner::scan_container;
use super::value::{FieldPath, Value};
use crate::document::{Container, Document};
use crate::error::{Error, Result};
use tracing::{debug, warn};

/// Template renderer.
///
/// # Examples
///
/// ```rust
/// use litchi_template::{Container, Paragraph, Renderer, Value};
///
/// let mut body = Container::body();
/// body.add_paragraph(Paragraph::from_texts(["{% for x in xs %}", "{{ x }};", "{% endfor %}"]));
///
/// let data: Value = [("xs", Value::from(vec![1i64, 2, 3]))].into_iter().collect();
/// Renderer::default().render_container(&mut body, &data).unwrap();
/// assert_eq!(body.text(), "1;2;3;");
/// ```
#[derive(Debug, Clone)]
pub struct Renderer<E = BasicEvaluator> {
    evaluator: E,
    options: RenderOptions,
}

impl Default for Renderer<BasicEvaluator> {
    fn default() -> Self {
        Self::new(BasicEvaluator)
    }
}

impl<E: Evaluator> Renderer<E> {
    /// Create a renderer that evaluates conditions with `evaluator`.
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            options: RenderOptions::default(),
        }
    }

    #[inline]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the body, then headers and footers as configured.
    pub fn render(&self, document: &mut Document, data: &Value) -> Result<()> {
        self.render_container(document.body_mut(), data)?;
        if self.options.headers {
            for header in document.headers_mut() {
                self.render_container(header, data)?;
            }
        }
        if self.options.footers {
            for footer in document.footers_mut() {
                self.render_container(footer, data)?;
            }
        }
        Ok(())
    }

    /// Render a single container.
    pub fn render_container(&self, container: &mut Container, data: &Value) -> Result<()> {
        let bridge = ExpressionBridge::new(&self.evaluator, data);
        while let Some(block) = next_block(container, BlockKind::Loop)? {
            let count = expand_loop(container, &block, data).map_err(|e| wrap(e, &block))?;
            debug!(start = %block.start.raw_text, scope = ?block.scope, count, "expanded loop");
        }
        while let Some(block) = next_block(container, BlockKind::Conditional)? {
            let keep = reduce_conditional(container, &block, &bridge).map_err(|e| wrap(e, &block))?;
            debug!(start = %block.start.raw_text, scope = ?block.scope, keep, "reduced conditional");
        }
        if self.options.values {
            substitute_values(container, data, &self.options.missing_value)?;
        }
        Ok(())
    }
}

fn wrap(err: Error, block: &Block) -> Error {
    err.in_block(&block.start.raw_text, &block.end.raw_text)
}

/// First unresolved start marker of `kind` in document order, resolved.
fn next_block(container: &Container, kind: BlockKind) -> Result<Option<Block>> {
    let spans = scan_container(container)?;
    let Some(start) = spans.iter().position(|s| kind.is_start(&s.directive())) else {
        return Ok(None);
    };
    resolve_block(&spans, start, kind).map(Some)
}

/// Replace every `{{ field_path }}` marker with the field's display text.
fn substitute_values(container: &mut Container, data: &Value, missing: &str) -> Result<()> {
    let spans = scan_container(container)?;
    for span in spans.iter().rev() {
        let Directive::Value(text) = span.directive() else {
            warn!(marker = %span.raw_text, "leaving unresolved block marker in place");
            continue;
        };
        let path = match FieldPath::parse(text) {
            Ok(path) => path,
            Err(err) => {
                warn!(marker = %span.raw_text, %err, "skipping value marker");
                continue;
            },
        };
        let replacement = data.lookup(&path).map_or_else(|| missing.to_string(), |v| v.display(missing));
        if let Some(paragraph) = container.paragraph_mut(&span.path) {
            paragraph.replace_span(span.start, span.end, &replacement);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Cell, Paragraph, Row, Table};

    fn data(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    fn paragraph_body(runs: &[&str]) -> Container {
        let mut c = Container::body();
        c.add_paragraph(Paragraph::from_texts(runs.iter().copied()));
        c
    }

    fn render(container: &mut Container, json: &str) -> Result<()> {
        Renderer::default().render_container(container, &data(json))
    }

    #[test]
    fn test_inline_loop_renders_values() {
        let mut c = paragraph_body(&["{% for x in items %}", "{{x.name}} ", "{% endfor %}"]);
        render(&mut c, r#"{"items": [{"name": "a"}, {"name": "b"}]}"#).unwrap();
        assert_eq!(c.text(), "a b ");
    }

    #[test]
    fn test_empty_loop_leaves_no_text() {
        let mut c = paragraph_body(&["{% for x in items %}", "{{x.name}} ", "{% endfor %}"]);
        render(&mut c, r#"{"items": []}"#).unwrap();
        assert_eq!(c.text(), "");
    }

    #[test]
    fn test_inline_conditional() {
        for (json, expected) in [(r#"{"a": true}"#, "shown"), (r#"{"a": false}"#, ""), (r#"{"a": ""}"#, "")] {
            let mut c = paragraph_body(&["{% if a %}", "shown", "{% endif %}"]);
            render(&mut c, json).unwrap();
            assert_eq!(c.text(), expected, "{json}");
        }
    }

    #[test]
    fn test_row_loop_with_three_items() {
        let mut table = Table::new();
        table.add_row(Row::from_texts(["{% for r in rows %}{{ r.name }}", "{{ r.qty }}{% endfor %}"]));
        let mut c = Container::body();
        c.add_table(table);

        render(
            &mut c,
            r#"{"rows": [{"name": "nut", "qty": 4}, {"name": "bolt", "qty": 2.5}, {"name": "gear", "qty": "1"}]}"#,
        )
        .unwrap();
        assert_eq!(c.text(), "nut\t4\nbolt\t2.5\ngear\t1");
        assert!(!c.text().contains('{'));
    }

    #[test]
    fn test_missing_endfor_names_start_marker() {
        let mut c = Container::body();
        c.add_paragraph(Paragraph::from_texts(["{% for x in items %}"]));
        c.add_paragraph(Paragraph::from_texts(["{{ x }}"]));
        let err = render(&mut c, r#"{"items": [1]}"#).unwrap_err();
        assert!(matches!(&err, Error::BlockMatch(m) if m.contains("{% for x in items %}")), "{err}");
    }

    #[test]
    fn test_scope_error_leaves_tree_unmutated() {
        let mut table = Table::new();
        table.add_row(Row::from_texts(["{% for x in items %}{{ x }}", "cell"]));
        let mut c = Container::body();
        c.add_table(table);
        c.add_paragraph(Paragraph::from_texts(["{% endfor %}"]));
        let before = c.clone();

        let err = render(&mut c, r#"{"items": [1, 2]}"#).unwrap_err();
        assert!(matches!(&err, Error::Scope(m) if m.starts_with("Error in {% for x in items %}..{% endfor %}")));
        assert_eq!(c, before);
    }

    #[test]
    fn test_nested_blocks() {
        let mut c = Container::body();
        for t in [
            "{% for g in groups %}",
            "{{ g.name }}:{% for m in g.members %} {{ m }}{% endfor %}",
            "{% if g.lead %}lead {{ g.lead }}{% endif %}",
            "{% endfor %}",
        ] {
            c.add_paragraph(Paragraph::from_texts([t]));
        }
        render(
            &mut c,
            r#"{"groups": [{"name": "A", "members": ["x", "y"], "lead": "x"}, {"name": "B", "members": ["z"]}]}"#,
        )
        .unwrap();
        assert_eq!(c.text(), "A: x y\nlead x\nB: z");
    }

    #[test]
    fn test_inner_loop_rebinding_outer_variable() {
        let mut c = paragraph_body(&["{% for x in groups %}{% for x in x.items %}{{ x }};{% endfor %}|{% endfor %}"]);
        render(&mut c, r#"{"groups": [{"items": ["a", "b"]}, {"items": ["c"]}]}"#).unwrap();
        assert_eq!(c.text(), "a;b;|c;|");
    }

    #[test]
    fn test_conditional_inside_cell_keeps_paragraph() {
        let mut table = Table::new();
        table.add_row(Row::from_texts(["{% if paid %}PAID{% endif %}", "total"]));
        let mut c = Container::body();
        c.add_table(table);
        render(&mut c, r#"{"paid": "no"}"#).unwrap();
        assert_eq!(c.text(), "PAID\ttotal");

        let mut table = Table::new();
        table.add_row(Row::from_texts(["{% if paid == no %}DUE{% endif %}", "total"]));
        let mut c = Container::body();
        c.add_table(table);
        render(&mut c, r#"{"paid": "yes"}"#).unwrap();
        let cell: &Cell = &c.elements()[0].as_table().unwrap().rows()[0].cells()[0];
        assert_eq!(cell.paragraph_count(), 1);
        assert_eq!(c.text(), "\ttotal");
    }

    #[test]
    fn test_value_pass_options() {
        let mut c = paragraph_body(&["{{ name }} / {{ missing }} / {{ bad path! }}"]);
        Renderer::default()
            .with_options(RenderOptions::new().with_missing_value("n/a"))
            .render_container(&mut c, &data(r#"{"name": "Ann"}"#))
            .unwrap();
        assert_eq!(c.text(), "Ann / n/a / {{ bad path! }}");

        let mut c = paragraph_body(&["{% if on %}{{ name }}{% endif %}"]);
        Renderer::default()
            .with_options(RenderOptions::new().with_values(false))
            .render_container(&mut c, &data(r#"{"on": 1, "name": "Ann"}"#))
            .unwrap();
        assert_eq!(c.text(), "{{ name }}");
    }

    #[test]
    fn test_render_document_containers() {
        let mut document = Document::new(paragraph_body(&["{{ title }}"]));
        let mut header = Container::header();
        header.add_paragraph(Paragraph::from_texts(["{% if draft %}DRAFT{% endif %}"]));
        document.add_header(header);
        let mut footer = Container::footer();
        footer.add_paragraph(Paragraph::from_texts(["{{ title }}"]));
        document.add_footer(footer);

        Renderer::default()
            .with_options(RenderOptions::new().with_footers(false))
            .render(&mut document, &data(r#"{"title": "Report", "draft": true}"#))
            .unwrap();
        assert_eq!(document.body().text(), "Report");
        assert_eq!(document.headers()[0].text(), "DRAFT");
        assert_eq!(document.footers()[0].text(), "{{ title }}");
    }

    struct Always(bool);

    impl Evaluator for Always {
        fn evaluate(&self, _expression: &str, _context: &Value) -> Result<Value> {
            Ok(Value::Bool(self.0))
        }
    }

    #[test]
    fn test_custom_evaluator() {
        let mut c = paragraph_body(&["{% if anything at all %}kept{% endif %}"]);
        Renderer::new(Always(true)).render_container(&mut c, &Value::Null).unwrap();
        assert_eq!(c.text(), "kept");
    }
}
