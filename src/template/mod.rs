//! Template expansion over the document tree.
//!
//! Directives are written inline in the document text, possibly split across
//! any number of formatting runs:
//!
//! - `{{ field.path }}` substitutes a value
//! - `{% for item in items %}` … `{% endfor %}` repeats its body per item
//! - `{% if expression %}` … `{% endif %}` keeps or drops its body
//!
//! A block's markers can share a paragraph, sit in sibling paragraphs, or sit
//! in different cells of one table row; the [`Scope`] of a block decides
//! whether runs, paragraphs or the whole row are repeated or removed.
//!
//! # Architecture
//!
//! - [`scanner`]: finds placeholders across run boundaries
//! - [`block`]: pairs start/end markers and classifies their scope
//! - [`loops`] / [`conditional`]: the per-scope rewriting strategies
//! - [`expression`]: condition syntax and the [`Evaluator`] seam
//! - [`driver`]: the [`Renderer`] that runs all passes to completion
//!
//! # Example
//!
//! ```rust
//! use litchi_template::{Container, Paragraph, Renderer, Value};
//!
//! let mut body = Container::body();
//! body.add_paragraph(Paragraph::from_texts(["Dear {{ name }},"]));
//! body.add_paragraph(Paragraph::from_texts(["{% if vip %}"]));
//! body.add_paragraph(Paragraph::from_texts(["Thanks for staying with us."]));
//! body.add_paragraph(Paragraph::from_texts(["{% endif %}"]));
//!
//! let data: Value = [("name", Value::from("Ann")), ("vip", Value::from(false))].into_iter().collect();
//! Renderer::default().render_container(&mut body, &data).unwrap();
//! assert_eq!(body.text(), "Dear Ann,");
//! ```

pub mod block;
pub mod conditional;
pub mod config;
pub mod directive;
pub mod driver;
pub mod expression;
pub mod loops;
pub(crate) mod region;
pub mod scanner;
pub mod value;

pub use block::{Block, BlockKind, Scope};
pub use config::RenderOptions;
pub use directive::Directive;
pub use driver::Renderer;
pub use expression::{BasicEvaluator, Evaluator, ExpressionBridge};
pub use loops::LoopContext;
pub use scanner::PlaceholderSpan;
pub use value::{FieldPath, PathSegment, Value};
