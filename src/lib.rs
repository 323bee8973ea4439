//! Litchi Template - template expansion for WordprocessingML documents
//!
//! This library fills Word document templates in place: loops repeat runs,
//! paragraphs or table rows per data item, conditionals keep or drop their
//! body, and field markers are replaced with values. Directive text may be
//! split across formatting runs in any way a word processor chooses.
//!
//! # Features
//!
//! - **Run-agnostic scanning**: `{{ a.b }}` is found even when typed across five runs
//! - **Nested blocks**: loops and conditionals nest to any depth
//! - **Structural scopes**: inline runs, sibling paragraphs, and table rows
//! - **Pluggable conditions**: bring your own [`Evaluator`] or use [`BasicEvaluator`]
//! - **Format preservation**: run and paragraph properties are carried verbatim
//!
//! # Example - Rendering a fragment
//!
//! ```
//! # #[cfg(feature = "xml")]
//! # fn main() -> Result<(), litchi_template::Error> {
//! use litchi_template::{Container, ContainerKind, Renderer, Value};
//!
//! let xml = r#"<w:body xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
//!   <w:p><w:r><w:t>Hello {{ cust</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>omer }}!</w:t></w:r></w:p>
//! </w:body>"#;
//! let mut body = Container::from_xml(ContainerKind::Body, xml)?;
//!
//! let data: Value = [("customer", "Ann")].into_iter().collect();
//! Renderer::default().render_container(&mut body, &data)?;
//! assert_eq!(body.text(), "Hello Ann!");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "xml"))]
//! # fn main() {}
//! ```
//!
//! # Example - Custom conditions
//!
//! ```
//! use litchi_template::{Evaluator, Renderer, Result, Value};
//!
//! struct AlwaysTrue;
//!
//! impl Evaluator for AlwaysTrue {
//!     fn evaluate(&self, _expression: &str, _context: &Value) -> Result<Value> {
//!         Ok(Value::Bool(true))
//!     }
//! }
//!
//! let renderer = Renderer::new(AlwaysTrue);
//! ```

/// In-memory document tree
///
/// Containers, paragraphs, runs and tables, plus the WordprocessingML
/// fragment reader and writer behind the `xml` feature.
pub mod document;

/// Error types
pub mod error;

/// Template scanning, block matching and rendering
pub mod template;

pub use document::{
    Cell, CellStep, Container, ContainerKind, Document, DocumentElement, Paragraph, ParagraphPath, Row, Run,
    RunContent, Table, TextPos,
};
pub use error::{Error, Result};
pub use template::{BasicEvaluator, Evaluator, FieldPath, RenderOptions, Renderer, Scope, Value};
