//! Document element types for representing ordered content.

use super::{Paragraph, Table};
use crate::error::Result;

/// A block-level element of a container or table cell.
///
/// Elements keep the natural order in which they appear in the document,
/// which the template engine relies on when it walks markers in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentElement {
    /// A paragraph element
    Paragraph(Paragraph),
    /// A table element (boxed to keep the enum small)
    Table(Box<Table>),
    /// Any other element (e.g. `w:sectPr`), kept verbatim
    Raw(String),
}

impl DocumentElement {
    /// Check if this element is a paragraph.
    #[inline]
    pub fn is_paragraph(&self) -> bool {
        matches!(self, DocumentElement::Paragraph(_))
    }

    /// Check if this element is a table.
    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, DocumentElement::Table(_))
    }

    /// Get a reference to the paragraph, if this is a paragraph element.
    #[inline]
    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            DocumentElement::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Get a mutable reference to the paragraph, if this is a paragraph element.
    #[inline]
    pub fn as_paragraph_mut(&mut self) -> Option<&mut Paragraph> {
        match self {
            DocumentElement::Paragraph(p) => Some(p),
            _ => None,
        }
    }

    /// Get a reference to the table, if this is a table element.
    #[inline]
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            DocumentElement::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Get a mutable reference to the table, if this is a table element.
    #[inline]
    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            DocumentElement::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Plain text of the element. Raw elements contribute nothing.
    pub fn text(&self) -> String {
        match self {
            DocumentElement::Paragraph(p) => p.text(),
            DocumentElement::Table(t) => t.text(),
            DocumentElement::Raw(_) => String::new(),
        }
    }
}

impl From<Paragraph> for DocumentElement {
    fn from(p: Paragraph) -> Self {
        DocumentElement::Paragraph(p)
    }
}

impl From<Table> for DocumentElement {
    fn from(t: Table) -> Self {
        DocumentElement::Table(Box::new(t))
    }
}

/// Visit every paragraph of an element list in document order, descending into tables.
pub(crate) fn visit_paragraphs_mut(
    elements: &mut [DocumentElement],
    f: &mut dyn FnMut(&mut Paragraph) -> Result<()>,
) -> Result<()> {
    for element in elements {
        match element {
            DocumentElement::Paragraph(p) => f(p)?,
            DocumentElement::Table(t) => {
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        visit_paragraphs_mut(&mut cell.elements, f)?;
                    }
                }
            },
            DocumentElement::Raw(_) => {},
        }
    }
    Ok(())
}
