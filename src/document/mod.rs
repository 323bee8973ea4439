/// In-memory WordprocessingML document tree.
///
/// This module provides the mutable tree the template engine rewrites:
/// - `Document`: the main body plus header and footer containers
/// - `Container`: a text-bearing region owning an ordered element list
/// - `Paragraph` / `Run`: text with formatting kept as raw property XML
/// - `Table` / `Row` / `Cell`: tables, whose cells own their own element lists
///
/// Paragraphs are addressed with a `ParagraphPath` relative to their container,
/// because any rewrite of the tree invalidates previously computed positions and
/// the engine rescans after each one.
///
/// # Example
///
/// ```rust
/// use litchi_template::document::{Container, Paragraph};
///
/// let mut body = Container::body();
/// body.add_paragraph(Paragraph::from_texts(["Hello, ", "{{ name }}"]));
///
/// for (path, para) in body.paragraphs() {
///     println!("{:?}: {}", path, para.text());
/// }
/// ```
pub mod element;
pub mod paragraph;
pub mod table;
#[cfg(feature = "xml")]
pub mod xml;

pub use element::DocumentElement;
pub use paragraph::{Paragraph, Run, RunContent, TextPos};
pub use table::{Cell, Row, Table};

use smallvec::SmallVec;

/// One step from an element list into a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellStep {
    /// Index of the table in the enclosing element list
    pub element: usize,
    /// Row index within the table
    pub row: usize,
    /// Cell index within the row
    pub cell: usize,
}

/// Location of a paragraph relative to its container.
///
/// `cells` leads from the container root to the element list owning the
/// paragraph (empty for top-level paragraphs); `index` is the paragraph's
/// position in that list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ParagraphPath {
    pub cells: SmallVec<[CellStep; 2]>,
    pub index: usize,
}

impl ParagraphPath {
    /// Path of a top-level paragraph.
    pub fn top_level(index: usize) -> Self {
        Self {
            cells: SmallVec::new(),
            index,
        }
    }

    /// Steps identifying the parent element list.
    #[inline]
    pub fn parent(&self) -> &[CellStep] {
        &self.cells
    }

    /// The innermost cell owning this paragraph, if any.
    #[inline]
    pub fn cell(&self) -> Option<&CellStep> {
        self.cells.last()
    }

    /// Whether both paths live in the same element list.
    #[inline]
    pub fn is_sibling_of(&self, other: &ParagraphPath) -> bool {
        self.cells == other.cells
    }
}

/// Kind of text-bearing region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Body,
    Header,
    Footer,
}

/// A text-bearing region: main body, header or footer.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub(crate) kind: ContainerKind,
    pub(crate) elements: Vec<DocumentElement>,
}

impl Container {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            elements: Vec::new(),
        }
    }

    #[inline]
    pub fn body() -> Self {
        Self::new(ContainerKind::Body)
    }

    #[inline]
    pub fn header() -> Self {
        Self::new(ContainerKind::Header)
    }

    #[inline]
    pub fn footer() -> Self {
        Self::new(ContainerKind::Footer)
    }

    #[inline]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Add a paragraph at the end of the container.
    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.elements.push(DocumentElement::Paragraph(paragraph));
    }

    /// Add a table at the end of the container.
    pub fn add_table(&mut self, table: Table) {
        self.elements.push(DocumentElement::Table(Box::new(table)));
    }

    #[inline]
    pub fn elements(&self) -> &[DocumentElement] {
        &self.elements
    }

    #[inline]
    pub fn elements_mut(&mut self) -> &mut Vec<DocumentElement> {
        &mut self.elements
    }

    /// Plain text, one line per top-level element.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .filter(|e| !matches!(e, DocumentElement::Raw(_)))
            .map(DocumentElement::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All paragraphs in document order, including those inside table cells.
    pub fn paragraphs(&self) -> Vec<(ParagraphPath, &Paragraph)> {
        let mut out = Vec::new();
        collect_paragraphs(&self.elements, &mut SmallVec::new(), &mut out);
        out
    }

    /// Element list reached by following `cells` from the container root.
    pub fn element_list(&self, cells: &[CellStep]) -> Option<&Vec<DocumentElement>> {
        let mut list = &self.elements;
        for step in cells {
            let table = list.get(step.element)?.as_table()?;
            list = &table.rows.get(step.row)?.cells.get(step.cell)?.elements;
        }
        Some(list)
    }

    /// Mutable element list reached by following `cells` from the container root.
    pub fn element_list_mut(&mut self, cells: &[CellStep]) -> Option<&mut Vec<DocumentElement>> {
        let mut list = &mut self.elements;
        for step in cells {
            let table = list.get_mut(step.element)?.as_table_mut()?;
            list = &mut table.rows.get_mut(step.row)?.cells.get_mut(step.cell)?.elements;
        }
        Some(list)
    }

    pub fn paragraph(&self, path: &ParagraphPath) -> Option<&Paragraph> {
        self.element_list(&path.cells)?.get(path.index)?.as_paragraph()
    }

    pub fn paragraph_mut(&mut self, path: &ParagraphPath) -> Option<&mut Paragraph> {
        self.element_list_mut(&path.cells)?
            .get_mut(path.index)?
            .as_paragraph_mut()
    }

    /// The cell owning the paragraph at `path`, if it lives in a table.
    pub fn owning_cell(&self, path: &ParagraphPath) -> Option<&Cell> {
        let (step, outer) = path.cells.split_last()?;
        let table = self.element_list(outer)?.get(step.element)?.as_table()?;
        table.rows.get(step.row)?.cells.get(step.cell)
    }

    /// The table holding the innermost cell of `path`.
    pub fn enclosing_table_mut(&mut self, path: &ParagraphPath) -> Option<&mut Table> {
        let (step, outer) = path.cells.split_last()?;
        self.element_list_mut(outer)?
            .get_mut(step.element)?
            .as_table_mut()
    }
}

fn collect_paragraphs<'a>(
    elements: &'a [DocumentElement],
    cells: &mut SmallVec<[CellStep; 2]>,
    out: &mut Vec<(ParagraphPath, &'a Paragraph)>,
) {
    for (index, element) in elements.iter().enumerate() {
        match element {
            DocumentElement::Paragraph(p) => out.push((
                ParagraphPath {
                    cells: cells.clone(),
                    index,
                },
                p,
            )),
            DocumentElement::Table(t) => {
                for (row_idx, row) in t.rows.iter().enumerate() {
                    for (cell_idx, cell) in row.cells.iter().enumerate() {
                        cells.push(CellStep {
                            element: index,
                            row: row_idx,
                            cell: cell_idx,
                        });
                        collect_paragraphs(&cell.elements, cells, out);
                        cells.pop();
                    }
                }
            },
            DocumentElement::Raw(_) => {},
        }
    }
}

/// A document: main body plus header and footer containers.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) body: Container,
    pub(crate) headers: Vec<Container>,
    pub(crate) footers: Vec<Container>,
}

impl Document {
    pub fn new(body: Container) -> Self {
        Self {
            body,
            headers: Vec::new(),
            footers: Vec::new(),
        }
    }

    pub fn add_header(&mut self, header: Container) {
        self.headers.push(header);
    }

    pub fn add_footer(&mut self, footer: Container) {
        self.footers.push(footer);
    }

    #[inline]
    pub fn body(&self) -> &Container {
        &self.body
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut Container {
        &mut self.body
    }

    #[inline]
    pub fn headers(&self) -> &[Container] {
        &self.headers
    }

    #[inline]
    pub fn footers(&self) -> &[Container] {
        &self.footers
    }

    pub fn headers_mut(&mut self) -> &mut [Container] {
        &mut self.headers
    }

    pub fn footers_mut(&mut self) -> &mut [Container] {
        &mut self.footers
    }

    /// Plain text of the main body.
    pub fn text(&self) -> String {
        self.body.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Container {
        let mut body = Container::body();
        body.add_paragraph(Paragraph::from_texts(["intro"]));
        let mut table = Table::new();
        table.add_row(Row::from_texts(["a", "b"]));
        body.add_table(table);
        body.add_paragraph(Paragraph::from_texts(["outro"]));
        body
    }

    #[test]
    fn test_paragraphs_in_document_order() {
        let body = sample();
        let texts: Vec<_> = body.paragraphs().iter().map(|(_, p)| p.text()).collect();
        assert_eq!(texts, ["intro", "a", "b", "outro"]);

        let paths: Vec<_> = body.paragraphs().into_iter().map(|(path, _)| path).collect();
        assert!(paths[0].cell().is_none());
        assert_eq!(
            paths[2].cell(),
            Some(&CellStep {
                element: 1,
                row: 0,
                cell: 1
            })
        );
        assert_eq!(paths[3], ParagraphPath::top_level(2));
    }

    #[test]
    fn test_navigate_by_path() {
        let mut body = sample();
        let path = body.paragraphs()[1].0.clone();
        assert_eq!(body.owning_cell(&path).map(Cell::paragraph_count), Some(1));
        if let Some(p) = body.paragraph_mut(&path) {
            p.runs_mut()[0].set_text("z");
        }
        assert_eq!(body.text(), "intro\nz\tb\noutro");
        assert_eq!(body.enclosing_table_mut(&path).map(|t| t.row_count()), Some(1));
    }
}
