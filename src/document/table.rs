//! Table types for the template document tree.
use super::element::DocumentElement;
use super::paragraph::Paragraph;

/// A table: an ordered sequence of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Raw elements preceding `w:tblPr`
    pub(crate) leading: Vec<String>,
    /// Raw `w:tblPr` children
    pub(crate) properties: Option<String>,
    /// Raw `w:tblGrid` children
    pub(crate) grid: Option<String>,
    /// Table rows
    pub(crate) rows: Vec<Row>,
    /// Raw elements among the rows, keyed by the index of the row they precede
    pub(crate) extras: Vec<(usize, String)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: Row) -> &mut Row {
        self.rows.push(row);
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a row by index.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Plain text: one line per row, cells separated by tabs.
    pub fn text(&self) -> String {
        self.rows.iter().map(Row::text).collect::<Vec<_>>().join("\n")
    }

    /// Replace the row at `index` with `rows` (possibly none).
    ///
    /// Raw elements after the replaced row keep their place relative to the
    /// rows that follow it.
    pub(crate) fn replace_row(&mut self, index: usize, rows: Vec<Row>) {
        let added = rows.len();
        self.rows.splice(index..=index, rows);
        for (pos, _) in &mut self.extras {
            if *pos > index {
                *pos = *pos + added - 1;
            }
        }
    }
}

/// A table row: an ordered sequence of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Raw elements preceding `w:trPr`, such as `w:tblPrEx`
    pub(crate) leading: Vec<String>,
    /// Raw `w:trPr` children
    pub(crate) properties: Option<String>,
    /// Cells in this row
    pub(crate) cells: Vec<Cell>,
    /// Raw elements among the cells, keyed by the index of the cell they precede
    pub(crate) extras: Vec<(usize, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row with one single-paragraph cell per text.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: texts
                .into_iter()
                .map(|t| Cell::with_paragraph(Paragraph::from_texts([t])))
                .collect(),
            ..Self::default()
        }
    }

    /// Add a cell to the row.
    pub fn add_cell(&mut self, cell: Cell) -> &mut Cell {
        self.cells.push(cell);
        let last = self.cells.len() - 1;
        &mut self.cells[last]
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Get a cell by index.
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn text(&self) -> String {
        self.cells.iter().map(Cell::text).collect::<Vec<_>>().join("\t")
    }
}

/// A table cell. A well-formed cell always holds at least one paragraph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    /// Raw `w:tcPr` children
    pub(crate) properties: Option<String>,
    /// Paragraphs and nested tables
    pub(crate) elements: Vec<DocumentElement>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cell holding a single paragraph.
    pub fn with_paragraph(paragraph: Paragraph) -> Self {
        Self {
            properties: None,
            elements: vec![DocumentElement::Paragraph(paragraph)],
        }
    }

    /// Add a paragraph or nested table.
    pub fn add_element(&mut self, element: impl Into<DocumentElement>) {
        self.elements.push(element.into());
    }

    #[inline]
    pub fn elements(&self) -> &[DocumentElement] {
        &self.elements
    }

    /// Number of direct paragraph children.
    pub fn paragraph_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_paragraph()).count()
    }

    /// Plain text, paragraphs separated by newlines.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .map(DocumentElement::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_row_shifts_trailing_extras() {
        let mut table = Table::new();
        for t in ["a", "b", "c"] {
            table.add_row(Row::from_texts([t]));
        }
        table.extras = vec![(1, "<before-b/>".into()), (2, "<before-c/>".into()), (3, "<end/>".into())];

        table.replace_row(1, vec![Row::from_texts(["b1"]), Row::from_texts(["b2"])]);
        assert_eq!(table.text(), "a\nb1\nb2\nc");
        assert_eq!(table.extras.iter().map(|(p, _)| *p).collect::<Vec<_>>(), [1, 3, 4]);

        table.replace_row(0, Vec::new());
        assert_eq!(table.text(), "b1\nb2\nc");
        assert_eq!(table.extras.iter().map(|(p, _)| *p).collect::<Vec<_>>(), [0, 2, 3]);
    }
}
