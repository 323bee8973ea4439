//! WordprocessingML fragment reader and writer.
//!
//! Reads the children of `w:body`, `w:hdr` or `w:ftr` into a [`Container`] and
//! writes them back. Only the structure the template engine rewrites is
//! modelled; property elements and anything unknown travel as raw XML.

use super::{Cell, Container, ContainerKind, DocumentElement, Paragraph, Row, Run, RunContent, Table};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use std::fmt::Write as FmtWrite;

/// Escape XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Xml(format!("Invalid UTF-8: {e}")))
}

struct FragmentReader<'a> {
    xml: &'a str,
    reader: Reader<&'a [u8]>,
}

impl<'a> FragmentReader<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            xml,
            reader: Reader::from_str(xml),
        }
    }

    /// Raw inner XML of the element opened by `start`, consuming it.
    fn inner(&mut self, start: &BytesStart<'_>) -> Result<String> {
        let span = self.reader.read_to_end(start.name())?;
        self.xml
            .get(span.start as usize..span.end as usize)
            .map(str::to_string)
            .ok_or_else(|| Error::Xml("Element span out of range".to_string()))
    }

    /// The complete element opened by `start`, re-serialized verbatim.
    fn capture(&mut self, start: &BytesStart<'_>) -> Result<String> {
        let tag = utf8(start)?.to_string();
        let name = utf8(start.name().as_ref())?.to_string();
        let inner = self.inner(start)?;
        Ok(format!("<{tag}>{inner}</{name}>"))
    }

    fn read_root(&mut self) -> Result<Vec<DocumentElement>> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"document" => {},
                    b"body" | b"hdr" | b"ftr" => {
                        return Ok(self.read_elements(None)?.0);
                    },
                    other => {
                        return Err(Error::Xml(format!(
                            "Unexpected root element: {}",
                            String::from_utf8_lossy(other)
                        )));
                    },
                },
                Event::Empty(e) if matches!(e.local_name().as_ref(), b"body" | b"hdr" | b"ftr") => {
                    return Ok(Vec::new());
                },
                Event::Eof => return Err(Error::Xml("Missing body element".to_string())),
                _ => {},
            }
        }
    }

    /// Read block-level children until the enclosing element closes.
    ///
    /// When `props` names a property element (e.g. `tcPr`), its inner XML is
    /// returned separately.
    fn read_elements(&mut self, props: Option<&[u8]>) -> Result<(Vec<DocumentElement>, Option<String>)> {
        let mut elements = Vec::new();
        let mut properties = None;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    let local = e.local_name();
                    match local.as_ref() {
                        b"p" => elements.push(DocumentElement::Paragraph(self.read_paragraph()?)),
                        b"tbl" => elements.push(DocumentElement::Table(Box::new(self.read_table()?))),
                        name if Some(name) == props => properties = Some(self.inner(&e)?),
                        _ => elements.push(DocumentElement::Raw(self.capture(&e)?)),
                    }
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"p" => elements.push(DocumentElement::Paragraph(Paragraph::new())),
                    name if Some(name) == props => properties = Some(String::new()),
                    _ => elements.push(DocumentElement::Raw(format!("<{}/>", utf8(&e)?))),
                },
                Event::End(_) => return Ok((elements, properties)),
                Event::Eof => return Err(Error::Xml("Unexpected end of document".to_string())),
                _ => {},
            }
        }
    }

    fn read_paragraph(&mut self) -> Result<Paragraph> {
        let mut paragraph = Paragraph::new();
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"pPr" => paragraph.properties = Some(self.inner(&e)?),
                    b"r" => paragraph.runs.extend(self.read_run()?),
                    _ => {
                        let xml = self.capture(&e)?;
                        paragraph.runs.push(Run::from_content(RunContent::Foreign(xml)));
                    },
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"pPr" => paragraph.properties = Some(String::new()),
                    b"r" => {},
                    _ => {
                        let xml = format!("<{}/>", utf8(&e)?);
                        paragraph.runs.push(Run::from_content(RunContent::Foreign(xml)));
                    },
                },
                Event::End(_) => return Ok(paragraph),
                Event::Eof => return Err(Error::Xml("Unterminated paragraph".to_string())),
                _ => {},
            }
        }
    }

    /// Read one `w:r`; each content child becomes its own run sharing the properties.
    fn read_run(&mut self) -> Result<Vec<Run>> {
        let mut properties = None;
        let mut contents = Vec::new();
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"rPr" => properties = Some(self.inner(&e)?),
                    b"t" => contents.push(RunContent::Text(self.read_text()?)),
                    b"tab" => {
                        self.inner(&e)?;
                        contents.push(RunContent::Tab);
                    },
                    b"br" | b"cr" => {
                        self.inner(&e)?;
                        contents.push(RunContent::Break);
                    },
                    _ => contents.push(RunContent::Raw(self.capture(&e)?)),
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"rPr" => properties = Some(String::new()),
                    b"t" => contents.push(RunContent::Text(String::new())),
                    b"tab" => contents.push(RunContent::Tab),
                    b"br" | b"cr" => contents.push(RunContent::Break),
                    _ => contents.push(RunContent::Raw(format!("<{}/>", utf8(&e)?))),
                },
                Event::End(_) => break,
                Event::Eof => return Err(Error::Xml("Unterminated run".to_string())),
                _ => {},
            }
        }
        Ok(contents
            .into_iter()
            .map(|content| Run {
                properties: properties.clone(),
                content,
            })
            .collect())
    }

    /// Decoded character data up to the closing `w:t`.
    fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(e) => text.push_str(utf8(e.as_ref())?),
                Event::CData(e) => text.push_str(utf8(e.as_ref())?),
                Event::GeneralRef(e) => {
                    let entity = format!("&{};", utf8(e.as_ref())?);
                    let decoded = unescape(&entity).map_err(|err| Error::Xml(err.to_string()))?;
                    text.push_str(&decoded);
                },
                Event::End(_) => return Ok(text),
                Event::Eof => return Err(Error::Xml("Unterminated text".to_string())),
                _ => {},
            }
        }
    }

    fn read_table(&mut self) -> Result<Table> {
        let mut table = Table::new();
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"tblPr" => table.properties = Some(self.inner(&e)?),
                    b"tblGrid" => table.grid = Some(self.inner(&e)?),
                    b"tr" => table.rows.push(self.read_row()?),
                    _ => {
                        let raw = self.capture(&e)?;
                        if table.properties.is_none() && table.grid.is_none() && table.rows.is_empty() {
                            table.leading.push(raw);
                        } else {
                            table.extras.push((table.rows.len(), raw));
                        }
                    },
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"tblPr" => table.properties = Some(String::new()),
                    b"tblGrid" => table.grid = Some(String::new()),
                    b"tr" => table.rows.push(Row::new()),
                    _ => {
                        let raw = format!("<{}/>", utf8(&e)?);
                        if table.properties.is_none() && table.grid.is_none() && table.rows.is_empty() {
                            table.leading.push(raw);
                        } else {
                            table.extras.push((table.rows.len(), raw));
                        }
                    },
                },
                Event::End(_) => return Ok(table),
                Event::Eof => return Err(Error::Xml("Unterminated table".to_string())),
                _ => {},
            }
        }
    }

    fn read_row(&mut self) -> Result<Row> {
        let mut row = Row::new();
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"trPr" => row.properties = Some(self.inner(&e)?),
                    b"tc" => {
                        let (elements, properties) = self.read_elements(Some(b"tcPr".as_slice()))?;
                        row.cells.push(Cell { properties, elements });
                    },
                    _ => {
                        let raw = self.capture(&e)?;
                        if row.properties.is_none() && row.cells.is_empty() {
                            row.leading.push(raw);
                        } else {
                            row.extras.push((row.cells.len(), raw));
                        }
                    },
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"trPr" => row.properties = Some(String::new()),
                    b"tc" => row.cells.push(Cell::with_paragraph(Paragraph::new())),
                    _ => {
                        let raw = format!("<{}/>", utf8(&e)?);
                        if row.properties.is_none() && row.cells.is_empty() {
                            row.leading.push(raw);
                        } else {
                            row.extras.push((row.cells.len(), raw));
                        }
                    },
                },
                Event::End(_) => return Ok(row),
                Event::Eof => return Err(Error::Xml("Unterminated row".to_string())),
                _ => {},
            }
        }
    }
}

impl Container {
    /// Parse the children of a `w:body`, `w:hdr` or `w:ftr` element.
    ///
    /// The fragment may be a complete `document.xml`, in which case the
    /// `w:body` inside `w:document` is read.
    pub fn from_xml(kind: ContainerKind, xml: &str) -> Result<Self> {
        let elements = FragmentReader::new(xml).read_root()?;
        Ok(Self { kind, elements })
    }

    /// Serialize the container's children as WordprocessingML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        write_elements(&self.elements, &mut xml);
        xml
    }
}

fn write_elements(elements: &[DocumentElement], xml: &mut String) {
    for element in elements {
        match element {
            DocumentElement::Paragraph(p) => write_paragraph(p, xml),
            DocumentElement::Table(t) => write_table(t, xml),
            DocumentElement::Raw(raw) => xml.push_str(raw),
        }
    }
}

fn write_props(tag: &str, props: Option<&str>, xml: &mut String) {
    if let Some(props) = props {
        let _ = write!(xml, "<w:{tag}>{props}</w:{tag}>");
    }
}

fn write_paragraph(paragraph: &Paragraph, xml: &mut String) {
    xml.push_str("<w:p>");
    write_props("pPr", paragraph.properties(), xml);
    for run in paragraph.runs() {
        if let RunContent::Foreign(raw) = run.content() {
            xml.push_str(raw);
            continue;
        }
        xml.push_str("<w:r>");
        write_props("rPr", run.properties(), xml);
        match run.content() {
            RunContent::Text(text) => {
                let _ = write!(xml, "<w:t xml:space=\"preserve\">{}</w:t>", escape_xml(text));
            },
            RunContent::Tab => xml.push_str("<w:tab/>"),
            RunContent::Break => xml.push_str("<w:br/>"),
            RunContent::Raw(raw) => xml.push_str(raw),
            RunContent::Foreign(_) => {},
        }
        xml.push_str("</w:r>");
    }
    xml.push_str("</w:p>");
}

/// Raw elements keyed at `at`; the last slot also takes anything past it.
fn write_extras(extras: &[(usize, String)], at: usize, last: bool, xml: &mut String) {
    for (_, raw) in extras.iter().filter(|(pos, _)| *pos == at || (last && *pos > at)) {
        xml.push_str(raw);
    }
}

fn write_table(table: &Table, xml: &mut String) {
    xml.push_str("<w:tbl>");
    table.leading.iter().for_each(|raw| xml.push_str(raw));
    write_props("tblPr", table.properties.as_deref(), xml);
    write_props("tblGrid", table.grid.as_deref(), xml);
    for (idx, row) in table.rows.iter().enumerate() {
        write_extras(&table.extras, idx, false, xml);
        write_row(row, xml);
    }
    write_extras(&table.extras, table.rows.len(), true, xml);
    xml.push_str("</w:tbl>");
}

fn write_row(row: &Row, xml: &mut String) {
    xml.push_str("<w:tr>");
    row.leading.iter().for_each(|raw| xml.push_str(raw));
    write_props("trPr", row.properties.as_deref(), xml);
    for (idx, cell) in row.cells.iter().enumerate() {
        write_extras(&row.extras, idx, false, xml);
        xml.push_str("<w:tc>");
        write_props("tcPr", cell.properties.as_deref(), xml);
        write_elements(&cell.elements, xml);
        xml.push_str("</w:tc>");
    }
    write_extras(&row.extras, row.cells.len(), true, xml);
    xml.push_str("</w:tr>");
}
