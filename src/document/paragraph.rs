/// Paragraph and run types for the template document tree.
///
/// Character offsets are counted in `char`s, never bytes, so that positions
/// computed by the placeholder scanner stay valid for any script.

/// Position of one character inside a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextPos {
    /// Index of the run within its paragraph
    pub run: usize,
    /// Character offset within the run's text
    pub offset: usize,
}

impl TextPos {
    #[inline]
    pub const fn new(run: usize, offset: usize) -> Self {
        Self { run, offset }
    }
}

/// Run content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RunContent {
    /// Plain text
    Text(String),
    /// Tab character
    Tab,
    /// Line break
    Break,
    /// Any other run child (drawing, field char, ...), kept verbatim
    Raw(String),
    /// A paragraph child that is not a run (bookmark, hyperlink, ...), kept verbatim
    Foreign(String),
}

/// A run: a span of uniformly formatted content.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Raw `w:rPr` children, if the run has properties
    pub(crate) properties: Option<String>,
    /// Run content
    pub(crate) content: RunContent,
}

impl Run {
    /// Create a text run without properties.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            properties: None,
            content: RunContent::Text(text.into()),
        }
    }

    /// Create a run from arbitrary content.
    pub fn from_content(content: RunContent) -> Self {
        Self {
            properties: None,
            content,
        }
    }

    /// Attach raw run properties (the children of `w:rPr`).
    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    /// Raw run properties.
    #[inline]
    pub fn properties(&self) -> Option<&str> {
        self.properties.as_deref()
    }

    #[inline]
    pub fn content(&self) -> &RunContent {
        &self.content
    }

    /// Text of a text run; `None` for tabs, breaks and raw content.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            RunContent::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Set the text content, turning the run into a text run.
    pub fn set_text(&mut self, text: &str) {
        self.content = RunContent::Text(text.to_string());
    }

    fn plain_text(&self, out: &mut String) {
        match &self.content {
            RunContent::Text(s) => out.push_str(s),
            RunContent::Tab => out.push('\t'),
            RunContent::Break => out.push('\n'),
            RunContent::Raw(_) | RunContent::Foreign(_) => {},
        }
    }
}

/// Byte offset of the `n`th character, or the string length past the end.
#[inline]
pub(crate) fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// A paragraph: an ordered sequence of runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    /// Raw `w:pPr` children, if the paragraph has properties
    pub(crate) properties: Option<String>,
    /// Runs in this paragraph
    pub(crate) runs: Vec<Run>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a paragraph with one text run per item.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: None,
            runs: texts.into_iter().map(Run::new).collect(),
        }
    }

    /// Attach raw paragraph properties (the children of `w:pPr`).
    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    #[inline]
    pub fn properties(&self) -> Option<&str> {
        self.properties.as_deref()
    }

    /// Add a run to the paragraph.
    pub fn add_run(&mut self, run: Run) -> &mut Run {
        self.runs.push(run);
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }

    /// Add a run with text.
    pub fn add_run_with_text(&mut self, text: &str) -> &mut Run {
        self.add_run(Run::new(text))
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    #[inline]
    pub fn runs_mut(&mut self) -> &mut Vec<Run> {
        &mut self.runs
    }

    #[inline]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Plain text of the paragraph. Tabs and breaks render as `\t` and `\n`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            run.plain_text(&mut out);
        }
        out
    }

    /// Whether the paragraph's visible text is whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }

    /// Remove every run, keeping the paragraph properties.
    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Split the text run at `run` so that character `at` starts a new run.
    ///
    /// The new run copies the properties of the original one. Returns `false`
    /// (and changes nothing) when `at` falls on either edge of the run or the
    /// run is not a text run.
    pub fn split_run(&mut self, run: usize, at: usize) -> bool {
        let Some(r) = self.runs.get_mut(run) else {
            return false;
        };
        let RunContent::Text(text) = &mut r.content else {
            return false;
        };
        if at == 0 || at >= text.chars().count() {
            return false;
        }
        let tail = text.split_off(byte_offset(text, at));
        let properties = r.properties.clone();
        self.runs.insert(
            run + 1,
            Run {
                properties,
                content: RunContent::Text(tail),
            },
        );
        true
    }

    /// Split runs so that the inclusive span `start..=end` covers whole runs.
    ///
    /// Returns the first and last run index of the span after splitting.
    pub fn isolate(&mut self, start: TextPos, end: TextPos) -> (usize, usize) {
        self.split_run(end.run, end.offset + 1);
        if self.split_run(start.run, start.offset) {
            (start.run + 1, end.run + 1)
        } else {
            (start.run, end.run)
        }
    }

    /// Replace the inclusive character span `start..=end` with `replacement`.
    ///
    /// The replacement lands in the start run; the remainder of the span is
    /// removed from the following runs. Runs are never added or removed, so
    /// unrelated run boundaries stay put.
    pub fn replace_span(&mut self, start: TextPos, end: TextPos, replacement: &str) {
        for index in start.run..=end.run {
            let Some(RunContent::Text(text)) = self.runs.get_mut(index).map(|r| &mut r.content) else {
                continue;
            };
            let len = text.chars().count();
            let from = if index == start.run { start.offset.min(len) } else { 0 };
            let to = if index == end.run { (end.offset + 1).min(len) } else { len };
            let repl = if index == start.run { replacement } else { "" };
            if from > to {
                continue;
            }
            let range = byte_offset(text, from)..byte_offset(text, to);
            text.replace_range(range, repl);
        }
    }

    /// Empty the text of every text run in `first..=last`.
    pub fn clear_runs(&mut self, first: usize, last: usize) {
        for run in self.runs.iter_mut().take(last + 1).skip(first) {
            if let RunContent::Text(text) = &mut run.content {
                text.clear();
            }
        }
    }

    /// Split the paragraph before run `at`.
    ///
    /// `self` keeps runs `..at`; the returned paragraph receives runs `at..`
    /// and a copy of the paragraph properties.
    pub fn split_off(&mut self, at: usize) -> Paragraph {
        let at = at.min(self.runs.len());
        Paragraph {
            properties: self.properties.clone(),
            runs: self.runs.split_off(at),
        }
    }
}
