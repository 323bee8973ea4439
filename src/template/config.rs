/// Configuration options for rendering a template.
///
/// # Examples
///
/// ```rust
/// use litchi_template::RenderOptions;
///
/// // Render everything with defaults
/// let options = RenderOptions::default();
///
/// // Or customize
/// let options = RenderOptions::new()
///     .with_footers(false)
///     .with_missing_value("N/A");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether header containers are rendered
    pub headers: bool,
    /// Whether footer containers are rendered
    pub footers: bool,
    /// Whether `{{ field }}` markers are substituted after the block passes
    pub values: bool,
    /// Text substituted for absent or null fields
    pub missing_value: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            headers: true,
            footers: true,
            values: true,
            missing_value: String::new(),
        }
    }
}

impl RenderOptions {
    /// Create a new `RenderOptions` with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether headers are rendered.
    #[inline]
    pub fn with_headers(mut self, render: bool) -> Self {
        self.headers = render;
        self
    }

    /// Set whether footers are rendered.
    #[inline]
    pub fn with_footers(mut self, render: bool) -> Self {
        self.footers = render;
        self
    }

    /// Set whether value markers are substituted.
    ///
    /// When disabled, only loops and conditionals are processed and every
    /// `{{ field }}` marker is left in place, rewritten to address loop items.
    #[inline]
    pub fn with_values(mut self, substitute: bool) -> Self {
        self.values = substitute;
        self
    }

    /// Set the text used for fields that are absent or null.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use litchi_template::RenderOptions;
    ///
    /// let options = RenderOptions::new().with_missing_value("-");
    /// assert_eq!(options.missing_value, "-");
    /// ```
    #[inline]
    pub fn with_missing_value(mut self, text: impl Into<String>) -> Self {
        self.missing_value = text.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::new();
        assert!(options.headers && options.footers && options.values);
        assert!(options.missing_value.is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let options = RenderOptions::new()
            .with_headers(false)
            .with_values(false)
            .with_missing_value(String::from("?"));
        assert!(!options.headers);
        assert!(options.footers);
        assert!(!options.values);
        assert_eq!(options.missing_value, "?");
    }
}
