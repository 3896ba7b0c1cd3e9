/// Current element path of a streaming XML parse.
///
/// Stored as a stack of element names; the rendered form is the full path
/// from the document root, e.g. `/rss/channel/item/pubDate`. Names are kept
/// verbatim (qualified names such as `dc:creator` are not resolved).
#[derive(Debug, Default, Clone)]
pub struct PathTracker {
    segments: Vec<String>,
    rendered: String,
}

impl PathTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `/name` to the current path.
    pub fn push(&mut self, name: &str) {
        self.segments.push(name.to_string());
        self.rendered.push('/');
        self.rendered.push_str(name);
    }

    /// Removes the trailing `/name` segment.
    ///
    /// Returns `true` when the close was balanced. On a mismatch the document
    /// is structurally inconsistent: a warning is logged and the path is
    /// recovered best effort. If `name` is open deeper in the stack, every
    /// element above it is treated as implicitly closed; otherwise the path is
    /// left unchanged.
    pub fn pop(&mut self, name: &str) -> bool {
        if self.segments.last().map(String::as_str) == Some(name) {
            self.segments.pop();
            self.truncate_rendered();
            return true;
        }

        tracing::warn!(
            path = %self.rendered,
            element = %name,
            "Mismatched closing element, recovering"
        );

        if let Some(index) = self.segments.iter().rposition(|s| s == name) {
            self.segments.truncate(index);
            self.rebuild();
        }
        false
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Innermost open element.
    pub fn top(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether `name` is open anywhere in the path.
    pub fn contains(&self, name: &str) -> bool {
        self.segments.iter().any(|s| s == name)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn truncate_rendered(&mut self) {
        // The popped segment is always the tail of `rendered`.
        let cut = self.rendered.rfind('/').unwrap_or(0);
        self.rendered.truncate(cut);
    }

    fn rebuild(&mut self) {
        self.rendered.clear();
        for segment in &self.segments {
            self.rendered.push('/');
            self.rendered.push_str(segment);
        }
    }
}
