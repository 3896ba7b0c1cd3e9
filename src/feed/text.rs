/// Character data collected between element events.
///
/// Fragments are concatenated verbatim, without trimming or whitespace
/// normalization. The parser clears the buffer at every start element and
/// after every end element, so only the direct text of the element that is
/// closing is visible. Text of mixed-content elements that precedes a child
/// element is lost; embedded markup is never captured.
#[derive(Debug, Default)]
pub struct TextAccumulator {
    buf: String,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) {
        self.buf.push_str(fragment);
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Returns the accumulated text and leaves the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }
}
