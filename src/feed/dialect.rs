use std::fmt;

/// Syndication format of a document, fixed by its root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// No start element seen yet.
    #[default]
    Unknown,
    Rss,
    Atom,
    /// Root element is neither `rss` nor `feed`; nothing is extracted.
    Unrecognized,
}

impl Dialect {
    /// Classifies a document from the name of its root element.
    pub fn from_root(name: &str) -> Self {
        match name {
            "feed" => Dialect::Atom,
            "rss" => Dialect::Rss,
            _ => Dialect::Unrecognized,
        }
    }

    /// Sets the dialect on the first start element; later calls are ignored.
    ///
    /// Returns `true` if this call fixed the dialect.
    pub fn detect(&mut self, name: &str) -> bool {
        if *self != Dialect::Unknown {
            return false;
        }
        *self = Self::from_root(name);
        true
    }

    pub fn is_extractable(self) -> bool {
        matches!(self, Dialect::Rss | Dialect::Atom)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Unknown => "unknown",
            Dialect::Rss => "rss",
            Dialect::Atom => "atom",
            Dialect::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}
