//! What the crawler needs from a fetched page.
//!
//! A path is a CSS selector with an optional suffix naming what to read from
//! the matched element:
//!
//! - `::text` the element's own text nodes, without descendants
//! - `::attr(name)` the value of attribute `name`
//! - no suffix: all text inside the element
//!
//! Implementations return raw strings; callers trim.

/// Read access to a document or to one element of it.
pub trait Selection {
    /// Value of the first element matching `path`.
    fn query_one(&self, path: &str) -> Option<String>;

    /// Values of every element matching `path`, in document order.
    fn query_all(&self, path: &str) -> Vec<String>;

    /// Elements matching the selector `path` (no suffix), each usable as a
    /// scope for relative queries.
    fn select_scopes(&self, path: &str) -> Vec<Box<dyn Selection + '_>>;
}

/// A fetched document.
pub trait Page: Selection {
    /// Final URL of the response, after redirects.
    fn url(&self) -> &str;

    /// Resolves a link found on this page to an absolute URL.
    fn resolve(&self, reference: &str) -> Option<String>;
}

/// `query_one`, trimmed, with blank values treated as absent.
pub fn query_text(selection: &(impl Selection + ?Sized), path: &str) -> Option<String> {
    selection
        .query_one(path)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
