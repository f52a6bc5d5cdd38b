//! Minimal node capability over parsed HTML
//!
//! Extraction code only needs three things from the DOM: descendants matching
//! a CSS selector, trimmed text, and attribute values. [`HtmlNode`] captures
//! exactly that, so field extraction does not depend on the parsing library
//! and can be exercised against fixture markup.

use scraper::{ElementRef, Html, Selector};

/// The DOM operations the extractors rely on
pub trait HtmlNode: Sized {
    /// All descendants matching `selector`, in document order
    ///
    /// An unparseable selector matches nothing.
    fn find(&self, selector: &str) -> Vec<Self>;

    /// First descendant matching `selector`
    fn find_first(&self, selector: &str) -> Option<Self> {
        self.find(selector).into_iter().next()
    }

    /// Concatenated text content, trimmed
    fn inner_text(&self) -> String;

    /// Value of attribute `name`
    fn attribute(&self, name: &str) -> Option<String>;
}

impl<'a> HtmlNode for ElementRef<'a> {
    fn find(&self, selector: &str) -> Vec<Self> {
        match Selector::parse(selector) {
            Ok(selector) => self.select(&selector).collect(),
            Err(e) => {
                tracing::debug!("Invalid selector '{}': {:?}", selector, e);
                Vec::new()
            }
        }
    }

    fn inner_text(&self) -> String {
        self.text().collect::<String>().trim().to_string()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }
}

/// A parsed HTML page
pub struct Page {
    document: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Parses a fragment such as a single course block
    pub fn parse_fragment(html: &str) -> Self {
        Self {
            document: Html::parse_fragment(html),
        }
    }

    /// Root element from which selectors are evaluated
    pub fn root(&self) -> ElementRef<'_> {
        self.document.root_element()
    }
}
