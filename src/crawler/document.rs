//! Structured document queries over fetched HTML
//!
//! A thin layer over `scraper` giving the crawler tiers three queries:
//! every element matching a selector, the text of a selector, and an
//! attribute of a selector. A selector that matches nothing yields an empty
//! string or `None`; it is never an error.

use scraper::{ElementRef, Html, Selector};

/// Parses a selector, logging and discarding invalid ones
fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(selector, error = ?e, "invalid CSS selector");
            None
        }
    }
}

/// Joins the text nodes of an element
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// A parsed HTML page
///
/// `Html` is not `Send`, so a `Document` is built, queried and dropped
/// between awaits.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document
    ///
    /// # Example
    ///
    /// ```
    /// use geo_harvest::crawler::Document;
    ///
    /// let doc = Document::parse(r#"<div id="content"><a href="/state/FR">France</a></div>"#);
    /// assert_eq!(doc.text("#content a"), "France");
    /// assert_eq!(doc.attr("#content a", "href"), Some("/state/FR".to_string()));
    /// ```
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// Returns every element matching `selector`, in document order
    pub fn find_all(&self, selector: &str) -> Vec<Element<'_>> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };
        self.html.select(&selector).map(Element).collect()
    }

    /// Returns the first element matching `selector`
    pub fn find_first(&self, selector: &str) -> Option<Element<'_>> {
        let selector = parse_selector(selector)?;
        self.html.select(&selector).next().map(Element)
    }

    /// Concatenated, trimmed text of all matches; empty if nothing matches
    pub fn text(&self, selector: &str) -> String {
        let Some(selector) = parse_selector(selector) else {
            return String::new();
        };
        self.html
            .select(&selector)
            .map(element_text)
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// The attribute of the first match that carries it
    pub fn attr(&self, selector: &str, name: &str) -> Option<String> {
        let selector = parse_selector(selector)?;
        self.html
            .select(&selector)
            .find_map(|element| element.value().attr(name))
            .map(str::to_string)
    }
}

/// An element of a [`Document`], supporting queries scoped to its subtree
#[derive(Clone, Copy)]
pub struct Element<'a>(ElementRef<'a>);

impl<'a> Element<'a> {
    /// Elements below this one matching `selector`
    pub fn find_all(&self, selector: &str) -> Vec<Element<'a>> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };
        self.0.select(&selector).map(Element).collect()
    }

    /// Concatenated, trimmed text of matches below this element
    pub fn text(&self, selector: &str) -> String {
        let Some(selector) = parse_selector(selector) else {
            return String::new();
        };
        self.0
            .select(&selector)
            .map(element_text)
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Attribute of the first match below this element that carries it
    pub fn child_attr(&self, selector: &str, name: &str) -> Option<String> {
        let selector = parse_selector(selector)?;
        self.0
            .select(&selector)
            .find_map(|element| element.value().attr(name))
            .map(str::to_string)
    }

    /// Attribute of this element itself
    pub fn attr(&self, name: &str) -> Option<String> {
        self.0.value().attr(name).map(str::to_string)
    }
}
