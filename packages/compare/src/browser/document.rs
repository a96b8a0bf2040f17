//! Static HTML document with CSS-selector lookups.
//!
//! Backs the non-JavaScript browser backends. Element handles are child-index
//! paths from the document root, so a lookup scoped to an element still sees
//! the full ancestry when matching descendant combinators.

use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use url::Url;

use crate::browser::ElementHandle;
use crate::error::{BrowserError, BrowserResult};

/// Parsed-on-demand HTML document.
///
/// Holds the markup as shared text (`scraper::Html` is not `Send`) and parses
/// it for each lookup. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Document {
    html: Arc<str>,
    base_url: Option<Url>,
}

impl Document {
    pub fn new(html: impl Into<String>, base_url: Option<Url>) -> Self {
        Self {
            html: Arc::from(html.into()),
            base_url,
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// First element in document order matching `selector`.
    pub fn select_first(&self, selector: &str) -> BrowserResult<Option<ElementHandle>> {
        let selector = parse_selector(selector)?;
        let html = Html::parse_document(&self.html);
        let found = html.select(&selector).next().map(handle_for);
        Ok(found)
    }

    /// First strict descendant of `scope` matching `selector`.
    pub fn select_first_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Option<ElementHandle>> {
        let selector = parse_selector(selector)?;
        let html = Html::parse_document(&self.html);
        let scope_el = resolve(&html, scope)?;
        let found = scope_el
            .select(&selector)
            .find(|el| el.id() != scope_el.id())
            .map(handle_for);
        Ok(found)
    }

    /// Text content with runs of whitespace collapsed.
    pub fn text(&self, element: &ElementHandle) -> BrowserResult<String> {
        let html = Html::parse_document(&self.html);
        let el = resolve(&html, element)?;
        Ok(collapse_whitespace(&el.text().collect::<String>()))
    }

    /// Browser-style property read.
    ///
    /// `href` and `src` resolve against the document URL like the DOM
    /// properties do; anything else falls back to the attribute.
    pub fn property(&self, element: &ElementHandle, name: &str) -> BrowserResult<Option<String>> {
        let html = Html::parse_document(&self.html);
        let el = resolve(&html, element)?;

        let value = match name {
            "innerText" | "textContent" => {
                Some(collapse_whitespace(&el.text().collect::<String>()))
            }
            "outerHTML" => Some(el.html()),
            "href" | "src" => el.value().attr(name).map(|raw| self.resolve_url(raw)),
            _ => el.value().attr(name).map(str::to_string),
        };

        Ok(value)
    }

    fn resolve_url(&self, raw: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(raw)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }
}

fn parse_selector(selector: &str) -> BrowserResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| BrowserError::InvalidSelector(format!("{selector}: {e:?}")))
}

fn handle_for(el: ElementRef<'_>) -> ElementHandle {
    let mut indices = Vec::new();
    let mut node = *el;
    while let Some(parent) = node.parent() {
        let index = parent
            .children()
            .position(|child| child.id() == node.id())
            .unwrap_or(0);
        indices.push(index.to_string());
        node = parent;
    }
    indices.reverse();
    ElementHandle::new(indices.join("/"))
}

fn resolve<'a>(html: &'a Html, handle: &ElementHandle) -> BrowserResult<ElementRef<'a>> {
    let stale = || BrowserError::StaleElement(handle.as_str().to_string());

    let mut node = html.tree.root();
    for part in handle.as_str().split('/').filter(|s| !s.is_empty()) {
        let index: usize = part.parse().map_err(|_| stale())?;
        node = node.children().nth(index).ok_or_else(stale)?;
    }
    ElementRef::wrap(node).ok_or_else(stale)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
