//! Output path → page mapping.

use super::page::Page;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The pages of a site keyed by output path.
///
/// Iteration is in path order. Inserting an existing path replaces the
/// previous page.
#[derive(Debug, Clone, Default)]
pub struct Sitemap {
    pages: BTreeMap<String, Page>,
}

impl Sitemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, page: Page) -> Option<Page> {
        self.pages.insert(page.path().to_owned(), page)
    }

    pub fn get(&self, path: &str) -> Option<&Page> {
        self.pages.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.pages.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Paths of digest pages, then of every other page.
    ///
    /// This is the build order: every digest page must be built before any
    /// page that may reference it.
    pub fn build_order(&self) -> (Vec<String>, Vec<String>) {
        let (digest, plain): (Vec<&Page>, Vec<&Page>) = self.iter().partition(|p| p.is_digest());
        let paths = |pages: Vec<&Page>| -> Vec<String> {
            pages.into_iter().map(|p| p.path().to_owned()).collect()
        };
        (paths(digest), paths(plain))
    }

    /// Every page as seen by templates, keyed by path.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.pages
                .iter()
                .map(|(path, page)| (path.clone(), page.to_value()))
                .collect::<Map<String, Value>>(),
        )
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut sitemap = Sitemap::new();
        sitemap.insert(Page::template("index.html", "a.html"));
        let previous = sitemap.insert(Page::template("index.html", "b.html"));

        assert!(previous.is_some());
        assert_eq!(sitemap.len(), 1);
        assert_eq!(
            sitemap.get("index.html").unwrap().attrs().get_str("template"),
            Some("b.html")
        );
    }

    #[test]
    fn test_build_order_puts_digest_pages_first() {
        let mut sitemap = Sitemap::new();
        sitemap.insert(Page::template("about/index.html", "about.html"));
        sitemap.insert(Page::file("css/site.css", "prebuild/css/site.css").with_digest(true));
        sitemap.insert(Page::template("index.html", "index.html"));
        sitemap.insert(Page::file("logo.png", "prebuild/logo.png").with_digest(true));

        let (digest, plain) = sitemap.build_order();
        assert_eq!(digest, vec!["css/site.css", "logo.png"]);
        assert_eq!(plain, vec!["about/index.html", "index.html"]);
    }
}
