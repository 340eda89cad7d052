//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── index_prebuilt()
//!     │       │
//!     │       └── prebuild/** → digest pages (file source)
//!     │
//!     ├── phase 1: every page with `digest = true`
//!     │       │
//!     │       └── render → sha1 → record digest_path → build/<base>-<sha1><ext>
//!     │
//!     └── phase 2: every other page
//!             │
//!             └── render (asset_path sees phase 1 digests) → build/<path>
//! ```
//!
//! Building is sequential. Phase 1 must finish before any phase 2 page renders,
//! since a page may reference digest assets by their digested name.

use crate::{
    bindings::Bindings,
    digest,
    log,
    logger::ProgressBars,
    site::{Layout, PREBUILT_DIR, Page, PageSource, Site},
    template::TemplateContext,
    utils::fs::{collect_all_files, join_url_path, relative_url_path, write_file},
};
use anyhow::{Context, Result, anyhow};
use std::{fs, path::PathBuf};

/// Files written by one build, phase by phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Outputs of digest pages, in build order.
    pub digest: Vec<PathBuf>,
    /// Outputs of every other page, in build order.
    pub pages: Vec<PathBuf>,
}

impl BuildReport {
    /// Every written file, in build order.
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.digest.iter().chain(&self.pages)
    }

    pub fn len(&self) -> usize {
        self.digest.len() + self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build every sitemap page into `build/`.
///
/// Pass-through assets are indexed first. Any failure aborts the build.
pub fn build_site(site: &mut Site, silent: bool) -> Result<BuildReport> {
    let indexed = index_prebuilt(site);
    if !silent && indexed > 0 {
        log!("build"; "indexed {indexed} prebuilt assets");
    }

    let site: &Site = site;
    let (digest_paths, page_paths) = site.sitemap().build_order();

    let progress = if silent {
        None
    } else {
        ProgressBars::new_filtered(&[("digest", digest_paths.len()), ("pages", page_paths.len())])
    };
    let inc = |name: &str| {
        if let Some(progress) = &progress {
            progress.inc_by_name(name);
        }
    };

    let mut report = BuildReport::default();

    // ========================================================================
    // Digest pages
    // ========================================================================
    for path in &digest_paths {
        report.digest.push(build_page(site, path)?);
        inc("digest");
    }

    // ========================================================================
    // Remaining pages
    // ========================================================================
    for path in &page_paths {
        report.pages.push(build_page(site, path)?);
        inc("pages");
    }

    if let Some(progress) = &progress {
        progress.finish();
    }
    if !silent {
        log!("build"; "wrote {} files to {}", report.len(), site.build_dir().display());
    }

    Ok(report)
}

/// Register every file under `prebuild/` as a digest page.
///
/// Files whose name starts with `_` (partials) or `.`, files without an
/// extension, and anything inside a hidden directory are skipped. Returns the
/// number of pages registered.
pub fn index_prebuilt(site: &mut Site) -> usize {
    let dir = site.prebuild_dir();
    let mut count = 0;

    for file in collect_all_files(&dir) {
        let Some(rel) = relative_url_path(&file, &dir) else {
            continue;
        };
        if !is_indexable(&rel) {
            continue;
        }
        let source = format!("{PREBUILT_DIR}/{rel}");
        site.insert_page(Page::file(rel, source).with_digest(true));
        count += 1;
    }

    count
}

fn is_indexable(rel: &str) -> bool {
    let (dirs, name) = rel.rsplit_once('/').unwrap_or(("", rel));
    let hidden_dir = dirs.split('/').any(|segment| segment.starts_with('.'));
    !hidden_dir && !name.starts_with(['_', '.']) && name.contains('.')
}

/// Build the sitemap page at `path` and write it under `build/`.
///
/// Digest pages are written under their digested name, which is recorded on
/// the page. Returns the written file.
pub fn build_page(site: &Site, path: &str) -> Result<PathBuf> {
    let page = site
        .sitemap()
        .get(path)
        .ok_or_else(|| anyhow!("no page at '{path}' in the sitemap"))?;
    let content = render_page(site, page)?;

    let out_path = if page.is_digest() {
        let digest_path = digest::digest_path(page.path(), &content);
        page.record_digest_path(digest_path.clone())?;
        digest_path
    } else {
        page.path().to_owned()
    };

    let out = join_url_path(&site.build_dir(), &out_path);
    write_file(&out, &content)?;
    Ok(out)
}

/// Produce the bytes of `page` without writing anything.
///
/// Template pages are wrapped in the page layout, or the site layout when the
/// page declares none.
pub fn render_page(site: &Site, page: &Page) -> Result<Vec<u8>> {
    let content = match page.source() {
        PageSource::Template(template) => {
            let ctx = TemplateContext::for_page(site, page);
            let layout = match page.layout() {
                Layout::Inherit => site.config().layout(),
                Layout::Disabled => None,
                Layout::Template(layout) => Some(layout.as_str()),
            };
            let content = match layout {
                Some(layout) => ctx.render_wrapped(layout, |ctx| {
                    ctx.render(template, Bindings::new())
                })?,
                None => ctx.render(template, Bindings::new())?,
            };
            content.into_bytes()
        }
        PageSource::Json(value) => serde_json::to_vec(value)?,
        PageSource::File(file) => {
            let path = site.resolve_path(file);
            fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?
        }
    };
    Ok(content)
}
