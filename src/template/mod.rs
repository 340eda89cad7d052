//! Per-render template context.
//!
//! A [`TemplateContext`] is created for one render entry point: one per page
//! during a build, one per request while serving. It carries the page being
//! produced, a stack of locals and a snapshot of the configuration, and wraps
//! the `tera` engine as a plain `render(template, locals) -> String`.
//!
//! # Name resolution
//!
//! Templates resolve names through an explicit [`ScopeChain`]:
//!
//! | Scope      | Contents                                 |
//! |------------|------------------------------------------|
//! | `builtins` | `page`, `data`, `config`, `sitemap`      |
//! | `locals`   | locals of the innermost `render` call    |
//! | `config`   | every configuration value, by key        |
//!
//! A name no scope binds is an error, never an empty value.
//!
//! # Template functions
//!
//! ```text
//! {{ asset_path(path="images/logo.png") }}
//! {{ canonical_url(segments=["about", "index.html"]) }}
//! {{ render(path="templates/_card.html", title="Hello") }}
//! {{ include_file(path="prebuild/icon.svg") }}
//! {% if is_production() %}...{% endif %}
//! ```

mod functions;
mod scope;

pub use scope::ScopeChain;

use crate::{
    bindings::Bindings,
    config::ConfigStore,
    error::ResolveError,
    site::{HelperFn, Page, Site, Sitemap},
    utils::mime::{essence, guess_content_type, is_image, is_text},
};
use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::{
    error::Error as StdError,
    fs,
    path::PathBuf,
    sync::{Arc, LazyLock},
};
use tera::Tera;

/// Local bound to the page body while a layout renders.
pub const CONTENT_KEY: &str = "content";

/// Render context for one page or one request.
///
/// Cloning is cheap and yields a handle on the same context.
#[derive(Clone)]
pub struct TemplateContext {
    state: Arc<ContextState>,
}

struct ContextState {
    root: PathBuf,
    config: ConfigStore,
    data: Value,
    sitemap: Arc<Sitemap>,
    page: Value,
    helpers: Vec<(String, HelperFn)>,
    locals: Mutex<Vec<Bindings>>,
}

impl TemplateContext {
    /// Context with no current page.
    pub fn new(site: &Site) -> Self {
        Self::build(site, Value::Null)
    }

    /// Context for rendering `page`.
    pub fn for_page(site: &Site, page: &Page) -> Self {
        Self::build(site, page.to_value())
    }

    fn build(site: &Site, page: Value) -> Self {
        Self {
            state: Arc::new(ContextState {
                root: site.root().to_path_buf(),
                config: site.config().clone(),
                data: site.data().to_value(),
                sitemap: site.shared_sitemap(),
                page,
                helpers: site.helper_registry().template_functions().to_vec(),
                locals: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.state.config
    }

    pub fn page(&self) -> &Value {
        &self.state.page
    }

    pub(crate) fn helpers(&self) -> &[(String, HelperFn)] {
        &self.state.helpers
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Render the template at `template` (relative to the project root) with
    /// `locals` as the innermost scope.
    ///
    /// Nested calls (partials rendered from inside a template) push their own
    /// locals; only the innermost locals are visible to a render.
    pub fn render(&self, template: &str, locals: Bindings) -> Result<String> {
        let path = self.state.root.join(template);
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;

        let _scope = LocalsGuard::push(&self.state.locals, locals);
        let context = tera::Context::from_value(self.scope_chain().flatten().to_value())
            .with_context(|| format!("Failed to build context for {template}"))?;

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        functions::register(&mut tera, self);

        tera.add_raw_template(template, &source)
            .map_err(|err| engine_error(template, err))?;
        tera.render(template, &context)
            .map_err(|err| engine_error(template, err))
    }

    /// Render `layout` around a body.
    ///
    /// The body is evaluated first, in its own scope, and its output is bound
    /// to the `content` local of the layout render.
    pub fn render_wrapped<F>(&self, layout: &str, body: F) -> Result<String>
    where
        F: FnOnce(&Self) -> Result<String>,
    {
        let content = body(self)?;
        let mut locals = Bindings::new();
        locals.insert(CONTENT_KEY, Value::String(content));
        self.render(layout, locals)
    }

    /// The scope chain as seen by a render started now.
    pub fn scope_chain(&self) -> ScopeChain {
        let locals = self.state.locals.lock().last().cloned().unwrap_or_default();
        ScopeChain::new()
            .push("builtins", self.builtins())
            .push("locals", locals)
            .push("config", self.state.config.bindings().clone())
    }

    /// Resolve `name` through the scope chain.
    pub fn resolve(&self, name: &str) -> Result<Value, ResolveError> {
        self.scope_chain().resolve(name).cloned()
    }

    fn builtins(&self) -> Bindings {
        let mut builtins = Bindings::new();
        builtins.insert("page", self.state.page.clone());
        builtins.insert("data", self.state.data.clone());
        builtins.insert("config", self.state.config.bindings().to_value());
        builtins.insert("sitemap", self.state.sitemap.to_value());
        builtins
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// URL of an asset.
    ///
    /// In production the joined path must be a sitemap page, and a digest
    /// page must already be built; its digested path is used. Otherwise the
    /// path is used as is.
    pub fn asset_path(&self, segments: &[&str]) -> Result<String, ResolveError> {
        let path = segments.join("/");
        let config = &self.state.config;

        let resolved = if config.is_production() {
            let page = self
                .state
                .sitemap
                .get(&path)
                .ok_or_else(|| ResolveError::UnknownAsset(path.clone()))?;
            if page.is_digest() {
                page.digest_path()
                    .ok_or_else(|| ResolveError::MissingDigest(path.clone()))?
                    .to_owned()
            } else {
                path
            }
        } else {
            path
        };

        Ok(format!("{}{resolved}", config.asset_http_prefix()))
    }

    /// Absolute URL of a page.
    pub fn canonical_url(&self, segments: &[&str]) -> String {
        format!("{}{}", self.state.config.http_prefix(), segments.join("/"))
    }

    /// Contents of a file for inlining: text as is, images base64-encoded.
    pub fn include_file(&self, file: &str) -> Result<String> {
        let path = self.state.root.join(file);
        let content_type = guess_content_type(&path);

        if is_text(content_type) {
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))
        } else if is_image(content_type) {
            let bytes =
                fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(STANDARD.encode(bytes))
        } else {
            Err(ResolveError::UnsupportedInclude(file.to_owned(), essence(content_type).to_owned()).into())
        }
    }
}

/// Pops the locals pushed by a render, on success and on error.
struct LocalsGuard<'a> {
    stack: &'a Mutex<Vec<Bindings>>,
}

impl<'a> LocalsGuard<'a> {
    fn push(stack: &'a Mutex<Vec<Bindings>>, locals: Bindings) -> Self {
        stack.lock().push(locals);
        Self { stack }
    }
}

impl Drop for LocalsGuard<'_> {
    fn drop(&mut self) {
        self.stack.lock().pop();
    }
}

// ============================================================================
// Engine errors
// ============================================================================

static RE_UNDEFINED_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Variable `([^`]+)` not found in context").unwrap());

/// Convert an engine failure, surfacing resolution errors as [`ResolveError`].
fn engine_error(template: &str, err: tera::Error) -> anyhow::Error {
    let err = match find_resolve_error(&err) {
        Some(resolve) => anyhow::Error::new(resolve),
        None => anyhow::Error::new(err),
    };
    err.context(format!("Failed to render {template}"))
}

fn find_resolve_error(err: &(dyn StdError + 'static)) -> Option<ResolveError> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(resolve) = err.downcast_ref::<ResolveError>() {
            return Some(resolve.clone());
        }
        if let Some(caps) = RE_UNDEFINED_VARIABLE.captures(&err.to_string()) {
            let name = caps[1].split(['.', '[']).next().unwrap_or_default();
            return Some(ResolveError::Unresolved(name.to_owned()));
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, Target};
    use crate::site::{HelperSet, HelperTarget};
    use serde_json::json;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let site = Site::new(dir.path());
        (dir, site)
    }

    fn locals(value: Value) -> Bindings {
        Bindings::from_value(value).unwrap()
    }

    #[test]
    fn test_locals_shadow_config() {
        let (_dir, mut site) = project(&[("t.html", "{{ title }}")]);
        site.set("title", "from config");
        let ctx = TemplateContext::new(&site);

        let out = ctx.render("t.html", locals(json!({"title": "from locals"}))).unwrap();
        assert_eq!(out, "from locals");

        let out = ctx.render("t.html", Bindings::new()).unwrap();
        assert_eq!(out, "from config");
    }

    #[test]
    fn test_unresolved_name_fails() {
        let (_dir, site) = project(&[("t.html", "Hello {{ nobody }}")]);
        let ctx = TemplateContext::new(&site);

        let err = ctx.render("t.html", Bindings::new()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ResolveError>(),
            Some(&ResolveError::Unresolved("nobody".into()))
        );
        assert_eq!(
            ctx.resolve("nobody"),
            Err(ResolveError::Unresolved("nobody".into()))
        );
    }

    #[test]
    fn test_page_and_data_builtins() {
        let (_dir, mut site) = project(&[(
            "t.html",
            "{{ page.title }} by {{ data.people[0].name }} at {{ page.path }}",
        )]);
        site.add_data("people", json!([{"name": "Ada"}]));
        let page = Page::from_attrs("index.html", json!({"template": "t.html", "title": "Home"}))
            .unwrap();
        let ctx = TemplateContext::for_page(&site, &page);

        let out = ctx.render("t.html", Bindings::new()).unwrap();
        assert_eq!(out, "Home by Ada at index.html");
    }

    #[test]
    fn test_partials_see_only_their_own_locals() {
        let (_dir, site) = project(&[
            (
                "outer.html",
                "[{{ name }}|{{ render(path=\"_inner.html\", label=\"in\") }}|{{ name }}]",
            ),
            ("_inner.html", "{{ label }}{% if name is defined %}!{% endif %}"),
        ]);
        let ctx = TemplateContext::new(&site);

        let out = ctx.render("outer.html", locals(json!({"name": "out"}))).unwrap();
        assert_eq!(out, "[out|in|out]");
        assert!(ctx.state.locals.lock().is_empty());
    }

    #[test]
    fn test_nested_unresolved_name_surfaces_typed_error() {
        let (_dir, site) = project(&[
            ("outer.html", "{{ render(path=\"_inner.html\") }}"),
            ("_inner.html", "{{ missing }}"),
        ]);
        let ctx = TemplateContext::new(&site);

        let err = ctx.render("outer.html", Bindings::new()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ResolveError>(),
            Some(&ResolveError::Unresolved("missing".into()))
        );
        assert!(ctx.state.locals.lock().is_empty());
    }

    #[test]
    fn test_render_wrapped_evaluates_body_first() {
        let (_dir, site) = project(&[
            ("layout.html", "<main>{{ content }}</main>"),
            ("page.html", "<h1>{{ title }}</h1>"),
        ]);
        let ctx = TemplateContext::new(&site);

        let out = ctx
            .render_wrapped("layout.html", |ctx| {
                ctx.render("page.html", locals(json!({"title": "Hi"})))
            })
            .unwrap();
        assert_eq!(out, "<main><h1>Hi</h1></main>");
    }

    #[test]
    fn test_no_autoescape() {
        let (_dir, site) = project(&[("t.html", "{{ markup }}")]);
        let ctx = TemplateContext::new(&site);
        let out = ctx.render("t.html", locals(json!({"markup": "<b>&</b>"}))).unwrap();
        assert_eq!(out, "<b>&</b>");
    }

    #[test]
    fn test_asset_path_in_production() {
        let (_dir, mut site) = project(&[]);
        site.set("asset_http_prefix", "https://cdn.example.com")
            .insert_page(Page::file("logo.png", "prebuild/logo.png").with_digest(true))
            .insert_page(Page::json("data.json", json!({})));
        site.config_mut()
            .set_mode(Mode::Build)
            .set_target(Target::Production);
        let ctx = TemplateContext::new(&site);

        assert_eq!(
            ctx.asset_path(&["logo.png"]),
            Err(ResolveError::MissingDigest("logo.png".into()))
        );
        assert_eq!(
            ctx.asset_path(&["missing.png"]),
            Err(ResolveError::UnknownAsset("missing.png".into()))
        );
        assert_eq!(
            ctx.asset_path(&["data.json"]).unwrap(),
            "https://cdn.example.com/data.json"
        );

        // digest paths recorded on the site are visible to existing contexts
        site.sitemap()
            .get("logo.png")
            .unwrap()
            .record_digest_path("logo-abc.png".into())
            .unwrap();
        assert_eq!(
            ctx.asset_path(&["logo.png"]).unwrap(),
            "https://cdn.example.com/logo-abc.png"
        );
    }

    #[test]
    fn test_asset_path_in_development() {
        let (_dir, mut site) = project(&[("t.html", "{{ asset_path(segments=[\"img\", \"a.png\"]) }}")]);
        site.config_mut()
            .set_mode(Mode::Server)
            .set_target(Target::Development);
        let ctx = TemplateContext::new(&site);

        assert_eq!(ctx.asset_path(&["nowhere.png"]).unwrap(), "/nowhere.png");
        assert_eq!(ctx.render("t.html", Bindings::new()).unwrap(), "/img/a.png");
    }

    #[test]
    fn test_asset_path_error_from_template() {
        let (_dir, mut site) = project(&[("t.html", "{{ asset_path(path=\"gone.css\") }}")]);
        site.config_mut()
            .set_mode(Mode::Build)
            .set_target(Target::Production);
        let ctx = TemplateContext::new(&site);

        let err = ctx.render("t.html", Bindings::new()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ResolveError>(),
            Some(&ResolveError::UnknownAsset("gone.css".into()))
        );
    }

    #[test]
    fn test_canonical_url_and_prefixes() {
        let (_dir, mut site) = project(&[(
            "t.html",
            "{{ http_prefix() }} {{ canonical_url(path=\"about/\") }} {{ is_build() }}",
        )]);
        site.set("http_prefix", "https://example.com/viz");
        site.config_mut()
            .set_mode(Mode::Build)
            .set_target(Target::Production);
        let ctx = TemplateContext::new(&site);

        assert_eq!(
            ctx.render("t.html", Bindings::new()).unwrap(),
            "https://example.com/viz/ https://example.com/viz/about/ true"
        );
    }

    #[test]
    fn test_include_file() {
        let (dir, site) = project(&[("snippet.txt", "plain text"), ("doc.pdf", "%PDF")]);
        fs::write(dir.path().join("dot.png"), [0x89, b'P', b'N', b'G']).unwrap();
        let ctx = TemplateContext::new(&site);

        assert_eq!(ctx.include_file("snippet.txt").unwrap(), "plain text");
        assert_eq!(ctx.include_file("dot.png").unwrap(), "iVBORw==");

        let err = ctx.include_file("doc.pdf").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ResolveError>(),
            Some(&ResolveError::UnsupportedInclude(
                "doc.pdf".into(),
                "application/pdf".into()
            ))
        );
    }

    #[test]
    fn test_template_helpers() {
        let (_dir, mut site) = project(&[("t.html", "{{ shout(text=\"hi\") }}")]);
        let set = HelperSet::new("text").function("shout", |_, args| {
            let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
            Ok(json!(text.to_uppercase()))
        });
        site.helpers(set, HelperTarget::Template).unwrap();
        let ctx = TemplateContext::new(&site);

        assert_eq!(ctx.render("t.html", Bindings::new()).unwrap(), "HI");
    }
}
