//! Request handling for the dev server.
//!
//! Request resolution order:
//! 1. Method other than GET/HEAD/OPTIONS → 405
//! 2. Sitemap page → render on demand (nothing is written to `build/`)
//! 3. File under `prebuild/` → serve bytes as is
//! 4. Nothing found → 404
//!
//! Any error raised while handling becomes a 500 carrying the error chain and
//! a stack trace.

use crate::{
    build::render_page,
    log,
    site::Site,
    utils::{fs::join_url_path, mime::guess_content_type},
};
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    borrow::Cow,
    fs,
    sync::{Arc, LazyLock},
};

/// Methods the handler answers; anything else is a 405.
pub const ALLOWED_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Last path segment without a dot: an extensionless directory reference.
static RE_EXTENSIONLESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[^./]+$").unwrap());

/// A complete response: status, content type and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: body.into().into_bytes(),
        }
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 File not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::text(405, "METHOD NOT ALLOWED")
    }

    /// 500 with the full error report: message, causes and a stack trace.
    ///
    /// The trace is captured here when the error carries none.
    pub fn internal_error(err: &anyhow::Error) -> Self {
        let report = match err.backtrace().status() {
            BacktraceStatus::Captured => format!("{err:?}"),
            _ => format!("{err:?}\n\nStack backtrace:\n{}", Backtrace::force_capture()),
        };
        Self::text(500, report)
    }
}

/// Maps requests onto a configured site.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    site: Arc<Site>,
}

impl RequestHandler {
    pub fn new(site: Arc<Site>) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Answer one request. Never fails: errors become a 500 response.
    pub fn handle(&self, method: &str, url: &str) -> Response {
        if !ALLOWED_METHODS.contains(&method) {
            return Response::method_not_allowed();
        }

        match self.try_handle(url) {
            Ok(response) => response,
            Err(err) => {
                log!("error"; "{method} {url}\n{err:?}");
                Response::internal_error(&err)
            }
        }
    }

    fn try_handle(&self, url: &str) -> Result<Response> {
        let Some(path) = request_path(url) else {
            return Ok(Response::not_found());
        };
        let content_type = guess_content_type(&path);

        if let Some(page) = self.site.sitemap().get(&path) {
            let body = render_page(&self.site, page)
                .with_context(|| format!("Failed to render '{path}'"))?;
            return Ok(Response::ok(content_type, body));
        }

        let file = join_url_path(&self.site.prebuild_dir(), &path);
        if file.is_file() {
            let body =
                fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            return Ok(Response::ok(content_type, body));
        }

        Ok(Response::not_found())
    }
}

/// Sitemap path for a request URL.
///
/// The query string is dropped and the path percent-decoded before
/// normalization. Paths with `..` segments or invalid encoding yield `None`.
pub fn request_path(url: &str) -> Option<String> {
    let raw = url.split(['?', '#']).next().unwrap_or_default();
    let decoded: Cow<'_, str> = urlencoding::decode(raw).ok()?;
    let path = normalize_path(&decoded);
    if path.split('/').any(|segment| segment == "..") {
        return None;
    }
    Some(path)
}

/// Map a URL path onto a sitemap path.
///
/// A trailing `/` gets `index.html`; a final segment without a dot is a
/// directory and gets `/index.html`. The leading `/` is stripped.
pub fn normalize_path(path: &str) -> String {
    let mut path = path.to_owned();
    if path.ends_with('/') {
        path.push_str("index.html");
    } else if RE_EXTENSIONLESS.is_match(&path) {
        path.push_str("/index.html");
    }
    match path.strip_prefix('/') {
        Some(stripped) => stripped.to_owned(),
        None => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Mode, Target},
        error::ResolveError,
    };
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "index.html");
        assert_eq!(normalize_path("/about"), "about/index.html");
        assert_eq!(normalize_path("/about/"), "about/index.html");
        assert_eq!(normalize_path("/css/site.css"), "css/site.css");
        assert_eq!(normalize_path("/v1.2/notes"), "v1.2/notes/index.html");
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/?t=123").as_deref(), Some("index.html"));
        assert_eq!(request_path("/my%20page").as_deref(), Some("my page/index.html"));
        assert_eq!(request_path("/../secret.txt"), None);
        assert_eq!(request_path("/a/%2E%2E/b.txt"), None);
    }

    fn handler(files: &[(&str, &str)], setup: impl FnOnce(&mut Site)) -> (TempDir, RequestHandler) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut site = Site::new(dir.path());
        site.config_mut()
            .set_mode(Mode::Server)
            .set_target(Target::Development);
        setup(&mut site);
        (dir, RequestHandler::new(Arc::new(site)))
    }

    #[test]
    fn test_sitemap_pages_render_on_demand() {
        let (dir, handler) = handler(
            &[
                ("index.html", "home {{ asset_path(path='logo.png') }}"),
                ("about.html", "about"),
            ],
            |site| {
                site.add_page("index.html", json!({"template": "index.html"}))
                    .unwrap()
                    .add_page("about/index.html", json!({"template": "about.html"}))
                    .unwrap();
            },
        );

        let response = handler.handle("GET", "/");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/html; charset=utf-8");
        assert_eq!(response.body, b"home /logo.png");

        let response = handler.handle("OPTIONS", "/about");
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"about");

        // serving never writes the output tree
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn test_prebuilt_fallback_and_not_found() {
        let (_dir, handler) = handler(&[("prebuild/css/site.css", "body{}")], |_| {});

        let response = handler.handle("HEAD", "/css/site.css");
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/css; charset=utf-8");
        assert_eq!(response.body, b"body{}");

        let response = handler.handle("GET", "/missing.js");
        assert_eq!(response, Response::not_found());
        assert_eq!(response.content_type, TEXT_PLAIN);
    }

    #[test]
    fn test_other_methods_are_rejected() {
        let (_dir, handler) = handler(&[], |_| {});
        for method in ["POST", "PUT", "DELETE", "PATCH"] {
            assert_eq!(handler.handle(method, "/").status, 405);
        }
    }

    #[test]
    fn test_render_failure_is_500() {
        let (_dir, handler) = handler(&[("index.html", "{{ undefined_thing }}")], |site| {
            site.add_page("index.html", json!({"template": "index.html"}))
                .unwrap();
        });

        let response = handler.handle("GET", "/index.html");
        assert_eq!(response.status, 500);
        let body = String::from_utf8(response.body).unwrap();
        assert!(body.contains("Failed to render 'index.html'"));
        assert!(body.contains(&ResolveError::Unresolved("undefined_thing".into()).to_string()));
        assert!(body.contains("Stack backtrace:"), "{body}");
    }
}
