//! Content type detection by file extension.

use std::path::Path;

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
pub fn guess_content_type(path: impl AsRef<Path>) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("yaml" | "yml") => "text/yaml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        // Default binary
        _ => "application/octet-stream",
    }
}

/// Media type without parameters, e.g. `text/html`.
pub fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Text content: `text/*` plus the structured formats served as text.
pub fn is_text(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence.starts_with("text/")
        || matches!(
            essence,
            "application/javascript" | "application/json" | "application/xml" | "image/svg+xml"
        )
}

pub fn is_image(content_type: &str) -> bool {
    essence(content_type).starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(guess_content_type("img/LOGO.PNG"), "image/png");
        assert_eq!(guess_content_type("about/index.html.erb"), "application/octet-stream");
        assert_eq!(guess_content_type("README"), "application/octet-stream");
    }

    #[test]
    fn test_classification() {
        assert!(is_text(guess_content_type("style.css")));
        assert!(is_text(guess_content_type("icon.svg")));
        assert!(is_image(guess_content_type("photo.jpg")));
        assert!(!is_text(guess_content_type("photo.jpg")));
        assert!(!is_text(guess_content_type("doc.pdf")));
        assert!(!is_image(guess_content_type("doc.pdf")));
    }
}
