//! Content-hash output naming.
//!
//! A digest page `images/logo.png` whose bytes hash to `3f78…` is written as
//! `images/logo-3f78….png`. Everything after the first dot of the file name
//! counts as the extension, so `index.html.erb` keeps `.html.erb` intact.

use sha1::{Digest, Sha1};

/// Everything after the first dot of the final path segment, dot included.
///
/// Returns an empty string when the file name has no dot.
pub fn fullextname(path: &str) -> &str {
    let name = basename(path);
    name.find('.').map_or("", |idx| &name[idx..])
}

/// Lowercase hex sha1 of `content`.
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha1::digest(content))
}

/// Cache-busted path for `path`: `<dir>/<base>-<digest><ext>`.
///
/// Files at the root have no directory prefix.
pub fn digest_path(path: &str, content: &[u8]) -> String {
    let digest = content_digest(content);
    let name = basename(path);
    let ext = fullextname(path);
    let base = &name[..name.len() - ext.len()];

    let file = format!("{base}-{digest}{ext}");
    match dirname(path) {
        "" => file,
        dir => format!("{dir}/{file}"),
    }
}

/// Pull the embedded digest back out of a digested file name.
pub fn embedded_digest(digested: &str) -> Option<&str> {
    let name = basename(digested);
    let stem = &name[..name.len() - fullextname(name).len()];
    let (_, digest) = stem.rsplit_once('-')?;
    (digest.len() == 40 && digest.bytes().all(|b| b.is_ascii_hexdigit())).then_some(digest)
}

fn basename(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}
