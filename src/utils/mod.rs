//! Utility modules shared by the build pipeline and the dev server.

pub mod fs;
pub mod mime;
