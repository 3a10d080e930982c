//! Static files for the single-page application

use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

/// Serve files under `dir`, answering unknown paths with `index.html` so
/// client-side routes resolve.
pub fn spa_service(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
}
