//! Serves the console's bundled assets from a directory.

use std::path::{Path, PathBuf};

use hyper::StatusCode;
use tracing::{debug, warn};
use url::Url;

const NOT_FOUND_TEXT: &str = "404 - Not Found";

#[derive(Debug, Clone, PartialEq)]
pub struct StaticResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    not_found_page: PathBuf,
}

/// Content type by extension. Unknown extensions are served as HTML.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "text/html",
    }
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, not_found_page: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            not_found_page: not_found_page.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path to a file under the root.
    ///
    /// Percent-escapes are decoded and dot segments resolved before the
    /// lookup. Directories resolve to their `index.html`. Anything that
    /// ends up outside the root is reported as missing.
    pub async fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let root = tokio::fs::canonicalize(&self.root).await.ok()?;
        let base = Url::from_directory_path(&root).ok()?;
        let relative = url_path.trim_start_matches('/');
        let mut candidate = base.join(relative).ok()?.to_file_path().ok()?;

        if tokio::fs::metadata(&candidate).await.ok()?.is_dir() {
            candidate.push("index.html");
        }

        let resolved = tokio::fs::canonicalize(&candidate).await.ok()?;
        if !resolved.starts_with(&root) {
            warn!(path = %url_path, "Refused path outside the static root");
            return None;
        }
        let meta = tokio::fs::metadata(&resolved).await.ok()?;
        meta.is_file().then_some(resolved)
    }

    pub async fn serve(&self, url_path: &str) -> StaticResponse {
        if let Some(path) = self.resolve(url_path).await {
            match tokio::fs::read(&path).await {
                Ok(body) => {
                    return StaticResponse {
                        status: StatusCode::OK,
                        content_type: content_type(&path),
                        body,
                    }
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to read static file"),
            }
        }

        debug!(path = %url_path, "Static file not found");
        self.not_found().await
    }

    // The console's 404 page is served with 200 so its router can take over.
    async fn not_found(&self) -> StaticResponse {
        match tokio::fs::read(&self.not_found_page).await {
            Ok(body) => StaticResponse {
                status: StatusCode::OK,
                content_type: "text/html",
                body,
            },
            Err(_) => StaticResponse {
                status: StatusCode::NOT_FOUND,
                content_type: "text/plain",
                body: NOT_FOUND_TEXT.as_bytes().to_vec(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn site() -> (TempDir, StaticFiles) {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir_all(public.join("assets")).unwrap();
        std::fs::write(public.join("index.html"), "<h1>console</h1>").unwrap();
        std::fs::write(public.join("404.html"), "<h1>missing</h1>").unwrap();
        std::fs::write(public.join("assets/app.js"), "console.log(1)").unwrap();
        std::fs::write(public.join("assets/my file.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "top secret").unwrap();

        let files = StaticFiles::new(&public, public.join("404.html"));
        (dir, files)
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a.js")), "text/javascript");
        assert_eq!(content_type(Path::new("a.css")), "text/css");
        assert_eq!(content_type(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a.json")), "text/html");
        assert_eq!(content_type(Path::new("LICENSE")), "text/html");
    }

    #[tokio::test]
    async fn test_serves_files_and_directory_index() {
        let (_dir, files) = site();

        let index = files.serve("/").await;
        assert_eq!(index.status, StatusCode::OK);
        assert_eq!(index.body, b"<h1>console</h1>");

        let script = files.serve("/assets/app.js").await;
        assert_eq!(script.content_type, "text/javascript");
        assert_eq!(script.body, b"console.log(1)");
    }

    #[tokio::test]
    async fn test_percent_escapes_are_decoded() {
        let (_dir, files) = site();

        let css = files.serve("/assets/my%20file.css").await;

        assert_eq!(css.status, StatusCode::OK);
        assert_eq!(css.content_type, "text/css");
    }

    #[tokio::test]
    async fn test_missing_file_serves_404_page_with_ok_status() {
        let (_dir, files) = site();

        let missing = files.serve("/tables/events").await;

        assert_eq!(missing.status, StatusCode::OK);
        assert_eq!(missing.body, b"<h1>missing</h1>");
    }

    #[tokio::test]
    async fn test_traversal_is_treated_as_missing() {
        let (_dir, files) = site();

        for path in ["/../secret.txt", "/assets/../../secret.txt", "/%2e%2e/secret.txt"] {
            assert!(files.resolve(path).await.is_none(), "{path}");
            assert_eq!(files.serve(path).await.body, b"<h1>missing</h1>");
        }
    }

    #[tokio::test]
    async fn test_plain_404_when_404_page_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let files = StaticFiles::new(dir.path(), dir.path().join("404.html"));

        let response = files.serve("/nothing.js").await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.body, NOT_FOUND_TEXT.as_bytes());
    }
}
