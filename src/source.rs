use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::CatalogError;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^\s/]+").unwrap());

pub fn is_url(page: &str) -> bool {
    URL_RE.is_match(page.trim())
}

/// Read the catalog page from a local file. Fetching by URL is not implemented.
pub fn load_page(page: &str) -> Result<String, CatalogError> {
    if is_url(page) {
        return Err(CatalogError::FetchNotSupported(page.to_string()));
    }
    debug!("Is not a URL");

    let path = Path::new(page);
    std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })
}
