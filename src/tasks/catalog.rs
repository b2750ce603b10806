use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::CatalogSource;
use crate::error::{Error, Result};
use crate::events::CatalogEntry;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    images: Vec<ListedImage>,
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ListedImage {
    src: String,
    #[serde(default)]
    alt: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

/// Produces the ordered catalog for a source. An empty bucket is a valid,
/// empty catalog; an unreachable one is an error.
#[instrument(skip(client))]
pub async fn list_images(source: &CatalogSource, client: &reqwest::Client) -> Result<Vec<CatalogEntry>> {
    let entries = match source {
        CatalogSource::Directory { path } => {
            let root = path.clone();
            tokio::task::spawn_blocking(move || scan_directory(&root))
                .await
                .map_err(|err| Error::Catalog(format!("directory scan aborted: {err}")))??
        }
        CatalogSource::Http { url } => fetch_listing(client, url).await?,
    };
    info!(images = entries.len(), "catalog listed");
    Ok(entries)
}

/// Recursively collects images below `root`, ordered by their relative key.
pub fn scan_directory(root: &Path) -> Result<Vec<CatalogEntry>> {
    if !root.is_dir() {
        return Err(Error::Catalog(format!(
            "{} is not a readable directory",
            root.display()
        )));
    }

    let mut found: Vec<(String, PathBuf, u64)> = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|res| match res {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable catalog entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if !is_image(path) {
            debug!(path = %path.display(), "not an image; skipped");
            continue;
        }
        let key = object_key(root, path);
        let size = entry.metadata().map(|m| m.len()).unwrap_or_default();
        found.push((key, path.to_path_buf(), size));
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(found
        .into_iter()
        .map(|(key, path, size)| CatalogEntry {
            uri: path.to_string_lossy().into_owned(),
            alt_text: key,
            size_bytes: Some(size),
        })
        .collect())
}

async fn fetch_listing(client: &reqwest::Client, url: &str) -> Result<Vec<CatalogEntry>> {
    let base = Url::parse(url).map_err(|err| Error::Catalog(format!("invalid listing url {url}: {err}")))?;
    let resp = client.get(base.clone()).send().await?;
    if !resp.status().is_success() {
        return Err(Error::Catalog(format!(
            "listing endpoint returned {}",
            resp.status()
        )));
    }
    let body = resp.text().await?;
    parse_listing(&body, &base)
}

/// Parses a `{ images: [...], total }` listing body. Relative `src` values are
/// resolved against `base`.
pub fn parse_listing(body: &str, base: &Url) -> Result<Vec<CatalogEntry>> {
    let listing: Listing = serde_json::from_str(body)
        .map_err(|err| Error::Catalog(format!("malformed listing: {err}")))?;

    if let Some(total) = listing.total {
        if total != listing.images.len() {
            warn!(
                total,
                listed = listing.images.len(),
                "listing total disagrees with image count"
            );
        }
    }

    listing
        .images
        .into_iter()
        .enumerate()
        .map(|(idx, image)| {
            let uri = base
                .join(&image.src)
                .map_err(|err| Error::Catalog(format!("bad image src {}: {err}", image.src)))?;
            let alt_text = if !image.alt.trim().is_empty() {
                image.alt
            } else {
                match image.key {
                    Some(key) if !key.trim().is_empty() => key,
                    _ => format!("Memory {}", idx + 1),
                }
            };
            Ok(CatalogEntry {
                uri: uri.into(),
                alt_text,
                size_bytes: image.size,
            })
        })
        .collect()
}

#[inline]
fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if IMAGE_EXTENSIONS.contains(&e.as_str())
    )
}

fn object_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://memories.example/api/images").unwrap()
    }

    #[test]
    fn recognizes_image_extensions_case_insensitively() {
        assert!(is_image(Path::new("a/b/photo.JPG")));
        assert!(is_image(Path::new("anim.gif")));
        assert!(is_image(Path::new("x.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("jpg")));
    }

    #[test]
    fn relative_sources_resolve_against_listing_url() {
        let body = r#"{
            "images": [
                {"src": "/api/images/proxy?key=a.jpg", "alt": "a.jpg", "key": "a.jpg", "size": 10},
                {"src": "https://cdn.example/b.png", "alt": "b.png"}
            ],
            "total": 2
        }"#;
        let entries = parse_listing(body, &base()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].uri,
            "https://memories.example/api/images/proxy?key=a.jpg"
        );
        assert_eq!(entries[0].size_bytes, Some(10));
        assert_eq!(entries[1].uri, "https://cdn.example/b.png");
    }

    #[test]
    fn missing_alt_falls_back_to_key_then_position() {
        let body = r#"{"images": [
            {"src": "/x", "key": "trip/x.jpg"},
            {"src": "/y", "alt": ""}
        ]}"#;
        let entries = parse_listing(body, &base()).unwrap();
        assert_eq!(entries[0].alt_text, "trip/x.jpg");
        assert_eq!(entries[1].alt_text, "Memory 2");
    }

    #[test]
    fn empty_listing_is_an_empty_catalog() {
        let entries = parse_listing(r#"{"images": [], "total": 0}"#, &base()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn error_bodies_are_rejected() {
        let err = parse_listing(r#"{"images": "nope"}"#, &base()).unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }
}
