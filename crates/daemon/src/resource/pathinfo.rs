//! Request URI to storage mapping
//!
//! `resolve` turns an absolute request URI into everything the rest of the
//! pipeline needs to know about the addressed resource: the on-disk file,
//! the shadow ACL and metadata locators, existence, and the detected media
//! type. It never mutates anything; callers re-resolve freely (the ACL walk
//! and glob expansion both do).

use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::Url;

use super::media::MediaTypes;
use crate::service_config::Config;

/// Shadow suffix for access control documents
pub const ACL_SUFFIX: &str = ".acl";
/// Shadow suffix for resource metadata
pub const META_SUFFIX: &str = ".meta";

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("missing resource path")]
    Empty,
    #[error("invalid resource URI: {0}")]
    Uri(#[from] url::ParseError),
}

/// Everything the pipeline knows about one addressed resource.
///
/// Derived per request, never stored.
#[derive(Debug, Clone)]
pub struct PathInfo {
    /// canonical absolute URI, ending in `/` iff the target is a directory
    pub uri: String,
    /// scheme://host[:port]
    pub base: String,
    /// URI path with the leading `/` stripped
    pub path: String,
    /// effective storage root (host folded in under vhost mode)
    pub root: PathBuf,
    /// absolute on-disk location
    pub file: PathBuf,
    /// detected media type, when the file exists
    pub file_type: Option<String>,
    pub acl_uri: String,
    pub acl_file: PathBuf,
    pub meta_uri: String,
    pub meta_file: PathBuf,
    pub exists: bool,
    pub is_dir: bool,
    /// size in bytes from stat (0 when absent)
    pub size: u64,
}

impl PathInfo {
    /// URI of the parent per the ACL ascent rule; `None` at the root.
    pub fn parent(&self) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) => Some(format!("{}/{}/", self.base, &trimmed[..idx])),
            None => Some(format!("{}/", self.base)),
        }
    }
}

/// Resolve a request URI against the storage root.
pub fn resolve(config: &Config, media: &MediaTypes, uri: &str) -> Result<PathInfo, PathError> {
    if uri.is_empty() {
        return Err(PathError::Empty);
    }
    let parsed = Url::parse(uri)?;

    let mut host = parsed.host_str().unwrap_or("localhost").to_string();
    if let Some(port) = parsed.port() {
        host = format!("{}:{}", host, port);
    }
    let base = format!("{}://{}", parsed.scheme(), host);

    let mut root = config.data_root.clone();
    if config.vhosts {
        root = root.join(&host);
    }

    let mut path = percent_decode_str(parsed.path())
        .decode_utf8_lossy()
        .trim_start_matches('/')
        .to_string();

    let mut exists = true;
    let mut is_dir = false;
    let mut size = 0;
    let mut file_type = None;
    match std::fs::metadata(root.join(&path)) {
        Err(_) => exists = false,
        Ok(stat) => {
            is_dir = stat.is_dir();
            size = stat.len();
            // add the missing trailing slash for directories
            if is_dir && !path.is_empty() && !path.ends_with('/') {
                path.push('/');
            }
            file_type = Some(media.detect(&root.join(&path)));
        }
    }

    let uri = format!("{}/{}", base, path);
    let file = root.join(&path);

    let (acl_uri, acl_file, meta_uri, meta_file) = if path.ends_with(ACL_SUFFIX) {
        (uri.clone(), file.clone(), uri.clone(), file.clone())
    } else if path.ends_with(META_SUFFIX) {
        (
            format!("{}{}", uri, ACL_SUFFIX),
            root.join(format!("{}{}", path, ACL_SUFFIX)),
            uri.clone(),
            file.clone(),
        )
    } else {
        (
            format!("{}{}", uri, ACL_SUFFIX),
            root.join(format!("{}{}", path, ACL_SUFFIX)),
            format!("{}{}", uri, META_SUFFIX),
            root.join(format!("{}{}", path, META_SUFFIX)),
        )
    };

    Ok(PathInfo {
        uri,
        base,
        path,
        root,
        file,
        file_type,
        acl_uri,
        acl_file,
        meta_uri,
        meta_file,
        exists,
        is_dir,
        size,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn setup() -> (Config, MediaTypes, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("_test")).unwrap();
        let config = Config {
            data_root: tmp.path().to_path_buf(),
            ..Config::default()
        };
        (config, MediaTypes::default(), tmp)
    }

    #[test]
    fn test_empty_uri_rejected() {
        let (config, media, _tmp) = setup();
        assert!(resolve(&config, &media, "").is_err());
    }

    #[test]
    fn test_root_resolution() {
        let (config, media, tmp) = setup();
        for uri in ["https://example.org", "https://example.org/"] {
            let p = resolve(&config, &media, uri).unwrap();
            assert_eq!(p.uri, "https://example.org/");
            assert_eq!(p.base, "https://example.org");
            assert_eq!(p.path, "");
            assert_eq!(p.file, tmp.path().to_path_buf());
            assert_eq!(p.acl_uri, "https://example.org/.acl");
            assert_eq!(p.acl_file, tmp.path().join(".acl"));
            assert_eq!(p.meta_uri, "https://example.org/.meta");
            assert_eq!(p.meta_file, tmp.path().join(".meta"));
            assert!(p.exists);
            assert!(p.is_dir);
        }
    }

    #[test]
    fn test_directory_gains_trailing_slash() {
        let (config, media, tmp) = setup();
        let p = resolve(&config, &media, "https://example.org/_test").unwrap();
        assert_eq!(p.uri, "https://example.org/_test/");
        assert_eq!(p.path, "_test/");
        assert_eq!(p.file, tmp.path().join("_test/"));
        assert_eq!(p.acl_uri, "https://example.org/_test/.acl");
        assert_eq!(p.acl_file, tmp.path().join("_test/.acl"));
        assert_eq!(p.meta_uri, "https://example.org/_test/.meta");
        assert!(p.exists);
        assert!(p.is_dir);
    }

    #[test]
    fn test_missing_leaf() {
        let (config, media, tmp) = setup();
        let p = resolve(&config, &media, "https://example.org/_test/abc").unwrap();
        assert_eq!(p.uri, "https://example.org/_test/abc");
        assert_eq!(p.path, "_test/abc");
        assert_eq!(p.file, tmp.path().join("_test/abc"));
        assert_eq!(p.acl_uri, "https://example.org/_test/abc.acl");
        assert_eq!(p.meta_uri, "https://example.org/_test/abc.meta");
        assert!(!p.exists);
        assert!(p.file_type.is_none());
    }

    #[test]
    fn test_acl_is_its_own_shadow() {
        let (config, media, tmp) = setup();
        let p = resolve(&config, &media, "https://example.org/_test/.acl").unwrap();
        assert_eq!(p.acl_uri, "https://example.org/_test/.acl");
        assert_eq!(p.acl_file, tmp.path().join("_test/.acl"));
        assert_eq!(p.meta_uri, "https://example.org/_test/.acl");
        assert_eq!(p.meta_file, tmp.path().join("_test/.acl"));
    }

    #[test]
    fn test_meta_shadow_rules() {
        let (config, media, tmp) = setup();
        let p = resolve(&config, &media, "https://example.org/_test/.meta").unwrap();
        assert_eq!(p.acl_uri, "https://example.org/_test/.meta.acl");
        assert_eq!(p.acl_file, tmp.path().join("_test/.meta.acl"));
        assert_eq!(p.meta_uri, "https://example.org/_test/.meta");
        assert_eq!(p.meta_file, tmp.path().join("_test/.meta"));
    }

    #[test]
    fn test_vhosts_fold_host_into_root() {
        let (mut config, media, tmp) = setup();
        config.vhosts = true;
        std::fs::create_dir(tmp.path().join("example.org:8443")).unwrap();
        let p = resolve(&config, &media, "https://example.org:8443/x").unwrap();
        assert_eq!(p.base, "https://example.org:8443");
        assert_eq!(p.file, tmp.path().join("example.org:8443").join("x"));
    }

    #[test]
    fn test_parent_ascent() {
        let (config, media, _tmp) = setup();
        let p = resolve(&config, &media, "https://example.org/a/b/c").unwrap();
        assert_eq!(p.parent().unwrap(), "https://example.org/a/b/");

        let p = resolve(&config, &media, "https://example.org/a/b/").unwrap();
        assert_eq!(p.parent().unwrap(), "https://example.org/a/");

        let p = resolve(&config, &media, "https://example.org/a").unwrap();
        assert_eq!(p.parent().unwrap(), "https://example.org/");

        let p = resolve(&config, &media, "https://example.org/").unwrap();
        assert!(p.parent().is_none());
    }
}
