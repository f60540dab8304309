//! LDP slot allocation for POST-to-container
//!
//! The child's name comes from the `Slug` header when given (rejecting
//! collisions with 409), else from the first six characters of a random
//! UUID. A `Link: <ldp#BasicContainer>; rel="type"` request allocates a
//! directory slot (trailing slash).

use uuid::Uuid;

use super::media::MediaTypes;
use super::pathinfo::{resolve, PathError, PathInfo};
use crate::service_config::Config;

#[derive(Debug, thiserror::Error)]
pub enum AllocateError {
    #[error("a resource with the same name already exists")]
    SlugTaken,
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Allocate a child slot under `container`.
pub fn allocate(
    config: &Config,
    media: &MediaTypes,
    container: &PathInfo,
    slug: Option<&str>,
    as_container: bool,
) -> Result<PathInfo, AllocateError> {
    let mut dir = container.path.clone();
    if !dir.is_empty() && !dir.ends_with('/') {
        dir.push('/');
    }

    let name = match slug {
        Some(slug) => {
            let slug = slug.trim_matches('/');
            if container.file.join(slug).exists() {
                return Err(AllocateError::SlugTaken);
            }
            slug.to_string()
        }
        None => Uuid::new_v4().simple().to_string()[..6].to_string(),
    };

    let mut child = format!("{}{}", dir, name);
    if as_container && !child.ends_with('/') {
        child.push('/');
    }

    Ok(resolve(config, media, &format!("{}/{}", container.base, child))?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn setup() -> (Config, MediaTypes, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("box")).unwrap();
        let config = Config {
            data_root: tmp.path().to_path_buf(),
            ..Config::default()
        };
        (config, MediaTypes::default(), tmp)
    }

    #[test]
    fn test_slug_slot() {
        let (config, media, _tmp) = setup();
        let container = resolve(&config, &media, "https://example.org/box/").unwrap();
        let child = allocate(&config, &media, &container, Some("ldpr"), false).unwrap();
        assert_eq!(child.uri, "https://example.org/box/ldpr");
        assert!(!child.exists);
    }

    #[test]
    fn test_slug_is_sanitized() {
        let (config, media, _tmp) = setup();
        let container = resolve(&config, &media, "https://example.org/box/").unwrap();
        let child = allocate(&config, &media, &container, Some("/notes/"), false).unwrap();
        assert_eq!(child.uri, "https://example.org/box/notes");
    }

    #[test]
    fn test_taken_slug_conflicts() {
        let (config, media, tmp) = setup();
        std::fs::write(tmp.path().join("box/ldpr"), b"x").unwrap();
        let container = resolve(&config, &media, "https://example.org/box/").unwrap();
        assert!(matches!(
            allocate(&config, &media, &container, Some("ldpr"), false),
            Err(AllocateError::SlugTaken)
        ));
    }

    #[test]
    fn test_container_slot_gets_trailing_slash() {
        let (config, media, _tmp) = setup();
        let container = resolve(&config, &media, "https://example.org/box/").unwrap();
        let child = allocate(&config, &media, &container, Some("sub"), true).unwrap();
        assert_eq!(child.uri, "https://example.org/box/sub/");
        assert_eq!(child.acl_uri, "https://example.org/box/sub/.acl");
    }

    #[test]
    fn test_generated_slot_is_short_uuid() {
        let (config, media, _tmp) = setup();
        let container = resolve(&config, &media, "https://example.org/box/").unwrap();
        let child = allocate(&config, &media, &container, None, false).unwrap();
        let name = child.path.strip_prefix("box/").unwrap();
        assert_eq!(name.len(), 6);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
