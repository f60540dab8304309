//! Media type detection
//!
//! An injectable collaborator rather than a process-wide global, so tests
//! can hold their own instance. Detection order: the RDF extension table,
//! `mime_guess`, then a short content peek that classifies UTF-8 text as
//! `text/plain` (the class the RDF sniffer is allowed to inspect).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Fallback type for unreadable or binary content
pub const OCTET_STREAM: &str = "application/octet-stream";
/// Detected type for directories
pub const DIRECTORY: &str = "inode/directory";

const PEEK_LEN: usize = 512;

#[derive(Debug, Clone)]
pub struct MediaTypes {
    rdf_extensions: HashMap<&'static str, &'static str>,
}

impl Default for MediaTypes {
    fn default() -> Self {
        let rdf_extensions = HashMap::from([
            ("ttl", "text/turtle"),
            ("n3", "text/n3"),
            ("rdf", "application/rdf+xml"),
            ("jsonld", "application/ld+json"),
        ]);
        Self { rdf_extensions }
    }
}

impl MediaTypes {
    /// RDF serialization mapped from the file extension, if any.
    pub fn rdf_extension(&self, path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?;
        self.rdf_extensions.get(ext).copied()
    }

    /// Detect the media type of an on-disk file.
    pub fn detect(&self, path: &Path) -> String {
        if path.is_dir() {
            return DIRECTORY.to_string();
        }
        if let Some(mime) = self.rdf_extension(path) {
            return mime.to_string();
        }
        if let Some(mime) = mime_guess::from_path(path).first_raw() {
            return mime.to_string();
        }

        let mut buf = [0u8; PEEK_LEN];
        let n = match File::open(path).and_then(|mut f| f.read(&mut buf)) {
            Ok(n) => n,
            Err(_) => return OCTET_STREAM.to_string(),
        };
        if std::str::from_utf8(&buf[..n]).is_ok() || utf8_truncated(&buf[..n]) {
            mime::TEXT_PLAIN.to_string()
        } else {
            OCTET_STREAM.to_string()
        }
    }
}

/// True when the slice is valid UTF-8 except for a character cut off by the
/// peek window.
fn utf8_truncated(buf: &[u8]) -> bool {
    match std::str::from_utf8(buf) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && buf.len() == PEEK_LEN,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rdf_extension_table() {
        let media = MediaTypes::default();
        assert_eq!(
            media.rdf_extension(Path::new("/data/profile.ttl")),
            Some("text/turtle")
        );
        assert_eq!(
            media.rdf_extension(Path::new("/data/doc.jsonld")),
            Some("application/ld+json")
        );
        assert_eq!(media.rdf_extension(Path::new("/data/picture.png")), None);
        assert_eq!(media.rdf_extension(Path::new("/data/noext")), None);
    }

    #[test]
    fn test_detect_by_content_peek() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaTypes::default();

        let text = dir.path().join("card");
        writeln!(File::create(&text).unwrap(), "@prefix : <#> .").unwrap();
        assert_eq!(media.detect(&text), "text/plain");

        let binary = dir.path().join("blob");
        File::create(&binary)
            .unwrap()
            .write_all(&[0u8, 159, 146, 150])
            .unwrap();
        assert_eq!(media.detect(&binary), OCTET_STREAM);

        assert_eq!(media.detect(dir.path()), DIRECTORY);
    }

    #[test]
    fn test_detect_known_extension() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaTypes::default();
        let png = dir.path().join("img.png");
        File::create(&png).unwrap().write_all(b"not a real png").unwrap();
        assert_eq!(media.detect(&png), "image/png");
    }
}
