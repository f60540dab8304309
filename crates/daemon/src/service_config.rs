use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// address the HTTP server listens on
    pub listen_addr: SocketAddr,

    // storage configuration
    /// root directory holding resources (one subtree per host in vhost mode)
    pub data_root: PathBuf,
    /// fold the request host into the storage root
    pub vhosts: bool,

    // session configuration
    /// lifetime of issued `Session` cookies
    pub cookie_age: Duration,
    /// lifetime of WWW-Authenticate nonce tokens
    pub nonce_age: Duration,

    // representation configuration
    /// file names probed, in order, when a container is requested as HTML
    pub dir_indexes: Vec<String>,
    /// browser skin a container request is redirected to when no index matches
    pub dir_skin: Option<String>,
    /// sign-up skin used in vhost mode for unclaimed hosts
    pub signup_skin: Option<String>,

    // remote fetch configuration
    /// bound on WebID profile and group graph fetches
    pub profile_timeout: Duration,

    /// largest request body accepted, in bytes
    pub body_limit: usize,

    // logging
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: ([127, 0, 0, 1], 8443).into(),
            data_root: PathBuf::from("."),
            vhosts: false,
            cookie_age: Duration::from_secs(24 * 3600),
            nonce_age: Duration::from_secs(60),
            dir_indexes: Vec::new(),
            dir_skin: None,
            signup_skin: None,
            profile_timeout: Duration::from_secs(5),
            body_limit: 100 * 1024 * 1024,
            log_level: tracing::Level::INFO,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("data root is not a directory: {0}")]
    BadDataRoot(PathBuf),
}

impl Config {
    /// Validate settings that cannot be checked at parse time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.data_root.is_dir() {
            return Err(ConfigError::BadDataRoot(self.data_root.clone()));
        }
        Ok(())
    }
}
