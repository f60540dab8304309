//! Shared service state
//!
//! One cloneable handle carrying everything request handlers need: the
//! configuration, the media type detector, server key material, the
//! per-path lock map, the event bus, the profile source and the WebDAV
//! delegate.

use std::sync::Arc;

use common::prelude::Keyring;
use dav_server::DavHandler;

use crate::events::EventBus;
use crate::profiles::{ProfileSource, WebProfileSource};
use crate::resource::{LockMap, MediaTypes};
use crate::service_config::Config;
use crate::webdav;

#[derive(Clone)]
pub struct State {
    config: Arc<Config>,
    media: Arc<MediaTypes>,
    keyring: Keyring,
    locks: LockMap,
    events: EventBus,
    profiles: Arc<dyn ProfileSource>,
    webdav: Arc<DavHandler>,
}

impl State {
    /// Production state: profiles come off the network.
    pub fn new(config: Config) -> Self {
        let profiles = Arc::new(WebProfileSource::new(config.profile_timeout));
        Self::with_profiles(config, profiles)
    }

    /// State with an explicit profile source (used by tests).
    pub fn with_profiles(config: Config, profiles: Arc<dyn ProfileSource>) -> Self {
        let webdav = Arc::new(webdav::handler(&config.data_root));
        Self {
            config: Arc::new(config),
            media: Arc::new(MediaTypes::default()),
            keyring: Keyring::generate(),
            locks: LockMap::default(),
            events: EventBus::default(),
            profiles,
            webdav,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn media(&self) -> &Arc<MediaTypes> {
        &self.media
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    pub fn locks(&self) -> &LockMap {
        &self.locks
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileSource> {
        &self.profiles
    }

    pub fn webdav(&self) -> &Arc<DavHandler> {
        &self.webdav
    }
}
