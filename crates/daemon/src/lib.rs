// Service modules (daemon functionality)
pub mod auth;
pub mod events;
pub mod http_server;
pub mod profiles;
pub mod resource;
pub mod service_config;
pub mod service_state;
pub mod wac;
pub mod webdav;

// Re-exports for consumers (tests, embedding)
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
