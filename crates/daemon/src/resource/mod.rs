/**
 * Resource addressing and representation:
 *  URI to storage mapping, shadow locators, media
 *  type detection, ETags, per-path locks, LDP slot
 *  allocation and container rendering.
 */
pub mod allocate;
pub mod container;
pub mod etag;
pub mod lock;
pub mod media;
pub mod pathinfo;

pub use allocate::{allocate, AllocateError};
pub use etag::etag;
pub use lock::{LockGuard, LockMap};
pub use media::MediaTypes;
pub use pathinfo::{resolve, PathError, PathInfo, ACL_SUFFIX, META_SUFFIX};
