//! Fetch files through an authenticated resource locator (ARL).
//!
//! An ARL names a backend, a destination and optional credentials in one
//! string. [`Arl::fetch`] resolves it into a [`ContentStream`] of files,
//! downloading with bounded concurrency and expanding lone tar or zip
//! archives into their members.

pub mod archive;
mod arl;
pub mod config;
pub mod content;
pub mod error;
pub mod locator;
pub mod pool;
pub mod providers;
pub mod resolvers;
pub mod s3;

pub use arl::Arl;
pub use config::FetchConfig;
pub use content::{Content, ContentStream};
pub use error::{ArlError, FetchError};
pub use locator::{AuthKind, Backend, Locator};
pub use providers::{CredentialDocument, StorageCredentials};
