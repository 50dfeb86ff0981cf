#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for client construction.
pub const TRACING_TARGET_CLIENT: &str = "cairn_reqwest::client";

/// Tracing target for blob uploads.
pub const TRACING_TARGET_UPLOAD: &str = "cairn_reqwest::upload";

/// Tracing target for upload token grants.
pub const TRACING_TARGET_TOKEN: &str = "cairn_reqwest::token";

/// Tracing target for gateway reads.
pub const TRACING_TARGET_GATEWAY: &str = "cairn_reqwest::gateway";

mod backend;
mod client;
mod config;
mod error;
mod multipart;
mod presigned;
mod token;
mod transport;

pub use backend::StorageBackend;
pub use client::ReqwestClient;
pub use config::{
    DEFAULT_CLIENT_ID, DEFAULT_TIMEOUT_SECS, DEFAULT_TOKEN_ENDPOINT, DEFAULT_UPLOAD_ENDPOINT,
    PinningConfig, PresignConfig, ReqwestConfig,
};
pub use error::{Error, Result};
pub use multipart::MultipartSink;
pub use presigned::PresignedSink;
pub use token::{APP_NAME_HEADER, GrantTokenProvider};
