#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for publish operations.
pub const TRACING_TARGET_PUBLISH: &str = "cairn_core::publish";

/// Tracing target for gateway reads.
pub const TRACING_TARGET_GATEWAY: &str = "cairn_core::gateway";

/// Tracing target for attachment collection.
pub const TRACING_TARGET_COLLECT: &str = "cairn_core::collect";

mod error;

pub mod attachment;
pub mod collect;
pub mod document;
pub mod gateway;
pub mod metadata;
pub mod naming;
pub mod provider;
pub mod publish;
pub mod stitch;
pub mod storage;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use attachment::Attachment;
pub use collect::{collect_attachments, collect_batch};
pub use document::{Document, Fields};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use gateway::{GatewayConfig, GatewayResolver};
pub use metadata::fetch_token_metadata;
pub use naming::derive_file_names;
pub use provider::{BlobSink, ContractReader, GatewayTransport, SignerProvider, UploadTokenProvider};
pub use publish::{MetadataPublisher, PublishStage};
pub use stitch::stitch_document;
pub use storage::Storage;
pub use types::{BatchItem, BatchResult, ContentId, PublishResult, STORAGE_SCHEME, UploadContext};
