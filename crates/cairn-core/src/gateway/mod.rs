//! Gateway configuration, URI rewriting and fallback reads.

mod config;
mod resolver;
mod rewrite;

pub use config::{
    DEFAULT_ATTEMPT_TIMEOUT_MS, DEFAULT_GATEWAY, GatewayConfig, PUBLIC_GATEWAYS, normalize_base,
};
pub use resolver::GatewayResolver;
pub use rewrite::{is_http_url, resolve_uri, rewrite_document, rewrite_json, strip_scheme};
