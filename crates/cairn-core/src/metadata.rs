//! Token metadata lookup.

use serde_json::{Map, Value};

use crate::TRACING_TARGET_GATEWAY;
use crate::error::{Error, Result};
use crate::gateway::GatewayResolver;
use crate::provider::{ContractReader, GatewayTransport};

/// Reads the metadata of `token_id` on `contract_address`.
///
/// The URI stored on chain is read through `reader` and fetched through
/// `resolver`. The returned object starts with `id` and `uri`, and fetched
/// fields of the same name take precedence over them.
///
/// # Errors
///
/// Returns [`ErrorKind::NotFound`](crate::ErrorKind::NotFound) when the
/// contract stores no URI for the token, and the resolver's errors otherwise.
/// A document that is not a JSON object is a parse error.
pub async fn fetch_token_metadata<T: GatewayTransport>(
    reader: &dyn ContractReader,
    resolver: &GatewayResolver<T>,
    contract_address: &str,
    token_id: u64,
) -> Result<Value> {
    let uri = reader.read_uri(contract_address, Some(token_id)).await?;
    if uri.trim().is_empty() {
        return Err(Error::not_found()
            .with_message(format!("no metadata URI stored for token {token_id}"))
            .with_context(contract_address.to_owned()));
    }

    tracing::debug!(
        target: TRACING_TARGET_GATEWAY,
        contract_address,
        token_id,
        uri = %uri,
        "Fetching token metadata"
    );

    let fields: Map<String, Value> = match resolver.fetch_metadata(&uri).await? {
        Value::Object(fields) => fields,
        _ => {
            return Err(Error::parse()
                .with_message("token metadata is not a JSON object")
                .with_context(uri));
        }
    };

    let mut merged = Map::with_capacity(fields.len() + 2);
    merged.insert("id".to_owned(), Value::from(token_id.to_string()));
    merged.insert("uri".to_owned(), Value::String(uri));
    merged.extend(fields);
    Ok(Value::Object(merged))
}
