//! Bearer-token supply for the update channel.

use std::sync::Arc;

use async_trait::async_trait;

use crate::transport::AccessTokenFn;

/// Produces the bearer token presented to the push endpoint.
///
/// Implementations typically read a session cache or refresh an OAuth
/// token. Returning an error is always safe: the channel degrades to an
/// anonymous connection attempt instead of failing outright.
#[async_trait]
pub trait TokenSupplier: Send + Sync {
    /// Current bearer token for the signed-in user.
    async fn bearer_token(&self) -> anyhow::Result<String>;
}

/// Fixed-token supplier for service processes and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSupplier for StaticToken {
    async fn bearer_token(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

/// Wrap a supplier into the closure the transport polls on every
/// (re)connection attempt. Supplier failures collapse to an empty token;
/// the endpoint decides what an anonymous connection may do.
pub(crate) fn access_token_fn(supplier: Option<Arc<dyn TokenSupplier>>) -> AccessTokenFn {
    Arc::new(move || {
        let supplier = supplier.clone();
        Box::pin(async move {
            let Some(supplier) = supplier else {
                return String::new();
            };
            match supplier.bearer_token().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::debug!(error = %e, "token supplier failed, connecting without credentials");
                    String::new()
                }
            }
        })
    })
}
