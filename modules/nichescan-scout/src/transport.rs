use std::sync::Arc;

use async_trait::async_trait;
use catalog_client::{CatalogError, CatalogRequest, CatalogResponse, Endpoint, Transport};
use tracing::warn;

use crate::endpoints::EndpointPool;

/// Extra attempts after a proxy fails at the network level.
pub const MAX_ENDPOINT_RETRIES: u32 = 1;

/// Routes each request through an endpoint picked from the shared pool.
///
/// A network failure through a proxy marks that proxy dead and retries on a
/// freshly picked endpoint, at most [`MAX_ENDPOINT_RETRIES`] times. Block
/// signals and HTTP statuses are returned untouched; they are not the
/// endpoint's fault.
pub struct RotatingEndpoints<T: Transport> {
    inner: T,
    pool: Arc<EndpointPool>,
}

impl<T: Transport> RotatingEndpoints<T> {
    pub fn new(inner: T, pool: Arc<EndpointPool>) -> Self {
        Self { inner, pool }
    }
}

#[async_trait]
impl<T: Transport> Transport for RotatingEndpoints<T> {
    async fn send(&self, request: CatalogRequest) -> catalog_client::Result<CatalogResponse> {
        let mut retries = 0;
        loop {
            let endpoint = self.pool.pick();
            let attempt = CatalogRequest {
                endpoint: endpoint.clone(),
                ..request.clone()
            };

            match self.inner.send(attempt).await {
                Err(CatalogError::Network(msg)) if matches!(endpoint, Endpoint::Proxy(_)) => {
                    self.pool.mark_dead(&endpoint);
                    if retries >= MAX_ENDPOINT_RETRIES {
                        return Err(CatalogError::Network(msg));
                    }
                    retries += 1;
                    warn!(
                        endpoint = %endpoint,
                        error = %msg,
                        retry = retries,
                        "Endpoint failed, retrying through another"
                    );
                }
                other => return other,
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
