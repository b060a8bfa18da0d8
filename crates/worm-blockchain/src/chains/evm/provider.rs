use std::{num::NonZeroUsize, sync::Arc};

use alloy::{
    network::{Ethereum, EthereumWallet},
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::client::RpcClient,
    transports::{
        BoxTransport, IntoBoxTransport,
        http::{Http, reqwest::Url},
        layers::FallbackLayer,
    },
};
use tower::ServiceBuilder;

use crate::{error::BlockchainError, utils::mask_rpc_url};

pub(crate) type BlockchainProvider = Arc<DynProvider<Ethereum>>;

/// Builds a signing provider over every usable endpoint, failing over one at a time.
pub(crate) async fn initialize_provider_with_wallet(
    rpc_endpoints: &[String],
    wallet: EthereumWallet,
) -> Result<BlockchainProvider, BlockchainError> {
    let mut transports: Vec<BoxTransport> = Vec::new();
    let mut usable = Vec::new();

    for endpoint in rpc_endpoints.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let masked = mask_rpc_url(endpoint);
        if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            match RpcClient::connect_pubsub(WsConnect::new(endpoint)).await {
                Ok(client) => {
                    transports.push(client.transport().clone().into_box_transport());
                    usable.push(masked);
                }
                Err(e) => {
                    tracing::warn!(endpoint = %masked, error = %e, "WebSocket RPC endpoint unreachable")
                }
            }
        } else {
            match endpoint.parse::<Url>() {
                Ok(url) => {
                    transports.push(Http::new(url).into_box_transport());
                    usable.push(masked);
                }
                Err(e) => tracing::warn!(endpoint = %masked, error = %e, "Invalid RPC URL"),
            }
        }
    }

    if transports.is_empty() {
        return Err(BlockchainError::RpcConnectionFailed {
            attempts: rpc_endpoints.len(),
        });
    }

    let transport = ServiceBuilder::new()
        .layer(FallbackLayer::default().with_active_transport_count(NonZeroUsize::MIN))
        .service(transports);
    let client = RpcClient::builder().transport(transport, false);
    let provider = ProviderBuilder::new().wallet(wallet).connect_client(client);

    match provider.get_block_number().await {
        Ok(block) => {
            tracing::debug!(endpoints = ?usable, block, "Chain provider connected");
            Ok(Arc::new(provider.erased()))
        }
        Err(e) => {
            tracing::error!(endpoints = ?usable, error = %e, "All RPC endpoints failed connectivity check");
            Err(BlockchainError::RpcConnectionFailed {
                attempts: usable.len(),
            })
        }
    }
}
