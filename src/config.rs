//! Configuration for a payment engine instance.

use url::Url;

use crate::chain::Address;
use crate::facilitator::{
    AggregatorFacilitator, DirectFacilitator, FacilitatorError, FacilitatorRouter,
};
use crate::networks::{DEFAULT_FACILITATOR_URL, DEFAULT_FEE_PAYER, SolanaNetwork};
use solana_client::nonblocking::rpc_client::RpcClient;

/// Settings for an aggregator-style routing service. Presence of this block
/// switches verify/settle traffic away from the direct facilitator.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    /// Base URL of the aggregator; `./verify` and `./settle` are joined
    /// onto it.
    pub endpoint: Url,
    /// Optional `x-api-key` credential.
    pub api_key: Option<String>,
}

/// Engine configuration. Build with [`X402Config::new`] and the `with_*`
/// methods; defaults target mainnet through the public facilitator.
#[derive(Clone, Debug)]
pub struct X402Config {
    pub facilitator_url: Url,
    pub network: SolanaNetwork,
    /// Overrides the network's public RPC endpoint when set.
    pub rpc_url: Option<Url>,
    /// Account expected to pay network fees during settlement.
    pub fee_payer: Address,
    pub aggregator: Option<AggregatorConfig>,
}

impl Default for X402Config {
    fn default() -> Self {
        Self {
            facilitator_url: Url::parse(DEFAULT_FACILITATOR_URL)
                .expect("default facilitator URL is valid"),
            network: SolanaNetwork::Mainnet,
            rpc_url: None,
            fee_payer: Address::new(DEFAULT_FEE_PAYER),
            aggregator: None,
        }
    }
}

impl X402Config {
    pub fn new(network: SolanaNetwork) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    pub fn with_facilitator_url(mut self, url: Url) -> Self {
        self.facilitator_url = url;
        self
    }

    pub fn with_rpc_url(mut self, url: Url) -> Self {
        self.rpc_url = Some(url);
        self
    }

    pub fn with_fee_payer(mut self, fee_payer: Address) -> Self {
        self.fee_payer = fee_payer;
        self
    }

    pub fn with_aggregator(mut self, aggregator: AggregatorConfig) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    /// Builds the facilitator router this configuration describes. The
    /// backend decision is made here, once.
    pub fn router(&self) -> Result<FacilitatorRouter, FacilitatorError> {
        let direct = DirectFacilitator::try_from(self.facilitator_url.as_str())?;
        match &self.aggregator {
            Some(aggregator) => Ok(FacilitatorRouter::aggregator(
                AggregatorFacilitator::try_new(
                    aggregator.endpoint.clone(),
                    aggregator.api_key.clone(),
                )?,
                direct,
            )),
            None => Ok(FacilitatorRouter::direct(direct)),
        }
    }

    /// Connects an RPC client to the configured or network-default endpoint.
    pub fn rpc_client(&self) -> RpcClient {
        let url = self
            .rpc_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| self.network.rpc_url().to_string());
        RpcClient::new(url)
    }
}
