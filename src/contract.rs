//! Settlement contract call construction.
//!
//! Bets and resolutions are settled on-chain by the prediction market contract.
//! This module only builds the transaction requests a wallet should submit; it
//! never signs or sends anything.

use serde::Serialize;
use serde_json::{json, Value};

use crate::amount::{parse_ether, TokenAmount};
use crate::error::{LedgerError, LedgerResult};
use crate::models::Visibility;

/// Base mainnet
pub const DEFAULT_CHAIN_ID: u64 = 8453;
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x1234567890123456789012345678901234567890";
pub const DEFAULT_PAYMASTER_URL: &str = "https://paymaster.base.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    pub address: String,
    pub chain_id: u64,
    pub paymaster_url: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            paymaster_url: DEFAULT_PAYMASTER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    pub address: String,
    pub function_name: &'static str,
    /// uint256 arguments are decimal strings
    pub args: Vec<Value>,
    /// Wei attached to a payable call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<TokenAmount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymasterService {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub paymaster_service: PaymasterService,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub chain_id: u64,
    pub contracts: Vec<ContractCall>,
    pub capabilities: Capabilities,
}

impl ContractConfig {
    fn request(&self, function_name: &'static str, args: Vec<Value>, value: Option<TokenAmount>) -> TransactionRequest {
        TransactionRequest {
            chain_id: self.chain_id,
            contracts: vec![ContractCall {
                address: self.address.clone(),
                function_name,
                args,
                value,
            }],
            capabilities: Capabilities {
                paymaster_service: PaymasterService {
                    url: self.paymaster_url.clone(),
                },
            },
        }
    }

    /// `bet(marketId, outcome)`, paying `amount_ether` converted to wei.
    pub fn bet(&self, market_index: u64, outcome: bool, amount_ether: &str) -> LedgerResult<TransactionRequest> {
        let wei = parse_ether(amount_ether)?;
        if wei.is_zero() {
            return Err(LedgerError::Validation("Bet value must be greater than zero".into()));
        }
        Ok(self.request(
            "bet",
            vec![json!(market_index.to_string()), json!(outcome)],
            Some(wei),
        ))
    }

    pub fn create_market(
        &self,
        question: &str,
        description: &str,
        expires_at: i64,
        category: &str,
        visibility: Visibility,
        access_list: &[String],
    ) -> TransactionRequest {
        self.request(
            "createMarket",
            vec![
                json!(question),
                json!(description),
                json!(expires_at.to_string()),
                json!(category),
                json!(visibility.contract_code()),
                json!(access_list),
            ],
            None,
        )
    }

    pub fn resolve_market(&self, market_index: u64, outcome: bool) -> TransactionRequest {
        self.request(
            "resolveMarket",
            vec![json!(market_index.to_string()), json!(outcome)],
            None,
        )
    }

    pub fn claim_winnings(&self, market_index: u64) -> TransactionRequest {
        self.request("claimWinnings", vec![json!(market_index.to_string())], None)
    }
}
