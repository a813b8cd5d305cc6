use bitcoin::bech32::{hrp, Hrp};
use bitcoin::Network;
use serde::Deserialize;

use crate::error::AppError;

/// おつり出力を作成する最小額 (これ以下は手数料に含める)
pub const DUST_LIMIT_SATS: u64 = 546;

const LIVENET_API_URL: &str = "https://blockstream.info/api/";
const TESTNET_API_URL: &str = "https://mempool.space/testnet4/api/";

// 本番用ブリッジアドレスは未確定のため、livenet では明示的な指定が必要
const TESTNET_BRIDGE_ADDRESS: &str = "mxV7UsYMscwht4TWMrnSYtN4ccBmx8kdsg";

/// ブリッジ送金リクエストを記述した入力JSON。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    pub address: String,
    pub pubkey_hex: String,
    pub amount_sats: u64,
    /// 省略時はデータプロバイダの確認済みUTXO合計を使う
    #[serde(default)]
    pub balance_confirmed_sats: Option<u64>,
    pub fee_rate_sats_per_vb: u64,
    pub chain_id: i64,
    pub evm_address: String,
    #[serde(default)]
    pub bridge_address: Option<String>,
}

/// ネットワークごとの定数表。プロセス全体の可変状態にはせず、構築して渡す。
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    pub name: String,
    pub network: Network,
    pub api_base_url: String,
    pub bridge_address: Option<String>,
    pub pubkey_hash_version: u8,
    pub script_hash_version: u8,
    pub hrp: Hrp,
    pub dust_limit: u64,
}

impl NetworkProfile {
    pub fn livenet() -> Self {
        NetworkProfile {
            name: "livenet".to_string(),
            network: Network::Bitcoin,
            api_base_url: LIVENET_API_URL.to_string(),
            bridge_address: None,
            pubkey_hash_version: 0x00,
            script_hash_version: 0x05,
            hrp: hrp::BC,
            dust_limit: DUST_LIMIT_SATS,
        }
    }

    pub fn testnet() -> Self {
        NetworkProfile {
            name: "testnet".to_string(),
            network: Network::Testnet,
            api_base_url: TESTNET_API_URL.to_string(),
            bridge_address: Some(TESTNET_BRIDGE_ADDRESS.to_string()),
            pubkey_hash_version: 0x6f,
            script_hash_version: 0xc4,
            hrp: hrp::TB,
            dust_limit: DUST_LIMIT_SATS,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, AppError> {
        match name {
            "livenet" => Ok(Self::livenet()),
            "testnet" => Ok(Self::testnet()),
            s => Err(AppError::InvalidNetwork(s.to_string())),
        }
    }

    pub fn with_bridge_address(mut self, address: impl Into<String>) -> Self {
        self.bridge_address = Some(address.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn bridge_address(&self) -> Result<&str, AppError> {
        self.bridge_address
            .as_deref()
            .ok_or_else(|| AppError::MissingBridgeAddress(self.name.clone()))
    }
}
