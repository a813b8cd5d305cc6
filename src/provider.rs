//! ブロックチェーンデータプロバイダ (Esplora互換API) とのやり取り。

use std::str::FromStr;
use bitcoin::Txid;
use serde::Deserialize;

use crate::error::AppError;
use crate::types::Utxo;

/// リクエストのデフォルトタイムアウト (秒)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// UTXO一覧と生トランザクションを取得する外部サービス。
pub trait UtxoSource {
    /// アドレスの確認済みUTXOを取得する (未確認のものは除外)。
    fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, AppError>;

    /// トランザクション全体を16進文字列で取得する。
    fn fetch_tx_hex(&self, txid: &Txid) -> Result<String, AppError>;
}

#[derive(Deserialize, Debug)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    status: EsploraStatus,
}

#[derive(Deserialize, Debug)]
struct EsploraStatus {
    confirmed: bool,
}

#[derive(Debug, Clone)]
pub struct EsploraClient {
    base_url: String,
    timeout_secs: u64,
}

impl EsploraClient {
    pub fn new(base_url: &str) -> Self {
        EsploraClient {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn get(&self, path: &str) -> Result<minreq::Response, AppError> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("GET {}", url);

        let response = minreq::get(&url).with_timeout(self.timeout_secs).send()?;
        if !(200..300).contains(&response.status_code) {
            return Err(AppError::DataProvider(format!(
                "{} がステータス {} を返しました: {}",
                url, response.status_code, response.reason_phrase
            )));
        }
        Ok(response)
    }
}

impl UtxoSource for EsploraClient {
    fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, AppError> {
        let response = self.get(&format!("address/{}/utxo", address))?;
        let entries: Vec<EsploraUtxo> = response
            .json()
            .map_err(|e| AppError::DataProvider(format!("UTXO一覧のパースに失敗: {}", e)))?;

        confirmed_utxos(entries)
    }

    fn fetch_tx_hex(&self, txid: &Txid) -> Result<String, AppError> {
        let response = self.get(&format!("tx/{}/hex", txid))?;
        let body = response
            .as_str()
            .map_err(|e| AppError::DataProvider(format!("トランザクション本文の読み込みに失敗: {}", e)))?;
        Ok(body.trim().to_owned())
    }
}

fn confirmed_utxos(entries: Vec<EsploraUtxo>) -> Result<Vec<Utxo>, AppError> {
    let mut utxos = Vec::new();
    for entry in entries {
        if !entry.status.confirmed {
            log::debug!("未確認UTXOをスキップ: {}:{}", entry.txid, entry.vout);
            continue;
        }
        let txid = Txid::from_str(&entry.txid)
            .map_err(|e| AppError::DataProvider(format!("無効なTXID形式 ({}): {}", entry.txid, e)))?;
        utxos.push(Utxo::new(txid, entry.vout, entry.value));
    }
    Ok(utxos)
}
