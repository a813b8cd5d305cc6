use std::path::PathBuf;
use bitcoin::psbt::Error as BitcoinPsbtError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONパースエラー ファイル: {file_path:?}, 詳細: {source}")]
    JsonParse {
        file_path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("PSBT構築エラー: {0}")]
    Psbt(#[from] BitcoinPsbtError),

    #[error("16進数デコードエラー: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("無効なネットワーク: {0}")]
    InvalidNetwork(String),

    #[error("無効なアドレス: {0}")]
    InvalidAddress(String),

    #[error("未対応のアドレスタイプ: {0}")]
    UnsupportedAddressType(String),

    #[error("無効なチェーンID: {0}")]
    InvalidChainId(i64),

    #[error("無効な公開鍵: {0}")]
    InvalidPublicKey(String),

    #[error("ブリッジアドレスが設定されていません (ネットワーク: {0})")]
    MissingBridgeAddress(String),

    #[error("残高不足: 確認済み残高 {available} sats, 要求額 {required} sats (最大手数料 {fee} sats を含む)")]
    InsufficientBalance {
        available: u64,
        required: u64,
        fee: u64,
    },

    #[error("データプロバイダエラー: {0}")]
    DataProvider(String),

    #[error("入力検証エラー: {0}")]
    InputValidation(String),

    #[error("トランザクション構築エラー: {0}")]
    TransactionBuild(String),
}

impl From<minreq::Error> for AppError {
    fn from(e: minreq::Error) -> Self {
        AppError::DataProvider(format!("HTTPリクエスト失敗: {}", e))
    }
}
