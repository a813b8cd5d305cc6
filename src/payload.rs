//! OP_RETURN に埋め込むブリッジ先情報 (チェーンID + EVMアドレス) のエンコード。
//!
//! 形式: RLPリスト [チェーンID (4 byte big-endian), アドレス (20 byte)] を16進文字列にしたもの。

use alloy_rlp::Header;

use crate::error::AppError;

pub const EVM_ADDRESS_LEN: usize = 20;

/// `0x` + 40桁の16進数か
pub fn is_valid_evm_address(address: &str) -> bool {
    address.len() == 2 + EVM_ADDRESS_LEN * 2
        && address.starts_with("0x")
        && address[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// チェーンIDを u32 に収まるか検証する。
pub fn check_chain_id(chain_id: i64) -> Result<u32, AppError> {
    u32::try_from(chain_id).map_err(|_| AppError::InvalidChainId(chain_id))
}

pub fn encode_bridge_payload(chain_id: u32, evm_address: &str) -> Result<String, AppError> {
    if !is_valid_evm_address(evm_address) {
        return Err(AppError::InvalidAddress(format!(
            "EVMアドレスの形式が不正です: {}",
            evm_address
        )));
    }

    let chain_id_bytes = chain_id.to_be_bytes();
    let address_bytes = hex::decode(&evm_address[2..])?;

    let mut out = Vec::new();
    alloy_rlp::encode_list::<_, [u8]>(&[&chain_id_bytes[..], &address_bytes[..]], &mut out);
    Ok(hex::encode(out))
}

/// `encode_bridge_payload` の逆変換。
pub fn decode_bridge_payload(payload_hex: &str) -> Result<(u32, [u8; EVM_ADDRESS_LEN]), AppError> {
    let bytes = hex::decode(payload_hex)?;
    let mut buf = bytes.as_slice();

    let mut list = Header::decode_bytes(&mut buf, true).map_err(invalid_payload)?;
    if !buf.is_empty() {
        return Err(AppError::InputValidation("ペイロード末尾に余分なデータがあります".to_string()));
    }

    let chain_id = Header::decode_bytes(&mut list, false).map_err(invalid_payload)?;
    let address = Header::decode_bytes(&mut list, false).map_err(invalid_payload)?;
    if !list.is_empty() {
        return Err(AppError::InputValidation("ペイロードの要素数が2ではありません".to_string()));
    }

    let chain_id: [u8; 4] = chain_id
        .try_into()
        .map_err(|_| AppError::InputValidation(format!("チェーンIDの長さが不正です: {}", chain_id.len())))?;
    let address: [u8; EVM_ADDRESS_LEN] = address
        .try_into()
        .map_err(|_| AppError::InputValidation(format!("アドレスの長さが不正です: {}", address.len())))?;

    Ok((u32::from_be_bytes(chain_id), address))
}

fn invalid_payload(e: alloy_rlp::Error) -> AppError {
    AppError::InputValidation(format!("ペイロードのRLPデコード失敗: {}", e))
}
