use bitcoin::base58;
use bitcoin::bech32::segwit;

use crate::config::NetworkProfile;
use crate::error::AppError;
use crate::types::AddressClass;

/// アドレス文字列を支払い条件の分類に変換する。
///
/// base58check を先に試し、バージョンバイトがネットワークの P2PKH/P2SH に一致しなければ
/// bech32/bech32m を試す。別ネットワークのアドレスはどちらにも一致せずエラーになる。
pub fn classify(address: &str, profile: &NetworkProfile) -> Result<AddressClass, AppError> {
    if let Some(class) = classify_base58(address, profile) {
        return Ok(class);
    }

    let (hrp, version, _program) = segwit::decode(address)
        .map_err(|e| AppError::InvalidAddress(format!("{} ({})", address, e)))?;

    if hrp != profile.hrp {
        return Err(AppError::InvalidAddress(format!(
            "{} (HRP {} はネットワーク {} と一致しません)",
            address, hrp, profile.name
        )));
    }

    match version.to_u8() {
        0 => Ok(AddressClass::P2wpkh),
        1 => Ok(AddressClass::P2tr),
        v => Err(AppError::InvalidAddress(format!(
            "{} (未対応のwitnessバージョン {})",
            address, v
        ))),
    }
}

fn classify_base58(address: &str, profile: &NetworkProfile) -> Option<AddressClass> {
    let payload = base58::decode_check(address).ok()?;
    if payload.len() != 21 {
        return None;
    }

    match payload[0] {
        v if v == profile.pubkey_hash_version => Some(AddressClass::P2pkh),
        v if v == profile.script_hash_version => Some(AddressClass::P2shP2wpkh),
        _ => None,
    }
}
