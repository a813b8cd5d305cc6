use crate::error::AppError;
use crate::types::{AddressClass, SizeManifest, TxPart};

/// version, locktime, 入出力数フィールドの見積もり
const TX_OVERHEAD_VBYTES: u64 = 11;

// OP_RETURN 1 byte + データ長 1 byte + 金額 8 bytes
const OP_RETURN_EXTRA_VBYTES: u64 = 10;

/// 分類ごとの入力/出力1つあたりの推定vbyte。
pub fn part_vbytes(class: AddressClass, part: TxPart) -> Result<u64, AppError> {
    let (input, output) = match class {
        AddressClass::P2pkh => (148, 34),
        AddressClass::P2shP2wpkh => (107, 32),
        AddressClass::P2wpkh => (68, 32),
        AddressClass::P2tr => (58, 43),
        AddressClass::OpReturn => {
            return Err(AppError::UnsupportedAddressType(format!(
                "{} に固定サイズはありません",
                class
            )));
        }
    };

    Ok(match part {
        TxPart::Input => input,
        TxPart::Output => output,
    })
}

/// マニフェストからトランザクションの推定サイズ (vbyte) を求める。
pub fn estimate_vbytes(manifest: &SizeManifest) -> Result<u64, AppError> {
    let mut size = TX_OVERHEAD_VBYTES;

    for (&class, &count) in &manifest.inputs {
        let part = part_vbytes(class, TxPart::Input)?.checked_mul(count as u64);
        size = part.and_then(|p| size.checked_add(p)).ok_or_else(size_overflow)?;
    }

    for (&class, &count) in &manifest.outputs {
        let part = match class {
            AddressClass::OpReturn => (count as u64).checked_add(OP_RETURN_EXTRA_VBYTES),
            _ => part_vbytes(class, TxPart::Output)?.checked_mul(count as u64),
        };
        size = part.and_then(|p| size.checked_add(p)).ok_or_else(size_overflow)?;
    }

    Ok(size)
}

fn size_overflow() -> AppError {
    AppError::InputValidation("推定サイズの計算がオーバーフローしました".to_string())
}

/// 手数料 = vbyte × 手数料率。途中で丸めない。
pub fn fee_for(manifest: &SizeManifest, fee_rate_sats_per_vb: u64) -> Result<u64, AppError> {
    let vbytes = estimate_vbytes(manifest)?;
    vbytes.checked_mul(fee_rate_sats_per_vb).ok_or_else(|| {
        AppError::InputValidation(format!(
            "手数料が大きすぎます: {} vB × {} sats/vB",
            vbytes, fee_rate_sats_per_vb
        ))
    })
}
