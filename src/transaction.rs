use bitcoin::{
    consensus::encode, psbt::Psbt, script::PushBytesBuf, secp256k1::{All, Secp256k1, XOnlyPublicKey},
    Address, Amount, CompressedPublicKey, OutPoint, ScriptBuf, Transaction, TxOut,
};
use std::str::FromStr;

use crate::{
    address::classify,
    assembler::{InputSpend, TransactionAssembler},
    config::NetworkProfile,
    error::AppError,
    fee::{estimate_vbytes, fee_for},
    payload::{check_chain_id, decode_bridge_payload, encode_bridge_payload},
    provider::UtxoSource,
    selection::select_utxos,
    types::{AddressClass, SizeManifest, Utxo},
};

/// ブリッジ送金トランザクションの構築要求
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub profile: NetworkProfile,
    pub address: String,
    pub pubkey_hex: String,
    pub amount_sats: u64,
    /// None の場合は取得した確認済みUTXOの合計を残高とみなす
    pub balance_confirmed_sats: Option<u64>,
    pub fee_rate_sats_per_vb: u64,
    pub chain_id: i64,
    pub evm_address: String,
}

/// 外部ウォレットで署名するための未署名トランザクション
#[derive(Debug)]
pub struct BuiltTransaction {
    pub psbt: Psbt,
    /// 最終的な推定サイズ (vbyte)
    pub estimated_vsize: u64,
    /// 推定サイズから計算した手数料
    pub estimated_fee_sats: u64,
    /// 実際に支払う手数料 (ダストとして切り捨てたおつりを含む)
    pub fee_sats: u64,
    pub change_sats: Option<u64>,
}

// 入力検証 (I/O前) の結果
struct Prepared<'a> {
    source_class: AddressClass,
    source_script: ScriptBuf,
    bridge_class: AddressClass,
    bridge_script: ScriptBuf,
    pubkey: CompressedPublicKey,
    chain_id: u32,
    payload: String,
    bridge_address: &'a str,
}

pub fn build_bridge_transaction<S: UtxoSource>(
    request: &BuildRequest,
    source: &S,
    secp: &Secp256k1<All>,
) -> Result<BuiltTransaction, AppError> {
    log::info!("ブリッジ送金トランザクションの構築を開始します。");
    let profile = &request.profile;

    // 1. 入力検証 (ネットワークアクセスの前に行う)
    let prepared = prepare(request)?;
    log::info!(
        "送金元 = {} ({}), ブリッジ = {} ({})",
        request.address, prepared.source_class, prepared.bridge_address, prepared.bridge_class
    );
    if log::log_enabled!(log::Level::Debug) {
        let (chain_id, evm_address) = decode_bridge_payload(&prepared.payload)?;
        log::debug!(
            "ペイロード: {} (チェーンID {}, 受取先 0x{})",
            prepared.payload, chain_id, hex::encode(evm_address)
        );
    }

    // 2. 全UTXOを入力とした場合の最大手数料
    let all_utxos = source.fetch_utxos(&request.address)?;
    log::info!("確認済みUTXO {} 件を取得しました。", all_utxos.len());

    let mut manifest = SizeManifest::default();
    manifest.set_inputs(prepared.source_class, all_utxos.len());
    manifest.add_outputs(AddressClass::OpReturn, prepared.payload.len());
    if prepared.bridge_class == prepared.source_class {
        manifest.add_outputs(prepared.bridge_class, 2);
    } else {
        manifest.add_outputs(prepared.bridge_class, 1);
        manifest.add_outputs(prepared.source_class, 1);
    }
    let max_fee = fee_for(&manifest, request.fee_rate_sats_per_vb)?;
    let required = request.amount_sats.checked_add(max_fee).ok_or_else(|| {
        AppError::InputValidation(format!("必要額が大きすぎます: {} + {}", request.amount_sats, max_fee))
    })?;
    log::debug!("最大手数料: {} sats (必要額 {} sats)", max_fee, required);

    let balance = match request.balance_confirmed_sats {
        Some(balance) => balance,
        None => total_value(&all_utxos)?,
    };
    if balance < required {
        return Err(AppError::InsufficientBalance { available: balance, required, fee: max_fee });
    }

    // 3. 必要額を満たすまで先頭からUTXOを選ぶ
    let selected = select_utxos(&all_utxos, required);
    let selected_sum = total_value(selected)?;
    log::info!("UTXO {} 件を選択しました (合計 {} sats)。", selected.len(), selected_sum);

    // 4. 入力の追加
    let mut assembler = TransactionAssembler::new();
    for utxo in selected {
        let mut utxo = utxo.clone();
        utxo.pubkey = Some(prepared.pubkey);
        if prepared.source_class == AddressClass::P2pkh {
            utxo.prev_tx = Some(fetch_prev_tx(source, &utxo)?);
        }

        let spend = input_spend(&utxo, prepared.source_class, secp)?;
        log::debug!("入力追加: txid={}, vout={}, value={}", utxo.txid, utxo.vout, utxo.value);
        assembler.add_input(OutPoint::new(utxo.txid, utxo.vout), spend);
    }

    // 5. ブリッジへの送金出力と OP_RETURN 出力
    assembler.add_output(TxOut {
        value: Amount::from_sat(request.amount_sats),
        script_pubkey: prepared.bridge_script.clone(),
    });
    let data = PushBytesBuf::try_from(prepared.payload.as_bytes().to_vec())
        .map_err(|_| AppError::TransactionBuild(format!("OP_RETURNデータが大きすぎます: {} bytes", prepared.payload.len())))?;
    assembler.add_output(TxOut { value: Amount::ZERO, script_pubkey: ScriptBuf::new_op_return(data) });

    // 6. 実際の入力数で手数料を再計算し、おつり出力の有無を決める
    manifest.set_inputs(prepared.source_class, selected.len());
    let exact_fee = fee_for(&manifest, request.fee_rate_sats_per_vb)?;
    // exact_fee <= max_fee なので加算は required を超えない
    let exact_required = request.amount_sats + exact_fee;
    let leftover = selected_sum
        .checked_sub(exact_required)
        .ok_or(AppError::InsufficientBalance {
            available: selected_sum,
            required: exact_required,
            fee: exact_fee,
        })?;

    let change_sats = if leftover > profile.dust_limit {
        log::debug!("おつり発生: {} sats, おつりアドレス: {}", leftover, request.address);
        assembler.add_output(TxOut {
            value: Amount::from_sat(leftover),
            script_pubkey: prepared.source_script.clone(),
        });
        Some(leftover)
    } else {
        log::warn!(
            "おつり {} sats はダスト閾値 {} sats 以下のため手数料に含めます。",
            leftover, profile.dust_limit
        );
        manifest.remove_output(prepared.source_class);
        None
    };

    // 7. 署名用に返す
    let estimated_vsize = estimate_vbytes(&manifest)?;
    let output_count = assembler.output_count();
    let psbt = assembler.finish()?;
    let fee_sats = if change_sats.is_some() { exact_fee } else { exact_fee + leftover };
    log::info!("推定vsize: {} vB, 出力数: {}, 手数料: {} sats", estimated_vsize, output_count, fee_sats);

    Ok(BuiltTransaction {
        psbt,
        estimated_vsize,
        estimated_fee_sats: exact_fee,
        fee_sats,
        change_sats,
    })
}

fn prepare(request: &BuildRequest) -> Result<Prepared<'_>, AppError> {
    if request.amount_sats == 0 {
        return Err(AppError::InputValidation("送金額が0です".to_string()));
    }
    if request.fee_rate_sats_per_vb == 0 {
        return Err(AppError::InputValidation("手数料率が0です".to_string()));
    }
    let max_money = Amount::MAX_MONEY.to_sat();
    if request.amount_sats > max_money {
        return Err(AppError::InputValidation(format!(
            "送金額 {} sats が上限 {} sats を超えています",
            request.amount_sats, max_money
        )));
    }
    if request.fee_rate_sats_per_vb > max_money {
        return Err(AppError::InputValidation(format!(
            "手数料率 {} sats/vB が大きすぎます",
            request.fee_rate_sats_per_vb
        )));
    }

    let profile = &request.profile;
    let source_class = classify(&request.address, profile)?;
    let bridge_address = profile.bridge_address()?;
    let bridge_class = classify(bridge_address, profile)?;

    let pubkey = hex::decode(request.pubkey_hex.trim())
        .map_err(|e| AppError::InvalidPublicKey(format!("{} ({})", request.pubkey_hex, e)))
        .and_then(|bytes| {
            CompressedPublicKey::from_slice(&bytes)
                .map_err(|e| AppError::InvalidPublicKey(format!("{} ({})", request.pubkey_hex, e)))
        })?;
    let chain_id = check_chain_id(request.chain_id)?;
    let payload = encode_bridge_payload(chain_id, &request.evm_address)?;

    Ok(Prepared {
        source_class,
        source_script: script_pubkey_for(&request.address, profile)?,
        bridge_class,
        bridge_script: script_pubkey_for(bridge_address, profile)?,
        pubkey,
        chain_id,
        payload,
        bridge_address,
    })
}

fn script_pubkey_for(address: &str, profile: &NetworkProfile) -> Result<ScriptBuf, AppError> {
    let address = Address::from_str(address)
        .and_then(|addr| addr.require_network(profile.network))
        .map_err(|e| AppError::InvalidAddress(format!("{} ({})", address, e)))?;
    Ok(address.script_pubkey())
}

// P2PKH入力は参照元トランザクション全体が必要
fn fetch_prev_tx<S: UtxoSource>(source: &S, utxo: &Utxo) -> Result<Transaction, AppError> {
    let tx_hex = source.fetch_tx_hex(&utxo.txid)?;
    let tx_bytes = hex::decode(&tx_hex).map_err(|e| {
        AppError::DataProvider(format!("トランザクション {} の16進数デコードに失敗: {}", utxo.txid, e))
    })?;
    let tx: Transaction = encode::deserialize(&tx_bytes).map_err(|e| {
        AppError::DataProvider(format!("トランザクション {} のデシリアライズに失敗: {}", utxo.txid, e))
    })?;

    if tx.compute_txid() != utxo.txid {
        return Err(AppError::DataProvider(format!(
            "取得したトランザクションのTXIDが一致しません: 期待 {}, 実際 {}",
            utxo.txid,
            tx.compute_txid()
        )));
    }
    if tx.output.get(utxo.vout as usize).is_none() {
        return Err(AppError::DataProvider(format!(
            "トランザクション {} に出力 {} が存在しません",
            utxo.txid, utxo.vout
        )));
    }
    Ok(tx)
}

fn total_value(utxos: &[Utxo]) -> Result<u64, AppError> {
    utxos
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.value))
        .ok_or_else(|| AppError::DataProvider("UTXO合計額がオーバーフローしました".to_string()))
}

fn input_spend(utxo: &Utxo, class: AddressClass, secp: &Secp256k1<All>) -> Result<InputSpend, AppError> {
    let missing = |what: &str| AppError::TransactionBuild(format!("UTXO {}:{} に{}がありません", utxo.txid, utxo.vout, what));
    let value = Amount::from_sat(utxo.value);

    match class {
        AddressClass::P2pkh => {
            let prev_tx = utxo.prev_tx.clone().ok_or_else(|| missing("参照元トランザクション"))?;
            Ok(InputSpend::Legacy { prev_tx })
        }
        AddressClass::P2shP2wpkh => {
            let pubkey = utxo.pubkey.ok_or_else(|| missing("公開鍵"))?;
            let redeem_script = ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash());
            let script_pubkey = ScriptBuf::new_p2sh(&redeem_script.script_hash());
            Ok(InputSpend::NestedSegwit {
                redeem_script,
                witness_utxo: TxOut { value, script_pubkey },
            })
        }
        AddressClass::P2wpkh => {
            let pubkey = utxo.pubkey.ok_or_else(|| missing("公開鍵"))?;
            let script_pubkey = ScriptBuf::new_p2wpkh(&pubkey.wpubkey_hash());
            Ok(InputSpend::Segwit { witness_utxo: TxOut { value, script_pubkey } })
        }
        AddressClass::P2tr => {
            let pubkey = utxo.pubkey.ok_or_else(|| missing("公開鍵"))?;
            // 先頭のパリティバイトを除いた x-only 鍵
            let internal_key = XOnlyPublicKey::from_slice(&pubkey.to_bytes()[1..])
                .map_err(|e| AppError::InvalidPublicKey(e.to_string()))?;
            let script_pubkey = ScriptBuf::new_p2tr(secp, internal_key, None);
            Ok(InputSpend::Taproot { internal_key, witness_utxo: TxOut { value, script_pubkey } })
        }
        AddressClass::OpReturn => Err(AppError::UnsupportedAddressType(class.to_string())),
    }
}
