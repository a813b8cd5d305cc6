use std::fs::{self, File};
use std::io::Write;
use bitcoin::secp256k1::{All as AllContext, Secp256k1};
use clap::Parser;

mod address;
mod assembler;
mod cli;
mod config;
mod error;
mod fee;
mod payload;
mod provider;
mod selection;
mod transaction;
mod types;

use cli::{resolve_profile, CliArgs};
use config::InputConfig;
use error::AppError;
use provider::EsploraClient;
use transaction::BuildRequest;

fn main() -> Result<(), AppError> {
    env_logger::init();

    let args = CliArgs::parse();
    log::info!("アプリケーションを開始します。引数: {:?}", args);

    let input_file_content = fs::read_to_string(&args.input_file).map_err(|e| {
        log::error!("入力ファイルの読み込みに失敗しました: {:?}", args.input_file);
        AppError::Io(e)
    })?;

    let config: InputConfig = serde_json::from_str(&input_file_content).map_err(|e| {
        log::error!("入力JSONのパースに失敗しました。");
        AppError::JsonParse {
            file_path: args.input_file.clone(),
            source: e,
        }
    })?;
    log::debug!("入力設定ファイルのパース成功: {:?}", config);

    let profile = resolve_profile(&args, config.bridge_address.as_deref())?;
    log::info!("指定されたネットワーク: {} (API: {})", profile.name, profile.api_base_url);

    let client = EsploraClient::new(&profile.api_base_url).with_timeout(args.timeout_secs);
    let request = BuildRequest {
        profile,
        address: config.address,
        pubkey_hex: config.pubkey_hex,
        amount_sats: config.amount_sats,
        balance_confirmed_sats: config.balance_confirmed_sats,
        fee_rate_sats_per_vb: config.fee_rate_sats_per_vb,
        chain_id: config.chain_id,
        evm_address: config.evm_address,
    };

    let secp: Secp256k1<AllContext> = Secp256k1::new();
    let built = transaction::build_bridge_transaction(&request, &client, &secp)?;
    log::info!("未署名PSBTの生成に成功しました。");

    let psbt_hex = built.psbt.serialize_hex();
    log::info!("PSBT (base64): {}", built.psbt);
    println!("{}", psbt_hex);
    println!(
        "estimated_vsize={} fee_sats={} change_sats={}",
        built.estimated_vsize,
        built.fee_sats,
        built.change_sats.unwrap_or(0)
    );

    let mut output_file = File::create(&args.output_file).map_err(|e| {
        log::error!("出力ファイルの作成に失敗しました: {:?}", args.output_file);
        AppError::Io(e)
    })?;
    output_file.write_all(psbt_hex.as_bytes()).map_err(|e| {
        log::error!("出力ファイルへの書き込みに失敗しました。");
        AppError::Io(e)
    })?;
    log::info!("PSBTを {:?} に保存しました。", args.output_file);

    log::info!("処理が正常に完了しました。");
    Ok(())
}
