use clap::Parser;
use std::path::PathBuf;
use crate::config::NetworkProfile;
use crate::error::AppError;
use crate::provider::DEFAULT_TIMEOUT_SECS;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// ブリッジ送金リクエストを記述したJSONファイルへのパス
    #[clap(short, long, value_parser)]
    pub input_file: PathBuf,

    /// 生成された未署名PSBT (16進数) を保存するファイルへのパス
    #[clap(short, long, value_parser)]
    pub output_file: PathBuf,

    /// 使用するネットワーク ("livenet", "testnet")
    #[clap(short, long, value_parser, default_value = "testnet")]
    pub network: String,

    /// ネットワーク既定のブリッジアドレスを上書きする
    #[clap(long, value_parser)]
    pub bridge_address: Option<String>,

    /// ネットワーク既定のEsplora APIのURLを上書きする
    #[clap(long, value_parser)]
    pub esplora_url: Option<String>,

    /// データプロバイダへのリクエストのタイムアウト (秒)
    #[clap(long, value_parser, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

/// ネットワーク名と上書き指定からネットワーク定数を決める。
pub fn resolve_profile(args: &CliArgs, config_bridge: Option<&str>) -> Result<NetworkProfile, AppError> {
    let mut profile = NetworkProfile::from_name(&args.network)?;
    // コマンドライン指定を入力ファイルより優先する
    if let Some(bridge) = args.bridge_address.as_deref().or(config_bridge) {
        profile = profile.with_bridge_address(bridge);
    }
    if let Some(url) = &args.esplora_url {
        profile = profile.with_api_base_url(url.as_str());
    }
    Ok(profile)
}
