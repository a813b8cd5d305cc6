use bitcoin::{
    absolute::LockTime, psbt::Psbt, secp256k1::XOnlyPublicKey, transaction::Version, OutPoint,
    ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};

use crate::error::AppError;

/// 入力の支払い条件ごとに署名者へ渡す情報
#[derive(Debug, Clone)]
pub enum InputSpend {
    /// P2PKH: 参照元トランザクション全体
    Legacy { prev_tx: Transaction },
    /// P2SH-P2WPKH: redeem script と参照元出力
    NestedSegwit { redeem_script: ScriptBuf, witness_utxo: TxOut },
    /// P2WPKH: 参照元出力
    Segwit { witness_utxo: TxOut },
    /// P2TR: x-only 内部鍵と参照元出力
    Taproot { internal_key: XOnlyPublicKey, witness_utxo: TxOut },
}

/// 未署名トランザクションを組み立て、PSBTとして書き出す。
/// スクリプトテンプレートやシリアライズは bitcoin クレートに任せる。
#[derive(Debug, Default)]
pub struct TransactionAssembler {
    inputs: Vec<(OutPoint, InputSpend)>,
    outputs: Vec<TxOut>,
}

impl TransactionAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, previous_output: OutPoint, spend: InputSpend) {
        self.inputs.push((previous_output, spend));
    }

    pub fn add_output(&mut self, output: TxOut) {
        self.outputs.push(output);
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn finish(self) -> Result<Psbt, AppError> {
        let (outpoints, spends): (Vec<_>, Vec<_>) = self.inputs.into_iter().unzip();

        let unsigned_tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: outpoints
                .into_iter()
                .map(|previous_output| TxIn {
                    previous_output,
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: self.outputs,
        };

        let mut psbt = Psbt::from_unsigned_tx(unsigned_tx)?;
        for (input, spend) in psbt.inputs.iter_mut().zip(spends) {
            match spend {
                InputSpend::Legacy { prev_tx } => {
                    input.non_witness_utxo = Some(prev_tx);
                }
                InputSpend::NestedSegwit { redeem_script, witness_utxo } => {
                    input.redeem_script = Some(redeem_script);
                    input.witness_utxo = Some(witness_utxo);
                }
                InputSpend::Segwit { witness_utxo } => {
                    input.witness_utxo = Some(witness_utxo);
                }
                InputSpend::Taproot { internal_key, witness_utxo } => {
                    input.tap_internal_key = Some(internal_key);
                    input.witness_utxo = Some(witness_utxo);
                }
            }
        }

        Ok(psbt)
    }
}
