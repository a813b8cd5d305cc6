use std::collections::BTreeMap;
use std::fmt;
use bitcoin::{CompressedPublicKey, Transaction, Txid};

/// 入出力の支払い条件によるアドレス分類。
/// `OpReturn` はサイズ見積もり用のマーカーで、入力には現れない。
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressClass {
    P2pkh,
    P2shP2wpkh,
    P2wpkh,
    P2tr,
    OpReturn,
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AddressClass::P2pkh => "p2pkh",
            AddressClass::P2shP2wpkh => "p2sh-p2wpkh",
            AddressClass::P2wpkh => "p2wpkh",
            AddressClass::P2tr => "p2tr",
            AddressClass::OpReturn => "op_return",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TxPart {
    Input,
    Output,
}

/// データプロバイダから取得した確認済みUTXO。
/// `pubkey` と `prev_tx` はアドレス分類に応じて後から埋められる。
#[derive(Debug, Clone)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    pub value: u64,
    pub pubkey: Option<CompressedPublicKey>,
    pub prev_tx: Option<Transaction>,
}

impl Utxo {
    pub fn new(txid: Txid, vout: u32, value: u64) -> Self {
        Utxo { txid, vout, value, pubkey: None, prev_tx: None }
    }
}

/// 分類ごとの入出力数。
/// 出力側の `OpReturn` エントリは個数ではなくデータのバイト長を表す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeManifest {
    pub inputs: BTreeMap<AddressClass, usize>,
    pub outputs: BTreeMap<AddressClass, usize>,
}

impl SizeManifest {
    pub fn set_inputs(&mut self, class: AddressClass, count: usize) {
        self.inputs.insert(class, count);
    }

    pub fn add_outputs(&mut self, class: AddressClass, count: usize) {
        *self.outputs.entry(class).or_insert(0) += count;
    }

    /// 出力数を1つ減らす。0になったらエントリごと削除する。
    pub fn remove_output(&mut self, class: AddressClass) {
        match self.outputs.get(&class).copied() {
            Some(n) if n > 1 => {
                self.outputs.insert(class, n - 1);
            }
            Some(_) => {
                self.outputs.remove(&class);
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_output_decrements_then_deletes() {
        let mut manifest = SizeManifest::default();
        manifest.add_outputs(AddressClass::P2pkh, 2);
        manifest.remove_output(AddressClass::P2pkh);
        assert_eq!(manifest.outputs.get(&AddressClass::P2pkh), Some(&1));
        manifest.remove_output(AddressClass::P2pkh);
        assert!(!manifest.outputs.contains_key(&AddressClass::P2pkh));
        manifest.remove_output(AddressClass::P2pkh);
        assert!(manifest.outputs.is_empty());
    }
}
