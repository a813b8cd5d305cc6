use crate::types::Utxo;

/// 先頭から順に合計が `target` 以上になるまでUTXOを取り出す。
/// 全て使っても足りない場合は全件を返し、不足の判定は呼び出し側に任せる。
pub fn select_utxos(utxos: &[Utxo], target: u64) -> &[Utxo] {
    let mut accumulated = 0u64;
    for (i, utxo) in utxos.iter().enumerate() {
        accumulated = accumulated.saturating_add(utxo.value);
        if accumulated >= target {
            return &utxos[..=i];
        }
    }
    utxos
}
