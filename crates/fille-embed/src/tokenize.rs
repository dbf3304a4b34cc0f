use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Tokenize a batch into `[B, T]` id and mask tensors, where `T` is the longest
/// sequence in the batch after truncation to `max_len`.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, pad_id: u32, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut rows = Vec::with_capacity(texts.len());
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        truncate_keep_last(&mut ids, max_len);
        truncate_keep_last(&mut mask, max_len);
        rows.push((ids, mask));
    }
    let seq_len = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);
    let mut flat_ids = Vec::with_capacity(rows.len() * seq_len);
    let mut flat_mask = Vec::with_capacity(rows.len() * seq_len);
    for (mut ids, mut mask) in rows {
        pad_to(&mut ids, &mut mask, seq_len, pad_id);
        flat_ids.extend(ids);
        flat_mask.extend(mask);
    }
    let input_ids = Tensor::from_vec(flat_ids, (texts.len(), seq_len), device)?;
    let attention_mask = Tensor::from_vec(flat_mask, (texts.len(), seq_len), device)?;
    Ok((input_ids, attention_mask))
}

/// Truncate to `max_len`, keeping the final token so a trailing `[SEP]` survives.
fn truncate_keep_last(values: &mut Vec<u32>, max_len: usize) {
    if values.len() <= max_len || max_len == 0 { return; }
    let last = values[values.len() - 1];
    values.truncate(max_len);
    values[max_len - 1] = last;
}

fn pad_to(ids: &mut Vec<u32>, mask: &mut Vec<u32>, len: usize, pad_id: u32) {
    if ids.len() < len {
        let pad = len - ids.len();
        ids.extend(std::iter::repeat(pad_id).take(pad));
        mask.extend(std::iter::repeat(0).take(pad));
    }
}
