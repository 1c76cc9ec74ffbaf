use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use candle_core::{DType, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::utils::apply_repeat_penalty;

use crate::{ModelError, SamplingParams};

/// Per-call token sampler: repetition penalty, n-gram blocking, then
/// temperature / top-k / top-p sampling.
pub struct TokenSampler {
    processor: LogitsProcessor,
    repetition_penalty: f32,
    no_repeat_ngram_size: usize,
}

impl TokenSampler {
    pub fn new(params: &SamplingParams) -> Self {
        let seed = params.seed.unwrap_or_else(clock_seed);
        let sampling = Sampling::TopKThenTopP {
            k: params.top_k,
            p: params.top_p,
            temperature: params.temperature,
        };
        Self {
            processor: LogitsProcessor::from_sampling(seed, sampling),
            repetition_penalty: params.repetition_penalty,
            no_repeat_ngram_size: params.no_repeat_ngram_size,
        }
    }

    /// Pick the next token given last-position logits and every token seen so far.
    pub fn sample(&mut self, logits: &Tensor, context: &[u32]) -> Result<u32, ModelError> {
        let logits = logits.to_dtype(DType::F32)?;
        let logits = if (self.repetition_penalty - 1.0).abs() > f32::EPSILON {
            apply_repeat_penalty(&logits, self.repetition_penalty, context)?
        } else {
            logits
        };

        let banned = banned_ngram_tokens(context, self.no_repeat_ngram_size);
        let logits = if banned.is_empty() {
            logits
        } else {
            let mut values = logits.to_vec1::<f32>()?;
            for token in banned {
                if let Some(v) = values.get_mut(token as usize) {
                    *v = f32::NEG_INFINITY;
                }
            }
            Tensor::new(values.as_slice(), logits.device())?
        };

        Ok(self.processor.sample(&logits)?)
    }
}

/// Tokens that would complete an n-gram already present in `tokens`.
///
/// The last `n - 1` tokens form the prefix; every token that followed
/// the same prefix earlier is banned.
pub fn banned_ngram_tokens(tokens: &[u32], n: usize) -> HashSet<u32> {
    let mut banned = HashSet::new();
    if n == 0 || tokens.len() < n {
        return banned;
    }

    let prefix = &tokens[tokens.len() - (n - 1)..];
    for window in tokens.windows(n) {
        if &window[..n - 1] == prefix {
            banned.insert(window[n - 1]);
        }
    }
    banned
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(299_792_458)
}
