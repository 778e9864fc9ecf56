//! BPE token counting backed by `tiktoken-rs`.
//!
//! Encodings are loaded lazily on first use and cached by encoding, so every
//! model that shares `cl100k_base` shares one `CoreBPE`.

use std::sync::Arc;

use dashmap::DashMap;
use parley_core::tokens::{CharEstimateCounter, TokenCounter};
use tiktoken_rs::CoreBPE;
use tiktoken_rs::tokenizer::{Tokenizer, get_tokenizer};

/// Encoding used for models tiktoken does not recognise.
const FALLBACK: Tokenizer = Tokenizer::Cl100kBase;

#[derive(Default)]
pub struct TiktokenCounter {
    encodings: DashMap<Tokenizer, Arc<CoreBPE>>,
}

impl TiktokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The encoding `model` is counted with.
    pub fn tokenizer_for(model: &str) -> Tokenizer {
        get_tokenizer(model).unwrap_or_else(|| {
            tracing::debug!(model, "unknown model, counting with cl100k_base");
            FALLBACK
        })
    }

    fn encoding(&self, tokenizer: Tokenizer) -> Option<Arc<CoreBPE>> {
        if let Some(bpe) = self.encodings.get(&tokenizer) {
            return Some(Arc::clone(bpe.value()));
        }
        match tiktoken_rs::get_bpe_from_tokenizer(tokenizer) {
            Ok(bpe) => {
                let bpe = Arc::new(bpe);
                self.encodings.insert(tokenizer, Arc::clone(&bpe));
                tracing::debug!(?tokenizer, "loaded encoding");
                Some(bpe)
            }
            Err(err) => {
                tracing::warn!(?tokenizer, error = %err, "failed to load encoding");
                None
            }
        }
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, model: &str, text: &str) -> u32 {
        let tokenizer = Self::tokenizer_for(model);
        let bpe = self.encoding(tokenizer).or_else(|| {
            if tokenizer == FALLBACK {
                None
            } else {
                self.encoding(FALLBACK)
            }
        });
        match bpe {
            Some(bpe) => {
                let tokens = bpe.encode_with_special_tokens(text).len();
                u32::try_from(tokens).unwrap_or(u32::MAX)
            }
            None => CharEstimateCounter::estimate(text),
        }
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("loaded", &self.encodings.len())
            .finish()
    }
}
