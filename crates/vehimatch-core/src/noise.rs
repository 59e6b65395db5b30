//! Noise generator.
//!
//! Corrupts a canonical `(make, model, year)` triple into human-like query
//! strings using five strategies: a typo in the model, a typo in the make,
//! the make's abbreviation, a shuffled token order, and a dropped token.
//!
//! Generation is stateless apart from the caller's RNG, so one
//! [`NoiseGenerator`] can be shared across threads. Every request has a
//! bounded attempt budget; when the strategy space of a record is too small
//! to yield the requested number of distinct strings, generation fails with
//! [`Error::GenerationExhausted`] instead of spinning.
//!
//! An empty model is a valid token equal to `""`. Strategies that touch it
//! produce the shorter `make + year` shape, because empty tokens are never
//! joined into the output.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

use crate::alias::AliasTable;
use crate::error::{Error, Result};
use crate::model::record::join_tokens;
use crate::model::{CanonicalRecord, NoiseType, NoisyQuery};

/// Attempts allowed per requested variant before giving up.
pub const DEFAULT_ATTEMPTS_PER_VARIANT: usize = 50;

/// One generated query string and the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub text: String,
    pub noise_type: NoiseType,
}

/// Produces distinct corrupted query strings for canonical records.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    aliases: Arc<AliasTable>,
    attempts_per_variant: usize,
}

impl NoiseGenerator {
    #[must_use]
    pub fn new(aliases: Arc<AliasTable>) -> Self {
        Self {
            aliases,
            attempts_per_variant: DEFAULT_ATTEMPTS_PER_VARIANT,
        }
    }

    /// Override the per-variant attempt budget (at least one).
    #[must_use]
    pub fn with_attempts_per_variant(mut self, attempts: usize) -> Self {
        self.attempts_per_variant = attempts.max(1);
        self
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Generate `n_variants` distinct query strings for one triple.
    ///
    /// Each attempt draws a strategy uniformly; a string that was already
    /// produced is discarded and another attempt is made. Output keeps the
    /// order in which distinct strings were first produced.
    ///
    /// # Errors
    /// Returns [`Error::GenerationExhausted`] if the attempt budget
    /// (`n_variants * attempts_per_variant`) runs out first.
    pub fn generate_variants<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        model_name: &str,
        make_name: &str,
        year: i32,
        n_variants: usize,
    ) -> Result<Vec<Variant>> {
        let mut seen = HashSet::with_capacity(n_variants);
        let mut variants = Vec::with_capacity(n_variants);
        let budget = n_variants.saturating_mul(self.attempts_per_variant);
        let mut attempts = 0;

        while variants.len() < n_variants {
            if attempts >= budget {
                return Err(Error::GenerationExhausted {
                    record: join_tokens(&[year.to_string().as_str(), make_name, model_name]),
                    requested: n_variants,
                    produced: variants.len(),
                    attempts,
                });
            }
            attempts += 1;

            let noise_type = NoiseType::ALL[rng.gen_range(0..NoiseType::ALL.len())];
            let text = self.apply(rng, noise_type, model_name, make_name, year);

            if seen.insert(text.clone()) {
                variants.push(Variant { text, noise_type });
            }
        }

        log::trace!(
            "Generated {} variants for {} {} {} in {} attempts",
            variants.len(),
            year,
            make_name,
            model_name,
            attempts
        );
        Ok(variants)
    }

    /// Generate noisy queries for a record, carrying it along as ground truth.
    pub fn noisy_queries<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        record: &CanonicalRecord,
        n_variants: usize,
    ) -> Result<Vec<NoisyQuery>> {
        let variants =
            self.generate_variants(rng, &record.model, &record.make, record.year, n_variants)?;
        Ok(variants
            .into_iter()
            .map(|v| NoisyQuery::new(v.text, v.noise_type, record.clone()))
            .collect())
    }

    /// Apply a single strategy to a triple.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        noise_type: NoiseType,
        model_name: &str,
        make_name: &str,
        year: i32,
    ) -> String {
        let year = year.to_string();
        match noise_type {
            NoiseType::TypoModel => {
                join_tokens(&[year.as_str(), make_name, typo_variant(rng, model_name).as_str()])
            }
            NoiseType::TypoMake => {
                join_tokens(&[year.as_str(), typo_variant(rng, make_name).as_str(), model_name])
            }
            NoiseType::Abbrev => {
                let make = self.aliases.lookup(make_name).unwrap_or(make_name);
                join_tokens(&[year.as_str(), make, model_name])
            }
            NoiseType::Reorder => {
                let mut tokens = [year.as_str(), make_name, model_name];
                tokens.shuffle(rng);
                join_tokens(&tokens)
            }
            NoiseType::Drop => {
                let tokens = [year.as_str(), make_name, model_name];
                let dropped = rng.gen_range(0..tokens.len());
                let kept: Vec<&str> = tokens
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != dropped)
                    .map(|(_, t)| *t)
                    .collect();
                join_tokens(&kept)
            }
        }
    }
}

/// Swap two adjacent characters at a uniformly chosen position.
///
/// Words shorter than two characters come back unchanged.
pub fn typo_variant<R: Rng + ?Sized>(rng: &mut R, word: &str) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    if chars.len() < 2 {
        return word.to_string();
    }
    let i = rng.gen_range(0..chars.len() - 1);
    chars.swap(i, i + 1);
    chars.into_iter().collect()
}
