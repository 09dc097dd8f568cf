//! Aggregate of several loading tokens

use super::{LoadingToken, TokenStage};

/// Several loads driven as one
///
/// Pre-loaded and completed are the logical AND over all members, so an
/// empty aggregate is both.
#[derive(Debug, Default)]
pub struct MultiToken {
    tokens: Vec<LoadingToken>,
}

impl MultiToken {
    #[must_use]
    pub fn new(tokens: Vec<LoadingToken>) -> Self {
        Self { tokens }
    }

    /// Advance every member, returning the least advanced stage
    pub fn advance(&mut self) -> TokenStage {
        self.tokens
            .iter_mut()
            .map(LoadingToken::advance)
            .min()
            .unwrap_or(TokenStage::Completed)
    }

    #[must_use]
    pub fn is_preloaded(&self) -> bool {
        self.tokens.iter().all(LoadingToken::is_preloaded)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.tokens.iter().all(LoadingToken::is_completed)
    }

    /// Commit every member; returns how many commits took effect
    pub fn commit(&mut self) -> usize {
        self.tokens.iter_mut().filter_map(|t| t.commit().then_some(())).count()
    }

    /// Mean progress of the members
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.tokens.is_empty() {
            return 1.0;
        }
        let total: f32 = self.tokens.iter().map(LoadingToken::progress).sum();
        total / self.tokens.len() as f32
    }

    /// Member tokens in insertion order
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &[LoadingToken] {
        &self.tokens
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
