//! Token usage accounting for a session.

use crate::models::{Usage, UsageSummary};
use crate::services::catalog::ModelProfile;

/// Running token totals; never decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageCounter {
    totals: Usage,
    /// Completion calls that reported usage
    reported_calls: u64,
    /// Completion calls that came back without usage
    unreported_calls: u64,
}

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call's usage to the totals
    pub fn record(&mut self, usage: &Usage) {
        self.totals.merge(usage);
        self.reported_calls += 1;
    }

    /// Note a call that returned no usage information
    pub fn record_unavailable(&mut self) {
        self.unreported_calls += 1;
    }

    pub fn prompt_tokens(&self) -> u64 {
        self.totals.prompt_tokens
    }

    pub fn completion_tokens(&self) -> u64 {
        self.totals.completion_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.totals.total_tokens
    }

    pub fn totals(&self) -> Usage {
        self.totals
    }

    pub fn reported_calls(&self) -> u64 {
        self.reported_calls
    }

    pub fn unreported_calls(&self) -> u64 {
        self.unreported_calls
    }

    /// Totals priced with the given profile
    pub fn summary(&self, model: &ModelProfile) -> UsageSummary {
        UsageSummary {
            model_id: model.id.clone(),
            prompt_tokens: self.totals.prompt_tokens,
            completion_tokens: self.totals.completion_tokens,
            total_tokens: self.totals.total_tokens,
            estimated_cost: model.cost(self.totals.prompt_tokens, self.totals.completion_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut counter = UsageCounter::new();
        counter.record(&Usage::new(100, 20));
        counter.record(&Usage::new(50, 5));
        counter.record_unavailable();

        assert_eq!(counter.prompt_tokens(), 150);
        assert_eq!(counter.completion_tokens(), 25);
        assert_eq!(counter.total_tokens(), 175);
        assert_eq!(counter.reported_calls(), 2);
        assert_eq!(counter.unreported_calls(), 1);
    }

    #[test]
    fn test_total_is_sum_even_if_backend_disagrees() {
        let mut counter = UsageCounter::new();
        counter.record(&Usage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 99 });
        assert_eq!(counter.total_tokens(), 15);
    }
}
