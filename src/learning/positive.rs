//! Positive rule extraction.

use super::Learner;
use crate::{common::config::PositiveThreshold, common::*, rule::Rule};

impl Learner {
    /// Minimal good count of a positive rule.
    fn positive_minimum(&self, threshold: PositiveThreshold, min_positive: i64) -> Score {
        match threshold {
            PositiveThreshold::Count(n) => n,
            PositiveThreshold::Percent(pct) => {
                (pct / 100.0 * self.corpus.num_samples() as f64).ceil() as Score
            }
            PositiveThreshold::Offset(n) => {
                let best = self
                    .store
                    .iter()
                    .map(|(_, rule)| rule.score())
                    .max()
                    .unwrap_or(0);
                ::std::cmp::max(min_positive, best + n)
            }
        }
    }

    /// Emits every rule that makes no bad change and enough good ones,
    /// instead of learning.
    ///
    /// Rules are sorted best first.
    pub fn positive_rules(&mut self, threshold: PositiveThreshold, min_positive: i64) -> Res<()> {
        self.initial_scoring()?;
        let min = self.positive_minimum(threshold, min_positive);
        let mut rules: Vec<Rule> = self
            .store
            .iter()
            .filter(|(_, rule)| rule.bad == 0 && rule.good >= min)
            .map(|(_, rule)| rule.clone())
            .collect();
        let order = self.cxt.size_order;
        rules.sort_by(|r1, r2| {
            use std::cmp::Ordering::*;
            if r1.better(r2, order) {
                Less
            } else if r2.better(r1, order) {
                Greater
            } else {
                Equal
            }
        });
        log! { @info
            "{} positive rule(s) with a good count of at least {}", rules.len(), min
        }
        self.learned = rules.into();
        Ok(())
    }
}
