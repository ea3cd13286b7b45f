//! Consistency checks between incremental and from-scratch counts.

use rand::Rng;

use super::{score, Learner};
use crate::{common::*, rule::Rule};

impl Learner {
    /// Fails if a stored rule's counts differ from a rescan.
    fn check_rule(&self, rule: &Rule) -> Res<()> {
        let scratch = score::score(&self.cxt, &self.corpus, &self.indices, rule);
        if scratch != (rule.good, rule.bad) {
            bail!(ErrorKind::ScoreMismatch(
                rule.text(&self.cxt),
                (rule.good, rule.bad),
                scratch
            ))
        }
        Ok(())
    }

    /// Rescores some random stored rules from scratch.
    pub(super) fn cross_check_counts(&mut self) -> Res<()> {
        if self.cross_check == 0 || self.store.is_empty() {
            return Ok(());
        }
        let indices = self.store.indices();
        for _ in 0..self.cross_check {
            let idx = indices[self.rng.gen_range(0..indices.len())];
            if let Some(rule) = self.store.get(idx) {
                self.check_rule(rule)?
            }
        }
        Ok(())
    }

    /// Checks that every stored rule has exact counts, and that every rule
    /// worth storing is stored.
    pub fn check_all(&mut self) -> Res<()> {
        for (_, rule) in self.store.iter() {
            self.check_rule(rule)?
        }
        let mut rules = vec![];
        let mut missing = vec![];
        for (_, sentence) in self.corpus.sentences().index_iter() {
            for p in 0..sentence.len() as isize {
                if self.cxt.is_correct(sentence, p) {
                    continue;
                }
                rules.clear();
                score::rules_at(&self.cxt, &mut self.factory, sentence, p, &mut rules);
                for (pred, target, _) in rules.drain(0..) {
                    if self.store.find(&pred, &target).is_none() {
                        missing.push(Rule::new(pred, target))
                    }
                }
            }
        }
        for mut rule in missing {
            let (good, bad) = score::score(&self.cxt, &self.corpus, &self.indices, &rule);
            rule.good = good;
            rule.bad = bad;
            if !self.useless(&rule) {
                bail!(ErrorKind::ScoreMismatch(rule.text(&self.cxt), (0, 0), (good, bad)))
            }
        }
        Ok(())
    }
}
