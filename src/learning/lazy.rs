//! Rescan selection.
//!
//! Candidates are regenerated from the current corpus at each iteration with
//! their good counts only. They are then visited by decreasing good count,
//! and the bad count of each is computed through the index until the rule
//! cannot beat the best one so far.
//!
//! Generated good counts only cover positions a target makes entirely
//! correct. Rules writing several slots can also fix some slots of other
//! positions, they are scored from scratch before the visit.

use super::{score, Learner};
use crate::{common::*, data::Pos, rule::Rule};

impl Learner {
    /// Best rule of the current corpus and the positions it fires at.
    pub(super) fn select_lazy(&mut self) -> Option<(Rule, Vec<Pos>)> {
        profile! { self tick "selection" }
        self.store.clear();
        self.generate();
        let mut rules: Vec<(Rule, Option<Score>)> = Vec::with_capacity(self.store.len());
        for (_, rule) in self.store.iter() {
            let mut rule = rule.clone();
            let bad = if self.cxt.targets[rule.target.tpl].slots().len() > 1 {
                let (good, bad) = score::score(&self.cxt, &self.corpus, &self.indices, &rule);
                rule.good = good;
                Some(bad)
            } else {
                None
            };
            rules.push((rule, bad))
        }
        self.store.clear();
        rules.sort_by(|(r1, _), (r2, _)| r2.good.cmp(&r1.good));

        let mut best: Option<(Rule, Vec<Pos>)> = None;
        let mut positions = vec![];
        let mut visited = 0;
        for (mut rule, bad) in rules {
            if rule.good as f64 <= self.threshold {
                break;
            }
            let bound = match best {
                Some((ref best, _)) if rule.good < best.score() => break,
                Some((ref best, _)) => best.score(),
                None => Score::min_value(),
            };
            visited += 1;
            positions.clear();
            let bad = match bad {
                Some(bad) if rule.good - bad < bound => None,
                Some(bad) => {
                    positions.extend(score::matches(&self.cxt, &self.corpus, &self.indices, &rule));
                    Some(bad)
                }
                None => score::lazy_bad(
                    &self.cxt,
                    &self.corpus,
                    &self.indices,
                    &rule,
                    bound,
                    &mut positions,
                ),
            };
            if let Some(bad) = bad {
                rule.bad = bad;
                let better = best
                    .as_ref()
                    .map(|(best, _)| rule.better(best, self.cxt.size_order))
                    .unwrap_or(true);
                if better {
                    best = Some((rule, positions.clone()))
                }
            }
        }
        log! { @debug "rescan: evaluated the bad counts of {} rule(s)", visited }
        profile! { self mark "selection" }
        best
    }
}
