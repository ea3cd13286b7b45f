//! Incremental count maintenance.
//!
//! When the best rule is applied, the counts of a stored rule can only
//! change at positions close to a changed position: either the rule's
//! predicate reads a changed value, or the position itself changed. For
//! every such position and relevant template, the rules sharing the
//! predicates that hold there are collected through their predicate group,
//! once before and once after the change. The delta of each rule is the
//! difference between the two.

use super::{score, Learner};
use crate::{
    common::*,
    data::Pos,
    pred::Pred,
    rule::{Rule, Target},
};

/// Templates to look at for each position of a window.
type Window = Vec<(Pos, Vec<PTplIdx>)>;

impl Learner {
    /// Templates that can yield rules, in registration order.
    fn rule_templates(&self) -> Vec<PTplIdx> {
        self.cxt
            .preds
            .indices()
            .filter(|tpl| !self.cxt.rule_tpls.targets(*tpl).is_empty())
            .collect()
    }

    /// Positions whose rules may see their counts change, with the templates
    /// that may be affected there.
    fn window(&self, rule: &Rule, positions: &[Pos]) -> Window {
        let pad = self.cxt.preds.pad() as isize;
        let feats: Vec<FeatIdx> = rule.target.assignments(&self.cxt).map(|(f, _)| f).collect();
        let all = self.rule_templates();
        let changed: HashSet<Pos> = positions.iter().cloned().collect();

        let mut window: BTreeMap<Pos, BTreeSet<PTplIdx>> = BTreeMap::new();
        for pos in positions {
            let sentence = self.corpus.sentence(pos.sent);
            for q in pos.idx - pad..=pos.idx + pad {
                if !sentence.is_real(q) {
                    continue;
                }
                let tpls = window.entry(Pos::new(pos.sent, q)).or_insert_with(BTreeSet::new);
                if changed.contains(&Pos::new(pos.sent, q)) {
                    tpls.extend(all.iter().cloned())
                } else {
                    for feat in &feats {
                        tpls.extend(
                            self.cxt
                                .preds
                                .dependents(pos.idx - q, *feat)
                                .iter()
                                .filter(|tpl| all.contains(tpl))
                                .cloned(),
                        )
                    }
                }
            }
        }
        window
            .into_iter()
            .map(|(pos, tpls)| (pos, tpls.into_iter().collect()))
            .collect()
    }

    /// Adds `sign` times the counts of the stored rules firing in a window.
    fn collect_counts(
        &mut self,
        window: &Window,
        sign: Score,
        deltas: &mut HashMap<RuleIdx, (Score, Score)>,
    ) -> Res<()> {
        let mut preds = vec![];
        for (pos, tpls) in window {
            let sentence = self.corpus.sentence(pos.sent);
            for tpl in tpls {
                preds.clear();
                score::preds_at(&self.cxt, &mut self.factory, *tpl, sentence, pos.idx, &mut preds);
                for pred in &preds {
                    let group = self.store.rules_sharing(pred);
                    for n in 0..group.len() {
                        let idx = group.at(n)?;
                        let rule = match self.store.get(idx) {
                            Some(rule) => rule,
                            None => bail!(ErrorKind::GroupOverrun),
                        };
                        if rule.test(&self.cxt, sentence, pos.idx) {
                            let (good, bad) = rule.target.counts(&self.cxt, sentence, pos.idx);
                            let delta = deltas.entry(idx).or_insert((0, 0));
                            delta.0 += sign * good;
                            delta.1 += sign * bad
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies the best rule and updates the counts of the stored rules.
    ///
    /// Rules that become useful in the window are created and scored from
    /// scratch, rules that become useless are erased.
    pub(super) fn apply_grouped(&mut self, rule: &Rule, id: RuleId, positions: &[Pos]) -> Res<()> {
        profile! { self tick "application" }
        let window = self.window(rule, positions);
        let mut deltas = HashMap::new();
        self.collect_counts(&window, -1, &mut deltas)?;
        self.apply_at(rule, id, positions);
        self.collect_counts(&window, 1, &mut deltas)?;

        let mut touched = Vec::with_capacity(deltas.len());
        for (idx, (good, bad)) in deltas {
            if good == 0 && bad == 0 {
                continue;
            }
            if let Some(stored) = self.store.get_mut(idx) {
                stored.good += good;
                stored.bad += bad;
                touched.push(idx)
            }
        }
        log! { @debug
            "{} position(s) in the window, {} rule(s) changed", window.len(), touched.len()
        }

        let created = self.regenerate(&window)?;
        profile! { self mark "application" }

        profile! { self tick "pruning" }
        touched.sort();
        let mut erased = 0;
        for idx in touched {
            let useless = self.store.get(idx).map(|r| self.useless(r)).unwrap_or(false);
            if useless {
                let _ = self.store.erase(idx);
                erased += 1
            }
        }
        profile! { self "rules erased" => add erased }
        profile! { self "rules created" => add created }
        profile! { self mark "pruning" }
        Ok(())
    }

    /// Creates the rules that became useful at the incorrect positions of a
    /// window, returns how many were created.
    fn regenerate(&mut self, window: &Window) -> Res<usize> {
        let mut rules = vec![];
        let mut rejected: HashSet<(Pred, Target)> = HashSet::new();
        let mut created = 0;
        for (pos, _) in window {
            let sentence = self.corpus.sentence(pos.sent);
            if self.cxt.is_correct(sentence, pos.idx) {
                continue;
            }
            rules.clear();
            score::rules_at(&self.cxt, &mut self.factory, sentence, pos.idx, &mut rules);
            for (pred, target, _) in rules.drain(0..) {
                if self.store.find(&pred, &target).is_some()
                    || rejected.contains(&(pred.clone(), target.clone()))
                {
                    continue;
                }
                let mut rule = Rule::new(pred, target);
                let (good, bad) = score::score(&self.cxt, &self.corpus, &self.indices, &rule);
                rule.good = good;
                rule.bad = bad;
                if self.useless(&rule) {
                    let _ = rejected.insert((rule.pred, rule.target));
                } else {
                    let _ = self.store.insert(rule);
                    created += 1
                }
            }
        }
        Ok(created)
    }
}
