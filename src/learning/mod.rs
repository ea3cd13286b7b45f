//! Learning loop.
//!
//! The learner repeatedly selects the best rule, applies it to the corpus and
//! updates the counts of the other rules, until no rule scores above the
//! threshold. Counts are maintained either incrementally, by looking at the
//! windows around the positions the best rule changed (see [`delta`]), or by
//! regenerating the candidates from scratch at each iteration (see
//! [`lazy`]).
//!
//! [`delta`]: delta/index.html (delta module)
//! [`lazy`]: lazy/index.html (lazy module)

use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::{
    common::{config::LearnConf, consts::keywords::params as keys, *},
    cxt::Context,
    data::{read_raw_file, Corpus, Pos, Traces},
    index::Indices,
    pred::PredFactory,
    rule::{write_rules, Rule, SizeOrder},
    store::RuleStore,
};

mod check;
mod delta;
mod lazy;
mod positive;
pub mod score;

/// Learning strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Incremental updates through predicate groups.
    Grouped,
    /// Rescoring from scratch at each iteration.
    Rescan,
    /// Rescoring until the score curve flattens, then incremental updates.
    Switch,
}

/// Learner.
pub struct Learner {
    /// Context.
    cxt: Context,
    /// Training corpus, its state columns change as rules are applied.
    corpus: Corpus,
    /// Indices of the corpus.
    indices: Indices,
    /// Predicate factory.
    factory: PredFactory,
    /// Candidate rules.
    store: RuleStore,
    /// Rules that fired on each position.
    traces: Traces,
    /// Learned rules, with their counts when they were selected.
    learned: RuleIdMap<Rule>,
    /// Score threshold.
    threshold: f64,
    /// Strategy.
    strategy: Strategy,
    /// True when counts are maintained incrementally.
    grouped: bool,
    /// Good count under which rules are dropped after the first scoring.
    elimination: Option<Score>,
    /// Rules with `factor * bad >= good` are dropped.
    erase_factor: Option<f64>,
    /// Number of times the same rule can be selected in a row.
    num_repeats: usize,
    /// Number of rules rescored after each application.
    cross_check: usize,
    /// Random generator for cross-checks.
    rng: XorShiftRng,
    /// Profiler.
    _profiler: Profiler,
}

impl Learner {
    /// Loads the corpus of a configuration and creates a learner.
    pub fn load(params: Params, conf: &LearnConf) -> Res<Self> {
        let profiler = Profiler::new();
        let (cxt, corpus) = profile! {
            |profiler| wrap {
                let mut cxt = Context::new(params)?;
                let raw = read_raw_file(&conf.corpus, &cxt.layout, cxt.separated)?;
                cxt.seed_vocab(&raw)?;
                let corpus = cxt.load_corpus(&raw)?;
                cxt.load_side_tables(&corpus)?;
                log! { @verb
                    "loaded {} sample(s) in {} sentence(s)",
                    corpus.num_samples(), corpus.len()
                }
                (cxt, corpus)
            } "loading"
        };
        Self::new(cxt, corpus, conf, profiler)
    }

    /// Creates a learner.
    pub fn new(mut cxt: Context, corpus: Corpus, conf: &LearnConf, profiler: Profiler) -> Res<Self> {
        if let Some(order) = conf.size_order {
            cxt.size_order = SizeOrder::of_int(order as i64)
        }
        let elimination = cxt.params.int_opt(keys::elimination)?;
        let erase_factor = match cxt.params.float_or(keys::erase_factor, -1.0)? {
            factor if factor < 0.0 => None,
            factor => Some(factor),
        };
        if cxt.params.int_or(keys::erase_useless, -1)? >= 0 {
            log! { @verb
                "`{}` has no effect, rules without good changes are always dropped",
                keys::erase_useless
            }
        }
        let num_repeats = ::std::cmp::max(1, cxt.params.int_or(keys::num_repeats, 5)?) as usize;

        let indices = profile! {
            |profiler| wrap { Indices::build(&mut cxt, &corpus, None) } "indexing"
        };
        let traces = Traces::new(&corpus);

        Ok(Learner {
            cxt,
            corpus,
            indices,
            factory: PredFactory::new(),
            store: RuleStore::new(),
            traces,
            learned: RuleIdMap::new(),
            threshold: conf.threshold,
            strategy: conf.strategy,
            grouped: conf.strategy == Strategy::Grouped,
            elimination,
            erase_factor,
            num_repeats,
            cross_check: conf.cross_check,
            rng: XorShiftRng::seed_from_u64(conf.seed),
            _profiler: profiler,
        })
    }

    /// Context.
    pub fn cxt(&self) -> &Context {
        &self.cxt
    }
    /// Corpus.
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }
    /// Rule traces.
    pub fn traces(&self) -> &Traces {
        &self.traces
    }
    /// Candidate rules.
    pub fn store(&self) -> &RuleStore {
        &self.store
    }
    /// Learned rules.
    pub fn learned(&self) -> &RuleIdMap<Rule> {
        &self.learned
    }
    /// Destroys the learner, yields its profiler.
    pub fn into_profiler(self) -> Profiler {
        self._profiler
    }

    /// True if a rule is not worth keeping.
    fn useless(&self, rule: &Rule) -> bool {
        if rule.good <= 0 {
            return true;
        }
        match self.erase_factor {
            Some(factor) => factor * rule.bad as f64 >= rule.good as f64,
            None => false,
        }
    }

    /// Generates every rule that fixes some position, with its good count.
    fn generate(&mut self) {
        let mut rules = vec![];
        let mut created = 0;
        for (sent, sentence) in self.corpus.sentences().index_iter() {
            for p in 0..sentence.len() as isize {
                if self.cxt.is_correct(sentence, p) {
                    continue;
                }
                rules.clear();
                score::rules_at(&self.cxt, &mut self.factory, sentence, p, &mut rules);
                for (pred, target, good) in rules.drain(0..) {
                    let (idx, new) = self.store.insert(Rule::new(pred, target));
                    if new {
                        created += 1
                    }
                    if let Some(rule) = self.store.get_mut(idx) {
                        rule.good += good
                    }
                }
            }
            log! { @debug "generated rules up to sentence {}", sent }
        }
        profile! { self "rules created" => add created }
    }

    /// Full scoring, used before incremental updates start.
    ///
    /// Generates the rules, drops the ones under the elimination threshold,
    /// then counts good and bad changes of the others from scratch.
    fn initial_scoring(&mut self) -> Res<()> {
        profile! { self tick "initial scoring" }
        self.store.clear();
        self.generate();
        let generated = self.store.len();
        if let Some(threshold) = self.elimination {
            let erased = self.store.erase_if(|rule| rule.good <= threshold);
            log! { @verb "eliminated {} rule(s) with good count under {}", erased, threshold }
        }

        for idx in self.store.indices() {
            let counts = match self.store.get(idx) {
                Some(rule) => score::score(&self.cxt, &self.corpus, &self.indices, rule),
                None => continue,
            };
            if let Some(rule) = self.store.get_mut(idx) {
                rule.good = counts.0;
                rule.bad = counts.1
            }
        }

        let erase_factor = self.erase_factor;
        let erased = self.store.erase_if(|rule| {
            rule.good <= 0
                || erase_factor
                    .map(|factor| factor * rule.bad as f64 >= rule.good as f64)
                    .unwrap_or(false)
        });
        profile! { self "rules erased" => add erased }
        log! { @verb
            "initial scoring: {} rule(s) generated, {} kept", generated, self.store.len()
        }
        profile! { self mark "initial scoring" }
        Ok(())
    }

    /// Best stored rule and the positions it fires at.
    fn select(&self) -> Option<(Rule, Vec<Pos>)> {
        profile! { self tick "selection" }
        let mut best: Option<&Rule> = None;
        for (_, rule) in self.store.iter() {
            if best
                .map(|best| rule.better(best, self.cxt.size_order))
                .unwrap_or(true)
            {
                best = Some(rule)
            }
        }
        let res = best.map(|rule| {
            let positions = score::matches(&self.cxt, &self.corpus, &self.indices, rule);
            (rule.clone(), positions)
        });
        profile! { self mark "selection" }
        res
    }

    /// Writes the target of a rule at some positions.
    ///
    /// Updates the state index and the traces.
    fn apply_at(&mut self, rule: &Rule, id: RuleId, positions: &[Pos]) {
        for pos in positions {
            let sentence = self.corpus.sentence_mut(pos.sent);
            for (feat, val) in rule.target.assignments(&self.cxt) {
                let old = sentence.get(pos.idx, feat);
                sentence.set(pos.idx as usize, feat, val);
                self.indices.update_state(*pos, feat, old, val)
            }
            self.traces.push(*pos, id)
        }
        profile! { self "rules applied" => add 1 }
        profile! { self "positions changed" => add positions.len() }
    }

    /// Learns the rule list.
    pub fn run(&mut self) -> Res<()> {
        if self.grouped {
            self.initial_scoring()?
        }
        let start = ::std::time::Instant::now();
        let mut previous: Option<Score> = None;
        let mut repeated: Option<(Rule, usize)> = None;

        loop {
            let best = if self.grouped {
                self.select()
            } else {
                self.select_lazy()
            };
            let (rule, positions) = match best {
                Some(best) => best,
                None => break,
            };
            if rule.score() as f64 <= self.threshold {
                break;
            }

            repeated = match repeated {
                Some((last, count)) if last == rule => {
                    if count + 1 >= self.num_repeats {
                        bail!(ErrorKind::RepeatedBestRule(rule.text(&self.cxt)))
                    }
                    Some((last, count + 1))
                }
                _ => Some((rule.clone(), 1)),
            };

            let id = self.learned.next_index();
            log! { @verb
                "{:>5} | good {:>5} bad {:>5} | {} | {} rule(s) stored, {:.3}s",
                id, rule.good, rule.bad, rule.text(&self.cxt), self.store.len(),
                start.elapsed().as_secs_f64()
            }

            if self.grouped {
                self.apply_grouped(&rule, id, &positions)?;
                self.cross_check_counts()?
            } else {
                profile! { self tick "application" }
                self.apply_at(&rule, id, &positions);
                profile! { self mark "application" }
            }

            let score = rule.score();
            let _ = self.learned.push(rule);

            if self.strategy == Strategy::Switch && !self.grouped {
                if let Some(previous) = previous {
                    if ((previous - score) as f64).atan() < ::std::f64::consts::PI / 12.0 {
                        log! { @verb "score curve is flat, switching to incremental updates" }
                        self.grouped = true;
                        self.initial_scoring()?
                    }
                }
            }
            previous = Some(score)
        }

        log! { @info
            "learned {} rule(s) in {:.3}s", self.learned.len(), start.elapsed().as_secs_f64()
        }
        Ok(())
    }

    /// Writes the rule file and its vocabulary file `<rule file>.voc`.
    pub fn write(&self, path: &Path) -> Res<()> {
        let voc = voc_path(path);
        let mut w = open_writer(&voc)?;
        self.cxt.vocab.write(&mut w)?;
        w.flush()?;

        let voc_name = voc
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| voc.to_string_lossy().to_string());
        let mut w = open_writer(path)?;
        write_rules(&mut w, &self.cxt, &voc_name, &self.learned)?;
        w.flush()?;
        Ok(())
    }
}

/// Vocabulary file of a rule file.
pub fn voc_path(rule_file: &Path) -> PathBuf {
    let mut name = rule_file.as_os_str().to_os_string();
    name.push(".voc");
    PathBuf::from(name)
}

/// Learns a rule list and writes it.
pub fn work(params: Params, conf: &LearnConf) -> Res<()> {
    let mut learner = Learner::load(params, conf)?;
    match conf.positive {
        Some(threshold) => learner.positive_rules(threshold, conf.min_positive)?,
        None => learner.run()?,
    }
    learner.write(Path::new(&conf.rules))?;
    print_stats("learning", learner.into_profiler());
    Ok(())
}

#[cfg(test)]
mod test;
