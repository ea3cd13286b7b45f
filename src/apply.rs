//! Inference: applies a rule list to a corpus.
//!
//! Rules are applied in order. Each rule rewrites every position it fires
//! on, positions being computed before any of them changes. Rules writing
//! the fake class only leave a trace, they are questions for probability
//! trees.

use crate::{
    common::{config::ApplyConf, *},
    cxt::Context,
    data::{read_raw_file, Corpus, Pos, Traces},
    index::Indices,
    learning::score,
    pred::PredFactory,
    rule::{parse_rules, voc_file, Rule},
    tree::{certain, Tree},
    vocab::Vocab,
};

/// Applies rules to a corpus.
pub struct Applier {
    /// Context.
    cxt: Context,
    /// Predicate factory.
    factory: PredFactory,
    /// Rules, in application order.
    rules: RuleIdMap<Rule>,
    /// Corpus being annotated.
    corpus: Corpus,
    /// Rules that fired on each position.
    traces: Traces,
    /// Good and bad changes of each rule, if asked.
    counts: Option<RuleIdMap<(Score, Score)>>,
    /// Profiler.
    _profiler: Profiler,
}

impl Applier {
    /// Loads the rules and the corpus of a configuration.
    ///
    /// The corpus is interned before the rules are parsed so that literal
    /// counts are known when predicates are created.
    pub fn load(params: Params, conf: &ApplyConf) -> Res<Self> {
        let profiler = Profiler::new();
        let (cxt, factory, rules, corpus) = profile! {
            |profiler| wrap {
                let mut cxt = Context::new(params)?;
                let rule_file = Path::new(&conf.rules);
                let lines = read_lines(rule_file)?;
                let raw = read_raw_file(&conf.corpus, &cxt.layout, cxt.separated)?;
                match voc_file(rule_file, &lines) {
                    Some(path) => cxt.set_vocab(Vocab::read(&path)?),
                    None => {
                        warn!(
                            "rule file `{}` names no vocabulary file,\n\
                            seeding the vocabulary from the corpus",
                            conf.rules
                        );
                        cxt.seed_vocab(&raw)?
                    }
                }
                let corpus = cxt.intern_corpus(&raw);
                let mut factory = PredFactory::new();
                let rules = parse_rules(&mut cxt, &mut factory, &lines, false).chain_err(|| {
                    format!("while reading rule file `{}`", colors.emph(&conf.rules))
                })?;
                cxt.load_side_tables(&corpus)?;
                log! { @verb
                    "{} rule(s), {} sample(s) in {} sentence(s)",
                    rules.len(), corpus.num_samples(), corpus.len()
                }
                (cxt, factory, rules, corpus)
            } "loading"
        };
        Ok(Self::new(cxt, factory, rules, corpus, conf.errors, profiler))
    }

    /// Constructor.
    pub fn new(
        cxt: Context,
        factory: PredFactory,
        rules: RuleIdMap<Rule>,
        corpus: Corpus,
        errors: bool,
        profiler: Profiler,
    ) -> Self {
        let traces = Traces::new(&corpus);
        let counts = if errors {
            Some(rules.iter().map(|_| (0, 0)).collect::<Vec<_>>().into())
        } else {
            None
        };
        Applier {
            cxt,
            factory,
            rules,
            corpus,
            traces,
            counts,
            _profiler: profiler,
        }
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
    /// Good and bad changes of each rule, if asked.
    pub fn counts(&self) -> Option<&RuleIdMap<(Score, Score)>> {
        self.counts.as_ref()
    }
    /// Profiler.
    pub fn into_profiler(self) -> Profiler {
        self._profiler
    }

    /// Applies the rules, `batch` sentences at a time.
    pub fn run(&mut self, batch: Option<usize>) -> Res<()> {
        let sentences = self.corpus.len();
        let size = ::std::cmp::max(1, batch.unwrap_or(sentences));
        let mut filter: HashSet<Word> = HashSet::new();
        for rule in self.rules.iter() {
            filter.extend(rule.pred.tokens().iter().cloned())
        }

        let empty = self.corpus.slice(0..0);
        self.traces = Traces::new(&empty);
        let corpus = ::std::mem::replace(&mut self.corpus, empty);

        for start in (0..sentences).step_by(size) {
            let end = ::std::cmp::min(start + size, sentences);
            log! { @debug "batch of sentences {} to {}", start, end }
            let mut batch = corpus.slice(start..end);
            let mut traces = Traces::new(&batch);
            let mut indices = profile! {
                self wrap { Indices::build(&mut self.cxt, &batch, Some(&filter)) } "indexing"
            };
            profile! { self tick "application" }
            self.apply_rules(&mut batch, &mut indices, &mut traces);
            profile! { self mark "application" }
            self.corpus.append(batch);
            self.traces.append(traces)
        }

        if let Some(counts) = self.counts.as_ref() {
            for (id, rule) in self.rules.index_iter() {
                let (good, bad) = counts[id];
                log! { @info
                    "rule {}: {} good, {} bad change(s), {}",
                    id, good, bad, rule.text(&self.cxt)
                }
            }
        }
        Ok(())
    }

    /// Applies all the rules to a batch.
    fn apply_rules(&mut self, batch: &mut Corpus, indices: &mut Indices, traces: &mut Traces) {
        for (id, rule) in self.rules.index_iter() {
            let positions = score::matches(&self.cxt, batch, indices, rule);
            if let Some(counts) = self.counts.as_mut() {
                for pos in &positions {
                    let (good, bad) =
                        rule.target
                            .counts(&self.cxt, batch.sentence(pos.sent), pos.idx);
                    counts[id].0 += good;
                    counts[id].1 += bad
                }
            }
            let fake = rule.target.is_fake(&self.cxt);
            for pos in &positions {
                if !fake {
                    let sentence = batch.sentence_mut(pos.sent);
                    for (feat, val) in rule.target.assignments(&self.cxt) {
                        let old = sentence.get(pos.idx, feat);
                        sentence.set(pos.idx as usize, feat, val);
                        indices.update_state(*pos, feat, old, val)
                    }
                }
                traces.push(*pos, id)
            }
            profile! { self "positions changed" => add positions.len() }
        }
    }

    /// Builds a probability tree from the traces.
    pub fn gen_tree(&mut self) -> Res<Tree> {
        profile! {
            self wrap {
                Tree::build(
                    &mut self.cxt,
                    &mut self.factory,
                    &self.corpus,
                    &self.traces,
                    &self.rules,
                )
            } "tree"
        }
    }

    /// Reads a probability tree.
    pub fn read_tree(&mut self, path: &Path) -> Res<Tree> {
        Tree::read(&mut self.cxt, &mut self.factory, path)
    }

    /// Writes the annotated corpus.
    ///
    /// Each sample is followed by its trace and its class distribution if
    /// asked. Distributions follow the traces, unless a corpus is given
    /// along with the tree: its states are then the hypothesis of a soft
    /// query.
    pub fn write<W: Write>(
        &self,
        w: &mut W,
        trace: bool,
        tree: Option<(&Tree, Option<&Corpus>)>,
    ) -> Res<()> {
        for (sent, sentence) in self.corpus.sentences().index_iter() {
            for idx in 0..sentence.len() as isize {
                let pos = Pos::new(sent, idx);
                let fired = self.traces.get(pos);
                self.corpus.write_sample(
                    w,
                    &self.cxt.vocab,
                    pos,
                    if trace { Some(fired) } else { None },
                )?;
                if let Some((tree, hypothesis)) = tree {
                    write!(w, " |")?;
                    let dist = match hypothesis {
                        Some(states) => tree.soft_probabilities(
                            &self.cxt,
                            sentence,
                            idx,
                            &certain(states.sentence(sent)),
                        ),
                        None => tree.probabilities(&self.cxt, sentence, idx, fired),
                    };
                    Tree::write_distribution(w, &self.cxt, &dist)?
                }
                writeln!(w)?
            }
            if self.cxt.separated {
                writeln!(w)?
            }
        }
        Ok(())
    }
}

/// Applies a rule list, writes the result.
pub fn work(params: Params, conf: &ApplyConf) -> Res<()> {
    let mut applier = Applier::load(params, conf)?;
    // Soft queries see the states the rules started from.
    let input = if conf.soft && conf.tree.is_some() {
        Some(applier.corpus().clone())
    } else {
        None
    };
    applier.run(conf.batch)?;

    if let Some(path) = conf.gen_tree.as_ref() {
        let tree = applier.gen_tree()?;
        let mut w = open_writer(path)?;
        tree.write(&mut w, applier.cxt())?;
        w.flush()?;
        log! { @verb "wrote tree with {} node(s) to `{}`", tree.len(), path }
    }
    let tree = match conf.tree.as_ref() {
        Some(path) => Some(applier.read_tree(Path::new(path))?),
        None => None,
    };
    let tree = tree.as_ref().map(|tree| (tree, input.as_ref()));

    match conf.output.as_ref() {
        Some(path) => {
            let mut w = open_writer(path)?;
            applier.write(&mut w, conf.trace, tree)?;
            w.flush()?
        }
        None => {
            let stdout = ::std::io::stdout();
            let mut w = stdout.lock();
            applier.write(&mut w, conf.trace, tree)?;
            w.flush()?
        }
    }
    print_stats("inference", applier.into_profiler());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cxt::test::setup_with;

    const SAMPLES: &[&str] = &[
        "we PRP PRP",
        "can NN MD",
        "run NN VB",
        "",
        "they PRP PRP",
        "can NN MD",
        "",
        "a DT DT",
        "can NN NN",
    ];

    fn applier(rules: &[&str], samples: &[&str], errors: bool) -> Applier {
        let (mut cxt, corpus) = setup_with(
            "word tag => ttag",
            "word => tag\ntag_-1 => tag\nword tag_-1 => tag",
            samples,
            &[],
        );
        let mut factory = PredFactory::new();
        let lines: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
        let rules = parse_rules(&mut cxt, &mut factory, &lines, false).unwrap();
        Applier::new(cxt, factory, rules, corpus, errors, Profiler::new())
    }

    fn output(applier: &Applier, trace: bool) -> String {
        let mut out = vec![];
        applier.write(&mut out, trace, None).unwrap();
        String::from_utf8(out).unwrap()
    }

    const RULES: &[&str] = &[
        "GOOD:2 BAD:1 SCORE:1 RULE: word_0=can => tag=MD",
        "GOOD:1 BAD:0 SCORE:1 RULE: tag_-1=MD => tag=VB",
        "GOOD:1 BAD:0 SCORE:1 RULE: word_0=can tag_-1=DT => tag=NN",
    ];

    #[test]
    fn rules_in_order() {
        let mut applier = applier(RULES, SAMPLES, false);
        applier.run(None).unwrap();
        assert_eq!(
            output(&applier, true),
            "\
we PRP PRP |
can MD MD | 0
run VB VB | 1
\n\
they PRP PRP |
can MD MD | 0
\n\
a DT DT |
can NN NN | 0 2
\n"
        );
    }

    #[test]
    fn batches_agree() {
        let mut whole = applier(RULES, SAMPLES, false);
        whole.run(None).unwrap();
        for size in 1..4 {
            let mut batched = applier(RULES, SAMPLES, false);
            batched.run(Some(size)).unwrap();
            assert_eq!(output(&batched, true), output(&whole, true))
        }
    }

    #[test]
    fn error_counts() {
        let mut applier = applier(RULES, SAMPLES, true);
        applier.run(Some(1)).unwrap();
        let counts = applier.counts().unwrap();
        assert_eq!(counts[RuleId::new(0)], (2, 1));
        assert_eq!(counts[RuleId::new(1)], (1, 0));
        assert_eq!(counts[RuleId::new(2)], (1, 0));
    }

    #[test]
    fn fake_rules_only_trace() {
        let mut applier = applier(&["word_0=can => tag=FAKE_CLASS"], SAMPLES, false);
        applier.run(None).unwrap();
        let out = output(&applier, true);
        assert!(out.contains("can NN MD | 0\n"));
        assert!(!out.contains("FAKE_CLASS"));
    }
}
