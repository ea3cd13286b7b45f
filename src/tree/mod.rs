//! Probability trees.
//!
//! A tree turns a rule list into class probabilities. It is built from the
//! rule traces of an annotated corpus: internal nodes first ask whether some
//! rule fired on the sample, in rule order, then leaves with mixed classes
//! are grown with questions on a single context feature. Leaves hold the
//! class counts of the examples reaching them.
//!
//! Questions on context features are rules writing the fake class, they are
//! appended to the rule list of the tree.

use std::collections::VecDeque;

use crate::{
    common::{consts::keywords::file as keys, consts::keywords::params as pkeys, *},
    cxt::Context,
    data::{Corpus, Pos, Sentence, Traces},
    pred::{Pred, PredFactory},
    rule::{parse_rules, Rule, Target, TargetTemplate},
};

pub mod node;

pub use self::node::Node;
use self::node::{entropy, weighted_entropy};

/// Leaves with an entropy below this are not grown.
const min_entropy: f64 = 1e-3;
/// Probabilities below this are not printed, soft queries take them as zero.
const min_prob: f64 = 1e-6;

/// Probability tree.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Rules, learned ones first, then feature questions.
    rules: RuleIdMap<Rule>,
    /// Classes.
    classes: Vec<Word>,
    /// Nodes in breadth-first order, the root is the first one.
    nodes: Vec<Node>,
    /// Additive smoothing.
    smoothing: f64,
}

/// Tree construction.
struct Builder<'a> {
    cxt: &'a mut Context,
    factory: &'a mut PredFactory,
    corpus: &'a Corpus,
    traces: &'a Traces,
    /// Class to class index.
    class_map: HashMap<Word, usize>,
    /// Rules of the tree.
    rules: RuleIdMap<Rule>,
    /// Feature questions already in `rules`.
    questions: HashMap<(Pred, Target), RuleId>,
    /// Minimal size of both sides of a trace split.
    split: usize,
    /// Minimal size of the sides of a feature split.
    dt_split: usize,
    /// Minimal entropy gain of a feature split.
    min_gain: f64,
}

impl<'a> Builder<'a> {
    /// Class counts of some examples.
    fn counts(&self, examples: &[Pos]) -> Vec<Score> {
        let mut counts = vec![0; self.class_map.len()];
        let truth = self.cxt.layout.truth(0);
        for pos in examples {
            let sentence = self.corpus.sentence(pos.sent);
            for answer in self.cxt.truths.answers(&sentence.get(pos.idx, truth)) {
                if let Some(class) = self.class_map.get(answer) {
                    counts[*class] += sentence.cost()
                }
            }
        }
        counts
    }

    /// First rule at or after `from` that splits some examples reasonably.
    fn trace_split(&self, examples: &[Pos], from: RuleId) -> Option<(RuleId, Vec<Pos>, Vec<Pos>)> {
        let mut candidates: BTreeMap<RuleId, usize> = BTreeMap::new();
        for pos in examples {
            let mut trace: Vec<RuleId> = self
                .traces
                .get(*pos)
                .iter()
                .cloned()
                .filter(|id| *id >= from)
                .collect();
            trace.sort();
            trace.dedup();
            for id in trace {
                *candidates.entry(id).or_insert(0) += 1
            }
        }
        let rule = candidates
            .into_iter()
            .find(|(_, yes)| *yes >= self.split && examples.len() - yes >= self.split)
            .map(|(rule, _)| rule)?;
        let (yes, no) = examples
            .iter()
            .cloned()
            .partition(|pos: &Pos| self.traces.get(*pos).contains(&rule));
        Some((rule, yes, no))
    }

    /// Best question on a context feature at offset zero.
    fn feature_split(
        &mut self,
        examples: &[Pos],
        counts: &[Score],
    ) -> Res<Option<(RuleId, Vec<Pos>, Vec<Pos>)>> {
        if examples.len() < self.dt_split || entropy(counts) <= min_entropy {
            return Ok(None);
        }
        let total = counts.iter().sum::<Score>() as f64;
        let mut best_value = (entropy(counts) - self.min_gain) * total;
        let mut best = None;

        for feat in self.cxt.layout.context_features() {
            let mut by_value: BTreeMap<Word, Vec<Pos>> = BTreeMap::new();
            for pos in examples {
                by_value
                    .entry(self.corpus.get(*pos, feat))
                    .or_insert_with(Vec::new)
                    .push(*pos)
            }
            for (value, yes) in by_value {
                let no_len = examples.len() - yes.len();
                if yes.len() <= self.dt_split || no_len <= self.dt_split {
                    continue;
                }
                let yes_counts = self.counts(&yes);
                let no_counts: Vec<Score> = counts
                    .iter()
                    .zip(yes_counts.iter())
                    .map(|(all, yes)| all - yes)
                    .collect();
                let value_entropy = weighted_entropy(&yes_counts) + weighted_entropy(&no_counts);
                if value_entropy < best_value {
                    best_value = value_entropy;
                    best = Some((feat, value))
                }
            }
        }

        let (feat, value) = match best {
            Some(best) => best,
            None => return Ok(None),
        };
        let id = self.question(feat, value)?;
        let (yes, no) = examples
            .iter()
            .cloned()
            .partition(|pos: &Pos| self.corpus.get(*pos, feat) == value);
        Ok(Some((id, yes, no)))
    }

    /// Rule id of the question `feat=value => FAKE_CLASS`.
    fn question(&mut self, feat: FeatIdx, value: Word) -> Res<RuleId> {
        let unit = format!("{}_0", self.cxt.layout.name(feat));
        let tpl = self
            .cxt
            .preds
            .parse_units(::std::iter::once(unit.as_str()), &self.cxt.layout)?;
        let (tpl, _) = self.cxt.preds.register(tpl)?;
        let state = self.cxt.layout.name(self.cxt.layout.state(0)).to_string();
        let ttpl = TargetTemplate::parse(::std::iter::once(state.as_str()), &self.cxt.layout)?;
        let ttpl = self.cxt.targets.register(ttpl);
        let pred = self.factory.mk(self.cxt, tpl, vec![value]);
        let target = Target::new(ttpl, vec![self.cxt.fake_class]);
        let key = (pred, target);
        if let Some(id) = self.questions.get(&key) {
            return Ok(*id);
        }
        let rule = Rule::new(key.0.clone(), key.1.clone());
        log! { @debug "tree question {}", rule.text(self.cxt) }
        let id = self.rules.push(rule);
        let _ = self.questions.insert(key, id);
        Ok(id)
    }
}

impl Tree {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    /// True if the tree has no node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    /// Rules of the tree.
    pub fn rules(&self) -> &RuleIdMap<Rule> {
        &self.rules
    }
    /// Classes.
    pub fn classes(&self) -> &[Word] {
        &self.classes
    }
    /// Nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Builds a tree from the traces of an annotated corpus.
    pub fn build(
        cxt: &mut Context,
        factory: &mut PredFactory,
        corpus: &Corpus,
        traces: &Traces,
        rules: &RuleIdMap<Rule>,
    ) -> Res<Self> {
        let split = cxt.params.int_or(pkeys::reasonable_split, 10)?.max(0) as usize;
        let dt_split = cxt.params.int_or(pkeys::reasonable_dt_split, 10)?.max(0) as usize;
        let min_gain = cxt.params.float_or(pkeys::min_gain, 0.05)?;
        let smoothing = cxt.params.float_or(pkeys::smoothing, 0.0)?;

        let examples: Vec<Pos> = corpus.positions().collect();
        let truth = cxt.layout.truth(0);
        let mut classes: BTreeSet<Word> = BTreeSet::new();
        for pos in &examples {
            for answer in cxt.truths.answers(&corpus.get(*pos, truth)) {
                if is_class(cxt, *answer) {
                    let _ = classes.insert(*answer);
                }
            }
        }
        let classes: Vec<Word> = classes.into_iter().collect();

        let mut builder = Builder {
            cxt,
            factory,
            corpus,
            traces,
            class_map: classes.iter().enumerate().map(|(i, c)| (*c, i)).collect(),
            rules: rules.clone(),
            questions: HashMap::new(),
            split,
            dt_split,
            min_gain,
        };

        // Pending nodes: index, examples, first rule a trace split can use
        // (`None` once feature questions started).
        let mut nodes = vec![Node::leaf(vec![])];
        let mut pending: VecDeque<(usize, Vec<Pos>, Option<RuleId>)> = VecDeque::new();
        pending.push_back((0, examples, Some(RuleId::new(0))));

        while let Some((idx, examples, from)) = pending.pop_front() {
            let counts = builder.counts(&examples);
            let split = match from {
                Some(from) => builder
                    .trace_split(&examples, from)
                    .map(|(rule, yes, no)| (rule, yes, no, Some(RuleId::new(*rule + 1)))),
                None => None,
            };
            let split = match split {
                Some(split) => Some(split),
                None => builder
                    .feature_split(&examples, &counts)?
                    .map(|(rule, yes, no)| (rule, yes, no, None)),
            };
            nodes[idx].counts = counts;
            if let Some((rule, yes, no, from)) = split {
                let (y, n) = (nodes.len(), nodes.len() + 1);
                nodes.push(Node::leaf(vec![]));
                nodes.push(Node::leaf(vec![]));
                nodes[idx].rule = Some(rule);
                nodes[idx].children = Some((y, n));
                pending.push_back((y, yes, from));
                pending.push_back((n, no, from))
            }
        }

        log! { @verb
            "tree: {} node(s), {} question(s) on features",
            nodes.len(), builder.rules.len() - rules.len()
        }
        Ok(Tree {
            rules: builder.rules,
            classes,
            nodes,
            smoothing,
        })
    }

    /// True if the question of a node holds for a sample.
    fn holds(&self, cxt: &Context, sent: &Sentence, p: isize, trace: &[RuleId], rule: RuleId) -> bool {
        let question = &self.rules[rule];
        if question.target.is_fake(cxt) {
            question.pred.test(cxt, sent, p)
        } else {
            trace.contains(&rule)
        }
    }

    /// Leaf a sample ends up in.
    pub fn classify(&self, cxt: &Context, sent: &Sentence, p: isize, trace: &[RuleId]) -> usize {
        let mut idx = 0;
        while let (Some(rule), Some((yes, no))) = (self.nodes[idx].rule, self.nodes[idx].children) {
            idx = if self.holds(cxt, sent, p, trace, rule) {
                yes
            } else {
                no
            }
        }
        idx
    }

    /// Class distribution of a sample, found by following its trace.
    pub fn probabilities(&self, cxt: &Context, sent: &Sentence, p: isize, trace: &[RuleId]) -> Vec<(Word, f64)> {
        let leaf = self.classify(cxt, sent, p, trace);
        let dist = self.nodes[leaf].distribution(self.smoothing);
        self.classes.iter().cloned().zip(dist.into_iter()).collect()
    }

    /// Class distribution of a sample under a hypothesis on the states of
    /// its sentence.
    ///
    /// `hypothesis(q, feat, val)` is the probability that state feature
    /// `feat` has value `val` at `q`. Nodes blend the distributions of their
    /// children by the probability that their question holds.
    pub fn soft_probabilities(
        &self,
        cxt: &Context,
        sent: &Sentence,
        p: isize,
        hypothesis: &dyn Fn(isize, FeatIdx, Word) -> f64,
    ) -> Vec<(Word, f64)> {
        let dist = self.soft_distribution(cxt, sent, p, hypothesis, 0);
        self.classes.iter().cloned().zip(dist.into_iter()).collect()
    }

    /// Blended distribution below a node.
    fn soft_distribution(
        &self,
        cxt: &Context,
        sent: &Sentence,
        p: isize,
        hypothesis: &dyn Fn(isize, FeatIdx, Word) -> f64,
        idx: usize,
    ) -> Vec<f64> {
        let node = &self.nodes[idx];
        let (rule, (yes, no)) = match (node.rule, node.children) {
            (Some(rule), Some(children)) => (rule, children),
            _ => return node.distribution(self.smoothing),
        };
        let prob = self.rules[rule].prob_test(cxt, sent, p, hypothesis);
        if prob >= 1.0 - min_prob {
            return self.soft_distribution(cxt, sent, p, hypothesis, yes);
        } else if prob <= min_prob {
            return self.soft_distribution(cxt, sent, p, hypothesis, no);
        }
        let mut dist = vec![0.0; self.classes.len()];
        for (d, y) in dist.iter_mut().zip(self.soft_distribution(cxt, sent, p, hypothesis, yes)) {
            *d += prob * y
        }
        for (d, n) in dist.iter_mut().zip(self.soft_distribution(cxt, sent, p, hypothesis, no)) {
            *d += (1.0 - prob) * n
        }
        dist
    }

    /// Writes a distribution, most likely class first.
    pub fn write_distribution<W: Write>(w: &mut W, cxt: &Context, dist: &[(Word, f64)]) -> Res<()> {
        let mut dist: Vec<&(Word, f64)> = dist.iter().filter(|(_, p)| *p >= min_prob).collect();
        dist.sort_by(|(c1, p1), (c2, p2)| {
            p2.partial_cmp(p1)
                .unwrap_or(::std::cmp::Ordering::Equal)
                .then(c1.cmp(c2))
        });
        for (class, p) in dist {
            write!(w, " {} ({:.6})", cxt.vocab.str(*class), p)?
        }
        Ok(())
    }

    /// Writes a tree file.
    pub fn write<W: Write>(&self, w: &mut W, cxt: &Context) -> Res<()> {
        writeln!(w, "{} {}", keys::tree_rules, self.rules.len())?;
        let classes: Vec<&str> = self.classes.iter().map(|c| cxt.vocab.str(*c)).collect();
        writeln!(w, "{} {}", keys::tree_classes, classes.join(" "))?;
        for rule in self.rules.iter() {
            rule.write(w, cxt)?
        }
        for (id, node) in self.nodes.iter().enumerate() {
            node.write(w, id, &classes)?
        }
        Ok(())
    }

    /// Reads a tree file.
    ///
    /// Templates of feature questions are registered on the fly.
    pub fn read(cxt: &mut Context, factory: &mut PredFactory, path: &Path) -> Res<Self> {
        let lines = read_lines(path)?;
        Self::of_lines(cxt, factory, &lines).chain_err(|| {
            format!(
                "while reading tree file `{}`",
                colors.emph(path.to_string_lossy())
            )
        })
    }

    /// Parses the lines of a tree file.
    pub fn of_lines(cxt: &mut Context, factory: &mut PredFactory, lines: &[String]) -> Res<Self> {
        let smoothing = cxt.params.float_or(pkeys::smoothing, 0.0)?;
        let mut lines = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());
        let (idx, line) = header(&mut lines, keys::tree_rules)?;
        let count = line[keys::tree_rules.len()..].trim();
        let count = count
            .parse::<usize>()
            .map_err(|_| parse_error("expected an integer", line, count, Some(idx + 1)))?;
        let (_, line) = header(&mut lines, keys::tree_classes)?;
        let classes: Vec<Word> = line[keys::tree_classes.len()..]
            .split_whitespace()
            .map(|class| cxt.vocab.insert(class))
            .collect();
        let class_map: HashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (cxt.vocab.str(*c).to_string(), i))
            .collect();

        let mut rule_lines = Vec::with_capacity(count);
        for _ in 0..count {
            match lines.next() {
                Some((_, line)) => rule_lines.push(line.clone()),
                None => bail!("tree file announces {} rules but ends early", count),
            }
        }
        let rules = parse_rules(cxt, factory, &rule_lines, true)?;

        let mut nodes = vec![];
        let mut next_child = 1;
        for (idx, line) in lines {
            let (id, mut node, children) = Node::parse(line, idx + 1, &class_map)?;
            if id != nodes.len() {
                bail!(parse_error(
                    format!("expected node {}", nodes.len()),
                    line,
                    "",
                    Some(idx + 1)
                ))
            }
            if let Some(rule) = node.rule {
                if *rule >= rules.len() {
                    bail!(parse_error("unknown rule", line, "", Some(idx + 1)))
                }
            }
            if children == 2 {
                node.children = Some((next_child, next_child + 1));
                next_child += 2
            }
            nodes.push(node)
        }
        if nodes.is_empty() || next_child != nodes.len() {
            bail!("tree file has {} node(s), expected {}", nodes.len(), next_child)
        }

        Ok(Tree {
            rules,
            classes,
            nodes,
            smoothing,
        })
    }
}

/// Next non-empty line of a tree file, which must start with `key`.
fn header<'a, Lines>(lines: &mut Lines, key: &str) -> Res<(usize, &'a String)>
where
    Lines: Iterator<Item = (usize, &'a String)>,
{
    match lines.next() {
        Some((idx, line)) if line.starts_with(key) => Ok((idx, line)),
        Some((idx, line)) => bail!(parse_error(
            format!("expected `{}`", key),
            line,
            "",
            Some(idx + 1)
        )),
        None => bail!("unexpected end of tree file, expected `{}`", key),
    }
}

/// True if a word can be a class of a tree.
fn is_class(cxt: &Context, word: Word) -> bool {
    word != cxt.padding
        && word != cxt.fake_class
        && cxt.vocab.find(keywords::unknown) != Some(word)
}

/// Hypothesis taking the states of a sentence as certain.
pub fn certain(sent: &Sentence) -> impl Fn(isize, FeatIdx, Word) -> f64 + '_ {
    move |q, feat, val| {
        if sent.get(q, feat) == val {
            1.0
        } else {
            0.0
        }
    }
}
