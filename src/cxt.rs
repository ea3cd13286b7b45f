//! Per-run context.
//!
//! Everything a learning or inference run shares: parameters, layout,
//! vocabulary, template registries, constraints and co-occurrence tables.
//! The learner and the applier each own one.

use crate::{
    common::{consts::keywords::params as keys, *},
    data::{Corpus, Layout, RawCorpus, Sentence, Truths},
    pred::{Atom, Coocs, PredTemplates},
    rule::{Constraints, RuleTemplates, SizeOrder, Target, TargetTemplates},
    vocab::Vocab,
};

/// Per-run context.
#[derive(Debug, Clone)]
pub struct Context {
    /// Parameters.
    pub params: Params,
    /// Column layout.
    pub layout: Layout,
    /// Vocabulary.
    pub vocab: Vocab,
    /// Predicate templates.
    pub preds: PredTemplates,
    /// Target templates.
    pub targets: TargetTemplates,
    /// Rule templates.
    pub rule_tpls: RuleTemplates,
    /// Constraints.
    pub constraints: Constraints,
    /// Co-occurrence tables.
    pub coocs: Coocs,
    /// Alternative truths.
    pub truths: Truths,
    /// Values feature-set atoms never instantiate.
    pub null_features: HashSet<Word>,
    /// Tie-break on predicate size.
    pub size_order: SizeOrder,
    /// The fake class.
    pub fake_class: Word,
    /// Padding value.
    pub padding: Word,
    /// True if blank lines separate sentences.
    pub separated: bool,
}

impl Context {
    /// Loads the header and the rule templates named by the parameters.
    pub fn new(params: Params) -> Res<Self> {
        let header = params.resolve(params.required(keys::file_template)?);
        let layout = Layout::of_file(&header)?;
        let templates = params.resolve(params.required(keys::rule_templates)?);
        let mut text = String::new();
        open_reader(&templates)?
            .read_to_string(&mut text)
            .chain_err(|| format!("while reading `{}`", templates.display()))?;
        Self::of_templates(params, layout, &text).chain_err(|| {
            format!(
                "while reading rule templates from `{}`",
                colors.emph(templates.to_string_lossy())
            )
        })
    }

    /// Builds a context from a layout and the text of a rule template file.
    pub fn of_templates(params: Params, layout: Layout, templates: &str) -> Res<Self> {
        let (mut preds, mut targets) = (PredTemplates::new(), TargetTemplates::new());
        let rule_tpls = RuleTemplates::parse(templates, &layout, &mut preds, &mut targets)?;
        preds.finalize(layout.width());
        log! { @verb
            "{} rule template(s), {} predicate template(s), window of {}",
            rule_tpls.len(), preds.len(), preds.pad()
        }

        let size_order = SizeOrder::of_int(params.int_or(keys::size_order, 0)?);
        let truths = Truths::new(params.truth_separator());
        let separated = params.bool_or(keys::empty_lines_sep, true)?;

        let mut cxt = Context {
            params,
            layout,
            vocab: Vocab::new(),
            preds,
            targets,
            rule_tpls,
            constraints: Constraints::new(),
            coocs: Coocs::new(),
            truths,
            null_features: HashSet::new(),
            size_order,
            fake_class: Word::new(0),
            padding: Word::new(0),
            separated,
        };
        cxt.set_vocab(Vocab::new());
        Ok(cxt)
    }

    /// Replaces the vocabulary.
    pub fn set_vocab(&mut self, vocab: Vocab) {
        self.vocab = vocab;
        self.fake_class = self.vocab.insert(keywords::fake_class);
        self.padding = self.vocab.insert(keywords::padding);
        self.null_features = self
            .params
            .list(keys::null_features)
            .iter()
            .map(|s| self.vocab.insert(s))
            .collect();
    }

    /// Seeds the vocabulary with the classes and the real words of a
    /// training corpus.
    pub fn seed_vocab(&mut self, raw: &RawCorpus) -> Res<()> {
        let mut classes = BTreeSet::new();
        let _ = classes.insert(keywords::padding.to_string());
        let _ = classes.insert(keywords::fake_class.to_string());

        let subword_feats: BTreeSet<FeatIdx> = self
            .preds
            .iter()
            .flat_map(|(_, tpl)| tpl.atoms().iter().filter_map(|atom| atom.subword_feature()))
            .collect();
        let mut real = BTreeSet::new();

        for sample in raw.iter().flat_map(|sentence| sentence.iter()) {
            for slot in 0..self.layout.truth_size() {
                let state = &sample[*self.layout.state(slot)];
                let _ = classes.insert(state.clone());
                for truth in self.truths.split(&sample[*self.layout.truth(slot)]) {
                    let _ = classes.insert(truth.to_string());
                }
            }
            for feat in &subword_feats {
                let _ = real.insert(sample[**feat].clone());
            }
        }

        if let Some(path) = self.params.path(keys::large_vocab) {
            for line in read_lines(&path)? {
                if let Some(word) = line.split_whitespace().next() {
                    let _ = real.insert(word.to_string());
                }
            }
        }

        let mut vocab = Vocab::new();
        vocab.seed(&classes, &real);
        log! { @verb "{} class(es), {} real word(s)", classes.len(), real.len() }
        self.set_vocab(vocab);
        Ok(())
    }

    /// Interns a raw corpus.
    ///
    /// Independent samples are collapsed unless told otherwise.
    pub fn load_corpus(&mut self, raw: &RawCorpus) -> Res<Corpus> {
        let mut corpus = Corpus::new(raw, self.layout.width(), self.preds.pad(), &mut self.vocab);
        if !self.separated && !self.params.bool_or(keys::dont_collapse, false)? {
            let before = corpus.len();
            corpus.collapse();
            log! { @verb "collapsed {} sample(s) into {}", before, corpus.len() }
            if let Some(path) = self.params.path(keys::collapsed_file) {
                let mut w = open_writer(&path)?;
                corpus.write(&mut w, &self.vocab, None, false)?;
                w.flush()?
            }
        }
        self.truths.register(&corpus, &self.layout, &self.vocab);
        Ok(corpus)
    }

    /// Interns a raw corpus as is, for inference.
    pub fn intern_corpus(&mut self, raw: &RawCorpus) -> Corpus {
        let corpus = Corpus::new(raw, self.layout.width(), self.preds.pad(), &mut self.vocab);
        self.truths.register(&corpus, &self.layout, &self.vocab);
        corpus
    }

    /// Loads the constraints and the co-occurrence tables.
    ///
    /// Co-occurrence tables no file provides are built from `corpus`.
    pub fn load_side_tables(&mut self, corpus: &Corpus) -> Res<()> {
        self.constraints = Constraints::of_params(&self.params, &self.layout, &self.vocab)?;
        self.coocs = Coocs::of_params(&self.params, &self.layout, &mut self.vocab)?;
        let mut pairs = vec![];
        for (_, tpl) in self.preds.iter() {
            for atom in tpl.atoms() {
                if let Atom::Cooc { feat, pos } = atom {
                    pairs.push((*feat, *pos))
                }
            }
        }
        for (feat, pos) in pairs {
            self.coocs.build(corpus, feat, pos)
        }
        Ok(())
    }

    /// True if no constraint vetoes a target at some position.
    #[inline]
    pub fn allows(&self, sent: &Sentence, p: isize, target: &Target) -> bool {
        self.constraints
            .allow(&self.targets, self.fake_class, sent, p, target)
    }

    /// True if every state slot of a sample is correct.
    pub fn is_correct(&self, sent: &Sentence, p: isize) -> bool {
        (0..self.layout.truth_size()).all(|slot| {
            self.truths.is_correct(
                sent.get(p, self.layout.state(slot)),
                sent.get(p, self.layout.truth(slot)),
            )
        })
    }
}
