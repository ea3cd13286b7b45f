//! Targets: the state values a rule writes.

use crate::{common::*, cxt::Context, data::Layout, data::Sentence};

/// A target template: the state slots a rule writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTemplate {
    /// State slots.
    slots: Vec<usize>,
    /// State names joined by spaces.
    key: String,
}

impl TargetTemplate {
    /// Parses a list of state (or truth) names.
    pub fn parse<'a, Names>(names: Names, layout: &Layout) -> Res<Self>
    where
        Names: IntoIterator<Item = &'a str>,
    {
        let mut slots = vec![];
        for name in names {
            let feat = layout
                .feature(name)
                .ok_or_else(|| Error::from(ErrorKind::UnknownFeature(name.into())))?;
            let slot = match layout.state_slot(feat) {
                Some(slot) => slot,
                None if layout.is_truth(feat) => *feat - *layout.truth(0),
                None => bail!(ErrorKind::TemplateSyntax(format!(
                    "`{}` is not a state feature and cannot be a target",
                    name
                ))),
            };
            slots.push(slot)
        }
        if slots.is_empty() {
            bail!(ErrorKind::TemplateSyntax("empty target".into()))
        }
        let names: Vec<_> = slots
            .iter()
            .map(|slot| layout.name(layout.state(*slot)))
            .collect();
        Ok(TargetTemplate {
            key: names.join(" "),
            slots,
        })
    }

    /// State slots.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }
    /// Canonical text.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Target template registry.
#[derive(Debug, Clone, Default)]
pub struct TargetTemplates {
    /// Templates.
    tpls: TTplMap<TargetTemplate>,
    /// Canonical text to template.
    keys: HashMap<String, TTplIdx>,
}

impl TargetTemplates {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }
    /// Number of templates.
    pub fn len(&self) -> usize {
        self.tpls.len()
    }
    /// True if there are no templates.
    pub fn is_empty(&self) -> bool {
        self.tpls.is_empty()
    }

    /// Registers a template.
    pub fn register(&mut self, tpl: TargetTemplate) -> TTplIdx {
        if let Some(idx) = self.keys.get(tpl.key()) {
            return *idx;
        }
        let key = tpl.key.clone();
        let idx = self.tpls.push(tpl);
        let _ = self.keys.insert(key, idx);
        idx
    }

    /// Finds a template from its canonical text.
    pub fn find(&self, key: &str) -> Option<TTplIdx> {
        self.keys.get(key).cloned()
    }
}

impl ::std::ops::Index<TTplIdx> for TargetTemplates {
    type Output = TargetTemplate;
    fn index(&self, idx: TTplIdx) -> &TargetTemplate {
        &self.tpls[idx]
    }
}

/// A target: a template and the value of each of its slots.
///
/// The derived order is only used to break ties between rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    /// Template.
    pub tpl: TTplIdx,
    /// Values.
    pub vals: Vec<Word>,
}

impl Target {
    /// Constructor.
    pub fn new(tpl: TTplIdx, vals: Vec<Word>) -> Self {
        Target { tpl, vals }
    }

    /// Governed state features and their new value.
    pub fn assignments<'a>(&'a self, cxt: &'a Context) -> impl Iterator<Item = (FeatIdx, Word)> + 'a {
        cxt.targets[self.tpl]
            .slots()
            .iter()
            .zip(self.vals.iter())
            .map(move |(slot, val)| (cxt.layout.state(*slot), *val))
    }

    /// True if the target would change the sample at `p`.
    pub fn affects(&self, cxt: &Context, sent: &Sentence, p: isize) -> bool {
        self.assignments(cxt)
            .any(|(feat, val)| sent.get(p, feat) != val)
    }

    /// True if the target writes the fake class.
    pub fn is_fake(&self, cxt: &Context) -> bool {
        self.vals.iter().all(|val| *val == cxt.fake_class)
    }

    /// Good and bad changes applying the target at `p` makes, weighted by
    /// the sentence cost.
    ///
    /// A slot counts as good if the new value is correct and the current one
    /// is not, bad if it is the other way around.
    pub fn counts(&self, cxt: &Context, sent: &Sentence, p: isize) -> (Score, Score) {
        let (mut good, mut bad) = (0, 0);
        for (slot, val) in cxt.targets[self.tpl].slots().iter().zip(self.vals.iter()) {
            let state = sent.get(p, cxt.layout.state(*slot));
            let truth = sent.get(p, cxt.layout.truth(*slot));
            match (
                cxt.truths.is_correct(*val, truth),
                cxt.truths.is_correct(state, truth),
            ) {
                (true, false) => good += sent.cost(),
                (false, true) => bad += sent.cost(),
                _ => (),
            }
        }
        (good, bad)
    }

    /// Bad changes only.
    pub fn bads(&self, cxt: &Context, sent: &Sentence, p: isize) -> Score {
        self.counts(cxt, sent, p).1
    }

    /// Targets of a template that would make a sample correct.
    ///
    /// With alternative truths, every combination is produced.
    pub fn instantiate(cxt: &Context, tpl: TTplIdx, sent: &Sentence, p: isize) -> Vec<Target> {
        let mut res: Vec<Vec<Word>> = vec![vec![]];
        for slot in cxt.targets[tpl].slots() {
            let truth = sent.get(p, cxt.layout.truth(*slot));
            let answers = cxt.truths.answers(&truth);
            let mut next = Vec::with_capacity(res.len() * answers.len());
            for prefix in &res {
                for answer in answers {
                    let mut vals = prefix.clone();
                    vals.push(*answer);
                    next.push(vals)
                }
            }
            res = next
        }
        res.into_iter().map(|vals| Target::new(tpl, vals)).collect()
    }

    /// Text of the target as it appears in rule files.
    pub fn text(&self, cxt: &Context) -> String {
        let mut s = String::new();
        for (feat, val) in self.assignments(cxt) {
            if !s.is_empty() {
                s.push(' ')
            }
            s.push_str(cxt.layout.name(feat));
            s.push('=');
            s.push_str(cxt.vocab.str(val))
        }
        s
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cxt::test::{setup, setup_with};

    #[test]
    fn templates() {
        let layout = Layout::of_str("word pos chunk => tpos tchunk").unwrap();
        let tpl = TargetTemplate::parse(vec!["chunk", "tpos"], &layout).unwrap();
        assert_eq!(tpl.slots(), &[1, 0]);
        assert_eq!(tpl.key(), "chunk pos");
        assert!(TargetTemplate::parse(vec!["word"], &layout).is_err());
        match TargetTemplate::parse(vec!["lemma"], &layout).map_err(|e| e.0) {
            Err(ErrorKind::UnknownFeature(_)) => (),
            _ => panic!("expected an unknown feature"),
        }
    }

    #[test]
    fn counting() {
        let (cxt, corpus) = setup(
            "word tag => ttag",
            "word => tag",
            &["a X Y", "b Y Y", "c Z Y"],
        );
        let tpl = cxt.targets.find("tag").unwrap();
        let sent = corpus.sentence(SentIdx::new(0));
        let y = Target::new(tpl, vec![cxt.vocab.find("Y").unwrap()]);
        let x = Target::new(tpl, vec![cxt.vocab.find("X").unwrap()]);
        assert_eq!(y.counts(&cxt, sent, 0), (1, 0));
        assert_eq!(x.counts(&cxt, sent, 1), (0, 1));
        assert_eq!(x.counts(&cxt, sent, 2), (0, 0));
        assert!(y.affects(&cxt, sent, 0));
        assert!(!y.affects(&cxt, sent, 1));
        assert_eq!(y.text(&cxt), "tag=Y");
    }

    #[test]
    fn alternatives() {
        let (cxt, corpus) = setup_with(
            "word tag => ttag",
            "word => tag",
            &["a X X|Y"],
            &[("TRUTH_SEPARATOR", "|")],
        );
        let tpl = cxt.targets.find("tag").unwrap();
        let sent = corpus.sentence(SentIdx::new(0));
        let targets = Target::instantiate(&cxt, tpl, sent, 0);
        let vals: Vec<_> = targets.iter().map(|t| cxt.vocab.str(t.vals[0])).collect();
        assert_eq!(vals, vec!["X", "Y"]);
    }
}
