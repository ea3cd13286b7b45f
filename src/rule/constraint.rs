//! Hard constraints on the classes a rule may assign.
//!
//! A constraint file lists lines `f1 ... fn target datafile`. Each line of
//! `datafile` is `v1 ... vn c1 c2 ...`: at a position where the features
//! `f1 ... fn` have values `v1 ... vn`, the `target` slot can only receive
//! one of the classes `c1 c2 ...`. Contexts not listed are unconstrained.

use crate::{
    common::{consts::keywords::params as keys, *},
    data::{Layout, Sentence},
    rule::target::{Target, TargetTemplates},
    vocab::Vocab,
};

/// A constraint.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Context features.
    feats: Vec<FeatIdx>,
    /// Constrained state slot.
    slot: usize,
    /// Allowed classes for each context.
    allowed: HashMap<Vec<Word>, HashSet<Word>>,
}

impl Constraint {
    /// Parses a constraint line and loads its data file.
    pub fn of_line(line: &str, params: &Params, layout: &Layout, vocab: &Vocab) -> Res<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            bail!(parse_error(
                "expected `feature ... target_feature file`",
                line,
                "",
                None
            ))
        }
        let feature = |name: &str| {
            layout
                .feature(name)
                .ok_or_else(|| Error::from(ErrorKind::UnknownFeature(name.into())))
        };
        let mut feats = vec![];
        for name in &tokens[0..tokens.len() - 2] {
            feats.push(feature(name)?)
        }
        let target = feature(tokens[tokens.len() - 2])?;
        let slot = match layout.state_slot(target) {
            Some(slot) => slot,
            None if layout.is_truth(target) => *target - *layout.truth(0),
            None => bail!(parse_error(
                "not a state or truth feature",
                line,
                tokens[tokens.len() - 2],
                None
            )),
        };

        let path = params.resolve(tokens[tokens.len() - 1]);
        let mut allowed = HashMap::new();
        'lines: for data in read_lines(&path)? {
            let cols: Vec<&str> = data.split_whitespace().collect();
            if cols.len() <= feats.len() {
                continue;
            }
            let mut context = Vec::with_capacity(feats.len());
            for col in &cols[0..feats.len()] {
                match vocab.find(col) {
                    Some(word) => context.push(word),
                    None => continue 'lines,
                }
            }
            let classes: HashSet<Word> = cols[feats.len()..]
                .iter()
                .filter_map(|col| vocab.find(col))
                .filter(|word| vocab.is_class(*word))
                .collect();
            if !classes.is_empty() {
                let _ = allowed.insert(context, classes);
            }
        }
        log! { @verb
            "constraint on `{}`: {} context(s) from `{}`",
            layout.name(layout.state(slot)), allowed.len(), path.display()
        }

        Ok(Constraint {
            feats,
            slot,
            allowed,
        })
    }

    /// True if the constraint lets `val` be written in its slot at `p`.
    pub fn allows(&self, sent: &Sentence, p: isize, val: Word) -> bool {
        let context: Vec<Word> = self.feats.iter().map(|feat| sent.get(p, *feat)).collect();
        match self.allowed.get(&context) {
            Some(classes) => classes.contains(&val),
            None => true,
        }
    }
}

/// All the constraints.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    /// Constraints.
    constraints: Vec<Constraint>,
}

impl Constraints {
    /// No constraint.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if there is no constraint.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Loads the constraint file, if any.
    pub fn of_params(params: &Params, layout: &Layout, vocab: &Vocab) -> Res<Self> {
        let mut constraints = vec![];
        if let Some(path) = params.path(keys::constraints) {
            for (idx, line) in read_lines(&path)?.iter().enumerate() {
                if line.trim().is_empty() || line.starts_with('#') {
                    continue;
                }
                let constraint = Constraint::of_line(line, params, layout, vocab).chain_err(|| {
                    format!(
                        "while reading line {} of constraint file `{}`",
                        idx + 1,
                        path.display()
                    )
                })?;
                constraints.push(constraint)
            }
        }
        Ok(Constraints { constraints })
    }

    /// Adds a constraint.
    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint)
    }

    /// True if no constraint vetoes a target at some position.
    ///
    /// Targets writing the fake class are never vetoed.
    pub fn allow(
        &self,
        targets: &TargetTemplates,
        fake_class: Word,
        sent: &Sentence,
        p: isize,
        target: &Target,
    ) -> bool {
        if self.constraints.is_empty() || target.vals.first() == Some(&fake_class) {
            return true;
        }
        let slots = targets[target.tpl].slots();
        self.constraints.iter().all(|constraint| {
            match slots.iter().position(|slot| *slot == constraint.slot) {
                Some(idx) => constraint.allows(sent, p, target.vals[idx]),
                None => true,
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cxt::test::setup;

    #[test]
    fn veto() {
        let (mut cxt, corpus) = setup(
            "word tag => ttag",
            "word => tag",
            &["run VB VB", "run NN NN", "dog NN NN"],
        );
        let run = cxt.vocab.find("run").unwrap();
        let vb = cxt.vocab.find("VB").unwrap();
        let nn = cxt.vocab.find("NN").unwrap();
        let mut allowed = HashMap::new();
        let _ = allowed.insert(vec![run], vec![vb].into_iter().collect());
        cxt.constraints.push(Constraint {
            feats: vec![FeatIdx::new(0)],
            slot: 0,
            allowed,
        });

        let tpl = cxt.targets.find("tag").unwrap();
        let sent = corpus.sentence(SentIdx::new(0));
        let to_nn = Target::new(tpl, vec![nn]);
        let to_vb = Target::new(tpl, vec![vb]);
        let fake = Target::new(tpl, vec![cxt.fake_class]);
        let allow = |p: isize, target: &Target| {
            cxt.constraints
                .allow(&cxt.targets, cxt.fake_class, sent, p, target)
        };
        assert!(!allow(0, &to_nn));
        assert!(allow(0, &to_vb));
        assert!(allow(0, &fake));
        assert!(allow(2, &to_vb));
    }
}
