//! Inverted indices from literals to corpus positions.
//!
//! Positions whose feature values (or subword literals) match a literal are
//! recorded once, padding positions included. The corpus index covers the
//! context features and never changes. The state index is updated every
//! time a rule rewrites a state value. Predicates without any indexable
//! atom fall back on the list of every real position.

use crate::{
    common::*,
    cxt::Context,
    data::{Corpus, Pos},
    pred::{Atom, Pred},
};

/// Append-only index.
#[derive(Debug, Clone, Default)]
pub struct StaticIndex {
    /// Occurrences of each literal, sorted after finalization.
    map: HashMap<Word, Vec<Pos>>,
}
impl StaticIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }
    /// Records an occurrence.
    pub fn insert(&mut self, word: Word, pos: Pos) {
        self.map.entry(word).or_insert_with(Vec::new).push(pos)
    }
    /// Sorts and compacts the occurrences.
    pub fn finalize(&mut self) {
        for occs in self.map.values_mut() {
            occs.sort();
            occs.dedup();
            occs.shrink_to_fit()
        }
    }
    /// Occurrences of a literal.
    pub fn get(&self, word: Word) -> impl Iterator<Item = Pos> + '_ {
        self.map.get(&word).into_iter().flat_map(|occs| occs.iter().cloned())
    }
    /// Number of literals.
    pub fn len(&self) -> usize {
        self.map.len()
    }
    /// True if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Mutable index over the state features.
#[derive(Debug, Clone, Default)]
pub struct StateIndex {
    /// Occurrences of each state feature value.
    map: HashMap<(FeatIdx, Word), BTreeSet<Pos>>,
}
impl StateIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }
    /// Records an occurrence.
    pub fn insert(&mut self, feat: FeatIdx, word: Word, pos: Pos) {
        let _ = self
            .map
            .entry((feat, word))
            .or_insert_with(BTreeSet::new)
            .insert(pos);
    }
    /// Forgets an occurrence.
    pub fn erase(&mut self, feat: FeatIdx, word: Word, pos: Pos) {
        if let Some(occs) = self.map.get_mut(&(feat, word)) {
            let _ = occs.remove(&pos);
            if occs.is_empty() {
                let _ = self.map.remove(&(feat, word));
            }
        }
    }
    /// Occurrences of a value.
    pub fn get(&self, feat: FeatIdx, word: Word) -> impl Iterator<Item = Pos> + '_ {
        self.map
            .get(&(feat, word))
            .into_iter()
            .flat_map(|occs| occs.iter().cloned())
    }
    /// True if an occurrence is recorded.
    pub fn contains(&self, feat: FeatIdx, word: Word, pos: Pos) -> bool {
        self.map
            .get(&(feat, word))
            .map(|occs| occs.contains(&pos))
            .unwrap_or(false)
    }
}

/// What an indexable atom records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Indexed {
    /// Raw value of a context feature.
    Context(FeatIdx),
    /// Raw value of a state feature.
    State(FeatIdx),
    /// Subword literals of a context feature.
    Subword(Atom),
}

/// The indices of a corpus.
#[derive(Debug, Clone, Default)]
pub struct Indices {
    /// Context feature values and subword literals.
    corpus: StaticIndex,
    /// State values.
    classif: StateIndex,
    /// Every real position.
    everything: Vec<Pos>,
}

impl Indices {
    /// Indexes a corpus.
    ///
    /// Without a filter, subword literals are interned and counted once per
    /// position they occur at. With a filter, only the literals it contains
    /// are indexed and the vocabulary is left untouched.
    pub fn build(cxt: &mut Context, corpus: &Corpus, filter: Option<&HashSet<Word>>) -> Self {
        let mut specs: Vec<Indexed> = vec![];
        for (_, tpl) in cxt.preds.iter() {
            for atom in tpl.atoms() {
                if !atom.is_indexable(&cxt.layout) {
                    continue;
                }
                let spec = match atom {
                    Atom::Subword { .. } => {
                        let mut atom = atom.clone();
                        if let Atom::Subword { ref mut pos, .. } = atom {
                            *pos = 0
                        }
                        Indexed::Subword(atom)
                    }
                    _ if cxt.layout.is_state(atom.feature()) => Indexed::State(atom.feature()),
                    _ => Indexed::Context(atom.feature()),
                };
                if !specs.contains(&spec) {
                    specs.push(spec)
                }
            }
        }
        let keep = |word: &Word| filter.map(|f| f.contains(word)).unwrap_or(true);

        let mut index = Indices::default();
        let mut lits = vec![];
        let mut seen: HashSet<Word> = HashSet::new();
        for (sent, sentence) in corpus.sentences().index_iter() {
            for q in sentence.padded_range() {
                let pos = Pos::new(sent, q);
                let sample = sentence.sample(q);
                if sentence.is_real(q) {
                    index.everything.push(pos)
                }
                seen.clear();
                for spec in &specs {
                    match spec {
                        Indexed::State(feat) => {
                            if keep(&sample[**feat]) {
                                index.classif.insert(*feat, sample[**feat], pos)
                            }
                        }
                        Indexed::Context(feat) => {
                            if keep(&sample[**feat]) {
                                index.corpus.insert(sample[**feat], pos)
                            }
                        }
                        Indexed::Subword(atom) => {
                            if !sentence.is_real(q) {
                                continue;
                            }
                            lits.clear();
                            atom.identify(cxt, sample, &mut lits);
                            for lit in lits.drain(0..) {
                                let word = match lit {
                                    Either::Left(word) => Some(word),
                                    Either::Right(ref s) if filter.is_some() => cxt.vocab.find(s),
                                    Either::Right(ref s) => {
                                        let word = cxt.vocab.insert(s);
                                        if seen.insert(word) {
                                            cxt.vocab.count_one(word)
                                        }
                                        Some(word)
                                    }
                                };
                                if let Some(word) = word {
                                    if keep(&word) {
                                        index.corpus.insert(word, pos)
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        index.corpus.finalize();
        log! { @verb
            "indexed {} position(s), {} literal(s)",
            index.everything.len(), index.corpus.len()
        }
        index
    }

    /// Every real position.
    pub fn everything(&self) -> &[Pos] {
        &self.everything
    }

    /// Real positions where a predicate may hold, sorted.
    ///
    /// Goes through the occurrences of the rarest indexable literal.
    pub fn candidates(&self, cxt: &Context, corpus: &Corpus, pred: &Pred) -> Vec<Pos> {
        let slot = match pred.least_frequent(cxt) {
            Some(slot) => slot,
            None => return self.everything.clone(),
        };
        let atom = &cxt.preds[pred.tpl()].atoms()[slot];
        let lit = pred.tokens()[slot];
        let offsets = atom.offsets();
        let occs: Box<dyn Iterator<Item = Pos>> = match atom {
            Atom::Feature { feat, .. } | Atom::Range { feat, .. } if cxt.layout.is_state(*feat) => {
                Box::new(self.classif.get(*feat, lit))
            }
            _ => Box::new(self.corpus.get(lit)),
        };
        let mut res = vec![];
        for occ in occs {
            let sentence = corpus.sentence(occ.sent);
            for off in &offsets {
                let p = occ.idx - off;
                if sentence.is_real(p) {
                    res.push(Pos::new(occ.sent, p))
                }
            }
        }
        res.sort();
        res.dedup();
        res
    }

    /// Updates the state index after a state value changed.
    pub fn update_state(&mut self, pos: Pos, feat: FeatIdx, old: Word, new: Word) {
        if old != new {
            self.classif.erase(feat, old, pos);
            self.classif.insert(feat, new, pos)
        }
    }

    /// State index.
    pub fn classif(&self) -> &StateIndex {
        &self.classif
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cxt::test::setup, pred::PredFactory};

    #[test]
    fn candidates() {
        let (mut cxt, corpus) = setup(
            "word tag => ttag",
            "tag_-1 word => tag\nword::--1 => tag\n{word,tag} => tag",
            &["the DT DT", "dogs NN NNS", "bark VB VBP", "", "dog NN NN", "barks VB VBZ"],
        );
        let indices = Indices::build(&mut cxt, &corpus, None);
        assert_eq!(indices.everything().len(), 5);
        let mut factory = PredFactory::new();

        let s0 = SentIdx::new(0);
        let s1 = SentIdx::new(1);
        let tpl = cxt.preds.find("tag_-1 word_0").unwrap();
        let nn = cxt.vocab.find("NN").unwrap();
        let bark = cxt.vocab.find("bark").unwrap();
        let pred = factory.mk(&cxt, tpl, vec![nn, bark]);
        let cands = indices.candidates(&cxt, &corpus, &pred);
        assert_eq!(cands, vec![Pos::new(s0, 2)]);

        // Padding literals witness the first position of each sentence.
        let zzz = cxt.vocab.find("ZZZ").unwrap();
        let the = cxt.vocab.find("the").unwrap();
        let pred = factory.mk(&cxt, tpl, vec![zzz, the]);
        assert_eq!(
            indices.candidates(&cxt, &corpus, &pred),
            vec![Pos::new(s0, 0), Pos::new(s1, 0)]
        );

        // `dogs` minus `s` is real, so is `barks` minus `s`.
        let tpl = cxt.preds.find("word_0::--1").unwrap();
        let s = cxt.vocab.find("--s").unwrap();
        assert_eq!(cxt.vocab.count(s), 2);
        let pred = factory.mk(&cxt, tpl, vec![s]);
        assert_eq!(
            indices.candidates(&cxt, &corpus, &pred),
            vec![Pos::new(s0, 1), Pos::new(s1, 1)]
        );

        // Feature sets are not indexable.
        let tpl = cxt.preds.find("{word,tag}_0").unwrap();
        let pred = factory.mk(&cxt, tpl, vec![nn]);
        assert_eq!(indices.candidates(&cxt, &corpus, &pred).len(), 5);
    }

    #[test]
    fn state_updates() {
        let (mut cxt, corpus) = setup("word tag => ttag", "tag => tag", &["a X Y", "b X Y"]);
        let mut indices = Indices::build(&mut cxt, &corpus, None);
        let x = cxt.vocab.find("X").unwrap();
        let y = cxt.vocab.find("Y").unwrap();
        let tag = cxt.layout.state(0);
        let pos = Pos::new(SentIdx::new(0), 1);
        assert!(indices.classif().contains(tag, x, pos));
        indices.update_state(pos, tag, x, y);
        assert!(!indices.classif().contains(tag, x, pos));
        assert!(indices.classif().contains(tag, y, pos));
        assert_eq!(indices.classif().get(tag, x).count(), 1);
    }
}
