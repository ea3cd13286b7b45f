//! Predicates: a template and the literal each of its atoms tests.
//!
//! Predicates are hash consed, rules and index entries share them.

use crate::{common::*, cxt::Context, data::Sentence};

pub mod atom;
pub mod cooc;
pub mod template;

pub use self::atom::{Atom, SubKind};
pub use self::cooc::Coocs;
pub use self::template::{PredTemplate, PredTemplates};

/// Hash consed predicate.
pub type Pred = HConsed<PredData>;

/// Underlying representation of predicates.
#[derive(Debug, Clone)]
pub struct PredData {
    /// Template.
    tpl: PTplIdx,
    /// Literal of each atom.
    tokens: Vec<Word>,
    /// Atom slots, rarest literal first.
    order: Vec<usize>,
}

impl PartialEq for PredData {
    fn eq(&self, other: &Self) -> bool {
        self.tpl == other.tpl && self.tokens == other.tokens
    }
}
impl Eq for PredData {}
impl ::std::hash::Hash for PredData {
    fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
        self.tpl.hash(state);
        self.tokens.hash(state)
    }
}

impl PredData {
    /// Template.
    #[inline]
    pub fn tpl(&self) -> PTplIdx {
        self.tpl
    }
    /// Literals.
    #[inline]
    pub fn tokens(&self) -> &[Word] {
        &self.tokens
    }
    /// Number of atoms.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }
    /// True if the predicate has no atom.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tests the predicate at some position, rarest literal first.
    pub fn test(&self, cxt: &Context, sent: &Sentence, p: isize) -> bool {
        let atoms = cxt.preds[self.tpl].atoms();
        self.order
            .iter()
            .all(|slot| atoms[*slot].test(cxt, sent, p, self.tokens[*slot]))
    }

    /// Probability that the predicate holds, `prob` gives the probability
    /// that a state feature has some value at some position.
    pub fn prob_test(
        &self,
        cxt: &Context,
        sent: &Sentence,
        p: isize,
        prob: &dyn Fn(isize, FeatIdx, Word) -> f64,
    ) -> f64 {
        let atoms = cxt.preds[self.tpl].atoms();
        let mut res = 1.0;
        for slot in &self.order {
            res *= atoms[*slot].prob_test(cxt, sent, p, self.tokens[*slot], prob);
            if res == 0.0 {
                break;
            }
        }
        res
    }

    /// Slot of the rarest indexable literal, if any.
    pub fn least_frequent(&self, cxt: &Context) -> Option<usize> {
        let atoms = cxt.preds[self.tpl].atoms();
        self.order
            .iter()
            .find(|slot| atoms[**slot].is_indexable(&cxt.layout))
            .cloned()
    }

    /// Text of the predicate as it appears in rule files.
    pub fn text(&self, cxt: &Context) -> String {
        let tpl = &cxt.preds[self.tpl];
        let short = cxt.preds.pad() == 0;
        let mut s = String::new();
        for (slot, token) in self.tokens.iter().enumerate() {
            if slot > 0 {
                s.push(' ')
            }
            s.push_str(&tpl.unit(slot, &cxt.layout, short));
            s.push('=');
            s.push_str(cxt.vocab.str(*token))
        }
        s
    }
}

/// Predicate factory.
pub struct PredFactory {
    /// Consign.
    consign: HConsign<PredData>,
}

impl Default for PredFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl PredFactory {
    /// Constructor.
    pub fn new() -> Self {
        PredFactory {
            consign: HConsign::empty(),
        }
    }

    /// Creates a predicate.
    ///
    /// Slot order is computed from the current vocabulary counts.
    pub fn mk(&mut self, cxt: &Context, tpl: PTplIdx, tokens: Vec<Word>) -> Pred {
        debug_assert_eq! { cxt.preds[tpl].len(), tokens.len() }
        let mut order: Vec<usize> = (0..tokens.len()).collect();
        order.sort_by_key(|slot| (cxt.vocab.count(tokens[*slot]), *slot));
        (&mut self.consign).mk(PredData { tpl, tokens, order })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cxt::test::setup;

    #[test]
    fn sharing_and_order() {
        let (cxt, corpus) = setup(
            "word tag => ttag",
            "tag_-1 word => tag",
            &["the DT DT", "dog NN NN", "the DT DT", "barks NN VBZ"],
        );
        let mut factory = PredFactory::new();
        let tpl = cxt.preds.find("tag_-1 word_0").unwrap();
        let nn = cxt.vocab.find("NN").unwrap();
        let dog = cxt.vocab.find("dog").unwrap();
        let p1 = factory.mk(&cxt, tpl, vec![nn, dog]);
        let p2 = factory.mk(&cxt, tpl, vec![nn, dog]);
        assert_eq!(p1, p2);
        assert_eq!(p1.uid(), p2.uid());
        // `dog` is rarer than `NN`.
        assert_eq!(p1.order, vec![1, 0]);
        assert_eq!(p1.least_frequent(&cxt), Some(1));
        assert_eq!(p1.text(&cxt), "tag_-1=NN word_0=dog");

        let sent = corpus.sentence(SentIdx::new(0));
        let dt = cxt.vocab.find("DT").unwrap();
        let barks = cxt.vocab.find("barks").unwrap();
        let p3 = factory.mk(&cxt, tpl, vec![dt, barks]);
        assert!(p3.test(&cxt, sent, 3));
        assert!(!factory.mk(&cxt, tpl, vec![nn, barks]).test(&cxt, sent, 3));
        assert!(factory.mk(&cxt, tpl, vec![dt, dog]).test(&cxt, sent, 1));
    }
}
