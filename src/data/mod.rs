//! Samples, corpus and correctness.

use crate::{common::*, vocab::Vocab};

mod corpus;
mod layout;

pub use self::corpus::{read_raw, read_raw_file, Corpus, Pos, RawCorpus, Sentence, Traces};
pub use self::layout::Layout;

/// Truth values that list several acceptable answers.
///
/// With a truth separator `|`, the truth `A|B` accepts both `A` and `B`, but
/// not `A|B` itself.
#[derive(Debug, Clone, Default)]
pub struct Truths {
    /// Separator.
    sep: Option<char>,
    /// Maps truth values with several alternatives to the alternatives.
    alts: HashMap<Word, Vec<Word>>,
}

impl Truths {
    /// Constructor.
    pub fn new(sep: Option<char>) -> Self {
        Truths {
            sep,
            alts: HashMap::new(),
        }
    }

    /// Separator.
    pub fn sep(&self) -> Option<char> {
        self.sep
    }

    /// Splits a truth string.
    pub fn split<'a>(&self, truth: &'a str) -> Vec<&'a str> {
        match self.sep {
            Some(sep) => truth.split(sep).filter(|s| !s.is_empty()).collect(),
            None => vec![truth],
        }
    }

    /// Registers the truth values of a corpus.
    ///
    /// The alternatives must already be interned.
    pub fn register(&mut self, corpus: &Corpus, layout: &Layout, vocab: &Vocab) {
        if self.sep.is_none() {
            return;
        }
        for sentence in corpus.sentences() {
            for idx in 0..sentence.len() {
                for slot in 0..layout.truth_size() {
                    let truth = sentence.get(idx as isize, layout.truth(slot));
                    if self.alts.contains_key(&truth) {
                        continue;
                    }
                    let parts = self.split(vocab.str(truth));
                    if parts.len() > 1 {
                        let parts = parts.into_iter().filter_map(|s| vocab.find(s)).collect();
                        let _ = self.alts.insert(truth, parts);
                    }
                }
            }
        }
    }

    /// True if `val` is a correct answer for `truth`.
    #[inline]
    pub fn is_correct(&self, val: Word, truth: Word) -> bool {
        match self.alts.get(&truth) {
            Some(alts) => alts.contains(&val),
            None => val == truth,
        }
    }

    /// Acceptable answers for a truth value.
    pub fn answers<'a>(&'a self, truth: &'a Word) -> &'a [Word] {
        match self.alts.get(truth) {
            Some(alts) => alts,
            None => ::std::slice::from_ref(truth),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alternatives() {
        let layout = Layout::of_str("word tag => ttag").unwrap();
        let raw = read_raw("a X X|Y\nb Y Y\n".as_bytes(), &layout, true).unwrap();
        let mut vocab = Vocab::new();
        let classes = ["X", "Y", "ZZZ"].iter().map(|s| s.to_string()).collect();
        vocab.seed(&classes, &BTreeSet::new());
        let corpus = Corpus::new(&raw, 3, 1, &mut vocab);
        let mut truths = Truths::new(Some('|'));
        truths.register(&corpus, &layout, &vocab);

        let x = vocab.find("X").unwrap();
        let y = vocab.find("Y").unwrap();
        let xy = vocab.find("X|Y").unwrap();
        assert!(truths.is_correct(x, xy));
        assert!(truths.is_correct(y, xy));
        assert!(!truths.is_correct(xy, xy));
        assert!(truths.is_correct(y, y));
        assert_eq!(truths.answers(&xy), &[x, y]);
        assert_eq!(truths.answers(&y), &[y]);
    }
}
