//! Atomic predicates.
//!
//! An atom is one unit of a predicate template, for instance `pos_-1` or
//! `word::3<>`. Atoms are tested against a literal at some position of a
//! sentence. Every capability (test, probabilistic test, instantiation,
//! identification of the literals to index, dependencies) is one dispatch
//! over the closed set of atom kinds.

use crate::{common::*, cxt::Context, data::Sentence};

/// Kinds of subword atoms.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SubKind {
    /// `n++`: adding the `n`-character literal in front yields a real word.
    PrefixAdd,
    /// `++n`: adding the `n`-character literal at the end yields a real word.
    SuffixAdd,
    /// `n--`: removing the `n`-character literal prefix yields a real word.
    PrefixRemove,
    /// `--n`: removing the `n`-character literal suffix yields a real word.
    SuffixRemove,
    /// `n~~`: the word starts with the literal.
    PrefixId,
    /// `~~n`: the word ends with the literal.
    SuffixId,
    /// `n<>`: the word contains the literal, which is a real word.
    Contains,
}

impl SubKind {
    /// All the kinds.
    const all: [SubKind; 7] = [
        SubKind::PrefixAdd,
        SubKind::SuffixAdd,
        SubKind::PrefixRemove,
        SubKind::SuffixRemove,
        SubKind::PrefixId,
        SubKind::SuffixId,
        SubKind::Contains,
    ];

    /// Operator and position of the operator (`true` if it comes first).
    fn op(self) -> (&'static str, bool) {
        match self {
            SubKind::PrefixAdd => ("++", false),
            SubKind::SuffixAdd => ("++", true),
            SubKind::PrefixRemove => ("--", false),
            SubKind::SuffixRemove => ("--", true),
            SubKind::PrefixId => ("~~", false),
            SubKind::SuffixId => ("~~", true),
            SubKind::Contains => ("<>", false),
        }
    }

    /// Parses the part after `::`, for instance `3<>` or `++2`.
    fn parse(s: &str) -> Option<(SubKind, usize)> {
        for kind in &Self::all {
            let (op, first) = kind.op();
            let num = if first {
                s.strip_prefix(op)
            } else {
                s.strip_suffix(op)
            };
            if let Some(num) = num {
                if let Ok(n) = num.parse::<usize>() {
                    if n > 0 {
                        return Some((*kind, n));
                    }
                }
            }
        }
        None
    }

    /// Grammar of a kind with some length.
    fn grammar(self, len: usize) -> String {
        match self.op() {
            (op, true) => format!("{}{}", op, len),
            (op, false) => format!("{}{}", len, op),
        }
    }

    /// Decorates a string to build a literal.
    pub fn decorate(self, s: &str) -> String {
        match self.op() {
            (op, true) => format!("{}{}", op, s),
            (op, false) => format!("{}{}", s, op),
        }
    }

    /// Removes the decoration of a literal.
    pub fn undecorate(self, lit: &str) -> Option<&str> {
        match self.op() {
            (op, true) => lit.strip_prefix(op),
            (op, false) => lit.strip_suffix(op),
        }
    }
}

/// Number of characters of a string.
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits a string after `n` characters, `None` if it is not longer than `n`
/// characters.
fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    match s.char_indices().nth(n) {
        Some((idx, _)) => Some((&s[..idx], &s[idx..])),
        None => None,
    }
}

/// Splits a string before its last `n` characters, `None` if it is not
/// longer than `n` characters.
fn split_chars_back(s: &str, n: usize) -> Option<(&str, &str)> {
    let len = char_len(s);
    if len <= n {
        None
    } else {
        split_chars(s, len - n)
    }
}

/// Atomic predicates.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Atom {
    /// Exact value at an offset.
    Feature {
        /// Feature.
        feat: FeatIdx,
        /// Offset.
        pos: isize,
    },
    /// Value somewhere in a window.
    Range {
        /// Feature.
        feat: FeatIdx,
        /// Lowest offset.
        lo: isize,
        /// Highest offset.
        hi: isize,
    },
    /// Subword test.
    Subword {
        /// Feature.
        feat: FeatIdx,
        /// Offset.
        pos: isize,
        /// Kind of test.
        kind: SubKind,
        /// Length of the literal in characters.
        len: usize,
    },
    /// Co-occurrence lookup.
    Cooc {
        /// Feature.
        feat: FeatIdx,
        /// Offset of the co-occurring value.
        pos: isize,
    },
    /// One of some features has the value.
    FeatureSet {
        /// Features.
        feats: Vec<FeatIdx>,
        /// Offset.
        pos: isize,
    },
}

/// Parses an offset.
fn parse_offset(s: &str, unit: &str) -> Res<isize> {
    s.parse::<isize>()
        .map_err(|_| ErrorKind::TemplateSyntax(unit.into()).into())
}

/// Parses a feature name.
fn parse_feature(layout: &crate::data::Layout, name: &str) -> Res<FeatIdx> {
    layout
        .feature(name)
        .ok_or_else(|| ErrorKind::UnknownFeature(name.into()).into())
}

/// Splits `name_k` in `name` and `k`, `0` if there is no offset.
fn name_and_offset<'a>(s: &'a str, unit: &str) -> Res<(&'a str, isize)> {
    match s.find('_') {
        Some(idx) => Ok((&s[..idx], parse_offset(&s[idx + 1..], unit)?)),
        None => Ok((s, 0)),
    }
}

impl Atom {
    /// Parses a template unit (no variable, no value).
    pub fn parse(unit: &str, layout: &crate::data::Layout) -> Res<Self> {
        let syntax = || -> Error { ErrorKind::TemplateSyntax(unit.into()).into() };

        if let Some(idx) = unit.find("::") {
            let (name, pos) = name_and_offset(&unit[..idx], unit)?;
            let feat = parse_feature(layout, name)?;
            let (kind, len) = SubKind::parse(&unit[idx + 2..]).ok_or_else(syntax)?;
            Ok(Atom::Subword {
                feat,
                pos,
                kind,
                len,
            })
        } else if let Some(idx) = unit.find("^^") {
            let feat = parse_feature(layout, &unit[..idx])?;
            let pos = parse_offset(&unit[idx + 2..], unit)?;
            Ok(Atom::Cooc { feat, pos })
        } else if let Some(rest) = unit.strip_prefix('{') {
            let close = rest.find('}').ok_or_else(syntax)?;
            let mut feats = vec![];
            for name in rest[..close].split(',') {
                feats.push(parse_feature(layout, name)?)
            }
            let pos = match &rest[close + 1..] {
                "" => 0,
                tail => match tail.strip_prefix('_') {
                    Some(num) => parse_offset(num, unit)?,
                    None => return Err(syntax()),
                },
            };
            Ok(Atom::FeatureSet { feats, pos })
        } else if let Some(idx) = unit.find(":[") {
            let (name, shift) = name_and_offset(&unit[..idx], unit)?;
            let feat = parse_feature(layout, name)?;
            let range = unit[idx + 2..].strip_suffix(']').ok_or_else(syntax)?;
            let mut bounds = range.split(',');
            let lo = shift + parse_offset(bounds.next().ok_or_else(syntax)?, unit)?;
            let hi = shift + parse_offset(bounds.next().ok_or_else(syntax)?, unit)?;
            if bounds.next().is_some() || lo > hi {
                return Err(syntax());
            }
            Ok(Atom::Range { feat, lo, hi })
        } else {
            if unit.contains(|c| c == ':' || c == '{' || c == '}' || c == '=') {
                return Err(syntax());
            }
            let (name, pos) = name_and_offset(unit, unit)?;
            let feat = parse_feature(layout, name)?;
            Ok(Atom::Feature { feat, pos })
        }
    }

    /// Text of the atom, without value.
    ///
    /// When `short`, null offsets are omitted.
    pub fn text(&self, layout: &crate::data::Layout, short: bool) -> String {
        let offset = |pos: isize| {
            if short && pos == 0 {
                "".to_string()
            } else {
                format!("_{}", pos)
            }
        };
        match self {
            Atom::Feature { feat, pos } => format!("{}{}", layout.name(*feat), offset(*pos)),
            Atom::Range { feat, lo, hi } => format!("{}:[{},{}]", layout.name(*feat), lo, hi),
            Atom::Subword {
                feat,
                pos,
                kind,
                len,
            } => format!(
                "{}{}::{}",
                layout.name(*feat),
                offset(*pos),
                kind.grammar(*len)
            ),
            Atom::Cooc { feat, pos } => format!("{}^^{}", layout.name(*feat), pos),
            Atom::FeatureSet { feats, pos } => {
                let names: Vec<_> = feats.iter().map(|f| layout.name(*f)).collect();
                format!("{{{}}}{}", names.join(","), offset(*pos))
            }
        }
    }

    /// Largest distance to the current position the atom reads.
    pub fn reach(&self) -> usize {
        match self {
            Atom::Feature { pos, .. } | Atom::Subword { pos, .. } | Atom::FeatureSet { pos, .. } => {
                pos.unsigned_abs()
            }
            Atom::Range { lo, hi, .. } => ::std::cmp::max(lo.unsigned_abs(), hi.unsigned_abs()),
            Atom::Cooc { .. } => 0,
        }
    }

    /// Positions and features the atom reads, relative to the current position.
    pub fn dependencies(&self, deps: &mut Vec<(isize, FeatIdx)>) {
        match self {
            Atom::Feature { feat, pos } | Atom::Subword { feat, pos, .. } => deps.push((*pos, *feat)),
            Atom::Range { feat, lo, hi } => {
                for pos in *lo..=*hi {
                    deps.push((pos, *feat))
                }
            }
            Atom::Cooc { feat, .. } => deps.push((0, *feat)),
            Atom::FeatureSet { feats, pos } => {
                for feat in feats {
                    deps.push((*pos, *feat))
                }
            }
        }
    }

    /// Feature the index lookup goes through.
    pub fn feature(&self) -> FeatIdx {
        match self {
            Atom::Feature { feat, .. }
            | Atom::Range { feat, .. }
            | Atom::Subword { feat, .. }
            | Atom::Cooc { feat, .. } => *feat,
            Atom::FeatureSet { feats, .. } => feats[0],
        }
    }

    /// Subword feature, if any.
    pub fn subword_feature(&self) -> Option<FeatIdx> {
        match self {
            Atom::Subword { feat, .. } => Some(*feat),
            _ => None,
        }
    }

    /// True if the atom can be looked up in an index.
    ///
    /// Subword atoms over state features are not: the state index only knows
    /// raw state values.
    pub fn is_indexable(&self, layout: &crate::data::Layout) -> bool {
        match self {
            Atom::Feature { .. } | Atom::Range { .. } => true,
            Atom::Subword { feat, .. } => !layout.is_state(*feat),
            Atom::Cooc { .. } | Atom::FeatureSet { .. } => false,
        }
    }

    /// Offsets between an indexed occurrence and the position it witnesses.
    ///
    /// An occurrence at `q` witnesses the positions `q - offset`.
    pub fn offsets(&self) -> Vec<isize> {
        match self {
            Atom::Feature { pos, .. } | Atom::Subword { pos, .. } => vec![*pos],
            Atom::Range { lo, hi, .. } => (*lo..=*hi).rev().collect(),
            Atom::Cooc { .. } | Atom::FeatureSet { .. } => vec![0],
        }
    }

    /// Tests the atom against a literal at some position.
    pub fn test(&self, cxt: &Context, sent: &Sentence, p: isize, lit: Word) -> bool {
        match self {
            Atom::Feature { feat, pos } => sent.get(p + pos, *feat) == lit,
            Atom::Range { feat, lo, hi } => (*lo..=*hi).any(|pos| sent.get(p + pos, *feat) == lit),
            Atom::Subword {
                feat,
                pos,
                kind,
                len,
            } => {
                let word = sent.get(p + pos, *feat);
                match kind.undecorate(cxt.vocab.str(lit)) {
                    Some(lit) => subword_test(cxt, *kind, *len, cxt.vocab.str(word), lit),
                    None => false,
                }
            }
            Atom::Cooc { feat, pos } => cxt
                .coocs
                .get(*feat, *pos, sent.get(p, *feat))
                .map(|vals| vals.binary_search(&lit).is_ok())
                .unwrap_or(false),
            Atom::FeatureSet { feats, pos } => feats.iter().any(|f| sent.get(p + pos, *f) == lit),
        }
    }

    /// Probabilistic test.
    ///
    /// State features are read through `prob`, the probability that a state
    /// feature has some value at some position.
    pub fn prob_test(
        &self,
        cxt: &Context,
        sent: &Sentence,
        p: isize,
        lit: Word,
        prob: &dyn Fn(isize, FeatIdx, Word) -> f64,
    ) -> f64 {
        let value = |pos: isize, feat: FeatIdx| -> f64 {
            if cxt.layout.is_state(feat) {
                prob(pos, feat, lit)
            } else if sent.get(pos, feat) == lit {
                1.0
            } else {
                0.0
            }
        };
        match self {
            Atom::Feature { feat, pos } => value(p + pos, *feat),
            Atom::Range { feat, lo, hi } => {
                1.0 - (*lo..=*hi).fold(1.0, |acc, pos| acc * (1.0 - value(p + pos, *feat)))
            }
            Atom::FeatureSet { feats, pos } => {
                1.0 - feats
                    .iter()
                    .fold(1.0, |acc, feat| acc * (1.0 - value(p + pos, *feat)))
            }
            Atom::Subword { .. } | Atom::Cooc { .. } => {
                if self.test(cxt, sent, p, lit) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Literals for which the atom holds at some position.
    ///
    /// Literals that were never interned cannot appear in any rule and are
    /// skipped.
    pub fn instantiate(&self, cxt: &Context, sent: &Sentence, p: isize, out: &mut Vec<Word>) {
        match self {
            Atom::Feature { feat, pos } => out.push(sent.get(p + pos, *feat)),
            Atom::Range { feat, lo, hi } => {
                for pos in *lo..=*hi {
                    let word = sent.get(p + pos, *feat);
                    if !out.contains(&word) {
                        out.push(word)
                    }
                }
            }
            Atom::Subword {
                feat,
                pos,
                kind,
                len,
            } => {
                let word = cxt.vocab.str(sent.get(p + pos, *feat));
                let mut lits = vec![];
                identify_subwords(cxt, *kind, *len, word, &mut lits);
                for lit in lits {
                    if let Some(word) = cxt.vocab.find(&lit) {
                        out.push(word)
                    }
                }
            }
            Atom::Cooc { feat, pos } => {
                if let Some(vals) = cxt.coocs.get(*feat, *pos, sent.get(p, *feat)) {
                    for val in vals {
                        if out.last() != Some(val) {
                            out.push(*val)
                        }
                    }
                }
            }
            Atom::FeatureSet { feats, pos } => {
                for feat in feats {
                    let word = sent.get(p + pos, *feat);
                    if !cxt.null_features.contains(&word) && !out.contains(&word) {
                        out.push(word)
                    }
                }
            }
        }
    }

    /// Literals to index for a sample, as if the sample was at the offset
    /// the atom reads.
    ///
    /// Left literals are values of the sample, right literals are decorated
    /// subword strings that may need interning.
    pub fn identify(&self, cxt: &Context, sample: &[Word], out: &mut Vec<Either<Word, String>>) {
        match self {
            Atom::Feature { feat, .. } | Atom::Range { feat, .. } => {
                out.push(Either::Left(sample[**feat]))
            }
            Atom::Subword { feat, kind, len, .. } => {
                let mut lits = vec![];
                identify_subwords(cxt, *kind, *len, cxt.vocab.str(sample[**feat]), &mut lits);
                out.extend(lits.into_iter().map(Either::Right))
            }
            Atom::Cooc { .. } | Atom::FeatureSet { .. } => (),
        }
    }
}

/// Subword test, `lit` is undecorated.
///
/// Holds exactly when `lit` decorated is one of the literals
/// [`identify_subwords`] produces for `word`.
fn subword_test(cxt: &Context, kind: SubKind, len: usize, word: &str, lit: &str) -> bool {
    if char_len(lit) != len {
        return false;
    }
    let vocab = &cxt.vocab;
    match kind {
        SubKind::PrefixAdd => vocab.is_real(&format!("{}{}", lit, word)),
        SubKind::SuffixAdd => vocab.is_real(&format!("{}{}", word, lit)),
        SubKind::PrefixRemove => match split_chars(word, len) {
            Some((pref, rest)) => pref == lit && vocab.is_real(rest),
            None => false,
        },
        SubKind::SuffixRemove => match split_chars_back(word, len) {
            Some((rest, suff)) => suff == lit && vocab.is_real(rest),
            None => false,
        },
        SubKind::PrefixId => match split_chars(word, len) {
            Some((pref, _)) => pref == lit,
            None => false,
        },
        SubKind::SuffixId => match split_chars_back(word, len) {
            Some((_, suff)) => suff == lit,
            None => false,
        },
        SubKind::Contains => char_len(word) > len && word.contains(lit) && vocab.is_real(lit),
    }
}

/// Decorated literals a subword atom holds for on some word.
fn identify_subwords(cxt: &Context, kind: SubKind, len: usize, word: &str, out: &mut Vec<String>) {
    let vocab = &cxt.vocab;
    let word_len = char_len(word);
    match kind {
        SubKind::PrefixAdd => {
            for rev in vocab.real_with_suffix(word) {
                if char_len(rev) == word_len + len {
                    let pref: String = rev.chars().rev().take(len).collect();
                    out.push(kind.decorate(&pref))
                }
            }
        }
        SubKind::SuffixAdd => {
            for real in vocab.real_with_prefix(word) {
                if char_len(real) == word_len + len {
                    if let Some((_, suff)) = split_chars(real, word_len) {
                        out.push(kind.decorate(suff))
                    }
                }
            }
        }
        SubKind::PrefixRemove => {
            if let Some((pref, rest)) = split_chars(word, len) {
                if vocab.is_real(rest) {
                    out.push(kind.decorate(pref))
                }
            }
        }
        SubKind::SuffixRemove => {
            if let Some((rest, suff)) = split_chars_back(word, len) {
                if vocab.is_real(rest) {
                    out.push(kind.decorate(suff))
                }
            }
        }
        SubKind::PrefixId => {
            if let Some((pref, _)) = split_chars(word, len) {
                out.push(kind.decorate(pref))
            }
        }
        SubKind::SuffixId => {
            if let Some((_, suff)) = split_chars_back(word, len) {
                out.push(kind.decorate(suff))
            }
        }
        SubKind::Contains => {
            if word_len > len {
                let chars: Vec<(usize, char)> = word.char_indices().collect();
                for start in 0..=word_len - len {
                    let from = chars[start].0;
                    let to = chars.get(start + len).map(|(idx, _)| *idx).unwrap_or(word.len());
                    let sub = &word[from..to];
                    if vocab.is_real(sub) {
                        let lit = kind.decorate(sub);
                        if !out.contains(&lit) {
                            out.push(lit)
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cxt::test::{context, setup};

    #[test]
    fn parsing_and_printing() {
        let cxt = context("word tag => ttag", "word_-1 => tag", &[]);
        let layout = &cxt.layout;
        let units = [
            ("word_-1", "word_-1"),
            ("word", "word_0"),
            ("tag:[-2,1]", "tag:[-2,1]"),
            ("tag_1:[-2,1]", "tag:[-1,2]"),
            ("word::3<>", "word_0::3<>"),
            ("word_1::++2", "word_1::++2"),
            ("word::2--", "word_0::2--"),
            ("word::~~3", "word_0::~~3"),
            ("word^^1", "word^^1"),
            ("{word,tag}_-1", "{word,tag}_-1"),
            ("{word,tag}", "{word,tag}_0"),
        ];
        for (unit, text) in &units {
            let atom = Atom::parse(unit, layout).unwrap();
            assert_eq!(&atom.text(layout, false), text);
            assert_eq!(Atom::parse(text, layout).unwrap(), atom)
        }
        assert_eq!(Atom::parse("word", layout).unwrap().text(layout, true), "word");
    }

    #[test]
    fn parse_errors() {
        let cxt = context("word tag => ttag", "word_-1 => tag", &[]);
        match Atom::parse("lemma_0", &cxt.layout).map_err(|e| e.0) {
            Err(ErrorKind::UnknownFeature(name)) => assert_eq!(name, "lemma"),
            _ => panic!("expected unknown feature"),
        }
        for unit in &["word::3", "word_x", "tag:[2,1]", "{word,tag}1", "word::0<>"] {
            match Atom::parse(unit, &cxt.layout).map_err(|e| e.0) {
                Err(ErrorKind::TemplateSyntax(_)) => (),
                _ => panic!("`{}` should be a syntax error", unit),
            }
        }
    }

    #[test]
    fn subword_literals() {
        let cxt = context(
            "word tag => ttag",
            "word::2-- => tag\nword::--2 => tag\nword::3<> => tag",
            &["walked VBD VBD", "walk VB VB", "talks VBZ VBZ", "ed X X"],
        );
        let mut out = vec![];
        identify_subwords(&cxt, SubKind::SuffixRemove, 2, "walked", &mut out);
        assert_eq!(out, vec!["--ed".to_string()]);
        out.clear();
        identify_subwords(&cxt, SubKind::SuffixAdd, 2, "walk", &mut out);
        assert_eq!(out, vec!["++ed".to_string()]);
        out.clear();
        identify_subwords(&cxt, SubKind::PrefixAdd, 2, "lked", &mut out);
        assert_eq!(out, vec!["wa++".to_string()]);
        out.clear();
        identify_subwords(&cxt, SubKind::PrefixId, 3, "walk", &mut out);
        assert_eq!(out, vec!["wal~~".to_string()]);
        out.clear();
        identify_subwords(&cxt, SubKind::PrefixId, 4, "walk", &mut out);
        assert!(out.is_empty());
        out.clear();
        identify_subwords(&cxt, SubKind::Contains, 4, "walked", &mut out);
        assert_eq!(out, vec!["walk<>".to_string()]);

        assert!(subword_test(&cxt, SubKind::SuffixRemove, 2, "walked", "ed"));
        assert!(!subword_test(&cxt, SubKind::SuffixRemove, 2, "talked", "ed"));
        assert!(subword_test(&cxt, SubKind::SuffixAdd, 2, "walk", "ed"));
        assert!(subword_test(&cxt, SubKind::Contains, 2, "bed", "ed"));
        assert!(!subword_test(&cxt, SubKind::Contains, 2, "ed", "ed"));
        assert!(subword_test(&cxt, SubKind::SuffixId, 1, "talks", "s"));
    }

    #[test]
    fn window_tests() {
        let (cxt, corpus) = setup(
            "word tag => ttag",
            "tag:[-1,1] => tag",
            &["the DT DT", "dog NN NN", "barks VBZ VBZ"],
        );
        let atom = Atom::parse("tag:[-1,1]", &cxt.layout).unwrap();
        let sent = corpus.sentence(SentIdx::new(0));
        let dt = cxt.vocab.find("DT").unwrap();
        let vbz = cxt.vocab.find("VBZ").unwrap();
        assert!(atom.test(&cxt, sent, 1, dt));
        assert!(atom.test(&cxt, sent, 1, vbz));
        assert!(!atom.test(&cxt, sent, 0, vbz));
        let mut out = vec![];
        atom.instantiate(&cxt, sent, 0, &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(atom.offsets(), vec![1, 0, -1]);
        assert_eq!(atom.reach(), 1);
    }
}
