//! Symbol table.
//!
//! Maps strings to [`Word`]s and back, and counts occurrences. Three ranges of
//! ids matter:
//!
//! - classes (every state and truth value, padding, fake class) come first and
//!   are sorted, so class ids are `0..num_classes`;
//! - real words (values of the features subword predicates look at, plus an
//!   optional external word list) come next, also sorted;
//! - everything else is interned in order of appearance.
//!
//! Real words are also kept in two sorted string sets, one of them holding
//! the words spelled backwards, so that "which real words start (end) with
//! this string" is a range query.
//!
//! [`Word`]: ../common/struct.Word.html
//! (Word struct)

use std::ops::Bound;

use crate::common::{consts::keywords::file as keys, *};

/// Symbol table.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    /// Id to string.
    words: WordMap<String>,
    /// Occurrence counts.
    counts: WordMap<usize>,
    /// String to id.
    map: HashMap<String, Word>,
    /// Number of classes, classes are the first words.
    num_classes: usize,
    /// Real word id range, end excluded.
    real: (Word, Word),
    /// Real words.
    real_words: BTreeSet<String>,
    /// Real words spelled backwards.
    reversed_words: BTreeSet<String>,
}

/// Reverses a string.
pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

impl Vocab {
    /// Empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }
    /// True if there are no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Interns a string without counting it.
    pub fn insert(&mut self, s: &str) -> Word {
        if let Some(word) = self.map.get(s) {
            return *word;
        }
        let word = self.words.push(s.to_string());
        let _ = self.counts.push(0);
        let _ = self.map.insert(s.to_string(), word);
        word
    }

    /// Interns a string and counts one occurrence.
    pub fn intern(&mut self, s: &str) -> Word {
        let word = self.insert(s);
        self.counts[word] += 1;
        word
    }

    /// Counts one more occurrence of a word.
    pub fn count_one(&mut self, word: Word) {
        self.counts[word] += 1
    }

    /// Id of a string, if interned.
    pub fn find(&self, s: &str) -> Option<Word> {
        self.map.get(s).cloned()
    }

    /// String of a word.
    pub fn str(&self, word: Word) -> &str {
        &self.words[word]
    }

    /// Occurrence count of a word.
    pub fn count(&self, word: Word) -> usize {
        self.counts[word]
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
    /// True if a word is a class.
    pub fn is_class(&self, word: Word) -> bool {
        *word < self.num_classes
    }

    /// Real word id range.
    pub fn real_range(&self) -> (Word, Word) {
        self.real
    }

    /// Interns the classes and the real words.
    ///
    /// Must be called on an empty vocabulary.
    pub fn seed(&mut self, classes: &BTreeSet<String>, real: &BTreeSet<String>) {
        debug_assert! { self.is_empty() }
        for class in classes {
            let _ = self.insert(class);
        }
        self.num_classes = self.len();
        let start = self.words.next_index();
        for word in real {
            let _ = self.insert(word);
        }
        self.real = (start, self.words.next_index());
        self.set_real_words(real.iter().cloned())
    }

    /// Sets the real words.
    fn set_real_words<I: Iterator<Item = String>>(&mut self, words: I) {
        self.real_words.clear();
        self.reversed_words.clear();
        for word in words {
            let _ = self.reversed_words.insert(reverse(&word));
            let _ = self.real_words.insert(word);
        }
    }

    /// True if a string is a real word.
    pub fn is_real(&self, s: &str) -> bool {
        self.real_words.contains(s)
    }

    /// Real words starting with some string, itself included.
    pub fn real_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.real_words
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |word| word.starts_with(prefix))
            .map(|word| word.as_str())
    }

    /// Real words ending with some string, spelled backwards.
    pub fn real_with_suffix(&self, suffix: &str) -> impl Iterator<Item = &str> {
        let rev = reverse(suffix);
        self.reversed_words
            .range::<str, _>((Bound::Included(rev.as_str()), Bound::Unbounded))
            .take_while(move |word| word.starts_with(&rev))
            .map(|word| word.as_str())
    }

    /// Writes the vocabulary file.
    pub fn write<W: Write>(&self, w: &mut W) -> Res<()> {
        writeln!(
            w,
            "{} {} {}",
            keys::real_words,
            self.real.0,
            self.real.1
        )?;
        writeln!(w, "{} {}", keys::num_classes, self.num_classes)?;
        for word in &self.words {
            writeln!(w, "{}", word)?
        }
        Ok(())
    }

    /// Reads a vocabulary file.
    pub fn read<P: AsRef<Path>>(path: P) -> Res<Self> {
        let path = path.as_ref();
        let lines = read_lines(path)?;
        Self::of_lines(&lines)
            .chain_err(|| format!("while reading vocabulary file `{}`", path.display()))
    }

    /// Parses the lines of a vocabulary file.
    pub fn of_lines(lines: &[String]) -> Res<Self> {
        let mut vocab = Vocab::new();
        let mut real = (0, 0);
        let mut lines = lines.iter().enumerate().peekable();

        while let Some((idx, line)) = lines.peek() {
            let line_no = Some(idx + 1);
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some(keys::real_words) => {
                    let mut bound = || -> Res<usize> {
                        let token = tokens.next().unwrap_or("");
                        token.parse::<usize>().map_err(|_| {
                            parse_error("expected an integer", line, token, line_no)
                        })
                    };
                    real = (bound()?, bound()?)
                }
                Some(keys::num_classes) => {
                    let token = tokens.next().unwrap_or("");
                    vocab.num_classes = token.parse::<usize>().map_err(|_| {
                        parse_error("expected an integer", line, token, line_no)
                    })?
                }
                _ => break,
            }
            let _ = lines.next();
        }

        for (_, line) in lines {
            let _ = vocab.insert(line.trim_end());
        }

        if real.0 > real.1 || real.1 > vocab.len() || vocab.num_classes > vocab.len() {
            bail!(
                "inconsistent vocabulary header: {} words, real words {}..{}, {} classes",
                vocab.len(),
                real.0,
                real.1,
                vocab.num_classes
            )
        }
        vocab.real = (real.0.into(), real.1.into());
        let real_words: Vec<String> = (real.0..real.1)
            .map(|idx| vocab.words[Word::new(idx)].clone())
            .collect();
        vocab.set_real_words(real_words.into_iter());
        Ok(vocab)
    }
}
