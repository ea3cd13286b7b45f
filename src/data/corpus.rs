//! Corpus, sentences and rule traces.

use crate::{common::*, data::Layout, vocab::Vocab};

/// A position in the corpus: sentence and sample index.
///
/// Indices of padding samples are negative or past the end of the sentence.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Pos {
    /// Sentence.
    pub sent: SentIdx,
    /// Sample index in the sentence.
    pub idx: isize,
}
impl Pos {
    /// Constructor.
    pub fn new(sent: SentIdx, idx: isize) -> Self {
        Pos { sent, idx }
    }
}
impl_fmt! {
    Pos(self, fmt) {
        write!(fmt, "{}:{}", self.sent, self.idx)
    }
}

/// Raw corpus: sentences of samples of columns.
pub type RawCorpus = Vec<Vec<Vec<String>>>;

/// Reads a corpus file.
///
/// When `separated`, blank lines separate sentences. Otherwise each line is a
/// sentence of its own and blank lines are ignored.
pub fn read_raw<R: BufRead>(reader: R, layout: &Layout, separated: bool) -> Res<RawCorpus> {
    let mut corpus = vec![];
    let mut sentence = vec![];
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let columns: Vec<String> = line.split_whitespace().map(|s| s.to_string()).collect();
        if columns.is_empty() {
            if !sentence.is_empty() {
                corpus.push(::std::mem::take(&mut sentence))
            }
            continue;
        }
        if columns.len() != layout.width() {
            bail!(ErrorKind::ColumnCount(idx + 1, layout.width(), columns.len()))
        }
        sentence.push(columns);
        if !separated {
            corpus.push(::std::mem::take(&mut sentence))
        }
    }
    if !sentence.is_empty() {
        corpus.push(sentence)
    }
    Ok(corpus)
}

/// Reads a corpus file from a path.
pub fn read_raw_file<P: AsRef<Path>>(path: P, layout: &Layout, separated: bool) -> Res<RawCorpus> {
    let path = path.as_ref();
    read_raw(open_reader(path)?, layout, separated)
        .chain_err(|| format!("while reading corpus `{}`", colors.emph(path.to_string_lossy())))
}

/// A sentence: real samples surrounded by padding samples.
///
/// Samples are stored contiguously, padding included. Positions are relative
/// to the first real sample and range over `-pad..len + pad`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// All the cells, padding included.
    cells: Vec<Word>,
    /// Number of real samples.
    len: usize,
    /// Padding on each side.
    pad: usize,
    /// Sample width.
    width: usize,
    /// Weight of every sample of the sentence.
    cost: Score,
}

impl Sentence {
    /// Builds a sentence from its real samples.
    pub fn new(samples: &[Vec<Word>], width: usize, pad: usize, padding: Word, cost: Score) -> Self {
        let mut cells = Vec::with_capacity((samples.len() + 2 * pad) * width);
        cells.resize(pad * width, padding);
        for sample in samples {
            debug_assert_eq! { sample.len(), width }
            cells.extend(sample.iter().cloned())
        }
        cells.resize(cells.len() + pad * width, padding);
        Sentence {
            cells,
            len: samples.len(),
            pad,
            width,
            cost,
        }
    }

    /// Number of real samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }
    /// True if the sentence has no real sample.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// Cost of the samples.
    #[inline]
    pub fn cost(&self) -> Score {
        self.cost
    }

    /// Offset of a sample in the cells.
    #[inline]
    fn offset(&self, pos: isize) -> usize {
        let idx = pos + self.pad as isize;
        debug_assert! { idx >= 0 && (idx as usize) < self.len + 2 * self.pad }
        idx as usize * self.width
    }

    /// Sample at some position.
    #[inline]
    pub fn sample(&self, pos: isize) -> &[Word] {
        let start = self.offset(pos);
        &self.cells[start..start + self.width]
    }

    /// Feature value at some position.
    #[inline]
    pub fn get(&self, pos: isize, feat: FeatIdx) -> Word {
        self.cells[self.offset(pos) + *feat]
    }

    /// All positions, padding included.
    pub fn padded_range(&self) -> ::std::ops::Range<isize> {
        -(self.pad as isize)..(self.len + self.pad) as isize
    }

    /// True if a position is a real sample.
    #[inline]
    pub fn is_real(&self, pos: isize) -> bool {
        0 <= pos && pos < self.len as isize
    }

    /// True if a position (plus some offset) is inside the padded sentence.
    #[inline]
    pub fn in_window(&self, pos: isize) -> bool {
        -(self.pad as isize) <= pos && pos < (self.len + self.pad) as isize
    }

    /// Sets a feature at a real position.
    #[inline]
    pub fn set(&mut self, pos: usize, feat: FeatIdx, val: Word) {
        let offset = self.offset(pos as isize);
        self.cells[offset + *feat] = val
    }
}

/// A corpus of sentences.
#[derive(Debug, Clone)]
pub struct Corpus {
    /// Sentences.
    sentences: SentMap<Sentence>,
    /// Sample width.
    width: usize,
    /// Padding on each side of a sentence.
    pad: usize,
}

impl Corpus {
    /// Interns a raw corpus.
    ///
    /// Every value is counted once, padding is not counted.
    pub fn new(raw: &RawCorpus, width: usize, pad: usize, vocab: &mut Vocab) -> Self {
        let padding = vocab.insert(keywords::padding);
        let mut sentences = SentMap::with_capacity(raw.len());
        for sentence in raw {
            let samples: Vec<Vec<Word>> = sentence
                .iter()
                .map(|sample| sample.iter().map(|val| vocab.intern(val)).collect())
                .collect();
            let _ = sentences.push(Sentence::new(&samples, width, pad, padding, 1));
        }
        Corpus {
            sentences,
            width,
            pad,
        }
    }

    /// Merges identical one-sample sentences, the cost of the result is the
    /// multiplicity. First-appearance order is preserved.
    pub fn collapse(&mut self) {
        let mut order: Vec<Sentence> = vec![];
        let mut known: HashMap<Vec<Word>, usize> = HashMap::new();
        for sentence in self.sentences.drain(0..) {
            let key = sentence.sample(0).to_vec();
            if sentence.len() == 1 {
                if let Some(idx) = known.get(&key) {
                    order[*idx].cost += sentence.cost;
                    continue;
                }
                let _ = known.insert(key, order.len());
            }
            order.push(sentence)
        }
        self.sentences = order.into()
    }

    /// Number of sentences.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }
    /// True if there are no sentences.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
    /// Padding on each side of the sentences.
    pub fn pad(&self) -> usize {
        self.pad
    }
    /// Sample width.
    pub fn width(&self) -> usize {
        self.width
    }
    /// Number of real samples.
    pub fn num_samples(&self) -> usize {
        self.sentences.iter().map(|s| s.len()).sum()
    }
    /// Sum of the costs of the real samples.
    pub fn total_cost(&self) -> Score {
        self.sentences
            .iter()
            .map(|s| s.len() as Score * s.cost())
            .sum()
    }

    /// Sentences.
    pub fn sentences(&self) -> &SentMap<Sentence> {
        &self.sentences
    }
    /// Sentence accessor.
    #[inline]
    pub fn sentence(&self, sent: SentIdx) -> &Sentence {
        &self.sentences[sent]
    }
    /// Mutable sentence accessor.
    #[inline]
    pub fn sentence_mut(&mut self, sent: SentIdx) -> &mut Sentence {
        &mut self.sentences[sent]
    }

    /// All real positions, in order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.sentences
            .index_iter()
            .flat_map(|(sent, sentence)| {
                (0..sentence.len() as isize).map(move |idx| Pos::new(sent, idx))
            })
    }

    /// Value of a feature at a position.
    #[inline]
    pub fn get(&self, pos: Pos, feat: FeatIdx) -> Word {
        self.sentences[pos.sent].get(pos.idx, feat)
    }

    /// Sub-corpus of some sentences, used for batches.
    pub fn slice(&self, sents: ::std::ops::Range<usize>) -> Self {
        Corpus {
            sentences: self.sentences.as_slice()[sents].iter().cloned().collect(),
            width: self.width,
            pad: self.pad,
        }
    }

    /// Appends the sentences of another corpus (batch).
    pub fn append(&mut self, mut other: Corpus) {
        debug_assert_eq! { self.width, other.width }
        self.sentences.append(&mut *other.sentences)
    }

    /// Writes a sample, followed by its trace if any.
    pub fn write_sample<W: Write>(
        &self,
        w: &mut W,
        vocab: &Vocab,
        pos: Pos,
        trace: Option<&[RuleId]>,
    ) -> Res<()> {
        let sample = self.sentences[pos.sent].sample(pos.idx);
        for_first! {
            sample.iter() => {
                |fst| write!(w, "{}", vocab.str(*fst))?,
                then |nxt| write!(w, " {}", vocab.str(*nxt))?,
            }
        }
        if let Some(trace) = trace {
            write!(w, " |")?;
            for id in trace {
                write!(w, " {}", id)?
            }
        }
        Ok(())
    }

    /// Writes the whole corpus, with traces if any.
    pub fn write<W: Write>(
        &self,
        w: &mut W,
        vocab: &Vocab,
        traces: Option<&Traces>,
        separated: bool,
    ) -> Res<()> {
        for (sent, sentence) in self.sentences.index_iter() {
            for idx in 0..sentence.len() as isize {
                let pos = Pos::new(sent, idx);
                self.write_sample(w, vocab, pos, traces.map(|t| t.get(pos)))?;
                writeln!(w)?
            }
            if separated {
                writeln!(w)?
            }
        }
        Ok(())
    }
}

/// Rules that fired on each position, in application order.
#[derive(Debug, Clone, Default)]
pub struct Traces {
    /// Traces of the positions of each sentence.
    traces: SentMap<Vec<Vec<RuleId>>>,
}
impl Traces {
    /// Empty traces for a corpus.
    pub fn new(corpus: &Corpus) -> Self {
        Traces {
            traces: corpus
                .sentences()
                .iter()
                .map(|s| vec![vec![]; s.len()])
                .collect(),
        }
    }
    /// Appends a rule to the trace of a position.
    pub fn push(&mut self, pos: Pos, rule: RuleId) {
        self.traces[pos.sent][pos.idx as usize].push(rule)
    }
    /// Trace of a position.
    pub fn get(&self, pos: Pos) -> &[RuleId] {
        &self.traces[pos.sent][pos.idx as usize]
    }
    /// Appends the traces of another corpus (batch).
    pub fn append(&mut self, mut other: Traces) {
        self.traces.append(&mut *other.traces)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout() -> Layout {
        Layout::of_str("word tag => ttag").unwrap()
    }

    #[test]
    fn sentences_and_padding() {
        let text = "the DT DT\ndog NN NN\n\nruns VB VBZ\n";
        let raw = read_raw(text.as_bytes(), &layout(), true).unwrap();
        assert_eq!(raw.len(), 2);
        let mut vocab = Vocab::new();
        let corpus = Corpus::new(&raw, 3, 2, &mut vocab);
        assert_eq!(corpus.num_samples(), 3);
        let zzz = vocab.find("ZZZ").unwrap();
        let sent = corpus.sentence(SentIdx::new(0));
        assert_eq!(sent.get(-2, FeatIdx::new(0)), zzz);
        assert_eq!(sent.get(3, FeatIdx::new(2)), zzz);
        assert_eq!(vocab.str(sent.get(1, FeatIdx::new(0))), "dog");
        assert_eq!(vocab.count(vocab.find("DT").unwrap()), 2);
        assert_eq!(vocab.count(zzz), 0);
        let positions: Vec<_> = corpus.positions().collect();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions[2], Pos::new(SentIdx::new(1), 0));
    }

    #[test]
    fn column_count() {
        let text = "the DT DT\ndog NN\n";
        match read_raw(text.as_bytes(), &layout(), true).map_err(|e| e.0) {
            Err(ErrorKind::ColumnCount(2, 3, 2)) => (),
            _ => panic!("expected a column count error"),
        }
    }

    #[test]
    fn collapsing() {
        let text = "a X Y\nb X Y\na X Y\n\na X Y\n";
        let raw = read_raw(text.as_bytes(), &layout(), false).unwrap();
        assert_eq!(raw.len(), 4);
        let mut vocab = Vocab::new();
        let mut corpus = Corpus::new(&raw, 3, 0, &mut vocab);
        corpus.collapse();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.sentence(SentIdx::new(0)).cost(), 3);
        assert_eq!(corpus.sentence(SentIdx::new(1)).cost(), 1);
        assert_eq!(corpus.total_cost(), 4);

        let mut out = vec![];
        corpus.write(&mut out, &vocab, None, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a X Y\nb X Y\n");
    }
}
