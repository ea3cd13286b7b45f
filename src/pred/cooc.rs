//! Co-occurrence tables backing `f^^k` atoms.

use crate::{
    common::{consts::keywords::params as keys, *},
    data::{Corpus, Layout},
    vocab::Vocab,
};

/// Sorted values co-occurring with each value.
type Table = HashMap<Word, Vec<Word>>;

/// Co-occurrence tables, one per feature and offset.
#[derive(Debug, Clone, Default)]
pub struct Coocs {
    /// Tables.
    tables: HashMap<(FeatIdx, isize), Table>,
}

/// Parses a `name_k` token from a co-occurrence configuration line.
fn feature_and_offset(
    layout: &Layout,
    token: &str,
    line: &str,
    line_no: usize,
) -> Res<(FeatIdx, isize)> {
    let mut parts = token.splitn(2, '_');
    let name = parts.next().unwrap_or("");
    let feat = layout
        .feature(name)
        .ok_or_else(|| Error::from(ErrorKind::UnknownFeature(name.into())))?;
    let pos = match parts.next() {
        None => 0,
        Some(pos) => pos
            .parse::<isize>()
            .map_err(|_| parse_error("expected an offset", line, token, Some(line_no)))?,
    };
    Ok((feat, pos))
}

impl Coocs {
    /// Empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if there are no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Values of `feat` at offset `pos` of positions where `feat` is `key`.
    pub fn get(&self, feat: FeatIdx, pos: isize, key: Word) -> Option<&[Word]> {
        self.tables
            .get(&(feat, pos))
            .and_then(|table| table.get(&key))
            .map(|vals| vals.as_slice())
    }

    /// Loads the tables listed in a configuration file.
    ///
    /// Configuration lines are `f_p f_q file`. When `p` is zero, the first
    /// column of `file` holds the value at the current position and the
    /// second one the value at offset `q`. Otherwise the columns are swapped
    /// and the offset is `p`.
    pub fn load(
        &mut self,
        path: &Path,
        params: &Params,
        layout: &Layout,
        vocab: &mut Vocab,
    ) -> Res<()> {
        let lines = read_lines(path)?;
        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() || tokens[0].starts_with('#') {
                continue;
            }
            if tokens.len() != 3 {
                bail!(parse_error(
                    "expected `feature_offset feature_offset file`",
                    line,
                    "",
                    Some(line_no)
                ))
            }
            let (feat, fst) = feature_and_offset(layout, tokens[0], line, line_no)?;
            let (key_col, pos) = if fst == 0 {
                let (_, snd) = feature_and_offset(layout, tokens[1], line, line_no)?;
                (0, snd)
            } else {
                (1, fst)
            };

            let file = params.resolve(tokens[2]);
            let table = self.tables.entry((feat, pos)).or_insert_with(HashMap::new);
            for (idx, data) in read_lines(&file)?.iter().enumerate() {
                let cols: Vec<&str> = data.split_whitespace().collect();
                if cols.is_empty() {
                    continue;
                }
                if cols.len() != 2 {
                    bail!(parse_error(
                        format!("expected two columns in `{}`", file.display()),
                        data,
                        "",
                        Some(idx + 1)
                    ))
                }
                let key = vocab.insert(cols[key_col]);
                let val = vocab.insert(cols[1 - key_col]);
                table.entry(key).or_insert_with(Vec::new).push(val)
            }
            log! { @verb
                "co-occurrence table {}^^{} loaded from `{}`",
                layout.name(feat), pos, file.display()
            }
        }
        self.finalize();
        Ok(())
    }

    /// Builds a table from the corpus, for the pairs that no file provided.
    ///
    /// Only pairs of real positions count.
    pub fn build(&mut self, corpus: &Corpus, feat: FeatIdx, pos: isize) {
        if self.tables.contains_key(&(feat, pos)) {
            return;
        }
        let mut table = Table::new();
        for sentence in corpus.sentences() {
            let len = sentence.len() as isize;
            for j in 0..len {
                let other = j + pos;
                if other < 0 || other >= len {
                    continue;
                }
                table
                    .entry(sentence.get(j, feat))
                    .or_insert_with(Vec::new)
                    .push(sentence.get(other, feat))
            }
        }
        let _ = self.tables.insert((feat, pos), table);
        self.finalize()
    }

    /// Sorts and deduplicates the values.
    fn finalize(&mut self) {
        for table in self.tables.values_mut() {
            for vals in table.values_mut() {
                vals.sort();
                vals.dedup()
            }
        }
    }

    /// Loads the configured tables, if any.
    pub fn of_params(params: &Params, layout: &Layout, vocab: &mut Vocab) -> Res<Self> {
        let mut coocs = Coocs::new();
        if let Some(path) = params.path(keys::cooc) {
            coocs
                .load(&path, params, layout, vocab)
                .chain_err(|| format!("while loading co-occurrence tables from `{}`", path.display()))?
        }
        Ok(coocs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::read_raw;

    #[test]
    fn corpus_tables() {
        let layout = Layout::of_str("word tag => ttag").unwrap();
        let raw = read_raw(
            "new N N\nyork N N\nnew N N\njersey N N\n".as_bytes(),
            &layout,
            true,
        )
        .unwrap();
        let mut vocab = Vocab::new();
        let corpus = Corpus::new(&raw, 3, 1, &mut vocab);
        let word = FeatIdx::new(0);
        let mut coocs = Coocs::new();
        coocs.build(&corpus, word, 1);

        let new = vocab.find("new").unwrap();
        let york = vocab.find("york").unwrap();
        let jersey = vocab.find("jersey").unwrap();
        let mut expected = vec![york, jersey];
        expected.sort();
        assert_eq!(coocs.get(word, 1, new), Some(expected.as_slice()));
        assert_eq!(coocs.get(word, 1, jersey), None);
        assert_eq!(coocs.get(word, -1, new), None);
    }
}
