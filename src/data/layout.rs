//! Column layout of the samples.

use crate::common::*;

/// Column layout, read from the header line `f1 ... fk => t1 ... tp`.
///
/// The last `p` features before `=>` are the state columns, the `p` names
/// after it are the truth columns. A sample has `k + p` columns.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Column names.
    names: FeatMap<String>,
    /// First state column.
    state_start: usize,
    /// First truth column.
    truth_start: usize,
    /// Number of state (and truth) columns.
    truth_size: usize,
}

impl Layout {
    /// Parses a header line.
    pub fn of_str(line: &str) -> Res<Self> {
        let mut names = FeatMap::new();
        let mut truth_start = None;
        for token in line.split_whitespace() {
            if token == keywords::implies {
                if truth_start.is_some() {
                    bail!(parse_error("second `=>` in header", line, token, Some(1)))
                }
                truth_start = Some(names.len());
                continue;
            }
            if token.contains(|c| c == '=' || c == '_' || c == ':' || c == '-') {
                bail!(parse_error(
                    "feature names cannot contain `=`, `_`, `:` or `-`",
                    line,
                    token,
                    Some(1)
                ))
            }
            if names.iter().any(|name| name == token) {
                bail!(parse_error("duplicate feature name", line, token, Some(1)))
            }
            let _ = names.push(token.to_string());
        }

        let truth_start = match truth_start {
            Some(start) => start,
            None => bail!(parse_error("header has no `=>`", line, "", Some(1))),
        };
        let truth_size = names.len() - truth_start;
        if truth_size == 0 || truth_size > truth_start {
            bail!(parse_error(
                format!(
                    "{} truth column(s) for {} feature(s) before `=>`",
                    truth_size, truth_start
                ),
                line,
                "",
                Some(1)
            ))
        }
        if names.len() > consts::max_features {
            bail!(ErrorKind::TooManyFeatures(names.len()))
        }

        Ok(Layout {
            names,
            state_start: truth_start - truth_size,
            truth_start,
            truth_size,
        })
    }

    /// Reads the header from the first non-empty line of a file.
    pub fn of_file<P: AsRef<Path>>(path: P) -> Res<Self> {
        let path = path.as_ref();
        let lines = read_lines(path)?;
        let line = lines
            .iter()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.as_str())
            .unwrap_or("");
        Self::of_str(line).chain_err(|| format!("while reading header file `{}`", path.display()))
    }

    /// Number of columns of a sample.
    pub fn width(&self) -> usize {
        self.names.len()
    }
    /// Number of state columns.
    pub fn truth_size(&self) -> usize {
        self.truth_size
    }
    /// Number of context columns.
    pub fn context_size(&self) -> usize {
        self.state_start
    }

    /// Feature of a name.
    pub fn feature(&self, name: &str) -> Option<FeatIdx> {
        self.names
            .index_iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(idx, _)| idx)
    }
    /// Name of a feature.
    pub fn name(&self, feat: FeatIdx) -> &str {
        &self.names[feat]
    }

    /// `i`-th state column.
    pub fn state(&self, i: usize) -> FeatIdx {
        FeatIdx::new(self.state_start + i)
    }
    /// `i`-th truth column.
    pub fn truth(&self, i: usize) -> FeatIdx {
        FeatIdx::new(self.truth_start + i)
    }
    /// State slot of a feature, if it is a state column.
    pub fn state_slot(&self, feat: FeatIdx) -> Option<usize> {
        if self.state_start <= *feat && *feat < self.truth_start {
            Some(*feat - self.state_start)
        } else {
            None
        }
    }
    /// True if a feature is a state column.
    pub fn is_state(&self, feat: FeatIdx) -> bool {
        self.state_slot(feat).is_some()
    }
    /// True if a feature is a truth column.
    pub fn is_truth(&self, feat: FeatIdx) -> bool {
        *feat >= self.truth_start
    }

    /// Context features.
    pub fn context_features(&self) -> impl Iterator<Item = FeatIdx> {
        (0..self.state_start).map(FeatIdx::new)
    }
    /// State and truth features.
    pub fn class_features(&self) -> impl Iterator<Item = FeatIdx> {
        (self.state_start..self.names.len()).map(FeatIdx::new)
    }
}

impl_fmt! {
    Layout(self, fmt) {
        for (idx, name) in self.names.index_iter() {
            if *idx == self.truth_start {
                write!(fmt, "{} ", keywords::implies)?
            }
            write!(fmt, "{}", name)?;
            if *idx + 1 < self.names.len() {
                write!(fmt, " ")?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header() {
        let layout = Layout::of_str("word pos chunk => tchunk").unwrap();
        assert_eq!(layout.width(), 4);
        assert_eq!(layout.truth_size(), 1);
        assert_eq!(layout.context_size(), 2);
        assert_eq!(layout.state(0), FeatIdx::new(2));
        assert_eq!(layout.truth(0), FeatIdx::new(3));
        assert_eq!(layout.feature("pos"), Some(FeatIdx::new(1)));
        assert_eq!(layout.state_slot(FeatIdx::new(2)), Some(0));
        assert!(!layout.is_state(FeatIdx::new(1)));
        assert_eq!(layout.to_string(), "word pos chunk => tchunk");
    }

    #[test]
    fn bad_headers() {
        for header in &["word pos", "word_1 pos => tpos", "pos => a b", "a b => c => d"] {
            match Layout::of_str(header) {
                Err(e) => assert!(e.is_parse_error(), "{}", header),
                Ok(_) => panic!("`{}` should not parse", header),
            }
        }
    }

    #[test]
    fn too_many_features() {
        let mut header: Vec<String> = (0..300).map(|i| format!("f{}", i)).collect();
        header.push("=>".into());
        header.push("t".into());
        match Layout::of_str(&header.join(" ")).map_err(|e| e.0) {
            Err(ErrorKind::TooManyFeatures(301)) => (),
            _ => panic!("expected a feature overflow"),
        }
    }
}
