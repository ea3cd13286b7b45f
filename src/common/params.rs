//! Parameter files.
//!
//! A parameter file is a list of lines `NAME = value ;`. Lines starting with
//! `#` and blank lines are ignored. A value can mention earlier definitions
//! (or environment variables) as `${NAME}`.

use crate::common::{config::bool_of_str, consts::keywords::params as keys, *};

/// Parameters read from a parameter file.
#[derive(Debug, Clone, Default)]
pub struct Params {
    /// Maps parameter names to their (substituted) value.
    map: BTreeMap<String, String>,
    /// Directory relative paths are resolved against.
    dir: Option<PathBuf>,
}

/// Splits a parameter line: whitespace separates, `=`, `;` and `#` are
/// tokens of their own.
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = vec![];
    let mut start = None;
    for (idx, c) in line.char_indices() {
        let is_sep = c.is_whitespace() || c == '=' || c == ';' || c == '#';
        if is_sep {
            if let Some(s) = start.take() {
                tokens.push(&line[s..idx])
            }
            if !c.is_whitespace() {
                tokens.push(&line[idx..idx + 1])
            }
        } else if start.is_none() {
            start = Some(idx)
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..])
    }
    tokens
}

impl Params {
    /// Empty parameters.
    pub fn new() -> Self {
        Params::default()
    }

    /// Reads a parameter file.
    pub fn of_file<P: AsRef<Path>>(path: P) -> Res<Self> {
        let path = path.as_ref();
        let mut text = String::new();
        open_reader(path)?
            .read_to_string(&mut text)
            .chain_err(|| format!("while reading parameter file `{}`", path.display()))?;
        let dir = path.parent().map(|p| p.to_path_buf());
        Self::parse(&text, dir)
            .chain_err(|| format!("while parsing parameter file `{}`", colors.emph(path.to_string_lossy())))
    }

    /// Reads the parameter file named by the fallback environment variable.
    pub fn of_env() -> Res<Self> {
        match ::std::env::var(keys::env_fallback) {
            Ok(path) if !path.is_empty() => Self::of_file(path),
            _ => bail!(
                "no parameter file given, and environment variable `{}` is not set",
                colors.emph(keys::env_fallback)
            ),
        }
    }

    /// Parses the content of a parameter file.
    pub fn parse(text: &str, dir: Option<PathBuf>) -> Res<Self> {
        let mut map = BTreeMap::new();
        for (line_idx, line) in text.lines().enumerate() {
            let line_no = Some(line_idx + 1);
            let tokens = tokenize(line);
            if tokens.is_empty() || tokens[0] == "#" {
                continue;
            }
            if tokens.len() != 4 {
                let token = tokens.get(4).cloned().unwrap_or("");
                bail!(parse_error(
                    format!("expected `NAME = value ;`, found {} words", tokens.len()),
                    line,
                    token,
                    line_no
                ))
            }
            if tokens[1] != "=" {
                bail!(parse_error("expected `=`", line, tokens[1], line_no))
            }
            if tokens[3] != ";" {
                bail!(parse_error("expected `;`", line, tokens[3], line_no))
            }
            let value = Self::substitute(&map, tokens[2], line, line_no)?;
            map.insert(tokens[0].to_string(), value);
        }
        Ok(Params { map, dir })
    }

    /// Replaces `${NAME}` occurrences.
    fn substitute(
        map: &BTreeMap<String, String>,
        value: &str,
        line: &str,
        line_no: Option<usize>,
    ) -> Res<String> {
        let mut value = value.to_string();
        while let Some(start) = value.find("${") {
            let end = match value[start + 2..].find('}') {
                Some(end) => start + 2 + end,
                None => bail!(parse_error("unterminated variable", line, &value[start..], line_no)),
            };
            let name = value[start + 2..end].to_string();
            let replacement = match map.get(&name) {
                Some(val) => val.clone(),
                None => match ::std::env::var(&name) {
                    Ok(val) => val,
                    Err(_) => return Err(ErrorKind::UndefinedVariable(name).into()),
                },
            };
            value.replace_range(start..=end, &replacement)
        }
        Ok(value)
    }

    /// Sets a parameter.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        self.map.insert(key.into(), val.into());
    }

    /// Raw value of a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    /// Value of a parameter that must be defined.
    pub fn required(&self, key: &str) -> Res<&str> {
        match self.get(key) {
            Some(val) => Ok(val),
            None => bail!(
                "parameter `{}` is not defined in the parameter file",
                colors.emph(key)
            ),
        }
    }

    /// Boolean parameter, accepts `0`/`1` and `on/true|no/off/false`.
    pub fn bool_or(&self, key: &str, default: bool) -> Res<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(val) => match val.parse::<i64>() {
                Ok(n) => Ok(n != 0),
                Err(_) => match bool_of_str(val) {
                    Some(b) => Ok(b),
                    None => bail!("expected boolean value for `{}`, got `{}`", key, val),
                },
            },
        }
    }

    /// Integer parameter.
    pub fn int_or(&self, key: &str, default: i64) -> Res<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(val) => val
                .parse::<i64>()
                .chain_err(|| format!("expected integer value for `{}`, got `{}`", key, val)),
        }
    }

    /// Optional integer parameter.
    pub fn int_opt(&self, key: &str) -> Res<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.int_or(key, 0).map(Some),
        }
    }

    /// Float parameter.
    pub fn float_or(&self, key: &str, default: f64) -> Res<f64> {
        match self.get(key) {
            None => Ok(default),
            Some(val) => val
                .parse::<f64>()
                .chain_err(|| format!("expected float value for `{}`, got `{}`", key, val)),
        }
    }

    /// Comma-separated list parameter.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|val| {
                val.split(',')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_else(Vec::new)
    }

    /// Path parameter, resolved against the parameter file's directory.
    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(|val| self.resolve(val))
    }

    /// Resolves a path against the parameter file's directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match self.dir.as_ref() {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Truth separator, if any.
    pub fn truth_separator(&self) -> Option<char> {
        self.get(keys::truth_sep).and_then(|s| s.chars().next())
    }
}

impl_fmt! {
    Params(self, fmt) {
        for (key, val) in &self.map {
            writeln!(fmt, "{} = {} ;", key, val)?
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn substitution() {
        let params = Params::parse(
            "\
# comment
ROOT = data ;
FILE_TEMPLATE = ${ROOT}/header ;

NUM_REPEATS = 3 ;
",
            None,
        )
        .unwrap();
        assert_eq!(params.get("FILE_TEMPLATE"), Some("data/header"));
        assert_eq!(params.int_or("NUM_REPEATS", 5).unwrap(), 3);
        assert_eq!(params.int_or("ORDER_BASED_ON_SIZE", 0).unwrap(), 0);
        assert!(params.bool_or("EMPTY_LINES_ARE_SEPARATORS", true).unwrap());
    }

    #[test]
    fn bad_word_count() {
        let res = Params::parse("A = b c ;\n", None);
        match res {
            Err(e) => assert!(e.is_parse_error()),
            Ok(_) => panic!("expected a parse error"),
        }
    }

    #[test]
    fn undefined_variable() {
        let res = Params::parse("A = ${TBL_SURELY_UNDEFINED_VARIABLE}/x ;\n", None);
        match res.map_err(|e| e.0) {
            Err(ErrorKind::UndefinedVariable(name)) => {
                assert_eq!(name, "TBL_SURELY_UNDEFINED_VARIABLE")
            }
            _ => panic!("expected an undefined variable error"),
        }
    }

    #[test]
    fn relative_paths() {
        let params = Params::parse("RULE_TEMPLATES = tpl ;\n", Some("rsc/x".into())).unwrap();
        assert_eq!(params.path("RULE_TEMPLATES"), Some(PathBuf::from("rsc/x/tpl")));
        assert_eq!(params.list("NULL_FEATURES"), Vec::<String>::new());
    }
}
