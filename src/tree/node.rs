//! Tree nodes and class count helpers.

use crate::common::*;

/// A tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Question of internal nodes.
    pub rule: Option<RuleId>,
    /// Class counts of the examples reaching the node, in tree class order.
    pub counts: Vec<Score>,
    /// Children of internal nodes: question holds, question does not hold.
    pub children: Option<(usize, usize)>,
}

impl Node {
    /// Leaf.
    pub fn leaf(counts: Vec<Score>) -> Self {
        Node {
            rule: None,
            counts,
            children: None,
        }
    }

    /// True if the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Total count.
    pub fn total(&self) -> Score {
        self.counts.iter().sum()
    }

    /// Smoothed class distribution.
    ///
    /// `(c + e) / (N + K e)`, where `K` is the number of classes. All zero if
    /// the node is empty and there is no smoothing.
    pub fn distribution(&self, smoothing: f64) -> Vec<f64> {
        let total = self.total() as f64 + self.counts.len() as f64 * smoothing;
        if total <= 0.0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts
            .iter()
            .map(|count| (*count as f64 + smoothing) / total)
            .collect()
    }

    /// Writes the node line.
    pub fn write<W: Write>(&self, w: &mut W, id: usize, classes: &[&str]) -> Res<()> {
        write!(w, "ID {} RULE_ID ", id)?;
        match self.rule {
            Some(rule) => write!(w, "{}", rule)?,
            None => write!(w, "-1")?,
        }
        let nonzero: Vec<(usize, Score)> = self
            .counts
            .iter()
            .cloned()
            .enumerate()
            .filter(|(_, count)| *count != 0)
            .collect();
        write!(w, " {}", nonzero.len())?;
        for (class, count) in nonzero {
            write!(w, " {} {}", classes[class], count)?
        }
        writeln!(w, " {}", if self.is_leaf() { 0 } else { 2 })?;
        Ok(())
    }

    /// Parses a node line, returns its id, the node and its number of
    /// children.
    ///
    /// Children are not set, they depend on the position of the node in the
    /// file.
    pub fn parse(
        line: &str,
        line_no: usize,
        classes: &HashMap<String, usize>,
    ) -> Res<(usize, Self, usize)> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let err = |blah: &str, token: &str| parse_error(blah, line, token, Some(line_no));
        let int = |idx: usize| -> Res<i64> {
            match tokens.get(idx) {
                Some(token) => token
                    .parse::<i64>()
                    .map_err(|_| err("expected an integer", token)),
                None => bail!(err("unexpected end of line", "")),
            }
        };
        if tokens.first() != Some(&"ID") || tokens.get(2) != Some(&"RULE_ID") {
            bail!(err("expected `ID <id> RULE_ID <id> ...`", ""))
        }
        let id = int(1)?;
        let rule = match int(3)? {
            n if n < 0 => None,
            n => Some(RuleId::new(n as usize)),
        };
        let k = int(4)? as usize;
        let mut counts = vec![0; classes.len()];
        for pair in 0..k {
            let class = tokens.get(5 + 2 * pair).cloned().unwrap_or("");
            let class = match classes.get(class) {
                Some(class) => *class,
                None => bail!(err("unknown class", class)),
            };
            counts[class] = int(6 + 2 * pair)?
        }
        let children = int(5 + 2 * k)? as usize;
        if children != 0 && children != 2 {
            bail!(err("nodes have zero or two children", tokens[5 + 2 * k]))
        }
        if (children == 2) != rule.is_some() {
            bail!(err("only internal nodes have a question", tokens[3]))
        }
        Ok((
            id as usize,
            Node {
                rule,
                counts,
                children: None,
            },
            children,
        ))
    }
}

/// Entropy times the total count, `N ln N - sum(c ln c)`.
pub fn weighted_entropy(counts: &[Score]) -> f64 {
    let total: Score = counts.iter().sum();
    if total <= 0 {
        return 0.0;
    }
    let xlnx = |x: f64| if x > 0.0 { x * x.ln() } else { 0.0 };
    xlnx(total as f64) - counts.iter().map(|c| xlnx(*c as f64)).sum::<f64>()
}

/// Entropy, `ln N - sum(c ln c) / N`.
pub fn entropy(counts: &[Score]) -> f64 {
    let total: Score = counts.iter().sum();
    if total <= 0 {
        0.0
    } else {
        weighted_entropy(counts) / total as f64
    }
}
