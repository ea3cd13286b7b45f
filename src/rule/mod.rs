//! Rules, rule selection order and rule files.

use crate::{
    common::{consts::keywords::file as keys, *},
    cxt::Context,
    data::Sentence,
    pred::{Pred, PredFactory},
};

pub mod constraint;
pub mod target;
pub mod template;

pub use self::constraint::{Constraint, Constraints};
pub use self::target::{Target, TargetTemplate, TargetTemplates};
pub use self::template::RuleTemplates;

/// Tie-break between rules with the same score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOrder {
    /// Predicates with more atoms first.
    More,
    /// Predicates with fewer atoms first.
    Less,
    /// No size preference.
    Template,
}
impl SizeOrder {
    /// Constructor from the parameter value.
    pub fn of_int(n: i64) -> Self {
        match n {
            0 => SizeOrder::More,
            1 => SizeOrder::Less,
            _ => SizeOrder::Template,
        }
    }
}

/// A rule: a predicate, a target and some counts.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Predicate.
    pub pred: Pred,
    /// Target.
    pub target: Target,
    /// Good changes.
    pub good: Score,
    /// Bad changes.
    pub bad: Score,
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.pred == other.pred && self.target == other.target
    }
}
impl Eq for Rule {}

impl Rule {
    /// Constructor, counts are zero.
    pub fn new(pred: Pred, target: Target) -> Self {
        Rule {
            pred,
            target,
            good: 0,
            bad: 0,
        }
    }

    /// Score.
    #[inline]
    pub fn score(&self) -> Score {
        self.good - self.bad
    }

    /// True if the rule fires at `p`: it would change the sample, its
    /// predicate holds and no constraint vetoes it.
    pub fn test(&self, cxt: &Context, sent: &Sentence, p: isize) -> bool {
        self.target.affects(cxt, sent, p)
            && self.pred.test(cxt, sent, p)
            && cxt.allows(sent, p, &self.target)
    }

    /// Probability that the rule fires at `p`, `prob` giving the probability
    /// that a state feature has some value at some position.
    ///
    /// Slots are taken as independent. Constraints are checked on the
    /// sentence as is. A fake target always changes the sample and is never
    /// vetoed.
    pub fn prob_test(
        &self,
        cxt: &Context,
        sent: &Sentence,
        p: isize,
        prob: &dyn Fn(isize, FeatIdx, Word) -> f64,
    ) -> f64 {
        if self.target.is_fake(cxt) {
            return self.pred.prob_test(cxt, sent, p, prob);
        }
        if !cxt.allows(sent, p, &self.target) {
            return 0.0;
        }
        let unchanged = self
            .target
            .assignments(cxt)
            .fold(1.0, |acc, (feat, val)| acc * prob(p, feat, val));
        if unchanged >= 1.0 {
            return 0.0;
        }
        (1.0 - unchanged) * self.pred.prob_test(cxt, sent, p, prob)
    }

    /// True if `self` is strictly better than `other`.
    ///
    /// Higher score first, then the size order, then the greater target,
    /// then the earlier template, then the greater literals.
    pub fn better(&self, other: &Rule, order: SizeOrder) -> bool {
        use std::cmp::Ordering::*;
        match self.score().cmp(&other.score()) {
            Greater => return true,
            Less => return false,
            Equal => (),
        }
        let (mine, yours) = (self.pred.len(), other.pred.len());
        match order {
            SizeOrder::More if mine != yours => return mine > yours,
            SizeOrder::Less if mine != yours => return mine < yours,
            _ => (),
        }
        if self.target != other.target {
            return other.target < self.target;
        }
        if self.pred.tpl() != other.pred.tpl() {
            return self.pred.tpl() < other.pred.tpl();
        }
        other.pred.tokens() < self.pred.tokens()
    }

    /// Text of the rule: predicate and target.
    pub fn text(&self, cxt: &Context) -> String {
        format!(
            "{} {} {}",
            self.pred.text(cxt),
            keywords::implies,
            self.target.text(cxt)
        )
    }

    /// Writes the rule-file line of the rule.
    pub fn write<W: Write>(&self, w: &mut W, cxt: &Context) -> Res<()> {
        writeln!(
            w,
            "{}{} {}{} {}{} {} {}",
            keys::good,
            self.good,
            keys::bad,
            self.bad,
            keys::score,
            self.score(),
            keys::rule_prefix,
            self.text(cxt)
        )?;
        Ok(())
    }

    /// Parses a rule-file line.
    ///
    /// When `register` is set, unknown templates are registered instead of
    /// being rejected. This is used for the questions of tree files.
    pub fn parse(
        cxt: &mut Context,
        factory: &mut PredFactory,
        line: &str,
        line_no: Option<usize>,
        register: bool,
    ) -> Res<Self> {
        let text = match line.find(keys::rule_prefix) {
            Some(idx) => &line[idx + keys::rule_prefix.len()..],
            None => line,
        };
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let arrow = match tokens.iter().position(|t| *t == keywords::implies) {
            Some(arrow) => arrow,
            None => bail!(parse_error("rule has no `=>`", line, "", line_no)),
        };

        let split = |token: &str| -> Res<(String, String)> {
            match token.find('=') {
                Some(idx) => Ok((token[..idx].to_string(), token[idx + 1..].to_string())),
                None => bail!(parse_error(
                    "expected `feature=value`",
                    line,
                    token,
                    line_no
                )),
            }
        };
        let mut units = vec![];
        let mut values = vec![];
        for token in &tokens[0..arrow] {
            let (unit, value) = split(token)?;
            units.push(unit);
            values.push(value)
        }
        let mut names = vec![];
        let mut vals = vec![];
        for token in &tokens[arrow + 1..] {
            let (name, value) = split(token)?;
            names.push(name);
            vals.push(value)
        }

        let pred_tpl = cxt
            .preds
            .parse_units(units.iter().map(|s| s.as_str()), &cxt.layout)?;
        let pred_tpl = match cxt.preds.find(pred_tpl.key()) {
            Some(idx) => idx,
            None if register => cxt.preds.register(pred_tpl)?.0,
            None => bail!(ErrorKind::UnknownTemplate(pred_tpl.key().into())),
        };
        let target_tpl = TargetTemplate::parse(names.iter().map(|s| s.as_str()), &cxt.layout)?;
        let target_tpl = match cxt.targets.find(target_tpl.key()) {
            Some(idx) => idx,
            None if register => cxt.targets.register(target_tpl),
            None => bail!(ErrorKind::UnknownTemplate(target_tpl.key().into())),
        };

        let tokens = values.iter().map(|val| cxt.vocab.insert(val)).collect();
        let vals = vals.iter().map(|val| cxt.vocab.insert(val)).collect();
        let pred = factory.mk(cxt, pred_tpl, tokens);
        Ok(Rule::new(pred, Target::new(target_tpl, vals)))
    }
}

/// Vocabulary file named by the header of a rule file.
///
/// Relative paths are resolved against the directory of the rule file.
pub fn voc_file(rule_file: &Path, lines: &[String]) -> Option<PathBuf> {
    for line in lines {
        if let Some(rest) = line.trim().strip_prefix(keys::train_voc) {
            let path = Path::new(rest.trim());
            return Some(match rule_file.parent() {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.to_path_buf(),
            });
        }
        if !line.starts_with('#') && !line.trim().is_empty() {
            break;
        }
    }
    None
}

/// Parses the rules of a rule file.
pub fn parse_rules(
    cxt: &mut Context,
    factory: &mut PredFactory,
    lines: &[String],
    register: bool,
) -> Res<RuleIdMap<Rule>> {
    let mut rules = RuleIdMap::new();
    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let rule = Rule::parse(cxt, factory, line, Some(idx + 1), register)?;
        let _ = rules.push(rule);
    }
    Ok(rules)
}

/// Reads a rule file.
pub fn read_rules(
    cxt: &mut Context,
    factory: &mut PredFactory,
    path: &Path,
) -> Res<RuleIdMap<Rule>> {
    let lines = read_lines(path)?;
    parse_rules(cxt, factory, &lines, false).chain_err(|| {
        format!(
            "while reading rule file `{}`",
            colors.emph(path.to_string_lossy())
        )
    })
}

/// Writes a rule file.
pub fn write_rules<'a, W, Rules>(w: &mut W, cxt: &Context, voc: &str, rules: Rules) -> Res<()>
where
    W: Write,
    Rules: IntoIterator<Item = &'a Rule>,
{
    writeln!(w, "{} {}", keys::train_voc, voc)?;
    for rule in rules {
        rule.write(w, cxt)?
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cxt::test::context;

    #[test]
    fn size_orders() {
        let mut cxt = context(
            "word tag => ttag",
            "word => tag\nword tag_-1 => tag",
            &["a X Y", "b Y Y"],
        );
        let mut factory = PredFactory::new();
        let mut short = Rule::parse(&mut cxt, &mut factory, "word_0=a => tag=Y", None, false)
            .unwrap();
        let mut long = Rule::parse(
            &mut cxt,
            &mut factory,
            "word_0=a tag_-1=ZZZ => tag=Y",
            None,
            false,
        )
        .unwrap();
        short.good = 3;
        long.good = 3;
        assert!(long.better(&short, SizeOrder::More));
        assert!(!short.better(&long, SizeOrder::More));
        assert!(short.better(&long, SizeOrder::Less));
        assert!(!long.better(&short, SizeOrder::Less));
        // Same target, earlier template wins.
        assert!(short.better(&long, SizeOrder::Template));
        long.bad = 1;
        assert!(short.better(&long, SizeOrder::More));
    }

    #[test]
    fn target_and_literal_ties() {
        let mut cxt = context("word tag => ttag", "word => tag", &["a X Y", "b Y X"]);
        let mut factory = PredFactory::new();
        let mut parse = |line: &str| Rule::parse(&mut cxt, &mut factory, line, None, false).unwrap();
        let ax = parse("word=a => tag=X");
        let ay = parse("word=a => tag=Y");
        let bx = parse("word=b => tag=X");
        // Greater target wins, then greater literals.
        assert!(ay.better(&ax, SizeOrder::More));
        assert!(!ax.better(&ay, SizeOrder::More));
        assert!(bx.better(&ax, SizeOrder::More));
        assert!(!ax.better(&ax, SizeOrder::More));
    }

    #[test]
    fn rule_file_round_trip() {
        let mut cxt = context(
            "word tag => ttag",
            "W = word::2~~\ntag_-1 word => tag\n$W => tag",
            &["walks X Y", "talks Y Y"],
        );
        let mut factory = PredFactory::new();
        let lines: Vec<String> = vec![
            "#train_voc_file: rules.voc".into(),
            "GOOD:3 BAD:1 SCORE:2 RULE: tag_-1=X word_0=talks => tag=Y".into(),
            "$W=ta~~ => tag=X".into(),
        ];
        let rules = parse_rules(&mut cxt, &mut factory, &lines, false).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(
            voc_file(Path::new("out/rules"), &lines),
            Some(PathBuf::from("out/rules.voc"))
        );

        let mut out = vec![];
        write_rules(&mut out, &cxt, "rules.voc", &rules).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "\
#train_voc_file: rules.voc
GOOD:0 BAD:0 SCORE:0 RULE: tag_-1=X word_0=talks => tag=Y
GOOD:0 BAD:0 SCORE:0 RULE: $W=ta~~ => tag=X
"
        );
        let lines: Vec<String> = text.lines().map(|s| s.to_string()).collect();
        let again = parse_rules(&mut cxt, &mut factory, &lines, false).unwrap();
        for (r1, r2) in rules.iter().zip(again.iter()) {
            assert_eq!(r1, r2)
        }
    }

    #[test]
    fn rule_errors() {
        let mut cxt = context("word tag => ttag", "word => tag", &["a X Y"]);
        let mut factory = PredFactory::new();
        let mut parse = |line: &str| Rule::parse(&mut cxt, &mut factory, line, Some(1), false);
        match parse("word_0=a tag=X => tag=Y").map_err(|e| e.0) {
            Err(ErrorKind::UnknownTemplate(key)) => assert_eq!(key, "word_0 tag_0"),
            _ => panic!("expected an unknown template"),
        }
        match parse("word_0 => tag=Y").map_err(|e| e.0) {
            Err(ErrorKind::ParseError(_)) => (),
            _ => panic!("expected a parse error"),
        }
        match parse("word_0=a").map_err(|e| e.0) {
            Err(ErrorKind::ParseError(_)) => (),
            _ => panic!("expected a parse error"),
        }
    }
}
