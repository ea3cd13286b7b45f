//! Rule template files.
//!
//! ```text
//! # comment
//! W = word::3~~
//! tag_-1 word => tag
//! $W tag_1 => tag
//! ```

use crate::{
    common::*,
    data::Layout,
    pred::PredTemplates,
    rule::target::{TargetTemplate, TargetTemplates},
};

/// Rule templates: the target templates of each predicate template.
#[derive(Debug, Clone, Default)]
pub struct RuleTemplates {
    /// Target templates of each predicate template.
    rules: PTplMap<Vec<TTplIdx>>,
    /// Number of rule templates.
    count: usize,
}

impl RuleTemplates {
    /// Empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rule templates.
    pub fn len(&self) -> usize {
        self.count
    }
    /// True if there are no rule templates.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Target templates of a predicate template.
    pub fn targets(&self, tpl: PTplIdx) -> &[TTplIdx] {
        match self.rules.get(*tpl) {
            Some(targets) => targets,
            None => &[],
        }
    }

    /// Adds a rule template, returns `false` if it was already there.
    pub fn add(&mut self, pred: PTplIdx, target: TTplIdx) -> bool {
        while self.rules.len() <= *pred {
            let _ = self.rules.push(vec![]);
        }
        if self.rules[pred].contains(&target) {
            false
        } else {
            self.rules[pred].push(target);
            self.count += 1;
            true
        }
    }

    /// Parses a rule template file.
    pub fn parse(
        text: &str,
        layout: &Layout,
        preds: &mut PredTemplates,
        targets: &mut TargetTemplates,
    ) -> Res<Self> {
        let mut res = RuleTemplates::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = Some(idx + 1);
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.is_empty() || tokens[0].starts_with('#') {
                continue;
            }

            if tokens.len() == 3 && tokens[1] == "=" {
                preds.define(tokens[0], tokens[2]);
                continue;
            }

            let arrow = match tokens.iter().position(|t| *t == keywords::implies) {
                Some(arrow) => arrow,
                None => bail!(parse_error(
                    "rule template has no `=>`",
                    line,
                    "",
                    line_no
                )),
            };

            let context = || format!("in rule template `{}` (line {})", line.trim(), idx + 1);
            let pred = preds
                .parse_units(tokens[0..arrow].iter().cloned(), layout)
                .chain_err(context)?;
            let target = TargetTemplate::parse(tokens[arrow + 1..].iter().cloned(), layout)
                .chain_err(context)?;
            let key = format!("{} => {}", pred.key(), target.key());
            let (pred, _) = preds.register(pred).chain_err(context)?;
            let target = targets.register(target);
            if !res.add(pred, target) {
                log! { @verb "skipping duplicate rule template `{}`", key }
            }
        }
        Ok(res)
    }

    /// Reads a rule template file.
    pub fn of_file(
        path: &Path,
        layout: &Layout,
        preds: &mut PredTemplates,
        targets: &mut TargetTemplates,
    ) -> Res<Self> {
        let mut text = String::new();
        open_reader(path)?.read_to_string(&mut text)?;
        Self::parse(&text, layout, preds, targets).chain_err(|| {
            format!(
                "while reading rule templates from `{}`",
                colors.emph(path.to_string_lossy())
            )
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(text: &str) -> Res<(RuleTemplates, PredTemplates, TargetTemplates)> {
        let layout = Layout::of_str("word pos => tpos")?;
        let (mut preds, mut targets) = (PredTemplates::new(), TargetTemplates::new());
        let rules = RuleTemplates::parse(text, &layout, &mut preds, &mut targets)?;
        Ok((rules, preds, targets))
    }

    #[test]
    fn variables_and_duplicates() {
        let (rules, preds, targets) = parse(
            "\
# templates
W = word::2~~
pos_-1 => pos
$W pos_1 => pos

pos_-1 => pos
word_0::2~~ pos_1 => pos
",
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(preds.len(), 2);
        assert_eq!(targets.len(), 1);
        assert_eq!(preds.pad(), 1);
        let tpl = preds.find("pos_-1").unwrap();
        assert_eq!(rules.targets(tpl), &[TTplIdx::new(0)]);
    }

    #[test]
    fn errors() {
        match parse("pos_-1 pos\n").map_err(|e| e.0) {
            Err(ErrorKind::ParseError(_)) => (),
            _ => panic!("expected a parse error"),
        }
        match parse("$V => pos\n") {
            Err(e) => assert!(e
                .iter()
                .any(|err| err.to_string().contains("variable `V` is not defined"))),
            Ok(_) => panic!("expected an undefined variable"),
        }
        assert!(parse("pos_x => pos\n").is_err());
    }
}
