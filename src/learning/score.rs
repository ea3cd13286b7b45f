//! Rule generation and from-scratch scoring.

use crate::{
    common::*,
    cxt::Context,
    data::{Corpus, Pos, Sentence},
    index::Indices,
    pred::{Pred, PredFactory},
    rule::{Rule, Target},
};

/// Predicates of a template that hold at some position.
///
/// Cartesian product of the literals each atom holds for.
pub fn preds_at(
    cxt: &Context,
    factory: &mut PredFactory,
    tpl: PTplIdx,
    sent: &Sentence,
    p: isize,
    out: &mut Vec<Pred>,
) {
    let atoms = cxt.preds[tpl].atoms();
    let mut choices: Vec<Vec<Word>> = Vec::with_capacity(atoms.len());
    for atom in atoms {
        let mut lits = vec![];
        atom.instantiate(cxt, sent, p, &mut lits);
        if lits.is_empty() {
            return;
        }
        choices.push(lits)
    }

    let mut cursors = vec![0; choices.len()];
    'product: loop {
        let tokens = cursors
            .iter()
            .zip(choices.iter())
            .map(|(cursor, lits)| lits[*cursor])
            .collect();
        out.push(factory.mk(cxt, tpl, tokens));

        for (cursor, lits) in cursors.iter_mut().zip(choices.iter()).rev() {
            *cursor += 1;
            if *cursor < lits.len() {
                continue 'product;
            }
            *cursor = 0
        }
        break 'product;
    }
}

/// Rules that would fix some slot of the sample at `p`, with their good
/// count at `p`.
///
/// Rules vetoed by a constraint at `p` are not generated.
pub fn rules_at(
    cxt: &Context,
    factory: &mut PredFactory,
    sent: &Sentence,
    p: isize,
    out: &mut Vec<(Pred, Target, Score)>,
) {
    let mut preds = vec![];
    for tpl in cxt.preds.indices() {
        let ttpls = cxt.rule_tpls.targets(tpl);
        if ttpls.is_empty() {
            continue;
        }
        preds.clear();
        preds_at(cxt, factory, tpl, sent, p, &mut preds);
        if preds.is_empty() {
            continue;
        }
        for ttpl in ttpls {
            let mut targets = Target::instantiate(cxt, *ttpl, sent, p);
            targets.sort();
            targets.dedup();
            for target in targets {
                if !target.affects(cxt, sent, p) || !cxt.allows(sent, p, &target) {
                    continue;
                }
                let (good, _) = target.counts(cxt, sent, p);
                if good <= 0 {
                    continue;
                }
                for pred in &preds {
                    out.push((pred.clone(), target.clone(), good))
                }
            }
        }
    }
}

/// Positions where a rule fires, sorted.
pub fn matches(cxt: &Context, corpus: &Corpus, indices: &Indices, rule: &Rule) -> Vec<Pos> {
    let mut res = indices.candidates(cxt, corpus, &rule.pred);
    res.retain(|pos| rule.test(cxt, corpus.sentence(pos.sent), pos.idx));
    res
}

/// Good and bad counts of a rule, from scratch.
pub fn score(cxt: &Context, corpus: &Corpus, indices: &Indices, rule: &Rule) -> (Score, Score) {
    let (mut good, mut bad) = (0, 0);
    for pos in indices.candidates(cxt, corpus, &rule.pred) {
        let sent = corpus.sentence(pos.sent);
        if rule.test(cxt, sent, pos.idx) {
            let (g, b) = rule.target.counts(cxt, sent, pos.idx);
            good += g;
            bad += b
        }
    }
    (good, bad)
}

/// Bad count of a rule whose good count is known.
///
/// Gives up as soon as the score drops below `bound`. Positions where the
/// rule fires are pushed on `positions`, which is only complete when the
/// result is not `None`.
pub fn lazy_bad(
    cxt: &Context,
    corpus: &Corpus,
    indices: &Indices,
    rule: &Rule,
    bound: Score,
    positions: &mut Vec<Pos>,
) -> Option<Score> {
    let mut bad = 0;
    for pos in indices.candidates(cxt, corpus, &rule.pred) {
        let sent = corpus.sentence(pos.sent);
        if rule.test(cxt, sent, pos.idx) {
            bad += rule.target.bads(cxt, sent, pos.idx);
            if rule.good - bad < bound {
                return None;
            }
            positions.push(pos)
        }
    }
    Some(bad)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cxt::test::setup;

    #[test]
    fn products() {
        let (cxt, corpus) = setup(
            "word tag => ttag",
            "tag:[-1,1] word => tag",
            &["the DT DT", "dog NN NN", "barks NN VBZ"],
        );
        let mut factory = PredFactory::new();
        let tpl = cxt.preds.find("tag:[-1,1] word_0").unwrap();
        let sent = corpus.sentence(SentIdx::new(0));
        let mut preds = vec![];
        preds_at(&cxt, &mut factory, tpl, sent, 1, &mut preds);
        let texts: Vec<_> = preds.iter().map(|pred| pred.text(&cxt)).collect();
        assert_eq!(
            texts,
            vec![
                "tag:[-1,1]=DT word_0=dog",
                "tag:[-1,1]=NN word_0=dog",
            ]
        );
        assert!(preds.iter().all(|pred| pred.test(&cxt, sent, 1)));
    }

    #[test]
    fn generation_and_scores() {
        let (mut cxt, corpus) = setup(
            "word tag => ttag",
            "tag_-1 => tag\nword => tag",
            &[
                "the DT DT",
                "dog NN NN",
                "barks NN VBZ",
                "",
                "a DT DT",
                "cat NN NN",
                "runs NN VBZ",
                "fish NN NN",
            ],
        );
        let indices = Indices::build(&mut cxt, &corpus, None);
        let mut factory = PredFactory::new();
        let sent = corpus.sentence(SentIdx::new(0));
        let mut rules = vec![];
        rules_at(&cxt, &mut factory, sent, 1, &mut rules);
        assert!(rules.is_empty());
        rules_at(&cxt, &mut factory, sent, 2, &mut rules);
        let texts: Vec<_> = rules
            .iter()
            .map(|(pred, target, good)| {
                format!("{} => {} ({})", pred.text(&cxt), target.text(&cxt), good)
            })
            .collect();
        assert_eq!(
            texts,
            vec!["tag_-1=NN => tag=VBZ (1)", "word_0=barks => tag=VBZ (1)"]
        );

        let (pred, target, _) = rules[0].clone();
        let rule = Rule::new(pred, target);
        assert_eq!(score(&cxt, &corpus, &indices, &rule), (2, 1));
        let positions = matches(&cxt, &corpus, &indices, &rule);
        assert_eq!(positions.len(), 3);
        let mut rule = rule;
        rule.good = 2;
        let mut positions = vec![];
        assert_eq!(lazy_bad(&cxt, &corpus, &indices, &rule, 1, &mut positions), Some(1));
        positions.clear();
        assert_eq!(lazy_bad(&cxt, &corpus, &indices, &rule, 2, &mut positions), None);
    }
}
