//! Tests for the learner.

use super::*;
use crate::{
    common::config::PositiveThreshold,
    cxt::test::setup_with,
    rule::{parse_rules, write_rules},
};

/// Learning configuration with a threshold of `0`.
fn conf(strategy: Strategy) -> LearnConf {
    LearnConf {
        corpus: String::new(),
        rules: String::new(),
        threshold: 0.0,
        strategy,
        size_order: None,
        positive: None,
        min_positive: 1,
        cross_check: 100,
        seed: 0,
    }
}

fn learner(
    header: &str,
    templates: &str,
    samples: &[&str],
    params: &[(&str, &str)],
    conf: &LearnConf,
) -> Learner {
    let (cxt, corpus) = setup_with(header, templates, samples, params);
    Learner::new(cxt, corpus, conf, Profiler::new()).unwrap()
}

/// Learns, panics with the error chain on failure.
fn learn(learner: &mut Learner) {
    if let Err(e) = learner.run() {
        print_err(&e);
        panic!("learning failed")
    }
}

/// Rule file of a learner, without the vocabulary line.
fn rule_lines(learner: &Learner) -> Vec<String> {
    let mut out = vec![];
    write_rules(&mut out, learner.cxt(), "voc", learner.learned()).unwrap();
    String::from_utf8(out)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| line.to_string())
        .collect()
}

const SAMPLES: &[&str] = &[
    "the DT DT",
    "can NN MD",
    "run NN VB",
    "",
    "a DT DT",
    "can NN NN",
    "",
    "we PRP PRP",
    "can NN MD",
    "walk NN VB",
    "",
    "the DT DT",
    "run NN NN",
    "",
    "they PRP PRP",
    "run NN VB",
    "fast NN RB",
    "",
    "we PRP PRP",
    "walk NN VB",
];

const TEMPLATES: &str = "\
word => tag
tag_-1 => tag
tag_1 word => tag
tag:[-2,-1] => tag
word::--1 tag_-1 => tag
";

#[test]
fn three_samples() {
    let mut learner = learner(
        "tag => ttag",
        "tag_0 => tag",
        &["A B", "A B", "A B"],
        &[],
        &LearnConf {
            threshold: 2.5,
            ..conf(Strategy::Grouped)
        },
    );
    learn(&mut learner);
    assert_eq!(
        rule_lines(&learner),
        vec!["GOOD:3 BAD:0 SCORE:3 RULE: tag=A => tag=B"]
    );
    assert!(learner.store().is_empty());
    let sent = SentIdx::new(0);
    for idx in 0..3 {
        assert_eq!(learner.traces().get(Pos::new(sent, idx)), &[RuleId::new(0)]);
        assert!(learner.cxt().is_correct(learner.corpus().sentence(sent), idx))
    }
}

#[test]
fn below_threshold() {
    let mut learner = learner(
        "tag => ttag",
        "tag_0 => tag",
        &["A B", "A B", "A B"],
        &[],
        &LearnConf {
            threshold: 3.0,
            ..conf(Strategy::Grouped)
        },
    );
    learn(&mut learner);
    assert!(learner.learned().is_empty());
    assert_eq!(learner.store().len(), 1);
}

/// Number of incorrect samples.
fn errors(learner: &Learner) -> Score {
    let corpus = learner.corpus();
    corpus
        .positions()
        .filter(|pos| !learner.cxt().is_correct(corpus.sentence(pos.sent), pos.idx))
        .count() as Score
}

#[test]
fn incremental_counts_are_exact() {
    let mut learner = learner(
        "word tag => ttag",
        TEMPLATES,
        SAMPLES,
        &[],
        &conf(Strategy::Grouped),
    );
    learner.initial_scoring().unwrap();
    learner.check_all().unwrap();
    let before = errors(&learner);
    assert_eq!(before, 7);
    learn(&mut learner);
    learner.check_all().unwrap();
    assert!(!learner.learned().is_empty());

    // Each rule fixed exactly its score.
    let fixed: Score = learner.learned().iter().map(|rule| rule.score()).sum();
    assert_eq!(before - errors(&learner), fixed);
}

#[test]
fn strategies_agree() {
    let run = |strategy| {
        let mut learner = learner("word tag => ttag", TEMPLATES, SAMPLES, &[], &conf(strategy));
        learn(&mut learner);
        rule_lines(&learner)
    };
    let grouped = run(Strategy::Grouped);
    assert!(!grouped.is_empty());
    assert_eq!(grouped, run(Strategy::Rescan));
    assert_eq!(grouped, run(Strategy::Switch));
}

#[test]
fn determinism() {
    let run = || {
        let mut learner = learner(
            "word tag => ttag",
            TEMPLATES,
            SAMPLES,
            &[],
            &conf(Strategy::Grouped),
        );
        learn(&mut learner);
        rule_lines(&learner)
    };
    let first = run();
    for _ in 0..3 {
        assert_eq!(first, run())
    }
}

#[test]
fn size_orders() {
    let samples = &["we PRP PRP", "can NN MD", "", "we PRP PRP", "can NN MD"];
    let templates = "word => tag\nword tag_-1 => tag";
    for (order, len) in &[(0, 2), (1, 1)] {
        let mut learner = learner(
            "word tag => ttag",
            templates,
            samples,
            &[],
            &LearnConf {
                threshold: 1.5,
                size_order: Some(*order),
                ..conf(Strategy::Grouped)
            },
        );
        learn(&mut learner);
        assert_eq!(learner.learned().len(), 1);
        let rule = &learner.learned()[RuleId::new(0)];
        assert_eq!(rule.pred.len(), *len);
        assert_eq!((rule.good, rule.bad), (2, 0));
    }
}

#[test]
fn size_order_parameter() {
    let samples = &["we PRP PRP", "can NN MD", "", "we PRP PRP", "can NN MD"];
    let mut learner = learner(
        "word tag => ttag",
        "word => tag\nword tag_-1 => tag",
        samples,
        &[("ORDER_BASED_ON_SIZE", "1")],
        &LearnConf {
            threshold: 1.5,
            ..conf(Strategy::Rescan)
        },
    );
    learn(&mut learner);
    assert_eq!(rule_lines(&learner), vec!["GOOD:2 BAD:0 SCORE:2 RULE: word_0=can => tag=MD"]);
}

#[test]
fn erase_factor() {
    // `tag=X => tag=Y` scores 2 but makes a bad change.
    let samples = &["a X Y", "a X Y", "b X Y", "c X X"];
    let conf = LearnConf {
        threshold: 0.5,
        ..conf(Strategy::Grouped)
    };
    let mut plain = learner("word tag => ttag", "tag => tag", samples, &[], &conf);
    learn(&mut plain);
    assert_eq!(
        rule_lines(&plain),
        vec!["GOOD:3 BAD:1 SCORE:2 RULE: tag=X => tag=Y"]
    );
    let mut strict = learner(
        "word tag => ttag",
        "tag => tag",
        samples,
        &[("ERASE_RULES_WITH_USELESS_FACTOR", "3")],
        &conf,
    );
    learn(&mut strict);
    assert!(strict.learned().is_empty());
}

#[test]
fn positive_rules() {
    let samples = &["a X Y", "a X Y", "b X Y", "c X X"];
    let templates = "word => tag\ntag => tag";
    let positive = |threshold| {
        let mut learner = learner(
            "word tag => ttag",
            templates,
            samples,
            &[],
            &conf(Strategy::Grouped),
        );
        learner.positive_rules(threshold, 1).unwrap();
        rule_lines(&learner)
    };
    assert_eq!(
        positive(PositiveThreshold::Count(2)),
        vec!["GOOD:2 BAD:0 SCORE:2 RULE: word=a => tag=Y"]
    );
    let expected = vec![
        "GOOD:2 BAD:0 SCORE:2 RULE: word=a => tag=Y",
        "GOOD:1 BAD:0 SCORE:1 RULE: word=b => tag=Y",
    ];
    assert_eq!(positive(PositiveThreshold::Percent(25.0)), expected);
    assert_eq!(positive(PositiveThreshold::Offset(-1)), expected);
}

#[test]
fn learned_rules_parse_back() {
    let mut learner = learner(
        "word tag => ttag",
        TEMPLATES,
        SAMPLES,
        &[],
        &conf(Strategy::Grouped),
    );
    learn(&mut learner);
    let lines = rule_lines(&learner);
    let mut cxt = learner.cxt().clone();
    let mut factory = PredFactory::new();
    let rules = parse_rules(&mut cxt, &mut factory, &lines, false).unwrap();
    assert_eq!(rules.len(), learner.learned().len());
    for (parsed, learned) in rules.iter().zip(learner.learned().iter()) {
        assert_eq!(parsed.text(&cxt), learned.text(learner.cxt()));
        assert_eq!((parsed.good, parsed.bad), (0, 0))
    }
}

#[test]
fn multi_slot_targets() {
    // The rule fixing both slots of the first samples of the first two
    // sentences also fixes the `pos` slot of the third one.
    let samples = &[
        "x Y B Z O",
        "x N O N O",
        "",
        "x Y B Z O",
        "x N O N O",
        "",
        "x Y B Z I",
        "x N O N O",
    ];
    let run = |strategy| {
        let mut learner = learner(
            "word pos chunk => tpos tchunk",
            "pos chunk_1 => pos chunk",
            samples,
            &[],
            &conf(strategy),
        );
        learn(&mut learner);
        let first = learner.learned().iter().next().map(|rule| (rule.good, rule.bad));
        assert_eq!(first, Some((5, 0)));
        rule_lines(&learner)
    };
    let grouped = run(Strategy::Grouped);
    assert_eq!(grouped, run(Strategy::Rescan));
    assert_eq!(grouped, run(Strategy::Switch));
}

/// Each application makes the same rule useful on the next sample.
const CHAIN: &[&str] = &[
    "x A A", "x B A", "x B A", "x B A", "", "y B B", "y B B", "y B B", "y B B", "y B B",
];

#[test]
fn repeated_best_rule() {
    for strategy in &[Strategy::Grouped, Strategy::Rescan] {
        let mut learner = learner("word tag => ttag", "tag_-1 => tag", CHAIN, &[], &conf(*strategy));
        learn(&mut learner);
        assert_eq!(learner.learned().len(), 3);
        let texts: Vec<_> = learner
            .learned()
            .iter()
            .map(|rule| rule.text(learner.cxt()))
            .collect();
        assert!(texts.iter().all(|text| *text == texts[0]), "{:?}", texts);

        let mut guarded = self::learner(
            "word tag => ttag",
            "tag_-1 => tag",
            CHAIN,
            &[("NUM_REPEATS", "2")],
            &conf(*strategy),
        );
        match guarded.run().map_err(|e| e.0) {
            Err(ErrorKind::RepeatedBestRule(_)) => (),
            Err(e) => panic!("unexpected error {}", e),
            Ok(()) => panic!("the guard did not stop learning"),
        }
        assert_eq!(guarded.learned().len(), 1);
    }
}

#[test]
fn elimination() {
    // Good counts: `word=a` 2, `word=b` 1, `tag=X` 3 with a bad change.
    let samples = &["a X Y", "a X Y", "b X Y", "c X X"];
    let scored = |params: &[(&str, &str)]| {
        let mut learner = learner(
            "word tag => ttag",
            "word => tag\ntag => tag",
            samples,
            params,
            &conf(Strategy::Grouped),
        );
        learner.initial_scoring().unwrap();
        let mut rules: Vec<_> = learner
            .store()
            .iter()
            .map(|(_, rule)| (rule.text(learner.cxt()), rule.good, rule.bad))
            .collect();
        rules.sort();
        rules
    };
    assert_eq!(scored(&[]).len(), 3);
    assert_eq!(
        scored(&[("ELIMINATION_THRESHOLD", "2")]),
        vec![("tag=X => tag=Y".to_string(), 3, 1)]
    );
}
