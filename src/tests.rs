//! Top-level scenario tests on the corpora in `rsc`.

use crate::{
    apply::Applier,
    common::config::{ApplyConf, LearnConf},
    data::Pos,
    learning::{Learner, Strategy},
};

use crate::common::*;

static tagging_dir: &str = "rsc/tagging";

fn run<T, F: FnOnce() -> Res<T>>(f: F) -> T {
    match f() {
        Ok(res) => res,
        Err(e) => {
            println!("Error:");
            for e in e.iter() {
                let mut pref = "> ";
                for line in format!("{}", e).lines() {
                    println!("{}{}", pref, line);
                    pref = "  "
                }
            }
            panic!("failure")
        }
    }
}

fn params(name: &str) -> Params {
    run(|| Params::of_file(format!("{}/{}", tagging_dir, name)))
}

/// Scratch file in the temporary directory.
fn scratch(name: &str) -> String {
    ::std::env::temp_dir()
        .join(format!("tbl-{}-{}", ::std::process::id(), name))
        .to_string_lossy()
        .to_string()
}

fn learn_conf(rules: &str, strategy: Strategy) -> LearnConf {
    LearnConf {
        corpus: format!("{}/train.txt", tagging_dir),
        rules: rules.into(),
        threshold: 0.5,
        strategy,
        size_order: None,
        positive: None,
        min_positive: 1,
        cross_check: 20,
        seed: 7,
    }
}

fn apply_conf(corpus: &str, rules: &str) -> ApplyConf {
    ApplyConf {
        corpus: format!("{}/{}", tagging_dir, corpus),
        rules: rules.into(),
        output: None,
        trace: true,
        tree: None,
        soft: false,
        gen_tree: None,
        batch: None,
        errors: false,
    }
}

/// Annotated corpus of a learner, with traces.
fn learner_output(learner: &Learner) -> String {
    let mut out = vec![];
    run(|| {
        learner.corpus().write(
            &mut out,
            &learner.cxt().vocab,
            Some(learner.traces()),
            learner.cxt().separated,
        )
    });
    run(|| String::from_utf8(out).map_err(|e| format!("{}", e).into()))
}

fn applier_output(applier: &Applier) -> String {
    let mut out = vec![];
    run(|| applier.write(&mut out, true, None));
    run(|| String::from_utf8(out).map_err(|e| format!("{}", e).into()))
}

/// Positions a learner leaves incorrect.
fn errors(learner: &Learner) -> usize {
    let corpus = learner.corpus();
    corpus
        .positions()
        .filter(|pos| !learner.cxt().is_correct(corpus.sentence(pos.sent), pos.idx))
        .count()
}

#[test]
fn inference_replays_learning() {
    let rules = scratch("replay.rules");
    let learner = run(|| {
        let mut learner = Learner::load(params("params.txt"), &learn_conf(&rules, Strategy::Grouped))?;
        learner.run()?;
        learner.check_all()?;
        learner.write(Path::new(&rules))?;
        Ok(learner)
    });
    assert!(!learner.learned().is_empty());
    // 17 errors before learning.
    assert!(errors(&learner) < 17);

    let applier = run(|| {
        let mut applier = Applier::load(params("params.txt"), &apply_conf("train.txt", &rules))?;
        applier.run(None)?;
        Ok(applier)
    });
    assert_eq!(applier_output(&applier), learner_output(&learner));

    let batched = run(|| {
        let mut applier = Applier::load(params("params.txt"), &apply_conf("train.txt", &rules))?;
        applier.run(Some(2))?;
        Ok(applier)
    });
    assert_eq!(applier_output(&batched), learner_output(&learner));
}

#[test]
fn strategies_agree() {
    let rules = scratch("strategies.rules");
    let learned = |strategy| {
        run(|| {
            let mut learner = Learner::load(params("params.txt"), &learn_conf(&rules, strategy))?;
            learner.run()?;
            Ok(learner
                .learned()
                .iter()
                .map(|rule| rule.text(learner.cxt()))
                .collect::<Vec<_>>())
        })
    };
    let grouped = learned(Strategy::Grouped);
    assert_eq!(grouped, learned(Strategy::Rescan));
    assert_eq!(grouped, learned(Strategy::Switch));
}

#[test]
fn constraints_veto_rules() {
    let rules = scratch("constrained.rules");
    let learner = run(|| {
        let mut learner =
            Learner::load(params("constrained.txt"), &learn_conf(&rules, Strategy::Grouped))?;
        learner.run()?;
        learner.check_all()?;
        Ok(learner)
    });
    let cxt = learner.cxt();
    let (word, tag) = (cxt.layout.feature("word"), cxt.layout.feature("tag"));
    let (word, tag) = (word.unwrap(), tag.unwrap());
    let (can, nn) = (cxt.vocab.find("can").unwrap(), cxt.vocab.find("NN").unwrap());
    let corpus = learner.corpus();
    let cans: Vec<Pos> = corpus.positions().filter(|pos| corpus.get(*pos, word) == can).collect();
    assert_eq!(cans.len(), 8);
    for pos in cans {
        assert_eq!(corpus.get(pos, tag), nn);
        assert!(learner.traces().get(pos).is_empty())
    }
}

#[test]
fn trees_from_traces() {
    let rules = scratch("tree.rules");
    let tree_file = scratch("tree.dt");
    let output = scratch("tree.out");
    run(|| crate::learning::work(params("params.txt"), &learn_conf(&rules, Strategy::Grouped)));
    for soft in &[false, true] {
        run(|| {
            crate::apply::work(
                params("params.txt"),
                &ApplyConf {
                    output: Some(output.clone()),
                    tree: Some(tree_file.clone()),
                    soft: *soft,
                    gen_tree: Some(tree_file.clone()),
                    ..apply_conf("train.txt", &rules)
                },
            )
        });

        let tree = run(|| read_lines(&tree_file));
        assert!(tree[0].starts_with("Number_of_rules "));
        assert!(tree[1].starts_with("Classes: "));

        let lines = run(|| read_lines(&output));
        let samples: Vec<&String> = lines.iter().filter(|line| !line.is_empty()).collect();
        assert_eq!(samples.len(), 46);
        for line in samples {
            // sample | trace | distribution
            let parts: Vec<&str> = line.split(" |").collect();
            assert_eq!(parts.len(), 3, "{}", line);
            let total: f64 = parts[2]
                .split_whitespace()
                .filter_map(|token| token.strip_prefix('(').and_then(|t| t.strip_suffix(')')))
                .map(|p| p.parse::<f64>().unwrap())
                .sum();
            assert!((total - 1.0).abs() < 1e-4, "{}", line)
        }
    }
}

#[test]
fn unseen_corpus() {
    let rules = scratch("unseen.rules");
    run(|| crate::learning::work(params("params.txt"), &learn_conf(&rules, Strategy::Grouped)));
    let applier = run(|| {
        let mut applier = Applier::load(
            params("params.txt"),
            &ApplyConf {
                errors: true,
                ..apply_conf("test.txt", &rules)
            },
        )?;
        applier.run(None)?;
        Ok(applier)
    });
    let out = applier_output(&applier);
    assert_eq!(out.lines().filter(|line| !line.is_empty()).count(), 9);
    let counts = applier.counts().unwrap();
    assert!(!counts.is_empty());
    // `you can walk`: `can` is fixed.
    assert!(counts.iter().any(|(good, _)| *good > 0));
}
