//! Command-line configuration.
//!
//! Learning and inference parameters that are not about the command line
//! itself live in the parameter file, see [`Params`](../params/struct.Params.html).

use ansi::{Colour, Style};
use clap::{crate_authors, crate_name, Arg, ArgMatches};

use crate::common::version;
use crate::learning::Strategy;

/// Clap command with static lifetime.
pub type App = ::clap::Command<'static>;
/// Clap matches.
pub type Matches = ArgMatches;

/// Options shared by all subcommands.
#[derive(Debug, Clone)]
pub struct CommonConf {
    /// Verbosity.
    pub verb: usize,
    /// Coloring flag.
    pub color: bool,
    /// Statistics flag.
    pub stats: bool,
    /// Parameter file, `None` to fall back on the environment.
    pub params: Option<String>,
}
impl CommonConf {
    /// Adds clap options to a clap App.
    pub fn add_args(app: App, mut order: usize) -> App {
        let mut order = || {
            order += 1;
            order
        };

        app.arg(
            Arg::new("params")
                .short('F')
                .long("params")
                .help("parameter file (default: the file named by `$DDINF`)")
                .value_name("FILE")
                .takes_value(true)
                .number_of_values(1)
                .display_order(order()),
        )
        .arg(
            Arg::new("verb")
                .short('v')
                .help("increases verbosity")
                .takes_value(false)
                .multiple_occurrences(true)
                .display_order(order()),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .help("decreases verbosity")
                .takes_value(false)
                .multiple_occurrences(true)
                .display_order(order()),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .short('c')
                .help("(de)activates coloring (off if output is not a tty)")
                .validator(bool_validator)
                .value_name(bool_format)
                .default_value("on")
                .takes_value(true)
                .number_of_values(1)
                .display_order(order()),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .short('s')
                .help("reports some statistics at the end of the run")
                .validator(bool_validator)
                .value_name(bool_format)
                .default_value("no")
                .takes_value(true)
                .number_of_values(1)
                .display_order(order()),
        )
    }

    /// Creates itself from some matches.
    pub fn new(matches: &Matches) -> Self {
        let mut verb = 1;
        verb += matches.occurrences_of("verb") as usize;
        for _ in 0..matches.occurrences_of("quiet") {
            if verb > 0 {
                verb -= 1
            }
        }
        let color = atty::is(atty::Stream::Stdout) && bool_of_matches(matches, "color");
        let stats = bool_of_matches(matches, "stats");
        let params = matches.value_of("params").map(|s| s.to_string());
        CommonConf {
            verb,
            color,
            stats,
            params,
        }
    }
}

/// Threshold for positive rule extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositiveThreshold {
    /// Absolute good count.
    Count(i64),
    /// Percentage of the number of samples.
    Percent(f64),
    /// Offset from the best score (negative).
    Offset(i64),
}
impl PositiveThreshold {
    /// Parses a threshold: `N`, `N%` or `-N`.
    pub fn of_str(s: &str) -> Option<Self> {
        if let Some(pct) = s.strip_suffix('%') {
            pct.parse::<f64>().ok().map(PositiveThreshold::Percent)
        } else {
            match s.parse::<i64>() {
                Ok(n) if n < 0 => Some(PositiveThreshold::Offset(n)),
                Ok(n) => Some(PositiveThreshold::Count(n)),
                Err(_) => None,
            }
        }
    }
}

/// Learning configuration.
#[derive(Debug, Clone)]
pub struct LearnConf {
    /// Training corpus.
    pub corpus: String,
    /// Output rule file.
    pub rules: String,
    /// A rule is accepted if its score is strictly above this threshold.
    pub threshold: f64,
    /// Scoring strategy.
    pub strategy: Strategy,
    /// Size tie-break, overrides the parameter file.
    pub size_order: Option<usize>,
    /// Positive rule extraction instead of learning.
    pub positive: Option<PositiveThreshold>,
    /// Minimum score of positive rules with an offset threshold.
    pub min_positive: i64,
    /// Number of rules to rescore from scratch after each application.
    pub cross_check: usize,
    /// Seed for the cross-check sampling.
    pub seed: u64,
}
impl LearnConf {
    /// Adds clap options to a clap App.
    pub fn add_args(app: App, mut order: usize) -> App {
        let mut order = || {
            order += 1;
            order
        };

        app.about("learns a rule list from an annotated corpus")
            .arg(
                Arg::new("corpus")
                    .help("training corpus")
                    .required(true)
                    .index(1),
            )
            .arg(
                Arg::new("rules")
                    .help("output rule file")
                    .required(true)
                    .index(2),
            )
            .arg(
                Arg::new("threshold")
                    .long("threshold")
                    .short('t')
                    .help("rules must score strictly above this threshold")
                    .validator(float_validator)
                    .value_name("float")
                    .default_value("2.5")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("rescan")
                    .long("rescan")
                    .help("rescan the corpus at each iteration (slow, no rule store)")
                    .validator(bool_validator)
                    .value_name(bool_format)
                    .default_value("off")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("switch")
                    .long("switch")
                    .help("start rescanning, switch to incremental updates once scores flatten")
                    .validator(bool_validator)
                    .value_name(bool_format)
                    .default_value("off")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("size_order")
                    .long("size_order")
                    .help(
                        "tie-break on predicate size: 0 more tokens first, \
                         1 fewer tokens first, 2 template order",
                    )
                    .validator(|s| bounded_int_validator(s, 0, 2))
                    .value_name("int")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("positive_rules")
                    .long("positive_rules")
                    .help("outputs all rules with no bad application instead of learning")
                    .validator(positive_validator)
                    .value_name("N|N%|-N")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("min_positive")
                    .long("min_positive")
                    .help("minimum score of positive rules when the threshold is negative")
                    .validator(int_validator)
                    .value_name("int")
                    .default_value("2")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("cross_check")
                    .long("cross_check")
                    .help("rescores that many random rules from scratch after each step")
                    .validator(int_validator)
                    .value_name("int")
                    .default_value("0")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order())
                    .hide(true),
            )
            .arg(
                Arg::new("seed")
                    .long("seed")
                    .help("seed for cross-checking")
                    .validator(int_validator)
                    .value_name("int")
                    .default_value("42")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order())
                    .hide(true),
            )
    }

    /// Creates itself from some matches.
    pub fn new(matches: &Matches) -> Self {
        let corpus = matches
            .value_of("corpus")
            .expect("unreachable(corpus): required")
            .to_string();
        let rules = matches
            .value_of("rules")
            .expect("unreachable(rules): required")
            .to_string();
        let threshold = float_of_matches(matches, "threshold");
        let strategy = if bool_of_matches(matches, "switch") {
            Strategy::Switch
        } else if bool_of_matches(matches, "rescan") {
            Strategy::Rescan
        } else {
            Strategy::Grouped
        };
        let size_order = matches
            .value_of("size_order")
            .and_then(|s| s.parse::<usize>().ok());
        let positive = matches
            .value_of("positive_rules")
            .and_then(PositiveThreshold::of_str);
        let min_positive = int_of_matches(matches, "min_positive") as i64;
        let cross_check = int_of_matches(matches, "cross_check");
        let seed = int_of_matches(matches, "seed") as u64;

        LearnConf {
            corpus,
            rules,
            threshold,
            strategy,
            size_order,
            positive,
            min_positive,
            cross_check,
            seed,
        }
    }
}

/// Inference configuration.
#[derive(Debug, Clone)]
pub struct ApplyConf {
    /// Corpus to annotate.
    pub corpus: String,
    /// Rule file.
    pub rules: String,
    /// Output file, stdout if none.
    pub output: Option<String>,
    /// Prints the rules that fired on each sample.
    pub trace: bool,
    /// Probability tree used to print class distributions.
    pub tree: Option<String>,
    /// Soft probability queries.
    pub soft: bool,
    /// Builds a probability tree from the traces and writes it there.
    pub gen_tree: Option<String>,
    /// Number of sentences per batch, whole corpus if none.
    pub batch: Option<usize>,
    /// Reports good/bad changes for each rule.
    pub errors: bool,
}
impl ApplyConf {
    /// Adds clap options to a clap App.
    pub fn add_args(app: App, mut order: usize) -> App {
        let mut order = || {
            order += 1;
            order
        };

        app.about("applies a rule list to a corpus")
            .arg(
                Arg::new("corpus")
                    .help("corpus to annotate")
                    .required(true)
                    .index(1),
            )
            .arg(
                Arg::new("rules")
                    .help("rule file")
                    .required(true)
                    .index(2),
            )
            .arg(
                Arg::new("output")
                    .long("output")
                    .short('o')
                    .help("output file (default: stdout)")
                    .value_name("FILE")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("trace")
                    .long("trace")
                    .help("prints the ids of the rules that fired on each sample")
                    .validator(bool_validator)
                    .value_name(bool_format)
                    .default_value("off")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("tree")
                    .long("tree")
                    .help("prints class probabilities computed with this tree file")
                    .value_name("FILE")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("soft")
                    .long("soft")
                    .help("blends tree leaves by the probability of each question")
                    .validator(bool_validator)
                    .value_name(bool_format)
                    .default_value("off")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("gen_tree")
                    .long("gen_tree")
                    .help("builds a probability tree from the rule traces")
                    .value_name("FILE")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("batch")
                    .long("batch")
                    .help("number of sentences processed at a time, `0` for all")
                    .validator(int_validator)
                    .value_name("int")
                    .default_value("0")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
            .arg(
                Arg::new("errors")
                    .long("errors")
                    .help("reports how many good and bad changes each rule made")
                    .validator(bool_validator)
                    .value_name(bool_format)
                    .default_value("off")
                    .takes_value(true)
                    .number_of_values(1)
                    .display_order(order()),
            )
    }

    /// Creates itself from some matches.
    pub fn new(matches: &Matches) -> Self {
        let corpus = matches
            .value_of("corpus")
            .expect("unreachable(corpus): required")
            .to_string();
        let rules = matches
            .value_of("rules")
            .expect("unreachable(rules): required")
            .to_string();
        let output = matches.value_of("output").map(|s| s.to_string());
        let trace = bool_of_matches(matches, "trace");
        let tree = matches.value_of("tree").map(|s| s.to_string());
        let soft = bool_of_matches(matches, "soft");
        let gen_tree = matches.value_of("gen_tree").map(|s| s.to_string());
        let batch = match int_of_matches(matches, "batch") {
            0 => None,
            n => Some(n),
        };
        let errors = bool_of_matches(matches, "errors");

        ApplyConf {
            corpus,
            rules,
            output,
            trace,
            tree,
            soft,
            gen_tree,
            batch,
            errors,
        }
    }
}

/// What to do.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Learn a rule list.
    Learn(LearnConf),
    /// Apply a rule list.
    Apply(ApplyConf),
}

/// Global configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared options.
    pub common: CommonConf,
    /// Subcommand.
    pub mode: Mode,
}
impl Config {
    /// Clap command.
    pub fn command() -> App {
        let learn = CommonConf::add_args(LearnConf::add_args(App::new("learn"), 100), 0);
        let apply = CommonConf::add_args(ApplyConf::add_args(App::new("apply"), 200), 0);
        App::new(crate_name!())
            .author(crate_authors!())
            .version(*version)
            .about("Transformation-based learning of rewrite rules over annotated corpora.")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommand(learn)
            .subcommand(apply)
    }

    /// Creates the configuration from some matches.
    pub fn of_matches(matches: &Matches) -> Self {
        match matches.subcommand() {
            Some(("learn", sub)) => Config {
                common: CommonConf::new(sub),
                mode: Mode::Learn(LearnConf::new(sub)),
            },
            Some(("apply", sub)) => Config {
                common: CommonConf::new(sub),
                mode: Mode::Apply(ApplyConf::new(sub)),
            },
            _ => unreachable!("clap requires a subcommand"),
        }
    }

    /// Parses command-line arguments and generates the configuration.
    pub fn clap() -> Self {
        let matches = Self::command().get_matches();
        Self::of_matches(&matches)
    }
}

/// Contains some styles for coloring.
#[derive(Debug, Clone)]
pub struct Styles {
    /// Emphasis style.
    emph: Style,
    /// Happy style.
    hap: Style,
    /// Sad style.
    sad: Style,
    /// Bad style.
    bad: Style,
}
impl Default for Styles {
    fn default() -> Self {
        Styles::new(true)
    }
}
impl ColorExt for Styles {
    fn styles(&self) -> &Styles {
        self
    }
}
impl Styles {
    /// Creates some styles.
    pub fn new(colored: bool) -> Self {
        Styles {
            emph: if colored {
                Style::new().bold()
            } else {
                Style::new()
            },
            hap: if colored {
                Colour::Green.normal().bold()
            } else {
                Style::new()
            },
            sad: if colored {
                Colour::Yellow.normal().bold()
            } else {
                Style::new()
            },
            bad: if colored {
                Colour::Red.normal().bold()
            } else {
                Style::new()
            },
        }
    }
}

/// Can color things.
pub trait ColorExt {
    /// The styles in the colorizer: emph, happy, sad, and bad.
    fn styles(&self) -> &Styles;
    /// String emphasis.
    #[inline]
    fn emph<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles().emph.paint(s.as_ref()))
    }
    /// Happy string.
    #[inline]
    fn happy<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles().hap.paint(s.as_ref()))
    }
    /// Sad string.
    #[inline]
    fn sad<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles().sad.paint(s.as_ref()))
    }
    /// Bad string.
    #[inline]
    fn bad<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles().bad.paint(s.as_ref()))
    }
}

/// Format for booleans.
pub static bool_format: &str = "on/true|no/off/false";

/// Boolean of a string.
pub fn bool_of_str(s: &str) -> Option<bool> {
    match s {
        "on" | "true" => Some(true),
        "no" | "off" | "false" => Some(false),
        _ => None,
    }
}

/// Boolean of some matches.
///
/// Assumes a default is provided and the input has been validated with
/// `bool_validator`.
pub fn bool_of_matches(matches: &Matches, key: &str) -> bool {
    matches
        .value_of(key)
        .and_then(bool_of_str)
        .expect("failed to retrieve boolean argument")
}

/// Integer of some matches.
///
/// Assumes a default is provided and the input has been validated with
/// `int_validator`.
pub fn int_of_matches(matches: &Matches, key: &str) -> usize {
    matches
        .value_of(key)
        .and_then(|s| s.parse::<usize>().ok())
        .expect("failed to retrieve integer argument")
}

/// Float of some matches.
///
/// Assumes a default is provided and the input has been validated with
/// `float_validator`.
pub fn float_of_matches(matches: &Matches, key: &str) -> f64 {
    matches
        .value_of(key)
        .and_then(|s| s.parse::<f64>().ok())
        .expect("failed to retrieve float argument")
}

/// Validates integer input.
pub fn int_validator(s: &str) -> Result<(), String> {
    match s.parse::<usize>() {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("expected an integer, got `{}`", s)),
    }
}

/// Validates integer input between some bounds.
pub fn bounded_int_validator(s: &str, lo: usize, hi: usize) -> Result<(), String> {
    match s.parse::<usize>() {
        Ok(val) => {
            if lo <= val && val <= hi {
                Ok(())
            } else {
                Err(format!(
                    "expected a value between {} and {}, got `{}`",
                    lo, hi, val
                ))
            }
        }
        Err(_) => Err(format!("expected an integer, got `{}`", s)),
    }
}

/// Validates float input.
pub fn float_validator(s: &str) -> Result<(), String> {
    match s.parse::<f64>() {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("expected a float, got `{}`", s)),
    }
}

/// Validates boolean input.
pub fn bool_validator(s: &str) -> Result<(), String> {
    if bool_of_str(s).is_some() {
        Ok(())
    } else {
        Err(format!("expected `on/true` or `off/false`, got `{}`", s))
    }
}

/// Validates positive rule thresholds.
pub fn positive_validator(s: &str) -> Result<(), String> {
    if PositiveThreshold::of_str(s).is_some() {
        Ok(())
    } else {
        Err(format!("expected `N`, `N%` or `-N`, got `{}`", s))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn learn_args() {
        let matches = Config::command()
            .try_get_matches_from(vec![
                "tbl", "learn", "train.txt", "rules.txt", "-t", "1", "--size_order", "1", "-vv",
            ])
            .unwrap();
        let conf = Config::of_matches(&matches);
        assert_eq!(conf.common.verb, 3);
        match conf.mode {
            Mode::Learn(learn) => {
                assert_eq!(learn.corpus, "train.txt");
                assert_eq!(learn.threshold, 1.0);
                assert_eq!(learn.size_order, Some(1));
                assert_eq!(learn.strategy, Strategy::Grouped);
                assert_eq!(learn.positive, None);
            }
            Mode::Apply(_) => panic!("expected learn mode"),
        }
    }

    #[test]
    fn positive_thresholds() {
        assert_eq!(
            PositiveThreshold::of_str("12"),
            Some(PositiveThreshold::Count(12))
        );
        assert_eq!(
            PositiveThreshold::of_str("-3"),
            Some(PositiveThreshold::Offset(-3))
        );
        assert_eq!(
            PositiveThreshold::of_str("2.5%"),
            Some(PositiveThreshold::Percent(2.5))
        );
        assert_eq!(PositiveThreshold::of_str("x"), None);
    }

    #[test]
    fn bad_size_order() {
        let res = Config::command().try_get_matches_from(vec![
            "tbl", "learn", "a", "b", "--size_order", "7",
        ]);
        assert!(res.is_err())
    }
}
