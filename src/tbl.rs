//! Transformation-based learning.
//!
//! Learns an ordered list of rewrite rules that turns the current
//! classification of an annotated corpus into its true classification, and
//! applies such lists to new corpora. Rules are instances of user-given
//! templates: a predicate over the features of nearby samples, and a target
//! assigning new values to the state features of a sample.
//!
//! - [`learning`] selects rules greedily, maintaining the counts of all
//!   candidate rules incrementally
//! - [`apply`] runs a rule list on a corpus, optionally printing the rules
//!   that fired and class probabilities from a [`tree`]
//!
//! [`learning`]: learning/index.html (learning module)
//! [`apply`]: apply/index.html (apply module)
//! [`tree`]: tree/index.html (tree module)

#![doc(test(attr(deny(warnings))))]
#![allow(non_upper_case_globals)]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate error_chain;
extern crate ansi_term as ansi;

#[macro_use]
pub mod common;
pub mod errors;
pub mod apply;
pub mod cxt;
pub mod data;
pub mod index;
pub mod learning;
pub mod pred;
pub mod rule;
pub mod store;
pub mod tree;
pub mod vocab;

#[cfg(test)]
mod tests;

use crate::common::{
    config::{Config, Mode},
    *,
};

/// Parses command-line arguments and works.
pub fn work() -> Res<()> {
    let conf = Config::clap();
    set_verb(conf.common.verb);
    set_colored(conf.common.color);
    set_stats(conf.common.stats);

    let params = match conf.common.params.as_ref() {
        Some(path) => Params::of_file(path)?,
        None => Params::of_env()?,
    };

    match conf.mode {
        Mode::Learn(ref learn) => learning::work(params, learn),
        Mode::Apply(ref apply) => apply::work(params, apply),
    }
}
