//! Base types and functions.

pub use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
pub use std::io::{BufRead, Read, Write};
pub use std::path::{Path, PathBuf};

pub use hashconsing::hash_coll::HConMap;
pub use hashconsing::{HConsed, HConsign, HashConsign};

pub use either::Either;

pub use crate::errors::*;

#[macro_use]
pub mod macros;
mod wrappers;

pub mod config;
pub mod consts;
pub mod params;
pub mod profiling;
mod revision;

pub use self::config::{ColorExt, Styles};
pub use self::consts::keywords;
pub use self::params::Params;
pub use self::profiling::{CanPrint, Profiler};
pub use self::wrappers::*;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Scores: good minus bad, weighted by sample costs.
pub type Score = i64;

/// Verbosity level.
static verbosity: AtomicUsize = AtomicUsize::new(1);
/// Coloring flag.
static colored: AtomicBool = AtomicBool::new(false);
/// Statistics flag.
static stats: AtomicBool = AtomicBool::new(false);

/// Current verbosity.
#[inline]
pub fn verb() -> usize {
    verbosity.load(Ordering::Relaxed)
}
/// Sets the verbosity.
pub fn set_verb(verb: usize) {
    verbosity.store(verb, Ordering::Relaxed)
}
/// Activates or deactivates coloring.
pub fn set_colored(color: bool) {
    colored.store(color, Ordering::Relaxed)
}
/// Activates or deactivates the statistics at the end of the run.
pub fn set_stats(active: bool) {
    stats.store(active, Ordering::Relaxed)
}

lazy_static! {
    static ref colored_styles: Styles = Styles::new(true);
    static ref plain_styles: Styles = Styles::new(false);
    static ref version_string: String = match self::revision::REVISION {
        Some(rev) => format!("{} ({})", clap::crate_version!(), rev),
        None => clap::crate_version!().into(),
    };
    /// Version with revision info.
    pub static ref version: &'static str = &version_string;
}

/// Colors things depending on the coloring flag.
#[derive(Debug, Clone, Copy)]
pub struct Colors;
impl ColorExt for Colors {
    fn styles(&self) -> &Styles {
        if colored.load(Ordering::Relaxed) {
            &colored_styles
        } else {
            &plain_styles
        }
    }
}
/// Global colorizer.
pub static colors: Colors = Colors;

// |===| Helpers.

/// Prints some lines on stderr, prefixed with `; `.
pub fn log_lines(blah: &str) {
    for line in blah.lines() {
        eprintln!("; {}", line)
    }
}

/// Prints a warning on stderr.
pub fn print_warning(blah: &str) {
    eprintln!(";");
    eprintln!("; {}", colors.sad("|===| Warning:"));
    for line in blah.lines() {
        eprintln!("; {} {}", colors.sad("|"), line)
    }
    eprintln!("; {}", colors.sad("|===|"));
    eprintln!(";")
}

/// Opens a file for reading.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Res<::std::io::BufReader<::std::fs::File>> {
    let path = path.as_ref();
    let file = ::std::fs::OpenOptions::new()
        .read(true)
        .open(path)
        .chain_err(|| format!("while opening `{}`", colors.emph(path.to_string_lossy())))?;
    Ok(::std::io::BufReader::new(file))
}

/// Opens a file for writing, truncates it if it exists.
pub fn open_writer<P: AsRef<Path>>(path: P) -> Res<::std::io::BufWriter<::std::fs::File>> {
    let path = path.as_ref();
    let file = ::std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(path)
        .chain_err(|| {
            format!(
                "while opening `{}` for writing",
                colors.emph(path.to_string_lossy())
            )
        })?;
    Ok(::std::io::BufWriter::new(file))
}

/// Reads the lines of a file.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Res<Vec<String>> {
    let path = path.as_ref();
    let mut lines = vec![];
    for line in open_reader(path)?.lines() {
        lines.push(
            line.chain_err(|| format!("while reading `{}`", colors.emph(path.to_string_lossy())))?,
        )
    }
    Ok(lines)
}

/// Prints the stats if asked. Does nothing in bench mode.
#[cfg(feature = "bench")]
pub fn print_stats(_: &'static str, _: Profiler) {}
/// Prints the stats if asked. Does nothing in bench mode.
#[cfg(not(feature = "bench"))]
pub fn print_stats(name: &str, profiler: Profiler) {
    if stats.load(Ordering::Relaxed) {
        let (tree, counters) = profiler.extract_tree();
        println!();
        println!("; |===| {} profiling:", colors.emph(name));
        tree.print();
        if !counters.is_empty() {
            println!("; stats:");
            counters.print()
        }
        println!("; |===|");
        println!();
    }
}
