//! Profiling stuff.
//!
//! In `bench` mode, `Profiler` is a unit structure. Also, all macros are
//! deactivated, so all profiling is completely removed.

#[allow(unused_imports)]
use std::time::{Duration, Instant};

use crate::common::*;

/// Extends duration with a pretty printing.
pub trait DurationExt {
    /// Nice string representation.
    fn to_str(&self) -> String;
}
impl DurationExt for Duration {
    fn to_str(&self) -> String {
        format!("{}.{:0>9}", self.as_secs(), self.subsec_nanos())
    }
}

/// Profile Tree.
#[derive(PartialEq, Eq, Debug)]
pub struct ProfileTree {
    /// Duration stored at this level.
    duration: Option<Duration>,
    /// Sub-branches.
    branches: BTreeMap<&'static str, ProfileTree>,
}
impl ProfileTree {
    /// Tree with nothing but the top level.
    pub fn top(top: Duration) -> Self {
        ProfileTree {
            duration: Some(top),
            branches: BTreeMap::new(),
        }
    }

    /// Empty tree, not visible outside.
    fn empty() -> Self {
        ProfileTree {
            duration: None,
            branches: BTreeMap::new(),
        }
    }

    /// Inserts something in the tree.
    pub fn insert(&mut self, scope: Vec<&'static str>, duration: Duration) {
        let mut current = self;
        for scope in scope {
            current = current
                .branches
                .entry(scope)
                .or_insert_with(ProfileTree::empty);
        }
        let prev = current.duration.replace(duration);
        debug_assert!(prev.is_none())
    }

    /// Sum of the durations of the direct sub-branches.
    fn sub_duration(&self) -> Duration {
        self.branches.values().fold(Duration::from_secs(0), |acc, branch| {
            acc + branch.duration.unwrap_or_else(|| Duration::from_secs(0))
        })
    }

    /// Iterator on the tree.
    ///
    /// Scopes are guaranteed to follow the topological order.
    pub fn iter<F>(&self, f: F)
    where
        F: Fn(&[&'static str], &Duration, Duration),
    {
        if let Some(duration) = self.duration.as_ref() {
            f(&[], duration, self.sub_duration())
        }
        let mut stack: Vec<(Vec<&'static str>, Vec<(&'static str, &ProfileTree)>)> = vec![(
            vec![],
            self.branches.iter().rev().map(|(s, p)| (*s, p)).collect(),
        )];

        while let Some((scope, mut branches)) = stack.pop() {
            if let Some((s, profile)) = branches.pop() {
                let mut this_scope = scope.clone();
                stack.push((scope, branches));
                this_scope.push(s);
                let sub_duration = profile.sub_duration();
                if let Some(duration) = profile.duration.as_ref() {
                    f(&this_scope, duration, sub_duration)
                } else {
                    f(&this_scope, &sub_duration, sub_duration)
                }
                stack.push((
                    this_scope,
                    profile.branches.iter().rev().map(|(s, p)| (*s, p)).collect(),
                ))
            }
        }
    }
}

/// Maps strings to counters.
pub type Stats = BTreeMap<String, usize>;

/// Provides a debug print function.
pub trait CanPrint {
    /// Debug print (multi-line).
    fn print(&self);
}
impl CanPrint for Stats {
    fn print(&self) {
        for (stat, count) in self {
            let stat_len = ::std::cmp::min(30, stat.len());
            println!(
                ";   {0: >1$}{2}: {3: >5}",
                "",
                30 - stat_len,
                colors.emph(stat),
                count
            )
        }
    }
}
impl CanPrint for ProfileTree {
    fn print(&self) {
        self.iter(|scope, time, sub_time| {
            let sub = if sub_time != Duration::from_secs(0) {
                format!(" ({}s)", sub_time.to_str())
            } else {
                "".into()
            };
            if let Some(last) = scope.last() {
                println!(
                    "; {0: >1$}|- {2}s {3}{4}",
                    "",
                    2 * scope.len(),
                    time.to_str(),
                    last,
                    sub
                )
            } else {
                println!("; total {}s{}", time.to_str(), sub)
            }
        })
    }
}

/// Profiling structure, only in `not(bench)`.
///
/// Maintains statistics using a map indexed by strings.
///
/// Internally, the structures are wrapped in `RefCell`s so that mutation
/// does not require `&mut self`.
#[cfg(not(feature = "bench"))]
#[derive(Debug)]
pub struct Profiler {
    /// String-indexed durations.
    map: ::std::cell::RefCell<BTreeMap<Vec<&'static str>, (Option<Instant>, Duration)>>,
    /// Starting tick, for total time.
    start: Instant,
    /// Other statistics.
    stats: ::std::cell::RefCell<Stats>,
}
#[cfg(feature = "bench")]
#[derive(Debug)]
pub struct Profiler;

impl Default for Profiler {
    fn default() -> Self {
        Profiler::new()
    }
}

impl Profiler {
    /// Constructor.
    #[cfg(not(feature = "bench"))]
    pub fn new() -> Self {
        use std::cell::RefCell;
        Profiler {
            map: RefCell::new(BTreeMap::new()),
            start: Instant::now(),
            stats: RefCell::new(BTreeMap::new()),
        }
    }
    #[cfg(feature = "bench")]
    pub fn new() -> Self {
        Profiler
    }

    /// Acts on a statistic.
    #[cfg(not(feature = "bench"))]
    pub fn stat_do<F, S>(&self, stat: S, f: F)
    where
        F: Fn(usize) -> usize,
        S: Into<String>,
    {
        let stat = stat.into();
        let mut map = self.stats.borrow_mut();
        let val = map.get(&stat).cloned().unwrap_or(0);
        let _ = map.insert(stat, f(val));
    }

    /// Value of a statistic.
    #[cfg(not(feature = "bench"))]
    pub fn get_stat<S: AsRef<str>>(&self, stat: S) -> Option<usize> {
        self.stats.borrow().get(stat.as_ref()).cloned()
    }

    /// Ticks.
    #[cfg(not(feature = "bench"))]
    pub fn tick(&self, scope: Vec<&'static str>) {
        if scope.is_empty() {
            panic!("Profile: can't use scope `total`")
        }
        let mut map = self.map.borrow_mut();
        let time = map
            .entry(scope)
            .or_insert_with(|| (None, Duration::from_secs(0)));
        time.0 = Some(Instant::now())
    }

    /// Registers the time since the last tick.
    ///
    /// Panics if there was no tick since the last time registration.
    #[cfg(not(feature = "bench"))]
    pub fn mark(&self, scope: Vec<&'static str>) {
        if scope.is_empty() {
            panic!("Profile: can't use scope `total`")
        }
        let mut map = self.map.borrow_mut();
        if let Some(&mut (ref mut tick, ref mut sum)) = map.get_mut(&scope) {
            if let Some(instant) = tick.take() {
                *sum += Instant::now().duration_since(instant)
            }
        } else {
            panic!("profiling: trying to mark the time without ticking first")
        }
    }

    /// Extracts a profile tree.
    #[cfg(not(feature = "bench"))]
    pub fn extract_tree(self) -> (ProfileTree, Stats) {
        let mut tree = ProfileTree::top(Instant::now().duration_since(self.start));
        for (scope, &(ref should_be_none, ref time)) in self.map.borrow().iter() {
            if should_be_none.is_some() {
                warn!("still have a live instant for {:?}", scope)
            }
            tree.insert(scope.clone(), *time)
        }
        (tree, self.stats.into_inner())
    }
}
