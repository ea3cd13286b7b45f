//! Macros.

/// Logs on stderr, each line prefixed by `; `.
///
/// - `@info`: default verbosity (`1`), silenced by `-q`
/// - `@verb`: verbose (`2`)
/// - `@debug`: debug (`3`)
///
/// Inactive in bench mode.
#[macro_export]
#[cfg(not(feature = "bench"))]
macro_rules! log {
    (@info $($tt:tt)*) => ( $crate::log! { |1| $($tt)* } );
    (@verb $($tt:tt)*) => ( $crate::log! { |2| $($tt)* } );
    (@debug $($tt:tt)*) => ( $crate::log! { |3| $($tt)* } );
    (|$lvl:literal| $($tt:tt)*) => (
        if $crate::common::verb() >= $lvl {
            $crate::common::log_lines(&format!($($tt)*))
        }
    );
}
#[macro_export]
#[cfg(feature = "bench")]
macro_rules! log {
    ($($tt:tt)*) => (());
}

/// Prints a warning on stderr. Inactive in bench mode.
#[macro_export]
#[cfg(not(feature = "bench"))]
macro_rules! warn {
    ($($tt:tt)*) => (
        $crate::common::print_warning(&format!($($tt)*))
    );
}
#[macro_export]
#[cfg(feature = "bench")]
macro_rules! warn {
    ($($tt:tt)*) => (());
}

/// Implements `Display` for a type.
#[macro_export]
macro_rules! impl_fmt {
    ($t:ident($slf:ident, $fmt:ident) $body:block) => (
        impl ::std::fmt::Display for $t {
            fn fmt(&$slf, $fmt: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                $body
            }
        }
    );
}

/// Iterates over something, treating the first element differently.
#[macro_export]
macro_rules! for_first {
    ($iter:expr => {
        |$fst:ident| $fst_do:expr, then |$nxt:ident| $nxt_do:expr $(,)*
    }) => ({
        let mut iter = $iter;
        if let Some($fst) = iter.next() {
            $fst_do;
            for $nxt in iter {
                $nxt_do;
            }
        }
    });
}

/// Profiling macro.
///
/// If passed `self`, assumes `self` has a `_profiler` field.
#[macro_export]
#[cfg(not(feature = "bench"))]
macro_rules! profile {
    ( | $prof:ident | wrap $b:block $( $scope:expr ),+ $(,)* ) => ({
        $prof.tick(vec![ $($scope),+ ]);
        let res = $b;
        $prof.mark(vec![ $($scope),+ ]);
        res
    });
    ( $slf:ident wrap $b:block $( $scope:expr ),+ $(,)* ) => ({
        let prof = &$slf._profiler;
        profile! { |prof| wrap $b $($scope),+ }
    });
    ( | $prof:ident | $stat:expr => add $e:expr ) => (
        $prof.stat_do($stat, |val| val + $e)
    );
    ( | $prof:ident | $meth:ident $( $scope:expr ),+ $(,)* ) => (
        $prof.$meth(vec![ $($scope),+ ])
    );
    ( $slf:ident $stat:expr => add $e:expr ) => ({
        let prof = &$slf._profiler;
        profile! { |prof| $stat => add $e }
    });
    ( $slf:ident $meth:ident $( $scope:expr ),+ $(,)* ) => ({
        let prof = &$slf._profiler;
        profile! { |prof| $meth $($scope),+ }
    });
}
#[macro_export]
#[cfg(feature = "bench")]
macro_rules! profile {
    ( | $prof:ident | wrap $b:block $( $scope:expr ),+ $(,)* ) => ($b);
    ( $slf:ident wrap $b:block $( $scope:expr ),+ $(,)* ) => ($b);
    ( $($tt:tt)* ) => (());
}

/// Creates a zero-cost wrapper around `usize`, and optionally a vector
/// indexed by it.
///
/// ```ignore
/// wrap_usize! {
///     #[doc = "Feature indices."]
///     FeatIdx
///     #[doc = "Total map from features to something."]
///     map: FeatMap
/// }
/// ```
#[macro_export]
macro_rules! wrap_usize {
    (
        #[doc = $doc:expr]
        $t:ident
        $(
            #[doc = $map_doc:expr]
            map: $map:ident
        )?
    ) => (
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
        pub struct $t {
            val: usize,
        }
        impl $t {
            /// Wraps a `usize`.
            #[inline]
            pub const fn new(val: usize) -> Self {
                $t { val }
            }
            /// Underlying `usize`.
            #[inline]
            pub const fn get(&self) -> usize {
                self.val
            }
        }
        impl From<usize> for $t {
            #[inline]
            fn from(val: usize) -> Self {
                $t { val }
            }
        }
        impl From<$t> for usize {
            #[inline]
            fn from(idx: $t) -> usize {
                idx.val
            }
        }
        impl ::std::ops::Deref for $t {
            type Target = usize;
            #[inline]
            fn deref(&self) -> &usize {
                &self.val
            }
        }
        impl ::std::fmt::Display for $t {
            fn fmt(&self, fmt: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(fmt, "{}", self.val)
            }
        }

        $(
            #[doc = $map_doc]
            #[derive(Clone, Debug, PartialEq, Eq)]
            pub struct $map<T> {
                vec: Vec<T>,
            }
            impl<T> Default for $map<T> {
                fn default() -> Self {
                    $map { vec: Vec::new() }
                }
            }
            impl<T> $map<T> {
                /// Empty map.
                #[inline]
                pub fn new() -> Self {
                    $map { vec: Vec::new() }
                }
                /// Empty map with some capacity.
                #[inline]
                pub fn with_capacity(capa: usize) -> Self {
                    $map { vec: Vec::with_capacity(capa) }
                }
                /// Index the next push will get.
                #[inline]
                pub fn next_index(&self) -> $t {
                    $t::new(self.vec.len())
                }
                /// Pushes an element, returns its index.
                #[inline]
                pub fn push(&mut self, elem: T) -> $t {
                    let idx = self.next_index();
                    self.vec.push(elem);
                    idx
                }
                /// Iterator over the indices and the elements.
                pub fn index_iter(&self) -> impl Iterator<Item = ($t, &T)> {
                    self.vec.iter().enumerate().map(|(i, elem)| ($t::new(i), elem))
                }
                /// Iterator over the indices.
                pub fn indices(&self) -> impl Iterator<Item = $t> {
                    (0..self.vec.len()).map($t::new)
                }
            }
            impl<T> From<Vec<T>> for $map<T> {
                fn from(vec: Vec<T>) -> Self {
                    $map { vec }
                }
            }
            impl<T> ::std::iter::FromIterator<T> for $map<T> {
                fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                    $map { vec: iter.into_iter().collect() }
                }
            }
            impl<T> ::std::ops::Index<$t> for $map<T> {
                type Output = T;
                #[inline]
                fn index(&self, idx: $t) -> &T {
                    &self.vec[idx.val]
                }
            }
            impl<T> ::std::ops::IndexMut<$t> for $map<T> {
                #[inline]
                fn index_mut(&mut self, idx: $t) -> &mut T {
                    &mut self.vec[idx.val]
                }
            }
            impl<T> ::std::ops::Deref for $map<T> {
                type Target = Vec<T>;
                #[inline]
                fn deref(&self) -> &Vec<T> {
                    &self.vec
                }
            }
            impl<T> ::std::ops::DerefMut for $map<T> {
                #[inline]
                fn deref_mut(&mut self) -> &mut Vec<T> {
                    &mut self.vec
                }
            }
            impl<'a, T> IntoIterator for &'a $map<T> {
                type Item = &'a T;
                type IntoIter = ::std::slice::Iter<'a, T>;
                fn into_iter(self) -> Self::IntoIter {
                    self.vec.iter()
                }
            }
        )?
    );
}
