//! Rule store.
//!
//! Rules live in an arena and are referred to by [`RuleIdx`] handles. Erased
//! slots are recycled. Two indices are kept consistent on every insertion
//! and erasure: rule identity to handle, and predicate to the handles of the
//! rules sharing it.
//!
//! [`RuleIdx`]: ../common/struct.RuleIdx.html

use crate::{common::*, pred::Pred, rule::Rule, rule::Target};

/// Rule store.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    /// Arena.
    rules: Vec<Option<Rule>>,
    /// Free slots.
    free: Vec<RuleIdx>,
    /// Rule identity to handle.
    ids: HashMap<(Pred, Target), RuleIdx>,
    /// Predicate to the rules sharing it, in insertion order.
    groups: HConMap<Pred, Vec<RuleIdx>>,
    /// Number of rules.
    len: usize,
}

impl RuleStore {
    /// Empty store.
    pub fn new() -> Self {
        RuleStore {
            rules: vec![],
            free: vec![],
            ids: HashMap::new(),
            groups: <HConMap<Pred, Vec<RuleIdx>>>::new(),
            len: 0,
        }
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.len
    }
    /// True if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a rule, returns its handle and `true` if it is new.
    ///
    /// If the rule is already there, the store is left unchanged.
    pub fn insert(&mut self, rule: Rule) -> (RuleIdx, bool) {
        if let Some(idx) = self.find(&rule.pred, &rule.target) {
            return (idx, false);
        }
        let key = (rule.pred.clone(), rule.target.clone());
        let pred = rule.pred.clone();
        let idx = match self.free.pop() {
            Some(idx) => {
                debug_assert! { self.rules[*idx].is_none() }
                self.rules[*idx] = Some(rule);
                idx
            }
            None => {
                self.rules.push(Some(rule));
                RuleIdx::new(self.rules.len() - 1)
            }
        };
        let _ = self.ids.insert(key, idx);
        self.groups.entry(pred).or_insert_with(Vec::new).push(idx);
        self.len += 1;
        (idx, true)
    }

    /// Handle of a rule, if present.
    pub fn find(&self, pred: &Pred, target: &Target) -> Option<RuleIdx> {
        self.ids.get(&(pred.clone(), target.clone())).cloned()
    }

    /// Erases a rule.
    ///
    /// Other rules of the same predicate group stay in the group, in the
    /// same order.
    pub fn erase(&mut self, idx: RuleIdx) -> Option<Rule> {
        let rule = self.rules.get_mut(*idx)?.take()?;
        let _ = self.ids.remove(&(rule.pred.clone(), rule.target.clone()));
        let empty = match self.groups.get_mut(&rule.pred) {
            Some(group) => {
                if let Some(pos) = group.iter().position(|i| *i == idx) {
                    let _ = group.remove(pos);
                }
                group.is_empty()
            }
            None => false,
        };
        if empty {
            let _ = self.groups.remove(&rule.pred);
        }
        self.free.push(idx);
        self.len -= 1;
        Some(rule)
    }

    /// Rule accessor.
    #[inline]
    pub fn get(&self, idx: RuleIdx) -> Option<&Rule> {
        self.rules.get(*idx).and_then(|rule| rule.as_ref())
    }
    /// Mutable rule accessor.
    #[inline]
    pub fn get_mut(&mut self, idx: RuleIdx) -> Option<&mut Rule> {
        self.rules.get_mut(*idx).and_then(|rule| rule.as_mut())
    }

    /// Rules, in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleIdx, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(idx, rule)| rule.as_ref().map(|rule| (RuleIdx::new(idx), rule)))
    }

    /// Handles of the rules, in handle order.
    pub fn indices(&self) -> Vec<RuleIdx> {
        self.iter().map(|(idx, _)| idx).collect()
    }

    /// The rules sharing a predicate.
    pub fn rules_sharing(&self, pred: &Pred) -> Grouped<'_> {
        Grouped {
            group: self.groups.get(pred).map(|g| g.as_slice()).unwrap_or(&[]),
            cursor: 0,
        }
    }

    /// Number of predicate groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Erases the rules verifying some predicate, returns how many were
    /// erased.
    pub fn erase_if<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(&Rule) -> bool,
    {
        let to_erase: Vec<RuleIdx> = self
            .iter()
            .filter(|(_, rule)| f(rule))
            .map(|(idx, _)| idx)
            .collect();
        for idx in &to_erase {
            let _ = self.erase(*idx);
        }
        to_erase.len()
    }

    /// Erases all the rules.
    pub fn clear(&mut self) {
        *self = RuleStore::new()
    }
}

/// Cursor over the rules sharing a predicate.
#[derive(Debug, Clone)]
pub struct Grouped<'a> {
    /// Handles of the group.
    group: &'a [RuleIdx],
    /// Next element.
    cursor: usize,
}

impl<'a> Grouped<'a> {
    /// Number of rules in the group.
    pub fn len(&self) -> usize {
        self.group.len()
    }
    /// True if the group is empty.
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }
    /// `n`-th rule of the group.
    ///
    /// Going past the end of the group is an integrity error.
    pub fn at(&self, n: usize) -> Res<RuleIdx> {
        match self.group.get(n) {
            Some(idx) => Ok(*idx),
            None => bail!(ErrorKind::GroupOverrun),
        }
    }
    /// Handles of the group.
    pub fn to_vec(&self) -> Vec<RuleIdx> {
        self.group.to_vec()
    }
}

impl<'a> Iterator for Grouped<'a> {
    type Item = RuleIdx;
    fn next(&mut self) -> Option<RuleIdx> {
        let res = self.group.get(self.cursor).cloned();
        if res.is_some() {
            self.cursor += 1
        }
        res
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cxt::test::context, pred::PredFactory};
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    /// Some rules over two predicates and three targets.
    fn rules() -> Vec<Rule> {
        let cxt = context("word tag => ttag", "word => tag", &["a X Y", "b Y Z", "c Z X"]);
        let mut factory = PredFactory::new();
        let tpl = cxt.preds.find("word_0").unwrap();
        let ttpl = cxt.targets.find("tag").unwrap();
        let mut rules = vec![];
        for word in &["a", "b"] {
            let pred = factory.mk(&cxt, tpl, vec![cxt.vocab.find(word).unwrap()]);
            for class in &["X", "Y", "Z"] {
                let target = Target::new(ttpl, vec![cxt.vocab.find(class).unwrap()]);
                rules.push(Rule::new(pred.clone(), target))
            }
        }
        rules
    }

    #[test]
    fn insert_find_erase() {
        let rules = rules();
        let mut store = RuleStore::new();
        let (i0, new) = store.insert(rules[0].clone());
        assert!(new);
        let (i1, _) = store.insert(rules[1].clone());
        let (i2, _) = store.insert(rules[2].clone());
        let (again, new) = store.insert(rules[0].clone());
        assert!(!new);
        assert_eq!(again, i0);
        assert_eq!(store.len(), 3);
        assert_eq!(store.find(&rules[1].pred, &rules[1].target), Some(i1));
        assert_eq!(store.find(&rules[2].pred, &rules[2].target), Some(i2));
        assert_eq!(store.find(&rules[3].pred, &rules[3].target), None);

        // Erasing the first rule of a group keeps the others.
        let erased = store.erase(i0).unwrap();
        assert_eq!(erased, rules[0]);
        assert_eq!(store.rules_sharing(&rules[0].pred).to_vec(), vec![i1, i2]);
        assert_eq!(store.find(&rules[0].pred, &rules[0].target), None);
        assert!(store.erase(i0).is_none());

        // Freed slots are recycled.
        let (i3, _) = store.insert(rules[3].clone());
        assert_eq!(i3, i0);
        assert_eq!(store.group_count(), 2);
    }

    #[test]
    fn group_overrun() {
        let rules = rules();
        let mut store = RuleStore::new();
        let (i0, _) = store.insert(rules[0].clone());
        let (i1, _) = store.insert(rules[1].clone());
        let group = store.rules_sharing(&rules[0].pred);
        assert_eq!(group.len(), 2);
        assert_eq!(group.at(0).unwrap(), i0);
        assert_eq!(group.at(1).unwrap(), i1);
        match group.at(2).map_err(|e| e.0) {
            Err(ErrorKind::GroupOverrun) => (),
            _ => panic!("expected a group overrun"),
        }
        assert!(store.rules_sharing(&rules[4].pred).at(0).is_err());
    }

    #[test]
    fn grouping_invariant() {
        let rules = rules();
        let mut rng = XorShiftRng::seed_from_u64(42);
        let mut store = RuleStore::new();
        let mut present: Vec<Option<RuleIdx>> = vec![None; rules.len()];
        for _ in 0..1000 {
            let n = rng.gen_range(0..rules.len());
            match present[n] {
                Some(idx) if rng.gen_bool(0.5) => {
                    assert!(store.erase(idx).is_some());
                    present[n] = None
                }
                Some(idx) => assert_eq!(store.insert(rules[n].clone()), (idx, false)),
                None => {
                    let (idx, new) = store.insert(rules[n].clone());
                    assert!(new);
                    present[n] = Some(idx)
                }
            }

            for (n, rule) in rules.iter().enumerate() {
                assert_eq!(store.find(&rule.pred, &rule.target), present[n]);
                let mut group = store.rules_sharing(&rule.pred).to_vec();
                group.sort();
                let mut expected: Vec<RuleIdx> = present
                    .iter()
                    .enumerate()
                    .filter(|(m, idx)| idx.is_some() && rules[*m].pred == rule.pred)
                    .filter_map(|(_, idx)| *idx)
                    .collect();
                expected.sort();
                assert_eq!(group, expected)
            }
            assert_eq!(store.len(), present.iter().filter(|p| p.is_some()).count())
        }
    }
}
