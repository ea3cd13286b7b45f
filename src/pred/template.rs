//! Predicate templates and their registry.

use crate::{common::*, data::Layout, pred::atom::Atom};

/// A predicate template: a conjunction of atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredTemplate {
    /// Atoms.
    atoms: Vec<Atom>,
    /// Variable each atom was written as, if any.
    vars: Vec<Option<String>>,
    /// Canonical text, used as identity.
    key: String,
}

impl PredTemplate {
    /// Constructor.
    pub fn new(atoms: Vec<Atom>, vars: Vec<Option<String>>, layout: &Layout) -> Self {
        debug_assert_eq! { atoms.len(), vars.len() }
        let key = Self::key_of(&atoms, layout);
        PredTemplate { atoms, vars, key }
    }

    /// Canonical text of a list of atoms.
    pub fn key_of(atoms: &[Atom], layout: &Layout) -> String {
        let texts: Vec<_> = atoms.iter().map(|atom| atom.text(layout, false)).collect();
        texts.join(" ")
    }

    /// Atoms.
    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }
    /// Number of atoms.
    #[inline]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }
    /// True if the template has no atom.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
    /// Canonical text.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Text of an atom as it appears in rule files.
    pub fn unit(&self, slot: usize, layout: &Layout, short: bool) -> String {
        match self.vars[slot] {
            Some(ref var) => format!("${}", var),
            None => self.atoms[slot].text(layout, short),
        }
    }

    /// Largest distance to the current position the template reads.
    pub fn reach(&self) -> usize {
        self.atoms.iter().map(|atom| atom.reach()).max().unwrap_or(0)
    }

    /// Positions and features the template reads.
    pub fn dependencies(&self) -> Vec<(isize, FeatIdx)> {
        let mut deps = vec![];
        for atom in &self.atoms {
            atom.dependencies(&mut deps)
        }
        deps.sort();
        deps.dedup();
        deps
    }
}

/// Registry of the predicate templates.
///
/// Also maintains the symmetric window every template fits in, and for each
/// relative position and feature, the templates that read it.
#[derive(Debug, Clone, Default)]
pub struct PredTemplates {
    /// Templates.
    tpls: PTplMap<PredTemplate>,
    /// Canonical text to template.
    keys: HashMap<String, PTplIdx>,
    /// Variables of the rule template file.
    vars: BTreeMap<String, String>,
    /// Window half-width.
    pad: usize,
    /// Sample width, zero before finalization.
    width: usize,
    /// Templates reading each `(relative position, feature)`.
    dependents: Vec<Vec<PTplIdx>>,
}

impl PredTemplates {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.tpls.len()
    }
    /// True if there are no templates.
    pub fn is_empty(&self) -> bool {
        self.tpls.is_empty()
    }
    /// Window half-width.
    pub fn pad(&self) -> usize {
        self.pad
    }
    /// Template indices.
    pub fn indices(&self) -> impl Iterator<Item = PTplIdx> {
        self.tpls.indices()
    }
    /// Templates.
    pub fn iter(&self) -> impl Iterator<Item = (PTplIdx, &PredTemplate)> {
        self.tpls.index_iter()
    }

    /// Defines a variable.
    pub fn define(&mut self, name: &str, value: &str) {
        let _ = self.vars.insert(name.to_string(), value.to_string());
    }

    /// Parses a unit, substituting variables.
    pub fn parse_unit(&self, unit: &str, layout: &Layout) -> Res<(Atom, Option<String>)> {
        if let Some(name) = unit.strip_prefix('$') {
            match self.vars.get(name) {
                Some(value) => Ok((Atom::parse(value, layout)?, Some(name.to_string()))),
                None => bail!(ErrorKind::UndefinedVariable(name.into())),
            }
        } else {
            Ok((Atom::parse(unit, layout)?, None))
        }
    }

    /// Parses the units of a template.
    pub fn parse_units<'a, Units>(&self, units: Units, layout: &Layout) -> Res<PredTemplate>
    where
        Units: IntoIterator<Item = &'a str>,
    {
        let (mut atoms, mut vars) = (vec![], vec![]);
        for unit in units {
            let (atom, var) = self.parse_unit(unit, layout)?;
            atoms.push(atom);
            vars.push(var)
        }
        Ok(PredTemplate::new(atoms, vars, layout))
    }

    /// Registers a template, returns its index and `true` if it is new.
    ///
    /// Once the window is fixed, templates reaching past it are rejected.
    pub fn register(&mut self, tpl: PredTemplate) -> Res<(PTplIdx, bool)> {
        if let Some(idx) = self.keys.get(tpl.key()) {
            return Ok((*idx, false));
        }
        if self.width > 0 && tpl.reach() > self.pad {
            bail!(ErrorKind::TemplateSyntax(format!(
                "`{}` reads {} position(s) away, the window only covers {}",
                tpl.key(),
                tpl.reach(),
                self.pad
            )))
        }
        self.pad = ::std::cmp::max(self.pad, tpl.reach());
        let key = tpl.key.clone();
        let idx = self.tpls.push(tpl);
        let _ = self.keys.insert(key, idx);
        if self.width > 0 {
            self.add_dependents(idx)
        }
        Ok((idx, true))
    }

    /// Finds a template from its canonical text.
    pub fn find(&self, key: &str) -> Option<PTplIdx> {
        self.keys.get(key).cloned()
    }

    /// Computes the dependency table, the window cannot grow afterwards.
    pub fn finalize(&mut self, width: usize) {
        self.width = width;
        self.dependents = vec![vec![]; (2 * self.pad + 1) * width];
        for idx in self.tpls.indices() {
            self.add_dependents(idx)
        }
    }

    /// Records the dependencies of a template.
    fn add_dependents(&mut self, idx: PTplIdx) {
        for (rel, feat) in self.tpls[idx].dependencies() {
            let slot = self.slot(rel, feat);
            debug_assert! { slot.is_some() }
            if let Some(slot) = slot {
                self.dependents[slot].push(idx)
            }
        }
    }

    /// Slot of a relative position and feature in the dependency table.
    fn slot(&self, rel: isize, feat: FeatIdx) -> Option<usize> {
        let shifted = rel + self.pad as isize;
        if shifted < 0 || shifted > 2 * self.pad as isize || *feat >= self.width {
            None
        } else {
            Some(shifted as usize * self.width + *feat)
        }
    }

    /// Templates reading a feature at some relative position.
    pub fn dependents(&self, rel: isize, feat: FeatIdx) -> &[PTplIdx] {
        match self.slot(rel, feat) {
            Some(slot) => &self.dependents[slot],
            None => &[],
        }
    }
}

impl ::std::ops::Index<PTplIdx> for PredTemplates {
    type Output = PredTemplate;
    fn index(&self, idx: PTplIdx) -> &PredTemplate {
        &self.tpls[idx]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry() {
        let layout = Layout::of_str("word pos tag => ttag").unwrap();
        let mut tpls = PredTemplates::new();
        tpls.define("W", "word::3~~");
        let t1 = tpls.parse_units(vec!["tag_-1", "word"], &layout).unwrap();
        let t2 = tpls.parse_units(vec!["tag_-1", "word_0"], &layout).unwrap();
        let t3 = tpls.parse_units(vec!["$W", "pos:[-2,0]"], &layout).unwrap();
        assert_eq!(t1.key(), "tag_-1 word_0");
        assert_eq!(t3.unit(0, &layout, true), "$W");
        assert_eq!(t3.unit(1, &layout, true), "pos:[-2,0]");

        let (i1, new1) = tpls.register(t1).unwrap();
        let (i2, new2) = tpls.register(t2).unwrap();
        let (i3, _) = tpls.register(t3).unwrap();
        assert!(new1 && !new2);
        assert_eq!(i1, i2);
        assert_eq!(tpls.len(), 2);
        assert_eq!(tpls.pad(), 2);
        assert_eq!(tpls.find("word_0::3~~ pos:[-2,0]"), Some(i3));

        tpls.finalize(layout.width());
        let tag = layout.feature("tag").unwrap();
        let pos = layout.feature("pos").unwrap();
        assert_eq!(tpls.dependents(-1, tag), &[i1]);
        assert_eq!(tpls.dependents(-2, pos), &[i3]);
        assert_eq!(tpls.dependents(1, pos), &[] as &[PTplIdx]);
        assert_eq!(tpls.dependents(7, pos), &[] as &[PTplIdx]);

        // The window is fixed now.
        let near = tpls.parse_units(vec!["word_1"], &layout).unwrap();
        let (near, new) = tpls.register(near).unwrap();
        assert!(new);
        assert_eq!(tpls.dependents(1, layout.feature("word").unwrap()), &[near]);
        let far = tpls.parse_units(vec!["word_3"], &layout).unwrap();
        match tpls.register(far).map_err(|e| e.0) {
            Err(ErrorKind::TemplateSyntax(_)) => (),
            _ => panic!("expected a template reaching past the window"),
        }
        assert_eq!(tpls.pad(), 2);

        match tpls.parse_unit("$V", &layout).map_err(|e| e.0) {
            Err(ErrorKind::UndefinedVariable(name)) => assert_eq!(name, "V"),
            _ => panic!("expected an undefined variable"),
        }
    }
}
