//! Name <-> dense index mapping with aliasing.
//!
//! Aliases and retirements are recorded lazily and resolved through a single
//! [`SymbolTable::compact`] pass, so a batch of merges costs one renumbering.

use std::collections::BTreeMap;
use thiserror::Error;

/// Names starting with this character are generated by the compiler.
pub const INTERNAL_PREFIX: char = '$';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("no variable named `{0}`")]
    UnknownName(String),
    #[error("index {0} has no bound name")]
    UnboundIndex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebind {
    Merged(usize),
    Retired,
}

/// Old index -> new index mapping produced by [`SymbolTable::compact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    map: Vec<Option<usize>>,
}

impl Remap {
    pub fn identity(len: usize) -> Self {
        Self {
            map: (0..len).map(Some).collect(),
        }
    }

    /// New index of `old`, or `None` when it was retired.
    pub fn get(&self, old: usize) -> Option<usize> {
        self.map.get(old).copied().flatten()
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, m)| *m == Some(i))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    by_name: BTreeMap<String, usize>,
    len: usize,
    pending: BTreeMap<usize, Rebind>,
    internal_id: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, allocating the next free index for a new name.
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&i) = self.by_name.get(name) {
            if let Some(root) = self.root(i) {
                return root;
            }
        }
        let i = self.len;
        self.len += 1;
        self.by_name.insert(name.to_string(), i);
        i
    }

    /// Allocate a fresh compiler-generated name such as `$pin3`.
    pub fn fresh_internal(&mut self, prefix: &str) -> (String, usize) {
        loop {
            let name = format!("{}{}{}", INTERNAL_PREFIX, prefix, self.internal_id);
            self.internal_id += 1;
            if !self.by_name.contains_key(&name) {
                let i = self.intern(&name);
                return (name, i);
            }
        }
    }

    /// Current index of a known name.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).and_then(|&i| self.root(i))
    }

    /// Number of allocated indices (including ones awaiting compaction).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn max_index(&self) -> Option<usize> {
        self.len.checked_sub(1)
    }

    /// Sorted names bound to `index`.
    pub fn names_of(&self, index: usize) -> Vec<&str> {
        self.by_name
            .iter()
            .filter(|(_, &i)| self.root(i) == Some(index))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Preferred display name of `index`: the first user name, else the first name.
    pub fn name_of(&self, index: usize) -> Result<&str, SymbolError> {
        let names = self.names_of(index);
        names
            .iter()
            .find(|n| !is_internal_name(n))
            .or_else(|| names.first())
            .copied()
            .ok_or(SymbolError::UnboundIndex(index))
    }

    /// True when every name bound to `index` is compiler-generated.
    pub fn is_internal(&self, index: usize) -> bool {
        self.names_of(index).iter().all(|n| is_internal_name(n))
    }

    /// All (name, index) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.by_name
            .iter()
            .filter_map(|(n, &i)| self.root(i).map(|r| (n.as_str(), r)))
    }

    fn root(&self, mut i: usize) -> Option<usize> {
        loop {
            match self.pending.get(&i) {
                None => return Some(i),
                Some(Rebind::Merged(to)) => i = *to,
                Some(Rebind::Retired) => return None,
            }
        }
    }

    /// Record that two indices are the same variable; the lower index survives.
    /// Renumbering is deferred to [`SymbolTable::compact`].
    pub fn merge(&mut self, a: usize, b: usize) -> Result<usize, SymbolError> {
        let ra = self.root(a).ok_or(SymbolError::UnboundIndex(a))?;
        let rb = self.root(b).ok_or(SymbolError::UnboundIndex(b))?;
        if ra == rb {
            return Ok(ra);
        }
        let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.pending.insert(drop, Rebind::Merged(keep));
        Ok(keep)
    }

    /// Remove `index` from the active space and return the names it carried.
    pub fn retire(&mut self, index: usize) -> Result<Vec<String>, SymbolError> {
        let r = self.root(index).ok_or(SymbolError::UnboundIndex(index))?;
        let names: Vec<String> = self
            .by_name
            .iter()
            .filter(|(_, &i)| self.root(i) == Some(r))
            .map(|(n, _)| n.clone())
            .collect();
        for n in &names {
            self.by_name.remove(n);
        }
        self.pending.insert(r, Rebind::Retired);
        Ok(names)
    }

    /// Renumber surviving indices densely from 0, preserving their order.
    pub fn compact(&mut self) -> Remap {
        if self.pending.is_empty() {
            return Remap::identity(self.len);
        }
        let mut new_of_root = vec![None; self.len];
        let mut next = 0;
        for (i, slot) in new_of_root.iter_mut().enumerate() {
            if !self.pending.contains_key(&i) {
                *slot = Some(next);
                next += 1;
            }
        }
        let map: Vec<Option<usize>> = (0..self.len)
            .map(|i| self.root(i).and_then(|r| new_of_root[r]))
            .collect();
        for idx in self.by_name.values_mut() {
            // retired names were removed in `retire`
            if let Some(new) = map[*idx] {
                *idx = new;
            }
        }
        self.len = next;
        self.pending.clear();
        Remap { map }
    }

    /// Alias two names onto one index and compact immediately.
    pub fn alias(&mut self, a: &str, b: &str) -> Result<Remap, SymbolError> {
        let ia = self
            .lookup(a)
            .ok_or_else(|| SymbolError::UnknownName(a.to_string()))?;
        let ib = self
            .lookup(b)
            .ok_or_else(|| SymbolError::UnknownName(b.to_string()))?;
        self.merge(ia, ib)?;
        Ok(self.compact())
    }
}

pub fn is_internal_name(name: &str) -> bool {
    name.starts_with(INTERNAL_PREFIX)
}
