//! Truth assignments represented as sets of true atom ids.

use std::fmt;

use crate::model::AtomId;

const WORD_BITS: usize = 64;

/// A complete or partial truth assignment: the set of atoms that are true.
///
/// Stored as a growable bitset keyed by atom id. Trailing zero words are
/// always trimmed so that equal sets compare and hash equal regardless of
/// how they were built.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct World {
    words: Vec<u64>,
}

impl World {
    /// Create an empty world (every atom false).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a world from the ids of its true atoms.
    pub fn from_atoms<I>(atoms: I) -> Self
    where
        I: IntoIterator<Item = AtomId>,
    {
        let mut world = Self::new();
        for atom in atoms {
            world.insert(atom);
        }
        world
    }

    /// Whether `atom` is true in this world.
    pub fn contains(&self, atom: AtomId) -> bool {
        let (word, bit) = Self::locate(atom);
        self.words
            .get(word)
            .is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Mark `atom` true.
    pub fn insert(&mut self, atom: AtomId) {
        let (word, bit) = Self::locate(atom);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    /// Mark `atom` false.
    pub fn remove(&mut self, atom: AtomId) {
        let (word, bit) = Self::locate(atom);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !(1u64 << bit);
            self.trim();
        }
    }

    /// Set the truth value of `atom`.
    pub fn set(&mut self, atom: AtomId, truth: bool) {
        if truth {
            self.insert(atom);
        } else {
            self.remove(atom);
        }
    }

    /// Add every true atom of `other` to this world.
    pub fn union_with(&mut self, other: &World) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            *mine |= *theirs;
        }
    }

    /// Union of two worlds built over independent partitions.
    pub fn union(&self, other: &World) -> World {
        let mut out = self.clone();
        out.union_with(other);
        out
    }

    /// Restrict this world to the given atoms.
    pub fn restrict_to<I>(&self, atoms: I) -> World
    where
        I: IntoIterator<Item = AtomId>,
    {
        World::from_atoms(atoms.into_iter().filter(|&a| self.contains(a)))
    }

    /// Number of true atoms.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no atom is true.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate over true atom ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| (i * WORD_BITS + bit) as AtomId)
        })
    }

    fn locate(atom: AtomId) -> (usize, usize) {
        let idx = atom as usize;
        (idx / WORD_BITS, idx % WORD_BITS)
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<AtomId> for World {
    fn from_iter<I: IntoIterator<Item = AtomId>>(iter: I) -> Self {
        World::from_atoms(iter)
    }
}

impl Extend<AtomId> for World {
    fn extend<I: IntoIterator<Item = AtomId>>(&mut self, iter: I) {
        for atom in iter {
            self.insert(atom);
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, atom) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", atom)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "World{}", self)
    }
}
