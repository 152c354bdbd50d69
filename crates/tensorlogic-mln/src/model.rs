//! Ground atoms, weighted clauses and the partitions that own them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MlnError, Result};
use crate::world::World;

/// Identity of a ground atom.
pub type AtomId = u32;

/// Identity of a partition.
pub type PartitionId = usize;

/// A boolean random variable of the ground model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Unique atom id
    pub id: AtomId,
    /// Stored truth value
    pub truth: bool,
    /// Whether this atom is a query variable
    pub is_query: bool,
    /// Whether this query atom is itself evidence for the request
    pub is_query_evidence: bool,
    /// Inferred marginal probability, if any
    pub probability: Option<f64>,
}

impl Atom {
    /// A query atom, initially false.
    pub fn query(id: AtomId) -> Self {
        Self {
            id,
            truth: false,
            is_query: true,
            is_query_evidence: false,
            probability: None,
        }
    }

    /// A hidden (non-query) atom, initially false.
    pub fn hidden(id: AtomId) -> Self {
        Self {
            is_query: false,
            ..Self::query(id)
        }
    }

    /// Set the stored truth value.
    pub fn with_truth(mut self, truth: bool) -> Self {
        self.truth = truth;
        self
    }

    /// Mark this atom as query evidence.
    pub fn with_query_evidence(mut self, is_query_evidence: bool) -> Self {
        self.is_query_evidence = is_query_evidence;
        self
    }
}

/// A signed reference to an atom inside a clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// Referenced atom
    pub atom: AtomId,
    /// `true` asserts the atom, `false` asserts its negation
    pub positive: bool,
}

impl Literal {
    /// Literal asserting `atom` is true.
    pub fn positive(atom: AtomId) -> Self {
        Self {
            atom,
            positive: true,
        }
    }

    /// Literal asserting `atom` is false.
    pub fn negative(atom: AtomId) -> Self {
        Self {
            atom,
            positive: false,
        }
    }

    /// Whether this literal holds under `assignment`.
    pub fn holds(&self, assignment: &Assignment) -> bool {
        assignment.get(self.atom) == self.positive
    }
}

/// A ground disjunction of literals with a real weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedClause {
    /// Clause id
    pub id: u64,
    /// Literals in their original order
    pub literals: Vec<Literal>,
    /// Clause weight; negative weights penalize satisfaction
    pub weight: f64,
    /// Whether the clause contains an atom and its negation
    pub is_tautology: bool,
}

impl WeightedClause {
    /// Create a clause, detecting tautologies.
    pub fn new(id: u64, literals: Vec<Literal>, weight: f64) -> Self {
        let is_tautology = literals.iter().any(|lit| {
            literals
                .iter()
                .any(|other| other.atom == lit.atom && other.positive != lit.positive)
        });
        Self {
            id,
            literals,
            weight,
            is_tautology,
        }
    }

    /// Whether at least one literal holds.
    pub fn is_satisfied(&self, assignment: &Assignment) -> bool {
        self.literals.iter().any(|lit| lit.holds(assignment))
    }

    /// Whether the clause contributes its weight to the cost.
    ///
    /// Positive clauses are violated when unsatisfied, negative ones when satisfied.
    pub fn is_violated(&self, assignment: &Assignment) -> bool {
        if self.weight > 0.0 {
            !self.is_satisfied(assignment)
        } else if self.weight < 0.0 {
            self.is_satisfied(assignment)
        } else {
            false
        }
    }
}

/// An independent block of the ground model.
///
/// No clause of a partition references an atom of another partition, so the
/// joint distribution factors over partitions.
#[derive(Clone, Debug)]
pub struct Partition {
    id: PartitionId,
    atoms: IndexMap<AtomId, Atom>,
    clauses: Vec<WeightedClause>,
    core_atoms: Vec<AtomId>,
}

impl Partition {
    /// Create a partition; every atom is a core atom and tautologies are dropped.
    ///
    /// Fails on a repeated atom id or a clause literal over an unknown atom.
    pub fn new(id: PartitionId, atoms: Vec<Atom>, clauses: Vec<WeightedClause>) -> Result<Self> {
        let mut owned: IndexMap<AtomId, Atom> = IndexMap::with_capacity(atoms.len());
        for atom in atoms {
            let atom_id = atom.id;
            if owned.insert(atom_id, atom).is_some() {
                return Err(MlnError::DuplicateAtom(atom_id));
            }
        }
        let atoms = owned;

        for clause in &clauses {
            for lit in &clause.literals {
                if !atoms.contains_key(&lit.atom) {
                    return Err(MlnError::UnknownAtom(lit.atom));
                }
            }
        }

        let clauses: Vec<WeightedClause> = clauses.into_iter().filter(|c| !c.is_tautology).collect();
        let core_atoms = atoms.keys().copied().collect();

        Ok(Self {
            id,
            atoms,
            clauses,
            core_atoms,
        })
    }

    /// Restrict the core (marginalizable) atoms to `core`.
    ///
    /// Atoms outside the core keep their stored truth during enumeration.
    pub fn with_core_atoms(mut self, core: impl IntoIterator<Item = AtomId>) -> Result<Self> {
        let mut selected = Vec::new();
        for id in core {
            if !self.atoms.contains_key(&id) {
                return Err(MlnError::UnknownAtom(id));
            }
            if !selected.contains(&id) {
                selected.push(id);
            }
        }
        self.core_atoms = selected;
        Ok(self)
    }

    /// Partition id.
    pub fn id(&self) -> PartitionId {
        self.id
    }

    /// All atoms in insertion order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.values()
    }

    /// Look up an atom.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(&id)
    }

    /// Mutable access to an atom, e.g. to store an inferred probability.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(&id)
    }

    /// Number of atoms owned.
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// The working (non-tautological) clauses.
    pub fn clauses(&self) -> &[WeightedClause] {
        &self.clauses
    }

    /// Atoms eligible for marginalization.
    pub fn core_atoms(&self) -> &[AtomId] {
        &self.core_atoms
    }

    /// Whether `id` is a core atom.
    pub fn is_core(&self, id: AtomId) -> bool {
        self.core_atoms.contains(&id)
    }

    /// Core atoms flagged as query variables.
    pub fn query_atoms(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.core_atoms
            .iter()
            .copied()
            .filter(|id| self.atoms.get(id).is_some_and(|a| a.is_query))
    }

    /// Core atoms that appear in `target`, in core order.
    pub fn free_atoms(&self, target: &World) -> Vec<AtomId> {
        self.core_atoms
            .iter()
            .copied()
            .filter(|&id| target.contains(id))
            .collect()
    }

    /// The world formed by core atoms whose stored truth is true.
    pub fn stored_core_world(&self) -> World {
        self.core_atoms
            .iter()
            .copied()
            .filter(|id| self.atoms.get(id).is_some_and(|a| a.truth))
            .collect()
    }
}

/// A group of partitions processed as one job.
#[derive(Clone, Debug, Default)]
pub struct Component {
    /// Constituent partitions
    pub partitions: Vec<Partition>,
}

impl Component {
    /// Create a component from its partitions.
    pub fn new(partitions: Vec<Partition>) -> Self {
        Self { partitions }
    }
}

/// Flatten components into their partitions.
pub fn flatten(components: &[Component]) -> Vec<&Partition> {
    components.iter().flat_map(|c| c.partitions.iter()).collect()
}

/// A complete truth buffer for one partition, handed to the cost oracle.
///
/// Enumeration and sampling write into an assignment instead of mutating the
/// partition's atoms, so partitions can be processed on separate threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    truth: World,
}

impl Assignment {
    /// Non-core atoms at their stored truth, core atoms false.
    pub fn baseline(partition: &Partition) -> Self {
        let truth = partition
            .atoms()
            .filter(|a| a.truth && !partition.is_core(a.id))
            .map(|a| a.id)
            .collect();
        Self { truth }
    }

    /// Baseline with core atoms copied from `world`.
    pub fn from_world(partition: &Partition, world: &World) -> Self {
        let mut assignment = Self::baseline(partition);
        for &id in partition.core_atoms() {
            if world.contains(id) {
                assignment.truth.insert(id);
            }
        }
        assignment
    }

    /// Reset every core atom to false.
    pub fn reset_core(&mut self, partition: &Partition) {
        for &id in partition.core_atoms() {
            self.truth.remove(id);
        }
    }

    /// Truth value of `atom`.
    pub fn get(&self, atom: AtomId) -> bool {
        self.truth.contains(atom)
    }

    /// Set the truth value of `atom`.
    pub fn set(&mut self, atom: AtomId, truth: bool) {
        self.truth.set(atom, truth);
    }

    /// The true atoms of this assignment.
    pub fn world(&self) -> &World {
        &self.truth
    }
}
