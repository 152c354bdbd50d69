//! Durable recording of chosen worlds.

use crate::error::Result;
use crate::world::World;

/// Receiver of reported worlds, keyed by a result-set label.
pub trait ResultSink {
    /// Record `world` under `label`.
    fn commit(&mut self, world: &World, label: &str) -> Result<()>;
}

/// A world recorded by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedWorld {
    /// Result-set label
    pub label: String,
    /// Recorded world
    pub world: World,
}

/// Sink keeping every commit in memory, in commit order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    commits: Vec<CommittedWorld>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All commits so far.
    pub fn commits(&self) -> &[CommittedWorld] {
        &self.commits
    }

    /// The most recent world committed under `label`.
    pub fn get(&self, label: &str) -> Option<&World> {
        self.commits
            .iter()
            .rev()
            .find(|c| c.label == label)
            .map(|c| &c.world)
    }
}

impl ResultSink for MemorySink {
    fn commit(&mut self, world: &World, label: &str) -> Result<()> {
        self.commits.push(CommittedWorld {
            label: label.to_string(),
            world: world.clone(),
        });
        Ok(())
    }
}
