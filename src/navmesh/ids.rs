// src/navmesh/ids.rs
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monoton steigender Änderungszähler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version(pub u64);

impl Version {
    pub const INITIAL: Version = Version(0);

    pub fn next(self) -> Version {
        Version(self.0 + 1)
    }

    pub fn bump(&mut self) -> Version {
        *self = self.next();
        *self
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Prozessweiter Versionsgenerator, damit Job-Versionen nie kollidieren.
#[derive(Debug, Default)]
pub struct VersionSource(AtomicU64);

impl VersionSource {
    pub fn next(&self) -> Version {
        Version(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayNodeId(pub usize);

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sector#{}", self.0)
    }
}

impl fmt::Display for HoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hole#{}", self.0)
    }
}

/// Agentenradius als Hash-Schlüssel (auf 1/1000 gerundet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentRadiusKey(i64);

impl AgentRadiusKey {
    pub fn new(radius: f64) -> Self {
        Self((radius * 1000.0).round() as i64)
    }

    pub fn radius(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}
