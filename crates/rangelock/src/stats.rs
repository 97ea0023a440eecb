use crate::range::LockKind;
use serde::Serialize;

/// Lock table statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LockStats {
    /// Shared ranges granted.
    pub reads_granted: u64,
    /// Exclusive ranges granted.
    pub writes_granted: u64,
    /// Acquires that had to wait at least once before being granted or
    /// timing out.
    pub contended: u64,
    /// Times a waiter was woken and re-checked its conflict.
    pub wakeups: u64,
    /// Ranges removed by a matching release.
    pub releases: u64,
    /// Releases that found no matching range.
    pub unmatched_releases: u64,
    /// Acquires abandoned because their deadline expired.
    pub timeouts: u64,
    /// Non-blocking acquires refused because of a conflict.
    pub try_refused: u64,
}

impl LockStats {
    pub(crate) fn record_grant(&mut self, kind: LockKind) {
        match kind {
            LockKind::Read => self.reads_granted += 1,
            LockKind::Write => self.writes_granted += 1,
        }
    }

    pub fn total_granted(&self) -> u64 {
        self.reads_granted + self.writes_granted
    }

    /// Ranges granted and not yet released.
    pub fn outstanding(&self) -> u64 {
        self.total_granted().saturating_sub(self.releases)
    }
}
