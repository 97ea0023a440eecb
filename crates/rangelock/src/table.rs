//! Byte-range lock table for a single file.
//!
//! Implements fcntl-style advisory range locking inside one process. Granted
//! ranges live in a plain vector behind a mutex; callers that cannot be
//! granted park on a condition variable and re-check their conflict every
//! time any range is released. Releases wake every waiter because waiters
//! with disjoint requests may all become grantable at once.
//!
//! There is no queueing discipline: a newly arriving compatible request can
//! be granted ahead of an older one that is still blocked, so a writer can
//! starve behind a steady stream of overlapping readers. Deadlocks between
//! callers are not detected; bound the wait with
//! [`RangeLockConfig::wait_timeout`] or the `*_timeout` variants if that
//! matters.

use crate::config::RangeLockConfig;
use crate::error::{LockError, Result};
use crate::range::{self, LockKind, Range};
use crate::stats::LockStats;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

struct TableState {
    active: Vec<Range>,
    stats: LockStats,
}

impl TableState {
    fn conflicting(&self, offset: i64, length: i64, exclusive: bool) -> Option<&Range> {
        self.active
            .iter()
            .find(|r| r.conflicts_with(offset, length, exclusive))
    }

    fn has_conflict(&self, offset: i64, length: i64, exclusive: bool) -> bool {
        self.conflicting(offset, length, exclusive).is_some()
    }

    fn grant(&mut self, range: Range) {
        self.stats.record_grant(range.kind());
        self.active.push(range);
    }
}

/// Registry of the ranges currently granted on one file.
pub struct RangeLockTable {
    state: Mutex<TableState>,
    released: Condvar,
    config: RangeLockConfig,
}

impl RangeLockTable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TableState {
                active: Vec::new(),
                stats: LockStats::default(),
            }),
            released: Condvar::new(),
            config: RangeLockConfig::default(),
        }
    }

    pub fn with_config(config: RangeLockConfig) -> Result<Self> {
        config.validate()?;
        let mut table = Self::new();
        table.config = config;
        Ok(table)
    }

    pub fn config(&self) -> &RangeLockConfig {
        &self.config
    }

    /// Blocks until no overlapping write lock is held, then records a shared
    /// range.
    pub fn acquire_read(&self, offset: i64, length: i64) -> Result<()> {
        self.acquire(offset, length, LockKind::Read, self.config.wait_timeout)
    }

    /// Blocks until no overlapping lock of either kind is held, then records
    /// an exclusive range.
    pub fn acquire_write(&self, offset: i64, length: i64) -> Result<()> {
        self.acquire(offset, length, LockKind::Write, self.config.wait_timeout)
    }

    pub fn acquire_read_timeout(
        &self,
        offset: i64,
        length: i64,
        timeout: Duration,
    ) -> Result<()> {
        self.acquire(offset, length, LockKind::Read, Some(timeout))
    }

    pub fn acquire_write_timeout(
        &self,
        offset: i64,
        length: i64,
        timeout: Duration,
    ) -> Result<()> {
        self.acquire(offset, length, LockKind::Write, Some(timeout))
    }

    /// Grants a shared range if possible without waiting.
    pub fn try_acquire_read(&self, offset: i64, length: i64) -> Result<bool> {
        self.try_acquire(offset, length, LockKind::Read)
    }

    /// Grants an exclusive range if possible without waiting.
    pub fn try_acquire_write(&self, offset: i64, length: i64) -> Result<bool> {
        self.try_acquire(offset, length, LockKind::Write)
    }

    /// Removes the first shared range equal to `(offset, length)` and wakes
    /// all waiters. A release that matches nothing is ignored unless
    /// `strict_release` is configured.
    pub fn release_read(&self, offset: i64, length: i64) -> Result<()> {
        self.release(offset, length, LockKind::Read)
    }

    /// Removes the first exclusive range equal to `(offset, length)` and
    /// wakes all waiters.
    pub fn release_write(&self, offset: i64, length: i64) -> Result<()> {
        self.release(offset, length, LockKind::Write)
    }

    /// Returns a held range that would block the given request, if any.
    pub fn conflicting_range(
        &self,
        offset: i64,
        length: i64,
        exclusive: bool,
    ) -> Result<Option<Range>> {
        range::validate(offset, length)?;
        let state = self.lock_state()?;
        Ok(state.conflicting(offset, length, exclusive).copied())
    }

    pub fn has_conflict(&self, offset: i64, length: i64, exclusive: bool) -> Result<bool> {
        Ok(self.conflicting_range(offset, length, exclusive)?.is_some())
    }

    pub fn held_ranges(&self) -> Result<Vec<Range>> {
        Ok(self.lock_state()?.active.clone())
    }

    pub fn lock_count(&self) -> Result<usize> {
        Ok(self.lock_state()?.active.len())
    }

    pub fn is_locked(&self) -> Result<bool> {
        Ok(!self.lock_state()?.active.is_empty())
    }

    pub fn stats(&self) -> Result<LockStats> {
        Ok(self.lock_state()?.stats.clone())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, TableState>> {
        Ok(self.state.lock()?)
    }

    fn acquire(
        &self,
        offset: i64,
        length: i64,
        kind: LockKind,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let exclusive = kind.is_exclusive();
        let range = Range::new(offset, length, exclusive)?;
        debug!("Attempting to lock {}", range);

        let mut state = self.lock_state()?;
        if state.has_conflict(offset, length, exclusive) {
            state.stats.contended += 1;
            let started = Instant::now();
            let deadline = timeout.and_then(|t| started.checked_add(t));

            loop {
                state = match deadline {
                    None => self.released.wait(state)?,
                    Some(deadline) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            state.stats.timeouts += 1;
                            let waited_ms =
                                u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                            warn!("Gave up on {} after {}ms", range, waited_ms);
                            return Err(LockError::Timeout {
                                offset,
                                length,
                                kind,
                                waited_ms,
                            });
                        }
                        self.released.wait_timeout(state, remaining)?.0
                    }
                };
                state.stats.wakeups += 1;
                if !state.has_conflict(offset, length, exclusive) {
                    break;
                }
                trace!("Still blocked on {}", range);
            }
        }

        state.grant(range);
        debug!("Locked {}", range);
        Ok(())
    }

    fn try_acquire(&self, offset: i64, length: i64, kind: LockKind) -> Result<bool> {
        let exclusive = kind.is_exclusive();
        let range = Range::new(offset, length, exclusive)?;

        let mut state = self.lock_state()?;
        if let Some(holder) = state.conflicting(offset, length, exclusive) {
            debug!("Refused {}: conflicts with {}", range, holder);
            state.stats.try_refused += 1;
            return Ok(false);
        }
        state.grant(range);
        debug!("Locked {}", range);
        Ok(true)
    }

    fn release(&self, offset: i64, length: i64, kind: LockKind) -> Result<()> {
        range::validate(offset, length)?;
        let exclusive = kind.is_exclusive();

        let removed = {
            let mut state = self.lock_state()?;
            let found = state
                .active
                .iter()
                .position(|r| r.matches(offset, length, exclusive));
            match found {
                Some(pos) => {
                    let range = state.active.remove(pos);
                    state.stats.releases += 1;
                    debug!("Released {}", range);
                    true
                }
                None => {
                    state.stats.unmatched_releases += 1;
                    false
                }
            }
        };
        self.released.notify_all();

        if !removed {
            warn!(
                "Release of {} lock at offset {} with length {} matched nothing",
                kind, offset, length
            );
            if self.config.strict_release {
                return Err(LockError::NoSuchLock {
                    offset,
                    length,
                    kind,
                });
            }
        }
        Ok(())
    }
}

impl Default for RangeLockTable {
    fn default() -> Self {
        Self::new()
    }
}
