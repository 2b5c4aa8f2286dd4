//! Row-locking clause.

use super::Query;

/// Lock strength for `FOR ..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    /// `FOR UPDATE`
    Update,
    /// `FOR NO KEY UPDATE`
    NoKeyUpdate,
    /// `FOR SHARE`
    Share,
    /// `FOR KEY SHARE`
    KeyShare,
}

impl LockStrength {
    /// Returns the SQL keywords after `FOR`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Update => "UPDATE",
            Self::NoKeyUpdate => "NO KEY UPDATE",
            Self::Share => "SHARE",
            Self::KeyShare => "KEY SHARE",
        }
    }
}

/// What to do with rows locked by another transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWait {
    /// `NOWAIT`
    NoWait,
    /// `SKIP LOCKED`
    SkipLocked,
}

impl LockWait {
    /// Returns the SQL keywords.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoWait => "NOWAIT",
            Self::SkipLocked => "SKIP LOCKED",
        }
    }
}

/// `FOR <strength> [OF tables] [wait]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockClause {
    /// Lock strength.
    pub strength: LockStrength,
    /// Tables to lock; empty locks every table in `FROM`.
    pub tables: Vec<String>,
    /// Wait mode.
    pub wait: Option<LockWait>,
}

impl Query {
    /// Locks selected rows with the given strength.
    #[must_use]
    pub fn lock(&self, strength: LockStrength) -> Self {
        let mut query = self.clone();
        query.lock_mut(strength);
        query
    }

    /// Locks selected rows in place.
    pub fn lock_mut(&mut self, strength: LockStrength) -> &mut Self {
        self.data.lock = Some(LockClause {
            strength,
            tables: Vec::new(),
            wait: None,
        });
        self
    }

    /// `FOR UPDATE`.
    #[must_use]
    pub fn for_update(&self) -> Self {
        self.lock(LockStrength::Update)
    }

    /// `FOR NO KEY UPDATE`.
    #[must_use]
    pub fn for_no_key_update(&self) -> Self {
        self.lock(LockStrength::NoKeyUpdate)
    }

    /// `FOR SHARE`.
    #[must_use]
    pub fn for_share(&self) -> Self {
        self.lock(LockStrength::Share)
    }

    /// `FOR KEY SHARE`.
    #[must_use]
    pub fn for_key_share(&self) -> Self {
        self.lock(LockStrength::KeyShare)
    }

    /// Restricts the lock to `tables`. No effect without a lock.
    #[must_use]
    pub fn of<S: Into<String>>(&self, tables: impl IntoIterator<Item = S>) -> Self {
        let mut query = self.clone();
        if let Some(lock) = &mut query.data.lock {
            lock.tables.extend(tables.into_iter().map(Into::into));
        }
        query
    }

    /// Adds `NOWAIT` to the lock.
    #[must_use]
    pub fn no_wait(&self) -> Self {
        self.lock_wait(LockWait::NoWait)
    }

    /// Adds `SKIP LOCKED` to the lock.
    #[must_use]
    pub fn skip_locked(&self) -> Self {
        self.lock_wait(LockWait::SkipLocked)
    }

    fn lock_wait(&self, wait: LockWait) -> Self {
        let mut query = self.clone();
        if let Some(lock) = &mut query.data.lock {
            lock.wait = Some(wait);
        }
        query
    }
}
