//! Merchant commitment registry.

use std::collections::HashMap;

use tinypay_proto::{Account, Digest};

use crate::error::LedgerError;

/// Lifecycle of a registered commitment digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitStatus {
    /// Registered and waiting for a matching payment.
    Pending,
    /// Used by a completed payment. Terminal.
    Consumed,
}

/// A registered commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    /// Merchant that submitted the digest.
    pub merchant: Account,
    /// Current status.
    pub status: CommitStatus,
}

/// Committed digests submitted by merchants ahead of payment completion.
///
/// Consumed digests are retained so that a digest can be satisfied at most
/// once over the lifetime of the ledger.
#[derive(Debug, Clone, Default)]
pub struct CommitRegistry {
    entries: HashMap<Digest, Commitment>,
}

impl CommitRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a staging area over the registry.
    #[must_use]
    pub fn stage(&self) -> StagedCommits<'_> {
        StagedCommits {
            base: self,
            touched: HashMap::new(),
        }
    }

    /// Writes a staged delta into the registry.
    pub fn apply(&mut self, delta: CommitDelta) {
        self.entries.extend(delta.entries);
    }

    /// Returns the status of `commit_hash`, `None` if never registered.
    #[must_use]
    pub fn status(&self, commit_hash: &Digest) -> Option<CommitStatus> {
        self.entries.get(commit_hash).map(|c| c.status)
    }

    /// Returns `true` if `commit_hash` is pending.
    #[must_use]
    pub fn is_pending(&self, commit_hash: &Digest) -> bool {
        self.status(commit_hash) == Some(CommitStatus::Pending)
    }

    /// Returns the number of pending commitments.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|c| c.status == CommitStatus::Pending)
            .count()
    }
}

/// Uncommitted registrations and consumptions over a [`CommitRegistry`].
#[derive(Debug)]
pub struct StagedCommits<'a> {
    base: &'a CommitRegistry,
    touched: HashMap<Digest, Commitment>,
}

impl StagedCommits<'_> {
    fn entry(&self, commit_hash: &Digest) -> Option<Commitment> {
        self.touched
            .get(commit_hash)
            .or_else(|| self.base.entries.get(commit_hash))
            .copied()
    }

    /// Registers `commit_hash` as pending on behalf of `merchant`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateCommit`] if the digest is pending or
    /// was already consumed.
    pub fn register(&mut self, merchant: Account, commit_hash: Digest) -> Result<(), LedgerError> {
        if self.entry(&commit_hash).is_some() {
            return Err(LedgerError::DuplicateCommit { commit_hash });
        }
        self.touched.insert(
            commit_hash,
            Commitment {
                merchant,
                status: CommitStatus::Pending,
            },
        );
        Ok(())
    }

    /// Marks a pending commitment as consumed and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownCommit`] if the digest is not pending.
    pub fn consume(&mut self, commit_hash: &Digest) -> Result<Commitment, LedgerError> {
        match self.entry(commit_hash) {
            Some(mut entry) if entry.status == CommitStatus::Pending => {
                entry.status = CommitStatus::Consumed;
                self.touched.insert(*commit_hash, entry);
                Ok(entry)
            }
            _ => Err(LedgerError::UnknownCommit {
                commit_hash: *commit_hash,
            }),
        }
    }

    /// Returns the staged status of `commit_hash`.
    #[must_use]
    pub fn status(&self, commit_hash: &Digest) -> Option<CommitStatus> {
        self.entry(commit_hash).map(|c| c.status)
    }

    /// Closes the staging area, keeping only what changed.
    #[must_use]
    pub fn into_delta(self) -> CommitDelta {
        CommitDelta {
            entries: self.touched,
        }
    }
}

/// The commitment changes of one successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDelta {
    entries: HashMap<Digest, Commitment>,
}
