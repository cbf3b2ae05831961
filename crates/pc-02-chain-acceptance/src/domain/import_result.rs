//! Outcome of connecting a block

/// Result of [`crate::ChainAcceptance::try_connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportResult {
    /// Connected and now the best block.
    ImportedBest,
    /// Connected on a side branch.
    ImportedNotBest,
    /// Parent unknown; the caller should request ancestors.
    NoParent,
    /// Rejected by validation.
    InvalidBlock,
    /// Already known.
    AlreadyExists,
}

impl ImportResult {
    /// Whether the block was stored.
    pub fn is_imported(&self) -> bool {
        matches!(self, ImportResult::ImportedBest | ImportResult::ImportedNotBest)
    }
}
