/// Reasons a mining or rule-generation call can fail.
///
/// The first group rejects bad arguments before any work starts. The second group reports a
/// broken internal invariant; see [`MiningError::is_internal`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MiningError {
    /// The minimum support was not in `(0, 1]`.
    #[error("minimum support must be in (0, 1], got {0}")]
    InvalidMinimumSupport(f64),

    /// The minimum confidence was not in `(0, 1]`.
    #[error("minimum confidence must be in (0, 1], got {0}")]
    InvalidMinimumConfidence(f64),

    /// There were no transactions to mine.
    #[error("cannot mine an empty list of transactions")]
    NoTransactions,

    /// An association rule was requested with an empty side, or with an item on both sides.
    #[error("invalid association rule {0}")]
    InvalidRule(String),

    /// Two copies of the same itemset reached candidate generation.
    #[error("duplicate itemset {0} reached candidate generation")]
    DuplicateCandidate(String),

    /// A confidence was requested for a rule whose antecedent never occurs.
    #[error("antecedent {0} has zero support, so confidence is undefined")]
    ZeroSupportAntecedent(String),
}

impl MiningError {
    /// Returns `true` if this error means the miner's own bookkeeping went wrong, rather than
    /// that the caller passed a bad argument.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            MiningError::DuplicateCandidate(_) | MiningError::ZeroSupportAntecedent(_)
        )
    }
}
