//! Branch identifiers and entity selection.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a branch.
///
/// `0` is reserved for the aggregate "all branches" pseudo-branch; real branches
/// are positive integers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(i32);

impl BranchId {
    /// The "all branches" pseudo-branch.
    pub const AGGREGATE: BranchId = BranchId(0);

    /// Identifier of a real branch. Rejects zero and negative values.
    pub fn new(value: i32) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::invalid_id(format!(
                "BranchId: branch identifiers must be positive, got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Wrap a raw store value without validation (0 maps to the aggregate).
    pub fn from_raw(value: i32) -> Self {
        Self(value)
    }

    pub fn get(&self) -> i32 {
        self.0
    }

    pub fn is_aggregate(&self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for BranchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<BranchId> for i32 {
    fn from(value: BranchId) -> Self {
        value.0
    }
}

impl FromStr for BranchId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = i32::from_str(s.trim())
            .map_err(|e| DomainError::invalid_id(format!("BranchId: {e}")))?;
        if raw < 0 {
            return Err(DomainError::invalid_id(format!(
                "BranchId: negative identifier {raw}"
            )));
        }
        Ok(Self(raw))
    }
}

/// Which sale facts a series is built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "branch_id")]
pub enum EntitySelector {
    /// Every branch summed together.
    AllBranches,
    /// A single branch.
    Branch(BranchId),
}

impl EntitySelector {
    /// The branch identifier forecast rows for this selector are stamped with.
    pub fn branch_id(&self) -> BranchId {
        match self {
            EntitySelector::AllBranches => BranchId::AGGREGATE,
            EntitySelector::Branch(id) => *id,
        }
    }

    /// Filter value for store queries (`None` = no filter).
    pub fn branch_filter(&self) -> Option<BranchId> {
        match self {
            EntitySelector::AllBranches => None,
            EntitySelector::Branch(id) => Some(*id),
        }
    }

    pub fn matches(&self, branch_id: BranchId) -> bool {
        match self {
            EntitySelector::AllBranches => true,
            EntitySelector::Branch(id) => *id == branch_id,
        }
    }
}

impl From<BranchId> for EntitySelector {
    fn from(value: BranchId) -> Self {
        if value.is_aggregate() {
            EntitySelector::AllBranches
        } else {
            EntitySelector::Branch(value)
        }
    }
}

impl From<Option<BranchId>> for EntitySelector {
    fn from(value: Option<BranchId>) -> Self {
        value.map(EntitySelector::from).unwrap_or(EntitySelector::AllBranches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_the_aggregate_selector() {
        assert_eq!(EntitySelector::from(BranchId::from_raw(0)), EntitySelector::AllBranches);
        assert_eq!(EntitySelector::AllBranches.branch_id(), BranchId::AGGREGATE);
        assert!(EntitySelector::AllBranches.branch_filter().is_none());
    }

    #[test]
    fn missing_selector_means_all_branches() {
        assert_eq!(EntitySelector::from(None), EntitySelector::AllBranches);
    }

    #[test]
    fn branch_selector_round_trips_id() {
        let id = BranchId::new(3).unwrap();
        let sel = EntitySelector::from(id);
        assert_eq!(sel, EntitySelector::Branch(id));
        assert_eq!(sel.branch_id(), id);
        assert!(sel.matches(id));
        assert!(!sel.matches(BranchId::new(4).unwrap()));
    }

    #[test]
    fn new_rejects_non_positive() {
        assert!(matches!(BranchId::new(0), Err(DomainError::InvalidId(_))));
        assert!(matches!(BranchId::new(-2), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn parse_accepts_zero_and_rejects_garbage() {
        assert_eq!("0".parse::<BranchId>().unwrap(), BranchId::AGGREGATE);
        assert_eq!(" 12 ".parse::<BranchId>().unwrap().get(), 12);
        assert!("1; DROP TABLE sales".parse::<BranchId>().is_err());
        assert!("-1".parse::<BranchId>().is_err());
    }
}
