//! Error types for rollup-engine

use rollup_core::{EstimateUseGroupId, FormulaError, LineItemId};
use rollup_store::StoreError;
use std::fmt;
use thiserror::Error;

/// What kind of record a dangling reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Product,
    UseGroup,
    ParentLineItem,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Product => write!(f, "product"),
            ReferenceKind::UseGroup => write!(f, "use group"),
            ReferenceKind::ParentLineItem => write!(f, "parent line item"),
        }
    }
}

fn join_ids(ids: &[LineItemId]) -> String {
    ids.iter()
        .map(LineItemId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Aggregation failures.
///
/// Any of these aborts the whole run for the estimate; no partial stats are
/// produced.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// R001: Quantity formulas (or child sums) depend on each other in a loop
    #[error("[R001] Cyclic quantity dependency: {}", join_ids(.cycle))]
    CyclicFormula { cycle: Vec<LineItemId> },

    /// R002: A quantity cannot be determined
    #[error("[R002] Cannot resolve quantity of line item '{line_item}': {reason}")]
    UnresolvedReference { line_item: LineItemId, reason: String },

    /// R003: Use-group percentages on one line item exceed 100
    #[error("[R003] Line item '{line_item}' allocates {total}% across use groups (over 100%)")]
    OverallocatedUseGroup { line_item: LineItemId, total: f64 },

    /// R004: A use-group percentage is negative or not a number
    #[error(
        "[R004] Line item '{line_item}' has invalid percentage {percentage} \
         for use group '{use_group}'"
    )]
    InvalidUseGroupPercentage {
        line_item: LineItemId,
        use_group: EstimateUseGroupId,
        percentage: f64,
    },

    /// R005: The formula collaborator failed
    #[error("[R005] Formula error in {entity}: {source}")]
    Formula {
        entity: String,
        #[source]
        source: FormulaError,
    },

    /// R006: A record points at something that does not exist
    #[error("[R006] {referrer} references missing {kind} '{id}'")]
    MissingReference {
        kind: ReferenceKind,
        id: String,
        referrer: String,
    },

    /// R007: Parent pointers form a loop
    #[error("[R007] Line item parents form a cycle: {}", join_ids(.cycle))]
    CyclicAssembly { cycle: Vec<LineItemId> },

    /// R008: Two line items share an id
    #[error("[R008] Duplicate line item id '{0}'")]
    DuplicateLineItem(LineItemId),

    /// R009: Stats were computed for a locked estimate and cannot be committed
    #[error("[R009] Estimate '{0}' is locked; computed stats cannot be written back")]
    LockedEstimateWriteRejected(String),

    /// R010: The estimate does not exist
    #[error("[R010] Estimate not found: {0}")]
    EstimateNotFound(String),

    /// R011: A preview branch is not a single subtree
    #[error("[R011] Invalid preview branch: {0}")]
    InvalidBranch(String),

    /// R012: Record store failure
    #[error("[R012] {0}")]
    Store(StoreError),

    /// R013: A use group id is the name of the unassigned bucket
    #[error("[R013] Use group id '{0}' is reserved for the unassigned bucket")]
    ReservedUseGroupId(EstimateUseGroupId),
}

impl AggregationError {
    /// The stable code shown in brackets in the message
    pub fn code(&self) -> &'static str {
        match self {
            AggregationError::CyclicFormula { .. } => "R001",
            AggregationError::UnresolvedReference { .. } => "R002",
            AggregationError::OverallocatedUseGroup { .. } => "R003",
            AggregationError::InvalidUseGroupPercentage { .. } => "R004",
            AggregationError::Formula { .. } => "R005",
            AggregationError::MissingReference { .. } => "R006",
            AggregationError::CyclicAssembly { .. } => "R007",
            AggregationError::DuplicateLineItem(_) => "R008",
            AggregationError::LockedEstimateWriteRejected(_) => "R009",
            AggregationError::EstimateNotFound(_) => "R010",
            AggregationError::InvalidBranch(_) => "R011",
            AggregationError::Store(_) => "R012",
            AggregationError::ReservedUseGroupId(_) => "R013",
        }
    }
}

impl From<StoreError> for AggregationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EstimateNotFound(id) => AggregationError::EstimateNotFound(id),
            other => AggregationError::Store(other),
        }
    }
}

/// Result type alias for AggregationError
pub type AggregationResult<T> = Result<T, AggregationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_matches_message_prefix() {
        let errors = [
            AggregationError::CyclicFormula {
                cycle: vec![LineItemId::new("a"), LineItemId::new("b")],
            },
            AggregationError::DuplicateLineItem(LineItemId::new("a")),
            AggregationError::InvalidBranch("empty".to_string()),
            AggregationError::from(StoreError::Internal("down".to_string())),
            AggregationError::ReservedUseGroupId(EstimateUseGroupId::new("unassigned")),
            AggregationError::InvalidUseGroupPercentage {
                line_item: LineItemId::new("a"),
                use_group: EstimateUseGroupId::new("g"),
                percentage: -1.0,
            },
        ];
        for err in errors {
            assert!(
                err.to_string().starts_with(&format!("[{}]", err.code())),
                "{err}"
            );
        }
    }

    #[test]
    fn test_cycle_message_lists_ids() {
        let err = AggregationError::CyclicFormula {
            cycle: vec![LineItemId::new("a"), LineItemId::new("b")],
        };
        assert_eq!(err.to_string(), "[R001] Cyclic quantity dependency: a -> b");
    }

    #[test]
    fn test_store_not_found_maps_to_estimate_not_found() {
        let err = AggregationError::from(StoreError::EstimateNotFound("est-1".to_string()));
        assert!(matches!(err, AggregationError::EstimateNotFound(id) if id == "est-1"));
    }
}
