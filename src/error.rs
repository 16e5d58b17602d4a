//! Radio Error Taxonomy
//!
//! Every radio operation returns its failure as a value. Validation errors
//! are raised before any stack call is issued.

use crate::ble::payload::PayloadError;
use crate::ble::stack::StackStatus;

/// Radio operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Caller-supplied value outside its contractual range
    InvalidParameter,
    /// Valid request rejected by the underlying stack
    Unsupported,
    /// `initialize` called on a session that is already up
    AlreadyInitialized,
    /// Operation attempted before `initialize` completed
    NotInitialized,
    /// Encoded frame exceeds the advertising payload budget
    PayloadTooLarge,
    /// A stack call failed for a reason opaque to this crate
    StackFault(StackStatus),
}

impl From<PayloadError> for RadioError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Oversize { .. } => RadioError::PayloadTooLarge,
        }
    }
}

impl From<StackStatus> for RadioError {
    fn from(status: StackStatus) -> Self {
        RadioError::StackFault(status)
    }
}
