//! Reconcile pass states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a reconcile pass ended up.
///
/// A pass starts `Unconnected` and becomes `Connected` once a transport is
/// built. Observing moves it to one of the three observed states, and from
/// there at most one mutating call moves it to `Creating`, `Updating` or
/// `Deleting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconcileState {
    /// No transport was established.
    Unconnected,
    /// A transport was established but no observation completed.
    Connected,
    /// The remote resource does not exist.
    ObservedAbsent,
    /// The remote resource exists and has drifted.
    ObservedPresentStale,
    /// The remote resource exists and matches the declaration.
    ObservedPresentCurrent,
    /// A create call was issued.
    Creating,
    /// An update call was issued.
    Updating,
    /// A delete call was issued.
    Deleting,
}

impl ReconcileState {
    /// State reached by observing.
    pub fn observed(resource_exists: bool, resource_up_to_date: bool) -> Self {
        match (resource_exists, resource_up_to_date) {
            (false, _) => ReconcileState::ObservedAbsent,
            (true, false) => ReconcileState::ObservedPresentStale,
            (true, true) => ReconcileState::ObservedPresentCurrent,
        }
    }

    /// Returns true if the pass issued a mutating call.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            ReconcileState::Creating | ReconcileState::Updating | ReconcileState::Deleting
        )
    }

    /// Returns true if an observation completed.
    pub fn is_observed(&self) -> bool {
        !matches!(self, ReconcileState::Unconnected | ReconcileState::Connected)
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Unconnected => "unconnected",
            ReconcileState::Connected => "connected",
            ReconcileState::ObservedAbsent => "observed_absent",
            ReconcileState::ObservedPresentStale => "observed_present_stale",
            ReconcileState::ObservedPresentCurrent => "observed_present_current",
            ReconcileState::Creating => "creating",
            ReconcileState::Updating => "updating",
            ReconcileState::Deleting => "deleting",
        }
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
