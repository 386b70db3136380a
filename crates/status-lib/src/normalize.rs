//! Reduction of raw engine state to a canonical status label

use crate::engine::{RawContainerState, HEALTHY, RUNNING};
use crate::models::CanonicalStatus;

/// Map one raw engine state to its canonical status.
///
/// A container that is not running is `exited` regardless of any stale
/// health information. A running container is `running` without a health
/// block, `healthy` when the check passes and `unhealthy` otherwise
/// (including `starting` and unknown values).
pub fn normalize(state: &RawContainerState) -> CanonicalStatus {
    if state.run_status != RUNNING {
        return CanonicalStatus::Exited;
    }

    match &state.health {
        None => CanonicalStatus::Running,
        Some(health) if health.status == HEALTHY => CanonicalStatus::Healthy,
        Some(_) => CanonicalStatus::Unhealthy,
    }
}
