// libs/schedule-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use shared_models::domain::AppointmentStatus;

use crate::models::ScheduleError;

/// Appointment status state machine. Same-status writes are not a no-op here;
/// they are rejected like any other illegal transition.
pub struct LifecycleService;

impl LifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), ScheduleError> {
        debug!("Validating status transition {} -> {}", current, next);

        if !self.valid_transitions(current).contains(&next) {
            warn!("Rejected status transition {} -> {}", current, next);
            return Err(ScheduleError::InvalidStatusTransition {
                from: current,
                to: next,
            });
        }

        Ok(())
    }

    pub fn valid_transitions(&self, current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Pending => {
                vec![AppointmentStatus::Confirmed, AppointmentStatus::Canceled]
            }
            AppointmentStatus::Confirmed => {
                vec![AppointmentStatus::Completed, AppointmentStatus::Canceled]
            }
            AppointmentStatus::Completed => vec![AppointmentStatus::Canceled],
            // Terminal: a canceled appointment stays canceled.
            AppointmentStatus::Canceled => vec![],
        }
    }
}

impl Default for LifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
