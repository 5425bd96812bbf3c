// libs/schedule-cell/src/services/layout.rs
use chrono::Timelike;

use shared_models::domain::Appointment;

use crate::models::PlacedAppointment;

/// Earliest hour the time grid displays.
pub const GRID_START_HOUR: u32 = 5;
/// Hour rows rendered, 05:00 through 23:00.
pub const GRID_HOUR_ROWS: u32 = 19;
/// Pixel height of one hour row.
pub const PX_PER_HOUR: f64 = 64.0;
/// Shortest card still tall enough to click.
pub const MIN_BLOCK_PX: f64 = 40.0;

const PX_PER_MINUTE: f64 = PX_PER_HOUR / 60.0;

/// Vertical offset of an instant from the top of the grid, clamped so
/// pre-grid starts pin to the first row instead of going negative.
pub fn offset_px(minutes_into_day: f64) -> f64 {
    ((minutes_into_day - (GRID_START_HOUR * 60) as f64) * PX_PER_MINUTE).max(0.0)
}

pub fn height_px(duration_minutes: f64) -> f64 {
    (duration_minutes * PX_PER_MINUTE).max(MIN_BLOCK_PX)
}

pub fn grid_height_px() -> f64 {
    GRID_HOUR_ROWS as f64 * PX_PER_HOUR
}

/// Place an appointment on the grid.
pub fn place(appointment: Appointment) -> PlacedAppointment {
    let start_minutes = (appointment.start.hour() * 60 + appointment.start.minute()) as f64;
    let duration = appointment.duration_minutes() as f64;

    PlacedAppointment {
        offset_px: offset_px(start_minutes),
        height_px: height_px(duration),
        appointment,
    }
}
