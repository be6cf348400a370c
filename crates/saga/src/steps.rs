//! Room booking saga constants.

/// The saga type identifier for room bookings.
pub const SAGA_TYPE: &str = "RoomBooking";

/// Step name: provisionally hold the resource.
pub const STEP_HOLD: &str = "hold";

/// Step name: confirm the hold.
pub const STEP_CONFIRM: &str = "confirm";

/// Compensation step name: give the hold back.
pub const STEP_RELEASE: &str = "release";
