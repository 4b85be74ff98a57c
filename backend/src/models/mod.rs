pub mod appointment;
pub mod barber;
pub mod overrides;
