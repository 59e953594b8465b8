pub mod bookings;
pub mod payments;
pub mod seat_locks;
pub mod vouchers;
