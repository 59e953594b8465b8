pub mod booking_service;
pub mod payment_service;
pub mod seat_lock_service;
pub mod vnpay_service;
pub mod voucher_service;
