pub mod booking_items;
pub mod bookings;
pub mod invoices;
pub mod payment_logs;
pub mod payments;
pub mod seat_locks;
pub mod seats;
pub mod trips;
pub mod vnpay_transactions;
pub mod voucher_usages;
pub mod vouchers;

pub use booking_items::Entity as BookingItems;
pub use bookings::Entity as Bookings;
pub use invoices::Entity as Invoices;
pub use payment_logs::Entity as PaymentLogs;
pub use payments::Entity as Payments;
pub use seat_locks::Entity as SeatLocks;
pub use seats::Entity as Seats;
pub use trips::Entity as Trips;
pub use vnpay_transactions::Entity as VnpayTransactions;
pub use voucher_usages::Entity as VoucherUsages;
pub use vouchers::Entity as Vouchers;
