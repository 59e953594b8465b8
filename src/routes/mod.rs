use axum::Router;

use crate::state::AppState;

pub mod bookings;
pub mod doc;
pub mod health;
pub mod payments;
pub mod seat_locks;
pub mod trips;
pub mod vouchers;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/bookings", bookings::router())
        .nest("/trips", trips::router())
        .nest("/seat-locks", seat_locks::router())
        .nest("/vouchers", vouchers::router())
        .nest("/payments", payments::router())
        .nest("/invoices", payments::invoice_router())
}
