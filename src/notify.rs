use async_trait::async_trait;

use crate::models::Booking;

/// Outbound booking-confirmation hook. Called after the booking transaction
/// has committed; failures are logged by the caller, never raised.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking, recipient: Option<&str>)
        -> anyhow::Result<()>;
}

/// Default collaborator: records the event in the application log. The real
/// email/push sender lives in another service.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(
        &self,
        booking: &Booking,
        recipient: Option<&str>,
    ) -> anyhow::Result<()> {
        tracing::info!(
            booking_code = %booking.booking_code,
            recipient = recipient.unwrap_or("-"),
            seats = %booking.seats_display,
            "booking confirmed notification"
        );
        Ok(())
    }
}
