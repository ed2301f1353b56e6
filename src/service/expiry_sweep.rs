use crate::domain::booking::{BookingStatus, StatusChange};
use crate::repo::booking_store::BookingStore;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Moves PENDING bookings created before `cutoff` to EXPIRED. Bookings paid
/// between the scan and the write are left alone by the conditional update.
pub async fn expire_pending(
    store: &dyn BookingStore,
    cutoff: DateTime<Utc>,
    batch_size: i64,
) -> Result<u64> {
    let stale = store.list_pending_created_before(cutoff, batch_size).await?;
    let mut expired = 0;
    for booking in stale {
        let changed = store
            .conditional_update_status(
                &booking.checkout_session_id,
                BookingStatus::Pending,
                StatusChange::expired(),
            )
            .await?;
        if changed {
            expired += 1;
            tracing::info!(
                checkout_session_id = %booking.checkout_session_id,
                created_at = %booking.created_at,
                "pending booking expired"
            );
        }
    }
    Ok(expired)
}
