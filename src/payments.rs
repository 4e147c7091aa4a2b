//! Payment flow glue: initialize checkout, remember the pending
//! reference across restarts, and verify it later.
//!
//! The provider-hosted checkout happens outside this process, so the
//! reference cached in the local store is the only thread connecting a
//! started payment to its eventual verification.

use crate::api::types::{PayRequest, PaymentAuthorization, PaymentStatus, PaymentVerification};
use crate::api::ApiClient;
use crate::error::ClientError;
use crate::store::Store;

/// Ask the backend for a checkout session and cache its reference. The
/// embedder sends the user to `authorization_url`; verification happens
/// when they come back.
pub async fn begin_payment(
    client: &ApiClient,
    store: &Store,
    token: &str,
    request: &PayRequest,
) -> Result<PaymentAuthorization, ClientError> {
    let authorization = client.initialize_payment(token, request).await?;
    store.set_pending_payment(&authorization.reference)?;
    tracing::info!(reference = %authorization.reference, "payment initialized");
    Ok(authorization)
}

/// Verify the cached pending payment, if any. Terminal outcomes clear
/// the cache; a still-pending payment keeps its reference for the next
/// check. Returns `None` when nothing was pending.
pub async fn resolve_pending(
    client: &ApiClient,
    store: &Store,
    token: &str,
) -> Result<Option<PaymentVerification>, ClientError> {
    let Some(reference) = store.pending_payment()? else {
        return Ok(None);
    };

    let verification = client.verify_payment(token, &reference).await?;
    match verification.status {
        PaymentStatus::Success | PaymentStatus::Failed => {
            store.clear_pending_payment()?;
            tracing::info!(reference = %reference, status = ?verification.status, "payment settled");
        }
        PaymentStatus::Pending => {
            tracing::debug!(reference = %reference, "payment still pending");
        }
    }
    Ok(Some(verification))
}
