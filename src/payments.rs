//! Proof-of-payment uploads and their verification.

use crate::db::payments::{self as store, PaymentOverview};
use crate::db::submissions;
use crate::db::{Payment, User};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::state::AppState;
use crate::storage::{self, Upload};

const PROOF_DIR: &str = "payments/proofs";

/// Stores a proof for a submission the user owns. A second upload replaces
/// the proof file and resets verification.
pub async fn upload_proof(
    state: &AppState,
    user: &User,
    submission_id: i64,
    amount: Option<f64>,
    proof: Option<Upload>,
) -> AppResult<Payment> {
    let mut errors = ValidationErrors::new();
    match amount {
        None => errors.add("amount", "The amount field is required."),
        Some(amount) if !amount.is_finite() || amount < 0.0 => {
            errors.add("amount", "The amount must be at least 0.")
        }
        Some(_) => {}
    }
    match &proof {
        None => errors.add("payment_proof", "The payment proof field is required."),
        Some(upload) => {
            if let Err(upload_errors) = storage::validate_upload(upload, &storage::PAYMENT_PROOF) {
                for (field, messages) in upload_errors.fields() {
                    for message in messages {
                        errors.add(field, message.clone());
                    }
                }
            }
        }
    }
    if submissions::get_owned_submission(&state.pool, submission_id, user.id)
        .await?
        .is_none()
    {
        errors.add("submission_id", "The selected submission id is invalid.");
    }
    errors.into_result()?;

    let (Some(amount), Some(proof)) = (amount, proof) else {
        return Err(AppError::Internal("validated payment input missing".to_string()));
    };

    let root = &state.config.storage_folder;
    let previous = store::payment_for_submission(&state.pool, submission_id).await?;
    let relative = storage::store_upload(root, PROOF_DIR, &proof, &storage::PAYMENT_PROOF).await?;

    let payment = match store::upsert_payment(&state.pool, user.id, submission_id, amount, &relative).await {
        Ok(payment) => payment,
        Err(err) => {
            storage::discard(root, &relative).await;
            return Err(err.into());
        }
    };
    if let Some(previous) = previous {
        storage::discard(root, &previous.payment_proof_url).await;
    }

    tracing::info!(
        payment_id = payment.id,
        submission_id,
        user_id = user.id,
        "payment proof uploaded"
    );
    Ok(payment)
}

pub async fn list_own(state: &AppState, user: &User) -> AppResult<Vec<Payment>> {
    Ok(store::payments_for_user(&state.pool, user.id).await?)
}

/// Deletes one of the user's payments together with its proof file.
pub async fn delete_own(state: &AppState, user: &User, payment_id: i64) -> AppResult<()> {
    let payment = store::get_payment(&state.pool, payment_id)
        .await?
        .filter(|payment| payment.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("payment".to_string()))?;

    store::delete_payment(&state.pool, payment.id).await?;
    storage::discard(&state.config.storage_folder, &payment.payment_proof_url).await;
    tracing::info!(payment_id, user_id = user.id, "payment deleted by owner");
    Ok(())
}

pub async fn list_all(state: &AppState) -> AppResult<Vec<PaymentOverview>> {
    Ok(store::list_payments(&state.pool).await?)
}

/// Admin verification. Verifying stamps `verified_at`; rejecting clears it.
pub async fn set_verified(state: &AppState, payment_id: i64, verified: bool) -> AppResult<Payment> {
    if !store::set_verified(&state.pool, payment_id, verified).await? {
        return Err(AppError::NotFound("payment".to_string()));
    }
    let payment = store::get_payment(&state.pool, payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("payment".to_string()))?;
    tracing::info!(payment_id, verified, "payment verification updated");
    Ok(payment)
}
