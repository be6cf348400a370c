//! Saga coordinator for room bookings.

use std::time::{Duration, Instant};

use common::{IdempotencyKey, RequesterId};

use crate::attempt::{BookingAttempt, BookingStatus, CreateBooking};
use crate::error::{RemoteCallError, Result, SagaError};
use crate::policy::CallPolicy;
use crate::services::ResourceOwnerClient;
use crate::steps::{SAGA_TYPE, STEP_CONFIRM, STEP_HOLD, STEP_RELEASE};
use crate::store::{BookingStore, InsertOutcome};

/// How often a duplicate request re-reads an in-flight attempt.
const PENDING_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Tries per `finish`; the pause before retry `n` is `n * FINISH_BACKOFF`.
const FINISH_ATTEMPTS: u32 = 3;
const FINISH_BACKOFF: Duration = Duration::from_millis(50);

/// Orchestrates room booking sagas.
///
/// The coordinator drives a 2-step saga (hold → confirm) against the
/// resource owner, with a best-effort release as the compensating step.
/// Each saga ends in exactly one terminal status; remote failures never
/// surface as errors.
///
/// A request whose key is already `Pending` waits up to `pending_wait` for
/// the running saga to finish. Past that the attempt is treated as
/// abandoned and the saga is driven again under the same key and
/// correlation id; hold and confirm are idempotent on the resource owner,
/// so a resumed saga lands on whatever the first run left behind.
pub struct BookingSaga<B, R>
where
    B: BookingStore,
    R: ResourceOwnerClient,
{
    store: B,
    resource_owner: R,
    pending_wait: Duration,
}

impl<B, R> BookingSaga<B, R>
where
    B: BookingStore,
    R: ResourceOwnerClient,
{
    pub fn new(store: B, resource_owner: R) -> Self {
        Self {
            store,
            resource_owner,
            pending_wait: CallPolicy::default().saga_budget(),
        }
    }

    /// Sets how long a duplicate request waits on a `Pending` attempt
    /// before resuming it. Should cover the client's `CallPolicy::saga_budget`.
    pub fn with_pending_wait(mut self, pending_wait: Duration) -> Self {
        self.pending_wait = pending_wait;
        self
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn resource_owner(&self) -> &R {
        &self.resource_owner
    }

    /// Books one resource for the command's dates.
    ///
    /// A repeated idempotency key makes no remote calls once its attempt is
    /// terminal and returns it unchanged. Otherwise a `Pending` attempt is
    /// persisted, the resource is held and confirmed, and the attempt is
    /// finished as `Confirmed`. Any failure of either step releases the
    /// hold and finishes the attempt as `Cancelled`.
    ///
    /// Only booking-store failures are returned as errors. If the final
    /// write keeps failing the attempt stays `Pending` and the next request
    /// with the same key resumes it.
    #[tracing::instrument(
        skip(self, cmd),
        fields(
            saga_type = SAGA_TYPE,
            request_id = %cmd.request_id,
            resource_id = %cmd.resource_id
        )
    )]
    pub async fn create_booking(&self, cmd: CreateBooking) -> Result<BookingAttempt> {
        if let Some(existing) = self.store.find_by_key(&cmd.request_id).await? {
            return self.replay(existing).await;
        }

        let attempt = match self.store.insert_if_absent(BookingAttempt::pending(cmd)).await? {
            InsertOutcome::Inserted(attempt) => attempt,
            // A concurrent duplicate owns the saga.
            InsertOutcome::Existing(existing) => return self.replay(existing).await,
        };

        metrics::counter!("booking_saga_started_total").increment(1);
        self.run(attempt).await
    }

    /// Loads a booking attempt by idempotency key.
    pub async fn get_booking(&self, key: &IdempotencyKey) -> Result<Option<BookingAttempt>> {
        Ok(self.store.find_by_key(key).await?)
    }

    /// All booking attempts of one requester, newest first.
    pub async fn bookings_for(&self, requester_id: RequesterId) -> Result<Vec<BookingAttempt>> {
        Ok(self.store.find_by_requester(requester_id).await?)
    }

    /// Drives a persisted `Pending` attempt to its terminal status.
    async fn run(&self, attempt: BookingAttempt) -> Result<BookingAttempt> {
        let saga_start = Instant::now();
        tracing::info!(
            correlation_id = %attempt.correlation_id,
            requester_id = %attempt.requester_id,
            period = %attempt.period,
            "booking saga started"
        );

        let status = match self.reserve(&attempt).await {
            Ok(()) => BookingStatus::Confirmed,
            Err((step, err)) => {
                tracing::warn!(
                    correlation_id = %attempt.correlation_id,
                    step,
                    error = %err,
                    "saga step failed; compensating"
                );
                self.compensate(&attempt).await;
                BookingStatus::Cancelled
            }
        };

        let finished = self.finish(&attempt.request_id, status).await?;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("booking_saga_duration_seconds").record(duration);
        match finished.status {
            BookingStatus::Confirmed => {
                metrics::counter!("booking_saga_confirmed_total").increment(1);
                tracing::info!(booking_id = %finished.id, duration, "booking confirmed");
            }
            BookingStatus::Cancelled => {
                metrics::counter!("booking_saga_cancelled_total").increment(1);
                tracing::warn!(booking_id = %finished.id, duration, "booking cancelled");
            }
            BookingStatus::Pending => {}
        }

        Ok(finished)
    }

    /// Answers a repeated key. A terminal attempt is returned as stored; a
    /// pending one is awaited and, once `pending_wait` runs out, resumed.
    async fn replay(&self, existing: BookingAttempt) -> Result<BookingAttempt> {
        metrics::counter!("booking_saga_replayed_total").increment(1);
        if existing.status.is_terminal() {
            tracing::debug!(booking_id = %existing.id, status = %existing.status, "booking replayed");
            return Ok(existing);
        }

        tracing::debug!(booking_id = %existing.id, "waiting on in-flight booking");
        match tokio::time::timeout(self.pending_wait, self.await_terminal(&existing.request_id))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                metrics::counter!("booking_saga_resumed_total").increment(1);
                tracing::warn!(
                    booking_id = %existing.id,
                    correlation_id = %existing.correlation_id,
                    waited = ?self.pending_wait,
                    "booking still pending; resuming saga"
                );
                self.run(existing).await
            }
        }
    }

    async fn await_terminal(&self, key: &IdempotencyKey) -> Result<BookingAttempt> {
        loop {
            tokio::time::sleep(PENDING_POLL_INTERVAL).await;
            let current = self
                .store
                .find_by_key(key)
                .await?
                .ok_or_else(|| SagaError::AttemptMissing(key.clone()))?;
            if current.status.is_terminal() {
                return Ok(current);
            }
        }
    }

    /// Writes the terminal status, retrying transient store failures.
    async fn finish(&self, key: &IdempotencyKey, status: BookingStatus) -> Result<BookingAttempt> {
        let mut attempt = 1;
        loop {
            match self.store.finish(key, status).await {
                Ok(Some(finished)) => return Ok(finished),
                Ok(None) => return Err(SagaError::AttemptMissing(key.clone())),
                Err(e) if attempt < FINISH_ATTEMPTS => {
                    tracing::warn!(attempt, %status, error = %e, "finishing booking failed; retrying");
                    tokio::time::sleep(FINISH_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        attempts = attempt,
                        %status,
                        error = %e,
                        "finishing booking failed; attempt left pending"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    /// Step 1 then step 2. Returns the failing step on error.
    async fn reserve(
        &self,
        attempt: &BookingAttempt,
    ) -> std::result::Result<(), (&'static str, RemoteCallError)> {
        tracing::debug!(step = STEP_HOLD, "saga step started");
        let lock = self
            .resource_owner
            .hold(
                attempt.resource_id,
                &attempt.request_id,
                attempt.period,
                &attempt.correlation_id,
            )
            .await
            .map_err(|e| (STEP_HOLD, e))?;
        tracing::debug!(lock_id = %lock.id, "resource held");

        tracing::debug!(step = STEP_CONFIRM, "saga step started");
        self.resource_owner
            .confirm(
                attempt.resource_id,
                &attempt.request_id,
                &attempt.correlation_id,
            )
            .await
            .map_err(|e| (STEP_CONFIRM, e))?;

        Ok(())
    }

    /// Sends the compensating release. Its outcome never changes the
    /// booking's fate, so failures are only logged.
    async fn compensate(&self, attempt: &BookingAttempt) {
        let result = self
            .resource_owner
            .release(
                attempt.resource_id,
                &attempt.request_id,
                &attempt.correlation_id,
            )
            .await;

        match result {
            Ok(lock) => tracing::info!(
                step = STEP_RELEASE,
                lock_status = %lock.status,
                "compensation completed"
            ),
            Err(e) => tracing::warn!(
                step = STEP_RELEASE,
                correlation_id = %attempt.correlation_id,
                error = %e,
                "compensation failed; ignoring"
            ),
        }
    }
}
