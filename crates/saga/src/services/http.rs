//! HTTP client for the resource owner service.

use async_trait::async_trait;
use common::{CORRELATION_ID_HEADER, CorrelationId, DateRange, IdempotencyKey, ResourceId};
use lock_store::ReservationLock;
use reqwest::Client;
use serde::Serialize;

use super::resource_owner::ResourceOwnerClient;
use crate::error::RemoteCallError;
use crate::policy::{CallPolicy, call_with_policy};
use crate::steps::{STEP_CONFIRM, STEP_HOLD, STEP_RELEASE};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HoldBody<'a> {
    request_id: &'a IdempotencyKey,
    #[serde(flatten)]
    period: DateRange,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyBody<'a> {
    request_id: &'a IdempotencyKey,
}

/// Calls the resource owner over HTTP under a [`CallPolicy`].
///
/// Transport failures and timeouts are retried; any HTTP status outside
/// 2xx is a final [`RemoteCallError::Rejected`].
#[derive(Debug, Clone)]
pub struct HttpResourceOwnerClient {
    client: Client,
    base_url: String,
    policy: CallPolicy,
}

impl HttpResourceOwnerClient {
    pub fn new(base_url: impl Into<String>, policy: CallPolicy) -> Result<Self, RemoteCallError> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
        })
    }

    fn url(&self, resource_id: ResourceId, step: &str) -> String {
        format!("{}/resources/{}/{}", self.base_url, resource_id, step)
    }

    async fn post<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        let response = self
            .client
            .post(url)
            .header(CORRELATION_ID_HEADER, correlation_id.as_str())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteCallError::Timeout(self.policy.timeout)
                } else {
                    RemoteCallError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteCallError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ReservationLock>()
            .await
            .map_err(|e| RemoteCallError::InvalidResponse(e.to_string()))
    }

    async fn call<B: Serialize + Sync>(
        &self,
        step: &'static str,
        resource_id: ResourceId,
        body: &B,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        let url = self.url(resource_id, step);
        let url = url.as_str();
        call_with_policy(&self.policy, step, move || self.post(url, body, correlation_id)).await
    }
}

#[async_trait]
impl ResourceOwnerClient for HttpResourceOwnerClient {
    async fn hold(
        &self,
        resource_id: ResourceId,
        key: &IdempotencyKey,
        period: DateRange,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        let body = HoldBody {
            request_id: key,
            period,
        };
        self.call(STEP_HOLD, resource_id, &body, correlation_id).await
    }

    async fn confirm(
        &self,
        resource_id: ResourceId,
        key: &IdempotencyKey,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        let body = KeyBody { request_id: key };
        self.call(STEP_CONFIRM, resource_id, &body, correlation_id).await
    }

    async fn release(
        &self,
        resource_id: ResourceId,
        key: &IdempotencyKey,
        correlation_id: &CorrelationId,
    ) -> Result<ReservationLock, RemoteCallError> {
        let body = KeyBody { request_id: key };
        self.call(STEP_RELEASE, resource_id, &body, correlation_id).await
    }
}
