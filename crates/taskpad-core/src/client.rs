use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{ApiError, AuthScope};
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

/// A request under construction.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    method: Method,
    path: String,
    bearer: Option<String>,
    body: Option<String>,
    scope: AuthScope,
}

impl Call {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            bearer: None,
            body: None,
            scope: AuthScope::Bearer,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub(crate) fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// No token means no `Authorization` header; the server decides.
    pub(crate) fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_string);
        self
    }

    pub(crate) fn credentials(mut self) -> Self {
        self.scope = AuthScope::Credentials;
        self
    }

    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let encoded = serde_json::to_string(body)
            .map_err(|err| ApiError::Decode(format!("failed encoding request body: {err}")))?;
        self.body = Some(encoded);
        Ok(self)
    }
}

/// Shared entry point to the API; owns the transport.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[instrument(skip(self, call), fields(method = %call.method, path = %call.path))]
    async fn execute(&self, call: Call) -> Result<ApiResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let scope = call.scope;
        debug!(%request_id, authenticated = call.bearer.is_some(), "sending request");

        let response = self
            .transport
            .send(ApiRequest {
                method: call.method,
                path: call.path,
                bearer: call.bearer,
                body: call.body,
                request_id,
            })
            .await?;

        if response.is_success() {
            return Ok(response);
        }

        let err = ApiError::from_status(response.status, &response.body, scope);
        warn!(%request_id, status = response.status, error = %err, "request rejected");
        Err(err)
    }

    pub(crate) async fn fetch<R: DeserializeOwned>(&self, call: Call) -> Result<R, ApiError> {
        let response = self.execute(call).await?;
        serde_json::from_str(&response.body).map_err(|err| {
            ApiError::Decode(format!("failed decoding response (status {}): {err}", response.status))
        })
    }

    /// For calls whose response body is ignored.
    pub(crate) async fn execute_discarding(&self, call: Call) -> Result<(), ApiError> {
        self.execute(call).await.map(|_| ())
    }
}
