//! HttpLocalApi - デスクトップ常駐サービスへの reqwest クライアント
//!
//! # エンドポイント
//! - `GET    {base}/files`
//! - `DELETE {base}/files/{id}`
//! - `GET    {base}/files/download/{id}`
//! - `POST   {base}/auth/login`

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::http::{classify, join_segments, status_message};
use crate::credentials::CredentialStore;
use crate::domain::reply::{Envelope, Payload};
use crate::domain::{BackendError, BackendKind, FileId, FileRecord, Reply};
use crate::ports::LocalFileApi;

pub const IDENTITY_HEADER: &str = "X-User-Email";
pub const SECRET_HEADER: &str = "X-User-Password";

const BACKEND: BackendKind = BackendKind::LocalApi;

/// reqwest implementation of [`LocalFileApi`].
///
/// No timeout is set: a hung service surfaces whenever the transport gives up.
#[derive(Debug, Clone)]
pub struct HttpLocalApi {
    client: Client,
    base_url: Url,
    credentials: CredentialStore,
}

impl HttpLocalApi {
    pub fn new(base_url: Url, credentials: CredentialStore) -> Self {
        Self::with_client(Client::new(), base_url, credentials)
    }

    pub fn with_client(client: Client, base_url: Url, credentials: CredentialStore) -> Self {
        Self {
            client,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        join_segments(BACKEND, &self.base_url, segments)
    }

    /// Builds a request carrying the credential as it is right now.
    fn authenticated(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.credentials.snapshot() {
            Some(credential) => {
                debug!(identity = credential.identity(), "attaching credential headers");
                builder
                    .header(IDENTITY_HEADER, credential.identity())
                    .header(SECRET_HEADER, credential.secret())
            }
            None => {
                warn!("no credentials configured; sending request without credential headers");
                builder
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        request.send().await.map_err(|e| {
            let err = classify(BACKEND, e);
            warn!(error = %err, "local API request failed");
            err
        })
    }
}

/// Error text the service sends for a route it does not serve.
const UNKNOWN_ENDPOINT: &str = "Endpoint no encontrado";

/// Classifies a non-success response.
///
/// A 404 is `NotFound` only when `missing` is set and the body is the
/// service's own `{success: false, error}` envelope for a missing file. A 404
/// for an unknown route (wrong base path, another service on the port) stays a
/// logic failure so the caller can fall back.
fn failure(status: StatusCode, body: &[u8], missing: Option<&FileId>) -> BackendError {
    let server_message = serde_json::from_slice::<Envelope>(body)
        .ok()
        .filter(|e| !e.success)
        .map(|e| e.error.unwrap_or_default());

    if let (Some(id), Some(message)) = (missing, server_message.as_deref()) {
        if status == StatusCode::NOT_FOUND && message.trim() != UNKNOWN_ENDPOINT {
            return BackendError::not_found(BACKEND, id);
        }
    }
    BackendError::logic(
        BACKEND,
        Some(status.as_u16()),
        status_message(status, server_message),
    )
}

/// Reads a JSON reply and extracts its payload.
///
/// Non-success statuses and `success: false` both come back as
/// `BackendError::Logic`, except for a confirmed missing file (see [`failure`]).
async fn read_reply<T: DeserializeOwned>(
    response: Response,
    payload: Payload<'_>,
    missing: Option<&FileId>,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.bytes().await.map_err(|e| classify(BACKEND, e))?;
    if !status.is_success() {
        return Err(failure(status, &body, missing));
    }

    let envelope = serde_json::from_slice::<Envelope>(&body).map_err(|e| {
        BackendError::logic(BACKEND, Some(status.as_u16()), format!("malformed response: {e}"))
    })?;
    match envelope
        .into_reply(payload)
        .map_err(|message| BackendError::logic(BACKEND, Some(status.as_u16()), message))?
    {
        Reply::Accepted(value) => Ok(value),
        Reply::Rejected { message } => Err(BackendError::logic(
            BACKEND,
            Some(status.as_u16()),
            message,
        )),
    }
}

#[async_trait]
impl LocalFileApi for HttpLocalApi {
    async fn list_files(&self) -> Result<Vec<FileRecord>, BackendError> {
        let url = self.url(&["files"])?;
        debug!(%url, "listing files via local API");
        let response = self.send(self.authenticated(Method::GET, url)).await?;
        let files: Vec<FileRecord> = read_reply(response, Payload::Required("files"), None).await?;
        info!(count = files.len(), "local API listed files");
        Ok(files)
    }

    async fn delete_file(&self, id: &FileId) -> Result<(), BackendError> {
        let url = self.url(&["files", id.as_str()])?;
        debug!(%url, "deleting file via local API");
        let response = self.send(self.authenticated(Method::DELETE, url)).await?;
        read_reply::<()>(response, Payload::Empty, Some(id)).await?;
        info!(file_id = %id, "local API deleted file");
        Ok(())
    }

    async fn download_file(&self, id: &FileId) -> Result<Vec<u8>, BackendError> {
        let url = self.url(&["files", "download", id.as_str()])?;
        debug!(%url, "downloading file via local API");
        let response = self.send(self.authenticated(Method::GET, url)).await?;

        let status = response.status();
        if !status.is_success() {
            // エラー時は JSON の {success: false, error} が返る
            let body = response.bytes().await.map_err(|e| classify(BACKEND, e))?;
            return Err(failure(status, &body, Some(id)));
        }

        let bytes = response.bytes().await.map_err(|e| classify(BACKEND, e))?;
        info!(file_id = %id, bytes = bytes.len(), "local API returned file contents");
        Ok(bytes.to_vec())
    }

    async fn test_connection(&self) -> bool {
        let url = match self.url(&["files"]) {
            Ok(url) => url,
            Err(err) => {
                warn!(error = %err, "local API base URL is unusable");
                return false;
            }
        };
        match self.authenticated(Method::GET, url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "local API connection test");
                response.status().is_success()
            }
            Err(err) => {
                warn!(error = %err, "local API connection test failed");
                false
            }
        }
    }

    async fn login(&self, identity: &str, secret: &str) -> Result<serde_json::Value, BackendError> {
        let url = self.url(&["auth", "login"])?;
        debug!(%url, identity, "signing in via local API");
        let request = self
            .client
            .post(url)
            .json(&serde_json::json!({ "email": identity, "password": secret }));
        let response = self.send(request).await?;
        // user は省略されうる（success だけで成功扱い）
        read_reply(response, Payload::Optional("user"), None).await
    }
}
