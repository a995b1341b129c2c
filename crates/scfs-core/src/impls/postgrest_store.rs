//! PostgrestMetadataStore - Supabase (PostgREST) 上の `file_metadata` テーブル
//!
//! `{url}/rest/v1/{table}` に対して `apikey` と `Authorization: Bearer` を付けて問い合わせる。

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::http::{classify, join_segments, status_message};
use crate::config::MetadataStoreConfig;
use crate::domain::{BackendError, BackendKind, FileId, FileRecord, OwnerId};
use crate::ports::MetadataStore;

const BACKEND: BackendKind = BackendKind::MetadataStore;

/// reqwest implementation of [`MetadataStore`] against a PostgREST endpoint.
#[derive(Clone)]
pub struct PostgrestMetadataStore {
    client: Client,
    table_url: Url,
    api_key: String,
    bearer: String,
}

/// PostgREST error body (`{"message", "code", "details", "hint"}`).
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
}

impl PostgrestMetadataStore {
    pub fn new(config: &MetadataStoreConfig) -> Result<Self, BackendError> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &MetadataStoreConfig) -> Result<Self, BackendError> {
        let table_url = join_segments(BACKEND, config.url(), &["rest", "v1", config.table()])?;
        Ok(Self {
            client,
            table_url,
            api_key: config.api_key().to_string(),
            bearer: config.bearer_token().to_string(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.api_key.as_str())
            .bearer_auth(self.bearer.as_str())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            let err = classify(BACKEND, e);
            warn!(error = %err, "metadata store request failed");
            err
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.map_err(|e| classify(BACKEND, e))?;
        let server_message = serde_json::from_slice::<PostgrestError>(&body)
            .ok()
            .and_then(|e| e.message);
        let err = BackendError::logic(
            BACKEND,
            Some(status.as_u16()),
            status_message(status, server_message),
        );
        warn!(error = %err, "metadata store rejected request");
        Err(err)
    }

    async fn fetch_records(&self, query: &[(&str, String)]) -> Result<Vec<FileRecord>, BackendError> {
        let request = self.client.get(self.table_url.clone()).query(query);
        let response = self.send(request).await?;
        response.json().await.map_err(|e| classify(BACKEND, e))
    }
}

/// Builds the `or=(...)` filter for a case-insensitive substring search.
///
/// LIKE metacharacters in the query are escaped so the query matches
/// literally, then the pattern is double-quoted so commas and parentheses
/// do not break the PostgREST list syntax.
fn search_filter(query: &str) -> String {
    let mut like = String::with_capacity(query.len() + 2);
    for ch in query.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            like.push('\\');
        }
        like.push(ch);
    }

    let pattern = format!("*{like}*");
    let mut quoted = String::with_capacity(pattern.len() + 2);
    quoted.push('"');
    for ch in pattern.chars() {
        if matches!(ch, '\\' | '"') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');

    format!("(filename.ilike.{quoted},original_path.ilike.{quoted})")
}

#[async_trait]
impl MetadataStore for PostgrestMetadataStore {
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, BackendError> {
        debug!(owner = %owner, "listing files from metadata store");
        let files = self
            .fetch_records(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{owner}")),
                ("order", "uploaded_at.desc".to_string()),
            ])
            .await?;
        info!(owner = %owner, count = files.len(), "metadata store listed files");
        Ok(files)
    }

    async fn delete(&self, id: &FileId) -> Result<(), BackendError> {
        debug!(file_id = %id, "deleting file metadata");
        let request = self
            .client
            .delete(self.table_url.clone())
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        let response = self.send(request).await?;

        // return=representation が無視された場合（204）は削除件数がわからないので成功扱い
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            info!(file_id = %id, "metadata store deleted file");
            return Ok(());
        }
        let removed: Vec<serde_json::Value> =
            response.json().await.map_err(|e| classify(BACKEND, e))?;
        if removed.is_empty() {
            return Err(BackendError::not_found(BACKEND, id));
        }
        info!(file_id = %id, "metadata store deleted file");
        Ok(())
    }

    async fn search(&self, owner: &OwnerId, query: &str) -> Result<Vec<FileRecord>, BackendError> {
        if query.is_empty() {
            return self.list_by_owner(owner).await;
        }
        debug!(owner = %owner, query, "searching metadata store");
        let files = self
            .fetch_records(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{owner}")),
                ("or", search_filter(query)),
                ("order", "uploaded_at.desc".to_string()),
            ])
            .await?;
        info!(owner = %owner, count = files.len(), "metadata store search finished");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::http::test_server::{closed_port, serve};
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn row(id: &str, uploaded_at: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "user_id": "u1",
            "filename": format!("{id}.txt"),
            "original_path": format!("/sync/{id}.txt"),
            "encrypted_path": "/tmp/x.enc",
            "size": 3,
            "hash_sha256": "ff",
            "uploaded_at": uploaded_at,
            "oci_object_name": format!("u1/{id}.enc"),
            "created_at": uploaded_at,
            "updated_at": uploaded_at
        })
    }

    async fn store_for(app: Router) -> PostgrestMetadataStore {
        let base = serve(app).await;
        let config = MetadataStoreConfig::new(Url::parse(&base).unwrap(), "anon")
            .with_access_token("user-jwt");
        PostgrestMetadataStore::new(&config).unwrap()
    }

    #[test]
    fn search_filter_quotes_and_escapes() {
        assert_eq!(
            search_filter("Tax"),
            r#"(filename.ilike."*Tax*",original_path.ilike."*Tax*")"#
        );
        assert_eq!(
            search_filter("50%_a,b"),
            r#"(filename.ilike."*50\\%\\_a,b*",original_path.ilike."*50\\%\\_a,b*")"#
        );
        assert_eq!(
            search_filter(r#"say "hi""#),
            r#"(filename.ilike."*say \"hi\"*",original_path.ilike."*say \"hi\"*")"#
        );
    }

    #[tokio::test]
    async fn list_sends_owner_filter_order_and_auth() {
        let seen = Arc::new(Mutex::new(None));
        let app = Router::new().route(
            "/rest/v1/file_metadata",
            get({
                let seen = seen.clone();
                move |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| async move {
                    *seen.lock().unwrap() = Some((
                        params,
                        headers.get("apikey").unwrap().to_str().unwrap().to_string(),
                        headers.get("authorization").unwrap().to_str().unwrap().to_string(),
                    ));
                    Json(serde_json::json!([
                        row("new", "2024-05-02T00:00:00+00:00"),
                        row("old", "2024-05-01T00:00:00+00:00")
                    ]))
                }
            }),
        );
        let store = store_for(app).await;

        let files = store.list_by_owner(&OwnerId::new("u1")).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id.as_str(), "new");

        let (params, apikey, auth) = seen.lock().unwrap().take().unwrap();
        assert_eq!(params["user_id"], "eq.u1");
        assert_eq!(params["order"], "uploaded_at.desc");
        assert!(!params.contains_key("or"));
        assert_eq!(apikey, "anon");
        assert_eq!(auth, "Bearer user-jwt");
    }

    #[tokio::test]
    async fn search_sends_or_filter() {
        let seen = Arc::new(Mutex::new(None));
        let app = Router::new().route(
            "/rest/v1/file_metadata",
            get({
                let seen = seen.clone();
                move |Query(params): Query<HashMap<String, String>>| async move {
                    *seen.lock().unwrap() = Some(params);
                    Json(serde_json::json!([]))
                }
            }),
        );
        let store = store_for(app).await;

        let files = store.search(&OwnerId::new("u1"), "report").await.unwrap();
        assert!(files.is_empty());
        let params = seen.lock().unwrap().take().unwrap();
        assert_eq!(params["or"], search_filter("report"));
        assert_eq!(params["user_id"], "eq.u1");
    }

    #[tokio::test]
    async fn delete_with_no_matching_row_is_not_found() {
        let app = Router::new().route(
            "/rest/v1/file_metadata",
            axum::routing::delete(|Query(params): Query<HashMap<String, String>>| async move {
                if params["id"] == "eq.f1" {
                    Json(serde_json::json!([row("f1", "2024-05-01T00:00:00+00:00")]))
                } else {
                    Json(serde_json::json!([]))
                }
            }),
        );
        let store = store_for(app).await;

        store.delete(&FileId::new("f1")).await.unwrap();
        let err = store.delete(&FileId::new("f2")).await.unwrap_err();
        assert_eq!(err, BackendError::not_found(BackendKind::MetadataStore, &FileId::new("f2")));
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let app = Router::new().route(
            "/rest/v1/file_metadata",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"code": "PGRST301", "message": "JWT expired"})),
                )
            }),
        );
        let store = store_for(app).await;

        let err = store.list_by_owner(&OwnerId::new("u1")).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::logic(BackendKind::MetadataStore, Some(401), "JWT expired")
        );
        assert!(err.to_string().starts_with("metadata store error"));
    }

    #[tokio::test]
    async fn unreachable_store_is_transport() {
        let base = closed_port().await;
        let config = MetadataStoreConfig::new(Url::parse(&base).unwrap(), "anon");
        let store = PostgrestMetadataStore::new(&config).unwrap();

        let err = store.list_by_owner(&OwnerId::new("u1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }
}
