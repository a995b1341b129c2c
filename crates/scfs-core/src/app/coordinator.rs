//! AccessCoordinator - ローカル API 優先、失敗時はメタデータストアへフォールバック
//!
//! # 方針
//! - 認証情報があれば必ずローカル API を先に試す（呼び出しごとの切り替えはしない）
//! - 一覧・削除はローカル失敗時にメタデータストアへ 1 回だけフォールバック
//! - ダウンロードはローカル API のみ。失敗は常に `DownloadUnavailable`
//! - probe は UI 表示用。一覧・削除・ダウンロードの分岐には使わない

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use super::fallback::Attempt;
use crate::credentials::CredentialStore;
use crate::domain::{
    AccessError, BackendError, DownloadedFile, FileId, FileRecord, Operation, OwnerId,
};
use crate::ports::{LocalFileApi, MetadataStore};

/// Routes file operations between the local API and the metadata store.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct AccessCoordinator {
    credentials: CredentialStore,
    local: Arc<dyn LocalFileApi>,
    remote: Arc<dyn MetadataStore>,
    local_available: AtomicBool,
}

impl AccessCoordinator {
    pub fn new(
        credentials: CredentialStore,
        local: Arc<dyn LocalFileApi>,
        remote: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            credentials,
            local,
            remote,
            local_available: AtomicBool::new(false),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Whether the local API would be tried. No I/O.
    pub fn is_local_backend_eligible(&self) -> bool {
        self.credentials.has_credentials()
    }

    /// What the most recent local call or probe observed.
    pub fn local_backend_available(&self) -> bool {
        self.local_available.load(Ordering::Relaxed)
    }

    pub async fn list_files(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, AccessError> {
        let files = self
            .two_tier(
                Operation::List,
                || self.local.list_files(),
                || self.remote.list_by_owner(owner),
            )
            .await?;
        info!(owner = %owner, count = files.len(), "listed files");
        Ok(files)
    }

    pub async fn delete_file(&self, id: &FileId) -> Result<(), AccessError> {
        self.two_tier(
            Operation::Delete,
            || self.local.delete_file(id),
            || self.remote.delete(id),
        )
        .await?;
        info!(file_id = %id, "deleted file");
        Ok(())
    }

    /// Fetch file contents from the local API. There is no fallback: the
    /// metadata store never holds contents.
    pub async fn download_file(
        &self,
        id: &FileId,
        filename: &str,
    ) -> Result<DownloadedFile, AccessError> {
        if !self.is_local_backend_eligible() {
            warn!(operation = %Operation::Download, file_id = %id, "download requested without credentials");
            return Err(AccessError::DownloadUnavailable {
                cause: BackendError::CredentialsAbsent,
            });
        }

        let outcome = self.local.download_file(id).await;
        self.observe_local(&outcome);
        match outcome {
            Ok(bytes) => {
                info!(file_id = %id, filename, bytes = bytes.len(), "downloaded file");
                Ok(DownloadedFile {
                    filename: filename.to_string(),
                    bytes,
                })
            }
            Err(cause) => {
                error!(operation = %Operation::Download, file_id = %id, error = %cause, "download failed");
                Err(AccessError::DownloadUnavailable { cause })
            }
        }
    }

    /// Substring search. Only the metadata store can search.
    pub async fn search_files(
        &self,
        owner: &OwnerId,
        query: &str,
    ) -> Result<Vec<FileRecord>, AccessError> {
        match self.remote.search(owner, query).await {
            Ok(files) => {
                info!(owner = %owner, query, count = files.len(), "searched files");
                Ok(files)
            }
            Err(remote) => {
                let err = AccessError::FilesUnavailable {
                    operation: Operation::Search,
                    local: None,
                    remote,
                };
                error!(error = %err, "search failed");
                Err(err)
            }
        }
    }

    /// Live connectivity test. Without credentials the service is not
    /// contacted and the answer is `false`.
    pub async fn probe_local_backend(&self) -> bool {
        if !self.is_local_backend_eligible() {
            debug!(operation = %Operation::Probe, "skipped: no credentials");
            self.local_available.store(false, Ordering::Relaxed);
            return false;
        }
        let reachable = self.local.test_connection().await;
        self.local_available.store(reachable, Ordering::Relaxed);
        if reachable {
            info!("local API reachable");
        } else {
            warn!("local API unreachable");
        }
        reachable
    }

    /// Log in through the local API and keep the credential only if the
    /// service accepted it. Returns the user object the service reported.
    pub async fn sign_in(
        &self,
        identity: &str,
        secret: &str,
    ) -> Result<serde_json::Value, AccessError> {
        if identity.is_empty() || secret.is_empty() {
            return Err(AccessError::SignIn(BackendError::CredentialsAbsent));
        }
        let outcome = self.local.login(identity, secret).await;
        self.observe_local(&outcome);
        match outcome {
            Ok(user) => {
                self.credentials.set_credentials(identity, secret);
                Ok(user)
            }
            Err(cause) => {
                warn!(operation = %Operation::SignIn, identity, error = %cause, "rejected by local API");
                Err(AccessError::SignIn(cause))
            }
        }
    }

    pub fn sign_out(&self) {
        self.credentials.clear_credentials();
        self.local_available.store(false, Ordering::Relaxed);
        info!("signed out");
    }

    // 存在しない ID の応答はサービスが生きている証拠なので available 扱い
    fn observe_local<T>(&self, outcome: &Result<T, BackendError>) {
        let available = match outcome {
            Ok(_) => true,
            Err(e) => e.is_not_found(),
        };
        self.local_available.store(available, Ordering::Relaxed);
    }

    async fn two_tier<T, L, LF, R, RF>(
        &self,
        operation: Operation,
        local: L,
        remote: R,
    ) -> Result<T, AccessError>
    where
        L: Fn() -> LF,
        LF: Future<Output = Result<T, BackendError>>,
        R: Fn() -> RF,
        RF: Future<Output = Result<T, BackendError>>,
    {
        let eligible = self.is_local_backend_eligible();
        if !eligible {
            debug!(%operation, "no credentials, going straight to the metadata store");
        }

        let mut attempt = Attempt::start(eligible);
        loop {
            let from = attempt.phase();
            attempt = match attempt {
                Attempt::Done(value) => return Ok(value),
                Attempt::Failed(err) => {
                    match &err {
                        AccessError::NotFound { .. } => info!(%operation, error = %err, "target missing"),
                        _ => error!(%operation, error = %err, "operation failed on every backend"),
                    }
                    return Err(err);
                }
                Attempt::LocalAttempt => {
                    let outcome = local().await;
                    self.observe_local(&outcome);
                    if let Err(e) = &outcome {
                        if !e.is_not_found() {
                            warn!(%operation, error = %e, kind = ?e.kind(), "local API failed, falling back");
                        }
                    }
                    Attempt::LocalAttempt.record(operation, outcome)
                }
                pending @ Attempt::RemoteFallback { .. } => {
                    let outcome = remote().await;
                    pending.record(operation, outcome)
                }
            };
            debug!(%operation, from = %from, to = %attempt.phase(), "fallback transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendKind, ErrorKind};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Local(&'static str, String),
        Remote(&'static str, String),
    }

    type CallLog = Arc<Mutex<Vec<Call>>>;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: FileId::new(id),
            owner: OwnerId::new("u1"),
            filename: format!("{id}.txt"),
            original_path: format!("/sync/{id}.txt"),
            size_bytes: 3,
            content_hash: "00".repeat(32),
            uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            storage_object_name: format!("u1/{id}.enc"),
        }
    }

    fn local_transport() -> BackendError {
        BackendError::transport(BackendKind::LocalApi, "connection refused")
    }

    fn remote_transport() -> BackendError {
        BackendError::transport(BackendKind::MetadataStore, "timed out")
    }

    /// Local API double answering from a fixed script.
    struct ScriptedLocal {
        log: CallLog,
        list: Result<Vec<FileRecord>, BackendError>,
        delete: Result<(), BackendError>,
        download: Result<Vec<u8>, BackendError>,
        reachable: bool,
        login: Result<serde_json::Value, BackendError>,
    }

    impl ScriptedLocal {
        fn ok(log: &CallLog) -> Self {
            Self {
                log: log.clone(),
                list: Ok(vec![record("local")]),
                delete: Ok(()),
                download: Ok(b"\x00bytes\xff".to_vec()),
                reachable: true,
                login: Ok(serde_json::json!({"email": "me@example.com"})),
            }
        }

        fn down(log: &CallLog) -> Self {
            Self {
                log: log.clone(),
                list: Err(local_transport()),
                delete: Err(local_transport()),
                download: Err(local_transport()),
                reachable: false,
                login: Err(local_transport()),
            }
        }
    }

    #[async_trait]
    impl LocalFileApi for ScriptedLocal {
        async fn list_files(&self) -> Result<Vec<FileRecord>, BackendError> {
            self.log.lock().unwrap().push(Call::Local("list", String::new()));
            self.list.clone()
        }

        async fn delete_file(&self, id: &FileId) -> Result<(), BackendError> {
            self.log.lock().unwrap().push(Call::Local("delete", id.to_string()));
            self.delete.clone()
        }

        async fn download_file(&self, id: &FileId) -> Result<Vec<u8>, BackendError> {
            self.log.lock().unwrap().push(Call::Local("download", id.to_string()));
            self.download.clone()
        }

        async fn test_connection(&self) -> bool {
            self.log.lock().unwrap().push(Call::Local("probe", String::new()));
            self.reachable
        }

        async fn login(&self, identity: &str, _secret: &str) -> Result<serde_json::Value, BackendError> {
            self.log.lock().unwrap().push(Call::Local("login", identity.to_string()));
            self.login.clone()
        }
    }

    struct ScriptedRemote {
        log: CallLog,
        list: Result<Vec<FileRecord>, BackendError>,
        delete: Result<(), BackendError>,
        search: Result<Vec<FileRecord>, BackendError>,
    }

    impl ScriptedRemote {
        fn ok(log: &CallLog) -> Self {
            Self {
                log: log.clone(),
                list: Ok(vec![record("f1")]),
                delete: Ok(()),
                search: Ok(vec![record("f1")]),
            }
        }

        fn down(log: &CallLog) -> Self {
            Self {
                log: log.clone(),
                list: Err(remote_transport()),
                delete: Err(remote_transport()),
                search: Err(remote_transport()),
            }
        }
    }

    #[async_trait]
    impl MetadataStore for ScriptedRemote {
        async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<FileRecord>, BackendError> {
            self.log.lock().unwrap().push(Call::Remote("list", owner.to_string()));
            self.list.clone()
        }

        async fn delete(&self, id: &FileId) -> Result<(), BackendError> {
            self.log.lock().unwrap().push(Call::Remote("delete", id.to_string()));
            self.delete.clone()
        }

        async fn search(&self, owner: &OwnerId, query: &str) -> Result<Vec<FileRecord>, BackendError> {
            self.log
                .lock()
                .unwrap()
                .push(Call::Remote("search", format!("{owner}:{query}")));
            self.search.clone()
        }
    }

    fn coordinator(local: ScriptedLocal, remote: ScriptedRemote, signed_in: bool) -> AccessCoordinator {
        let credentials = CredentialStore::new();
        if signed_in {
            credentials.set_credentials("me@example.com", "pw");
        }
        AccessCoordinator::new(credentials, Arc::new(local), Arc::new(remote))
    }

    fn calls(log: &CallLog) -> Vec<Call> {
        log.lock().unwrap().clone()
    }

    fn local_calls(log: &CallLog) -> usize {
        calls(log).iter().filter(|c| matches!(c, Call::Local(..))).count()
    }

    fn remote_calls(log: &CallLog) -> usize {
        calls(log).iter().filter(|c| matches!(c, Call::Remote(..))).count()
    }

    #[tokio::test]
    async fn no_credentials_never_calls_local() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), false);

        c.list_files(&OwnerId::new("u1")).await.unwrap();
        c.delete_file(&FileId::new("f1")).await.unwrap();
        let err = c.download_file(&FileId::new("f1"), "a.txt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DownloadUnavailable);
        assert!(!c.probe_local_backend().await);

        assert_eq!(local_calls(&log), 0);
        assert!(!c.is_local_backend_eligible());
    }

    #[tokio::test]
    async fn local_success_skips_remote() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), true);

        let files = c.list_files(&OwnerId::new("u1")).await.unwrap();
        assert_eq!(files[0].id.as_str(), "local");
        assert_eq!(calls(&log), vec![Call::Local("list", String::new())]);
        assert!(c.local_backend_available());
    }

    #[tokio::test]
    async fn local_unavailable_list_falls_back_to_remote() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::down(&log), ScriptedRemote::ok(&log), true);

        let files = c.list_files(&OwnerId::new("u1")).await.unwrap();
        assert_eq!(files, vec![record("f1")]);
        assert_eq!(
            calls(&log),
            vec![
                Call::Local("list", String::new()),
                Call::Remote("list", "u1".to_string()),
            ]
        );
        assert!(!c.local_backend_available());
    }

    #[tokio::test]
    async fn local_delete_failure_retries_same_id_remotely_once() {
        let log = CallLog::default();
        let mut local = ScriptedLocal::ok(&log);
        local.delete = Err(BackendError::logic(BackendKind::LocalApi, Some(500), "boom"));
        let c = coordinator(local, ScriptedRemote::ok(&log), true);

        c.delete_file(&FileId::new("f9")).await.unwrap();
        assert_eq!(
            calls(&log),
            vec![
                Call::Local("delete", "f9".to_string()),
                Call::Remote("delete", "f9".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn no_credentials_delete_goes_to_remote() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), false);

        c.delete_file(&FileId::new("f1")).await.unwrap();
        assert_eq!(calls(&log), vec![Call::Remote("delete", "f1".to_string())]);
    }

    #[tokio::test]
    async fn local_not_found_does_not_fall_back() {
        let log = CallLog::default();
        let mut local = ScriptedLocal::ok(&log);
        local.delete = Err(BackendError::not_found(BackendKind::LocalApi, &FileId::new("gone")));
        let c = coordinator(local, ScriptedRemote::ok(&log), true);

        let err = c.delete_file(&FileId::new("gone")).await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound { ref id } if id.as_str() == "gone"));
        assert_eq!(remote_calls(&log), 0);
        assert!(c.local_backend_available());
    }

    #[tokio::test]
    async fn remote_not_found_surfaces_as_not_found() {
        let log = CallLog::default();
        let mut remote = ScriptedRemote::ok(&log);
        remote.delete = Err(BackendError::not_found(BackendKind::MetadataStore, &FileId::new("f1")));
        let c = coordinator(ScriptedLocal::ok(&log), remote, false);

        let err = c.delete_file(&FileId::new("f1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn both_backends_down_is_files_unavailable() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::down(&log), ScriptedRemote::down(&log), true);

        let err = c.list_files(&OwnerId::new("u1")).await.unwrap_err();
        match &err {
            AccessError::FilesUnavailable { operation, local, remote } => {
                assert_eq!(*operation, Operation::List);
                assert_eq!(local.as_ref(), Some(&local_transport()));
                assert_eq!(remote, &remote_transport());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().starts_with("files unavailable"));
        assert_eq!(local_calls(&log), 1);
        assert_eq!(remote_calls(&log), 1);
    }

    #[tokio::test]
    async fn download_returns_bytes_untouched() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), true);

        let file = c.download_file(&FileId::new("f1"), "report.pdf").await.unwrap();
        assert_eq!(file.filename, "report.pdf");
        assert_eq!(file.bytes, b"\x00bytes\xff".to_vec());
        assert_eq!(remote_calls(&log), 0);
    }

    #[tokio::test]
    async fn download_with_local_500_is_unavailable_without_remote() {
        let log = CallLog::default();
        let mut local = ScriptedLocal::ok(&log);
        local.download = Err(BackendError::logic(BackendKind::LocalApi, Some(500), "disk error"));
        let c = coordinator(local, ScriptedRemote::ok(&log), true);

        let err = c.download_file(&FileId::new("f1"), "a.txt").await.unwrap_err();
        match err {
            AccessError::DownloadUnavailable { cause } => {
                assert_eq!(cause.kind(), ErrorKind::BackendLogicFailure)
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(remote_calls(&log), 0);
    }

    #[tokio::test]
    async fn download_transport_failure_is_unavailable() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::down(&log), ScriptedRemote::ok(&log), true);

        let err = c.download_file(&FileId::new("f1"), "a.txt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DownloadUnavailable);
        assert_eq!(remote_calls(&log), 0);
    }

    #[tokio::test]
    async fn search_uses_metadata_store_only() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), true);

        let files = c.search_files(&OwnerId::new("u1"), "tax").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(calls(&log), vec![Call::Remote("search", "u1:tax".to_string())]);

        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::down(&log), true);
        let err = c.search_files(&OwnerId::new("u1"), "tax").await.unwrap_err();
        assert!(matches!(
            err,
            AccessError::FilesUnavailable { operation: Operation::Search, local: None, .. }
        ));
    }

    #[tokio::test]
    async fn probe_reports_and_records_reachability() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), true);
        assert!(c.probe_local_backend().await);
        assert!(c.local_backend_available());

        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::down(&log), ScriptedRemote::ok(&log), true);
        assert!(!c.probe_local_backend().await);
        assert!(!c.local_backend_available());
        assert_eq!(calls(&log), vec![Call::Local("probe", String::new())]);
    }

    #[tokio::test]
    async fn sign_in_stores_credentials_only_on_success() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::down(&log), ScriptedRemote::ok(&log), false);
        let err = c.sign_in("me@example.com", "pw").await.unwrap_err();
        assert!(matches!(err, AccessError::SignIn(_)));
        assert!(!c.is_local_backend_eligible());

        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), false);
        let user = c.sign_in("me@example.com", "pw").await.unwrap();
        assert_eq!(user["email"], "me@example.com");
        assert!(c.is_local_backend_eligible());

        c.sign_out();
        assert!(!c.is_local_backend_eligible());
        assert!(!c.local_backend_available());
    }

    #[tokio::test]
    async fn sign_in_with_empty_field_calls_nothing() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), false);
        let err = c.sign_in("me@example.com", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialsAbsent);
        assert!(calls(&log).is_empty());
    }

    #[tokio::test]
    async fn credentials_changed_through_handle_are_seen() {
        let log = CallLog::default();
        let c = coordinator(ScriptedLocal::ok(&log), ScriptedRemote::ok(&log), false);
        let handle = c.credentials().clone();

        c.list_files(&OwnerId::new("u1")).await.unwrap();
        handle.set_credentials("me@example.com", "pw");
        c.list_files(&OwnerId::new("u1")).await.unwrap();

        assert_eq!(
            calls(&log),
            vec![
                Call::Remote("list", "u1".to_string()),
                Call::Local("list", String::new()),
            ]
        );
    }

    mod over_http {
        use super::*;
        use crate::impls::http::test_server::serve;
        use crate::impls::{HttpLocalApi, InMemoryMetadataStore};
        use axum::http::StatusCode;
        use axum::routing::post;
        use axum::{Json, Router};
        use reqwest::Url;

        async fn wired(app: Router, remote: Arc<InMemoryMetadataStore>) -> AccessCoordinator {
            let base = serve(app).await;
            let credentials = CredentialStore::new();
            let local = HttpLocalApi::new(Url::parse(&format!("{base}/api")).unwrap(), credentials.clone());
            AccessCoordinator::new(credentials, Arc::new(local), remote)
        }

        #[tokio::test]
        async fn unknown_endpoint_on_local_port_falls_back_for_delete() {
            let app = Router::new().fallback(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"success": false, "error": "Endpoint no encontrado"})),
                )
            });
            let remote = Arc::new(InMemoryMetadataStore::with_records([record("f1")]));
            let c = wired(app, remote.clone()).await;
            c.credentials().set_credentials("me@example.com", "pw");

            let files = c.list_files(&OwnerId::new("u1")).await.unwrap();
            assert_eq!(files.len(), 1);

            c.delete_file(&FileId::new("f1")).await.unwrap();
            assert!(remote.is_empty().await);
            assert!(!c.local_backend_available());
        }

        #[tokio::test]
        async fn sign_in_accepts_success_without_user() {
            let app = Router::new().route(
                "/api/auth/login",
                post(|| async { Json(serde_json::json!({"success": true, "access_token": "t"})) }),
            );
            let c = wired(app, Arc::new(InMemoryMetadataStore::new())).await;

            c.sign_in("me@example.com", "pw").await.unwrap();
            assert!(c.is_local_backend_eligible());
        }
    }
}
