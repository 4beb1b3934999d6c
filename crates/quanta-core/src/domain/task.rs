//! Task - 配送単位（閉じた sum type）
//!
//! Every persisted entry carries a kind discriminator string. Decoding maps
//! it onto [`TaskKind`]; kinds this build doesn't know become
//! [`TaskKind::Unknown`] and are filtered out instead of failing hydration.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::context::DeliveryContext;
use super::log::LogTask;
use super::user_log::UserLogTask;
use super::user_update::UserUpdateTask;
use crate::error::DecodeError;

/// A task kind: a persisted payload shape plus its delivery action.
///
/// # Trait Bounds
/// - `Serialize` / `DeserializeOwned`: payload は永続化スロットに保存される
/// - `Send + Sync + 'static`: 処理ループは spawn された tokio task で動く
#[async_trait]
pub trait Deliverable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Discriminator written next to the payload. Never change it for an
    /// existing kind: persisted queues from older builds rely on it.
    const KIND: &'static str;

    fn created_at(&self) -> DateTime<Utc>;

    /// One delivery attempt. `true` iff the collector accepted the record.
    async fn attempt_delivery(&self, ctx: &DeliveryContext) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Log,
    UserLog,
    UserUpdate,
    Unknown(String),
}

impl TaskKind {
    pub fn parse(s: &str) -> Self {
        match s {
            LogTask::KIND => Self::Log,
            UserLogTask::KIND => Self::UserLog,
            UserUpdateTask::KIND => Self::UserUpdate,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Log => LogTask::KIND,
            Self::UserLog => UserLogTask::KIND,
            Self::UserUpdate => UserUpdateTask::KIND,
            Self::Unknown(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of outbound work. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Log(LogTask),
    UserLog(UserLogTask),
    UserUpdate(UserUpdateTask),
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Log(_) => TaskKind::Log,
            Self::UserLog(_) => TaskKind::UserLog,
            Self::UserUpdate(_) => TaskKind::UserUpdate,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Log(t) => t.created_at(),
            Self::UserLog(t) => t.created_at(),
            Self::UserUpdate(t) => t.created_at(),
        }
    }

    pub async fn attempt_delivery(&self, ctx: &DeliveryContext) -> bool {
        match self {
            Self::Log(t) => t.attempt_delivery(ctx).await,
            Self::UserLog(t) => t.attempt_delivery(ctx).await,
            Self::UserUpdate(t) => t.attempt_delivery(ctx).await,
        }
    }

    /// JSON bytes of the variant's own fields (no discriminator).
    pub fn encode_payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Self::Log(t) => serde_json::to_vec(t),
            Self::UserLog(t) => serde_json::to_vec(t),
            Self::UserUpdate(t) => serde_json::to_vec(t),
        }
    }

    pub fn decode(kind: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        match TaskKind::parse(kind) {
            TaskKind::Log => decode_as::<LogTask>(payload).map(Self::Log),
            TaskKind::UserLog => decode_as::<UserLogTask>(payload).map(Self::UserLog),
            TaskKind::UserUpdate => decode_as::<UserUpdateTask>(payload).map(Self::UserUpdate),
            TaskKind::Unknown(kind) => Err(DecodeError::UnknownKind(kind)),
        }
    }
}

fn decode_as<T: Deliverable>(payload: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(payload).map_err(|source| DecodeError::CorruptPayload {
        kind: T::KIND.to_string(),
        source,
    })
}

impl From<LogTask> for Task {
    fn from(task: LogTask) -> Self {
        Self::Log(task)
    }
}

impl From<UserLogTask> for Task {
    fn from(task: UserLogTask) -> Self {
        Self::UserLog(task)
    }
}

impl From<UserUpdateTask> for Task {
    fn from(task: UserUpdateTask) -> Self {
        Self::UserUpdate(task)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::TimeZone;
    use url::Url;

    use super::*;
    use crate::domain::user_log::AB_VERSION_HEADER;
    use crate::domain::wire::RECORD_SEPARATOR;
    use crate::error::{QuantaError, Result};
    use crate::impls::{MemoryStore, StoreExperimentState};
    use crate::ports::{ExperimentState, Transport, TransportRequest, TransportResponse};

    /// Records every request and answers with a fixed response.
    struct CannedTransport {
        response: Option<TransportResponse>,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl CannedTransport {
        fn answering(response: Option<TransportResponse>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<TransportRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
            self.seen.lock().unwrap().push(request);
            self.response
                .clone()
                .ok_or_else(|| QuantaError::Transport("connection refused".into()))
        }
    }

    fn context(transport: Arc<CannedTransport>) -> (DeliveryContext, Arc<StoreExperimentState>) {
        let experiments = Arc::new(StoreExperimentState::new(Arc::new(MemoryStore::new())));
        let ctx = DeliveryContext::new(
            transport,
            experiments.clone(),
            Url::parse("https://ingest.example.com").unwrap(),
        );
        (ctx, experiments)
    }

    fn time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 25, 12, 0, 0).unwrap()
    }

    fn log_task(revenue: &str, args: &str) -> LogTask {
        LogTask {
            app_id: "app".into(),
            user_id: "user".into(),
            event: "sign up".into(),
            revenue: revenue.into(),
            added_arguments: args.into(),
            time: time(),
        }
    }

    fn user_log_task() -> UserLogTask {
        UserLogTask {
            app_id: "app".into(),
            user_data: "user\u{1E}app".into(),
            event: "purchase".into(),
            revenue: "4.99".into(),
            added_arguments: "plan\u{1F}pro".into(),
            time: time(),
            ab_letters: Some("AB".into()),
        }
    }

    #[test]
    fn kind_parse_roundtrips_known_discriminators() {
        for kind in [TaskKind::Log, TaskKind::UserLog, TaskKind::UserUpdate] {
            assert_eq!(TaskKind::parse(kind.as_str()), kind);
            assert!(kind.is_known());
        }
        let unknown = TaskKind::parse("SessionTask");
        assert_eq!(unknown, TaskKind::Unknown("SessionTask".into()));
        assert!(!unknown.is_known());
    }

    #[test]
    fn decode_rejects_unknown_kind_and_corrupt_payload() {
        let err = Task::decode("SessionTask", b"{}").unwrap_err();
        assert!(matches!(err, DecodeError::UnknownKind(k) if k == "SessionTask"));

        let err = Task::decode(LogTask::KIND, b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::CorruptPayload { .. }));
    }

    #[test]
    fn payload_decodes_back_into_same_variant() {
        let task = Task::from(user_log_task());
        let payload = task.encode_payload().unwrap();
        let decoded = Task::decode(task.kind().as_str(), &payload).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn user_log_payload_without_ab_letters_still_decodes() {
        let mut value = serde_json::to_value(user_log_task()).unwrap();
        value.as_object_mut().unwrap().remove("ab_letters");
        let payload = serde_json::to_vec(&value).unwrap();

        let Task::UserLog(task) = Task::decode(UserLogTask::KIND, &payload).unwrap() else {
            panic!("expected UserLog");
        };
        assert_eq!(task.ab_letters, None);
    }

    #[tokio::test]
    async fn log_task_posts_to_path_url() {
        let transport = CannedTransport::answering(Some(TransportResponse::with_status(200)));
        let (ctx, _) = context(transport.clone());

        assert!(Task::from(log_task("0", "")).attempt_delivery(&ctx).await);

        let seen = transport.seen();
        assert_eq!(
            seen[0].url.as_str(),
            "https://ingest.example.com/e/app/user/2024-10-25T12:00:00Z/sign%20up"
        );
        assert!(seen[0].body.is_empty());
    }

    #[tokio::test]
    async fn log_task_appends_revenue_when_arguments_present() {
        let transport = CannedTransport::answering(Some(TransportResponse::with_status(200)));
        let (ctx, _) = context(transport.clone());

        Task::from(log_task("0", "k\u{1F}v")).attempt_delivery(&ctx).await;

        let url = transport.seen()[0].url.to_string();
        assert!(url.ends_with("/sign%20up/0/k%1Fv"), "{url}");
    }

    #[tokio::test]
    async fn non_200_and_transport_errors_are_failures() {
        let transport = CannedTransport::answering(Some(TransportResponse::with_status(503)));
        let (ctx, _) = context(transport);
        assert!(!Task::from(log_task("0", "")).attempt_delivery(&ctx).await);

        let transport = CannedTransport::answering(None);
        let (ctx, _) = context(transport);
        assert!(!Task::from(log_task("0", "")).attempt_delivery(&ctx).await);
    }

    #[tokio::test]
    async fn user_log_task_sends_record_separated_body() {
        let transport = CannedTransport::answering(Some(TransportResponse::with_status(200)));
        let (ctx, _) = context(transport.clone());

        assert!(Task::from(user_log_task()).attempt_delivery(&ctx).await);

        let request = &transport.seen()[0];
        assert_eq!(request.url.as_str(), "https://ingest.example.com/ee/");
        let body = String::from_utf8(request.body.clone()).unwrap();
        let fields: Vec<&str> = body.split(RECORD_SEPARATOR).collect();
        assert_eq!(
            fields,
            vec!["app", "1729857600", "purchase", "4.99", "plan\u{1F}pro", "user", "app", "AB"]
        );
        assert_eq!(request.header(AB_VERSION_HEADER), None);
    }

    #[tokio::test]
    async fn user_log_task_writes_back_experiment_state() {
        let response = TransportResponse {
            status: 200,
            headers: vec![(AB_VERSION_HEADER.to_string(), "42".to_string())],
            body: serde_json::to_vec(r#"[{"name":["Paywall"],"variants":[50,50]}]"#).unwrap(),
        };
        let transport = CannedTransport::answering(Some(response));
        let (ctx, experiments) = context(transport.clone());

        assert!(Task::from(user_log_task()).attempt_delivery(&ctx).await);
        assert_eq!(experiments.ab_version().await.as_deref(), Some("42"));
        assert!(experiments.ab_config().await.unwrap().contains("Paywall"));

        // The next upload echoes the version token.
        Task::from(user_log_task()).attempt_delivery(&ctx).await;
        assert_eq!(transport.seen()[1].header(AB_VERSION_HEADER), Some("42"));
    }

    #[tokio::test]
    async fn empty_experiment_string_is_ignored() {
        let response = TransportResponse {
            status: 200,
            headers: Vec::new(),
            body: b"\"\"".to_vec(),
        };
        let (ctx, experiments) = context(CannedTransport::answering(Some(response)));

        Task::from(user_log_task()).attempt_delivery(&ctx).await;
        assert_eq!(experiments.ab_config().await, None);
    }

    #[tokio::test]
    async fn user_update_task_posts_profile_path() {
        let transport = CannedTransport::answering(Some(TransportResponse::with_status(200)));
        let (ctx, _) = context(transport.clone());
        let task = UserUpdateTask {
            time: time(),
            id: "user".into(),
            app_id: "app".into(),
            device: "Mac14,2".into(),
            os: "macOS14.0.0".into(),
            bundle_id: "com.example".into(),
            debug_flags: 1,
            version: "1.0+1".into(),
            language: "en_US".into(),
        };

        assert!(Task::from(task).attempt_delivery(&ctx).await);
        assert_eq!(
            transport.seen()[0].url.as_str(),
            "https://ingest.example.com/u/2024-10-25T12:00:00Z/user/app/Mac14,2/macOS14.0.0/com.example/1/1.0+1/en_US"
        );
    }
}
