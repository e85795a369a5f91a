//! Inbound command routing.
//!
//! A single actor task owns the [`TrendService`] and drains a queue of
//! commands, so each command (including scheduled sweeps) finishes its
//! read-modify-write before the next one starts. Callers talk to it
//! through a cloneable [`RouterHandle`].
//!
//! Commands that produce a result return [`Dispatch::Pending`] holding the
//! receiver for the reply. Fire-and-forget commands return [`Dispatch::Done`]
//! as soon as they are queued.

use crate::jobs::TrendService;
use crate::models::{JobRecord, SyncOutcome, TrendEntry};
use crate::sync::SyncDispatcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Default depth of the command queue.
pub const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("router is no longer running")]
    Closed,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("command failed: {0}")]
    Handler(String),
}

impl RouterError {
    pub fn is_closed(&self) -> bool {
        matches!(self, RouterError::Closed)
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    JobScraped(JobRecord),
    GetTrends,
    ClearData,
    /// The optional payload is accepted but not used.
    SyncToSkillos(Option<Value>),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

impl Message {
    /// Decode `{type, data?}`. Unknown types yield `Ok(None)`.
    pub fn from_value(value: Value) -> Result<Option<Self>, RouterError> {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| RouterError::InvalidMessage(e.to_string()))?;

        let message = match envelope.kind.as_str() {
            "JOB_SCRAPED" => {
                let data = envelope.data.ok_or_else(|| {
                    RouterError::InvalidMessage("JOB_SCRAPED without data".to_string())
                })?;
                let record = JobRecord::from_value(data)
                    .map_err(|e| RouterError::InvalidMessage(e.to_string()))?;
                Message::JobScraped(record)
            }
            "GET_TRENDS" => Message::GetTrends,
            "CLEAR_DATA" => Message::ClearData,
            "SYNC_TO_SKILLOS" => Message::SyncToSkillos(envelope.data),
            other => {
                debug!("Ignoring unknown message type {}", other);
                return Ok(None);
            }
        };
        Ok(Some(message))
    }
}

/// Asynchronous result of a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Trends(Vec<TrendEntry>),
    Sync(SyncOutcome),
    /// The command could not read its data, serialized as `{"error": ...}`.
    Error { error: String },
}

/// What the caller should expect after dispatching a message.
#[derive(Debug)]
pub enum Dispatch {
    /// Queued; no reply will follow.
    Done,
    /// A reply will arrive on this receiver.
    Pending(oneshot::Receiver<Reply>),
    /// Unknown message type, dropped.
    Ignored,
}

impl Dispatch {
    /// Wait for the reply, if one is coming.
    pub async fn reply(self) -> Result<Option<Reply>, RouterError> {
        match self {
            Dispatch::Pending(rx) => rx.await.map(Some).map_err(|_| RouterError::Closed),
            Dispatch::Done | Dispatch::Ignored => Ok(None),
        }
    }
}

enum Command {
    AddJob(JobRecord),
    GetTrends(oneshot::Sender<Reply>),
    Clear,
    Sync(oneshot::Sender<Reply>),
    Sweep(oneshot::Sender<Result<usize, String>>),
    Count(oneshot::Sender<Result<usize, String>>),
}

/// Cloneable sender side of the router.
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<Command>,
}

impl RouterHandle {
    async fn send(&self, command: Command) -> Result<(), RouterError> {
        self.tx.send(command).await.map_err(|_| RouterError::Closed)
    }

    pub async fn dispatch(&self, message: Message) -> Result<Dispatch, RouterError> {
        match message {
            Message::JobScraped(record) => {
                self.send(Command::AddJob(record)).await?;
                Ok(Dispatch::Done)
            }
            Message::ClearData => {
                self.send(Command::Clear).await?;
                Ok(Dispatch::Done)
            }
            Message::GetTrends => {
                let (tx, rx) = oneshot::channel();
                self.send(Command::GetTrends(tx)).await?;
                Ok(Dispatch::Pending(rx))
            }
            Message::SyncToSkillos(data) => {
                if data.is_some() {
                    debug!("Ignoring SYNC_TO_SKILLOS payload");
                }
                let (tx, rx) = oneshot::channel();
                self.send(Command::Sync(tx)).await?;
                Ok(Dispatch::Pending(rx))
            }
        }
    }

    /// Decode and dispatch a raw JSON message.
    pub async fn dispatch_value(&self, value: Value) -> Result<Dispatch, RouterError> {
        match Message::from_value(value)? {
            Some(message) => self.dispatch(message).await,
            None => Ok(Dispatch::Ignored),
        }
    }

    /// Run a retention sweep and wait for the number of evicted records.
    pub async fn sweep(&self) -> Result<usize, RouterError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Sweep(tx)).await?;
        rx.await
            .map_err(|_| RouterError::Closed)?
            .map_err(RouterError::Handler)
    }

    /// Number of stored records once every previously queued command has run.
    pub async fn count(&self) -> Result<usize, RouterError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Count(tx)).await?;
        rx.await
            .map_err(|_| RouterError::Closed)?
            .map_err(RouterError::Handler)
    }
}

/// The actor owning the trend service.
pub struct Router {
    service: TrendService,
    dispatcher: SyncDispatcher,
}

impl Router {
    /// Start the actor. It exits once every handle has been dropped.
    pub fn spawn(
        service: TrendService,
        dispatcher: SyncDispatcher,
        capacity: usize,
    ) -> (RouterHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let router = Router {
            service,
            dispatcher,
        };
        let task = tokio::spawn(router.run(rx));
        (RouterHandle { tx }, task)
    }

    async fn run(self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
        debug!("Router queue closed");
    }

    async fn handle(&self, command: Command) {
        match command {
            Command::AddJob(record) => {
                if let Err(e) = self.service.add_job(record).await {
                    warn!("Dropping scraped job: {}", e);
                }
            }
            Command::GetTrends(reply) => {
                let result = match self.service.get_trends().await {
                    Ok(trends) => Reply::Trends(trends),
                    Err(e) => {
                        error!("Failed to load jobs for trends: {}", e);
                        Reply::Error {
                            error: e.to_string(),
                        }
                    }
                };
                let _ = reply.send(result);
            }
            Command::Clear => {
                if let Err(e) = self.service.clear().await {
                    error!("Failed to clear jobs: {}", e);
                }
            }
            Command::Sync(reply) => self.start_sync(reply).await,
            Command::Sweep(reply) => {
                let result = self.service.sweep().await.map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
            Command::Count(reply) => {
                let result = self.service.count().await.map_err(|e| e.to_string());
                let _ = reply.send(result);
            }
        }
    }

    /// Snapshot trends in the queue, then post them off the queue.
    async fn start_sync(&self, reply: oneshot::Sender<Reply>) {
        let url = match self.dispatcher.endpoint().await {
            Ok(url) => url,
            Err(outcome) => {
                let _ = reply.send(Reply::Sync(outcome));
                return;
            }
        };

        let trends = match self.service.get_trends().await {
            Ok(trends) => trends,
            Err(e) => {
                let _ = reply.send(Reply::Sync(SyncOutcome::failed(e.to_string())));
                return;
            }
        };

        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let outcome = dispatcher.push(&url, &trends).await;
            let _ = reply.send(Reply::Sync(outcome));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::MemoryBadge;
    use crate::jobs::test_support::service;
    use crate::jobs::Limits;
    use crate::store::{FileStore, JobStore, MemoryStore, SettingsStore};
    use crate::sync::test_support::{direct_client, one_shot_server};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;
    use tokio_test::{assert_err, assert_ok};

    struct Harness {
        handle: RouterHandle,
        badge: MemoryBadge,
        settings: SettingsStore,
    }

    fn harness() -> Harness {
        let (service, badge) = service();
        let settings = SettingsStore::new(Arc::new(MemoryStore::new("sync")));
        let dispatcher = SyncDispatcher::with_client(settings.clone(), direct_client());
        let (handle, _task) = Router::spawn(service, dispatcher, QUEUE_CAPACITY);
        Harness {
            handle,
            badge,
            settings,
        }
    }

    fn scraped(url: &str, skills: &[&str]) -> Value {
        json!({
            "type": "JOB_SCRAPED",
            "data": {"url": url, "skills": skills, "timestamp": chrono::Utc::now().timestamp_millis()}
        })
    }

    async fn trends(handle: &RouterHandle) -> Vec<TrendEntry> {
        let dispatch = handle
            .dispatch_value(json!({"type": "GET_TRENDS"}))
            .await
            .unwrap();
        match dispatch.reply().await.unwrap() {
            Some(Reply::Trends(trends)) => trends,
            other => panic!("expected trends, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(
            Message::from_value(json!({"type": "GET_TRENDS"})).unwrap(),
            Some(Message::GetTrends)
        );
        assert_eq!(
            Message::from_value(json!({"type": "SYNC_TO_SKILLOS", "data": {"force": true}}))
                .unwrap(),
            Some(Message::SyncToSkillos(Some(json!({"force": true}))))
        );
        assert_eq!(Message::from_value(json!({"type": "PING"})).unwrap(), None);
        assert_err!(Message::from_value(json!({"data": 1})));
        assert_err!(Message::from_value(json!({"type": "JOB_SCRAPED"})));
        assert_err!(Message::from_value(json!({
            "type": "JOB_SCRAPED",
            "data": {"url": "nope", "timestamp": 1}
        })));
    }

    #[tokio::test]
    async fn test_fire_and_forget_vs_pending() {
        let h = harness();

        let done = h.handle.dispatch_value(scraped("https://a", &["go"])).await;
        assert!(matches!(assert_ok!(done), Dispatch::Done));

        let pending = h.handle.dispatch(Message::GetTrends).await.unwrap();
        assert!(matches!(pending, Dispatch::Pending(_)));

        let ignored = h.handle.dispatch_value(json!({"type": "OPEN_POPUP"})).await;
        assert!(matches!(assert_ok!(ignored), Dispatch::Ignored));
    }

    #[tokio::test]
    async fn test_scraped_jobs_feed_trends() {
        let h = harness();
        h.handle
            .dispatch_value(scraped("https://a", &["go"]))
            .await
            .unwrap();
        h.handle
            .dispatch_value(scraped("https://b", &["go", "rust"]))
            .await
            .unwrap();

        let trends = trends(&h.handle).await;
        assert_eq!(
            serde_json::to_value(&trends).unwrap(),
            json!([
                {"skill": "go", "count": 2, "pct": 100},
                {"skill": "rust", "count": 1, "pct": 50}
            ])
        );
        assert_eq!(h.badge.text(), "2");
    }

    #[tokio::test]
    async fn test_clear_then_get_trends_is_empty() {
        let h = harness();
        h.handle
            .dispatch_value(scraped("https://a", &["go"]))
            .await
            .unwrap();
        h.handle
            .dispatch_value(json!({"type": "CLEAR_DATA"}))
            .await
            .unwrap();

        assert!(trends(&h.handle).await.is_empty());
        assert_eq!(h.badge.text(), "");
        assert_eq!(h.handle.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sync_without_url() {
        let h = harness();
        let dispatch = h
            .handle
            .dispatch_value(json!({"type": "SYNC_TO_SKILLOS"}))
            .await
            .unwrap();

        let reply = dispatch.reply().await.unwrap().unwrap();
        assert_eq!(
            serde_json::to_value(reply).unwrap(),
            json!({"success": false, "error": "No API URL configured"})
        );
    }

    #[tokio::test]
    async fn test_sync_reports_http_error() {
        let h = harness();
        let (url, server) = one_shot_server("500 Internal Server Error").await;
        h.settings.set_api_url(&url).await.unwrap();

        let reply = h
            .handle
            .dispatch(Message::SyncToSkillos(None))
            .await
            .unwrap()
            .reply()
            .await
            .unwrap();
        assert_eq!(
            reply,
            Some(Reply::Sync(SyncOutcome::failed("HTTP 500")))
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_through_router() {
        let h = harness();
        h.handle
            .dispatch_value(json!({
                "type": "JOB_SCRAPED",
                "data": {"url": "https://old", "skills": ["cobol"], "timestamp": 1}
            }))
            .await
            .unwrap();
        h.handle
            .dispatch_value(scraped("https://new", &["rust"]))
            .await
            .unwrap();

        assert_eq!(h.handle.sweep().await.unwrap(), 1);
        assert_eq!(h.handle.count().await.unwrap(), 1);
        assert_eq!(h.badge.text(), "1");
    }

    #[tokio::test]
    async fn test_hung_sync_does_not_block_queue() {
        let h = harness();
        h.handle
            .dispatch_value(scraped("https://a", &["go"]))
            .await
            .unwrap();

        // Accepts the connection and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/trends", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });
        h.settings.set_api_url(&url).await.unwrap();

        let mut sync_rx = match h.handle.dispatch(Message::SyncToSkillos(None)).await.unwrap() {
            Dispatch::Pending(rx) => rx,
            other => panic!("expected pending sync, got {:?}", other),
        };

        let trends = assert_ok!(timeout(Duration::from_secs(2), trends(&h.handle)).await);
        assert_eq!(trends.len(), 1);
        let count = assert_ok!(timeout(Duration::from_secs(2), h.handle.count()).await);
        assert_eq!(count.unwrap(), 1);

        assert_err!(timeout(Duration::from_millis(100), &mut sync_rx).await);
        server.abort();
    }

    #[tokio::test]
    async fn test_unreadable_bucket_replies_with_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("jobs.json"), "[1, 2]").unwrap();

        let jobs = JobStore::new(Arc::new(FileStore::new(dir.path(), "jobs")));
        let service = TrendService::new(jobs, Arc::new(MemoryBadge::new()), Limits::default());
        let settings = SettingsStore::new(Arc::new(MemoryStore::new("sync")));
        let dispatcher = SyncDispatcher::with_client(settings, direct_client());
        let (handle, _task) = Router::spawn(service, dispatcher, QUEUE_CAPACITY);

        let reply = handle
            .dispatch(Message::GetTrends)
            .await
            .unwrap()
            .reply()
            .await
            .unwrap()
            .unwrap();
        match &reply {
            Reply::Error { error } => assert!(error.contains("not a JSON object")),
            other => panic!("expected error reply, got {:?}", other),
        }
        let json = serde_json::to_value(&reply).unwrap();
        assert!(json.get("error").is_some());
        assert!(json.get("success").is_none());
    }

    #[tokio::test]
    async fn test_closed_router() {
        let (service, _) = service();
        let settings = SettingsStore::new(Arc::new(MemoryStore::new("sync")));
        let dispatcher = SyncDispatcher::with_client(settings, direct_client());
        let (handle, task) = Router::spawn(service, dispatcher, 1);
        task.abort();
        let _ = task.await;

        let err = handle.count().await.unwrap_err();
        assert!(err.is_closed());
    }
}
