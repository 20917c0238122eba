//! Executes engine [`Command`]s against the service.
//!
//! Each command runs as its own monitored task and reports back over the
//! event channel. A task that panics still answers: its completion event is
//! sent with an [`ApiError::Crashed`] result, so the engine never waits on a
//! request that will not come back.

use crate::api::{ApiError, DashboardApi};
use crate::app::Command;
use crate::events::AppEvent;
use crate::notify;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub struct Runtime {
    api: Arc<dyn DashboardApi>,
    tx: UnboundedSender<AppEvent>,
}

impl Runtime {
    pub fn new(api: Arc<dyn DashboardApi>, tx: UnboundedSender<AppEvent>) -> Self {
        Self { api, tx }
    }

    pub fn execute_all(&self, commands: Vec<Command>) {
        for command in commands {
            self.execute(command);
        }
    }

    pub fn execute(&self, command: Command) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        match command {
            Command::FetchPage(request) => spawn_monitored(
                self.tx.clone(),
                "fetch_page",
                async move {
                    let result = api.fetch_page(request.page, request.size).await;
                    send(&tx, AppEvent::PageLoaded { request, result });
                },
                move |e| AppEvent::PageLoaded {
                    request,
                    result: Err(e),
                },
            ),
            Command::FetchDetail(id) => {
                let crashed_id = id.clone();
                spawn_monitored(
                    self.tx.clone(),
                    "fetch_detail",
                    async move {
                        let result = api.fetch_record(&id).await;
                        send(&tx, AppEvent::DetailLoaded { id, result });
                    },
                    move |e| AppEvent::DetailLoaded {
                        id: crashed_id,
                        result: Err(e),
                    },
                );
            }
            Command::FetchStats(request) => spawn_monitored(
                self.tx.clone(),
                "fetch_stats",
                async move {
                    let result = api.fetch_statistics(request.cache_buster).await;
                    send(&tx, AppEvent::StatsLoaded(result));
                },
                |e| AppEvent::StatsLoaded(Err(e)),
            ),
            Command::SubmitFeedback {
                analysis_id,
                correct,
            } => {
                let crashed_id = analysis_id.clone();
                spawn_monitored(
                    self.tx.clone(),
                    "feedback",
                    async move {
                        let result = api.submit_feedback(&analysis_id, correct).await;
                        send(
                            &tx,
                            AppEvent::FeedbackSubmitted {
                                analysis_id,
                                correct,
                                result,
                            },
                        );
                    },
                    move |e| AppEvent::FeedbackSubmitted {
                        analysis_id: crashed_id,
                        correct,
                        result: Err(e),
                    },
                );
            }
            Command::DeleteAll => spawn_monitored(
                self.tx.clone(),
                "delete_all",
                async move {
                    let result = api.delete_all().await;
                    send(&tx, AppEvent::AllDeleted(result));
                },
                |e| AppEvent::AllDeleted(Err(e)),
            ),
            Command::CreateDemo => spawn_monitored(
                self.tx.clone(),
                "create_demo",
                async move {
                    let result = api.create_demo().await;
                    send(&tx, AppEvent::DemoCreated(result));
                },
                |e| AppEvent::DemoCreated(Err(e)),
            ),
            Command::NotifyDesktop(summary) => {
                // notify-rust blocks on D-Bus
                tokio::task::spawn_blocking(move || notify::send_desktop(&summary));
            }
        }
    }
}

fn send(tx: &UnboundedSender<AppEvent>, event: AppEvent) {
    if tx.send(event).is_err() {
        tracing::debug!("event loop gone, dropping result");
    }
}

/// Runs `fut` on its own task. If it panics or is cancelled, `crashed` builds
/// the completion event the task would have sent.
pub fn spawn_monitored(
    tx: UnboundedSender<AppEvent>,
    label: &'static str,
    fut: impl Future<Output = ()> + Send + 'static,
    crashed: impl FnOnce(ApiError) -> AppEvent + Send + 'static,
) {
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(join_err) = handle.await {
            let msg = if join_err.is_panic() {
                match join_err.into_panic().downcast::<String>() {
                    Ok(s) => *s,
                    Err(payload) => match payload.downcast::<&str>() {
                        Ok(s) => s.to_string(),
                        Err(_) => "unknown panic".to_string(),
                    },
                }
            } else {
                "task cancelled".to_string()
            };
            tracing::error!("{label} panicked: {msg}");
            if tx.send(crashed(ApiError::Crashed(format!("{label}: {msg}")))).is_err() {
                tracing::warn!("{label}: channel closed while reporting panic");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResult;
    use crate::model::{DashboardStatistics, Record, RecordPage};
    use crate::pager::{PageLoader, PageOutcome, PageRequest};
    use crate::stats::{StatsLoader, StatsRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingApi {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DashboardApi for RecordingApi {
        async fn fetch_page(&self, page: u32, size: u32) -> ApiResult<RecordPage> {
            self.calls.lock().unwrap().push(format!("page {page}/{size}"));
            Ok(RecordPage {
                content: Vec::new(),
                last: true,
                number: page,
            })
        }

        async fn fetch_record(&self, id: &str) -> ApiResult<Record> {
            self.calls.lock().unwrap().push(format!("record {id}"));
            Err(ApiError::NotFound(id.to_string()))
        }

        async fn fetch_statistics(&self, cache_buster: i64) -> ApiResult<DashboardStatistics> {
            self.calls.lock().unwrap().push(format!("stats {cache_buster}"));
            Ok(DashboardStatistics::default())
        }

        async fn submit_feedback(&self, analysis_id: &str, correct: bool) -> ApiResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("feedback {analysis_id} {correct}"));
            Ok(())
        }

        async fn delete_all(&self) -> ApiResult<()> {
            panic!("delete exploded");
        }

        async fn create_demo(&self) -> ApiResult<Record> {
            Err(ApiError::Status(503))
        }
    }

    fn runtime() -> (Runtime, Arc<RecordingApi>, mpsc::UnboundedReceiver<AppEvent>) {
        let api = Arc::new(RecordingApi::default());
        let (tx, rx) = mpsc::unbounded_channel();
        (Runtime::new(api.clone(), tx), api, rx)
    }

    #[tokio::test]
    async fn page_result_carries_its_request() {
        let (runtime, api, mut rx) = runtime();
        let request = PageRequest {
            generation: 3,
            page: 2,
            size: 50,
        };
        runtime.execute(Command::FetchPage(request));
        match rx.recv().await {
            Some(AppEvent::PageLoaded { request: echoed, result }) => {
                assert_eq!(echoed, request);
                assert!(result.unwrap().last);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(*api.calls.lock().unwrap(), vec!["page 2/50".to_string()]);
    }

    #[tokio::test]
    async fn stats_request_passes_cache_buster() {
        let (runtime, api, mut rx) = runtime();
        runtime.execute(Command::FetchStats(StatsRequest { cache_buster: 42 }));
        assert!(matches!(rx.recv().await, Some(AppEvent::StatsLoaded(Ok(_)))));
        assert_eq!(*api.calls.lock().unwrap(), vec!["stats 42".to_string()]);
    }

    #[tokio::test]
    async fn detail_error_is_reported_with_id() {
        let (runtime, _, mut rx) = runtime();
        runtime.execute(Command::FetchDetail("gone".into()));
        match rx.recv().await {
            Some(AppEvent::DetailLoaded { id, result }) => {
                assert_eq!(id, "gone");
                assert_eq!(result, Err(ApiError::NotFound("gone".into())));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_task_still_reports_completion() {
        let (runtime, _, mut rx) = runtime();
        runtime.execute(Command::DeleteAll);
        match rx.recv().await {
            Some(AppEvent::AllDeleted(Err(ApiError::Crashed(msg)))) => {
                assert!(msg.contains("delete_all"));
                assert!(msg.contains("delete exploded"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    struct ExplodingApi;

    #[async_trait]
    impl DashboardApi for ExplodingApi {
        async fn fetch_page(&self, _page: u32, _size: u32) -> ApiResult<RecordPage> {
            panic!("page handler exploded");
        }

        async fn fetch_record(&self, _id: &str) -> ApiResult<Record> {
            panic!("record handler exploded");
        }

        async fn fetch_statistics(&self, _cache_buster: i64) -> ApiResult<DashboardStatistics> {
            panic!("stats handler exploded");
        }

        async fn submit_feedback(&self, _analysis_id: &str, _correct: bool) -> ApiResult<()> {
            panic!("feedback handler exploded");
        }

        async fn delete_all(&self) -> ApiResult<()> {
            panic!("delete handler exploded");
        }

        async fn create_demo(&self) -> ApiResult<Record> {
            panic!("demo handler exploded");
        }
    }

    #[tokio::test]
    async fn crashed_page_fetch_frees_the_loader() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runtime = Runtime::new(Arc::new(ExplodingApi), tx);
        let mut loader = PageLoader::new(50);
        let request = loader.load_next().unwrap();
        runtime.execute(Command::FetchPage(request));

        let Some(AppEvent::PageLoaded { request: echoed, result }) = rx.recv().await else {
            panic!("expected a page completion");
        };
        assert!(matches!(result, Err(ApiError::Crashed(_))));
        assert!(matches!(loader.complete(echoed, result), PageOutcome::Failed(_)));
        assert_eq!(loader.load_next().map(|r| r.page), Some(0));
    }

    #[tokio::test]
    async fn crashed_stats_fetch_frees_the_loader() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runtime = Runtime::new(Arc::new(ExplodingApi), tx);
        let mut loader = StatsLoader::new();
        let request = loader.refresh(1_000).unwrap();
        runtime.execute(Command::FetchStats(request));

        let Some(AppEvent::StatsLoaded(result)) = rx.recv().await else {
            panic!("expected a stats completion");
        };
        loader.complete(result);
        assert!(!loader.is_loading());
        assert!(loader.refresh(2_000).is_some());
    }

    #[tokio::test]
    async fn crashed_detail_fetch_keeps_its_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runtime = Runtime::new(Arc::new(ExplodingApi), tx);
        runtime.execute(Command::FetchDetail("r7".into()));
        match rx.recv().await {
            Some(AppEvent::DetailLoaded { id, result }) => {
                assert_eq!(id, "r7");
                assert!(matches!(result, Err(ApiError::Crashed(_))));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn feedback_result_echoes_vote() {
        let (runtime, _, mut rx) = runtime();
        runtime.execute(Command::SubmitFeedback {
            analysis_id: "an-1".into(),
            correct: false,
        });
        match rx.recv().await {
            Some(AppEvent::FeedbackSubmitted {
                analysis_id,
                correct,
                result,
            }) => {
                assert_eq!(analysis_id, "an-1");
                assert!(!correct);
                assert!(result.is_ok());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
