use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{Answer, ContentKey, QuestionId, QuizKind, TaskId};
use quiz_core::normalize::RawQuestion;
use quiz_core::time::fixed_clock;
use serde_json::json;
use services::{
    CompletionPayload, CompletionReporter, ConfirmedAnswers, LiveMirror, Liveness, LoadError,
    MountOutcome, MountRequest, QuizApi, QuizApiError, QuizLoopConfig, QuizLoopService,
    QuizSession, RenderedInputs, RenderedValue, ScrapeError, SessionError, SessionState,
};
use storage::repository::{
    DeviceKey, DeviceRecord, DeviceStore, InMemoryDeviceStore, InMemorySessionCache,
    SessionCache, StorageError,
};

// ─── FAKES ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeApi {
    questions: Vec<RawQuestion>,
    confirmed: Option<ConfirmedAnswers>,
    delay: Duration,
    question_calls: AtomicUsize,
    confirmed_calls: AtomicUsize,
}

impl FakeApi {
    fn with_questions(questions: Vec<RawQuestion>) -> Self {
        Self {
            questions,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.question_calls.load(Ordering::SeqCst) + self.confirmed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuizApi for FakeApi {
    async fn fetch_questions(
        &self,
        _kind: QuizKind,
        _task_id: TaskId,
    ) -> Result<Vec<RawQuestion>, QuizApiError> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.questions.clone())
    }

    async fn fetch_confirmed_answers(
        &self,
        _kind: QuizKind,
        _task_id: TaskId,
    ) -> Result<Option<ConfirmedAnswers>, QuizApiError> {
        self.confirmed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.confirmed.clone())
    }
}

struct FailingDeviceStore;

#[async_trait]
impl DeviceStore for FailingDeviceStore {
    async fn load(&self, _key: &DeviceKey) -> Result<Option<DeviceRecord>, StorageError> {
        Err(StorageError::Connection("storage disabled".into()))
    }
    async fn save(&self, _key: &DeviceKey, _record: &DeviceRecord) -> Result<(), StorageError> {
        Err(StorageError::Connection("storage disabled".into()))
    }
    async fn remove(&self, _key: &DeviceKey) -> Result<(), StorageError> {
        Err(StorageError::Connection("storage disabled".into()))
    }
}

#[derive(Default)]
struct RecordingReporter {
    payloads: Mutex<Vec<CompletionPayload>>,
}

impl RecordingReporter {
    fn payloads(&self) -> Vec<CompletionPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

impl CompletionReporter for RecordingReporter {
    fn on_complete(&self, payload: CompletionPayload) {
        self.payloads.lock().unwrap().push(payload);
    }
}

struct FakeRendered {
    values: Vec<RenderedValue>,
    scrapes: Cell<usize>,
}

impl FakeRendered {
    fn showing(values: Vec<RenderedValue>) -> Rc<Self> {
        Rc::new(Self {
            values,
            scrapes: Cell::new(0),
        })
    }
}

#[async_trait(?Send)]
impl RenderedInputs for FakeRendered {
    async fn scrape(&self) -> Result<Vec<RenderedValue>, ScrapeError> {
        self.scrapes.set(self.scrapes.get() + 1);
        Ok(self.values.clone())
    }
}

fn shown_blank(id: &str, position: usize, value: &str) -> RenderedValue {
    RenderedValue {
        question_id: QuestionId::from(id),
        position: Some(position),
        value: value.to_string(),
    }
}

// ─── HARNESS ───────────────────────────────────────────────────────────────────

struct Harness {
    api: Arc<FakeApi>,
    cache: InMemorySessionCache,
    device: InMemoryDeviceStore,
    reporter: Arc<RecordingReporter>,
    service: QuizLoopService,
}

fn harness(api: FakeApi) -> Harness {
    let api = Arc::new(api);
    let cache = InMemorySessionCache::new();
    let device = InMemoryDeviceStore::new();
    let reporter = Arc::new(RecordingReporter::default());
    let service = QuizLoopService::new(
        fixed_clock(),
        api.clone(),
        Arc::new(cache.clone()),
        Arc::new(device.clone()),
        reporter.clone(),
    );
    Harness {
        api,
        cache,
        device,
        reporter,
        service,
    }
}

fn capital_questions() -> Vec<RawQuestion> {
    serde_json::from_value(json!([
        {"id": "fb1", "prompt": "The capital of France is ____ and known for ____.", "order": 1},
        {"id": "fb2", "question_text": "Water boils at ____ degrees.", "order": 2}
    ]))
    .unwrap()
}

fn key() -> ContentKey {
    ContentKey::for_content(11)
}

fn device_key() -> DeviceKey {
    DeviceKey::new(QuizKind::FillBlank, TaskId::new(7))
}

fn request() -> MountRequest {
    MountRequest::new(key(), QuizKind::FillBlank).with_task(TaskId::new(7))
}

async fn ready(service: &QuizLoopService, request: MountRequest) -> QuizSession {
    match service.mount(request).await {
        MountOutcome::Ready(session) => session,
        MountOutcome::Discarded => panic!("mount was discarded"),
    }
}

fn fill_everything(session: &mut QuizSession) {
    let fb1 = QuestionId::from("fb1");
    let fb2 = QuestionId::from("fb2");
    session.set_blank(&fb1, 0, "Paris").unwrap();
    session.set_blank(&fb1, 1, "the Louvre").unwrap();
    session.set_blank(&fb2, 0, "100").unwrap();
}

// ─── FLOWS ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_mount_fetches_and_defaults_every_answer() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let session = ready(&h.service, request()).await;

    assert_eq!(session.state(), &SessionState::Answering);
    assert_eq!(session.questions().len(), 2);
    assert_eq!(
        session.answers().get(&QuestionId::from("fb1")),
        Some(&Answer::Blanks(vec![String::new(), String::new()]))
    );
    assert_eq!(h.api.question_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remount_restores_from_cache_without_network() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let mut first = ready(&h.service, request()).await;
    first
        .set_blank(&QuestionId::from("fb1"), 0, "Paris")
        .unwrap();
    let before = first.snapshot();
    drop(first);
    let calls = h.api.calls();

    let second = ready(&h.service, request()).await;
    assert_eq!(second.snapshot(), before);
    assert_eq!(h.api.calls(), calls);
}

#[tokio::test]
async fn mirror_covers_a_cleared_cache() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let mirror = LiveMirror::new();
    let mut first = ready(&h.service, request().with_mirror(mirror.clone())).await;
    first.set_blank(&QuestionId::from("fb2"), 0, "100").unwrap();
    drop(first);
    h.cache.clear();
    let calls = h.api.calls();

    let second = ready(&h.service, request().with_mirror(mirror)).await;
    assert_eq!(
        second.answers().get(&QuestionId::from("fb2")),
        Some(&Answer::Blanks(vec!["100".into()]))
    );
    assert_eq!(h.api.calls(), calls);
}

#[tokio::test]
async fn confirmed_answers_restore_a_completed_session() {
    let mut api = FakeApi::with_questions(capital_questions());
    api.confirmed = Some(ConfirmedAnswers {
        answers: serde_json::from_value(json!({"fb1": ["Paris", "art"], "fb2": "100"})).unwrap(),
    });
    let h = harness(api);

    let session = ready(&h.service, request()).await;
    assert_eq!(session.state(), &SessionState::Completed);
    assert_eq!(
        session.answers().get(&QuestionId::from("fb1")),
        Some(&Answer::Blanks(vec!["Paris".into(), "art".into()]))
    );
    // A lone string lands in the only blank.
    assert_eq!(
        session.answers().get(&QuestionId::from("fb2")),
        Some(&Answer::Blanks(vec!["100".into()]))
    );
}

#[tokio::test]
async fn preview_never_asks_for_confirmed_answers() {
    let mut api = FakeApi::with_questions(capital_questions());
    api.confirmed = Some(ConfirmedAnswers {
        answers: serde_json::from_value(json!({"fb2": ["100"]})).unwrap(),
    });
    let h = harness(api);

    let session = ready(&h.service, request().preview(None)).await;
    assert_eq!(session.state(), &SessionState::Answering);
    assert_eq!(h.api.confirmed_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn device_record_restores_a_completed_session() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    h.device
        .save(
            &device_key(),
            &DeviceRecord {
                submitted_answers: serde_json::from_value(json!({"fb2": ["100"]})).unwrap(),
                is_completed: true,
            },
        )
        .await
        .unwrap();

    let session = ready(&h.service, request()).await;
    assert_eq!(session.state(), &SessionState::Completed);
    assert_eq!(
        session.answers().get(&QuestionId::from("fb2")),
        Some(&Answer::Blanks(vec!["100".into()]))
    );
}

#[tokio::test]
async fn malformed_device_record_falls_through_to_defaults() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    h.device.insert_raw(&device_key(), "{not json").unwrap();

    let session = ready(&h.service, request()).await;
    assert_eq!(session.state(), &SessionState::Answering);
    assert!(!session.answers().has_input());
}

#[tokio::test]
async fn rendered_inputs_fill_in_when_every_stored_tier_misses() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let rendered = FakeRendered::showing(vec![shown_blank("fb1", 1, "art")]);

    let session = ready(&h.service, request().with_rendered(rendered.clone())).await;

    assert_eq!(session.state(), &SessionState::Answering);
    assert_eq!(
        session.answers().get(&QuestionId::from("fb1")),
        Some(&Answer::Blanks(vec![String::new(), "art".into()]))
    );
    assert_eq!(rendered.scrapes.get(), 1);
    assert_eq!(h.api.confirmed_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn device_record_wins_over_rendered_inputs() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    h.device
        .save(
            &device_key(),
            &DeviceRecord {
                submitted_answers: serde_json::from_value(json!({"fb2": ["100"]})).unwrap(),
                is_completed: true,
            },
        )
        .await
        .unwrap();
    let rendered = FakeRendered::showing(vec![shown_blank("fb2", 0, "212")]);

    let session = ready(&h.service, request().with_rendered(rendered.clone())).await;

    assert_eq!(session.state(), &SessionState::Completed);
    assert_eq!(
        session.answers().get(&QuestionId::from("fb2")),
        Some(&Answer::Blanks(vec!["100".into()]))
    );
    assert_eq!(rendered.scrapes.get(), 0);
}

#[tokio::test]
async fn cache_hit_never_reads_rendered_inputs() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let mut first = ready(&h.service, request()).await;
    first.set_blank(&QuestionId::from("fb1"), 0, "Paris").unwrap();
    let before = first.snapshot();
    drop(first);

    let rendered = FakeRendered::showing(vec![shown_blank("fb1", 0, "Lyon")]);
    let second = ready(&h.service, request().with_rendered(rendered.clone())).await;

    assert_eq!(second.snapshot(), before);
    assert_eq!(rendered.scrapes.get(), 0);
}

#[tokio::test]
async fn confirm_persists_and_reports_exactly_once() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let mut session = ready(&h.service, request()).await;
    fill_everything(&mut session);

    session.submit_for_review().unwrap();
    assert_eq!(session.state(), &SessionState::Reviewing);
    h.service.confirm(&mut session).await.unwrap();
    assert_eq!(session.state(), &SessionState::Completed);

    assert!(h.service.confirm(&mut session).await.is_err());
    let payloads = h.reporter.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].answers(), Some(session.answers()));

    let record = h.device.load(&device_key()).await.unwrap().expect("record");
    assert!(record.is_completed);
    assert_eq!(record.submitted_answers["fb1"], json!(["Paris", "the Louvre"]));
    assert!(h.cache.get(&key()).unwrap().unwrap().completed);
}

#[tokio::test]
async fn confirm_survives_a_failing_device_store() {
    let api = Arc::new(FakeApi::with_questions(capital_questions()));
    let reporter = Arc::new(RecordingReporter::default());
    let service = QuizLoopService::new(
        fixed_clock(),
        api,
        Arc::new(InMemorySessionCache::new()),
        Arc::new(FailingDeviceStore),
        reporter.clone(),
    );

    let mut session = ready(&service, request()).await;
    fill_everything(&mut session);
    session.submit_for_review().unwrap();
    service.confirm(&mut session).await.unwrap();

    assert_eq!(session.state(), &SessionState::Completed);
    assert_eq!(reporter.payloads().len(), 1);
}

#[tokio::test]
async fn restart_clears_answers_and_device_record() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let mut session = ready(&h.service, request()).await;
    fill_everything(&mut session);
    session.submit_for_review().unwrap();
    h.service.confirm(&mut session).await.unwrap();

    h.service.restart(&mut session).await.unwrap();
    assert_eq!(session.state(), &SessionState::Answering);
    assert!(!session.answers().has_input());
    assert!(h.device.load(&device_key()).await.unwrap().is_none());

    match session.submit_for_review() {
        Err(SessionError::Incomplete { first_invalid, .. }) => {
            assert_eq!(first_invalid, QuestionId::from("fb1"));
        }
        other => panic!("expected incomplete, got {other:?}"),
    }
    assert_eq!(session.state(), &SessionState::Answering);

    drop(session);
    let remounted = ready(&h.service, request()).await;
    assert_eq!(remounted.state(), &SessionState::Answering);
    assert!(!remounted.answers().has_input());
}

#[tokio::test]
async fn preview_with_supplied_questions_completes_without_network() {
    let h = harness(FakeApi::default());
    let mut session = ready(
        &h.service,
        MountRequest::new(ContentKey::generate(), QuizKind::FillBlank)
            .preview(Some(capital_questions())),
    )
    .await;

    session.submit_for_review().unwrap();
    h.service.confirm(&mut session).await.unwrap();

    assert_eq!(session.state(), &SessionState::Completed);
    assert_eq!(h.reporter.payloads(), vec![CompletionPayload::Preview]);
    assert_eq!(h.api.calls(), 0);
}

#[tokio::test]
async fn incomplete_review_reports_first_invalid_question() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let mut session = ready(&h.service, request()).await;
    session.set_blank(&QuestionId::from("fb1"), 0, "Paris").unwrap();

    match session.submit_for_review() {
        Err(SessionError::Incomplete { first_invalid, .. }) => {
            assert_eq!(first_invalid, QuestionId::from("fb1"));
        }
        other => panic!("expected incomplete, got {other:?}"),
    }
    assert!(h.reporter.payloads().is_empty());
}

#[tokio::test]
async fn empty_question_list_is_a_load_error() {
    let h = harness(FakeApi::default());
    let session = ready(&h.service, request()).await;
    assert!(matches!(session.state(), SessionState::LoadError(LoadError::Normalize(_))));
}

#[tokio::test]
async fn missing_task_outside_preview_is_a_load_error() {
    let h = harness(FakeApi::with_questions(capital_questions()));
    let session = ready(&h.service, MountRequest::new(key(), QuizKind::FillBlank)).await;
    assert_eq!(
        session.state(),
        &SessionState::LoadError(LoadError::MissingSource)
    );
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out() {
    let mut api = FakeApi::with_questions(capital_questions());
    api.delay = Duration::from_secs(30);
    let h = harness(api);
    let service = h
        .service
        .clone()
        .with_config(QuizLoopConfig::with_timeout(Duration::from_secs(2)));

    let session = ready(&service, request()).await;
    assert_eq!(
        session.state(),
        &SessionState::LoadError(LoadError::Timeout(Duration::from_secs(2)))
    );
}

#[tokio::test(start_paused = true)]
async fn fetch_finishing_after_unmount_is_discarded() {
    let mut api = FakeApi::with_questions(capital_questions());
    api.delay = Duration::from_millis(200);
    let h = harness(api);
    let liveness = Liveness::new();

    let (outcome, ()) = tokio::join!(
        h.service.mount(request().with_liveness(liveness.clone())),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            liveness.release();
        }
    );

    assert!(matches!(outcome, MountOutcome::Discarded));
    assert!(h.cache.get(&key()).unwrap().is_none());
}
