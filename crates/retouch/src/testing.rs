//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::notify::{Notice, Notifier};
use crate::operation::{HistorySink, OperationKind, OperationRecord};
use crate::platform::{
    ClipboardError, FocusedText, SelectionReadError, SystemClipboard, WriteFailed,
};
use crate::error::{Error, Result as CrateResult};
use crate::timing::Clock;
use crate::transform::{PromptConfig, TransformError, Transformer};
use crate::words::{ProtectedWord, WordSource};

/// Focused element with a fixed selection.
pub(crate) struct FakeFocus {
    selection: Result<String, SelectionReadError>,
    reject_writes: bool,
    app: Option<String>,
    reads: AtomicUsize,
    writes: Mutex<Vec<String>>,
}

impl FakeFocus {
    fn new(selection: Result<String, SelectionReadError>) -> Self {
        Self {
            selection,
            reject_writes: false,
            app: Some("TextEdit".to_string()),
            reads: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_selection(text: &str) -> Self {
        Self::new(Ok(text.to_string()))
    }

    pub(crate) fn no_selection() -> Self {
        Self::new(Err(SelectionReadError::NoSelection))
    }

    pub(crate) fn secure() -> Self {
        Self::new(Err(SelectionReadError::SecureField))
    }

    pub(crate) fn unavailable() -> Self {
        Self::new(Err(SelectionReadError::Unavailable("no element".to_string())))
    }

    pub(crate) fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    pub(crate) fn in_app(mut self, app: Option<&str>) -> Self {
        self.app = app.map(String::from);
        self
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl FocusedText for FakeFocus {
    fn read_selection(&self) -> Result<String, SelectionReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.selection.clone()
    }

    fn write_selection(&self, text: &str) -> Result<(), WriteFailed> {
        if self.reject_writes {
            return Err(WriteFailed("element is read-only".to_string()));
        }
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn active_app(&self) -> Option<String> {
        self.app.clone()
    }
}

/// A recorded clipboard interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClipboardCall {
    Read,
    Write(String),
    Clear,
    ChangeCount,
    Copy,
    Paste,
}

#[derive(Default)]
struct ClipboardState {
    content: Option<String>,
    count: u64,
    copy_text: Option<String>,
    copy_delay_polls: u32,
    pending_copy: Option<String>,
    polls_since_copy: u32,
    fail_copy: bool,
    fail_paste: bool,
    calls: Vec<ClipboardCall>,
}

/// Clipboard whose change counter is driven by scripted copies.
///
/// When a copy shortcut is sent, the configured text lands on the clipboard
/// after the given number of change-counter polls.
#[derive(Default)]
pub(crate) struct FakeClipboard {
    state: Mutex<ClipboardState>,
}

impl FakeClipboard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_content(self, text: &str) -> Self {
        self.state.lock().unwrap().content = Some(text.to_string());
        self
    }

    pub(crate) fn copies(self, text: &str) -> Self {
        self.state.lock().unwrap().copy_text = Some(text.to_string());
        self
    }

    pub(crate) fn copy_lands_after(self, polls: u32) -> Self {
        self.state.lock().unwrap().copy_delay_polls = polls;
        self
    }

    pub(crate) fn failing_copy(self) -> Self {
        self.state.lock().unwrap().fail_copy = true;
        self
    }

    pub(crate) fn failing_paste(self) -> Self {
        self.state.lock().unwrap().fail_paste = true;
        self
    }

    pub(crate) fn content(&self) -> Option<String> {
        self.state.lock().unwrap().content.clone()
    }

    pub(crate) fn calls(&self) -> Vec<ClipboardCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl SystemClipboard for FakeClipboard {
    fn read(&self) -> Result<Option<String>, ClipboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClipboardCall::Read);
        Ok(state.content.clone())
    }

    fn write(&self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClipboardCall::Write(text.to_string()));
        state.content = Some(text.to_string());
        state.count += 1;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClipboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClipboardCall::Clear);
        state.content = None;
        state.count += 1;
        Ok(())
    }

    fn change_count(&self) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClipboardCall::ChangeCount);
        if state.pending_copy.is_some() {
            state.polls_since_copy += 1;
            if state.polls_since_copy > state.copy_delay_polls {
                state.content = state.pending_copy.take();
                state.count += 1;
            }
        }
        state.count
    }

    fn synthesize_copy(&self) -> Result<(), ClipboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClipboardCall::Copy);
        if state.fail_copy {
            return Err(ClipboardError::KeystrokeFailed("not permitted".to_string()));
        }
        state.pending_copy = state.copy_text.clone();
        state.polls_since_copy = 0;
        Ok(())
    }

    fn synthesize_paste(&self) -> Result<(), ClipboardError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ClipboardCall::Paste);
        if state.fail_paste {
            return Err(ClipboardError::KeystrokeFailed("not permitted".to_string()));
        }
        Ok(())
    }
}

/// Clock that advances only when slept on.
#[derive(Default)]
pub(crate) struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
    }
}

type Respond = dyn Fn(&str) -> Result<String, TransformError> + Send + Sync;

/// Transformer with a scripted response.
pub(crate) struct FakeTransformer {
    configured: bool,
    respond: Box<Respond>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(OperationKind, String)>>,
}

impl FakeTransformer {
    pub(crate) fn responding(
        respond: impl Fn(&str) -> Result<String, TransformError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            configured: true,
            respond: Box::new(respond),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Echoes the input.
    pub(crate) fn echo() -> Self {
        Self::responding(|text| Ok(text.to_string()))
    }

    pub(crate) fn failing(error: TransformError) -> Self {
        Self::responding(move |_| Err(error.clone()))
    }

    pub(crate) fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::echo()
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(OperationKind, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transformer for FakeTransformer {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn transform(
        &self,
        kind: OperationKind,
        text: &str,
        _prompt: &PromptConfig,
    ) -> Result<String, TransformError> {
        self.calls.lock().unwrap().push((kind, text.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(text)
    }
}

/// History sink that keeps records in memory.
#[derive(Default)]
pub(crate) struct RecordingHistory {
    records: Mutex<Vec<OperationRecord>>,
}

impl RecordingHistory {
    pub(crate) fn records(&self) -> Vec<OperationRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl HistorySink for RecordingHistory {
    fn append(&self, record: &OperationRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

/// Notifier that keeps notices in memory.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Word source whose backing store cannot be read.
pub(crate) struct UnavailableWords;

impl WordSource for UnavailableWords {
    fn current_words(&self) -> CrateResult<Vec<ProtectedWord>> {
        Err(Error::DatabaseQuery(rusqlite::Error::InvalidQuery))
    }
}
