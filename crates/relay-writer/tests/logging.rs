//! Server-side log lines emitted by a writer cycle.

mod common;

use common::{add, event_id, Failure, FakeStore, RecordingResponder, ScriptedPolicy};
use relay_types::Verdict;
use relay_writer::Writer;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
struct TestWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct TestWriterGuard {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for TestWriter {
    type Writer = TestWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        TestWriterGuard {
            buffer: self.buffer.clone(),
        }
    }
}

impl Write for TestWriterGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer
            .lock()
            .expect("log buffer")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with an INFO-level fmt subscriber and returns what it logged.
fn capture_logs(f: impl FnOnce()) -> String {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(TestWriter {
            buffer: buffer.clone(),
        })
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .finish();

    let dispatch = Dispatch::new(subscriber);
    tracing::dispatcher::with_default(&dispatch, f);

    let bytes = buffer.lock().expect("log buffer").clone();
    String::from_utf8(bytes).expect("utf8 logs")
}

#[test]
fn shadow_reject_and_batch_failure_are_logged() {
    let policy = ScriptedPolicy::default()
        .with(0xC, Verdict::ShadowReject("rate limited".to_string()));
    let mut writer = Writer::new(
        FakeStore::failing(Failure::Write),
        policy,
        RecordingResponder::default(),
    );

    let logs = capture_logs(|| {
        writer.run_cycle(vec![add(1, 0xC), add(1, 0xD), add(2, 0xE)]);
    });

    let shadow: Vec<&str> = logs
        .lines()
        .filter(|line| line.contains("write policy shadow-rejected event"))
        .collect();
    assert_eq!(shadow.len(), 1, "logs:\n{logs}");
    assert!(shadow[0].contains(&event_id(0xC)), "{}", shadow[0]);
    assert!(shadow[0].contains("reason=rate limited"), "{}", shadow[0]);
    assert!(
        !logs.contains("write policy blocked event"),
        "shadow rejects must not log as plain rejects:\n{logs}"
    );

    let failed: Vec<&str> = logs
        .lines()
        .filter(|line| line.contains("failed to write event batch"))
        .collect();
    assert_eq!(failed.len(), 1, "logs:\n{logs}");
    assert!(failed[0].contains("ERROR"), "{}", failed[0]);
    assert!(failed[0].contains("count=2"), "{}", failed[0]);
    assert!(failed[0].contains("disk I/O error"), "{}", failed[0]);
}

#[test]
fn plain_reject_logs_under_its_own_message() {
    let policy =
        ScriptedPolicy::default().with(0xA, Verdict::Reject("blocked: spam".to_string()));
    let mut writer = Writer::new(FakeStore::default(), policy, RecordingResponder::default());

    let logs = capture_logs(|| {
        writer.run_cycle(vec![add(1, 0xA)]);
    });

    let blocked: Vec<&str> = logs
        .lines()
        .filter(|line| line.contains("write policy blocked event"))
        .collect();
    assert_eq!(blocked.len(), 1, "logs:\n{logs}");
    assert!(blocked[0].contains(&event_id(0xA)), "{}", blocked[0]);
    assert!(!logs.contains("shadow-rejected"), "logs:\n{logs}");
    assert!(!logs.contains("failed to write event batch"), "logs:\n{logs}");
}
