//! Fakes shared by the writer integration tests.

#![allow(dead_code)]

use relay_policy::WritePolicy;
use relay_types::{
    ConnId, EventStore, OkResponse, PackedEvent, PreparedEvent, SourceFamily, StoreError,
    Verdict, WriteStatus, WriteTxn,
};
use relay_writer::{CandidateEvent, Responder, WriterMsg};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Lowercase hex id of the test event tagged `tag`.
pub fn event_id(tag: u8) -> String {
    hex::encode([tag; 32])
}

/// A well-formed candidate whose id bytes are all `tag`.
pub fn candidate(conn: u64, tag: u8) -> CandidateEvent {
    let json = json!({
        "id": event_id(tag),
        "pubkey": hex::encode([0x22u8; 32]),
        "created_at": 1_700_000_000u64,
        "kind": 1,
        "tags": [],
        "content": format!("event {tag}"),
        "sig": "00"
    });
    CandidateEvent {
        conn_id: ConnId(conn),
        packed: PackedEvent::new(&[tag; 32], &[0x22; 32], 1_700_000_000, 1).into_bytes(),
        json: json.to_string(),
        received_at: 1_700_000_001,
        ip_addr: vec![10, 0, 0, conn as u8],
    }
}

pub fn add(conn: u64, tag: u8) -> WriterMsg {
    WriterMsg::AddEvent(candidate(conn, tag))
}

pub fn close(conn: u64) -> WriterMsg {
    WriterMsg::CloseConn {
        conn_id: ConnId(conn),
    }
}

/// Collects every acknowledgement sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingResponder {
    sent: Arc<Mutex<Vec<(ConnId, OkResponse)>>>,
}

impl RecordingResponder {
    pub fn sent(&self) -> Vec<(ConnId, OkResponse)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Responder for RecordingResponder {
    fn send_ok(&self, conn_id: ConnId, response: &OkResponse) {
        self.sent.lock().unwrap().push((conn_id, response.clone()));
    }
}

/// Returns a fixed verdict per event id and accepts everything else.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPolicy {
    verdicts: HashMap<String, Verdict>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPolicy {
    pub fn with(mut self, tag: u8, verdict: Verdict) -> Self {
        self.verdicts.insert(event_id(tag), verdict);
        self
    }

    /// Ids of every event the policy was asked about, in order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl WritePolicy for ScriptedPolicy {
    fn accept_event(&mut self, event: &Value, _: u64, _: SourceFamily, _: &[u8]) -> Verdict {
        let id = event["id"].as_str().unwrap_or_default().to_string();
        self.seen.lock().unwrap().push(id.clone());
        self.verdicts
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Verdict::Accept(String::new()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Begin,
    Write,
    Commit,
}

/// In-memory store that deduplicates by id and can be told to fail.
#[derive(Debug, Default)]
pub struct FakeStore {
    /// Committed ids, in write order.
    pub stored: Vec<String>,
    /// Ids handed to `write_events`, committed or not.
    pub seen: Vec<String>,
    /// Statuses to assign instead of the dedupe rule.
    pub forced: HashMap<String, WriteStatus>,
    pub fail: Option<Failure>,
    /// Leave every status unset.
    pub skip_status: bool,
    pub opened: usize,
    pub committed: usize,
}

impl FakeStore {
    pub fn failing(failure: Failure) -> Self {
        Self {
            fail: Some(failure),
            ..Self::default()
        }
    }

    pub fn forcing(mut self, tag: u8, status: WriteStatus) -> Self {
        self.forced.insert(event_id(tag), status);
        self
    }
}

pub struct FakeTxn<'a> {
    store: &'a mut FakeStore,
    staged: Vec<String>,
}

impl EventStore for FakeStore {
    type Txn<'a>
        = FakeTxn<'a>
    where
        Self: 'a;

    fn txn_rw(&mut self) -> Result<FakeTxn<'_>, StoreError> {
        if self.fail == Some(Failure::Begin) {
            return Err(StoreError::Begin("database is locked".to_string()));
        }
        self.opened += 1;
        Ok(FakeTxn {
            store: self,
            staged: Vec::new(),
        })
    }
}

impl WriteTxn for FakeTxn<'_> {
    fn write_events(&mut self, events: &mut [PreparedEvent]) -> Result<(), StoreError> {
        for event in events.iter() {
            self.store.seen.push(event.packed.id_hex());
        }
        if self.store.fail == Some(Failure::Write) {
            return Err(StoreError::Write("disk I/O error".to_string()));
        }
        if self.store.skip_status {
            return Ok(());
        }

        for event in events.iter_mut() {
            let id = event.packed.id_hex();
            let status = match self.store.forced.get(&id) {
                Some(status) => *status,
                None if self.store.stored.contains(&id) || self.staged.contains(&id) => {
                    WriteStatus::Duplicate
                }
                None => WriteStatus::Written,
            };
            if status == WriteStatus::Written {
                self.staged.push(id);
                event.lev_id = Some((self.store.stored.len() + self.staged.len()) as u64);
            }
            event.status = Some(status);
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.store.fail == Some(Failure::Commit) {
            return Err(StoreError::Commit("disk full".to_string()));
        }
        self.store.stored.extend(self.staged);
        self.store.committed += 1;
        Ok(())
    }
}
