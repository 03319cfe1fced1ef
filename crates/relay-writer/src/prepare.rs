//! Decoding and policy checks for candidate events.

use crate::error::DecodeError;
use crate::inbox::CandidateEvent;
use crate::respond::Responder;
use crate::writer::CycleReport;
use relay_policy::WritePolicy;
use relay_types::{OkResponse, PackedEvent, PreparedEvent, SourceFamily, Verdict};
use serde_json::Value;
use tracing::{info, warn};

/// Parses an event's JSON and classifies its source address.
pub fn decode_payload(json: &str, ip_addr: &[u8]) -> Result<(Value, SourceFamily), DecodeError> {
    let document: Value = serde_json::from_str(json)?;
    let source = SourceFamily::classify(ip_addr)?;
    Ok((document, source))
}

/// Decodes each candidate and asks the policy about it.
///
/// Accepted events are returned, in order, ready for the commit step.
/// Everything else is acknowledged right here with `success = false`:
/// decode failures with their `invalid:` reason, rejections with the
/// policy's message.
pub fn prepare_events<P, R>(
    candidates: Vec<CandidateEvent>,
    policy: &mut P,
    responder: &R,
    report: &mut CycleReport,
) -> Vec<PreparedEvent>
where
    P: WritePolicy + ?Sized,
    R: Responder + ?Sized,
{
    let mut accepted = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let conn_id = candidate.conn_id;

        let packed = match PackedEvent::from_bytes(candidate.packed) {
            Ok(packed) => packed,
            Err(e) => {
                let e = DecodeError::from(e);
                warn!(%conn_id, error = %e, "dropping undecodable event");
                report.decode_errors += 1;
                responder.send_ok(conn_id, &OkResponse::new("", false, e.to_string()));
                continue;
            }
        };
        let event_id = packed.id_hex();

        let (document, source) = match decode_payload(&candidate.json, &candidate.ip_addr) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(%conn_id, %event_id, error = %e, "dropping undecodable event");
                report.decode_errors += 1;
                responder.send_ok(conn_id, &OkResponse::new(event_id, false, e.to_string()));
                continue;
            }
        };

        match policy.accept_event(&document, candidate.received_at, source, &candidate.ip_addr) {
            Verdict::Accept(_) => {
                report.accepted += 1;
                accepted.push(PreparedEvent::new(
                    conn_id,
                    packed,
                    candidate.json,
                    candidate.received_at,
                    source,
                    candidate.ip_addr,
                ));
            }
            Verdict::Reject(msg) => {
                info!(%conn_id, %event_id, reason = %msg, "write policy blocked event");
                report.rejected += 1;
                responder.send_ok(conn_id, &OkResponse::new(event_id, false, msg));
            }
            Verdict::ShadowReject(msg) => {
                info!(%conn_id, %event_id, reason = %msg, "write policy shadow-rejected event");
                report.shadow_rejected += 1;
                responder.send_ok(conn_id, &OkResponse::new(event_id, false, msg));
            }
        }
    }

    accepted
}
