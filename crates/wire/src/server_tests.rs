// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_bare_job_assignment() {
    let msg = ServerMessage::parse(
        r#"{"type":"JOB_ASSIGNED","payload":{"jobId":"j1","query":"노트북","options":{"timeout":5000}}}"#,
    )
    .unwrap();
    let ServerMessage::JobAssigned { payload } = msg else { panic!("expected assignment") };
    assert_eq!(payload.job_id, "j1");
    assert_eq!(payload.query, "노트북");
    assert_eq!(payload.options.timeout, Some(5000));
}

#[test]
fn parses_enveloped_message() {
    let msg = ServerMessage::parse(
        r#"{"response":{"type":"AGENT_REGISTERED","agentId":"alias_ab12","serverId":"srv-1"}}"#,
    )
    .unwrap();
    assert_eq!(
        msg,
        ServerMessage::AgentRegistered {
            agent_id: Some(AgentId::new("alias_ab12")),
            server_id: Some("srv-1".to_string()),
        }
    );
}

#[yare::parameterized(
    bare = { r#"{"type":"HEARTBEAT_ACK"}"# },
    with_extra_fields = { r#"{"type":"HEARTBEAT_ACK","timestamp":1}"# },
    enveloped = { r#"{"response":{"type":"HEARTBEAT_ACK"}}"# },
)]
fn heartbeat_ack(json: &str) {
    assert_eq!(ServerMessage::parse(json).unwrap(), ServerMessage::HeartbeatAck);
}

#[test]
fn cancellation_reason_is_optional() {
    let msg = ServerMessage::parse(r#"{"type":"JOB_CANCELLED","payload":{"jobId":"j9"}}"#).unwrap();
    let ServerMessage::JobCancelled { payload } = msg else { panic!("expected cancellation") };
    assert_eq!(payload.job_id, "j9");
    assert_eq!(payload.reason, None);
}

#[test]
fn assignment_with_missing_fields_still_parses() {
    let msg = ServerMessage::parse(r#"{"type":"JOB_ASSIGNED","payload":{}}"#).unwrap();
    let ServerMessage::JobAssigned { payload } = msg else { panic!("expected assignment") };
    assert!(payload.job_id.is_empty());
    assert!(payload.query.is_empty());
}

#[test]
fn unknown_type_is_unrecognized() {
    let err = ServerMessage::parse(r#"{"type":"SERVER_RESTART"}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::Unrecognized(kind) if kind == "SERVER_RESTART"));
}

#[yare::parameterized(
    not_json = { "hello" },
    no_type = { r#"{"payload":{}}"# },
    wrong_payload = { r#"{"type":"JOB_CANCELLED","payload":"j1"}"# },
)]
fn malformed_is_json_error(text: &str) {
    assert!(matches!(ServerMessage::parse(text), Err(ProtocolError::Json(_))));
}

#[test]
fn pending_jobs_defaults_to_empty() {
    let pending: PendingJobs = serde_json::from_str("{}").unwrap();
    assert!(pending.jobs.is_empty());

    let pending: PendingJobs =
        serde_json::from_str(r#"{"jobs":[{"jobId":"a","query":"q"},{"jobId":"b","query":"r"}]}"#)
            .unwrap();
    assert_eq!(pending.jobs.len(), 2);
    assert_eq!(pending.jobs[1].job_id, "b");
}
