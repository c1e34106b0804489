use super::common::*;
use crate::triage::lifecycle::{CallOutcome, CandidateStatus, LifecycleError};

#[test]
fn surfaced_hospitals_start_pending() {
    let session = surfaced_session();

    assert_eq!(active_ids(&session), vec!["H1", "H2", "H3"]);
    assert_eq!(session.hospital_stack().len(), 3);
    assert!(session
        .hospital_stack()
        .iter()
        .all(|entry| entry.status == CandidateStatus::Pending && entry.meets_eligibility));
    assert_eq!(session.hospital_stack()[2].surfaced_at_rank, 3);
    assert_eq!(session.backup_pool().len(), 2);
}

#[test]
fn call_then_accept_resolves_session() {
    let mut session = surfaced_session();

    session.begin_call(&id("H2")).expect("pending hospital can be called");
    assert_eq!(session.status_of(&id("H2")), Some(CandidateStatus::Calling));

    let report = session
        .record_outcome(&id("H2"), CallOutcome::Accepted)
        .expect("calling hospital can accept");
    assert!(report.resolved);
    assert_eq!(report.status, CandidateStatus::Approved);
    assert_eq!(session.approved(), Some(&id("H2")));
    assert!(session.is_resolved());
}

#[test]
fn outcome_requires_an_active_call() {
    let mut session = surfaced_session();

    match session.record_outcome(&id("H1"), CallOutcome::Refused) {
        Err(LifecycleError::InvalidTransition { from, to, .. }) => {
            assert_eq!(from, CandidateStatus::Pending);
            assert_eq!(to, CandidateStatus::Rejected);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }

    session.begin_call(&id("H1")).expect("first call");
    assert!(matches!(
        session.begin_call(&id("H1")),
        Err(LifecycleError::InvalidTransition { .. })
    ));
}

#[test]
fn unknown_hospitals_are_reported() {
    let mut session = surfaced_session();

    match session.begin_call(&id("H9")) {
        Err(LifecycleError::UnknownHospital(hospital)) => assert_eq!(hospital, id("H9")),
        other => panic!("expected unknown hospital, got {other:?}"),
    }
}

#[test]
fn only_one_hospital_is_ever_approved() {
    let mut session = surfaced_session();
    session.begin_call(&id("H1")).expect("call H1");
    session.begin_call(&id("H2")).expect("call H2");

    session
        .record_outcome(&id("H1"), CallOutcome::Accepted)
        .expect("H1 accepts");

    assert!(matches!(
        session.record_outcome(&id("H2"), CallOutcome::Accepted),
        Err(LifecycleError::SessionResolved { .. })
    ));
    assert!(matches!(
        session.begin_call(&id("H3")),
        Err(LifecycleError::SessionResolved { .. })
    ));
    assert_eq!(session.status_of(&id("H2")), Some(CandidateStatus::Calling));

    let late = session
        .record_outcome(&id("H2"), CallOutcome::Unreachable)
        .expect("late refusal still recorded");
    assert!(late.backfill.is_none());
    assert_eq!(session.approved(), Some(&id("H1")));
}

#[test]
fn resolved_sessions_stop_surfacing() {
    let mut session = surfaced_session();
    session.begin_call(&id("H1")).expect("call");
    session
        .record_outcome(&id("H1"), CallOutcome::Accepted)
        .expect("accept");

    let refreshed = rank(&[ready("H7", 0.2), ready("H8", 0.3)], 3);
    let report = session.surface(&refreshed);

    assert!(report.resolved);
    assert!(report.newly_surfaced.is_empty());
    assert_eq!(session.hospital_stack().len(), 3);
}

#[test]
fn rejected_hospitals_never_resurface() {
    let mut session = surfaced_session();
    session.begin_call(&id("H1")).expect("call");
    session
        .record_outcome(&id("H1"), CallOutcome::Refused)
        .expect("refuse");

    let records: Vec<_> = (1..=5)
        .map(|n| ready(&format!("H{n}"), f64::from(n)))
        .collect();
    let report = session.surface(&rank(&records, 3));

    assert_eq!(report.skipped_rejected, 1);
    assert!(!active_ids(&session).contains(&"H1".to_string()));
    assert!(session
        .backup_pool()
        .iter()
        .all(|candidate| candidate.record.id != id("H1")));
    assert_eq!(session.exclude_rejected(records).len(), 4);
    assert!(session.rejected().contains(&id("H1")));
}

#[test]
fn calls_in_progress_keep_their_slot_on_refresh() {
    let mut session = surfaced_session();
    session.begin_call(&id("H3")).expect("call H3");

    let closer: Vec<_> = (4..=8)
        .map(|n| ready(&format!("H{n}"), f64::from(n) / 10.0))
        .chain(std::iter::once(ready("H3", 3.0)))
        .collect();
    session.surface(&rank(&closer, 3));

    assert_eq!(active_ids(&session), vec!["H3", "H4", "H5"]);
    assert_eq!(session.status_of(&id("H3")), Some(CandidateStatus::Calling));
}

#[test]
fn hospital_stack_is_append_only() {
    let mut session = surfaced_session();
    let mut lengths = vec![session.hospital_stack().len()];

    session.begin_call(&id("H1")).expect("call");
    lengths.push(session.hospital_stack().len());
    session
        .record_outcome(&id("H1"), CallOutcome::Refused)
        .expect("refuse");
    lengths.push(session.hospital_stack().len());
    session.surface(&rank(&[ready("H9", 0.1)], 3));
    lengths.push(session.hospital_stack().len());

    assert!(lengths.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(session.status_of(&id("H1")), Some(CandidateStatus::Rejected));
    assert_eq!(session.snapshot().hospital_stack.len(), *lengths.last().unwrap_or(&0));
}
