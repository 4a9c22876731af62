//! Integration tests for lifecycle notifications.

use jobmarket::engine::Engine;
use jobmarket::event::EventKind;
use jobmarket::model::*;

fn names(engine: &Engine, since: u64) -> Vec<&'static str> {
    engine
        .events_since(since)
        .iter()
        .map(|e| e.kind.name())
        .collect()
}

#[test]
fn each_operation_emits_exactly_one_event() {
    let engine = Engine::in_memory();
    let job = engine
        .create_job(NewJob::new("c1", "Dana", "Porch repair"))
        .unwrap();
    engine.post(job.id).unwrap();
    let (_, p) = engine
        .submit_proposal(job.id, NewProposal::new("eng-1", "Ari", 500.0, 3))
        .unwrap();
    engine.accept_proposal(job.id, p.id).unwrap();
    engine.complete(job.id).unwrap();

    assert_eq!(
        names(&engine, 0),
        [
            "job_created",
            "job_posted",
            "job_applied",
            "proposal_accepted",
            "job_completed"
        ]
    );

    let seqs: Vec<u64> = engine.events_since(0).iter().map(|e| e.seq).collect();
    assert_eq!(seqs, [1, 2, 3, 4, 5]);
    assert_eq!(names(&engine, 3), ["proposal_accepted", "job_completed"]);
}

#[test]
fn failed_operations_emit_nothing() {
    let engine = Engine::in_memory();
    let job = engine
        .create_job(NewJob::new("c1", "Dana", "Porch repair"))
        .unwrap();
    let before = engine.events_since(0).len();

    assert!(engine.complete(job.id).is_err());
    assert!(engine.expire(job.id).is_err());
    assert!(
        engine
            .submit_proposal(job.id, NewProposal::new("eng-1", "Ari", 1.0, 1))
            .is_err()
    );
    assert!(engine.update(job.id, JobPatch::default()).is_err());
    assert!(
        engine
            .create_job(NewJob::new("", "Dana", "No client"))
            .is_err()
    );

    assert_eq!(engine.events_since(0).len(), before);
}

#[test]
fn payload_reflects_committed_state() {
    let engine = Engine::in_memory();
    let job = engine
        .create_job(NewJob::new("c1", "Dana", "Porch repair"))
        .unwrap();
    engine.post(job.id).unwrap();
    engine
        .cancel(job.id, Some("found someone offline".to_string()))
        .unwrap();

    let events = engine.events_since(2);
    assert_eq!(events.len(), 1);
    match &events[0].kind {
        EventKind::JobCancelled { job: payload, reason } => {
            assert_eq!(payload.status, JobStatus::Cancelled);
            assert_eq!(**payload, engine.get(job.id).unwrap());
            assert_eq!(reason.as_deref(), Some("found someone offline"));
        }
        other => panic!("unexpected event {}", other.name()),
    }
}

#[tokio::test]
async fn subscribers_see_events_in_order() {
    let engine = Engine::in_memory();
    let mut rx = engine.subscribe();

    let job = engine
        .create_job(NewJob::new("c1", "Dana", "Porch repair"))
        .unwrap();
    engine.post(job.id).unwrap();
    let (_, p) = engine
        .submit_proposal(job.id, NewProposal::new("eng-1", "Ari", 500.0, 3))
        .unwrap();
    engine.withdraw_proposal(job.id, p.id).unwrap();
    engine.expire(job.id).unwrap();

    let mut received = Vec::new();
    for _ in 0..5 {
        received.push(rx.recv().await.unwrap());
    }
    let kinds: Vec<_> = received.iter().map(|e| e.kind.name()).collect();
    assert_eq!(
        kinds,
        [
            "job_created",
            "job_posted",
            "job_applied",
            "proposal_withdrawn",
            "job_expired"
        ]
    );
    assert!(received.windows(2).all(|w| w[0].seq < w[1].seq));
    assert!(received.iter().all(|e| e.kind.job().id == job.id));
}
