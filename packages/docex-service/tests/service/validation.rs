use serde_json::json;
use uuid::Uuid;

use docex_service::{
	Error, NoteStatus, ResultSource, SearchRequest, SearchType, ValidateNoteRequest,
};
use docex_storage::index::IndexKind;
use docex_testkit::{TEST_USER, TestService};

use super::create_note;

fn verdict(is_valid: bool, feedback: Option<&str>) -> ValidateNoteRequest {
	ValidateNoteRequest { is_valid, feedback: feedback.map(ToString::to_string) }
}

#[tokio::test]
async fn draft_moves_to_pending_then_reviewed() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Exposure is concentrated.").await;
	let pending =
		test.service.submit_for_validation(note.note_id).await.expect("Failed to submit note.");

	assert_eq!(pending.status, NoteStatus::Pending);
	assert!(pending.submitted_at.is_some());

	let reviewed = test
		.service
		.validate_note(note.note_id, TEST_USER, verdict(true, Some("Matches table 2.")))
		.await
		.expect("Failed to validate note.");

	assert_eq!(reviewed.status, NoteStatus::Reviewed);
	assert_eq!(reviewed.verified, Some(true));
	assert_eq!(reviewed.validator.as_deref(), Some(TEST_USER));
	assert_eq!(reviewed.feedback.as_deref(), Some("Matches table 2."));
	assert!(reviewed.verified_at.is_some());

	let payload =
		test.index.payload(IndexKind::Notes, note.note_id).expect("Note must be indexed.");

	assert_eq!(payload.get("verified"), Some(&json!(true)));
	assert_eq!(payload.get("validator"), Some(&json!(TEST_USER)));
}

#[tokio::test]
async fn validating_a_note_that_is_not_pending_conflicts() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Exposure is concentrated.").await;
	let err = test
		.service
		.validate_note(note.note_id, TEST_USER, verdict(true, None))
		.await
		.expect_err("Expected draft validation to conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");

	test.service.submit_for_validation(note.note_id).await.expect("Failed to submit note.");
	test.service
		.validate_note(note.note_id, TEST_USER, verdict(false, None))
		.await
		.expect("Failed to validate note.");

	let err = test
		.service
		.validate_note(note.note_id, TEST_USER, verdict(true, None))
		.await
		.expect_err("Expected second validation to conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");
	assert_eq!(test.notes.row(note.note_id).and_then(|row| row.verified), Some(false));
}

#[tokio::test]
async fn unknown_notes_are_not_found() {
	let test = TestService::new();
	let missing = Uuid::new_v4();
	let err = test
		.service
		.validate_note(missing, TEST_USER, verdict(true, None))
		.await
		.expect_err("Expected missing note to fail.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	let err = test
		.service
		.submit_for_validation(missing)
		.await
		.expect_err("Expected missing note to fail.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn resubmitting_pending_is_idempotent() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Exposure is concentrated.").await;
	let first =
		test.service.submit_for_validation(note.note_id).await.expect("Failed to submit note.");
	let second =
		test.service.submit_for_validation(note.note_id).await.expect("Failed to resubmit note.");

	assert_eq!(second.status, NoteStatus::Pending);
	assert_eq!(second.submitted_at, first.submitted_at);
	assert_eq!(test.service.pending_validations(None).await.expect("Failed to list.").len(), 1);
}

#[tokio::test]
async fn resubmitting_reviewed_reopens_and_clears_the_verdict() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Exposure is concentrated.").await;

	test.service.submit_for_validation(note.note_id).await.expect("Failed to submit note.");
	test.service
		.validate_note(note.note_id, TEST_USER, verdict(true, Some("Looks right.")))
		.await
		.expect("Failed to validate note.");

	let reopened =
		test.service.submit_for_validation(note.note_id).await.expect("Failed to resubmit note.");

	assert_eq!(reopened.status, NoteStatus::Pending);
	assert_eq!(reopened.verified, None);
	assert_eq!(reopened.validator, None);
	assert_eq!(reopened.feedback, None);

	let payload =
		test.index.payload(IndexKind::Notes, note.note_id).expect("Note must be indexed.");

	assert_eq!(payload.get("verified"), Some(&json!(null)));
	assert_eq!(payload.get("validator"), Some(&json!(null)));
}

#[tokio::test]
async fn listings_are_scoped_and_oldest_first() {
	let test = TestService::new();
	let a = create_note(&test, "paper-1", "A.").await;
	let b = create_note(&test, "paper-2", "B.").await;
	let c = create_note(&test, "paper-1", "C.").await;

	for note_id in [a.note_id, b.note_id, c.note_id] {
		test.service.submit_for_validation(note_id).await.expect("Failed to submit note.");
	}

	let pending = test.service.pending_validations(None).await.expect("Failed to list.");

	assert_eq!(
		pending.iter().map(|note| note.note_id).collect::<Vec<_>>(),
		vec![a.note_id, b.note_id, c.note_id]
	);

	let scoped = test.service.pending_validations(Some("paper-1")).await.expect("Failed to list.");

	assert_eq!(
		scoped.iter().map(|note| note.note_id).collect::<Vec<_>>(),
		vec![a.note_id, c.note_id]
	);

	test.service
		.validate_note(b.note_id, TEST_USER, verdict(true, None))
		.await
		.expect("Failed to validate note.");

	let validated = test.service.validated_notes(None).await.expect("Failed to list.");

	assert_eq!(validated.len(), 1);
	assert_eq!(validated[0].note_id, b.note_id);
	assert!(
		test.service.validated_notes(Some("paper-1")).await.expect("Failed to list.").is_empty()
	);
	assert_eq!(test.service.pending_validations(None).await.expect("Failed to list.").len(), 2);
}

#[tokio::test]
async fn search_reports_the_mirrored_verdict() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Exposure is concentrated.").await;

	test.service.submit_for_validation(note.note_id).await.expect("Failed to submit note.");
	test.service
		.validate_note(note.note_id, TEST_USER, verdict(true, None))
		.await
		.expect("Failed to validate note.");

	let response = test
		.service
		.hybrid_search(SearchRequest {
			query: "exposure".to_string(),
			document_id: None,
			search_type: SearchType::ResearchNotes,
			page: 1,
			page_size: 10,
		})
		.await
		.expect("Hybrid search failed.");

	assert_eq!(response.results.len(), 1);
	assert_eq!(
		response.results[0].source,
		ResultSource::ResearchNote {
			note_id: Some(note.note_id),
			verified: Some(true),
			validator: Some(TEST_USER.to_string()),
		}
	);
}

#[tokio::test]
async fn failed_verdict_mirror_keeps_the_note_pending() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Exposure is concentrated.").await;

	test.service.submit_for_validation(note.note_id).await.expect("Failed to submit note.");
	test.index.fail_set_payload(true);

	let err = test
		.service
		.validate_note(note.note_id, TEST_USER, verdict(true, None))
		.await
		.expect_err("Expected index failure.");

	assert!(matches!(err, Error::Index { .. }), "Unexpected error: {err:?}");

	let row = test.notes.row(note.note_id).expect("Note must still exist.");

	assert_eq!(row.status, NoteStatus::Pending.as_str());
	assert_eq!(row.verified, None);
	assert_eq!(row.validator, None);

	test.index.fail_set_payload(false);

	let reviewed = test
		.service
		.validate_note(note.note_id, TEST_USER, verdict(true, None))
		.await
		.expect("Retrying the verdict must succeed.");

	assert_eq!(reviewed.status, NoteStatus::Reviewed);
	assert_eq!(
		test.index
			.payload(IndexKind::Notes, note.note_id)
			.and_then(|payload| payload.get("verified").cloned()),
		Some(json!(true))
	);
}

#[tokio::test]
async fn failed_reopen_mirror_keeps_the_verdict() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Exposure is concentrated.").await;

	test.service.submit_for_validation(note.note_id).await.expect("Failed to submit note.");
	test.service
		.validate_note(note.note_id, TEST_USER, verdict(false, Some("Wrong table.")))
		.await
		.expect("Failed to validate note.");
	test.index.fail_set_payload(true);

	let err = test
		.service
		.submit_for_validation(note.note_id)
		.await
		.expect_err("Expected index failure.");

	assert!(matches!(err, Error::Index { .. }), "Unexpected error: {err:?}");

	let row = test.notes.row(note.note_id).expect("Note must still exist.");

	assert_eq!(row.status, NoteStatus::Reviewed.as_str());
	assert_eq!(row.verified, Some(false));
	assert_eq!(row.feedback.as_deref(), Some("Wrong table."));
	assert_eq!(
		test.index
			.payload(IndexKind::Notes, note.note_id)
			.and_then(|payload| payload.get("verified").cloned()),
		Some(json!(false))
	);
}
