use serde_json::{Map, json};
use uuid::Uuid;

use docex_service::{CreateNoteRequest, Error, NoteOrigin, NoteStatus, UpdateNoteRequest};
use docex_storage::index::IndexKind;
use docex_testkit::TestService;

use super::create_note;

#[tokio::test]
async fn create_stores_a_draft_and_indexes_it() {
	let test = TestService::new();
	let note = create_note(&test, " paper-1 ", "  Sector exposure is concentrated. ").await;

	assert_eq!(note.document_id, "paper-1");
	assert_eq!(note.content, "Sector exposure is concentrated.");
	assert_eq!(note.status, NoteStatus::Draft);
	assert_eq!(note.origin, NoteOrigin::Manual);
	assert_eq!(note.verified, None);

	let payload =
		test.index.payload(IndexKind::Notes, note.note_id).expect("Note must be indexed.");

	assert_eq!(payload.get("document_id"), Some(&json!("paper-1")));
	assert_eq!(payload.get("text"), Some(&json!("Sector exposure is concentrated.")));
	assert_eq!(payload.get("timestamp_unix"), Some(&json!(note.created_at.unix_timestamp())));
	assert_eq!(payload.get("verified"), Some(&json!(null)));
}

#[tokio::test]
async fn blank_fields_are_rejected() {
	let test = TestService::new();

	for (document_id, content) in [("paper-1", " "), (" ", "Content.")] {
		let req = CreateNoteRequest {
			content: content.to_string(),
			origin: NoteOrigin::Manual,
			metadata: None,
		};
		let err = test
			.service
			.create_note(document_id, req)
			.await
			.expect_err("Expected blank input to be rejected.");

		assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");
	}

	assert!(test.notes.is_empty());
}

#[tokio::test]
async fn index_failure_removes_the_row() {
	let test = TestService::new();

	test.index.fail_upserts(true);

	let req = CreateNoteRequest {
		content: "Will not be indexed.".to_string(),
		origin: NoteOrigin::Manual,
		metadata: None,
	};
	let err = test
		.service
		.create_note("paper-1", req)
		.await
		.expect_err("Expected index failure.");

	assert!(matches!(err, Error::Index { .. }), "Unexpected error: {err:?}");
	assert!(test.notes.is_empty());
}

#[tokio::test]
async fn derived_notes_record_their_origin() {
	let test = TestService::new();
	let qa = test
		.service
		.create_qa_derived_note(
			"paper-1",
			"What drives transition risk?",
			"Carbon pricing.",
			Some("Section 4"),
		)
		.await
		.expect("Failed to create QA note.");

	assert_eq!(qa.origin, NoteOrigin::QaDerived);
	assert_eq!(qa.content, "Carbon pricing.");
	assert_eq!(qa.metadata.get("question"), Some(&json!("What drives transition risk?")));
	assert_eq!(qa.metadata.get("context"), Some(&json!("Section 4")));

	let summary = test
		.service
		.create_summary_derived_note("paper-1", "The paper surveys climate risk.", None)
		.await
		.expect("Failed to create summary note.");

	assert_eq!(summary.origin, NoteOrigin::SummaryDerived);
	assert_eq!(summary.metadata.get("source_content"), Some(&json!(null)));

	let payload = test
		.index
		.payload(IndexKind::Notes, summary.note_id)
		.expect("Summary note must be indexed.");

	assert_eq!(payload.get("origin"), Some(&json!("summary_derived")));
}

#[tokio::test]
async fn list_is_newest_first_and_filters_verified() {
	let test = TestService::new();
	let first = create_note(&test, "paper-1", "First.").await;
	let second = create_note(&test, "paper-1", "Second.").await;

	create_note(&test, "paper-2", "Elsewhere.").await;

	let listed = test.service.list_notes("paper-1", false).await.expect("Failed to list notes.");

	assert_eq!(
		listed.iter().map(|note| note.note_id).collect::<Vec<_>>(),
		vec![second.note_id, first.note_id]
	);

	test.service.submit_for_validation(first.note_id).await.expect("Failed to submit note.");
	test.service
		.validate_note(
			first.note_id,
			"reviewer@example.com",
			docex_service::ValidateNoteRequest { is_valid: true, feedback: None },
		)
		.await
		.expect("Failed to validate note.");

	let verified = test.service.list_notes("paper-1", true).await.expect("Failed to list notes.");

	assert_eq!(verified.len(), 1);
	assert_eq!(verified[0].note_id, first.note_id);
}

#[tokio::test]
async fn update_content_reindexes_and_metadata_merges() {
	let test = TestService::new();
	let mut metadata = Map::new();

	metadata.insert("tag".to_string(), json!("risk"));

	let note = test
		.service
		.create_note(
			"paper-1",
			CreateNoteRequest {
				content: "Draft wording.".to_string(),
				origin: NoteOrigin::Manual,
				metadata: Some(metadata),
			},
		)
		.await
		.expect("Failed to create note.");
	let mut patch = Map::new();

	patch.insert("priority".to_string(), json!(2));

	let updated = test
		.service
		.update_note(
			note.note_id,
			UpdateNoteRequest { content: Some("Final wording.".to_string()), metadata: Some(patch) },
		)
		.await
		.expect("Failed to update note.");

	assert_eq!(updated.content, "Final wording.");
	assert_eq!(updated.metadata.get("tag"), Some(&json!("risk")));
	assert_eq!(updated.metadata.get("priority"), Some(&json!(2)));
	assert_eq!(
		test.index.payload(IndexKind::Notes, note.note_id).and_then(|p| p.get("text").cloned()),
		Some(json!("Final wording."))
	);
	assert_eq!(test.embedding.calls(), 2);

	let mut patch = Map::new();

	patch.insert("tag".to_string(), json!("finance"));

	let metadata_only = test
		.service
		.update_note(note.note_id, UpdateNoteRequest { content: None, metadata: Some(patch) })
		.await
		.expect("Failed to update note.");

	assert_eq!(metadata_only.metadata.get("tag"), Some(&json!("finance")));
	assert_eq!(test.embedding.calls(), 2);
}

#[tokio::test]
async fn update_requires_a_field_and_an_existing_note() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Content.").await;
	let err = test
		.service
		.update_note(note.note_id, UpdateNoteRequest::default())
		.await
		.expect_err("Expected empty update to be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }), "Unexpected error: {err:?}");

	let err = test
		.service
		.update_note(
			Uuid::new_v4(),
			UpdateNoteRequest { content: Some("New.".to_string()), metadata: None },
		)
		.await
		.expect_err("Expected missing note to fail.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn delete_removes_row_and_point() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Content.").await;

	test.service.delete_note(note.note_id).await.expect("Failed to delete note.");

	assert!(test.notes.is_empty());
	assert!(test.index.payload(IndexKind::Notes, note.note_id).is_none());

	let err = test.service.get_note(note.note_id).await.expect_err("Expected note to be gone.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	let err = test
		.service
		.delete_note(note.note_id)
		.await
		.expect_err("Expected second delete to fail.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn failed_reindex_restores_the_previous_content() {
	let test = TestService::new();
	let note = create_note(&test, "paper-1", "Old wording.").await;

	test.index.fail_upserts(true);

	let err = test
		.service
		.update_note(
			note.note_id,
			UpdateNoteRequest { content: Some("New wording.".to_string()), metadata: None },
		)
		.await
		.expect_err("Expected index failure.");

	assert!(matches!(err, Error::Index { .. }), "Unexpected error: {err:?}");
	assert_eq!(
		test.notes.row(note.note_id).map(|row| row.content),
		Some("Old wording.".to_string())
	);
	assert_eq!(
		test.index.payload(IndexKind::Notes, note.note_id).and_then(|p| p.get("text").cloned()),
		Some(json!("Old wording."))
	);

	test.index.fail_upserts(false);

	let updated = test
		.service
		.update_note(
			note.note_id,
			UpdateNoteRequest { content: Some("New wording.".to_string()), metadata: None },
		)
		.await
		.expect("Failed to update note after the index recovered.");

	assert_eq!(updated.content, "New wording.");
}
