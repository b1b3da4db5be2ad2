use shelf_domain::metadata::Category;
use shelf_service::{Error, UpdateThingRequest};

use super::harness;

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn registration_enriches_and_indexes() {
	let Some(h) = harness("registration_enriches_and_indexes").await else {
		return;
	};
	let registered = h
		.service
		.register_thing("Red spatula", Some("Silicone spatula for cooking"))
		.await
		.expect("Register failed.");
	let thing_id = registered.thing.thing_id;

	assert!(registered.indexed);
	assert_eq!(registered.thing.metadata.category, Category::Kitchenware);

	let stored = h.service.get_thing(thing_id).await.expect("Lookup failed.");

	assert_eq!(stored.metadata, registered.thing.metadata);

	let entry = h.index.entry(thing_id).expect("Missing index entry.");

	assert!(entry.vectors.contains("text"));
	assert_eq!(entry.payload.category, "kitchenware");
	assert_eq!(entry.payload.location_path, None);

	let err = h.service.register_thing("   ", None).await.expect_err("Expected a rejection.");

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error: {err:?}");

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn items_survive_an_unreachable_index_until_reindexed() {
	let Some(h) = harness("items_survive_an_unreachable_index_until_reindexed").await else {
		return;
	};

	h.index.set_offline(true);

	let registered =
		h.service.register_thing("Desk lamp", None).await.expect("Register must still persist.");
	let thing_id = registered.thing.thing_id;

	assert!(!registered.indexed);
	assert!(h.index.entry(thing_id).is_none());
	assert_eq!(h.service.count_things().await.expect("Count failed."), 1);

	let err = h.service.reindex_thing(thing_id).await.expect_err("Expected the index to fail.");

	assert!(matches!(err, Error::ServiceUnavailable { .. }), "Unexpected error: {err:?}");

	h.index.set_offline(false);
	h.service.reindex_thing(thing_id).await.expect("Reindex failed.");

	assert!(h.index.entry(thing_id).is_some());

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn updates_replace_metadata_only_when_asked() {
	let Some(h) = harness("updates_replace_metadata_only_when_asked").await else {
		return;
	};
	let registered = h.service.register_thing("Mug", None).await.expect("Register failed.");
	let thing_id = registered.thing.thing_id;

	assert_eq!(registered.thing.metadata.category, Category::Kitchenware);

	let renamed = h
		.service
		.update_thing(
			thing_id,
			&UpdateThingRequest { name: Some("USB cable".to_string()), ..Default::default() },
		)
		.await
		.expect("Update failed.");

	assert_eq!(renamed.thing.name, "USB cable");
	assert_eq!(renamed.thing.metadata.category, Category::Kitchenware);
	assert!(renamed.thing.updated_at >= registered.thing.updated_at);

	let reenriched = h.service.reenrich_thing(thing_id).await.expect("Re-enrichment failed.");

	assert_eq!(reenriched.thing.metadata.category, Category::Electronics);
	assert_eq!(
		h.index.entry(thing_id).expect("Missing index entry.").payload.name,
		"USB cable"
	);

	let cleared = h
		.service
		.update_thing(
			thing_id,
			&UpdateThingRequest { description: Some(" ".to_string()), ..Default::default() },
		)
		.await
		.expect("Update failed.");

	assert_eq!(cleared.thing.description, None);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn deletion_needs_the_index_and_takes_placements_along() {
	let Some(h) = harness("deletion_needs_the_index_and_takes_placements_along").await else {
		return;
	};
	let shelf = h.service.create_location("Shelf", None).await.expect("Create failed.");
	let registered = h.service.register_thing("Stapler", None).await.expect("Register failed.");
	let thing_id = registered.thing.thing_id;

	h.service.place_thing(thing_id, shelf.location_id).await.expect("Place failed.");
	h.index.set_offline(true);

	let err = h.service.delete_thing(thing_id).await.expect_err("Expected the index to fail.");

	assert!(matches!(err, Error::ServiceUnavailable { .. }), "Unexpected error: {err:?}");
	assert!(h.service.get_thing(thing_id).await.is_ok());

	h.index.set_offline(false);
	h.service.delete_thing(thing_id).await.expect("Delete failed.");

	assert!(h.index.entry(thing_id).is_none());
	assert!(
		h.service.things_at_location(shelf.location_id).await.expect("Listing failed.").is_empty()
	);

	let err = h.service.get_thing(thing_id).await.expect_err("Item must be gone.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	h.service.delete_location(shelf.location_id, false).await.expect("Shelf must be free.");
	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn reindexing_during_deletion_leaves_no_index_entry() {
	let Some(h) = harness("reindexing_during_deletion_leaves_no_index_entry").await else {
		return;
	};
	let registered = h.service.register_thing("Kettle", None).await.expect("Register failed.");
	let thing_id = registered.thing.thing_id;
	let mut reindexers = Vec::new();

	for _ in 0..8 {
		let service = h.service.clone();

		reindexers.push(tokio::spawn(async move { service.reindex_thing(thing_id).await }));
	}

	h.service.delete_thing(thing_id).await.expect("Delete failed.");

	for task in reindexers {
		if let Err(err) = task.await.expect("Task panicked.") {
			assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");
		}
	}

	assert!(h.index.entry(thing_id).is_none());

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn listing_pages_in_creation_order() {
	let Some(h) = harness("listing_pages_in_creation_order").await else {
		return;
	};

	for name in ["First", "Second", "Third"] {
		h.service.register_thing(name, None).await.expect("Register failed.");
	}

	let page: Vec<String> = h
		.service
		.list_things(1, 5)
		.await
		.expect("Listing failed.")
		.into_iter()
		.map(|thing| thing.name)
		.collect();

	assert_eq!(page, vec!["Second", "Third"]);
	assert_eq!(h.service.count_things().await.expect("Count failed."), 3);

	let err = h.service.list_things(0, 0).await.expect_err("Expected a rejection.");

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error: {err:?}");

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn rebuild_repairs_every_unindexed_item() {
	let Some(h) = harness("rebuild_repairs_every_unindexed_item").await else {
		return;
	};

	h.index.set_offline(true);

	let mut ids = Vec::new();

	for name in ["Pen", "Pencil", "Eraser"] {
		let registered = h.service.register_thing(name, None).await.expect("Register failed.");

		ids.push(registered.thing.thing_id);
	}

	let report = h.service.rebuild_index().await.expect("Rebuild failed.");

	assert_eq!(report.rebuilt_count, 0);
	assert_eq!(report.error_count, 3);

	h.index.set_offline(false);

	let report = h.service.rebuild_index().await.expect("Rebuild failed.");

	assert_eq!(report.rebuilt_count, 3);
	assert_eq!(report.error_count, 0);
	assert!(ids.iter().all(|id| h.index.entry(*id).is_some()));

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn image_indexing_without_vision_is_a_no_op() {
	let Some(h) = harness("image_indexing_without_vision_is_a_no_op").await else {
		return;
	};
	let registered = h.service.register_thing("Vase", None).await.expect("Register failed.");
	let thing_id = registered.thing.thing_id;
	let indexed = h.service.index_image(thing_id, b"\x89PNG").await.expect("Indexing failed.");

	assert!(!indexed);
	assert!(!h.index.entry(thing_id).expect("Missing index entry.").vectors.contains("image"));

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}
