use uuid::Uuid;

use shelf_service::Error;

use super::harness;

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn moving_an_item_keeps_history_and_one_active_row() {
	let Some(h) = harness("moving_an_item_keeps_history_and_one_active_row").await else {
		return;
	};
	let kitchen = h.service.create_location("Kitchen", None).await.expect("Create failed.");
	let garage = h.service.create_location("Garage", None).await.expect("Create failed.");
	let item = h.service.register_thing("Hammer", None).await.expect("Register failed.");
	let thing_id = item.thing.thing_id;

	assert_eq!(h.service.current_placement(thing_id).await.expect("Lookup failed."), None);

	h.service.place_thing(thing_id, kitchen.location_id).await.expect("Place failed.");

	let second = h.service.place_thing(thing_id, garage.location_id).await.expect("Move failed.");
	let current = h
		.service
		.current_placement(thing_id)
		.await
		.expect("Lookup failed.")
		.expect("Item must be placed.");
	let history = h.service.placement_history(thing_id).await.expect("History failed.");

	assert_eq!(current.placement_id, second.placement_id);
	assert_eq!(history.len(), 2);
	assert_eq!(history[0].location_id, garage.location_id);
	assert!(history[0].active);
	assert!(!history[1].active);
	assert!(
		h.service
			.things_at_location(kitchen.location_id)
			.await
			.expect("Listing failed.")
			.is_empty()
	);
	assert_eq!(
		h.service.things_at_location(garage.location_id).await.expect("Listing failed.")[0].name,
		"Hammer"
	);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn concurrent_moves_leave_exactly_one_active_placement() {
	let Some(h) = harness("concurrent_moves_leave_exactly_one_active_placement").await else {
		return;
	};
	let mut location_ids = Vec::new();

	for name in ["A", "B", "C", "D"] {
		let location = h.service.create_location(name, None).await.expect("Create failed.");

		location_ids.push(location.location_id);
	}

	let item = h.service.register_thing("Drill", None).await.expect("Register failed.");
	let thing_id = item.thing.thing_id;
	let mut tasks = Vec::new();

	for round in 0..24 {
		let service = h.service.clone();
		let location_id = location_ids[round % location_ids.len()];

		tasks.push(tokio::spawn(async move { service.place_thing(thing_id, location_id).await }));
	}
	for task in tasks {
		task.await.expect("Task panicked.").expect("Place failed.");
	}

	let history = h.service.placement_history(thing_id).await.expect("History failed.");
	let active: Vec<_> = history.iter().filter(|placement| placement.active).collect();

	assert_eq!(history.len(), 24);
	assert_eq!(active.len(), 1);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn concurrent_moves_leave_the_index_on_the_committed_location() {
	let Some(h) = harness("concurrent_moves_leave_the_index_on_the_committed_location").await
	else {
		return;
	};
	let mut location_ids = Vec::new();

	for name in ["Attic", "Basement", "Closet"] {
		let location = h.service.create_location(name, None).await.expect("Create failed.");

		location_ids.push(location.location_id);
	}

	let item = h.service.register_thing("Lantern", None).await.expect("Register failed.");
	let thing_id = item.thing.thing_id;
	let mut tasks = Vec::new();

	for round in 0..9 {
		let service = h.service.clone();
		let location_id = location_ids[round % location_ids.len()];

		tasks.push(tokio::spawn(async move { service.place_thing(thing_id, location_id).await }));
	}
	for task in tasks {
		task.await.expect("Task panicked.").expect("Place failed.");
	}

	let current = h
		.service
		.current_placement(thing_id)
		.await
		.expect("Lookup failed.")
		.expect("Item must be placed.");
	let location = h.service.get_location(current.location_id).await.expect("Lookup failed.");
	let entry = h.index.entry(thing_id).expect("Missing index entry.");

	assert_eq!(entry.payload.location_path.as_deref(), Some(location.path.as_str()));

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn removing_a_placement_unplaces_once() {
	let Some(h) = harness("removing_a_placement_unplaces_once").await else {
		return;
	};
	let shelf = h.service.create_location("Shelf", None).await.expect("Create failed.");
	let item = h.service.register_thing("Book", None).await.expect("Register failed.");
	let thing_id = item.thing.thing_id;

	h.service.place_thing(thing_id, shelf.location_id).await.expect("Place failed.");

	assert_eq!(h.service.remove_placement(thing_id).await.expect("Remove failed."), 1);
	assert_eq!(h.service.remove_placement(thing_id).await.expect("Remove failed."), 0);
	assert_eq!(h.service.current_placement(thing_id).await.expect("Lookup failed."), None);
	assert_eq!(
		h.index.entry(thing_id).expect("Missing index entry.").payload.location_path,
		None
	);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn placing_needs_both_sides_to_exist() {
	let Some(h) = harness("placing_needs_both_sides_to_exist").await else {
		return;
	};
	let shelf = h.service.create_location("Shelf", None).await.expect("Create failed.");
	let item = h.service.register_thing("Book", None).await.expect("Register failed.");
	let err = h
		.service
		.place_thing(item.thing.thing_id, Uuid::new_v4())
		.await
		.expect_err("Expected a missing location.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	let err = h
		.service
		.place_thing(Uuid::new_v4(), shelf.location_id)
		.await
		.expect_err("Expected a missing item.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}
