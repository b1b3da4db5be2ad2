use std::collections::HashMap;

use shelf_service::{Error, ShelfService};

use super::harness;

async fn paths(service: &ShelfService) -> Vec<String> {
	service
		.list_locations()
		.await
		.expect("Failed to list locations.")
		.into_iter()
		.map(|location| location.path)
		.collect()
}

async fn assert_paths_follow_parents(service: &ShelfService) {
	let locations = service.list_locations().await.expect("Failed to list locations.");
	let by_id: HashMap<_, _> =
		locations.iter().map(|location| (location.location_id, location)).collect();

	for location in &locations {
		let expected = match location.parent_id {
			Some(parent_id) => format!("{}/{}", by_id[&parent_id].path, location.name),
			None => format!("/{}", location.name),
		};

		assert_eq!(location.path, expected, "Stale path for {}.", location.name);
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn renaming_a_root_rewrites_descendant_paths() {
	let Some(h) = harness("renaming_a_root_rewrites_descendant_paths").await else {
		return;
	};
	let home = h.service.create_location("Home", None).await.expect("Create failed.");
	let kitchen =
		h.service.create_location("Kitchen", Some(home.location_id)).await.expect("Create failed.");

	assert_eq!(home.path, "/Home");
	assert_eq!(kitchen.path, "/Home/Kitchen");

	let house = h.service.rename_location(home.location_id, "House").await.expect("Rename failed.");
	let kitchen = h.service.get_location(kitchen.location_id).await.expect("Lookup failed.");

	assert_eq!(house.path, "/House");
	assert_eq!(kitchen.path, "/House/Kitchen");
	assert_eq!(
		h.service
			.get_location_by_path("/House/Kitchen/")
			.await
			.expect("Path lookup failed.")
			.location_id,
		kitchen.location_id
	);

	let err = h.service.get_location_by_path("/Home").await.expect_err("Old path must be gone.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn moving_a_subtree_changes_nothing_outside_it() {
	let Some(h) = harness("moving_a_subtree_changes_nothing_outside_it").await else {
		return;
	};
	let home = h.service.create_location("Home", None).await.expect("Create failed.");
	let kitchen =
		h.service.create_location("Kitchen", Some(home.location_id)).await.expect("Create failed.");

	h.service.create_location("Drawer", Some(kitchen.location_id)).await.expect("Create failed.");
	h.service.create_location("Office", Some(home.location_id)).await.expect("Create failed.");

	let garage = h.service.create_location("Garage", None).await.expect("Create failed.");
	let moved = h
		.service
		.move_location(kitchen.location_id, Some(garage.location_id))
		.await
		.expect("Move failed.");

	assert_eq!(moved.parent_id, Some(garage.location_id));
	assert_eq!(
		paths(&h.service).await,
		vec!["/Garage", "/Garage/Kitchen", "/Garage/Kitchen/Drawer", "/Home", "/Home/Office"]
	);

	let subtree = h.service.get_subtree(garage.location_id).await.expect("Subtree failed.");

	assert_eq!(subtree.len(), 3);
	assert!(subtree.iter().all(|location| location.path.starts_with("/Garage")));

	let to_root = h.service.move_location(kitchen.location_id, None).await.expect("Move failed.");

	assert_eq!(to_root.path, "/Kitchen");
	assert_eq!(to_root.parent_id, None);

	let roots: Vec<String> = h
		.service
		.get_children(None)
		.await
		.expect("Failed to list roots.")
		.into_iter()
		.map(|location| location.name)
		.collect();

	assert_eq!(roots, vec!["Garage", "Home", "Kitchen"]);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn moving_under_self_or_a_descendant_is_rejected() {
	let Some(h) = harness("moving_under_self_or_a_descendant_is_rejected").await else {
		return;
	};
	let home = h.service.create_location("Home", None).await.expect("Create failed.");
	let kitchen =
		h.service.create_location("Kitchen", Some(home.location_id)).await.expect("Create failed.");
	let drawer = h
		.service
		.create_location("Drawer", Some(kitchen.location_id))
		.await
		.expect("Create failed.");
	let before = paths(&h.service).await;

	for target in [home.location_id, kitchen.location_id, drawer.location_id] {
		let err = h
			.service
			.move_location(home.location_id, Some(target))
			.await
			.expect_err("Expected a cycle conflict.");

		assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");
	}

	assert_eq!(paths(&h.service).await, before);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn sibling_names_are_unique() {
	let Some(h) = harness("sibling_names_are_unique").await else {
		return;
	};
	let home = h.service.create_location("Home", None).await.expect("Create failed.");
	let kitchen =
		h.service.create_location("Kitchen", Some(home.location_id)).await.expect("Create failed.");
	let err = h
		.service
		.create_location("Kitchen", Some(home.location_id))
		.await
		.expect_err("Expected a sibling conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");

	let err = h.service.create_location("Home", None).await.expect_err("Expected a conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");

	let office =
		h.service.create_location("Office", Some(home.location_id)).await.expect("Create failed.");
	let err = h
		.service
		.rename_location(office.location_id, "Kitchen")
		.await
		.expect_err("Expected a rename conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");

	let garage = h.service.create_location("Garage", None).await.expect("Create failed.");
	let stray = h
		.service
		.create_location("Kitchen", Some(garage.location_id))
		.await
		.expect("Same name under another parent is allowed.");
	let err = h
		.service
		.move_location(stray.location_id, Some(home.location_id))
		.await
		.expect_err("Expected a move conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");
	assert_eq!(
		h.service.get_location(kitchen.location_id).await.expect("Lookup failed.").path,
		"/Home/Kitchen"
	);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn malformed_names_and_missing_parents_are_rejected() {
	let Some(h) = harness("malformed_names_and_missing_parents_are_rejected").await else {
		return;
	};

	for name in ["", "   ", "a/b"] {
		let err = h.service.create_location(name, None).await.expect_err("Expected a rejection.");

		assert!(matches!(err, Error::Validation { .. }), "Unexpected error: {err:?}");
	}

	let err = h
		.service
		.create_location("Kitchen", Some(uuid::Uuid::new_v4()))
		.await
		.expect_err("Expected a missing parent.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	let home = h.service.create_location("Home", None).await.expect("Create failed.");
	let err = h
		.service
		.move_location(home.location_id, Some(uuid::Uuid::new_v4()))
		.await
		.expect_err("Expected a missing parent.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn locations_with_children_cannot_be_deleted() {
	let Some(h) = harness("locations_with_children_cannot_be_deleted").await else {
		return;
	};
	let home = h.service.create_location("Home", None).await.expect("Create failed.");

	h.service.create_location("Kitchen", Some(home.location_id)).await.expect("Create failed.");

	for force in [false, true] {
		let err = h
			.service
			.delete_location(home.location_id, force)
			.await
			.expect_err("Expected a children conflict.");

		assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");
	}

	assert_eq!(paths(&h.service).await, vec!["/Home", "/Home/Kitchen"]);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn force_delete_unplaces_items() {
	let Some(h) = harness("force_delete_unplaces_items").await else {
		return;
	};
	let shelf = h.service.create_location("Shelf", None).await.expect("Create failed.");
	let item = h.service.register_thing("Red mug", None).await.expect("Register failed.");
	let thing_id = item.thing.thing_id;

	h.service.place_thing(thing_id, shelf.location_id).await.expect("Place failed.");

	let err = h
		.service
		.delete_location(shelf.location_id, false)
		.await
		.expect_err("Expected a placement conflict.");

	assert!(matches!(err, Error::Conflict { .. }), "Unexpected error: {err:?}");

	let deactivated =
		h.service.delete_location(shelf.location_id, true).await.expect("Force delete failed.");

	assert_eq!(deactivated, 1);
	assert_eq!(h.service.current_placement(thing_id).await.expect("Lookup failed."), None);
	assert_eq!(h.service.placement_history(thing_id).await.expect("History failed.").len(), 1);
	assert_eq!(
		h.index.entry(thing_id).expect("Missing index entry.").payload.location_path,
		None
	);

	let err = h.service.get_location(shelf.location_id).await.expect_err("Location must be gone.");

	assert!(matches!(err, Error::NotFound { .. }), "Unexpected error: {err:?}");

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn subtree_rewrites_refresh_index_locations() {
	let Some(h) = harness("subtree_rewrites_refresh_index_locations").await else {
		return;
	};
	let home = h.service.create_location("Home", None).await.expect("Create failed.");
	let kitchen =
		h.service.create_location("Kitchen", Some(home.location_id)).await.expect("Create failed.");
	let item = h.service.register_thing("Whisk", None).await.expect("Register failed.");
	let thing_id = item.thing.thing_id;

	h.service.place_thing(thing_id, kitchen.location_id).await.expect("Place failed.");

	assert_eq!(
		h.index.entry(thing_id).expect("Missing index entry.").payload.location_path.as_deref(),
		Some("/Home/Kitchen")
	);

	h.service.rename_location(home.location_id, "House").await.expect("Rename failed.");

	assert_eq!(
		h.index.entry(thing_id).expect("Missing index entry.").payload.location_path.as_deref(),
		Some("/House/Kitchen")
	);

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn crossed_concurrent_moves_cannot_form_a_cycle() {
	let Some(h) = harness("crossed_concurrent_moves_cannot_form_a_cycle").await else {
		return;
	};
	let a = h.service.create_location("A", None).await.expect("Create failed.");
	let b = h.service.create_location("B", None).await.expect("Create failed.");

	let (a_id, b_id) = (a.location_id, b.location_id);

	h.service.create_location("Inner", Some(a_id)).await.expect("Create failed.");
	h.service.create_location("Inner", Some(b_id)).await.expect("Create failed.");

	let a_under_b = {
		let service = h.service.clone();

		tokio::spawn(async move { service.move_location(a_id, Some(b_id)).await })
	};
	let b_under_a = {
		let service = h.service.clone();

		tokio::spawn(async move { service.move_location(b_id, Some(a_id)).await })
	};
	let outcomes = [
		a_under_b.await.expect("Task panicked."),
		b_under_a.await.expect("Task panicked."),
	];
	let conflicts =
		outcomes.iter().filter(|outcome| matches!(outcome, Err(Error::Conflict { .. }))).count();

	assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
	assert_eq!(conflicts, 1, "Unexpected outcomes: {outcomes:?}");

	let roots = h.service.get_children(None).await.expect("Failed to list roots.");

	assert_eq!(roots.len(), 1);
	assert_eq!(h.service.list_locations().await.expect("Listing failed.").len(), 4);

	assert_paths_follow_parents(&h.service).await;

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires external Postgres. Set SHELF_PG_DSN to run."]
async fn concurrent_renames_of_parent_and_child_keep_paths_consistent() {
	let Some(h) = harness("concurrent_renames_of_parent_and_child_keep_paths_consistent").await
	else {
		return;
	};
	let home = h.service.create_location("Home", None).await.expect("Create failed.");
	let kitchen =
		h.service.create_location("Kitchen", Some(home.location_id)).await.expect("Create failed.");
	let drawer = h
		.service
		.create_location("Drawer", Some(kitchen.location_id))
		.await
		.expect("Create failed.");
	let mut tasks = Vec::new();

	for round in 0..6 {
		let service = h.service.clone();
		let (location_id, name) = if round % 2 == 0 {
			(home.location_id, format!("Home{round}"))
		} else {
			(kitchen.location_id, format!("Kitchen{round}"))
		};

		tasks.push(tokio::spawn(async move { service.rename_location(location_id, &name).await }));
	}
	for task in tasks {
		task.await.expect("Task panicked.").expect("Rename failed.");
	}

	assert_paths_follow_parents(&h.service).await;

	let drawer = h.service.get_location(drawer.location_id).await.expect("Lookup failed.");
	let kitchen = h.service.get_location(kitchen.location_id).await.expect("Lookup failed.");

	assert_eq!(drawer.path, format!("{}/Drawer", kitchen.path));

	h.test_db.cleanup().await.expect("Failed to cleanup test database.");
}
