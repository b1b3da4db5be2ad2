use serde::{Deserialize, Serialize};

use crate::{Result, ShelfService, Thing};
use shelf_storage::things;

const REBUILD_PAGE_SIZE: i64 = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub rebuilt_count: u64,
	pub error_count: u64,
}

impl ShelfService {
	/// Re-embeds every item and rewrites its `text` index entry with the current payload.
	///
	/// Per-item failures are counted and logged; only a failing page read aborts the run.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		let mut report = RebuildReport::default();
		let mut offset = 0_i64;

		loop {
			let rows = things::list_things(&self.db.pool, offset, REBUILD_PAGE_SIZE).await?;
			let page_len = rows.len() as i64;

			for row in rows {
				let thing_id = row.thing_id;
				let indexed = match Thing::try_from(row) {
					Ok(thing) => self.index_text(&thing).await,
					Err(err) => Err(err),
				};

				match indexed {
					Ok(()) => report.rebuilt_count += 1,
					Err(err) => {
						tracing::error!(
							thing_id = %thing_id,
							error = %err,
							"Failed to rebuild index entry."
						);

						report.error_count += 1;
					},
				}
			}

			if page_len < REBUILD_PAGE_SIZE {
				break;
			}

			offset += page_len;
		}

		tracing::info!(
			rebuilt_count = report.rebuilt_count,
			error_count = report.error_count,
			"Index rebuild finished."
		);

		Ok(report)
	}
}
