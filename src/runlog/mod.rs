// SPDX-License-Identifier: GPL-3.0-only
pub mod models;
pub mod sqlite;
pub mod traits;

pub use models::RunLog;
pub use sqlite::SqliteRunLogStore;
pub use traits::RunLogStore;
