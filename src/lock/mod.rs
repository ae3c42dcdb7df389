// SPDX-License-Identifier: GPL-3.0-only
pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteLock;
pub use traits::SyncLock;
