// SPDX-License-Identifier: GPL-3.0-only
pub mod context;
pub mod engine;
pub mod error;
pub mod gallery;
pub mod mapping;
pub mod scheduler;
pub mod state;

pub use context::SyncContext;
pub use engine::ReconciliationEngine;
pub use error::SyncError;
pub use scheduler::spawn_scheduler;
pub use state::RunSummary;
