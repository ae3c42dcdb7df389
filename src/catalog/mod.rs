// SPDX-License-Identifier: GPL-3.0-only
pub mod client;
pub mod decode;
pub mod error;
pub mod models;
pub mod traits;

pub use client::LsiCatalogClient;
pub use error::CatalogError;
pub use models::Ad;
pub use traits::{PageQuery, PageResult, RemoteCatalog};
