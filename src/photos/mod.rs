// SPDX-License-Identifier: GPL-3.0-only
pub mod client;
pub mod naming;
pub mod reformat;
pub mod traits;

pub use client::HttpPhotoFetcher;
pub use reformat::PhotoFormat;
pub use traits::PhotoFetcher;
