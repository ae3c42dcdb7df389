// SPDX-License-Identifier: GPL-3.0-only
pub mod decorum;
pub mod fields;
pub mod realto;
pub mod registry;
pub mod traits;
pub mod wpcasa;

pub use decorum::DecorumAdapter;
pub use realto::RealtoAdapter;
pub use registry::select_adapter;
pub use traits::{HostInfo, ThemeAdapter};
pub use wpcasa::WpCasaAdapter;
