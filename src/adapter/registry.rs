// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapter::traits::{HostInfo, ThemeAdapter};
use crate::adapter::{DecorumAdapter, RealtoAdapter, WpCasaAdapter};

pub struct AdapterRegistration {
    pub name: &'static str,
    pub check_compatibility: fn(&HostInfo) -> bool,
    pub build: fn() -> Arc<dyn ThemeAdapter>,
}

/// Known adapters, in probing order
pub const ADAPTERS: &[AdapterRegistration] = &[
    AdapterRegistration {
        name: "decorum",
        check_compatibility: DecorumAdapter::check_compatibility,
        build: build_decorum,
    },
    AdapterRegistration {
        name: "realto",
        check_compatibility: RealtoAdapter::check_compatibility,
        build: build_realto,
    },
    AdapterRegistration {
        name: "wpcasa",
        check_compatibility: WpCasaAdapter::check_compatibility,
        build: build_wpcasa,
    },
];

fn build_decorum() -> Arc<dyn ThemeAdapter> {
    Arc::new(DecorumAdapter)
}

fn build_realto() -> Arc<dyn ThemeAdapter> {
    Arc::new(RealtoAdapter)
}

fn build_wpcasa() -> Arc<dyn ThemeAdapter> {
    Arc::new(WpCasaAdapter)
}

/// First registered adapter compatible with the host
pub fn select_adapter(host: &HostInfo) -> Option<Arc<dyn ThemeAdapter>> {
    select_from(ADAPTERS, host)
}

fn select_from(registrations: &[AdapterRegistration], host: &HostInfo) -> Option<Arc<dyn ThemeAdapter>> {
    for registration in registrations {
        if (registration.check_compatibility)(host) {
            info!(adapter = registration.name, "Selected theme adapter");
            return Some((registration.build)());
        }
        debug!(adapter = registration.name, "Theme adapter not compatible");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(theme: &str) -> HostInfo {
        HostInfo {
            theme: Some(theme.to_string()),
        }
    }

    #[test]
    fn test_select_by_theme() {
        assert_eq!(select_adapter(&host("realto")).unwrap().name(), "realto");
        assert_eq!(select_adapter(&host("Decorum")).unwrap().name(), "decorum");
        assert_eq!(select_adapter(&host("wpsight")).unwrap().name(), "wpcasa");
        assert!(select_adapter(&host("twentytwenty")).is_none());
        assert!(select_adapter(&HostInfo::default()).is_none());
    }

    #[test]
    fn test_first_compatible_wins() {
        let registrations = [
            AdapterRegistration {
                name: "never",
                check_compatibility: |_| false,
                build: build_decorum,
            },
            AdapterRegistration {
                name: "always-a",
                check_compatibility: |_| true,
                build: build_realto,
            },
            AdapterRegistration {
                name: "always-b",
                check_compatibility: |_| true,
                build: build_wpcasa,
            },
        ];

        let adapter = select_from(&registrations, &HostInfo::default()).unwrap();
        assert_eq!(adapter.name(), "realto");
    }
}
