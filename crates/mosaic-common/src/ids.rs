//! ---
//! mosaic_section: "01-core-functionality"
//! mosaic_subsection: "module"
//! mosaic_type: "source"
//! mosaic_scope: "code"
//! mosaic_description: "Panel identity allocation helpers."
//! mosaic_version: "v0.1.0-alpha"
//! mosaic_owner: "tbd"
//! ---
use uuid::Uuid;

/// Allocate a fresh, globally unique panel identity.
///
/// Identities are opaque strings everywhere else in the workspace; hosts
/// that persist dashboards should treat them as stable keys, not parse them.
pub fn new_panel_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let first = new_panel_id();
        let second = new_panel_id();
        assert_ne!(first, second);
        assert!(!first.is_empty());
    }
}
