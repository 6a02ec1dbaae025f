//! Temporary identifiers for entities the server has not acknowledged yet.

use uuid::Uuid;

pub const TEMP_ID_PREFIX: &str = "temp-";

/// Generate a fresh `temp-<uuid>` identifier.
pub fn new_temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4().simple())
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_temp_ids_are_prefixed_and_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_temp_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| is_temp_id(id)));
    }

    #[test]
    fn test_server_ids_are_not_temporary() {
        assert!(!is_temp_id("6f1c2a"));
        assert!(!is_temp_id("template-1"));
    }
}
