//! Fallback player identities.

use uuid::Uuid;

use crate::game::entities::PlayerId;

/// Prefix that marks a participant id as a fallback player.
pub const FALLBACK_ID_PREFIX: &str = "bot-";

/// Generates a fresh fallback id: the prefix plus 8 hex characters.
pub fn fallback_id() -> PlayerId {
    let suffix = Uuid::new_v4().simple().to_string();
    PlayerId::new(&format!("{FALLBACK_ID_PREFIX}{}", &suffix[..8]))
}

/// Whether `id` belongs to a fallback player rather than a person.
pub fn is_fallback_id(id: &PlayerId) -> bool {
    id.as_str().starts_with(FALLBACK_ID_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fallback_id_shape() {
        let id = fallback_id();
        assert!(is_fallback_id(&id));
        assert_eq!(id.as_str().len(), FALLBACK_ID_PREFIX.len() + 8);
        assert!(id.as_str()[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fallback_ids_are_unique() {
        let ids: HashSet<PlayerId> = (0..100).map(|_| fallback_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_real_players_are_not_fallbacks() {
        assert!(!is_fallback_id(&PlayerId::new("alice")));
        assert!(!is_fallback_id(&PlayerId::new("robot-1")));
    }
}
