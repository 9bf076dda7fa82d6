//! Identifier newtypes.
//!
//! All ids are assigned by the room service and arrive as opaque strings.
//! Wrapping each one in its own type means a `ParticipantId` can never be
//! passed where a `PlayerId` is expected, even though both are strings
//! underneath. A player has one `PlayerId` for life; the same player gets a
//! different `ParticipantId` in every room they join.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a service-assigned id.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` for the empty id.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// A player's account-level identity.
    PlayerId
);

string_id!(
    /// One seat in one room.
    ParticipantId
);

string_id!(
    /// A room, as assigned by the service when the room is created.
    RoomId
);

string_id!(
    /// A pending invitation to a room.
    InvitationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_orders_lexicographically() {
        let mut ids = vec![
            ParticipantId::from("p_3"),
            ParticipantId::from("p_1"),
            ParticipantId::from("p_2"),
        ];
        ids.sort();
        let raw: Vec<&str> = ids.iter().map(ParticipantId::as_str).collect();
        assert_eq!(raw, ["p_1", "p_2", "p_3"]);
    }

    #[test]
    fn test_id_display_is_raw_string() {
        assert_eq!(RoomId::new("room-42").to_string(), "room-42");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&PlayerId::from("g123")).unwrap();
        assert_eq!(json, "\"g123\"");
    }
}
