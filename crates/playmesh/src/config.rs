//! Client configuration.

use playmesh_dispatch::{DispatchConfig, FrameDriverConfig};
use playmesh_protocol::PlayerId;
use playmesh_session::SessionConfig;
use serde::Deserialize;

use crate::PlaymeshError;

/// Everything a [`RealtimeClient`](crate::RealtimeClient) can be tuned
/// with. Every field has a default, so `{}` is a valid config.
///
/// ```
/// use playmesh::ClientConfig;
///
/// let config = ClientConfig::from_json(
///     r#"{ "local_player": "g_123", "session": { "self_disconnect": "leave" } }"#,
/// ).unwrap();
/// assert_eq!(config.local_player.unwrap().as_str(), "g_123");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The signed-in player. May instead be given to the builder.
    pub local_player: Option<PlayerId>,
    pub session: SessionConfig,
    pub dispatch: DispatchConfig,
    /// Used by [`RealtimeClient::frame_driver`](crate::RealtimeClient::frame_driver).
    pub frame: FrameDriverConfig,
}

impl ClientConfig {
    /// Parses a JSON config and clamps out-of-range values.
    ///
    /// # Errors
    /// [`PlaymeshError::Config`] if `json` is not a valid config.
    pub fn from_json(json: &str) -> Result<Self, PlaymeshError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    pub fn validated(self) -> Self {
        Self {
            local_player: self.local_player,
            session: self.session.validated(),
            dispatch: self.dispatch.validated(),
            frame: self.frame.validated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmesh_session::SelfDisconnectPolicy;

    #[test]
    fn test_from_json_empty_object_is_default() {
        let config = ClientConfig::from_json("{}").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_from_json_nested_sections() {
        let config = ClientConfig::from_json(
            r#"{
                "session": { "initial_progress_percent": 10.0, "self_disconnect": "leave" },
                "dispatch": { "max_jobs_per_tick": 0 },
                "frame": { "frame_rate_hz": 1000 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.session.initial_progress_percent, 10.0);
        assert_eq!(config.session.self_disconnect, SelfDisconnectPolicy::Leave);
        assert_eq!(config.dispatch.max_jobs_per_tick, Some(1));
        assert_eq!(config.frame.frame_rate_hz, FrameDriverConfig::MAX_FRAME_RATE_HZ);
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let err = ClientConfig::from_json(r#"{ "session": 3 }"#).unwrap_err();
        assert!(matches!(err, PlaymeshError::Config(_)));
    }
}
