//! Decoding of Census streaming messages into [`FeedEvent`]s.
//!
//! The streaming API wraps every event in an envelope:
//!
//! ```json
//! {
//!   "service": "event",
//!   "type": "serviceMessage",
//!   "payload": {
//!     "event_name": "GainExperience",
//!     "character_id": "5428010618015189713",
//!     "experience_id": "53",
//!     "amount": "75",
//!     "timestamp": "1714594440",
//!     ...
//!   }
//! }
//! ```
//!
//! All numeric payload fields arrive as strings. Heartbeats, subscription
//! echoes and event names the trackers do not consume decode to `None`.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::domain::{CharacterId, FacilityId, FeedEvent, WorldId, ZoneId};
use crate::error::WireError;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    message_type: String,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event_name")]
enum Payload {
    PlayerLogin {
        #[serde(deserialize_with = "num")]
        character_id: u64,
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    PlayerLogout {
        #[serde(deserialize_with = "num")]
        character_id: u64,
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    GainExperience {
        #[serde(deserialize_with = "num")]
        character_id: u64,
        #[serde(deserialize_with = "num", default)]
        other_id: u64,
        #[serde(deserialize_with = "num")]
        experience_id: u32,
        #[serde(deserialize_with = "num")]
        amount: u32,
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num", default)]
        zone_id: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    Death {
        #[serde(deserialize_with = "num")]
        character_id: u64,
        #[serde(deserialize_with = "num", default)]
        attacker_character_id: u64,
        #[serde(deserialize_with = "num", default)]
        attacker_vehicle_id: u32,
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num", default)]
        zone_id: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    PlayerFacilityCapture {
        #[serde(deserialize_with = "num")]
        character_id: u64,
        #[serde(deserialize_with = "num")]
        facility_id: u32,
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num", default)]
        zone_id: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    PlayerFacilityDefend {
        #[serde(deserialize_with = "num")]
        character_id: u64,
        #[serde(deserialize_with = "num")]
        facility_id: u32,
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num", default)]
        zone_id: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    ContinentLock {
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num")]
        zone_id: u32,
        #[serde(deserialize_with = "num", default)]
        triggering_faction: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    FacilityControl {
        #[serde(deserialize_with = "num")]
        facility_id: u32,
        #[serde(deserialize_with = "num")]
        world_id: u32,
        #[serde(deserialize_with = "num")]
        zone_id: u32,
        #[serde(deserialize_with = "num", default)]
        old_faction_id: u32,
        #[serde(deserialize_with = "num")]
        new_faction_id: u32,
        #[serde(deserialize_with = "num")]
        timestamp: i64,
    },
    #[serde(other)]
    Unsupported,
}

/// Decodes one raw streaming message.
///
/// Returns `Ok(None)` for messages that carry no consumable event.
///
/// # Errors
///
/// Returns [`WireError::Malformed`] for invalid JSON or missing fields and
/// [`WireError::InvalidField`] for out-of-range timestamps.
pub fn decode_message(text: &str) -> Result<Option<FeedEvent>, WireError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    if envelope.message_type != "serviceMessage" {
        tracing::trace!(message_type = %envelope.message_type, "skipping non-event message");
        return Ok(None);
    }
    let Some(payload) = envelope.payload else {
        return Ok(None);
    };
    decode_payload(payload)
}

/// Decodes an already-unwrapped event payload.
///
/// # Errors
///
/// Same as [`decode_message`].
pub fn decode_payload(payload: serde_json::Value) -> Result<Option<FeedEvent>, WireError> {
    let payload: Payload = serde_json::from_value(payload)?;
    let event = match payload {
        Payload::PlayerLogin {
            character_id,
            world_id,
            timestamp,
        } => FeedEvent::PlayerLogin {
            character_id: CharacterId(character_id),
            world_id: WorldId(world_id),
            timestamp: to_utc(timestamp)?,
        },
        Payload::PlayerLogout {
            character_id,
            world_id,
            timestamp,
        } => FeedEvent::PlayerLogout {
            character_id: CharacterId(character_id),
            world_id: WorldId(world_id),
            timestamp: to_utc(timestamp)?,
        },
        Payload::GainExperience {
            character_id,
            other_id,
            experience_id,
            amount,
            world_id,
            zone_id,
            timestamp,
        } => FeedEvent::GainExperience {
            character_id: CharacterId(character_id),
            other_id: CharacterId(other_id),
            experience_id,
            amount,
            world_id: WorldId(world_id),
            zone_id: ZoneId(zone_id),
            timestamp: to_utc(timestamp)?,
        },
        Payload::Death {
            character_id,
            attacker_character_id,
            attacker_vehicle_id,
            world_id,
            zone_id,
            timestamp,
        } => FeedEvent::Death {
            character_id: CharacterId(character_id),
            attacker_character_id: CharacterId(attacker_character_id),
            attacker_vehicle_id,
            world_id: WorldId(world_id),
            zone_id: ZoneId(zone_id),
            timestamp: to_utc(timestamp)?,
        },
        Payload::PlayerFacilityCapture {
            character_id,
            facility_id,
            world_id,
            zone_id,
            timestamp,
        } => FeedEvent::PlayerFacilityCapture {
            character_id: CharacterId(character_id),
            facility_id: FacilityId(facility_id),
            world_id: WorldId(world_id),
            zone_id: ZoneId(zone_id),
            timestamp: to_utc(timestamp)?,
        },
        Payload::PlayerFacilityDefend {
            character_id,
            facility_id,
            world_id,
            zone_id,
            timestamp,
        } => FeedEvent::PlayerFacilityDefend {
            character_id: CharacterId(character_id),
            facility_id: FacilityId(facility_id),
            world_id: WorldId(world_id),
            zone_id: ZoneId(zone_id),
            timestamp: to_utc(timestamp)?,
        },
        Payload::ContinentLock {
            world_id,
            zone_id,
            triggering_faction,
            timestamp,
        } => FeedEvent::ContinentLock {
            world_id: WorldId(world_id),
            zone_id: ZoneId(zone_id),
            triggering_faction,
            timestamp: to_utc(timestamp)?,
        },
        Payload::FacilityControl {
            facility_id,
            world_id,
            zone_id,
            old_faction_id,
            new_faction_id,
            timestamp,
        } => FeedEvent::FacilityControl {
            facility_id: FacilityId(facility_id),
            world_id: WorldId(world_id),
            zone_id: ZoneId(zone_id),
            old_faction_id,
            new_faction_id,
            timestamp: to_utc(timestamp)?,
        },
        Payload::Unsupported => return Ok(None),
    };
    Ok(Some(event))
}

fn to_utc(secs: i64) -> Result<DateTime<Utc>, WireError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| WireError::InvalidField {
        field: "timestamp",
        value: secs.to_string(),
    })
}

/// Accepts a number either as a JSON string (Census style) or a JSON number.
fn num<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + TryFrom<u64>,
    T::Err: std::fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.trim().parse().map_err(de::Error::custom),
        Raw::Number(n) => {
            T::try_from(n).map_err(|_| de::Error::custom(format!("number {n} out of range")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_message(payload: serde_json::Value) -> String {
        json!({ "service": "event", "type": "serviceMessage", "payload": payload }).to_string()
    }

    #[test]
    fn decodes_gain_experience_with_string_numbers() {
        let text = service_message(json!({
            "event_name": "GainExperience",
            "character_id": "5428010618015189713",
            "other_id": "5428010618015189714",
            "experience_id": "53",
            "amount": "75",
            "world_id": "1",
            "zone_id": "2",
            "loadout_id": "4",
            "timestamp": "1714594440"
        }));
        let Ok(Some(event)) = decode_message(&text) else {
            panic!("expected an event");
        };
        let FeedEvent::GainExperience {
            character_id,
            experience_id,
            amount,
            timestamp,
            ..
        } = event
        else {
            panic!("wrong variant");
        };
        assert_eq!(character_id, CharacterId(5_428_010_618_015_189_713));
        assert_eq!(experience_id, 53);
        assert_eq!(amount, 75);
        assert_eq!(timestamp.timestamp(), 1_714_594_440);
    }

    #[test]
    fn decodes_facility_control() {
        let text = service_message(json!({
            "event_name": "FacilityControl",
            "facility_id": "7801",
            "world_id": "1",
            "zone_id": "2",
            "old_faction_id": "1",
            "new_faction_id": 2,
            "duration_held": "3600",
            "outfit_id": "0",
            "timestamp": "1714594440"
        }));
        let Ok(Some(FeedEvent::FacilityControl {
            facility_id,
            new_faction_id,
            ..
        })) = decode_message(&text)
        else {
            panic!("expected a facility control event");
        };
        assert_eq!(facility_id, FacilityId(7801));
        assert_eq!(new_faction_id, 2);
    }

    #[test]
    fn heartbeat_decodes_to_none() {
        let text = json!({
            "online": { "EventServerEndpoint_Connery_1": "true" },
            "service": "event",
            "type": "heartbeat"
        })
        .to_string();
        assert!(matches!(decode_message(&text), Ok(None)));
    }

    #[test]
    fn unsupported_event_decodes_to_none() {
        let text = service_message(json!({
            "event_name": "VehicleDestroy",
            "character_id": "1",
            "timestamp": "1714594440"
        }));
        assert!(matches!(decode_message(&text), Ok(None)));
    }

    #[test]
    fn missing_field_is_malformed() {
        let text = service_message(json!({
            "event_name": "PlayerLogin",
            "world_id": "1",
            "timestamp": "1714594440"
        }));
        assert!(matches!(decode_message(&text), Err(WireError::Malformed(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(decode_message("{not json"), Err(WireError::Malformed(_))));
    }
}
