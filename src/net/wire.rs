//! JSON payloads of the simulation server.
//!
//! Every feed answers `{ "positions": [ ... ] }`. Ids are mesa agent ids,
//! which arrive either as strings (`"car_3"`) or bare integers.

use serde::{Deserialize, Deserializer};

use crate::engine::snapshot::{wire_to_render, AgentSnapshot, ObstacleSnapshot, SignalSnapshot};

/// Envelope shared by all position feeds.
#[derive(Debug, Deserialize)]
pub struct PositionsPayload<T> {
    pub positions: Vec<T>,
}

/// `/getAgents` entry.
#[derive(Debug, Deserialize)]
pub struct AgentRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub arrived: bool,
}

/// `/getSemaphores` entry.
#[derive(Debug, Deserialize)]
pub struct SignalRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    pub state: bool,
}

/// `/getObstacles` entry.
#[derive(Debug, Deserialize)]
pub struct ObstacleRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl From<AgentRecord> for AgentSnapshot {
    fn from(r: AgentRecord) -> Self {
        Self { id: r.id, position: wire_to_render(r.x, r.y, r.z), arrived: r.arrived }
    }
}

impl From<SignalRecord> for SignalSnapshot {
    fn from(r: SignalRecord) -> Self {
        Self { id: r.id, position: wire_to_render(r.x, r.y, r.z), active: r.state }
    }
}

impl From<ObstacleRecord> for ObstacleSnapshot {
    fn from(r: ObstacleRecord) -> Self {
        Self { id: r.id, position: wire_to_render(r.x, r.y, r.z) }
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

/// Parse one feed body into render-space snapshots.
pub fn parse_positions<R, S>(body: &str) -> Result<Vec<S>, serde_json::Error>
where
    R: for<'de> Deserialize<'de>,
    S: From<R>,
{
    let payload: PositionsPayload<R> = serde_json::from_str(body)?;
    Ok(payload.positions.into_iter().map(S::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn agents_are_remapped_to_render_space() {
        let json = r#"{"positions": [
            {"id": "car_0", "x": 1, "y": 0, "z": 1, "arrived": false},
            {"id": 12, "x": 3.5, "y": 7}
        ]}"#;

        let agents: Vec<AgentSnapshot> = parse_positions::<AgentRecord, _>(json).unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].id, "car_0");
        assert_eq!(agents[0].position, Vec3::new(1.0, 1.0, 0.0));
        assert!(!agents[0].arrived);
        assert_eq!(agents[1].id, "12");
        assert_eq!(agents[1].position, Vec3::new(3.5, 0.0, 7.0));
    }

    #[test]
    fn departure_flag_is_carried() {
        let json = r#"{"positions": [{"id": "A1", "x": 0, "y": 0, "z": 0, "arrived": true}]}"#;
        let agents: Vec<AgentSnapshot> = parse_positions::<AgentRecord, _>(json).unwrap();
        assert!(agents[0].arrived);
    }

    #[test]
    fn signal_state_maps_to_active() {
        let json = r#"{"positions": [
            {"id": "tl_5", "x": 2, "y": 3, "state": true},
            {"id": "tl_6", "x": 2, "y": 4, "state": false}
        ]}"#;
        let signals: Vec<SignalSnapshot> = parse_positions::<SignalRecord, _>(json).unwrap();
        assert!(signals[0].active);
        assert!(!signals[1].active);
        assert_eq!(signals[1].position, Vec3::new(2.0, 0.0, 4.0));
    }

    #[test]
    fn empty_feed_is_valid() {
        let obstacles: Vec<ObstacleSnapshot> =
            parse_positions::<ObstacleRecord, _>(r#"{"positions": []}"#).unwrap();
        assert!(obstacles.is_empty());
    }

    #[test]
    fn missing_envelope_is_rejected() {
        assert!(parse_positions::<AgentRecord, AgentSnapshot>(r#"[{"id": "A1", "x": 0, "y": 0}]"#).is_err());
        assert!(parse_positions::<SignalRecord, SignalSnapshot>(r#"{"positions": [{"id": "S1", "x": 0, "y": 0}]}"#).is_err());
    }
}
