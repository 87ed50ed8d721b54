use serde::Serialize;

use super::cluster::ClusterId;
use super::EntityId;

/// Something that happened during a tick, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Grabbed {
        entities: Vec<EntityId>,
    },
    Thrown {
        entities: Vec<EntityId>,
        target: [f32; 3],
        /// Cluster picked by auto-aim, if any.
        cluster: Option<ClusterId>,
    },
    AgentKilled {
        agent: EntityId,
        cluster: ClusterId,
        killer: EntityId,
        dead_body: EntityId,
    },
    Hit {
        recent_hits: usize,
    },
    Combo {
        recent_hits: usize,
    },
    Despawned {
        entity: EntityId,
    },
    ClusterEmptied {
        cluster: ClusterId,
    },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Grabbed { .. } => "grabbed",
            GameEvent::Thrown { .. } => "thrown",
            GameEvent::AgentKilled { .. } => "agent_killed",
            GameEvent::Hit { .. } => "hit",
            GameEvent::Combo { .. } => "combo",
            GameEvent::Despawned { .. } => "despawned",
            GameEvent::ClusterEmptied { .. } => "cluster_emptied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(GameEvent::Thrown {
            entities: vec![4, 5],
            target: [1.0, 2.0, 3.0],
            cluster: None,
        })
        .unwrap();
        assert_eq!(json["event"], "thrown");
        assert_eq!(json["entities"], serde_json::json!([4, 5]));
        assert!(json["cluster"].is_null());
    }

    #[test]
    fn test_name_matches_serde_tag() {
        let event = GameEvent::ClusterEmptied { cluster: 2 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
