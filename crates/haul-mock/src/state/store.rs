//! In-memory tables behind the mock backends, using DashMap.

use dashmap::DashMap;
use haul_core::agent_number;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Cargo ids known to the airport mock and whether each is delayed.
const SEED_CARGO: [(&str, bool); 9] = [
    ("d0bea113-d248-457e-80b4-f4a2bf8703a5", true),
    ("fc6c885c-f897-412d-a408-9ba9108a5887", false),
    ("7752d9bb-4baa-4781-aeeb-d754924b81b6", true),
    ("349e514c-7ae5-4d45-992f-d0167b202254", false),
    ("97f91c16-700a-420d-8fec-04fb8dd89927", true),
    ("00168a2b-2593-4ec1-8623-64a27f6c897f", false),
    ("4fde4c75-d97c-41c2-8735-6adfe2c7f11c", true),
    ("3e77150a-2fc3-4fdb-a211-13948aa69abd", false),
    ("72ec6484-33e9-4f20-b42a-703ade53e00d", true),
];

const SEED_PARKING: [(&str, u32); 5] = [("A", 10), ("B", 0), ("C", 1), ("D", 100), ("E", 5)];

/// Signal rotation handed out when an agent has no override.
const SIGNAL_ROTATION: [(&str, &str); 5] = [
    ("Speed up! Green signal ahead", "G"),
    ("Caution ahead", "Y"),
    ("Heavy traffic ahead", "R"),
    ("Maintain lane for 1 mile", "Y"),
    ("Clear road ahead", "G"),
];

/// Airport answer for one cargo lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoStatus {
    pub action: String,
    pub message: String,
}

/// DALI answer for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub message: String,
    pub agent_state: String,
}

/// Snapshot of the admin-editable tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminState {
    pub terminal_parking: BTreeMap<String, u32>,
    pub cargo_delay_status: BTreeMap<String, bool>,
    pub agent_overrides: BTreeMap<String, AgentReply>,
}

/// Application state - thread-safe tables for the airport and DALI mocks.
pub struct MockState {
    cargo_delay: DashMap<String, bool>,
    terminal_parking: DashMap<String, u32>,
    agent_overrides: DashMap<String, AgentReply>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    pub fn new() -> Self {
        Self {
            cargo_delay: SEED_CARGO
                .iter()
                .map(|(id, delayed)| (id.to_string(), *delayed))
                .collect(),
            terminal_parking: SEED_PARKING
                .iter()
                .map(|(terminal, spots)| (terminal.to_string(), *spots))
                .collect(),
            agent_overrides: DashMap::new(),
        }
    }

    /// Decide the airport action for a cargo at a terminal.
    ///
    /// Unknown cargo counts as on time; unknown terminals have no parking.
    pub fn cargo_status(&self, cargo_id: &str, terminal: &str) -> CargoStatus {
        let terminal = terminal.to_uppercase();
        let delayed = self.cargo_delay.get(cargo_id).map(|d| *d).unwrap_or(false);
        let parking = self
            .terminal_parking
            .get(&terminal)
            .map(|spots| *spots > 0)
            .unwrap_or(false);

        let (action, message) = match (delayed, parking) {
            (false, true) => (
                "Bay_Area",
                format!("Aircraft is on time. Proceed to Bay Area at Terminal {}.", terminal),
            ),
            (false, false) => (
                "Parking",
                format!(
                    "Aircraft is on time but no bay available. Parking available at Terminal {}.",
                    terminal
                ),
            ),
            (true, true) => (
                "Parking",
                format!("Aircraft delayed. Parking available at Terminal {}.", terminal),
            ),
            (true, false) => (
                "Pull_Up",
                "Aircraft delayed & no parking available. Pull over near rest area!".to_string(),
            ),
        };

        CargoStatus {
            action: action.to_string(),
            message,
        }
    }

    /// Update spots for known terminals; returns how many were changed.
    pub fn update_parking(&self, updates: &HashMap<String, u32>) -> usize {
        updates
            .iter()
            .filter_map(|(terminal, spots)| {
                self.terminal_parking
                    .get_mut(&terminal.to_uppercase())
                    .map(|mut entry| *entry = *spots)
            })
            .count()
    }

    /// Update delay flags for known cargo ids; returns how many were changed.
    pub fn update_delay(&self, updates: &HashMap<String, bool>) -> usize {
        updates
            .iter()
            .filter_map(|(cargo_id, delayed)| {
                self.cargo_delay
                    .get_mut(cargo_id)
                    .map(|mut entry| *entry = *delayed)
            })
            .count()
    }

    pub fn set_agent_override(&self, agent_code: &str, reply: AgentReply) {
        self.agent_overrides.insert(agent_code.to_string(), reply);
    }

    pub fn clear_agent_override(&self, agent_code: &str) -> bool {
        self.agent_overrides.remove(agent_code).is_some()
    }

    /// Signal for an agent: its override, else the rotation entry for its number.
    pub fn agent_reply(&self, agent_code: &str) -> AgentReply {
        if let Some(reply) = self.agent_overrides.get(agent_code) {
            return reply.clone();
        }

        let slot = agent_number(agent_code)
            .map(|n| n.saturating_sub(1) as usize)
            .unwrap_or(0)
            % SIGNAL_ROTATION.len();
        let (message, state) = SIGNAL_ROTATION[slot];
        AgentReply {
            message: message.to_string(),
            agent_state: state.to_string(),
        }
    }

    pub fn snapshot(&self) -> AdminState {
        AdminState {
            terminal_parking: self
                .terminal_parking
                .iter()
                .map(|r| (r.key().clone(), *r.value()))
                .collect(),
            cargo_delay_status: self
                .cargo_delay
                .iter()
                .map(|r| (r.key().clone(), *r.value()))
                .collect(),
            agent_overrides: self
                .agent_overrides
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cargo_status_matrix() {
        let state = MockState::new();
        // on time, terminal A has spots
        let status = state.cargo_status("fc6c885c-f897-412d-a408-9ba9108a5887", "a");
        assert_eq!(status.action, "Bay_Area");
        assert_eq!(
            status.message,
            "Aircraft is on time. Proceed to Bay Area at Terminal A."
        );

        // on time, terminal B is full
        let status = state.cargo_status("fc6c885c-f897-412d-a408-9ba9108a5887", "B");
        assert_eq!(status.action, "Parking");

        // delayed, terminal C has one spot
        let status = state.cargo_status("d0bea113-d248-457e-80b4-f4a2bf8703a5", "C");
        assert_eq!(status.action, "Parking");
        assert_eq!(status.message, "Aircraft delayed. Parking available at Terminal C.");

        // delayed, terminal B is full
        let status = state.cargo_status("d0bea113-d248-457e-80b4-f4a2bf8703a5", "B");
        assert_eq!(status.action, "Pull_Up");
    }

    #[test]
    fn test_unknown_keys_ignored_on_update() {
        let state = MockState::new();
        let mut parking = HashMap::new();
        parking.insert("b".to_string(), 3);
        parking.insert("Z".to_string(), 7);
        assert_eq!(state.update_parking(&parking), 1);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.terminal_parking.get("B"), Some(&3));
        assert!(!snapshot.terminal_parking.contains_key("Z"));

        let mut delays = HashMap::new();
        delays.insert("unknown-cargo".to_string(), true);
        assert_eq!(state.update_delay(&delays), 0);
    }

    #[test]
    fn test_agent_rotation_and_override() {
        let state = MockState::new();
        assert_eq!(state.agent_reply("Agent1").agent_state, "G");
        assert_eq!(state.agent_reply("Agent2").agent_state, "Y");
        assert_eq!(state.agent_reply("Agent6"), state.agent_reply("Agent1"));

        state.set_agent_override(
            "Agent2",
            AgentReply {
                message: "Accident Ahead".to_string(),
                agent_state: "R".to_string(),
            },
        );
        assert_eq!(state.agent_reply("Agent2").message, "Accident Ahead");
        assert!(state.clear_agent_override("Agent2"));
        assert_eq!(state.agent_reply("Agent2").message, "Caution ahead");
    }
}
