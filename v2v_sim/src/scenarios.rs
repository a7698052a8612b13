//! Dissemination scenarios for the simulator.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// SIM-001: Two vehicles hand a walker off through a push, then forget it
    Handoff,

    /// SIM-002: One flood wave over a fully connected mesh
    FloodMesh,

    /// SIM-003: Hop budget bound on a line of agents
    Chain,

    /// SIM-004: Split the fleet, heal, converge
    Partition,

    /// SIM-005: A walker disappears and ages out everywhere
    Expiry,

    /// SIM-006: Moving traffic with sweep sensors
    Highway,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Handoff,
            ScenarioId::FloodMesh,
            ScenarioId::Chain,
            ScenarioId::Partition,
            ScenarioId::Expiry,
            ScenarioId::Highway,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Handoff => "handoff",
            ScenarioId::FloodMesh => "flood_mesh",
            ScenarioId::Chain => "chain",
            ScenarioId::Partition => "partition",
            ScenarioId::Expiry => "expiry",
            ScenarioId::Highway => "highway",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Handoff => "A sees W, one push hands W to B, B re-observes, both evict at t=31s",
            ScenarioId::FloodMesh => "Fully connected agents receive one wave exactly once and agree",
            ScenarioId::Chain => "A wave on a line stops after max_hop_budget hops",
            ScenarioId::Partition => "Partitioned vehicles miss a walker, then catch up after healing",
            ScenarioId::Expiry => "Records of a vanished walker outlive it by the staleness threshold only",
            ScenarioId::Highway => "Moving convoy with rotating sensors converges on a shared picture",
        }
    }

    /// Returns true if the scenario runs the full frame loop.
    pub fn uses_world(&self) -> bool {
        matches!(
            self,
            ScenarioId::Partition | ScenarioId::Expiry | ScenarioId::Highway
        )
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "handoff" | "sim-001" => Ok(ScenarioId::Handoff),
            "flood_mesh" | "floodmesh" | "sim-002" => Ok(ScenarioId::FloodMesh),
            "chain" | "sim-003" => Ok(ScenarioId::Chain),
            "partition" | "sim-004" => Ok(ScenarioId::Partition),
            "expiry" | "sim-005" => Ok(ScenarioId::Expiry),
            "highway" | "sim-006" => Ok(ScenarioId::Highway),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
    }

    #[test]
    fn test_aliases_and_unknown() {
        assert_eq!("SIM-004".parse::<ScenarioId>(), Ok(ScenarioId::Partition));
        assert_eq!("FloodMesh".parse::<ScenarioId>(), Ok(ScenarioId::FloodMesh));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
