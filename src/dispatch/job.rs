use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Priority class of a job. The wire contract is lenient: `"high"` selects
/// the high lane, any other string is treated as low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Low,
}

impl Priority {
    pub fn from_wire(value: &str) -> Self {
        if value == "high" {
            Priority::High
        } else {
            Priority::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Priority::from_wire(&value))
    }
}

/// A unit of work addressed to one agent pool. Immutable after enqueue; its
/// location in the queue (lane or inflight) is its only mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub agent: String,
    pub model: String,
    pub priority: Priority,
    pub payload: Value,
}

impl Job {
    pub fn new(agent: String, model: String, priority: Priority, payload: Value) -> Self {
        Self::with_id(mint_id(), agent, model, priority, payload)
    }

    pub fn with_id(
        id: String,
        agent: String,
        model: String,
        priority: Priority,
        payload: Value,
    ) -> Self {
        Self {
            id,
            agent,
            model,
            priority,
            payload,
        }
    }
}

/// Mint a job identifier: 128 random bits rendered as 32 lowercase hex
/// characters. No uniqueness check; collisions sit at the 128-bit birthday
/// bound.
pub fn mint_id() -> String {
    let mut rng = rand::thread_rng();
    let hi: u64 = rng.gen();
    let lo: u64 = rng.gen();
    format!("{:016x}{:016x}", hi, lo)
}
