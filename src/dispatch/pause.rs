use std::collections::HashSet;

/// Registry of agent names currently barred from dispatch.
///
/// Membership only gates the dispatch path. Enqueue, completion,
/// cancellation, inspection, and reorder controls keep working while an
/// agent is paused; its jobs simply accumulate.
#[derive(Debug, Default)]
pub struct PauseSet {
    agents: HashSet<String>,
}

impl PauseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bar `agent` from dispatch. Idempotent.
    pub fn pause(&mut self, agent: &str) {
        self.agents.insert(agent.to_string());
    }

    /// Re-admit `agent` to dispatch. Idempotent.
    pub fn resume(&mut self, agent: &str) {
        self.agents.remove(agent);
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.agents.contains(agent)
    }

    /// Paused agent names, sorted for stable responses.
    pub fn list(&self) -> Vec<String> {
        let mut agents: Vec<String> = self.agents.iter().cloned().collect();
        agents.sort();
        agents
    }
}
