use std::collections::VecDeque;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::SceneConfig;
use crate::error::Result;
use crate::scene::node::{Node, NodeId, Point};

/// The live node population.
///
/// Nodes are kept oldest-first, so appending is O(1) and evicting the k
/// oldest is O(k) from the front.
pub struct NodeSimulation {
    nodes: VecDeque<Node>,
    next_id: u64,
    config: SceneConfig,
    rng: StdRng,
}

impl NodeSimulation {
    pub fn new(config: SceneConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            nodes: VecDeque::with_capacity(config.max_nodes + 1),
            next_id: 0,
            config,
            rng,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Spawn a node at `position` with fresh styling and full life.
    pub fn add_node(&mut self, position: Point) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);

        let node = Node {
            id,
            position,
            radius: self
                .rng
                .gen_range(self.config.min_radius..self.config.max_radius),
            hue: self.rng.gen_range(0.0..360.0),
            life: 1.0,
            seed: self.rng.gen(),
        };
        self.nodes.push_back(node);
        id
    }

    /// Advance every node by `dt` seconds.
    ///
    /// Returns each node removed this step exactly once: first the ones whose
    /// life ran out, then the oldest survivors beyond the population cap.
    /// A non-positive or non-finite `dt` decays nothing but still enforces
    /// the cap.
    pub fn tick(&mut self, dt: f32) -> Vec<NodeId> {
        let mut removed = Vec::new();

        if dt.is_finite() && dt > 0.0 {
            let decay = dt * self.config.decay_rate;
            self.nodes.retain_mut(|node| {
                node.life -= decay;
                if node.life <= 0.0 {
                    removed.push(node.id);
                    false
                } else {
                    true
                }
            });
        }

        while self.nodes.len() > self.config.max_nodes {
            if let Some(oldest) = self.nodes.pop_front() {
                removed.push(oldest.id);
            }
        }

        removed
    }

    /// Live nodes, oldest first.
    pub fn snapshot(&self) -> impl ExactSizeIterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        // Ids are increasing along the deque
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .and_then(|i| self.nodes.get(i))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
