//! Layout presets and the rendering-surface seam.
//!
//! The engine never draws anything. It tells a [`Network`] when to pin nodes,
//! which physics/layout preset to run and where restored nodes should appear.
//! [`RecordingNetwork`] keeps those calls for tests and headless rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Random,
    Hierarchical,
}

impl LayoutMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "random" | "repulsion" => Some(LayoutMode::Random),
            "hierarchical" | "hierarchy" => Some(LayoutMode::Hierarchical),
            _ => None,
        }
    }

    pub fn preset(self) -> LayoutPreset {
        match self {
            LayoutMode::Random => LayoutPreset {
                layout: LayoutOptions {
                    hierarchical: HierarchicalOptions {
                        enabled: false,
                        level_separation: None,
                        sort_method: None,
                        node_spacing: None,
                    },
                },
                physics: PhysicsOptions {
                    enabled: true,
                    min_velocity: 0.75,
                    max_velocity: 100.0,
                    solver: "repulsion".to_string(),
                    repulsion: Some(RepulsionOptions {
                        node_distance: 350.0,
                        central_gravity: 1.05,
                        spring_constant: 0.3,
                        spring_length: 1250.0,
                    }),
                    hierarchical_repulsion: None,
                    stabilization: StabilizationOptions {
                        enabled: true,
                        fit: true,
                        update_interval: None,
                        iterations: None,
                    },
                },
            },
            LayoutMode::Hierarchical => LayoutPreset {
                layout: LayoutOptions {
                    hierarchical: HierarchicalOptions {
                        enabled: true,
                        level_separation: Some(300.0),
                        sort_method: Some("directed".to_string()),
                        node_spacing: Some(150.0),
                    },
                },
                physics: PhysicsOptions {
                    enabled: true,
                    min_velocity: 1.0,
                    max_velocity: 100.0,
                    solver: "hierarchicalRepulsion".to_string(),
                    repulsion: None,
                    hierarchical_repulsion: Some(HierarchicalRepulsionOptions {
                        node_distance: 250.0,
                    }),
                    stabilization: StabilizationOptions {
                        enabled: true,
                        fit: true,
                        update_interval: Some(10),
                        iterations: Some(10),
                    },
                },
            },
        }
    }
}

/// Layout/physics options in the shape the browser graph library expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPreset {
    pub layout: LayoutOptions,
    pub physics: PhysicsOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    pub hierarchical: HierarchicalOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalOptions {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_separation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_spacing: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsOptions {
    pub enabled: bool,
    pub min_velocity: f64,
    pub max_velocity: f64,
    pub solver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repulsion: Option<RepulsionOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchical_repulsion: Option<HierarchicalRepulsionOptions>,
    pub stabilization: StabilizationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepulsionOptions {
    pub node_distance: f64,
    pub central_gravity: f64,
    pub spring_constant: f64,
    pub spring_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalRepulsionOptions {
    pub node_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilizationOptions {
    pub enabled: bool,
    pub fit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
}

/// Whatever displays the graph.
pub trait Network {
    /// Pin (`fixed = true`) or release the given nodes so a relayout leaves
    /// them where they are.
    fn set_fixed(&mut self, node_ids: &[String], fixed: bool);

    /// Run the given layout/physics preset.
    fn apply_layout(&mut self, preset: &LayoutPreset);

    /// Position `node_id` next to `anchor_id`.
    fn place_near(&mut self, node_id: &str, anchor_id: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkCall {
    SetFixed { nodes: usize, fixed: bool },
    ApplyLayout(Box<LayoutPreset>),
    PlaceNear { node: String, anchor: String },
}

/// A [`Network`] that only remembers what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct RecordingNetwork {
    calls: Vec<NetworkCall>,
}

impl RecordingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[NetworkCall] {
        &self.calls
    }

    /// The most recently applied preset.
    pub fn last_layout(&self) -> Option<&LayoutPreset> {
        self.calls.iter().rev().find_map(|call| match call {
            NetworkCall::ApplyLayout(preset) => Some(preset.as_ref()),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Network for RecordingNetwork {
    fn set_fixed(&mut self, node_ids: &[String], fixed: bool) {
        self.calls.push(NetworkCall::SetFixed {
            nodes: node_ids.len(),
            fixed,
        });
    }

    fn apply_layout(&mut self, preset: &LayoutPreset) {
        self.calls
            .push(NetworkCall::ApplyLayout(Box::new(preset.clone())));
    }

    fn place_near(&mut self, node_id: &str, anchor_id: &str) {
        self.calls.push(NetworkCall::PlaceNear {
            node: node_id.to_string(),
            anchor: anchor_id.to_string(),
        });
    }
}
