use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::Result;

const COLOR_LIME_500: u32 = 0x84cc16;

/// Devtools plugin configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InspectorConfig {
    /// Plugin descriptor sent on registration
    pub plugin: PluginConfig,

    /// Custom inspector (module tree + state panel)
    pub inspector: InspectorOptions,

    /// Timeline layers for mutations and actions
    pub layers: LayersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub id: String,
    pub label: String,
    pub homepage: String,
    pub logo: String,
    pub package_name: String,
    pub component_state_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectorOptions {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub tree_filter_placeholder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayersConfig {
    pub mutations: LayerConfig,
    pub actions: LayerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,
    pub label: String,
    #[serde(default = "default_layer_color")]
    pub color: u32,
}

fn default_layer_color() -> u32 {
    COLOR_LIME_500
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            id: "org.vuejs.vuex".to_string(),
            label: "Vuex".to_string(),
            homepage: "https://next.vuex.vuejs.org/".to_string(),
            logo: "https://vuejs.org/images/icons/favicon-96x96.png".to_string(),
            package_name: "vuex".to_string(),
            component_state_types: vec!["vuex bindings".to_string()],
        }
    }
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self {
            id: "vuex".to_string(),
            label: "Vuex".to_string(),
            icon: "storage".to_string(),
            tree_filter_placeholder: "Filter stores...".to_string(),
        }
    }
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            mutations: LayerConfig {
                id: "vuex:mutations".to_string(),
                label: "Vuex Mutations".to_string(),
                color: COLOR_LIME_500,
            },
            actions: LayerConfig {
                id: "vuex:actions".to_string(),
                label: "Vuex Actions".to_string(),
                color: COLOR_LIME_500,
            },
        }
    }
}

impl InspectorConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(plugin = %config.plugin.id, inspector = %config.inspector.id, "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
