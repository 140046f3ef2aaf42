//! Devtools integration: the host seam, an in-memory host, and plugin
//! installation that wires a [`Store`] to the inspector and timeline.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;
use tracing::info;

use crate::config::{InspectorConfig, InspectorOptions, LayerConfig};
use crate::error::Result;
use crate::state::{self, InspectorState};
use crate::store::Store;
use crate::timeline::{Clock, SystemClock, TimelineEvent, TimelineRecorder};
use crate::tree::{self, InspectorNode};

/// What the inspection tool exposes to a plugin.
pub trait DevtoolsHost {
    fn add_timeline_layer(&self, layer: &LayerConfig);
    fn add_inspector(&self, inspector: &InspectorOptions);
    fn add_timeline_event(&self, event: TimelineEvent);
    fn notify_component_update(&self);
    fn send_inspector_tree(&self, inspector_id: &str);
    fn send_inspector_state(&self, inspector_id: &str);
}

/// Host that keeps everything it receives.
#[derive(Debug, Default)]
pub struct MemoryHost {
    layers: RefCell<Vec<LayerConfig>>,
    inspectors: RefCell<Vec<InspectorOptions>>,
    events: RefCell<Vec<TimelineEvent>>,
    component_updates: Cell<usize>,
    tree_refreshes: RefCell<Vec<String>>,
    state_refreshes: RefCell<Vec<String>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> Vec<LayerConfig> {
        self.layers.borrow().clone()
    }

    pub fn inspectors(&self) -> Vec<InspectorOptions> {
        self.inspectors.borrow().clone()
    }

    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events.borrow().clone()
    }

    pub fn events_on(&self, layer_id: &str) -> Vec<TimelineEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.layer_id == layer_id)
            .cloned()
            .collect()
    }

    pub fn component_updates(&self) -> usize {
        self.component_updates.get()
    }

    pub fn tree_refreshes(&self) -> Vec<String> {
        self.tree_refreshes.borrow().clone()
    }

    pub fn state_refreshes(&self) -> Vec<String> {
        self.state_refreshes.borrow().clone()
    }
}

impl DevtoolsHost for MemoryHost {
    fn add_timeline_layer(&self, layer: &LayerConfig) {
        self.layers.borrow_mut().push(layer.clone());
    }

    fn add_inspector(&self, inspector: &InspectorOptions) {
        self.inspectors.borrow_mut().push(inspector.clone());
    }

    fn add_timeline_event(&self, event: TimelineEvent) {
        self.events.borrow_mut().push(event);
    }

    fn notify_component_update(&self) {
        self.component_updates.set(self.component_updates.get() + 1);
    }

    fn send_inspector_tree(&self, inspector_id: &str) {
        self.tree_refreshes.borrow_mut().push(inspector_id.to_string());
    }

    fn send_inspector_state(&self, inspector_id: &str) {
        self.state_refreshes.borrow_mut().push(inspector_id.to_string());
    }
}

/// An installed devtools plugin for one store.
pub struct StoreDevtools {
    config: InspectorConfig,
    recorder: Rc<TimelineRecorder>,
}

impl StoreDevtools {
    /// Register layers and the inspector with `host` and start recording
    /// the store's mutations and actions.
    pub fn install(store: &mut Store, host: Rc<dyn DevtoolsHost>, config: InspectorConfig) -> Self {
        Self::install_with_clock(store, host, config, Box::new(SystemClock))
    }

    pub fn install_with_clock(
        store: &mut Store,
        host: Rc<dyn DevtoolsHost>,
        config: InspectorConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        host.add_timeline_layer(&config.layers.mutations);
        host.add_timeline_layer(&config.layers.actions);
        host.add_inspector(&config.inspector);

        let recorder = Rc::new(TimelineRecorder::with_clock(host, &config, clock));
        store.subscribe(recorder.clone());
        store.subscribe_action(recorder.clone());

        info!(
            plugin = %config.plugin.id,
            inspector = %config.inspector.id,
            "devtools plugin installed"
        );
        Self { config, recorder }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn recorder(&self) -> &TimelineRecorder {
        &self.recorder
    }

    /// Whether requests addressed to `inspector_id` belong to this plugin.
    pub fn handles(&self, inspector_id: &str) -> bool {
        self.config.inspector.id == inspector_id
    }

    pub fn inspector_tree(&self, store: &Store, filter: Option<&str>) -> Vec<InspectorNode> {
        tree::inspector_tree(store.root(), filter)
    }

    pub fn inspector_state(&self, store: &Store, node_id: &str) -> Result<InspectorState> {
        state::inspector_state(store, node_id)
    }

    pub fn edit_inspector_state(
        &self,
        store: &mut Store,
        node_id: &str,
        field_path: &[String],
        value: Value,
    ) -> Result<()> {
        state::apply_edit(store, node_id, field_path, value)
    }
}
