//! Timeline recording of store mutations and actions.
//!
//! Every mutation becomes one event on the mutations layer. Every action
//! becomes a `start`/`end` pair on the actions layer sharing a `groupId`
//! taken from a counter that only ever increases.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::InspectorConfig;
use crate::devtools::DevtoolsHost;
use crate::store::{Action, ActionSubscriber, Mutation, MutationSubscriber};

/// Millisecond wall clock.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.set(millis);
    }

    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Attached to an action between its `before` and `after` hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRecord {
    pub id: u64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtitle {
    Start,
    End,
}

/// Serialized as a devtools custom value:
/// `{"_custom": {"type": "duration", "display": "12ms", ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationDescriptor {
    #[serde(rename = "_custom")]
    custom: CustomDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct CustomDuration {
    #[serde(rename = "type")]
    kind: &'static str,
    display: String,
    tooltip: &'static str,
    value: i64,
}

impl DurationDescriptor {
    pub fn from_millis(millis: i64) -> Self {
        Self {
            custom: CustomDuration {
                kind: "duration",
                display: format!("{}ms", millis),
                tooltip: "Action duration",
                value: millis,
            },
        }
    }

    pub fn value(&self) -> i64 {
        self.custom.value
    }

    pub fn display(&self) -> &str {
        &self.custom.display
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub state: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub layer_id: String,
    pub time: i64,
    pub title: String,
    pub data: EventData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Subtitle>,
}

/// Deep, independent copy of the state at this instant.
///
/// JSON values cannot carry functions, cycles or non-finite numbers, so a
/// snapshot preserves only plain data.
pub fn snapshot_state(state: &Value) -> Value {
    match state {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), snapshot_state(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(snapshot_state).collect()),
        other => other.clone(),
    }
}

/// Only an absent or `null` payload is dropped; `0`, `false` and `""` are kept.
fn present(payload: Option<&Value>) -> Option<Value> {
    payload.filter(|p| !p.is_null()).cloned()
}

/// Turns store notifications into timeline events on a devtools host.
pub struct TimelineRecorder {
    host: Rc<dyn DevtoolsHost>,
    clock: Box<dyn Clock>,
    next_action_id: AtomicU64,
    inspector_id: String,
    mutations_layer: String,
    actions_layer: String,
}

impl TimelineRecorder {
    pub fn new(host: Rc<dyn DevtoolsHost>, config: &InspectorConfig) -> Self {
        Self::with_clock(host, config, Box::new(SystemClock))
    }

    pub fn with_clock(
        host: Rc<dyn DevtoolsHost>,
        config: &InspectorConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            host,
            clock,
            next_action_id: AtomicU64::new(0),
            inspector_id: config.inspector.id.clone(),
            mutations_layer: config.layers.mutations.id.clone(),
            actions_layer: config.layers.actions.id.clone(),
        }
    }

    /// Id the next action will receive.
    pub fn next_action_id(&self) -> u64 {
        self.next_action_id.load(Ordering::SeqCst)
    }

    fn action_event(
        &self,
        action: &Action,
        record: ActionRecord,
        time: i64,
        subtitle: Subtitle,
        data: EventData,
    ) -> TimelineEvent {
        TimelineEvent {
            layer_id: self.actions_layer.clone(),
            time,
            title: action.action_type.clone(),
            data,
            group_id: Some(record.id),
            subtitle: Some(subtitle),
        }
    }
}

impl MutationSubscriber for TimelineRecorder {
    fn on_mutation(&self, mutation: &Mutation, state: &Value) {
        let data = EventData {
            duration: None,
            payload: present(mutation.payload.as_ref()),
            state: snapshot_state(state),
        };

        self.host.notify_component_update();
        self.host.send_inspector_tree(&self.inspector_id);
        self.host.send_inspector_state(&self.inspector_id);

        self.host.add_timeline_event(TimelineEvent {
            layer_id: self.mutations_layer.clone(),
            time: self.clock.now_millis(),
            title: mutation.mutation_type.clone(),
            data,
            group_id: None,
            subtitle: None,
        });
    }
}

impl ActionSubscriber for TimelineRecorder {
    fn before(&self, action: &mut Action, state: &Value) {
        let record = ActionRecord {
            id: self.next_action_id.fetch_add(1, Ordering::SeqCst),
            start_time: self.clock.now_millis(),
        };
        action.record = Some(record);

        let data = EventData {
            duration: None,
            payload: present(action.payload.as_ref()),
            state: snapshot_state(state),
        };
        let event = self.action_event(action, record, record.start_time, Subtitle::Start, data);
        self.host.add_timeline_event(event);
    }

    fn after(&self, action: &mut Action, state: &Value) {
        let Some(record) = action.record.take() else {
            warn!(action = %action.action_type, "action finished without a start record");
            return;
        };

        let now = self.clock.now_millis();
        let data = EventData {
            duration: Some(DurationDescriptor::from_millis(now - record.start_time)),
            payload: present(action.payload.as_ref()),
            state: snapshot_state(state),
        };
        let event = self.action_event(action, record, now, Subtitle::End, data);
        self.host.add_timeline_event(event);
    }
}
