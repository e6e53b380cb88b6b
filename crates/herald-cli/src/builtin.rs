//! Builtin handlers created from listener definitions.

use crate::listener::{ListenerDef, ListenerKind};
use herald_core::{Controllable, Core, EventContext, Handler, HandlerError, HandlerState, Params};
use serde_json::Value;

const DEFAULT_FAIL_MESSAGE: &str = "listener failed";

/// What a builtin handler does with each notification.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Echo,
    Template(String),
    Keys,
    Fail(String),
}

/// A handler configured by a [`ListenerDef`].
pub struct BuiltinHandler {
    core: Core,
    state: HandlerState,
    action: Action,
}

impl BuiltinHandler {
    /// Builds the handler a listener describes.
    ///
    /// The definition is expected to be valid; a `template` listener
    /// without a template renders an empty string.
    pub fn from_def(def: &ListenerDef) -> Self {
        let action = match def.kind {
            ListenerKind::Echo => Action::Echo,
            ListenerKind::Template => Action::Template(def.template.clone().unwrap_or_default()),
            ListenerKind::Keys => Action::Keys,
            ListenerKind::Fail => Action::Fail(
                def.message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAIL_MESSAGE.to_string()),
            ),
        };

        let mut state = HandlerState::new().with_priority(def.priority);
        if def.fixed_priority {
            state = state.fixed();
        }

        Self {
            core: Core::new(def.handler_name()),
            state,
            action,
        }
    }
}

impl Controllable for BuiltinHandler {
    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }
}

impl Handler for BuiltinHandler {
    fn state(&self) -> &HandlerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HandlerState {
        &mut self.state
    }

    fn update(&mut self, event: &EventContext<'_>, params: &Params) -> Result<(), HandlerError> {
        let value = match &self.action {
            Action::Echo => Value::Object(params.clone()),
            Action::Template(template) => Value::String(render(template, params)),
            Action::Keys => {
                let mut keys: Vec<&String> = params.keys().collect();
                keys.sort();
                Value::from(keys.into_iter().cloned().collect::<Vec<_>>())
            }
            Action::Fail(message) => {
                return Err(HandlerError::failed(self.core.name(), message.clone()));
            }
        };
        self.state.record(event.name(), value);
        Ok(())
    }
}

/// Replaces `{key}` with the param's value.
///
/// Strings are inserted without quotes, other values as JSON. Placeholders
/// naming a missing key are left as they are.
pub fn render(template: &str, params: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if after.as_bytes()[close] == b'}' => {
                let key = &after[..close];
                match params.get(key) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
