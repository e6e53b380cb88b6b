//! Builds a controller from configuration and runs commands against it.

use crate::builtin::BuiltinHandler;
use crate::config::HeraldConfig;
use herald_core::{encode, format_settings, handler_ref, Controller, MessageSink, Params};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates a controller with every enabled listener attached.
pub fn build_controller(config: &HeraldConfig, sink: Arc<dyn MessageSink>) -> Controller {
    let mut controller = Controller::new(sink);
    for def in config.enabled_listeners() {
        let attached = controller.listen(&def.event, handler_ref(BuiltinHandler::from_def(def)));
        if !attached {
            warn!(listener = %def.label(), "duplicate listener ignored");
        }
    }
    debug!(events = controller.event_names().len(), "controller built");
    controller
}

/// Parses `--params` text. Anything but a JSON object gives empty params.
pub fn parse_params(text: Option<&str>) -> Params {
    let Some(text) = text else {
        return Params::new();
    };
    let params = format_settings(text);
    if params.is_empty() && !text.trim().is_empty() && text.trim() != "{}" {
        warn!(params = %text, "params are not a JSON object, running with none");
    }
    params
}

/// Runs `event` and renders its output as `{"<event>": [...]}`.
///
/// Returns `None` when the event does not exist. An event without output
/// renders an empty list.
pub fn run_event(controller: &mut Controller, event: &str, params: Params, pretty: bool) -> Option<String> {
    if !controller.run(event, Some(params)) {
        return None;
    }
    let output = controller.event(event)?.output(event).to_vec();

    let mut body = Params::new();
    body.insert(event.to_string(), Value::Array(output));
    Some(encode(&body, pretty))
}

/// Lists events and their handlers in dispatch order, one event per line.
///
/// ```text
/// save: audit(10) index(5)
/// ```
pub fn list_events(controller: &mut Controller) -> String {
    let names: Vec<String> = controller.event_names().iter().map(|n| n.to_string()).collect();
    let mut out = String::new();
    for name in names {
        let Some(event) = controller.event_mut(&name) else {
            continue;
        };
        event.sort_handlers();
        let _ = write!(out, "{name}:");
        for (handler, priority) in event.handlers() {
            let _ = write!(out, " {handler}({priority})");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{ListenerDef, ListenerKind};
    use herald_core::{MemorySink, MessageKind};
    use serde_json::json;

    fn config() -> HeraldConfig {
        let mut config = HeraldConfig::default();
        config.listeners = vec![
            ListenerDef {
                priority: 5,
                ..ListenerDef::new("save", ListenerKind::Echo)
            },
            ListenerDef {
                template: Some("saved {file}".into()),
                priority: 10,
                ..ListenerDef::new("save", ListenerKind::Template)
            },
            ListenerDef::new("load", ListenerKind::Keys),
            ListenerDef {
                enabled: false,
                ..ListenerDef::new("off", ListenerKind::Echo)
            },
        ];
        config
    }

    #[test]
    fn build_attaches_enabled_listeners() {
        let controller = build_controller(&config(), Arc::new(MemorySink::new()));
        assert_eq!(controller.event_names(), vec!["load", "save"]);
        assert_eq!(controller.event("save").map(|e| e.len()), Some(2));
    }

    #[test]
    fn duplicate_listener_is_ignored() {
        let mut config = config();
        config.listeners.push(ListenerDef::new("load", ListenerKind::Keys));
        let controller = build_controller(&config, Arc::new(MemorySink::new()));
        assert_eq!(controller.event("load").map(|e| e.len()), Some(1));
    }

    #[test]
    fn run_renders_output_in_priority_order() {
        let mut controller = build_controller(&config(), Arc::new(MemorySink::new()));
        let out = run_event(&mut controller, "save", parse_params(Some(r#"{"file":"a.txt"}"#)), false)
            .expect("event exists");
        assert_eq!(out, r#"{"save":["saved a.txt",{"file":"a.txt"}]}"#);
    }

    #[test]
    fn run_missing_event_is_none() {
        let mut controller = build_controller(&config(), Arc::new(MemorySink::new()));
        assert!(run_event(&mut controller, "nope", Params::new(), false).is_none());
    }

    #[test]
    fn failing_listener_reaches_sink_on_close() {
        let mut config = HeraldConfig::default();
        config.listeners = vec![
            ListenerDef {
                message: Some("disk full".into()),
                priority: 1,
                ..ListenerDef::new("save", ListenerKind::Fail)
            },
            ListenerDef::new("save", ListenerKind::Keys),
        ];
        let sink = Arc::new(MemorySink::new());
        let mut controller = build_controller(&config, sink.clone());

        let out = run_event(&mut controller, "save", parse_params(Some(r#"{"b":1,"a":2}"#)), false);
        assert_eq!(out.as_deref(), Some(r#"{"save":[["a","b"]]}"#));

        controller.close();
        assert_eq!(
            sink.of_kind(MessageKind::Error),
            vec!["Event handler 'fail' failed: disk full"]
        );
    }

    #[test]
    fn parse_params_degrades() {
        assert!(parse_params(None).is_empty());
        assert!(parse_params(Some("not json")).is_empty());
        assert!(parse_params(Some("[1]")).is_empty());
        assert_eq!(parse_params(Some(r#"{"a":1}"#))["a"], json!(1));
    }

    #[test]
    fn list_events_in_dispatch_order() {
        let mut controller = build_controller(&config(), Arc::new(MemorySink::new()));
        assert_eq!(list_events(&mut controller), "load: keys(0)\nsave: template(10) echo(5)\n");
    }
}
