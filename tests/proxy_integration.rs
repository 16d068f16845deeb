//! End-to-end proxy behavior over the in-memory bus.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use recast::{
    DispatchSettings, EventProxy, LocalBus, NodeId, ProxyError, ProxyHandler, ProxyPart,
    Transform,
};

type SeenEvents = Arc<Mutex<Vec<(String, Value, NodeId)>>>;

/// Collects every (event, data, target) a listener sees.
fn recorder(log: &SeenEvents) -> ProxyHandler {
    let log = log.clone();
    ProxyHandler::from_fn(move |event, data| {
        log.lock()
            .push((event.name().to_owned(), data, event.target().clone()));
    })
}

fn suffix(tag: &'static str) -> Transform {
    Transform::map_data(move |data| json!(format!("{}{tag}", data.as_str().unwrap_or_default())))
}

#[test]
fn retarget_roundtrip_over_bus() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus.clone());
    let node = NodeId::new("widget");
    let log = Arc::new(Mutex::new(Vec::new()));

    proxy
        .proxy_retarget(&node, "clicked", "widget-activated")
        .unwrap();
    proxy.proxy_handler(&node, "widget-activated", recorder(&log));

    bus.dispatch(&node, "clicked", json!({"button": "left"}));

    assert_eq!(
        *log.lock(),
        vec![(
            "widget-activated".to_owned(),
            json!({"button": "left"}),
            node.clone()
        )]
    );
}

#[test]
fn pipeline_rewrites_event_data_and_node() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus.clone());
    let sensor = NodeId::new("sensor-7");
    let sink = NodeId::new("sink");
    let log = Arc::new(Mutex::new(Vec::new()));

    // Last transform added runs first: enrich, then redirect, then rename.
    let handler = proxy
        .proxy_builder()
        .transform(Transform::rename("normalized"))
        .transform(Transform::map_node(|_| NodeId::new("sink")))
        .transform(Transform::map_data(|data| {
            json!({"reading": data, "unit": "c"})
        }))
        .build();
    proxy.proxy_handler(&sensor, "raw-reading", handler);
    proxy.proxy_handler(&sink, "normalized", recorder(&log));

    bus.dispatch(&sensor, "raw-reading", json!(21.5));

    assert_eq!(
        *log.lock(),
        vec![(
            "normalized".to_owned(),
            json!({"reading": 21.5, "unit": "c"}),
            sink.clone()
        )]
    );
}

#[test]
fn transforms_compose_right_to_left_end_to_end() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus.clone());
    let node = NodeId::new("n");
    let log = Arc::new(Mutex::new(Vec::new()));

    let handler = proxy
        .proxy_builder()
        .transform(suffix("-a"))
        .transform(suffix("-b"))
        .transform(suffix("-c"))
        .transform(Transform::rename("staged"))
        .build();
    proxy.proxy_handler(&node, "raw", handler);
    proxy.proxy_handler(&node, "staged", recorder(&log));

    bus.dispatch(&node, "raw", json!("x"));

    assert_eq!(log.lock()[0].1, json!("x-c-b-a"));
}

#[test]
fn compiled_settings_suppress_default_and_still_reemit() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus.clone());
    let node = NodeId::new("form");
    let log = Arc::new(Mutex::new(Vec::new()));

    let handler = proxy
        .compile_proxy([
            Transform::rename("submitted").into(),
            ProxyPart::Settings(DispatchSettings {
                prevent_default: true,
                ..DispatchSettings::default()
            }),
        ])
        .unwrap();
    proxy.proxy_handler(&node, "submit", handler);
    proxy.proxy_handler(&node, "submitted", recorder(&log));

    let outcome = bus.dispatch(&node, "submit", json!({}));

    assert!(outcome.default_prevented);
    assert!(!outcome.propagation_stopped);
    assert_eq!(log.lock().len(), 1);
}

#[test]
fn compile_proxy_rejects_settings_before_end() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus);

    let err = proxy
        .compile_proxy([
            ProxyPart::Settings(DispatchSettings::default()),
            Transform::identity().into(),
        ])
        .unwrap_err();

    assert_eq!(err, ProxyError::MisplacedSettings { position: 0, len: 2 });
}

#[test]
fn stop_propagation_settings_starve_later_listeners() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus.clone());
    let node = NodeId::new("row");
    let log = Arc::new(Mutex::new(Vec::new()));

    let handler = proxy
        .proxy_builder()
        .transform(Transform::rename("row-selected"))
        .stop_propagation()
        .build();
    proxy.proxy_handler(&node, "clicked", handler);
    // Subscribed after the proxy, so propagation stops before it runs.
    proxy.proxy_handler(&node, "clicked", recorder(&log));
    proxy.proxy_handler(&node, "row-selected", recorder(&log));

    let outcome = bus.dispatch(&node, "clicked", json!(3));

    assert!(outcome.propagation_stopped);
    assert_eq!(outcome.delivered, 1);
    assert_eq!(log.lock()[0].0, "row-selected");
    assert_eq!(log.lock().len(), 1);
}

#[test]
fn handle_release_detaches_the_subscription() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus.clone());
    let node = NodeId::new("widget");

    let handle = proxy.proxy_retarget(&node, "clicked", "echoed").unwrap();
    assert_eq!(bus.listener_count(&node, "clicked"), 1);

    handle.release();
    assert_eq!(bus.listener_count(&node, "clicked"), 0);
    // The registry still remembers the pair.
    assert!(proxy.has_proxy("clicked", "echoed"));
}

#[test]
fn unproxy_retarget_detaches_and_stays_resolvable() {
    let bus = Arc::new(LocalBus::new());
    let proxy = EventProxy::new(bus.clone());
    let node = NodeId::new("widget");
    let log = Arc::new(Mutex::new(Vec::new()));

    proxy.proxy_retarget(&node, "clicked", "echoed").unwrap();
    proxy.proxy_handler(&node, "echoed", recorder(&log));

    proxy.unproxy_retarget(&node, "clicked", "echoed");
    bus.dispatch(&node, "clicked", json!(null));
    assert!(log.lock().is_empty());

    // Removing again resolves the same recorded handler; the bus just has
    // nothing left to detach.
    proxy.unproxy_retarget(&node, "clicked", "echoed");
    assert!(proxy.has_proxy("clicked", "echoed"));
    assert_eq!(proxy.proxy_count(), 1);
}
