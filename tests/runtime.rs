//! End-to-end runtime behavior over the in-memory host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use spark_signals::effect;
use spark_islands::dom::Listener;
use spark_islands::{
    ComponentDefinition, DispatchOutcome, Dom, Interaction, LoadStatus, ManualIdle, ManualScripts,
    ManualViewport, MemoryDom, MemoryNode, Runtime, RuntimeConfig, State,
};
use tracing_subscriber::EnvFilter;

type Definition = ComponentDefinition<MemoryDom>;

struct Harness {
    dom: Rc<MemoryDom>,
    scripts: Rc<ManualScripts>,
    viewport: Rc<ManualViewport<MemoryNode>>,
    idle: Rc<ManualIdle>,
    runtime: Runtime<MemoryDom>,
}

impl Harness {
    fn node(&self, attribute: &str, value: &str) -> MemoryNode {
        self.dom.find_by_attr(attribute, value).unwrap()
    }

    fn component(&self, name: &str) -> MemoryNode {
        self.node("data-component", name)
    }

    fn click(&self, node: &MemoryNode) {
        self.dom.fire("click", node);
    }
}

fn setup(markup: &str) -> Harness {
    setup_with(markup, ManualIdle::new(), RuntimeConfig::default())
}

/// Honors `RUST_LOG`, e.g. `RUST_LOG=spark_islands=trace cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup_with(markup: &str, idle: ManualIdle, config: RuntimeConfig) -> Harness {
    init_tracing();
    let dom = Rc::new(MemoryDom::parse(markup).unwrap());
    let scripts = Rc::new(ManualScripts::new());
    let viewport = Rc::new(ManualViewport::new());
    let idle = Rc::new(idle);
    let runtime = Runtime::builder(dom.clone())
        .config(config)
        .scripts(scripts.clone())
        .viewport(viewport.clone())
        .idle(idle.clone())
        .build();
    Harness {
        dom,
        scripts,
        viewport,
        idle,
        runtime,
    }
}

fn object(value: Value) -> State {
    match value {
        Value::Object(map) => map,
        _ => State::new(),
    }
}

fn counting(count: &Rc<Cell<usize>>) -> impl Fn(&spark_islands::ActionContext<'_, MemoryDom>) + 'static {
    let count = count.clone();
    move |_| count.set(count.get() + 1)
}

fn increment(ctx: &spark_islands::ActionContext<'_, MemoryDom>) {
    let count = ctx.get("count").and_then(|value| value.as_i64()).unwrap_or(0);
    ctx.set_state(json!({ "count": count + 1 }));
}

// =============================================================================
// Registry and activation
// =============================================================================

#[test]
fn test_register_twice_replaces_definition() {
    let h = setup(r#"<div data-component="a"><button data-action="go">go</button></div>"#);
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));

    h.runtime
        .register("a", Definition::new().action("go", "click", counting(&first)));
    h.runtime
        .register("a", Definition::new().action("go", "click", counting(&second)));
    h.click(&h.node("data-action", "go"));

    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 1);
    assert_eq!(h.runtime.registered_names().len(), 1);
    assert_eq!(h.dom.listener_count("click"), 1);
}

#[test]
fn test_activation_is_idempotent() {
    let h = setup(r#"<div data-component="c"><b data-bind="count">1</b></div>"#);
    let inits = Rc::new(Cell::new(0));
    let inits_clone = inits.clone();

    h.runtime.register(
        "c",
        Definition::new()
            .state(json!({ "count": 0 }))
            .on_init(move |_, _| inits_clone.set(inits_clone.get() + 1)),
    );
    let element = h.component("c");
    assert!(h.runtime.activate(&element));
    h.runtime.start();
    h.runtime.scan(Some(&element));

    assert_eq!(inits.get(), 1);
    assert_eq!(h.runtime.instance_count(), 1);
}

#[test]
fn test_stateless_definition_has_no_instance() {
    let h = setup(r#"<div data-component="s"><button data-action="go">go</button></div>"#);
    let saw_instance = Rc::new(Cell::new(true));
    let saw_clone = saw_instance.clone();

    h.runtime.register(
        "s",
        Definition::new().action("go", "click", move |ctx| {
            saw_clone.set(ctx.instance.is_some());
            ctx.set_state(json!({ "ignored": true }));
        }),
    );
    h.click(&h.node("data-action", "go"));

    assert!(!saw_instance.get());
    assert!(!h.runtime.has_instance(&h.component("s")));
}

#[test]
fn test_coercion_on_hydrate() {
    let h = setup(r#"<div data-component="c"><span data-bind="count">5</span></div>"#);
    h.runtime
        .register("c", Definition::new().state(json!({ "count": 0 })));

    let state = h.runtime.state(&h.component("c")).unwrap();
    assert_eq!(state["count"], json!(5));
    assert!(h.runtime.previous_state(&h.component("c")).unwrap().is_empty());
}

// =============================================================================
// Patching
// =============================================================================

#[test]
fn test_unchanged_keys_do_not_render() {
    let h = setup(
        r#"<div data-component="c"><span data-bind="count">5</span><span data-bind="label">x</span></div>"#,
    );
    let updates = Rc::new(RefCell::new(Vec::new()));
    let updates_clone = updates.clone();

    h.runtime.register(
        "c",
        Definition::new()
            .state(json!({ "count": 0, "label": "" }))
            .on_update(move |_, state, previous| {
                updates_clone
                    .borrow_mut()
                    .push((state["count"].clone(), previous["count"].clone()));
            }),
    );
    let element = h.component("c");
    let label = h.node("data-bind", "label");
    h.dom.set_text(&label, "tampered");

    h.runtime
        .patch(&element, json!({ "count": 6, "label": "x" }));

    assert_eq!(h.dom.text(&h.node("data-bind", "count")), "6");
    assert_eq!(h.dom.text(&label), "tampered");
    assert_eq!(*updates.borrow(), vec![(json!(6), json!(5))]);

    // Nothing changed: still calls update, renders nothing.
    h.runtime.patch(&element, json!({ "count": 6 }));
    assert_eq!(updates.borrow().len(), 2);
    assert_eq!(
        h.runtime.previous_state(&element).unwrap(),
        object(json!({ "count": 6, "label": "x" }))
    );
}

#[test]
fn test_handler_set_state_renders_synchronously() {
    let h = setup(
        r#"<div data-component="counter"><span data-bind="count">0</span><button data-action="inc">+</button></div>"#,
    );
    h.runtime.register(
        "counter",
        Definition::new()
            .state(json!({ "count": 0 }))
            .action("inc", "click", increment),
    );

    let button = h.node("data-action", "inc");
    h.click(&button);
    h.click(&button);

    assert_eq!(h.dom.text(&h.node("data-bind", "count")), "2");
    assert_eq!(h.runtime.state(&h.component("counter")).unwrap()["count"], json!(2));
}

#[test]
fn test_callbacks_may_reenter_runtime() {
    let h = setup(r#"<div data-component="c"><b data-bind="n">1</b></div>"#);
    let runtime = h.runtime.clone();
    let seen = Rc::new(RefCell::new(None));
    let seen_clone = seen.clone();

    h.runtime.register(
        "c",
        Definition::new()
            .state(json!({ "n": 0 }))
            .on_init(move |element, _| {
                runtime.patch(element, json!({ "n": 2 }));
                *seen_clone.borrow_mut() = runtime.state(element);
            }),
    );

    assert_eq!(seen.borrow().as_ref().unwrap()["n"], json!(2));
    assert_eq!(h.dom.text(&h.node("data-bind", "n")), "2");
}

#[test]
fn test_teardown_calls_destroy_once() {
    let h = setup(r#"<div data-component="c"><b data-bind="n">3</b></div>"#);
    let destroyed = Rc::new(RefCell::new(Vec::new()));
    let destroyed_clone = destroyed.clone();

    h.runtime.register(
        "c",
        Definition::new()
            .state(json!({ "n": 0 }))
            .on_destroy(move |_, state| destroyed_clone.borrow_mut().push(state["n"].clone())),
    );
    let element = h.component("c");

    h.runtime.teardown(&element);
    h.runtime.teardown(&element);
    h.runtime.patch(&element, json!({ "n": 9 }));
    h.dom.remove(&element);

    assert_eq!(*destroyed.borrow(), vec![json!(3)]);
    assert!(!h.runtime.has_instance(&element));
    assert!(h.runtime.state(&element).is_none());
}

// =============================================================================
// Bindings through the runtime
// =============================================================================

#[test]
fn test_list_round_trip() {
    let h = setup(
        r#"<div data-component="todo"><ul data-each="items"><li>a</li><li>b</li><li>c</li></ul></div>"#,
    );
    h.runtime
        .register("todo", Definition::new().state(json!({ "items": [] })));
    let element = h.component("todo");
    let list = h.node("data-each", "items");

    assert_eq!(h.runtime.state(&element).unwrap()["items"], json!(["a", "b", "c"]));

    h.runtime.patch(&element, json!({ "items": ["x", "y"] }));
    assert_eq!(h.dom.inner_html(&list), "<li>x</li><li>y</li>");

    h.runtime
        .patch(&element, json!({ "items": ["p", "q", "r", "s"] }));
    assert_eq!(h.dom.children(&list).len(), 4);
    assert_eq!(h.dom.text(&list), "pqrs");
}

#[test]
fn test_list_template_survives_reactivation() {
    let h = setup(
        r#"<div data-component="todo"><ul data-each="items"><li class="item">a</li></ul></div>"#,
    );
    h.runtime
        .register("todo", Definition::new().state(json!({ "items": [] })));
    let element = h.component("todo");
    let list = h.node("data-each", "items");

    h.runtime.patch(&element, json!({ "items": [] }));
    assert_eq!(h.dom.inner_html(&list), "");

    h.runtime.teardown(&element);
    let stray = h.dom.create_element("p");
    h.dom.append_child(&list, &stray);
    assert!(h.runtime.activate(&element));
    h.runtime.patch(&element, json!({ "items": ["z"] }));

    assert_eq!(h.dom.inner_html(&list), r#"<li class="item">z</li>"#);
}

#[test]
fn test_conditional_round_trip() {
    let h = setup(r#"<div data-component="panel"><p data-if="visible">text</p></div>"#);
    h.runtime.register("panel", Definition::new().state(json!({})));
    let element = h.component("panel");
    let paragraph = h.node("data-if", "visible");

    assert_eq!(h.runtime.state(&element).unwrap()["visible"], json!(true));

    h.runtime.patch(&element, json!({ "visible": false }));
    assert_eq!(h.dom.inner_html(&element), "<!---->");
    assert!(!h.dom.is_connected(&paragraph));

    h.runtime.patch(&element, json!({ "visible": true }));
    assert_eq!(
        h.dom.inner_html(&element),
        r#"<p data-if="visible">text</p><!---->"#
    );
    assert!(h.dom.is_connected(&paragraph));
    assert_eq!(h.dom.find_by_attr("data-if", "visible"), Some(paragraph));
}

#[test]
fn test_reactivation_keeps_one_conditional_marker() {
    let h = setup(r#"<div data-component="panel"><p data-if="visible">text</p></div>"#);
    h.runtime.register("panel", Definition::new().state(json!({})));
    let element = h.component("panel");

    h.runtime.teardown(&element);
    assert!(h.runtime.activate(&element));
    assert_eq!(
        h.dom.inner_html(&element),
        r#"<!----><p data-if="visible">text</p>"#
    );

    h.runtime.patch(&element, json!({ "visible": false }));
    h.runtime.patch(&element, json!({ "visible": true }));
    assert_eq!(
        h.dom.inner_html(&element),
        r#"<p data-if="visible">text</p><!---->"#
    );
}

#[test]
fn test_nested_component_bindings_are_isolated() {
    let h = setup(
        r#"<div data-component="outer"><b data-bind="n">1</b><div data-component="inner"><b data-bind="n">7</b></div></div>"#,
    );
    h.runtime.register("outer", Definition::new().state(json!({ "n": 0 })));
    h.runtime.register("inner", Definition::new().state(json!({ "n": 0 })));

    let outer = h.component("outer");
    let inner = h.component("inner");
    assert_eq!(h.runtime.state(&outer).unwrap()["n"], json!(1));
    assert_eq!(h.runtime.state(&inner).unwrap()["n"], json!(7));

    h.runtime.patch(&outer, json!({ "n": 2 }));
    assert_eq!(h.dom.text(&outer), "27");
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_action_bubbles_to_outer_component() {
    let h = setup(
        r#"<div data-component="a"><div data-component="b"><button data-action="go">go</button></div></div>"#,
    );
    let count = Rc::new(Cell::new(0));
    h.runtime
        .register("a", Definition::new().action("go", "click", counting(&count)));
    h.runtime.register("b", Definition::new());

    let outcome = h
        .runtime
        .dispatch(&Interaction::new("click", h.node("data-action", "go")));

    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(count.get(), 1);
}

#[test]
fn test_inner_handler_short_circuits() {
    let h = setup(
        r#"<div data-component="a"><div data-component="b"><button data-action="go">go</button></div></div>"#,
    );
    let outer = Rc::new(Cell::new(0));
    let inner = Rc::new(Cell::new(0));
    h.runtime
        .register("a", Definition::new().action("go", "click", counting(&outer)));
    h.runtime
        .register("b", Definition::new().action("go", "click", counting(&inner)));

    h.click(&h.node("data-action", "go"));

    assert_eq!(inner.get(), 1);
    assert_eq!(outer.get(), 0);
}

#[test]
fn test_outer_walk_continues_past_unhandled_action() {
    let h = setup(
        r#"<div data-component="a" data-action="save"><span data-action="unknown"><i id="x">x</i></span></div>"#,
    );
    let count = Rc::new(Cell::new(0));
    h.runtime
        .register("a", Definition::new().action("save", "click", counting(&count)));

    let target = h.node("id", "x");
    assert_eq!(
        h.runtime.dispatch(&Interaction::new("click", target.clone())),
        DispatchOutcome::Handled
    );
    assert_eq!(
        h.runtime.dispatch(&Interaction::new("input", target)),
        DispatchOutcome::Dropped
    );
    assert_eq!(count.get(), 1);
}

#[test]
fn test_subscriptions_installed_once() {
    let h = setup(r#"<div data-component="a"></div>"#);
    h.runtime.start();
    h.runtime.start();
    h.runtime
        .register("a", Definition::new().action("hover", "mouseover", |_| {}));
    h.runtime
        .register("a", Definition::new().action("hover", "mouseover", |_| {}));

    assert_eq!(h.dom.listener_count("click"), 1);
    assert_eq!(h.dom.listener_count("mouseover"), 1);
    assert!(h.runtime.subscribed_events().contains(&"mouseover".to_string()));
}

// =============================================================================
// Lazy loading
// =============================================================================

const LAZY: &str = r#"<div data-component="lazy" data-src="/lazy.js" data-load="interaction"><span data-bind="count">0</span><button data-action="inc">+</button></div>"#;

#[test]
fn test_interactions_buffer_until_load_then_replay_in_order() {
    let h = setup(LAZY);
    h.runtime.start();
    let button = h.node("data-action", "inc");
    assert_eq!(h.scripts.injection_count("/lazy.js"), 0);

    for index in 0..3 {
        h.dom
            .fire_interaction(&Interaction::new("click", button.clone()).with_detail(json!(index)));
    }
    assert_eq!(h.scripts.injection_count("/lazy.js"), 1);
    assert_eq!(h.runtime.buffered_count("lazy"), 3);
    assert_eq!(h.runtime.load_status("/lazy.js"), LoadStatus::Loading);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    h.runtime.register(
        "lazy",
        Definition::new()
            .state(json!({ "count": 0 }))
            .action("inc", "click", move |ctx| {
                seen_clone.borrow_mut().push(ctx.interaction.detail.clone());
                increment(ctx);
            }),
    );
    assert!(h.scripts.complete("/lazy.js", Ok(())));

    assert_eq!(*seen.borrow(), vec![json!(0), json!(1), json!(2)]);
    assert_eq!(h.runtime.buffered_count("lazy"), 0);
    assert_eq!(h.dom.text(&h.node("data-bind", "count")), "3");
    assert_eq!(h.runtime.load_status("/lazy.js"), LoadStatus::Loaded);
}

#[test]
fn test_replay_finishes_before_loaded_is_observed() {
    let h = setup(LAZY);
    h.runtime.start();
    let log = Rc::new(RefCell::new(Vec::new()));

    let status = h.runtime.load_status_signal("/lazy.js");
    let runtime = h.runtime.clone();
    let effect_log = log.clone();
    let _effect = effect(move || {
        if status.get() == LoadStatus::Loaded {
            effect_log.borrow_mut().push(format!(
                "loaded, buffered={}",
                runtime.buffered_count("lazy")
            ));
        }
    });

    h.click(&h.node("data-action", "inc"));
    let handler_log = log.clone();
    h.runtime.register(
        "lazy",
        Definition::new()
            .state(json!({ "count": 0 }))
            .action("inc", "click", move |ctx| {
                handler_log.borrow_mut().push("handler".to_string());
                increment(ctx);
            }),
    );
    h.scripts.complete("/lazy.js", Ok(()));

    assert_eq!(
        *log.borrow(),
        vec!["handler".to_string(), "loaded, buffered=0".to_string()]
    );
}

#[test]
fn test_dispatch_reports_buffering() {
    let h = setup(LAZY);
    let outcome = h
        .runtime
        .dispatch(&Interaction::new("click", h.node("data-action", "inc")));
    assert_eq!(outcome, DispatchOutcome::Buffered);
}

#[test]
fn test_failed_load_keeps_buffer_and_retries() {
    let h = setup(LAZY);
    h.runtime.start();
    let button = h.node("data-action", "inc");

    h.click(&button);
    assert!(h.scripts.fail("/lazy.js", "network down"));
    assert_eq!(h.runtime.buffered_count("lazy"), 1);
    assert_eq!(h.runtime.load_status("/lazy.js"), LoadStatus::Failed);

    h.click(&button);
    assert_eq!(h.scripts.injection_count("/lazy.js"), 2);
    assert_eq!(h.runtime.buffered_count("lazy"), 2);

    h.runtime.register(
        "lazy",
        Definition::new()
            .state(json!({ "count": 0 }))
            .action("inc", "click", increment),
    );
    h.scripts.complete("/lazy.js", Ok(()));

    assert_eq!(h.runtime.buffered_count("lazy"), 0);
    assert_eq!(h.dom.text(&h.node("data-bind", "count")), "2");
}

#[test]
fn test_replay_never_rebuffers() {
    let h = setup(
        r#"<div data-component="outer"><div data-component="lazy" data-src="/lazy.js" data-load="interaction"><button data-action="save">save</button></div></div>"#,
    );
    h.runtime.start();
    let count = Rc::new(Cell::new(0));
    h.runtime
        .register("outer", Definition::new().action("save", "click", counting(&count)));

    h.click(&h.node("data-action", "save"));
    assert_eq!(count.get(), 0);
    assert_eq!(h.runtime.buffered_count("lazy"), 1);

    // The script ran but never registered "lazy".
    h.scripts.complete("/lazy.js", Ok(()));

    assert_eq!(count.get(), 1);
    assert_eq!(h.runtime.buffered_count("lazy"), 0);
    assert_eq!(h.scripts.injection_count("/lazy.js"), 1);
}

#[test]
fn test_loaded_but_unregistered_bubbles_without_buffering() {
    let h = setup(
        r#"<div data-component="outer"><div data-component="lazy" data-src="/lazy.js" data-load="interaction"><button data-action="save">save</button></div></div>"#,
    );
    h.runtime.start();
    let count = Rc::new(Cell::new(0));
    h.runtime
        .register("outer", Definition::new().action("save", "click", counting(&count)));

    let save = h.node("data-action", "save");
    assert_eq!(
        h.runtime.dispatch(&Interaction::new("click", save.clone())),
        DispatchOutcome::Buffered
    );
    h.scripts.complete("/lazy.js", Ok(()));
    assert_eq!(count.get(), 1);

    assert_eq!(
        h.runtime.dispatch(&Interaction::new("click", save)),
        DispatchOutcome::Handled
    );
    assert_eq!(count.get(), 2);
    assert_eq!(h.runtime.buffered_count("lazy"), 0);
    assert_eq!(h.scripts.injection_count("/lazy.js"), 1);
}

#[test]
fn test_shared_source_injected_once() {
    let h = setup(
        r#"<div data-component="a" data-src="/shared.js"></div><div data-component="b" data-src="/shared.js"></div>"#,
    );
    h.runtime.start();
    assert_eq!(h.scripts.injection_count("/shared.js"), 1);

    h.runtime.register("a", Definition::new().state(json!({})));
    h.runtime.register("b", Definition::new().state(json!({})));
    h.scripts.complete("/shared.js", Ok(()));

    assert_eq!(h.runtime.load_status("/shared.js"), LoadStatus::Loaded);
    assert_eq!(h.runtime.instance_count(), 2);

    // Registered components are skipped on re-scan.
    h.runtime.scan(None);
    assert_eq!(h.scripts.injected(), vec!["/shared.js".to_string()]);
}

#[test]
fn test_unknown_strategy_loads_eagerly() {
    let h = setup(r#"<div data-component="a" data-src="/a.js" data-load="someday"></div>"#);
    h.runtime.start();
    assert_eq!(h.scripts.injection_count("/a.js"), 1);
}

#[test]
fn test_visible_strategy_waits_for_intersection() {
    let h = setup(r#"<div data-component="v" data-src="/v.js" data-load="visible"></div>"#);
    h.runtime.start();
    h.runtime.scan(None);
    let element = h.component("v");

    assert!(h.viewport.is_observed(&element));
    assert_eq!(h.viewport.observed().len(), 1);
    assert_eq!(h.scripts.injection_count("/v.js"), 0);

    h.runtime.notify_visible(&element);
    h.runtime.notify_visible(&element);
    assert_eq!(h.scripts.injection_count("/v.js"), 1);
    assert!(!h.viewport.is_observed(&element));
}

#[test]
fn test_visible_skips_registered_component() {
    let h = setup(r#"<div data-component="v" data-src="/v.js" data-load="visible"></div>"#);
    h.runtime.start();
    h.runtime.register("v", Definition::new());

    h.runtime.notify_visible(&h.component("v"));
    assert_eq!(h.scripts.injection_count("/v.js"), 0);
}

#[test]
fn test_idle_strategy() {
    let h = setup(r#"<div data-component="i" data-src="/i.js" data-load="idle"></div>"#);
    h.runtime.start();
    assert_eq!(h.idle.idle_count(), 1);
    assert_eq!(h.scripts.injection_count("/i.js"), 0);

    h.idle.run_all();
    assert_eq!(h.scripts.injection_count("/i.js"), 1);
}

#[test]
fn test_idle_falls_back_to_defer() {
    let h = setup_with(
        r#"<div data-component="i" data-src="/i.js" data-load="idle"></div>"#,
        ManualIdle::without_idle(),
        RuntimeConfig::default(),
    );
    h.runtime.start();
    assert_eq!(h.idle.idle_count(), 0);
    assert_eq!(h.idle.deferred_count(), 1);

    h.idle.run_all();
    assert_eq!(h.scripts.injection_count("/i.js"), 1);
}

#[test]
fn test_idle_skips_registered_component() {
    let h = setup(r#"<div data-component="i" data-src="/i.js" data-load="idle"></div>"#);
    h.runtime.start();
    h.runtime.register("i", Definition::new());

    h.idle.run_all();
    assert_eq!(h.scripts.injection_count("/i.js"), 0);
}

#[test]
fn test_scan_after_dynamic_insertion() {
    let h = setup(r#"<main id="app"></main>"#);
    h.runtime.start();
    h.runtime
        .register("late", Definition::new().state(json!({ "n": 0 })));

    let app = h.node("id", "app");
    let element = h.dom.create_element("div");
    h.dom.set_attribute(&element, "data-component", "late");
    h.dom.append_child(&app, &element);
    assert!(!h.runtime.has_instance(&element));

    h.runtime.scan(Some(&app));
    assert!(h.runtime.has_instance(&element));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_custom_attribute_names() {
    let config = RuntimeConfig::from_toml_str(
        r#"
        default_events = ["click"]

        [attributes]
        component = "data-island"
        action = "data-on"
        text = "data-text"
        "#,
    )
    .unwrap();
    let h = setup_with(
        r#"<div data-island="c"><b data-text="count">4</b><button data-on="inc">+</button></div>"#,
        ManualIdle::new(),
        config,
    );
    h.runtime.start();
    h.runtime.register(
        "c",
        Definition::new()
            .state(json!({ "count": 0 }))
            .action("inc", "click", increment),
    );

    h.click(&h.node("data-on", "inc"));
    assert_eq!(h.dom.text(&h.node("data-text", "count")), "5");
    assert_eq!(h.dom.listener_count("input"), 0);
}

// =============================================================================
// Host mutation callbacks
// =============================================================================

/// In-memory document that reports every text write synchronously, the way a
/// host mutation observer would.
struct ObservedDom {
    inner: MemoryDom,
    on_text: RefCell<Option<Box<dyn Fn(&MemoryNode)>>>,
}

impl Dom for ObservedDom {
    type Node = MemoryNode;

    fn root(&self) -> MemoryNode {
        self.inner.root()
    }

    fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
        self.inner.parent(node)
    }

    fn children(&self, node: &MemoryNode) -> Vec<MemoryNode> {
        self.inner.children(node)
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
        self.inner.attribute(node, name)
    }

    fn text(&self, node: &MemoryNode) -> String {
        self.inner.text(node)
    }

    fn set_text(&self, node: &MemoryNode, text: &str) {
        self.inner.set_text(node, text);
        if let Some(hook) = self.on_text.borrow().as_ref() {
            hook(node);
        }
    }

    fn is_template(&self, node: &MemoryNode) -> bool {
        self.inner.is_template(node)
    }

    fn template_content(&self, node: &MemoryNode) -> Option<MemoryNode> {
        self.inner.template_content(node)
    }

    fn clone_node(&self, node: &MemoryNode) -> MemoryNode {
        self.inner.clone_node(node)
    }

    fn create_marker(&self) -> MemoryNode {
        self.inner.create_marker()
    }

    fn insert_before(&self, node: &MemoryNode, reference: &MemoryNode) {
        self.inner.insert_before(node, reference);
    }

    fn append_child(&self, parent: &MemoryNode, child: &MemoryNode) {
        self.inner.append_child(parent, child);
    }

    fn remove(&self, node: &MemoryNode) {
        self.inner.remove(node);
    }

    fn clear_children(&self, node: &MemoryNode) {
        self.inner.clear_children(node);
    }

    fn listen(&self, event_type: &str, listener: Listener<MemoryNode>) {
        self.inner.listen(event_type, listener);
    }
}

#[test]
fn test_render_callbacks_can_read_and_patch_state() {
    let dom = Rc::new(ObservedDom {
        inner: MemoryDom::parse(
            r#"<div data-component="c"><span data-bind="count">0</span><p data-if="open">menu</p></div>"#,
        )
        .unwrap(),
        on_text: RefCell::new(None),
    });
    let runtime = Runtime::new(dom.clone());
    runtime.register(
        "c",
        ComponentDefinition::<ObservedDom>::new().state(json!({ "count": 0 })),
    );
    let element = dom.inner.find_by_attr("data-component", "c").unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let (observer, log, target) = (runtime.clone(), seen.clone(), element.clone());
    *dom.on_text.borrow_mut() = Some(Box::new(move |_| {
        let state = observer.state(&target).unwrap();
        log.borrow_mut().push(state["count"].clone());
        if state["count"] == json!(4) {
            observer.patch(&target, json!({ "open": false }));
        }
    }));

    runtime.patch(&element, json!({ "count": 4 }));

    assert_eq!(*seen.borrow(), vec![json!(4)]);
    assert_eq!(dom.inner.text(&element), "4");
    assert_eq!(runtime.state(&element).unwrap()["open"], json!(false));
    assert!(dom.inner.find_by_attr("data-if", "open").is_none());
}
