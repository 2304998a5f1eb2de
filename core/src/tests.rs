//! End-to-end pipeline scenarios: host push in, host message out.

use crate::{
    App, EventBridge, HostMessage, Instruction, LiveTree, MessageKind, Recorder,
    error::{DecodeError, Error, RenderError},
    render::{RenderOptions, Renderer},
    widget::{Container, Label},
};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn app() -> (App<crate::MemoryTree, Recorder>, Recorder) {
    let recorder = Recorder::new();
    let app = App::headless(EventBridge::new(recorder.clone()));
    (app, recorder)
}

fn update(tree: &str) -> String {
    format!(r#"{{"type":"Update","tree":{tree}}}"#)
}

const OK_SCREEN: &str = r#"{"type":"container","style":{},"children":[
    {"type":"button","name":"ok","text":"OK","disabled":false}
]}"#;

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn init_is_sent_exactly_once() {
    let (mut app, recorder) = app();
    assert!(app.start());
    assert!(!app.start());
    assert_eq!(
        recorder.payloads(),
        [r#"{"kind":"init","source":"app"}"#]
    );
}

#[test]
fn ok_button_round_trip() {
    let (mut app, recorder) = app();
    app.start();
    app.handle(&update(OK_SCREEN)).expect("cycle should succeed");

    let tree = app.target().tree();
    let buttons = tree.find_by_tag(tree.root(), "button");
    assert_eq!(buttons.len(), 1);
    assert_eq!(tree.text_content(buttons[0]), "OK");
    assert!(!tree.attributes(&buttons[0]).contains_key("disabled"));

    assert!(app.dispatch(buttons[0], "click", None));
    let messages = recorder.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1], HostMessage::click("ok"));
    assert_eq!(
        recorder.payloads()[1],
        r#"{"kind":"click","source":"ok"}"#
    );
}

#[test]
fn click_on_button_text_bubbles_to_the_button() {
    let (mut app, recorder) = app();
    app.handle(&update(r#"{"type":"button","name":"save","text":"Save"}"#))
        .expect("cycle should succeed");
    let tree = app.target().tree();
    let button = tree.find_by_tag(tree.root(), "button")[0];
    let text = tree.children(&button)[0];

    assert!(app.dispatch(text, "click", None));
    let clicks: Vec<_> = recorder
        .messages()
        .into_iter()
        .filter(|message| message.kind == MessageKind::Click)
        .collect();
    assert_eq!(clicks, [HostMessage::click("save")]);
}

#[test]
fn children_render_in_order() {
    let (mut app, _) = app();
    app.handle(&update(
        r#"{"type":"container","children":[
            {"type":"label","name":"c1","text":"1"},
            {"type":"label","name":"c2","text":"2"},
            {"type":"label","name":"c3","text":"3"}
        ]}"#,
    ))
    .expect("cycle should succeed");
    let tree = app.target().tree();
    assert_eq!(tree.text_content(tree.root()), "123");
}

#[test]
fn unknown_kind_among_known_siblings() {
    let (mut app, _) = app();
    app.handle(&update(
        r#"{"type":"container","children":[
            {"type":"label","name":"a","text":"A"},
            {"type":"hologram","beams":3},
            {"type":"button","name":"b","text":"B"}
        ]}"#,
    ))
    .expect("unknown kinds never fail a cycle");
    let tree = app.target().tree();
    assert_eq!(tree.text_content(tree.root()), "AB");
    assert_eq!(tree.find_by_tag(tree.root(), "button").len(), 1);
}

#[test]
fn malformed_push_leaves_the_view_untouched() {
    let (mut app, _) = app();
    app.handle(&update(OK_SCREEN)).expect("cycle should succeed");
    let before = app.target().tree().to_html(app.target().tree().root());
    let current = app.current().cloned();

    let error = app
        .handle(&update(r#"{"type":"container","children":{"type":"label"}}"#))
        .expect_err("children must be a sequence");
    assert!(matches!(error, Error::Decode(DecodeError::Malformed(_))));

    assert_eq!(app.target().tree().to_html(app.target().tree().root()), before);
    assert_eq!(app.current().cloned(), current);
}

#[test]
fn too_deep_tree_aborts_before_patching() {
    let recorder = Recorder::new();
    let mut app = App::headless(EventBridge::new(recorder))
        .with_renderer(Renderer::with_options(RenderOptions { max_depth: 2 }));
    let error = app
        .handle(&update(
            r#"{"type":"container","children":[{"type":"container","children":[{"type":"label","name":"x"}]}]}"#,
        ))
        .expect_err("three levels exceed the limit");
    assert!(matches!(error, Error::Decode(DecodeError::TooDeep { limit: 2 })));
    assert!(app.target().mounted().is_none());
    assert!(app.target().tree().mutations().is_empty());
}

#[test]
fn programmatic_trees_are_depth_checked_by_the_renderer() {
    let recorder = Recorder::new();
    let mut app = App::headless(EventBridge::new(recorder))
        .with_renderer(Renderer::with_options(RenderOptions { max_depth: 1 }));
    let tree = Container::default().child(Label::new("x")).into();
    let error = app
        .apply(Instruction::Update(tree))
        .expect_err("two levels exceed the limit");
    assert!(matches!(error, Error::Render(RenderError::TooDeep { limit: 1 })));
    assert!(app.target().mounted().is_none());
}

#[test]
fn deep_trees_within_the_default_limit_render() {
    let (mut app, _) = app();
    let mut tree = r#"{"type":"label","name":"leaf","text":"bottom"}"#.to_string();
    for _ in 1..100 {
        tree = format!(r#"{{"type":"container","children":[{tree}]}}"#);
    }
    app.handle(&update(&tree)).expect("100 levels are within the limit");
    let tree = app.target().tree();
    assert_eq!(tree.text_content(tree.root()), "bottom");
    assert_eq!(tree.node_count(), 1 + 100 + 1);
}

#[test]
fn long_running_headless_app_stays_bounded() {
    let (mut app, _) = app();
    let label = update(r#"{"type":"label","name":"l","text":"L"}"#);
    let button = update(r#"{"type":"button","name":"b","text":"B"}"#);
    for round in 0..1000 {
        let push = if round % 2 == 0 { &label } else { &button };
        app.handle(push).expect("cycle should succeed");
    }

    let tree = app.target().tree();
    assert_eq!(tree.node_count(), 3);
    assert!(tree.allocated() <= 5);
    assert!(tree.mutations().len() <= crate::memory::DEFAULT_LOG_LIMIT);

    let drained = app.target_mut().tree_mut().take_mutations();
    assert!(!drained.is_empty());
    assert!(app.target().tree().mutations().is_empty());
}

#[test]
fn repeated_push_is_a_no_op() {
    let (mut app, _) = app();
    app.handle(&update(OK_SCREEN)).expect("cycle should succeed");
    let summary = app.handle(&update(OK_SCREEN)).expect("cycle should succeed");
    assert!(summary.is_empty());
}

#[test]
fn label_becomes_container_by_replacement() {
    let (mut app, _) = app();
    app.handle(&update(r#"{"type":"container","children":[{"type":"label","name":"l","text":"L"}]}"#))
        .expect("cycle should succeed");
    let summary = app
        .handle(&update(
            r#"{"type":"container","children":[{"type":"container","children":[]}]}"#,
        ))
        .expect("cycle should succeed");
    assert_eq!(summary.replaced, 1);
    assert_eq!(summary.attributes, 0);
}

#[test]
fn inputs_report_changes_with_values() {
    let (mut app, recorder) = app();
    app.handle(&update(
        r#"{"type":"container","children":[
            {"type":"checkbox","name":"agree","text":"Agree"},
            {"type":"textinput","name":"who","value":"Ada"},
            {"type":"range","name":"volume","min":0,"max":11,"value":3}
        ]}"#,
    ))
    .expect("cycle should succeed");
    let tree = app.target().tree();
    let inputs = tree.find_by_tag(tree.root(), "input");
    assert_eq!(inputs.len(), 3);

    assert!(app.dispatch(inputs[0], "change", Some("true".into())));
    assert!(app.dispatch(inputs[1], "change", Some("Grace".into())));
    assert!(app.dispatch(inputs[2], "input", Some("11".into())));
    assert!(!app.dispatch(inputs[2], "change", Some("11".into())));

    assert_eq!(
        recorder.messages(),
        [
            HostMessage::change("agree", "true"),
            HostMessage::change("who", "Grace"),
            HostMessage::change("volume", "11"),
        ]
    );
}

#[test]
fn bare_tree_is_still_rendered() {
    let (mut app, _) = app();
    app.handle(r#"{"type":"label","name":"legacy","text":"old host"}"#)
        .expect("bare trees are accepted");
    let tree = app.target().tree();
    assert_eq!(tree.text_content(tree.root()), "old host");
}

#[test]
fn choice_widgets_report_indices() {
    let (mut app, recorder) = app();
    app.handle(&update(
        r#"{"type":"container","children":[
            {"type":"radio","name":"size","choices":["S","M","L"]},
            {"type":"tabs","name":"pages","children":[
                {"title":"One","content":{"type":"label","name":"a","text":"first"}},
                {"title":"Two","content":{"type":"label","name":"b","text":"second"}}
            ]},
            {"type":"combo","name":"city","choices":["Oslo","Rome"],"opened":true}
        ]}"#,
    ))
    .expect("cycle should succeed");
    let tree = app.target().tree();
    let labels = tree.find_by_tag(tree.root(), "label");
    assert_eq!(tree.text_content(labels[2]), "L");

    assert!(app.dispatch(labels[2], "click", None));
    let title = tree
        .find_by_tag(tree.root(), "div")
        .into_iter()
        .find(|node| tree.text_content(*node) == "Two" && !tree.handlers(node).is_empty())
        .expect("second tab title");
    assert!(app.dispatch(title, "click", None));
    let choice = tree
        .find_by_tag(tree.root(), "div")
        .into_iter()
        .find(|node| tree.attributes(node).get("class").map(String::as_str) == Some("combo-choice"))
        .expect("first combo choice");
    assert!(app.dispatch(choice, "mousedown", None));

    let messages = recorder.messages();
    assert_eq!(
        messages[0],
        HostMessage {
            value: Some("2".into()),
            ..HostMessage::click("size")
        }
    );
    assert_eq!(
        messages[1],
        HostMessage {
            value: Some("1".into()),
            ..HostMessage::click("pages")
        }
    );
    assert_eq!(messages[2], HostMessage::change("city", "0"));
}
