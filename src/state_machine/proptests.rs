//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across generated event sequences,
//! plus end-to-end navigation scenarios.

use super::*;
use crate::menu::{ButtonSpec, ButtonVariant, CallbackToken, CommandSpec, MenuDecl, MenuOption, Registry, TextRule};
use crate::render::render;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
// Test Helpers
// ============================================================================

fn nav_registry() -> Registry {
    let mut builder = Registry::builder("Root");
    builder
        .register(MenuDecl::goto("Root", ["TestMenu", "AnotherTestMenu"]).id("Root"))
        .unwrap();
    builder
        .register(
            MenuDecl::goto(
                "TestMenu",
                [
                    ButtonSpec::goto("other", "AnotherTestMenu"),
                    ButtonSpec::goto("home", "Root"),
                    ButtonSpec::back("back"),
                ],
            )
            .id("TestMenu"),
        )
        .unwrap();
    builder
        .register(
            MenuDecl::goto(
                "AnotherTestMenu",
                [
                    ButtonSpec::goto("test", "TestMenu"),
                    ButtonSpec::goto("home", "Root"),
                    ButtonSpec::back("back"),
                ],
            )
            .id("AnotherTestMenu"),
        )
        .unwrap();
    builder.command("back", CommandSpec::Press(ButtonSpec::back("back")));
    builder.build().unwrap()
}

fn form_registry() -> Registry {
    let mut builder = Registry::builder("Root");
    builder
        .register(
            MenuDecl::goto(
                "Root",
                [
                    ButtonSpec::from("Pick"),
                    ButtonSpec::from("Pony"),
                    ButtonSpec::from("Name"),
                    ButtonSpec::from("Loop"),
                    ButtonSpec::from("Letters"),
                    ButtonSpec::goto_storing("Quick", "Summary", StoredValue::Text("quick".into())),
                ],
            )
            .id("Root"),
        )
        .unwrap();
    builder
        .register(
            MenuDecl::radio("Letters", ["a", "b", "c", "d", "e"])
                .page_size(2)
                .done(ButtonSpec::done("Ok")),
        )
        .unwrap();
    builder
        .register(
            MenuDecl::checkbox(
                "Pick",
                [MenuOption::new("a", "A"), MenuOption::new("b", "B").selected(), MenuOption::new("c", "C")],
            )
            .cancel(ButtonSpec::cancel("Stop"))
            .done(ButtonSpec::done("Ok")),
        )
        .unwrap();
    builder.register(MenuDecl::radio("Pony", ["A", "B"])).unwrap();
    builder
        .register(MenuDecl::text_input("Name", TextRule::Text).next("Age"))
        .unwrap();
    builder
        .register(
            MenuDecl::text_input("Age", TextRule::Int)
                .next("Extras")
                .command("skip", CommandSpec::Press(ButtonSpec::done_to("skip", "Summary"))),
        )
        .unwrap();
    builder
        .register(
            MenuDecl::checkbox("Extras", ["x", "y"])
                .command("rename", CommandSpec::Press(ButtonSpec::cancel_to("Rename", "Name")))
                .cancel(ButtonSpec::cancel_to("Stop", "Root"))
                .done(ButtonSpec::done_to("Finish", "Summary")),
        )
        .unwrap();
    builder
        .register(
            MenuDecl::goto("Summary", Vec::<ButtonSpec>::new())
                .title("Summary")
                .description("{NAME} is {AGE}"),
        )
        .unwrap();
    builder
        .register(MenuDecl::goto("Loop", [ButtonSpec::goto("again", "Loop"), ButtonSpec::back("back")]))
        .unwrap();
    builder.command("start", CommandSpec::Restart("Root".into()));
    builder.command("reset", CommandSpec::Press(ButtonSpec::cancel_to("Reset", "Root")));
    builder.build().unwrap()
}

/// A conversation driven through `step`, numbering its own events
struct Conv<'r> {
    registry: &'r Registry,
    state: ConversationState,
    seq: u32,
}

impl<'r> Conv<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            state: ConversationState::at_root(registry),
            seq: 0,
        }
    }

    fn event(&mut self, kind: EventKind, payload: &str) -> Event {
        self.seq += 1;
        Event::new("conv", format!("evt-{}", self.seq), kind, payload)
    }

    fn apply(&mut self, event: &Event) -> Step {
        let step = step(&self.state, self.registry, event);
        self.state = step.new_state.clone();
        step
    }

    fn send(&mut self, kind: EventKind, payload: &str) -> Step {
        let event = self.event(kind, payload);
        self.apply(&event)
    }

    fn token(&self, label: &str) -> String {
        let menu = self.registry.resolve(&self.state.current_menu_id).unwrap();
        let index = menu
            .buttons
            .iter()
            .position(|b| b.label == label)
            .unwrap_or_else(|| panic!("no button {label:?} in {}", menu.id));
        CallbackToken::new(menu.tag.as_str(), index).encode()
    }

    fn press(&mut self, label: &str) -> Step {
        let token = self.token(label);
        self.send(EventKind::Button, &token)
    }

    fn text(&mut self, text: &str) -> Step {
        self.send(EventKind::Text, text)
    }

    fn collected(&self, menu_id: &str) -> Option<&StoredValue> {
        self.state.collected.get(menu_id)
    }
}

fn checked(keys: &[&str]) -> StoredValue {
    StoredValue::Checked(keys.iter().map(|k| (*k).to_string()).collect())
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum NavAction {
    /// Press the n-th Goto button (modulo how many the menu has)
    Goto(usize),
    Back,
}

fn arb_nav_action() -> impl Strategy<Value = NavAction> {
    prop_oneof![
        (0usize..4).prop_map(NavAction::Goto),
        Just(NavAction::Back),
    ]
}

fn arb_subset() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(prop_oneof![Just("a"), Just("b"), Just("c")], 0..=3)
        .prop_map(|keys| keys.into_iter().map(str::to_string).collect())
}

fn nav_event(conv: &mut Conv<'_>, action: &NavAction) -> Event {
    match action {
        NavAction::Goto(n) => {
            let menu = conv.registry.resolve(&conv.state.current_menu_id).unwrap();
            let gotos: Vec<usize> = menu
                .buttons
                .iter()
                .enumerate()
                .filter(|(_, b)| matches!(b.variant, ButtonVariant::Goto { .. }))
                .map(|(i, _)| i)
                .collect();
            let index = gotos[n % gotos.len()];
            let token = CallbackToken::new(menu.tag.as_str(), index).encode();
            conv.event(EventKind::Button, &token)
        }
        NavAction::Back => conv.event(EventKind::Command, "/back"),
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// History length tracks gotos minus backs, never going negative
    #[test]
    fn prop_history_length_tracks_navigation(actions in prop::collection::vec(arb_nav_action(), 0..40)) {
        let registry = nav_registry();
        let mut conv = Conv::new(&registry);
        let mut expected = 0usize;

        for action in &actions {
            let event = nav_event(&mut conv, action);
            conv.apply(&event);
            match action {
                NavAction::Goto(_) => expected += 1,
                NavAction::Back => expected = expected.saturating_sub(1),
            }
            prop_assert_eq!(conv.state.history.len(), expected);
            prop_assert!(conv.state.history.windows(2).all(|w| w[0] != w[1]));
        }
    }

    /// Re-delivering an event changes nothing and writes nothing
    #[test]
    fn prop_replay_is_idempotent(actions in prop::collection::vec(arb_nav_action(), 1..20)) {
        let registry = nav_registry();
        let mut conv = Conv::new(&registry);

        for action in &actions {
            let event = nav_event(&mut conv, action);
            let first = conv.apply(&event);
            let after_first = conv.state.clone();

            let replay = conv.apply(&event);
            prop_assert_eq!(&conv.state, &after_first);
            prop_assert!(!replay.persists());
            // Recovered events (Back at the root) are never recorded as applied
            if first.recovered.is_none() {
                prop_assert_eq!(replay.recovered, Some(RecoveryReason::Replayed));
            }
        }
    }

    /// Toggling the same option twice restores the checkbox value
    #[test]
    fn prop_toggle_is_self_inverse(initial in arb_subset(), key in prop_oneof![Just("A"), Just("B"), Just("C")]) {
        let registry = form_registry();
        let mut conv = Conv::new(&registry);
        conv.press("Pick");
        conv.state.collected.insert("PICK".into(), StoredValue::Checked(initial.clone()));

        conv.press(key);
        let between = conv.collected("PICK").cloned();
        prop_assert_ne!(between, Some(StoredValue::Checked(initial.clone())));
        conv.press(key);
        prop_assert_eq!(conv.collected("PICK"), Some(&StoredValue::Checked(initial)));
    }

    /// Rendering is a pure function of its inputs
    #[test]
    fn prop_render_is_idempotent(selection in arb_subset(), name in "[A-Za-z<>& ]{0,20}") {
        let registry = form_registry();
        let mut collected = CollectedData::new();
        collected.insert("PICK".into(), StoredValue::Checked(selection));
        collected.insert("NAME".into(), StoredValue::Text(name));

        for menu_id in registry.menu_ids() {
            let menu = registry.resolve(menu_id).unwrap();
            prop_assert_eq!(render(menu, &collected, 0, None), render(menu, &collected, 0, None));
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_goto_then_back() {
    let registry = nav_registry();
    let mut conv = Conv::new(&registry);

    conv.press("TestMenu");
    assert_eq!(conv.state.history, vec!["Root".to_string()]);
    assert_eq!(conv.state.current_menu_id, "TestMenu");

    conv.press("back");
    assert!(conv.state.history.is_empty());
    assert_eq!(conv.state.current_menu_id, "Root");
}

#[test]
fn test_back_at_root_is_recovered() {
    let registry = nav_registry();
    let mut conv = Conv::new(&registry);
    let before = conv.state.clone();

    let step = conv.send(EventKind::Command, "/back");
    assert_eq!(step.recovered, Some(RecoveryReason::NoHistory));
    assert_eq!(conv.state, before);
    assert!(matches!(step.effects.as_slice(), [Effect::Deliver { .. }]));
}

#[test]
fn test_transition_effects_persist_before_deliver() {
    let registry = nav_registry();
    let mut conv = Conv::new(&registry);
    let step = conv.press("AnotherTestMenu");
    let [Effect::PersistState, Effect::Deliver { payload }] = step.effects.as_slice() else {
        panic!("unexpected effects {:?}", step.effects);
    };
    assert!(payload.text.contains("AnotherTestMenu"));
    assert_eq!(conv.state.version, 1);
}

#[test]
fn test_radio_last_selection_wins() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Pony");
    // No option is selected by default
    assert_eq!(conv.collected("PONY"), None);

    conv.press("A");
    conv.press("B");
    assert_eq!(conv.collected("PONY"), Some(&StoredValue::Selected("B".into())));
}

#[test]
fn test_checkbox_toggles() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Pick");
    assert_eq!(conv.collected("PICK"), Some(&checked(&["b"])));

    conv.state.collected.insert("PICK".into(), checked(&[]));
    conv.press("A");
    conv.press("B");
    conv.press("A");
    assert_eq!(conv.collected("PICK"), Some(&checked(&["b"])));
}

#[test]
fn test_checkbox_cancel_discards_and_done_keeps() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);

    conv.press("Pick");
    conv.press("A");
    conv.press("Ok");
    assert_eq!(conv.state.current_menu_id, "Root");
    assert_eq!(conv.collected("PICK"), Some(&checked(&["a", "b"])));

    conv.press("Pick");
    conv.press("C");
    conv.press("Stop");
    assert_eq!(conv.state.current_menu_id, "Root");
    assert_eq!(conv.collected("PICK"), None);
}

#[test]
fn test_empty_text_is_rejected() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Name");
    let before = conv.state.clone();

    let step = conv.text("");
    assert_eq!(step.recovered, Some(RecoveryReason::ValidationFailed));
    assert_eq!(conv.state, before);
    let [Effect::Deliver { payload }] = step.effects.as_slice() else {
        panic!("unexpected effects {:?}", step.effects);
    };
    assert!(payload.text.contains("⚠️ Please enter some text."));
}

#[test]
fn test_text_chain_and_cancel_to_root() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);

    conv.press("Name");
    conv.text("Littlepip");
    assert_eq!(conv.state.current_menu_id, "AGE");
    conv.text("not a number");
    assert_eq!(conv.state.current_menu_id, "AGE");
    conv.text(" 23 ");
    assert_eq!(conv.state.current_menu_id, "EXTRAS");
    conv.press("x");
    assert_eq!(conv.state.history, vec!["Root", "NAME", "AGE"]);
    assert_eq!(conv.state.collected.len(), 3);

    conv.press("Stop");
    assert_eq!(conv.state.current_menu_id, "Root");
    assert!(conv.state.history.is_empty());
    assert!(conv.state.collected.is_empty());
}

#[test]
fn test_done_to_target_keeps_data() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);

    conv.press("Name");
    conv.text("Pip");
    conv.text("19");
    let step = conv.press("Finish");
    assert_eq!(conv.state.current_menu_id, "SUMMARY");
    let Some(Effect::Deliver { payload }) = step.effects.last() else {
        panic!("expected a render");
    };
    assert_eq!(payload.text, "<b>Summary</b>\nPip is 19");
}

#[test]
fn test_menu_command_only_in_its_menu() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);

    let step = conv.send(EventKind::Command, "/skip");
    assert_eq!(step.recovered, Some(RecoveryReason::Ignored));

    conv.press("Name");
    conv.text("Pip");
    conv.send(EventKind::Command, "/skip");
    assert_eq!(conv.state.current_menu_id, "SUMMARY");
    assert_eq!(conv.collected("NAME"), Some(&StoredValue::Text("Pip".into())));
}

#[test]
fn test_global_restart_from_text_message() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Name");
    conv.text("Pip");

    // Commands typed as text beat the text rule
    conv.text("/start");
    assert_eq!(conv.state.current_menu_id, "Root");
    assert!(conv.state.history.is_empty());
    assert!(conv.state.collected.is_empty());
}

#[test]
fn test_token_typed_as_text_wins_over_parsing() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Name");
    let back = conv.token("« Back");

    conv.text(&back);
    assert_eq!(conv.state.current_menu_id, "Root");
    assert_eq!(conv.collected("NAME"), None);
}

#[test]
fn test_self_goto_does_not_grow_history() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Loop");
    conv.press("again");
    conv.press("again");
    assert_eq!(conv.state.history, vec!["Root"]);
    assert_eq!(conv.state.version, 3);
}

#[test]
fn test_stale_token_from_previous_menu() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    let old = conv.token("Pick");
    conv.press("Pony");
    let before = conv.state.clone();

    let step = conv.send(EventKind::Button, &old);
    assert_eq!(step.recovered, Some(RecoveryReason::StaleButton));
    assert_eq!(conv.state, before);
}

#[test]
fn test_transition_is_pure() {
    let registry = form_registry();
    let state = ConversationState::at_root(&registry);
    let root = registry.resolve("Root").unwrap();
    let token = CallbackToken::new(root.tag.as_str(), 0).encode();
    let event = Event::button("conv", "e1", &token);

    let first = transition(&state, &registry, &event).unwrap();
    let second = transition(&state, &registry, &event).unwrap();
    assert_eq!(first.new_state, second.new_state);
    assert_eq!(first.effects, second.effects);
    assert_eq!(state, ConversationState::at_root(&registry));
}

#[test]
fn test_cancel_to_root_drops_data_from_side_branches() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);

    // Pony is visited and left with Back, which keeps its selection
    conv.press("Pony");
    conv.press("A");
    conv.press("« Back");
    assert_eq!(conv.collected("PONY"), Some(&StoredValue::Selected("A".into())));

    conv.press("Name");
    conv.text("Pip");
    conv.text("23");
    conv.press("Stop");
    assert_eq!(conv.state.current_menu_id, "Root");
    assert!(conv.state.history.is_empty());
    assert!(conv.state.collected.is_empty(), "left over: {:?}", conv.state.collected);
}

#[test]
fn test_cancel_to_current_menu_clears_side_data() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Pony");
    conv.press("B");
    conv.press("« Back");
    assert_eq!(conv.state.current_menu_id, "Root");

    let step = conv.send(EventKind::Command, "/reset");
    assert_eq!(step.recovered, None);
    assert_eq!(conv.state.current_menu_id, "Root");
    assert!(conv.state.collected.is_empty());
}

#[test]
fn test_cancel_to_ancestor_keeps_data_on_the_path() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Name");
    conv.text("Pip");
    conv.text("23");
    conv.press("y");
    assert_eq!(conv.state.current_menu_id, "EXTRAS");

    conv.send(EventKind::Command, "/rename");
    assert_eq!(conv.state.current_menu_id, "NAME");
    assert_eq!(conv.state.history, vec!["Root"]);
    assert_eq!(conv.collected("NAME"), Some(&StoredValue::Text("Pip".into())));
    assert_eq!(conv.collected("AGE"), None);
    assert_eq!(conv.collected("EXTRAS"), None);
}

#[test]
fn test_pages_move_and_clamp() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Letters");
    assert_eq!(conv.state.page_of("LETTERS"), 0);

    // No previous page yet: stays on the first one
    let step = conv.press("‹ Prev");
    assert_eq!(step.recovered, None);
    assert_eq!(conv.state.page_of("LETTERS"), 0);

    conv.press("Next ›");
    let step = conv.press("Next ›");
    assert_eq!(conv.state.page_of("LETTERS"), 2);
    let Some(Effect::Deliver { payload }) = step.effects.last() else {
        panic!("expected a render");
    };
    assert_eq!(payload.buttons[0][0].label, "⚪ e");

    conv.press("Next ›");
    assert_eq!(conv.state.page_of("LETTERS"), 2);

    // Options on other pages stay pressable from older messages
    conv.press("a");
    assert_eq!(conv.collected("LETTERS"), Some(&StoredValue::Selected("a".into())));
    conv.press("‹ Prev");
    assert_eq!(conv.state.page_of("LETTERS"), 1);

    conv.press("Ok");
    assert_eq!(conv.state.current_menu_id, "Root");
    assert_eq!(conv.state.page_of("LETTERS"), 1);

    conv.text("/start");
    assert!(conv.state.pages.is_empty());
}

#[test]
fn test_goto_storing_records_value_under_pressed_menu() {
    let registry = form_registry();
    let mut conv = Conv::new(&registry);
    conv.press("Quick");
    assert_eq!(conv.state.current_menu_id, "SUMMARY");
    assert_eq!(conv.state.history, vec!["Root"]);
    assert_eq!(conv.collected("Root"), Some(&StoredValue::Text("quick".into())));
}
