//! Integration tests for promptweave
//!
//! These exercise both phases end to end against template files on disk.

use promptweave::{
    Config, Diagnostic, DynamicOptions, Inputs, PromptError, PromptLoader, Record, RecordSequence,
    StaticResolver, Template, resolve_dynamic, resolve_dynamic_with, resolve_static,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn inputs(pairs: &[(&str, &str)]) -> Inputs {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn conversation(contents: &[&str]) -> RecordSequence {
    contents
        .iter()
        .enumerate()
        .map(|(i, c)| if i % 2 == 0 { Record::user(*c) } else { Record::assistant(*c) })
        .collect()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_comment_is_stripped_and_input_substituted() {
    let raw = "{{#internal note}}Hello, {{name}}!";
    let t = resolve_static(raw, inputs(&[("name", "Ada")]), &PromptLoader::empty())
        .expect("static resolution");
    assert_eq!(t.content(), "Hello, Ada!");
}

#[test]
fn test_capability_then_count() {
    let raw = "{{feature_x}}\nfunc list: {{func:count}}";
    let t = resolve_static(raw, Inputs::new(), &PromptLoader::empty())
        .expect("static resolution");
    assert_eq!(t.capabilities(), ["feature_x"]);
    assert_eq!(t.content(), "func list: {{func:count}}");

    let resolved = resolve_dynamic(&t, &conversation(&["a", "b", "c"]));
    assert_eq!(resolved.content(), "func list: 3");
}

#[test]
fn test_random_message_over_full_range_is_never_empty() {
    let seq = conversation(&["a", "b", "c", "d", "e"]);
    let t = resolve_static("{{func:message:min:max}}", Inputs::new(), &PromptLoader::empty())
        .unwrap();

    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let resolved = resolve_dynamic_with(&t, &seq, &DynamicOptions::default(), &mut rng);
        assert!(["a", "b", "c", "d", "e"].contains(&resolved.content()));
    }
}

#[test]
fn test_if_variants() {
    let t = resolve_static(
        "[{{func:if:Yes:A:B}}][{{func:if:no:A:B}}][{{func:if:A:B}}]",
        Inputs::new(),
        &PromptLoader::empty(),
    )
    .unwrap();

    let resolved = resolve_dynamic(&t, &RecordSequence::new());
    assert_eq!(resolved.content(), "[A][B][]");
    assert_eq!(resolved.diagnostics.len(), 1);
    assert!(matches!(
        &resolved.diagnostics[0],
        Diagnostic::WrongArity { function, .. } if function == "if"
    ));
}

#[test]
fn test_if_and_choice_read_input_values() {
    let t = resolve_static(
        "[{{func:if:flag:A:B}}][{{func:choice:n}}]",
        inputs(&[("flag", "1"), ("n", "10")]),
        &PromptLoader::empty(),
    )
    .unwrap();

    let resolved = resolve_dynamic(&t, &RecordSequence::new());
    assert!(resolved.is_clean());
    assert_eq!(resolved.content(), "[A][10]");
}

#[test]
fn test_unknown_static_directive_fails() {
    init_tracing();
    let result = resolve_static("intro {{bogus_key}}", Inputs::new(), &PromptLoader::empty());
    match result {
        Err(PromptError::UnsupportedDirective { directive }) => assert_eq!(directive, "bogus_key"),
        other => panic!("expected UnsupportedDirective, got {other:?}"),
    }
}

// =============================================================================
// File-backed templates
// =============================================================================

#[test]
fn test_nested_includes_from_config() {
    init_tracing();
    let temp = TempDir::new().unwrap();
    let prompts = temp.path().join("prompts");
    std::fs::create_dir(&prompts).unwrap();
    std::fs::write(
        prompts.join("refactor.txt"),
        "{{json_mode, long_context}}\n{{#entry point}}\nTask: {{task}}\nContext: {{context}}\n",
    )
    .unwrap();
    std::fs::write(
        prompts.join("context.txt"),
        "Last turn:\n{{func:last}}\nTotal: {{func:count}}",
    )
    .unwrap();

    let config = Config {
        search_paths: vec![prompts.clone()],
        ..Default::default()
    };
    let resolver = StaticResolver::from_config(&config);
    let t = resolver
        .resolve_named("refactor", inputs(&[("task", "summarize")]))
        .expect("static resolution");

    assert_eq!(t.capabilities(), ["json_mode", "long_context"]);
    assert_eq!(
        t.content(),
        "Task: summarize\nContext: Last turn:\n{{func:last}}\nTotal: {{func:count}}"
    );

    let resolved = resolve_dynamic(&t, &conversation(&["q", "answer"]));
    assert!(resolved.is_clean());
    assert_eq!(resolved.content(), "Task: summarize\nContext: Last turn:\nanswer\nTotal: 2");
}

#[test]
fn test_conversation_file_drives_dynamic_phase() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("conversation.json");
    conversation(&["one", "two", "three"]).save(&path).unwrap();

    let seq = RecordSequence::load(&path).unwrap();
    let t = resolve_static("{{func:messages:2:max}}", Inputs::new(), &PromptLoader::empty())
        .unwrap();
    assert_eq!(resolve_dynamic(&t, &seq).content(), "two\nthree");
}

#[test]
fn test_missing_named_template() {
    let temp = TempDir::new().unwrap();
    let resolver = StaticResolver::new(PromptLoader::new([temp.path()]));
    assert!(matches!(
        resolver.resolve_named("absent", Inputs::new()),
        Err(PromptError::FileNotFound { .. })
    ));
}

#[test]
fn test_derived_template_keeps_capabilities() {
    let t = resolve_static("{{vision}}\nbody", Inputs::new(), &PromptLoader::empty()).unwrap();
    let derived = Template::derive(&t, inputs(&[("extra", "1")]));
    let again = Template::derive(&derived, Inputs::new());
    assert_eq!(again.capabilities(), t.capabilities());
    assert_eq!(again.input("extra"), Some("1"));
}

// =============================================================================
// Properties
// =============================================================================

fn plain_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.!?]{0,24}"
}

proptest! {
    #[test]
    fn prop_input_substitution_is_exact(key in "[a-z]{1,8}", value in "[a-zA-Z0-9 {}#:]{0,24}") {
        let raw = format!("<{{{{{}}}}}>", key);
        let inputs = inputs(&[(key.as_str(), value.as_str())]);
        let t = resolve_static(&raw, inputs, &PromptLoader::empty()).unwrap();
        prop_assert_eq!(t.content(), format!("<{}>", value));
    }

    #[test]
    fn prop_message_index(
        contents in prop::collection::vec(plain_text(), 0..8),
        index in 0i64..10,
    ) {
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let seq = conversation(&refs);
        let raw = format!("{{{{func:message:{}}}}}", index);
        let t = resolve_static(&raw, Inputs::new(), &PromptLoader::empty()).unwrap();

        let expected = if index >= 1 && (index as usize) <= contents.len() {
            contents[index as usize - 1].clone()
        } else {
            String::new()
        };
        let resolved = resolve_dynamic(&t, &seq);
        prop_assert_eq!(resolved.content(), expected.as_str());
    }

    #[test]
    fn prop_count_matches_len(contents in prop::collection::vec(plain_text(), 0..12)) {
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let t = resolve_static("{{func:count}}", Inputs::new(), &PromptLoader::empty()).unwrap();
        let resolved = resolve_dynamic(&t, &conversation(&refs));
        prop_assert_eq!(resolved.content(), contents.len().to_string());
    }

    #[test]
    fn prop_first_and_last_cover_sequence(contents in prop::collection::vec("[a-z]{1,6}", 1..8)) {
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let seq = conversation(&refs);
        let n = contents.len();
        let joined = contents.join("\n");

        let loader = PromptLoader::empty();
        let first_raw = format!("{{{{func:first:{}}}}}", n);
        let last_raw = format!("{{{{func:last:{}}}}}", n);
        let first = resolve_static(&first_raw, Inputs::new(), &loader).unwrap();
        let last = resolve_static(&last_raw, Inputs::new(), &loader).unwrap();
        let first = resolve_dynamic(&first, &seq);
        let last = resolve_dynamic(&last, &seq);
        prop_assert_eq!(first.content(), joined.as_str());
        prop_assert_eq!(last.content(), joined.as_str());
    }

    #[test]
    fn prop_static_resolution_is_idempotent(body in plain_text(), n in 0u8..5) {
        let raw = format!("{} {{{{func:last:{}}}}} {}", body, n, body);
        let once = resolve_static(&raw, Inputs::new(), &PromptLoader::empty()).unwrap();
        let twice = resolve_static(once.content(), Inputs::new(), &PromptLoader::empty()).unwrap();
        prop_assert_eq!(once.content(), twice.content());
    }
}
