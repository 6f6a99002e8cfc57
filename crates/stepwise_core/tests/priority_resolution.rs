use stepwise_core::{
    Argument, ContainerError, Definition, ExtensionPoint, Registry, ServiceProcessor,
};

fn ids(registry: &Registry, point: &ExtensionPoint) -> Vec<String> {
    registry
        .sorted_by_priority(point)
        .into_iter()
        .map(|id| id.to_string())
        .collect()
}

#[test]
fn priorities_descend_and_ties_keep_registration_order() {
    let mut registry = Registry::new();
    for (id, priority) in [("c", 0), ("a", 50), ("d", 100), ("b", 50), ("e", -10)] {
        registry.define(
            id,
            Definition::new("Engine").with_tag(ExtensionPoint::SearchEngine, priority),
        );
    }
    registry.define("untagged", Definition::new("Engine"));

    assert_eq!(
        ids(&registry, &ExtensionPoint::SearchEngine),
        vec!["d", "a", "b", "c", "e"]
    );

    let priorities: Vec<i32> = registry
        .tag_index()
        .get(&ExtensionPoint::SearchEngine)
        .iter()
        .map(|tagged| tagged.priority)
        .collect();
    assert!(priorities.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn empty_tag_resolves_to_empty_sequence() {
    let mut registry = Registry::new();
    registry.define(
        "engine",
        Definition::new("Engine").with_tag(ExtensionPoint::SearchEngine, 10),
    );

    assert!(registry
        .sorted_by_priority(&ExtensionPoint::ExceptionStringer)
        .is_empty());
    assert!(ServiceProcessor::new()
        .find_and_sort_tagged_services(&registry, &ExtensionPoint::CliController)
        .is_empty());
    assert!(registry
        .tag_index()
        .get(&ExtensionPoint::AnnotationReader)
        .is_empty());
}

#[test]
fn redefining_keeps_single_entry_with_last_definition() {
    let mut registry = Registry::new();
    registry.define("first", Definition::new("First"));
    registry.define(
        "x",
        Definition::new("Original").with_tag(ExtensionPoint::SearchEngine, 1),
    );
    registry.define("last", Definition::new("Last"));
    registry.define(
        "x",
        Definition::new("Replacement").with_tag(ExtensionPoint::SearchEngine, 7),
    );

    assert_eq!(registry.len(), 3);
    let entry = registry.get("x").expect("x defined");
    assert_eq!(entry.factory(), "Replacement");
    assert_eq!(entry.priority_for(&ExtensionPoint::SearchEngine), Some(7));

    let order: Vec<String> = registry
        .definitions()
        .map(|(id, _)| id.to_string())
        .collect();
    assert_eq!(order, vec!["first", "x", "last"]);
}

#[test]
fn method_calls_keep_append_order() {
    let mut registry = Registry::new();
    registry.define("consumer", Definition::new("Consumer"));

    registry
        .add_method_call("consumer", "append_handler", vec!["alpha".into()])
        .expect("first call");
    registry
        .add_method_call("consumer", "append_handler", vec!["beta".into()])
        .expect("second call");

    let arguments: Vec<Argument> = registry
        .method_calls("consumer")
        .expect("calls")
        .iter()
        .map(|call| call.arguments()[0].clone())
        .collect();
    assert_eq!(arguments, vec![Argument::from("alpha"), Argument::from("beta")]);

    let err = registry
        .add_method_call("undefined", "append_handler", Vec::new())
        .expect_err("undefined consumer");
    assert_eq!(err, ContainerError::UnknownService("undefined".into()));
}

#[test]
fn custom_points_resolve_like_builtins() {
    let point = ExtensionPoint::custom("acme.formatter").expect("valid name");
    assert_eq!(
        ExtensionPoint::custom("exception.stringer").expect("builtin name"),
        ExtensionPoint::ExceptionStringer
    );
    assert!(ExtensionPoint::custom("NoDots").is_err());

    let mut registry = Registry::new();
    registry.define("pretty", Definition::new("Pretty").with_tag(point.clone(), 5));
    registry.define("plain", Definition::new("Plain").with_tag(point.clone(), 5));
    assert_eq!(ids(&registry, &point), vec!["pretty", "plain"]);
}
