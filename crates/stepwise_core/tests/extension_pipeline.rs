use serde_json::json;
use stepwise_core::{
    ConfigSchema, ContainerError, Definition, DefinitionExtension, ExceptionExtension, Extension,
    ExtensionConfig, ExtensionError, ExtensionManager, ExtensionPhase, ExtensionPoint, OptionKind,
    Reference, Registry,
};

/// Contributes search engines under `definition.search_engine`.
struct SearchContributor {
    key: &'static str,
    engines: Vec<(&'static str, i32)>,
}

impl Extension for SearchContributor {
    fn config_key(&self) -> &str {
        self.key
    }

    fn load(&self, registry: &mut Registry, _config: &ExtensionConfig) -> Result<(), ContainerError> {
        for (id, priority) in &self.engines {
            registry.define(
                *id,
                Definition::new("StubEngine").with_tag(ExtensionPoint::SearchEngine, *priority),
            );
        }
        Ok(())
    }

    fn process(&self, _registry: &mut Registry) -> Result<(), ContainerError> {
        Ok(())
    }
}

/// Removes the built-in stringer so the stringer point has no contributors.
struct StringerRemover;

impl Extension for StringerRemover {
    fn config_key(&self) -> &str {
        "plain_errors"
    }

    fn load(&self, registry: &mut Registry, _config: &ExtensionConfig) -> Result<(), ContainerError> {
        registry.remove(ExceptionExtension::DEFAULT_STRINGER_ID);
        Ok(())
    }

    fn process(&self, _registry: &mut Registry) -> Result<(), ContainerError> {
        Ok(())
    }
}

/// Owns a custom point and fails `load` when told to.
struct FormatterOwner;

impl FormatterOwner {
    fn point() -> ExtensionPoint {
        ExtensionPoint::custom("acme.formatter").expect("valid point")
    }
}

impl Extension for FormatterOwner {
    fn config_key(&self) -> &str {
        "acme"
    }

    fn configure(&self, schema: &mut ConfigSchema) {
        schema
            .option("fail", OptionKind::Boolean, false)
            .option("consumer", OptionKind::String, "acme.printer");
    }

    fn load(&self, registry: &mut Registry, config: &ExtensionConfig) -> Result<(), ContainerError> {
        if config.bool("fail").unwrap_or(false) {
            return registry.get("acme.missing").map(|_| ());
        }
        registry.declare_extension_point(Self::point());
        let consumer = config.string("consumer").unwrap_or("acme.printer");
        registry.define(consumer, Definition::new("Printer"));
        Ok(())
    }

    fn process(&self, registry: &mut Registry) -> Result<(), ContainerError> {
        stepwise_core::ServiceProcessor::new()
            .wire_tagged_services(registry, &Self::point(), "acme.printer", "append_handler")
            .map(|_| ())
    }
}

/// Defines one handler in `load` and appends it to `shared.consumer` in `process`.
struct Appender {
    key: &'static str,
    handler: &'static str,
}

impl Extension for Appender {
    fn config_key(&self) -> &str {
        self.key
    }

    fn load(&self, registry: &mut Registry, _config: &ExtensionConfig) -> Result<(), ContainerError> {
        if !registry.has("shared.consumer") {
            registry.define("shared.consumer", Definition::new("Consumer"));
        }
        registry.define(self.handler, Definition::new("Handler"));
        Ok(())
    }

    fn process(&self, registry: &mut Registry) -> Result<(), ContainerError> {
        registry.add_method_call(
            "shared.consumer",
            "append_handler",
            vec![Reference::new(self.handler).into()],
        )
    }
}

/// Contributes a stringer by tag name rather than by variant.
struct NamedStringer;

impl Extension for NamedStringer {
    fn config_key(&self) -> &str {
        "acme"
    }

    fn load(&self, registry: &mut Registry, _config: &ExtensionConfig) -> Result<(), ContainerError> {
        let point = ExtensionPoint::custom("exception.stringer").expect("stable tag name");
        registry.define("acme.stringer", Definition::new("AcmeStringer").with_tag(point, 99));
        Ok(())
    }

    fn process(&self, _registry: &mut Registry) -> Result<(), ContainerError> {
        Ok(())
    }
}

fn finder_wiring(registry: &Registry) -> Vec<String> {
    registry
        .method_calls(DefinitionExtension::FINDER_ID)
        .expect("finder defined")
        .iter()
        .filter_map(|call| call.arguments()[0].as_reference())
        .map(|reference| reference.id().to_string())
        .collect()
}

#[test]
fn method_calls_follow_module_registration_order() {
    let mut manager = ExtensionManager::new();
    for (key, handler) in [("beta", "handler.beta"), ("alpha", "handler.alpha")] {
        manager
            .register(Box::new(Appender { key, handler }))
            .expect("appender");
    }

    let mut registry = Registry::new();
    manager
        .compose(&mut registry, &json!(null))
        .expect("compose");

    let wired: Vec<String> = registry
        .method_calls("shared.consumer")
        .expect("consumer defined")
        .iter()
        .map(|call| {
            assert_eq!(call.method(), "append_handler");
            call.arguments()[0]
                .as_reference()
                .expect("reference")
                .id()
                .to_string()
        })
        .collect();
    assert_eq!(wired, vec!["handler.beta", "handler.alpha"]);
}

#[test]
fn contributor_using_builtin_tag_name_joins_builtin_chain() {
    let mut manager = ExtensionManager::with_builtin_extensions().expect("builtins");
    manager.register(Box::new(NamedStringer)).expect("acme");

    let mut registry = Registry::new();
    manager
        .compose(&mut registry, &json!(null))
        .expect("compose");

    let wired: Vec<String> = registry
        .method_calls(ExceptionExtension::PRESENTER_ID)
        .expect("presenter defined")
        .iter()
        .filter_map(|call| call.arguments()[0].as_reference())
        .map(|reference| reference.id().to_string())
        .collect();
    assert_eq!(
        wired,
        vec!["acme.stringer", ExceptionExtension::DEFAULT_STRINGER_ID]
    );
    assert_eq!(
        registry.tag_index().get(&ExtensionPoint::ExceptionStringer).len(),
        2
    );
}

#[test]
fn higher_priority_engine_is_wired_first() {
    let mut manager = ExtensionManager::new();
    manager
        .register(Box::new(DefinitionExtension::new()))
        .expect("definition");
    manager
        .register(Box::new(SearchContributor {
            key: "search",
            engines: vec![("search.default", 50), ("search.custom", 100)],
        }))
        .expect("contributor");

    let mut registry = Registry::new();
    manager
        .compose(&mut registry, &json!(null))
        .expect("compose");

    assert_eq!(
        finder_wiring(&registry),
        vec![
            "search.custom",
            DefinitionExtension::DEFAULT_SEARCH_ENGINE_ID,
            "search.default",
        ]
    );
}

#[test]
fn contributions_from_later_modules_reach_the_owner() {
    // The contributor registers after the owning module and still gets wired.
    let mut manager = ExtensionManager::with_builtin_extensions().expect("builtins");
    manager
        .register(Box::new(SearchContributor {
            key: "late",
            engines: vec![("late.engine", 10)],
        }))
        .expect("late contributor");

    let mut registry = Registry::new();
    manager
        .compose(&mut registry, &json!({"exception": {"verbosity": 2}}))
        .expect("compose");

    assert_eq!(
        finder_wiring(&registry),
        vec![DefinitionExtension::DEFAULT_SEARCH_ENGINE_ID, "late.engine"]
    );
}

#[test]
fn point_without_contributors_leaves_consumer_empty() {
    let mut manager = ExtensionManager::with_builtin_extensions().expect("builtins");
    manager
        .register(Box::new(StringerRemover))
        .expect("remover");
    manager.register(Box::new(FormatterOwner)).expect("owner");

    let mut registry = Registry::new();
    manager
        .compose(&mut registry, &json!(null))
        .expect("compose");

    assert!(registry
        .method_calls(ExceptionExtension::PRESENTER_ID)
        .expect("presenter defined")
        .is_empty());
    assert!(registry
        .method_calls("acme.printer")
        .expect("printer defined")
        .is_empty());
    assert!(registry
        .tag_index()
        .get(&FormatterOwner::point())
        .is_empty());
}

#[test]
fn failures_name_module_and_phase() {
    let mut manager = ExtensionManager::with_builtin_extensions().expect("builtins");
    manager.register(Box::new(FormatterOwner)).expect("owner");

    let err = manager
        .compose(&mut Registry::new(), &json!({"acme": {"fail": true}}))
        .expect_err("load fails");
    assert_eq!(
        err,
        ExtensionError::Phase {
            extension: "acme".to_string(),
            phase: ExtensionPhase::Load,
            source: ContainerError::UnknownService("acme.missing".into()),
        }
    );

    let err = manager
        .compose(&mut Registry::new(), &json!({"acme": {"consumer": "acme.other"}}))
        .expect_err("process fails without the printer");
    assert!(matches!(
        err,
        ExtensionError::Phase {
            phase: ExtensionPhase::Process,
            ..
        }
    ));
}

#[test]
fn invalid_configuration_is_rejected_before_loading() {
    let manager = ExtensionManager::with_builtin_extensions().expect("builtins");
    let mut registry = Registry::new();

    let err = manager
        .compose(&mut registry, &json!({"exception": {"verbosity": "loud"}}))
        .expect_err("type mismatch");
    assert!(matches!(err, ExtensionError::Config { ref extension, .. } if extension == "exception"));

    let err = manager
        .compose(&mut registry, &json!({"definition": {"unknown": 1}}))
        .expect_err("unknown option");
    assert!(matches!(err, ExtensionError::Config { .. }));

    assert!(registry.is_empty());
}
