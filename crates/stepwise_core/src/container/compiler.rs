//! Registry compilation into an ordered construction plan.
//!
//! # Responsibility
//! - Resolve `%parameter%` placeholders in literal arguments.
//! - Validate references and drop unresolvable optional ones.
//! - Order services so every dependency is built before its dependents.
//!
//! # Invariants
//! - Compilation consumes the registry; nothing mutates definitions after it.
//! - Among services whose dependencies are satisfied, registration order wins,
//!   so plans are deterministic.
//! - Circular references are rejected, never partially built.

use crate::container::definition::{Argument, Definition, MethodCall, OnMissing, ServiceId};
use crate::container::error::{ContainerError, ContainerResult};
use crate::container::registry::Registry;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%%|%([^%\s]+)%").expect("valid placeholder regex"));

/// One service ready to be instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedService {
    pub id: ServiceId,
    pub factory: String,
    pub arguments: Vec<Argument>,
    pub method_calls: Vec<MethodCall>,
}

/// Services in dependency order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructionPlan {
    services: Vec<PlannedService>,
}

impl ConstructionPlan {
    /// Plans every service in the registry.
    pub fn compile(registry: Registry) -> ContainerResult<Self> {
        compile_plan(registry, None)
    }

    /// Plans only `roots` and the services they transitively reference.
    ///
    /// # Errors
    /// - `UnknownService` when a root is not defined.
    pub fn compile_for(registry: Registry, roots: &[&str]) -> ContainerResult<Self> {
        compile_plan(registry, Some(roots))
    }

    pub fn services(&self) -> &[PlannedService] {
        &self.services
    }

    pub fn ids(&self) -> impl Iterator<Item = &ServiceId> {
        self.services.iter().map(|service| &service.id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub(crate) fn into_services(self) -> Vec<PlannedService> {
        self.services
    }
}

fn compile_plan(registry: Registry, roots: Option<&[&str]>) -> ContainerResult<ConstructionPlan> {
    let (entries, parameters) = registry.into_parts();
    let positions: BTreeMap<ServiceId, usize> = entries
        .iter()
        .enumerate()
        .map(|(position, (id, _))| (id.clone(), position))
        .collect();

    let selected = select_services(&entries, &positions, roots)?;

    let mut dependencies: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    for &position in &selected {
        let (id, definition) = &entries[position];
        let mut edges = BTreeSet::new();
        for reference in definition.references() {
            match positions.get(reference.id()) {
                Some(&dependency) => {
                    edges.insert(dependency);
                }
                None if reference.on_missing() == OnMissing::Fail => {
                    return Err(ContainerError::MissingReference {
                        service: id.clone(),
                        reference: reference.id().clone(),
                    });
                }
                None => {}
            }
        }
        dependencies.insert(position, edges);
    }

    let order = topological_order(&entries, &dependencies)?;

    let mut services = Vec::with_capacity(order.len());
    for position in order {
        let (id, definition) = &entries[position];
        services.push(plan_service(id, definition, &positions, &parameters)?);
    }

    info!(
        "event=container_compile module=container status=ok defined={} planned={}",
        entries.len(),
        services.len()
    );
    Ok(ConstructionPlan { services })
}

/// Positions of services to build: everything, or the closure of `roots`.
fn select_services(
    entries: &[(ServiceId, Definition)],
    positions: &BTreeMap<ServiceId, usize>,
    roots: Option<&[&str]>,
) -> ContainerResult<BTreeSet<usize>> {
    let Some(roots) = roots else {
        return Ok((0..entries.len()).collect());
    };

    let mut selected = BTreeSet::new();
    let mut queue = VecDeque::new();
    for root in roots {
        let position = positions
            .get(*root)
            .copied()
            .ok_or_else(|| ContainerError::UnknownService((*root).into()))?;
        queue.push_back(position);
    }

    while let Some(position) = queue.pop_front() {
        if !selected.insert(position) {
            continue;
        }
        for reference in entries[position].1.references() {
            if let Some(&dependency) = positions.get(reference.id()) {
                queue.push_back(dependency);
            }
        }
    }
    Ok(selected)
}

fn topological_order(
    entries: &[(ServiceId, Definition)],
    dependencies: &BTreeMap<usize, BTreeSet<usize>>,
) -> ContainerResult<Vec<usize>> {
    let mut remaining: BTreeMap<usize, usize> = dependencies
        .iter()
        .map(|(&position, edges)| (position, edges.len()))
        .collect();
    let mut dependents: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (&position, edges) in dependencies {
        for &dependency in edges {
            dependents.entry(dependency).or_default().push(position);
        }
    }

    let mut ready: BTreeSet<usize> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(&position, _)| position)
        .collect();
    let mut order = Vec::with_capacity(dependencies.len());

    while let Some(position) = ready.pop_first() {
        order.push(position);
        remaining.remove(&position);
        for dependent in dependents.get(&position).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if !remaining.is_empty() {
        let cycle = find_cycle(&remaining, dependencies)
            .into_iter()
            .map(|position| entries[position].0.clone())
            .collect();
        return Err(ContainerError::CircularReference(cycle));
    }
    Ok(order)
}

/// Positions on one cycle among the unresolved services, lowest first.
///
/// Every unresolved service still waits on an unresolved dependency, so
/// following the first such dependency must revisit a service.
fn find_cycle(
    remaining: &BTreeMap<usize, usize>,
    dependencies: &BTreeMap<usize, BTreeSet<usize>>,
) -> Vec<usize> {
    let mut path: Vec<usize> = Vec::new();
    let mut visited: BTreeMap<usize, usize> = BTreeMap::new();
    let mut current = remaining.keys().next().copied();

    while let Some(position) = current {
        if let Some(&start) = visited.get(&position) {
            let mut cycle = path.split_off(start);
            if let Some(lowest) = cycle
                .iter()
                .enumerate()
                .min_by_key(|(_, position)| **position)
                .map(|(index, _)| index)
            {
                cycle.rotate_left(lowest);
            }
            return cycle;
        }
        visited.insert(position, path.len());
        path.push(position);
        current = dependencies
            .get(&position)
            .and_then(|edges| edges.iter().find(|edge| remaining.contains_key(*edge)))
            .copied();
    }
    path
}

fn plan_service(
    id: &ServiceId,
    definition: &Definition,
    positions: &BTreeMap<ServiceId, usize>,
    parameters: &BTreeMap<String, Value>,
) -> ContainerResult<PlannedService> {
    let arguments = definition
        .arguments()
        .iter()
        .map(|argument| resolve_argument(id, argument, positions, parameters))
        .collect::<ContainerResult<Vec<_>>>()?;

    let mut method_calls = Vec::with_capacity(definition.method_calls().len());
    for call in definition.method_calls() {
        let unresolved = call
            .arguments()
            .iter()
            .filter_map(Argument::as_reference)
            .any(|reference| !positions.contains_key(reference.id()));
        if unresolved {
            debug!(
                "event=method_call_drop module=container status=skipped id={id} method={} reason=optional_reference_missing",
                call.method()
            );
            continue;
        }

        let arguments = call
            .arguments()
            .iter()
            .map(|argument| resolve_argument(id, argument, positions, parameters))
            .collect::<ContainerResult<Vec<_>>>()?;
        method_calls.push(MethodCall::new(call.method(), arguments));
    }

    Ok(PlannedService {
        id: id.clone(),
        factory: definition.factory().to_string(),
        arguments,
        method_calls,
    })
}

fn resolve_argument(
    service: &ServiceId,
    argument: &Argument,
    positions: &BTreeMap<ServiceId, usize>,
    parameters: &BTreeMap<String, Value>,
) -> ContainerResult<Argument> {
    match argument {
        Argument::Reference(reference) if !positions.contains_key(reference.id()) => {
            Ok(Argument::Value(Value::Null))
        }
        Argument::Reference(reference) => Ok(Argument::Reference(reference.clone())),
        Argument::Value(value) => resolve_value(service, value, parameters).map(Argument::Value),
    }
}

/// Resolves placeholders inside `value`, recursing into arrays and objects.
///
/// A string that is exactly one placeholder takes the parameter's value with
/// its JSON type; embedded placeholders are spliced in as text.
pub(crate) fn resolve_value(
    service: &ServiceId,
    value: &Value,
    parameters: &BTreeMap<String, Value>,
) -> ContainerResult<Value> {
    match value {
        Value::String(text) => resolve_text(service, text, parameters),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(service, item, parameters))
            .collect::<ContainerResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_value(service, item, parameters)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_text(
    service: &ServiceId,
    text: &str,
    parameters: &BTreeMap<String, Value>,
) -> ContainerResult<Value> {
    let lookup = |captures: &Captures<'_>| -> ContainerResult<Option<Value>> {
        let Some(name) = captures.get(1) else {
            return Ok(None);
        };
        parameters
            .get(name.as_str())
            .cloned()
            .map(Some)
            .ok_or_else(|| ContainerError::UnknownParameter {
                service: service.clone(),
                parameter: name.as_str().to_string(),
            })
    };

    if let Some(captures) = PLACEHOLDER_RE.captures(text) {
        if captures.get(0).map(|whole| whole.len()) == Some(text.len()) {
            if let Some(value) = lookup(&captures)? {
                return Ok(value);
            }
        }
    }

    let mut resolved = String::with_capacity(text.len());
    let mut last = 0;
    for captures in PLACEHOLDER_RE.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        resolved.push_str(&text[last..whole.start()]);
        match lookup(&captures)? {
            Some(Value::String(value)) => resolved.push_str(&value),
            Some(value) => resolved.push_str(&value.to_string()),
            None => resolved.push('%'),
        }
        last = whole.end();
    }
    resolved.push_str(&text[last..]);
    Ok(Value::String(resolved))
}

#[cfg(test)]
mod tests {
    use super::{resolve_value, ConstructionPlan};
    use crate::container::definition::{Argument, Definition, Reference, ServiceId};
    use crate::container::error::ContainerError;
    use crate::container::registry::Registry;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn plan_ids(plan: &ConstructionPlan) -> Vec<&str> {
        plan.ids().map(ServiceId::as_str).collect()
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let mut registry = Registry::new();
        registry.define(
            "finder",
            Definition::new("Finder").with_argument(Reference::new("repository")),
        );
        registry.define("unrelated", Definition::new("Other"));
        registry.define(
            "repository",
            Definition::new("Repository").with_argument(Reference::new("environment")),
        );
        registry.define("environment", Definition::new("Environment"));

        let plan = ConstructionPlan::compile(registry).expect("plan");
        assert_eq!(
            plan_ids(&plan),
            vec!["unrelated", "environment", "repository", "finder"]
        );
    }

    #[test]
    fn method_call_references_are_dependencies() {
        let mut registry = Registry::new();
        registry.define("finder", Definition::new("Finder"));
        registry.define("engine", Definition::new("Engine"));
        registry
            .add_method_call("finder", "register", vec![Reference::new("engine").into()])
            .expect("finder defined");

        let plan = ConstructionPlan::compile(registry).expect("plan");
        assert_eq!(plan_ids(&plan), vec!["engine", "finder"]);
    }

    #[test]
    fn rejects_missing_required_reference() {
        let mut registry = Registry::new();
        registry.define(
            "finder",
            Definition::new("Finder").with_argument(Reference::new("repository")),
        );

        let err = ConstructionPlan::compile(registry).expect_err("missing reference");
        assert_eq!(
            err,
            ContainerError::MissingReference {
                service: "finder".into(),
                reference: "repository".into(),
            }
        );
    }

    #[test]
    fn optional_reference_becomes_null_and_drops_method_call() {
        let mut registry = Registry::new();
        registry.define(
            "repository",
            Definition::new("Repository").with_argument(Reference::optional("environment")),
        );
        registry
            .add_method_call(
                "repository",
                "set_translator",
                vec![Reference::optional("translator").into()],
            )
            .expect("repository defined");

        let plan = ConstructionPlan::compile(registry).expect("plan");
        let service = &plan.services()[0];
        assert_eq!(service.arguments, vec![Argument::Value(Value::Null)]);
        assert!(service.method_calls.is_empty());
    }

    #[test]
    fn detects_circular_references() {
        let mut registry = Registry::new();
        registry.define("a", Definition::new("A").with_argument(Reference::new("b")));
        registry.define("b", Definition::new("B").with_argument(Reference::new("a")));
        registry.define("c", Definition::new("C"));

        let err = ConstructionPlan::compile(registry).expect_err("cycle");
        assert_eq!(
            err,
            ContainerError::CircularReference(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn circular_reference_names_only_services_on_the_cycle() {
        let mut registry = Registry::new();
        registry.define("c", Definition::new("C").with_argument(Reference::new("a")));
        registry.define("a", Definition::new("A").with_argument(Reference::new("b")));
        registry.define("b", Definition::new("B").with_argument(Reference::new("a")));
        registry.define("d", Definition::new("D").with_argument(Reference::new("c")));

        let err = ConstructionPlan::compile(registry).expect_err("cycle");
        assert_eq!(
            err,
            ContainerError::CircularReference(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn compile_for_limits_plan_to_dependency_closure() {
        let mut registry = Registry::new();
        registry.define(
            "controller",
            Definition::new("Controller").with_argument(Reference::new("undefined.output")),
        );
        registry.define(
            "finder",
            Definition::new("Finder").with_argument(Reference::new("repository")),
        );
        registry.define("repository", Definition::new("Repository"));

        let plan = ConstructionPlan::compile_for(registry.clone(), &["finder"]).expect("plan");
        assert_eq!(plan_ids(&plan), vec!["repository", "finder"]);

        let err = ConstructionPlan::compile_for(registry, &["missing"]).expect_err("unknown root");
        assert_eq!(err, ContainerError::UnknownService("missing".into()));
    }

    #[test]
    fn resolves_whole_and_embedded_placeholders() {
        let service = ServiceId::from("presenter");
        let parameters = BTreeMap::from([
            ("paths.base".to_string(), json!("/work")),
            ("retries".to_string(), json!(3)),
        ]);

        assert_eq!(
            resolve_value(&service, &json!("%retries%"), &parameters).expect("typed"),
            json!(3)
        );
        assert_eq!(
            resolve_value(
                &service,
                &json!(["%paths.base%/features", "100%% done, %retries% left"]),
                &parameters
            )
            .expect("embedded"),
            json!(["/work/features", "100% done, 3 left"])
        );
        assert_eq!(
            resolve_value(&service, &json!({"nested": {"base": "%paths.base%"}}), &parameters)
                .expect("nested"),
            json!({"nested": {"base": "/work"}})
        );
    }

    #[test]
    fn rejects_unknown_parameter() {
        let mut registry = Registry::new();
        registry.define(
            "presenter",
            Definition::new("Presenter").with_argument("%paths.base%"),
        );

        let err = ConstructionPlan::compile(registry).expect_err("unknown parameter");
        assert_eq!(
            err,
            ContainerError::UnknownParameter {
                service: "presenter".into(),
                parameter: "paths.base".to_string(),
            }
        );
    }
}
