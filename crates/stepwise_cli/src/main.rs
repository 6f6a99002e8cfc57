//! CLI composition probe.
//!
//! # Responsibility
//! - Compose the built-in extension modules against an optional JSON config.
//! - Print the resolved tag index and consumer wiring as JSON.
//!
//! Usage: `stepwise_cli [config.json]`. Set `STEPWISE_LOG_DIR` to an absolute
//! directory to enable file logging.

use log::info;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::process::ExitCode;
use stepwise_core::{
    builtin_factories, core_version, init_logging_from_env, Container, DefinitionExtension,
    ExceptionExtension, ExceptionPresenter, ExtensionManager, Registry, PATHS_BASE_PARAMETER,
};

fn main() -> ExitCode {
    match run() {
        Ok(report) => {
            println!("{report:#}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("stepwise: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<Value, Box<dyn Error>> {
    init_logging_from_env()?;

    let config = match std::env::args().nth(1) {
        Some(path) => read_config(&path)?,
        None => Value::Null,
    };

    let base_path = std::env::current_dir()?;
    let mut registry = Registry::new();
    registry.set_parameter(PATHS_BASE_PARAMETER, base_path.display().to_string());

    let manager = ExtensionManager::with_builtin_extensions()?;
    manager.compose(&mut registry, &config)?;

    let mut consumers = Map::new();
    for consumer in [DefinitionExtension::FINDER_ID, ExceptionExtension::PRESENTER_ID] {
        consumers.insert(consumer.to_string(), json!(wired_ids(&registry, consumer)?));
    }

    let tag_index = registry.tag_index();
    let presenter_stringers = presenter_stringer_count(registry)?;

    let report = json!({
        "version": core_version(),
        "extensions": manager.config_keys(),
        "tag_index": tag_index,
        "consumers": consumers,
        "presenter_stringers": presenter_stringers,
    });
    info!("event=cli_probe module=cli status=ok");
    Ok(report)
}

fn read_config(path: &str) -> Result<Value, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read config `{path}`: {err}"))?;
    let config = serde_json::from_str(&raw)
        .map_err(|err| format!("config `{path}` is not valid JSON: {err}"))?;
    Ok(config)
}

/// Handler ids appended to `consumer`, in wiring order.
fn wired_ids(registry: &Registry, consumer: &str) -> Result<Vec<String>, Box<dyn Error>> {
    let ids = registry
        .method_calls(consumer)?
        .iter()
        .filter_map(|call| call.arguments().first())
        .filter_map(|argument| argument.as_reference())
        .map(|reference| reference.id().to_string())
        .collect();
    Ok(ids)
}

// Only the presenter's closure has factories in this crate; the finder's
// engines come from modules outside the core.
fn presenter_stringer_count(registry: Registry) -> Result<usize, Box<dyn Error>> {
    let container = Container::build_for(
        registry,
        &builtin_factories(),
        &[ExceptionExtension::PRESENTER_ID],
    )?;
    let presenter = container.get::<ExceptionPresenter>(ExceptionExtension::PRESENTER_ID)?;
    Ok(presenter.stringer_count())
}
