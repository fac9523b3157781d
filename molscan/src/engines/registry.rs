use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{EngineConfig, EngineKind, RecognitionConfig, RESERVED_ENGINE_NAMES};
use crate::error::{MolscanError, Result};

use super::{CommandWorker, HttpWorker, RecognitionWorker};

/// Which engines a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EngineSelector {
    All,
    Named(String),
}

impl EngineSelector {
    /// `None`, `all` (any case) and `*` select every engine.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("*") => EngineSelector::All,
            Some(name) if name.eq_ignore_ascii_case("all") => EngineSelector::All,
            Some(name) => EngineSelector::Named(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EngineSelector::All => "all",
            EngineSelector::Named(name) => name,
        }
    }
}

impl fmt::Display for EngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named recognition workers, fixed at start-up.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: Arc<BTreeMap<String, Arc<dyn RecognitionWorker>>>,
}

impl EngineRegistry {
    pub fn new(workers: Vec<Arc<dyn RecognitionWorker>>) -> Result<Self> {
        let mut engines = BTreeMap::new();
        for worker in workers {
            let name = worker.name().to_string();
            if name.is_empty() || RESERVED_ENGINE_NAMES.contains(&name.to_lowercase().as_str()) {
                return Err(MolscanError::Config(format!(
                    "Engine name '{name}' is reserved"
                )));
            }
            if engines.insert(name.clone(), worker).is_some() {
                return Err(MolscanError::Config(format!(
                    "Engine '{name}' registered twice"
                )));
            }
        }
        Ok(Self {
            engines: Arc::new(engines),
        })
    }

    pub fn from_config(config: &RecognitionConfig) -> Result<Self> {
        let workers = config
            .engines
            .iter()
            .map(|engine| build_worker(engine, config.timeout_secs))
            .collect::<Result<Vec<_>>>()?;
        let registry = Self::new(workers)?;

        if registry.is_empty() {
            warn!("No recognition engines configured - every request will yield an empty result");
        }
        for (name, worker) in registry.engines.iter() {
            info!(engine = %name, available = worker.is_available(), "Registered engine");
        }
        Ok(registry)
    }

    /// Workers targeted by `selector`.
    ///
    /// An unknown engine name resolves to nothing rather than an error, so a
    /// missing engine never breaks a request.
    pub fn resolve(&self, selector: &EngineSelector) -> Vec<Arc<dyn RecognitionWorker>> {
        match selector {
            EngineSelector::All => self.engines.values().cloned().collect(),
            EngineSelector::Named(name) => match self.engines.get(name) {
                Some(worker) => vec![Arc::clone(worker)],
                None => {
                    warn!(engine = %name, "Unknown engine specified");
                    Vec::new()
                }
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RecognitionWorker>> {
        self.engines.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.engines.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

fn build_worker(engine: &EngineConfig, timeout_secs: u64) -> Result<Arc<dyn RecognitionWorker>> {
    let worker: Arc<dyn RecognitionWorker> = match &engine.kind {
        EngineKind::Command { program, args } => {
            Arc::new(CommandWorker::new(&engine.name, program, args.clone()))
        }
        EngineKind::Http { url, api_key } => Arc::new(HttpWorker::new(
            &engine.name,
            url,
            api_key.clone(),
            timeout_secs,
        )?),
    };
    Ok(worker)
}
