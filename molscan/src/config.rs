use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::engines::PATH_PLACEHOLDER;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Names an engine may not take: `image` is the top-level response key and
/// the wildcards select every engine.
pub const RESERVED_ENGINE_NAMES: &[&str] = &["image", "all", "*"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
    pub recognition: RecognitionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted submission, in bytes.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    /// Per-engine timeout applied by the dispatcher.
    pub timeout_secs: u64,
    pub cache_size: usize,
    pub engines: Vec<EngineConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub kind: EngineKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineKind {
    /// External executable invoked with the stored blob path.
    Command { program: String, args: Vec<String> },
    /// Remote service receiving the image bytes in a POST body.
    Http {
        url: String,
        api_key: Option<String>,
    },
}

/// Environment variable suffix for an engine name, e.g. `osra-2` -> `OSRA_2`.
fn engine_env_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Parse the `ENGINES` env var plus the per-engine `ENGINE_<NAME>_*` settings.
///
/// Format: comma-separated engine names, e.g. `molvec,osra,imago`. An engine
/// with `ENGINE_<NAME>_URL` set is an HTTP engine; every other engine runs
/// `ENGINE_<NAME>_EXEC` (default: the engine name) with `ENGINE_<NAME>_ARGS`
/// (default: `{path}`).
fn parse_engines() -> Vec<EngineConfig> {
    let raw = env::var("ENGINES").unwrap_or_else(|_| "molvec".to_string());
    let mut engines: Vec<EngineConfig> = Vec::new();

    for name in raw.split(',').map(str::trim) {
        if name.is_empty() {
            continue;
        }
        if RESERVED_ENGINE_NAMES.contains(&name.to_lowercase().as_str()) {
            tracing::warn!("Engine name '{}' is reserved in ENGINES, skipping", name);
            continue;
        }
        if engines.iter().any(|e| e.name == name) {
            tracing::warn!("Duplicate engine '{}' in ENGINES, skipping", name);
            continue;
        }

        let key = engine_env_key(name);
        let kind = match env::var(format!("ENGINE_{key}_URL")) {
            Ok(url) if !url.trim().is_empty() => EngineKind::Http {
                url: url.trim().to_string(),
                api_key: env::var(format!("ENGINE_{key}_API_KEY")).ok(),
            },
            _ => EngineKind::Command {
                program: env::var(format!("ENGINE_{key}_EXEC"))
                    .unwrap_or_else(|_| name.to_string()),
                args: env::var(format!("ENGINE_{key}_ARGS"))
                    .map(|args| args.split_whitespace().map(String::from).collect())
                    .unwrap_or_else(|_| vec![PATH_PLACEHOLDER.to_string()]),
            },
        };

        engines.push(EngineConfig {
            name: name.to_string(),
            kind,
        });
    }

    engines
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("MOLSCAN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("MOLSCAN_PORT", 9000),
                max_upload_bytes: parse_env_or("MOLSCAN_MAX_UPLOAD", 25 * 1024 * 1024),
            },
            storage: StorageConfig {
                work_dir: env::var("MOLSCAN_WORK_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("work")),
            },
            fetch: FetchConfig {
                timeout_secs: parse_env_or("FETCH_TIMEOUT", 30),
            },
            recognition: RecognitionConfig {
                timeout_secs: parse_env_or("RECOGNITION_TIMEOUT", 60),
                cache_size: parse_env_or("RECOGNITION_CACHE_SIZE", 1024),
                engines: parse_engines(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_engine_env() {
        for var in [
            "ENGINES",
            "ENGINE_MOLVEC_EXEC",
            "ENGINE_MOLVEC_ARGS",
            "ENGINE_OSRA_URL",
            "ENGINE_OSRA_API_KEY",
            "ENGINE_IMAGO_2_EXEC",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_engine_env();
        std::env::remove_var("RECOGNITION_TIMEOUT");
        std::env::remove_var("MOLSCAN_WORK_DIR");

        let config = Config::default();
        assert_eq!(config.recognition.timeout_secs, 60);
        assert_eq!(config.storage.work_dir, PathBuf::from("work"));
        assert_eq!(
            config.recognition.engines,
            vec![EngineConfig {
                name: "molvec".to_string(),
                kind: EngineKind::Command {
                    program: "molvec".to_string(),
                    args: vec!["{path}".to_string()],
                },
            }]
        );
    }

    #[test]
    fn test_engines_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_engine_env();

        std::env::set_var("ENGINES", "molvec, osra ,imago-2");
        std::env::set_var("ENGINE_MOLVEC_EXEC", "/opt/molvec/bin/molvec");
        std::env::set_var("ENGINE_MOLVEC_ARGS", "-f {path} -o -");
        std::env::set_var("ENGINE_OSRA_URL", "http://osra.local/recognize");
        std::env::set_var("ENGINE_OSRA_API_KEY", "secret");
        std::env::set_var("ENGINE_IMAGO_2_EXEC", "imago_console");

        let engines = Config::default().recognition.engines;
        assert_eq!(engines.len(), 3);
        assert_eq!(
            engines[0].kind,
            EngineKind::Command {
                program: "/opt/molvec/bin/molvec".to_string(),
                args: vec!["-f".into(), "{path}".into(), "-o".into(), "-".into()],
            }
        );
        assert_eq!(
            engines[1].kind,
            EngineKind::Http {
                url: "http://osra.local/recognize".to_string(),
                api_key: Some("secret".to_string()),
            }
        );
        assert_eq!(engines[2].name, "imago-2");
        assert!(matches!(
            &engines[2].kind,
            EngineKind::Command { program, .. } if program == "imago_console"
        ));

        clear_engine_env();
    }

    #[test]
    fn test_reserved_and_duplicate_engines_skipped() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_engine_env();

        std::env::set_var("ENGINES", "molvec,all,image,*,molvec,,");
        let engines = Config::default().recognition.engines;
        let names: Vec<_> = engines.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["molvec"]);

        clear_engine_env();
    }

    #[test]
    fn test_parse_env_or_invalid_value_falls_back() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("__TEST_PARSE_TIMEOUT", "soon");
        let result: u64 = parse_env_or("__TEST_PARSE_TIMEOUT", 60);
        assert_eq!(result, 60);
        std::env::remove_var("__TEST_PARSE_TIMEOUT");
    }

    #[test]
    fn test_engine_env_key() {
        assert_eq!(engine_env_key("osra-2.1"), "OSRA_2_1");
        assert_eq!(engine_env_key("molvec"), "MOLVEC");
    }
}
