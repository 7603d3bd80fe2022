//! Static configuration document (§6 EXTERNAL INTERFACES, "Configuration").
//!
//! Mirrors the original system's `ConfigObject`: a YAML document deserialized
//! once at startup, with any field named `*_path` or `*_dir` rewritten from
//! a relative path to an absolute one against a caller-supplied root.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Anthropic,
}

impl std::str::FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Provider::Openai),
            "anthropic" => Ok(Provider::Anthropic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// One LLM endpoint's configuration (§6 `pre_diagnosis_agent`, `main_agent`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub provider: String,
    pub model_name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt_path: Option<String>,
    #[serde(default)]
    pub model_kwargs: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub additional_tools: Vec<String>,
    #[serde(default)]
    pub excoulde_tools: Vec<String>,
}

fn default_temperature() -> f32 {
    0.2
}

impl AgentConfig {
    pub fn provider(&self) -> Result<Provider, ConfigError> {
        self.provider.parse()
    }
}

/// One expert group's agent pair (§6 `main_agent`, `sub_agent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertGroupConfig {
    pub main_agent: AgentConfig,
    #[serde(default)]
    pub sub_agent: Option<AgentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiExpertDiagnosisConfig {
    #[serde(flatten)]
    pub groups: BTreeMap<String, ExpertGroupConfig>,
}

fn default_max_rounds() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdtConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    pub reviewer_prompt_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pre_diagnosis_agent: AgentConfig,
    pub multi_expert_diagnosis_agent: MultiExpertDiagnosisConfig,
    pub mdt_config: MdtConfig,
    pub summary_agent: AgentConfig,
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

fn default_max_input_tokens() -> usize {
    32_000
}

impl Config {
    /// Load and path-rewrite a YAML config document, mirroring the original
    /// `ConfigObject` / `Loader` behavior: relative `*_path`/`*_dir` values
    /// are resolved against `root`, absolute ones are left untouched.
    pub fn load_from_str(yaml: &str, root: &Path) -> Result<Self, ConfigError> {
        let mut value: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        rewrite_paths(&mut value, root);
        serde_yaml::from_value(value).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::load_from_str(&text, &root)
    }

    /// Resolve a group's expert config by id, e.g. `"group_1"`.
    pub fn group(&self, group_id: &str) -> Option<&ExpertGroupConfig> {
        self.multi_expert_diagnosis_agent.groups.get(group_id)
    }
}

/// Recursively rewrite string values under keys containing `path` or `dir`
/// from relative to absolute, matching `config/loader.py::ConfigObject`.
fn rewrite_paths(value: &mut serde_yaml::Value, root: &Path) {
    if let serde_yaml::Value::Mapping(map) = value {
        for (key, v) in map.iter_mut() {
            let key_str = key.as_str().unwrap_or_default();
            match v {
                serde_yaml::Value::Mapping(_) => rewrite_paths(v, root),
                serde_yaml::Value::String(s)
                    if key_str.contains("path") || key_str.contains("dir") =>
                {
                    let candidate = Path::new(s.as_str());
                    if !candidate.is_absolute() {
                        *s = root.join(candidate).to_string_lossy().into_owned();
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
pre_diagnosis_agent:
  provider: openai
  model_name: gpt-4o
  system_prompt_path: prompts/triage.md
multi_expert_diagnosis_agent:
  group_1:
    main_agent:
      provider: anthropic
      model_name: claude-3-5-sonnet-latest
mdt_config:
  reviewer_prompt_path: prompts/review.md
summary_agent:
  provider: openai
  model_name: gpt-4o
"#;

    #[test]
    fn relative_prompt_paths_resolve_against_root() {
        let root = Path::new("/srv/mdt");
        let config = Config::load_from_str(SAMPLE, root).unwrap();
        assert_eq!(
            config.pre_diagnosis_agent.system_prompt_path.unwrap(),
            "/srv/mdt/prompts/triage.md"
        );
        assert_eq!(
            config.mdt_config.reviewer_prompt_path,
            "/srv/mdt/prompts/review.md"
        );
    }

    #[test]
    fn max_rounds_defaults_to_three() {
        let root = Path::new("/srv/mdt");
        let config = Config::load_from_str(SAMPLE, root).unwrap();
        assert_eq!(config.mdt_config.max_rounds, 3);
    }

    #[test]
    fn unknown_provider_string_is_rejected() {
        let root = Path::new("/srv/mdt");
        let config = Config::load_from_str(SAMPLE, root).unwrap();
        let group = config.group("group_1").unwrap();
        assert_eq!(group.main_agent.provider().unwrap(), Provider::Anthropic);

        let bad: AgentConfig = AgentConfig {
            provider: "cohere".into(),
            model_name: "x".into(),
            base_url: None,
            api_key: None,
            temperature: 0.2,
            system_prompt_path: None,
            model_kwargs: BTreeMap::new(),
            additional_tools: vec![],
            excoulde_tools: vec![],
        };
        assert!(matches!(bad.provider(), Err(ConfigError::UnknownProvider(_))));
    }

    #[test]
    fn missing_file_surfaces_file_not_found() {
        let err = Config::load_from_file(Path::new("/nonexistent/config.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
