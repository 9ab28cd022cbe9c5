//! Project configuration file support for constitution.
//!
//! Loads configuration from `constitution.toml` in the working directory.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use constitution_chain::PromptTemplate;
use constitution_critic::prompts::{CRITIQUE_INPUTS, REVISION_INPUTS};
use constitution_critic::{ConstitutionalPrinciple, ConstitutionalPrompts};

/// Project-level configuration loaded from `constitution.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Completer backend ("claude" or "command")
    pub agent: Option<String>,
    /// Model passed to the backend
    pub model: Option<String>,
    /// Binary for the "command" backend
    pub command: Option<String>,
    /// Fixed arguments for the "command" backend
    #[serde(default)]
    pub command_args: Vec<String>,
    /// Primary prompt template
    pub template: Option<String>,
    /// Principles to apply, by name, in order
    pub principles: Option<Vec<String>>,
    /// Report the initial output and every critique/revision pair
    pub intermediate_steps: Option<bool>,
    /// Per-call timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Project-specific principles
    #[serde(default, rename = "principle")]
    pub custom_principles: Vec<PrincipleConfig>,
    /// Override prompt files
    #[serde(default)]
    pub prompts: PromptFiles,
}

/// A principle declared in the config file
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PrincipleConfig {
    pub name: String,
    pub critique_request: String,
    pub revision_request: String,
}

/// Paths (relative to the working directory) of override prompt templates
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PromptFiles {
    pub critique_file: Option<PathBuf>,
    pub revision_file: Option<PathBuf>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "constitution.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Resolve the principles to apply.
    ///
    /// Names come from the command line if any were given, else from the
    /// `principles` list. Config-declared principles shadow built-ins of
    /// the same name. With no names at all, every config-declared principle
    /// is used in file order.
    pub fn resolve_principles(&self, cli_names: &[String]) -> Result<Vec<ConstitutionalPrinciple>> {
        let names: &[String] = if !cli_names.is_empty() {
            cli_names
        } else if let Some(ref names) = self.principles {
            names
        } else {
            return Ok(self.custom_principles.iter().map(PrincipleConfig::to_principle).collect());
        };

        let built_in_names: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| self.custom_principle(name).is_none())
            .collect();
        let mut built_ins = ConstitutionalPrinciple::by_names(&built_in_names)
            .map_err(|e| anyhow!("{}. Run with --list-principles to see available names", e))?
            .into_iter();

        Ok(names
            .iter()
            .filter_map(|name| match self.custom_principle(name) {
                Some(custom) => Some(custom.to_principle()),
                None => built_ins.next(),
            })
            .collect())
    }

    fn custom_principle(&self, name: &str) -> Option<&PrincipleConfig> {
        self.custom_principles.iter().find(|p| p.name == name)
    }

    /// Read override prompt templates, checking their placeholders
    pub fn load_prompts(&self, working_dir: &Path) -> Result<ConstitutionalPrompts> {
        let mut prompts = ConstitutionalPrompts::default();

        if let Some(ref path) = self.prompts.critique_file {
            prompts = prompts.with_critique(read_template(working_dir, path, &CRITIQUE_INPUTS)?);
        }
        if let Some(ref path) = self.prompts.revision_file {
            prompts = prompts.with_revision(read_template(working_dir, path, &REVISION_INPUTS)?);
        }

        Ok(prompts)
    }
}

impl PrincipleConfig {
    fn to_principle(&self) -> ConstitutionalPrinciple {
        ConstitutionalPrinciple::named(&self.name, &self.critique_request, &self.revision_request)
    }
}

fn read_template(working_dir: &Path, path: &Path, inputs: &[&str]) -> Result<PromptTemplate> {
    let full_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    };

    let content = std::fs::read_to_string(&full_path)
        .with_context(|| format!("Failed to read prompt file {}", full_path.display()))?;

    PromptTemplate::new(content, inputs.iter().map(|s| s.to_string()).collect())
        .with_context(|| format!("Invalid prompt template in {}", full_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) {
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_unknown_field_is_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "agnet = \"claude\"\n");
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_parses_full_config() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
agent = "command"
command = "ollama"
command_args = ["run", "llama3"]
template = "Question: {{question}}"
principles = ["concise", "harmful1"]
intermediate_steps = true
timeout_secs = 90

[[principle]]
name = "concise"
critique_request = "Is the answer longer than it needs to be?"
revision_request = "Rewrite the answer more concisely."
"#,
        );

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.agent.as_deref(), Some("command"));
        assert_eq!(config.command_args, vec!["run", "llama3"]);
        assert_eq!(config.timeout_secs, Some(90));

        let principles = config.resolve_principles(&[]).unwrap();
        assert_eq!(principles.len(), 2);
        assert_eq!(principles[0].name, "concise");
        assert_eq!(principles[0].revision_request, "Rewrite the answer more concisely.");
        assert_eq!(principles[1].name, "harmful1");
    }

    #[test]
    fn test_cli_names_override_file_list() {
        let config = ProjectConfig {
            principles: Some(vec!["harmful1".into()]),
            ..Default::default()
        };
        let principles = config.resolve_principles(&["thoughtful".to_string()]).unwrap();
        assert_eq!(principles.len(), 1);
        assert_eq!(principles[0].name, "thoughtful");
    }

    #[test]
    fn test_custom_principles_used_when_no_names() {
        let config = ProjectConfig {
            custom_principles: vec![PrincipleConfig {
                name: "polite".into(),
                critique_request: "Is it rude?".into(),
                revision_request: "Make it polite.".into(),
            }],
            ..Default::default()
        };
        let principles = config.resolve_principles(&[]).unwrap();
        assert_eq!(principles.len(), 1);
        assert_eq!(principles[0].critique_request, "Is it rude?");
    }

    #[test]
    fn test_custom_principle_shadows_built_in_in_order() {
        let config = ProjectConfig {
            custom_principles: vec![PrincipleConfig {
                name: "harmful1".into(),
                critique_request: "Project-specific harm check".into(),
                revision_request: "Remove it.".into(),
            }],
            ..Default::default()
        };
        let names = ["thoughtful".to_string(), "harmful1".to_string(), "criminal".to_string()];
        let principles = config.resolve_principles(&names).unwrap();

        let resolved: Vec<&str> = principles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(resolved, ["thoughtful", "harmful1", "criminal"]);
        assert_eq!(principles[1].critique_request, "Project-specific harm check");
        assert!(principles[2].critique_request.contains("criminal"));
    }

    #[test]
    fn test_unknown_principle_is_error() {
        let config = ProjectConfig::default();
        let err = config.resolve_principles(&["nope".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Unknown principle 'nope'"));
    }

    #[test]
    fn test_prompt_files_are_validated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("critique.txt"),
            "Model said: {{output_from_model}}\nCritique:",
        )
        .unwrap();
        std::fs::write(dir.path().join("revision.txt"), "Fix {{typo_variable}}").unwrap();

        let mut config = ProjectConfig::default();
        config.prompts.critique_file = Some(PathBuf::from("critique.txt"));
        let prompts = config.load_prompts(dir.path()).unwrap();
        assert!(prompts.critique.is_some());
        assert!(prompts.revision.is_none());

        config.prompts.revision_file = Some(PathBuf::from("revision.txt"));
        assert!(config.load_prompts(dir.path()).is_err());
    }
}
