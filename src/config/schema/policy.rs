use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A named case-insensitive regular expression matched against the full
/// command string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyRuleConfig {
    pub name: String,
    pub pattern: String,
}

impl DenyRuleConfig {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Executables a script command may start with (exact match)
    #[serde(default = "crate::security::default_allowed_commands")]
    pub allowed_commands: Vec<String>,
    /// Rules that reject a command wherever they match
    #[serde(default = "default_deny_rules")]
    pub deny_rules: Vec<DenyRuleConfig>,
}

fn default_deny_rules() -> Vec<DenyRuleConfig> {
    crate::security::DEFAULT_DENY_RULES
        .iter()
        .map(|(name, pattern)| DenyRuleConfig::new(*name, *pattern))
        .collect()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_commands: crate::security::default_allowed_commands(),
            deny_rules: default_deny_rules(),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.allowed_commands.is_empty() {
            anyhow::bail!("policy.allowed_commands must not be empty");
        }
        if let Some(cmd) = self
            .allowed_commands
            .iter()
            .find(|cmd| cmd.is_empty() || cmd.contains(['/', ' ', '=']))
        {
            anyhow::bail!("policy.allowed_commands entry {cmd:?} must be a bare executable name");
        }
        for rule in &self.deny_rules {
            if rule.name.trim().is_empty() {
                anyhow::bail!("policy.deny_rules entries need a name");
            }
            regex::RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("policy.deny_rules[{}] does not compile", rule.name))?;
        }
        Ok(())
    }
}
