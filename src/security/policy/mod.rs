mod types;

pub use types::{PolicyCheckResult, PolicyDenial};

use crate::config::PolicyConfig;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct DenyRule {
    name: String,
    regex: Regex,
}

/// Two-gate command policy: an exact allow-list on the executable and a set
/// of case-insensitive deny rules over the whole command. Both gates are
/// always evaluated so a rejection lists every reason.
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    allowed_commands: HashSet<String>,
    deny_rules: Vec<DenyRule>,
}

impl CommandPolicy {
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let deny_rules = config
            .deny_rules
            .iter()
            .map(|rule| {
                let regex = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("invalid deny rule {}", rule.name))?;
                Ok(DenyRule {
                    name: rule.name.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            allowed_commands: config.allowed_commands.iter().cloned().collect(),
            deny_rules,
        })
    }

    pub fn check(&self, command: &str) -> PolicyCheckResult {
        let mut denials = Vec::new();

        match executable(command) {
            None => denials.push(PolicyDenial::EmptyCommand),
            Some(exe) if !self.allowed_commands.contains(exe) => {
                denials.push(PolicyDenial::ExecutableNotAllowed {
                    executable: exe.to_string(),
                });
            }
            Some(_) => {}
        }

        denials.extend(
            self.deny_rules
                .iter()
                .filter(|rule| rule.regex.is_match(command))
                .map(|rule| PolicyDenial::DeniedPattern {
                    rule: rule.name.clone(),
                }),
        );

        if denials.is_empty() {
            PolicyCheckResult::Permitted
        } else {
            PolicyCheckResult::Rejected(denials)
        }
    }

    pub fn is_permitted(&self, command: &str) -> bool {
        self.check(command).is_permitted()
    }

    pub fn allowed_commands(&self) -> impl Iterator<Item = &str> {
        self.allowed_commands.iter().map(String::as_str)
    }
}

/// First whitespace-delimited token of `command`.
pub fn executable(command: &str) -> Option<&str> {
    command.split_whitespace().next()
}
