use serde::Serialize;
use std::fmt;

/// Why a command was refused. Each variant names the gate that fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum PolicyDenial {
    EmptyCommand,
    ExecutableNotAllowed { executable: String },
    DeniedPattern { rule: String },
}

impl fmt::Display for PolicyDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCommand => f.write_str("empty command"),
            Self::ExecutableNotAllowed { executable } => {
                write!(f, "executable {executable:?} is not allow-listed")
            }
            Self::DeniedPattern { rule } => write!(f, "matched deny rule {rule}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "denials", rename_all = "snake_case")]
pub enum PolicyCheckResult {
    Permitted,
    Rejected(Vec<PolicyDenial>),
}

impl PolicyCheckResult {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permitted)
    }

    pub fn denials(&self) -> &[PolicyDenial] {
        match self {
            Self::Permitted => &[],
            Self::Rejected(denials) => denials,
        }
    }

    /// All denials joined into one line for audit details and error
    /// messages. Empty when permitted.
    pub fn reason(&self) -> String {
        self.denials()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}
