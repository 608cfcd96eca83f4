pub mod content;
mod defaults;
pub mod policy;
pub mod rate_limit;

pub use content::{
    ContentValidator, EntropyAssessment, SanitizeError, ValidationVerdict, sanitize,
    shannon_entropy,
};
pub use defaults::{
    DEFAULT_DENY_RULES, default_allowed_commands, default_allowed_extensions,
    default_allowed_mime_types,
};
pub use policy::{CommandPolicy, PolicyCheckResult, PolicyDenial};
pub use rate_limit::{EndpointClass, RateLimitDecision, RateLimiter};
