pub mod schema;

pub use schema::{
    AuditConfig, Config, DenyRuleConfig, GatewayConfig, PolicyConfig, RateLimitConfig,
    SandboxConfig, UploadConfig, is_public_bind,
};
