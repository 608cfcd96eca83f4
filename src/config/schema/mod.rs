mod audit;
mod core;
mod gateway;
mod policy;
mod rate_limit;
mod sandbox;
mod upload;

pub use audit::AuditConfig;
pub use core::Config;
pub use gateway::{GatewayConfig, is_public_bind};
pub use policy::{DenyRuleConfig, PolicyConfig};
pub use rate_limit::RateLimitConfig;
pub use sandbox::SandboxConfig;
pub use upload::UploadConfig;
