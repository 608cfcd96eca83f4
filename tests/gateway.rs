#[path = "support/gateway_harness.rs"]
mod gateway_harness;

#[path = "gateway/hardening.rs"]
mod hardening;
#[cfg(unix)]
#[path = "gateway/scripts.rs"]
mod scripts;
#[path = "gateway/uploads.rs"]
mod uploads;
