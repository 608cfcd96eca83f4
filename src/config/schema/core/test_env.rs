use std::sync::{LazyLock, Mutex};

/// Serializes tests that mutate process environment variables.
pub(super) static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Restores a variable to its previous state on drop. Hold `ENV_LOCK` for the
/// guard's whole lifetime.
pub(super) struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl EnvVarGuard {
    pub(super) fn set(key: &'static str, value: &str) -> Self {
        Self::replace(key, Some(value))
    }

    pub(super) fn unset(key: &'static str) -> Self {
        Self::replace(key, None)
    }

    fn replace(key: &'static str, value: Option<&str>) -> Self {
        let previous = std::env::var(key).ok();
        write_var(key, value);
        Self { key, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        write_var(self.key, self.previous.as_deref());
    }
}

fn write_var(key: &str, value: Option<&str>) {
    // SAFETY: test-only; every caller holds ENV_LOCK so no other thread in
    // this test binary touches the environment concurrently.
    unsafe {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}
