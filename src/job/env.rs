use std::collections::HashMap;

pub const ACCESS_KEY_VAR: &str = "AWS_S3_ACCESS_KEY_ID";
pub const SECRET_KEY_VAR: &str = "AWS_S3_SECRET_ACCESS_KEY";

/// Source of environment variables consulted while resolving credentials.
pub trait EnvLookup: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Environment value wins over the request value. Empty values count as unset.
pub(crate) fn resolve(env: &dyn EnvLookup, key: &str, fallback: Option<&str>) -> Option<String> {
    env.var(key)
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.filter(|v| !v.is_empty()).map(str::to_string))
}
