use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::humanize::ByteSize;

/// Run-wide option values keyed by name (e.g. `profile`, `chunk`)
pub type GlobalParameters = serde_json::Map<String, Value>;

/// Default read size for stream downloads
pub const DEFAULT_CHUNK: ByteSize = ByteSize::new(1024);

/// Keep only the entries of `global` whose names appear in `declared`.
///
/// Values are passed through untouched. Names the strategy did not declare
/// never reach it, whatever else the global configuration carries.
pub fn project(global: &GlobalParameters, declared: &[&str]) -> GlobalParameters {
    declared
        .iter()
        .filter_map(|name| global.get(*name).map(|value| (name.to_string(), value.clone())))
        .collect()
}

/// Parameters declared by the generic stream strategy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamParams {
    #[serde(default = "default_chunk")]
    pub chunk: ByteSize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Parameters declared by the object-store strategy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectParams {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_chunk() -> ByteSize {
    DEFAULT_CHUNK
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn global() -> GlobalParameters {
        json!({
            "profile": "archive",
            "chunk": 4096,
            "output_dir": "/data",
            "unrelated": true,
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_project_keeps_declared_intersection() {
        let projected = project(&global(), &["chunk", "output_dir"]);

        assert_eq!(projected.len(), 2);
        assert_eq!(projected["chunk"], json!(4096));
        assert_eq!(projected["output_dir"], json!("/data"));
        assert!(!projected.contains_key("profile"));
        assert!(!projected.contains_key("unrelated"));
    }

    #[test]
    fn test_project_skips_declared_names_missing_from_global() {
        let projected = project(&global(), &["profile", "region"]);

        assert_eq!(projected.len(), 1);
        assert_eq!(projected["profile"], json!("archive"));
    }

    #[test]
    fn test_project_ignores_ordering_and_is_idempotent() {
        let mut reversed = GlobalParameters::new();
        for (key, value) in global().into_iter().rev() {
            reversed.insert(key, value);
        }

        let a = project(&global(), &["chunk", "profile"]);
        let b = project(&reversed, &["profile", "chunk"]);
        assert_eq!(a, b);
        assert_eq!(project(&a, &["chunk", "profile"]), a);
    }

    #[test]
    fn test_project_empty_inputs() {
        assert!(project(&GlobalParameters::new(), &["chunk"]).is_empty());
        assert!(project(&global(), &[]).is_empty());
    }

    #[test]
    fn test_stream_params_defaults() {
        let params: StreamParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params.chunk, DEFAULT_CHUNK);
        assert_eq!(params.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_params_reject_undeclared_fields() {
        let result: Result<ObjectParams, _> = serde_json::from_value(json!({"profile": "p", "chunk": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_object_params_accept_null_profile() {
        let params: ObjectParams = serde_json::from_value(json!({"profile": null})).unwrap();
        assert_eq!(params.profile, None);
    }
}
