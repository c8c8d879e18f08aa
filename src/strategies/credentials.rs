//! Credential resolution for the object-store strategy
//!
//! A [`CredentialResolver`] turns an optional profile name into an
//! [`ObjectStoreSession`], which hands out one [`ObjectStore`] per bucket.
//! Resolution never fails up front: a bad or missing profile shows up as an
//! `object_store::Error` when a bucket is actually requested.

use config::{File, FileFormat};
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Profile name that falls back to the environment when not configured
pub const DEFAULT_PROFILE: &str = "default";

const CREDENTIALS_FILE_ENV: &str = "AWS_SHARED_CREDENTIALS_FILE";
const CONFIG_FILE_ENV: &str = "AWS_CONFIG_FILE";

/// Authenticated handle scoped to one credential profile
pub trait ObjectStoreSession: Send + Sync {
    fn bucket(&self, name: &str) -> Result<Arc<dyn ObjectStore>, object_store::Error>;
}

/// Construct-session capability keyed by profile name
pub trait CredentialResolver: Send + Sync {
    fn session(&self, profile: Option<&str>) -> Arc<dyn ObjectStoreSession>;
}

/// Static credentials read from a shared credentials profile
#[derive(Clone, PartialEq, Eq)]
pub struct ProfileCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: Option<String>,
}

impl std::fmt::Debug for ProfileCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .finish()
    }
}

/// Resolves AWS profiles from the shared credentials and config files
#[derive(Debug, Clone)]
pub struct AwsProfileResolver {
    credentials_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl AwsProfileResolver {
    /// Use `AWS_SHARED_CREDENTIALS_FILE` / `AWS_CONFIG_FILE`, falling back
    /// to `~/.aws/credentials` and `~/.aws/config`
    pub fn from_env() -> Self {
        let aws_dir = dirs::home_dir().map(|home| home.join(".aws"));
        let pick = |var: &str, name: &str| {
            env::var_os(var)
                .map(PathBuf::from)
                .or_else(|| aws_dir.as_ref().map(|dir| dir.join(name)))
        };

        Self {
            credentials_file: pick(CREDENTIALS_FILE_ENV, "credentials"),
            config_file: pick(CONFIG_FILE_ENV, "config"),
        }
    }

    pub fn with_files(credentials_file: impl Into<PathBuf>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            credentials_file: Some(credentials_file.into()),
            config_file: Some(config_file.into()),
        }
    }

    /// `Ok(None)` means "use the environment credential chain"
    fn resolve_profile(&self, profile: &str) -> Result<Option<ProfileCredentials>, String> {
        let section = match &self.credentials_file {
            Some(path) => read_ini_section(path, profile)?,
            None => None,
        };

        let Some(mut section) = section else {
            if profile == DEFAULT_PROFILE {
                debug!("No [default] credentials profile, using environment credentials");
                return Ok(None);
            }
            return Err(format!("credential profile '{profile}' not found"));
        };

        let mut take = |key: &str| section.remove(key).filter(|v| !v.is_empty());
        let (Some(access_key_id), Some(secret_access_key)) =
            (take("aws_access_key_id"), take("aws_secret_access_key"))
        else {
            return Err(format!("credential profile '{profile}' has no access key pair"));
        };
        let session_token = take("aws_session_token");
        let inline_region = take("region");

        let config_section = if profile == DEFAULT_PROFILE {
            profile.to_string()
        } else {
            format!("profile {profile}")
        };
        let region = match &self.config_file {
            Some(path) => read_ini_section(path, &config_section)?.and_then(|mut s| s.remove("region")),
            None => None,
        }
        .or(inline_region);

        Ok(Some(ProfileCredentials {
            access_key_id,
            secret_access_key,
            session_token,
            region,
        }))
    }
}

impl Default for AwsProfileResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

impl CredentialResolver for AwsProfileResolver {
    fn session(&self, profile: Option<&str>) -> Arc<dyn ObjectStoreSession> {
        let credentials = match profile {
            Some(name) => self.resolve_profile(name),
            None => Ok(None),
        };

        info!(profile = profile.unwrap_or("<environment>"), "Initializing object store session");

        Arc::new(AwsSession {
            profile: profile.map(str::to_string),
            credentials,
        })
    }
}

struct AwsSession {
    profile: Option<String>,
    credentials: Result<Option<ProfileCredentials>, String>,
}

impl ObjectStoreSession for AwsSession {
    fn bucket(&self, name: &str) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(name);

        match &self.credentials {
            Err(reason) => {
                return Err(object_store::Error::Generic {
                    store: "S3",
                    source: reason.clone().into(),
                });
            }
            Ok(Some(creds)) => {
                builder = builder
                    .with_access_key_id(&creds.access_key_id)
                    .with_secret_access_key(&creds.secret_access_key);
                if let Some(token) = &creds.session_token {
                    builder = builder.with_token(token);
                }
                if let Some(region) = &creds.region {
                    builder = builder.with_region(region);
                }
            }
            Ok(None) => {}
        }

        debug!(bucket = name, profile = ?self.profile, "Building S3 client");
        Ok(Arc::new(builder.build()?))
    }
}

/// Read one `[section]` of an INI file; `Ok(None)` when the file or the
/// section does not exist
fn read_ini_section(path: &Path, section: &str) -> Result<Option<HashMap<String, String>>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let describe = |e: config::ConfigError| format!("cannot read {}: {e}", path.display());

    let sections: HashMap<String, config::Value> = config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Ini))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(describe)?;

    let Some(table) = sections.get(section) else {
        return Ok(None);
    };

    let table = table.clone().into_table().map_err(describe)?;
    table
        .into_iter()
        .map(|(key, value)| value.into_string().map(|v| (key, v)).map_err(describe))
        .collect::<Result<HashMap<_, _>, _>>()
        .map(Some)
}
