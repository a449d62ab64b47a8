//! AWS Session Provider
//!
//! Resolves credentials from a named profile or from the default chain.
//! Regional clients are derived from the session, so the session itself is
//! pinned to a fallback region and never has to discover one.

use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sdk_cloudformation::error::DisplayErrorContext;
use std::path::Path;
use tracing::{debug, info};

use super::types::EventStreamError;

/// Region used until a regional client overrides it
pub const FALLBACK_REGION: &str = "us-east-1";

/// Authenticated AWS handle for one provisioning run
#[derive(Debug, Clone)]
pub struct Session {
    config: SdkConfig,
    profile: Option<String>,
}

impl Session {
    /// Open a session
    ///
    /// A non-empty `profile_name` selects that profile, read from
    /// `profile_path` when given or from the standard credentials file
    /// otherwise. An empty name falls back to the default credential chain.
    pub async fn open(
        profile_name: &str,
        profile_path: Option<&Path>,
    ) -> Result<Self, EventStreamError> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(FALLBACK_REGION));

        let profile = if profile_name.trim().is_empty() {
            debug!("Using default AWS credential chain");
            None
        } else {
            let mut provider = ProfileFileCredentialsProvider::builder().profile_name(profile_name);

            if let Some(path) = profile_path {
                if !path.is_file() {
                    return Err(EventStreamError::Credential(format!(
                        "credentials file {} does not exist",
                        path.display()
                    )));
                }
                debug!(profile = %profile_name, path = %path.display(), "Using profile from credentials file");
                let files = EnvConfigFiles::builder()
                    .with_file(EnvConfigFileKind::Credentials, path)
                    .build();
                provider = provider.profile_files(files);
            }

            loader = loader.credentials_provider(provider.build());
            Some(profile_name.to_string())
        };

        let config = loader.load().await;

        let credentials = config.credentials_provider().ok_or_else(|| {
            EventStreamError::Credential("no credentials provider configured".to_string())
        })?;

        credentials
            .provide_credentials()
            .await
            .map_err(|e| EventStreamError::Credential(DisplayErrorContext(&e).to_string()))?;

        info!(
            profile = profile.as_deref().unwrap_or("default"),
            "AWS session established"
        );

        Ok(Self { config, profile })
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Profile the session was opened with, `None` for the default chain
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }
}
