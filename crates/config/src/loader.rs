//! Merges configuration values from the command line and the environment.
//!
//! Environment variables take precedence over command-line values wherever
//! both are present. A boolean environment value is parsed with an explicit
//! presence check, so `RELAY_READ_ONLY=false` overrides `--read-only` instead
//! of silently losing to it.

use std::collections::HashMap;
use std::net::SocketAddr;

use anyhow::{Context, bail};
use secrecy::SecretString;
use url::Url;

use crate::{Config, HealthConfig, McpConfig, ServerConfig, UpstreamConfig, mcp};

/// Environment variable carrying the upstream access token.
pub const ENV_ACCESS_TOKEN: &str = "RELAY_ACCESS_TOKEN";
/// Environment variable carrying the upstream project reference.
pub const ENV_PROJECT_REF: &str = "RELAY_PROJECT_REF";
/// Environment variable toggling read-only upstream access.
pub const ENV_READ_ONLY: &str = "RELAY_READ_ONLY";
/// Environment variable overriding the upstream API base URL.
pub const ENV_API_URL: &str = "RELAY_API_URL";
/// Environment variable overriding the listen address.
pub const ENV_LISTEN_ADDRESS: &str = "RELAY_LISTEN_ADDRESS";
/// Environment variable overriding the SSE stream path.
pub const ENV_SSE_PATH: &str = "RELAY_SSE_PATH";
/// Environment variable overriding the message submission path.
pub const ENV_MESSAGES_PATH: &str = "RELAY_MESSAGES_PATH";

/// Configuration values collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliValues {
    /// Value of `--access-token`.
    pub access_token: Option<SecretString>,
    /// Value of `--project-ref`.
    pub project_ref: Option<String>,
    /// Whether `--read-only` was passed.
    pub read_only: bool,
    /// Value of `--api-url`.
    pub api_url: Option<Url>,
    /// Value of `--listen-address`.
    pub listen_address: Option<SocketAddr>,
    /// Value of `--sse-path`.
    pub sse_path: Option<String>,
    /// Value of `--messages-path`.
    pub messages_path: Option<String>,
}

/// Source of environment variables, abstracted so resolution is testable.
pub trait EnvSource {
    /// Returns the value of the given variable, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads variables from the process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Resolves the final configuration from command-line values and an
/// environment source. Environment values win; unset values fall back to the
/// command line, then to defaults.
pub fn resolve(cli: CliValues, env: &dyn EnvSource) -> anyhow::Result<Config> {
    let access_token = env_nonempty(env, ENV_ACCESS_TOKEN)
        .map(SecretString::from)
        .or(cli.access_token);

    let project_ref = env_nonempty(env, ENV_PROJECT_REF).or(cli.project_ref);

    let read_only = match env_nonempty(env, ENV_READ_ONLY) {
        Some(raw) => parse_bool(ENV_READ_ONLY, &raw)?,
        None => cli.read_only,
    };

    let api_url = match env_nonempty(env, ENV_API_URL) {
        Some(raw) => Some(Url::parse(&raw).with_context(|| format!("invalid {ENV_API_URL}: {raw}"))?),
        None => cli.api_url,
    };

    let listen_address = match env_nonempty(env, ENV_LISTEN_ADDRESS) {
        Some(raw) => Some(
            raw.parse()
                .with_context(|| format!("invalid {ENV_LISTEN_ADDRESS}: {raw}"))?,
        ),
        None => cli.listen_address,
    };

    let sse_path = env_nonempty(env, ENV_SSE_PATH)
        .or(cli.sse_path)
        .unwrap_or_else(mcp::default_sse_path);

    let messages_path = env_nonempty(env, ENV_MESSAGES_PATH)
        .or(cli.messages_path)
        .unwrap_or_else(mcp::default_messages_path);

    validate_path("SSE path", &sse_path)?;
    validate_path("messages path", &messages_path)?;

    if sse_path == messages_path {
        bail!("the SSE path and the messages path must differ (both are {sse_path})");
    }

    Ok(Config {
        server: ServerConfig {
            listen_address,
            health: HealthConfig::default(),
        },
        mcp: McpConfig { sse_path, messages_path },
        upstream: UpstreamConfig {
            access_token,
            project_ref,
            read_only,
            api_url,
        },
    })
}

fn env_nonempty(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.get(key).filter(|value| !value.is_empty())
}

fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => bail!("invalid {key}: expected true, false, 1 or 0, got {other}"),
    }
}

fn validate_path(what: &str, path: &str) -> anyhow::Result<()> {
    if !path.starts_with('/') {
        bail!("the {what} must start with a slash, got {path}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use insta::{assert_debug_snapshot, assert_snapshot};
    use secrecy::SecretString;

    use super::{CliValues, resolve};

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = resolve(CliValues::default(), &env(&[])).unwrap();

        assert_debug_snapshot!(config, @r#"
        Config {
            server: ServerConfig {
                listen_address: None,
                health: HealthConfig {
                    enabled: true,
                    path: "/health",
                },
            },
            mcp: McpConfig {
                sse_path: "/sse",
                messages_path: "/mcp-messages",
            },
            upstream: UpstreamConfig {
                access_token: None,
                project_ref: None,
                read_only: false,
                api_url: None,
            },
        }
        "#);
    }

    #[test]
    fn environment_wins_over_cli() {
        let cli = CliValues {
            access_token: Some(SecretString::from("cli-token")),
            project_ref: Some("cli-project".to_string()),
            listen_address: Some("127.0.0.1:9000".parse().unwrap()),
            ..Default::default()
        };

        let env = env(&[
            ("RELAY_ACCESS_TOKEN", "env-token"),
            ("RELAY_PROJECT_REF", "env-project"),
            ("RELAY_LISTEN_ADDRESS", "0.0.0.0:3002"),
        ]);

        let config = resolve(cli, &env).unwrap();

        assert_eq!(config.upstream.project_ref.as_deref(), Some("env-project"));
        assert_eq!(config.server.listen_address(), "0.0.0.0:3002".parse().unwrap());

        assert_debug_snapshot!(config.upstream.access_token, @r#"
        Some(
            SecretBox<str>([REDACTED]),
        )
        "#);
    }

    #[test]
    fn read_only_env_false_overrides_cli_flag() {
        let cli = CliValues {
            read_only: true,
            ..Default::default()
        };

        let config = resolve(cli, &env(&[("RELAY_READ_ONLY", "false")])).unwrap();
        assert!(!config.upstream.read_only);
    }

    #[test]
    fn read_only_accepts_numeric_booleans() {
        let config = resolve(CliValues::default(), &env(&[("RELAY_READ_ONLY", "1")])).unwrap();
        assert!(config.upstream.read_only);
    }

    #[test]
    fn read_only_rejects_garbage() {
        let error = resolve(CliValues::default(), &env(&[("RELAY_READ_ONLY", "yes")])).unwrap_err();

        assert_snapshot!(error.to_string(), @"invalid RELAY_READ_ONLY: expected true, false, 1 or 0, got yes");
    }

    #[test]
    fn api_url_must_parse() {
        let error = resolve(CliValues::default(), &env(&[("RELAY_API_URL", "not a url")])).unwrap_err();

        assert_snapshot!(error.to_string(), @"invalid RELAY_API_URL: not a url");
    }

    #[test]
    fn paths_must_be_absolute() {
        let error = resolve(CliValues::default(), &env(&[("RELAY_SSE_PATH", "sse")])).unwrap_err();

        assert_snapshot!(error.to_string(), @"the SSE path must start with a slash, got sse");
    }

    #[test]
    fn paths_must_differ() {
        let env = env(&[("RELAY_SSE_PATH", "/mcp"), ("RELAY_MESSAGES_PATH", "/mcp")]);
        let error = resolve(CliValues::default(), &env).unwrap_err();

        assert_snapshot!(error.to_string(), @"the SSE path and the messages path must differ (both are /mcp)");
    }

    #[test]
    fn empty_environment_values_are_treated_as_unset() {
        let cli = CliValues {
            project_ref: Some("cli-project".to_string()),
            ..Default::default()
        };

        let config = resolve(cli, &env(&[("RELAY_PROJECT_REF", ""), ("RELAY_ACCESS_TOKEN", "")])).unwrap();

        assert_eq!(config.upstream.project_ref.as_deref(), Some("cli-project"));
        assert!(config.upstream.access_token.is_none());
    }
}
