/*!

The bridge to `talosctl`. Once the load balancer has an address, `talosctl gen config` is run
exactly once to write the control plane and worker machine configurations, which are then read
back so they can be passed to the instances as user data.

!*/

use crate::cloud::LoadBalancerEndpoint;
use crate::error::{self, Result};
use cluster_model::constants::{CONTROLPLANE_CONFIG_FILE, TALOSCONFIG_FILE, WORKER_CONFIG_FILE};
use cluster_model::{DeploymentConfig, NodeRole};
use log::{debug, info};
use serde_json::{json, Value};
use snafu::ResultExt;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::process::Command;

/// A machine configuration written by `talosctl`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedConfigArtifact {
    pub role: NodeRole,
    pub source_path: PathBuf,
    pub content: String,
}

/// Both machine configurations of one `talosctl gen config` run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedConfigs {
    pub control_plane: GeneratedConfigArtifact,
    pub worker: GeneratedConfigArtifact,
}

impl GeneratedConfigs {
    pub fn for_role(&self, role: NodeRole) -> &GeneratedConfigArtifact {
        match role {
            NodeRole::ControlPlane => &self.control_plane,
            NodeRole::Worker => &self.worker,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConfigGenerator {
    program: PathBuf,
    work_dir: PathBuf,
    cluster_name: String,
    api_port: u16,
    install_disk: String,
    time_servers: Vec<String>,
}

impl ConfigGenerator {
    pub fn new(config: &DeploymentConfig) -> Self {
        Self {
            program: config.talosctl_path.clone(),
            work_dir: config.work_dir.clone(),
            cluster_name: config.cluster_name.clone(),
            api_port: config.api_port,
            install_disk: config.install_disk.clone(),
            time_servers: config.time_servers.clone(),
        }
    }

    /// The Kubernetes API endpoint the nodes are told to use.
    pub fn endpoint_url(&self, dns_name: &str) -> String {
        format!("https://{}:{}", dns_name, self.api_port)
    }

    /// A JSON patch replacing the time servers of the default machine configuration.
    pub fn patch(&self) -> Value {
        json!([
            {
                "op": "replace",
                "path": "/machine/time",
                "value": {
                    "servers": self.time_servers,
                },
            }
        ])
    }

    /// The arguments of `talosctl gen config`. Each element is passed as is, without a shell.
    pub fn args(&self, dns_name: &str) -> Result<Vec<String>> {
        let patch = serde_json::to_string(&self.patch()).context(error::ConfigPatchSnafu)?;
        Ok(vec![
            "gen".to_string(),
            "config".to_string(),
            self.cluster_name.clone(),
            self.endpoint_url(dns_name),
            "--with-examples=false".to_string(),
            "--with-docs=false".to_string(),
            format!("--install-disk={}", self.install_disk),
            format!("--config-patch={}", patch),
            "--force".to_string(),
        ])
    }

    pub fn artifact_path(&self, role: NodeRole) -> PathBuf {
        self.work_dir.join(match role {
            NodeRole::ControlPlane => CONTROLPLANE_CONFIG_FILE,
            NodeRole::Worker => WORKER_CONFIG_FILE,
        })
    }

    pub fn talosconfig_path(&self) -> PathBuf {
        self.work_dir.join(TALOSCONFIG_FILE)
    }

    /// Run `talosctl gen config` against `endpoint` and read both machine configurations.
    pub async fn generate(&self, endpoint: &LoadBalancerEndpoint) -> Result<GeneratedConfigs> {
        let args = self.args(&endpoint.dns_name)?;
        info!(
            "Generating machine configurations for '{}'",
            self.endpoint_url(&endpoint.dns_name)
        );
        debug!("Running '{}' with {:?}", self.program.display(), args);
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.work_dir)
            .output()
            .await
            .context(error::BootstrapCommandSpawnSnafu {
                program: self.program.clone(),
            })?;
        let hint = format!("{} gen config", self.program.display());
        agent_utils::command_output(&output, &hint).context(
            error::BootstrapCommandFailedSnafu {
                program: self.program.clone(),
            },
        )?;
        debug!("talosctl: {}", String::from_utf8_lossy(&output.stderr).trim());

        let (control_plane, worker) = tokio::try_join!(
            self.read_artifact(NodeRole::ControlPlane),
            self.read_artifact(NodeRole::Worker)
        )?;
        Ok(GeneratedConfigs {
            control_plane,
            worker,
        })
    }

    async fn read_artifact(&self, role: NodeRole) -> Result<GeneratedConfigArtifact> {
        let path = self.artifact_path(role);
        let content = tokio::fs::read_to_string(&path)
            .await
            .and_then(|content| {
                if content.trim().is_empty() {
                    Err(std::io::Error::new(ErrorKind::InvalidData, "the file is empty"))
                } else {
                    Ok(content)
                }
            })
            .context(error::ConfigArtifactMissingSnafu { path: path.clone() })?;
        debug!("Read {} bytes from '{}'", content.len(), path.display());
        Ok(GeneratedConfigArtifact {
            role,
            source_path: path,
            content,
        })
    }

    /// Remove the files `talosctl gen config` writes. Files that are already gone are fine.
    pub async fn cleanup(&self) -> Result<()> {
        for path in [
            self.talosconfig_path(),
            self.artifact_path(NodeRole::ControlPlane),
            self.artifact_path(NodeRole::Worker),
        ] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!("Removed '{}'", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e).context(error::ConfigCleanupSnafu { path }),
            }
        }
        Ok(())
    }
}
