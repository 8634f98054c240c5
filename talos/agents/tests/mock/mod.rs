pub(crate) mod cloud;

use cluster_model::DeploymentConfig;
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const RELEASE: &str = "v1.8.3";
pub(crate) const CALLER_IP: &str = "203.0.113.7";

/// What the stand-in for `talosctl` does when it is run.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Talosctl {
    /// Writes both machine configurations and a talosconfig.
    Succeed,
    /// Exits with code 3 without writing anything.
    Fail,
    /// Exits successfully but never writes `worker.yaml`.
    SkipWorker,
}

impl Talosctl {
    /// Write the stand-in executable into `dir`. It records its arguments in `args.txt`.
    pub(crate) fn install(self, dir: &Path) -> PathBuf {
        let body = match self {
            Talosctl::Succeed => {
                "printf 'version: v1alpha1\\nmachine:\\n  type: controlplane\\n' > controlplane.yaml\n\
                 printf 'version: v1alpha1\\nmachine:\\n  type: worker\\n' > worker.yaml\n\
                 printf 'context: talos\\n' > talosconfig\n"
            }
            Talosctl::Fail => "echo 'failed to generate config: bad patch' >&2\nexit 3\n",
            Talosctl::SkipWorker => {
                "printf 'version: v1alpha1\\nmachine:\\n  type: controlplane\\n' > controlplane.yaml\n"
            }
        };
        let script = format!("#!/bin/sh\nprintf '%s\\n' \"$@\" > args.txt\n{}", body);
        let program = dir.join("talosctl");
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        program
    }
}

/// The arguments the stand-in `talosctl` was last run with, one per line.
pub(crate) fn talosctl_args(dir: &Path) -> Option<Vec<String>> {
    std::fs::read_to_string(dir.join("args.txt"))
        .ok()
        .map(|args| args.lines().map(str::to_string).collect())
}

/// Serve the release lookup, a manifest for `RELEASE` and the caller address.
pub(crate) async fn release_server(manifest: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/release"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tag_name": RELEASE })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{}/cloud-images.json", RELEASE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}\n", CALLER_IP)))
        .mount(&server)
        .await;
    server
}

/// A manifest with the expected image in `us-east-1` and a few that must not be picked.
pub(crate) fn manifest() -> serde_json::Value {
    json!([
        { "cloud": "aws", "region": "us-west-2", "arch": "amd64", "id": "ami-000" },
        { "cloud": "aws", "region": "us-east-1", "arch": "amd64", "id": "ami-111" },
        { "cloud": "aws", "region": "us-east-1", "arch": "arm64", "id": "ami-222" },
        { "cloud": "aws", "region": "us-east-1", "arch": "amd64", "id": "ami-333" }
    ])
}

/// A deployment that talks to `server` and runs `talosctl` in `work_dir`.
pub(crate) fn config(server: &MockServer, work_dir: &Path, talosctl: PathBuf) -> DeploymentConfig {
    DeploymentConfig {
        region: Some("us-east-1".into()),
        talosctl_path: talosctl,
        work_dir: work_dir.to_path_buf(),
        release_url: format!("{}/release", server.uri()),
        manifest_url_template: format!("{}/{{version}}/cloud-images.json", server.uri()),
        caller_ip_url: format!("{}/ip", server.uri()),
        ..Default::default()
    }
}
