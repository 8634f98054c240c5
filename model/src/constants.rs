/// Helper macro to avoid retyping the base name of our system when creating further string
/// constants from it. When given no parameters, this returns the base name. When given a string
/// literal parameter it adds `/parameter` to the end.
macro_rules! talos_aws {
    () => {
        "talos-aws"
    };
    ($s:literal) => {
        concat!(talos_aws!(), "/", $s)
    };
}

// Tag keys
pub const TAG_NAME: &str = "Name";
pub const TAG_DEPLOYMENT: &str = talos_aws!("deployment");
pub const TAG_DEPLOYMENT_UUID: &str = talos_aws!("uuid");

// Network defaults
pub const DEFAULT_NETWORK_CIDR: &str = "10.230.0.0/16";
pub const DEFAULT_SUBNET_PREFIX: u8 = 24;
pub const DEFAULT_ZONE_LIMIT: usize = 3;
pub const ANYWHERE_CIDR: &str = "0.0.0.0/0";

// Cluster defaults
pub const DEFAULT_DEPLOYMENT_NAME: &str = "talos";
pub const DEFAULT_CLUSTER_NAME: &str = "talos-k8s-aws-tutorial";
pub const DEFAULT_API_PORT: u16 = 6443;
pub const DEFAULT_INSTALL_DISK: &str = "/dev/xvda";
pub const DEFAULT_INSTANCE_TYPE: &str = "t3a.medium";
pub const DEFAULT_CONTROL_PLANE_COUNT: usize = 1;
pub const DEFAULT_WORKER_COUNT: usize = 2;
/// The Amazon Time Sync Service, reachable from every VPC.
pub const DEFAULT_TIME_SERVER: &str = "169.254.169.123";

// Image selection
pub const DEFAULT_IMAGE_CLOUD: &str = "aws";
pub const DEFAULT_IMAGE_ARCH: &str = "amd64";
pub const DEFAULT_RELEASE_URL: &str = "https://api.github.com/repos/siderolabs/talos/releases/latest";
pub const DEFAULT_MANIFEST_URL_TEMPLATE: &str =
    "https://github.com/siderolabs/talos/releases/download/{version}/cloud-images.json";
pub const MANIFEST_VERSION_PLACEHOLDER: &str = "{version}";
pub const DEFAULT_CALLER_IP_URL: &str = "https://api.ipify.org/";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

// talosctl
pub const DEFAULT_TALOSCTL: &str = "talosctl";
pub const CONTROLPLANE_CONFIG_FILE: &str = "controlplane.yaml";
pub const WORKER_CONFIG_FILE: &str = "worker.yaml";
pub const TALOSCONFIG_FILE: &str = "talosconfig";

// Files
pub const DEFAULT_STATE_FILE: &str = "talos-aws.state.json";

/// Elastic Load Balancing names are limited to 32 characters and we append at most `-nlb`.
pub const MAX_DEPLOYMENT_NAME_LEN: usize = 28;

#[test]
fn talos_aws_constants_macro_test() {
    assert_eq!("talos-aws", talos_aws!());
    assert_eq!("talos-aws/uuid", talos_aws!("uuid"));
    assert_eq!("talos-aws/deployment", TAG_DEPLOYMENT);
}
