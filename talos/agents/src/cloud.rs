/*!

The `Cloud` trait is every AWS call a deployment makes. [`AwsCloud`] implements it against the
real APIs and tests inject their own implementation.

!*/

use crate::error::Result;
use crate::network::{Ipv4Cidr, SubnetPlan};
use crate::security::{SecurityGroups, SecurityRule};
use cluster_model::constants::{TAG_DEPLOYMENT, TAG_DEPLOYMENT_UUID, TAG_NAME};
use cluster_model::ImageDetails;
use serde::{Deserialize, Serialize};

/// The tags put on every resource of a deployment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceTags {
    pub name: String,
    pub deployment: String,
    pub uuid: String,
}

impl ResourceTags {
    pub fn new<S: Into<String>>(name: S, deployment: &str, uuid: &str) -> Self {
        Self {
            name: name.into(),
            deployment: deployment.to_string(),
            uuid: uuid.to_string(),
        }
    }

    /// Tag keys and values in a fixed order.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (TAG_NAME, self.name.as_str()),
            (TAG_DEPLOYMENT, self.deployment.as_str()),
            (TAG_DEPLOYMENT_UUID, self.uuid.as_str()),
        ]
    }
}

/// The network load balancer in front of the control plane.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerEndpoint {
    pub arn: String,
    pub dns_name: String,
    pub target_group_arn: String,
}

/// Everything needed to launch one node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchRequest {
    pub image_id: String,
    pub instance_type: String,
    pub subnet_id: String,
    pub security_group_id: String,
    /// Passed verbatim; the cloud takes care of any encoding.
    pub user_data: String,
    pub tags: ResourceTags,
}

/// The addresses of a running instance.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceAddresses {
    pub instance_id: String,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

#[async_trait::async_trait]
pub trait Cloud: Send + Sync {
    /// The region every call is made in.
    fn region(&self) -> &str;

    /// The names of the available zones, in the order the provider reports them.
    async fn availability_zones(&self) -> Result<Vec<String>>;

    async fn describe_image(&self, image_id: &str) -> Result<ImageDetails>;

    /// Create a VPC with DNS support and DNS hostnames enabled.
    async fn create_vpc(&self, cidr: &Ipv4Cidr, tags: &ResourceTags) -> Result<String>;

    /// Create an internet gateway and attach it to the VPC.
    async fn create_internet_gateway(&self, vpc_id: &str, tags: &ResourceTags) -> Result<String>;

    /// Add a default route through the gateway to the VPC's main route table.
    async fn route_to_gateway(&self, vpc_id: &str, gateway_id: &str) -> Result<()>;

    /// Create a subnet that gives its instances a public address.
    async fn create_subnet(
        &self,
        vpc_id: &str,
        plan: &SubnetPlan,
        tags: &ResourceTags,
    ) -> Result<String>;

    async fn create_security_group(
        &self,
        vpc_id: &str,
        description: &str,
        tags: &ResourceTags,
    ) -> Result<String>;

    /// Remove the allow-all egress rule AWS adds to every new security group. A group without it
    /// is not an error.
    async fn revoke_default_egress(&self, group_id: &str) -> Result<()>;

    async fn authorize_rule(&self, groups: &SecurityGroups, rule: &SecurityRule) -> Result<()>;

    /// Create a TCP target group for instances, health checked over TCP. Returns its ARN.
    async fn create_target_group(
        &self,
        name: &str,
        vpc_id: &str,
        port: u16,
        tags: &ResourceTags,
    ) -> Result<String>;

    /// Create an internet facing network load balancer. Returns its ARN and DNS name.
    async fn create_load_balancer(
        &self,
        name: &str,
        subnet_ids: &[String],
        security_group_id: &str,
        tags: &ResourceTags,
    ) -> Result<(String, String)>;

    /// Forward TCP `port` of the load balancer to the target group. Returns the listener ARN.
    async fn create_listener(
        &self,
        load_balancer_arn: &str,
        target_group_arn: &str,
        port: u16,
    ) -> Result<String>;

    /// Launch one instance. Returns its id.
    async fn run_instance(&self, request: &LaunchRequest) -> Result<String>;

    async fn wait_for_running(&self, instance_ids: &[String]) -> Result<Vec<InstanceAddresses>>;

    async fn register_target(
        &self,
        target_group_arn: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<()>;

    /// Ids of instances carrying tag `key=value` that are not terminated.
    async fn instances_by_tag(&self, key: &str, value: &str) -> Result<Vec<String>>;

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()>;

    async fn wait_for_terminated(&self, instance_ids: &[String]) -> Result<()>;

    // The teardown calls treat a resource that is already gone as deleted.

    async fn delete_load_balancer(&self, arn: &str) -> Result<()>;

    async fn delete_target_group(&self, arn: &str) -> Result<()>;

    async fn delete_security_group(&self, group_id: &str) -> Result<()>;

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()>;

    /// Detach the gateway from the VPC and delete it.
    async fn delete_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()>;

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()>;
}
