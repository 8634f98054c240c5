use crate::cloud::{Cloud, LaunchRequest, LoadBalancerEndpoint, ResourceTags};
use crate::http::http_client;
use crate::image::ImageCatalog;
use crate::network::{NetworkTopology, PublicSubnet};
use crate::plan::{DeploymentPlan, NodeSlot};
use crate::security::{caller_ip, security_rules, SecurityGroups};
use crate::talosctl::ConfigGenerator;
use agent_utils::impl_display_as_json;
use cluster_model::constants::{
    CONTROLPLANE_CONFIG_FILE, TAG_DEPLOYMENT_UUID, TALOSCONFIG_FILE, WORKER_CONFIG_FILE,
};
use cluster_model::{
    ClusterNode, Configuration, DeploymentConfig, DeploymentOutputs, ImageDetails, NodeRole,
};
use futures::future::{join_all, try_join_all};
use log::{debug, info, warn};
use resource_agent::clients::InfoClient;
use resource_agent::provider::{
    AsResources, Create, Destroy, IntoProviderError, ProviderError, ProviderResult, Resources,
    Spec,
};
use serde::{Deserialize, Serialize};
use serde_plain::derive_display_from_serialize;
use uuid::Uuid;

/// The steps of `up`, in the order they run.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Validate,
    SelectImage,
    Network,
    SecurityGroups,
    LoadBalancer,
    GenerateConfigs,
    Instances,
    Outputs,
}

derive_display_from_serialize!(Step);

/// Everything a deployment has created so far. It is written to the state file after every
/// resource creation or removal so `down` can always find what is left.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionMemo {
    /// A short description of what the provider is doing.
    pub current_status: String,

    pub region: String,

    /// Every resource is tagged with this so instances can be found if their ids are lost.
    pub uuid_tag: Option<String>,

    pub completed_steps: Vec<Step>,

    /// The Talos release the image was selected from.
    pub release: Option<String>,
    pub image: Option<ImageDetails>,

    pub vpc_id: Option<String>,
    pub internet_gateway_id: Option<String>,
    pub subnets: Vec<PublicSubnet>,

    pub cluster_security_group_id: Option<String>,
    pub load_balancer_security_group_id: Option<String>,

    pub target_group_arn: Option<String>,
    pub load_balancer_arn: Option<String>,
    pub nlb_dns_name: Option<String>,
    pub listener_arn: Option<String>,

    /// Set just before `talosctl gen config` runs.
    pub config_files_generated: bool,

    /// Every launched instance, addresses included once it is running.
    pub nodes: Vec<ClusterNode>,
}

impl Configuration for ProductionMemo {}

impl_display_as_json!(ProductionMemo);

impl ProductionMemo {
    fn complete(&mut self, step: Step) {
        info!("Step '{}' done", step);
        self.completed_steps.push(step);
        self.current_status = format!("Completed '{}'", step);
    }

    fn has_cloud_resources(&self) -> bool {
        self.vpc_id.is_some()
            || self.internet_gateway_id.is_some()
            || !self.subnets.is_empty()
            || self.cluster_security_group_id.is_some()
            || self.load_balancer_security_group_id.is_some()
            || self.target_group_arn.is_some()
            || self.load_balancer_arn.is_some()
            || !self.nodes.is_empty()
    }
}

impl AsResources for ProductionMemo {
    fn as_resources(&self) -> Resources {
        if self.has_cloud_resources() {
            Resources::Remaining
        } else {
            Resources::Clear
        }
    }
}

impl AsResources for &ProductionMemo {
    fn as_resources(&self) -> Resources {
        (*self).as_resources()
    }
}

async fn record<I>(client: &I, memo: &ProductionMemo) -> ProviderResult<()>
where
    I: InfoClient,
{
    client
        .send_info(memo.clone())
        .await
        .context(memo, "Unable to record progress in the state file")
}

/// Creates a Talos cluster: network, security groups, load balancer, machine configurations and
/// instances, in that order.
pub struct ClusterCreator<C> {
    cloud: C,
}

impl<C: Cloud> ClusterCreator<C> {
    pub fn new(cloud: C) -> Self {
        Self { cloud }
    }
}

#[async_trait::async_trait]
impl<C: Cloud> Create for ClusterCreator<C> {
    type Config = DeploymentConfig;
    type Info = ProductionMemo;
    type Resource = DeploymentOutputs;

    async fn create<I>(
        &self,
        spec: Spec<Self::Config>,
        client: &I,
    ) -> ProviderResult<Self::Resource>
    where
        I: InfoClient,
    {
        let config = spec.configuration;
        debug!("Creating deployment from:\n{}", agent_utils::json_display(&config));
        let mut memo: ProductionMemo = client
            .get_info()
            .await
            .context(Resources::Unknown, "Unable to get info from info client")?;
        let cloud = &self.cloud;
        let region = cloud.region().to_string();
        memo.region = region.clone();

        // Nothing is created until the deployment is known to fit.
        config
            .validate()
            .context(Resources::Clear, "Invalid deployment configuration")?;
        let zones = cloud
            .availability_zones()
            .await
            .context(Resources::Clear, "Unable to list availability zones")?;
        let plan = DeploymentPlan::build(&config, &region, &zones)
            .context(Resources::Clear, "Unable to place the deployment")?;
        info!(
            "Planned {} subnet(s) and {} node(s) in '{}'",
            plan.subnets.len(),
            plan.nodes.len(),
            region
        );
        let uuid = Uuid::new_v4().to_string();
        info!("Tagging resources with uuid '{}'", uuid);
        memo.uuid_tag = Some(uuid.clone());
        memo.complete(Step::Validate);
        record(client, &memo).await?;

        let tags = |name: String| ResourceTags::new(name, &config.name, &uuid);

        let http = http_client(config.http_timeout())
            .context(Resources::Clear, "Unable to build HTTP client")?;
        let catalog = ImageCatalog::new(http.clone(), &config);
        let target = config.selection_target(&region);
        let (selected, caller) = tokio::try_join!(
            async {
                catalog
                    .select(&target)
                    .await
                    .context(Resources::Clear, "Unable to select the Talos image")
            },
            async {
                caller_ip(&http, &config.caller_ip_url)
                    .await
                    .context(Resources::Clear, "Unable to determine the caller IP address")
            }
        )?;
        let image = cloud
            .describe_image(&selected.image_id)
            .await
            .context(Resources::Clear, "Unable to describe the Talos image")?;
        memo.release = Some(selected.version);
        memo.image = Some(image.clone());
        memo.complete(Step::SelectImage);
        record(client, &memo).await?;

        let vpc_id = cloud
            .create_vpc(&plan.network, &tags(format!("{}-vpc", config.name)))
            .await
            .context(&memo, "Unable to create VPC")?;
        memo.vpc_id = Some(vpc_id.clone());
        record(client, &memo).await?;
        let gateway_id = cloud
            .create_internet_gateway(&vpc_id, &tags(format!("{}-igw", config.name)))
            .await
            .context(&memo, "Unable to create internet gateway")?;
        memo.internet_gateway_id = Some(gateway_id.clone());
        record(client, &memo).await?;
        cloud
            .route_to_gateway(&vpc_id, &gateway_id)
            .await
            .context(&memo, "Unable to route the VPC through its internet gateway")?;
        let created = join_all(plan.subnets.iter().enumerate().map(|(index, subnet)| {
            let tags = tags(format!("{}-public-{}", config.name, index));
            let vpc_id = &vpc_id;
            async move {
                cloud
                    .create_subnet(vpc_id, subnet, &tags)
                    .await
                    .map(|subnet_id| PublicSubnet {
                        subnet_id,
                        zone: subnet.zone.clone(),
                        cidr: subnet.cidr,
                    })
            }
        }))
        .await;
        let mut subnet_error = None;
        for result in created {
            match result {
                Ok(subnet) => memo.subnets.push(subnet),
                Err(e) => subnet_error = subnet_error.or(Some(e)),
            }
        }
        record(client, &memo).await?;
        if let Some(e) = subnet_error {
            return Err(ProviderError::new_with_source_and_context(
                &memo,
                "Unable to create public subnets",
                e,
            ));
        }
        let topology = NetworkTopology {
            vpc_id: vpc_id.clone(),
            cidr: plan.network,
            internet_gateway_id: gateway_id,
            subnets: memo.subnets.clone(),
        };
        debug!("Network:\n{}", agent_utils::json_display(&topology));
        memo.complete(Step::Network);
        record(client, &memo).await?;

        let cluster_group = cloud
            .create_security_group(
                &vpc_id,
                "Talos cluster nodes",
                &tags(format!("{}-cluster", config.name)),
            )
            .await
            .context(&memo, "Unable to create the cluster security group")?;
        memo.cluster_security_group_id = Some(cluster_group.clone());
        record(client, &memo).await?;
        let load_balancer_group = cloud
            .create_security_group(
                &vpc_id,
                "Talos API load balancer",
                &tags(format!("{}-lb", config.name)),
            )
            .await
            .context(&memo, "Unable to create the load balancer security group")?;
        memo.load_balancer_security_group_id = Some(load_balancer_group.clone());
        record(client, &memo).await?;
        let groups = SecurityGroups {
            cluster: cluster_group,
            load_balancer: load_balancer_group,
        };
        // Outbound traffic is limited to the explicit egress rules.
        try_join_all(
            [&groups.cluster, &groups.load_balancer]
                .into_iter()
                .map(|group_id| cloud.revoke_default_egress(group_id)),
        )
        .await
        .context(&memo, "Unable to revoke default security group egress")?;
        let rules = security_rules(caller, plan.network, config.api_port);
        try_join_all(rules.iter().map(|rule| cloud.authorize_rule(&groups, rule)))
            .await
            .context(&memo, "Unable to authorize security group rules")?;
        memo.complete(Step::SecurityGroups);
        record(client, &memo).await?;

        let target_group_arn = cloud
            .create_target_group(
                &config.target_group_name(),
                &vpc_id,
                config.api_port,
                &tags(config.target_group_name()),
            )
            .await
            .context(&memo, "Unable to create target group")?;
        memo.target_group_arn = Some(target_group_arn.clone());
        record(client, &memo).await?;
        let subnet_ids = topology.subnet_ids();
        let (load_balancer_arn, dns_name) = cloud
            .create_load_balancer(
                &config.load_balancer_name(),
                &subnet_ids,
                &groups.load_balancer,
                &tags(config.load_balancer_name()),
            )
            .await
            .context(&memo, "Unable to create load balancer")?;
        memo.load_balancer_arn = Some(load_balancer_arn.clone());
        memo.nlb_dns_name = Some(dns_name.clone());
        record(client, &memo).await?;
        let listener_arn = cloud
            .create_listener(&load_balancer_arn, &target_group_arn, config.api_port)
            .await
            .context(&memo, "Unable to create load balancer listener")?;
        memo.listener_arn = Some(listener_arn);
        memo.complete(Step::LoadBalancer);
        record(client, &memo).await?;
        let endpoint = LoadBalancerEndpoint {
            arn: load_balancer_arn,
            dns_name,
            target_group_arn,
        };

        let generator = ConfigGenerator::new(&config);
        memo.config_files_generated = true;
        record(client, &memo).await?;
        let configs = generator
            .generate(&endpoint)
            .await
            .context(&memo, "Unable to generate machine configurations")?;
        memo.complete(Step::GenerateConfigs);
        record(client, &memo).await?;

        let mut launches: Vec<(NodeSlot, LaunchRequest)> = Vec::with_capacity(plan.nodes.len());
        for slot in &plan.nodes {
            let subnet = memo
                .subnets
                .get(slot.subnet_index)
                .context(&memo, format!("No subnet for node '{}'", slot.name()))?;
            launches.push((
                *slot,
                LaunchRequest {
                    image_id: image.image_id.clone(),
                    instance_type: config.instance_type.clone(),
                    subnet_id: subnet.subnet_id.clone(),
                    security_group_id: groups.cluster.clone(),
                    user_data: configs.for_role(slot.role).content.clone(),
                    tags: tags(slot.name()),
                },
            ));
        }
        let launched = join_all(launches.iter().map(|(slot, request)| async move {
            (slot, request, cloud.run_instance(request).await)
        }))
        .await;
        let mut launch_error = None;
        for (slot, request, result) in launched {
            match result {
                Ok(instance_id) => memo.nodes.push(ClusterNode {
                    role: slot.role,
                    index: slot.index,
                    name: slot.name(),
                    instance_id,
                    subnet_id: request.subnet_id.clone(),
                    public_ip: None,
                    private_ip: None,
                }),
                Err(e) => launch_error = launch_error.or(Some(e)),
            }
        }
        record(client, &memo).await?;
        if let Some(e) = launch_error {
            return Err(ProviderError::new_with_source_and_context(
                &memo,
                "Unable to launch instances",
                e,
            ));
        }
        let instance_ids: Vec<String> =
            memo.nodes.iter().map(|n| n.instance_id.clone()).collect();
        let addresses = cloud
            .wait_for_running(&instance_ids)
            .await
            .context(&memo, "Instances did not reach the running state")?;
        for node in memo.nodes.iter_mut() {
            if let Some(found) = addresses.iter().find(|a| a.instance_id == node.instance_id) {
                node.public_ip = found.public_ip.clone();
                node.private_ip = found.private_ip.clone();
            }
        }
        record(client, &memo).await?;
        try_join_all(
            memo.nodes
                .iter()
                .filter(|node| node.role == NodeRole::ControlPlane)
                .map(|node| {
                    cloud.register_target(
                        &endpoint.target_group_arn,
                        &node.instance_id,
                        config.api_port,
                    )
                }),
        )
        .await
        .context(&memo, "Unable to register control plane nodes")?;
        memo.complete(Step::Instances);
        record(client, &memo).await?;

        let talosconfig = generator.talosconfig_path();
        let talosconfig = tokio::fs::metadata(&talosconfig)
            .await
            .is_ok()
            .then(|| talosconfig);
        let nodes_with_role = |role: NodeRole| -> Vec<ClusterNode> {
            let mut nodes: Vec<ClusterNode> = memo
                .nodes
                .iter()
                .filter(|node| node.role == role)
                .cloned()
                .collect();
            nodes.sort_by_key(|node| node.index);
            nodes
        };
        let outputs = DeploymentOutputs {
            region,
            vpc_id,
            public_subnet_ids: subnet_ids,
            image,
            nlb_dns_name: endpoint.dns_name.clone(),
            control_plane: nodes_with_role(NodeRole::ControlPlane),
            workers: nodes_with_role(NodeRole::Worker),
            talosconfig,
        };
        memo.complete(Step::Outputs);
        memo.current_status = "Deployment created".into();
        record(client, &memo).await?;
        debug!("Final memo:\n{}", memo);
        info!(
            "Done: the Kubernetes API is at '{}'",
            generator.endpoint_url(&endpoint.dns_name)
        );
        Ok(outputs)
    }
}

/// Removes everything a [`ClusterCreator`] created, including partial deployments.
pub struct ClusterDestroyer<C> {
    cloud: C,
}

impl<C: Cloud> ClusterDestroyer<C> {
    pub fn new(cloud: C) -> Self {
        Self { cloud }
    }
}

#[async_trait::async_trait]
impl<C: Cloud> Destroy for ClusterDestroyer<C> {
    type Config = DeploymentConfig;
    type Info = ProductionMemo;
    type Resource = DeploymentOutputs;

    async fn destroy<I>(
        &self,
        spec: Option<Spec<Self::Config>>,
        resource: Option<Self::Resource>,
        client: &I,
    ) -> ProviderResult<()>
    where
        I: InfoClient,
    {
        let mut memo: ProductionMemo = client
            .get_info()
            .await
            .context(Resources::Unknown, "Unable to get info from info client")?;
        let cloud = &self.cloud;

        let mut instance_ids: Vec<String> =
            memo.nodes.iter().map(|n| n.instance_id.clone()).collect();
        if let Some(resource) = &resource {
            for node in resource.control_plane.iter().chain(resource.workers.iter()) {
                if !instance_ids.contains(&node.instance_id) {
                    instance_ids.push(node.instance_id.clone());
                }
            }
        }
        if let Some(uuid) = &memo.uuid_tag {
            let tagged = cloud
                .instances_by_tag(TAG_DEPLOYMENT_UUID, uuid)
                .await
                .context(Resources::Unknown, "Unable to look up tagged instances")?;
            for id in tagged {
                if !instance_ids.contains(&id) {
                    instance_ids.push(id);
                }
            }
        }
        if !instance_ids.is_empty() {
            info!("Terminating {} instance(s)", instance_ids.len());
            cloud
                .terminate_instances(&instance_ids)
                .await
                .context(Resources::Remaining, "Unable to terminate instances")?;
            cloud
                .wait_for_terminated(&instance_ids)
                .await
                .context(Resources::Remaining, "Instances did not terminate")?;
            memo.nodes.clear();
            memo.current_status = "Instances terminated".into();
            record(client, &memo).await?;
        }

        if let Some(arn) = memo.load_balancer_arn.clone() {
            cloud
                .delete_load_balancer(&arn)
                .await
                .context(&memo, "Unable to delete load balancer")?;
            memo.load_balancer_arn = None;
            memo.listener_arn = None;
            memo.nlb_dns_name = None;
            record(client, &memo).await?;
        }
        if let Some(arn) = memo.target_group_arn.clone() {
            cloud
                .delete_target_group(&arn)
                .await
                .context(&memo, "Unable to delete target group")?;
            memo.target_group_arn = None;
            record(client, &memo).await?;
        }
        // The cluster group refers to the load balancer group so it goes first.
        if let Some(group_id) = memo.cluster_security_group_id.clone() {
            cloud
                .delete_security_group(&group_id)
                .await
                .context(&memo, "Unable to delete the cluster security group")?;
            memo.cluster_security_group_id = None;
            record(client, &memo).await?;
        }
        if let Some(group_id) = memo.load_balancer_security_group_id.clone() {
            cloud
                .delete_security_group(&group_id)
                .await
                .context(&memo, "Unable to delete the load balancer security group")?;
            memo.load_balancer_security_group_id = None;
            record(client, &memo).await?;
        }
        while let Some(subnet) = memo.subnets.last().cloned() {
            cloud
                .delete_subnet(&subnet.subnet_id)
                .await
                .context(&memo, format!("Unable to delete subnet '{}'", subnet.subnet_id))?;
            memo.subnets.pop();
            record(client, &memo).await?;
        }
        if let (Some(gateway_id), Some(vpc_id)) =
            (memo.internet_gateway_id.clone(), memo.vpc_id.clone())
        {
            cloud
                .delete_internet_gateway(&gateway_id, &vpc_id)
                .await
                .context(&memo, "Unable to delete internet gateway")?;
            memo.internet_gateway_id = None;
            record(client, &memo).await?;
        }
        if let Some(vpc_id) = memo.vpc_id.clone() {
            cloud
                .delete_vpc(&vpc_id)
                .await
                .context(&memo, "Unable to delete VPC")?;
            memo.vpc_id = None;
            record(client, &memo).await?;
        }

        match &spec {
            Some(spec) => {
                ConfigGenerator::new(&spec.configuration)
                    .cleanup()
                    .await
                    .context(&memo, "Unable to remove generated machine configurations")?;
                memo.config_files_generated = false;
            }
            None if memo.config_files_generated => warn!(
                "The deployment configuration is not recorded so '{}', '{}' and '{}' were not \
                 removed from the working directory. They contain cluster secrets.",
                CONTROLPLANE_CONFIG_FILE,
                WORKER_CONFIG_FILE,
                TALOSCONFIG_FILE
            ),
            None => {}
        }
        memo.completed_steps.clear();
        memo.current_status = "Deployment destroyed".into();
        record(client, &memo).await?;
        info!("Done: deployment destroyed");
        Ok(())
    }
}
