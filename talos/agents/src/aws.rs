use crate::cloud::{Cloud, InstanceAddresses, LaunchRequest, ResourceTags};
use crate::error::{self, aws_error, error_code, Result};
use crate::network::{Ipv4Cidr, SubnetPlan};
use crate::security::{Direction, Peer, SecurityGroups, SecurityRule};
use aws_sdk_ec2::model::{
    AttributeBooleanValue, Filter, InstanceNetworkInterfaceSpecification, InstanceStateName,
    InstanceType, IpPermission, IpRange, ResourceType, Tag, TagSpecification, UserIdGroupPair,
};
use aws_sdk_ec2::types::SdkError;
use aws_sdk_elasticloadbalancingv2::model::{
    Action, ActionTypeEnum, LoadBalancerSchemeEnum, LoadBalancerTypeEnum, ProtocolEnum,
    TargetDescription, TargetTypeEnum,
};
use aws_smithy_types::retry::ProvideErrorKind;
use aws_types::SdkConfig;
use cluster_model::ImageDetails;
use log::{debug, info, trace, warn};
use snafu::OptionExt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

const RUNNING_TIMEOUT: Duration = Duration::from_secs(300);
const TERMINATED_TIMEOUT: Duration = Duration::from_secs(600);
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a deletion keeps retrying while the resource still has dependents.
const DELETE_RETRY_WINDOW: Duration = Duration::from_secs(300);
const DELETE_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Error codes meaning another resource still depends on the one being deleted.
const DEPENDENCY_CODES: &[&str] = &["DependencyViolation", "ResourceInUse"];

/// The instance states of instances that still exist.
const LIVE_STATES: &[&str] = &["pending", "running", "shutting-down", "stopping", "stopped"];

/// [`Cloud`] backed by the EC2 and Elastic Load Balancing APIs.
#[derive(Clone, Debug)]
pub struct AwsCloud {
    region: String,
    ec2: aws_sdk_ec2::Client,
    elb: aws_sdk_elasticloadbalancingv2::Client,
}

impl AwsCloud {
    pub fn new(config: &SdkConfig) -> Result<Self> {
        let region = config
            .region()
            .map(|region| region.to_string())
            .context(error::MissingSnafu {
                what: "region",
                from: "AWS configuration",
            })?;
        Ok(Self {
            region,
            ec2: aws_sdk_ec2::Client::new(config),
            elb: aws_sdk_elasticloadbalancingv2::Client::new(config),
        })
    }

    async fn enable_vpc_dns(&self, vpc_id: &str) -> Result<()> {
        // EC2 accepts a single attribute per call.
        self.ec2
            .modify_vpc_attribute()
            .vpc_id(vpc_id)
            .enable_dns_support(enabled())
            .send()
            .await
            .map_err(|e| aws_error("modify VPC DNS support", e))?;
        self.ec2
            .modify_vpc_attribute()
            .vpc_id(vpc_id)
            .enable_dns_hostnames(enabled())
            .send()
            .await
            .map_err(|e| aws_error("modify VPC DNS hostnames", e))?;
        Ok(())
    }

    /// The addresses of every instance if all of them are running, `None` otherwise.
    async fn running_addresses(
        &self,
        instance_ids: &[String],
    ) -> Result<Option<Vec<InstanceAddresses>>> {
        let output = self
            .ec2
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
            .map_err(|e| aws_error("describe instances", e))?;
        let mut addresses = Vec::new();
        for instance in output
            .reservations()
            .unwrap_or_default()
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
        {
            let instance_id = instance.instance_id().unwrap_or_default().to_string();
            let state = instance
                .state()
                .and_then(|state| state.name())
                .cloned()
                .unwrap_or_else(|| InstanceStateName::from("unknown"));
            match state {
                InstanceStateName::Running => addresses.push(InstanceAddresses {
                    instance_id,
                    public_ip: instance.public_ip_address().map(str::to_string),
                    private_ip: instance.private_ip_address().map(str::to_string),
                }),
                InstanceStateName::Pending => {
                    trace!("Instance '{}' is still pending", instance_id);
                    return Ok(None);
                }
                other => {
                    return error::InstanceFailedSnafu {
                        instance_id,
                        state: other.as_str(),
                    }
                    .fail()
                }
            }
        }
        if addresses.len() < instance_ids.len() {
            // Newly launched instances can take a moment to become visible.
            return Ok(None);
        }
        Ok(Some(addresses))
    }

    async fn all_terminated(&self, instance_ids: &[String]) -> Result<bool> {
        let output = match self
            .ec2
            .describe_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if is_gone(error_code(&e)) => return Ok(true),
            Err(e) => return Err(aws_error("describe instances", e)),
        };
        Ok(output
            .reservations()
            .unwrap_or_default()
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
            .all(|instance| {
                matches!(
                    instance.state().and_then(|state| state.name()),
                    Some(InstanceStateName::Terminated)
                )
            }))
    }
}

#[async_trait::async_trait]
impl Cloud for AwsCloud {
    fn region(&self) -> &str {
        &self.region
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        let output = self
            .ec2
            .describe_availability_zones()
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(|e| aws_error("describe availability zones", e))?;
        Ok(output
            .availability_zones()
            .unwrap_or_default()
            .iter()
            .filter_map(|zone| zone.zone_name())
            .map(str::to_string)
            .collect())
    }

    async fn describe_image(&self, image_id: &str) -> Result<ImageDetails> {
        let output = self
            .ec2
            .describe_images()
            .image_ids(image_id)
            .send()
            .await
            .map_err(|e| aws_error("describe image", e))?;
        let image = output
            .images()
            .and_then(|images| images.first())
            .context(error::MissingSnafu {
                what: format!("image '{}'", image_id),
                from: "describe images",
            })?;
        Ok(ImageDetails {
            image_id: image_id.to_string(),
            owner_id: image.owner_id().unwrap_or_default().to_string(),
            arn: format!("arn:aws:ec2:{}::image/{}", self.region, image_id),
        })
    }

    async fn create_vpc(&self, cidr: &Ipv4Cidr, tags: &ResourceTags) -> Result<String> {
        let output = self
            .ec2
            .create_vpc()
            .cidr_block(cidr.to_string())
            .tag_specifications(tag_specification(ResourceType::Vpc, tags))
            .send()
            .await
            .map_err(|e| aws_error("create VPC", e))?;
        let vpc_id = output
            .vpc()
            .and_then(|vpc| vpc.vpc_id())
            .context(error::MissingSnafu {
                what: "vpc id",
                from: "create VPC",
            })?
            .to_string();
        self.enable_vpc_dns(&vpc_id).await?;
        info!("Created VPC '{}' ({})", vpc_id, cidr);
        Ok(vpc_id)
    }

    async fn create_internet_gateway(&self, vpc_id: &str, tags: &ResourceTags) -> Result<String> {
        let output = self
            .ec2
            .create_internet_gateway()
            .tag_specifications(tag_specification(ResourceType::InternetGateway, tags))
            .send()
            .await
            .map_err(|e| aws_error("create internet gateway", e))?;
        let gateway_id = output
            .internet_gateway()
            .and_then(|gateway| gateway.internet_gateway_id())
            .context(error::MissingSnafu {
                what: "internet gateway id",
                from: "create internet gateway",
            })?
            .to_string();
        self.ec2
            .attach_internet_gateway()
            .internet_gateway_id(&gateway_id)
            .vpc_id(vpc_id)
            .send()
            .await
            .map_err(|e| aws_error("attach internet gateway", e))?;
        info!("Attached internet gateway '{}' to '{}'", gateway_id, vpc_id);
        Ok(gateway_id)
    }

    async fn route_to_gateway(&self, vpc_id: &str, gateway_id: &str) -> Result<()> {
        let output = self
            .ec2
            .describe_route_tables()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(
                Filter::builder()
                    .name("association.main")
                    .values("true")
                    .build(),
            )
            .send()
            .await
            .map_err(|e| aws_error("describe route tables", e))?;
        let route_table_id = output
            .route_tables()
            .and_then(|tables| tables.first())
            .and_then(|table| table.route_table_id())
            .context(error::MissingSnafu {
                what: format!("main route table of '{}'", vpc_id),
                from: "describe route tables",
            })?;
        self.ec2
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(Ipv4Cidr::ANYWHERE.to_string())
            .gateway_id(gateway_id)
            .send()
            .await
            .map_err(|e| aws_error("create default route", e))?;
        debug!("Routed '{}' through '{}'", route_table_id, gateway_id);
        Ok(())
    }

    async fn create_subnet(
        &self,
        vpc_id: &str,
        plan: &SubnetPlan,
        tags: &ResourceTags,
    ) -> Result<String> {
        let output = self
            .ec2
            .create_subnet()
            .vpc_id(vpc_id)
            .cidr_block(plan.cidr.to_string())
            .availability_zone(&plan.zone)
            .tag_specifications(tag_specification(ResourceType::Subnet, tags))
            .send()
            .await
            .map_err(|e| aws_error("create subnet", e))?;
        let subnet_id = output
            .subnet()
            .and_then(|subnet| subnet.subnet_id())
            .context(error::MissingSnafu {
                what: "subnet id",
                from: "create subnet",
            })?
            .to_string();
        self.ec2
            .modify_subnet_attribute()
            .subnet_id(&subnet_id)
            .map_public_ip_on_launch(enabled())
            .send()
            .await
            .map_err(|e| aws_error("enable public addresses on subnet", e))?;
        info!("Created subnet '{}' ({} in {})", subnet_id, plan.cidr, plan.zone);
        Ok(subnet_id)
    }

    async fn create_security_group(
        &self,
        vpc_id: &str,
        description: &str,
        tags: &ResourceTags,
    ) -> Result<String> {
        let output = self
            .ec2
            .create_security_group()
            .group_name(&tags.name)
            .description(description)
            .vpc_id(vpc_id)
            .tag_specifications(tag_specification(ResourceType::SecurityGroup, tags))
            .send()
            .await
            .map_err(|e| aws_error("create security group", e))?;
        let group_id = output
            .group_id()
            .context(error::MissingSnafu {
                what: "group id",
                from: "create security group",
            })?
            .to_string();
        info!("Created security group '{}' ({})", group_id, tags.name);
        Ok(group_id)
    }

    async fn revoke_default_egress(&self, group_id: &str) -> Result<()> {
        let result = self
            .ec2
            .revoke_security_group_egress()
            .group_id(group_id)
            .ip_permissions(
                IpPermission::builder()
                    .ip_protocol("-1")
                    .ip_ranges(
                        IpRange::builder()
                            .cidr_ip(Ipv4Cidr::ANYWHERE.to_string())
                            .build(),
                    )
                    .build(),
            )
            .send()
            .await;
        match result {
            Ok(_) => {
                debug!("Revoked the default egress rule of '{}'", group_id);
                Ok(())
            }
            Err(e) if is_gone(error_code(&e)) => {
                debug!("'{}' has no default egress rule", group_id);
                Ok(())
            }
            Err(e) => Err(aws_error("revoke default egress", e)),
        }
    }

    async fn authorize_rule(&self, groups: &SecurityGroups, rule: &SecurityRule) -> Result<()> {
        let group_id = groups.id(rule.group);
        let mut permission = IpPermission::builder().ip_protocol(rule.protocol.ip_protocol());
        if let Some(port) = rule.protocol.port() {
            permission = permission.from_port(i32::from(port)).to_port(i32::from(port));
        }
        permission = match rule.peer {
            Peer::Cidr(cidr) => permission.ip_ranges(
                IpRange::builder()
                    .cidr_ip(cidr.to_string())
                    .description(rule.name)
                    .build(),
            ),
            Peer::Group(peer) => permission.user_id_group_pairs(
                UserIdGroupPair::builder()
                    .group_id(groups.id(peer))
                    .description(rule.name)
                    .build(),
            ),
        };
        let result = match rule.direction {
            Direction::Ingress => self
                .ec2
                .authorize_security_group_ingress()
                .group_id(group_id)
                .ip_permissions(permission.build())
                .send()
                .await
                .map(|_| ())
                .map_err(|e| (error_code(&e).map(str::to_string), aws_error("authorize ingress", e))),
            Direction::Egress => self
                .ec2
                .authorize_security_group_egress()
                .group_id(group_id)
                .ip_permissions(permission.build())
                .send()
                .await
                .map(|_| ())
                .map_err(|e| (error_code(&e).map(str::to_string), aws_error("authorize egress", e))),
        };
        match result {
            Ok(()) => {
                debug!("Authorized '{}' on '{}'", rule.name, group_id);
                Ok(())
            }
            Err((Some(code), _)) if code == "InvalidPermission.Duplicate" => {
                debug!("Rule '{}' already exists on '{}'", rule.name, group_id);
                Ok(())
            }
            Err((_, e)) => Err(e),
        }
    }

    async fn create_target_group(
        &self,
        name: &str,
        vpc_id: &str,
        port: u16,
        tags: &ResourceTags,
    ) -> Result<String> {
        let output = self
            .elb
            .create_target_group()
            .name(name)
            .protocol(ProtocolEnum::Tcp)
            .port(i32::from(port))
            .vpc_id(vpc_id)
            .target_type(TargetTypeEnum::Instance)
            .health_check_protocol(ProtocolEnum::Tcp)
            .set_tags(Some(elb_tags(tags)))
            .send()
            .await
            .map_err(|e| aws_error("create target group", e))?;
        let arn = output
            .target_groups()
            .and_then(|groups| groups.first())
            .and_then(|group| group.target_group_arn())
            .context(error::MissingSnafu {
                what: "target group arn",
                from: "create target group",
            })?
            .to_string();
        info!("Created target group '{}'", arn);
        Ok(arn)
    }

    async fn create_load_balancer(
        &self,
        name: &str,
        subnet_ids: &[String],
        security_group_id: &str,
        tags: &ResourceTags,
    ) -> Result<(String, String)> {
        let output = self
            .elb
            .create_load_balancer()
            .name(name)
            .r#type(LoadBalancerTypeEnum::Network)
            .scheme(LoadBalancerSchemeEnum::InternetFacing)
            .set_subnets(Some(subnet_ids.to_vec()))
            .security_groups(security_group_id)
            .set_tags(Some(elb_tags(tags)))
            .send()
            .await
            .map_err(|e| aws_error("create load balancer", e))?;
        let load_balancer = output
            .load_balancers()
            .and_then(|balancers| balancers.first())
            .context(error::MissingSnafu {
                what: "load balancer",
                from: "create load balancer",
            })?;
        let arn = load_balancer
            .load_balancer_arn()
            .context(error::MissingSnafu {
                what: "load balancer arn",
                from: "create load balancer",
            })?
            .to_string();
        let dns_name = load_balancer
            .dns_name()
            .context(error::MissingSnafu {
                what: "load balancer DNS name",
                from: "create load balancer",
            })?
            .to_string();
        info!("Created load balancer '{}' at '{}'", arn, dns_name);
        Ok((arn, dns_name))
    }

    async fn create_listener(
        &self,
        load_balancer_arn: &str,
        target_group_arn: &str,
        port: u16,
    ) -> Result<String> {
        let output = self
            .elb
            .create_listener()
            .load_balancer_arn(load_balancer_arn)
            .protocol(ProtocolEnum::Tcp)
            .port(i32::from(port))
            .default_actions(
                Action::builder()
                    .r#type(ActionTypeEnum::Forward)
                    .target_group_arn(target_group_arn)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| aws_error("create listener", e))?;
        let arn = output
            .listeners()
            .and_then(|listeners| listeners.first())
            .and_then(|listener| listener.listener_arn())
            .context(error::MissingSnafu {
                what: "listener arn",
                from: "create listener",
            })?
            .to_string();
        debug!("Created listener '{}'", arn);
        Ok(arn)
    }

    async fn run_instance(&self, request: &LaunchRequest) -> Result<String> {
        let output = self
            .ec2
            .run_instances()
            .image_id(&request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .network_interfaces(
                InstanceNetworkInterfaceSpecification::builder()
                    .device_index(0)
                    .associate_public_ip_address(true)
                    .subnet_id(&request.subnet_id)
                    .groups(&request.security_group_id)
                    .build(),
            )
            .user_data(base64::encode(&request.user_data))
            .tag_specifications(tag_specification(ResourceType::Instance, &request.tags))
            .send()
            .await
            .map_err(|e| aws_error("run instance", e))?;
        let instance_id = output
            .instances()
            .and_then(|instances| instances.first())
            .and_then(|instance| instance.instance_id())
            .context(error::MissingSnafu {
                what: "instance id",
                from: "run instances",
            })?
            .to_string();
        info!("Launched '{}' as '{}'", request.tags.name, instance_id);
        Ok(instance_id)
    }

    async fn wait_for_running(&self, instance_ids: &[String]) -> Result<Vec<InstanceAddresses>> {
        if instance_ids.is_empty() {
            return Ok(Vec::new());
        }
        info!("Waiting for {} instance(s) to run", instance_ids.len());
        tokio::time::timeout(RUNNING_TIMEOUT, async {
            loop {
                match self.running_addresses(instance_ids).await {
                    Ok(Some(addresses)) => return Ok(addresses),
                    Ok(None) => {}
                    Err(e @ error::Error::InstanceFailed { .. }) => return Err(e),
                    Err(e) => warn!("Error checking instance states, retrying: {}", e),
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| {
            error::TimeoutSnafu {
                what: "instances to run",
                seconds: RUNNING_TIMEOUT.as_secs(),
            }
            .build()
        })?
    }

    async fn register_target(
        &self,
        target_group_arn: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<()> {
        self.elb
            .register_targets()
            .target_group_arn(target_group_arn)
            .targets(
                TargetDescription::builder()
                    .id(instance_id)
                    .port(i32::from(port))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| aws_error("register target", e))?;
        info!("Registered '{}' with the load balancer", instance_id);
        Ok(())
    }

    async fn instances_by_tag(&self, key: &str, value: &str) -> Result<Vec<String>> {
        let mut state_filter = Filter::builder().name("instance-state-name");
        for state in LIVE_STATES {
            state_filter = state_filter.values(*state);
        }
        let output = self
            .ec2
            .describe_instances()
            .filters(
                Filter::builder()
                    .name(format!("tag:{}", key))
                    .values(value)
                    .build(),
            )
            .filters(state_filter.build())
            .send()
            .await
            .map_err(|e| aws_error("describe instances", e))?;
        Ok(output
            .reservations()
            .unwrap_or_default()
            .iter()
            .flat_map(|reservation| reservation.instances().unwrap_or_default())
            .filter_map(|instance| instance.instance_id())
            .map(str::to_string)
            .collect())
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        if instance_ids.is_empty() {
            return Ok(());
        }
        match self
            .ec2
            .terminate_instances()
            .set_instance_ids(Some(instance_ids.to_vec()))
            .send()
            .await
        {
            Ok(_) => {
                info!("Terminating {:?}", instance_ids);
                Ok(())
            }
            Err(e) if is_gone(error_code(&e)) => Ok(()),
            Err(e) => Err(aws_error("terminate instances", e)),
        }
    }

    async fn wait_for_terminated(&self, instance_ids: &[String]) -> Result<()> {
        if instance_ids.is_empty() {
            return Ok(());
        }
        tokio::time::timeout(TERMINATED_TIMEOUT, async {
            loop {
                match self.all_terminated(instance_ids).await {
                    Ok(true) => return,
                    Ok(false) => trace!("Some instances are not terminated yet"),
                    Err(e) => warn!("Error checking instance states, retrying: {}", e),
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| {
            error::TimeoutSnafu {
                what: "instances to terminate",
                seconds: TERMINATED_TIMEOUT.as_secs(),
            }
            .build()
        })
    }

    async fn delete_load_balancer(&self, arn: &str) -> Result<()> {
        delete_with_retry("delete load balancer", || {
            self.elb.delete_load_balancer().load_balancer_arn(arn).send()
        })
        .await
    }

    async fn delete_target_group(&self, arn: &str) -> Result<()> {
        delete_with_retry("delete target group", || {
            self.elb.delete_target_group().target_group_arn(arn).send()
        })
        .await
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        delete_with_retry("delete security group", || {
            self.ec2.delete_security_group().group_id(group_id).send()
        })
        .await
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        delete_with_retry("delete subnet", || {
            self.ec2.delete_subnet().subnet_id(subnet_id).send()
        })
        .await
    }

    async fn delete_internet_gateway(&self, gateway_id: &str, vpc_id: &str) -> Result<()> {
        delete_with_retry("detach internet gateway", || {
            self.ec2
                .detach_internet_gateway()
                .internet_gateway_id(gateway_id)
                .vpc_id(vpc_id)
                .send()
        })
        .await?;
        delete_with_retry("delete internet gateway", || {
            self.ec2
                .delete_internet_gateway()
                .internet_gateway_id(gateway_id)
                .send()
        })
        .await
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        delete_with_retry("delete VPC", || self.ec2.delete_vpc().vpc_id(vpc_id).send()).await
    }
}

/// Run a deletion until it succeeds, the resource turns out to be gone, or its dependents have
/// not gone away within [`DELETE_RETRY_WINDOW`].
async fn delete_with_retry<F, Fut, O, E>(what: &str, mut call: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<O, SdkError<E>>>,
    E: ProvideErrorKind + std::error::Error + Send + Sync + 'static,
{
    let deadline = Instant::now() + DELETE_RETRY_WINDOW;
    loop {
        match call().await {
            Ok(_) => return Ok(()),
            Err(e) => {
                let code = error_code(&e);
                if is_gone(code) {
                    debug!("{}: already gone", what);
                    return Ok(());
                }
                if is_dependency(code) && Instant::now() < deadline {
                    warn!("{}: still in use, retrying in {:?}", what, DELETE_RETRY_INTERVAL);
                    tokio::time::sleep(DELETE_RETRY_INTERVAL).await;
                    continue;
                }
                return Err(aws_error(what, e));
            }
        }
    }
}

fn is_gone(code: Option<&str>) -> bool {
    matches!(code, Some(code) if code.contains("NotFound") || code == "Gateway.NotAttached")
}

fn is_dependency(code: Option<&str>) -> bool {
    matches!(code, Some(code) if DEPENDENCY_CODES.contains(&code))
}

fn enabled() -> AttributeBooleanValue {
    AttributeBooleanValue::builder().value(true).build()
}

fn tag_specification(resource_type: ResourceType, tags: &ResourceTags) -> TagSpecification {
    let mut specification = TagSpecification::builder().resource_type(resource_type);
    for (key, value) in tags.pairs() {
        specification = specification.tags(Tag::builder().key(key).value(value).build());
    }
    specification.build()
}

fn elb_tags(tags: &ResourceTags) -> Vec<aws_sdk_elasticloadbalancingv2::model::Tag> {
    tags.pairs()
        .iter()
        .map(|(key, value)| {
            aws_sdk_elasticloadbalancingv2::model::Tag::builder()
                .key(*key)
                .value(*value)
                .build()
        })
        .collect()
}
