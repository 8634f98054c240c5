use cluster_model::ImageDetails;
use std::sync::{Arc, Mutex};
use talos_agents::security::Peer;
use talos_agents::{
    Cloud, Error, InstanceAddresses, Ipv4Cidr, LaunchRequest, ResourceTags, Result,
    SecurityGroups, SecurityRule, SubnetPlan,
};

pub(crate) const NLB_DNS_NAME: &str = "talos-nlb-0123456789.elb.us-east-1.amazonaws.com";

#[derive(Default)]
struct State {
    /// Every call, in order, as `operation argument`.
    events: Vec<String>,
    fail_on: Option<&'static str>,
    next_id: usize,
    launches: Vec<LaunchRequest>,
    live_instances: Vec<String>,
}

/// A [`Cloud`] that hands out fake ids and records every call.
#[derive(Clone)]
pub(crate) struct MockCloud {
    zones: Vec<String>,
    state: Arc<Mutex<State>>,
}

impl MockCloud {
    pub(crate) fn new(zones: &[&str]) -> Self {
        Self {
            zones: zones.iter().map(|zone| zone.to_string()).collect(),
            state: Arc::default(),
        }
    }

    /// Make every call of `operation` fail from now on.
    pub(crate) fn fail_on(&self, operation: &'static str) {
        self.state.lock().unwrap().fail_on = Some(operation);
    }

    pub(crate) fn clear_failure(&self) {
        self.state.lock().unwrap().fail_on = None;
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub(crate) fn launches(&self) -> Vec<LaunchRequest> {
        self.state.lock().unwrap().launches.clone()
    }

    /// The index of the first event of `operation`.
    pub(crate) fn first(&self, operation: &str) -> Option<usize> {
        self.events().iter().position(|event| is_operation(event, operation))
    }

    /// The index of the last event of `operation`.
    pub(crate) fn last(&self, operation: &str) -> Option<usize> {
        self.events().iter().rposition(|event| is_operation(event, operation))
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| is_operation(event, operation))
            .count()
    }

    /// Whether any resource was ever created.
    pub(crate) fn created_anything(&self) -> bool {
        self.events()
            .iter()
            .any(|event| event.starts_with("create_") || event.starts_with("run_instance"))
    }

    fn call(&self, operation: &'static str, argument: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(format!("{} {}", operation, argument));
        if state.fail_on == Some(operation) {
            return Err(Error::Aws {
                what: operation.to_string(),
                message: "injected failure".to_string(),
                source: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn id(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        format!("{}-{:04}", prefix, state.next_id)
    }
}

fn is_operation(event: &str, operation: &str) -> bool {
    event.split(' ').next() == Some(operation)
}

#[async_trait::async_trait]
impl Cloud for MockCloud {
    fn region(&self) -> &str {
        "us-east-1"
    }

    async fn availability_zones(&self) -> Result<Vec<String>> {
        self.call("availability_zones", "")?;
        Ok(self.zones.clone())
    }

    async fn describe_image(&self, image_id: &str) -> Result<ImageDetails> {
        self.call("describe_image", image_id)?;
        Ok(ImageDetails {
            image_id: image_id.to_string(),
            owner_id: "540036508848".to_string(),
            arn: format!("arn:aws:ec2:us-east-1::image/{}", image_id),
        })
    }

    async fn create_vpc(&self, cidr: &Ipv4Cidr, _tags: &ResourceTags) -> Result<String> {
        self.call("create_vpc", &cidr.to_string())?;
        Ok(self.id("vpc"))
    }

    async fn create_internet_gateway(&self, vpc_id: &str, _tags: &ResourceTags) -> Result<String> {
        self.call("create_internet_gateway", vpc_id)?;
        Ok(self.id("igw"))
    }

    async fn route_to_gateway(&self, _vpc_id: &str, gateway_id: &str) -> Result<()> {
        self.call("route_to_gateway", gateway_id)
    }

    async fn create_subnet(
        &self,
        _vpc_id: &str,
        plan: &SubnetPlan,
        _tags: &ResourceTags,
    ) -> Result<String> {
        self.call("create_subnet", &format!("{}@{}", plan.cidr, plan.zone))?;
        Ok(self.id("subnet"))
    }

    async fn create_security_group(
        &self,
        _vpc_id: &str,
        _description: &str,
        tags: &ResourceTags,
    ) -> Result<String> {
        self.call("create_security_group", &tags.name)?;
        Ok(self.id("sg"))
    }

    async fn revoke_default_egress(&self, group_id: &str) -> Result<()> {
        self.call("revoke_default_egress", group_id)
    }

    async fn authorize_rule(&self, _groups: &SecurityGroups, rule: &SecurityRule) -> Result<()> {
        let peer = match rule.peer {
            Peer::Cidr(cidr) => cidr.to_string(),
            Peer::Group(group) => format!("{:?}", group),
        };
        self.call("authorize_rule", &format!("{} {}", rule.name, peer))
    }

    async fn create_target_group(
        &self,
        name: &str,
        _vpc_id: &str,
        port: u16,
        _tags: &ResourceTags,
    ) -> Result<String> {
        self.call("create_target_group", &format!("{}:{}", name, port))?;
        Ok(format!("arn:aws:elasticloadbalancing:targetgroup/{}", name))
    }

    async fn create_load_balancer(
        &self,
        name: &str,
        subnet_ids: &[String],
        _security_group_id: &str,
        _tags: &ResourceTags,
    ) -> Result<(String, String)> {
        self.call("create_load_balancer", &subnet_ids.join(","))?;
        Ok((
            format!("arn:aws:elasticloadbalancing:loadbalancer/net/{}", name),
            NLB_DNS_NAME.to_string(),
        ))
    }

    async fn create_listener(
        &self,
        _load_balancer_arn: &str,
        _target_group_arn: &str,
        port: u16,
    ) -> Result<String> {
        self.call("create_listener", &port.to_string())?;
        Ok(self.id("listener"))
    }

    async fn run_instance(&self, request: &LaunchRequest) -> Result<String> {
        self.call("run_instance", &request.tags.name)?;
        let instance_id = self.id("i");
        let mut state = self.state.lock().unwrap();
        state.launches.push(request.clone());
        state.live_instances.push(instance_id.clone());
        Ok(instance_id)
    }

    async fn wait_for_running(&self, instance_ids: &[String]) -> Result<Vec<InstanceAddresses>> {
        self.call("wait_for_running", &instance_ids.join(","))?;
        Ok(instance_ids
            .iter()
            .enumerate()
            .map(|(index, instance_id)| InstanceAddresses {
                instance_id: instance_id.clone(),
                public_ip: Some(format!("54.0.0.{}", index + 10)),
                private_ip: Some(format!("10.230.0.{}", index + 10)),
            })
            .collect())
    }

    async fn register_target(
        &self,
        _target_group_arn: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<()> {
        self.call("register_target", &format!("{}:{}", instance_id, port))
    }

    async fn instances_by_tag(&self, key: &str, value: &str) -> Result<Vec<String>> {
        self.call("instances_by_tag", &format!("{}={}", key, value))?;
        Ok(self.state.lock().unwrap().live_instances.clone())
    }

    async fn terminate_instances(&self, instance_ids: &[String]) -> Result<()> {
        self.call("terminate_instances", &instance_ids.join(","))?;
        self.state
            .lock()
            .unwrap()
            .live_instances
            .retain(|id| !instance_ids.contains(id));
        Ok(())
    }

    async fn wait_for_terminated(&self, instance_ids: &[String]) -> Result<()> {
        self.call("wait_for_terminated", &instance_ids.join(","))
    }

    async fn delete_load_balancer(&self, arn: &str) -> Result<()> {
        self.call("delete_load_balancer", arn)
    }

    async fn delete_target_group(&self, arn: &str) -> Result<()> {
        self.call("delete_target_group", arn)
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<()> {
        self.call("delete_security_group", group_id)
    }

    async fn delete_subnet(&self, subnet_id: &str) -> Result<()> {
        self.call("delete_subnet", subnet_id)
    }

    async fn delete_internet_gateway(&self, gateway_id: &str, _vpc_id: &str) -> Result<()> {
        self.call("delete_internet_gateway", gateway_id)
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.call("delete_vpc", vpc_id)
    }
}
