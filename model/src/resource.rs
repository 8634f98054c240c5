use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// The two things a resource agent can be asked to do.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum ResourceAction {
    Create,
    Destroy,
}

derive_fromstr_from_deserialize!(ResourceAction, |e| -> crate::Error {
    crate::error::OpaqueError::SerdePlain { source: e }.into()
});
derive_display_from_serialize!(ResourceAction);

/// What the agent should do with the resources that a failed creation left behind.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum DestructionPolicy {
    /// Leave the resources in place. They are recorded in the state file and can be destroyed
    /// later.
    Never,
    /// Run `destroy` right away when creation fails and the error says resources remain (or that
    /// it is unknown whether they remain).
    OnFailure,
}

impl Default for DestructionPolicy {
    fn default() -> Self {
        Self::Never
    }
}

derive_display_from_serialize!(DestructionPolicy);
derive_fromstr_from_deserialize!(DestructionPolicy);

/// The lifecycle state recorded in the deployment state file.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum AgentStatus {
    Creating,
    Created,
    CreateFailed,
    Destroying,
    Destroyed,
    DestroyFailed,
}

derive_display_from_serialize!(AgentStatus);
derive_fromstr_from_deserialize!(AgentStatus);

#[test]
fn resource_action_from_str() {
    use std::str::FromStr;
    assert_eq!(
        ResourceAction::from_str("destroy").unwrap(),
        ResourceAction::Destroy
    );
    assert!(ResourceAction::from_str("apply").is_err());
    assert_eq!(DestructionPolicy::OnFailure.to_string(), "onFailure");
    assert_eq!(AgentStatus::CreateFailed.to_string(), "createFailed");
}
