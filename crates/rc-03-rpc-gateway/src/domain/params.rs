//! Typed parameters of every operation.
//!
//! Parameters travel as a JSON object with camelCase keys.

use serde::{Deserialize, Serialize};
use shared_types::{InterfaceMessage, ParameterKind};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerParams {
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNodeParams {
    pub container_tag: String,
    pub node_tag: String,
    pub package: String,
    pub executable: String,
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveNodeParams {
    pub container_tag: String,
    pub node_tag: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParameterParams {
    pub container_tag: String,
    pub name: String,
    pub value: serde_json::Value,
    /// Explicit type; inferred from `value` when absent.
    #[serde(default)]
    pub kind: Option<ParameterKind>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveParameterParams {
    pub container_tag: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInterfaceParams {
    pub endpoint_tag: String,
    pub interface_tag: String,
    pub interface_type: String,
    pub message_type: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveInterfaceParams {
    pub endpoint_tag: String,
    pub interface_tag: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParams {
    pub tag_a: String,
    pub tag_b: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotParams {
    pub robot_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRobotParams {
    pub robot_id: String,
    /// Link the robot is attached through; defaults to the master.
    #[serde(default)]
    pub comm_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotMessageParams {
    pub robot_id: String,
    pub message: InterfaceMessage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserParams {
    pub user: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredentialsParams {
    pub user: String,
    pub password: String,
}

/// A container as listed by the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub user: String,
    pub tag: String,
    pub comm_id: String,
    pub running: bool,
    pub connected: bool,
}

/// A robot as listed by the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotInfo {
    pub user: String,
    pub robot_id: String,
    pub interfaces: Vec<String>,
}

/// A machine of the realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineInfo {
    pub address: String,
    pub active_containers: usize,
    pub capacity: usize,
}
