//! Closed set of RPC operations.
//!
//! | Group | Operations |
//! |-------|------------|
//! | Robot view | containers, nodes, parameters, interfaces, connections |
//! | Client link | robot registration and robot-originated messages |
//! | Console view | machine, container, robot and user administration |

use std::fmt;
use std::str::FromStr;

/// Operation group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationGroup {
    /// Operations a robot client issues against its own session.
    Robot,
    /// Operations of the client connection layer.
    Client,
    /// Administrative queries and user management.
    Console,
}

/// Every RPC method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    // Robot view
    CreateContainer,
    DestroyContainer,
    AddNode,
    RemoveNode,
    AddParameter,
    RemoveParameter,
    AddInterface,
    RemoveInterface,
    AddConnection,
    RemoveConnection,

    // Client link
    RegisterRobot,
    UnregisterRobot,
    RobotMessage,

    // Console view
    ListMachines,
    ListContainers,
    ListContainersByUser,
    ListRobots,
    ListRobotsByUser,
    ListUsers,
    AddUser,
    RemoveUser,
    UpdateUser,
}

impl Operation {
    /// All operations, in declaration order.
    pub const ALL: [Operation; 22] = [
        Operation::CreateContainer,
        Operation::DestroyContainer,
        Operation::AddNode,
        Operation::RemoveNode,
        Operation::AddParameter,
        Operation::RemoveParameter,
        Operation::AddInterface,
        Operation::RemoveInterface,
        Operation::AddConnection,
        Operation::RemoveConnection,
        Operation::RegisterRobot,
        Operation::UnregisterRobot,
        Operation::RobotMessage,
        Operation::ListMachines,
        Operation::ListContainers,
        Operation::ListContainersByUser,
        Operation::ListRobots,
        Operation::ListRobotsByUser,
        Operation::ListUsers,
        Operation::AddUser,
        Operation::RemoveUser,
        Operation::UpdateUser,
    ];

    /// Wire method name.
    pub const fn method_name(&self) -> &'static str {
        match self {
            Self::CreateContainer => "createContainer",
            Self::DestroyContainer => "destroyContainer",
            Self::AddNode => "addNode",
            Self::RemoveNode => "removeNode",
            Self::AddParameter => "addParameter",
            Self::RemoveParameter => "removeParameter",
            Self::AddInterface => "addInterface",
            Self::RemoveInterface => "removeInterface",
            Self::AddConnection => "addConnection",
            Self::RemoveConnection => "removeConnection",
            Self::RegisterRobot => "registerRobot",
            Self::UnregisterRobot => "unregisterRobot",
            Self::RobotMessage => "robotMessage",
            Self::ListMachines => "listMachines",
            Self::ListContainers => "listContainers",
            Self::ListContainersByUser => "listContainersByUser",
            Self::ListRobots => "listRobots",
            Self::ListRobotsByUser => "listRobotsByUser",
            Self::ListUsers => "listUsers",
            Self::AddUser => "addUser",
            Self::RemoveUser => "removeUser",
            Self::UpdateUser => "updateUser",
        }
    }

    /// Group the operation belongs to.
    pub const fn group(&self) -> OperationGroup {
        match self {
            Self::RegisterRobot | Self::UnregisterRobot | Self::RobotMessage => {
                OperationGroup::Client
            }
            Self::ListMachines
            | Self::ListContainers
            | Self::ListContainersByUser
            | Self::ListRobots
            | Self::ListRobotsByUser
            | Self::ListUsers
            | Self::AddUser
            | Self::RemoveUser
            | Self::UpdateUser => OperationGroup::Console,
            _ => OperationGroup::Robot,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Unknown method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|op| op.method_name() == s)
            .copied()
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}
