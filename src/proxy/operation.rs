use std::fmt;
use std::str::FromStr;

/// Operations the proxy is allowed to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTables,
    CreateTable,
    DeleteTable,
    DescribeTable,
    DescribeTimeToLive,
    UpdateTimeToLive,
    UpdateTable,
    Scan,
    Query,
    DeleteItem,
    PutItem,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::ListTables,
        Operation::CreateTable,
        Operation::DeleteTable,
        Operation::DescribeTable,
        Operation::DescribeTimeToLive,
        Operation::UpdateTimeToLive,
        Operation::UpdateTable,
        Operation::Scan,
        Operation::Query,
        Operation::DeleteItem,
        Operation::PutItem,
    ];

    /// Wire name as sent by the console in `method`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListTables => "listTables",
            Operation::CreateTable => "createTable",
            Operation::DeleteTable => "deleteTable",
            Operation::DescribeTable => "describeTable",
            Operation::DescribeTimeToLive => "describeTimeToLive",
            Operation::UpdateTimeToLive => "updateTimeToLive",
            Operation::UpdateTable => "updateTable",
            Operation::Scan => "scan",
            Operation::Query => "query",
            Operation::DeleteItem => "deleteItem",
            Operation::PutItem => "putItem",
        }
    }

    /// Operations that demo mode refuses on protected tables.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Operation::DeleteTable
                | Operation::UpdateTable
                | Operation::PutItem
                | Operation::DeleteItem
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}
