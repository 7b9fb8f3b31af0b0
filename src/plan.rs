use serde::Serialize;
use serde_json::Value;

/// What applying a declared resource would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update,
    /// A force-new attribute changed; the resource must be deleted and recreated.
    Replace,
    NoOp,
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Update => "update in place",
            Self::Replace => "replace",
            Self::NoOp => "no changes",
        };
        f.write_str(label)
    }
}

/// A single attribute difference between prior and declared state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub name: String,
    /// None when the attribute was unset before.
    pub before: Option<Value>,
    /// None when the attribute is being cleared.
    pub after: Option<Value>,
    pub requires_replace: bool,
}

impl AttributeChange {
    pub fn added(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            before: None,
            after: Some(value),
            requires_replace: false,
        }
    }

    pub fn modified(
        name: impl Into<String>,
        before: Option<Value>,
        after: Option<Value>,
        requires_replace: bool,
    ) -> Self {
        Self {
            name: name.into(),
            before,
            after,
            requires_replace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub resource_type: String,
    pub action: PlanAction,
    pub changes: Vec<AttributeChange>,
}

impl Plan {
    pub fn requires_replace(&self) -> bool {
        self.action == PlanAction::Replace
    }

    pub fn is_noop(&self) -> bool {
        self.action == PlanAction::NoOp
    }
}
