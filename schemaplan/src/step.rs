//! Step vocabulary shared by every planning stage.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{Field, Model};

/// Kind of structural change.
///
/// Variants are declared in plan precedence order; the derived `Ord` is what
/// the diff engine sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    AddEnum,
    AddEnumValue,
    AddModel,
    AddField,
    AlterField,
    SetNullable,
    SetNotNull,
    DropIndex,
    AddIndex,
    DropField,
    DropModel,
    DropEnumValue,
    DropEnum,
    CreateViewShim,
    Backfill,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::AddEnum => "ADD_ENUM",
            StepKind::AddEnumValue => "ADD_ENUM_VALUE",
            StepKind::AddModel => "ADD_MODEL",
            StepKind::AddField => "ADD_FIELD",
            StepKind::AlterField => "ALTER_FIELD",
            StepKind::SetNullable => "SET_NULLABLE",
            StepKind::SetNotNull => "SET_NOT_NULL",
            StepKind::DropIndex => "DROP_INDEX",
            StepKind::AddIndex => "ADD_INDEX",
            StepKind::DropField => "DROP_FIELD",
            StepKind::DropModel => "DROP_MODEL",
            StepKind::DropEnumValue => "DROP_ENUM_VALUE",
            StepKind::DropEnum => "DROP_ENUM",
            StepKind::CreateViewShim => "CREATE_VIEW_SHIM",
            StepKind::Backfill => "BACKFILL",
        }
    }

    /// The kind that undoes this one, for additive/subtractive pairs.
    pub fn inverse(&self) -> Option<StepKind> {
        match self {
            StepKind::AddEnum => Some(StepKind::DropEnum),
            StepKind::DropEnum => Some(StepKind::AddEnum),
            StepKind::AddEnumValue => Some(StepKind::DropEnumValue),
            StepKind::DropEnumValue => Some(StepKind::AddEnumValue),
            StepKind::AddModel => Some(StepKind::DropModel),
            StepKind::DropModel => Some(StepKind::AddModel),
            StepKind::AddField => Some(StepKind::DropField),
            StepKind::DropField => Some(StepKind::AddField),
            StepKind::AddIndex => Some(StepKind::DropIndex),
            StepKind::DropIndex => Some(StepKind::AddIndex),
            StepKind::SetNullable => Some(StepKind::SetNotNull),
            StepKind::SetNotNull => Some(StepKind::SetNullable),
            StepKind::AlterField | StepKind::CreateViewShim | StepKind::Backfill => None,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(
            self,
            StepKind::DropModel
                | StepKind::DropField
                | StepKind::DropIndex
                | StepKind::DropEnum
                | StepKind::DropEnumValue
        )
    }

    /// Steps injected by the planner rather than derived from the diff.
    pub fn is_mitigation(&self) -> bool {
        matches!(self, StepKind::CreateViewShim | StepKind::Backfill)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Five-point severity scale, totally ordered from `None` to `Destructive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Destructive,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::None,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Destructive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "NONE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Destructive => "DESTRUCTIVE",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Before/after pair for a changed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition<T> {
    pub from: T,
    pub to: T,
}

/// Kind-specific structured data attached to a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepPayload {
    /// `CREATE_VIEW_SHIM`: the legacy field the view keeps readable
    #[serde(rename_all = "camelCase")]
    ViewShim { expose_field: String },

    /// `ADD_INDEX` / `DROP_INDEX`: the index definition
    Index { fields: Vec<String>, unique: bool },

    /// `ADD_FIELD`: the full field definition
    Field(Field),

    /// `ADD_MODEL`: the new model with its fields and indexes
    Model(Model),

    /// `ADD_ENUM`: the new enum's values, in declared order
    Enum { values: Vec<String> },

    // Every member is optional, so this must stay the last variant.

    /// `ALTER_FIELD`: the attributes that changed
    #[serde(rename_all = "camelCase")]
    AlterField {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        has_default: Option<Transition<bool>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_unique: Option<Transition<bool>>,
    },
}

/// One atomic structural change between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,

    /// Assigned by the risk classifier; unset straight out of the diff
    pub risk: Option<RiskLevel>,

    /// Dotted identity path (e.g., "User.email")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StepPayload>,
}

impl Step {
    pub fn new(kind: StepKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            risk: None,
            target: Some(target.into()),
            notes: None,
            payload: None,
        }
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_payload(mut self, payload: StepPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Identity segments of the target (`"User.email"` -> `["User", "email"]`).
    pub fn target_segments(&self) -> Vec<&str> {
        self.target
            .as_deref()
            .map(|t| t.split('.').collect())
            .unwrap_or_default()
    }

    /// Owning model or enum of the target.
    pub fn target_owner(&self) -> Option<&str> {
        self.target.as_deref().and_then(|t| t.split('.').next())
    }

    /// Member part of a dotted target (`"User.email"` -> `"email"`).
    pub fn target_member(&self) -> Option<&str> {
        self.target
            .as_deref()
            .and_then(|t| t.split_once('.'))
            .map(|(_, member)| member)
    }

    /// Total order used to make plans deterministic: precedence, then target.
    pub fn plan_order(&self, other: &Step) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.target_segments().cmp(&other.target_segments()))
    }
}
