use std::cmp::Ordering;
use std::str::FromStr;

use leasegate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Action;

/// Supported operators for attribute conditions on permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Ne,
    /// Greater-than comparison.
    Gt,
    /// Greater-than-or-equal comparison.
    Gte,
    /// Less-than comparison.
    Lt,
    /// Less-than-or-equal comparison.
    Lte,
    /// Attribute equals one of the listed values.
    In,
    /// Attribute equals none of the listed values.
    NotIn,
    /// Case-insensitive substring match, or array membership.
    Contains,
    /// Attribute presence check; the value is the expected presence.
    Exists,
}

impl ConditionOperator {
    /// Returns a stable storage value for this operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::Exists => "exists",
        }
    }
}

impl FromStr for ConditionOperator {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            "contains" => Ok(Self::Contains),
            "exists" => Ok(Self::Exists),
            _ => Err(AppError::Validation(format!(
                "unknown condition operator '{value}'"
            ))),
        }
    }
}

/// One attribute-level predicate narrowing a permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionCondition {
    field: NonEmptyString,
    operator: ConditionOperator,
    value: Value,
}

impl PermissionCondition {
    /// Creates a validated permission condition.
    ///
    /// `field` may be a dot-separated path into nested entity attributes.
    pub fn new(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: Value,
    ) -> AppResult<Self> {
        let field = NonEmptyString::new(field)?;
        if field.as_str().split('.').any(str::is_empty) {
            return Err(AppError::Validation(format!(
                "condition field '{}' contains an empty path segment",
                field.as_str()
            )));
        }

        match operator {
            ConditionOperator::In | ConditionOperator::NotIn if !value.is_array() => {
                return Err(AppError::Validation(format!(
                    "operator '{}' requires an array value",
                    operator.as_str()
                )));
            }
            ConditionOperator::Exists if !value.is_boolean() => {
                return Err(AppError::Validation(
                    "operator 'exists' requires a boolean value".to_owned(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            field,
            operator,
            value,
        })
    }

    /// Returns the condition field path.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns the condition operator.
    #[must_use]
    pub fn operator(&self) -> ConditionOperator {
        self.operator
    }

    /// Returns the comparison value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluates the condition against entity attributes.
    ///
    /// A missing attribute fails every operator except `exists: false`.
    #[must_use]
    pub fn evaluate(&self, entity: &Map<String, Value>) -> bool {
        let selected = value_by_path(entity, self.field.as_str());

        if self.operator == ConditionOperator::Exists {
            let expected_presence = self.value.as_bool().unwrap_or(true);
            return selected.is_some() == expected_presence;
        }

        let Some(actual) = selected else {
            return false;
        };

        match self.operator {
            ConditionOperator::Eq => values_equal(actual, &self.value),
            ConditionOperator::Ne => !values_equal(actual, &self.value),
            ConditionOperator::Gt => compare_values(actual, &self.value).is_some_and(Ordering::is_gt),
            ConditionOperator::Gte => compare_values(actual, &self.value).is_some_and(Ordering::is_ge),
            ConditionOperator::Lt => compare_values(actual, &self.value).is_some_and(Ordering::is_lt),
            ConditionOperator::Lte => compare_values(actual, &self.value).is_some_and(Ordering::is_le),
            ConditionOperator::In => self
                .value
                .as_array()
                .is_some_and(|items| items.iter().any(|item| values_equal(actual, item))),
            ConditionOperator::NotIn => self
                .value
                .as_array()
                .is_some_and(|items| !items.iter().any(|item| values_equal(actual, item))),
            ConditionOperator::Contains => match actual {
                Value::Array(items) => items.iter().any(|item| values_equal(item, &self.value)),
                Value::String(text) => self.value.as_str().is_some_and(|needle| {
                    text.to_lowercase().contains(needle.to_lowercase().as_str())
                }),
                _ => false,
            },
            ConditionOperator::Exists => false,
        }
    }
}

fn value_by_path<'a>(entity: &'a Map<String, Value>, field_path: &str) -> Option<&'a Value> {
    let mut segments = field_path.split('.');
    let mut current = entity.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => {
            compare_values(left, right).is_some_and(Ordering::is_eq)
        }
        _ => left == right,
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(left_number), Some(right_number)) = (numeric_value(left), numeric_value(right)) {
        return compare_numbers(left_number, right_number);
    }

    if let (Some(left_text), Some(right_text)) = (left.as_str(), right.as_str()) {
        return Some(left_text.cmp(right_text));
    }

    None
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Self::Signed(value) => value as f64,
            Self::Unsigned(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

// Integers keep full precision; only a float on either side compares as f64.
fn numeric_value(value: &Value) -> Option<Numeric> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(Numeric::Signed)
            .or_else(|| number.as_u64().map(Numeric::Unsigned))
            .or_else(|| number.as_f64().map(Numeric::Float)),
        Value::String(raw) => {
            let raw = raw.trim();
            raw.parse::<i64>()
                .map(Numeric::Signed)
                .or_else(|_| raw.parse::<u64>().map(Numeric::Unsigned))
                .ok()
                .or_else(|| raw.parse::<f64>().ok().map(Numeric::Float))
        }
        _ => None,
    }
}

fn compare_numbers(left: Numeric, right: Numeric) -> Option<Ordering> {
    match (left, right) {
        (Numeric::Signed(left), Numeric::Signed(right)) => Some(left.cmp(&right)),
        (Numeric::Unsigned(left), Numeric::Unsigned(right)) => Some(left.cmp(&right)),
        (Numeric::Signed(left), Numeric::Unsigned(right)) => Some(
            u64::try_from(left).map_or(Ordering::Less, |left| left.cmp(&right)),
        ),
        (Numeric::Unsigned(_), Numeric::Signed(_)) => {
            compare_numbers(right, left).map(Ordering::reverse)
        }
        (left, right) => left.as_f64().partial_cmp(&right.as_f64()),
    }
}

/// A grant of one action on one resource, optionally narrowed by conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    permission_id: String,
    resource: NonEmptyString,
    action: Action,
    description: Option<String>,
    conditions: Vec<PermissionCondition>,
}

impl Permission {
    /// Creates a permission.
    pub fn new(
        permission_id: impl Into<String>,
        resource: impl Into<String>,
        action: Action,
        description: Option<String>,
        conditions: Vec<PermissionCondition>,
    ) -> AppResult<Self> {
        let resource = resource.into().trim().to_ascii_lowercase();
        Ok(Self {
            permission_id: permission_id.into(),
            resource: NonEmptyString::new(resource)?,
            action,
            description,
            conditions,
        })
    }

    /// Returns the stable permission identifier.
    #[must_use]
    pub fn permission_id(&self) -> &str {
        self.permission_id.as_str()
    }

    /// Returns the resource tag, e.g. `contracts`.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the granted action.
    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Returns the optional human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns attribute conditions, all of which must hold.
    #[must_use]
    pub fn conditions(&self) -> &[PermissionCondition] {
        &self.conditions
    }

    /// Returns whether this permission grants `action` on `resource`.
    ///
    /// Conditional permissions only match when entity attributes are
    /// supplied and every condition evaluates to true.
    #[must_use]
    pub fn grants(
        &self,
        resource: &str,
        action: &Action,
        entity: Option<&Map<String, Value>>,
    ) -> bool {
        if !self.resource.as_str().eq_ignore_ascii_case(resource.trim()) || &self.action != action
        {
            return false;
        }

        if self.conditions.is_empty() {
            return true;
        }

        let Some(entity) = entity else {
            return false;
        };

        self.conditions
            .iter()
            .all(|condition| condition.evaluate(entity))
    }
}
