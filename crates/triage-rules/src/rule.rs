//! Diagnostic rules and their conditions
//!
//! A condition is authored as `(key, op, value)` and compiled once into a
//! [`Predicate`]. Operands that make no sense for their operator compile to
//! [`Predicate::Unsatisfiable`] instead of failing the load.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use triage_core::{Domain, FactValue, Severity};

/// Condition operator as written in rule files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Contains,
    Present,
    IsTrue,
    IsFalse,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
        Operator::In,
        Operator::Contains,
        Operator::Present,
        Operator::IsTrue,
        Operator::IsFalse,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
            Operator::Contains => "contains",
            Operator::Present => "present",
            Operator::IsTrue => "is_true",
            Operator::IsFalse => "is_false",
        }
    }

    /// Whether the operator reads its `value` operand
    pub fn takes_operand(&self) -> bool {
        !matches!(self, Operator::Present | Operator::IsTrue | Operator::IsFalse)
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" | "eq" => Ok(Operator::Eq),
            "!=" | "ne" => Ok(Operator::Ne),
            "<" | "lt" => Ok(Operator::Lt),
            "<=" | "le" => Ok(Operator::Le),
            ">" | "gt" => Ok(Operator::Gt),
            ">=" | "ge" => Ok(Operator::Ge),
            "in" => Ok(Operator::In),
            "contains" => Ok(Operator::Contains),
            "present" | "exists" => Ok(Operator::Present),
            "is_true" => Ok(Operator::IsTrue),
            "is_false" => Ok(Operator::IsFalse),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|op: String| {
            serde::de::Error::custom(format!("unknown operator '{}'", op))
        })
    }
}

/// Ordering test against a numeric threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }
}

/// Compiled test applied to the fact named by a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals(FactValue),
    NotEquals(FactValue),
    Compare(Comparison, f64),
    OneOf(Vec<FactValue>),
    Contains(String),
    Present,
    /// The operand cannot be used with the operator
    Unsatisfiable(String),
}

impl Predicate {
    /// Compile an operator and its raw operand
    pub fn compile(op: Operator, operand: Option<&Value>) -> Predicate {
        let scalar = operand.and_then(FactValue::from_json);
        let number = operand.and_then(Value::as_f64);

        match op {
            Operator::Eq => scalar
                .map(Predicate::Equals)
                .unwrap_or_else(|| Predicate::malformed(op, operand)),
            Operator::Ne => scalar
                .map(Predicate::NotEquals)
                .unwrap_or_else(|| Predicate::malformed(op, operand)),
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
                let cmp = match op {
                    Operator::Lt => Comparison::Lt,
                    Operator::Le => Comparison::Le,
                    Operator::Gt => Comparison::Gt,
                    _ => Comparison::Ge,
                };
                number
                    .map(|n| Predicate::Compare(cmp, n))
                    .unwrap_or_else(|| Predicate::malformed(op, operand))
            }
            Operator::In => match operand {
                Some(Value::Array(items)) => {
                    Predicate::OneOf(items.iter().filter_map(FactValue::from_json).collect())
                }
                _ => scalar
                    .map(|v| Predicate::OneOf(vec![v]))
                    .unwrap_or_else(|| Predicate::malformed(op, operand)),
            },
            Operator::Contains => match operand {
                Some(Value::String(needle)) => Predicate::Contains(needle.clone()),
                _ => Predicate::malformed(op, operand),
            },
            Operator::Present => Predicate::Present,
            Operator::IsTrue => Predicate::Equals(FactValue::Bool(true)),
            Operator::IsFalse => Predicate::Equals(FactValue::Bool(false)),
        }
    }

    fn malformed(op: Operator, operand: Option<&Value>) -> Predicate {
        match operand {
            Some(v) => Predicate::Unsatisfiable(format!("'{}' cannot take operand {}", op, v)),
            None => Predicate::Unsatisfiable(format!("'{}' needs an operand", op)),
        }
    }

    /// Test a fact value. An absent fact satisfies nothing; neither does a
    /// fact of the wrong kind.
    pub fn test(&self, fact: Option<&FactValue>) -> bool {
        let Some(fact) = fact else {
            return false;
        };

        match self {
            Predicate::Equals(expected) => fact.matches(expected),
            Predicate::NotEquals(expected) => fact.kind() == expected.kind() && !fact.matches(expected),
            Predicate::Compare(cmp, threshold) => fact
                .as_f64()
                .map(|v| cmp.holds(v, *threshold))
                .unwrap_or(false),
            Predicate::OneOf(options) => options.iter().any(|o| fact.matches(o)),
            Predicate::Contains(needle) => fact.as_str().map(|s| s.contains(needle.as_str())).unwrap_or(false),
            Predicate::Present => true,
            Predicate::Unsatisfiable(_) => false,
        }
    }

    pub fn is_satisfiable(&self) -> bool {
        !matches!(self, Predicate::Unsatisfiable(_))
    }
}

/// How a condition takes part in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionRole {
    /// Must hold for the rule to fire
    Required,
    /// Raises confidence when it holds
    Optional,
    /// Prevents the rule from firing when it holds
    Forbidden,
}

/// One condition of a rule
#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub key: String,
    pub op: Operator,
    #[serde(rename = "value", skip_serializing_if = "Option::is_none")]
    pub operand: Option<Value>,
    pub role: ConditionRole,
    pub weight: f64,
    #[serde(skip)]
    pub predicate: Predicate,
}

impl Condition {
    /// A required condition with weight 1
    pub fn new(key: impl Into<String>, op: Operator, operand: Option<Value>) -> Self {
        let predicate = Predicate::compile(op, operand.as_ref());
        Self {
            key: key.into(),
            op,
            operand,
            role: ConditionRole::Required,
            weight: 1.0,
            predicate,
        }
    }

    pub fn optional(mut self) -> Self {
        self.role = ConditionRole::Optional;
        self
    }

    pub fn forbidden(mut self) -> Self {
        self.role = ConditionRole::Forbidden;
        self
    }

    pub fn with_role(mut self, role: ConditionRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Test this condition against the fact it names
    pub fn holds(&self, fact: Option<&FactValue>) -> bool {
        self.predicate.test(fact)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.operand, self.op.takes_operand()) {
            (Some(operand), true) => write!(f, "{} {} {}", self.key, self.op, operand),
            _ => write!(f, "{} {}", self.key, self.op),
        }
    }
}

/// A compiled diagnostic rule
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub id: u32,
    pub domain: Domain,
    pub name: String,
    /// Confidence when every optional condition holds, in (0, 1]
    pub base_confidence: f64,
    pub severity: Severity,
    pub evidence_template: String,
    pub remedy: String,
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn new(id: u32, domain: Domain, name: impl Into<String>, base_confidence: f64) -> Self {
        Self {
            id,
            domain,
            name: name.into(),
            base_confidence,
            severity: Severity::default(),
            evidence_template: String::new(),
            remedy: String::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_evidence(mut self, template: impl Into<String>) -> Self {
        self.evidence_template = template.into();
        self
    }

    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remedy = remedy.into();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn required(&self) -> impl Iterator<Item = &Condition> {
        self.by_role(ConditionRole::Required)
    }

    pub fn optional(&self) -> impl Iterator<Item = &Condition> {
        self.by_role(ConditionRole::Optional)
    }

    pub fn forbidden(&self) -> impl Iterator<Item = &Condition> {
        self.by_role(ConditionRole::Forbidden)
    }

    fn by_role(&self, role: ConditionRole) -> impl Iterator<Item = &Condition> {
        self.conditions.iter().filter(move |c| c.role == role)
    }
}
