//! Filter operators and their wire names

use std::fmt;

/// How many values an operator expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one value
    Scalar,
    /// Any number of values
    Set,
    /// Exactly two values (lower and upper bound)
    Range,
    /// Value is ignored
    None,
}

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Matches,
    NotMatches,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
    IsBetween,
    IsRelativeToToday,
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::Matches,
        Self::NotMatches,
        Self::In,
        Self::NotIn,
        Self::IsEmpty,
        Self::IsNotEmpty,
        Self::IsBetween,
        Self::IsRelativeToToday,
    ];

    /// Resolve a wire operator name
    ///
    /// Accepts both the request vocabulary (`iLike`, `inArray`, `notInArray`)
    /// and the canonical names. Matching is case-sensitive.
    pub fn from_wire(name: &str) -> Option<Self> {
        let op = match name {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            "iLike" | "matches" => Self::Matches,
            "notILike" | "notMatches" => Self::NotMatches,
            "inArray" | "in" => Self::In,
            "notInArray" | "notIn" => Self::NotIn,
            "isEmpty" => Self::IsEmpty,
            "isNotEmpty" => Self::IsNotEmpty,
            "isBetween" => Self::IsBetween,
            "isRelativeToToday" => Self::IsRelativeToToday,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical operator name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Matches => "matches",
            Self::NotMatches => "notMatches",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::IsEmpty => "isEmpty",
            Self::IsNotEmpty => "isNotEmpty",
            Self::IsBetween => "isBetween",
            Self::IsRelativeToToday => "isRelativeToToday",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::In | Self::NotIn => Arity::Set,
            Self::IsBetween => Arity::Range,
            Self::IsEmpty | Self::IsNotEmpty => Arity::None,
            _ => Arity::Scalar,
        }
    }

    /// Set-class operators receive comma splitting during coercion
    pub fn splits_strings(&self) -> bool {
        matches!(self.arity(), Arity::Set | Arity::Range)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
