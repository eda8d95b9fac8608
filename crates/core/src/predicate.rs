//! Predicates for filtering records.
//!
//! A predicate is evaluated against one record at a time. Built-in
//! comparisons read only the record's own fields, so a live query can
//! maintain them incrementally. `Predicate::external` wraps a closure that
//! depends on state outside the record and forces full recomputation.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::value::Value;
use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

/// Closure form of a predicate. `Err` carries the failure message.
pub type PredicateFn = Rc<dyn Fn(&Record) -> core::result::Result<bool, String>>;

/// Evaluation type for field comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalType {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl EvalType {
    fn symbol(&self) -> &'static str {
        match self {
            EvalType::Eq => "==",
            EvalType::Ne => "!=",
            EvalType::Lt => "<",
            EvalType::Le => "<=",
            EvalType::Gt => ">",
            EvalType::Ge => ">=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            EvalType::Eq => ordering == Ordering::Equal,
            EvalType::Ne => ordering != Ordering::Equal,
            EvalType::Lt => ordering == Ordering::Less,
            EvalType::Le => ordering != Ordering::Greater,
            EvalType::Gt => ordering == Ordering::Greater,
            EvalType::Ge => ordering != Ordering::Less,
        }
    }
}

/// A boolean condition over a record.
#[derive(Clone)]
pub enum Predicate {
    /// Matches every record.
    All,
    /// Compares a field to a literal value.
    Compare {
        field: String,
        eval_type: EvalType,
        value: Value,
    },
    /// Matches records whose field is null or absent.
    IsNull(String),
    /// Substring match on a string field.
    Contains { field: String, needle: String },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Closure reading only the record.
    Custom(PredicateFn),
    /// Closure that may read state outside the record.
    External(PredicateFn),
}

impl Predicate {
    fn compare(field: impl Into<String>, eval_type: EvalType, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.into(),
            eval_type,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, EvalType::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, EvalType::Ne, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, EvalType::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, EvalType::Le, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, EvalType::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, EvalType::Ge, value)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull(field.into())
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// Conjunction with another predicate.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut parts) => {
                parts.push(other);
                Predicate::And(parts)
            }
            first => Predicate::And(alloc::vec![first, other]),
        }
    }

    /// Disjunction with another predicate.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or(mut parts) => {
                parts.push(other);
                Predicate::Or(parts)
            }
            first => Predicate::Or(alloc::vec![first, other]),
        }
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Wraps a closure that reads only the record it is given.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Record) -> core::result::Result<bool, String> + 'static,
    {
        Predicate::Custom(Rc::new(f))
    }

    /// Wraps a closure whose answer may change without the record changing.
    pub fn external<F>(f: F) -> Self
    where
        F: Fn(&Record) -> core::result::Result<bool, String> + 'static,
    {
        Predicate::External(Rc::new(f))
    }

    /// Returns true when the result depends only on the record's own fields.
    pub fn is_local(&self) -> bool {
        match self {
            Predicate::External(_) => false,
            Predicate::And(parts) | Predicate::Or(parts) => parts.iter().all(|p| p.is_local()),
            Predicate::Not(inner) => inner.is_local(),
            _ => true,
        }
    }

    /// Evaluates the predicate against a record.
    ///
    /// Fails with `QueryError::PredicateEvaluationFailed` when a non-null
    /// field is compared with a value of an incompatible type, or when a
    /// closure reports an error.
    pub fn eval(&self, record: &Record) -> Result<bool> {
        match self {
            Predicate::All => Ok(true),
            Predicate::Compare {
                field,
                eval_type,
                value,
            } => eval_compare(record, field, *eval_type, value),
            Predicate::IsNull(field) => Ok(record.value(field).is_null()),
            Predicate::Contains { field, needle } => match record.value(field) {
                Value::Null => Ok(false),
                Value::String(s) => Ok(s.contains(needle.as_str())),
                other => Err(Error::predicate_failed(format!(
                    "field `{}` of record {}: cannot search {} for a substring",
                    field,
                    record.id(),
                    other.type_name()
                ))),
            },
            Predicate::And(parts) => {
                for part in parts {
                    if !part.eval(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(parts) => {
                for part in parts {
                    if part.eval(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!inner.eval(record)?),
            Predicate::Custom(f) | Predicate::External(f) => f(record).map_err(|message| {
                Error::predicate_failed(format!("record {}: {}", record.id(), message))
            }),
        }
    }
}

fn eval_compare(record: &Record, field: &str, eval_type: EvalType, value: &Value) -> Result<bool> {
    let actual = record.value(field);
    match (actual.data_type(), value.data_type()) {
        // Null only equals null; ordering comparisons involving null are false.
        (None, _) | (_, None) => Ok(match eval_type {
            EvalType::Eq => actual.is_null() && value.is_null(),
            EvalType::Ne => actual.is_null() != value.is_null(),
            _ => false,
        }),
        (Some(lhs), Some(rhs)) if lhs.is_comparable_with(rhs) => {
            Ok(eval_type.accepts(actual.cmp(value)))
        }
        (Some(lhs), Some(rhs)) => Err(Error::predicate_failed(format!(
            "field `{}` of record {}: cannot compare {} {} {}",
            field,
            record.id(),
            lhs,
            eval_type.symbol(),
            rhs
        ))),
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::All => f.write_str("All"),
            Predicate::Compare {
                field,
                eval_type,
                value,
            } => write!(f, "{} {} {:?}", field, eval_type.symbol(), value),
            Predicate::IsNull(field) => write!(f, "{} IS NULL", field),
            Predicate::Contains { field, needle } => write!(f, "{} CONTAINS {:?}", field, needle),
            Predicate::And(parts) => f.debug_tuple("And").field(parts).finish(),
            Predicate::Or(parts) => f.debug_tuple("Or").field(parts).finish(),
            Predicate::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Predicate::Custom(_) => f.write_str("Custom(..)"),
            Predicate::External(_) => f.write_str("External(..)"),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All
    }
}
