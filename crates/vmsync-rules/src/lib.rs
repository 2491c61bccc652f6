//! # vmsync-rules
//!
//! Ordered, conditional rules deriving target attributes from a collected
//! attribute map. Evaluation is a pure function of the source map and the rule set;
//! no rule observes remote state.

pub mod engine;
pub mod error;
pub mod model;
pub mod template;

pub use engine::{DynRuleEvaluator, RuleEvaluator, RuleSet};
pub use error::RuleError;
pub use model::{Condition, ConditionKind, ConditionType, Outcome, Rule, Transform};
