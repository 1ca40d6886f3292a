//! 引擎错误定义

use crate::generator::GeneratorId;
use crate::object::ObjectId;
use thiserror::Error;

/// 配置错误：同步拒绝，不修改任何状态
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Inception level must not be negative, got {0}")]
    NegativeInceptionLevel(i64),

    #[error("Acceptable difference must be finite and non-negative, got {0}")]
    InvalidAcceptableDifference(f64),

    #[error("Time must be finite, got {0}")]
    InvalidTime(f64),

    #[error("Relevancy must be within [0, 1], got {0}")]
    InvalidRelevancy(f64),

    #[error("Relevancy ratio must be within [0, 1], got {0}")]
    InvalidRelevancyRatio(f64),

    #[error("Malformed selection predicate: {reason}")]
    MalformedPredicate { reason: String },

    #[error("Generator {generator} declares {expected} roles but {found} predicate collections were given")]
    RoleCountMismatch {
        generator: String,
        expected: usize,
        found: usize,
    },
}

/// 生成器在单个输入组合上的失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorFault {
    #[error("Degenerate input: {0}")]
    Degenerate(String),

    #[error("Expected {expected} inputs, got {found}")]
    WrongArity { expected: usize, found: usize },

    #[error("Unexpected input kind at slot {slot}")]
    WrongKind { slot: usize },

    #[error("Generator produced non-finite geometry")]
    NonFinite,

    #[error("Generator panicked: {0}")]
    Panicked(String),
}

/// 引擎错误
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Object not found: {0}")]
    UnknownObject(ObjectId),

    #[error("Generator not found: {0}")]
    UnknownGenerator(GeneratorId),

    #[error("Preference store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Operation cancelled after {completed_layers} layers")]
    Cancelled { completed_layers: usize },

    #[error("Background regeneration worker disconnected")]
    WorkerDisconnected,
}

pub type Result<T> = std::result::Result<T, EngineError>;
