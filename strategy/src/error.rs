use testnet_core::catalog::CatalogError;
use testnet_core::TxHash;

use crate::ports::ChainError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidityError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("insufficient native balance: have {have}, need {need}")]
    InsufficientNative { have: String, need: String },
    #[error("wrap confirmed but balance {have} is still below {need}")]
    WrapShortfall { have: String, need: String },
    #[error("no swap source for {0}")]
    NoSwapSource(String),
    #[error("no usable pools, remediation exhausted")]
    RemediationExhausted,
    #[error("no affordable pools after remediation")]
    NoPoolsAfterRemediation,
    #[error("no pool received a non-zero allocation")]
    NoAllocations,
}
