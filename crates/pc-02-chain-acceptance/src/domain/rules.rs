//! Block validation rule chain
//!
//! Each rule checks one independent property of a block against its parent.
//! The chain runs them in order and stops at the first failure. Block
//! production runs the same chain on its own candidate before signing off.

use super::gas::{gas_limit_within_bounds, minimum_gas_price_within_bounds};
use crate::config::ChainAcceptanceConfig;
use crate::error::ValidationError;
use crate::ports::StateReader;
use pc_01_producer_schedule::block_producer_list;
use shared_types::{Address, Block, Transaction};
use std::collections::HashMap;
use tracing::debug;

/// Gas charged to every regular transaction before execution.
pub const INTRINSIC_GAS: u64 = 21_000;

/// Everything a rule may look at.
pub struct ValidationContext<'a> {
    /// Block under validation
    pub block: &'a Block,
    /// Its parent
    pub parent: &'a Block,
    /// Local time (ms)
    pub now_ms: u64,
    /// Acceptance configuration
    pub config: &'a ChainAcceptanceConfig,
    /// Parent state
    pub state: &'a dyn StateReader,
}

/// One validation rule.
pub trait BlockValidationRule: Send + Sync {
    /// Rule name for logs.
    fn name(&self) -> &'static str;

    /// Check the block.
    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError>;
}

/// Ordered, short-circuiting list of rules.
pub struct RuleChain {
    rules: Vec<Box<dyn BlockValidationRule>>,
}

impl RuleChain {
    /// Empty chain.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule.
    pub fn with_rule(mut self, rule: impl BlockValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// The consensus rule chain, in order.
    pub fn standard() -> Self {
        Self::new()
            .with_rule(TransactionFieldsRule)
            .with_rule(NonceRule)
            .with_rule(MinimumGasPriceRule)
            .with_rule(ParentHeaderRule)
            .with_rule(TimestampRule)
            .with_rule(GasUsedRule)
            .with_rule(ProducerListPositionRule)
            .with_rule(FeeDistributionPositionRule)
            .with_rule(HeaderSignatureRule)
            .with_rule(ProducerLegitimacyRule)
    }

    /// Run every rule until one fails.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        for rule in &self.rules {
            if let Err(e) = rule.validate(ctx) {
                debug!(
                    "[pc-02] Block #{} failed {}: {}",
                    ctx.block.number(),
                    rule.name(),
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Names of the rules, in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Default for RuleChain {
    fn default() -> Self {
        Self::standard()
    }
}

/// Transaction well-formedness and signature recovery.
pub struct TransactionFieldsRule;

impl BlockValidationRule for TransactionFieldsRule {
    fn name(&self) -> &'static str {
        "transaction-fields"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let number = ctx.block.number();
        for (index, tx) in ctx.block.transactions().iter().enumerate() {
            match tx {
                Transaction::Regular(inner) => {
                    if inner.gas_limit < INTRINSIC_GAS {
                        return Err(ValidationError::MalformedTransaction {
                            index,
                            reason: format!("gas limit {} below intrinsic gas", inner.gas_limit),
                        });
                    }
                    if inner.recover_sender().is_err() {
                        return Err(ValidationError::InvalidTransactionSignature { index });
                    }
                }
                Transaction::ProducerList(inner) if inner.block_number != number => {
                    return Err(ValidationError::MalformedTransaction {
                        index,
                        reason: format!("producer list for block {}", inner.block_number),
                    });
                }
                Transaction::FeeDistribution(inner) if inner.block_number != number => {
                    return Err(ValidationError::MalformedTransaction {
                        index,
                        reason: format!("fee distribution for block {}", inner.block_number),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Per-sender nonces follow the parent state, in block order.
pub struct NonceRule;

impl BlockValidationRule for NonceRule {
    fn name(&self) -> &'static str {
        "nonce"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let parent_root = ctx.parent.header().state_root;
        let mut expected: HashMap<Address, u64> = HashMap::new();

        for (index, tx) in ctx.block.transactions().iter().enumerate() {
            if !tx.needs_signature() {
                continue;
            }
            let sender = tx
                .sender()
                .map_err(|_| ValidationError::InvalidTransactionSignature { index })?;
            let next = expected
                .entry(sender)
                .or_insert_with(|| ctx.state.nonce(&parent_root, &sender));
            if tx.nonce() != *next {
                return Err(ValidationError::NonceMismatch {
                    sender: hex::encode(sender),
                    expected: *next,
                    actual: tx.nonce(),
                });
            }
            *next += 1;
        }
        Ok(())
    }
}

/// Minimum gas price follows the parent's by a bounded step and every
/// non-free transaction pays at least that price.
pub struct MinimumGasPriceRule;

impl BlockValidationRule for MinimumGasPriceRule {
    fn name(&self) -> &'static str {
        "minimum-gas-price"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let parent = ctx.parent.header().minimum_gas_price;
        let block = ctx.block.header().minimum_gas_price;
        if !minimum_gas_price_within_bounds(parent, block) {
            return Err(ValidationError::MinimumGasPriceOutOfBounds { parent, block });
        }
        for (index, tx) in ctx.block.transactions().iter().enumerate() {
            if !tx.is_free() && tx.gas_price() < block {
                return Err(ValidationError::GasPriceBelowMinimum { index });
            }
        }
        Ok(())
    }
}

/// Number, parent hash, gas limit bound and extra-data size.
pub struct ParentHeaderRule;

impl BlockValidationRule for ParentHeaderRule {
    fn name(&self) -> &'static str {
        "parent-header"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let header = ctx.block.header();
        let parent = ctx.parent.header();

        let expected = parent.number + 1;
        if header.number != expected || header.parent_hash != ctx.parent.hash() {
            return Err(ValidationError::ParentNumberMismatch {
                expected,
                actual: header.number,
            });
        }
        if !gas_limit_within_bounds(parent.gas_limit, header.gas_limit, ctx.config.min_gas_limit)
        {
            return Err(ValidationError::GasLimitOutOfBounds {
                parent: parent.gas_limit,
                block: header.gas_limit,
            });
        }
        if header.extra_data.len() > ctx.config.max_extra_data {
            return Err(ValidationError::ExtraDataTooLong {
                len: header.extra_data.len(),
                max: ctx.config.max_extra_data,
            });
        }
        Ok(())
    }
}

/// Timestamp within the future-skew window and after the parent's.
pub struct TimestampRule;

impl BlockValidationRule for TimestampRule {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let timestamp = ctx.block.timestamp();
        if timestamp > ctx.now_ms.saturating_add(ctx.config.max_future_skew_ms) {
            return Err(ValidationError::TimestampInFuture {
                timestamp,
                now: ctx.now_ms,
            });
        }
        let parent = ctx.parent.timestamp();
        if timestamp <= parent {
            return Err(ValidationError::TimestampNotAfterParent { timestamp, parent });
        }
        Ok(())
    }
}

/// Gas used and the summed transaction gas limits fit the block gas limit.
pub struct GasUsedRule;

impl BlockValidationRule for GasUsedRule {
    fn name(&self) -> &'static str {
        "gas-used"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let header = ctx.block.header();
        let requested: u64 = ctx
            .block
            .transactions()
            .iter()
            .fold(0u64, |acc, tx| acc.saturating_add(tx.gas_limit()));
        let used = header.gas_used.max(requested);
        if used > header.gas_limit {
            return Err(ValidationError::GasUsedExceedsLimit {
                used,
                limit: header.gas_limit,
            });
        }
        Ok(())
    }
}

/// Exactly one producer-list transaction, second to last.
pub struct ProducerListPositionRule;

impl BlockValidationRule for ProducerListPositionRule {
    fn name(&self) -> &'static str {
        "producer-list-position"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let count = ctx
            .block
            .transactions()
            .iter()
            .filter(|tx| tx.is_producer_list())
            .count();
        if count != 1 || ctx.block.producer_list_transaction().is_none() {
            return Err(ValidationError::MissingProducerList);
        }
        Ok(())
    }
}

/// Exactly one fee-distribution transaction, last.
pub struct FeeDistributionPositionRule;

impl BlockValidationRule for FeeDistributionPositionRule {
    fn name(&self) -> &'static str {
        "fee-distribution-position"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let count = ctx
            .block
            .transactions()
            .iter()
            .filter(|tx| tx.is_fee_distribution())
            .count();
        if count != 1 || !ctx.block.has_fee_distribution_last() {
            return Err(ValidationError::MissingFeeDistribution);
        }
        Ok(())
    }
}

/// Header signature recovers to the coinbase.
pub struct HeaderSignatureRule;

impl BlockValidationRule for HeaderSignatureRule {
    fn name(&self) -> &'static str {
        "header-signature"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        match ctx.block.signer() {
            Ok(signer) if signer == ctx.block.coinbase() => Ok(()),
            _ => Err(ValidationError::InvalidHeaderSignature),
        }
    }
}

/// Coinbase is a listed producer, the timestamp falls in its slot, and a
/// producer does not follow itself within one round.
///
/// Skipped for genesis and its direct child.
pub struct ProducerLegitimacyRule;

impl BlockValidationRule for ProducerLegitimacyRule {
    fn name(&self) -> &'static str {
        "producer-legitimacy"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<(), ValidationError> {
        let block = ctx.block;
        if block.number() <= 1 {
            return Ok(());
        }

        let list = block_producer_list(block)
            .map_err(|e| ValidationError::UndecodableProducerList(e.to_string()))?;
        let coinbase = block.coinbase();
        let producer = list
            .index_of_ledger_address(&coinbase)
            .ok_or_else(|| ValidationError::UnknownProducer(hex::encode(coinbase)))?;

        let schedule = &ctx.config.schedule;
        let slot_owner = schedule
            .producer_index(block.timestamp(), list.len())
            .map_err(|e| ValidationError::ScheduleViolation(e.to_string()))?;
        if slot_owner != producer {
            return Err(ValidationError::WrongSlot {
                slot_owner,
                producer,
            });
        }

        // Parent's parent being genesis exempts the spacing check.
        if ctx.parent.coinbase() == coinbase && ctx.parent.number() >= 2 {
            let gap_ms = block.timestamp().saturating_sub(ctx.parent.timestamp());
            let round_ms = schedule.round_length_ms(list.len());
            if gap_ms < round_ms {
                return Err(ValidationError::SameProducerTooSoon { gap_ms, round_ms });
            }
        }
        Ok(())
    }
}
