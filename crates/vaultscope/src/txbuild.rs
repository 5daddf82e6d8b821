//! Unsigned call construction for vault deposits, redemptions, and
//! underlying-token approvals. Emits call descriptors only; signing and
//! submission belong to the caller.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::bindings::{IERC20, IERC4626, IERC7540};
use crate::error::Error;
use crate::model::{Action, CallDescriptor, RedemptionVariant, VaultRecord};
use crate::providers::FetchError;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

/// Token precision read at build time. Cached or assumed decimals are how
/// 100x amount bugs happen, so the builder always asks for a fresh value
/// and fails closed when it cannot get one.
#[async_trait]
pub trait DecimalsSource: Send + Sync {
    async fn decimals(&self, chain_id: u64, token: Address) -> Result<u8, FetchError>;
}

/// Build the unsigned call for `action` against `vault`.
///
/// Deposits and approvals are denominated in the underlying asset;
/// withdrawals in vault shares. Input validation happens before any
/// external lookup.
pub async fn build_transaction(
    vault: &VaultRecord,
    action: Action,
    amount: &str,
    user: Address,
    decimals: &dyn DecimalsSource,
) -> Result<CallDescriptor, Error> {
    let amount = parse_amount(amount)?;

    match action {
        Action::Approve => {
            let token = vault.underlying.address;
            let scale = fresh_decimals(decimals, vault.chain_id, token).await?;
            let value = to_base_units(amount, scale)?;
            Ok(descriptor(
                token,
                IERC20::approveCall {
                    spender: vault.id,
                    value,
                }
                .abi_encode(),
            ))
        }
        Action::Deposit => {
            let variant = redemption_variant(vault)?;
            let scale =
                fresh_decimals(decimals, vault.chain_id, vault.underlying.address).await?;
            let assets = to_base_units(amount, scale)?;
            let data = match variant {
                RedemptionVariant::Synchronous => IERC4626::depositCall {
                    assets,
                    receiver: user,
                }
                .abi_encode(),
                RedemptionVariant::Asynchronous => IERC7540::requestDepositCall {
                    assets,
                    receiver: user,
                    owner: user,
                }
                .abi_encode(),
            };
            debug!(vault = %vault.id, ?variant, %assets, "built deposit call");
            Ok(descriptor(vault.id, data))
        }
        Action::Withdraw => {
            let variant = redemption_variant(vault)?;
            // Share precision, not underlying precision.
            let scale = fresh_decimals(decimals, vault.chain_id, vault.id).await?;
            let shares = to_base_units(amount, scale)?;
            let data = match variant {
                RedemptionVariant::Synchronous => IERC4626::redeemCall {
                    shares,
                    receiver: user,
                    owner: user,
                }
                .abi_encode(),
                RedemptionVariant::Asynchronous => IERC7540::requestRedeemCall {
                    shares,
                    receiver: user,
                    owner: user,
                }
                .abi_encode(),
            };
            debug!(vault = %vault.id, ?variant, %shares, "built withdraw call");
            Ok(descriptor(vault.id, data))
        }
    }
}

fn redemption_variant(vault: &VaultRecord) -> Result<RedemptionVariant, Error> {
    vault.redemption.ok_or_else(|| {
        Error::Invalid(format!(
            "vault {} has an unknown redemption variant",
            vault.id
        ))
    })
}

async fn fresh_decimals(
    source: &dyn DecimalsSource,
    chain_id: u64,
    token: Address,
) -> Result<u8, Error> {
    // Fail closed: no authoritative precision, no call descriptor.
    source
        .decimals(chain_id, token)
        .await
        .map_err(Error::Upstream)
}

fn parse_amount(raw: &str) -> Result<Decimal, Error> {
    let amount = Decimal::from_str(raw.trim())
        .map_err(|_| Error::Invalid(format!("amount {raw:?} is not a decimal number")))?;
    if amount <= Decimal::ZERO {
        return Err(Error::Invalid(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(amount)
}

fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, Error> {
    if decimals > 28 {
        return Err(Error::Invalid(format!(
            "unsupported token precision: {decimals} decimals"
        )));
    }
    let factor = Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals)), 0);
    let scaled = amount
        .checked_mul(factor)
        .ok_or_else(|| Error::Invalid(format!("amount {amount} overflows at {decimals} decimals")))?;
    U256::from_str_radix(&scaled.trunc().to_string(), 10)
        .map_err(|e| Error::Invalid(format!("amount does not fit base units: {e}")))
}

fn descriptor(to: Address, data: Vec<u8>) -> CallDescriptor {
    CallDescriptor {
        to,
        data: Bytes::from(data),
        value: U256::ZERO,
    }
}
