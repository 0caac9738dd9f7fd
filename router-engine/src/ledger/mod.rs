//! In-memory world state the router operates on.
//!
//! Holds asset balances, spending allowances, token metadata and the block timestamp. Native
//! balances live under the sentinel address returned by [`native_asset`]. Every venue keeps its
//! pool state in ledger balances, so cloning the ledger captures the complete state of a swap.

pub mod snapshot;

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::Zero;
use router_common::models::{is_native, native_asset, Address, Token};
use thiserror::Error;
use tracing::trace;

pub use snapshot::BalanceSnapshot;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{owner} holds {balance} of {asset}, {required} required")]
    InsufficientBalance { asset: Address, owner: Address, balance: BigUint, required: BigUint },
    #[error("{spender} may spend {allowance} of {asset} on behalf of {owner}, {required} required")]
    InsufficientAllowance {
        asset: Address,
        owner: Address,
        spender: Address,
        allowance: BigUint,
        required: BigUint,
    },
    #[error("The native asset has no allowances")]
    NativeAllowance,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    timestamp: u64,
    wrapped_native: Address,
    tokens: HashMap<Address, Token>,
    balances: HashMap<Address, HashMap<Address, BigUint>>,
    allowances: HashMap<(Address, Address, Address), BigUint>,
}

impl Ledger {
    pub fn new(wrapped_native: Address) -> Self {
        Self {
            timestamp: 0,
            wrapped_native,
            tokens: HashMap::new(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn wrapped_native(&self) -> &Address {
        &self.wrapped_native
    }

    /// Registers token metadata. Only needed for tokens with a transfer tax.
    pub fn register_token(&mut self, token: Token) {
        self.tokens
            .insert(token.address.clone(), token);
    }

    pub fn token(&self, asset: &Address) -> Option<&Token> {
        self.tokens.get(asset)
    }

    pub fn balance_of(&self, asset: &Address, owner: &Address) -> BigUint {
        self.balances
            .get(asset)
            .and_then(|owners| owners.get(owner))
            .cloned()
            .unwrap_or_default()
    }

    /// Credits `amount` of `asset` to `owner` out of thin air.
    pub fn mint(&mut self, asset: &Address, owner: &Address, amount: &BigUint) {
        *self
            .balances
            .entry(asset.clone())
            .or_default()
            .entry(owner.clone())
            .or_default() += amount;
    }

    fn debit(
        &mut self,
        asset: &Address,
        owner: &Address,
        amount: &BigUint,
    ) -> Result<(), LedgerError> {
        let balance = self.balance_of(asset, owner);
        if &balance < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: asset.clone(),
                owner: owner.clone(),
                balance,
                required: amount.clone(),
            });
        }
        self.balances
            .entry(asset.clone())
            .or_default()
            .insert(owner.clone(), balance - amount);
        Ok(())
    }

    /// Moves `amount` of `asset` from `from` to `to`.
    ///
    /// Returns the amount credited to `to`, which is smaller than `amount` for assets with a
    /// transfer tax. The withheld part leaves circulation.
    pub fn transfer(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: &BigUint,
    ) -> Result<BigUint, LedgerError> {
        self.debit(asset, from, amount)?;
        let tax = if is_native(asset) {
            BigUint::zero()
        } else {
            self.tokens
                .get(asset)
                .map(|token| token.transfer_tax(amount))
                .unwrap_or_default()
        };
        let received = amount - &tax;
        self.mint(asset, to, &received);
        trace!(%asset, %from, %to, %amount, %tax, "Transfer");
        Ok(received)
    }

    /// Sets the allowance of `spender` over `owner`'s `asset`, replacing any previous value.
    pub fn approve(
        &mut self,
        asset: &Address,
        owner: &Address,
        spender: &Address,
        amount: &BigUint,
    ) -> Result<(), LedgerError> {
        if is_native(asset) {
            return Err(LedgerError::NativeAllowance);
        }
        let key = (asset.clone(), owner.clone(), spender.clone());
        if amount.is_zero() {
            self.allowances.remove(&key);
        } else {
            self.allowances
                .insert(key, amount.clone());
        }
        Ok(())
    }

    pub fn allowance(&self, asset: &Address, owner: &Address, spender: &Address) -> BigUint {
        self.allowances
            .get(&(asset.clone(), owner.clone(), spender.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Moves `amount` of `owner`'s `asset` to `to`, spending `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        asset: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: &BigUint,
    ) -> Result<BigUint, LedgerError> {
        if is_native(asset) {
            return Err(LedgerError::NativeAllowance);
        }
        let allowance = self.allowance(asset, owner, spender);
        if &allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                asset: asset.clone(),
                owner: owner.clone(),
                spender: spender.clone(),
                allowance,
                required: amount.clone(),
            });
        }
        self.approve(asset, owner, spender, &(allowance - amount))?;
        self.transfer(asset, owner, to, amount)
    }

    /// Converts `amount` of `owner`'s native balance into the wrapped native token.
    pub fn wrap(&mut self, owner: &Address, amount: &BigUint) -> Result<(), LedgerError> {
        let wrapped = self.wrapped_native.clone();
        self.transfer(&native_asset(), owner, &wrapped, amount)?;
        self.mint(&wrapped, owner, amount);
        Ok(())
    }

    /// Converts `amount` of `owner`'s wrapped native token back into the native asset.
    pub fn unwrap(&mut self, owner: &Address, amount: &BigUint) -> Result<(), LedgerError> {
        let wrapped = self.wrapped_native.clone();
        self.debit(&wrapped, owner, amount)?;
        self.transfer(&native_asset(), &wrapped, owner, amount)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use router_common::Bytes;

    pub(crate) fn addr(byte: u8) -> Address {
        Bytes::from(byte).lpad(20, 0)
    }

    fn amount(value: u64) -> BigUint {
        BigUint::from(value)
    }

    #[test]
    fn test_transfer() {
        let mut ledger = Ledger::new(addr(0xee));
        ledger.mint(&addr(1), &addr(0xa), &amount(100));

        let received = ledger
            .transfer(&addr(1), &addr(0xa), &addr(0xb), &amount(40))
            .unwrap();

        assert_eq!(received, amount(40));
        assert_eq!(ledger.balance_of(&addr(1), &addr(0xa)), amount(60));
        assert_eq!(ledger.balance_of(&addr(1), &addr(0xb)), amount(40));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut ledger = Ledger::new(addr(0xee));
        ledger.mint(&addr(1), &addr(0xa), &amount(10));

        let res = ledger.transfer(&addr(1), &addr(0xa), &addr(0xb), &amount(11));

        assert_eq!(
            res,
            Err(LedgerError::InsufficientBalance {
                asset: addr(1),
                owner: addr(0xa),
                balance: amount(10),
                required: amount(11),
            })
        );
    }

    #[test]
    fn test_taxed_transfer() {
        let mut ledger = Ledger::new(addr(0xee));
        ledger.register_token(Token::new(&addr(1), "TAX", 18, 500));
        ledger.mint(&addr(1), &addr(0xa), &amount(1_000));

        let received = ledger
            .transfer(&addr(1), &addr(0xa), &addr(0xb), &amount(1_000))
            .unwrap();

        assert_eq!(received, amount(950));
        assert_eq!(ledger.balance_of(&addr(1), &addr(0xb)), amount(950));
    }

    #[test]
    fn test_transfer_from_spends_allowance() {
        let mut ledger = Ledger::new(addr(0xee));
        ledger.mint(&addr(1), &addr(0xa), &amount(100));
        ledger
            .approve(&addr(1), &addr(0xa), &addr(0xc), &amount(30))
            .unwrap();

        ledger
            .transfer_from(&addr(1), &addr(0xc), &addr(0xa), &addr(0xb), &amount(20))
            .unwrap();
        let res = ledger.transfer_from(&addr(1), &addr(0xc), &addr(0xa), &addr(0xb), &amount(20));

        assert_eq!(ledger.allowance(&addr(1), &addr(0xa), &addr(0xc)), amount(10));
        assert!(matches!(res, Err(LedgerError::InsufficientAllowance { .. })));
    }

    #[test]
    fn test_native_has_no_allowance() {
        let mut ledger = Ledger::new(addr(0xee));

        let res = ledger.approve(&native_asset(), &addr(0xa), &addr(0xc), &amount(1));

        assert_eq!(res, Err(LedgerError::NativeAllowance));
    }

    #[test]
    fn test_wrap_unwrap() {
        let weth = addr(0xee);
        let mut ledger = Ledger::new(weth.clone());
        ledger.mint(&native_asset(), &addr(0xa), &amount(100));

        ledger.wrap(&addr(0xa), &amount(60)).unwrap();
        assert_eq!(ledger.balance_of(&weth, &addr(0xa)), amount(60));
        assert_eq!(ledger.balance_of(&native_asset(), &addr(0xa)), amount(40));

        ledger.unwrap(&addr(0xa), &amount(25)).unwrap();
        assert_eq!(ledger.balance_of(&weth, &addr(0xa)), amount(35));
        assert_eq!(ledger.balance_of(&native_asset(), &addr(0xa)), amount(65));
        assert_eq!(ledger.balance_of(&native_asset(), &weth), amount(35));
    }
}
