//! In-memory collaborators for tests and simulation.
//!
//! [`ManualClock`], [`MemoryCustody`] and [`MemoryIssuance`] implement the
//! collaborator traits with plain maps behind `parking_lot` locks. No
//! persistence; not meant for production custody.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use stax_core::error::CollaboratorError;
use stax_core::traits::{Clock, CustodyService, IssuanceService};
use stax_core::types::{AccountId, AssetId};

/// Clock advanced by hand. Never moves backwards.
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    pub fn new(height: u64) -> Self {
        Self { height: AtomicU64::new(height) }
    }

    /// Move forward by `blocks` and return the new height.
    pub fn advance(&self, blocks: u64) -> u64 {
        let prev = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| Some(h.saturating_add(blocks)))
            .unwrap_or_else(|h| h);
        prev.saturating_add(blocks)
    }

    /// Move to `height` if it is ahead of the current one.
    pub fn advance_to(&self, height: u64) -> u64 {
        self.height.fetch_max(height, Ordering::SeqCst).max(height)
    }
}

impl Clock for ManualClock {
    fn current_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct CustodyBook {
    /// Balances held by accounts outside the engine.
    wallets: HashMap<(AssetId, AccountId), u64>,
    /// Balances held by the engine.
    held: HashMap<AssetId, u64>,
    /// Accounts whose transfers are refused.
    frozen: HashSet<AccountId>,
}

/// Asset custody backed by an in-memory balance book.
#[derive(Debug, Default)]
pub struct MemoryCustody {
    book: Mutex<CustodyBook>,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `asset` to an account's external wallet.
    pub fn fund(&self, asset: AssetId, account: AccountId, amount: u64) {
        let mut book = self.book.lock();
        let bal = book.wallets.entry((asset, account)).or_default();
        *bal = bal.saturating_add(amount);
    }

    pub fn balance_of(&self, asset: &AssetId, account: &AccountId) -> u64 {
        self.book.lock().wallets.get(&(*asset, *account)).copied().unwrap_or(0)
    }

    /// Amount of `asset` currently in engine custody.
    pub fn held(&self, asset: &AssetId) -> u64 {
        self.book.lock().held.get(asset).copied().unwrap_or(0)
    }

    /// Credit engine custody directly, e.g. to back principal restored from a
    /// snapshot.
    pub fn seed_held(&self, asset: AssetId, amount: u64) {
        let mut book = self.book.lock();
        let held = book.held.entry(asset).or_default();
        *held = held.saturating_add(amount);
    }

    /// Refuse every transfer touching `account` until [`thaw`](Self::thaw).
    pub fn freeze(&self, account: AccountId) {
        self.book.lock().frozen.insert(account);
    }

    pub fn thaw(&self, account: &AccountId) {
        self.book.lock().frozen.remove(account);
    }
}

impl CustodyService for MemoryCustody {
    fn transfer_in(&self, asset: &AssetId, from: &AccountId, amount: u64)
    -> Result<(), CollaboratorError> {
        let mut book = self.book.lock();
        if book.frozen.contains(from) {
            return Err(CollaboratorError::Custody(format!("account {from} is frozen")));
        }
        let have = book.wallets.get(&(*asset, *from)).copied().unwrap_or(0);
        if have < amount {
            return Err(CollaboratorError::Custody(format!(
                "insufficient wallet balance: have {have}, need {amount}"
            )));
        }
        let held = book.held.get(asset).copied().unwrap_or(0);
        let held = held
            .checked_add(amount)
            .ok_or_else(|| CollaboratorError::Custody("custody balance overflow".into()))?;
        book.wallets.insert((*asset, *from), have - amount);
        book.held.insert(*asset, held);
        Ok(())
    }

    fn transfer_out(&self, asset: &AssetId, to: &AccountId, amount: u64)
    -> Result<(), CollaboratorError> {
        let mut book = self.book.lock();
        if book.frozen.contains(to) {
            return Err(CollaboratorError::Custody(format!("account {to} is frozen")));
        }
        let held = book.held.get(asset).copied().unwrap_or(0);
        if held < amount {
            return Err(CollaboratorError::Custody(format!(
                "insufficient custody balance: have {held}, need {amount}"
            )));
        }
        let bal = book.wallets.get(&(*asset, *to)).copied().unwrap_or(0);
        let bal = bal
            .checked_add(amount)
            .ok_or_else(|| CollaboratorError::Custody("wallet balance overflow".into()))?;
        book.held.insert(*asset, held - amount);
        book.wallets.insert((*asset, *to), bal);
        Ok(())
    }
}

/// Reward issuance that records credits per account.
#[derive(Debug, Default)]
pub struct MemoryIssuance {
    credited: Mutex<HashMap<(AssetId, AccountId), u128>>,
    halted: AtomicBool,
}

impl MemoryIssuance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, asset: &AssetId, account: &AccountId) -> u128 {
        self.credited.lock().get(&(*asset, *account)).copied().unwrap_or(0)
    }

    /// Sum of all outstanding credits of `asset`.
    pub fn total_issued(&self, asset: &AssetId) -> u128 {
        self.credited
            .lock()
            .iter()
            .filter(|((a, _), _)| a == asset)
            .map(|(_, v)| *v)
            .sum()
    }

    /// While halted, `issue` is refused.
    pub fn set_halted(&self, halted: bool) {
        self.halted.store(halted, Ordering::SeqCst);
    }
}

impl IssuanceService for MemoryIssuance {
    fn issue(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), CollaboratorError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Issuance("issuance halted".into()));
        }
        let mut credited = self.credited.lock();
        let bal = credited.entry((*asset, *to)).or_default();
        *bal = bal
            .checked_add(amount)
            .ok_or_else(|| CollaboratorError::Issuance("credit overflow".into()))?;
        Ok(())
    }

    fn revoke(&self, asset: &AssetId, from: &AccountId, amount: u128)
    -> Result<(), CollaboratorError> {
        let mut credited = self.credited.lock();
        let bal = credited.entry((*asset, *from)).or_default();
        *bal = bal
            .checked_sub(amount)
            .ok_or_else(|| CollaboratorError::Issuance(format!("cannot revoke {amount} from {from}")))?;
        Ok(())
    }
}
