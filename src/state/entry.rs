use super::account::AccountState;

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum EntryStatus {
    Clean,
    Dirty,
    Committed,
}

/// Cache slot for one address. `account: None` records that the account is
/// known not to exist (or was destroyed).
#[derive(Debug, Clone)]
pub struct AccountEntry {
    pub account: Option<AccountState>,
    pub status: EntryStatus,
}

impl AccountEntry {
    pub fn new_clean(account: Option<AccountState>) -> AccountEntry {
        AccountEntry {
            account,
            status: EntryStatus::Clean,
        }
    }

    pub fn new_dirty(account: Option<AccountState>) -> AccountEntry {
        AccountEntry {
            account,
            status: EntryStatus::Dirty,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.status == EntryStatus::Dirty
    }

    /// Clone account data including modified storage keys.
    pub fn clone_dirty(&self) -> AccountEntry {
        AccountEntry {
            account: self.account.as_ref().map(AccountState::clone_dirty),
            status: self.status,
        }
    }

    /// Overwrite with a checkpointed entry during revert.
    pub fn merge(&mut self, other: AccountEntry) {
        self.status = other.status;
        match other.account {
            Some(account) => {
                if let Some(ref mut ours) = self.account {
                    ours.merge(account);
                } else {
                    self.account = Some(account);
                }
            }
            None => self.account = None,
        }
    }
}
