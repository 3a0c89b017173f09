use crate::LedgerError;
use unspent_types::{Address, OutputId, TxId};

/// Explicit per-invocation context threaded into every mutating operation.
///
/// Every output created during the invocation takes the next id from here, so
/// outputs created by one operation (recipient plus change) get distinct keys
/// ordered by creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invocation {
    tx_id: TxId,
    next_seq: u32,
}

impl Invocation {
    pub fn new(tx_id: TxId) -> Self {
        Self { tx_id, next_seq: 0 }
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn next_output_id(&mut self) -> Result<OutputId, LedgerError> {
        let id = OutputId {
            tx: self.tx_id,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.checked_add(1).ok_or(LedgerError::Overflow)?;
        Ok(id)
    }
}

/// Identity of whoever submitted the invocation, as established by the runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub address: Address,
    pub admin: bool,
}

impl Caller {
    pub fn user(address: Address) -> Self {
        Self {
            address,
            admin: false,
        }
    }

    pub fn admin(address: Address) -> Self {
        Self {
            address,
            admin: true,
        }
    }

    fn may_act_for(&self, owner: &Address) -> bool {
        self.admin || &self.address == owner
    }

    pub(crate) fn authorize_owner(
        &self,
        owner: &Address,
        operation: &'static str,
    ) -> Result<(), LedgerError> {
        if self.may_act_for(owner) {
            return Ok(());
        }
        Err(LedgerError::Unauthorized {
            caller: self.address.clone(),
            operation,
        })
    }

    pub(crate) fn authorize_admin(&self, operation: &'static str) -> Result<AdminScope, LedgerError> {
        AdminScope::grant(self).ok_or_else(|| LedgerError::Unauthorized {
            caller: self.address.clone(),
            operation,
        })
    }
}

/// Proof that an administrative capability check passed.
///
/// Symbol-wide operations take one of these instead of inferring their scope
/// from the caller.
#[derive(Debug)]
pub struct AdminScope {
    _private: (),
}

impl AdminScope {
    pub fn grant(caller: &Caller) -> Option<Self> {
        caller.admin.then_some(Self { _private: () })
    }
}
