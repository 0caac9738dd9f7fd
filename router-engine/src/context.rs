//! Call context of an entrypoint invocation.

use num_bigint::BigUint;
use router_common::models::Address;

/// Who is calling and how much native value is attached to the call.
///
/// The attached value is only moved once the callee accepts the call, so a call rejected at entry
/// leaves the sender's native balance untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    pub value: BigUint,
}

impl CallContext {
    pub fn new(sender: Address) -> Self {
        Self { sender, value: BigUint::default() }
    }

    pub fn with_value(mut self, value: BigUint) -> Self {
        self.value = value;
        self
    }
}
