//! JSON wire format for the six outgoing messages and three incoming
//! messages of the protocol. Every type maps 1:1 onto the
//! field-type table in : `int32`/`int64` as JSON numbers, `float`
//! as a JSON number with a decimal point, `date`/`date-time` in the stated
//! textual formats, `bytes` as uppercase hex.

mod incoming;
mod outgoing;
mod wire;

pub use incoming::{ConfigureAccount, FinalizeTransfer, IncomingMessage, PrepareTransfer};
pub use outgoing::{
    AccountPurge, AccountTransfer, AccountUpdate, FinalizedTransfer, OutgoingMessage,
    PreparedTransfer as PreparedTransferMessage, RejectedConfig, RejectedTransfer,
};
pub use wire::{HexBytes, WireDate};
