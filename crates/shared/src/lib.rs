//! Types shared between the dapp core and whatever presentation layer drives it.

pub mod domain;
pub mod error;
pub mod protocol;
