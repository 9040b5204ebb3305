//! Building blocks shared by command and job handlers. Each helper runs inside
//! the caller's unit of work.

pub mod combat;
pub mod construction;
pub mod ledger;
pub mod reconcile;
pub mod training;
