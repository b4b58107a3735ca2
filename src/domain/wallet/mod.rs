// ============================================================================
// Wallet Domain - Optimistic Locking Example
// ============================================================================
//
// - Value objects (WalletId, Currency, Version)
// - Errors (WalletError)
// - Entity (Wallet with balance rules)
// - Service (read-modify-write cycles with retry on version conflicts)
//
// Persistence lives in crate::persistence::wallet.
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod service;

pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use service::*;
