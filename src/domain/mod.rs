// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each domain has its own subdirectory with value objects, errors, the
// entity itself and an application service.
//
// - wallet:  versioned entity persisted with optimistic locking
// - library: library card that records domain events for the outbox
//
// ============================================================================

pub mod wallet;
pub mod library;
