// ============================================================================
// Database Connections & Schema Setup
// ============================================================================

pub mod postgres;
pub mod redis;
pub mod scylla;
