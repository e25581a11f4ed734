//! Cache level tests.



/// Clean and invalidate range walks.
pub mod clean_invalidate;
