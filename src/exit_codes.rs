/// Exit codes for embedme
///
/// CI jobs running `embedme --verify` only need to distinguish success from
/// failure, so every failure shares one code.
/// Success - every document is up to date or was written
pub const SUCCESS: i32 = 0;

/// Failure - a verify difference, a fatal block error, an unreadable document or invalid usage
pub const FAILURE: i32 = 1;

/// Helper functions for consistent exit behavior
pub mod exit {
    use super::{FAILURE, SUCCESS};

    /// Exit with success code (0)
    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    /// Exit with failure code (1)
    pub fn failure() -> ! {
        std::process::exit(FAILURE);
    }
}
