//! Yield metrics derived from settlement-period history.

mod windows;

pub use windows::{vault_age_days, yield_windows, WindowYields, SECONDS_PER_YEAR};
