//! UI utilities for terminal output.

mod banner;

pub use banner::{print_banner, print_pairing_code};
