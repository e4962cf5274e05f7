//! Audio Module
//!
//! Decoding and the mono signal type fed to feature extraction.

pub mod io;
pub mod signal;

pub use io::{export_wav, load_signal};
pub use signal::Signal;
