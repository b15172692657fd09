//! WebAssembly bindings for the Micro CPU family.
//!
//! This module provides JavaScript-callable interfaces to the emulators, assemblers
//! and disassembler, so a browser page can edit, assemble and single-step programs.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::MicroEmulator;
