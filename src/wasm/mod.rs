//! WebAssembly bindings for lib4510.
//!
//! Only the instruction codec is exported; the debugger itself needs a
//! serial link.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::{assemble_line, disassemble, AssemblyResult, DisassemblyLine};
