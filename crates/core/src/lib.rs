//! uasmc-core: host-type primitives shared by the `uasmc` whole-program
//! compiler.
//!
//! Kept separate from `uasmc-compiler` the way the teacher's workspace keeps
//! `seq-core` separate from `seq-compiler`: this crate knows only about the
//! VM's typed-data vocabulary and signature-string conventions, not about
//! the source language's syntax or the compiler's pipeline.

pub mod sanitize;
pub mod type_id;
pub mod vm_type;

pub use sanitize::{build_signature, sanitize_host_name, sanitize_signature_part};
pub use type_id::TypeId;
pub use vm_type::VmType;
