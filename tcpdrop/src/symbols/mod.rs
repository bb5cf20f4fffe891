//! # Kernel Symbol Resolution
//!
//! Converts the raw kernel addresses carried by drop records into
//! `function+0xoffset` strings.
//!
//! ## Symbol Source
//!
//! The kernel exports its symbol table as text in `/proc/kallsyms`:
//!
//! ```text
//! ffffffff81000000 T _stext
//! ffffffff81c7a2b0 T tcp_v4_rcv
//! ffffffffc0a01000 t nf_hook_slow   [nf_tables]
//! ```
//!
//! The table is loaded once at startup (~200k entries), sorted by address and
//! never modified again, so it is shared across tasks as `Arc<SymbolTable>`.
//!
//! ## Resolution
//!
//! A lookup is a binary search for the last symbol starting at or below the
//! address. Addresses more than 64KB past that symbol are printed raw: they
//! are far more likely to be in an unrelated or unmapped region than inside
//! the function.
//!
//! ## Degraded Modes
//!
//! - Unreadable source (not root, no procfs): empty table, raw addresses
//! - `kernel.kptr_restrict` hides addresses as zeros: table dropped, raw addresses

pub mod table;

pub use table::{Resolved, Symbol, SymbolTable, DEFAULT_SYMBOL_SOURCE, MAX_SYMBOL_DISTANCE};
