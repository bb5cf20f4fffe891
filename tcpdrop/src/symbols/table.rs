use log::{info, warn};
use rustc_demangle::try_demangle;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Live kernel symbol listing
pub const DEFAULT_SYMBOL_SOURCE: &str = "/proc/kallsyms";

/// Offsets at or beyond this distance from the nearest symbol resolve to a raw address
pub const MAX_SYMBOL_DISTANCE: u64 = 0x10000;

/// A named kernel function or object and its load address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub address: u64,
    pub name: String,
}

impl Symbol {
    pub fn new(address: u64, name: impl Into<String>) -> Self {
        Self { address, name: name.into() }
    }
}

/// Address-sorted kernel symbol table
///
/// Read-only after construction. Duplicate addresses are allowed; lookups then
/// report whichever of them sorts last.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Build a table from unsorted symbols
    #[must_use]
    pub fn from_symbols(mut symbols: Vec<Symbol>) -> Self {
        symbols.sort_by_key(|s| s.address);
        Self { symbols }
    }

    /// Parse a kallsyms-style listing
    ///
    /// Lines with fewer than three fields or a non-hex address are skipped.
    /// A trailing `[module]` column is ignored.
    ///
    /// # Errors
    /// Returns an error if reading from `reader` fails.
    pub fn parse<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut symbols = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let (Some(addr), Some(_kind), Some(name)) = (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            let Ok(address) = u64::from_str_radix(addr, 16) else {
                continue;
            };
            symbols.push(Symbol { address, name: demangle_name(name) });
        }

        Ok(Self::from_symbols(symbols))
    }

    /// Load the symbol table from `path`, degrading to an empty table
    ///
    /// Failure to read the source is not fatal: a warning is logged once and
    /// every address will resolve to raw hex.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let table = match File::open(path).and_then(|file| Self::parse(BufReader::new(file))) {
            Ok(table) => table,
            Err(e) => {
                warn!("Could not read kernel symbols from {}: {e}", path.display());
                warn!("   Functions will be shown as raw addresses");
                return Self::default();
            }
        };

        if table.addresses_hidden() {
            warn!(
                "Kernel symbol addresses in {} are hidden (kernel.kptr_restrict); \
                 functions will be shown as raw addresses",
                path.display()
            );
            return Self::default();
        }

        info!("✓ Loaded {} kernel symbols", table.len());
        table
    }

    /// Find the symbol containing `addr`
    #[must_use]
    pub fn lookup(&self, addr: u64) -> Resolved<'_> {
        // Index of the first symbol starting past `addr`
        let idx = self.symbols.partition_point(|s| s.address <= addr);

        if let Some(symbol) = idx.checked_sub(1).map(|i| &self.symbols[i]) {
            let offset = addr - symbol.address;
            if offset < MAX_SYMBOL_DISTANCE {
                return Resolved::Symbol { name: &symbol.name, offset };
            }
        }

        Resolved::Raw(addr)
    }

    /// Resolve `addr` to `name+0xoffset`, or `0xaddr` if no symbol is close enough
    #[must_use]
    pub fn resolve(&self, addr: u64) -> String {
        self.lookup(addr).to_string()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn addresses_hidden(&self) -> bool {
        !self.symbols.is_empty() && self.symbols.iter().all(|s| s.address == 0)
    }
}

/// Result of a symbol lookup, borrowed from the table
///
/// Implements `Display` so event lines can be formatted without an
/// intermediate `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    Symbol { name: &'a str, offset: u64 },
    Raw(u64),
}

impl fmt::Display for Resolved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Symbol { name, offset } => write!(f, "{name}+0x{offset:x}"),
            Resolved::Raw(addr) => write!(f, "0x{addr:x}"),
        }
    }
}

/// Demangle Rust-for-Linux symbols; C symbols pass through unchanged
fn demangle_name(name: &str) -> String {
    if name.starts_with("_R") || name.starts_with("_ZN") {
        if let Ok(demangled) = try_demangle(name) {
            return format!("{demangled:#}");
        }
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::from_symbols(vec![
            Symbol::new(500, "c"),
            Symbol::new(100, "a"),
            Symbol::new(200, "b"),
        ])
    }

    #[test]
    fn test_resolve_inside_symbol() {
        let table = table();
        assert_eq!(table.resolve(250), "b+0x32");
        assert_eq!(table.resolve(199), "a+0x63");
        assert_eq!(table.resolve(200), "b+0x0");
    }

    #[test]
    fn test_resolve_too_far_past_last_symbol() {
        assert_eq!(table().resolve(70_000), "0x11170");
        // Last offset still inside the proximity bound
        assert_eq!(table().resolve(500 + 0xffff), "c+0xffff");
        assert_eq!(table().resolve(500 + 0x10000), format!("0x{:x}", 500 + 0x10000));
    }

    #[test]
    fn test_resolve_before_first_symbol() {
        assert_eq!(table().resolve(50), "0x32");
        assert_eq!(table().lookup(99), Resolved::Raw(99));
    }

    #[test]
    fn test_empty_table_resolves_raw() {
        let table = SymbolTable::default();
        assert!(table.is_empty());
        assert_eq!(table.resolve(0xffff_ffff_81c7_a2b0), "0xffffffff81c7a2b0");
    }

    #[test]
    fn test_duplicate_addresses() {
        let table = SymbolTable::from_symbols(vec![
            Symbol::new(100, "alias"),
            Symbol::new(100, "alias"),
            Symbol::new(300, "next"),
        ]);
        assert_eq!(table.resolve(150), "alias+0x32");
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let input = "\
ffffffff81000000 T _stext
garbage
ffffffff81000010 T
zzzz T not_hex
ffffffff81000100 t nf_hook_slow\t[nf_tables]

ffffffff81000080 T tcp_v4_rcv
";
        let table = SymbolTable::parse(input.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.resolve(0xffff_ffff_8100_0084), "tcp_v4_rcv+0x4");
        assert_eq!(table.resolve(0xffff_ffff_8100_0100), "nf_hook_slow+0x0");
    }

    #[test]
    fn test_rust_symbols_are_demangled() {
        let input = "ffffffffc0001000 t _ZN6kernel5print11call_printk17h0123456789abcdefE [rust_mod]\n";
        let table = SymbolTable::parse(input.as_bytes()).unwrap();
        assert_eq!(table.resolve(0xffff_ffff_c000_1010), "kernel::print::call_printk+0x10");
    }

    #[test]
    fn test_hidden_addresses_detected() {
        let input = "0000000000000000 T _stext\n0000000000000000 T tcp_v4_rcv\n";
        let table = SymbolTable::parse(input.as_bytes()).unwrap();
        assert!(table.addresses_hidden());
        assert!(!SymbolTable::default().addresses_hidden());
    }
}
