use std::io::Write;

use tcpdrop::symbols::SymbolTable;

const KALLSYMS: &str = "\
ffffffff81000000 T _stext
ffffffff81a3c2d0 T tcp_v4_rcv
ffffffff81a3b100 t tcp_v4_do_rcv
ffffffff81a3b100 t tcp_v4_do_rcv_alias
not-hex T broken
ffffffff81a40000
ffffffffc0a01000 t nf_hook_slow\t[nf_tables]
";

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(KALLSYMS.as_bytes()).unwrap();

    let table = SymbolTable::load(file.path());

    // Two malformed lines skipped
    assert_eq!(table.len(), 5);
    assert_eq!(table.resolve(0xffff_ffff_81a3_c2d0), "tcp_v4_rcv+0x0");
    assert_eq!(table.resolve(0xffff_ffff_81a3_c3f2), "tcp_v4_rcv+0x122");
    assert_eq!(table.resolve(0xffff_ffff_c0a0_1010), "nf_hook_slow+0x10");
    // Below the first symbol
    assert_eq!(table.resolve(0x1000), "0x1000");
}

#[test]
fn test_far_from_any_symbol_is_raw_hex() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(KALLSYMS.as_bytes()).unwrap();

    let table = SymbolTable::load(file.path());

    assert_eq!(table.resolve(0xffff_ffff_c0b0_0000), "0xffffffffc0b00000");
}

#[test]
fn test_missing_source_degrades_to_hex() {
    let dir = tempfile::tempdir().unwrap();
    let table = SymbolTable::load(dir.path().join("kallsyms"));

    assert!(table.is_empty());
    assert_eq!(table.resolve(0xffff_ffff_81a3_c2d0), "0xffffffff81a3c2d0");
}

#[test]
fn test_restricted_kallsyms_is_discarded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "0000000000000000 T _stext").unwrap();
    writeln!(file, "0000000000000000 T tcp_v4_rcv").unwrap();

    let table = SymbolTable::load(file.path());

    assert!(table.is_empty());
    assert_eq!(table.resolve(0x10), "0x10");
}
