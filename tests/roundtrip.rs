//! Format a volume, populate it, save it to disk, reopen it, and check the
//! reopened volume matches. Modeled on `rrbutani-fatfs`'s
//! `tests/file_backed.rs` pattern of driving the public API against a real
//! temp-file-backed image rather than an in-memory fixture only.

use fat12_rs::clock::FixedClock;
use fat12_rs::fs::FileSystem;

#[test]
fn format_populate_save_reopen_roundtrip() {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("floppy.img");

    let mut fs = FileSystem::format(0xCAFE_BABE, Some("ROUNDTRIP"))
        .unwrap()
        .with_clock(FixedClock::ymd_hms(2023, 11, 4, 9, 30, 0));

    fs.mkdir("DOCS").unwrap();
    fs.write_file("DOCS/NOTES.TXT", b"first draft").unwrap();
    fs.write_file("README.TXT", b"top level file").unwrap();
    fs.mkdir("DOCS/OLD").unwrap();
    fs.write_file("DOCS/OLD/V1.TXT", b"archived").unwrap();

    fs.save(&path).unwrap();

    let reopened = FileSystem::open(&path).unwrap();
    assert_eq!(reopened.label().unwrap(), "ROUNDTRIP");
    assert_eq!(reopened.read_file("README.TXT").unwrap(), b"top level file");
    assert_eq!(
        reopened.read_file("DOCS/NOTES.TXT").unwrap(),
        b"first draft"
    );
    assert_eq!(
        reopened.read_file("DOCS/OLD/V1.TXT").unwrap(),
        b"archived"
    );

    let root_listing = reopened.list("").unwrap();
    let mut names: Vec<_> = root_listing.iter().map(|e| e.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["DOCS".to_string(), "README.TXT".to_string()]);
}

#[test]
fn delete_and_rename_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("floppy.img");

    let mut fs = FileSystem::format(1, None)
        .unwrap()
        .with_clock(FixedClock::ymd_hms(2023, 1, 1, 0, 0, 0));
    fs.write_file("A.TXT", b"keep me").unwrap();
    fs.write_file("B.TXT", b"delete me").unwrap();
    fs.delete("B.TXT").unwrap();
    fs.rename("A.TXT", "C.TXT").unwrap();
    fs.save(&path).unwrap();

    let reopened = FileSystem::open(&path).unwrap();
    assert!(reopened.read_file("A.TXT").is_err());
    assert!(reopened.read_file("B.TXT").is_err());
    assert_eq!(reopened.read_file("C.TXT").unwrap(), b"keep me");
}

#[test]
fn reopening_a_non_volume_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not_a_floppy.img");
    std::fs::write(&path, vec![0u8; 1_474_560]).unwrap();
    assert!(FileSystem::open(&path).is_err());
}
