use std::fs;

use tempfile::TempDir;
use tempora_core::{Attestation, Op};
use tempora_proof::{
    read_proof_file, stamp_file, write_proof_file, DetachedTimestampFile, ProofError, WriteOptions,
};

fn stamped(data: &[u8], uri: &str) -> DetachedTimestampFile {
    let mut proof = DetachedTimestampFile::from_reader(Op::Sha256, &mut &data[..]).unwrap();
    proof
        .timestamp_mut()
        .add_op(Op::Append(b"nonce".to_vec()))
        .add_op(Op::Sha256)
        .add_attestation(Attestation::pending(uri).unwrap());
    proof
}

#[test]
fn test_write_read_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let proof_path = temp_dir.path().join("data.ots");

    let proof = stamped(b"hello world", "https://a.example.com");
    write_proof_file(&proof_path, &proof, &WriteOptions::default()).unwrap();

    let restored = read_proof_file(&proof_path).unwrap();
    assert_eq!(restored, proof);
    assert_eq!(fs::read(&proof_path).unwrap(), proof.to_bytes().unwrap());
}

#[test]
fn test_stamp_file_hashes_contents() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = temp_dir.path().join("data.txt");
    fs::write(&data_path, b"").unwrap();

    let proof = stamp_file(&data_path, Op::Sha256).unwrap();
    assert_eq!(
        hex::encode(proof.file_digest()),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );

    let proof = stamp_file(&data_path, Op::Sha1).unwrap();
    assert_eq!(
        hex::encode(proof.file_digest()),
        "da39a3ee5e6b4b0d3255bfef95601890afd80709"
    );
}

#[test]
fn test_refuses_to_overwrite_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let proof_path = temp_dir.path().join("data.ots");

    let first = stamped(b"data", "https://a.example.com");
    write_proof_file(&proof_path, &first, &WriteOptions::default()).unwrap();

    let second = stamped(b"data", "https://b.example.com");
    let err = write_proof_file(&proof_path, &second, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, ProofError::FileExists(path) if path == proof_path));
    assert_eq!(read_proof_file(&proof_path).unwrap(), first);
}

#[test]
fn test_overwrite_replaces_contents() {
    let temp_dir = TempDir::new().unwrap();
    let proof_path = temp_dir.path().join("data.ots");

    let first = stamped(b"a much longer input so the old file is longer", "https://a.example.com");
    write_proof_file(&proof_path, &first, &WriteOptions::default()).unwrap();

    let second = stamped(b"x", "b");
    let options = WriteOptions {
        sync: true,
        overwrite: true,
    };
    write_proof_file(&proof_path, &second, &options).unwrap();
    assert_eq!(read_proof_file(&proof_path).unwrap(), second);
}

#[test]
fn test_empty_proof_leaves_no_file() {
    let temp_dir = TempDir::new().unwrap();
    let proof_path = temp_dir.path().join("empty.ots");

    let proof = DetachedTimestampFile::from_reader(Op::Sha256, &mut &b"data"[..]).unwrap();
    let err = write_proof_file(&proof_path, &proof, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, ProofError::Timestamp(_)));
    assert!(!proof_path.exists());
}

#[test]
fn test_merge_files_from_two_calendars() {
    let temp_dir = TempDir::new().unwrap();
    let a_path = temp_dir.path().join("a.ots");
    let b_path = temp_dir.path().join("b.ots");

    let options = WriteOptions::default();
    write_proof_file(&a_path, &stamped(b"data", "https://a.example.com"), &options).unwrap();
    write_proof_file(&b_path, &stamped(b"data", "https://b.example.com"), &options).unwrap();

    let mut merged = read_proof_file(&a_path).unwrap();
    merged.merge(read_proof_file(&b_path).unwrap()).unwrap();

    // Same nonce path, so the two calendars share one branch.
    assert_eq!(merged.timestamp().ops().len(), 1);
    let uris: Vec<String> = merged
        .timestamp()
        .all_attestations()
        .map(|(_, att)| att.to_string())
        .collect();
    assert_eq!(
        uris,
        vec![
            "PendingAttestation('https://a.example.com')",
            "PendingAttestation('https://b.example.com')",
        ]
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = read_proof_file(temp_dir.path().join("absent.ots")).unwrap_err();
    assert!(matches!(err, ProofError::Io(_)));
}
