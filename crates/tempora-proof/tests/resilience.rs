use std::fs;

use tempfile::TempDir;
use tempora_core::{Attestation, DecodeError, Op};
use tempora_proof::{
    read_proof_file, write_proof_file, DetachedTimestampFile, ProofError, WriteOptions,
    HEADER_MAGIC,
};

fn write_sample(dir: &TempDir) -> (std::path::PathBuf, Vec<u8>) {
    let path = dir.path().join("sample.ots");
    let mut proof = DetachedTimestampFile::from_reader(Op::Sha256, &mut &b"sample"[..]).unwrap();
    proof
        .timestamp_mut()
        .add_op(Op::Prepend(b"salt".to_vec()))
        .add_op(Op::Sha256)
        .add_attestation(Attestation::bitcoin(500_000));
    proof
        .timestamp_mut()
        .add_attestation(Attestation::pending("https://a.example.com").unwrap());
    write_proof_file(&path, &proof, &WriteOptions::default()).unwrap();
    let bytes = fs::read(&path).unwrap();
    (path, bytes)
}

fn decode_error(result: Result<DetachedTimestampFile, ProofError>) -> DecodeError {
    match result.unwrap_err() {
        ProofError::Decode(err) => err,
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn test_every_truncation_is_detected() {
    let temp_dir = TempDir::new().unwrap();
    let (path, bytes) = write_sample(&temp_dir);

    for len in 0..bytes.len() {
        fs::write(&path, &bytes[..len]).unwrap();
        let err = decode_error(read_proof_file(&path));
        assert!(
            matches!(err, DecodeError::Truncated { .. }),
            "length {len}: expected truncation, got {err:?}"
        );
    }
}

#[test]
fn test_corrupt_magic() {
    let temp_dir = TempDir::new().unwrap();
    let (path, mut bytes) = write_sample(&temp_dir);

    bytes[1] = b'X';
    fs::write(&path, &bytes).unwrap();
    assert_eq!(
        decode_error(read_proof_file(&path)),
        DecodeError::BadMagic { offset: 0 }
    );
}

#[test]
fn test_corrupt_file_hash_opcode() {
    let temp_dir = TempDir::new().unwrap();
    let (path, mut bytes) = write_sample(&temp_dir);

    let opcode_offset = HEADER_MAGIC.len() + 1 + 32;
    assert_eq!(bytes[opcode_offset], 0x08);
    bytes[opcode_offset] = 0x42;
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        decode_error(read_proof_file(&path)),
        DecodeError::Malformed { offset, .. } if offset == opcode_offset
    ));
}

#[test]
fn test_trailing_garbage_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (path, mut bytes) = write_sample(&temp_dir);

    let end = bytes.len();
    bytes.push(0x00);
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(
        decode_error(read_proof_file(&path)),
        DecodeError::Malformed { offset, .. } if offset == end
    ));
}

#[test]
fn test_single_byte_flips_never_panic() {
    let temp_dir = TempDir::new().unwrap();
    let (_, bytes) = write_sample(&temp_dir);

    for i in 0..bytes.len() {
        for flip in [0x01u8, 0x80, 0xff] {
            let mut corrupted = bytes.clone();
            corrupted[i] ^= flip;
            // Either outcome is fine; what matters is a clean return.
            let _ = DetachedTimestampFile::from_bytes(&corrupted);
        }
    }
}
