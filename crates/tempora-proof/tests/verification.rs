use std::collections::HashMap;

use tempora_core::{Attestation, BlockChain, Op, Timestamp};
use tempora_proof::{
    verify_file, verify_timestamp, AttestationOutcome, BlockHeaderVerifier,
    DetachedTimestampFile, ProofError,
};

/// Known merkle roots and block times, keyed by chain and height.
#[derive(Default)]
struct FakeChain {
    blocks: HashMap<(BlockChain, u64), (Vec<u8>, u64)>,
}

impl BlockHeaderVerifier for FakeChain {
    fn verify(&self, chain: BlockChain, digest: &[u8], height: u64) -> Result<u64, ProofError> {
        let (root, time) = self
            .blocks
            .get(&(chain, height))
            .ok_or_else(|| ProofError::Verification(format!("no block {height}")))?;
        if root.as_slice() != digest {
            return Err(ProofError::Verification("merkle root mismatch".to_string()));
        }
        Ok(*time)
    }
}

fn proof_with_paths() -> (DetachedTimestampFile, Vec<u8>, Vec<u8>) {
    let mut proof = DetachedTimestampFile::from_reader(Op::Sha256, &mut &b"document"[..]).unwrap();
    let root = proof.timestamp_mut();
    root.add_attestation(Attestation::pending("https://a.example.com").unwrap());

    let btc = root.add_op(Op::Append(b"btc".to_vec())).add_op(Op::Sha256);
    btc.add_attestation(Attestation::bitcoin(100));
    let btc_msg = btc.msg().to_vec();

    let ltc = root.add_op(Op::Prepend(b"ltc".to_vec())).add_op(Op::Sha256);
    ltc.add_attestation(Attestation::litecoin(200));
    let ltc_msg = ltc.msg().to_vec();

    (proof, btc_msg, ltc_msg)
}

#[test]
fn test_reports_each_attestation() {
    let (proof, btc_msg, ltc_msg) = proof_with_paths();
    let mut chain = FakeChain::default();
    chain.blocks.insert((BlockChain::Bitcoin, 100), (btc_msg, 1_500_000_000));
    chain.blocks.insert((BlockChain::Litecoin, 200), (ltc_msg, 1_400_000_000));

    let report = verify_timestamp(proof.timestamp(), &chain);
    assert_eq!(report.results.len(), 3);
    assert!(report.is_verified());
    assert_eq!(report.earliest_time(), Some(1_400_000_000));
    assert_eq!(report.pending_uris(), vec!["https://a.example.com"]);
}

#[test]
fn test_failures_do_not_hide_other_paths() {
    let (proof, btc_msg, _) = proof_with_paths();
    let mut chain = FakeChain::default();
    chain.blocks.insert((BlockChain::Bitcoin, 100), (btc_msg, 1_500_000_000));
    chain.blocks.insert((BlockChain::Litecoin, 200), (vec![0u8; 32], 1_400_000_000));

    let report = verify_timestamp(proof.timestamp(), &chain);
    assert_eq!(report.earliest_time(), Some(1_500_000_000));
    assert!(report.results.iter().any(|r| matches!(
        &r.outcome,
        AttestationOutcome::Failed { chain: BlockChain::Litecoin, height: 200, reason }
            if reason.contains("merkle root mismatch")
    )));
}

#[test]
fn test_short_digest_fails_without_asking_verifier() {
    struct Panicking;
    impl BlockHeaderVerifier for Panicking {
        fn verify(&self, _: BlockChain, _: &[u8], _: u64) -> Result<u64, ProofError> {
            panic!("verifier must not be called");
        }
    }

    let mut stamp = Timestamp::new(vec![0u8; 20]);
    stamp.add_attestation(Attestation::bitcoin(1));
    let report = verify_timestamp(&stamp, &Panicking);
    assert!(matches!(report.results[0].outcome, AttestationOutcome::Failed { .. }));
    assert!(!report.is_verified());
}

#[test]
fn test_unknown_attestations_are_skipped() {
    let mut stamp = Timestamp::new(b"m".to_vec());
    stamp.add_attestation(Attestation::unknown([0xee; 8], vec![1, 2, 3]).unwrap());
    let report = verify_timestamp(&stamp, &FakeChain::default());
    assert_eq!(
        report.results[0].outcome,
        AttestationOutcome::Unknown {
            tag: "eeeeeeeeeeeeeeee".to_string()
        }
    );
}

#[test]
fn test_verify_file_checks_digest() {
    let (proof, btc_msg, _) = proof_with_paths();
    let mut chain = FakeChain::default();
    chain.blocks.insert((BlockChain::Bitcoin, 100), (btc_msg, 1_500_000_000));

    let report = verify_file(&proof, &mut &b"document"[..], &chain).unwrap();
    assert!(report.is_verified());

    let err = verify_file(&proof, &mut &b"tampered"[..], &chain).unwrap_err();
    assert!(matches!(err, ProofError::Verification(_)));
}

#[test]
fn test_report_json_shape() {
    let mut stamp = Timestamp::new(vec![0xab; 32]);
    stamp.add_attestation(Attestation::bitcoin(7));
    let mut chain = FakeChain::default();
    chain.blocks.insert((BlockChain::Bitcoin, 7), (vec![0xab; 32], 42));

    let report = verify_timestamp(&stamp, &chain);
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "results": [{
                "msg": hex::encode([0xab; 32]),
                "status": "verified",
                "chain": "bitcoin",
                "height": 7,
                "time": 42
            }]
        })
    );
}
