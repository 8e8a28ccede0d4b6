// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::{fs, sync::Arc};

use anyhow::Result;
use ccm_config::NodeConfig;
use ccm_events::{ElectionEventId, ElectoralAuthorityId, EncryptionParametersRef, VerificationCardSetId};
use ccm_keygen::{
    ElGamalKeyPair, ElGamalPrivateKey, ElGamalPublicKey, ElectionKeyGenerator, ElectionKeySet,
    GroupParameters,
};
use ccm_keyshare::{FileSystemToken, ShareError, ShareManager, SoftToken, TokenError, TokenSlot};
use num_bigint::BigUint;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tempfile::tempdir;

/// Safe prime group p = 2q + 1 with the quadratic residue 4 as generator.
fn group() -> Result<GroupParameters> {
    Ok(GroupParameters::from_u64(2039, 1019, 4)?)
}

fn config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.keygen.max_write_in_options = 2;
    config
}

fn generate(group: &GroupParameters, seed: u64) -> Result<ElGamalKeyPair> {
    let mut generator = ElectionKeyGenerator::new(config().mu(), ChaCha20Rng::seed_from_u64(seed));
    Ok(generator.setup_tally_ccm(group)?)
}

#[test]
fn control_components_combine_into_election_key() -> Result<()> {
    let group = group()?;
    let pairs = (1..=4)
        .map(|seed| generate(&group, seed))
        .collect::<Result<Vec<_>>>()?;
    for pair in &pairs {
        assert_eq!(pair.len(), 3);
        assert!(pair.verify(&group)?);
    }

    let public_keys: Vec<ElGamalPublicKey> =
        pairs.iter().map(|p| p.public_key().clone()).collect();
    let election_key = ElGamalPublicKey::combine(&group, &public_keys)?;

    // the election private key is the sum of the node exponents
    for i in 0..election_key.len() {
        let sum = pairs.iter().fold(BigUint::from(0u32), |acc, p| {
            acc + p.private_key().exponent(i).unwrap_or_default()
        }) % group.q();
        assert_eq!(election_key.elements()[i], group.exp(&sum));
    }

    let compressed = election_key.compress(&group, 1)?;
    assert_eq!(compressed.len(), 1);
    Ok(())
}

#[test]
fn key_survives_custody_on_filesystem_tokens() -> Result<()> {
    let group = group()?;
    let config = config();
    let pair = generate(&group, 7)?;

    let mount = tempdir()?;
    let slots = (0..config.shares.parts)
        .map(|i| {
            let dir = mount.path().join(format!("token-{i}"));
            fs::create_dir(&dir)?;
            Ok(TokenSlot::new(
                Arc::new(FileSystemToken::new(&dir)),
                format!("pin-{i}").as_str(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut manager = ShareManager::new(ChaCha20Rng::seed_from_u64(99));
    manager.export_to_tokens(pair.private_key().material(), &slots, config.shares.threshold)?;

    // any threshold sized subset of tokens brings the key back
    for subset in [[0usize, 2, 4], [1, 3, 4]] {
        let chosen: Vec<TokenSlot> = subset.iter().map(|&i| slots[i].clone()).collect();
        let material = manager.recover_from_tokens(&chosen)?;
        let private_key = ElGamalPrivateKey::from_material(&group, material)?;
        let recovered = ElGamalKeyPair::from_private(&group, private_key)?;
        assert_eq!(recovered, pair);
    }

    let too_few: Vec<TokenSlot> = slots[..2].to_vec();
    assert!(matches!(
        manager.recover_from_tokens(&too_few),
        Err(ShareError::InsufficientShares { required: 3, found: 2 })
    ));

    let mut wrong_pin = slots[..3].to_vec();
    wrong_pin[1] = TokenSlot::new(wrong_pin[1].token.clone(), "guess");
    assert_eq!(
        manager.recover_from_tokens(&wrong_pin),
        Err(ShareError::Token(TokenError::WrongPin))
    );
    Ok(())
}

#[test]
fn missing_token_aborts_export_before_writing() -> Result<()> {
    let group = group()?;
    let pair = generate(&group, 11)?;

    let present = Arc::new(SoftToken::new("0000"));
    let absent = Arc::new(SoftToken::new("0000"));
    absent.remove();
    let slots = vec![
        TokenSlot::new(present.clone(), "0000"),
        TokenSlot::new(absent, "0000"),
    ];

    let mut manager = ShareManager::new(ChaCha20Rng::seed_from_u64(5));
    assert_eq!(
        manager.export_to_tokens(pair.private_key().material(), &slots, 2),
        Err(ShareError::Token(TokenError::NoTokenPresent))
    );
    assert_eq!(
        manager.recover_from_tokens(&slots[..1]),
        Err(ShareError::Token(TokenError::Blank))
    );
    Ok(())
}

#[test]
fn key_set_tracks_keys_per_verification_card_set() -> Result<()> {
    let group = group()?;
    let event = ElectionEventId::new("ee-2024");
    let mut set = ElectionKeySet::new(event.clone(), group.clone());

    for (seed, vcs) in [(21, "vcs-1"), (22, "vcs-2")] {
        let params = EncryptionParametersRef {
            election_event_id: event.clone(),
            electoral_authority_id: ElectoralAuthorityId::new("ea-1"),
            verification_card_set_id: VerificationCardSetId::new(vcs),
        };
        assert!(set.insert(params, generate(&group, seed)?)?.is_none());
    }
    assert_eq!(set.len(), 2);

    let foreign = GroupParameters::from_u64(23, 11, 2)?;
    let params = EncryptionParametersRef {
        election_event_id: event,
        electoral_authority_id: ElectoralAuthorityId::new("ea-1"),
        verification_card_set_id: VerificationCardSetId::new("vcs-3"),
    };
    assert!(set.insert(params, generate(&foreign, 23)?).is_err());
    Ok(())
}
