// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::collections::BTreeMap;

use ccm_events::{ElectionEventId, EncryptionParametersRef};

use crate::{ElGamalKeyPair, ElGamalPublicKey, GroupParameters, KeygenError};

/// The key pairs a control component holds for one election event, one per verification-card
/// set. All pairs are generated in the event's group.
pub struct ElectionKeySet {
    election_event_id: ElectionEventId,
    group: GroupParameters,
    keys: BTreeMap<EncryptionParametersRef, ElGamalKeyPair>,
}

impl ElectionKeySet {
    pub fn new(election_event_id: ElectionEventId, group: GroupParameters) -> Self {
        Self {
            election_event_id,
            group,
            keys: BTreeMap::new(),
        }
    }

    pub fn group(&self) -> &GroupParameters {
        &self.group
    }

    /// Store `key_pair` under `params`, rejecting keys from another group or another event.
    pub fn insert(
        &mut self,
        params: EncryptionParametersRef,
        key_pair: ElGamalKeyPair,
    ) -> Result<Option<ElGamalKeyPair>, KeygenError> {
        self.group.ensure(key_pair.group())?;
        if params.election_event_id != self.election_event_id {
            return Err(KeygenError::InvalidConfiguration(format!(
                "key for election event {} stored in set for {}",
                params.election_event_id, self.election_event_id
            )));
        }
        Ok(self.keys.insert(params, key_pair))
    }

    pub fn get(&self, params: &EncryptionParametersRef) -> Option<&ElGamalKeyPair> {
        self.keys.get(params)
    }

    pub fn public_keys(&self) -> impl Iterator<Item = (&EncryptionParametersRef, &ElGamalPublicKey)> {
        self.keys.iter().map(|(k, v)| (k, v.public_key()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElectionKeyGenerator;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn params(ee: &str, vcs: &str) -> EncryptionParametersRef {
        EncryptionParametersRef {
            election_event_id: ee.into(),
            electoral_authority_id: "ea-1".into(),
            verification_card_set_id: vcs.into(),
        }
    }

    #[test]
    fn keys_are_grouped_per_verification_card_set() {
        let group = GroupParameters::from_u64(23, 11, 2).unwrap();
        let mut generator = ElectionKeyGenerator::new(2, ChaCha20Rng::seed_from_u64(3));
        let mut set = ElectionKeySet::new("ee-1".into(), group.clone());

        let kp = generator.setup_tally_ccm(&group).unwrap();
        assert!(set.insert(params("ee-1", "vcs-1"), kp.clone()).unwrap().is_none());
        set.insert(params("ee-1", "vcs-2"), generator.setup_tally_ccm(&group).unwrap())
            .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(&params("ee-1", "vcs-1")), Some(&kp));
        assert_eq!(set.public_keys().count(), 2);
    }

    #[test]
    fn rejects_foreign_group_and_event() {
        let group = GroupParameters::from_u64(23, 11, 2).unwrap();
        let other = GroupParameters::from_u64(47, 23, 2).unwrap();
        let mut set = ElectionKeySet::new("ee-1".into(), group.clone());

        let foreign = ElectionKeyGenerator::new(1, ChaCha20Rng::seed_from_u64(1))
            .setup_tally_ccm(&other)
            .unwrap();
        assert!(matches!(
            set.insert(params("ee-1", "vcs-1"), foreign),
            Err(KeygenError::GroupMismatch { .. })
        ));

        let kp = ElectionKeyGenerator::new(1, ChaCha20Rng::seed_from_u64(1))
            .setup_tally_ccm(&group)
            .unwrap();
        assert!(set.insert(params("ee-2", "vcs-1"), kp).is_err());
        assert!(set.is_empty());
    }
}
