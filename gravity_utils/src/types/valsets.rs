use clarity::Address as EthAddress;
use clarity::Signature as EthSignature;
use clarity::Uint256;
use deep_space::Address as CosmosAddress;
use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fmt,
};

/// The total power in the Gravity bridge is normalized to u32::MAX every
/// time a validator set is created. So this is the total power
pub const TOTAL_GRAVITY_POWER: u64 = u32::MAX as u64;
/// Mirror of constant_powerThreshold in Gravity.sol
pub const GRAVITY_POWER_TO_PASS: u64 = 2863311530;
/// A valset is requested whenever the current power distribution differs from
/// the last stored one by more than this fraction
pub const SIGNIFICANT_POWER_DIFF: f32 = 0.05;

/// This trait implements an overarching interface for signature confirmations
/// so that they can all use the same method to order signatures
pub trait Confirm {
    fn get_eth_address(&self) -> EthAddress;
    fn get_signature(&self) -> EthSignature;
}

/// A validator's signature over a valset checkpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValsetConfirm {
    pub nonce: u64,
    pub orchestrator: CosmosAddress,
    pub eth_address: EthAddress,
    pub eth_signature: EthSignature,
}

impl Confirm for ValsetConfirm {
    fn get_eth_address(&self) -> EthAddress {
        self.eth_address
    }
    fn get_signature(&self) -> EthSignature {
        self.eth_signature.clone()
    }
}

/// a list of validators, powers, and eth addresses at a given block height
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Valset {
    /// The strictly increasing nonce value used to prevent
    /// validator set update replay
    pub nonce: u64,
    /// The Cosmos block height this snapshot was taken at, not part of the checkpoint
    pub height: u64,
    /// Members of the validator set, these are the Ethereum keys of
    /// the Cosmos validator set at the time of creation along with
    /// normalized powers for them
    pub members: Vec<ValsetMember>,
    /// An optional reward to be issued to the Relayer on Ethereum
    pub reward_amount: Uint256,
    /// An optional reward to be issued to the Relayer on Ethereum
    pub reward_token: Option<EthAddress>,
}

impl Valset {
    /// If this is false the validator set is invalid, as it does not
    /// have enough validators with enough voting power to ever pass
    /// anything on the bridge
    pub fn enough_power(&self) -> bool {
        self.get_total_power() > GRAVITY_POWER_TO_PASS
    }

    /// Gets the total voting power in this validator set
    pub fn get_total_power(&self) -> u64 {
        let mut total = 0;
        for val in self.members.iter() {
            total += val.power;
        }
        total
    }

    /// A utility function to provide a HashMap of members for easy lookups
    pub fn to_hashmap(&self) -> HashMap<EthAddress, u64> {
        let mut res = HashMap::new();
        for item in self.members.iter() {
            res.insert(item.eth_address, item.power);
        }
        res
    }

    /// A utility function to provide a HashSet of members for union operations
    pub fn to_hashset(&self) -> HashSet<EthAddress> {
        let mut res = HashSet::new();
        for item in self.members.iter() {
            res.insert(item.eth_address);
        }
        res
    }

    pub fn to_arrays(&self) -> (Vec<EthAddress>, Vec<u64>) {
        let mut addresses = Vec::new();
        let mut powers = Vec::new();
        for i in self.members.iter() {
            addresses.push(i.eth_address);
            powers.push(i.power)
        }
        (addresses, powers)
    }

    /// This function takes the current valset and compares it to a provided one
    /// returning a percentage difference in their power allocation. This is used
    /// to decide when new validator sets are requested. In theory an error here,
    /// if unnoticed for long enough, could allow funds to be stolen from the bridge
    /// without the validators in question still having stake to lose.
    /// Returned value must be less than or equal to two
    pub fn power_diff(&self, other: &Valset) -> f32 {
        let mut total_power_diff = 0u64;
        let a = self.to_hashmap();
        let b = other.to_hashmap();
        let a_map = self.to_hashset();
        let b_map = other.to_hashset();
        // items in A and B, we go through these and compute the absolute value of the
        // difference in power and sum it.
        let intersection = a_map.intersection(&b_map);
        // items in A but not in B or vice versa, since we're just trying to compute the difference
        // we can simply sum all of these up.
        let symmetric_difference = a_map.symmetric_difference(&b_map);
        for item in symmetric_difference {
            if let Some(power) = a.get(item).or_else(|| b.get(item)) {
                total_power_diff += power;
            }
        }
        for item in intersection {
            // can't panic since there must be an entry for both.
            let power_a = a[item];
            let power_b = b[item];
            if power_a > power_b {
                total_power_diff += power_a - power_b;
            } else {
                total_power_diff += power_b - power_a;
            }
        }

        (total_power_diff as f32) / (u32::MAX as f32)
    }
}

/// a single Ethereum key and its normalized share of the bridge power
#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct ValsetMember {
    // ord sorts on the first member first, so this produces the correct sorting
    pub power: u64,
    pub eth_address: EthAddress,
}

impl Ord for ValsetMember {
    // Validator sets are sorted Greatest to Least, this isn't the convention
    // for any standard sorting implementation and Rust doesn't
    // really like it when you implement sort yourself. It prefers
    // Ord. So here we implement Ord with the Eth address sorting
    // reversed, then we can call .sort and .reverse and get
    // power descending with ties broken by ascending address.
    fn cmp(&self, other: &Self) -> Ordering {
        if self.power != other.power {
            self.power.cmp(&other.power)
        } else {
            self.eth_address.cmp(&other.eth_address).reverse()
        }
    }
}

impl PartialOrd for ValsetMember {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl ValsetMember {
    pub fn display_vec(input: &[ValsetMember]) -> String {
        let mut out = String::new();
        for val in input.iter() {
            out += &val.to_string()
        }
        out
    }
}

impl fmt::Display for ValsetMember {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address: {} Power: {}", self.eth_address, self.power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::thread_rng;

    fn member(power: u64, address: &str) -> ValsetMember {
        ValsetMember {
            power,
            eth_address: address.parse().unwrap(),
        }
    }

    #[test]
    fn test_valset_member_sorting() {
        let correct = vec![
            member(685294939, "0x479FFc856Cdfa0f5D1AE6Fa61915b01351A7773D"),
            member(678509841, "0x6db48cBBCeD754bDc760720e38E456144e83269b"),
            member(671724742, "0x0A7254b318dd742A3086882321C27779B4B642a6"),
            member(671724742, "0x454330deAaB759468065d08F2b3B0562caBe1dD1"),
            member(671724742, "0x8E91960d704Df3fF24ECAb78AB9df1B5D9144140"),
            member(617443955, "0x3511A211A6759d48d107898302042d1301187BA9"),
        ];
        let mut rng = thread_rng();
        for _ in 0..100 {
            let mut shuffled = correct.clone();
            shuffled.shuffle(&mut rng);
            shuffled.sort();
            shuffled.reverse();
            assert_eq!(shuffled, correct);
        }
    }

    #[test]
    fn test_power_diff() {
        let a = Valset {
            members: vec![
                member(u32::MAX as u64 / 2, "0x479FFc856Cdfa0f5D1AE6Fa61915b01351A7773D"),
                member(u32::MAX as u64 / 2, "0x6db48cBBCeD754bDc760720e38E456144e83269b"),
            ],
            ..Default::default()
        };
        assert_eq!(a.power_diff(&a), 0.0);

        let mut b = a.clone();
        b.members[1] = member(u32::MAX as u64 / 2, "0x0A7254b318dd742A3086882321C27779B4B642a6");
        // one member fully swapped out counts its power twice
        assert!((a.power_diff(&b) - 1.0).abs() < 0.001);

        let empty = Valset::default();
        assert!((a.power_diff(&empty) - 1.0).abs() < 0.001);
        assert!(a.power_diff(&b) > SIGNIFICANT_POWER_DIFF);
    }
}
