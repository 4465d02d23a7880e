use clarity::Uint256;
use num_traits::CheckedMul;
use std::u64::MAX as U64MAX;

pub fn downcast_uint256(input: Uint256) -> Option<u64> {
    if input >= U64MAX.into() {
        None
    } else {
        let val = input.to_be_bytes();
        let mut lower_bytes: [u8; 8] = [0; 8];
        // get the 'lowest' 8 bytes from a 256 bit integer
        lower_bytes.copy_from_slice(&val[24..32]);
        Some(u64::from_be_bytes(lower_bytes))
    }
}

/// Fixed width big endian representation of a 256 bit integer, used anywhere
/// an amount is part of a store key so that byte order matches numeric order
pub fn uint256_to_key_bytes(input: Uint256) -> [u8; 32] {
    input.to_be_bytes()
}

/// Computes ceil(amount / 10000) * basis_points, the minimum fee for an amount
/// given a fee rate in basis points. None if the fee does not fit in 256 bits
pub fn basis_points_fee(amount: Uint256, basis_points: u64) -> Option<Uint256> {
    let ten_thousand: Uint256 = 10_000u64.into();
    let units = if amount % ten_thousand == Uint256::from(0u8) {
        amount / ten_thousand
    } else {
        amount / ten_thousand + Uint256::from(1u8)
    };
    units.checked_mul(&Uint256::from(basis_points))
}

#[test]
fn test_downcast_nonce() {
    let mut i = 0u64;
    while i < 100_000 {
        assert_eq!(i, downcast_uint256(i.into()).unwrap());
        i += 1
    }
    let mut i: u64 = std::u32::MAX.into();
    i -= 100;
    let end = i + 100_000;
    while i < end {
        assert_eq!(i, downcast_uint256(i.into()).unwrap());
        i += 1
    }
    assert_eq!(downcast_uint256(U64MAX.into()), None);
}

#[test]
fn test_key_bytes_order() {
    let small = uint256_to_key_bytes(255u64.into());
    let big = uint256_to_key_bytes(256u64.into());
    assert_eq!(small[31], 255);
    assert_eq!(big[30], 1);
    assert!(small < big);
    assert_eq!(uint256_to_key_bytes(0u8.into()), [0u8; 32]);
}

#[test]
fn test_basis_points_fee() {
    assert_eq!(basis_points_fee(10_000u64.into(), 2), Some(2u8.into()));
    assert_eq!(basis_points_fee(10_001u64.into(), 2), Some(4u8.into()));
    assert_eq!(basis_points_fee(1u64.into(), 0), Some(0u8.into()));
    let max = Uint256::from_be_bytes(&[0xff; 32]);
    assert_eq!(basis_points_fee(max, 10_000), None);
}
