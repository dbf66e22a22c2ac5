//! Solidity ABI encoding for the calls the dashboards make.
//!
//! Covers exactly the parameter kinds the registry, escrow and token use:
//! `uint256`, `address`, `bool`, `bytes32`, `string` and `uint256[]` on the
//! way in; the same plus arrays of tuples on the way out.

use haki_types::{keccak256, Address, ContractError, H256, U256};

use crate::ports::ContractResult;

const WORD: usize = 32;

/// First four bytes of the Keccak-256 of a function signature.
pub(crate) fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.as_bytes()[..4]);
    out
}

/// Topic 0 of an event log.
pub(crate) fn event_topic(signature: &str) -> H256 {
    keccak256(signature.as_bytes())
}

/// A call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AbiValue {
    Uint(U256),
    Address(Address),
    Bool(bool),
    Bytes32(H256),
    String(String),
    UintArray(Vec<U256>),
}

impl From<u64> for AbiValue {
    fn from(value: u64) -> Self {
        AbiValue::Uint(U256::from(value))
    }
}

fn uint_word(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

fn pad_to_word(bytes: &mut Vec<u8>) {
    let rem = bytes.len() % WORD;
    if rem != 0 {
        bytes.resize(bytes.len() + WORD - rem, 0);
    }
}

/// Calldata for `signature` applied to `args`.
pub(crate) fn encode_call(signature: &str, args: &[AbiValue]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_args(args));
    out
}

fn encode_args(args: &[AbiValue]) -> Vec<u8> {
    let head_len = WORD * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            AbiValue::Uint(value) => head.extend(uint_word(*value)),
            AbiValue::Address(address) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(address.as_bytes());
                head.extend(word);
            }
            AbiValue::Bool(flag) => head.extend(uint_word(U256::from(u8::from(*flag)))),
            AbiValue::Bytes32(hash) => head.extend(hash.as_bytes()),
            AbiValue::String(text) => {
                head.extend(uint_word(U256::from(head_len + tail.len())));
                tail.extend(uint_word(U256::from(text.len())));
                tail.extend(text.as_bytes());
                pad_to_word(&mut tail);
            }
            AbiValue::UintArray(values) => {
                head.extend(uint_word(U256::from(head_len + tail.len())));
                tail.extend(uint_word(U256::from(values.len())));
                for value in values {
                    tail.extend(uint_word(*value));
                }
            }
        }
    }

    head.extend(tail);
    head
}

fn truncated(what: &str) -> ContractError {
    ContractError::Decode(format!("return data too short for {}", what))
}

/// Reads return data slot by slot.
///
/// Slots are 32-byte words counted from `base`; dynamic values are reached
/// through offsets that are relative to the enclosing tuple or array, which
/// is what [`Decoder::tail`] and [`Decoder::array`] position on.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Decoder<'a> {
    data: &'a [u8],
    base: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, base: 0 }
    }

    fn word(&self, slot: usize) -> ContractResult<&'a [u8]> {
        let start = slot
            .checked_mul(WORD)
            .and_then(|offset| offset.checked_add(self.base))
            .ok_or_else(|| truncated("word"))?;
        self.data
            .get(start..start + WORD)
            .ok_or_else(|| truncated("word"))
    }

    pub(crate) fn uint(&self, slot: usize) -> ContractResult<U256> {
        Ok(U256::from_big_endian(self.word(slot)?))
    }

    /// An offset or length, bounded by the data itself.
    fn position(&self, slot: usize) -> ContractResult<usize> {
        let value = self.uint(slot)?;
        if value > U256::from(self.data.len()) {
            return Err(ContractError::Decode(format!("offset {} out of range", value)));
        }
        Ok(value.as_usize())
    }

    pub(crate) fn u64(&self, slot: usize) -> ContractResult<u64> {
        let value = self.uint(slot)?;
        if value > U256::from(u64::MAX) {
            return Err(ContractError::Decode(format!("{} does not fit in u64", value)));
        }
        Ok(value.as_u64())
    }

    pub(crate) fn address(&self, slot: usize) -> ContractResult<Address> {
        Ok(Address::from_slice(&self.word(slot)?[12..]))
    }

    pub(crate) fn bool(&self, slot: usize) -> ContractResult<bool> {
        Ok(!self.uint(slot)?.is_zero())
    }

    pub(crate) fn bytes32(&self, slot: usize) -> ContractResult<H256> {
        Ok(H256::from_slice(self.word(slot)?))
    }

    /// Decoder positioned on the dynamic value referenced from `slot`.
    pub(crate) fn tail(&self, slot: usize) -> ContractResult<Decoder<'a>> {
        let offset = self.position(slot)?;
        Ok(Self {
            data: self.data,
            base: self.base + offset,
        })
    }

    pub(crate) fn string(&self, slot: usize) -> ContractResult<String> {
        let tail = self.tail(slot)?;
        let len = tail.position(0)?;
        let start = tail.base + WORD;
        let bytes = self
            .data
            .get(start..start + len)
            .ok_or_else(|| truncated("string"))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ContractError::Decode(format!("string is not UTF-8: {}", e)))
    }

    /// Length of the array referenced from `slot`, and a decoder on its
    /// first element.
    pub(crate) fn array(&self, slot: usize) -> ContractResult<(usize, Decoder<'a>)> {
        let tail = self.tail(slot)?;
        let len = tail.position(0)?;
        Ok((
            len,
            Self {
                data: self.data,
                base: tail.base + WORD,
            },
        ))
    }
}
