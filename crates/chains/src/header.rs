//! Contains the [BlockHeader] type, the canonical Ethereum header that the L1 and Arbitrum
//! verifiers hash to authenticate a state root.

use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256, U64};
use alloy_rlp::{length_of_length, BufMut, Decodable, Encodable};
use serde::{Deserialize, Serialize};

/// An Ethereum block header, deserializable from `eth_getBlockBy*` responses.
///
/// Fields added by later forks are optional. They are RLP encoded in fork order, stopping at the
/// first one that is absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub parent_hash: B256,
    pub sha3_uncles: B256,
    pub miner: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: U64,
    pub gas_limit: U64,
    pub gas_used: U64,
    pub timestamp: U64,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    pub nonce: B64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<B256>,
}

impl BlockHeader {
    /// The block number as a native integer.
    pub fn block_number(&self) -> u64 {
        self.number.to::<u64>()
    }

    /// The block hash, `keccak256(rlp(header))`.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    /// Every field that takes part in the RLP list, in encoding order.
    fn fields(&self) -> Vec<&dyn Encodable> {
        let mut fields: Vec<&dyn Encodable> = vec![
            &self.parent_hash,
            &self.sha3_uncles,
            &self.miner,
            &self.state_root,
            &self.transactions_root,
            &self.receipts_root,
            &self.logs_bloom,
            &self.difficulty,
            &self.number,
            &self.gas_limit,
            &self.gas_used,
            &self.timestamp,
            &self.extra_data,
            &self.mix_hash,
            &self.nonce,
        ];

        let fork_fields: [Option<&dyn Encodable>; 6] = [
            self.base_fee_per_gas.as_ref().map(|v| v as &dyn Encodable),
            self.withdrawals_root.as_ref().map(|v| v as &dyn Encodable),
            self.blob_gas_used.as_ref().map(|v| v as &dyn Encodable),
            self.excess_blob_gas.as_ref().map(|v| v as &dyn Encodable),
            self.parent_beacon_block_root.as_ref().map(|v| v as &dyn Encodable),
            self.requests_hash.as_ref().map(|v| v as &dyn Encodable),
        ];
        fields.extend(fork_fields.into_iter().map_while(|f| f));

        fields
    }

    fn payload_length(&self) -> usize {
        self.fields().iter().map(|f| f.length()).sum()
    }
}

impl Encodable for BlockHeader {
    fn encode(&self, out: &mut dyn BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }.encode(out);
        self.fields().iter().for_each(|f| f.encode(out));
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for BlockHeader {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = alloy_rlp::Header::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let data: &[u8] = *buf;
        if data.len() < rlp_head.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }
        let (mut payload, rest) = data.split_at(rlp_head.payload_length);
        let payload = &mut payload;

        let mut this = Self {
            parent_hash: Decodable::decode(payload)?,
            sha3_uncles: Decodable::decode(payload)?,
            miner: Decodable::decode(payload)?,
            state_root: Decodable::decode(payload)?,
            transactions_root: Decodable::decode(payload)?,
            receipts_root: Decodable::decode(payload)?,
            logs_bloom: Decodable::decode(payload)?,
            difficulty: Decodable::decode(payload)?,
            number: Decodable::decode(payload)?,
            gas_limit: Decodable::decode(payload)?,
            gas_used: Decodable::decode(payload)?,
            timestamp: Decodable::decode(payload)?,
            extra_data: Decodable::decode(payload)?,
            mix_hash: Decodable::decode(payload)?,
            nonce: Decodable::decode(payload)?,
            ..Default::default()
        };

        if !payload.is_empty() {
            this.base_fee_per_gas = Some(Decodable::decode(payload)?);
        }
        if !payload.is_empty() {
            this.withdrawals_root = Some(Decodable::decode(payload)?);
        }
        if !payload.is_empty() {
            this.blob_gas_used = Some(Decodable::decode(payload)?);
        }
        if !payload.is_empty() {
            this.excess_blob_gas = Some(Decodable::decode(payload)?);
        }
        if !payload.is_empty() {
            this.parent_beacon_block_root = Some(Decodable::decode(payload)?);
        }
        if !payload.is_empty() {
            this.requests_hash = Some(Decodable::decode(payload)?);
        }

        if !payload.is_empty() {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: rlp_head.payload_length,
                got: rlp_head.payload_length - payload.len(),
            });
        }

        *buf = rest;
        Ok(this)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::{b256, hex};

    const MAINNET_GENESIS: &str = r#"{
        "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "sha3Uncles": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
        "miner": "0x0000000000000000000000000000000000000000",
        "stateRoot": "0xd7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544",
        "transactionsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
        "receiptsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
        "logsBloom": "0x00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000",
        "difficulty": "0x400000000",
        "number": "0x0",
        "gasLimit": "0x1388",
        "gasUsed": "0x0",
        "timestamp": "0x0",
        "extraData": "0x11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa",
        "mixHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "nonce": "0x0000000000000042",
        "hash": "0xd4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3",
        "totalDifficulty": "0x400000000",
        "transactions": [],
        "uncles": []
    }"#;

    #[test]
    fn genesis_hash_from_rpc_json() {
        let header: BlockHeader = serde_json::from_str(MAINNET_GENESIS).unwrap();
        assert_eq!(header.block_number(), 0);
        assert_eq!(header.base_fee_per_gas, None);
        assert_eq!(
            header.hash(),
            b256!("d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3")
        );
    }

    #[test]
    fn zero_integers_encode_canonically() {
        let header = BlockHeader::default();
        let encoded = alloy_rlp::encode(&header);
        assert_eq!(encoded.len(), header.length());

        // difficulty, number, gas limit, gas used and timestamp all encode as the empty string.
        let zeros = hex!("8080808080");
        assert!(encoded.windows(zeros.len()).any(|w| w == zeros));
    }

    #[test]
    fn fork_fields_round_trip() {
        let header = BlockHeader {
            number: U64::from(19_000_000),
            gas_limit: U64::from(30_000_000),
            extra_data: Bytes::from_static(b"builder"),
            base_fee_per_gas: Some(U256::from(7)),
            withdrawals_root: Some(B256::repeat_byte(0x01)),
            blob_gas_used: Some(U64::from(131_072)),
            excess_blob_gas: Some(U64::ZERO),
            parent_beacon_block_root: Some(B256::repeat_byte(0x02)),
            ..Default::default()
        };
        let encoded = alloy_rlp::encode(&header);
        let decoded = BlockHeader::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.hash(), header.hash());
    }

    #[test]
    fn fork_fields_stop_at_first_gap() {
        let header = BlockHeader {
            withdrawals_root: Some(B256::repeat_byte(0x01)),
            ..Default::default()
        };
        let decoded = BlockHeader::decode(&mut alloy_rlp::encode(&header).as_slice()).unwrap();
        assert_eq!(decoded, BlockHeader::default());
    }

    #[test]
    fn rejects_non_list() {
        let err = BlockHeader::decode(&mut hex!("8180").as_slice()).unwrap_err();
        assert!(matches!(err, alloy_rlp::Error::UnexpectedString));
    }

    #[test]
    fn rejects_trailing_list_items() {
        let header = BlockHeader {
            base_fee_per_gas: Some(U256::from(1)),
            withdrawals_root: Some(B256::ZERO),
            blob_gas_used: Some(U64::ZERO),
            excess_blob_gas: Some(U64::ZERO),
            parent_beacon_block_root: Some(B256::ZERO),
            requests_hash: Some(B256::ZERO),
            ..Default::default()
        };
        let extra = B256::repeat_byte(0x03);
        let mut fields = header.fields();
        fields.push(&extra);

        let payload_length = fields.iter().map(|f| f.length()).sum();
        let mut encoded = Vec::new();
        alloy_rlp::Header { list: true, payload_length }.encode(&mut encoded);
        fields.iter().for_each(|f| f.encode(&mut encoded));

        let err = BlockHeader::decode(&mut encoded.as_slice()).unwrap_err();
        assert!(matches!(err, alloy_rlp::Error::ListLengthMismatch { .. }));
    }
}
