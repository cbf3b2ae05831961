//! # Ledger Transactions
//!
//! A transaction is one of three variants: a regular signed transfer/call, the
//! synthetic producer-list transaction, or the synthetic fee-distribution
//! transaction. The synthetic variants are zero-fee, unsigned and carry a
//! fixed sentinel sender; everything variant-specific is resolved by matching
//! on [`Transaction`].
//!
//! ## Wire Encoding
//!
//! Every variant encodes as the same seven-item RLP list:
//!
//! ```text
//! [nonce, gas_price, gas_limit, to, value, data, signature]
//! ```
//!
//! Synthetic transactions carry `nonce = block_number - 1`, zero gas price,
//! gas limit and value, and an empty signature. The transaction hash is the
//! Keccak-256 of this encoding.

use crate::entities::{Address, Hash, U256};
use crate::errors::TransactionError;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use shared_crypto::{keccak256, recover_ledger_address, RecoverableSignature, Secp256k1KeyPair};

const fn system_address(tail: u32) -> Address {
    let tail = tail.to_be_bytes();
    let mut address = [0u8; 20];
    address[16] = tail[0];
    address[17] = tail[1];
    address[18] = tail[2];
    address[19] = tail[3];
    address
}

/// Bridge contract address on the ledger.
pub const BRIDGE_ADDRESS: Address = system_address(0x0100_0006);

/// Fee-distribution contract address (destination of the fee-distribution transaction).
pub const FEE_DISTRIBUTION_ADDRESS: Address = system_address(0x0100_0008);

/// Producer-list contract address (destination of the producer-list transaction).
pub const PRODUCER_LIST_ADDRESS: Address = system_address(0x0100_0009);

/// Sentinel "invalid" sender of the producer-list transaction. No key derives to it.
pub const PRODUCER_LIST_SENDER: Address = [0xff; 20];

/// Sentinel sender of the fee-distribution transaction.
pub const FEE_DISTRIBUTION_SENDER: Address = [0u8; 20];

/// Regular transaction fields before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Sender nonce.
    pub nonce: u64,
    /// Price per unit of gas.
    pub gas_price: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Destination, `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Call data.
    pub data: Vec<u8>,
}

impl UnsignedTransaction {
    /// Hash the signature commits to.
    pub fn signing_hash(&self) -> Hash {
        let mut stream = RlpStream::new_list(6);
        append_body(
            &mut stream,
            self.nonce,
            &self.gas_price,
            self.gas_limit,
            self.to,
            &self.value,
            &self.data,
        );
        keccak256(&stream.out())
    }

    /// Sign with `keypair`, producing a regular transaction.
    pub fn sign(self, keypair: &Secp256k1KeyPair) -> Result<SignedTransaction, TransactionError> {
        let signature = keypair.sign_recoverable(&self.signing_hash())?;
        Ok(SignedTransaction {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: self.data,
            signature,
        })
    }
}

/// A regular, user-signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Sender nonce.
    pub nonce: u64,
    /// Price per unit of gas.
    pub gas_price: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Destination, `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value.
    pub value: U256,
    /// Call data.
    pub data: Vec<u8>,
    /// Recoverable signature over [`UnsignedTransaction::signing_hash`].
    pub signature: RecoverableSignature,
}

impl SignedTransaction {
    /// The unsigned fields.
    pub fn unsigned(&self) -> UnsignedTransaction {
        UnsignedTransaction {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: self.data.clone(),
        }
    }

    /// Recover the sender address from the signature.
    pub fn recover_sender(&self) -> Result<Address, TransactionError> {
        Ok(recover_ledger_address(
            &self.unsigned().signing_hash(),
            &self.signature,
        )?)
    }
}

/// Synthetic transaction carrying the producer list for a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerListTransaction {
    /// Number of the block this transaction belongs to.
    pub block_number: u64,
    /// Encoded producer list.
    pub payload: Vec<u8>,
}

/// Synthetic transaction triggering fee distribution for a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDistributionTransaction {
    /// Number of the block this transaction belongs to.
    pub block_number: u64,
}

/// A ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transaction {
    /// User-signed transaction.
    Regular(SignedTransaction),
    /// Synthetic producer-list transaction.
    ProducerList(ProducerListTransaction),
    /// Synthetic fee-distribution transaction.
    FeeDistribution(FeeDistributionTransaction),
}

impl Transaction {
    /// Sender nonce. Synthetic transactions use `block_number - 1`.
    pub fn nonce(&self) -> u64 {
        match self {
            Self::Regular(tx) => tx.nonce,
            Self::ProducerList(tx) => tx.block_number.saturating_sub(1),
            Self::FeeDistribution(tx) => tx.block_number.saturating_sub(1),
        }
    }

    /// Gas price; zero for synthetic transactions.
    pub fn gas_price(&self) -> U256 {
        match self {
            Self::Regular(tx) => tx.gas_price,
            _ => U256::zero(),
        }
    }

    /// Gas limit; zero for synthetic transactions.
    pub fn gas_limit(&self) -> u64 {
        match self {
            Self::Regular(tx) => tx.gas_limit,
            _ => 0,
        }
    }

    /// Destination address.
    pub fn to(&self) -> Option<Address> {
        match self {
            Self::Regular(tx) => tx.to,
            Self::ProducerList(_) => Some(PRODUCER_LIST_ADDRESS),
            Self::FeeDistribution(_) => Some(FEE_DISTRIBUTION_ADDRESS),
        }
    }

    /// Transferred value; zero for synthetic transactions.
    pub fn value(&self) -> U256 {
        match self {
            Self::Regular(tx) => tx.value,
            _ => U256::zero(),
        }
    }

    /// Call data.
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Regular(tx) => &tx.data,
            Self::ProducerList(tx) => &tx.payload,
            Self::FeeDistribution(_) => &[],
        }
    }

    /// Sender address: recovered for regular transactions, the sentinel for synthetic ones.
    pub fn sender(&self) -> Result<Address, TransactionError> {
        match self {
            Self::Regular(tx) => tx.recover_sender(),
            Self::ProducerList(_) => Ok(PRODUCER_LIST_SENDER),
            Self::FeeDistribution(_) => Ok(FEE_DISTRIBUTION_SENDER),
        }
    }

    /// Synthetic transactions pay no fees.
    pub fn is_free(&self) -> bool {
        !matches!(self, Self::Regular(_))
    }

    /// Only regular transactions carry and require a signature.
    pub fn needs_signature(&self) -> bool {
        matches!(self, Self::Regular(_))
    }

    /// Whether this is the producer-list transaction.
    pub fn is_producer_list(&self) -> bool {
        matches!(self, Self::ProducerList(_))
    }

    /// Whether this is the fee-distribution transaction.
    pub fn is_fee_distribution(&self) -> bool {
        matches!(self, Self::FeeDistribution(_))
    }

    /// The producer-list payload, if this is a producer-list transaction.
    pub fn as_producer_list(&self) -> Option<&ProducerListTransaction> {
        match self {
            Self::ProducerList(tx) => Some(tx),
            _ => None,
        }
    }

    /// RLP encoding.
    pub fn rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode from RLP.
    pub fn from_rlp(bytes: &[u8]) -> Result<Self, TransactionError> {
        rlp::decode(bytes).map_err(|e| TransactionError::Malformed(format!("{e:?}")))
    }

    /// Keccak-256 of the RLP encoding.
    pub fn hash(&self) -> Hash {
        keccak256(&self.rlp_bytes())
    }
}

fn append_body(
    stream: &mut RlpStream,
    nonce: u64,
    gas_price: &U256,
    gas_limit: u64,
    to: Option<Address>,
    value: &U256,
    data: &[u8],
) {
    stream.append(&nonce);
    stream.append(gas_price);
    stream.append(&gas_limit);
    stream.append(&to.map(|a| a.to_vec()).unwrap_or_default());
    stream.append(value);
    stream.append(&data.to_vec());
}

impl Encodable for Transaction {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(7);
        append_body(
            s,
            self.nonce(),
            &self.gas_price(),
            self.gas_limit(),
            self.to(),
            &self.value(),
            self.data(),
        );
        let signature = match self {
            Self::Regular(tx) => tx.signature.as_bytes().to_vec(),
            _ => Vec::new(),
        };
        s.append(&signature);
    }
}

impl Decodable for Transaction {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 7 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let nonce: u64 = rlp.val_at(0)?;
        let gas_price: U256 = rlp.val_at(1)?;
        let gas_limit: u64 = rlp.val_at(2)?;
        let to_bytes: Vec<u8> = rlp.val_at(3)?;
        let to: Option<Address> = match to_bytes.len() {
            0 => None,
            _ => Some(
                to_bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| DecoderError::Custom("invalid destination length"))?,
            ),
        };
        let value: U256 = rlp.val_at(4)?;
        let data: Vec<u8> = rlp.val_at(5)?;
        let signature: Vec<u8> = rlp.val_at(6)?;

        if signature.is_empty() {
            let block_number = nonce
                .checked_add(1)
                .ok_or(DecoderError::Custom("synthetic nonce overflow"))?;
            let zero_fee = gas_price.is_zero() && gas_limit == 0 && value.is_zero();
            return match to {
                Some(PRODUCER_LIST_ADDRESS) if zero_fee => {
                    Ok(Self::ProducerList(ProducerListTransaction {
                        block_number,
                        payload: data,
                    }))
                }
                Some(FEE_DISTRIBUTION_ADDRESS) if zero_fee && data.is_empty() => {
                    Ok(Self::FeeDistribution(FeeDistributionTransaction { block_number }))
                }
                _ => Err(DecoderError::Custom("unsigned regular transaction")),
            };
        }

        let signature: [u8; 65] = signature
            .as_slice()
            .try_into()
            .map_err(|_| DecoderError::Custom("invalid signature length"))?;
        Ok(Self::Regular(SignedTransaction {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data,
            signature: RecoverableSignature::from_bytes(signature),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(keypair: &Secp256k1KeyPair, nonce: u64) -> Transaction {
        let unsigned = UnsignedTransaction {
            nonce,
            gas_price: U256::from(10u64),
            gas_limit: 21_000,
            to: Some([0x42; 20]),
            value: U256::from(1_000u64),
            data: vec![],
        };
        Transaction::Regular(unsigned.sign(keypair).unwrap())
    }

    #[test]
    fn test_regular_sender_is_recovered() {
        let keypair = Secp256k1KeyPair::from_bytes([0x07; 32]).unwrap();
        let tx = signed(&keypair, 3);

        assert_eq!(tx.sender().unwrap(), keypair.ledger_address());
        assert!(tx.needs_signature());
        assert!(!tx.is_free());
    }

    #[test]
    fn test_synthetic_transactions_use_sentinels() {
        let list = Transaction::ProducerList(ProducerListTransaction {
            block_number: 10,
            payload: vec![1, 2, 3],
        });
        let fees = Transaction::FeeDistribution(FeeDistributionTransaction { block_number: 10 });

        assert_eq!(list.nonce(), 9);
        assert_eq!(fees.nonce(), 9);
        assert_eq!(list.sender().unwrap(), PRODUCER_LIST_SENDER);
        assert_eq!(fees.sender().unwrap(), FEE_DISTRIBUTION_SENDER);
        assert_eq!(list.to(), Some(PRODUCER_LIST_ADDRESS));
        assert!(list.is_free() && fees.is_free());
        assert!(!list.needs_signature());
    }

    #[test]
    fn test_rlp_decoding_restores_variant() {
        let keypair = Secp256k1KeyPair::from_bytes([0x09; 32]).unwrap();
        let cases = vec![
            signed(&keypair, 0),
            Transaction::ProducerList(ProducerListTransaction {
                block_number: 1,
                payload: vec![33, 2],
            }),
            Transaction::FeeDistribution(FeeDistributionTransaction { block_number: 7 }),
        ];

        for tx in cases {
            let decoded = Transaction::from_rlp(&tx.rlp_bytes()).unwrap();
            assert_eq!(decoded, tx);
            assert_eq!(decoded.hash(), tx.hash());
        }
    }

    #[test]
    fn test_unsigned_regular_transaction_rejected() {
        let mut stream = RlpStream::new_list(7);
        append_body(
            &mut stream,
            0,
            &U256::zero(),
            0,
            Some([0x42; 20]),
            &U256::zero(),
            &[],
        );
        stream.append(&Vec::<u8>::new());

        assert!(matches!(
            Transaction::from_rlp(&stream.out()),
            Err(TransactionError::Malformed(_))
        ));
    }

    #[test]
    fn test_hash_depends_on_block_number() {
        let a = Transaction::FeeDistribution(FeeDistributionTransaction { block_number: 1 });
        let b = Transaction::FeeDistribution(FeeDistributionTransaction { block_number: 2 });
        assert_ne!(a.hash(), b.hash());
    }
}
