use crate::encryption::error::EncryptionError;
use aes::Aes128;
use cipher::{generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use num_bigint::BigUint;
use num_traits::Zero;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const BLOCK_SIZE: usize = 16;
pub const KEY_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;

/// Collectors derive keys from 32-bit secrets byte by byte, so the secret is
/// never cycled over fewer than this many bytes.
const MIN_SECRET_WIDTH: usize = 4;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Fills a 16-byte key by cycling the little-endian bytes of the secret.
pub fn derive_key(shared_secret: &BigUint) -> [u8; KEY_SIZE] {
    let mut secret = shared_secret.to_bytes_le();
    if secret.len() < MIN_SECRET_WIDTH {
        secret.resize(MIN_SECRET_WIDTH, 0);
    }
    let mut key = [0u8; KEY_SIZE];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = secret[i % secret.len()];
    }
    key
}

/// Appends `n` bytes of value `n`, where `n` is in `1..=BLOCK_SIZE`.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let padding_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    let mut padded = Vec::with_capacity(data.len() + padding_len);
    padded.extend_from_slice(data);
    padded.extend(std::iter::repeat(padding_len as u8).take(padding_len));
    padded
}

pub fn remove_padding(data: &[u8]) -> Result<&[u8], EncryptionError> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(EncryptionError::InvalidPadding(format!(
            "Padded length {} is not a positive multiple of {}", data.len(), BLOCK_SIZE
        )));
    }

    let padding_len = data[data.len() - 1] as usize;
    if padding_len == 0 || padding_len > BLOCK_SIZE {
        return Err(EncryptionError::InvalidPadding(format!(
            "Padding byte {} outside 1..={}", padding_len, BLOCK_SIZE
        )));
    }

    let start = data.len() - padding_len;
    if data[start..].iter().all(|&b| b as usize == padding_len) {
        Ok(&data[..start])
    } else {
        Err(EncryptionError::InvalidPadding("Inconsistent padding bytes".to_string()))
    }
}

/// AES-128-CBC over self-describing padding.
///
/// Ciphertexts carry their IV in the first block: `IV || CBC(pad(plaintext))`.
#[derive(Clone)]
pub struct TelemetryCipher {
    key: [u8; KEY_SIZE],
}

impl TelemetryCipher {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    pub fn from_shared_secret(shared_secret: &BigUint) -> Result<Self, EncryptionError> {
        if shared_secret.is_zero() {
            return Err(EncryptionError::InvalidKey(
                "Refusing to derive a key from a zero secret".to_string(),
            ));
        }
        Ok(Self::new(derive_key(shared_secret)))
    }

    /// Short SHA-256 fingerprint of the key, safe to log.
    pub fn key_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.key);
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; IV_SIZE]) -> Vec<u8> {
        let mut buffer = pad(plaintext);
        let mut cipher = Aes128CbcEnc::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(iv),
        );
        for block in buffer.chunks_exact_mut(BLOCK_SIZE) {
            cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }

        let mut envelope = Vec::with_capacity(IV_SIZE + buffer.len());
        envelope.extend_from_slice(iv);
        envelope.extend_from_slice(&buffer);
        envelope
    }

    pub fn decrypt(&self, envelope: &[u8]) -> Result<Vec<u8>, EncryptionError> {
        if envelope.len() < IV_SIZE + BLOCK_SIZE || (envelope.len() - IV_SIZE) % BLOCK_SIZE != 0 {
            return Err(EncryptionError::DecryptionError(format!(
                "Ciphertext length {} is not IV plus whole blocks", envelope.len()
            )));
        }

        let (iv, ciphertext) = envelope.split_at(IV_SIZE);
        let mut buffer = ciphertext.to_vec();
        let mut cipher = Aes128CbcDec::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(iv),
        );
        for block in buffer.chunks_exact_mut(BLOCK_SIZE) {
            cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }

        let plaintext = remove_padding(&buffer)?;
        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_lengths() {
        for len in 0..=64 {
            let data = vec![0xAB; len];
            let padded = pad(&data);
            assert_eq!(padded.len() % BLOCK_SIZE, 0);
            assert!(padded.len() > len);
            assert!(padded.len() - len <= BLOCK_SIZE);
            assert_eq!(remove_padding(&padded).unwrap(), &data[..]);
        }
        // aligned input gets a whole block of padding
        assert_eq!(pad(&[0u8; 32])[32..], [16u8; 16]);
    }

    #[test]
    fn test_remove_padding_rejects_corruption() {
        let mut zero = vec![0x41; 16];
        zero[15] = 0;
        assert!(remove_padding(&zero).is_err());

        let mut oversized = vec![0x41; 16];
        oversized[15] = 17;
        assert!(remove_padding(&oversized).is_err());

        let mut inconsistent = pad(b"hello");
        inconsistent[10] ^= 0xFF;
        assert!(remove_padding(&inconsistent).is_err());

        assert!(remove_padding(&[]).is_err());
        assert!(remove_padding(&[1u8; 15]).is_err());
    }

    #[test]
    fn test_roundtrip_all_lengths() {
        let cipher = TelemetryCipher::new(*b"1234567890abcdef");
        for len in 0..=64 {
            let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let encrypted = cipher.encrypt(&data);
            assert_eq!(encrypted.len(), IV_SIZE + pad(&data).len());
            assert_eq!(cipher.decrypt(&encrypted).unwrap(), data);
        }
    }

    #[test]
    fn test_matches_known_cbc_vector() {
        // NIST SP 800-38A F.2.1, first block
        let key = [
            0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6,
            0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
        ];
        let iv: [u8; 16] = core::array::from_fn(|i| i as u8);
        let plaintext = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96,
            0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17, 0x2a,
        ];
        let expected = [
            0x76, 0x49, 0xab, 0xac, 0x81, 0x19, 0xb2, 0x46,
            0xce, 0xe9, 0x8e, 0x9b, 0x12, 0xe9, 0x19, 0x7d,
        ];
        let envelope = TelemetryCipher::new(key).encrypt_with_iv(&plaintext, &iv);
        assert_eq!(&envelope[..IV_SIZE], &iv);
        assert_eq!(&envelope[IV_SIZE..IV_SIZE + BLOCK_SIZE], &expected);
        assert_eq!(envelope.len(), IV_SIZE + 2 * BLOCK_SIZE);
    }

    #[test]
    fn test_fresh_iv_per_message() {
        let cipher = TelemetryCipher::new([7u8; KEY_SIZE]);
        let first = cipher.encrypt(b"same payload");
        let second = cipher.encrypt(b"same payload");
        assert_ne!(first[..IV_SIZE], second[..IV_SIZE]);
        assert_ne!(first[IV_SIZE..], second[IV_SIZE..]);
    }

    #[test]
    fn test_wrong_key_fails_or_differs() {
        let sender = TelemetryCipher::new([1u8; KEY_SIZE]);
        let receiver = TelemetryCipher::new([2u8; KEY_SIZE]);
        let encrypted = sender.encrypt(b"{\"temp_bmp\":24.5}");
        match receiver.decrypt(&encrypted) {
            Ok(plaintext) => assert_ne!(plaintext, b"{\"temp_bmp\":24.5}"),
            Err(e) => assert!(matches!(e, EncryptionError::InvalidPadding(_))),
        }
    }

    #[test]
    fn test_decrypt_rejects_truncated_input() {
        let cipher = TelemetryCipher::new([3u8; KEY_SIZE]);
        assert!(cipher.decrypt(&[0u8; IV_SIZE]).is_err());
        assert!(cipher.decrypt(&[0u8; IV_SIZE + 20]).is_err());
    }

    #[test]
    fn test_derive_key_cycles_secret_bytes() {
        // same bytes the 32-bit collector derives: (s >> 8 * (i % 4)) & 0xff
        let secret: u32 = 0x0A0B0C0D;
        let key = derive_key(&BigUint::from(secret));
        for (i, byte) in key.iter().enumerate() {
            assert_eq!(*byte, ((secret >> (8 * (i % 4))) & 0xFF) as u8);
        }

        let small = derive_key(&BigUint::from(2u32));
        assert_eq!(small, [2, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0]);

        let wide = BigUint::from_bytes_le(&(1u8..=20).collect::<Vec<_>>());
        let wide_key = derive_key(&wide);
        assert_eq!(wide_key.to_vec(), (1u8..=16).collect::<Vec<_>>());

        let five = BigUint::from_bytes_le(&[1, 2, 3, 4, 5]);
        assert_eq!(derive_key(&five)[..7], [1, 2, 3, 4, 5, 1, 2]);
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(TelemetryCipher::from_shared_secret(&BigUint::zero()).is_err());
        let cipher = TelemetryCipher::from_shared_secret(&BigUint::from(2u32)).unwrap();
        assert_eq!(cipher.key_fingerprint().len(), 16);
    }
}
