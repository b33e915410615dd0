//! Finite-field Diffie-Hellman key agreement.
//!
//! The node generates one key pair at startup and derives a shared secret from
//! whatever public value a collector presents on the key-exchange endpoint.
//!
//! The exchange is unauthenticated: nothing binds a public value to the peer
//! that sent it, so an active attacker on the channel can substitute its own
//! value and read every payload. Callers that need more than passive
//! eavesdropping protection must authenticate the handshake out of band.

use crate::encryption::error::EncryptionError;
use crate::error::{Result, TelemetryError};
use log::info;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use std::sync::RwLock;

/// RFC 3526 group 14 (2048-bit MODP), generator 2.
const MODP_2048_PRIME: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhGroup {
    /// 2048-bit MODP group from RFC 3526.
    Modp2048,
    /// P = 23, G = 5. Toy group for interop with demo peers; offers no security.
    Demo,
}

impl std::str::FromStr for DhGroup {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "modp2048" => Ok(DhGroup::Modp2048),
            "demo" => Ok(DhGroup::Demo),
            other => Err(TelemetryError::ConfigError(format!("Unknown DH group: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhParams {
    pub modulus: BigUint,
    pub generator: BigUint,
}

impl DhParams {
    pub fn new(modulus: BigUint, generator: BigUint) -> std::result::Result<Self, EncryptionError> {
        if modulus < BigUint::from(5u32) {
            return Err(EncryptionError::InvalidKey(format!(
                "Modulus must be at least 5, got {}", modulus
            )));
        }
        let upper = &modulus - 2u32;
        if generator < BigUint::from(2u32) || generator > upper {
            return Err(EncryptionError::InvalidKey(format!(
                "Generator must lie in [2, P-2], got {}", generator
            )));
        }
        Ok(Self { modulus, generator })
    }

    pub fn from_group(group: DhGroup) -> std::result::Result<Self, EncryptionError> {
        match group {
            DhGroup::Modp2048 => {
                let modulus = BigUint::parse_bytes(MODP_2048_PRIME.as_bytes(), 16)
                    .ok_or_else(|| EncryptionError::InvalidKey("Malformed MODP prime".to_string()))?;
                Self::new(modulus, BigUint::from(2u32))
            }
            DhGroup::Demo => Self::new(BigUint::from(23u32), BigUint::from(5u32)),
        }
    }

    /// Bit length of the modulus.
    pub fn bits(&self) -> u64 {
        self.modulus.bits()
    }
}

/// Square-and-multiply modular exponentiation.
pub fn mod_exp(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    if modulus.is_one() {
        return BigUint::zero();
    }
    let mut result = BigUint::one();
    let mut base = base % modulus;
    for i in 0..exponent.bits() {
        if exponent.bit(i) {
            result = &result * &base % modulus;
        }
        base = &base * &base % modulus;
    }
    result
}

/// Picks a private exponent uniformly in `[1, P-2]` and returns it with `G^x mod P`.
///
/// Exponents whose public value a peer would reject (`1` or `P-1`) are redrawn.
pub fn generate_keypair<R: Rng + ?Sized>(params: &DhParams, rng: &mut R) -> (BigUint, BigUint) {
    let upper = &params.modulus - 1u32;
    loop {
        let private_exponent = rng.gen_biguint_range(&BigUint::one(), &upper);
        let public_value = mod_exp(&params.generator, &private_exponent, &params.modulus);
        if !public_value.is_one() && public_value != upper {
            return (private_exponent, public_value);
        }
    }
}

/// Parses the decimal `public_key` parameter of an exchange request.
pub fn parse_public_value(raw: Option<&str>) -> Result<BigUint> {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(TelemetryError::MissingParameter("public key missing".to_string())),
    };
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TelemetryError::InvalidParameter(
            "public key must be a decimal integer".to_string(),
        ));
    }
    raw.parse::<BigUint>()
        .map_err(|e| TelemetryError::InvalidParameter(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub peer_public: BigUint,
    pub shared_secret: BigUint,
    /// Starts at 1 and increases on every accepted peer value.
    pub generation: u64,
}

pub struct KeyAgreement {
    params: DhParams,
    private_exponent: BigUint,
    public_value: BigUint,
    session: RwLock<Option<Session>>,
}

impl KeyAgreement {
    pub fn generate(params: DhParams) -> Self {
        let (private_exponent, public_value) = generate_keypair(&params, &mut OsRng);
        Self {
            params,
            private_exponent,
            public_value,
            session: RwLock::new(None),
        }
    }

    pub fn from_private_exponent(
        params: DhParams,
        private_exponent: BigUint,
    ) -> std::result::Result<Self, EncryptionError> {
        let upper = &params.modulus - 2u32;
        if private_exponent.is_zero() || private_exponent > upper {
            return Err(EncryptionError::KeyGenerationError(
                "Private exponent must lie in [1, P-2]".to_string(),
            ));
        }
        let public_value = mod_exp(&params.generator, &private_exponent, &params.modulus);
        Ok(Self {
            params,
            private_exponent,
            public_value,
            session: RwLock::new(None),
        })
    }

    pub fn params(&self) -> &DhParams {
        &self.params
    }

    pub fn public_value(&self) -> &BigUint {
        &self.public_value
    }

    /// Computes and stores `peer^x mod P`.
    ///
    /// Values outside `[2, P-2]` are rejected: `0`, `1` and `P-1` pin the
    /// secret to a trivially guessable value. A later call replaces the
    /// current session and bumps its generation.
    pub fn accept_peer_value(&self, peer_public: &BigUint) -> Result<BigUint> {
        let upper = &self.params.modulus - 2u32;
        if *peer_public < BigUint::from(2u32) || *peer_public > upper {
            return Err(TelemetryError::InvalidParameter(format!(
                "public key out of range [2, {}]", upper
            )));
        }

        let shared_secret = mod_exp(peer_public, &self.private_exponent, &self.params.modulus);

        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        let generation = session.as_ref().map(|s| s.generation).unwrap_or(0) + 1;
        if generation > 1 {
            info!("Replacing key agreement session {} with a new peer value", generation - 1);
        }
        *session = Some(Session {
            peer_public: peer_public.clone(),
            shared_secret: shared_secret.clone(),
            generation,
        });
        info!("Key agreement session {} established", generation);

        Ok(shared_secret)
    }

    pub fn shared_secret(&self) -> Option<BigUint> {
        self.session().map(|s| s.shared_secret)
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_established(&self) -> bool {
        self.session.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl fmt::Debug for KeyAgreement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyAgreement")
            .field("modulus_bits", &self.params.bits())
            .field("public_value", &self.public_value)
            .field("established", &self.is_established())
            .finish()
    }
}
