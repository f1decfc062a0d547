use std::fmt;

use anyhow::{anyhow, Context, Result};
use base64::Engine as _;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;

use crate::domain::{SignedTransaction, UnsignedTransaction};
use crate::error::{BoostError, BoostResult};

/// Signing key for the boosting wallet. Read-only once loaded, so it can be
/// shared across concurrent runs behind an `Arc`.
pub struct Credential {
    keypair: Keypair,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("pubkey", &self.pubkey()).finish()
    }
}

impl Credential {
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Parses 64 comma-separated byte values, optionally wrapped in `[...]`
    /// (the Solana CLI keypair file layout).
    pub fn from_secret_list(raw: &str) -> Result<Self> {
        let bytes = raw
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|b| {
                b.trim()
                    .parse::<u8>()
                    .map_err(|_| anyhow!("secret key contains a non-byte value"))
            })
            .collect::<Result<Vec<u8>>>()?;
        if bytes.len() != 64 {
            return Err(anyhow!("secret key must be 64 bytes, got {}", bytes.len()));
        }
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|_| anyhow!("secret key is not a valid ed25519 keypair"))?;
        Ok(Self { keypair })
    }

    /// `WALLET_SECRET` first, then the keypair file at `keypair_path`.
    pub fn load(secret: Option<String>, keypair_path: Option<&str>) -> Result<Self> {
        if let Some(secret) = secret.filter(|s| !s.trim().is_empty()) {
            return Self::from_secret_list(&secret).context("WALLET_SECRET");
        }
        let path =
            keypair_path.ok_or_else(|| anyhow!("WALLET_SECRET or SOL_KEYPAIR_PATH is required"))?;
        let keypair =
            read_keypair_file(path).map_err(|e| anyhow!("reading keypair {path}: {e}"))?;
        Ok(Self { keypair })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Decodes a routing-service payload and signs it with this credential.
    ///
    /// Takes the unsigned payload by value: each one is signed at most once.
    pub fn sign(&self, unsigned: UnsignedTransaction) -> BoostResult<SignedTransaction> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(unsigned.as_str().trim())
            .map_err(|e| BoostError::signing(format!("payload is not base64: {e}")))?;
        let vtx: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| BoostError::signing(format!("payload is not a transaction: {e}")))?;

        let signed = VersionedTransaction::try_new(vtx.message, &[&self.keypair])
            .map_err(BoostError::signing)?;
        Ok(SignedTransaction::new(signed))
    }
}
