//! HTTP binding for the public-decryption relayer.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/v1/public-decrypt` | Decrypt publicly decryptable handles |
//!
//! The relayer answers with the clear values, their ABI encoding and the KMS
//! signatures. The client checks that the encoding agrees with the clear
//! values before handing the bundle on; the signatures themselves are only
//! checked by the registry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ubi_core::{CiphertextHandle, ContractAddress};
use ubi_fhe::{abi, DecryptionBundle, FheError, PublicDecryptor};

use crate::config::ClientConfig;

const PUBLIC_DECRYPT_PATH: &str = "v1/public-decrypt";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicDecryptRequest<'a> {
    ciphertext_handles: &'a [CiphertextHandle],
    contract_address: &'a ContractAddress,
}

#[derive(Debug, Deserialize)]
struct PublicDecryptResponse {
    response: DecryptionBundle,
}

/// Relayer client.
#[derive(Debug, Clone)]
pub struct RelayerClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl RelayerClient {
    /// Build a client for the relayer named in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, FheError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FheError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.relayer_url.clone(),
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }
}

impl PublicDecryptor for RelayerClient {
    async fn public_decrypt(
        &self,
        handles: &[CiphertextHandle],
        contract: &ContractAddress,
    ) -> Result<DecryptionBundle, FheError> {
        let url = self
            .base_url
            .join(PUBLIC_DECRYPT_PATH)
            .map_err(|e| FheError::Transport(e.to_string()))?;
        let body = PublicDecryptRequest {
            ciphertext_handles: handles,
            contract_address: contract,
        };

        let resp = crate::retry::send_with_retry(|| self.http.post(url.clone()).json(&body).send())
            .await
            .map_err(|e| FheError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FheError::Relayer { status, body });
        }

        let PublicDecryptResponse { response: bundle } = resp
            .json()
            .await
            .map_err(|e| FheError::Transport(format!("invalid relayer response: {e}")))?;

        let decoded = abi::decode_u32s(&bundle.abi_encoded_clear_values)?;
        let expected = handles
            .iter()
            .map(|h| {
                bundle
                    .clear_values
                    .get(h)
                    .copied()
                    .ok_or(FheError::UnknownHandle(*h))
            })
            .collect::<Result<Vec<u32>, FheError>>()?;
        if decoded != expected {
            return Err(FheError::Abi(
                "encoded clear values disagree with the clear value map".into(),
            ));
        }

        tracing::debug!(
            handles = handles.len(),
            signatures = bundle.decryption_proof.signatures.len(),
            "public decryption received"
        );
        Ok(bundle)
    }
}
