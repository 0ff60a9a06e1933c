//! # ubi-client: Insurance Registry Client Session
//!
//! Drives the registry on behalf of one connected driver:
//!
//! - **Session** (`session.rs`): connect, one-shot encryption setup, policy
//!   loading and creation, decrypt-then-verify, on-chain computation.
//! - **Chain** (`chain.rs`): the `RegistryChain` seam and an in-process
//!   deployment for local runs and tests.
//! - **Relayer** (`relayer.rs`): HTTP binding for public decryption with
//!   retry on transport failures and transient gateway statuses.
//! - **Premium** (`premium.rs`): illustrative premium figures derived
//!   locally from a policy and a score.
//!
//! The wallet, chain and both encryption seams are generic parameters of
//! [`ClientSession`]; swapping the in-process chain for a node binding does
//! not touch session logic.

pub mod chain;
pub mod config;
pub mod error;
pub mod policy;
pub mod premium;
pub mod relayer;
pub(crate) mod retry;
pub mod session;
pub mod wallet;

pub use chain::{InProcessChain, RegistryChain, TxReceipt};
pub use config::{ClientConfig, ConfigError};
pub use error::{ChainError, ClientError, WalletError};
pub use policy::{Policy, PolicyDraft};
pub use premium::{derive_premium_view, PremiumView};
pub use relayer::RelayerClient;
pub use session::{ClientSession, InitOutcome, StatusLevel, StatusMessage};
pub use wallet::{DevWallet, WalletConnector};
