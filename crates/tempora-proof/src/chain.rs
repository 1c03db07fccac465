//! Chain names a node operator configures, and what they map to.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempora_core::BlockChain;

use crate::errors::ProofError;

/// A network whose block headers can be checked against attestations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Chain {
    /// Bitcoin main network.
    Mainnet,
    /// Bitcoin regression-test network.
    Regnet,
    /// Bitcoin test network.
    Testnet,
    /// Litecoin main network.
    Litecoin,
    /// Litecoin test network.
    LitecoinTestnet,
}

impl Chain {
    /// Every supported chain.
    pub const ALL: [Chain; 5] = [
        Chain::Mainnet,
        Chain::Regnet,
        Chain::Testnet,
        Chain::Litecoin,
        Chain::LitecoinTestnet,
    ];

    /// Configured name of the chain.
    pub fn name(self) -> &'static str {
        match self {
            Chain::Mainnet => "mainnet",
            Chain::Regnet => "regnet",
            Chain::Testnet => "testnet",
            Chain::Litecoin => "litecoin",
            Chain::LitecoinTestnet => "litecoinTestnet",
        }
    }

    /// Which block header attestation this chain confirms.
    pub fn family(self) -> BlockChain {
        match self {
            Chain::Mainnet | Chain::Regnet | Chain::Testnet => BlockChain::Bitcoin,
            Chain::Litecoin | Chain::LitecoinTestnet => BlockChain::Litecoin,
        }
    }

    /// Currency ticker symbol.
    pub fn ticker(self) -> &'static str {
        match self.family() {
            BlockChain::Bitcoin => "BTC",
            BlockChain::Litecoin => "LTC",
        }
    }

    /// Daemon name, which also names its data directory and config file.
    pub fn daemon(self) -> &'static str {
        match self.family() {
            BlockChain::Bitcoin => "bitcoin",
            BlockChain::Litecoin => "litecoin",
        }
    }

    /// Node config file under `home`: `<home>/.<daemon>/<daemon>.conf`.
    pub fn conf_file_path_in(self, home: &Path) -> PathBuf {
        let daemon = self.daemon();
        home.join(format!(".{daemon}")).join(format!("{daemon}.conf"))
    }

    /// Node config file under the current user's home directory.
    ///
    /// # Errors
    ///
    /// [`ProofError::HomeDirUnavailable`] if no home directory is known.
    pub fn conf_file_path(self) -> Result<PathBuf, ProofError> {
        let home = dirs::home_dir().ok_or(ProofError::HomeDirUnavailable)?;
        Ok(self.conf_file_path_in(&home))
    }
}

impl FromStr for Chain {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chain::ALL
            .into_iter()
            .find(|chain| chain.name() == s)
            .ok_or_else(|| ProofError::InvalidChain(s.to_string()))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
