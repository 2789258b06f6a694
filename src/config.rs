/// Provider configuration from environment variables
///
/// Controls chain parameters the documented API leaves configurable: the
/// inscription-protection threshold, change dust, fee rate, dev fee, and the
/// approval timeout window.
use std::env;
use std::time::Duration;

/// 1 DOGE = 100,000,000 koinu.
pub const KOINU_PER_DOGE: u64 = 100_000_000;

/// Chain identifier exposed to pages.
pub const CHAIN_ID: &str = "dogecoin:mainnet";

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// Outputs below this value are treated as inscription carriers and
    /// excluded from plain spends (0.1 DOGE).
    pub protected_threshold_koinu: u64,
    /// Change below this value is absorbed into the network fee (0.01 DOGE).
    pub change_dust_koinu: u64,
    /// Fallback fee rate in koinu per byte when the indexer supplies none.
    pub fee_rate_koinu_per_byte: u64,
    /// Flat dev fee added to every send and doginal transfer (0.01 DOGE).
    pub dev_fee_koinu: u64,
    /// Recipient of the dev fee output.
    pub dev_fee_address: String,
    /// Flat network fee per transferred inscription (0.10 DOGE).
    pub doginal_network_fee_koinu: u64,
    /// How long an approval may sit awaiting a user decision.
    pub approval_timeout: Duration,
    /// Doginals indexer base URL.
    pub indexer_url: String,
}

impl ProviderConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PROVIDER_FEE_RATE`: fee rate in koinu/byte (default 500)
    /// - `PROVIDER_CHANGE_DUST`: change dust in koinu (default 1,000,000)
    /// - `PROVIDER_DEV_FEE_ADDRESS`: dev fee recipient address
    /// - `PROVIDER_APPROVAL_TIMEOUT_SECS`: approval window (default 120)
    /// - `INDEXER_URL`: doginals indexer endpoint
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fee_rate_koinu_per_byte = env_u64("PROVIDER_FEE_RATE", defaults.fee_rate_koinu_per_byte);
        let change_dust_koinu = env_u64("PROVIDER_CHANGE_DUST", defaults.change_dust_koinu);
        let timeout_secs = env_u64("PROVIDER_APPROVAL_TIMEOUT_SECS", 120);

        let dev_fee_address = env::var("PROVIDER_DEV_FEE_ADDRESS")
            .unwrap_or_else(|_| defaults.dev_fee_address.clone());

        let indexer_url = env::var("INDEXER_URL").unwrap_or_else(|_| {
            log::info!("Indexer URL: {} (default)", defaults.indexer_url);
            defaults.indexer_url.clone()
        });

        Self {
            fee_rate_koinu_per_byte,
            change_dust_koinu,
            dev_fee_address,
            approval_timeout: Duration::from_secs(timeout_secs),
            indexer_url,
            ..defaults
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Ignoring non-numeric {}='{}', using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            protected_threshold_koinu: KOINU_PER_DOGE / 10,
            change_dust_koinu: KOINU_PER_DOGE / 100,
            fee_rate_koinu_per_byte: 500,
            dev_fee_koinu: KOINU_PER_DOGE / 100,
            dev_fee_address: "D8ZpM9FNbeoexbSZYypeN4EcvJkjmB2ZUP".to_string(),
            doginal_network_fee_koinu: KOINU_PER_DOGE / 10,
            approval_timeout: Duration::from_secs(120),
            indexer_url: "https://doginals.example.org/api".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = ProviderConfig::default();
        assert_eq!(config.protected_threshold_koinu, 10_000_000);
        assert_eq!(config.dev_fee_koinu, 1_000_000);
        assert_eq!(config.doginal_network_fee_koinu, 10_000_000);
    }

    #[test]
    fn test_chain_id() {
        assert_eq!(CHAIN_ID, "dogecoin:mainnet");
    }
}
