//! Coin selection and fee computation
//!
//! The one place that decides which outputs get spent. Protected outputs
//! (inscription carriers) never enter a plain send; a doginal transfer spends
//! exactly the named inscriptions' backing outputs plus unprotected toppers
//! for fees. Selection and fee estimation iterate to a fixed point because
//! the fee depends on the input count.

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::types::{Doginal, TxOutput, Utxo};

/// Result of coin selection: inputs, full output list (recipient outputs,
/// dev fee, change) and the caller-visible fee breakdown.
#[derive(Debug, Clone)]
pub struct Selection {
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<TxOutput>,
    /// Network fee actually paid (includes any absorbed change).
    pub fee_koinu: u64,
    pub dev_fee_koinu: u64,
    /// Zero when the excess was absorbed into the fee.
    pub change_koinu: u64,
}

pub struct FeeEngine {
    protected_threshold_koinu: u64,
    change_dust_koinu: u64,
    dev_fee_koinu: u64,
    dev_fee_address: String,
    doginal_network_fee_koinu: u64,
}

impl FeeEngine {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            protected_threshold_koinu: config.protected_threshold_koinu,
            change_dust_koinu: config.change_dust_koinu,
            dev_fee_koinu: config.dev_fee_koinu,
            dev_fee_address: config.dev_fee_address.clone(),
            doginal_network_fee_koinu: config.doginal_network_fee_koinu,
        }
    }

    /// Estimate transaction size in bytes from input/output counts (P2PKH
    /// constants).
    pub fn estimate_tx_size(&self, num_inputs: usize, num_outputs: usize) -> u64 {
        let base_size = 10;
        let input_size = 148;
        let output_size = 34;
        (base_size + num_inputs * input_size + num_outputs * output_size) as u64
    }

    fn fee_for(&self, num_inputs: usize, num_outputs: usize, fee_rate: u64) -> u64 {
        self.estimate_tx_size(num_inputs, num_outputs) * fee_rate
    }

    /// Select inputs and build outputs for a plain value send.
    ///
    /// Candidates are unprotected, confirmed outputs, taken largest-first
    /// until `amount + dev fee + fee(N)` is covered, where the fee is
    /// recomputed for the actual input count on every step (the fixed-point
    /// iteration: a new input raises the fee, which may require another
    /// input). A final refinement swaps the last input for the smallest
    /// candidate that still covers, minimizing the locked-up remainder.
    pub fn select_send(
        &self,
        available: &[Utxo],
        to_address: &str,
        amount_koinu: u64,
        change_address: &str,
        fee_rate: u64,
    ) -> Result<Selection, ProviderError> {
        let mut candidates: Vec<Utxo> = available
            .iter()
            .filter(|u| !u.is_protected(self.protected_threshold_koinu) && u.confirmations > 0)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.value_koinu.cmp(&a.value_koinu));

        let spendable: u64 = candidates.iter().map(|u| u.value_koinu).sum();

        // The amount is page-supplied; keep the arithmetic total even for
        // absurd values instead of overflowing.
        let base_target = match amount_koinu.checked_add(self.dev_fee_koinu) {
            Some(target) if target <= spendable => target,
            _ => {
                return Err(ProviderError::InsufficientFunds(format!(
                    "Need {} koinu plus fees, spendable balance is {} koinu",
                    amount_koinu, spendable
                )))
            }
        };

        // Greedy accumulation with per-step fee re-estimate. Assume a change
        // output (3 outputs) while selecting; whether change is actually
        // emitted is decided below.
        let mut selected: Vec<Utxo> = Vec::new();
        let mut total = 0u64;
        let mut covered = false;
        for utxo in &candidates {
            selected.push(utxo.clone());
            total += utxo.value_koinu;
            if total >= base_target.saturating_add(self.fee_for(selected.len(), 3, fee_rate)) {
                covered = true;
                break;
            }
        }

        if !covered {
            // All candidates selected. A change output may no longer be
            // affordable but the send itself can still fit without one.
            let n = selected.len();
            if n == 0 || total < base_target.saturating_add(self.fee_for(n, 2, fee_rate)) {
                return Err(ProviderError::InsufficientFunds(format!(
                    "Need {} koinu plus network fee, spendable balance is {} koinu",
                    base_target, spendable
                )));
            }
        } else {
            // Smallest-remainder refinement: replace the last input with the
            // smallest unused candidate that still covers.
            if let Some(last) = selected.last().cloned() {
                let rest: u64 = total - last.value_koinu;
                let required = base_target.saturating_add(self.fee_for(selected.len(), 3, fee_rate));
                let replacement = candidates
                    .iter()
                    .filter(|c| !selected.iter().any(|s| s.outpoint == c.outpoint))
                    .filter(|c| rest + c.value_koinu >= required)
                    .min_by_key(|c| c.value_koinu)
                    .cloned();
                if let Some(smaller) = replacement {
                    if smaller.value_koinu < last.value_koinu {
                        log::debug!(
                            "Swapping input {} ({} koinu) for {} ({} koinu)",
                            last.outpoint,
                            last.value_koinu,
                            smaller.outpoint,
                            smaller.value_koinu
                        );
                        total = rest + smaller.value_koinu;
                        *selected.last_mut().unwrap() = smaller;
                    }
                }
            }
        }

        let mut outputs = vec![
            TxOutput { address: to_address.to_string(), value_koinu: amount_koinu },
            TxOutput {
                address: self.dev_fee_address.clone(),
                value_koinu: self.dev_fee_koinu,
            },
        ];

        let fee_with_change = self.fee_for(selected.len(), 3, fee_rate);
        let excess = total - base_target;
        let (fee_koinu, change_koinu) = if excess > fee_with_change
            && excess - fee_with_change > self.change_dust_koinu
        {
            let change = excess - fee_with_change;
            outputs.push(TxOutput {
                address: change_address.to_string(),
                value_koinu: change,
            });
            (fee_with_change, change)
        } else {
            // Excess absorbed into the fee.
            (excess, 0)
        };

        log::debug!(
            "Selected {} input(s), fee {} koinu, change {} koinu",
            selected.len(),
            fee_koinu,
            change_koinu
        );

        Ok(Selection {
            inputs: selected,
            outputs,
            fee_koinu,
            dev_fee_koinu: self.dev_fee_koinu,
            change_koinu,
        })
    }

    /// Select inputs and build outputs for a doginal transfer.
    ///
    /// The input set is exactly the named inscriptions' backing UTXOs plus,
    /// when those cannot cover the flat fees, additional unprotected outputs.
    /// Each inscription's backing value goes to the recipient uncommingled
    /// (one output per inscription). The network fee component is flat
    /// 0.10 DOGE per inscription; the dev fee stays flat.
    pub fn select_doginal_transfer(
        &self,
        available: &[Utxo],
        doginals: &[Doginal],
        to_address: &str,
        change_address: &str,
    ) -> Result<Selection, ProviderError> {
        let mut inputs: Vec<Utxo> = Vec::new();
        let mut outputs: Vec<TxOutput> = Vec::new();

        for doginal in doginals {
            let backing = available
                .iter()
                .find(|u| u.outpoint == doginal.outpoint)
                .cloned()
                .ok_or_else(|| {
                    ProviderError::InscriptionNotFound(doginal.inscription_id.clone())
                })?;
            outputs.push(TxOutput {
                address: to_address.to_string(),
                value_koinu: backing.value_koinu,
            });
            inputs.push(backing);
        }

        let network_fee = self.doginal_network_fee_koinu * doginals.len() as u64;
        let needed = network_fee + self.dev_fee_koinu;

        outputs.push(TxOutput {
            address: self.dev_fee_address.clone(),
            value_koinu: self.dev_fee_koinu,
        });

        // The backing values are preserved for the recipient, so the fees
        // must come entirely from additional unprotected inputs.
        let mut toppers: Vec<Utxo> = available
            .iter()
            .filter(|u| !u.is_protected(self.protected_threshold_koinu) && u.confirmations > 0)
            .filter(|u| !inputs.iter().any(|i| i.outpoint == u.outpoint))
            .cloned()
            .collect();
        toppers.sort_by(|a, b| b.value_koinu.cmp(&a.value_koinu));

        let mut extra_total = 0u64;
        for topper in toppers {
            if extra_total >= needed {
                break;
            }
            extra_total += topper.value_koinu;
            inputs.push(topper);
        }

        if extra_total < needed {
            return Err(ProviderError::InsufficientFunds(format!(
                "Doginal transfer needs {} koinu in fees, only {} koinu of unprotected funds available",
                needed, extra_total
            )));
        }

        let excess = extra_total - needed;
        let change_koinu = if excess > self.change_dust_koinu {
            outputs.push(TxOutput {
                address: change_address.to_string(),
                value_koinu: excess,
            });
            excess
        } else {
            0
        };
        let fee_koinu = network_fee + (excess - change_koinu);

        log::debug!(
            "Doginal transfer: {} inscription(s), {} input(s), fee {} koinu",
            doginals.len(),
            inputs.len(),
            fee_koinu
        );

        Ok(Selection {
            inputs,
            outputs,
            fee_koinu,
            dev_fee_koinu: self.dev_fee_koinu,
            change_koinu,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutPoint;

    fn engine() -> FeeEngine {
        FeeEngine::new(&ProviderConfig::default())
    }

    fn utxo(txid: &str, value: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(txid, 0),
            value_koinu: value,
            confirmations: 6,
            inscribed: false,
        }
    }

    #[test]
    fn protected_outputs_never_selected_for_plain_send() {
        let utxos = vec![
            utxo("big", 300_000_000),
            Utxo { inscribed: true, ..utxo("inscribed", 200_000_000) },
            utxo("carrier", 5_000_000), // below 0.1 DOGE threshold
        ];
        let selection = engine()
            .select_send(&utxos, "DRecv", 100_000_000, "DChange", 500)
            .expect("selectable");
        assert!(selection.inputs.iter().all(|u| u.outpoint.txid == "big"));
    }

    #[test]
    fn insufficient_when_only_protected_funds_exist() {
        let utxos = vec![Utxo { inscribed: true, ..utxo("inscribed", 500_000_000) }];
        let err = engine()
            .select_send(&utxos, "DRecv", 100_000_000, "DChange", 500)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientFunds(_)));
    }

    #[test]
    fn fee_iteration_pulls_in_second_input() {
        // 0.5 DOGE send: 50M target + 1M dev fee + fee. The 50M input alone
        // cannot cover it, so selection must take both.
        let utxos = vec![utxo("a", 50_000_000), utxo("b", 10_000_000)];
        let selection = engine()
            .select_send(&utxos, "DRecv", 50_000_000, "DChange", 500)
            .expect("selectable");

        assert_eq!(selection.inputs.len(), 2);
        // 2 inputs, 3 outputs under the size model: 408 bytes * 500 koinu/B.
        assert_eq!(selection.fee_koinu, 204_000);
        assert_eq!(selection.change_koinu, 60_000_000 - 50_000_000 - 1_000_000 - 204_000);
        assert_eq!(selection.outputs.len(), 3);
        assert_eq!(selection.outputs[1].value_koinu, 1_000_000);
    }

    #[test]
    fn absurd_amount_reports_insufficient_funds() {
        // An amount near u64::MAX must not wrap the target arithmetic.
        let utxos = vec![utxo("a", 50_000_000)];
        let err = engine()
            .select_send(&utxos, "DRecv", u64::MAX, "DChange", 500)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientFunds(_)));

        let err = engine()
            .select_send(&utxos, "DRecv", u64::MAX - 500_000, "DChange", 500)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientFunds(_)));
    }

    #[test]
    fn unconfirmed_outputs_not_spendable() {
        let utxos = vec![
            Utxo { confirmations: 0, ..utxo("mempool", 500_000_000) },
            utxo("aged", 30_000_000),
        ];
        let selection = engine()
            .select_send(&utxos, "DRecv", 20_000_000, "DChange", 500)
            .expect("selectable");
        assert!(selection.inputs.iter().all(|u| u.outpoint.txid == "aged"));

        let err = engine()
            .select_send(&utxos, "DRecv", 100_000_000, "DChange", 500)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientFunds(_)));
    }

    #[test]
    fn unconfirmed_topper_cannot_fund_doginal_transfer() {
        let backing = Utxo { inscribed: true, ..utxo("back", 5_000_000) };
        let doginal = Doginal {
            inscription_id: "insc0".into(),
            outpoint: backing.outpoint.clone(),
            content_type: "image/png".into(),
            content_url: None,
            value_koinu: backing.value_koinu,
        };
        let utxos = vec![backing, Utxo { confirmations: 0, ..utxo("mempool", 20_000_000) }];
        let err = engine()
            .select_doginal_transfer(&utxos, &[doginal], "DRecv", "DChange")
            .unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientFunds(_)));
    }

    #[test]
    fn small_excess_absorbed_into_fee() {
        // Excess above the exact fee is under the 1M change dust threshold.
        let utxos = vec![utxo("a", 51_500_000)];
        let selection = engine()
            .select_send(&utxos, "DRecv", 50_000_000, "DChange", 500)
            .expect("selectable");
        assert_eq!(selection.change_koinu, 0);
        assert_eq!(selection.outputs.len(), 2);
        assert_eq!(selection.fee_koinu, 500_000); // 51.5M - 50M - 1M dev
    }

    #[test]
    fn smallest_remainder_swap_prefers_tighter_input() {
        // 30M target: the 100M input covers alone, but so does 40M. The
        // refinement should settle on the smaller single input.
        let utxos = vec![utxo("huge", 100_000_000), utxo("tight", 40_000_000)];
        let selection = engine()
            .select_send(&utxos, "DRecv", 30_000_000, "DChange", 500)
            .expect("selectable");
        assert_eq!(selection.inputs.len(), 1);
        assert_eq!(selection.inputs[0].outpoint.txid, "tight");
    }

    #[test]
    fn doginal_transfer_spends_backing_plus_topper() {
        let backing = Utxo { inscribed: true, ..utxo("back", 5_000_000) };
        let doginal = Doginal {
            inscription_id: "insc0".into(),
            outpoint: backing.outpoint.clone(),
            content_type: "image/png".into(),
            content_url: None,
            value_koinu: backing.value_koinu,
        };
        let utxos = vec![backing, utxo("plain", 20_000_000)];

        let selection = engine()
            .select_doginal_transfer(&utxos, &[doginal], "DRecv", "DChange")
            .expect("transferable");

        // Backing UTXO (5M) alone cannot pay 10M network + 1M dev fee.
        assert_eq!(selection.inputs.len(), 2);
        assert_eq!(selection.dev_fee_koinu, 1_000_000);
        // Recipient gets the backing value untouched.
        assert_eq!(selection.outputs[0].value_koinu, 5_000_000);
        // Change: 20M topper - 10M network - 1M dev.
        assert_eq!(selection.change_koinu, 9_000_000);
        assert_eq!(selection.fee_koinu, 10_000_000);
    }

    #[test]
    fn doginal_network_fee_scales_with_count() {
        let b1 = Utxo { inscribed: true, ..utxo("b1", 4_000_000) };
        let b2 = Utxo { inscribed: true, ..utxo("b2", 6_000_000) };
        let d = |id: &str, u: &Utxo| Doginal {
            inscription_id: id.into(),
            outpoint: u.outpoint.clone(),
            content_type: "text/plain".into(),
            content_url: None,
            value_koinu: u.value_koinu,
        };
        let doginals = vec![d("i1", &b1), d("i2", &b2)];
        let utxos = vec![b1, b2, utxo("plain", 30_000_000)];

        let selection = engine()
            .select_doginal_transfer(&utxos, &doginals, "DRecv", "DChange")
            .expect("transferable");

        // 2 x 10M network fee, flat 1M dev fee, 9M change from the topper.
        assert_eq!(selection.fee_koinu, 20_000_000);
        assert_eq!(selection.dev_fee_koinu, 1_000_000);
        assert_eq!(selection.change_koinu, 9_000_000);
    }

    #[test]
    fn missing_backing_utxo_reports_inscription_not_found() {
        let doginal = Doginal {
            inscription_id: "ghost".into(),
            outpoint: OutPoint::new("gone", 0),
            content_type: "image/png".into(),
            content_url: None,
            value_koinu: 100_000,
        };
        let err = engine()
            .select_doginal_transfer(&[utxo("plain", 50_000_000)], &[doginal], "DRecv", "DChange")
            .unwrap_err();
        assert!(matches!(err, ProviderError::InscriptionNotFound(id) if id == "ghost"));
    }

    #[test]
    fn topper_never_another_protected_output() {
        let backing = Utxo { inscribed: true, ..utxo("back", 5_000_000) };
        let other_carrier = Utxo { inscribed: true, ..utxo("other", 50_000_000) };
        let doginal = Doginal {
            inscription_id: "insc0".into(),
            outpoint: backing.outpoint.clone(),
            content_type: "image/png".into(),
            content_url: None,
            value_koinu: backing.value_koinu,
        };
        let err = engine()
            .select_doginal_transfer(&[backing, other_carrier], &[doginal], "DRecv", "DChange")
            .unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientFunds(_)));
    }
}
