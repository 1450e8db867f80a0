//! Payment required to submit a query onchain.
//!
//! `fee = maxFeePerGas * (callbackGasLimit + proofVerificationGas) + axiomQueryFee`, in wei.
use ethers_core::{
    types::U256,
    utils::{parse_units, ParseUnits},
};
use serde::{Deserialize, Serialize};

use crate::{config::FeeConfig, error::FeeError};

/// Fee parameters of a built query, with the resulting payment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeeData {
    pub max_fee_per_gas: U256,
    pub callback_gas_limit: u64,
    pub proof_verification_gas: u64,
    pub axiom_query_fee: U256,
    pub payment: U256,
}

#[derive(Clone, Copy, Debug)]
pub struct FeeCalculator {
    config: FeeConfig,
}

impl FeeCalculator {
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, max_fee_per_gas: U256, callback_gas_limit: u64) -> Result<U256, FeeError> {
        let overflow = |name| FeeError::InvalidFeeParameter {
            name,
            reason: "fee computation overflows uint256".to_string(),
        };
        let gas = U256::from(callback_gas_limit) + U256::from(self.config.proof_verification_gas);
        max_fee_per_gas
            .checked_mul(gas)
            .ok_or_else(|| overflow("maxFeePerGas"))?
            .checked_add(self.config.axiom_query_fee)
            .ok_or_else(|| overflow("axiomQueryFee"))
    }

    /// Computes the payment, taking configured defaults for missing parameters.
    pub fn fee_data(
        &self,
        max_fee_per_gas: Option<U256>,
        callback_gas_limit: Option<u64>,
    ) -> Result<FeeData, FeeError> {
        let max_fee_per_gas = max_fee_per_gas.unwrap_or(self.config.default_max_fee_per_gas);
        let callback_gas_limit =
            callback_gas_limit.unwrap_or(self.config.default_callback_gas_limit);
        let payment = self.compute(max_fee_per_gas, callback_gas_limit)?;
        Ok(FeeData {
            max_fee_per_gas,
            callback_gas_limit,
            proof_verification_gas: self.config.proof_verification_gas,
            axiom_query_fee: self.config.axiom_query_fee,
            payment,
        })
    }
}

/// Converts a decimal gwei amount to wei, rounding to the nearest wei.
pub fn gwei_to_wei(name: &'static str, gwei: f64) -> Result<U256, FeeError> {
    let invalid = |reason: &str| FeeError::InvalidFeeParameter { name, reason: reason.to_string() };
    if !gwei.is_finite() {
        return Err(invalid("must be finite"));
    }
    if gwei < 0.0 {
        return Err(invalid("must not be negative"));
    }
    let wei = (gwei * 1e9).round();
    if wei >= u128::MAX as f64 {
        return Err(invalid("too large"));
    }
    Ok(U256::from(wei as u128))
}

/// Parses a decimal gwei string such as `"2.5"` to wei.
pub fn parse_gwei(name: &'static str, gwei: &str) -> Result<U256, FeeError> {
    let invalid = |reason: String| FeeError::InvalidFeeParameter { name, reason };
    match parse_units(gwei.trim(), "gwei").map_err(|err| invalid(err.to_string()))? {
        ParseUnits::U256(wei) => Ok(wei),
        ParseUnits::I256(_) => Err(invalid("must not be negative".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::config::GWEI;

    #[test]
    fn test_default_fee() {
        let calculator = FeeCalculator::new(FeeConfig::default());
        let fee = calculator.compute(U256::from(3 * GWEI), 3_000_000).unwrap();
        assert_eq!(fee, U256::from(13_500_000_000_000_000u64));
    }

    #[test]
    fn test_fee_data_defaults() {
        let calculator = FeeCalculator::new(FeeConfig::default());
        let data = calculator.fee_data(None, None).unwrap();
        assert_eq!(data.max_fee_per_gas, U256::from(25 * GWEI));
        assert_eq!(data.callback_gas_limit, 100_000);
        // 25 gwei * 600_000 + 0.003 ether
        assert_eq!(data.payment, U256::from(18_000_000_000_000_000u64));
    }

    #[test]
    fn test_overflow() {
        let calculator = FeeCalculator::new(FeeConfig::default());
        let err = calculator.compute(U256::MAX, 1).unwrap_err();
        assert!(matches!(err, FeeError::InvalidFeeParameter { name: "maxFeePerGas", .. }));
    }

    #[test_case(f64::NAN; "nan")]
    #[test_case(f64::INFINITY; "infinite")]
    #[test_case(-1.0; "negative")]
    fn test_invalid_gwei(gwei: f64) {
        assert!(gwei_to_wei("maxFeePerGas", gwei).is_err());
    }

    #[test]
    fn test_decimal_gwei() {
        assert_eq!(gwei_to_wei("maxFeePerGas", 2.5).unwrap(), U256::from(2_500_000_000u64));
        assert_eq!(parse_gwei("maxFeePerGas", "2.5").unwrap(), U256::from(2_500_000_000u64));
        assert_eq!(parse_gwei("maxFeePerGas", "3").unwrap(), U256::from(3 * GWEI));
        assert!(parse_gwei("maxFeePerGas", "-3").is_err());
        assert!(parse_gwei("maxFeePerGas", "three").is_err());
    }
}
