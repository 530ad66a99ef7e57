use std::f64::consts::PI;

use crate::error::AnalyticsError;
use crate::types::{Greeks, OptionParameters, OptionType};
use crate::Result;

pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Abramowitz & Stegun 26.2.17, |error| < 7.5e-8)
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + 0.2316419 * x.abs());
    let poly = k * (0.319381530
        + k * (-0.356563782
        + k * (1.781477937
        + k * (-1.821255978
        + k * 1.330274429))));

    let approx = 1.0 - norm_pdf(x) * poly;

    if x >= 0.0 {
        approx
    } else {
        1.0 - approx
    }
}

pub fn d1_d2(params: &OptionParameters) -> Result<(f64, f64)> {
    params.validate()?;

    let s = params.spot;
    let k = params.strike;
    let t = params.time;
    let v = params.vol;
    let r = params.rate;

    let d1 = ((s / k).ln() + (r + 0.5 * v * v) * t) / (v * t.sqrt());
    let d2 = d1 - v * t.sqrt();

    finite("d1", d1)?;
    finite("d2", d2)?;
    Ok((d1, d2))
}

/// Fair value of a European option
pub fn option_value(params: &OptionParameters, option_type: OptionType) -> Result<f64> {
    let (d1, d2) = d1_d2(params)?;
    let s = params.spot;
    let k = params.strike;
    let t = params.time;
    let r = params.rate;

    let price = match option_type {
        OptionType::Call => s * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2),
        OptionType::Put => k * (-r * t).exp() * norm_cdf(-d2) - s * norm_cdf(-d1),
    };

    finite("option value", price)
}

/// Greeks of a European option; theta is annualized
pub fn option_greeks(params: &OptionParameters, option_type: OptionType) -> Result<Greeks> {
    let (d1, d2) = d1_d2(params)?;
    let s = params.spot;
    let k = params.strike;
    let t = params.time;
    let v = params.vol;
    let r = params.rate;

    let pdf = norm_pdf(d1);
    let sqrt_t = t.sqrt();
    let discounted_strike = k * (-r * t).exp();

    let delta = match option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    };

    let gamma = pdf / (s * v * sqrt_t);

    let vega = s * pdf * sqrt_t;

    let theta = match option_type {
        OptionType::Call => -(s * pdf * v) / (2.0 * sqrt_t) - r * discounted_strike * norm_cdf(d2),
        OptionType::Put => -(s * pdf * v) / (2.0 * sqrt_t) + r * discounted_strike * norm_cdf(-d2),
    };

    let rho = match option_type {
        OptionType::Call => t * discounted_strike * norm_cdf(d2),
        OptionType::Put => -t * discounted_strike * norm_cdf(-d2),
    };

    Ok(Greeks {
        delta: finite("delta", delta)?,
        gamma: finite("gamma", gamma)?,
        vega: finite("vega", vega)?,
        theta: finite("theta", theta)?,
        rho: finite("rho", rho)?,
    })
}

fn finite(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalyticsError::invalid(field, format!("is not finite ({value})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn atm() -> OptionParameters {
        OptionParameters::from_days(100.0, 100.0, 30, 0.05, 0.30)
    }

    #[test]
    fn test_reference_values() {
        let call = option_value(&atm(), OptionType::Call).unwrap();
        let put = option_value(&atm(), OptionType::Put).unwrap();

        assert!((call - 3.632).abs() < 1e-3, "call = {call}");
        assert!((put - 3.222).abs() < 1e-3, "put = {put}");
    }

    #[test]
    fn test_reference_greeks() {
        let call = option_greeks(&atm(), OptionType::Call).unwrap();
        let put = option_greeks(&atm(), OptionType::Put).unwrap();

        assert!((call.delta - 0.5362).abs() < 1e-4);
        assert!((put.delta + 0.4638).abs() < 1e-4);
        assert!((call.gamma - 0.04619).abs() < 1e-5);
        assert!((call.vega - 11.390).abs() < 1e-3);
        assert!((call.theta + 23.287).abs() < 1e-3);
        assert!((put.theta + 18.307).abs() < 1e-3);
        assert_eq!(call.gamma, put.gamma);
        assert_eq!(call.vega, put.vega);
    }

    #[test]
    fn test_put_call_parity() {
        let cases = [
            (100.0, 100.0, 30.0 / 365.0, 0.05, 0.30),
            (187.5, 150.0, 0.5, 0.01, 0.65),
            (42.0, 55.0, 2.0, 0.07, 0.18),
            (1000.0, 990.0, 1.0 / 365.0, 0.0, 1.2),
        ];

        for (spot, strike, time, rate, vol) in cases {
            let params = OptionParameters::new(spot, strike, time, rate, vol);
            let call = option_value(&params, OptionType::Call).unwrap();
            let put = option_value(&params, OptionType::Put).unwrap();

            let parity_lhs = call - put;
            let parity_rhs = spot - strike * (-rate * time).exp();

            assert!(
                (parity_lhs - parity_rhs).abs() < 1e-6 * spot,
                "parity broken for {params:?}: {parity_lhs} vs {parity_rhs}"
            );
        }
    }

    #[test]
    fn test_delta_relationship() {
        let call = option_greeks(&atm(), OptionType::Call).unwrap();
        let put = option_greeks(&atm(), OptionType::Put).unwrap();
        assert!((call.delta - put.delta - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_vol_is_rejected() {
        let params = OptionParameters { vol: 0.0, ..atm() };
        assert_matches!(
            option_value(&params, OptionType::Call),
            Err(AnalyticsError::InvalidInput { field: "volatility", .. })
        );
    }

    #[test]
    fn test_expired_is_rejected() {
        let params = OptionParameters::from_days(100.0, 100.0, 0, 0.05, 0.3);
        assert_matches!(
            option_greeks(&params, OptionType::Put),
            Err(AnalyticsError::InvalidInput { field: "time to expiry", .. })
        );
    }

    #[test]
    fn test_overflowing_inputs_are_rejected() {
        let params = OptionParameters::new(1e-300, 1e300, 1e-300, 0.05, 1e-300);
        assert!(option_value(&params, OptionType::Call).is_err());
    }

    #[test]
    fn test_norm_cdf_symmetry() {
        assert!((norm_cdf(0.5) + norm_cdf(-0.5) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_norm_cdf_extreme() {
        assert!((norm_cdf(10.0) - 1.0).abs() < 1e-10);
        assert!(norm_cdf(-10.0).abs() < 1e-10);
    }

    #[test]
    fn test_deep_itm_call_near_forward_intrinsic() {
        let params = OptionParameters::from_days(200.0, 100.0, 30, 0.05, 0.3);
        let call = option_value(&params, OptionType::Call).unwrap();
        let forward_intrinsic = 200.0 - 100.0 * (-0.05 * params.time).exp();
        assert!((call - forward_intrinsic).abs() < 1e-4);
    }
}
