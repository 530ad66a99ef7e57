//! Terminal output for quotes, snapshots and scenarios

use analytics::{OptionParameters, PositionSide, ScenarioAnalysis, StraddleQuote, DAYS_PER_YEAR};
use gateway::MarketSnapshot;

pub fn print_position(params: &OptionParameters) {
    println!("Position");
    println!("  Spot:            {:>12.2}", params.spot);
    println!("  Strike:          {:>12.2}", params.strike);
    println!("  IV:              {:>11.2}%", params.vol * 100.0);
    println!("  Days to expiry:  {:>12.0}", params.time * DAYS_PER_YEAR);
    println!("  Risk-free rate:  {:>11.2}%", params.rate * 100.0);
    println!();
}

pub fn print_quote(quote: &StraddleQuote) {
    let greeks = quote.greeks();
    println!("Straddle");
    println!("  Call value:      {:>12.4}", quote.call_value);
    println!("  Put value:       {:>12.4}", quote.put_value);
    println!("  Straddle value:  {:>12.4}", quote.straddle_value);
    println!("  Delta:           {:>12.4}", quote.delta);
    println!("  Gamma:           {:>12.4}", quote.gamma);
    println!("  Vega:            {:>12.4}  ({:.4} per vol point)", quote.vega, greeks.vega_per_point());
    println!("  Theta (annual):  {:>12.4}  ({:.4} per day)", quote.theta, greeks.theta_per_day());
    println!();
}

pub fn print_snapshot(snapshot: &MarketSnapshot) {
    println!("Market {}", snapshot.symbol);
    println!("  Spot:            {:>12.2}  at {}", snapshot.spot_price, snapshot.spot_time);
    println!(
        "  Implied vol:     {:>11.2}%  at {} (raw {:.6})",
        snapshot.implied_vol * 100.0,
        snapshot.iv_time,
        snapshot.raw_iv
    );
    println!();
}

/// Print the scenario with `side` reported first
pub fn print_scenario(scenario: &OptionParameters, analysis: &ScenarioAnalysis, side: PositionSide) {
    let other = match side {
        PositionSide::Long => PositionSide::Short,
        PositionSide::Short => PositionSide::Long,
    };

    println!(
        "Scenario (spot {:.2}, IV {:.2}%)",
        scenario.spot,
        scenario.vol * 100.0
    );
    println!("  Original value:  {:>12.4}", analysis.original_straddle_value);
    println!("  New value:       {:>12.4}", analysis.new_straddle_value);
    println!("  {:<5} P/L:       {:>12.4}", side.as_str(), analysis.pnl(side));
    println!("  {:<5} P/L:       {:>12.4}", other.as_str(), analysis.pnl(other));
    println!("  New delta:       {:>12.4}", analysis.new_greeks.delta);
    println!("  New gamma:       {:>12.4}", analysis.new_greeks.gamma);
    println!("  New vega:        {:>12.4}", analysis.new_greeks.vega);
    println!(
        "  New theta:       {:>12.4}  ({:.4} per day)",
        analysis.new_greeks.theta,
        analysis.new_greeks.theta_per_day()
    );
    println!();
}
