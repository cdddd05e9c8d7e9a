//! Break-even pricing of community-internal energy trade.
//!
//! The community buys everything its producers deliver (E) and sells
//! everything its consumers draw (I); the gap is exchanged with the grid.
//! Prices are chosen so that revenue equals cost for the interval:
//!
//! * surplus (`E >= I`): `I * p_con + (E - I) * p_grid_export = E * p_pv`
//! * deficit (`E < I`): `I * p_con = E * p_pv + (I - E) * p_grid_import`
//!
//! When the surplus price would exceed the grid import price, consumers are
//! charged the grid price and the producer payout is lowered instead.

use strum::{AsRefStr, Display};

use crate::domain::{PolicyTariffs, SettlementTariffs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TariffRegime {
    /// No consumption in the interval, nothing traded internally.
    NoConsumption,
    Surplus,
    /// Surplus where the consumer price hit the grid import price.
    SurplusCapped,
    Deficit,
}

/// Tariffs for an interval with `production` = E and `consumption` = I.
pub fn compute(production: f64, consumption: f64, policy: &PolicyTariffs) -> SettlementTariffs {
    compute_with_regime(production, consumption, policy).1
}

pub fn compute_with_regime(
    production: f64,
    consumption: f64,
    policy: &PolicyTariffs,
) -> (TariffRegime, SettlementTariffs) {
    let (e, i) = (production, consumption);
    let p_pv = policy.pv_payout_rate;
    let p_gc = policy.grid_import_rate;
    let p_gd = policy.grid_export_rate;

    let (regime, consumption_rate, pv_rate) = if i == 0.0 {
        (TariffRegime::NoConsumption, p_gc, p_pv)
    } else if e >= i {
        let candidate = p_gd + (e / i) * (p_pv - p_gd);
        if candidate > p_gc {
            // e >= i > 0 here, so the division is safe
            let pv_rate = (i * p_gc + (e - i) * p_gd) / e;
            (TariffRegime::SurplusCapped, p_gc, pv_rate)
        } else {
            (TariffRegime::Surplus, candidate, p_pv)
        }
    } else {
        (TariffRegime::Deficit, p_gc + (e / i) * (p_pv - p_gc), p_pv)
    };

    (
        regime,
        SettlementTariffs {
            consumption_rate,
            pv_rate,
            grid_import_rate: p_gc,
            grid_export_rate: p_gd,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const TOL: f64 = 1e-9;

    fn policy(pv: f64, gc: f64, gd: f64) -> PolicyTariffs {
        PolicyTariffs {
            pv_payout_rate: pv,
            grid_import_rate: gc,
            grid_export_rate: gd,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= TOL * (1.0 + a.abs().max(b.abs()))
    }

    /// Revenue minus cost of the community for one interval.
    fn balance(e: f64, i: f64, t: &SettlementTariffs) -> f64 {
        let revenue = i * t.consumption_rate + (e - i).max(0.0) * t.grid_export_rate;
        let cost = e * t.pv_rate + (i - e).max(0.0) * t.grid_import_rate;
        revenue - cost
    }

    #[rstest]
    #[case::surplus(policy(20.0, 30.0, 6.0), 10.0, 8.0, TariffRegime::Surplus, 23.5, 20.0)]
    #[case::deficit(policy(20.0, 30.0, 6.0), 10.0, 15.0, TariffRegime::Deficit, 30.0 - 20.0 / 3.0, 20.0)]
    #[case::capped(policy(28.0, 30.0, 6.0), 10.0, 2.0, TariffRegime::SurplusCapped, 30.0, 10.8)]
    #[case::balanced(policy(20.0, 30.0, 6.0), 5.0, 5.0, TariffRegime::Surplus, 20.0, 20.0)]
    #[case::no_production(policy(20.0, 30.0, 6.0), 0.0, 4.0, TariffRegime::Deficit, 30.0, 20.0)]
    fn test_scenarios(
        #[case] p: PolicyTariffs,
        #[case] e: f64,
        #[case] i: f64,
        #[case] regime: TariffRegime,
        #[case] consumption_rate: f64,
        #[case] pv_rate: f64,
    ) {
        let (r, t) = compute_with_regime(e, i, &p);
        assert_eq!(r, regime);
        assert!(close(t.consumption_rate, consumption_rate), "{t:?}");
        assert!(close(t.pv_rate, pv_rate), "{t:?}");
        assert_eq!(t.grid_import_rate, p.grid_import_rate);
        assert_eq!(t.grid_export_rate, p.grid_export_rate);
        assert!(balance(e, i, &t).abs() < 1e-9);
    }

    #[test]
    fn test_deficit_scenario_rounded() {
        let t = compute(10.0, 15.0, &policy(20.0, 30.0, 6.0));
        assert_eq!((t.consumption_rate * 100.0).round() / 100.0, 23.33);
    }

    #[rstest]
    #[case(0.0)]
    #[case(3.5)]
    #[case(1e6)]
    fn test_no_consumption_returns_policy_exactly(#[case] e: f64) {
        let p = policy(21.7, 31.3, 5.9);
        let (r, t) = compute_with_regime(e, 0.0, &p);
        assert_eq!(r, TariffRegime::NoConsumption);
        assert_eq!(t.consumption_rate, p.grid_import_rate);
        assert_eq!(t.pv_rate, p.pv_payout_rate);
        assert_eq!(t.grid_import_rate, p.grid_import_rate);
        assert_eq!(t.grid_export_rate, p.grid_export_rate);
    }

    #[test]
    fn test_cap_boundary_is_not_capped() {
        // candidate == p_gc exactly: 6 + 2 * (18 - 6) = 30
        let (r, t) = compute_with_regime(4.0, 2.0, &policy(18.0, 30.0, 6.0));
        assert_eq!(r, TariffRegime::Surplus);
        assert_eq!(t.consumption_rate, 30.0);
        assert_eq!(t.pv_rate, 18.0);
    }

    #[test]
    fn test_deficit_rate_unbounded_by_export_price() {
        // pv payout below the grid export price pulls the deficit price under it
        let p = policy(2.0, 30.0, 6.0);
        let t = compute(9.9, 10.0, &p);
        assert!(t.consumption_rate < p.grid_export_rate);
        assert!(balance(9.9, 10.0, &t).abs() < 1e-9);
    }

    #[test]
    fn test_deficit_rate_unbounded_by_pv_payout() {
        // pv payout above grid import price pushes the deficit price over both
        let p = policy(40.0, 30.0, 6.0);
        let t = compute(9.0, 10.0, &p);
        assert!(t.consumption_rate > p.grid_import_rate);
        assert!(t.consumption_rate < p.pv_payout_rate);
        assert!(balance(9.0, 10.0, &t).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_break_even_holds(
            e in 0.0f64..100.0,
            i in 0.001f64..100.0,
            pv in 0.0f64..50.0,
            gc in 0.0f64..50.0,
            gd in 0.0f64..50.0,
        ) {
            let p = policy(pv, gc, gd);
            let (regime, t) = compute_with_regime(e, i, &p);
            let scale = 1.0 + e.max(i) * pv.max(gc).max(gd);
            prop_assert!(balance(e, i, &t).abs() <= 1e-9 * scale, "{regime} {t:?}");
            if regime == TariffRegime::SurplusCapped {
                prop_assert_eq!(t.consumption_rate, gc);
                prop_assert!(t.pv_rate <= pv + 1e-9);
            }
        }

        #[test]
        fn prop_deficit_rate_between_pv_and_grid(
            i in 0.01f64..100.0,
            share in 0.001f64..0.999,
            pv in 0.0f64..29.0,
        ) {
            let gc = 30.0;
            let e = i * share;
            let t = compute(e, i, &policy(pv, gc, 6.0));
            prop_assert!(t.consumption_rate < gc);
            prop_assert!(t.consumption_rate > pv);
        }
    }
}
