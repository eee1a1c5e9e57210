// ═══════════════════════════════════════════════════════════════════
// Integration Tests — PortfolioLedger facade end to end
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use portfolio_ledger_core::errors::CoreError;
use portfolio_ledger_core::models::distribution::TradeSize;
use portfolio_ledger_core::models::settings::{FeeSchedule, FilerStatus};
use portfolio_ledger_core::models::snapshot::{PriceQuote, PriceSnapshot};
use portfolio_ledger_core::models::transaction::{
    TransactionKind, TransactionRequest, TransactionSortOrder,
};
use portfolio_ledger_core::PortfolioLedger;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn snapshot() -> PriceSnapshot {
    PriceSnapshot::from_quotes([
        ("MEBL", PriceQuote::new(dec!(150), true)),
        ("OGDC", PriceQuote::new(dec!(15), true)),
        ("HBL", PriceQuote::new(dec!(100), false)),
    ])
}

/// Ledger with a 10 000 deposit, one buy and one dividend.
fn sample() -> PortfolioLedger {
    let mut ledger = PortfolioLedger::create_new("alice", "Retirement");
    ledger.deposit(dec!(10000), d(1)).unwrap();
    ledger
        .buy("MEBL", dec!(10), dec!(140), dec!(2.5), d(2), &snapshot())
        .unwrap();
    ledger.apply_dividend("MEBL", dec!(25), d(4)).unwrap();
    ledger
}

// ═══════════════════════════════════════════════════════════════════
// Lifecycle & dirty tracking
// ═══════════════════════════════════════════════════════════════════

mod lifecycle {
    use super::*;

    #[test]
    fn new_ledger_is_clean_and_empty() {
        let ledger = PortfolioLedger::create_new("alice", "Retirement");
        assert_eq!(ledger.owner(), "alice");
        assert_eq!(ledger.name(), "Retirement");
        assert_eq!(ledger.cash(), Decimal::ZERO);
        assert_eq!(ledger.transaction_count(), 0);
        assert!(!ledger.has_unsaved_changes());
    }

    #[test]
    fn mutations_mark_dirty_and_save_clears() {
        let mut ledger = sample();
        assert!(ledger.has_unsaved_changes());

        let bytes = ledger.save_to_bytes("pw").unwrap();
        assert!(!ledger.has_unsaved_changes());

        let loaded = PortfolioLedger::load_from_bytes(&bytes, "pw").unwrap();
        assert!(!loaded.has_unsaved_changes());
        assert_eq!(loaded.portfolio(), ledger.portfolio());
        assert_eq!(loaded.created_at(), ledger.created_at());
    }

    #[test]
    fn rejected_mutation_does_not_mark_dirty() {
        let mut ledger = PortfolioLedger::create_new("bob", "Main");
        assert!(ledger.withdraw(dec!(1), d(1)).is_err());
        assert!(!ledger.has_unsaved_changes());
    }

    #[test]
    fn save_and_load_by_owner_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = sample();
        let path = ledger.save_to_dir(dir.path(), "pw").unwrap();
        assert!(path.ends_with("alice__Retirement.pldg"));
        assert!(!ledger.has_unsaved_changes());

        let loaded = PortfolioLedger::load_from_dir(dir.path(), "alice", "Retirement", "pw").unwrap();
        assert_eq!(loaded.cash(), ledger.cash());
        assert_eq!(loaded.holdings(), ledger.holdings());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.pldg");
        let path = path.to_str().unwrap();
        let mut ledger = sample();
        ledger.save_to_file(path, "pw").unwrap();

        assert!(matches!(
            PortfolioLedger::load_from_file(path, "nope"),
            Err(CoreError::Decryption)
        ));
        let loaded = PortfolioLedger::load_from_file(path, "pw").unwrap();
        assert_eq!(loaded.transaction_count(), 3);
    }

    #[test]
    fn json_document_roundtrip() {
        let ledger = sample();
        let json = ledger.to_json().unwrap();
        let back = PortfolioLedger::from_json(&json).unwrap();
        assert_eq!(back.portfolio(), ledger.portfolio());
    }

    #[test]
    fn debug_output_is_compact() {
        let debug = format!("{:?}", sample());
        assert!(debug.contains("PortfolioLedger"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("alerts"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Transactions & queries
// ═══════════════════════════════════════════════════════════════════

mod transactions {
    use super::*;

    #[test]
    fn balances_after_sample() {
        let ledger = sample();
        // 10 × 140 + 2.5 = 1402.5
        assert_eq!(ledger.cash(), dec!(8622.5));
        assert_eq!(ledger.holding("mebl").unwrap().shares, dec!(10));
        assert_eq!(ledger.dividends()["MEBL"], dec!(25));
        assert_eq!(ledger.realized_gain(), Decimal::ZERO);
    }

    #[test]
    fn sell_books_realized_gain() {
        let mut ledger = sample();
        let tx = ledger
            .sell("MEBL", dec!(10), dec!(150), Decimal::ZERO, d(5), &snapshot())
            .unwrap();
        // gain 1500 - 1402.5 = 97.5, CGT 12.1875
        assert_eq!(tx.realized_gain, dec!(85.3125));
        assert!(ledger.holding("MEBL").is_none());
    }

    #[test]
    fn reverse_by_index_and_id() {
        let mut ledger = sample();
        let dividend_id = ledger.transactions()[2].id;
        ledger.reverse_transaction_by_id(dividend_id).unwrap();
        assert!(ledger.dividends().is_empty());

        ledger.reverse_transaction(1).unwrap();
        assert_eq!(ledger.cash(), dec!(10000));
        assert!(ledger.holdings().is_empty());

        assert!(matches!(
            ledger.reverse_transaction_by_id(dividend_id),
            Err(CoreError::TransactionNotFound(_))
        ));
        assert!(matches!(
            ledger.reverse_transaction(3),
            Err(CoreError::InvalidIndex { index: 3, len: 1 })
        ));
    }

    #[test]
    fn bulk_apply_is_all_or_nothing() {
        let mut ledger = sample();
        let before = ledger.portfolio().clone();
        let requests = vec![
            TransactionRequest::buy("OGDC", dec!(10), dec!(15), Decimal::ZERO, d(6)),
            TransactionRequest::buy("HBL", dec!(1000), dec!(100), Decimal::ZERO, d(6)),
        ];
        assert!(matches!(
            ledger.apply_transactions(requests, &snapshot()),
            Err(CoreError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.portfolio(), &before);

        let requests = vec![
            TransactionRequest::buy("OGDC", dec!(10), dec!(15), Decimal::ZERO, d(6)),
            TransactionRequest::withdraw(dec!(100), d(7)),
        ];
        let applied = ledger.apply_transactions(requests, &snapshot()).unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(ledger.transaction_count(), 5);
    }

    #[test]
    fn notes_and_search() {
        let mut ledger = sample();
        let id = ledger.transactions()[1].id;
        ledger
            .set_transaction_notes(id, Some("Meezan, long term".into()))
            .unwrap();
        assert_eq!(ledger.get_transaction(id).unwrap().notes.as_deref(), Some("Meezan, long term"));

        assert_eq!(ledger.search_transactions("meezan").len(), 1);
        // ticker match covers the buy and the dividend
        assert_eq!(ledger.search_transactions("mebl").len(), 2);
        assert!(ledger.search_transactions("nothing").is_empty());
    }

    #[test]
    fn filters_and_sorting() {
        let ledger = sample();
        assert_eq!(ledger.get_transactions_for_ticker("mebl").len(), 2);
        assert_eq!(ledger.get_transactions_by_kind(TransactionKind::Deposit).len(), 1);
        assert_eq!(ledger.get_transactions_in_range(d(2), d(4)).len(), 2);

        let newest = ledger.get_transactions_sorted(&TransactionSortOrder::DateDesc);
        assert_eq!(newest[0].kind, TransactionKind::Dividend);
        let largest = ledger.get_transactions_sorted(&TransactionSortOrder::AmountDesc);
        assert_eq!(largest[0].kind, TransactionKind::Deposit);
        let by_ticker = ledger.get_transactions_sorted(&TransactionSortOrder::TickerAsc);
        assert!(by_ticker.last().unwrap().ticker.is_none());
    }

    #[test]
    fn dates_and_age() {
        let ledger = sample();
        assert_eq!(ledger.earliest_transaction_date(), Some(d(1)));
        assert_eq!(ledger.latest_transaction_date(), Some(d(4)));
        assert_eq!(ledger.portfolio_age_days(d(31)), Some(30));
        assert_eq!(PortfolioLedger::create_new("a", "b").portfolio_age_days(d(31)), None);
    }

    #[test]
    fn recent_alerts_newest_first_and_capped() {
        let mut ledger = PortfolioLedger::create_new("alice", "Main");
        for day in 1..=12 {
            ledger.deposit(Decimal::from(day), d(day)).unwrap();
        }
        let alerts = ledger.recent_alerts();
        assert_eq!(alerts.len(), 10);
        assert!(alerts[0].message.starts_with("Deposited 12"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Allocation & distribution
// ═══════════════════════════════════════════════════════════════════

mod allocation {
    use super::*;

    #[test]
    fn targets_drift_and_contributions() {
        let mut ledger = sample();
        ledger
            .update_targets([("MEBL", dec!(50)), ("OGDC", dec!(50))])
            .unwrap();
        assert_eq!(ledger.targets().len(), 2);

        let drift = ledger.compute_drift();
        let mebl = drift.iter().find(|r| r.ticker == "MEBL").unwrap();
        assert_eq!(mebl.current_pct, dec!(100));
        assert_eq!(mebl.drift, dec!(50));

        let plan = ledger.plan_contributions(dec!(1402.5)).unwrap();
        let ogdc = plan.iter().find(|r| r.ticker == "OGDC").unwrap();
        assert_eq!(ogdc.contribution, dec!(1402.5));
    }

    #[test]
    fn invalid_targets_rejected() {
        let mut ledger = sample();
        assert!(matches!(
            ledger.update_targets([("MEBL", dec!(95))]),
            Err(CoreError::InvalidAllocation(_))
        ));
        assert!(ledger.targets().is_empty());
    }

    #[test]
    fn distribution_executes_and_clears_uninvested_cash() {
        let mut ledger = PortfolioLedger::create_new("alice", "Main");
        ledger.deposit(dec!(10000), d(1)).unwrap();
        assert_eq!(ledger.uninvested_cash(), dec!(10000));
        ledger
            .update_targets([("OGDC", dec!(100))])
            .unwrap();

        let rows = ledger.calculate_distribution(ledger.uninvested_cash(), &snapshot()).unwrap();
        let summary = PortfolioLedger::distribution_summary(&rows);
        assert_eq!(summary.orders, 1);
        assert_eq!(summary.net_invested, dec!(9997.9425));

        let txs = ledger.execute_distribution(&rows, d(2)).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(ledger.cash(), dec!(2.0575));
        assert!(ledger.deposit_log().is_empty());
        assert_eq!(ledger.uninvested_cash(), Decimal::ZERO);
        assert_eq!(ledger.holding("OGDC").unwrap().shares, dec!(665));
    }

    #[test]
    fn uninvested_cash_capped_at_balance() {
        let mut ledger = PortfolioLedger::create_new("alice", "Main");
        ledger.deposit(dec!(1000), d(1)).unwrap();
        ledger.withdraw(dec!(400), d(2)).unwrap();
        assert_eq!(ledger.uninvested_cash(), dec!(600));
    }

    #[test]
    fn compliant_distribution_drops_flagged_out() {
        let mut ledger = PortfolioLedger::create_new("alice", "Main");
        ledger
            .update_targets([("HBL", dec!(50)), ("MEBL", dec!(50))])
            .unwrap();
        let rows = ledger
            .calculate_compliant_distribution(dec!(3000), &snapshot())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "MEBL");
        assert_eq!(rows[0].allocated_cash, dec!(3000));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Settings, analytics & timeline
// ═══════════════════════════════════════════════════════════════════

mod settings_and_views {
    use super::*;

    #[test]
    fn fee_schedule_validation() {
        let mut ledger = sample();
        let bad = FeeSchedule {
            brokerage_rate: dec!(-0.001),
            ..FeeSchedule::default()
        };
        assert!(matches!(
            ledger.set_fee_schedule(bad),
            Err(CoreError::ValidationError(ref msg)) if msg.contains("brokerage_rate")
        ));

        let cheaper = FeeSchedule {
            brokerage_rate: dec!(0.001),
            ..FeeSchedule::default()
        };
        ledger.set_fee_schedule(cheaper).unwrap();
        let fee = ledger.compute_trade_fee(dec!(100), TradeSize::Units(dec!(10))).unwrap();
        assert_eq!(fee.fee, dec!(1));
        assert_eq!(fee.tax, dec!(0.15));
    }

    #[test]
    fn filer_status_changes_potential_cgt() {
        let mut ledger = sample();
        let before = ledger.dashboard(&snapshot()).potential_cgt;
        ledger.set_filer_status(FilerStatus::NonFiler);
        assert_eq!(ledger.settings().filer_status, FilerStatus::NonFiler);
        let after = ledger.dashboard(&snapshot()).potential_cgt;
        assert!(after > before);
    }

    #[test]
    fn setting_same_status_keeps_clean() {
        let mut ledger = sample();
        ledger.save_to_bytes("pw").unwrap();
        ledger.set_filer_status(FilerStatus::Filer);
        assert!(!ledger.has_unsaved_changes());
    }

    #[test]
    fn views_over_the_ledger() {
        let ledger = sample();
        let rows = ledger.portfolio_rows(&snapshot());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].market_value, dec!(1500));
        assert_eq!(rows[0].dividends, dec!(25));

        let dash = ledger.dashboard(&snapshot());
        assert_eq!(dash.total_value, dec!(10122.5));
        assert_eq!(dash.net_deposits, dec!(10000));

        let points = ledger.timeline();
        assert_eq!(points.len(), 3);
        assert_eq!(points.last().unwrap().invested, dec!(1402.5));
        assert_eq!(ledger.timeline_in_range(d(2), d(3)).unwrap().len(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Export / import
// ═══════════════════════════════════════════════════════════════════

mod export_import {
    use super::*;

    #[test]
    fn csv_export() {
        let mut ledger = sample();
        let id = ledger.transactions()[0].id;
        ledger
            .set_transaction_notes(id, Some("salary, \"march\"".into()))
            .unwrap();
        let csv = ledger.export_transactions_to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "id,date,kind,ticker,quantity,price,fee,tax,total,realized_gain,notes"
        );
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with("\"salary, \"\"march\"\"\""));
        assert!(lines[2].contains(",Buy,MEBL,10,140,2.5,"));
    }

    #[test]
    fn csv_export_quotes_tickers_with_commas() {
        let mut ledger = sample();
        let quotes = PriceSnapshot::from_quotes([("A,B", PriceQuote::new(dec!(10), true))]);
        ledger.buy("a,b", dec!(3), dec!(10), Decimal::ZERO, d(5), &quotes).unwrap();

        let csv = ledger.export_transactions_to_csv();
        let last = csv.lines().last().unwrap();
        assert!(last.contains(",Buy,\"A,B\",3,10,0,"));
        assert_eq!(last.split(',').count(), 12);
    }

    #[test]
    fn exported_json_replays_into_fresh_ledger() {
        let source = sample();
        let json = source.export_transactions_to_json().unwrap();

        let mut target = PortfolioLedger::create_new("alice", "Copy");
        let count = target.import_transactions_from_json(&json, &snapshot()).unwrap();
        assert_eq!(count, 3);
        assert_eq!(target.cash(), source.cash());
        assert_eq!(target.holdings(), source.holdings());
        assert_eq!(target.dividends(), source.dividends());
    }

    #[test]
    fn import_requests() {
        let json = r#"[
            { "date": "2025-03-01", "kind": "Deposit", "quantity": "500" },
            { "date": "2025-03-02", "kind": "Buy", "ticker": "ogdc", "quantity": "10", "price": "15", "fee": "0.35" }
        ]"#;
        let mut ledger = PortfolioLedger::create_new("alice", "Main");
        assert_eq!(ledger.import_transactions_from_json(json, &snapshot()).unwrap(), 2);
        assert_eq!(ledger.cash(), dec!(349.65));
    }

    #[test]
    fn failed_import_applies_nothing() {
        let json = r#"[
            { "date": "2025-03-01", "kind": "Deposit", "quantity": "100" },
            { "date": "2025-03-02", "kind": "Withdraw", "quantity": "500" }
        ]"#;
        let mut ledger = PortfolioLedger::create_new("alice", "Main");
        assert!(ledger.import_transactions_from_json(json, &snapshot()).is_err());
        assert_eq!(ledger.transaction_count(), 0);
        assert!(!ledger.has_unsaved_changes());
    }

    #[test]
    fn malformed_import() {
        let mut ledger = PortfolioLedger::create_new("alice", "Main");
        assert!(matches!(
            ledger.import_transactions_from_json("not json", &snapshot()),
            Err(CoreError::Deserialization(_))
        ));
    }
}
