//! End-to-end scenarios over the in-memory store: the full sale,
//! cancellation, reporting, and closing surface wired together.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use clubledger_core::{
    ArticleId, CustomerId, DocumentId, DomainError, Entity, Money, Quantity, TransactionId,
    UserId,
};
use clubledger_catalog::{Article, StockPolicy};
use clubledger_closing::{ClosingEngine, PhysicalCount};
use clubledger_events::{EventBus, InMemoryAuditSink, InMemoryEventBus, LedgerNotice};
use clubledger_ledger::{
    apply_stock_delta, BankAccountBalance, LedgerStore, MovementType, OutgoingInvoice,
    PaymentMethod, PurchaseDocument, Transaction, TransactionItem, TransactionType,
};
use clubledger_members::Customer;
use clubledger_reporting::{
    daily, highscore, profit_loss, HighscoreConfig, HighscorePeriod, ScoreMode,
};
use clubledger_sales::{AccountOps, CancellationEngine, SaleEngine, SaleLine, StockOps};

use crate::refresh::{spawn_highscore_refresher, HighscoreCache};
use crate::store::InMemoryLedgerStore;

fn store() -> Arc<InMemoryLedgerStore> {
    Arc::new(InMemoryLedgerStore::new())
}

fn seed_article(
    store: &Arc<InMemoryLedgerStore>,
    name: &str,
    price_cents: i64,
    stock_units: i64,
) -> ArticleId {
    let article = Article::new(
        ArticleId::new(),
        name,
        Money::from_cents(price_cents),
        "bottle",
        Utc::now(),
    )
    .unwrap();
    let id = *article.id();
    store.execute(|tx| tx.put_article(article)).unwrap();
    if stock_units != 0 {
        store
            .execute(|tx| {
                apply_stock_delta(
                    tx,
                    id,
                    Quantity::from_units(stock_units),
                    "initial stock",
                    MovementType::Delivery,
                    StockPolicy::AllowNegative,
                    Utc::now(),
                )
                .map(|_| ())
            })
            .unwrap();
    }
    id
}

fn seed_customer(
    store: &Arc<InMemoryLedgerStore>,
    name: &str,
    balance_cents: i64,
) -> CustomerId {
    let mut customer = Customer::new(CustomerId::new(), name, Utc::now()).unwrap();
    if balance_cents > 0 {
        customer.credit(Money::from_cents(balance_cents));
    }
    let id = *customer.id();
    store.execute(|tx| tx.put_customer(customer)).unwrap();
    id
}

fn article(store: &Arc<InMemoryLedgerStore>, id: ArticleId) -> Article {
    store.read(|tx| tx.article(id)).unwrap().unwrap()
}

fn customer(store: &Arc<InMemoryLedgerStore>, id: CustomerId) -> Customer {
    store.read(|tx| tx.customer(id)).unwrap().unwrap()
}

fn sale_engine(store: &Arc<InMemoryLedgerStore>) -> SaleEngine<Arc<InMemoryLedgerStore>> {
    SaleEngine::new(Arc::clone(store), StockPolicy::ForbidNegative)
}

fn one_line(article_id: ArticleId, units: i64) -> Vec<SaleLine> {
    vec![SaleLine {
        article_id,
        quantity: Quantity::from_units(units),
    }]
}

/// Insert a sale row directly, with a controlled timestamp, bypassing the
/// engine. Reporting tests need sales at specific points in time.
fn insert_sale_at(
    store: &Arc<InMemoryLedgerStore>,
    customer_id: Option<CustomerId>,
    article_id: ArticleId,
    units: i64,
    price_cents: i64,
    payment_method: PaymentMethod,
    at: chrono::DateTime<Utc>,
) -> TransactionId {
    let transaction_id = TransactionId::new();
    let quantity = Quantity::from_units(units);
    let price_per_unit = Money::from_cents(price_cents);
    let total = price_per_unit.mul_quantity(quantity);
    let items = vec![TransactionItem {
        transaction_id,
        article_id,
        quantity,
        price_per_unit,
        total_price: total,
    }];
    let transaction = Transaction::sale(
        transaction_id,
        payment_method,
        customer_id,
        total,
        UserId::new(),
        at,
    );
    store
        .execute(|tx| tx.insert_transaction(transaction, items))
        .unwrap();
    transaction_id
}

#[test]
fn cash_sale_decrements_stock_and_books_the_transaction() {
    let store = store();
    let cola = seed_article(&store, "Cola", 150, 20);
    let operator = UserId::new();

    let receipt = sale_engine(&store)
        .create_sale(PaymentMethod::Cash, None, &one_line(cola, 3), operator)
        .unwrap();

    assert_eq!(receipt.transaction.total_amount, Money::from_cents(450));
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].price_per_unit, Money::from_cents(150));
    assert_eq!(article(&store, cola).stock(), Quantity::from_units(17));

    let movements = store.read(|tx| tx.movements_for(cola)).unwrap();
    let sale_moves: Vec<_> = movements
        .iter()
        .filter(|m| m.kind == MovementType::Sale)
        .collect();
    assert_eq!(sale_moves.len(), 1);
    assert_eq!(sale_moves[0].quantity, Quantity::from_units(-3));

    let stored = store
        .read(|tx| tx.transaction(receipt.transaction.id))
        .unwrap()
        .unwrap();
    assert_eq!(stored.kind, TransactionType::Sale);
    assert!(!stored.cancelled);
}

#[test]
fn account_sale_debits_the_member_balance() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 50);
    let alex = seed_customer(&store, "Alex", 1_000);
    let before = customer(&store, alex).last_activity();

    sale_engine(&store)
        .create_sale(
            PaymentMethod::Account,
            Some(alex),
            &one_line(beer, 2),
            UserId::new(),
        )
        .unwrap();

    let after = customer(&store, alex);
    assert_eq!(after.balance(), Money::from_cents(700));
    assert!(after.last_activity() >= before);
}

#[test]
fn insufficient_balance_carries_numbers_and_rolls_back_stock() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 50);
    let broke = seed_customer(&store, "Broke", 100);

    let err = sale_engine(&store)
        .create_sale(
            PaymentMethod::Account,
            Some(broke),
            &one_line(beer, 2),
            UserId::new(),
        )
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::InsufficientBalance {
            available: Money::from_cents(100),
            required: Money::from_cents(300),
        }
    );
    // The stock decrement staged before the debit must not have survived.
    assert_eq!(article(&store, beer).stock(), Quantity::from_units(50));
    assert!(store.read(|tx| tx.transactions()).unwrap().is_empty());
    assert_eq!(customer(&store, broke).balance(), Money::from_cents(100));
}

#[test]
fn insufficient_stock_carries_numbers_and_books_nothing() {
    let store = store();
    let mate = seed_article(&store, "Mate", 200, 2);

    let err = sale_engine(&store)
        .create_sale(PaymentMethod::Cash, None, &one_line(mate, 5), UserId::new())
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::InsufficientStock {
            available: Quantity::from_units(2),
            required: Quantity::from_units(5),
        }
    );
    assert_eq!(article(&store, mate).stock(), Quantity::from_units(2));
    assert!(store.read(|tx| tx.transactions()).unwrap().is_empty());
}

#[test]
fn negative_stock_policy_lets_a_sale_overdraw() {
    let store = store();
    let mate = seed_article(&store, "Mate", 200, 2);

    let engine = SaleEngine::new(Arc::clone(&store), StockPolicy::AllowNegative);
    engine
        .create_sale(PaymentMethod::Cash, None, &one_line(mate, 5), UserId::new())
        .unwrap();

    assert_eq!(article(&store, mate).stock(), Quantity::from_units(-3));
}

#[test]
fn inactive_article_cannot_be_sold() {
    let store = store();
    let relic = seed_article(&store, "Relic", 100, 10);
    store
        .execute(|tx| {
            let mut article = tx.article(relic)?.unwrap();
            article.deactivate();
            tx.put_article(article)
        })
        .unwrap();

    let err = sale_engine(&store)
        .create_sale(PaymentMethod::Cash, None, &one_line(relic, 1), UserId::new())
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}

#[test]
fn unknown_article_and_customer_are_not_found() {
    let store = store();
    let cola = seed_article(&store, "Cola", 150, 5);

    let err = sale_engine(&store)
        .create_sale(
            PaymentMethod::Cash,
            None,
            &one_line(ArticleId::new(), 1),
            UserId::new(),
        )
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));

    let err = sale_engine(&store)
        .create_sale(
            PaymentMethod::Account,
            Some(CustomerId::new()),
            &one_line(cola, 1),
            UserId::new(),
        )
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[test]
fn cancellation_restores_stock_and_balance_exactly_once() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 50);
    let alex = seed_customer(&store, "Alex", 1_000);
    let operator = UserId::new();

    let receipt = sale_engine(&store)
        .create_sale(PaymentMethod::Account, Some(alex), &one_line(beer, 2), operator)
        .unwrap();
    assert_eq!(customer(&store, alex).balance(), Money::from_cents(700));
    assert_eq!(article(&store, beer).stock(), Quantity::from_units(48));

    let cancel = CancellationEngine::new(Arc::clone(&store));
    let outcome = cancel.cancel(receipt.transaction.id, operator).unwrap();

    assert!(outcome.original.cancelled);
    assert_eq!(outcome.refund.kind, TransactionType::Refund);
    assert_eq!(outcome.refund.total_amount, Money::from_cents(-300));
    assert_eq!(
        outcome.refund.original_transaction_id,
        Some(receipt.transaction.id)
    );
    assert_eq!(outcome.refund_items[0].quantity, Quantity::from_units(-2));
    assert_eq!(customer(&store, alex).balance(), Money::from_cents(1_000));
    assert_eq!(article(&store, beer).stock(), Quantity::from_units(50));

    // Exactly once.
    let err = cancel.cancel(receipt.transaction.id, operator).unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    assert_eq!(customer(&store, alex).balance(), Money::from_cents(1_000));

    // The compensating refund itself is not cancellable.
    let err = cancel.cancel(outcome.refund.id, operator).unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}

#[test]
fn cola_sale_and_cancellation_round_trip() {
    let store = store();
    let cola = seed_article(&store, "Cola", 100, 10);
    let operator = UserId::new();

    let receipt = sale_engine(&store)
        .create_sale(PaymentMethod::Cash, None, &one_line(cola, 3), operator)
        .unwrap();
    assert_eq!(receipt.transaction.total_amount, Money::from_cents(300));
    assert_eq!(article(&store, cola).stock(), Quantity::from_units(7));

    let cancel = CancellationEngine::new(Arc::clone(&store));
    let outcome = cancel.cancel(receipt.transaction.id, operator).unwrap();
    assert_eq!(article(&store, cola).stock(), Quantity::from_units(10));
    assert_eq!(outcome.refund.total_amount, Money::from_cents(-300));
    assert_eq!(outcome.refund_items[0].quantity, Quantity::from_units(-3));

    let err = cancel.cancel(receipt.transaction.id, operator).unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}

#[test]
fn concurrent_sales_never_oversell() {
    let store = store();
    let last = seed_article(&store, "Last crate", 150, 5);

    // One more buyer than there are units.
    let mut handles = Vec::new();
    for _ in 0..6 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            sale_engine(&store).create_sale(
                PaymentMethod::Cash,
                None,
                &one_line(last, 1),
                UserId::new(),
            )
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let sold = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(DomainError::InsufficientStock { .. })))
        .count();

    assert_eq!(sold, 5);
    assert_eq!(rejected, 1);
    assert_eq!(article(&store, last).stock(), Quantity::ZERO);
}

#[test]
fn notices_fire_after_commit_and_never_for_failures() {
    let store = store();
    let cola = seed_article(&store, "Cola", 150, 3);
    let bus = Arc::new(InMemoryEventBus::<LedgerNotice>::new());
    let sub = bus.subscribe();

    let engine = sale_engine(&store).with_notices(bus);
    let receipt = engine
        .create_sale(PaymentMethod::Cash, None, &one_line(cola, 2), UserId::new())
        .unwrap();

    match sub.recv_timeout(Duration::from_secs(1)).unwrap() {
        LedgerNotice::SaleCommitted {
            transaction_id,
            total,
            ..
        } => {
            assert_eq!(transaction_id, receipt.transaction.id);
            assert_eq!(total, Money::from_cents(300));
        }
        other => panic!("unexpected notice: {other:?}"),
    }

    engine
        .create_sale(PaymentMethod::Cash, None, &one_line(cola, 9), UserId::new())
        .unwrap_err();
    assert!(sub.try_recv().is_err());
}

#[test]
fn audit_trail_records_each_mutation() {
    let store = store();
    let cola = seed_article(&store, "Cola", 150, 10);
    let audit = Arc::new(InMemoryAuditSink::new());
    let operator = UserId::new();

    sale_engine(&store)
        .with_audit(Arc::clone(&audit) as Arc<dyn clubledger_events::AuditSink>)
        .create_sale(PaymentMethod::Cash, None, &one_line(cola, 1), operator)
        .unwrap();

    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "sale.create");
    assert_eq!(records[0].actor, operator);
}

#[test]
fn top_up_and_unique_names() {
    let store = store();
    let accounts = AccountOps::new(Arc::clone(&store));
    let operator = UserId::new();

    let alex = accounts.register_customer("Alex", operator).unwrap();
    let err = accounts.register_customer("Alex", operator).unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    accounts
        .top_up(*alex.id(), Money::from_cents(2_000), operator)
        .unwrap();
    assert_eq!(
        accounts.balance_of(*alex.id()).unwrap(),
        Money::from_cents(2_000)
    );

    let err = accounts
        .top_up(*alex.id(), Money::from_cents(-500), operator)
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[test]
fn delivery_converts_purchase_units() {
    let store = store();
    let crate_of_24 = Article::new(
        ArticleId::new(),
        "Pils",
        Money::from_cents(120),
        "bottle",
        Utc::now(),
    )
    .unwrap()
    .with_purchase_unit_factor(Quantity::from_units(24));
    let pils = *crate_of_24.id();
    store.execute(|tx| tx.put_article(crate_of_24)).unwrap();

    let ops = StockOps::new(Arc::clone(&store), StockPolicy::ForbidNegative);
    ops.receive_delivery(pils, Quantity::from_units(2), UserId::new())
        .unwrap();

    let article = article(&store, pils);
    assert_eq!(article.stock(), Quantity::from_units(48));
    let movements = store.read(|tx| tx.movements_for(pils)).unwrap();
    assert_eq!(movements[0].kind, MovementType::Delivery);
    assert_eq!(movements[0].quantity, Quantity::from_units(48));
}

#[test]
fn inventory_count_books_only_the_variance() {
    let store = store();
    let mate = seed_article(&store, "Mate", 200, 30);
    let ops = StockOps::new(Arc::clone(&store), StockPolicy::ForbidNegative);

    let outcome = ops
        .record_inventory_count(mate, Quantity::from_units(27), UserId::new())
        .unwrap();
    assert_eq!(outcome.variance, Quantity::from_units(-3));
    assert_eq!(article(&store, mate).stock(), Quantity::from_units(27));

    // A matching count writes nothing.
    let before = store.read(|tx| tx.movements_for(mate)).unwrap().len();
    let outcome = ops
        .record_inventory_count(mate, Quantity::from_units(27), UserId::new())
        .unwrap();
    assert_eq!(outcome.variance, Quantity::ZERO);
    let after = store.read(|tx| tx.movements_for(mate)).unwrap().len();
    assert_eq!(before, after);
}

#[test]
fn concurrent_inventory_counts_converge_on_the_counted_value() {
    let store = store();
    let mate = seed_article(&store, "Mate", 200, 10);

    // Two stocktakers submit the same shelf count at once. Whichever
    // commits second must see the corrected stock and book nothing, so
    // the variance is never applied twice.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            StockOps::new(Arc::clone(&store), StockPolicy::ForbidNegative)
                .record_inventory_count(mate, Quantity::from_units(8), UserId::new())
        }));
    }
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(article(&store, mate).stock(), Quantity::from_units(8));
    let inventory_sum: Quantity = store
        .read(|tx| tx.movements_for(mate))
        .unwrap()
        .iter()
        .filter(|m| m.kind == MovementType::Inventory)
        .map(|m| m.quantity)
        .sum();
    assert_eq!(inventory_sum, Quantity::from_units(-2));
}

#[test]
fn highscore_ranks_by_amount_and_respects_flags() {
    let store = store();
    let now = Utc.with_ymd_and_hms(2025, 6, 14, 20, 0, 0).unwrap();
    let beer = seed_article(&store, "Beer", 150, 0);
    let water = {
        let article = Article::new(
            ArticleId::new(),
            "Water",
            Money::from_cents(50),
            "bottle",
            Utc::now(),
        )
        .unwrap()
        .with_counts_for_highscore(false);
        let id = *article.id();
        store.execute(|tx| tx.put_article(article)).unwrap();
        id
    };
    let alex = seed_customer(&store, "Alex", 0);
    let kim = seed_customer(&store, "Kim", 0);

    let afternoon = Utc.with_ymd_and_hms(2025, 6, 14, 14, 0, 0).unwrap();
    insert_sale_at(&store, Some(alex), beer, 4, 150, PaymentMethod::Cash, afternoon);
    insert_sale_at(&store, Some(kim), beer, 2, 150, PaymentMethod::Cash, afternoon);
    // Water never scores, however much of it Kim buys.
    insert_sale_at(&store, Some(kim), water, 20, 50, PaymentMethod::Cash, afternoon);
    // Anonymous sales score nobody.
    insert_sale_at(&store, None, beer, 10, 150, PaymentMethod::Cash, afternoon);
    // Before the noon reset: out of the daily window.
    insert_sale_at(
        &store,
        Some(kim),
        beer,
        50,
        150,
        PaymentMethod::Cash,
        Utc.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap(),
    );

    let config = HighscoreConfig::default();
    let board = store
        .read(|tx| {
            highscore::compute(tx, &config, HighscorePeriod::Daily, ScoreMode::Amount, now, 10)
        })
        .unwrap();

    assert_eq!(board.len(), 2);
    assert_eq!(board[0].customer_name, "Alex");
    assert_eq!(board[0].amount, Money::from_cents(600));
    assert_eq!(board[1].customer_name, "Kim");
    assert_eq!(board[1].amount, Money::from_cents(300));
}

#[test]
fn highscore_count_mode_and_tie_order() {
    let store = store();
    let now = Utc.with_ymd_and_hms(2025, 6, 14, 20, 0, 0).unwrap();
    let beer = seed_article(&store, "Beer", 150, 0);
    let mate = seed_article(&store, "Mate", 200, 0);
    let alex = seed_customer(&store, "Alex", 0);
    let kim = seed_customer(&store, "Kim", 0);

    let t1 = Utc.with_ymd_and_hms(2025, 6, 14, 13, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2025, 6, 14, 15, 0, 0).unwrap();
    // Same count, Kim got there first.
    insert_sale_at(&store, Some(kim), beer, 3, 150, PaymentMethod::Cash, t1);
    insert_sale_at(&store, Some(alex), mate, 3, 200, PaymentMethod::Cash, t2);

    let config = HighscoreConfig::default();
    let board = store
        .read(|tx| {
            highscore::compute(tx, &config, HighscorePeriod::Daily, ScoreMode::Count, now, 10)
        })
        .unwrap();

    assert_eq!(board[0].customer_name, "Kim");
    assert_eq!(board[0].count, Quantity::from_units(3));
    assert_eq!(board[1].customer_name, "Alex");

    // By amount Alex wins outright.
    let board = store
        .read(|tx| {
            highscore::compute(tx, &config, HighscorePeriod::Daily, ScoreMode::Amount, now, 10)
        })
        .unwrap();
    assert_eq!(board[0].customer_name, "Alex");
}

#[test]
fn cancellation_lowers_the_highscore() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 50);
    let alex = seed_customer(&store, "Alex", 10_000);

    let receipt = sale_engine(&store)
        .create_sale(
            PaymentMethod::Account,
            Some(alex),
            &one_line(beer, 4),
            UserId::new(),
        )
        .unwrap();

    let config = HighscoreConfig::default();
    let board = |store: &Arc<InMemoryLedgerStore>| {
        store
            .read(|tx| {
                highscore::compute(
                    tx,
                    &config,
                    HighscorePeriod::Yearly,
                    ScoreMode::Amount,
                    Utc::now(),
                    10,
                )
            })
            .unwrap()
    };

    assert_eq!(board(&store).len(), 1);

    CancellationEngine::new(Arc::clone(&store))
        .cancel(receipt.transaction.id, UserId::new())
        .unwrap();
    assert!(board(&store).is_empty());
}

#[test]
fn daily_summary_splits_payment_methods_and_buckets_hours() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 0);
    let mate = seed_article(&store, "Mate", 200, 0);
    let alex = seed_customer(&store, "Alex", 0);
    let day = chrono::NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();

    insert_sale_at(
        &store,
        None,
        beer,
        2,
        150,
        PaymentMethod::Cash,
        Utc.with_ymd_and_hms(2025, 6, 14, 18, 15, 0).unwrap(),
    );
    insert_sale_at(
        &store,
        Some(alex),
        mate,
        1,
        200,
        PaymentMethod::Account,
        Utc.with_ymd_and_hms(2025, 6, 14, 21, 45, 0).unwrap(),
    );
    // The next calendar day, even though the same club evening.
    insert_sale_at(
        &store,
        None,
        beer,
        5,
        150,
        PaymentMethod::Cash,
        Utc.with_ymd_and_hms(2025, 6, 15, 0, 30, 0).unwrap(),
    );

    // A cancelled sale of the same day leaves revenue but shows up in the
    // cancelled tally.
    let undone = insert_sale_at(
        &store,
        None,
        beer,
        1,
        150,
        PaymentMethod::Cash,
        Utc.with_ymd_and_hms(2025, 6, 14, 19, 0, 0).unwrap(),
    );
    store
        .execute(|tx| {
            let mut txn = tx.transaction(undone)?.unwrap();
            txn.mark_cancelled(UserId::new(), Utc::now())?;
            tx.update_transaction(txn)
        })
        .unwrap();

    let summary = store.read(|tx| daily::compute(tx, day)).unwrap();

    assert_eq!(summary.transaction_count, 2);
    assert_eq!(summary.cash_revenue, Money::from_cents(300));
    assert_eq!(summary.account_revenue, Money::from_cents(200));
    assert_eq!(summary.total_revenue, Money::from_cents(500));
    assert_eq!(summary.cancelled_count, 1);
    assert_eq!(summary.cancelled_total, Money::from_cents(150));
    assert_eq!(summary.hourly_revenue[18], Money::from_cents(300));
    assert_eq!(summary.hourly_revenue[21], Money::from_cents(200));
    assert_eq!(summary.top_articles[0].article_name, "Beer");
}

#[test]
fn profit_loss_counts_only_paid_documents_in_window() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 0);
    let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let june = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

    insert_sale_at(&store, None, beer, 10, 150, PaymentMethod::Cash, june);

    store
        .execute(|tx| {
            let mut paid =
                PurchaseDocument::new(DocumentId::new(), "Brewery", "drinks", Money::from_cents(800), june)?;
            paid.mark_paid(june)?;
            tx.put_purchase_document(paid)?;

            // Created but unpaid: a commitment, not an expense.
            let unpaid = PurchaseDocument::new(
                DocumentId::new(),
                "Wholesaler",
                "supplies",
                Money::from_cents(9_999),
                june,
            )?;
            tx.put_purchase_document(unpaid)?;

            let mut rent =
                OutgoingInvoice::new(DocumentId::new(), "Chess club", Money::from_cents(400), june)?;
            rent.mark_paid(june)?;
            tx.put_outgoing_invoice(rent)
        })
        .unwrap();

    let result = store
        .read(|tx| profit_loss::compute(tx, from, to))
        .unwrap();

    assert_eq!(result.income, Money::from_cents(1_500));
    assert_eq!(result.cash_income, Money::from_cents(1_500));
    assert_eq!(result.account_income, Money::ZERO);
    assert_eq!(result.expenses, Money::from_cents(800));
    assert_eq!(result.extra_income, Money::from_cents(400));
    assert_eq!(result.profit, Money::from_cents(1_100));
    assert_eq!(result.expenses_by_supplier, vec![(
        "Brewery".to_owned(),
        Money::from_cents(800)
    )]);
    assert_eq!(result.expenses_by_category, vec![(
        "drinks".to_owned(),
        Money::from_cents(800)
    )]);
}

#[test]
fn closing_freezes_a_report_and_leaves_stock_alone() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 40);
    let mate = seed_article(&store, "Mate", 200, 12);
    seed_customer(&store, "Alex", 2_500);
    seed_customer(&store, "Kim", 1_000);

    let closing = ClosingEngine::new(Arc::clone(&store));
    let operator = UserId::new();
    let year = closing
        .open_year(
            "2025",
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            operator,
        )
        .unwrap();

    insert_sale_at(
        &store,
        None,
        beer,
        4,
        150,
        PaymentMethod::Cash,
        Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap(),
    );

    let report = closing
        .close(
            year.id,
            Money::from_cents(12_345),
            vec![BankAccountBalance {
                name: "Giro".to_owned(),
                balance: Money::from_cents(50_000),
            }],
            &[PhysicalCount {
                article_id: beer,
                counted: Quantity::from_units(38),
            }],
            operator,
        )
        .unwrap();

    assert_eq!(report.income, Money::from_cents(600));
    assert_eq!(report.member_liability, Money::from_cents(3_500));
    assert_eq!(report.cash_on_hand, Money::from_cents(12_345));

    let beer_line = report
        .inventory
        .iter()
        .find(|l| l.article_id == beer)
        .unwrap();
    assert_eq!(beer_line.system, Quantity::from_units(40));
    assert_eq!(beer_line.counted, Quantity::from_units(38));
    assert_eq!(beer_line.variance, Quantity::from_units(-2));

    // Uncounted articles default to zero variance.
    let mate_line = report
        .inventory
        .iter()
        .find(|l| l.article_id == mate)
        .unwrap();
    assert_eq!(mate_line.variance, Quantity::ZERO);

    // The count snapshot is report-only; stock stays as the ledger had it.
    assert_eq!(article(&store, beer).stock(), Quantity::from_units(40));

    // Closing is one-way and the report is frozen.
    let err = closing
        .close(year.id, Money::ZERO, vec![], &[], operator)
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    assert_eq!(
        closing.report_for(year.id).unwrap().unwrap().cash_on_hand,
        Money::from_cents(12_345)
    );
}

#[test]
fn highscore_refresher_keeps_the_cache_current() {
    let store = store();
    let beer = seed_article(&store, "Beer", 150, 50);
    let alex = seed_customer(&store, "Alex", 10_000);

    let bus = Arc::new(InMemoryEventBus::<LedgerNotice>::new());
    let changed = bus.subscribe();
    let cache = Arc::new(HighscoreCache::new());
    let worker = spawn_highscore_refresher(
        Arc::clone(&store),
        Arc::clone(&bus),
        Arc::clone(&cache),
        HighscoreConfig::default(),
        ScoreMode::Amount,
    );

    sale_engine(&store)
        .with_notices(bus)
        .create_sale(
            PaymentMethod::Account,
            Some(alex),
            &one_line(beer, 2),
            UserId::new(),
        )
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut refreshed = false;
    while Instant::now() < deadline {
        if let Ok(LedgerNotice::HighscoreChanged { .. }) =
            changed.recv_timeout(Duration::from_millis(50))
        {
            refreshed = true;
            break;
        }
    }
    worker.shutdown();

    assert!(refreshed);
    let board = cache.current();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].customer_name, "Alex");
}

proptest! {
    /// Conservation: whatever mix of deliveries, sales, and corrections
    /// hits an article, its stock equals the sum of its movement log.
    #[test]
    fn stock_always_equals_the_sum_of_movements(
        ops in proptest::collection::vec(
            prop_oneof![
                (1i64..50).prop_map(Op::Delivery),
                (1i64..5).prop_map(Op::Sell),
                (-10i64..10).prop_map(Op::Correct),
            ],
            1..40,
        )
    ) {
        let store = store();
        let cola = seed_article(&store, "Cola", 150, 0);
        let stock_ops = StockOps::new(Arc::clone(&store), StockPolicy::AllowNegative);
        let engine = SaleEngine::new(Arc::clone(&store), StockPolicy::ForbidNegative);
        let operator = UserId::new();

        for op in ops {
            match op {
                Op::Delivery(units) => {
                    stock_ops
                        .receive_delivery(cola, Quantity::from_units(units), operator)
                        .unwrap();
                }
                Op::Sell(units) => {
                    // May legitimately fail on insufficient stock.
                    let _ = engine.create_sale(
                        PaymentMethod::Cash,
                        None,
                        &one_line(cola, units),
                        operator,
                    );
                }
                Op::Correct(units) => {
                    if units != 0 {
                        stock_ops
                            .adjust(
                                cola,
                                Quantity::from_units(units),
                                "spot check",
                                MovementType::Correction,
                                operator,
                            )
                            .unwrap();
                    }
                }
            }
        }

        let article = article(&store, cola);
        let movement_sum: Quantity = store
            .read(|tx| tx.movements_for(cola))
            .unwrap()
            .iter()
            .map(|m| m.quantity)
            .sum();
        prop_assert_eq!(article.stock(), movement_sum);
    }

    /// Inverse: whatever a sale changed, cancelling it restores exactly.
    #[test]
    fn cancellation_is_the_exact_inverse_of_a_sale(
        price_cents in 1i64..10_000,
        units in 1i64..20,
        balance_extra in 0i64..5_000,
        stock_extra in 0i64..100,
    ) {
        let store = store();
        let article_id = seed_article(&store, "Cola", price_cents, units + stock_extra);
        let total = price_cents * units;
        let customer_id = seed_customer(&store, "Alex", total + balance_extra);

        let receipt = sale_engine(&store)
            .create_sale(
                PaymentMethod::Account,
                Some(customer_id),
                &one_line(article_id, units),
                UserId::new(),
            )
            .unwrap();

        CancellationEngine::new(Arc::clone(&store))
            .cancel(receipt.transaction.id, UserId::new())
            .unwrap();

        prop_assert_eq!(
            article(&store, article_id).stock(),
            Quantity::from_units(units + stock_extra)
        );
        prop_assert_eq!(
            customer(&store, customer_id).balance(),
            Money::from_cents(total + balance_extra)
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Delivery(i64),
    Sell(i64),
    Correct(i64),
}
