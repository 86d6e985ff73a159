//! End-to-end auction scenarios across four nodes and one sequencer.
//!
//! Alice sells, Bob and Charlie bid, the Bank issues cash. Every node shares
//! one ledger as its vault and one manually driven clock.

use std::sync::{Arc, Mutex, PoisonError};

use auctionhouse_flows::{
    Clock, Ledger, LocalNetwork, LocalSequencer, ManualClock, NodeContext, Responder,
    ResponderPolicy, Scheduler, SettleOutcome, SettlementTrigger, VaultQuery, bid, end_auction,
    issue_cash, issue_item, list_item, on_trigger, queries, run_scheduled, settle,
};
use auctionhouse_types::{
    Amount, AuctionCommand, AuctionError, CommandData, ContractKind, Currency, FlowConfig,
    Identity, RetryConfig, SequencerConfig, StateAndRef, UniqueId,
};
use chrono::{Duration, Utc};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn gbp(units: i64) -> Amount {
    Amount::from_major(units, Currency::gbp()).unwrap()
}

struct Node {
    ctx: NodeContext,
    responder: Arc<Responder>,
}

struct Market {
    clock: Arc<ManualClock>,
    ledger: Arc<Ledger>,
    alice: Node,
    bob: Node,
    charlie: Node,
    bank: Node,
}

fn market_with(config: FlowConfig) -> Market {
    init_tracing();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let ledger = Arc::new(Ledger::new());
    let sequencer = Arc::new(LocalSequencer::new(
        Identity::from_seed("Sequencer", [9; 32]),
        SequencerConfig::default(),
        clock.clone(),
        ledger.clone(),
    ));
    let network = Arc::new(LocalNetwork::new());
    let join = |name: &str, seed: u8| {
        let (ctx, responder) = network.join(
            Identity::from_seed(name, [seed; 32]),
            clock.clone(),
            ledger.clone(),
            sequencer.clone(),
            config,
        );
        Node { ctx, responder }
    };
    let (alice, bob, charlie, bank) = (
        join("Alice", 1),
        join("Bob", 2),
        join("Charlie", 3),
        join("Bank", 4),
    );
    Market {
        clock,
        ledger,
        alice,
        bob,
        charlie,
        bank,
    }
}

fn market() -> Market {
    market_with(FlowConfig {
        retry: RetryConfig {
            max_attempts: 3,
            backoff_ms: 0,
            max_backoff_ms: 0,
        },
        ..FlowConfig::default()
    })
}

/// Alice issues a diamond ring and lists it at 1000 GBP for one hour.
fn list_ring(m: &Market) -> (UniqueId, UniqueId) {
    let issued = issue_item(&m.alice.ctx, "diamond ring").unwrap();
    let item_id = issued.tx().output_items()[0].id;
    let expiry = m.clock.now() + Duration::hours(1);
    let listed = list_item(&m.alice.ctx, item_id, gbp(1000), expiry).unwrap();
    let auction_id = listed.tx().output_auctions()[0].id;
    (item_id, auction_id)
}

fn expire(m: &Market) {
    m.clock.advance(Duration::minutes(61));
}

fn settled_by_scheduler(node: &Node) -> SettleOutcome {
    let mut fired = run_scheduled(&node.ctx);
    assert_eq!(fired.len(), 1, "expected exactly one due trigger");
    fired.remove(0).1.unwrap()
}

// =========================================================================
// Listing and bidding
// =========================================================================

#[test]
fn listing_produces_open_auction_and_listed_item() {
    let m = market();
    let (item_id, auction_id) = list_ring(&m);

    let auctions = queries::all_auctions(m.ledger.as_ref());
    assert_eq!(auctions.len(), 1);
    assert_eq!(auctions[0].id, auction_id);
    assert!(auctions[0].bidder.is_none());
    assert_eq!(auctions[0].price, gbp(1000));

    let item = m.ledger.find_latest_by_id(item_id).unwrap();
    assert!(item.state.as_item().unwrap().listed);
    assert_eq!(m.alice.ctx.scheduler.pending().len(), 1);
}

#[test]
fn listing_twice_is_refused() {
    let m = market();
    let (item_id, _) = list_ring(&m);
    let expiry = m.clock.now() + Duration::hours(2);
    let err = list_item(&m.alice.ctx, item_id, gbp(10), expiry).unwrap_err();
    assert_eq!(err, AuctionError::AlreadyListed(item_id));
}

#[test]
fn only_owner_can_list() {
    let m = market();
    let item_id = issue_item(&m.alice.ctx, "diamond ring").unwrap().tx().output_items()[0].id;
    let expiry = m.clock.now() + Duration::hours(1);
    let err = list_item(&m.bob.ctx, item_id, gbp(10), expiry).unwrap_err();
    assert_eq!(err, AuctionError::NotOwner(item_id));
}

#[test]
fn bids_raise_price_and_reschedule_participants() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    bid(&m.charlie.ctx, auction_id, gbp(1300)).unwrap();

    let auction = queries::all_auctions(m.ledger.as_ref()).remove(0);
    assert_eq!(auction.price, gbp(1300));
    assert_eq!(auction.bidder.as_ref(), Some(m.charlie.ctx.me()));

    let latest = m.ledger.find_latest_by_id(auction_id).unwrap().state_ref;
    assert_eq!(m.alice.ctx.scheduler.pending()[0].state_ref, latest);
    assert_eq!(m.charlie.ctx.scheduler.pending()[0].state_ref, latest);
    assert!(m.bob.ctx.scheduler.pending().is_empty(), "outbid bidder keeps no trigger");
}

#[test]
fn seller_cannot_bid() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    let before = m.ledger.len();
    assert_eq!(
        bid(&m.alice.ctx, auction_id, gbp(1200)).unwrap_err(),
        AuctionError::SelfBid
    );
    assert_eq!(m.ledger.len(), before);
}

#[test]
fn low_bid_is_a_contract_violation() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    let err = bid(&m.bob.ctx, auction_id, gbp(1000)).unwrap_err();
    assert!(err.is_contract_violation(), "{err}");
}

#[test]
fn bid_after_expiry_is_rejected() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    expire(&m);
    let err = bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap_err();
    assert!(err.is_contract_violation(), "{err}");
}

#[test]
fn declining_counterparty_aborts_flow() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    m.alice
        .responder
        .set_policy(ResponderPolicy::Decline("closed for bids".into()));
    let before = m.ledger.len();
    let err = bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap_err();
    assert_eq!(
        err,
        AuctionError::CounterpartyRejected {
            party: "Alice".into(),
            reason: "closed for bids".into(),
        }
    );
    assert_eq!(m.ledger.len(), before);
}

// =========================================================================
// Stale reads
// =========================================================================

/// Serves one stale version of a state, then the live ledger.
struct StaleOnce {
    stale: Mutex<Option<StateAndRef>>,
    live: Arc<Ledger>,
}

impl VaultQuery for StaleOnce {
    fn find_latest_by_id(&self, id: UniqueId) -> Option<StateAndRef> {
        let mut stale = self.stale.lock().unwrap_or_else(PoisonError::into_inner);
        if stale.as_ref().and_then(|s| s.state.linear_id()) == Some(id) {
            return stale.take();
        }
        self.live.find_latest_by_id(id)
    }

    fn find_all_by_type(&self, kind: ContractKind) -> Vec<StateAndRef> {
        self.live.find_all_by_type(kind)
    }
}

fn with_stale_view(node: &Node, m: &Market, stale: StateAndRef, config: FlowConfig) -> NodeContext {
    NodeContext {
        vault: Arc::new(StaleOnce {
            stale: Mutex::new(Some(stale)),
            live: m.ledger.clone(),
        }),
        config,
        ..node.ctx.clone()
    }
}

#[test]
fn stale_bid_surfaces_conflict_by_default() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    let before_bob = m.ledger.find_latest_by_id(auction_id).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();

    let charlie = with_stale_view(&m.charlie, &m, before_bob.clone(), m.charlie.ctx.config);
    let err = bid(&charlie, auction_id, gbp(1300)).unwrap_err();
    assert_eq!(err, AuctionError::ConflictingInput(before_bob.state_ref));
}

#[test]
fn stale_bid_rebuilt_when_retry_enabled() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    let before_bob = m.ledger.find_latest_by_id(auction_id).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();

    let config = FlowConfig {
        bid_retry_on_conflict: true,
        ..m.charlie.ctx.config
    };
    let charlie = with_stale_view(&m.charlie, &m, before_bob, config);
    bid(&charlie, auction_id, gbp(1300)).unwrap();

    let auction = queries::all_auctions(m.ledger.as_ref()).remove(0);
    assert_eq!(auction.price, gbp(1300));
    assert_eq!(auction.bidder.as_ref(), Some(m.charlie.ctx.me()));
}

#[test]
fn stale_listing_retries_against_fresh_item() {
    let m = market();
    let issued = issue_item(&m.alice.ctx, "diamond ring").unwrap();
    let item_id = issued.tx().output_items()[0].id;
    let first_version = issued.output_with_id(item_id).unwrap();
    let expiry = m.clock.now() + Duration::hours(1);
    let auction_id = list_item(&m.alice.ctx, item_id, gbp(1000), expiry)
        .unwrap()
        .tx()
        .output_auctions()[0]
        .id;
    end_auction(&m.alice.ctx, auction_id).unwrap();

    let alice = with_stale_view(&m.alice, &m, first_version, m.alice.ctx.config);
    list_item(&alice, item_id, gbp(800), expiry).unwrap();
    let auctions = queries::all_auctions(m.ledger.as_ref());
    assert_eq!(auctions.len(), 1);
    assert_eq!(auctions[0].price, gbp(800));
}

// =========================================================================
// Settlement
// =========================================================================

#[test]
fn bidder_without_cash_ends_auction() {
    let m = market();
    let (item_id, auction_id) = list_ring(&m);
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    expire(&m);

    let outcome = settled_by_scheduler(&m.bob);
    assert!(matches!(outcome, SettleOutcome::Ended(_)), "{outcome:?}");

    let item = m.ledger.find_latest_by_id(item_id).unwrap();
    let item = item.state.as_item().unwrap();
    assert_eq!(item.owner, *m.alice.ctx.me());
    assert!(!item.listed);
    assert!(m.ledger.find_latest_by_id(auction_id).is_none());
    assert!(m.alice.ctx.scheduler.pending().is_empty());
}

#[test]
fn bidder_short_of_price_ends_auction() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    issue_cash(&m.bank.ctx, gbp(500), m.bob.ctx.me()).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    expire(&m);

    let outcome = settle(&m.bob.ctx, auction_id).unwrap();
    assert!(matches!(outcome, SettleOutcome::Ended(_)), "{outcome:?}");
    let balance = queries::cash_balance(m.ledger.as_ref(), m.bob.ctx.me(), &Currency::gbp());
    assert_eq!(balance.unwrap(), gbp(500));
}

#[test]
fn bidder_with_cash_settles() {
    let m = market();
    let (item_id, auction_id) = list_ring(&m);
    issue_cash(&m.bank.ctx, gbp(1000), m.bob.ctx.me()).unwrap();
    issue_cash(&m.bank.ctx, gbp(500), m.bob.ctx.me()).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    expire(&m);

    let outcome = settled_by_scheduler(&m.bob);
    let SettleOutcome::Settled(committed) = outcome else {
        panic!("expected settlement, got {outcome:?}");
    };
    assert!(committed.tx().output_auctions().is_empty());

    let item = m.ledger.find_latest_by_id(item_id).unwrap();
    let item = item.state.as_item().unwrap();
    assert_eq!(item.owner, *m.bob.ctx.me());
    assert!(!item.listed);
    assert!(m.ledger.find_latest_by_id(auction_id).is_none());

    let vault = m.ledger.as_ref();
    let gbp_code = Currency::gbp();
    assert_eq!(
        queries::cash_balance(vault, m.alice.ctx.me(), &gbp_code).unwrap(),
        gbp(1200)
    );
    assert_eq!(
        queries::cash_balance(vault, m.bob.ctx.me(), &gbp_code).unwrap(),
        gbp(300)
    );
    assert_eq!(queries::items_owned_by(vault, m.bob.ctx.me()).len(), 1);
    m.ledger.verify_cash_supply().unwrap();
    assert!(m.alice.ctx.scheduler.pending().is_empty());
    assert!(m.bob.ctx.scheduler.pending().is_empty());
}

#[test]
fn settlement_by_third_party_is_a_no_op() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    issue_cash(&m.bank.ctx, gbp(1200), m.bob.ctx.me()).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    expire(&m);

    let before = m.ledger.len();
    assert_eq!(
        settle(&m.charlie.ctx, auction_id).unwrap(),
        SettleOutcome::NoAction
    );
    assert_eq!(
        settle(&m.alice.ctx, auction_id).unwrap(),
        SettleOutcome::NoAction,
        "seller waits for the bidder"
    );
    assert_eq!(m.ledger.len(), before);
    assert!(m.ledger.transactions_for(m.charlie.ctx.me()).is_empty());
}

#[test]
fn settling_before_expiry_fails() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    issue_cash(&m.bank.ctx, gbp(1200), m.bob.ctx.me()).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();

    let err = settle(&m.bob.ctx, auction_id).unwrap_err();
    assert!(
        format!("{err}").contains("Auction cannot be settled before it expires"),
        "{err}"
    );
    assert!(run_scheduled(&m.bob.ctx).is_empty());
}

#[test]
fn unsold_auction_returns_item_to_seller() {
    let m = market();
    let (item_id, auction_id) = list_ring(&m);
    expire(&m);

    let outcome = settled_by_scheduler(&m.alice);
    let SettleOutcome::Unsold(committed) = outcome else {
        panic!("expected an unsold close, got {outcome:?}");
    };
    let commands: Vec<CommandData> = committed.tx().commands.iter().map(|c| c.value).collect();
    assert!(commands.contains(&CommandData::Auction(AuctionCommand::End)));
    assert!(!commands.contains(&CommandData::Auction(AuctionCommand::Settle)));

    let item = m.ledger.find_latest_by_id(item_id).unwrap();
    let item = item.state.as_item().unwrap();
    assert_eq!(item.owner, *m.alice.ctx.me());
    assert!(!item.listed);
    assert!(m.ledger.find_latest_by_id(auction_id).is_none());
}

#[test]
fn failed_scheduled_settlement_is_rearmed() {
    let m = market();
    let (item_id, auction_id) = list_ring(&m);
    issue_cash(&m.bank.ctx, gbp(1200), m.bob.ctx.me()).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    expire(&m);

    m.alice
        .responder
        .set_policy(ResponderPolicy::Decline("away".into()));
    let fired = run_scheduled(&m.bob.ctx);
    assert_eq!(fired.len(), 1);
    assert!(matches!(
        fired[0].1,
        Err(AuctionError::CounterpartyRejected { .. })
    ));
    let pending = m.bob.ctx.scheduler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(
        pending[0].state_ref,
        m.ledger.find_latest_by_id(auction_id).unwrap().state_ref
    );

    m.alice.responder.set_policy(ResponderPolicy::Accept);
    let outcome = settled_by_scheduler(&m.bob);
    assert!(matches!(outcome, SettleOutcome::Settled(_)), "{outcome:?}");
    let item = m.ledger.find_latest_by_id(item_id).unwrap();
    assert_eq!(item.state.as_item().unwrap().owner, *m.bob.ctx.me());
    assert!(m.bob.ctx.scheduler.pending().is_empty());
}

#[test]
fn stale_trigger_does_nothing() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    let listed_version = m.ledger.find_latest_by_id(auction_id).unwrap().state_ref;
    issue_cash(&m.bank.ctx, gbp(1200), m.bob.ctx.me()).unwrap();
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    expire(&m);

    let before = m.ledger.len();
    let stale = SettlementTrigger {
        auction_id,
        state_ref: listed_version,
        at: m.clock.now() - Duration::minutes(1),
    };
    assert_eq!(
        on_trigger(&m.bob.ctx, &stale).unwrap(),
        SettleOutcome::NoAction
    );
    assert_eq!(m.ledger.len(), before);
}

#[test]
fn settling_twice_is_a_no_op() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    expire(&m);
    assert!(matches!(
        settle(&m.alice.ctx, auction_id).unwrap(),
        SettleOutcome::Unsold(_)
    ));
    assert_eq!(
        settle(&m.alice.ctx, auction_id).unwrap(),
        SettleOutcome::NoAction
    );
}

// =========================================================================
// Seller-initiated end
// =========================================================================

#[test]
fn seller_ends_auction_with_bidder_countersigning() {
    let m = market();
    let (item_id, auction_id) = list_ring(&m);
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();

    let committed = end_auction(&m.alice.ctx, auction_id).unwrap();
    assert!(committed.stx.signed_by().contains(&m.bob.ctx.me().key));
    let item = m.ledger.find_latest_by_id(item_id).unwrap();
    assert_eq!(item.state.as_item().unwrap().owner, *m.alice.ctx.me());
    assert!(m.bob.ctx.scheduler.pending().is_empty());
}

#[test]
fn only_seller_can_end() {
    let m = market();
    let (_, auction_id) = list_ring(&m);
    bid(&m.bob.ctx, auction_id, gbp(1200)).unwrap();
    assert_eq!(
        end_auction(&m.bob.ctx, auction_id).unwrap_err(),
        AuctionError::NotSeller {
            action: "end an auction"
        }
    );
}

#[test]
fn ended_item_can_be_relisted() {
    let m = market();
    let (item_id, auction_id) = list_ring(&m);
    end_auction(&m.alice.ctx, auction_id).unwrap();
    let expiry = m.clock.now() + Duration::hours(1);
    list_item(&m.alice.ctx, item_id, gbp(900), expiry).unwrap();
    assert_eq!(queries::all_auctions(m.ledger.as_ref())[0].price, gbp(900));
}

// =========================================================================
// Ledger-wide invariants
// =========================================================================

#[test]
fn cash_supply_holds_across_scenarios() {
    let m = market();
    let (_, first) = list_ring(&m);
    issue_cash(&m.bank.ctx, gbp(2000), m.bob.ctx.me()).unwrap();
    issue_cash(&m.bank.ctx, gbp(700), m.charlie.ctx.me()).unwrap();
    bid(&m.bob.ctx, first, gbp(1200)).unwrap();
    expire(&m);
    settle(&m.bob.ctx, first).unwrap();
    m.ledger.verify_cash_supply().unwrap();

    let total: i64 = [m.alice.ctx.me(), m.bob.ctx.me(), m.charlie.ctx.me()]
        .into_iter()
        .map(|p| {
            queries::cash_balance(m.ledger.as_ref(), p, &Currency::gbp())
                .unwrap()
                .quantity
        })
        .sum();
    assert_eq!(total, gbp(2700).quantity);
}
