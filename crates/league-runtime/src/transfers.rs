//! Transfer listings, purchases, bids and the weekly market refresh.

use crate::error::CareerError;
use crate::generate::{make_player, wage_for, Draft, POSITION_WEIGHTS};
use crate::mail;
use crate::rng::{self, gauss_u8, pick_weighted, stream_seed, Purpose};
use league_core::{
    Bid, BidId, BidStatus, Career, ClubId, Contract, EntityGraph, LedgerCategory, Listing,
    ListingId, Money, PlayerId, Position, Posting, Seller, Shortfall, MAX_SQUAD_SIZE,
    MIN_SQUAD_SIZE,
};
use league_econ::{
    ai_purchase_chance, asking_price_with_noise, covers_with_margin, player_value,
    seller_verdict, SellerContext, SellerVerdict,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// The market is topped up to this many active listings.
pub const MIN_ACTIVE_LISTINGS: usize = 10;
const REFRESH_ATTEMPTS: usize = 30;
const FREE_AGENT_SHARE: f64 = 0.3;
/// Clubs only put up players at least this good.
const MIN_LISTED_SKILL: u8 = 4;
/// Seasons covered by a contract signed on transfer.
const TRANSFER_CONTRACT_SEASONS: u32 = 3;
/// Engine clubs only buy from a seller that keeps at least this many players.
const AI_SELLER_MIN_SQUAD: usize = 16;

/// Result of `list_player`. Listing a player twice returns the existing listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingReceipt {
    pub listing: ListingId,
    pub player: PlayerId,
    pub asking_price: Money,
    /// False when the player was already listed.
    pub created: bool,
}

/// A completed move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub player: PlayerId,
    /// `None` for a free agent.
    pub from: Option<ClubId>,
    pub to: ClubId,
    pub fee: Money,
    pub buyer_balance: Money,
}

/// What became of a submitted bid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidOutcome {
    pub bid: BidId,
    pub status: BidStatus,
    /// Set when the bid met the asking price and the transfer went through at once.
    pub transfer: Option<TransferReceipt>,
}

/// How the seller answers a pending bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidDecision {
    Accept,
    Reject,
    /// Let the seller's board weigh the offer.
    Auto,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BidResolution {
    pub bid: BidId,
    pub status: BidStatus,
    /// The board's reasoning when the decision was left to it.
    pub verdict: Option<SellerVerdict>,
    pub transfer: Option<TransferReceipt>,
}

/// Recompute every player's market value.
pub(crate) fn refresh_values(graph: &mut EntityGraph) {
    for p in graph.players.values_mut() {
        p.value = player_value(p);
    }
}

fn asking_price(
    graph: &EntityGraph,
    player: PlayerId,
    value: Money,
) -> Result<Money, CareerError> {
    let seed = stream_seed(graph.seed, Purpose::Asking, graph.season.number, player.0);
    Ok(asking_price_with_noise(value, seed)?)
}

fn insert_listing(
    graph: &mut EntityGraph,
    player: PlayerId,
    seller: Seller,
    asking: Money,
) -> ListingId {
    let id = graph.ids.listing();
    let (season, week) = (graph.season.number, graph.season.calendar.week);
    graph.market.listings.insert(
        id,
        Listing {
            id,
            player,
            seller,
            asking_price: asking,
            season,
            week,
        },
    );
    id
}

fn list_free_agent<R: Rng>(graph: &mut EntityGraph, rng: &mut R) -> ListingId {
    let id = graph.ids.player();
    let draft = Draft {
        position: pick_weighted(rng, &POSITION_WEIGHTS).unwrap_or(Position::MF),
        age: rng.gen_range(22..=30),
        skill: gauss_u8(rng, 6.0, 1.5, 3, 12),
    };
    let player = make_player(rng, id, None, 0, draft, graph.season.number);
    let asking = player.value;
    graph.players.insert(id, player);
    insert_listing(graph, id, Seller::FreeAgent, asking)
}

fn list_club_sale<R: Rng>(
    graph: &mut EntityGraph,
    rng: &mut R,
    managed: Option<ClubId>,
) -> Result<Option<ListingId>, CareerError> {
    let sellers: Vec<ClubId> = graph
        .league
        .club_ids()
        .into_iter()
        .filter(|c| Some(*c) != managed && graph.squad(*c).len() > MIN_SQUAD_SIZE)
        .collect();
    let Some(&club) = sellers.choose(rng) else {
        return Ok(None);
    };
    let options: Vec<(PlayerId, Money)> = graph
        .squad(club)
        .into_iter()
        .filter(|p| p.skill >= MIN_LISTED_SKILL && graph.market.listing_for(p.id).is_none())
        .map(|p| (p.id, p.value))
        .collect();
    let Some(&(player, value)) = options.choose(rng) else {
        return Ok(None);
    };
    let asking = asking_price(graph, player, value)?;
    Ok(Some(insert_listing(graph, player, Seller::Club(club), asking)))
}

/// Top the market up to [`MIN_ACTIVE_LISTINGS`] with club sales and new free agents.
/// The managed club never lists on its own. Returns the number of new listings.
pub(crate) fn refresh_market(career: &mut Career) -> Result<usize, CareerError> {
    let managed = career.meta.managed_club;
    let g = &mut career.graph;
    let (season, week) = (g.season.number, g.season.calendar.week);
    let mut rng = rng::stream(g.seed, Purpose::Market, season, week);
    let mut created = 0;
    for _ in 0..REFRESH_ATTEMPTS {
        if g.market.listings.len() >= MIN_ACTIVE_LISTINGS {
            break;
        }
        let listed = if rng.gen_bool(FREE_AGENT_SHARE) {
            Some(list_free_agent(g, &mut rng))
        } else {
            list_club_sale(g, &mut rng, managed)?
        };
        if listed.is_some() {
            created += 1;
        }
    }
    debug!(created, active = g.market.listings.len(), "market refreshed");
    Ok(created)
}

/// Put a club's player on the market. With no asking price the board sets one from the
/// player's value.
pub(crate) fn list_player(
    career: &mut Career,
    club: ClubId,
    player: PlayerId,
    asking: Option<Money>,
) -> Result<ListingReceipt, CareerError> {
    let g = &mut career.graph;
    if !g.clubs.contains_key(&club) {
        return Err(CareerError::ClubNotFound(club));
    }
    let p = g.players.get(&player).ok_or(CareerError::PlayerNotFound(player))?;
    if p.club != Some(club) {
        return Err(CareerError::state(format!(
            "{player} does not play for {}",
            g.club_name(club)
        )));
    }
    if let Some(existing) = g.market.listing_for(player) {
        return Ok(ListingReceipt {
            listing: existing.id,
            player,
            asking_price: existing.asking_price,
            created: false,
        });
    }
    let asking = match asking {
        Some(a) if a <= 0 => {
            return Err(CareerError::input(format!(
                "asking price must be positive, got {a}"
            )))
        }
        Some(a) => a,
        None => asking_price(g, player, p.value)?,
    };
    let listing = insert_listing(g, player, Seller::Club(club), asking);
    info!(%club, %player, asking, "player listed");
    Ok(ListingReceipt {
        listing,
        player,
        asking_price: asking,
        created: true,
    })
}

pub(crate) fn withdraw_listing(
    career: &mut Career,
    listing: ListingId,
) -> Result<Listing, CareerError> {
    career
        .graph
        .market
        .listings
        .remove(&listing)
        .ok_or(CareerError::ListingNotFound(listing))
}

/// Move `player` to `buyer` for `fee`. Debits the buyer, credits the seller, rewrites the
/// contract, clears the listing and withdraws other pending bids except `keep`.
fn perform_transfer(
    career: &mut Career,
    player: PlayerId,
    buyer: ClubId,
    fee: Money,
    keep: Option<BidId>,
) -> Result<TransferReceipt, CareerError> {
    let g = &mut career.graph;
    if !g.clubs.contains_key(&buyer) {
        return Err(CareerError::ClubNotFound(buyer));
    }
    let p = g.players.get(&player).ok_or(CareerError::PlayerNotFound(player))?;
    let from = p.club;
    let name = p.full_name();
    if from == Some(buyer) {
        return Err(CareerError::state(format!("{name} already plays for the buyer")));
    }
    if g.squad(buyer).len() >= MAX_SQUAD_SIZE {
        return Err(CareerError::state(format!(
            "{} already has {MAX_SQUAD_SIZE} players",
            g.club_name(buyer)
        )));
    }
    if let Some(seller) = from {
        if g.squad(seller).len() <= MIN_SQUAD_SIZE {
            return Err(CareerError::state(format!(
                "{} cannot go below {MIN_SQUAD_SIZE} players",
                g.club_name(seller)
            )));
        }
    }

    let (season, week) = (g.season.number, g.season.calendar.week);
    g.ledger.debit(Posting {
        club: buyer,
        season,
        week,
        category: LedgerCategory::TransferPurchase,
        amount: fee,
        voluntary: true,
        memo: format!("signed {name}"),
    })?;
    if let Some(seller) = from {
        g.ledger.post(Posting {
            club: seller,
            season,
            week,
            category: LedgerCategory::TransferSale,
            amount: fee,
            voluntary: false,
            memo: format!("sold {name}"),
        })?;
    }

    let shirt = g.free_shirt_number(buyer);
    g.relocate_player(player, Some(buyer));
    if let Some(p) = g.players.get_mut(&player) {
        p.shirt_number = shirt;
        p.value = player_value(p);
        p.contract = Contract {
            weekly_wage: wage_for(p.value),
            expires_season: season + TRANSFER_CONTRACT_SEASONS,
        };
    }
    g.market.delist(player);
    g.market.withdraw_pending(player, keep);
    let buyer_balance = g.cash(buyer);

    let buyer_name = g.club_name(buyer);
    let origin = from.map_or_else(|| "the free-agent pool".to_string(), |c| g.club_name(c));
    info!(%player, ?from, to = %buyer, fee, "transfer completed");
    let involved: Vec<ClubId> = std::iter::once(buyer).chain(from).collect();
    mail::notify_clubs(
        career,
        &involved,
        format!("Transfer: {name}"),
        format!("{name} moves from {origin} to {buyer_name} for {fee}."),
    );
    Ok(TransferReceipt {
        player,
        from,
        to: buyer,
        fee,
        buyer_balance,
    })
}

/// Buy a listed player at the asking price.
pub(crate) fn buy_from_market(
    career: &mut Career,
    buyer: ClubId,
    listing: ListingId,
) -> Result<TransferReceipt, CareerError> {
    let l = career
        .graph
        .market
        .listings
        .get(&listing)
        .ok_or(CareerError::ListingNotFound(listing))?;
    if l.seller == Seller::Club(buyer) {
        return Err(CareerError::state("a club cannot buy its own listing"));
    }
    let (player, price) = (l.player, l.asking_price);
    perform_transfer(career, player, buyer, price, None)
}

/// Engine clubs shop on the open market. Every listing gets one roll a week; the buyer is
/// drawn from clubs other than the seller and the managed club that have squad room and cash
/// to cover the price with margin. Returns the number of completed signings.
pub(crate) fn ai_signings(career: &mut Career) -> Result<usize, CareerError> {
    let managed = career.meta.managed_club;
    let g = &career.graph;
    let (season, week) = (g.season.number, g.season.calendar.week);
    let mut rng = rng::stream(g.seed, Purpose::Signings, season, week);
    let listings: Vec<ListingId> = g.market.listings.keys().copied().collect();
    let mut signed = 0;
    for id in listings {
        let g = &career.graph;
        let Some(l) = g.market.listings.get(&id) else {
            continue;
        };
        let seller = l.seller.club();
        if seller.is_some_and(|s| g.squad(s).len() <= AI_SELLER_MIN_SQUAD) {
            continue;
        }
        let candidates: Vec<ClubId> = g
            .clubs
            .keys()
            .copied()
            .filter(|c| Some(*c) != seller && Some(*c) != managed)
            .filter(|c| g.squad(*c).len() < MAX_SQUAD_SIZE)
            .filter(|c| covers_with_margin(g.cash(*c), l.asking_price))
            .collect();
        if candidates.is_empty() || !rng.gen_bool(ai_purchase_chance(seller.is_none())) {
            continue;
        }
        let Some(buyer) = candidates.choose(&mut rng).copied() else {
            continue;
        };
        let (player, price) = (l.player, l.asking_price);
        perform_transfer(career, player, buyer, price, None)?;
        signed += 1;
    }
    if signed > 0 {
        info!(signed, "engine clubs signed listed players");
    }
    Ok(signed)
}

/// Offer `amount` for a club's player. An offer that meets the asking price of an active
/// listing completes at once; anything else waits for the seller.
pub(crate) fn submit_transfer_bid(
    career: &mut Career,
    buyer: ClubId,
    player: PlayerId,
    amount: Money,
) -> Result<BidOutcome, CareerError> {
    if amount <= 0 {
        return Err(CareerError::input(format!("bid must be positive, got {amount}")));
    }
    let g = &mut career.graph;
    if !g.clubs.contains_key(&buyer) {
        return Err(CareerError::ClubNotFound(buyer));
    }
    let p = g.players.get(&player).ok_or(CareerError::PlayerNotFound(player))?;
    let name = p.full_name();
    let Some(seller) = p.club else {
        return Err(CareerError::state(format!(
            "{name} is a free agent; buy through the listing"
        )));
    };
    if seller == buyer {
        return Err(CareerError::state(format!("{name} already plays for the buyer")));
    }
    let available = g.cash(buyer);
    if available < amount {
        return Err(CareerError::InsufficientFunds(Shortfall {
            club: buyer,
            needed: amount,
            available,
        }));
    }

    let meets_asking = g
        .market
        .listing_for(player)
        .is_some_and(|l| amount >= l.asking_price);
    let id = g.ids.bid();
    g.market.bids.insert(
        id,
        Bid {
            id,
            player,
            buyer,
            seller,
            amount,
            status: BidStatus::Pending,
            season: g.season.number,
            week: g.season.calendar.week,
        },
    );

    if meets_asking {
        let transfer = perform_transfer(career, player, buyer, amount, Some(id))?;
        set_status(&mut career.graph, id, BidStatus::Accepted);
        return Ok(BidOutcome {
            bid: id,
            status: BidStatus::Accepted,
            transfer: Some(transfer),
        });
    }

    let buyer_name = career.graph.club_name(buyer);
    debug!(bid = %id, %player, %buyer, amount, "bid pending");
    mail::notify_clubs(
        career,
        &[buyer, seller],
        format!("Bid for {name}"),
        format!("{buyer_name} offers {amount} for {name}."),
    );
    Ok(BidOutcome {
        bid: id,
        status: BidStatus::Pending,
        transfer: None,
    })
}

fn set_status(graph: &mut EntityGraph, bid: BidId, status: BidStatus) {
    if let Some(b) = graph.market.bids.get_mut(&bid) {
        b.status = status;
    }
}

/// What the seller's board knows when it weighs an offer.
fn seller_context(
    graph: &EntityGraph,
    seller: ClubId,
    player: PlayerId,
) -> Result<SellerContext, CareerError> {
    let division = graph
        .league
        .division_of(seller)
        .ok_or(CareerError::ClubNotFound(seller))?;
    let table = graph.table(division.id);
    let table_position = table
        .iter()
        .position(|r| r.club == seller)
        .map_or(table.len(), |i| i + 1);
    let squad = graph.squad(seller);
    let player_skill = graph
        .players
        .get(&player)
        .map(|p| p.skill)
        .ok_or(CareerError::PlayerNotFound(player))?;
    Ok(SellerContext {
        table_position,
        table_size: table.len(),
        cash: graph.cash(seller),
        squad_size: squad.len(),
        squad_skill_total: squad.iter().map(|p| u32::from(p.skill)).sum(),
        player_skill,
    })
}

/// Settle a pending bid. Accepting performs the transfer; rejecting posts nothing.
pub(crate) fn resolve_bid(
    career: &mut Career,
    bid: BidId,
    decision: BidDecision,
) -> Result<BidResolution, CareerError> {
    let g = &career.graph;
    let b = g.market.bids.get(&bid).ok_or(CareerError::BidNotFound(bid))?.clone();
    if b.status != BidStatus::Pending {
        return Err(CareerError::state(format!("{bid} is no longer pending")));
    }
    let p = g.players.get(&b.player).ok_or(CareerError::PlayerNotFound(b.player))?;
    if p.club != Some(b.seller) {
        return Err(CareerError::state(format!(
            "{} no longer plays for {}",
            p.full_name(),
            g.club_name(b.seller)
        )));
    }
    let name = p.full_name();
    let (accepted, verdict) = match decision {
        BidDecision::Accept => (true, None),
        BidDecision::Reject => (false, None),
        BidDecision::Auto => {
            let ctx = seller_context(g, b.seller, b.player)?;
            let v = seller_verdict(&ctx, b.amount, p.value);
            (v.accepted, Some(v))
        }
    };

    if accepted {
        let transfer = perform_transfer(career, b.player, b.buyer, b.amount, Some(bid))?;
        set_status(&mut career.graph, bid, BidStatus::Accepted);
        return Ok(BidResolution {
            bid,
            status: BidStatus::Accepted,
            verdict,
            transfer: Some(transfer),
        });
    }

    set_status(&mut career.graph, bid, BidStatus::Rejected);
    let seller_name = career.graph.club_name(b.seller);
    info!(%bid, player = %b.player, amount = b.amount, "bid rejected");
    mail::notify_clubs(
        career,
        &[b.buyer, b.seller],
        format!("Bid for {name} rejected"),
        format!("{seller_name} turned down {} for {name}.", b.amount),
    );
    Ok(BidResolution {
        bid,
        status: BidStatus::Rejected,
        verdict,
        transfer: None,
    })
}
