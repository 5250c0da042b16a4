//! Club income: weekly sponsorship, sponsor activities and end-of-season prize money.

use crate::error::CareerError;
use crate::mail;
use league_core::{Career, ClubId, EntityGraph, EntryId, LedgerCategory, Money, Posting, TableRow};
use league_econ::{prize_money, DEFAULT_SPONSOR_ACTIVITY};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A posted ledger entry and the balance it left.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub entry: EntryId,
    pub club: ClubId,
    pub amount: Money,
    pub balance: Money,
}

fn credit(
    graph: &mut EntityGraph,
    club: ClubId,
    category: LedgerCategory,
    amount: Money,
    memo: String,
) -> Result<EntryId, CareerError> {
    let (season, week) = (graph.season.number, graph.season.calendar.week);
    Ok(graph.ledger.post(Posting {
        club,
        season,
        week,
        category,
        amount,
        voluntary: false,
        memo,
    })?)
}

/// Credit one week of sponsorship to every club. Returns the total paid out.
pub(crate) fn weekly_sponsorship(graph: &mut EntityGraph) -> Result<Money, CareerError> {
    let payments: Vec<(ClubId, Money)> = graph
        .clubs
        .values()
        .map(|c| (c.id, c.finances.weekly_sponsorship))
        .filter(|(_, amount)| *amount > 0)
        .collect();
    let week = graph.season.calendar.week;
    let mut total: Money = 0;
    for (club, amount) in payments {
        credit(
            graph,
            club,
            LedgerCategory::WeeklySponsorship,
            amount,
            format!("sponsorship week {week}"),
        )?;
        total = total.saturating_add(amount);
    }
    Ok(total)
}

/// One-off sponsor event. Income only; it never costs the club anything.
pub(crate) fn sponsor_activity(
    career: &mut Career,
    club: ClubId,
    amount: Option<Money>,
) -> Result<LedgerReceipt, CareerError> {
    let amount = amount.unwrap_or(DEFAULT_SPONSOR_ACTIVITY);
    if amount <= 0 {
        return Err(CareerError::input(format!(
            "sponsor income must be positive, got {amount}"
        )));
    }
    let g = &mut career.graph;
    if !g.clubs.contains_key(&club) {
        return Err(CareerError::ClubNotFound(club));
    }
    let entry = credit(
        g,
        club,
        LedgerCategory::SponsorActivity,
        amount,
        "sponsor activity".into(),
    )?;
    let balance = g.cash(club);
    info!(%club, amount, balance, "sponsor activity");
    mail::notify_clubs(
        career,
        &[club],
        "Sponsor activity",
        format!("The sponsors paid {amount} for a promotional day."),
    );
    Ok(LedgerReceipt {
        entry,
        club,
        amount,
        balance,
    })
}

/// Pay prize money for final tables, given as `(division level, table)`.
pub(crate) fn settle_prize_money(
    graph: &mut EntityGraph,
    tables: &[(u8, Vec<TableRow>)],
) -> Result<Vec<(ClubId, Money)>, CareerError> {
    let season = graph.season.number;
    let mut paid = Vec::new();
    for (level, table) in tables {
        for (i, row) in table.iter().enumerate() {
            let amount = prize_money(*level, i + 1, table.len())?;
            if amount <= 0 {
                continue;
            }
            credit(
                graph,
                row.club,
                LedgerCategory::PrizeMoney,
                amount,
                format!("season {season} prize money, position {}", i + 1),
            )?;
            paid.push((row.club, amount));
        }
    }
    debug!(season, clubs = paid.len(), "prize money settled");
    Ok(paid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testutil::small_career;
    use league_core::{validate_graph, DivisionId, MAX_BALANCE};
    use league_econ::TOP_DIVISION_PRIZE;

    #[test]
    fn sponsorship_credits_every_club() {
        let mut c = small_career(true);
        let before = c.graph.ledger.balances();
        let total = weekly_sponsorship(&mut c.graph).unwrap();
        let after = c.graph.ledger.balances();
        assert_eq!(total, 8 * c.graph.clubs[&ClubId(1)].finances.weekly_sponsorship);
        for (club, cash) in &after {
            let weekly = c.graph.clubs[club].finances.weekly_sponsorship;
            assert_eq!(*cash, before[club] + weekly);
        }
    }

    #[test]
    fn clubs_without_a_sponsor_get_nothing() {
        let mut c = small_career(true);
        for club in c.graph.clubs.values_mut() {
            club.finances.weekly_sponsorship = 0;
        }
        let entries = c.graph.ledger.entries().len();
        assert_eq!(weekly_sponsorship(&mut c.graph).unwrap(), 0);
        assert_eq!(c.graph.ledger.entries().len(), entries);
    }

    #[test]
    fn sponsor_activity_only_adds_money() {
        let mut c = small_career(true);
        let club = c.meta.managed_club.unwrap();
        let cash = c.graph.cash(club);
        let receipt = sponsor_activity(&mut c, club, None).unwrap();
        assert_eq!(receipt.amount, DEFAULT_SPONSOR_ACTIVITY);
        assert_eq!(receipt.balance, cash + DEFAULT_SPONSOR_ACTIVITY);
        let receipt = sponsor_activity(&mut c, club, Some(250_000)).unwrap();
        assert_eq!(receipt.balance, cash + DEFAULT_SPONSOR_ACTIVITY + 250_000);
        assert_eq!(
            sponsor_activity(&mut c, club, Some(-5)).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(matches!(
            sponsor_activity(&mut c, ClubId(77), None),
            Err(CareerError::ClubNotFound(_))
        ));
        validate_graph(&c.graph).unwrap();
    }

    #[test]
    fn income_beyond_the_balance_limit_is_refused() {
        let mut c = small_career(true);
        let club = c.meta.managed_club.unwrap();
        let cash = c.graph.cash(club);
        let entries = c.graph.ledger.entries().len();
        let err = sponsor_activity(&mut c, club, Some(i64::MAX)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = sponsor_activity(&mut c, club, Some(MAX_BALANCE)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(c.graph.ledger.entries().len(), entries);
        assert_eq!(c.graph.cash(club), cash);

        c.graph.clubs.get_mut(&club).unwrap().finances.weekly_sponsorship = MAX_BALANCE;
        let err = weekly_sponsorship(&mut c.graph).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn prize_money_follows_level_and_position() {
        let mut c = small_career(true);
        let tables = vec![
            (1, c.graph.table(DivisionId(1))),
            (2, c.graph.table(DivisionId(2))),
        ];
        let champion = tables[0].1[0].club;
        let cash = c.graph.cash(champion);
        let paid = settle_prize_money(&mut c.graph, &tables).unwrap();
        assert_eq!(paid.len(), 8);
        assert_eq!(paid[0], (champion, TOP_DIVISION_PRIZE));
        assert_eq!(c.graph.cash(champion), cash + TOP_DIVISION_PRIZE);
        let second_level_top = paid[4].1;
        assert_eq!(second_level_top, TOP_DIVISION_PRIZE / 2);
        assert!(paid[3].1 < paid[0].1);
    }
}
