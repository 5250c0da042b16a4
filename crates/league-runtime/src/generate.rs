//! Initial world generation: clubs, squads and the opening state of a career.

use crate::config::CareerConfig;
use crate::error::CareerError;
use crate::rng::{self, gauss_u8, pick_weighted, Purpose};
use crate::{mail, schedule, transfers, youth};
use chrono::{DateTime, Utc};
use league_core::{
    Calendar, Career, CareerId, CareerMeta, Club, ClubId, Contract, Division, DivisionId,
    EntityGraph, Finances, IdAllocator, League, LeagueRules, LedgerCategory, Money, Player,
    PlayerId, PlayerTrait, Position, Posting, Season, SeasonPhase, Tactics, MAX_SKILL, MIN_SKILL,
};
use league_econ::player_value;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

const FIRST_NAMES: &[&str] = &[
    "Aaron", "Adam", "Alex", "Ben", "Callum", "Charlie", "Connor", "Daniel", "David", "Dylan",
    "Ethan", "Finn", "George", "Harry", "Isaac", "Jack", "Jacob", "James", "Jamie", "Joe", "Jordan",
    "Josh", "Kieran", "Leon", "Liam", "Luke", "Marcus", "Mason", "Max", "Nathan", "Oliver", "Owen",
    "Reece", "Ryan", "Sam", "Scott", "Theo", "Tom", "Tyler", "Will",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Bailey", "Baker", "Barnes", "Bell", "Brooks", "Brown", "Carter", "Clarke", "Cole",
    "Cook", "Cooper", "Davies", "Dixon", "Edwards", "Ellis", "Evans", "Fisher", "Foster", "Gray",
    "Green", "Hall", "Harris", "Hill", "Hughes", "Hunt", "Jackson", "James", "Johnson", "Jones",
    "Kelly", "King", "Lee", "Lewis", "Marshall", "Mason", "Mills", "Moore", "Morgan", "Morris",
    "Murphy", "Owen", "Palmer", "Parker", "Phillips", "Price", "Reid", "Roberts", "Robinson",
    "Rogers", "Russell", "Scott", "Shaw", "Simpson", "Smith", "Stone", "Taylor", "Thomas",
    "Turner", "Walker", "Ward", "Watson", "White", "Wilson", "Wood", "Wright", "Young",
];

const TOWNS: &[&str] = &[
    "Ashford", "Barnsley", "Bradford", "Brighton", "Bristol", "Burnley", "Cambridge", "Carlisle",
    "Chester", "Coventry", "Crawley", "Derby", "Doncaster", "Exeter", "Gillingham", "Grimsby",
    "Hartlepool", "Hull", "Ipswich", "Leyton", "Lincoln", "Luton", "Morecambe", "Newport",
    "Northampton", "Norwich", "Oldham", "Oxford", "Plymouth", "Portsmouth", "Preston", "Reading",
    "Rochdale", "Salford", "Stockport", "Swindon", "Walsall", "Wigan", "Wycombe", "York",
];

const SUFFIXES: &[&str] = &[
    "FC", "United", "City", "Athletic", "Rovers", "Town", "Albion", "Wanderers",
];

/// Weights for 0..=3 traits on a generated player.
const TRAIT_COUNT_WEIGHTS: [f64; 4] = [40.0, 35.0, 20.0, 5.0];

/// Positions of generated free agents and unbiased youth draws.
pub(crate) const POSITION_WEIGHTS: [(Position, f64); 4] = [
    (Position::GK, 0.15),
    (Position::DF, 0.35),
    (Position::MF, 0.30),
    (Position::FW, 0.20),
];

/// Wage floor per week.
const MIN_WEEKLY_WAGE: Money = 1_000;

/// Players per unit for a squad of `size`, indexed like [`Position::index`].
pub(crate) fn squad_layout(size: usize) -> [usize; 4] {
    let gk = if size >= 26 { 3 } else { 2 };
    let outfield = size.saturating_sub(gk);
    let df = outfield * 7 / 19;
    let mf = outfield * 7 / 19;
    [gk, df, mf, outfield - df - mf]
}

pub(crate) fn wage_for(value: Money) -> Money {
    (value / 200).max(MIN_WEEKLY_WAGE)
}

pub(crate) fn random_name<R: Rng>(rng: &mut R) -> (String, String) {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Sam");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
    (first.to_string(), last.to_string())
}

/// Up to `weights.len() - 1` distinct traits, sorted.
pub(crate) fn random_traits<R: Rng>(rng: &mut R, weights: &[f64]) -> Vec<PlayerTrait> {
    let counts: Vec<(usize, f64)> = weights.iter().copied().enumerate().collect();
    let count = pick_weighted(rng, &counts).unwrap_or(0);
    let mut traits: Vec<PlayerTrait> = PlayerTrait::ALL
        .choose_multiple(rng, count)
        .copied()
        .collect();
    traits.sort();
    traits
}

/// What differs between generated players.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Draft {
    pub position: Position,
    pub age: u8,
    pub skill: u8,
}

pub(crate) fn make_player<R: Rng>(
    rng: &mut R,
    id: PlayerId,
    club: Option<ClubId>,
    shirt_number: u8,
    draft: Draft,
    season: u32,
) -> Player {
    let (first_name, last_name) = random_name(rng);
    let mut p = Player {
        id,
        first_name,
        last_name,
        age: draft.age,
        position: draft.position,
        shirt_number,
        skill: draft.skill.clamp(MIN_SKILL, MAX_SKILL),
        hidden: rng.gen_range(1..=99),
        form: rng.gen_range(8..=12),
        season_form: 10,
        traits: random_traits(rng, &TRAIT_COUNT_WEIGHTS),
        value: 0,
        club,
        contract: Contract {
            weekly_wage: 0,
            expires_season: season + rng.gen_range(1..=4),
        },
        injured_weeks: 0,
    };
    p.value = player_value(&p);
    p.contract.weekly_wage = wage_for(p.value);
    p
}

fn squad_age<R: Rng>(rng: &mut R) -> u8 {
    let roll: f64 = rng.gen();
    if roll < 0.55 {
        rng.gen_range(18..=27)
    } else if roll < 0.85 {
        rng.gen_range(17..=32)
    } else {
        rng.gen_range(33..=36)
    }
}

fn shirt_for<R: Rng>(rng: &mut R, position: Position, taken: &mut BTreeSet<u8>) -> u8 {
    let preferred: &[u8] = match position {
        Position::GK => &[1, 13, 12],
        Position::FW if rng.gen_bool(0.7) => &[9, 10, 11, 7, 8],
        _ => &[],
    };
    let number = preferred
        .iter()
        .copied()
        .chain(2..=99)
        .find(|n| !taken.contains(n))
        .unwrap_or(99);
    taken.insert(number);
    number
}

fn generate_squad<R: Rng>(
    rng: &mut R,
    graph: &mut EntityGraph,
    club: ClubId,
    level: u8,
    size: usize,
) {
    let layout = squad_layout(size);
    let season = graph.season.number;
    let mean = 5.5 - 0.5 * f64::from(level.saturating_sub(1));
    let mut taken = BTreeSet::new();
    for position in Position::ALL {
        for _ in 0..layout[position.index()] {
            let shirt = shirt_for(rng, position, &mut taken);
            let draft = Draft {
                position,
                age: squad_age(rng),
                skill: gauss_u8(rng, mean, 1.6, MIN_SKILL, MAX_SKILL),
            };
            let id = graph.ids.player();
            let player = make_player(rng, id, Some(club), shirt, draft, season);
            graph.players.insert(id, player);
        }
    }
}

fn club_names<R: Rng>(rng: &mut R, config: &CareerConfig) -> Vec<String> {
    let mut names: Vec<String> = config
        .club_names
        .iter()
        .map(|n| n.trim().to_string())
        .collect();
    let mut taken: BTreeSet<String> = names.iter().map(|n| n.to_lowercase()).collect();
    let mut towns = TOWNS.to_vec();
    towns.shuffle(rng);
    let mut i = 0;
    while names.len() < config.club_count() {
        let town = towns[i % towns.len()];
        let suffix = SUFFIXES[i % SUFFIXES.len()];
        let name = if i < towns.len() {
            format!("{town} {suffix}")
        } else {
            format!("{town} {suffix} {}", i / towns.len() + 1)
        };
        if taken.insert(name.to_lowercase()) {
            names.push(name);
        }
        i += 1;
    }
    names
}

fn short_name(name: &str) -> String {
    let mut s: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    while s.len() < 3 {
        s.push('X');
    }
    s
}

fn division_name(level: u8) -> String {
    match level {
        1 => "Premier Division".to_string(),
        n => format!("Division {}", n - 1),
    }
}

/// Build a complete career from a validated configuration.
///
/// Season 1 is scheduled but not started; every club has its squad, opening balance and a
/// youth pool, and the transfer market is stocked.
pub(crate) fn build_career(
    config: &CareerConfig,
    id: CareerId,
    seed: u64,
    now: DateTime<Utc>,
) -> Result<Career, CareerError> {
    config.validate()?;
    let mut rng = rng::stream(seed, Purpose::Generate, 1, 0);
    let names = club_names(&mut rng, config);

    let mut clubs = BTreeMap::new();
    let mut divisions = Vec::with_capacity(usize::from(config.divisions));
    let mut names_iter = names.into_iter();
    for level in 1..=config.divisions {
        let mut members = Vec::with_capacity(usize::from(config.clubs_per_division));
        for _ in 0..config.clubs_per_division {
            let club_id = ClubId(clubs.len() as u32 + 1);
            let name = names_iter
                .next()
                .ok_or_else(|| CareerError::InvalidConfig("ran out of club names".into()))?;
            clubs.insert(
                club_id,
                Club {
                    id: club_id,
                    short_name: short_name(&name),
                    name,
                    finances: Finances {
                        weekly_sponsorship: config.weekly_sponsorship,
                    },
                    tactics: Tactics::default(),
                    youth_preference: None,
                },
            );
            members.push(club_id);
        }
        divisions.push(Division {
            id: DivisionId(u32::from(level)),
            name: division_name(level),
            level,
            clubs: members,
        });
    }

    let managed = match &config.managed_club {
        Some(name) => Some(
            clubs
                .values()
                .find(|c: &&Club| c.name.eq_ignore_ascii_case(name.trim()))
                .map(|c| c.id)
                .ok_or_else(|| CareerError::ClubNameNotFound(name.clone()))?,
        ),
        None => None,
    };

    let start = config.season_start;
    let mut graph = EntityGraph {
        seed,
        league: League {
            name: config.league_name.trim().to_string(),
            rules: LeagueRules {
                double_round_robin: config.double_round_robin,
                promotion_slots: config.promotion_slots,
                cup: config.cup,
                youth_pool_size: config.youth_pool_size,
            },
            divisions,
        },
        clubs,
        players: BTreeMap::new(),
        fixtures: BTreeMap::new(),
        season: Season {
            number: 1,
            start_date: start,
            phase: SeasonPhase::NotStarted,
            calendar: Calendar {
                today: start,
                week: 1,
                round: 1,
            },
            cup: None,
        },
        market: Default::default(),
        ledger: Default::default(),
        youth: Default::default(),
        training: Default::default(),
        mailbox: Default::default(),
        history: Vec::new(),
        ids: IdAllocator::default(),
    };

    let plan: Vec<(ClubId, u8)> = graph
        .league
        .divisions
        .iter()
        .flat_map(|d| d.clubs.iter().map(move |c| (*c, d.level)))
        .collect();
    for (club, level) in &plan {
        generate_squad(&mut rng, &mut graph, *club, *level, usize::from(config.squad_size));
        graph.ledger.post(Posting {
            club: *club,
            season: 1,
            week: 0,
            category: LedgerCategory::OpeningBalance,
            amount: config.starting_cash,
            voluntary: false,
            memo: "opening balance".into(),
        })?;
    }
    let fixtures = schedule::schedule_season(&mut graph);

    let mut career = Career {
        meta: CareerMeta {
            id,
            name: config.name.trim().to_string(),
            managed_club: managed,
            revision: 0,
            created_at: now,
            updated_at: now,
        },
        graph,
    };
    youth::intake(&mut career, 0);
    let listed = transfers::refresh_market(&mut career)?;

    let body = match managed {
        Some(club) => format!(
            "The board of {} welcomes you. Season 1 kicks off on {start}.",
            career.graph.club_name(club)
        ),
        None => format!("{} is ready. Season 1 kicks off on {start}.", career.meta.name),
    };
    let subject = format!("Welcome to {}", career.graph.league.name);
    mail::notify_all(&mut career, subject, body);

    info!(
        career = %career.meta.id,
        seed,
        clubs = career.graph.clubs.len(),
        players = career.graph.players.len(),
        fixtures,
        listed,
        "career generated"
    );
    Ok(career)
}
