/// USD value of one production unit printed on an investment card.
pub const UNIT_SCALE: i64 = 10_000;

/// Bonus for a group of 2-3 investment cards sharing a continent or sector.
pub const BONUS_PAIR: i64 = 10_000;
/// Bonus for a group of 4-5 cards.
pub const BONUS_QUAD: i64 = 25_000;
/// Bonus for a group of 6 or more cards.
pub const BONUS_SET: i64 = 50_000;

pub const MIN_YEARS: u8 = 4;
pub const MAX_YEARS: u8 = 5;

pub const MIN_PLAYERS: u8 = 1;
pub const MAX_PLAYERS: u8 = 6;

/// Global trends drawn for every year of the timeline.
pub const GLOBAL_TRENDS_PER_YEAR: usize = 3;

pub const MAX_NAME_LENGTH: usize = 24;
pub const GAME_CODE_LENGTH: usize = 5;

/// Upper bound for any bid, acquisition or trade quantity accepted from a client.
/// Keeps settlement arithmetic comfortably inside `i64`.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;

/// Upper bound for catalog card figures and exchange rates.
pub const MAX_CARD_UNITS: u64 = MAX_AMOUNT;

/// Seat index reserved for the game master.
pub const GM_SEAT: u8 = 0;
