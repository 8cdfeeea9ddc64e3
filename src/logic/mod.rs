//! Tournament business logic: bracket seeding, rounds, resurrection, stats.

mod aggregate;
mod bracket;
mod record;
mod resurrection;
mod rounds;

pub use aggregate::{fetch_newest_first, fold_records, leaderboard, AggregateError};
pub use bracket::{build_bracket, make_next_round, Bracket};
pub use record::{stat_records, submit_result, WriteError};
pub use resurrection::{
    confirm_resurrection, skip_resurrection, ResurrectionSelection, MAX_RESURRECTIONS,
};
pub use rounds::{
    back, pick, restart_run, start_run, RESURRECTION_MIN_ENTRANTS, RESURRECTION_SURVIVORS,
};
