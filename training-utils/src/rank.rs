use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(
    Copy,
    Clone,
    Debug,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    tsify::Tsify,
    parse_display::Display,
    parse_display::FromStr,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum Playlist {
    #[serde(rename = "1v1")]
    #[display("1v1")]
    Duel,
    #[serde(rename = "2v2")]
    #[display("2v2")]
    Doubles,
    #[serde(rename = "3v3")]
    #[display("3v3")]
    Standard,
}

impl Playlist {
    pub const ALL: [Playlist; 3] = [Playlist::Duel, Playlist::Doubles, Playlist::Standard];
}

/// The competitive ladder, lowest first. Declaration order is ladder order.
#[derive(
    Copy,
    Clone,
    Debug,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    Hash,
    tsify::Tsify,
    parse_display::Display,
    parse_display::FromStr,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    #[display("Bronze I")]
    Bronze1,
    #[display("Bronze II")]
    Bronze2,
    #[display("Bronze III")]
    Bronze3,
    #[display("Silver I")]
    Silver1,
    #[display("Silver II")]
    Silver2,
    #[display("Silver III")]
    Silver3,
    #[display("Gold I")]
    Gold1,
    #[display("Gold II")]
    Gold2,
    #[display("Gold III")]
    Gold3,
    #[display("Platinum I")]
    Platinum1,
    #[display("Platinum II")]
    Platinum2,
    #[display("Platinum III")]
    Platinum3,
    #[display("Diamond I")]
    Diamond1,
    #[display("Diamond II")]
    Diamond2,
    #[display("Diamond III")]
    Diamond3,
    #[display("Champion I")]
    Champion1,
    #[display("Champion II")]
    Champion2,
    #[display("Champion III")]
    Champion3,
    #[display("Grand Champion I")]
    GrandChampion1,
    #[display("Grand Champion II")]
    GrandChampion2,
    #[display("Grand Champion III")]
    GrandChampion3,
    #[display("Supersonic Legend")]
    SupersonicLegend,
}

impl Rank {
    pub const LADDER: [Rank; 22] = [
        Rank::Bronze1,
        Rank::Bronze2,
        Rank::Bronze3,
        Rank::Silver1,
        Rank::Silver2,
        Rank::Silver3,
        Rank::Gold1,
        Rank::Gold2,
        Rank::Gold3,
        Rank::Platinum1,
        Rank::Platinum2,
        Rank::Platinum3,
        Rank::Diamond1,
        Rank::Diamond2,
        Rank::Diamond3,
        Rank::Champion1,
        Rank::Champion2,
        Rank::Champion3,
        Rank::GrandChampion1,
        Rank::GrandChampion2,
        Rank::GrandChampion3,
        Rank::SupersonicLegend,
    ];

    /// Position on the ladder, 0 for Bronze I.
    pub fn step(self) -> i32 {
        self as i32
    }

    /// Signed number of ladder steps from `from` to `to`; positive means a climb.
    pub fn delta(from: Rank, to: Rank) -> i32 {
        to.step() - from.step()
    }
}

/// A logged rank. Two snapshots are the same entry only if all three fields match.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct RankSnapshot {
    #[tsify(type = "string")]
    pub date: NaiveDate,
    pub playlist: Playlist,
    pub rank: Rank,
}

/// The most recent snapshot for each playlist that has one.
/// Several snapshots on the same latest day resolve to the highest rank among them.
pub fn latest_per_playlist(snapshots: &[RankSnapshot]) -> BTreeMap<Playlist, RankSnapshot> {
    let mut latest: BTreeMap<Playlist, RankSnapshot> = BTreeMap::new();
    for snapshot in snapshots {
        latest
            .entry(snapshot.playlist)
            .and_modify(|current| {
                if (snapshot.date, snapshot.rank) > (current.date, current.rank) {
                    *current = *snapshot;
                }
            })
            .or_insert(*snapshot);
    }
    latest
}

/// Ladder steps gained in `playlist` between its earliest and latest snapshot.
pub fn progress_in(snapshots: &[RankSnapshot], playlist: Playlist) -> Option<i32> {
    let mut in_playlist = snapshots.iter().filter(|s| s.playlist == playlist);
    let first = in_playlist.next()?;
    let (earliest, latest) = in_playlist.fold((first, first), |(earliest, latest), s| {
        (
            if (s.date, s.rank) < (earliest.date, earliest.rank) {
                s
            } else {
                earliest
            },
            if (s.date, s.rank) > (latest.date, latest.rank) {
                s
            } else {
                latest
            },
        )
    });
    Some(Rank::delta(earliest.rank, latest.rank))
}
