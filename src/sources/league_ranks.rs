//! The team's MLB rank in a handful of hitting and pitching leaderboards

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::{Artifact, Extract, RunContext, Source, JSON_DOCUMENT};
use crate::table::{ColumnType, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "league-ranks";

pub const HITTING_STATS: &[&str] = &[
    "runs",
    "stolenBases",
    "homeRuns",
    "battingAverage",
    "onBasePlusSlugging",
    "sluggingPercentage",
    "onBasePercentage",
];
pub const PITCHING_STATS: &[&str] = &[
    "strikeouts",
    "walks",
    "earnedRunAverage",
    "walksAndHitsPerInningPitched",
];

/// Leaderboards where lower is better.
const ASCENDING: &[&str] = &["earnedRunAverage"];

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub stats: Vec<LeaderboardRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardRow {
    #[serde(rename = "teamName")]
    pub team_name: Option<String>,
    pub rank: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueRank {
    /// `{group}_{stat}`, e.g. `hitting_homeRuns`
    pub stat: String,
    pub group: String,
    /// Missing when the team was not on the board or the request failed
    pub rank: Option<i64>,
}

impl Record for LeagueRank {
    fn schema() -> Schema {
        Schema::of(&[
            ("stat", ColumnType::Text),
            ("group", ColumnType::Text),
            ("rank", ColumnType::Int),
        ])
    }
}

pub struct LeagueRanksSource;

impl LeagueRanksSource {
    pub fn url(ctx: &RunContext<'_>, group: &str, stat: &str) -> String {
        let order = if ASCENDING.contains(&stat) { "asc" } else { "desc" };
        format!(
            "{}/bdfed/stats/team?&env=prod&sportId=1&gameType=R&group={}&order={}&sortStat={}&stats=season&season={}&limit=30&offset=0",
            ctx.config.endpoints.stats_feed, group, order, stat, ctx.config.season
        )
    }

    pub fn artifact(season: u16) -> Artifact {
        Artifact::new("standings", format!("dodgers_league_ranks_{}", season), JSON_DOCUMENT)
    }

    pub fn object_path(season: u16) -> String {
        format!("standings/dodgers_league_ranks_{}.json", season)
    }
}

impl Source for LeagueRanksSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let boards = HITTING_STATS
            .iter()
            .map(|s| ("hitting", *s))
            .chain(PITCHING_STATS.iter().map(|s| ("pitching", *s)));

        let mut ranks = Vec::new();
        let mut last_error = None;
        for (group, stat) in boards {
            let rank = match ctx
                .fetcher
                .get_json::<LeaderboardResponse>(&Self::url(ctx, group, stat))
                .await
            {
                Ok(board) => team_rank(&board, &ctx.config.team.name),
                Err(e) => {
                    warn!(group, stat, error = %e, "leaderboard request failed");
                    last_error = Some(e);
                    None
                }
            };
            if rank.is_none() {
                warn!(group, stat, team = %ctx.config.team.name, "rank not found");
            }
            ranks.push(LeagueRank {
                stat: format!("{}_{}", group, stat),
                group: group.to_string(),
                rank,
            });
        }

        if ranks.iter().all(|r| r.rank.is_none()) {
            return Err(last_error.unwrap_or_else(|| DataError::no_data(SOURCE)));
        }
        info!(
            found = ranks.iter().filter(|r| r.rank.is_some()).count(),
            total = ranks.len(),
            "league ranks collected"
        );

        Ok(vec![Extract {
            artifact: Self::artifact(ctx.config.season.as_u16()),
            table: Table::from_records(&ranks)?,
        }])
    }
}

/// The rank the leaderboard gives `team`, if it is listed.
pub fn team_rank(board: &LeaderboardResponse, team: &str) -> Option<i64> {
    board
        .stats
        .iter()
        .find(|row| row.team_name.as_deref() == Some(team))
        .and_then(|row| row.rank)
}
