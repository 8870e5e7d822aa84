//! Pitch-by-pitch data for the club's batters, with strike-zone geometry

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cli::types::{home_today, GamePk, TeamId};
use crate::merge::{ArchivePolicy, MergeSpec};
use crate::pipeline::{Artifact, Extract, RunContext, Source, CSV_AND_JSON};
use crate::table::{ColumnType, Record, Schema, Table, Value};
use crate::{DataError, Result};

const SOURCE: &str = "pitches";
pub const SUBJECT: &str = "pitches";

/// Horizontal edge of the rule-book zone from the centre of the plate, in feet.
pub const ZONE_HALF_WIDTH_FT: f64 = 0.708;
/// Radius of a baseball, in feet.
pub const BALL_RADIUS_FT: f64 = 1.45 / 12.0;

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleDate {
    #[serde(default)]
    pub games: Vec<ScheduleGame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleGame {
    #[serde(rename = "gamePk")]
    pub game_pk: u64,
    #[serde(rename = "officialDate")]
    pub official_date: Option<String>,
    #[serde(default)]
    pub status: GameStatus,
    pub teams: ScheduleTeams,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameStatus {
    #[serde(rename = "abstractGameState")]
    pub abstract_game_state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleTeams {
    pub home: ScheduleSide,
    pub away: ScheduleSide,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSide {
    pub team: ScheduleTeam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleTeam {
    pub id: u32,
    pub name: Option<String>,
}

/// Which half of the game feed (`home_batters` or `away_batters`) holds the
/// club's batters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattingSide {
    Home,
    Away,
}

/// A completed game the club played in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalGame {
    pub game_pk: GamePk,
    pub game_date: Option<String>,
    pub side: BattingSide,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameFeed {
    #[serde(default)]
    pub home_batters: BTreeMap<String, Vec<FeedPitch>>,
    #[serde(default)]
    pub away_batters: BTreeMap<String, Vec<FeedPitch>>,
}

impl GameFeed {
    fn batters(&self, side: BattingSide) -> &BTreeMap<String, Vec<FeedPitch>> {
        match side {
            BattingSide::Home => &self.home_batters,
            BattingSide::Away => &self.away_batters,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedPitch {
    pub play_id: Option<String>,
    pub inning: Option<i64>,
    pub ab_number: Option<i64>,
    pub pitch_number: Option<i64>,
    pub batter_name: Option<String>,
    pub pitcher_name: Option<String>,
    pub pitch_name: Option<String>,
    pub start_speed: Option<f64>,
    pub pitch_call: Option<String>,
    pub result: Option<String>,
    pub des: Option<String>,
    pub zone: Option<i64>,
    pub px: Option<f64>,
    pub pz: Option<f64>,
    pub sz_bot: Option<f64>,
    pub sz_top: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchRow {
    pub game_pk: u64,
    pub game_date: Option<String>,
    pub pitch_id: Option<String>,
    pub inning: Option<i64>,
    pub ab_number: Option<i64>,
    pub pitch_number: Option<i64>,
    pub batter: Option<String>,
    pub pitcher: Option<String>,
    pub pitch_name: Option<String>,
    pub pitch_velocity: Option<f64>,
    pub pitch_call: Option<String>,
    #[serde(default)]
    pub pitch_in_zone: bool,
    pub at_bat_eventual_result: Option<String>,
    pub at_bat_eventual_desc: Option<String>,
    pub dist_from_sz_center_inches: Option<f64>,
    pub dist_from_sz_edge_inches: Option<f64>,
    pub zone: Option<i64>,
    pub px: Option<f64>,
    pub pz: Option<f64>,
    pub sz_bot: Option<f64>,
    pub sz_top: Option<f64>,
}

impl Record for PitchRow {
    fn schema() -> Schema {
        Schema::of(&[
            ("game_pk", ColumnType::Int),
            ("game_date", ColumnType::Text),
            ("pitch_id", ColumnType::Text),
            ("inning", ColumnType::Int),
            ("ab_number", ColumnType::Int),
            ("pitch_number", ColumnType::Int),
            ("batter", ColumnType::Text),
            ("pitcher", ColumnType::Text),
            ("pitch_name", ColumnType::Text),
            ("pitch_velocity", ColumnType::Float),
            ("pitch_call", ColumnType::Text),
            ("pitch_in_zone", ColumnType::Bool),
            ("at_bat_eventual_result", ColumnType::Text),
            ("at_bat_eventual_desc", ColumnType::Text),
            ("dist_from_sz_center_inches", ColumnType::Float),
            ("dist_from_sz_edge_inches", ColumnType::Float),
            ("zone", ColumnType::Int),
            ("px", ColumnType::Float),
            ("pz", ColumnType::Float),
            ("sz_bot", ColumnType::Float),
            ("sz_top", ColumnType::Float),
        ])
    }
}

/// Distance of a pitch from the strike zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneDistance {
    /// From the ball's centre to the nearest point of the zone
    pub center_inches: f64,
    /// [`center_inches`](Self::center_inches) less the ball radius
    pub edge_inches: f64,
    /// Any part of the ball touches the zone
    pub in_zone: bool,
}

/// Place a pitch relative to the zone rectangle
/// `[-0.708, 0.708] × [sz_bot, sz_top]`. `None` if any coordinate is missing.
pub fn zone_distance(
    px: Option<f64>,
    pz: Option<f64>,
    sz_bot: Option<f64>,
    sz_top: Option<f64>,
) -> Option<ZoneDistance> {
    let (px, pz, bot, top) = (px?, pz?, sz_bot?, sz_top?);
    let closest_x = px.clamp(-ZONE_HALF_WIDTH_FT, ZONE_HALF_WIDTH_FT);
    let closest_z = pz.max(bot).min(top);
    let center_ft = ((px - closest_x).powi(2) + (pz - closest_z).powi(2)).sqrt();

    Some(ZoneDistance {
        center_inches: center_ft * 12.0,
        edge_inches: (center_ft - BALL_RADIUS_FT) * 12.0,
        in_zone: center_ft <= BALL_RADIUS_FT,
    })
}

pub struct PitchesSource;

impl PitchesSource {
    pub fn schedule_url(ctx: &RunContext<'_>, today: NaiveDate) -> String {
        format!(
            "{}/api/v1/schedule?sportId=1&teamId={}&startDate={}-03-20&endDate={}",
            ctx.config.endpoints.statsapi,
            ctx.config.team.id,
            ctx.config.season,
            today.format("%Y-%m-%d")
        )
    }

    pub fn feed_url(ctx: &RunContext<'_>, game_pk: GamePk) -> String {
        format!("{}/gf?game_pk={}", ctx.config.endpoints.savant, game_pk)
    }

    pub fn artifact_name(season: u16) -> String {
        format!("dodgers_pitches_{}", season)
    }

    /// The previously published pitches of `season`.
    pub fn archive_key(season: u16) -> String {
        format!("{}/{}.json", SUBJECT, Self::artifact_name(season))
    }

    pub fn artifact(season: u16) -> Artifact {
        Artifact::new(SUBJECT, Self::artifact_name(season), CSV_AND_JSON).with_merge(MergeSpec {
            archive_key: Self::archive_key(season),
            natural_key: &["game_pk", "ab_number", "pitch_number"],
            sort_by: &["game_date", "inning", "ab_number", "pitch_number"],
            descending: false,
            policy: ArchivePolicy::Optional,
        })
    }
}

impl Source for PitchesSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let season = ctx.config.season.as_u16();
        let schedule: ScheduleResponse = ctx
            .fetcher
            .get_json(&Self::schedule_url(ctx, home_today()))
            .await?;
        let games = final_games(&schedule, ctx.config.team.id);
        if games.is_empty() {
            return Err(DataError::no_data("final games in the schedule"));
        }

        let archived = match ctx.load_table(&Self::archive_key(season)).await? {
            Some(archive) => archived_games(&archive),
            None => HashSet::new(),
        };
        let pending: Vec<&FinalGame> = games
            .iter()
            .filter(|g| !archived.contains(&g.game_pk))
            .collect();
        info!(
            games = games.len(),
            archived = games.len() - pending.len(),
            pending = pending.len(),
            "pitch feeds to download"
        );

        let mut rows = Vec::new();
        for game in pending {
            match ctx
                .fetcher
                .get_json::<GameFeed>(&Self::feed_url(ctx, game.game_pk))
                .await
            {
                Ok(feed) => rows.extend(pitch_rows(game, &feed)),
                Err(e) => warn!(game_pk = %game.game_pk, error = %e, "game feed failed, skipping"),
            }
        }

        Ok(vec![Extract {
            artifact: Self::artifact(season),
            table: Table::from_records(&rows)?,
        }])
    }
}

/// Final games involving `team`, with the side its batters are listed on.
pub fn final_games(schedule: &ScheduleResponse, team: TeamId) -> Vec<FinalGame> {
    schedule
        .dates
        .iter()
        .flat_map(|d| &d.games)
        .filter(|g| g.status.abstract_game_state.as_deref() == Some("Final"))
        .filter_map(|g| {
            let side = if g.teams.home.team.id == team.as_u32() {
                BattingSide::Home
            } else if g.teams.away.team.id == team.as_u32() {
                BattingSide::Away
            } else {
                return None;
            };
            Some(FinalGame {
                game_pk: GamePk::new(g.game_pk),
                game_date: g.official_date.clone(),
                side,
            })
        })
        .collect()
}

/// Game ids already present in a published pitches table.
pub fn archived_games(archive: &Table) -> HashSet<GamePk> {
    archive
        .column_values("game_pk")
        .unwrap_or_default()
        .into_iter()
        .filter_map(Value::as_i64)
        .filter_map(|pk| u64::try_from(pk).ok())
        .map(GamePk::new)
        .collect()
}

/// Rows for every pitch thrown to the club's batters in one game.
pub fn pitch_rows(game: &FinalGame, feed: &GameFeed) -> Vec<PitchRow> {
    let mut rows: Vec<PitchRow> = feed
        .batters(game.side)
        .values()
        .flatten()
        .map(|pitch| {
            let distance = zone_distance(pitch.px, pitch.pz, pitch.sz_bot, pitch.sz_top);
            PitchRow {
                game_pk: game.game_pk.as_u64(),
                game_date: game.game_date.clone(),
                pitch_id: pitch.play_id.clone(),
                inning: pitch.inning,
                ab_number: pitch.ab_number,
                pitch_number: pitch.pitch_number,
                batter: pitch.batter_name.clone(),
                pitcher: pitch.pitcher_name.clone(),
                pitch_name: pitch.pitch_name.clone(),
                pitch_velocity: pitch.start_speed,
                pitch_call: pitch.pitch_call.clone(),
                pitch_in_zone: distance.is_some_and(|d| d.in_zone),
                at_bat_eventual_result: pitch.result.clone(),
                at_bat_eventual_desc: pitch.des.clone(),
                dist_from_sz_center_inches: distance.map(|d| d.center_inches),
                dist_from_sz_edge_inches: distance.map(|d| d.edge_inches),
                zone: pitch.zone,
                px: pitch.px,
                pz: pitch.pz,
                sz_bot: pitch.sz_bot,
                sz_top: pitch.sz_top,
            }
        })
        .collect();

    rows.sort_by_key(|r| {
        (
            r.inning.unwrap_or(0),
            r.ab_number.unwrap_or(0),
            r.pitch_number.unwrap_or(0),
        )
    });
    rows
}

#[cfg(test)]
mod tests;
