//! Player and team batting from the baseball-reference season batting page

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{first_table, HtmlTable};
use crate::merge::{ArchivePolicy, MergeSpec};
use crate::pipeline::{Artifact, Extract, RunContext, Source, TABULAR};
use crate::sources::{float_or_zero, int_or_zero, round_to};
use crate::table::{ColumnType, Field, Record, Schema, Table};
use crate::{DataError, Result};

const SOURCE: &str = "batting";
pub const SUBJECT: &str = "batting";
pub const PLAYER_ARCHIVE_KEY: &str = "batting/dodgers_player_batting_1958_present.parquet";
pub const TEAM_ARCHIVE_KEY: &str = "batting/dodgers_team_batting_1958_present.parquet";

const TEAM_TOTALS: &str = "Team Totals";

/// Counting and rate columns shared by player and team rows.
const STAT_COLUMNS: &[(&str, ColumnType)] = &[
    ("g", ColumnType::Int),
    ("pa", ColumnType::Int),
    ("ab", ColumnType::Int),
    ("r", ColumnType::Int),
    ("h", ColumnType::Int),
    ("2b", ColumnType::Int),
    ("3b", ColumnType::Int),
    ("hr", ColumnType::Int),
    ("rbi", ColumnType::Int),
    ("sb", ColumnType::Int),
    ("cs", ColumnType::Int),
    ("bb", ColumnType::Int),
    ("so", ColumnType::Int),
    ("ba", ColumnType::Float),
    ("obp", ColumnType::Float),
    ("slg", ColumnType::Float),
    ("ops", ColumnType::Float),
    ("ops_plus", ColumnType::Float),
    ("tb", ColumnType::Int),
    ("gdp", ColumnType::Int),
    ("hbp", ColumnType::Int),
    ("sh", ColumnType::Int),
    ("sf", ColumnType::Int),
    ("ibb", ColumnType::Int),
];

/// One season line of batting statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BattingLine {
    pub g: i64,
    pub pa: i64,
    pub ab: i64,
    pub r: i64,
    pub h: i64,
    #[serde(rename = "2b")]
    pub doubles: i64,
    #[serde(rename = "3b")]
    pub triples: i64,
    pub hr: i64,
    pub rbi: i64,
    pub sb: i64,
    pub cs: i64,
    pub bb: i64,
    pub so: i64,
    pub ba: f64,
    pub obp: f64,
    pub slg: f64,
    pub ops: f64,
    pub ops_plus: f64,
    pub tb: i64,
    pub gdp: i64,
    pub hbp: i64,
    pub sh: i64,
    pub sf: i64,
    pub ibb: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBatting {
    pub name: String,
    /// `Left`, `Right`, `Both` or `Unknown`
    pub bats: String,
    pub pos: String,
    pub age: i64,
    #[serde(flatten)]
    pub line: BattingLine,
    pub season: String,
}

impl Record for PlayerBatting {
    fn schema() -> Schema {
        let mut fields = vec![
            Field::new("name", ColumnType::Text),
            Field::new("bats", ColumnType::Text),
            Field::new("pos", ColumnType::Text),
            Field::new("age", ColumnType::Int),
        ];
        fields.extend(stat_fields());
        fields.push(Field::new("season", ColumnType::Text));
        Schema::new(fields)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBatting {
    #[serde(flatten)]
    pub line: BattingLine,
    pub season: String,
}

impl Record for TeamBatting {
    fn schema() -> Schema {
        let mut fields: Vec<Field> = stat_fields().collect();
        fields.push(Field::new("season", ColumnType::Text));
        Schema::new(fields)
    }
}

fn stat_fields() -> impl Iterator<Item = Field> {
    STAT_COLUMNS
        .iter()
        .map(|(name, kind)| Field::new(*name, *kind))
}

pub struct BattingSource;

impl BattingSource {
    pub fn url(ctx: &RunContext<'_>) -> String {
        format!(
            "{}/teams/{}/{}-batting.shtml",
            ctx.config.endpoints.baseball_reference, ctx.config.team.abbr, ctx.config.season
        )
    }

    pub fn player_artifact() -> Artifact {
        Artifact::new(SUBJECT, "dodgers_player_batting_1958_present", TABULAR).with_merge(
            MergeSpec {
                archive_key: PLAYER_ARCHIVE_KEY.to_string(),
                natural_key: &["name", "season"],
                sort_by: &["season"],
                descending: true,
                policy: ArchivePolicy::Required,
            },
        )
    }

    pub fn team_artifact() -> Artifact {
        Artifact::new(SUBJECT, "dodgers_team_batting_1958_present", TABULAR).with_merge(
            MergeSpec {
                archive_key: TEAM_ARCHIVE_KEY.to_string(),
                natural_key: &["season"],
                sort_by: &["season"],
                descending: true,
                policy: ArchivePolicy::Required,
            },
        )
    }
}

impl Source for BattingSource {
    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<Extract>> {
        let html = ctx.fetcher.get_text(&Self::url(ctx)).await?;
        let (players, team) = parse_batting(&html, ctx.config.season.as_u16())?;
        Ok(vec![
            Extract {
                artifact: Self::player_artifact(),
                table: Table::from_records(&players)?,
            },
            Extract {
                artifact: Self::team_artifact(),
                table: Table::from_records(&[team])?,
            },
        ])
    }
}

/// Player rows and the team totals line of the season batting table.
pub fn parse_batting(html: &str, season: u16) -> Result<(Vec<PlayerBatting>, TeamBatting)> {
    let table = first_table(html, "table", SOURCE)?;
    let name_col = name_column(&table)?;
    let season = season.to_string();

    let mut players = Vec::new();
    let mut totals = None;

    for row in &table.rows {
        let rk = table.cell(row, "Rk").unwrap_or("");
        let name = row.get(name_col).map(String::as_str).unwrap_or("");

        if rk.parse::<u32>().is_ok() {
            let (bats, clean) = split_handedness(strip_notes(name));
            players.push(PlayerBatting {
                name: clean.to_string(),
                bats: bats.to_string(),
                pos: table.cell(row, "Pos").unwrap_or("").to_string(),
                age: int_or_zero(table.cell(row, "Age"), "Age"),
                line: parse_line(&table, row),
                season: season.clone(),
            });
        } else if name == TEAM_TOTALS {
            totals = Some(parse_line(&table, row));
        } else {
            debug!(rk, name, "skipping non-player row");
        }
    }

    if players.is_empty() {
        return Err(DataError::no_data(SOURCE));
    }

    let line = match totals {
        Some(line) => line,
        None => {
            warn!("no team totals row, aggregating player lines");
            aggregate(players.iter().map(|p| &p.line))
        }
    };

    Ok((players, TeamBatting { line, season }))
}

/// The player column is `Player` on older pages and `Name` on newer ones.
fn name_column(table: &HtmlTable) -> Result<usize> {
    table
        .column("Player")
        .or_else(|| table.column("Name"))
        .ok_or_else(|| DataError::missing_field(SOURCE, "Player"))
}

fn parse_line(table: &HtmlTable, row: &[String]) -> BattingLine {
    let int = |name: &str| int_or_zero(table.cell(row, name), name);
    let float = |name: &str| float_or_zero(table.cell(row, name), name);

    BattingLine {
        g: int("G"),
        pa: int("PA"),
        ab: int("AB"),
        r: int("R"),
        h: int("H"),
        doubles: int("2B"),
        triples: int("3B"),
        hr: int("HR"),
        rbi: int("RBI"),
        sb: int("SB"),
        cs: int("CS"),
        bb: int("BB"),
        so: int("SO"),
        ba: float("BA"),
        obp: float("OBP"),
        slg: float("SLG"),
        ops: float("OPS"),
        ops_plus: float("OPS+"),
        tb: int("TB"),
        gdp: if table.column("GIDP").is_some() {
            int("GIDP")
        } else {
            int("GDP")
        },
        hbp: int("HBP"),
        sh: int("SH"),
        sf: int("SF"),
        ibb: int("IBB"),
    }
}

/// Drop parenthetical injury notes: `Mookie Betts (10-day IL)` → `Mookie Betts`.
pub fn strip_notes(name: &str) -> &str {
    name.split('(').next().unwrap_or(name).trim()
}

/// Handedness marker at the end of a name: `*` left, `#` switch, `?` unknown.
pub fn split_handedness(name: &str) -> (&'static str, &str) {
    let bats = match name.chars().last() {
        Some('*') => "Left",
        Some('#') => "Both",
        Some('?') => "Unknown",
        _ => return ("Right", name),
    };
    (bats, name[..name.len() - 1].trim_end())
}

/// Season line summed over players, with rates recomputed from the sums.
///
/// Games is the most any player appeared in; OPS+ cannot be derived and is 0.
pub fn aggregate<'a>(lines: impl Iterator<Item = &'a BattingLine>) -> BattingLine {
    let mut total = BattingLine::default();
    for line in lines {
        total.g = total.g.max(line.g);
        total.pa += line.pa;
        total.ab += line.ab;
        total.r += line.r;
        total.h += line.h;
        total.doubles += line.doubles;
        total.triples += line.triples;
        total.hr += line.hr;
        total.rbi += line.rbi;
        total.sb += line.sb;
        total.cs += line.cs;
        total.bb += line.bb;
        total.so += line.so;
        total.tb += line.tb;
        total.gdp += line.gdp;
        total.hbp += line.hbp;
        total.sh += line.sh;
        total.sf += line.sf;
        total.ibb += line.ibb;
    }

    let ratio = |num: i64, den: i64| {
        if den > 0 {
            round_to(num as f64 / den as f64, 3)
        } else {
            0.0
        }
    };
    total.ba = ratio(total.h, total.ab);
    total.obp = ratio(
        total.h + total.bb + total.hbp,
        total.ab + total.bb + total.hbp + total.sf,
    );
    total.slg = ratio(total.tb, total.ab);
    total.ops = round_to(total.obp + total.slg, 3);
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATTING_PAGE: &str = r#"
    <table id="players_standard_batting">
      <thead><tr>
        <th>Rk</th><th>Pos</th><th>Player</th><th>Age</th><th>G</th><th>PA</th><th>AB</th>
        <th>R</th><th>H</th><th>2B</th><th>3B</th><th>HR</th><th>RBI</th><th>SB</th>
        <th>CS</th><th>BB</th><th>SO</th><th>BA</th><th>OBP</th><th>SLG</th><th>OPS</th>
        <th>OPS+</th><th>TB</th><th>GIDP</th><th>HBP</th><th>SH</th><th>SF</th><th>IBB</th>
      </tr></thead>
      <tbody>
        <tr><th>1</th><td>DH</td><td>Shohei Ohtani*</td><td>29</td><td>159</td><td>731</td>
          <td>636</td><td>134</td><td>197</td><td>38</td><td>7</td><td>54</td><td>130</td>
          <td>59</td><td>4</td><td>81</td><td>162</td><td>.310</td><td>.390</td><td>.646</td>
          <td>1.036</td><td>190</td><td>411</td><td>7</td><td>6</td><td>0</td><td>5</td><td>10</td></tr>
        <tr><th>2</th><td>SS</td><td>Mookie Betts (10-day IL)</td><td>31</td><td>116</td>
          <td>516</td><td>450</td><td>75</td><td>130</td><td>24</td><td>2</td><td>19</td>
          <td>75</td><td>16</td><td>3</td><td>63</td><td>57</td><td>.289</td><td>.372</td>
          <td>.491</td><td>.863</td><td>138</td><td>221</td><td>9</td><td>1</td><td>0</td>
          <td>2</td><td>2</td></tr>
        <tr class="thead"><th>Rk</th><td>Pos</td><td>Player</td></tr>
      </tbody>
      <tfoot>
        <tr><th></th><td></td><td>Team Totals</td><td>29.3</td><td>162</td><td>6256</td>
          <td>5541</td><td>842</td><td>1435</td><td>283</td><td>17</td><td>233</td>
          <td>812</td><td>136</td><td>27</td><td>614</td><td>1325</td><td>.259</td>
          <td>.335</td><td>.446</td><td>.781</td><td>117</td><td>2471</td><td>109</td>
          <td>55</td><td>2</td><td>44</td><td>23</td></tr>
      </tfoot>
    </table>"#;

    #[test]
    fn test_parse_players() {
        let (players, _) = parse_batting(BATTING_PAGE, 2024).unwrap();
        assert_eq!(players.len(), 2);

        let ohtani = &players[0];
        assert_eq!(ohtani.name, "Shohei Ohtani");
        assert_eq!(ohtani.bats, "Left");
        assert_eq!(ohtani.line.hr, 54);
        assert_eq!(ohtani.line.ops, 1.036);
        assert_eq!(ohtani.line.gdp, 7);
        assert_eq!(ohtani.season, "2024");

        let betts = &players[1];
        assert_eq!(betts.name, "Mookie Betts");
        assert_eq!(betts.bats, "Right");
    }

    #[test]
    fn test_team_totals_row_is_used() {
        let (_, team) = parse_batting(BATTING_PAGE, 2024).unwrap();
        assert_eq!(team.line.g, 162);
        assert_eq!(team.line.hr, 233);
        assert_eq!(team.line.ba, 0.259);
        assert_eq!(team.line.ops_plus, 117.0);
    }

    #[test]
    fn test_missing_totals_are_aggregated() {
        let page = BATTING_PAGE.replace("Team Totals", "League Average");
        let (_, team) = parse_batting(&page, 2024).unwrap();
        assert_eq!(team.line.g, 159);
        assert_eq!(team.line.h, 327);
        assert_eq!(team.line.ab, 1086);
        assert_eq!(team.line.ba, 0.301);
        // (327 + 144 + 7) / (1086 + 144 + 7 + 7)
        assert_eq!(team.line.obp, 0.384);
        assert_eq!(team.line.slg, 0.582);
        assert_eq!(team.line.ops, 0.966);
    }

    #[test]
    fn test_split_handedness() {
        assert_eq!(split_handedness("Max Muncy*"), ("Left", "Max Muncy"));
        assert_eq!(split_handedness("Tommy Edman#"), ("Both", "Tommy Edman"));
        assert_eq!(split_handedness("Prospect?"), ("Unknown", "Prospect"));
        assert_eq!(split_handedness("Will Smith"), ("Right", "Will Smith"));
    }

    #[test]
    fn test_aggregate_of_nothing_is_zero() {
        let line = aggregate(std::iter::empty());
        assert_eq!(line, BattingLine::default());
    }

    #[test]
    fn test_no_players_is_no_data() {
        let page = r#"<table><thead><tr><th>Rk</th><th>Player</th></tr></thead>
            <tbody></tbody></table>"#;
        assert!(matches!(
            parse_batting(page, 2024),
            Err(DataError::NoData { .. })
        ));
    }

    #[test]
    fn test_records_fit_declared_schema() {
        let (players, team) = parse_batting(BATTING_PAGE, 2024).unwrap();
        let table = Table::from_records(&players).unwrap();
        assert_eq!(table.schema(), &PlayerBatting::schema());
        assert!(Table::from_records(&[team]).is_ok());
    }
}
