//! Dataset and post selectors for CLI commands.

use std::fmt;

/// A publishable dataset, one per fetch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Dataset {
    /// Game-by-game results merged into the 1958-present archive
    Standings,
    /// Current-season win/loss sequence derived from the standings archive
    WinsLosses,
    /// Standings metrics for every MLB team
    LeagueStandings,
    /// The team's MLB rank in selected hitting and pitching stats
    LeagueRanks,
    /// Season attendance for every MLB team
    Attendance,
    /// Last ten results and next ten games
    Schedule,
    /// Player and team batting, merged into the batting archives
    Batting,
    /// Current team pitching totals
    Pitching,
    /// 40-man roster
    Roster,
    /// Roster transactions archive
    Transactions,
    /// Pitch-by-pitch data for the current season
    Pitches,
}

impl Dataset {
    /// Run order for `fetch-all`: derived datasets follow their inputs.
    pub const ALL: [Dataset; 11] = [
        Dataset::Standings,
        Dataset::WinsLosses,
        Dataset::LeagueStandings,
        Dataset::LeagueRanks,
        Dataset::Attendance,
        Dataset::Schedule,
        Dataset::Batting,
        Dataset::Pitching,
        Dataset::Roster,
        Dataset::Transactions,
        Dataset::Pitches,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Standings => "standings",
            Dataset::WinsLosses => "wins-losses",
            Dataset::LeagueStandings => "league-standings",
            Dataset::LeagueRanks => "league-ranks",
            Dataset::Attendance => "attendance",
            Dataset::Schedule => "schedule",
            Dataset::Batting => "batting",
            Dataset::Pitching => "pitching",
            Dataset::Roster => "roster",
            Dataset::Transactions => "transactions",
            Dataset::Pitches => "pitches",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of outbound social posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PostKind {
    /// Narrative summary of the latest game
    Summary,
    /// Team batting report with MLB ranks
    Batting,
    /// Team pitching report with MLB ranks
    Pitching,
    /// New roster transactions from the last seven days
    Transactions,
    /// Top story from each news outlet
    News,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Summary => "summary",
            PostKind::Batting => "batting",
            PostKind::Pitching => "pitching",
            PostKind::Transactions => "transactions",
            PostKind::News => "news",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
