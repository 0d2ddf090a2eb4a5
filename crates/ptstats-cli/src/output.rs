// CSV output for aggregated records.
//
// Columns are the identity fields, then the context tags, then the stat
// columns. Absent identity or context values are written as empty cells.

use std::io::Write;

use ptstats_core::{EntityIdentity, RecordContext, ShotStatRecord, StatCategory, StatRecord};

const IDENTITY_COLUMNS: [&str; 5] = [
    "PLAYER_ID",
    "PLAYER_NAME",
    "TEAM_ID",
    "TEAM_NAME",
    "TEAM_ABBREVIATION",
];

const CONTEXT_COLUMNS: [&str; 3] = ["SEASON", "GAME_ID", "OPPONENT_TEAM_ID"];

const SHOT_COLUMNS: [&str; 19] = [
    "GP",
    "FGM",
    "FGA",
    "FG2M",
    "FG2A",
    "FG3M",
    "FG3A",
    "OVERALL_FGA",
    "OVERALL_FG2A",
    "OVERALL_FG3A",
    "FG_PCT",
    "FG2_PCT",
    "FG3_PCT",
    "EFG_PCT",
    "FGA_FREQUENCY",
    "FG2A_FREQUENCY",
    "FG3A_FREQUENCY",
    "FREQUENCY_OF_FG2A",
    "FREQUENCY_OF_FG3A",
];

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn leading_cells(identity: &EntityIdentity, context: &RecordContext) -> Vec<String> {
    vec![
        opt(&identity.player_id),
        opt(&identity.player_name),
        opt(&identity.team_id),
        opt(&identity.team_name),
        opt(&identity.team_abbreviation),
        opt(&context.season),
        opt(&context.game_id),
        opt(&context.opponent_team_id),
    ]
}

fn header(stat_columns: &[&str]) -> Vec<String> {
    IDENTITY_COLUMNS
        .iter()
        .chain(CONTEXT_COLUMNS.iter())
        .chain(stat_columns.iter())
        .map(|c| c.to_string())
        .collect()
}

/// Write tracking records of one category. The header is written even when
/// there are no records.
pub fn write_stat_records<W: Write>(
    wtr: W,
    category: StatCategory,
    records: &[StatRecord],
) -> Result<(), csv::Error> {
    let columns = category.schema().stat_columns();
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record(header(&columns))?;

    for record in records {
        let mut cells = leading_cells(&record.identity, &record.context);
        cells.extend(
            columns
                .iter()
                .map(|c| record.value(c).unwrap_or_default().to_string()),
        );
        writer.write_record(cells)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_shot_records<W: Write>(wtr: W, records: &[ShotStatRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record(header(&SHOT_COLUMNS))?;

    for record in records {
        let c = &record.counts;
        let r = record.rates();
        let mut cells = leading_cells(&record.identity, &record.context);
        cells.extend(
            [
                c.games_played,
                c.fgm,
                c.fga,
                c.fg2m,
                c.fg2a,
                c.fg3m,
                c.fg3a,
                c.overall_fga,
                c.overall_fg2a,
                c.overall_fg3a,
            ]
            .iter()
            .map(u32::to_string),
        );
        cells.extend(
            [
                r.fg_pct,
                r.fg2_pct,
                r.fg3_pct,
                r.efg_pct,
                r.fga_frequency,
                r.fg2a_frequency,
                r.fg3a_frequency,
                r.frequency_of_fg2a,
                r.frequency_of_fg3a,
            ]
            .iter()
            .map(f64::to_string),
        );
        writer.write_record(cells)?;
    }
    writer.flush()?;
    Ok(())
}
