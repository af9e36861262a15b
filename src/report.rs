use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::{info, warn};

use crate::config::ReportOptions;
use crate::data::model::ReportRow;
use crate::error::HuntError;

const TABLE_TITLE: &str = "Prospect Systems";
const HEADINGS: [&str; 7] = [
    "",
    "Name",
    "Allegiance",
    "Population",
    "Factions",
    "Stations",
    "Surface",
];

// ---------------------------------------------------------------------------
// Console table
// ---------------------------------------------------------------------------

/// Borderless, left-aligned table with a centred title.
pub fn write_table(out: &mut impl Write, rows: &[ReportRow]) -> io::Result<()> {
    let cells: Vec<[String; 7]> = rows
        .iter()
        .map(|r| {
            [
                r.rank.to_string(),
                r.name.clone(),
                r.allegiance.clone(),
                r.population.to_string(),
                r.active_faction_count.to_string(),
                r.orbital_station_count.to_string(),
                r.surface_station_count.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADINGS.map(|h| h.chars().count());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let total: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);

    writeln!(out, "{:^total$}", TABLE_TITLE)?;
    write_line(out, &HEADINGS, &widths)?;
    writeln!(out, "{}", "-".repeat(total))?;
    for row in &cells {
        write_line(out, row, &widths)?;
    }
    Ok(())
}

fn write_line<S: AsRef<str>>(
    out: &mut impl Write,
    cells: &[S],
    widths: &[usize],
) -> io::Result<()> {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{:<w$}", c.as_ref()))
        .collect();
    writeln!(out, "{}", line.join("  ").trim_end())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Serialize rows as CSV with a header line.
pub fn write_csv_to<W: Write>(writer: W, rows: &[ReportRow]) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    if rows.is_empty() {
        csv_writer.write_record([
            "Rank",
            "Name",
            "Allegiance",
            "Population",
            "Faction Count",
            "Orbital Stations",
            "Surface Stations",
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the CSV report, creating the parent directory when needed.
pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<(), HuntError> {
    let write = || -> csv::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        write_csv_to(io::BufWriter::new(file), rows)
    };
    write().map_err(|source| HuntError::Report {
        path: path.display().to_string(),
        source,
    })?;
    info!("The CSV file was written successfully to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Write the CSV file, then the table. A console write failure (a closed
/// pipe, say) is logged and only loses the table.
pub fn publish(
    options: &ReportOptions,
    rows: &[ReportRow],
    out: &mut impl Write,
) -> Result<(), HuntError> {
    if let Some(path) = &options.csv_path {
        write_csv(path, rows)?;
    }
    if options.table {
        if let Err(e) = writeln!(out).and_then(|()| write_table(out, rows)) {
            warn!("Could not print the report table: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rank: usize, name: &str, population: u64) -> ReportRow {
        ReportRow {
            rank,
            name: name.into(),
            allegiance: "Federation".into(),
            population,
            active_faction_count: 3,
            orbital_station_count: 1,
            surface_station_count: 2,
        }
    }

    #[test]
    fn csv_has_header_and_rows_in_order() {
        let mut buf = Vec::new();
        write_csv_to(&mut buf, &[row(1, "Alpha, Prime", 10), row(2, "Beta", 20)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "Rank,Name,Allegiance,Population,Faction Count,Orbital Stations,Surface Stations",
                "1,\"Alpha, Prime\",Federation,10,3,1,2",
                "2,Beta,Federation,20,3,1,2",
            ]
        );
    }

    #[test]
    fn empty_report_still_has_header() {
        let mut buf = Vec::new();
        write_csv_to(&mut buf, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap().trim_end(),
            "Rank,Name,Allegiance,Population,Faction Count,Orbital Stations,Surface Stations"
        );
    }

    #[test]
    fn write_csv_creates_report_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("populated-systems.csv");
        write_csv(&path, &[row(1, "Alpha", 10)]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn table_aligns_columns() {
        let mut buf = Vec::new();
        write_table(&mut buf, &[row(1, "A", 5), row(2, "Longer Name", 123456)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0].trim(), TABLE_TITLE);
        assert!(lines[1].starts_with("   Name         Allegiance"));
        let name_col = lines[1].find("Name").unwrap();
        assert_eq!(lines[3].find('A'), Some(name_col));
        assert_eq!(lines[4].find("Longer Name"), Some(name_col));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn csv_survives_a_closed_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let options = ReportOptions {
            csv_path: Some(path.clone()),
            table: true,
        };
        publish(&options, &[row(1, "Alpha", 10)], &mut ClosedPipe).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn unwritable_csv_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("reports");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("out.csv");
        match write_csv(&path, &[]) {
            Err(HuntError::Report { path: reported, .. }) => {
                assert_eq!(reported, path.display().to_string())
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
