//! Report output: the informational header and one comparison table per
//! (distribution, variant) section.

use std::io::Write;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, Table};

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::metrics::RepresentationSummary;
use crate::workload::Distribution;

/// One density row of a section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    /// Workload density of the row.
    pub density: f64,
    /// Normalized numbers per representation, in registration order.
    pub summaries: Vec<RepresentationSummary>,
}

/// All rows measured for one distribution and variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantReport {
    /// Value distribution of the section.
    pub distribution: Distribution,
    /// Variant name.
    pub variant: String,
    /// One row per density, ascending.
    pub rows: Vec<ReportRow>,
}

/// Write the `#`-prefixed environment and configuration header.
pub fn write_header(out: &mut impl Write, config: &ExperimentConfig, probed: bool) -> Result<()> {
    let processors = std::thread::available_parallelism().map_or(1, |n| n.get());
    writeln!(out, "########")?;
    writeln!(out, "# setbench {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        out,
        "# {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )?;
    writeln!(out, "# processors: {processors}")?;
    writeln!(out, "# universe: {}", config.universe)?;
    writeln!(out, "# repetitions: {}", config.repetitions)?;
    writeln!(out, "# seed: {}", config.seed)?;
    writeln!(
        out,
        "# memory probe: {}",
        if probed { "enabled" } else { "unavailable" }
    )?;
    writeln!(out, "########")?;
    Ok(())
}

/// Write one section: a title line and its table.
pub fn write_section(out: &mut impl Write, report: &VariantReport, probed: bool) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "### {} test, {}",
        report.distribution, report.variant
    )?;
    writeln!(out, "{}", render_table(&report.rows, probed))?;
    Ok(())
}

/// Write the trailing sink line of a pass.
pub fn write_sink(out: &mut impl Write, sink: u64) -> Result<()> {
    writeln!(out, "# ignore = {sink}")?;
    Ok(())
}

/// Write a `#`-prefixed progress marker.
pub fn write_marker(out: &mut impl Write, marker: &str) -> Result<()> {
    writeln!(out, "# {marker}")?;
    Ok(())
}

type Column = (&'static str, fn(&RepresentationSummary) -> String);

/// One statistic per entry; each spans every representation.
fn columns(probed: bool) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::with_capacity(6);
    columns.push(("intersect ns", |s: &RepresentationSummary| format_ns(s.intersect_ns)));
    columns.push(("build ns/int", |s: &RepresentationSummary| {
        format_ns(s.build_ns_per_element)
    }));
    columns.push(("delete ns", |s: &RepresentationSummary| format_ns(s.delete_ns)));
    columns.push(("bits/int", |s: &RepresentationSummary| format_bits(s.bits_per_int)));
    if probed {
        columns.push(("true bits/int", |s: &RepresentationSummary| {
            s.true_bits_per_int.map_or_else(|| "-".to_string(), format_bits)
        }));
    }
    columns.push(("union ns", |s: &RepresentationSummary| format_ns(s.union_ns)));
    columns
}

/// Column titles for the given representation names, grouped by statistic.
pub fn column_titles(names: &[&str], probed: bool) -> Vec<String> {
    let mut titles = vec!["density".to_string()];
    for (stat, _) in columns(probed) {
        titles.extend(names.iter().map(|name| format!("{name} {stat}")));
    }
    titles
}

/// Lay the rows out as a right-aligned table.
pub fn render_table(rows: &[ReportRow], probed: bool) -> Table {
    let names: Vec<&str> = rows
        .first()
        .map(|r| r.summaries.iter().map(|s| s.name).collect())
        .unwrap_or_default();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(
        column_titles(&names, probed)
            .into_iter()
            .map(|h| Cell::new(h).fg(Color::Cyan)),
    );

    let columns = columns(probed);
    for row in rows {
        let mut cells = vec![format_density(row.density)];
        for (_, cell) in &columns {
            cells.extend(row.summaries.iter().map(cell));
        }
        table.add_row(cells);
    }

    for column in table.column_iter_mut() {
        column.set_cell_alignment(CellAlignment::Right);
    }
    table
}

/// Nanoseconds in scientific notation.
pub fn format_ns(ns: f64) -> String {
    format!("{ns:.3e}")
}

/// Bits per integer with one decimal.
pub fn format_bits(bits: f64) -> String {
    format!("{bits:.1}")
}

fn format_density(d: f64) -> String {
    format!("{d:.0e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &'static str) -> RepresentationSummary {
        RepresentationSummary {
            name,
            intersect_ns: 1234.5,
            build_ns_per_element: 12.0,
            delete_ns: 80.0,
            union_ns: 2000.0,
            bits_per_int: 3.26,
            true_bits_per_int: Some(4.0),
        }
    }

    #[test]
    fn titles_follow_registration_order() {
        let titles = column_titles(&["a", "b"], false);
        assert_eq!(titles.len(), 1 + 2 * 5);
        assert_eq!(titles[1], "a intersect ns");
        assert_eq!(titles[2], "b intersect ns");
        assert_eq!(titles[3], "a build ns/int");
        assert_eq!(titles[8], "b bits/int");
        assert_eq!(titles[10], "b union ns");
        assert_eq!(column_titles(&["a"], true)[5], "a true bits/int");
        let with_true = column_titles(&["a", "b"], true);
        assert_eq!(with_true[9], "a true bits/int");
        assert_eq!(with_true[11], "a union ns");
    }

    #[test]
    fn number_formats() {
        assert_eq!(format_ns(1234.4), "1.234e3");
        assert_eq!(format_bits(3.26), "3.3");
        assert_eq!(format_density(0.001), "1e-3");
        assert_eq!(format_density(1.0), "1e0");
    }

    #[test]
    fn table_contains_values() {
        let rows = vec![ReportRow {
            density: 0.01,
            summaries: vec![summary("bitset"), summary("roaring")],
        }];
        let rendered = render_table(&rows, true).to_string();
        assert!(rendered.contains("roaring union ns"));
        assert!(rendered.contains("2.000e3"));
        assert!(rendered.contains("4.0"));
        assert!(rendered.contains("1e-2"));
    }

    #[test]
    fn cells_are_grouped_by_statistic() {
        let mut first = summary("bitset");
        first.intersect_ns = 1000.0;
        let mut second = summary("roaring");
        second.intersect_ns = 5.0;
        let rows = vec![ReportRow {
            density: 0.01,
            summaries: vec![first, second],
        }];
        let table = render_table(&rows, false);
        let cells: Vec<String> = table
            .row_iter()
            .next()
            .unwrap()
            .cell_iter()
            .map(|c| c.content())
            .collect();
        assert_eq!(cells.len(), 11);
        assert_eq!(cells[1], "1.000e3");
        assert_eq!(cells[2], "5.000e0");
        assert_eq!(cells[3], "1.200e1");
        assert_eq!(cells[4], "1.200e1");
        assert_eq!(cells[10], "2.000e3");
    }

    #[test]
    fn header_and_sink_lines() {
        let mut out = Vec::new();
        write_header(&mut out, &ExperimentConfig::default(), false).unwrap();
        write_marker(&mut out, "running a dry run").unwrap();
        write_sink(&mut out, 17).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("# seed: 42"));
        assert!(text.contains("# memory probe: unavailable"));
        assert!(text.contains("\n# running a dry run\n"));
        assert!(text.ends_with("# ignore = 17\n"));
    }
}
