use crate::data::quote_bundle::{Bar, QuoteBundle};
use crate::error::{Result, TradevolveError};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// One CSV row: `symbol,date,open,high,low,close,volume`.
#[derive(Debug, Deserialize)]
struct QuoteRow {
    symbol: String,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load a quote bundle from a headered CSV file.
///
/// All rows are aligned on the union of dates seen; symbols missing a date
/// get a hole there (evaluations touching it fail as missing data). Rows
/// with non-positive prices are skipped with a warning rather than failing
/// the whole load.
pub fn load_quotes<P: AsRef<Path>>(path: P) -> Result<QuoteBundle> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;

    let mut rows: Vec<QuoteRow> = Vec::new();
    for record in reader.deserialize() {
        let row: QuoteRow = record?;
        if row.close <= 0.0 || row.open <= 0.0 {
            log::warn!(
                "skipping non-positive quote for {} on {}",
                row.symbol,
                row.date
            );
            continue;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(TradevolveError::DataLoading(format!(
            "no usable quotes in {}",
            path.as_ref().display()
        )));
    }

    let dates: Vec<NaiveDate> = rows
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let day_index: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();

    let mut per_symbol: HashMap<String, Vec<Option<Bar>>> = HashMap::new();
    for row in rows {
        let series = per_symbol
            .entry(row.symbol)
            .or_insert_with(|| vec![None; dates.len()]);
        series[day_index[&row.date]] = Some(Bar {
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }

    let mut bundle = QuoteBundle::new(dates);
    for (symbol, series) in per_symbol {
        bundle.add_series(symbol, series);
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "tradevolve_quotes_{}_{}.csv",
            std::process::id(),
            contents.len()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_aligned_bundle() {
        let path = write_fixture(
            "symbol,date,open,high,low,close,volume\n\
             BHP,2024-01-02,10.0,10.5,9.5,10.2,1000\n\
             BHP,2024-01-03,10.2,10.8,10.0,10.6,1100\n\
             RIO,2024-01-02,50.0,51.0,49.0,50.5,2000\n",
        );
        let bundle = load_quotes(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bundle.days(), 2);
        let mut symbols: Vec<&str> = bundle.symbols().collect();
        symbols.sort();
        assert_eq!(symbols, ["BHP", "RIO"]);

        // RIO has a hole on the second day.
        assert!(bundle
            .quote("RIO", crate::types::QuoteKind::Close, 1, 0)
            .is_err());
        assert_eq!(
            bundle
                .quote("BHP", crate::types::QuoteKind::Close, 1, 0)
                .unwrap(),
            10.6
        );
    }

    #[test]
    fn empty_file_is_a_load_error() {
        let path = write_fixture("symbol,date,open,high,low,close,volume\n");
        let result = load_quotes(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
