use crate::bar::{Bar, InvalidBarError};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::path::Path;
use tempo_instrument::Pair;
use tempo_integration::{EventSource, Instant};
use thiserror::Error;

/// Raised while loading a CSV bar file.
#[derive(Debug, Error)]
pub enum CsvBarSourceError {
    #[error("failed to read bar csv: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse bar csv row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("row {row} has a naive datetime '{0}' with no UTC offset", .datetime)]
    NaiveDatetime { row: usize, datetime: String },
    #[error("row {row} is not a valid bar: {source}")]
    InvalidBar {
        row: usize,
        #[source]
        source: InvalidBarError,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Row {
    datetime: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

/// A historical [`EventSource`] of [`Bar`] events read once, eagerly, from a CSV file.
///
/// The header row is `datetime,open,high,low,close,volume`; `datetime` must carry an explicit
/// UTC offset. Columns beyond `volume` are ignored, so the same format the matcher consumes can
/// also carry provider-specific metadata.
///
/// Loaded eagerly (not streamed) because a backtest replays the same file deterministically many
/// times over and the whole history comfortably fits in memory; nothing here forbids a streaming
/// variant if that stops being true.
pub struct CsvBarSource {
    pair: Pair,
    period: chrono::Duration,
    buffer: VecDeque<Bar>,
}

impl CsvBarSource {
    pub fn open<P: AsRef<Path>>(
        path: P,
        pair: Pair,
        period: chrono::Duration,
    ) -> Result<Self, CsvBarSourceError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut buffer = VecDeque::new();

        for (index, record) in reader.deserialize::<Row>().enumerate() {
            let row = record.map_err(|source| CsvBarSourceError::Csv { row: index, source })?;

            let when = tempo_integration::time::parse_offset_datetime(&row.datetime).map_err(
                |_| CsvBarSourceError::NaiveDatetime {
                    row: index,
                    datetime: row.datetime.clone(),
                },
            )?;

            let bar = Bar::new(
                pair.clone(),
                period,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume,
                when,
            )
            .map_err(|source| CsvBarSourceError::InvalidBar { row: index, source })?;

            buffer.push_back(bar);
        }

        Ok(Self {
            pair,
            period,
            buffer,
        })
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }
}

impl EventSource<Bar> for CsvBarSource {
    fn peek_when(&self) -> Option<Instant> {
        self.buffer.front().map(|bar| bar.when)
    }

    fn pop(&mut self) -> Option<Bar> {
        self.buffer.pop_front()
    }

    fn is_terminated(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn pair() -> Pair {
        Pair::new("btc", "usdt", 6, 2)
    }

    #[test]
    fn loads_bars_in_file_order() {
        let file = write_csv(
            "datetime,open,high,low,close,volume\n\
             2024-01-01T00:00:00+00:00,100,110,90,105,10\n\
             2024-01-01T01:00:00+00:00,105,115,95,108,12\n",
        );

        let mut source =
            CsvBarSource::open(file.path(), pair(), chrono::Duration::hours(1)).unwrap();

        let first = source.pop().unwrap();
        assert_eq!(first.close, Decimal::new(105, 0));

        let second = source.pop().unwrap();
        assert_eq!(second.close, Decimal::new(108, 0));

        assert!(source.is_terminated());
        assert!(source.pop().is_none());
    }

    #[test]
    fn rejects_naive_datetime() {
        let file = write_csv(
            "datetime,open,high,low,close,volume\n\
             2024-01-01T00:00:00,100,110,90,105,10\n",
        );

        let err = CsvBarSource::open(file.path(), pair(), chrono::Duration::hours(1)).unwrap_err();
        assert!(matches!(err, CsvBarSourceError::NaiveDatetime { .. }));
    }

    #[test]
    fn peek_when_reflects_the_front_of_the_buffer() {
        let file = write_csv(
            "datetime,open,high,low,close,volume\n\
             2024-01-01T00:00:00+00:00,100,110,90,105,10\n",
        );

        let source = CsvBarSource::open(file.path(), pair(), chrono::Duration::hours(1)).unwrap();
        assert!(source.peek_when().is_some());
    }
}
