// CSV encoding of snapshot tables
use crate::application::snapshot_codec::SnapshotCodec;
use crate::domain::error::{Result, TelemetryError};
use crate::domain::record::SeriesRecord;
use csv::{ReaderBuilder, WriterBuilder};

/// Encode rows with a header row. An empty table still carries the header.
pub fn encode<R: SeriesRecord>(rows: &[R]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(R::COLUMNS)
        .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| TelemetryError::Encode(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| TelemetryError::Encode(e.to_string()))
}

/// Parse a snapshot body. A missing required column or an unreadable row is
/// a `CorruptSnapshot`.
pub fn decode<R: SeriesRecord>(body: &[u8]) -> Result<Vec<R>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(body);

    let headers = reader
        .headers()
        .map_err(|e| TelemetryError::corrupt(format!("read csv headers: {e}")))?
        .clone();

    if let Some(missing) = R::REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(TelemetryError::corrupt(format!("missing column {missing}")));
    }

    reader
        .deserialize::<R>()
        .enumerate()
        .map(|(i, row)| row.map_err(|e| TelemetryError::corrupt(format!("row {}: {e}", i + 1))))
        .collect()
}

/// `SnapshotCodec` over the functions above
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl<R: SeriesRecord> SnapshotCodec<R> for CsvCodec {
    fn encode(&self, rows: &[R]) -> Result<Vec<u8>> {
        encode(rows)
    }

    fn decode(&self, body: &[u8]) -> Result<Vec<R>> {
        decode(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stock::StockQuote;
    use crate::domain::weather::WeatherReading;
    use chrono::NaiveDate;

    fn at(minute: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_table_has_header() {
        let body = encode::<StockQuote>(&[]).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Company,Ticker,RegularMarketPrice,Time\n"
        );
    }

    #[test]
    fn test_encoded_stock_layout() {
        let body = encode(&[StockQuote::new("The Vita Coco Company", "COCO", 27.5, at(1))]).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Company,Ticker,RegularMarketPrice,Time\nThe Vita Coco Company,COCO,27.5,2024-07-01 10:01:00\n"
        );
    }

    #[test]
    fn test_missing_required_column_is_corrupt() {
        let body = b"Company,Ticker,Time\nDuolingo,DUOL,2024-07-01 10:00:00\n";
        let err = decode::<StockQuote>(body).unwrap_err();
        assert_eq!(err, TelemetryError::corrupt("missing column RegularMarketPrice"));
    }

    #[test]
    fn test_bad_row_is_corrupt() {
        let body = b"Company,Ticker,RegularMarketPrice,Time\nDuolingo,DUOL,abc,2024-07-01 10:00:00\n";
        assert!(matches!(
            decode::<StockQuote>(body),
            Err(TelemetryError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn test_weather_optional_columns_may_be_absent() {
        let body = b"Location,Latitude,Longitude,Time,Temp_F\nELY MN,47.903237,-91.867087,2024-07-01 10:00:00,61.2\n";
        let rows = decode::<WeatherReading>(body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location, "ELY MN");
        assert_eq!(rows[0].humidity, None);
        assert_eq!(rows[0].time, at(0));
    }

    #[test]
    fn test_weather_empty_optional_fields_decode_as_none() {
        let mut reading = WeatherReading::new(
            "Malibu Beach, California, USA",
            crate::domain::weather::Coordinates { latitude: 34.0259, longitude: -118.7798 },
            at(5),
            70.0,
        );
        reading.cloud_cover = Some(20.0);
        let rows = decode::<WeatherReading>(&encode(&[reading.clone()]).unwrap()).unwrap();
        assert_eq!(rows, vec![reading]);
    }
}
