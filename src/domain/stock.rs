// Company stock quote domain model
use super::record::{MetricSpec, SeriesRecord, time_format};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "RegularMarketPrice")]
    pub regular_market_price: f64,
    #[serde(rename = "Time", with = "time_format")]
    pub time: NaiveDateTime,
}

impl StockQuote {
    pub fn new(company: &str, ticker: &str, regular_market_price: f64, time: NaiveDateTime) -> Self {
        Self {
            company: company.to_string(),
            ticker: ticker.to_string(),
            regular_market_price,
            time,
        }
    }
}

impl SeriesRecord for StockQuote {
    const COLUMNS: &'static [&'static str] = &["Company", "Ticker", "RegularMarketPrice", "Time"];

    const REQUIRED_COLUMNS: &'static [&'static str] = Self::COLUMNS;

    const METRICS: &'static [MetricSpec] = &[MetricSpec {
        name: "RegularMarketPrice",
        title: "Regular Market Price",
        unit: "USD",
    }];

    fn key(&self) -> &str {
        &self.company
    }

    fn time(&self) -> NaiveDateTime {
        self.time
    }

    fn metric(&self, name: &str) -> Option<f64> {
        (name == "RegularMarketPrice").then_some(self.regular_market_price)
    }

    fn summary_text(&self) -> String {
        format!(
            "{} ({})\n\n• Regular Market Price:  ${:.2}\n• As Of:                 {}\n",
            self.company,
            self.ticker,
            self.regular_market_price,
            self.time.format(super::record::TIME_FORMAT),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_summary_text() {
        let time = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        let quote = StockQuote::new("Duolingo", "DUOL", 181.456, time);
        assert_eq!(
            quote.summary_text(),
            "Duolingo (DUOL)\n\n• Regular Market Price:  $181.46\n• As Of:                 2024-07-01 09:30:05\n"
        );
        assert_eq!(quote.metric("RegularMarketPrice"), Some(181.456));
        assert_eq!(quote.metric("Temp_F"), None);
    }
}
