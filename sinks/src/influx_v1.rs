//! InfluxDB 1.x endpoint

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use tsload_core::SinkError;

use crate::http::HttpClient;
use crate::line_sink::LineEndpoint;
use crate::settings::SinkSettings;

/// Line-protocol endpoint speaking the 1.x `/write` and `/query` API
#[derive(Debug, Clone)]
pub struct InfluxV1Endpoint {
    http: HttpClient,
    database: String,
}

impl InfluxV1Endpoint {
    /// Create the endpoint; does not touch the network
    pub fn new(settings: &SinkSettings) -> Result<Self, SinkError> {
        Ok(Self {
            http: HttpClient::new(settings.base_url(), settings.timeout())?,
            database: settings.database.clone(),
        })
    }

    /// Check that the server is reachable
    pub async fn ping(&self) -> Result<(), SinkError> {
        self.http.ping().await
    }

    /// Query string pairs of a write request
    pub fn write_params(&self) -> [(&'static str, &str); 2] {
        [("db", self.database.as_str()), ("precision", "ns")]
    }

    /// InfluxQL statement counting the points of `measurement`
    pub fn count_query(measurement: &str) -> String {
        format!("SELECT count(*) FROM {}", quote_identifier(measurement))
    }
}

#[async_trait]
impl LineEndpoint for InfluxV1Endpoint {
    fn name(&self) -> &'static str {
        "influx-v1"
    }

    async fn write_lines(&self, body: String) -> Result<(), SinkError> {
        let request = self.http.post("/write").query(&self.write_params()).body(body);
        self.http.send(request).await.map(|_| ())
    }

    async fn count(&self, measurement: &str) -> Result<u64, SinkError> {
        let query = Self::count_query(measurement);
        let request = self
            .http
            .get("/query")
            .query(&[("db", self.database.as_str()), ("q", query.as_str())]);
        let response = self.http.send(request).await?;
        let body = self.http.text(response).await?;
        parse_count(&body)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Extract the point count from a `SELECT count(*)` JSON response
///
/// `count(*)` yields one `count_<field>` column per field; the largest one
/// is the number of points. A response without series means no points.
pub fn parse_count(body: &str) -> Result<u64, SinkError> {
    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| SinkError::InvalidResponse(format!("malformed query response: {}", e)))?;

    if let Some(error) = response.error {
        return Err(SinkError::InvalidResponse(error));
    }

    let Some(statement) = response.results.into_iter().next() else {
        return Ok(0);
    };
    if let Some(error) = statement.error {
        return Err(SinkError::InvalidResponse(error));
    }

    let Some(series) = statement.series.into_iter().next() else {
        return Ok(0);
    };
    let Some(row) = series.values.into_iter().next() else {
        return Ok(0);
    };

    let mut count = 0;
    for (column, value) in series.columns.iter().zip(row.iter()) {
        if !column.starts_with("count") {
            continue;
        }
        let value = value
            .as_u64()
            .or_else(|| value.as_f64().map(|v| v as u64))
            .ok_or_else(|| {
                SinkError::InvalidResponse(format!("non-numeric count in column {}", column))
            })?;
        count = count.max(value);
    }

    Ok(count)
}
