//! InfluxDB 2.x endpoint

use async_trait::async_trait;

use tsload_core::point::READING_FIELD;
use tsload_core::SinkError;

use crate::http::HttpClient;
use crate::line_sink::LineEndpoint;
use crate::settings::SinkSettings;

/// Line-protocol endpoint speaking the 2.x `/api/v2/write` and Flux query API
#[derive(Debug, Clone)]
pub struct InfluxV2Endpoint {
    http: HttpClient,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxV2Endpoint {
    /// Create the endpoint; does not touch the network
    pub fn new(settings: &SinkSettings) -> Result<Self, SinkError> {
        Ok(Self {
            http: HttpClient::new(settings.base_url(), settings.timeout())?,
            org: settings.org.clone(),
            bucket: settings.bucket.clone(),
            token: settings.token.clone(),
        })
    }

    /// Check that the server is reachable
    pub async fn ping(&self) -> Result<(), SinkError> {
        self.http.ping().await
    }

    /// Query string pairs of a write request
    pub fn write_params(&self) -> [(&'static str, &str); 3] {
        [
            ("org", self.org.as_str()),
            ("bucket", self.bucket.as_str()),
            ("precision", "ns"),
        ]
    }

    /// Flux script counting the points of `measurement`
    ///
    /// Counts the reading field only, so each point is counted once.
    pub fn count_query(&self, measurement: &str) -> String {
        format!(
            "from(bucket: {bucket})\n  \
             |> range(start: 0, stop: now())\n  \
             |> filter(fn: (r) => r._measurement == {measurement} and r._field == {field})\n  \
             |> group()\n  \
             |> count()",
            bucket = flux_string(&self.bucket),
            measurement = flux_string(measurement),
            field = flux_string(READING_FIELD),
        )
    }

    fn authorization(&self) -> String {
        format!("Token {}", self.token)
    }
}

#[async_trait]
impl LineEndpoint for InfluxV2Endpoint {
    fn name(&self) -> &'static str {
        "influx-v2"
    }

    async fn write_lines(&self, body: String) -> Result<(), SinkError> {
        let request = self
            .http
            .post("/api/v2/write")
            .query(&self.write_params())
            .header("Authorization", self.authorization())
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body);
        self.http.send(request).await.map(|_| ())
    }

    async fn count(&self, measurement: &str) -> Result<u64, SinkError> {
        let request = self
            .http
            .post("/api/v2/query")
            .query(&[("org", self.org.as_str())])
            .header("Authorization", self.authorization())
            .header("Content-Type", "application/vnd.flux")
            .header("Accept", "application/csv")
            .body(self.count_query(measurement));
        let response = self.http.send(request).await?;
        let body = self.http.text(response).await?;
        parse_count(&body)
    }
}

fn flux_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Extract the point count from a Flux CSV response
///
/// Annotation rows (`#datatype`, ...) are skipped, each table's header row
/// locates the `_value` column and the values of all data rows are summed.
/// An empty response means no points.
pub fn parse_count(body: &str) -> Result<u64, SinkError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut value_column = None;
    let mut total = 0u64;

    for record in reader.records() {
        let record = record
            .map_err(|e| SinkError::InvalidResponse(format!("malformed CSV response: {}", e)))?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        // Every table starts with its own header row
        if let Some(index) = record.iter().position(|field| field.trim() == "_value") {
            value_column = Some(index);
            continue;
        }

        let index = value_column
            .ok_or_else(|| SinkError::InvalidResponse("CSV response without _value column".into()))?;
        let field = record.get(index).unwrap_or_default().trim();
        let value: u64 = field
            .parse()
            .map_err(|_| SinkError::InvalidResponse(format!("non-numeric count '{}'", field)))?;
        total += value;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> InfluxV2Endpoint {
        InfluxV2Endpoint::new(&SinkSettings::default()).unwrap()
    }

    #[test]
    fn test_write_params() {
        assert_eq!(
            endpoint().write_params(),
            [("org", "my-org"), ("bucket", "my-bucket"), ("precision", "ns")]
        );
        assert_eq!(endpoint().authorization(), "Token my-token");
    }

    #[test]
    fn test_count_query() {
        let query = endpoint().count_query("sensor_1");
        assert!(query.starts_with("from(bucket: \"my-bucket\")"));
        assert!(query.contains("range(start: 0, stop: now())"));
        assert!(query.contains("r._measurement == \"sensor_1\""));
        assert!(query.contains("r._field == \"temperature\""));
        assert!(query.ends_with("|> count()"));
    }

    #[test]
    fn test_count_query_escapes() {
        let query = endpoint().count_query("a\"b");
        assert!(query.contains(r#"r._measurement == "a\"b""#));
    }

    #[test]
    fn test_parse_count_plain_csv() {
        let body = ",result,table,_value\r\n,_result,0,6000\r\n\r\n";
        assert_eq!(parse_count(body).unwrap(), 6000);
    }

    #[test]
    fn test_parse_count_annotated_csv() {
        let body = "#datatype,string,long,long\r\n\
                    #group,false,false,false\r\n\
                    #default,_result,,\r\n\
                    ,result,table,_value\r\n\
                    ,,0,120\r\n\
                    \r\n";
        assert_eq!(parse_count(body).unwrap(), 120);
    }

    #[test]
    fn test_parse_count_multiple_tables() {
        let body = ",result,table,_value\r\n,_result,0,10\r\n\r\n,result,table,_value\r\n,_result,1,5\r\n";
        assert_eq!(parse_count(body).unwrap(), 15);
    }

    #[test]
    fn test_parse_count_empty() {
        assert_eq!(parse_count("").unwrap(), 0);
        assert_eq!(parse_count("\r\n").unwrap(), 0);
    }

    #[test]
    fn test_parse_count_errors() {
        assert!(parse_count(",result,table,_time\r\n,_result,0,x\r\n").is_err());
        assert!(parse_count(",result,table,_value\r\n,_result,0,lots\r\n").is_err());
    }
}
