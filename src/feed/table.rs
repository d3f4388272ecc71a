use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;

/// First result set of a stats endpoint: a header row plus a row set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatsTable {
    #[serde(default)]
    pub name: String,
    pub headers: Vec<String>,
    #[serde(rename = "rowSet")]
    pub rows: Vec<Vec<Value>>,
}

impl StatsTable {
    /// Extract the first table from a stats response. Most endpoints answer
    /// with `resultSets: [...]`, a few with a single `resultSet: {...}`.
    pub fn from_response(raw: &Value) -> Result<Self, FetchError> {
        let first = match (raw.get("resultSets"), raw.get("resultSet")) {
            (Some(Value::Array(sets)), _) => sets
                .first()
                .ok_or_else(|| FetchError::malformed("empty resultSets"))?,
            (_, Some(set @ Value::Object(_))) => set,
            _ => return Err(FetchError::malformed("response has no resultSets")),
        };
        let table = StatsTable::deserialize(first)?;
        if let Some(bad) = table.rows.iter().find(|r| r.len() != table.headers.len()) {
            return Err(FetchError::malformed(format!(
                "row has {} cells but table {} has {} headers",
                bad.len(),
                table.name,
                table.headers.len()
            )));
        }
        Ok(table)
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Like [`column`](Self::column) but a missing header is a fatal shape error.
    pub fn require_column(&self, header: &str) -> Result<usize, FetchError> {
        self.column(header).ok_or_else(|| {
            FetchError::malformed(format!("table {} has no column {}", self.name, header))
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<TableRow<'_>> {
        self.rows.get(index).map(|cells| TableRow { table: self, cells })
    }

    pub fn first(&self) -> Option<TableRow<'_>> {
        self.row(0)
    }

    pub fn last(&self) -> Option<TableRow<'_>> {
        self.rows.len().checked_sub(1).and_then(|i| self.row(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = TableRow<'_>> {
        self.rows.iter().map(move |cells| TableRow { table: self, cells })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    table: &'a StatsTable,
    cells: &'a [Value],
}

impl<'a> TableRow<'a> {
    pub fn get(&self, header: &str) -> Option<&'a Value> {
        self.table
            .column(header)
            .and_then(|i| self.cells.get(i))
            .filter(|v| !v.is_null())
    }

    /// Cell rendered as text. Numbers are stringified so opaque ids survive
    /// whichever representation the endpoint picked.
    pub fn text(&self, header: &str) -> Option<String> {
        match self.get(header)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn number(&self, header: &str) -> Option<f64> {
        match self.get(header)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn require_text(&self, header: &str) -> Result<String, FetchError> {
        self.table.require_column(header)?;
        self.text(header)
            .ok_or_else(|| FetchError::malformed(format!("empty {} cell", header)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "resource": "commonplayerinfo",
            "resultSets": [{
                "name": "CommonPlayerInfo",
                "headers": ["PERSON_ID", "TEAM_ID", "TEAM_NAME", "HEIGHT", "WEIGHT"],
                "rowSet": [[2544, 1610612747, "Lakers", "6-9", "250"]]
            }, {
                "name": "PlayerHeadlineStats",
                "headers": ["PTS"],
                "rowSet": [[23.7]]
            }]
        })
    }

    #[test]
    fn test_first_result_set_selected() {
        let t = StatsTable::from_response(&sample()).unwrap();
        assert_eq!(t.name, "CommonPlayerInfo");
        assert_eq!(t.len(), 1);
        let row = t.first().unwrap();
        assert_eq!(row.text("TEAM_ID").as_deref(), Some("1610612747"));
        assert_eq!(row.text("TEAM_NAME").as_deref(), Some("Lakers"));
        assert_eq!(row.number("WEIGHT"), Some(250.0));
        assert!(row.get("COUNTRY").is_none());
    }

    #[test]
    fn test_singular_result_set() {
        let raw = json!({
            "resultSet": {"name": "X", "headers": ["A"], "rowSet": [[1], [2]]}
        });
        let t = StatsTable::from_response(&raw).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.last().unwrap().number("A"), Some(2.0));
    }

    #[test]
    fn test_missing_result_sets_is_fatal() {
        let err = StatsTable::from_response(&json!({"message": "oops"})).unwrap_err();
        assert!(!err.is_transient());
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let raw = json!({"resultSets": [{"name": "X", "headers": ["A", "B"], "rowSet": [[1]]}]});
        assert!(StatsTable::from_response(&raw).is_err());
    }

    #[test]
    fn test_missing_headers_is_decode_error() {
        let raw = json!({"resultSets": [{"name": "X", "rowSet": []}]});
        assert!(matches!(
            StatsTable::from_response(&raw),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_null_cell_treated_as_missing() {
        let raw = json!({"resultSets": [{"name": "X", "headers": ["WL"], "rowSet": [[null]]}]});
        let t = StatsTable::from_response(&raw).unwrap();
        assert!(t.first().unwrap().text("WL").is_none());
        assert!(t.first().unwrap().require_text("WL").is_err());
    }
}
