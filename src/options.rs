//! # Query Option Parser
//!
//! Parses the list query string (`limit`, `offset`, repeated `sort`) into
//! [`QueryOptions`]. Parsing never fails: malformed values fall back to
//! their defaults and the query function decides what a zero limit means.

use std::fmt;

use serde::Serialize;

/// Sort direction of an order clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Order by clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    /// Parse a sort token of the form `[+|-]column`.
    ///
    /// A leading space counts as `+`, since `+` decodes to a space in query
    /// strings.
    pub fn parse(token: &str) -> Option<Self> {
        let (column, direction) = match token.chars().next()? {
            '-' => (&token[1..], Direction::Desc),
            '+' | ' ' => (&token[1..], Direction::Asc),
            _ => (token, Direction::Asc),
        };
        let column = column.trim();
        if column.is_empty() {
            return None;
        }
        Some(Self {
            column: column.to_string(),
            direction,
        })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction.as_str())
    }
}

/// Parsed list parameters. Derived once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryOptions {
    /// Number of records to return; 0 means "use the default"
    pub limit: usize,

    /// Number of records to skip
    pub offset: usize,

    /// Order by clauses, in request order
    pub order_by: Vec<OrderBy>,
}

impl QueryOptions {
    /// Parse from decoded `(key, value)` pairs.
    ///
    /// The first `limit` and `offset` win; every `sort` counts.
    pub fn parse<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut limit = None;
        let mut offset = None;
        let mut order_by = Vec::new();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "limit" if limit.is_none() => limit = Some(parse_count(value)),
                "offset" if offset.is_none() => offset = Some(parse_count(value)),
                "sort" => order_by.extend(OrderBy::parse(value)),
                _ => {}
            }
        }

        Self {
            limit: limit.unwrap_or(0),
            offset: offset.unwrap_or(0),
            order_by,
        }
    }

    /// Parse a raw (still percent-encoded) query string
    pub fn from_query(query: &str) -> Self {
        Self::parse(url::form_urlencoded::parse(query.as_bytes()))
    }

    /// Limit after applying a default and a ceiling: 0 or anything above
    /// `max` becomes `default`.
    pub fn effective_limit(&self, default: usize, max: usize) -> usize {
        if self.limit == 0 || self.limit > max {
            default
        } else {
            self.limit
        }
    }

    /// Order clauses as `"column DIRECTION"` strings.
    ///
    /// Column names are copied verbatim from the query string. Check them
    /// against the known columns before putting them into SQL, or use
    /// [`QueryOptions::order_clause_in`].
    pub fn order_clauses(&self) -> Vec<String> {
        self.order_by.iter().map(ToString::to_string).collect()
    }

    /// Comma-joined order clause, or `fallback` when no sort was requested.
    ///
    /// Columns are not checked; see [`QueryOptions::order_clauses`].
    pub fn order_clause_or(&self, fallback: &str) -> String {
        if self.order_by.is_empty() {
            fallback.to_string()
        } else {
            self.order_clauses().join(", ")
        }
    }

    /// Comma-joined order clause over the columns in `allowed` only.
    ///
    /// Sort keys naming any other column are dropped. Returns `fallback`
    /// when nothing is left.
    pub fn order_clause_in(&self, allowed: &[&str], fallback: &str) -> String {
        let clauses: Vec<String> = self
            .order_by
            .iter()
            .filter(|order| allowed.contains(&order.column.as_str()))
            .map(ToString::to_string)
            .collect();
        if clauses.is_empty() {
            fallback.to_string()
        } else {
            clauses.join(", ")
        }
    }
}

/// Non-negative integer, or 0 for anything else
fn parse_count(value: &str) -> usize {
    match value.trim().parse::<i64>() {
        Ok(n) if n > 0 => usize::try_from(n).unwrap_or(0),
        _ => 0,
    }
}
