//! Named analytical queries over the books table.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgConnection, Row, TypeInfo};
use thiserror::Error;
use tracing::info;

pub const CRATE_NAME: &str = "bookscape-reports";

/// One catalog entry: the user-facing name and the statement it runs.
#[derive(Debug, Clone, Copy)]
pub struct Report {
    pub name: &'static str,
    pub sql: &'static str,
}

/// The fixed report catalog. Names are looked up verbatim; the bodies are
/// read-only SELECTs over `books`.
pub const CATALOG: &[Report] = &[
    Report {
        name: "Highest Average Rating Publisher",
        sql: r#"
        SELECT publisher
          FROM books
         WHERE averageRating = 5.00
        "#,
    },
    Report {
        name: "Publisher with Most Books Published",
        sql: r#"
        SELECT publisher, COUNT(book_title) AS total_book_counts
          FROM books
         GROUP BY publisher
         ORDER BY total_book_counts DESC
        "#,
    },
    Report {
        name: "Top 5 Most Expensive Books",
        sql: r#"
        SELECT book_title, amount_retailPrice
          FROM books
         ORDER BY amount_retailPrice DESC
         LIMIT 5
        "#,
    },
    Report {
        // year holds the raw published date, so compare on its leading digits
        name: "Books After 2010 with at Least 500 Pages",
        sql: r#"
        SELECT book_title
          FROM books
         WHERE substring(year FROM '^\d{4}')::int > 2010
           AND pageCount > 500
        "#,
    },
    Report {
        name: "Books with Discounts Greater than 20%",
        sql: r#"
        SELECT book_title,
               ((amount_listPrice - amount_retailPrice) / NULLIF(amount_listPrice, 0)) * 100 AS discount_percentage
          FROM books
         WHERE ((amount_listPrice - amount_retailPrice) / NULLIF(amount_listPrice, 0)) * 100 > 20
        "#,
    },
    Report {
        name: "Average Page Count for eBooks vs Physical Books",
        sql: r#"
        SELECT CASE WHEN isEbook = 1 THEN 'eBook' ELSE 'Physical' END AS book_type,
               AVG(pageCount)::float8 AS average_page_count
          FROM books
         WHERE pageCount IS NOT NULL
         GROUP BY isEbook
        "#,
    },
    Report {
        name: "Availability of eBooks vs Physical Books",
        sql: r#"
        SELECT CASE WHEN isEbook = 1 THEN 'eBook' ELSE 'Physical' END AS book_type,
               COUNT(*) AS book_count
          FROM books
         GROUP BY isEbook
        "#,
    },
    Report {
        name: "Top 3 Authors with Most Books",
        sql: r#"
        SELECT book_authors, COUNT(*) AS book_count
          FROM books
         GROUP BY book_authors
         ORDER BY book_count DESC
         LIMIT 3
        "#,
    },
    Report {
        name: "Publishers with More than 10 Books",
        sql: r#"
        SELECT publisher, COUNT(*) AS book_count
          FROM books
         GROUP BY publisher
        HAVING COUNT(*) > 10
        "#,
    },
    Report {
        name: "Average Page Count for Each Category",
        sql: r#"
        SELECT categories, AVG(pageCount)::float8 AS average_page_count
          FROM books
         GROUP BY categories
        "#,
    },
    Report {
        // author lists are stored comma-joined, so count separators
        name: "Books with More than 3 Authors",
        sql: r#"
        SELECT book_title, book_authors
          FROM books
         WHERE LENGTH(book_authors) - LENGTH(REPLACE(book_authors, ',', '')) + 1 > 3
        "#,
    },
    Report {
        name: "Books with Ratings Count Greater than Average",
        sql: r#"
        SELECT book_title, ratingsCount
          FROM books
         WHERE ratingsCount > (SELECT AVG(ratingsCount) FROM books)
        "#,
    },
    Report {
        name: "Books with the Same Author Published in Same Year",
        sql: r#"
        SELECT book_title, book_authors, year
          FROM books
         WHERE (book_authors, year) IN (
               SELECT book_authors, year
                 FROM books
                GROUP BY book_authors, year
               HAVING COUNT(*) > 1
         )
        "#,
    },
    Report {
        name: "Books with Specific Keyword in Title",
        sql: r#"
        SELECT book_title
          FROM books
         WHERE book_title LIKE '%keyword%'
        "#,
    },
    Report {
        name: "Year with Highest Average Book Price",
        sql: r#"
        SELECT year, AVG(amount_listPrice) AS average_price
          FROM books
         GROUP BY year
         ORDER BY average_price DESC
         LIMIT 1
        "#,
    },
    Report {
        name: "Authors Published 3 Consecutive Years",
        sql: r#"
        SELECT book_authors
          FROM books
         GROUP BY book_authors
        HAVING COUNT(DISTINCT year) = 3
        "#,
    },
    Report {
        name: "Authors with Books Under Different Publishers in Same Year",
        sql: r#"
        SELECT book_authors, year, COUNT(*) AS book_count
          FROM books
         GROUP BY book_authors, year
        HAVING COUNT(DISTINCT publisher) > 1
        "#,
    },
    Report {
        name: "Average Price of eBooks vs Physical Books",
        sql: r#"
        SELECT AVG(CASE WHEN isEbook = 1 THEN amount_retailPrice ELSE NULL END) AS avg_ebook_price,
               AVG(CASE WHEN isEbook = 0 THEN amount_retailPrice ELSE NULL END) AS avg_physical_price
          FROM books
        "#,
    },
    Report {
        name: "To find average rating is more than the standard deviation",
        sql: r#"
        SELECT book_title, averageRating, ratingsCount
          FROM books
         WHERE ABS(averageRating - (SELECT AVG(averageRating) FROM books)) >
               (2 * (SELECT STDDEV(averageRating) FROM books))
        "#,
    },
    Report {
        name: "Identity which publisher have highest average rating",
        sql: r#"
        SELECT publisher, AVG(averageRating) AS average_rating, COUNT(*) AS number_of_books
          FROM books
         GROUP BY publisher
        HAVING COUNT(*) > 10
         ORDER BY average_rating DESC
         LIMIT 1
        "#,
    },
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unknown report: {0}")]
    UnknownReport(String),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|r| r.name)
}

/// Catalog lookup. Fails with its own error kind so callers can tell a bad
/// name apart from a statement that ran and broke.
pub fn find(name: &str) -> Result<&'static Report, ReportError> {
    CATALOG
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| ReportError::UnknownReport(name.to_string()))
}

/// One decoded result cell. Result shapes vary per report, so rows are
/// carried dynamically by column type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(v) => write!(f, "{v}"),
            CellValue::Text(v) => f.write_str(v),
        }
    }
}

/// Materialized result set of one report run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub async fn run(name: &str, conn: &mut PgConnection) -> Result<Table, ReportError> {
    let report = find(name)?;
    execute(report, conn).await
}

/// Runs one catalog entry and materializes the full result set. Read-only;
/// execution errors return to the caller untouched.
pub async fn execute(report: &Report, conn: &mut PgConnection) -> Result<Table, ReportError> {
    let rows = sqlx::query(report.sql).fetch_all(conn).await?;

    let mut table = Table::default();
    if let Some(first) = rows.first() {
        table.columns = first.columns().iter().map(|c| c.name().to_string()).collect();
    }
    for row in &rows {
        let mut cells = Vec::with_capacity(row.columns().len());
        for (idx, column) in row.columns().iter().enumerate() {
            cells.push(decode_cell(row, idx, column.type_info().name())?);
        }
        table.rows.push(cells);
    }
    info!(report = report.name, rows = table.rows.len(), "report executed");
    Ok(table)
}

fn decode_cell(row: &PgRow, idx: usize, type_name: &str) -> Result<CellValue, ReportError> {
    let cell = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(|v| CellValue::Int(v.into())),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(|v| CellValue::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(CellValue::Int),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx)?.map(|v| CellValue::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(CellValue::Float),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(CellValue::Bool),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(idx)?.map(CellValue::Text)
        }
        other => {
            return Err(ReportError::Query(sqlx::Error::Decode(
                format!("unsupported column type {other}").into(),
            )))
        }
    };
    Ok(cell.unwrap_or(CellValue::Null))
}
