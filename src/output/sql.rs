//! MySQL export of harvested countries and regions
//!
//! Produces two scripts, one per table:
//! - `countries(id, code, name)`, ids 1-based by position
//! - `regions(id, region_id, country_id, name)`, ids 1-based in emission
//!   order across all countries

use crate::state::Country;
use chrono::{DateTime, Utc};

/// Provenance written at the top of each script
#[derive(Debug, Clone)]
pub struct ExportHeader {
    pub generated_at: DateTime<Utc>,
    pub config_hash: String,
}

impl ExportHeader {
    pub fn now(config_hash: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            config_hash: config_hash.into(),
        }
    }

    fn render(&self, table: &str) -> String {
        format!(
            "-- {} table generated by geo-harvest at {}\n-- config: {}\n\n",
            table,
            self.generated_at.to_rfc3339(),
            self.config_hash
        )
    }
}

const COUNTRIES_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS `countries` (
  `id` INT UNSIGNED NOT NULL,
  `code` VARCHAR(8) NOT NULL,
  `name` VARCHAR(255) NOT NULL,
  PRIMARY KEY (`id`)
) DEFAULT CHARSET=utf8mb4;
";

const REGIONS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS `regions` (
  `id` INT UNSIGNED NOT NULL,
  `region_id` VARCHAR(16) NOT NULL,
  `country_id` INT UNSIGNED NOT NULL,
  `name` VARCHAR(255) NOT NULL,
  PRIMARY KEY (`id`),
  KEY `country_id` (`country_id`)
) DEFAULT CHARSET=utf8mb4;
";

/// Quotes a value as a MySQL string literal
///
/// # Example
///
/// ```
/// use geo_harvest::output::quote_sql;
///
/// assert_eq!(quote_sql("Cote d'Ivoire"), "'Cote d''Ivoire'");
/// ```
pub fn quote_sql(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

/// Writes one multi-row INSERT, or nothing when there are no rows
fn push_insert(sql: &mut String, table: &str, columns: &str, rows: &[String]) {
    if rows.is_empty() {
        return;
    }
    sql.push('\n');
    sql.push_str(&format!("INSERT INTO `{}` ({}) VALUES\n", table, columns));
    sql.push_str(&rows.join(",\n"));
    sql.push_str(";\n");
}

/// Renders the countries script
pub fn render_countries_sql(countries: &[Country], header: &ExportHeader) -> String {
    let mut sql = header.render("countries");
    sql.push_str(COUNTRIES_SCHEMA);

    let rows: Vec<String> = countries
        .iter()
        .enumerate()
        .map(|(i, country)| {
            format!(
                "({}, {}, {})",
                i + 1,
                quote_sql(&country.code),
                quote_sql(&country.name)
            )
        })
        .collect();

    push_insert(&mut sql, "countries", "`id`, `code`, `name`", &rows);
    sql
}

/// Renders the regions script
///
/// `country_id` refers to the country's position in `countries`. Regions
/// with an empty name take no id.
pub fn render_regions_sql(countries: &[Country], header: &ExportHeader) -> String {
    let mut sql = header.render("regions");
    sql.push_str(REGIONS_SCHEMA);

    let rows: Vec<String> = countries
        .iter()
        .enumerate()
        .flat_map(|(i, country)| {
            country
                .regions
                .iter()
                .filter(|region| !region.name.is_empty())
                .map(move |region| (i + 1, region))
        })
        .enumerate()
        .map(|(n, (country_id, region))| {
            format!(
                "({}, {}, {}, {})",
                n + 1,
                quote_sql(&region.id),
                country_id,
                quote_sql(&region.name)
            )
        })
        .collect();

    push_insert(
        &mut sql,
        "regions",
        "`id`, `region_id`, `country_id`, `name`",
        &rows,
    );
    sql
}
