//! Page extraction for the three crawler tiers
//!
//! Each function is pure over a [`Document`]: it reads the page and returns
//! what the tier needs, leaving dispatch and collection updates to the
//! coordinator. Selectors follow the markup of worldcitiesdb.com.

use super::document::Document;
use crate::state::{Country, Region};

/// Container of the country table on the list page
const LIST_CONTAINER: &str = "div.maincontent";
/// Detail links, second column of the country table
const LIST_DETAIL_LINKS: &str = "table tbody tr td:nth-child(2) a";

/// Container of the country facts on a detail page
const DETAIL_CONTAINER: &str = "div.maincontent.alignc";
const DETAIL_CODE: &str = "table tr:nth-child(1) td:nth-child(2)";
const DETAIL_NAME: &str = "table tr:nth-child(3) td:nth-child(2) a";
/// Panel holding the links to city/state listings
const DETAIL_INFO_PANEL: &str = "div.infolink.alignc";
const DETAIL_STATE_LINK: &str = r#"a.minfo[href*="state"]"#;

/// Container of the region table on a region-list page
const REGION_CONTAINER: &str = "#content";
/// Third breadcrumb entry names the owning country
const REGION_BREADCRUMB: &str = "ul li:nth-child(3) a";
const REGION_ROWS: &str = "table tbody tr";
const REGION_ID: &str = "td:nth-child(2)";
const REGION_NAME: &str = "td:nth-child(3) a";

/// Apostrophe as it appears in scraped text
const RAW_APOSTROPHE: char = '\'';
/// Apostrophe stored in names
const TYPOGRAPHIC_APOSTROPHE: &str = "’";

/// Replaces every ASCII apostrophe with the typographic one
///
/// # Example
///
/// ```
/// use geo_harvest::crawler::normalize_name;
///
/// assert_eq!(normalize_name("Côte d'Ivoire"), "Côte d’Ivoire");
/// ```
pub fn normalize_name(raw: &str) -> String {
    raw.replace(RAW_APOSTROPHE, TYPOGRAPHIC_APOSTROPHE)
}

/// Removes all whitespace from an identifier
///
/// # Example
///
/// ```
/// use geo_harvest::crawler::strip_whitespace;
///
/// assert_eq!(strip_whitespace(" FR "), "FR");
/// ```
pub fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Region rows of one region-list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionBatch {
    /// Owning country's display name, from the breadcrumb
    pub country_name: String,

    /// Regions in row order, empty-name rows removed
    pub regions: Vec<Region>,
}

/// What a detail page yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    /// The country, if the page has the facts table container
    pub country: Option<Country>,

    /// Raw `href` of the state listing link, if present
    pub region_link: Option<String>,
}

/// Extracts the raw `href` of every country detail link on the list page
///
/// Anchors without an `href` are skipped. Order follows the document.
pub fn extract_detail_links(doc: &Document) -> Vec<String> {
    doc.find_all(LIST_CONTAINER)
        .iter()
        .flat_map(|container| container.find_all(LIST_DETAIL_LINKS))
        .filter_map(|anchor| anchor.attr("href"))
        .collect()
}

/// Extracts the country facts and region link from a detail page
pub fn extract_detail(doc: &Document) -> DetailPage {
    let country = doc.find_first(DETAIL_CONTAINER).map(|container| {
        Country::new(
            strip_whitespace(&container.text(DETAIL_CODE)),
            normalize_name(&container.text(DETAIL_NAME)),
        )
    });

    let region_link = doc
        .find_first(DETAIL_INFO_PANEL)
        .and_then(|panel| panel.child_attr(DETAIL_STATE_LINK, "href"));

    DetailPage {
        country,
        region_link,
    }
}

/// Extracts the breadcrumb country name and region rows of a region page
///
/// A page without the content container yields an empty batch.
pub fn extract_regions(doc: &Document) -> RegionBatch {
    let Some(content) = doc.find_first(REGION_CONTAINER) else {
        return RegionBatch {
            country_name: String::new(),
            regions: Vec::new(),
        };
    };

    let country_name = normalize_name(&content.text(REGION_BREADCRUMB));

    let regions = content
        .find_all(REGION_ROWS)
        .iter()
        .map(|row| {
            Region::new(
                strip_whitespace(&row.text(REGION_ID)),
                normalize_name(&row.text(REGION_NAME)),
            )
        })
        .filter(|region| !region.name.is_empty())
        .collect();

    RegionBatch {
        country_name,
        regions,
    }
}
