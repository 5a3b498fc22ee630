//! Integration tests for the crawler
//!
//! The first tests use wiremock to serve a small fixture site and run the
//! full harvest over HTTP. The rest run against an in-process fetcher that
//! can delay pages and count concurrent visits per tier.

use async_trait::async_trait;
use geo_harvest::config::{validate, Config, OutputConfig, SiteConfig, TierConfig, TiersConfig};
use geo_harvest::crawler::{Coordinator, FetchError, Fetcher, Page};
use geo_harvest::{Country, Region, Tier};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn unpaced_tiers() -> TiersConfig {
    TiersConfig {
        list: TierConfig::unpaced(1),
        detail: TierConfig::unpaced(5),
        region: TierConfig::unpaced(5),
    }
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str) -> Config {
    // The mock server listens on a random port, which is part of the origin.
    let parsed = Url::parse(base_url).expect("Failed to parse base URL");
    let host = format!(
        "{}:{}",
        parsed.host_str().expect("Failed to extract host"),
        parsed.port().expect("Mock server URI has no port")
    );

    Config {
        site: SiteConfig {
            root_url: format!("{}/country/list", base_url),
            allowed_host: host,
        },
        tiers: unpaced_tiers(),
        output: OutputConfig {
            directory: "./test-out".to_string(),
        },
        ..Config::default()
    }
}

fn list_page(links: &[(&str, &str)]) -> String {
    let rows: String = links
        .iter()
        .enumerate()
        .map(|(i, (href, label))| {
            format!(
                r#"<tr><td>{}</td><td><a href="{}">{}</a></td><td>flag</td></tr>"#,
                i + 1,
                href,
                label
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="maincontent"><h1>Countries</h1>
        <table><thead><tr><th>#</th><th>Country</th></tr></thead>
        <tbody>{}</tbody></table></div></body></html>"#,
        rows
    )
}

fn detail_page(code: &str, name: &str, state_href: Option<&str>) -> String {
    let info = match state_href {
        Some(href) => format!(
            r#"<div class="infolink alignc">
            <a class="minfo" href="/city/list/{code}">Cities</a>
            <a class="minfo" href="{href}">States</a></div>"#
        ),
        None => r#"<div class="infolink alignc"><a class="minfo" href="/city/list/x">Cities</a></div>"#
            .to_string(),
    };
    format!(
        r#"<html><body><div class="maincontent alignc"><table>
        <tr><td>Code</td><td> {code} </td></tr>
        <tr><td>Capital</td><td>Somewhere</td></tr>
        <tr><td>Name</td><td><a href="/country/{code}">{name}</a></td></tr>
        </table></div>{info}</body></html>"#
    )
}

fn region_page(country_name: &str, rows: &[(&str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .enumerate()
        .map(|(i, (id, name))| {
            format!(
                r#"<tr><td>{}</td><td> {} </td><td><a href="/r">{}</a></td></tr>"#,
                i + 1,
                id,
                name
            )
        })
        .collect();
    format!(
        r#"<html><body><div id="content">
        <ul class="crumbs"><li><a href="/">Home</a></li><li><a href="/country/list">Countries</a></li>
        <li><a href="/country/x">{}</a></li></ul>
        <table><tbody>{}</tbody></table></div></body></html>"#,
        country_name, rows
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_two_countries() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    mount_html(
        &mock_server,
        "/country/list",
        list_page(&[("/country/A", "Alpha"), ("/country/B", "Beta")]),
    )
    .await;
    mount_html(
        &mock_server,
        "/country/A",
        detail_page("A", "Alpha", Some("/state/list/A")),
    )
    .await;
    mount_html(&mock_server, "/country/B", detail_page("B", "Beta", None)).await;
    mount_html(
        &mock_server,
        "/state/list/A",
        region_page("Alpha", &[("A1", "North"), ("A2", "South"), ("A3", "")]),
    )
    .await;

    let root = Url::parse(&config.site.root_url).unwrap();
    let coordinator = Coordinator::new(&config).expect("Failed to create coordinator");
    let (countries, stats) = coordinator.run_with_stats(&root).await;

    assert_eq!(
        countries,
        vec![
            Country::new("A", "Alpha").with_regions(vec![
                Region::new("A1", "North"),
                Region::new("A2", "South"),
            ]),
            Country::new("B", "Beta"),
        ]
    );
    assert_eq!(stats.tier(Tier::List).completed, 1);
    assert_eq!(stats.tier(Tier::Detail).completed, 2);
    assert_eq!(stats.tier(Tier::Region).completed, 1);
    assert_eq!(stats.region_batches_attached, 1);
    assert_eq!(stats.total_failures(), 0);
}

#[tokio::test]
async fn test_harvest_survives_server_errors() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    mount_html(
        &mock_server,
        "/country/list",
        list_page(&[("/country/A", "Alpha"), ("/country/B", "Beta")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/country/A"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;
    mount_html(
        &mock_server,
        "/country/B",
        detail_page("B", "Beta", Some("/state/list/B")),
    )
    .await;
    // No mock for the region page: wiremock answers 404.

    let root = Url::parse(&config.site.root_url).unwrap();
    let coordinator = Coordinator::new(&config).unwrap();
    let (countries, stats) = coordinator.run_with_stats(&root).await;

    assert_eq!(countries, vec![Country::new("B", "Beta")]);
    assert_eq!(stats.tier(Tier::Detail).failed, 1);
    assert_eq!(stats.tier(Tier::Region).failed, 1);
}

#[tokio::test]
async fn test_off_host_redirect_is_not_followed() {
    let mock_server = MockServer::start().await;
    let foreign_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());
    validate(&config).expect("fixture config should be valid");

    mount_html(
        &mock_server,
        "/country/list",
        list_page(&[("/country/A", "Alpha"), ("/country/B", "Beta")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/country/A"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/evil", foreign_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/country/B", detail_page("B", "Beta", None)).await;
    mount_html(&foreign_server, "/evil", detail_page("EV", "Evil", None)).await;

    let root = Url::parse(&config.site.root_url).unwrap();
    let (countries, stats) = Coordinator::new(&config)
        .unwrap()
        .run_with_stats(&root)
        .await;

    assert_eq!(countries, vec![Country::new("B", "Beta")]);
    assert_eq!(stats.tier(Tier::Detail).failed, 1);

    let foreign_hits = foreign_server.received_requests().await.unwrap();
    assert!(foreign_hits.is_empty(), "followed a redirect off the allowed host");
}

#[tokio::test]
async fn test_same_host_redirect_is_followed() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri());

    mount_html(
        &mock_server,
        "/country/list",
        list_page(&[("/country/OLD", "Alpha")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/country/OLD"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/country/A"))
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/country/A", detail_page("A", "Alpha", None)).await;

    let root = Url::parse(&config.site.root_url).unwrap();
    let countries = Coordinator::new(&config).unwrap().run(&root).await;

    assert_eq!(countries, vec![Country::new("A", "Alpha")]);
}

/// Fixture fetcher serving pages from memory
///
/// Pages are keyed by path. Each fetch sleeps for the page's delay and
/// tracks how many visits of the same tier overlap.
#[derive(Default)]
struct FixtureFetcher {
    pages: HashMap<String, (String, Duration)>,
    in_flight: [AtomicUsize; 3],
    max_in_flight: [AtomicUsize; 3],
}

impl FixtureFetcher {
    fn page(mut self, route: &str, body: String) -> Self {
        self.pages.insert(route.to_string(), (body, Duration::ZERO));
        self
    }

    fn slow_page(mut self, route: &str, body: String, delay: Duration) -> Self {
        self.pages.insert(route.to_string(), (body, delay));
        self
    }

    fn slot(route: &str) -> usize {
        if route.starts_with("/country/list") {
            0
        } else if route.starts_with("/country/") {
            1
        } else {
            2
        }
    }

    fn max_in_flight(&self, tier: Tier) -> usize {
        let slot = match tier {
            Tier::List => 0,
            Tier::Detail => 1,
            Tier::Region => 2,
        };
        self.max_in_flight[slot].load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        let slot = Self::slot(url.path());
        let now = self.in_flight[slot].fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight[slot].fetch_max(now, Ordering::SeqCst);

        let result = match self.pages.get(url.path()) {
            Some((body, delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(Page {
                    url: url.clone(),
                    status_code: 200,
                    body: body.clone(),
                })
            }
            None => Err(FetchError::Status {
                url: url.to_string(),
                status_code: 404,
                snapshot: "Not Found".to_string(),
            }),
        };

        self.in_flight[slot].fetch_sub(1, Ordering::SeqCst);
        result
    }
}

const HOST: &str = "www.worldcitiesdb.com";

fn root() -> Url {
    Url::parse("http://www.worldcitiesdb.com/country/list").unwrap()
}

/// Builds a site of `count` countries, each with one region page
fn fixture_site(count: usize, detail_delay: impl Fn(usize) -> Duration) -> FixtureFetcher {
    let codes: Vec<String> = (0..count).map(|i| format!("C{:02}", i)).collect();
    let links: Vec<(String, String)> = codes
        .iter()
        .map(|code| (format!("/country/{}", code), format!("Country {}", code)))
        .collect();
    let link_refs: Vec<(&str, &str)> = links
        .iter()
        .map(|(href, label)| (href.as_str(), label.as_str()))
        .collect();

    let mut fetcher = FixtureFetcher::default().page("/country/list", list_page(&link_refs));
    for (i, code) in codes.iter().enumerate() {
        let name = format!("Country {}", code);
        let state_href = format!("/state/list/{}", code);
        let region_id = format!("{}-1", code);
        fetcher = fetcher
            .slow_page(
                &format!("/country/{}", code),
                detail_page(code, &name, Some(state_href.as_str())),
                detail_delay(i),
            )
            .slow_page(
                &state_href,
                region_page(&name, &[(region_id.as_str(), "Only Region")]),
                Duration::from_millis(20),
            );
    }
    fetcher
}

#[tokio::test]
async fn test_countries_follow_list_order() {
    // Later links answer first, so completion order is the reverse.
    let count = 8;
    let fetcher = fixture_site(count, |i| Duration::from_millis(((count - i) * 15) as u64));
    let coordinator = Coordinator::with_fetcher(Arc::new(fetcher), unpaced_tiers(), HOST);

    let countries = coordinator.run(&root()).await;

    let codes: Vec<&str> = countries.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["C00", "C01", "C02", "C03", "C04", "C05", "C06", "C07"]
    );
    assert!(countries.iter().all(|c| c.regions.len() == 1));
}

#[tokio::test]
async fn test_tier_ceilings_are_respected() {
    let fetcher = Arc::new(fixture_site(15, |_| Duration::from_millis(40)));
    let coordinator = Coordinator::with_fetcher(fetcher.clone(), unpaced_tiers(), HOST);

    let (countries, stats) = coordinator.run_with_stats(&root()).await;

    assert_eq!(countries.len(), 15);
    assert_eq!(stats.tier(Tier::Region).completed, 15);

    assert_eq!(fetcher.max_in_flight(Tier::List), 1);
    let detail = fetcher.max_in_flight(Tier::Detail);
    assert!(detail <= 5, "detail tier ran {} visits at once", detail);
    assert!(detail > 1, "detail tier never ran in parallel");
    assert!(fetcher.max_in_flight(Tier::Region) <= 5);
}

#[tokio::test]
async fn test_narrow_tier_runs_one_at_a_time() {
    let fetcher = Arc::new(fixture_site(6, |_| Duration::from_millis(10)));
    let tiers = TiersConfig {
        list: TierConfig::unpaced(1),
        detail: TierConfig::unpaced(1),
        region: TierConfig::unpaced(2),
    };
    let coordinator = Coordinator::with_fetcher(fetcher.clone(), tiers, HOST);

    let countries = coordinator.run(&root()).await;

    assert_eq!(countries.len(), 6);
    assert_eq!(fetcher.max_in_flight(Tier::Detail), 1);
    assert!(fetcher.max_in_flight(Tier::Region) <= 2);
}

#[tokio::test]
async fn test_run_waits_for_slow_region_pages() {
    let fetcher = FixtureFetcher::default()
        .page("/country/list", list_page(&[("/country/A", "Alpha")]))
        .page(
            "/country/A",
            detail_page("A", "Alpha", Some("/state/list/A")),
        )
        .slow_page(
            "/state/list/A",
            region_page("Alpha", &[("A1", "North")]),
            Duration::from_millis(300),
        );
    let coordinator = Coordinator::with_fetcher(Arc::new(fetcher), unpaced_tiers(), HOST);

    let countries = coordinator.run(&root()).await;

    assert_eq!(
        countries,
        vec![Country::new("A", "Alpha").with_regions(vec![Region::new("A1", "North")])]
    );
}

#[tokio::test]
async fn test_paced_tiers_still_settle() {
    let fetcher = fixture_site(3, |_| Duration::ZERO);
    let tiers = TiersConfig {
        list: TierConfig::new(1, 0, 50),
        detail: TierConfig::new(2, 20, 20),
        region: TierConfig::new(2, 20, 20),
    };
    let coordinator = Coordinator::with_fetcher(Arc::new(fetcher), tiers, HOST);

    let countries = coordinator.run(&root()).await;

    assert_eq!(countries.len(), 3);
    assert!(countries.iter().all(|c| c.regions.len() == 1));
}

#[tokio::test]
async fn test_apostrophes_are_normalized_and_merged() {
    let fetcher = FixtureFetcher::default()
        .page("/country/list", list_page(&[("/country/CI", "Ivory Coast")]))
        .page(
            "/country/CI",
            detail_page("CI", "Cote d'Ivoire", Some("/state/list/CI")),
        )
        .page(
            "/state/list/CI",
            region_page("Cote d'Ivoire", &[("01", "N'Zi"), ("02", "Lagunes")]),
        );
    let coordinator = Coordinator::with_fetcher(Arc::new(fetcher), unpaced_tiers(), HOST);

    let countries = coordinator.run(&root()).await;

    assert_eq!(
        countries,
        vec![Country::new("CI", "Cote d’Ivoire").with_regions(vec![
            Region::new("01", "N’Zi"),
            Region::new("02", "Lagunes"),
        ])]
    );
}

#[tokio::test]
async fn test_country_without_state_link_has_no_regions() {
    let fetcher = FixtureFetcher::default()
        .page("/country/list", list_page(&[("/country/B", "Beta")]))
        .page("/country/B", detail_page("B", "Beta", None));
    let coordinator = Coordinator::with_fetcher(Arc::new(fetcher), unpaced_tiers(), HOST);

    let (countries, stats) = coordinator.run_with_stats(&root()).await;

    assert_eq!(countries, vec![Country::new("B", "Beta")]);
    assert_eq!(stats.tier(Tier::Region).queued, 0);
}
