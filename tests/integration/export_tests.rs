//! Integration tests for configuration loading and MySQL export

use geo_harvest::config::{load_config_with_hash, Config};
use geo_harvest::output::{write_mysql_export, ExportHeader, COUNTRIES_FILE, REGIONS_FILE};
use geo_harvest::{Country, Region};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn harvested() -> Vec<Country> {
    vec![
        Country::new("CI", "Côte d’Ivoire").with_regions(vec![
            Region::new("01", "N’Zi"),
            Region::new("02", "Lagunes"),
        ]),
        Country::new("GB", "United Kingdom").with_regions(vec![Region::new("ENG", "England")]),
        Country::new("IE", "Ireland"),
    ]
}

#[test]
fn test_export_stamps_config_hash() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[tiers.detail]
parallelism = 3

[output]
directory = "./exports"
"#
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(file.path()).unwrap();
    assert_eq!(config.tiers.detail.parallelism, 3);
    assert_eq!(config.tiers.detail.delay_ms, 333);
    assert_eq!(config.tiers.detail.jitter_ms, 2_000);
    assert_eq!(config.output.directory, "./exports");
    assert_eq!(config.tiers.region, Config::default().tiers.region);

    let out = TempDir::new().unwrap();
    let report = write_mysql_export(&harvested(), out.path(), &ExportHeader::now(hash.clone()));
    assert!(report.is_complete());

    for name in [COUNTRIES_FILE, REGIONS_FILE] {
        let sql = std::fs::read_to_string(out.path().join(name)).unwrap();
        assert!(sql.contains(&format!("-- config: {}", hash)));
    }
}

#[test]
fn test_export_links_regions_to_country_positions() {
    let out = TempDir::new().unwrap();
    let report = write_mysql_export(&harvested(), out.path(), &ExportHeader::now("test"));
    assert_eq!(report.written.len(), 2);

    let countries = std::fs::read_to_string(out.path().join(COUNTRIES_FILE)).unwrap();
    assert!(countries.contains("(1, 'CI', 'Côte d’Ivoire'),"));
    assert!(countries.contains("(3, 'IE', 'Ireland');"));

    let regions = std::fs::read_to_string(out.path().join(REGIONS_FILE)).unwrap();
    assert!(regions.contains("(1, '01', 1, 'N’Zi'),"));
    assert!(regions.contains("(2, '02', 1, 'Lagunes'),"));
    assert!(regions.contains("(3, 'ENG', 2, 'England');"));
}
