use icemass::export::save_series;
use icemass::{
    process, BasinGroup, BasinId, BasinTaxonomy, Collection, CombineError, IceSheet, ProcessConfig, RawRecord,
    Samples, SeriesFilter,
};

fn months() -> Vec<f64> {
    (0..=12).map(|i| 2003.0 + i as f64 / 12.0).collect()
}

fn record(user: &str, group: &str, scheme: BasinGroup, basin: impl Into<BasinId>, samples: Samples) -> RawRecord {
    RawRecord {
        user: Some(user.to_string()),
        user_group: Some(group.to_string()),
        data_group: None,
        basin_group: scheme,
        basin_id: basin.into(),
        basin_area: Some(1.0),
        samples,
    }
}

/// Altimetry reports a constant -10 Gt/yr as monthly point rates, gravimetry
/// a steady -20 Gt/yr as cumulative mass, for every ice sheet.
fn two_group_input() -> Collection {
    let t = months();
    let mut records = Vec::new();
    for sheet in IceSheet::SHEETS {
        records.push(record(
            "alpha",
            "RA",
            BasinGroup::Zwally,
            sheet,
            Samples::Rate {
                t0: t.clone(),
                t1: t.clone(),
                rate: vec![-10.0; t.len()],
                error: vec![1.0; t.len()],
                area: None,
            },
        ));
        records.push(record(
            "bravo",
            "GMB",
            BasinGroup::Rignot,
            sheet,
            Samples::Mass {
                t: t.clone(),
                mass: t.iter().map(|t| -20.0 * (t - 2003.0)).collect(),
                error: vec![1.0; t.len()],
                area: None,
            },
        ));
    }
    Collection::from_records(records, &BasinTaxonomy::default()).unwrap()
}

fn all_close(values: &[f64], expected: f64) -> bool {
    !values.is_empty() && values.iter().all(|v| (v - expected).abs() < 1e-9)
}

#[test]
fn process_builds_group_and_consensus_estimates() {
    let out = process(&two_group_input(), &ProcessConfig::default()).unwrap();

    assert_eq!(out.rate_data.len(), 8);
    assert_eq!(out.mass_data.len(), 8);
    // IOM is configured but has no contributions
    assert_eq!(out.groups_sheets_rate.len(), 8);
    assert_eq!(out.groups_sheets_mass.len(), 8);
    assert_eq!(out.groups_regions_rate.len(), 12);
    assert_eq!(out.sheets_rate.len(), 4);
    assert_eq!(out.regions_rate.len(), 6);
    assert_eq!(out.regions_mass.len(), 6);

    let gmb_gris = out
        .groups_sheets_rate
        .filter(&SeriesFilter::new().user_group("GMB").basin_id(IceSheet::Gris));
    assert!(all_close(gmb_gris.get(0).unwrap().values(), -20.0));

    for sheet in IceSheet::SHEETS {
        let s = out.sheets_rate.filter(&SeriesFilter::new().basin_id(sheet));
        let s = s.get(0).unwrap();
        assert_eq!(s.len(), 13);
        assert!(all_close(s.values(), -15.0));
        assert_eq!(s.info().user_group, None);
    }

    let ais = out.regions_rate.filter(&SeriesFilter::new().basin_id(IceSheet::Ais));
    let ais = ais.get(0).unwrap();
    assert!(all_close(ais.values(), -45.0));
    assert_eq!(ais.info().basin_group, BasinGroup::Sheets);
    assert_eq!(ais.info().basin_area, Some(3.0));

    let all = out.regions_mass.filter(&SeriesFilter::new().basin_id(IceSheet::All));
    let all = all.get(0).unwrap();
    assert!(all.info().computed);
    assert!((all.values()[0] + 5.0).abs() < 1e-9);
    assert!((all.values()[12] + 65.0).abs() < 1e-9);
}

#[test]
fn skipped_methods_leave_the_consensus() {
    let config = ProcessConfig {
        methods_skip: vec!["GMB".to_string()],
        align_date: Some(2003.5),
        ..ProcessConfig::default()
    };
    let out = process(&two_group_input(), &config).unwrap();

    assert_eq!(out.groups_sheets_rate.len(), 4);
    let wais = out.sheets_rate.filter(&SeriesFilter::new().basin_id(IceSheet::Wais));
    assert!(all_close(wais.get(0).unwrap().values(), -10.0));

    // aligned mass crosses zero at the reference date
    let wais_mass = out.sheets_mass.filter(&SeriesFilter::new().basin_id(IceSheet::Wais));
    let m = wais_mass.get(0).unwrap();
    assert!(m.values()[6].abs() < 1e-9);
}

#[test]
fn sub_basin_contributors_reach_the_ice_sheet_average() {
    let t = months();
    let mut records = Vec::new();
    for code in ["24", "25", "26", "27"] {
        records.push(record(
            "charlie",
            "RA",
            BasinGroup::Zwally,
            BasinId::basin(code),
            Samples::Rate {
                t0: t.clone(),
                t1: t.clone(),
                rate: vec![-2.0; t.len()],
                error: vec![0.5; t.len()],
                area: None,
            },
        ));
    }
    let input = Collection::from_records(records, &BasinTaxonomy::default()).unwrap();
    let out = process(&input, &ProcessConfig::default()).unwrap();

    let apis = out.rate_data.filter(&SeriesFilter::new().basin_id(IceSheet::Apis));
    let apis = apis.get(0).unwrap();
    assert!(apis.info().aggregated);
    assert!(all_close(apis.values(), -8.0));
    assert!(all_close(apis.errors(), 1.0));

    // only APIS is covered, so only the APIS region can be reported
    assert_eq!(out.sheets_rate.len(), 1);
    assert_eq!(out.regions_rate.len(), 1);
    assert_eq!(out.regions_rate.get(0).unwrap().info().basin_id, BasinId::from(IceSheet::Apis));
}

#[test]
fn inconsistent_input_aborts_the_run() {
    let t = months();
    let rate = Samples::Rate {
        t0: t.clone(),
        t1: t.clone(),
        rate: vec![1.0; t.len()],
        error: vec![1.0; t.len()],
        area: None,
    };

    // a Rignot basin code reported under the Zwally scheme
    let bad = record("alpha", "RA", BasinGroup::Zwally, BasinId::basin("NW"), rate.clone());
    let mut input = Collection::new();
    input.add_series(bad.into_series().unwrap());
    assert!(matches!(
        process(&input, &ProcessConfig::default()),
        Err(CombineError::UnknownBasin { .. })
    ));

    let twice = Collection::from_records(
        vec![
            record("alpha", "RA", BasinGroup::Zwally, IceSheet::Gris, rate.clone()),
            record("alpha", "RA", BasinGroup::Zwally, IceSheet::Gris, rate),
        ],
        &BasinTaxonomy::default(),
    )
    .unwrap();
    assert!(matches!(
        process(&twice, &ProcessConfig::default()),
        Err(CombineError::DuplicateSeries { .. })
    ));
}

#[test]
fn regional_mass_is_saved_as_csv() {
    let out = process(&two_group_input(), &ProcessConfig::default()).unwrap();
    let ais = out.regions_mass.filter(&SeriesFilter::new().basin_id(IceSheet::Ais));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ais_mass.csv");
    save_series(&path, ais.get(0).unwrap()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let rows: Vec<Vec<f64>> = text
        .lines()
        .map(|l| l.split(',').map(|f| f.parse().unwrap()).collect())
        .collect();
    assert_eq!(rows.len(), 13);
    assert!(rows.iter().all(|r| r.len() == 3));
    assert!(rows.windows(2).all(|w| w[0][0] < w[1][0]));
    assert!((rows[0][1] + 45.0 / 12.0).abs() < 1e-9);
}

#[test]
fn save_series_reports_the_path() {
    let out = process(&two_group_input(), &ProcessConfig::default()).unwrap();
    let series = out.regions_mass.get(0).unwrap();
    let err = save_series(std::path::Path::new("/nonexistent/dir/x.csv"), series).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/dir/x.csv"));
}
