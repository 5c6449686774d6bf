use std::path::PathBuf;

use anyhow::{Context, Result};
use icemass::export::save_series;
use icemass::{
    process, BasinGroup, BasinId, BasinTaxonomy, Collection, IceSheet, ProcessConfig, RawRecord, Samples,
};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// "True" rate in Gt/yr at time `t`: a trend that accelerates after 2005.
fn true_rate(sheet: IceSheet, t: f64) -> f64 {
    let (base, accel) = match sheet {
        IceSheet::Apis => (-20.0, -1.0),
        IceSheet::Eais => (5.0, 0.5),
        IceSheet::Wais => (-60.0, -6.0),
        _ => (-200.0, -15.0),
    };
    base + accel * (t - 2005.0).max(0.0)
}

fn record(user: &str, group: &str, scheme: BasinGroup, basin: BasinId, samples: Samples) -> RawRecord {
    RawRecord {
        user: Some(user.to_string()),
        user_group: Some(group.to_string()),
        data_group: None,
        basin_group: scheme,
        basin_id: basin,
        basin_area: None,
        samples,
    }
}

/// Monthly point rates, as an altimetry contributor would report them.
fn monthly_rates(rng: &mut SimpleRng, sheet: IceSheet, share: f64, noise: f64) -> Samples {
    let t: Vec<f64> = (0..96).map(|i| 2003.0 + i as f64 / 12.0).collect();
    let rate = t.iter().map(|&t| share * true_rate(sheet, t) + rng.gauss(0.0, noise)).collect();
    Samples::Rate {
        t0: t.clone(),
        t1: t.clone(),
        rate,
        error: vec![noise; t.len()],
        area: None,
    }
}

/// Annual interval rates, as a mass-budget contributor would report them.
fn annual_rates(rng: &mut SimpleRng, sheet: IceSheet, noise: f64) -> Samples {
    let t0: Vec<f64> = (0..8).map(|i| 2003.0 + i as f64).collect();
    let t1: Vec<f64> = t0.iter().map(|t| t + 1.0).collect();
    let rate = t0.iter().map(|&t| true_rate(sheet, t + 0.5) + rng.gauss(0.0, noise)).collect();
    Samples::Rate {
        t0,
        t1,
        rate,
        error: vec![noise; 8],
        area: None,
    }
}

/// Monthly cumulative mass, as a gravimetry contributor would report it.
fn monthly_mass(rng: &mut SimpleRng, sheet: IceSheet, noise: f64) -> Samples {
    let t: Vec<f64> = (0..96).map(|i| 2003.0 + i as f64 / 12.0).collect();
    let mut mass = Vec::with_capacity(t.len());
    let mut acc = 0.0;
    for &ti in &t {
        acc += true_rate(sheet, ti) / 12.0;
        mass.push(acc + rng.gauss(0.0, noise));
    }
    Samples::Mass {
        error: vec![noise; t.len()],
        t,
        mass,
        area: None,
    }
}

fn sample_records(taxonomy: &BasinTaxonomy) -> Vec<RawRecord> {
    let mut rng = SimpleRng::new(42);
    let mut records = Vec::new();

    // RA: APIS only as Zwally sub-basins, the other sheets in both schemes
    let apis_basins = taxonomy.basins(BasinGroup::Zwally, IceSheet::Apis);
    let share = 1.0 / apis_basins.len() as f64;
    for code in apis_basins {
        let samples = monthly_rates(&mut rng, IceSheet::Apis, share, 2.0);
        records.push(record("Alpha", "RA", BasinGroup::Zwally, BasinId::basin(code.as_str()), samples));
    }
    for sheet in [IceSheet::Eais, IceSheet::Wais, IceSheet::Gris] {
        for scheme in BasinGroup::SOURCES {
            let samples = monthly_rates(&mut rng, sheet, 1.0, 10.0);
            records.push(record("Alpha", "RA", scheme, sheet.into(), samples));
        }
    }

    for sheet in IceSheet::SHEETS {
        let samples = annual_rates(&mut rng, sheet, 15.0);
        records.push(record("Bravo", "RA", BasinGroup::Zwally, sheet.into(), samples));

        let samples = monthly_mass(&mut rng, sheet, 8.0);
        records.push(record("Charlie", "GMB", BasinGroup::Rignot, sheet.into(), samples));

        let samples = annual_rates(&mut rng, sheet, 25.0);
        records.push(record("Delta", "IOM", BasinGroup::Rignot, sheet.into(), samples));
    }
    records
}

fn main() -> Result<()> {
    env_logger::init();

    let config = ProcessConfig {
        align_date: Some(2003.0),
        ..ProcessConfig::default()
    };
    let records = sample_records(&config.taxonomy);
    let n_records = records.len();
    let input = Collection::from_records(records, &config.taxonomy).context("building input collection")?;

    let output = process(&input, &config).context("processing sample data")?;

    for series in output.regions_mass.iter() {
        let path = PathBuf::from(format!("sample_{}_mass.csv", series.info().basin_id));
        save_series(&path, series)?;
        println!(
            "{:>5}: {:>8.1} ± {:>5.1} Gt/yr over {:.2}–{:.2} → {}",
            series.info().basin_id,
            output
                .regions_rate
                .iter()
                .find(|r| r.info().basin_id == series.info().basin_id)
                .map_or(f64::NAN, |r| r.mean()),
            series.sigma(),
            series.min_time().unwrap_or(f64::NAN),
            series.max_time().unwrap_or(f64::NAN),
            path.display()
        );
    }
    println!("Processed {n_records} contributions into {} regional series", output.regions_mass.len());
    Ok(())
}
