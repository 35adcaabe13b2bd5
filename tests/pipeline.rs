use std::fs;
use std::path::Path;

use palette::Srgb;
use ppms_pipeline::core::transforms::magnetoresistance;
use ppms_pipeline::core::{load_extracted, write_extracted, write_family_csv};
use ppms_pipeline::processors::extraction::extract_all;
use ppms_pipeline::processors::figures::select_curves;
use ppms_pipeline::{Experiment, ExtractionConfig};
use tempfile::TempDir;

const HEADER: &str = "Time Stamp (sec),Temperature (K),Field (Oe),Resistance Ch1 (Ohms),Resistance Ch2 (Ohms)";

fn write_sweep(path: &Path, temperature: f64, rows: &[(f64, f64)], instrument_header: bool) {
    let mut text = String::new();
    if instrument_header {
        text.push_str("[Header]\nTITLE,synthetic sweep\nBYAPP,ResistivityOption\n[Data]\n");
    }
    text.push_str(HEADER);
    text.push('\n');
    for (i, (b_oe, r)) in rows.iter().enumerate() {
        text.push_str(&format!("{},{},{},{},9.9\n", i, temperature, b_oe, r));
    }
    fs::write(path, text).unwrap();
}

/// R(B) sampled at -2..=2 T in oersted.
fn sweep(r: impl Fn(f64) -> f64) -> Vec<(f64, f64)> {
    [-2.0, -1.0, 0.0, 1.0, 2.0]
        .iter()
        .map(|&b| (b * 10_000.0, r(b)))
        .collect()
}

fn build_sample_tree(base: &Path) {
    let sample = base.join("pris");
    let hall = sample.join("Hall");
    let para = sample.join("Para");
    fs::create_dir_all(&hall).unwrap();
    fs::create_dir_all(&para).unwrap();

    fs::write(sample.join("dimension.csv"), "T,W,L\n2e-7,1e-3,4e-3\n").unwrap();

    write_sweep(&hall.join("hall_2K.csv"), 2.1, &sweep(|b| 5.0 + 0.1 * b), false);

    // 4.5 K rounds half to even, landing below the 2 K file in name order.
    write_sweep(&para.join("a_4K.dat"), 4.5, &sweep(|b| 1.0 + 0.5 * b * b), true);
    write_sweep(&para.join("b_2K.csv"), 1.9, &sweep(|b| 2.0 + 0.5 * b * b), false);
    fs::write(para.join("notes.txt"), "not a sweep").unwrap();
}

fn config(base: &Path) -> ExtractionConfig {
    ExtractionConfig {
        base_dir: base.to_path_buf(),
        samples: vec!["pris".to_string()],
        experiments: vec![Experiment::Hall, Experiment::Para, Experiment::Perp],
        field_max: 2.0,
        field_points: 3,
        zero_field_points: 1,
        cache_path: base.join("out").join("extracted.bin"),
        ..ExtractionConfig::default()
    }
}

fn assert_close(actual: f64, expected: f64) {
    let tol = 1e-9 * expected.abs().max(1e-12);
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected:e}, got {actual:e}"
    );
}

#[test]
fn extract_cache_and_export() {
    let dir = TempDir::new().unwrap();
    build_sample_tree(dir.path());
    let config = config(dir.path());

    let data = extract_all(&config).unwrap();
    assert_eq!(data.fields, vec![0.0, 1.0, 2.0]);
    assert_eq!(data.sample_order, vec!["pris"]);

    let families = &data.samples["pris"];

    // Hall: odd part of R = 5 + 0.1 B times the thickness.
    let hall = &families[&Experiment::Hall];
    assert_eq!(hall.temperatures, vec![2.0]);
    for (value, expected) in hall.resistivities[0].iter().zip([0.0, 0.1 * 2e-7, 0.2 * 2e-7]) {
        assert!((value - expected).abs() < 1e-20, "{value:e} vs {expected:e}");
    }

    // Para: even, rho = R * T * W / L = R * 5e-8, sorted by temperature.
    let para = &families[&Experiment::Para];
    assert_eq!(para.temperatures, vec![2.0, 4.0]);
    let geometry = 5e-8;
    for (row, offset) in para.resistivities.iter().zip([2.0, 1.0]) {
        assert_close(row[0], offset * geometry);
        assert_close(row[1], (offset + 0.5) * geometry);
        assert_close(row[2], (offset + 2.0) * geometry);
    }

    // No Perp directory.
    assert!(families[&Experiment::Perp].is_empty());

    write_extracted(&config.cache_path, &data).unwrap();
    let loaded = load_extracted(&config.cache_path).unwrap();
    assert_eq!(loaded, data);

    let csv_path = dir.path().join("out").join("Para_pris.csv");
    write_family_csv(&csv_path, &loaded.fields, para).unwrap();
    let content = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "B (T),T=2 K,T=4 K");
}

#[test]
fn cached_families_feed_the_plot_curves() {
    let dir = TempDir::new().unwrap();
    build_sample_tree(dir.path());
    let config = config(dir.path());

    write_extracted(&config.cache_path, &extract_all(&config).unwrap()).unwrap();
    let data = load_extracted(&config.cache_path).unwrap();
    let para = &data.samples["pris"][&Experiment::Para];

    let mr = magnetoresistance(&para.resistivities);
    // 4 K sweep: (1 + 0.5 B^2) / 1 - 1
    assert_close(mr[1][1], 50.0);
    assert_close(mr[1][2], 200.0);
    assert_eq!(mr[0][0], 0.0);

    let colors: Vec<Srgb<u8>> = (0..26u8).map(|i| Srgb::new(i * 9, 0, 0)).collect();
    let curves = select_curves(&para.temperatures, &mr, &colors, 25.0, 2);
    assert_eq!(curves.len(), 2);
    // Hottest first, coloured by whole kelvin.
    assert_eq!(curves[0].color, colors[4]);
    assert_eq!(curves[1].color, colors[2]);
}
