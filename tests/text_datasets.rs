use std::fs;
use std::path::Path;

use rainrate_rs::{Config, Error, RainfallRateApi};

fn write(root: &Path, name: &str, text: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// ESARAIN-like maps: 3 x 3 grid on [0, 360] longitudes.
fn write_v6_datasets(root: &Path) {
    write(root, "p837/ESARAIN_LAT_v5.txt", "-90\n0\n90\n");
    write(root, "p837/ESARAIN_LON_v5.txt", "0 180 360\n");
    write(root, "p837/ESARAIN_PR6_v5.txt", "1 1 1\n4 4 4\n1 1 1\n");
    write(root, "p837/ESARAIN_MT_v5.txt", "200 200 200\n1500 1500 1500\n200 200 200\n");
    write(root, "p837/ESARAIN_BETA_v5.txt", "# convective fraction\n0.1 0.1 0.1\n0.5 0.5 0.5\n0.1 0.1 0.1\n");
}

/// P.837-7 and P.1510 maps: 3 x 3 meshgrids stored north to south.
fn write_v7_datasets(root: &Path) {
    let lat = "90 90 90\n0 0 0\n-90 -90 -90\n";
    let lon = "-180 0 180\n-180 0 180\n-180 0 180\n";
    write(root, "p837/v7_LAT_MT.txt", lat);
    write(root, "p837/v7_LON_MT.txt", lon);
    write(root, "p837/v7_LAT_R001.txt", lat);
    write(root, "p837/v7_LON_R001.txt", lon);
    write(root, "p837/v7_R001.txt", "5 5 5\n90 90 90\n5 5 5\n");
    write(root, "p1510/v1_Lat.txt", lat);
    write(root, "p1510/v1_Lon.txt", lon);
    for month in 1..=12 {
        write(
            root,
            &format!("p837/v7_MT_Month{:02}.txt", month),
            "10 10 10\n200 200 200\n10 10 10\n",
        );
        write(
            root,
            &format!("p1510/v1_T_Month{:02}.txt", month),
            "250 250 250\n300 300 300\n250 250 250\n",
        );
    }
}

#[test]
fn test_session_from_config_reads_text_datasets() {
    let dir = tempfile::tempdir().unwrap();
    write_v6_datasets(dir.path());
    write_v7_datasets(dir.path());

    let config = Config::from_toml_str(&format!(
        "dataset_dir = {:?}\nversion = 7\n",
        dir.path().display().to_string()
    ))
    .unwrap();
    let api = RainfallRateApi::from_config(&config).unwrap();
    assert_eq!(api.get_version(), 7);

    let r001 = api.rainfall_rate(0., 100., 0.01).unwrap().value.as_scalar().unwrap();
    assert_eq!(r001, 90.);

    let tropics = api.rainfall_rate(0., 100., 0.1).unwrap().value.as_scalar().unwrap();
    let polar = api.rainfall_rate(80., 100., 0.1).unwrap().value.as_scalar().unwrap();
    assert!(tropics > polar);
    assert!(tropics > 0.);

    api.change_version(6).unwrap();
    let v6 = api.rainfall_rate(0., 100., 0.01).unwrap().value.as_scalar().unwrap();
    assert!(v6 > 0. && v6.is_finite());
}

#[test]
fn test_missing_directory_fails_on_first_query() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        dataset_dir: dir.path().join("nowhere"),
        version: 6,
    };
    let api = RainfallRateApi::from_config(&config).unwrap();
    let err = api.rainfall_rate(0., 0., 0.1).unwrap_err();
    assert!(matches!(err, Error::DatasetLoad { ref name, .. } if name.starts_with("p837/")));
}
