//! Pipeline and query behaviour against a real database file.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use driverfleet::pipeline::last_summary;
use driverfleet::{find_nearby, Config, Error, NearbyQuery, Pipeline, Storage, VehicleType};

const HEADER: &str = "id,vendor_id,pickup_datetime,passenger_count,pickup_longitude,\
                      pickup_latitude,dropoff_longitude,dropoff_latitude,trip_duration";

struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    fn new(name: &str) -> Self {
        let dir =
            std::env::temp_dir().join(format!("driverfleet_e2e_{}_{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn feed(&self, name: &str, rows: &[String]) -> PathBuf {
        let path = self.dir.join(name);
        let mut contents = format!("{HEADER}\n");
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn storage(&self) -> Storage {
        Storage::open(self.dir.join("fleet.db")).unwrap()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// Short single-passenger trips picked up around lower Manhattan.
fn trips(vendor: &str, n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let offset = (i % 4) as f64 * 0.0005;
            format!(
                "id{i},{vendor},2016-03-14 17:24:55,1,{},{},-74.0,40.72,455",
                -74.006 + offset,
                40.7128 + offset
            )
        })
        .collect()
}

#[test]
fn ten_trips_in_one_group_make_one_driver() {
    let ws = Workspace::new("one_group");
    let feed = ws.feed("trips.csv", &trips("2", 10));
    let mut storage = ws.storage();

    let summary = Pipeline::new(Config::default()).run(&feed, &mut storage).unwrap();

    assert_eq!(summary.records_in, 10);
    assert_eq!(summary.records_after_cleaning, 10);
    assert_eq!(summary.profiles_created, 1);

    let profile = storage.get_profile("DRV_001").unwrap().unwrap();
    assert_eq!(profile.total_trips, 10);
    assert_eq!(profile.license_plate, "T40001");
    assert_eq!(profile.vehicle_type, VehicleType::Standard);
    assert!((3.5..=5.0).contains(&profile.rating));
}

#[test]
fn second_run_replaces_profile_and_latest_position_wins() {
    let ws = Workspace::new("rerun");
    let first_feed = ws.feed("first.csv", &trips("1", 6));
    let second_feed = ws.feed("second.csv", &trips("1", 12));
    let mut storage = ws.storage();
    let pipeline = Pipeline::new(Config::default());
    let now = Utc::now();

    pipeline
        .run_with_rng(
            &first_feed,
            &mut storage,
            &mut StdRng::seed_from_u64(1),
            now - Duration::minutes(10),
        )
        .unwrap();
    pipeline
        .run_with_rng(&second_feed, &mut storage, &mut StdRng::seed_from_u64(2), now)
        .unwrap();

    assert_eq!(storage.count_drivers().unwrap(), 1);
    assert_eq!(storage.count_positions().unwrap(), 2);
    assert_eq!(storage.get_profile("DRV_001").unwrap().unwrap().total_trips, 12);

    let current = storage.current_drivers(now - Duration::minutes(30), None).unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].position.last_update.timestamp_millis(), now.timestamp_millis());

    let history = storage.position_history("DRV_001").unwrap();
    assert_eq!(history[0], current[0].position);
}

#[test]
fn rejected_position_leaves_previous_profile_in_place() {
    let ws = Workspace::new("rejected_position");
    let first_feed = ws.feed("first.csv", &trips("1", 6));
    let second_feed = ws.feed("second.csv", &trips("1", 12));
    let mut storage = ws.storage();
    let mut config = Config::default();
    config.pipeline.seed = Some(5);
    let pipeline = Pipeline::new(config);

    let first = pipeline.run(&first_feed, &mut storage).unwrap();
    let before = storage.get_profile("DRV_001").unwrap().unwrap();

    // Another writer locks out new positions on the same file
    let other = rusqlite::Connection::open(ws.dir.join("fleet.db")).unwrap();
    other
        .execute_batch(
            "CREATE TRIGGER reject_positions BEFORE INSERT ON driver_locations
             BEGIN SELECT RAISE(ABORT, 'positions rejected'); END;",
        )
        .unwrap();
    drop(other);

    let err = pipeline.run(&second_feed, &mut storage).unwrap_err();

    assert!(matches!(err, Error::StoreWrite { committed: 0, .. }));
    let after = storage.get_profile("DRV_001").unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(after.total_trips, 6);
    assert_eq!(storage.count_positions().unwrap(), 1);
    assert_eq!(last_summary(&storage).unwrap(), Some(first));
}

#[test]
fn synthesized_drivers_can_be_found() {
    let ws = Workspace::new("query");
    let mut rows = trips("1", 7);
    rows.extend(trips("2", 7));
    rows.extend(trips("3", 3));
    let feed = ws.feed("trips.csv", &rows);
    let mut storage = ws.storage();

    let mut config = Config::default();
    config.pipeline.seed = Some(2024);
    let summary = Pipeline::new(config).run(&feed, &mut storage).unwrap();
    assert_eq!(summary.profiles_created, 2);

    // Every neighborhood lies within 30 km of lower Manhattan
    let query = NearbyQuery::new(40.7128, -74.0060, 30.0, Duration::minutes(30), None).unwrap();
    let nearby = find_nearby(&storage, &query, Utc::now()).unwrap();

    assert_eq!(nearby.len(), 2);
    assert!(nearby.iter().all(|d| d.distance_km <= 30.0));
    assert!(nearby.windows(2).all(|w| {
        w[0].record.position.last_update > w[1].record.position.last_update
            || w[0].driver_id() < w[1].driver_id()
    }));
}

#[test]
fn stale_positions_are_not_current() {
    let ws = Workspace::new("stale");
    let feed = ws.feed("trips.csv", &trips("1", 8));
    let mut storage = ws.storage();
    let an_hour_ago = Utc::now() - Duration::hours(1);

    Pipeline::new(Config::default())
        .run_with_rng(&feed, &mut storage, &mut StdRng::seed_from_u64(3), an_hour_ago)
        .unwrap();

    let query = NearbyQuery::new(40.7128, -74.0060, 50.0, Duration::minutes(30), None).unwrap();
    assert!(find_nearby(&storage, &query, Utc::now()).unwrap().is_empty());

    let stats = storage.fleet_stats(Utc::now() - Duration::minutes(30)).unwrap();
    assert_eq!(stats.total_drivers, 1);
    assert_eq!(stats.available_drivers, 0);
    assert!((stats.avg_eta_minutes - 6.5).abs() < f64::EPSILON);
}

#[test]
fn run_summary_survives_reopen() {
    let ws = Workspace::new("summary");
    let feed = ws.feed("trips.csv", &trips("1", 5));

    let summary = {
        let mut storage = ws.storage();
        let mut config = Config::default();
        config.pipeline.seed = Some(11);
        Pipeline::new(config).run(&feed, &mut storage).unwrap()
    };

    let storage = ws.storage();
    let recorded = last_summary(&storage).unwrap().unwrap();
    assert_eq!(recorded, summary);
    assert_eq!(recorded.seed, Some(11));
    assert!(storage.data_status().unwrap().has_data);
}

#[test]
fn custom_origin_column() {
    let ws = Workspace::new("origin");
    let path = ws.dir.join("medallions.csv");
    let mut contents = String::from(
        "medallion,passenger_count,pickup_longitude,pickup_latitude,\
         dropoff_longitude,dropoff_latitude,trip_duration\n",
    );
    for i in 0..6 {
        let offset = f64::from(i % 3) * 0.001;
        contents.push_str(&format!(
            "M42,1,{},{},-73.99,40.75,300\n",
            -73.98 - offset,
            40.75 + offset
        ));
    }
    std::fs::write(&path, contents).unwrap();

    let mut config = Config::default();
    config.pipeline.origin_column = "medallion".to_string();
    let mut storage = ws.storage();

    let summary = Pipeline::new(config).run(&path, &mut storage).unwrap();
    assert_eq!(summary.profiles_created, 1);
}
