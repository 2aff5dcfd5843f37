//! End-to-end pipeline tests: CSV ingestion through detection, geofence
//! derivation, and file export.

use assert_approx_eq::assert_approx_eq;
use jamwatch::export::{OVERLAY_LABEL, write_events_json, write_overlay_kml};
use jamwatch::geofence::{CIRCLE_VERTICES, GeofenceEvent, horizon_radius_m};
use jamwatch::records::{AdsbRecord, Altitude};
use jamwatch::window::{CrossingKind, DetectorConfig};
use jamwatch::detect_crossings;
use std::io::Write;
use std::path::PathBuf;

fn write_temp_csv(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    let mut file = std::fs::File::create(&path).expect("Failed to create temp CSV");
    write!(file, "{body}").expect("Failed to write temp CSV");
    path
}

fn small_config() -> DetectorConfig {
    DetectorConfig {
        buffer_size: 4,
        ..DetectorConfig::default()
    }
}

#[test]
fn test_csv_to_crossings_pipeline() {
    // One recovering aircraft at altitude, interleaved with a grounded one and
    // a malformed row. The ground rows and the bad row must not disturb the
    // detection window.
    let path = write_temp_csv(
        "pipeline_basic.csv",
        "hex,alt_baro,nic,timestamp,lat,lon\n\
         a1b2c3,20000,0.1,1700000000.0,44.50,-0.60\n\
         ffffff,ground,0,1700000001.0,44.00,-0.50\n\
         a1b2c3,20000,0.1,1700000010.0,44.51,-0.61\n\
         a1b2c3,bogus,9,1700000015.0,44.51,-0.61\n\
         a1b2c3,20000,9.0,1700000020.0,44.52,-0.62\n\
         ffffff,ground,0,1700000021.0,44.00,-0.50\n\
         a1b2c3,20000,9.0,1700000030.0,44.53,-0.63\n",
    );

    let records = AdsbRecord::from_csv(&path).expect("Failed to read CSV");
    // The malformed row is dropped during ingestion.
    assert_eq!(records.len(), 6);

    let crossings = detect_crossings(&records, small_config()).expect("valid config");
    assert_eq!(crossings.len(), 1);
    let event = &crossings[0];
    assert_eq!(event.hex, "a1b2c3");
    assert_eq!(event.kind, CrossingKind::Recovery);
    assert_eq!(event.nics, vec![0.1, 0.1, 9.0, 9.0]);
    // The representative sample is the third admitted a1b2c3 report, which
    // sits at row 4 of the source table (rows 1, 3, and 5 were skipped or
    // belong to the grounded aircraft).
    assert_eq!(event.row, 4);
    assert_approx_eq!(event.lat, 44.52, 1e-9);
    assert_approx_eq!(event.lon, -0.62, 1e-9);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_gap_never_bridged_end_to_end() {
    // Identical NIC shape to a recovery window, but split by a 2-minute gap.
    let path = write_temp_csv(
        "pipeline_gap.csv",
        "hex,alt_baro,nic,timestamp,lat,lon\n\
         a1b2c3,20000,0.1,1700000000.0,44.50,-0.60\n\
         a1b2c3,20000,0.1,1700000010.0,44.51,-0.61\n\
         a1b2c3,20000,9.0,1700000130.0,44.52,-0.62\n\
         a1b2c3,20000,9.0,1700000140.0,44.53,-0.63\n",
    );

    let records = AdsbRecord::from_csv(&path).expect("Failed to read CSV");
    let crossings = detect_crossings(&records, small_config()).expect("valid config");
    assert!(crossings.is_empty());

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_export_files_from_pipeline() {
    let path = write_temp_csv(
        "pipeline_export.csv",
        "hex,alt_baro,nic,timestamp,lat,lon\n\
         a1b2c3,30000,9.0,1700000000.0,44.50,-0.60\n\
         a1b2c3,30000,9.0,1700000010.0,44.51,-0.61\n\
         a1b2c3,30000,0.1,1700000020.0,44.52,-0.62\n\
         a1b2c3,30000,0.2,1700000030.0,44.53,-0.63\n",
    );

    let records = AdsbRecord::from_csv(&path).expect("Failed to read CSV");
    let crossings = detect_crossings(&records, small_config()).expect("valid config");
    assert_eq!(crossings.len(), 1);
    assert_eq!(crossings[0].kind, CrossingKind::Loss);

    let json_path = std::env::temp_dir().join("pipeline_export.json");
    write_events_json(&crossings, &json_path).expect("Failed to write JSON");
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).expect("Invalid JSON");
    assert_eq!(parsed[0]["kind"], "loss");
    assert_eq!(parsed[0]["altitude_ft"], 30000);

    let geofenced: Vec<GeofenceEvent> = crossings
        .into_iter()
        .map(GeofenceEvent::from_crossing)
        .collect();
    assert_approx_eq!(geofenced[0].radius_m, horizon_radius_m(30_000.0), 1e-9);

    let kml_path = std::env::temp_dir().join("pipeline_export.kml");
    write_overlay_kml(&geofenced, &kml_path).expect("Failed to write KML");
    let kml = std::fs::read_to_string(&kml_path).expect("Failed to read KML");
    assert!(kml.contains(OVERLAY_LABEL));
    assert!(kml.contains("<Polygon>"));
    assert_eq!(kml.matches("<Placemark>").count(), 1);
    // 36 vertices plus the closing repeat of the first.
    let coordinates = kml
        .split("<coordinates>")
        .nth(1)
        .and_then(|rest| rest.split("</coordinates>").next())
        .expect("Missing coordinates block");
    assert_eq!(coordinates.trim().lines().count(), CIRCLE_VERTICES + 1);

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(&json_path);
    let _ = std::fs::remove_file(&kml_path);
}

#[test]
fn test_multiple_aircraft_multiplexed_feed() {
    // Two aircraft multiplexed in one table: one loses integrity, one recovers.
    let mut body = String::from("hex,alt_baro,nic,timestamp,lat,lon\n");
    let losing = [9.0, 9.0, 0.1, 0.1];
    let recovering = [0.2, 0.1, 8.5, 9.0];
    for i in 0..4 {
        let t = 1_700_000_000.0 + i as f64 * 10.0;
        body.push_str(&format!("aaaaaa,20000,{},{},44.5,-0.6\n", losing[i], t));
        body.push_str(&format!("bbbbbb,35000,{},{},45.0,-1.0\n", recovering[i], t + 1.0));
    }
    let path = write_temp_csv("pipeline_multiplexed.csv", &body);

    let records = AdsbRecord::from_csv(&path).expect("Failed to read CSV");
    let crossings = detect_crossings(&records, small_config()).expect("valid config");
    assert_eq!(crossings.len(), 2);

    let loss = crossings.iter().find(|c| c.hex == "aaaaaa").unwrap();
    assert_eq!(loss.kind, CrossingKind::Loss);
    assert_eq!(loss.altitude_ft, 20_000);
    let recovery = crossings.iter().find(|c| c.hex == "bbbbbb").unwrap();
    assert_eq!(recovery.kind, CrossingKind::Recovery);
    assert_eq!(recovery.altitude_ft, 35_000);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_low_altitude_traffic_is_ignored() {
    // A textbook recovery shape, but the aircraft never climbs above the
    // minimum-altitude cutoff.
    let path = write_temp_csv(
        "pipeline_low_altitude.csv",
        "hex,alt_baro,nic,timestamp,lat,lon\n\
         a1b2c3,8000,0.1,1700000000.0,44.50,-0.60\n\
         a1b2c3,8000,0.1,1700000010.0,44.51,-0.61\n\
         a1b2c3,9000,9.0,1700000020.0,44.52,-0.62\n\
         a1b2c3,9500,9.0,1700000030.0,44.53,-0.63\n",
    );

    let records = AdsbRecord::from_csv(&path).expect("Failed to read CSV");
    let crossings = detect_crossings(&records, small_config()).expect("valid config");
    assert!(crossings.is_empty());

    let _ = std::fs::remove_file(&path);
}
