//! Event export: JSON detection records and KML overlay output.
//!
//! Two artifacts are produced per run: a flat JSON array of the detected
//! zero-crossing events for downstream analysis, and a single KML overlay in
//! which every event contributes one semi-transparent visibility circle for
//! map display.

use crate::geofence::{GeofenceEvent, circle_ring};
use crate::window::ZeroCrossingEvent;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Annotation attached to every overlay circle.
pub const OVERLAY_LABEL: &str = "Possible GPS interference source";

/// Writes detected crossings as a flat JSON array.
///
/// Each event serializes to a record with the aircraft hex code, crossing
/// kind, altitude, source row index, position, and the NIC window that
/// triggered the detection.
pub fn write_events_json<P: AsRef<Path>>(
    events: &[ZeroCrossingEvent],
    path: P,
) -> Result<(), Box<dyn Error>> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, events)?;
    Ok(())
}

/// Writes one KML overlay containing a visibility circle for every event.
///
/// Each circle is a closed polygon of the event's derived radius centered on
/// the event position, drawn with a shared semi-transparent fill style and
/// labeled with [`OVERLAY_LABEL`] and the aircraft hex code.
pub fn write_overlay_kml<P: AsRef<Path>>(events: &[GeofenceEvent], path: P) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(file, r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#)?;
    writeln!(file, "  <Document>")?;
    writeln!(file, "    <name>GPS interference visibility circles</name>")?;
    writeln!(file, r#"    <Style id="visibility">"#)?;
    writeln!(file, "      <LineStyle>")?;
    writeln!(file, "        <color>ff0000ff</color>")?;
    writeln!(file, "        <width>1</width>")?;
    writeln!(file, "      </LineStyle>")?;
    writeln!(file, "      <PolyStyle>")?;
    writeln!(file, "        <color>400000ff</color>")?;
    writeln!(file, "      </PolyStyle>")?;
    writeln!(file, "    </Style>")?;

    for event in events {
        let ring = circle_ring(
            event.crossing.lat,
            event.crossing.lon,
            event.radius_m,
            event.vertices,
        );
        writeln!(file, "    <Placemark>")?;
        writeln!(
            file,
            "      <name>{} ({})</name>",
            OVERLAY_LABEL, event.crossing.hex
        )?;
        writeln!(file, "      <styleUrl>#visibility</styleUrl>")?;
        writeln!(file, "      <Polygon>")?;
        writeln!(file, "        <outerBoundaryIs>")?;
        writeln!(file, "          <LinearRing>")?;
        writeln!(file, "            <coordinates>")?;
        for (lon, lat) in &ring {
            writeln!(file, "              {lon:.6},{lat:.6},0")?;
        }
        writeln!(file, "            </coordinates>")?;
        writeln!(file, "          </LinearRing>")?;
        writeln!(file, "        </outerBoundaryIs>")?;
        writeln!(file, "      </Polygon>")?;
        writeln!(file, "    </Placemark>")?;
    }

    writeln!(file, "  </Document>")?;
    writeln!(file, "</kml>")?;
    file.flush()?;
    Ok(())
}
