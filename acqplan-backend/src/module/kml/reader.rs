use acqplan_common::{GeoCoordinate, Geometry};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::types::{KmlFolder, KmlPlacemark};
use crate::error::{PlanError, PlanResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeometryKind {
    Line,
    Ring,
    Point,
}

/// Reads a KML document into its folder tree.
///
/// Only the elements carried by plan documents are kept: folder and
/// placemark names, `TimeSpan`, `styleUrl`, `ExtendedData` and the first
/// coordinate list of each placemark. A `LinearRing`, alone or inside a
/// `Polygon`, is read as a polygon.
pub fn parse_kml(content: &[u8]) -> PlanResult<KmlFolder> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut path: Vec<String> = Vec::new();
    let mut folders = vec![KmlFolder::default()];
    let mut placemark: Option<KmlPlacemark> = None;
    let mut data_name: Option<String> = None;
    let mut kind: Option<GeometryKind> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                match name.as_str() {
                    "Folder" => folders.push(KmlFolder::default()),
                    "Placemark" => {
                        placemark = Some(KmlPlacemark::default());
                        kind = None;
                    }
                    "Data" | "SimpleData" => data_name = attribute(&e, "name")?,
                    "LineString" => kind = Some(GeometryKind::Line),
                    "Polygon" | "LinearRing" => kind = Some(GeometryKind::Ring),
                    "Point" => kind = Some(GeometryKind::Point),
                    _ => {}
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Text(t)) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| PlanError::Document(format!("bad text content: {}", e)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(c)) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                path.pop();
                let parent = path.last().map(String::as_str);

                match name.as_str() {
                    "Placemark" => {
                        if let (Some(pm), Some(folder)) = (placemark.take(), folders.last_mut()) {
                            folder.placemarks.push(pm);
                        }
                    }
                    "Folder" if folders.len() > 1 => {
                        if let Some(done) = folders.pop() {
                            if let Some(parent_folder) = folders.last_mut() {
                                parent_folder.folders.push(done);
                            }
                        }
                    }
                    "Data" => data_name = None,
                    "name" if matches!(parent, Some("Folder") | Some("Document")) => {
                        if let Some(folder) = folders.last_mut() {
                            folder.name = text.trim().to_string();
                        }
                    }
                    _ => {
                        if let Some(pm) = placemark.as_mut() {
                            close_placemark_element(pm, &name, parent, &text, kind, data_name.as_deref())?;
                        }
                    }
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PlanError::Document(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if folders.len() != 1 {
        return Err(PlanError::Document("unterminated Folder element".to_string()));
    }
    folders
        .pop()
        .ok_or_else(|| PlanError::Document("empty document".to_string()))
}

fn close_placemark_element(
    pm: &mut KmlPlacemark,
    name: &str,
    parent: Option<&str>,
    text: &str,
    kind: Option<GeometryKind>,
    data_name: Option<&str>,
) -> PlanResult<()> {
    let text = text.trim();
    match name {
        "name" if parent == Some("Placemark") => pm.name = text.to_string(),
        "begin" => pm.begin = Some(text.to_string()),
        "end" => pm.end = Some(text.to_string()),
        "styleUrl" => pm.style_url = Some(text.trim_start_matches('#').to_string()),
        "value" | "SimpleData" => {
            if let Some(key) = data_name {
                pm.data.push((key.to_string(), text.to_string()));
            }
        }
        // Inner boundaries of a polygon follow the outer one and are ignored
        "coordinates" if pm.geometry.is_none() => {
            let points = parse_coordinates(text)?;
            pm.geometry = match kind {
                Some(GeometryKind::Line) => Some(Geometry::LineString(points)),
                Some(GeometryKind::Ring) => Some(Geometry::Polygon(open_ring(points))),
                Some(GeometryKind::Point) | None => None,
            };
        }
        _ => {}
    }
    Ok(())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> PlanResult<Option<String>> {
    let attr = e
        .try_get_attribute(key)
        .map_err(|err| PlanError::Document(format!("bad attribute '{}': {}", key, err)))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|err| PlanError::Document(format!("bad attribute '{}': {}", key, err)))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

/// Parses a `lon,lat[,alt]` tuple list
fn parse_coordinates(text: &str) -> PlanResult<Vec<GeoCoordinate>> {
    text.split_whitespace()
        .map(|tuple| {
            let values = tuple
                .split(',')
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|e| PlanError::parse(tuple, e))?;
            match values.as_slice() {
                [lon, lat] => Ok(GeoCoordinate::new(*lon, *lat, 0.0)),
                [lon, lat, alt] => Ok(GeoCoordinate::new(*lon, *lat, *alt)),
                _ => Err(PlanError::parse(tuple, "expected lon,lat[,alt]")),
            }
        })
        .collect()
}

fn open_ring(mut points: Vec<GeoCoordinate>) -> Vec<GeoCoordinate> {
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Parses a KML instant. A missing zone is read as UTC and fractional
/// seconds are dropped.
pub fn parse_kml_time(value: &str) -> PlanResult<DateTime<Utc>> {
    let value = value.trim();
    let parsed = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            let naive = value.trim_end_matches('Z');
            let naive = naive.split('.').next().unwrap_or(naive);
            NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S")
                .map_err(|e| PlanError::parse(value, e))?
                .and_utc()
        }
    };
    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}
