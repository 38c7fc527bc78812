use acqplan_common::{
    DayFolder, ExportDocument, ExportEvent, GeoCoordinate, Geometry, INSTANT_FORMAT, StatusStyle,
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{PlanError, PlanResult};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

struct KmlWriter {
    inner: Writer<Vec<u8>>,
}

impl KmlWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> PlanResult<()> {
        self.inner
            .write_event(event)
            .map_err(|e| PlanError::Document(format!("KML write failed: {}", e)))
    }

    fn start(&mut self, tag: &str) -> PlanResult<()> {
        self.event(Event::Start(BytesStart::new(tag)))
    }

    fn start_with(&mut self, tag: &str, attributes: &[(&str, &str)]) -> PlanResult<()> {
        self.event(Event::Start(
            BytesStart::new(tag).with_attributes(attributes.iter().copied()),
        ))
    }

    fn end(&mut self, tag: &str) -> PlanResult<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn text_element(&mut self, tag: &str, text: &str) -> PlanResult<()> {
        self.start(tag)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(tag)
    }

    fn finish(self) -> PlanResult<String> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| PlanError::Document(format!("KML output is not UTF-8: {}", e)))
    }
}

/// Serializes an export document as KML 2.2
pub fn write_kml(document: &ExportDocument) -> PlanResult<String> {
    let mut w = KmlWriter::new();
    w.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.start_with("kml", &[("xmlns", KML_NAMESPACE)])?;
    w.start("Document")?;
    w.text_element("name", &document.name)?;

    for style in &document.styles {
        write_style(&mut w, style)?;
    }
    for folder in &document.folders {
        write_day_folder(&mut w, folder)?;
    }

    w.end("Document")?;
    w.end("kml")?;
    w.finish()
}

fn write_style(w: &mut KmlWriter, style: &StatusStyle) -> PlanResult<()> {
    w.start_with("Style", &[("id", style.id.as_str())])?;
    w.start("LineStyle")?;
    w.text_element("color", &style.line_color)?;
    w.text_element("width", &style.line_width.to_string())?;
    w.end("LineStyle")?;
    w.start("PolyStyle")?;
    w.text_element("color", &style.poly_color)?;
    w.text_element("fill", if style.fill { "1" } else { "0" })?;
    w.end("PolyStyle")?;
    w.end("Style")
}

fn write_day_folder(w: &mut KmlWriter, folder: &DayFolder) -> PlanResult<()> {
    w.start("Folder")?;
    w.text_element("name", &folder.day)?;
    for satellite in &folder.satellites {
        w.start("Folder")?;
        w.text_element("name", &satellite.name)?;
        for event in &satellite.events {
            write_event(w, event)?;
        }
        w.end("Folder")?;
    }
    w.end("Folder")
}

fn write_event(w: &mut KmlWriter, event: &ExportEvent) -> PlanResult<()> {
    w.start("Placemark")?;
    w.text_element("name", &event.name)?;
    w.start("TimeSpan")?;
    w.text_element("begin", &event.begin.format(INSTANT_FORMAT).to_string())?;
    w.text_element("end", &event.end.format(INSTANT_FORMAT).to_string())?;
    w.end("TimeSpan")?;
    if let Some(style) = &event.style {
        w.text_element("styleUrl", &format!("#{}", style))?;
    }

    if !event.attributes.is_empty() {
        w.start("ExtendedData")?;
        for (name, value) in &event.attributes {
            w.start_with("Data", &[("name", name.as_str())])?;
            w.text_element("value", value)?;
            w.end("Data")?;
        }
        w.end("ExtendedData")?;
    }

    match &event.geometry {
        Some(Geometry::LineString(points)) => {
            w.start("LineString")?;
            write_surface_mode(w)?;
            w.text_element("coordinates", &format_coordinates(points, false))?;
            w.end("LineString")?;
        }
        Some(Geometry::Polygon(points)) => {
            w.start("Polygon")?;
            write_surface_mode(w)?;
            w.start("outerBoundaryIs")?;
            w.start("LinearRing")?;
            w.text_element("coordinates", &format_coordinates(points, true))?;
            w.end("LinearRing")?;
            w.end("outerBoundaryIs")?;
            w.end("Polygon")?;
        }
        None => {}
    }
    w.end("Placemark")
}

fn write_surface_mode(w: &mut KmlWriter) -> PlanResult<()> {
    w.text_element("tessellate", "1")?;
    w.text_element("altitudeMode", "clampToGround")
}

/// `lon,lat,alt` tuples with 5 decimals. Rings are closed on output.
fn format_coordinates(points: &[GeoCoordinate], close: bool) -> String {
    let format = |p: &GeoCoordinate| format!("{:.5},{:.5},{:.5}", p.lon, p.lat, p.alt);
    let mut tuples: Vec<String> = points.iter().map(format).collect();
    if close {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if points.len() > 1 && first != last {
                tuples.push(format(first));
            }
        }
    }
    tuples.join(" ")
}
