use anyhow::Context;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use super::feature::Feature;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Tags joined into the placemark name, in order.
pub struct PlacemarkNaming<'a> {
    pub name_tags: &'a [&'a str],
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    element: &str,
    text: &str,
) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(element)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}

fn write_placemark<W: Write>(
    writer: &mut Writer<W>,
    feature: &Feature,
    naming: &PlacemarkNaming,
) -> anyhow::Result<()> {
    let name = naming
        .name_tags
        .iter()
        .filter_map(|tag| feature.tag(tag))
        .collect::<Vec<&str>>()
        .join(" ");
    writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
    write_text_element(writer, "name", &name)?;
    write_text_element(writer, "description", &feature.describe())?;
    writer.write_event(Event::Start(BytesStart::new("Point")))?;
    write_text_element(
        writer,
        "coordinates",
        &format!("{},{}", feature.geometry.x(), feature.geometry.y()),
    )?;
    writer.write_event(Event::End(BytesEnd::new("Point")))?;
    writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
    Ok(())
}

pub fn write_features_as_kml<W: Write>(
    features: &[Feature],
    naming: &PlacemarkNaming,
    target: W,
) -> anyhow::Result<()> {
    let mut writer = Writer::new_with_indent(target, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NAMESPACE));
    writer.write_event(Event::Start(kml))?;
    writer.write_event(Event::Start(BytesStart::new("Document")))?;
    for feature in features {
        write_placemark(&mut writer, feature, naming)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;
    writer.into_inner().flush()?;
    Ok(())
}

pub fn write_features_to_kml(
    features: &[Feature],
    naming: &PlacemarkNaming,
    output_filepath: &Path,
) -> anyhow::Result<()> {
    log::info!(
        "Writing {} placemarks to {:?}",
        features.len(),
        output_filepath
    );
    let file = File::create(output_filepath)
        .with_context(|| format!("Creating KML file {:?}", output_filepath))?;
    write_features_as_kml(features, naming, BufWriter::new(file))
}
