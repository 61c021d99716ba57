use chrono::NaiveDate;
use image::RgbImage;

use super::geocode::AddressResult;
use super::tiles::MapComposite;
use super::tree::ApplicationInput;

pub const TITLE: &str = "WNIOSEK O UZNANIE ZA POMNIK PRZYRODY";
pub const MAP_WIDTH_PT: f32 = 256.0;
pub const MAP_ATTRIBUTION: &str = "© autorzy OpenStreetMap";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Centered,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub weight: Weight,
}

impl Span {
    pub fn regular(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: Weight::Regular,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            weight: Weight::Bold,
        }
    }
}

/// Two-column table of bold labels and regular values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<(String, String)>,
}

impl Table {
    pub fn row(mut self, label: &str, value: impl Into<String>) -> Self {
        self.rows.push((label.to_string(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Line {
        spans: Vec<Span>,
        alignment: Alignment,
    },
    Table(Table),
    Image {
        image: RgbImage,
        width_pt: f32,
    },
}

impl Block {
    fn line(span: Span, alignment: Alignment) -> Self {
        Block::Line {
            spans: vec![span],
            alignment,
        }
    }
}

/// A one-page document as an ordered list of blocks, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDocument {
    pub title: String,
    pub blocks: Vec<Block>,
}

fn description_table(input: &ApplicationInput) -> Table {
    let tree = &input.tree;
    Table::default()
        .row("Gatunek", &tree.species_polish)
        .row("Nazwa łacińska", &tree.species_latin)
        .row("Wysokość", format!("{} m", tree.height_m))
        .row("Obwód pnia na wysokości 130cm", tree.circumference_summary())
        .row("Aktualność danych", &tree.date)
        .row("Numer inwentaryzacyjny", &tree.inventory_ref)
        .row("Jednostka zarządzająca", &tree.operator)
}

/// One row of coordinates, plus district and nearest address when known.
fn location_table(input: &ApplicationInput, address: Option<&AddressResult>) -> Table {
    let table = Table::default().row(
        "Współrzędne",
        format!("{}, {}", input.tree.lat, input.tree.lon),
    );
    match address {
        Some(address) => table
            .row("Dzielnica", &address.suburb)
            .row("Najbliższy adres", address.postal_line()),
        None => table,
    }
}

/// Lays out the monument application for one tree.
pub fn build_application_form(
    input: &ApplicationInput,
    address: Option<&AddressResult>,
    map: Option<&MapComposite>,
    date: NaiveDate,
) -> FormDocument {
    let mut blocks = vec![Block::line(
        Span::regular(format!("{}, {}", input.place, date.format("%Y-%m-%d"))),
        Alignment::Right,
    )];
    blocks.extend(
        input
            .recipient
            .iter()
            .map(|line| Block::line(Span::bold(line), Alignment::Right)),
    );
    blocks.push(Block::line(Span::bold(TITLE), Alignment::Centered));
    blocks.push(Block::Line {
        spans: vec![
            Span::bold("1. Przedmiot ochrony: "),
            Span::regular(&input.tree.species_polish),
        ],
        alignment: Alignment::Left,
    });
    blocks.push(Block::line(Span::bold("2. Opis pomnika:"), Alignment::Left));
    blocks.push(Block::Table(description_table(input)));
    blocks.push(Block::line(
        Span::regular(format!("Źródło danych: {}", input.data_source)),
        Alignment::Left,
    ));
    blocks.push(Block::line(
        Span::bold("3. Lokalizacja obiektu"),
        Alignment::Left,
    ));
    blocks.push(Block::Table(location_table(input, address)));
    if let Some(map) = map {
        blocks.push(Block::Image {
            image: map.image.clone(),
            width_pt: MAP_WIDTH_PT,
        });
        blocks.push(Block::line(Span::regular(MAP_ATTRIBUTION), Alignment::Left));
    }
    blocks.push(Block::line(Span::regular("Z poważaniem,"), Alignment::Left));
    blocks.push(Block::line(
        Span::regular(&input.signature),
        Alignment::Left,
    ));
    FormDocument {
        title: TITLE.to_string(),
        blocks,
    }
}
