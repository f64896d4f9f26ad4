//! PDF export of a composition.
//!
//! Produces a fixed two-section document: a pitch diagram page with every
//! player drawn at its projected position, followed by roster pages listing
//! the players as text rows. Layout math is done in millimeters with a
//! top-left origin; the conversion to PDF points (bottom-left origin)
//! happens once, inside the page builder.

use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::errors::AppError;
use crate::geometry::{fit_pitch, Surface};
use crate::models::{Composition, PlayerPosition};

// Page geometry, A4 portrait.
const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 12.0;
const MM_TO_PT: f64 = 72.0 / 25.4;

// Template colors.
const PITCH_GREEN: Rgb = Rgb::new(34, 197, 94);
const WHITE: Rgb = Rgb::new(255, 255, 255);
const TITLE_COLOR: Rgb = Rgb::new(17, 24, 39);
const SUBTITLE_COLOR: Rgb = Rgb::new(75, 85, 99);
const BODY_COLOR: Rgb = Rgb::new(31, 41, 55);

/// Fill color for players without a usable color value.
pub const FALLBACK_PLAYER_COLOR: Rgb = Rgb::new(59, 130, 246);

// Pitch marking proportions (template constants, not data-derived).
const CENTER_CIRCLE_FRACTION: f64 = 0.07;
const PENALTY_BOX_WIDTH_FRACTION: f64 = 0.16;
const PENALTY_BOX_HEIGHT_FRACTION: f64 = 0.5;

/// Minimum player disc radius so small pitches stay legible.
const MIN_PLAYER_RADIUS_MM: f64 = 3.5;
const PLAYER_RADIUS_FRACTION: f64 = 0.02;

const LINE_HEIGHT_MM: f64 = 5.0;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Parse a hex color string ("#rgb" or "#rrggbb", hash optional).
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let expanded;
    let hex = match hex.len() {
        3 => {
            expanded = hex
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>();
            expanded.as_str()
        }
        6 => hex,
        _ => return None,
    };
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb::new(r, g, b))
}

/// Resolve a player's rendering color, falling back on absent or invalid
/// values instead of failing.
pub fn player_color(color: Option<&str>) -> Rgb {
    color
        .and_then(parse_hex_color)
        .unwrap_or(FALLBACK_PLAYER_COLOR)
}

/// Render a composition to PDF bytes.
pub fn render_pdf(
    composition: &Composition,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>, AppError> {
    let mut pages = Vec::new();
    pages.push(diagram_page(composition, generated_at));
    pages.extend(roster_pages(&composition.players));
    assemble(pages)
}

/// First page: header, description, pitch diagram with player discs.
fn diagram_page(composition: &Composition, generated_at: DateTime<Utc>) -> PageBuilder {
    let mut page = PageBuilder::new();

    // Header: title and meta
    page.set_fill(TITLE_COLOR);
    page.text(&composition.name, MARGIN_MM, MARGIN_MM + 6.0, 18.0, Font::Bold, Align::Left);

    page.set_fill(SUBTITLE_COLOR);
    let subtitle = format!(
        "Formation: {}  -  Exported: {}",
        composition.formation,
        generated_at.format("%Y-%m-%d %H:%M UTC"),
    );
    page.text(&subtitle, MARGIN_MM, MARGIN_MM + 14.0, 11.0, Font::Regular, Align::Left);

    let mut cursor = MARGIN_MM + 22.0;
    if let Some(description) = &composition.description {
        page.set_fill(BODY_COLOR);
        for line in wrap_text(description, PAGE_WIDTH_MM - MARGIN_MM * 2.0, 11.0) {
            page.text(&line, MARGIN_MM, cursor, 11.0, Font::Regular, Align::Left);
            cursor += LINE_HEIGHT_MM;
        }
        cursor += 4.0;
    }

    // Pitch rectangle: shrink-to-fit at 105:68, centered horizontally
    let avail_width = PAGE_WIDTH_MM - MARGIN_MM * 2.0;
    let avail_height = PAGE_HEIGHT_MM - cursor - MARGIN_MM;
    let (pitch_width, pitch_height) = fit_pitch(avail_width, avail_height);
    let pitch_x = MARGIN_MM + (avail_width - pitch_width) / 2.0;
    let pitch_y = cursor;

    // Degenerate area (e.g. a description that fills the page): skip the
    // diagram rather than divide by zero.
    let Some(surface) = Surface::new(pitch_width, pitch_height) else {
        return page;
    };

    draw_pitch(&mut page, pitch_x, pitch_y, pitch_width, pitch_height);
    for player in &composition.players {
        draw_player(&mut page, player, &surface, pitch_x, pitch_y);
    }

    page
}

/// Pitch markings as fixed proportions of the pitch rectangle.
fn draw_pitch(page: &mut PageBuilder, x: f64, y: f64, width: f64, height: f64) {
    page.set_fill(PITCH_GREEN);
    page.set_stroke(WHITE);
    page.set_line_width(0.5);

    page.rect(x, y, width, height, Paint::Fill);
    page.rect(x, y, width, height, Paint::Stroke);

    // Halfway line
    page.line(x + width / 2.0, y, x + width / 2.0, y + height);

    // Center circle
    let radius = width.min(height) * CENTER_CIRCLE_FRACTION;
    page.circle(x + width / 2.0, y + height / 2.0, radius, Paint::Stroke);

    // Penalty boxes at both ends, vertically centered
    let box_width = width * PENALTY_BOX_WIDTH_FRACTION;
    let box_height = height * PENALTY_BOX_HEIGHT_FRACTION;
    let box_y = y + (height - box_height) / 2.0;
    page.rect(x, box_y, box_width, box_height, Paint::Stroke);
    page.rect(x + width - box_width, box_y, box_width, box_height, Paint::Stroke);
}

/// One player: filled disc with centered label, name underneath.
fn draw_player(
    page: &mut PageBuilder,
    player: &PlayerPosition,
    surface: &Surface,
    pitch_x: f64,
    pitch_y: f64,
) {
    let point = surface.project(player.x, player.y);
    let cx = pitch_x + point.x;
    let cy = pitch_y + point.y;

    let radius = (surface.width().min(surface.height()) * PLAYER_RADIUS_FRACTION)
        .max(MIN_PLAYER_RADIUS_MM);

    page.set_fill(player_color(player.color.as_deref()));
    page.set_stroke(WHITE);
    page.set_line_width(0.5);
    page.circle(cx, cy, radius, Paint::FillStroke);

    // Jersey number, or the first letter of the name
    let label = match player.number {
        Some(number) => number.to_string(),
        None => player
            .player_name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default(),
    };
    page.set_fill(WHITE);
    page.text(&label, cx, cy + 0.8, 8.0, Font::Regular, Align::Center);

    page.set_fill(Rgb::new(0, 0, 0));
    page.text(
        &player.player_name,
        cx,
        cy + radius + 3.5,
        7.0,
        Font::Regular,
        Align::Center,
    );
}

/// Roster pages: one text row per player, paginated. An empty player list
/// still emits one page.
fn roster_pages(players: &[PlayerPosition]) -> Vec<PageBuilder> {
    let mut pages = Vec::new();
    let mut page = PageBuilder::new();

    page.set_fill(TITLE_COLOR);
    page.text("Players", MARGIN_MM, MARGIN_MM + 6.0, 14.0, Font::Bold, Align::Left);
    let mut cursor = MARGIN_MM + 14.0;

    page.set_fill(BODY_COLOR);
    for player in players {
        let number_part = match player.number {
            Some(number) => format!("#{} ", number),
            None => String::new(),
        };
        let position_part = match &player.position {
            Some(position) => format!(" \u{2013} {}", position),
            None => String::new(),
        };
        let row = format!("{}{}{}", number_part, player.player_name, position_part);

        for line in wrap_text(&row, PAGE_WIDTH_MM - MARGIN_MM * 2.0, 10.0) {
            if cursor > PAGE_HEIGHT_MM - MARGIN_MM {
                pages.push(page);
                page = PageBuilder::new();
                page.set_fill(BODY_COLOR);
                cursor = MARGIN_MM;
            }
            page.text(&line, MARGIN_MM, cursor, 10.0, Font::Regular, Align::Left);
            cursor += LINE_HEIGHT_MM;
        }
    }

    pages.push(page);
    pages
}

/// Greedy word wrap against an approximated Helvetica advance width.
fn wrap_text(text: &str, max_width_mm: f64, font_size: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width_mm(&candidate, font_size) <= max_width_mm || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Approximate text width: average Helvetica advance of 0.5 em.
fn text_width_mm(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * 0.5 / MM_TO_PT
}

/// Encode text as WinAnsi (CP1252) bytes for the Type1 Helvetica fonts.
/// Characters outside the encoding become '?'.
fn winansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{192}' => 0x83,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{2c6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{160}' => 0x8a,
            '\u{2039}' => 0x8b,
            '\u{152}' => 0x8c,
            '\u{17d}' => 0x8e,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2dc}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{161}' => 0x9a,
            '\u{203a}' => 0x9b,
            '\u{153}' => 0x9c,
            '\u{17e}' => 0x9e,
            '\u{178}' => 0x9f,
            _ => b'?',
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

#[derive(Clone, Copy)]
enum Paint {
    Fill,
    Stroke,
    FillStroke,
}

/// Accumulates content-stream operations for one page, converting from
/// top-left millimeter coordinates to bottom-left PDF points.
struct PageBuilder {
    ops: Vec<Operation>,
}

impl PageBuilder {
    fn new() -> Self {
        Self { ops: Vec::new() }
    }

    fn pt(value_mm: f64) -> f32 {
        (value_mm * MM_TO_PT) as f32
    }

    /// Flip the y axis: mm from the top edge to points from the bottom.
    fn pt_y(y_mm: f64) -> f32 {
        ((PAGE_HEIGHT_MM - y_mm) * MM_TO_PT) as f32
    }

    fn set_fill(&mut self, color: Rgb) {
        self.ops.push(Operation::new(
            "rg",
            vec![
                (color.r as f32 / 255.0).into(),
                (color.g as f32 / 255.0).into(),
                (color.b as f32 / 255.0).into(),
            ],
        ));
    }

    fn set_stroke(&mut self, color: Rgb) {
        self.ops.push(Operation::new(
            "RG",
            vec![
                (color.r as f32 / 255.0).into(),
                (color.g as f32 / 255.0).into(),
                (color.b as f32 / 255.0).into(),
            ],
        ));
    }

    fn set_line_width(&mut self, width_mm: f64) {
        self.ops
            .push(Operation::new("w", vec![Self::pt(width_mm).into()]));
    }

    fn paint_op(&mut self, paint: Paint) {
        let op = match paint {
            Paint::Fill => "f",
            Paint::Stroke => "S",
            Paint::FillStroke => "B",
        };
        self.ops.push(Operation::new(op, vec![]));
    }

    fn rect(&mut self, x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64, paint: Paint) {
        self.ops.push(Operation::new(
            "re",
            vec![
                Self::pt(x_mm).into(),
                Self::pt_y(y_mm + height_mm).into(),
                Self::pt(width_mm).into(),
                Self::pt(height_mm).into(),
            ],
        ));
        self.paint_op(paint);
    }

    fn line(&mut self, x1_mm: f64, y1_mm: f64, x2_mm: f64, y2_mm: f64) {
        self.ops.push(Operation::new(
            "m",
            vec![Self::pt(x1_mm).into(), Self::pt_y(y1_mm).into()],
        ));
        self.ops.push(Operation::new(
            "l",
            vec![Self::pt(x2_mm).into(), Self::pt_y(y2_mm).into()],
        ));
        self.paint_op(Paint::Stroke);
    }

    /// Circle from four cubic Bezier arcs.
    fn circle(&mut self, cx_mm: f64, cy_mm: f64, radius_mm: f64, paint: Paint) {
        // Kappa for a quarter-circle Bezier approximation
        const K: f64 = 0.552_284_749_831;
        let (cx, cy, r) = (cx_mm, cy_mm, radius_mm);
        let k = r * K;

        self.ops.push(Operation::new(
            "m",
            vec![Self::pt(cx + r).into(), Self::pt_y(cy).into()],
        ));
        let arcs = [
            [(cx + r, cy + k), (cx + k, cy + r), (cx, cy + r)],
            [(cx - k, cy + r), (cx - r, cy + k), (cx - r, cy)],
            [(cx - r, cy - k), (cx - k, cy - r), (cx, cy - r)],
            [(cx + k, cy - r), (cx + r, cy - k), (cx + r, cy)],
        ];
        for [(x1, y1), (x2, y2), (x3, y3)] in arcs {
            self.ops.push(Operation::new(
                "c",
                vec![
                    Self::pt(x1).into(),
                    Self::pt_y(y1).into(),
                    Self::pt(x2).into(),
                    Self::pt_y(y2).into(),
                    Self::pt(x3).into(),
                    Self::pt_y(y3).into(),
                ],
            ));
        }
        self.paint_op(paint);
    }

    fn text(&mut self, text: &str, x_mm: f64, y_mm: f64, size_pt: f64, font: Font, align: Align) {
        let x_mm = match align {
            Align::Left => x_mm,
            Align::Center => x_mm - text_width_mm(text, size_pt) / 2.0,
        };
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![font.resource_name().into(), (size_pt as f32).into()],
        ));
        self.ops.push(Operation::new(
            "Td",
            vec![Self::pt(x_mm).into(), Self::pt_y(y_mm).into()],
        ));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(winansi_bytes(text), StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn finish(self) -> Content {
        Content { operations: self.ops }
    }
}

/// Assemble finished pages into a PDF document.
fn assemble(pages: Vec<PageBuilder>) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let encoded = page
            .finish()
            .encode()
            .map_err(|e| AppError::Export(format!("Failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                PageBuilder::pt(PAGE_WIDTH_MM).into(),
                PageBuilder::pt(PAGE_HEIGHT_MM).into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| AppError::Export(format!("Failed to write PDF: {}", e)))?;
    Ok(bytes)
}

/// Filename-safe variant of a composition name, for content disposition.
pub fn export_filename(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_matches('_');
    if safe.is_empty() {
        "composition.pdf".to_string()
    } else {
        format!("{}.pdf", safe)
    }
}
