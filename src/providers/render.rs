use std::io::BufWriter;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};
use qrcode::render::svg;
use qrcode::{Color as Module, QrCode};

use crate::config::EventProfile;
use crate::models::ticket::Ticket;
use crate::utils::error::AppError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const QR_IMAGE_SIDE_PX: u32 = 240;

/// Renders the visual ticket artifacts: QR data URLs for the browser and the
/// PDF entry pass attached to emails. Pure CPU work, no IO.
pub trait TicketRenderer: Send + Sync {
    fn qr_data_url(&self, payload: &str) -> Result<String, AppError>;

    fn ticket_pdf(&self, ticket: &Ticket) -> Result<Vec<u8>, AppError>;
}

pub struct ArtifactRenderer {
    event: EventProfile,
}

impl ArtifactRenderer {
    pub fn new(event: EventProfile) -> Self {
        Self { event }
    }
}

impl TicketRenderer for ArtifactRenderer {
    fn qr_data_url(&self, payload: &str) -> Result<String, AppError> {
        let code = QrCode::new(payload.as_bytes()).map_err(render_failure)?;
        let image = code
            .render()
            .min_dimensions(QR_IMAGE_SIDE_PX, QR_IMAGE_SIDE_PX)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
    }

    fn ticket_pdf(&self, ticket: &Ticket) -> Result<Vec<u8>, AppError> {
        let (doc, page_idx, layer_idx) = PdfDocument::new(
            format!("{} Entry Pass", self.event.name),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "ticket",
        );
        let layer = doc.get_page(page_idx).get_layer(layer_idx);

        let mono = doc
            .add_builtin_font(BuiltinFont::Courier)
            .map_err(render_failure)?;
        let mono_bold = doc
            .add_builtin_font(BuiltinFont::CourierBold)
            .map_err(render_failure)?;

        draw_background(&layer);
        draw_card(&layer);
        draw_header(&layer, &self.event.name, &mono, &mono_bold);
        draw_holder_rows(&layer, ticket, &mono, &mono_bold);
        draw_qr_panel(&layer, &ticket.qr_payload(), &mono_bold)?;

        layer.set_fill_color(rgb(0.55, 0.61, 0.71));
        layer.use_text(
            "SYSTEM GENERATED. INVALID WITHOUT QR.",
            6.5,
            Mm(27.0),
            Mm(154.0),
            &mono,
        );

        let mut bytes: Vec<u8> = Vec::new();
        {
            let mut writer = BufWriter::new(&mut bytes);
            doc.save(&mut writer).map_err(render_failure)?;
        }
        Ok(bytes)
    }
}

fn draw_background(layer: &PdfLayerReference) {
    layer.set_fill_color(rgb(0.02, 0.02, 0.06));
    layer.add_rect(
        Rect::new(Mm(0.0), Mm(0.0), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM))
            .with_mode(PaintMode::Fill),
    );
}

fn draw_card(layer: &PdfLayerReference) {
    layer.set_fill_color(rgb(0.04, 0.04, 0.10));
    layer.set_outline_color(rgb(0.0, 0.95, 1.0));
    layer.set_outline_thickness(1.2);
    layer.add_rect(
        Rect::new(Mm(15.0), Mm(150.0), Mm(195.0), Mm(262.0)).with_mode(PaintMode::FillStroke),
    );
}

fn draw_header(
    layer: &PdfLayerReference,
    event_name: &str,
    mono: &IndirectFontRef,
    mono_bold: &IndirectFontRef,
) {
    layer.set_fill_color(rgb(1.0, 1.0, 1.0));
    layer.use_text(event_name.to_uppercase(), 24.0, Mm(27.0), Mm(247.0), mono_bold);

    layer.set_fill_color(rgb(0.0, 0.95, 1.0));
    layer.use_text("OFFICIAL ENTRY PASS", 10.0, Mm(27.0), Mm(240.0), mono);

    layer.set_outline_color(rgb(0.35, 0.35, 0.45));
    layer.set_outline_thickness(0.6);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(27.0), Mm(236.0)), false),
            (Point::new(Mm(183.0), Mm(236.0)), false),
        ],
        is_closed: false,
    });
}

fn draw_holder_rows(
    layer: &PdfLayerReference,
    ticket: &Ticket,
    mono: &IndirectFontRef,
    mono_bold: &IndirectFontRef,
) {
    let rows = [
        ("TICKET ID", ticket.short_ref()),
        ("ATTENDEE", fit(&ticket.holder_name.to_uppercase(), 26)),
        ("EMAIL", fit(&ticket.holder_email, 26)),
        (
            "PHONE",
            ticket
                .holder_phone
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
        ),
        (
            "GENDER",
            ticket
                .holder_gender
                .as_deref()
                .map(str::to_uppercase)
                .unwrap_or_else(|| "N/A".to_string()),
        ),
        (
            "DOB",
            ticket
                .holder_dob
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        ),
    ];

    for (i, (label, value)) in rows.iter().enumerate() {
        let y = 228.0 - i as f32 * 10.0;
        layer.set_fill_color(rgb(0.55, 0.61, 0.71));
        layer.use_text(*label, 8.0, Mm(27.0), Mm(y), mono);
        layer.set_fill_color(rgb(1.0, 1.0, 1.0));
        layer.use_text(value.clone(), 10.5, Mm(68.0), Mm(y), mono_bold);
    }
}

fn draw_qr_panel(
    layer: &PdfLayerReference,
    payload: &str,
    mono_bold: &IndirectFontRef,
) -> Result<(), AppError> {
    let code = QrCode::new(payload.as_bytes()).map_err(render_failure)?;

    // White backing keeps the quiet zone scannable on the dark card.
    layer.set_fill_color(rgb(1.0, 1.0, 1.0));
    layer.set_outline_color(rgb(0.0, 0.95, 1.0));
    layer.set_outline_thickness(1.0);
    layer.add_rect(
        Rect::new(Mm(128.0), Mm(166.0), Mm(186.0), Mm(224.0)).with_mode(PaintMode::FillStroke),
    );

    layer.set_fill_color(rgb(0.0, 0.0, 0.0));
    draw_qr_modules(layer, &code, 131.0, 169.0, 52.0);

    layer.set_fill_color(rgb(0.74, 0.07, 1.0));
    layer.use_text("SCAN ME", 8.0, Mm(148.0), Mm(160.5), mono_bold);
    Ok(())
}

/// Draws each dark module as a filled square. Vector output stays crisp at
/// any zoom, which scanners appreciate.
fn draw_qr_modules(
    layer: &PdfLayerReference,
    code: &QrCode,
    origin_x: f32,
    origin_y: f32,
    side: f32,
) {
    let width = code.width();
    let module = side / width as f32;
    for (idx, color) in code.to_colors().iter().enumerate() {
        if *color == Module::Dark {
            let col = (idx % width) as f32;
            let row = (idx / width) as f32;
            let x = origin_x + col * module;
            let y = origin_y + side - (row + 1.0) * module;
            layer.add_rect(
                Rect::new(Mm(x), Mm(y), Mm(x + module), Mm(y + module))
                    .with_mode(PaintMode::Fill),
            );
        }
    }
}

fn fit(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn render_failure<E: std::fmt::Display>(err: E) -> AppError {
    tracing::error!(error = %err, "Ticket artifact rendering failed");
    AppError::DependencyError("Failed to render ticket artifacts.".to_string())
}
