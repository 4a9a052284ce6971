use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::info;

use crate::config::{NodeStyle, RenderConfig};
use crate::error::{GraphError, Result};
use crate::graph::{BipartiteGraph, Side};
use crate::layout::Point;

const POINTS_PER_INCH: f64 = 72.0;
const TITLE_POINTS: f64 = 12.0;

const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("black", (0, 0, 0)),
    ("white", (255, 255, 255)),
    ("red", (255, 0, 0)),
    ("green", (0, 128, 0)),
    ("blue", (0, 0, 255)),
    ("yellow", (255, 255, 0)),
    ("orange", (255, 165, 0)),
    ("purple", (128, 0, 128)),
    ("pink", (255, 192, 203)),
    ("gray", (128, 128, 128)),
    ("grey", (128, 128, 128)),
    ("lightgray", (211, 211, 211)),
    ("lightgrey", (211, 211, 211)),
    ("lightgreen", (144, 238, 144)),
    ("lightblue", (173, 216, 230)),
    ("lightcoral", (240, 128, 128)),
    ("lightpink", (255, 182, 193)),
    ("lightsalmon", (255, 160, 122)),
    ("lightyellow", (255, 255, 224)),
    ("skyblue", (135, 206, 235)),
    ("steelblue", (70, 130, 180)),
    ("navy", (0, 0, 128)),
    ("teal", (0, 128, 128)),
    ("gold", (255, 215, 0)),
    ("salmon", (250, 128, 114)),
    ("tomato", (255, 99, 71)),
    ("violet", (238, 130, 238)),
];

/// Parse a color name or a `#rrggbb` hex string.
pub fn parse_color(value: &str) -> Result<RGBColor> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
                return Ok(RGBColor(r, g, b));
            }
        }
        return Err(GraphError::InvalidColor(value.to_string()));
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|&(_, (r, g, b))| RGBColor(r, g, b))
        .ok_or_else(|| GraphError::InvalidColor(value.to_string()))
}

/// Pixel geometry derived from the figure settings.
struct Canvas {
    width: u32,
    height: u32,
    scale: f64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Canvas {
    fn new(config: &RenderConfig) -> Self {
        let width = (config.width_in * config.dpi).round().max(1.0) as u32;
        let height = (config.height_in * config.dpi).round().max(1.0) as u32;
        let scale = config.dpi / POINTS_PER_INCH;

        let radius = marker_radius(config.restaurant.size, scale)
            .max(marker_radius(config.keyword.size, scale)) as f64;
        let pad_x = width as f64 * 0.05 + radius;
        let pad_y = height as f64 * 0.05 + radius;

        Canvas {
            width,
            height,
            scale,
            left: pad_x,
            right: width as f64 - pad_x,
            top: pad_y + TITLE_POINTS * scale * 2.0,
            bottom: height as f64 - pad_y,
        }
    }

    fn pixels(&self, points: f64) -> f64 {
        points * self.scale
    }

    /// Map layout coordinates in `[-1, 1]` onto the plot area, y up.
    fn project(&self, p: Point) -> (i32, i32) {
        let x = self.left + (p.x + 1.0) / 2.0 * (self.right - self.left);
        let y = self.bottom - (p.y + 1.0) / 2.0 * (self.bottom - self.top);
        (x.round() as i32, y.round() as i32)
    }
}

/// Marker size is an area in points squared.
fn marker_radius(size: f64, scale: f64) -> i32 {
    (size.max(0.0).sqrt() / 2.0 * scale).round().max(1.0) as i32
}

pub fn render(
    graph: &BipartiteGraph,
    layout: &[Point],
    config: &RenderConfig,
    path: &Path,
) -> Result<()> {
    let restaurant_color = parse_color(&config.restaurant.color)?;
    let keyword_color = parse_color(&config.keyword.color)?;
    let canvas = Canvas::new(config);

    let root = SVGBackend::new(path, (canvas.width, canvas.height)).into_drawing_area();
    draw_figure(
        &root,
        graph,
        layout,
        config,
        &canvas,
        [restaurant_color, keyword_color],
    )
    .map_err(|e| GraphError::Render(e.to_string()))?;
    root.present().map_err(|e| GraphError::Render(e.to_string()))?;

    info!(path = %path.display(), "wrote figure");
    Ok(())
}

fn draw_figure<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    graph: &BipartiteGraph,
    layout: &[Point],
    config: &RenderConfig,
    canvas: &Canvas,
    [restaurant_color, keyword_color]: [RGBColor; 2],
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    area.fill(&WHITE)?;

    let g = &graph.graph;
    let at = |index: usize| canvas.project(layout[index]);

    let stroke = canvas.pixels(config.edge_width).round().max(1.0) as u32;
    for edge in g.edge_indices() {
        if let Some((a, b)) = g.edge_endpoints(edge) {
            area.draw(&PathElement::new(
                vec![at(a.index()), at(b.index())],
                BLACK.stroke_width(stroke),
            ))?;
        }
    }

    let categories = [
        (Side::Restaurant, &config.restaurant, restaurant_color),
        (Side::Keyword, &config.keyword, keyword_color),
    ];
    for (side, style, color) in &categories {
        let radius = marker_radius(style.size, canvas.scale);
        for (index, _) in graph.nodes_on(*side) {
            area.draw(&Circle::new(at(index.index()), radius, color.filled()))?;
        }
    }

    let centered = Pos::new(HPos::Center, VPos::Center);
    let label_style = TextStyle::from(("sans-serif", canvas.pixels(config.font_size)).into_font())
        .color(&BLACK)
        .pos(centered);
    for index in g.node_indices() {
        area.draw(&Text::new(
            g[index].name.as_str(),
            at(index.index()),
            label_style.clone(),
        ))?;
    }

    let title_style = TextStyle::from(("sans-serif", canvas.pixels(TITLE_POINTS)).into_font())
        .color(&BLACK)
        .pos(centered);
    area.draw(&Text::new(
        config.title.as_str(),
        (canvas.width as i32 / 2, canvas.pixels(TITLE_POINTS * 1.5).round() as i32),
        title_style,
    ))?;

    // Categories without nodes get no legend entry.
    let entries: Vec<(&NodeStyle, RGBColor)> = categories
        .iter()
        .filter(|(side, _, _)| graph.nodes_on(*side).next().is_some())
        .map(|(_, style, color)| (*style, *color))
        .collect();
    if !entries.is_empty() {
        draw_legend(area, &entries, config, canvas)?;
    }

    Ok(())
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    entries: &[(&NodeStyle, RGBColor)],
    config: &RenderConfig,
    canvas: &Canvas,
) -> std::result::Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let font = canvas.pixels(config.font_size);
    let row = (font * 1.8).round() as i32;
    let marker = (font * 0.5).round().max(2.0) as i32;
    let pad = (font * 0.6).round() as i32;

    let longest = entries
        .iter()
        .map(|(style, _)| style.legend.chars().count())
        .max()
        .unwrap_or(0);
    // rough glyph width estimate for sans-serif
    let text_width = (longest as f64 * font * 0.6).round() as i32;

    let width = pad * 3 + marker * 2 + text_width;
    let height = pad * 2 + row * entries.len() as i32;
    let right = canvas.width as i32 - pad;
    let top = canvas.top.round() as i32 - row;
    let left = right - width;

    area.draw(&Rectangle::new([(left, top), (right, top + height)], WHITE.filled()))?;
    area.draw(&Rectangle::new(
        [(left, top), (right, top + height)],
        RGBColor(204, 204, 204).stroke_width(1),
    ))?;

    let text_style = TextStyle::from(("sans-serif", font).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    for (i, (style, color)) in entries.iter().enumerate() {
        let y = top + pad + row * i as i32 + row / 2;
        let marker_x = left + pad + marker;
        area.draw(&Circle::new((marker_x, y), marker, color.filled()))?;
        area.draw(&Text::new(
            style.legend.as_str(),
            (marker_x + marker + pad, y),
            text_style.clone(),
        ))?;
    }

    Ok(())
}
