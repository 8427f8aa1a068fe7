use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub type ShapeId = usize;

/// Minimal SVG writer for floorplan previews. Coordinates are screen pixels, y growing downwards.
#[derive(Debug, Default)]
pub struct SVG {
	shapes: Vec<Shape>,
}

#[derive(Debug, Clone)]
struct RectData {
	x: i32,
	y: i32,
	w: i32,
	h: i32,
	color: (u8, u8, u8),
	label: Option<String>,
	hover: Option<String>,
}

#[derive(Debug, Clone)]
struct LineData {
	shape_a: ShapeId,
	shape_b: ShapeId,
	color: &'static str,
}

#[derive(Debug, Clone)]
enum Shape {
	Rect(RectData),
	Line(LineData),
}

const MARGIN: i32 = 20;

impl SVG {
	pub fn new() -> Self {
		SVG { shapes: Vec::new() }
	}

	#[allow(clippy::too_many_arguments)]
	pub fn add_rect(
		&mut self,
		x: i32,
		y: i32,
		w: i32,
		h: i32,
		colour: (u8, u8, u8),
		label: Option<String>,
		hover: Option<String>,
	) -> ShapeId {
		let rect = RectData {
			x,
			y,
			w,
			h,
			color: colour,
			label,
			hover,
		};
		self.shapes.push(Shape::Rect(rect));
		self.shapes.len() - 1
	}

	/// Line between the centres of two rectangles. Ids that are not rectangles are skipped on save.
	pub fn add_wire(&mut self, a: ShapeId, b: ShapeId, color: &'static str) -> ShapeId {
		self.shapes.push(Shape::Line(LineData {
			shape_a: a,
			shape_b: b,
			color,
		}));
		self.shapes.len() - 1
	}

	pub fn render(&self) -> String {
		let (mut max_w, mut max_h) = (0, 0);
		for shape in &self.shapes {
			if let Shape::Rect(r) = shape {
				max_w = max_w.max(r.x + r.w);
				max_h = max_h.max(r.y + r.h);
			}
		}
		let (svg_w, svg_h) = (max_w + 2 * MARGIN, max_h + 2 * MARGIN);

		let mut svg_data = format!(
			r#"<svg xmlns="http://www.w3.org/2000/svg" width="{svg_w}" height="{svg_h}">"#
		);
		svg_data.push_str(&format!(
			r#"<g transform="translate({MARGIN},{MARGIN})">"#
		));

		for shape in &self.shapes {
			match shape {
				Shape::Rect(r) => {
					svg_data.push_str(&format!(
						r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}" stroke="black" stroke-width="1">"#,
						x = r.x,
						y = r.y,
						w = r.w,
						h = r.h,
						fill = color_to_string(r.color)
					));
					if let Some(txt) = &r.hover {
						svg_data.push_str(&format!(r#"<title>{txt}</title>"#));
					}
					svg_data.push_str("</rect>");

					if let Some(txt) = &r.label {
						let (cx, cy) = centre(r);
						svg_data.push_str(&format!(
							r#"<text x="{cx}" y="{cy}" text-anchor="middle" alignment-baseline="middle" fill="black">{txt}</text>"#
						));
					}
				},
				Shape::Line(l) => {
					let (Some(Shape::Rect(ra)), Some(Shape::Rect(rb))) =
						(self.shapes.get(l.shape_a), self.shapes.get(l.shape_b))
					else {
						continue;
					};
					let (x1, y1) = centre(ra);
					let (x2, y2) = centre(rb);
					svg_data.push_str(&format!(
						r#"<line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="{col}" stroke-width="1" />"#,
						col = l.color
					));
				},
			}
		}

		svg_data.push_str("</g></svg>");
		svg_data
	}

	pub fn save<P: AsRef<Path>>(&self, filename: P) -> io::Result<()> {
		let mut file = File::create(filename)?;
		file.write_all(self.render().as_bytes())?;
		Ok(())
	}
}

fn centre(r: &RectData) -> (i32, i32) {
	(r.x + r.w / 2, r.y + r.h / 2)
}

fn color_to_string(c: (u8, u8, u8)) -> String {
	format!("rgb({},{},{})", c.0, c.1, c.2)
}
