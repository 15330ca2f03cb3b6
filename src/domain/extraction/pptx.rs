//! Text extraction from Office Open XML presentations.
//!
//! A `.pptx` file is a zip archive. Slide order comes from the slide id list
//! in `ppt/presentation.xml`, whose relationship ids resolve to slide parts
//! through `ppt/_rels/presentation.xml.rels`. File names inside the archive
//! do not imply order.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_REL_TYPE_SUFFIX: &str = "/relationships/slide";

#[derive(Debug, Error)]
pub enum PptxError {
    #[error("not a valid presentation archive: {0}")]
    Archive(#[from] ZipError),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("unreadable archive entry: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing part {0}")]
    MissingPart(String),

    #[error("slide relationship {0} does not resolve to a slide")]
    DanglingSlide(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    /// 1-based position in the deck.
    pub number: usize,
    pub title: Option<String>,
    pub body: Vec<String>,
}

impl Slide {
    /// Title followed by the body shapes, one per line.
    pub fn text(&self) -> String {
        self.title
            .iter()
            .chain(self.body.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn read_slides(bytes: &[u8]) -> Result<Vec<Slide>, PptxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let presentation = read_part(&mut archive, PRESENTATION_PART)?;
    let rels = read_part(&mut archive, PRESENTATION_RELS_PART)?;

    let targets = slide_targets(&rels)?;
    let order = slide_order(&presentation)?;

    order
        .iter()
        .enumerate()
        .map(|(i, rel_id)| {
            let part = targets
                .get(rel_id)
                .ok_or_else(|| PptxError::DanglingSlide(rel_id.clone()))?;
            let xml = read_part(&mut archive, part)?;
            let mut slide = parse_slide(&xml)?;
            slide.number = i + 1;
            Ok(slide)
        })
        .collect()
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String, PptxError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(PptxError::MissingPart(name.to_string())),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, PptxError> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Relationship id → archive path, for slide relationships only.
fn slide_targets(rels_xml: &str) -> Result<HashMap<String, String>, PptxError> {
    let mut reader = Reader::from_str(rels_xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let is_slide = attribute(&e, b"Type")?
                    .is_some_and(|t| t.ends_with(SLIDE_REL_TYPE_SUFFIX));
                if !is_slide {
                    continue;
                }
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    targets.insert(id, resolve_target(&target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{target}"),
    }
}

/// Relationship ids of the slides in deck order.
fn slide_order(presentation_xml: &str) -> Result<Vec<String>, PptxError> {
    let mut reader = Reader::from_str(presentation_xml);
    let mut order = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                // The bare `id` attribute is numeric; the slide reference is
                // the namespaced relationship id.
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        order.push(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(order)
}

#[derive(Default)]
struct ShapeText {
    is_title: bool,
    paragraphs: Vec<String>,
}

fn parse_slide(xml: &str) -> Result<Slide, PptxError> {
    let mut reader = Reader::from_str(xml);
    let mut slide = Slide::default();

    let mut shape: Option<ShapeText> = None;
    let mut paragraph: Option<String> = None;
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" => shape = Some(ShapeText::default()),
                b"ph" => mark_title(&e, shape.as_mut())?,
                b"p" => paragraph = Some(String::new()),
                b"t" => in_run_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"ph" => mark_title(&e, shape.as_mut())?,
                b"br" => {
                    if let Some(p) = paragraph.as_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_run_text => {
                if let Some(p) = paragraph.as_mut() {
                    p.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => {
                    let text = paragraph.take().unwrap_or_default();
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    match shape.as_mut() {
                        Some(s) => s.paragraphs.push(text.to_string()),
                        // Table cells and other frames outside a shape.
                        None => slide.body.push(text.to_string()),
                    }
                }
                b"sp" => {
                    if let Some(s) = shape.take() {
                        finish_shape(&mut slide, s);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(slide)
}

fn mark_title(element: &BytesStart<'_>, shape: Option<&mut ShapeText>) -> Result<(), PptxError> {
    if let Some(shape) = shape {
        let kind = attribute(element, b"type")?;
        shape.is_title = matches!(kind.as_deref(), Some("title" | "ctrTitle"));
    }
    Ok(())
}

fn finish_shape(slide: &mut Slide, shape: ShapeText) {
    if shape.paragraphs.is_empty() {
        return;
    }
    let text = shape.paragraphs.join("\n");
    if shape.is_title && slide.title.is_none() {
        slide.title = Some(text);
    } else {
        slide.body.push(text);
    }
}
