//! Test doubles for the pipeline's collaborators and a `.pptx` fixture builder.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;

use crate::domain::ports::{DocumentSource, EmbeddingService, ResponseComposer};
use crate::domain::{Document, DomainError, Embedding, SourceFile, PPTX_MIME};

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub struct SlideFixture {
    pub title: Option<String>,
    pub body: Vec<String>,
}

impl SlideFixture {
    pub fn new(title: Option<&str>, body: &[&str]) -> Self {
        Self {
            title: title.map(str::to_string),
            body: body.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn shape_xml(text: &str, placeholder: Option<&str>) -> String {
    let ph = placeholder
        .map(|kind| format!(r#"<p:ph type="{kind}"/>"#))
        .unwrap_or_default();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Shape"/><p:cNvSpPr/><p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        escape(text)
    )
}

/// Builds a minimal presentation archive. Slide part numbering is reversed
/// relative to deck order so readers must follow the slide id list.
pub fn build_pptx(slides: &[SlideFixture]) -> Vec<u8> {
    let count = slides.len();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let slide_ids: String = (0..count)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2))
        .collect();
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:sldIdLst>{slide_ids}</p:sldIdLst></p:presentation>"#
    );

    let slide_rels: String = (0..count)
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{}" Type="{NS_R}/slide" Target="slides/slide{}.xml"/>"#,
                i + 2,
                count - i
            )
        })
        .collect();
    let rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{NS_RELS}"><Relationship Id="rId1" Type="{NS_R}/slideMaster" Target="slideMasters/slideMaster1.xml"/>{slide_rels}</Relationships>"#
    );

    writer.start_file("ppt/presentation.xml", options).unwrap();
    writer.write_all(presentation.as_bytes()).unwrap();
    writer
        .start_file("ppt/_rels/presentation.xml.rels", options)
        .unwrap();
    writer.write_all(rels.as_bytes()).unwrap();

    for (i, slide) in slides.iter().enumerate() {
        let mut shapes = String::new();
        if let Some(title) = &slide.title {
            shapes.push_str(&shape_xml(title, Some("title")));
        }
        for body in &slide.body {
            shapes.push_str(&shape_xml(body, None));
        }
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>{shapes}</p:spTree></p:cSld></p:sld>"#
        );
        writer
            .start_file(format!("ppt/slides/slide{}.xml", count - i), options)
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// Serves documents from memory; ids missing from the map are `NotFound`.
#[derive(Default)]
pub struct FakeSource {
    documents: Mutex<HashMap<String, (String, Vec<u8>)>>,
    transient_failures: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, id: &str, name: &str, content: Vec<u8>) {
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), (name.to_string(), content));
    }

    /// Makes the next `times` fetches of `id` fail with a transient error.
    pub fn fail_transiently(&self, id: &str, times: usize) {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(id.to_string(), times);
    }
}

#[async_trait]
impl DocumentSource for FakeSource {
    async fn fetch(&self, document_id: &str) -> Result<Document, DomainError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(document_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DomainError::transient("source unavailable"));
                }
            }
        }

        let documents = self.documents.lock().unwrap();
        let (name, content) = documents
            .get(document_id)
            .ok_or_else(|| DomainError::not_found(document_id))?;
        let mut doc = Document::new(document_id, name.clone(), content.clone());
        if name.ends_with(".pptx") {
            doc = doc.with_mime_type(PPTX_MIME);
        }
        Ok(doc)
    }

    async fn list(&self, _folder: Option<&str>) -> Result<Vec<SourceFile>, DomainError> {
        let documents = self.documents.lock().unwrap();
        let mut files: Vec<SourceFile> = documents
            .iter()
            .map(|(id, (name, _))| SourceFile {
                id: id.clone(),
                name: name.clone(),
                mime_type: None,
                created_at: None,
                modified_at: None,
            })
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }
}

/// Returns a fixed vector per exact text; unknown texts get a vector derived
/// from their length so every text embeds deterministically.
pub struct FakeEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    failing: Mutex<Vec<String>>,
    dimension: usize,
    model: String,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: Mutex::new(HashMap::new()),
            failing: Mutex::new(Vec::new()),
            dimension,
            model: "fake-embedding-v1".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn set(&self, text: &str, vector: Vec<f32>) {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    /// Texts containing `needle` fail with a transient error.
    pub fn fail_on(&self, needle: &str) {
        self.failing.lock().unwrap().push(needle.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().iter().any(|n| text.contains(n)) {
            return Err(DomainError::transient("embedding quota exceeded"));
        }

        if let Some(v) = self.vectors.lock().unwrap().get(text) {
            return Ok(Embedding::new(v.clone()));
        }

        let mut v = vec![0.0; self.dimension];
        v[text.len() % self.dimension] = 1.0;
        v[0] += 0.1;
        Ok(Embedding::new(v))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Echoes the grounding context back so tests can inspect it.
#[derive(Default)]
pub struct EchoComposer {
    pub fail: bool,
}

#[async_trait]
impl ResponseComposer for EchoComposer {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String, DomainError> {
        if self.fail {
            return Err(DomainError::transient("llm unavailable"));
        }
        Ok(format!("answer to '{prompt}' using:\n{context}"))
    }

    fn model_id(&self) -> &str {
        "echo"
    }
}
