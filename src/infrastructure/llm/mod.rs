mod gemini;

pub use gemini::GeminiComposer;
