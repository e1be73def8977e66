//! Spectrogram and scalogram rendering.

pub mod colormap;
pub mod glyph;
pub mod render;

pub use colormap::Colormap;
pub use render::{
    render, render_image, Artifact, ArtifactSink, FrequencyScale, MemorySink, PngSink, RenderSpec,
};
